pub mod chat;
pub mod suppliers;
pub mod users;
