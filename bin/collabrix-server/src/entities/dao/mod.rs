pub mod session;
pub mod user;

pub use session::ChatSession;
pub use user::{ProfilePatch, UserRecord};
