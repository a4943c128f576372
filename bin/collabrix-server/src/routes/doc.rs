use crate::routes::{chat, health, suppliers, users};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "collabrix-server",
    description = "Collabrix networking backend: accounts, profiles, chatbot advisor and \
                   supplier directory",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(users::UsersApi::openapi());
    root.merge(chat::ChatApi::openapi());
    root.merge(suppliers::SuppliersApi::openapi());
    root
}
