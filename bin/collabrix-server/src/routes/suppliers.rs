use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use collabrix_types::Supplier;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::entities::SupplierStore;
use crate::error::ServerError;
use crate::middleware::AuthUser;
use crate::schemas::suppliers::{
    CreateSupplierRequest, SupplierAnswerResponse, SupplierQueryRequest,
};
use crate::schemas::users::non_empty;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(query_suppliers, list_suppliers, create_supplier),
    components(schemas(
        SupplierQueryRequest,
        SupplierAnswerResponse,
        CreateSupplierRequest,
        Supplier
    ))
)]
pub struct SuppliersApi;

/// Routes nested under `/api/suppliers`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route("/query", post(query_suppliers))
}

#[utoipa::path(
    post,
    path = "/api/suppliers/query",
    tag = "suppliers",
    request_body = SupplierQueryRequest,
    responses(
        (
            status = 200,
            description = "Answer grounded in the supplier directory",
            body = SupplierAnswerResponse
        ),
        (status = 400, description = "Query is required"),
        (status = 404, description = "No suppliers found"),
    )
)]
pub async fn query_suppliers(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SupplierQueryRequest>,
) -> Result<Json<SupplierAnswerResponse>, ServerError> {
    let answer = state.chatbot.supplier_answer(&req.query).await?;
    Ok(Json(SupplierAnswerResponse { answer }))
}

#[utoipa::path(
    get,
    path = "/api/suppliers",
    tag = "suppliers",
    responses((status = 200, description = "Supplier directory", body = Vec<Supplier>))
)]
pub async fn list_suppliers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Supplier>>, ServerError> {
    Ok(Json(state.store.list_suppliers(0).await?))
}

#[utoipa::path(
    post,
    path = "/api/suppliers",
    tag = "suppliers",
    request_body = CreateSupplierRequest,
    responses(
        (status = 200, description = "Supplier added", body = Supplier),
        (status = 400, description = "Name and location are required"),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer" = []))
)]
pub async fn create_supplier(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(req): Json<CreateSupplierRequest>,
) -> Result<Json<Supplier>, ServerError> {
    if !claims.is_admin {
        return Err(ServerError::Forbidden("Admins only".to_owned()));
    }
    let (Some(name), Some(location)) =
        (non_empty(Some(req.name)), non_empty(Some(req.location)))
    else {
        return Err(ServerError::BadRequest("Name and location are required".to_owned()));
    };
    let supplier = Supplier {
        id: Uuid::new_v4().to_string(),
        name,
        location,
        supplies: req
            .supplies
            .into_iter()
            .filter_map(|s| non_empty(Some(s)))
            .collect(),
    };
    state.store.insert_supplier(supplier.clone()).await?;
    info!(supplier_id = %supplier.id, by = %claims.user_id, "supplier added");
    Ok(Json(supplier))
}
