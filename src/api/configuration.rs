use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use sea_orm::DatabaseConnection;
use serde_json::json;

use super::error::ApiError;
use super::tenant::Tenant;
use crate::models::configuration::ConfigurationUpdate;
use crate::services::configuration_service;

#[utoipa::path(
    get,
    path = "/api/{library_id}/configuration",
    params(("library_id" = i32, Path, description = "Library id")),
    responses((status = 200, description = "Circulation policy, defaults when never set"))
)]
pub async fn get_configuration(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
) -> Result<impl IntoResponse, ApiError> {
    let configuration = configuration_service::get_configuration(&db, library_id).await?;
    Ok(Json(json!({ "configuration": configuration })))
}

#[utoipa::path(
    put,
    path = "/api/{library_id}/configuration",
    params(("library_id" = i32, Path, description = "Library id")),
    responses(
        (status = 200, description = "Policy stored"),
        (status = 400, description = "Out-of-range value")
    )
)]
pub async fn update_configuration(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    payload: Result<Json<ConfigurationUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let configuration =
        configuration_service::update_configuration(&db, library_id, payload).await?;
    Ok(Json(json!({
        "configuration": configuration,
        "message": "Configuración actualizada exitosamente"
    })))
}
