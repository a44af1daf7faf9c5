use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::json;

use super::error::ApiError;
use super::tenant::{EntityId, Tenant};
use crate::domain::FineFilter;
use crate::models::fine::{FineStatus, FineUpdate, NewFine};
use crate::services::fine_service;

#[derive(Debug, Default, Deserialize)]
pub struct ListFinesQuery {
    pub user_id: Option<i32>,
    pub loan_id: Option<i32>,
    pub status: Option<FineStatus>,
    pub pending: Option<bool>,
}

impl From<ListFinesQuery> for FineFilter {
    fn from(query: ListFinesQuery) -> Self {
        Self {
            user_id: query.user_id,
            loan_id: query.loan_id,
            status: query.status,
            pending: query.pending.unwrap_or(false),
        }
    }
}

/// Optional body of `/pay` and `/waive`
#[derive(Debug, Default, Deserialize)]
pub struct SettleRequest {
    pub notes: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/{library_id}/fines",
    params(("library_id" = i32, Path, description = "Library id")),
    responses((status = 200, description = "Fines, newest first"))
)]
pub async fn list_fines(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    query: Result<Query<ListFinesQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let fines = fine_service::list_fines(&db, library_id, &query.into()).await?;
    Ok(Json(json!({ "total": fines.len(), "fines": fines })))
}

#[utoipa::path(
    post,
    path = "/api/{library_id}/fines",
    params(("library_id" = i32, Path, description = "Library id")),
    responses(
        (status = 201, description = "Fine created"),
        (status = 400, description = "Invalid fine or unknown user/loan")
    )
)]
pub async fn create_fine(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    payload: Result<Json<NewFine>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let fine = fine_service::create_fine(&db, library_id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "fine": fine, "message": "Multa creada exitosamente" })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/{library_id}/fines/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Fine id")
    ),
    responses(
        (status = 200, description = "Fine found"),
        (status = 404, description = "Fine not found")
    )
)]
pub async fn get_fine(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    let fine = fine_service::get_fine(&db, library_id, id).await?;
    Ok(Json(json!({ "fine": fine })))
}

#[utoipa::path(
    put,
    path = "/api/{library_id}/fines/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Fine id")
    ),
    responses(
        (status = 200, description = "Fine updated"),
        (status = 400, description = "Invalid fine"),
        (status = 404, description = "Fine not found")
    )
)]
pub async fn update_fine(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
    payload: Result<Json<FineUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let fine = fine_service::update_fine(&db, library_id, id, payload).await?;
    Ok(Json(json!({ "fine": fine, "message": "Multa actualizada exitosamente" })))
}

#[utoipa::path(
    delete,
    path = "/api/{library_id}/fines/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Fine id")
    ),
    responses(
        (status = 204, description = "Fine deleted"),
        (status = 404, description = "Fine not found")
    )
)]
pub async fn delete_fine(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    fine_service::delete_fine(&db, library_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/{library_id}/fines/{id}/pay",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Fine id")
    ),
    responses(
        (status = 200, description = "Fine paid"),
        (status = 400, description = "Fine is not pending"),
        (status = 404, description = "Fine not found")
    )
)]
pub async fn pay_fine(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
    payload: Option<Json<SettleRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let fine = fine_service::pay_fine(&db, library_id, id, request.notes).await?;
    Ok(Json(json!({ "fine": fine, "message": "Multa pagada exitosamente" })))
}

#[utoipa::path(
    post,
    path = "/api/{library_id}/fines/{id}/waive",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Fine id")
    ),
    responses(
        (status = 200, description = "Fine waived"),
        (status = 400, description = "Fine is not pending"),
        (status = 404, description = "Fine not found")
    )
)]
pub async fn waive_fine(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
    payload: Option<Json<SettleRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let fine = fine_service::waive_fine(&db, library_id, id, request.notes).await?;
    Ok(Json(json!({ "fine": fine, "message": "Multa condonada exitosamente" })))
}
