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
use crate::domain::LoanFilter;
use crate::models::loan::{LoanStatus, LoanUpdate, NewLoan};
use crate::services::{configuration_service, loan_service};

#[derive(Debug, Default, Deserialize)]
pub struct ListLoansQuery {
    pub code: Option<String>,
    pub user_id: Option<i32>,
    pub copy_id: Option<i32>,
    pub status: Option<LoanStatus>,
    pub overdue: Option<bool>,
}

impl From<ListLoansQuery> for LoanFilter {
    fn from(query: ListLoansQuery) -> Self {
        Self {
            code: query.code,
            user_id: query.user_id,
            copy_id: query.copy_id,
            status: query.status,
            overdue: query.overdue.unwrap_or(false),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RenewRequest {
    pub librarian_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReturnRequest {
    pub notes: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/{library_id}/loans",
    params(("library_id" = i32, Path, description = "Library id")),
    responses(
        (status = 200, description = "Loans, newest first"),
        (status = 400, description = "Invalid library id or filter")
    )
)]
pub async fn list_loans(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    query: Result<Query<ListLoansQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let loans = loan_service::list_loans(&db, library_id, &query.into()).await?;
    Ok(Json(json!({ "total": loans.len(), "loans": loans })))
}

#[utoipa::path(
    post,
    path = "/api/{library_id}/loans",
    params(("library_id" = i32, Path, description = "Library id")),
    responses(
        (status = 201, description = "Loan created, copy borrowed"),
        (status = 400, description = "Validation or circulation rule failure")
    )
)]
pub async fn create_loan(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    payload: Result<Json<NewLoan>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let policy = configuration_service::load_policy(&db, library_id).await?;
    let loan = loan_service::create_loan(&db, library_id, &policy, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "loan": loan, "message": "Préstamo creado exitosamente" })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/{library_id}/loans/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Loan id")
    ),
    responses(
        (status = 200, description = "Loan found"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    let loan = loan_service::get_loan(&db, library_id, id).await?;
    Ok(Json(json!({ "loan": loan })))
}

#[utoipa::path(
    put,
    path = "/api/{library_id}/loans/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Loan id")
    ),
    responses(
        (status = 200, description = "Loan updated"),
        (status = 400, description = "Invalid loan or status change"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn update_loan(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
    payload: Result<Json<LoanUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let loan = loan_service::update_loan(&db, library_id, id, payload).await?;
    Ok(Json(json!({ "loan": loan, "message": "Préstamo actualizado exitosamente" })))
}

#[utoipa::path(
    delete,
    path = "/api/{library_id}/loans/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Loan id")
    ),
    responses(
        (status = 204, description = "Loan deleted"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn delete_loan(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    loan_service::delete_loan(&db, library_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/{library_id}/loans/{id}/renew",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Loan id")
    ),
    responses(
        (status = 200, description = "Due date extended"),
        (status = 400, description = "Renewal refused"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn renew_loan(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
    payload: Option<Json<RenewRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let loan = loan_service::renew_loan(&db, library_id, id, request.librarian_id).await?;
    Ok(Json(json!({ "loan": loan, "message": "Préstamo renovado exitosamente" })))
}

#[utoipa::path(
    post,
    path = "/api/{library_id}/loans/{id}/return",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Loan id")
    ),
    responses(
        (status = 200, description = "Loan returned; `fine` reports any late-return fine"),
        (status = 400, description = "Loan is not active"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn return_loan(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
    payload: Option<Json<ReturnRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let policy = configuration_service::load_policy(&db, library_id).await?;
    let outcome = loan_service::return_loan(&db, library_id, &policy, id, request.notes).await?;

    Ok(Json(json!({
        "loan": outcome.loan,
        "fine": outcome.fine,
        "message": "Préstamo devuelto exitosamente"
    })))
}
