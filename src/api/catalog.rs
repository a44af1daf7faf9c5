//! Users, books and copies of a library

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
use serde_json::json;

use super::error::ApiError;
use super::tenant::{EntityId, Tenant};
use crate::domain::CopyFilter;
use crate::models::copy::NewCopy;
use crate::models::user::NewUser;
use crate::models::Book;
use crate::services::catalog_service;

// --- Users ---

#[utoipa::path(
    get,
    path = "/api/{library_id}/users",
    params(("library_id" = i32, Path, description = "Library id")),
    responses((status = 200, description = "Users of the library"))
)]
pub async fn list_users(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
) -> Result<impl IntoResponse, ApiError> {
    let users = catalog_service::list_users(&db, library_id).await?;
    Ok(Json(json!({ "total": users.len(), "users": users })))
}

#[utoipa::path(
    post,
    path = "/api/{library_id}/users",
    params(("library_id" = i32, Path, description = "Library id")),
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Invalid user or duplicate code/DNI")
    )
)]
pub async fn create_user(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let user = catalog_service::create_user(&db, library_id, payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

#[utoipa::path(
    get,
    path = "/api/{library_id}/users/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "User found"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    let user = catalog_service::get_user(&db, library_id, id).await?;
    Ok(Json(json!({ "user": user })))
}

#[utoipa::path(
    delete,
    path = "/api/{library_id}/users/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "User id")
    ),
    responses(
        (status = 204, description = "User and their reservations deleted"),
        (status = 400, description = "User has open loans or pending fines"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    catalog_service::delete_user(&db, library_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Books ---

#[utoipa::path(
    get,
    path = "/api/{library_id}/books",
    params(("library_id" = i32, Path, description = "Library id")),
    responses((status = 200, description = "Books of the library"))
)]
pub async fn list_books(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
) -> Result<impl IntoResponse, ApiError> {
    let books = catalog_service::list_books(&db, library_id).await?;
    Ok(Json(json!({ "total": books.len(), "books": books })))
}

#[utoipa::path(
    post,
    path = "/api/{library_id}/books",
    params(("library_id" = i32, Path, description = "Library id")),
    responses(
        (status = 201, description = "Book created"),
        (status = 400, description = "Invalid book")
    )
)]
pub async fn create_book(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    payload: Result<Json<Book>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let book = catalog_service::create_book(&db, library_id, payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "book": book }))))
}

#[utoipa::path(
    get,
    path = "/api/{library_id}/books/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Book id")
    ),
    responses(
        (status = 200, description = "Book found"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    let book = catalog_service::get_book(&db, library_id, id).await?;
    Ok(Json(json!({ "book": book })))
}

#[utoipa::path(
    delete,
    path = "/api/{library_id}/books/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Book id")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 400, description = "Book has borrowed copies or open reservations"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    catalog_service::delete_book(&db, library_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Copies ---

#[utoipa::path(
    get,
    path = "/api/{library_id}/copies",
    params(("library_id" = i32, Path, description = "Library id")),
    responses((status = 200, description = "Copies matching the filter"))
)]
pub async fn list_copies(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    query: Result<Query<CopyFilter>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(filter) = query?;
    let copies = catalog_service::list_copies(&db, library_id, &filter).await?;
    Ok(Json(json!({ "total": copies.len(), "copies": copies })))
}

#[utoipa::path(
    post,
    path = "/api/{library_id}/copies",
    params(("library_id" = i32, Path, description = "Library id")),
    responses(
        (status = 201, description = "Copy created"),
        (status = 400, description = "Invalid copy, unknown book or initial status Borrowed/Reserved")
    )
)]
pub async fn create_copy(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    payload: Result<Json<NewCopy>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let copy = catalog_service::create_copy(&db, library_id, payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "copy": copy }))))
}

#[utoipa::path(
    get,
    path = "/api/{library_id}/copies/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Copy id")
    ),
    responses(
        (status = 200, description = "Copy found"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_copy(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    let copy = catalog_service::get_copy(&db, library_id, id).await?;
    Ok(Json(json!({ "copy": copy })))
}

#[utoipa::path(
    delete,
    path = "/api/{library_id}/copies/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Copy id")
    ),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 400, description = "Copy is borrowed or referenced by an open loan"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn delete_copy(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    catalog_service::delete_copy(&db, library_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
