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
use super::tenant::{BookId, EntityId, Tenant};
use crate::domain::ReservationFilter;
use crate::models::reservation::{NewReservation, ReservationStatus, ReservationUpdate};
use crate::services::{configuration_service, reservation_service};

#[derive(Debug, Default, Deserialize)]
pub struct ListReservationsQuery {
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    pub status: Option<ReservationStatus>,
    pub expired: Option<bool>,
}

impl From<ListReservationsQuery> for ReservationFilter {
    fn from(query: ListReservationsQuery) -> Self {
        Self {
            user_id: query.user_id,
            book_id: query.book_id,
            status: query.status,
            expired: query.expired.unwrap_or(false),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/{library_id}/reservations",
    params(("library_id" = i32, Path, description = "Library id")),
    responses(
        (status = 200, description = "Reservations in serving order (priority desc, date asc)")
    )
)]
pub async fn list_reservations(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    query: Result<Query<ListReservationsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let reservations =
        reservation_service::list_reservations(&db, library_id, &query.into()).await?;
    Ok(Json(json!({ "total": reservations.len(), "reservations": reservations })))
}

#[utoipa::path(
    post,
    path = "/api/{library_id}/reservations",
    params(("library_id" = i32, Path, description = "Library id")),
    responses(
        (status = 201, description = "Reservation queued"),
        (status = 400, description = "Validation or circulation rule failure")
    )
)]
pub async fn create_reservation(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    payload: Result<Json<NewReservation>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let policy = configuration_service::load_policy(&db, library_id).await?;
    let reservation =
        reservation_service::create_reservation(&db, library_id, &policy, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "reservation": reservation,
            "message": "Reservación creada exitosamente"
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/{library_id}/reservations/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Reservation id")
    ),
    responses(
        (status = 200, description = "Reservation found"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    let reservation = reservation_service::get_reservation(&db, library_id, id).await?;
    Ok(Json(json!({ "reservation": reservation })))
}

#[utoipa::path(
    put,
    path = "/api/{library_id}/reservations/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Reservation id")
    ),
    responses(
        (status = 200, description = "Reservation updated"),
        (status = 400, description = "Invalid reservation or duplicate open reservation"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn update_reservation(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
    payload: Result<Json<ReservationUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let reservation =
        reservation_service::update_reservation(&db, library_id, id, payload).await?;
    Ok(Json(json!({
        "reservation": reservation,
        "message": "Reservación actualizada exitosamente"
    })))
}

#[utoipa::path(
    delete,
    path = "/api/{library_id}/reservations/{id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Reservation id")
    ),
    responses(
        (status = 204, description = "Reservation deleted"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn delete_reservation(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    reservation_service::delete_reservation(&db, library_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/{library_id}/reservations/{id}/cancel",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Reservation id")
    ),
    responses(
        (status = 200, description = "Reservation cancelled"),
        (status = 400, description = "Reservation is not pending or active"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn cancel_reservation(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    let reservation = reservation_service::cancel_reservation(&db, library_id, id).await?;
    Ok(Json(json!({
        "reservation": reservation,
        "message": "Reservación cancelada exitosamente"
    })))
}

#[utoipa::path(
    post,
    path = "/api/{library_id}/reservations/{id}/process",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("id" = i32, Path, description = "Reservation id")
    ),
    responses(
        (status = 200, description = "Reservation completed"),
        (status = 400, description = "Reservation is not active"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn process_reservation(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    EntityId(id): EntityId,
) -> Result<impl IntoResponse, ApiError> {
    let reservation = reservation_service::process_reservation(&db, library_id, id).await?;
    Ok(Json(json!({
        "reservation": reservation,
        "message": "Reservación procesada exitosamente"
    })))
}

#[utoipa::path(
    post,
    path = "/api/{library_id}/reservations/offer/{book_id}",
    params(
        ("library_id" = i32, Path, description = "Library id"),
        ("book_id" = i32, Path, description = "Book with a copy back on the shelf")
    ),
    responses(
        (status = 200, description = "Head of the queue activated and notified"),
        (status = 204, description = "Nobody is waiting for the book"),
        (status = 400, description = "No available copy")
    )
)]
pub async fn offer_next_reservation(
    State(db): State<DatabaseConnection>,
    Tenant(library_id): Tenant,
    BookId(book_id): BookId,
) -> Result<impl IntoResponse, ApiError> {
    let offered = reservation_service::offer_next_reservation(&db, library_id, book_id).await?;

    Ok(match offered {
        Some(reservation) => Json(json!({ "reservation": reservation })).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}
