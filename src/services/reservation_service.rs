//! Reservation Coordinator - holds on books that have no copy on the shelf
//!
//! A user holds at most one open (`Pending`/`Active`) reservation per book.
//! The queue for a book is served by priority, highest first, then by
//! reservation date.

use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};

use crate::domain::rules::validate_reservation;
use crate::domain::{CirculationPolicy, DomainError, ReservationFilter};
use crate::infrastructure::repositories::{
    BookRepository, CopyRepository, FineRepository, ReservationRepository, UserRepository,
};
use crate::models::copy::CopyStatus;
use crate::models::reservation::{self, NewReservation, ReservationStatus, ReservationUpdate};
use crate::models::user::UserStatus;

pub const DEFAULT_PRIORITY: i32 = 5;
pub const COPIES_AVAILABLE_MESSAGE: &str =
    "Hay copias disponibles del libro, no es necesario realizar una reservación";
const DUPLICATE_MESSAGE: &str = "El usuario ya tiene una reservación activa para este libro";

fn reservation_not_found(id: i32) -> DomainError {
    DomainError::not_found(format!("Reservación con ID {} no encontrada", id))
}

pub async fn list_reservations(
    db: &DatabaseConnection,
    library_id: i32,
    filter: &ReservationFilter,
) -> Result<Vec<reservation::Model>, DomainError> {
    ReservationRepository::new(db, library_id)
        .find_filtered(filter)
        .await
}

pub async fn get_reservation(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<reservation::Model, DomainError> {
    ReservationRepository::new(db, library_id)
        .find_by_id(id)
        .await?
        .ok_or_else(|| reservation_not_found(id))
}

/// Queues a user for a book none of whose copies is `Available`.
pub async fn create_reservation(
    db: &DatabaseConnection,
    library_id: i32,
    policy: &CirculationPolicy,
    new: NewReservation,
) -> Result<reservation::Model, DomainError> {
    let now = Utc::now();
    let reservation_date = new.reservation_date.unwrap_or(now);
    let candidate = reservation::Model {
        id: 0,
        library_id,
        user_id: new.user_id,
        book_id: new.book_id,
        reservation_date,
        expiration_date: new.expiration_date.unwrap_or_else(|| {
            reservation_date + Duration::days(i64::from(policy.reservation_days))
        }),
        status: new.status.unwrap_or(ReservationStatus::Pending),
        priority: new.priority.unwrap_or(DEFAULT_PRIORITY),
        notified: false,
        created_at: String::new(),
        updated_at: String::new(),
    };

    validate_reservation(&candidate)?;

    let txn = db.begin().await?;
    let reservations = ReservationRepository::new(&txn, library_id);

    let user = UserRepository::new(&txn, library_id)
        .find_by_id(candidate.user_id)
        .await?
        .ok_or_else(|| DomainError::rule("Usuario no encontrado"))?;
    if user.status != UserStatus::Active {
        return Err(DomainError::rule("El usuario no está activo"));
    }

    // A failed lookup counts as "no fines"
    match FineRepository::new(&txn, library_id)
        .count_pending_for_user(user.id)
        .await
    {
        Ok(0) => {}
        Ok(_) => return Err(DomainError::rule("El usuario tiene multas pendientes")),
        Err(e) => tracing::warn!("Pending fine lookup for user {} failed: {}", user.id, e),
    }

    if BookRepository::new(&txn, library_id)
        .find_by_id(candidate.book_id)
        .await?
        .is_none()
    {
        return Err(DomainError::rule("Libro no encontrado"));
    }

    if reservations
        .find_open_for(candidate.user_id, candidate.book_id, None)
        .await?
        .is_some()
    {
        return Err(DomainError::rule(DUPLICATE_MESSAGE));
    }

    let available = CopyRepository::new(&txn, library_id)
        .count_by_book_and_status(candidate.book_id, CopyStatus::Available)
        .await?;
    if available > 0 {
        tracing::debug!(
            "Book {} has {} available copies, reservation refused",
            candidate.book_id,
            available
        );
        return Err(DomainError::rule(COPIES_AVAILABLE_MESSAGE));
    }

    let created = reservations.create(&candidate).await?;
    txn.commit().await?;

    tracing::info!(
        "Reservation {} created in library {}: book {} for user {} (priority {})",
        created.id,
        library_id,
        created.book_id,
        created.user_id,
        created.priority
    );
    Ok(created)
}

pub async fn cancel_reservation(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<reservation::Model, DomainError> {
    transition(db, library_id, id, ReservationStatus::Cancelled).await
}

/// The reserving user picked the book up.
pub async fn process_reservation(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<reservation::Model, DomainError> {
    transition(db, library_id, id, ReservationStatus::Completed).await
}

async fn transition(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
    next: ReservationStatus,
) -> Result<reservation::Model, DomainError> {
    let txn = db.begin().await?;
    let reservations = ReservationRepository::new(&txn, library_id);

    let mut reservation = reservations
        .find_by_id(id)
        .await?
        .ok_or_else(|| reservation_not_found(id))?;

    match (reservation.status, next) {
        (ReservationStatus::Pending | ReservationStatus::Active, ReservationStatus::Cancelled) => {}
        (ReservationStatus::Active, ReservationStatus::Completed) => {}
        (_, ReservationStatus::Cancelled) => {
            return Err(DomainError::rule(
                "Solo se pueden cancelar reservaciones pendientes o activas",
            ));
        }
        _ => {
            return Err(DomainError::rule(
                "Solo se pueden procesar reservaciones activas",
            ));
        }
    }

    reservation.status = next;
    let updated = reservations.update(&reservation).await?;
    txn.commit().await?;

    tracing::info!("Reservation {} in library {} is now {:?}", id, library_id, next);
    Ok(updated)
}

/// Notifies the head of a book's queue once a copy is back on the shelf.
///
/// The first `Pending`, unexpired reservation in serving order becomes
/// `Active` with `notified` set. Returns `None` when nobody is waiting.
pub async fn offer_next_reservation(
    db: &DatabaseConnection,
    library_id: i32,
    book_id: i32,
) -> Result<Option<reservation::Model>, DomainError> {
    let now = Utc::now();
    let txn = db.begin().await?;

    if BookRepository::new(&txn, library_id)
        .find_by_id(book_id)
        .await?
        .is_none()
    {
        return Err(DomainError::not_found(format!(
            "Libro con ID {} no encontrado",
            book_id
        )));
    }

    let available = CopyRepository::new(&txn, library_id)
        .count_by_book_and_status(book_id, CopyStatus::Available)
        .await?;
    if available == 0 {
        return Err(DomainError::rule("No hay copias disponibles del libro"));
    }

    let reservations = ReservationRepository::new(&txn, library_id);
    let queue = reservations
        .find_filtered(&ReservationFilter {
            book_id: Some(book_id),
            status: Some(ReservationStatus::Pending),
            ..Default::default()
        })
        .await?;

    let Some(mut next) = queue.into_iter().find(|r| r.expiration_date > now) else {
        tracing::debug!("No pending reservation for book {}", book_id);
        return Ok(None);
    };

    next.status = ReservationStatus::Active;
    next.notified = true;
    let offered = reservations.update(&next).await?;
    txn.commit().await?;

    tracing::info!(
        "Reservation {} for book {} offered to user {} in library {}",
        offered.id,
        book_id,
        offered.user_id,
        library_id
    );
    Ok(Some(offered))
}

pub async fn update_reservation(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
    update: ReservationUpdate,
) -> Result<reservation::Model, DomainError> {
    let txn = db.begin().await?;
    let reservations = ReservationRepository::new(&txn, library_id);

    let mut reservation = reservations
        .find_by_id(id)
        .await?
        .ok_or_else(|| reservation_not_found(id))?;

    if let Some(expiration_date) = update.expiration_date {
        reservation.expiration_date = expiration_date;
    }
    if let Some(status) = update.status {
        reservation.status = status;
    }
    if let Some(priority) = update.priority {
        reservation.priority = priority;
    }
    if let Some(notified) = update.notified {
        reservation.notified = notified;
    }
    validate_reservation(&reservation)?;

    if reservation.status.is_open()
        && reservations
            .find_open_for(reservation.user_id, reservation.book_id, Some(id))
            .await?
            .is_some()
    {
        return Err(DomainError::rule(DUPLICATE_MESSAGE));
    }

    let updated = reservations.update(&reservation).await?;
    txn.commit().await?;

    tracing::info!("Reservation {} updated in library {}", id, library_id);
    Ok(updated)
}

pub async fn delete_reservation(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<(), DomainError> {
    ReservationRepository::new(db, library_id).delete(id).await?;
    tracing::info!("Reservation {} deleted from library {}", id, library_id);
    Ok(())
}
