//! Catalog Service - users, books and copies
//!
//! Plain create/get/list over the tenant's catalog. Deletion is guarded by
//! circulation state: nothing that is lent out, queued for, or owed on can
//! be removed.

use chrono::Utc;
use sea_orm::{DatabaseConnection, TransactionTrait};

use crate::domain::{CopyFilter, DomainError, FineFilter, LoanFilter};
use crate::infrastructure::repositories::{
    BookRepository, CopyRepository, FineRepository, LoanRepository, ReservationRepository,
    UserRepository,
};
use crate::models::copy::{self, CopyCondition, CopyStatus, NewCopy};
use crate::models::user::{self, NewUser, UserStatus};
use crate::models::{book, Book};

fn require(value: &str, message: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(message));
    }
    Ok(())
}

// --- Users ---

pub async fn list_users(
    db: &DatabaseConnection,
    library_id: i32,
) -> Result<Vec<user::Model>, DomainError> {
    UserRepository::new(db, library_id).find_all().await
}

pub async fn get_user(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<user::Model, DomainError> {
    UserRepository::new(db, library_id)
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Usuario con ID {} no encontrado", id)))
}

pub async fn create_user(
    db: &DatabaseConnection,
    library_id: i32,
    new: NewUser,
) -> Result<user::Model, DomainError> {
    require(&new.code, "El código del usuario es requerido")?;
    require(&new.dni, "El DNI del usuario es requerido")?;
    require(&new.first_name, "El nombre del usuario es requerido")?;
    require(&new.last_name, "El apellido del usuario es requerido")?;

    let users = UserRepository::new(db, library_id);
    let code = new.code.trim().to_string();
    let dni = new.dni.trim().to_string();
    if users.find_by_code(&code).await?.is_some() {
        return Err(DomainError::rule("El código de usuario ya existe"));
    }
    if users.find_by_dni(&dni).await?.is_some() {
        return Err(DomainError::rule("El DNI ya está registrado"));
    }

    let now = Utc::now();
    let created = users
        .create(&user::Model {
            id: 0,
            library_id,
            code,
            dni,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            phone: new.phone,
            user_type: new.user_type,
            status: new.status.unwrap_or(UserStatus::Active),
            registration_date: now,
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await?;

    tracing::info!("User {} created in library {}", created.id, library_id);
    Ok(created)
}

/// Refused while the user holds an open loan or a pending fine. Their
/// reservations go with them.
pub async fn delete_user(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<(), DomainError> {
    let txn = db.begin().await?;
    let users = UserRepository::new(&txn, library_id);

    if users.find_by_id(id).await?.is_none() {
        return Err(DomainError::not_found(format!(
            "Usuario con ID {} no encontrado",
            id
        )));
    }

    let loans = LoanRepository::new(&txn, library_id)
        .find_filtered(&LoanFilter {
            user_id: Some(id),
            ..Default::default()
        })
        .await?;
    if loans.iter().any(|l| l.status.is_open()) {
        return Err(DomainError::rule(
            "No se puede eliminar el usuario: tiene préstamos activos o vencidos",
        ));
    }

    let pending = FineRepository::new(&txn, library_id)
        .find_filtered(&FineFilter::pending_for_user(id))
        .await?;
    if !pending.is_empty() {
        return Err(DomainError::rule(
            "No se puede eliminar el usuario: tiene multas pendientes",
        ));
    }

    let removed = ReservationRepository::new(&txn, library_id)
        .delete_for_user(id)
        .await?;
    users.delete(id).await?;
    txn.commit().await?;

    tracing::info!(
        "User {} deleted from library {} with {} reservations",
        id,
        library_id,
        removed
    );
    Ok(())
}

// --- Books ---

pub async fn list_books(
    db: &DatabaseConnection,
    library_id: i32,
) -> Result<Vec<Book>, DomainError> {
    let books = BookRepository::new(db, library_id).find_all().await?;
    Ok(books.into_iter().map(Book::from).collect())
}

pub async fn get_book(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<book::Model, DomainError> {
    BookRepository::new(db, library_id)
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Libro con ID {} no encontrado", id)))
}

pub async fn create_book(
    db: &DatabaseConnection,
    library_id: i32,
    book: Book,
) -> Result<book::Model, DomainError> {
    require(&book.title, "El título del libro es requerido")?;

    let created = BookRepository::new(db, library_id).create(&book).await?;
    tracing::info!("Book {} created in library {}", created.id, library_id);
    Ok(created)
}

/// Refused while a copy is lent out or the book has an open reservation.
pub async fn delete_book(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<(), DomainError> {
    let txn = db.begin().await?;
    let books = BookRepository::new(&txn, library_id);

    if books.find_by_id(id).await?.is_none() {
        return Err(DomainError::not_found(format!(
            "Libro con ID {} no encontrado",
            id
        )));
    }

    let borrowed = CopyRepository::new(&txn, library_id)
        .count_by_book_and_status(id, CopyStatus::Borrowed)
        .await?;
    if borrowed > 0 {
        return Err(DomainError::rule(
            "No se puede eliminar el libro: tiene copias prestadas",
        ));
    }

    let queued = ReservationRepository::new(&txn, library_id)
        .count_open_for_book(id)
        .await?;
    if queued > 0 {
        return Err(DomainError::rule(
            "No se puede eliminar el libro: tiene reservaciones pendientes o activas",
        ));
    }

    books.delete(id).await?;
    txn.commit().await?;

    tracing::info!("Book {} deleted from library {}", id, library_id);
    Ok(())
}

// --- Copies ---

pub async fn list_copies(
    db: &DatabaseConnection,
    library_id: i32,
    filter: &CopyFilter,
) -> Result<Vec<copy::Model>, DomainError> {
    CopyRepository::new(db, library_id).find_filtered(filter).await
}

pub async fn get_copy(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<copy::Model, DomainError> {
    CopyRepository::new(db, library_id)
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("Copia con ID {} no encontrada", id)))
}

pub async fn create_copy(
    db: &DatabaseConnection,
    library_id: i32,
    new: NewCopy,
) -> Result<copy::Model, DomainError> {
    require(&new.code, "El código de la copia es requerido")?;
    let status = new.status.unwrap_or(CopyStatus::Available);
    // Borrowed and Reserved are only reached through a loan or a reservation
    if matches!(status, CopyStatus::Borrowed | CopyStatus::Reserved) {
        return Err(DomainError::validation(format!(
            "Una copia nueva no puede crearse con estado {:?}",
            status
        )));
    }

    if BookRepository::new(db, library_id)
        .find_by_id(new.book_id)
        .await?
        .is_none()
    {
        return Err(DomainError::rule("Libro no encontrado"));
    }

    let copies = CopyRepository::new(db, library_id);
    let code = new.code.trim().to_string();
    if copies.find_by_code(&code).await?.is_some() {
        return Err(DomainError::rule("El código de la copia ya existe"));
    }

    let created = copies
        .create(&copy::Model {
            id: 0,
            library_id,
            book_id: new.book_id,
            code,
            status,
            condition: new.condition.unwrap_or(CopyCondition::Good),
            acquisition_date: new.acquisition_date,
            notes: new.notes,
            created_at: String::new(),
            updated_at: String::new(),
        })
        .await?;

    tracing::info!(
        "Copy {} of book {} created in library {}",
        created.id,
        created.book_id,
        library_id
    );
    Ok(created)
}

/// Refused while the copy is `Borrowed` or an open loan still points at it.
pub async fn delete_copy(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<(), DomainError> {
    let txn = db.begin().await?;
    let copies = CopyRepository::new(&txn, library_id);

    let copy = copies.find_by_id(id).await?.ok_or_else(|| {
        DomainError::not_found(format!("Copia con ID {} no encontrada", id))
    })?;
    if copy.status == CopyStatus::Borrowed {
        return Err(DomainError::rule(
            "No se puede eliminar la copia: está prestada",
        ));
    }

    let loans = LoanRepository::new(&txn, library_id)
        .find_filtered(&LoanFilter {
            copy_id: Some(id),
            ..Default::default()
        })
        .await?;
    if loans.iter().any(|l| l.status.is_open()) {
        return Err(DomainError::rule(
            "No se puede eliminar la copia: tiene préstamos activos o vencidos",
        ));
    }

    copies.delete(id).await?;
    txn.commit().await?;

    tracing::info!("Copy {} deleted from library {}", id, library_id);
    Ok(())
}
