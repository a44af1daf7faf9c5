//! Fine Coordinator - creation, payment and waiver of fines
//!
//! Fines are the terminal sink of circulation side effects: the loan
//! coordinator creates one on a late return through
//! [`create_late_return_fine`]. A fine starts `Pending` and leaves that state
//! exactly once, to `Paid` or `Waived`.

use chrono::Utc;
use sea_orm::{DatabaseConnection, TransactionTrait};

use crate::domain::rules::validate_fine;
use crate::domain::{CirculationPolicy, DomainError, FineFilter};
use crate::infrastructure::repositories::{FineRepository, LoanRepository, UserRepository};
use crate::models::fine::{self, FineReason, FineStatus, FineUpdate, NewFine};
use crate::models::loan;

fn fine_not_found(id: i32) -> DomainError {
    DomainError::not_found(format!("Multa con ID {} no encontrada", id))
}

pub async fn list_fines(
    db: &DatabaseConnection,
    library_id: i32,
    filter: &FineFilter,
) -> Result<Vec<fine::Model>, DomainError> {
    FineRepository::new(db, library_id).find_filtered(filter).await
}

pub async fn get_fine(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<fine::Model, DomainError> {
    FineRepository::new(db, library_id)
        .find_by_id(id)
        .await?
        .ok_or_else(|| fine_not_found(id))
}

/// Manual fine (damage, loss, or an overdue fine entered by hand).
pub async fn create_fine(
    db: &DatabaseConnection,
    library_id: i32,
    new: NewFine,
) -> Result<fine::Model, DomainError> {
    let now = Utc::now();
    let candidate = fine::Model {
        id: 0,
        library_id,
        user_id: new.user_id,
        loan_id: new.loan_id,
        reason: new.reason,
        amount: new.amount,
        generated_date: now,
        payment_date: None,
        status: FineStatus::Pending,
        notes: new.notes,
        created_at: String::new(),
        updated_at: String::new(),
    };
    validate_fine(&candidate)?;

    let txn = db.begin().await?;

    if UserRepository::new(&txn, library_id)
        .find_by_id(candidate.user_id)
        .await?
        .is_none()
    {
        return Err(DomainError::rule("Usuario no encontrado"));
    }
    if let Some(loan_id) = candidate.loan_id {
        if LoanRepository::new(&txn, library_id)
            .find_by_id(loan_id)
            .await?
            .is_none()
        {
            return Err(DomainError::rule("Préstamo no encontrado"));
        }
    }

    let created = FineRepository::new(&txn, library_id)
        .create(&candidate)
        .await?;
    txn.commit().await?;

    tracing::info!(
        "Fine {} created for user {} in library {} ({:.2})",
        created.id,
        created.user_id,
        library_id,
        created.amount
    );
    Ok(created)
}

/// Fine for a loan returned `days_late` whole days after its due date.
pub async fn create_late_return_fine(
    db: &DatabaseConnection,
    library_id: i32,
    policy: &CirculationPolicy,
    loan: &loan::Model,
    days_late: i64,
) -> Result<fine::Model, DomainError> {
    let now = Utc::now();
    let candidate = fine::Model {
        id: 0,
        library_id,
        user_id: loan.user_id,
        loan_id: Some(loan.id),
        reason: FineReason::Overdue,
        amount: policy.late_fee(days_late),
        generated_date: now,
        payment_date: None,
        status: FineStatus::Pending,
        notes: Some(format!("Devolución tardía ({} días)", days_late)),
        created_at: String::new(),
        updated_at: String::new(),
    };
    validate_fine(&candidate)?;

    let created = FineRepository::new(db, library_id).create(&candidate).await?;
    tracing::info!(
        "Late return fine {} for loan {} in library {}: {} days, {:.2}",
        created.id,
        loan.id,
        library_id,
        days_late,
        created.amount
    );
    Ok(created)
}

pub async fn pay_fine(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
    notes: Option<String>,
) -> Result<fine::Model, DomainError> {
    settle_fine(db, library_id, id, FineStatus::Paid, notes).await
}

pub async fn waive_fine(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
    notes: Option<String>,
) -> Result<fine::Model, DomainError> {
    settle_fine(db, library_id, id, FineStatus::Waived, notes).await
}

/// Moves a `Pending` fine to a terminal status. Only payment stamps a date.
async fn settle_fine(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
    outcome: FineStatus,
    notes: Option<String>,
) -> Result<fine::Model, DomainError> {
    let txn = db.begin().await?;
    let fines = FineRepository::new(&txn, library_id);

    let mut fine = fines.find_by_id(id).await?.ok_or_else(|| fine_not_found(id))?;
    if fine.status != FineStatus::Pending {
        tracing::debug!("Fine {} is {:?}, cannot become {:?}", id, fine.status, outcome);
        return Err(DomainError::rule("La multa no está pendiente"));
    }

    fine.status = outcome;
    if outcome == FineStatus::Paid {
        fine.payment_date = Some(Utc::now());
    }
    if notes.is_some() {
        fine.notes = notes;
    }
    validate_fine(&fine)?;

    let updated = fines.update(&fine).await?;
    txn.commit().await?;

    tracing::info!("Fine {} in library {} is now {:?}", id, library_id, outcome);
    Ok(updated)
}

pub async fn update_fine(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
    update: FineUpdate,
) -> Result<fine::Model, DomainError> {
    let txn = db.begin().await?;
    let fines = FineRepository::new(&txn, library_id);

    let mut fine = fines.find_by_id(id).await?.ok_or_else(|| fine_not_found(id))?;
    if let Some(reason) = update.reason {
        fine.reason = reason;
    }
    if let Some(amount) = update.amount {
        fine.amount = amount;
    }
    if update.notes.is_some() {
        fine.notes = update.notes;
    }
    validate_fine(&fine)?;

    let updated = fines.update(&fine).await?;
    txn.commit().await?;

    tracing::info!("Fine {} updated in library {}", id, library_id);
    Ok(updated)
}

pub async fn delete_fine(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<(), DomainError> {
    FineRepository::new(db, library_id).delete(id).await?;
    tracing::info!("Fine {} deleted from library {}", id, library_id);
    Ok(())
}
