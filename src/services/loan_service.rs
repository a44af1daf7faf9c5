//! Loan Coordinator - creation, renewal, return and administration of loans
//!
//! Every operation that touches more than one row runs inside a single
//! transaction: the copy status and the loan record change together or not
//! at all. The late-return fine is the one exception: it is generated after
//! the return commits and its outcome is reported in [`ReturnOutcome`].

use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;

use crate::domain::rules::{validate_loan, validate_loan_date, validate_loan_renewal};
use crate::domain::{CirculationPolicy, DomainError, LoanFilter};
use crate::infrastructure::repositories::{
    CopyRepository, FineRepository, LoanRepository, UserRepository,
};
use crate::models::copy::CopyStatus;
use crate::models::fine;
use crate::models::loan::{self, LoanStatus, LoanUpdate, NewLoan};
use crate::models::user::{UserStatus, UserType};
use crate::services::fine_service;

pub const OVERDUE_LOANS_MESSAGE: &str =
    "El usuario tiene préstamos vencidos, no puede realizar nuevos préstamos";
pub const PENDING_FINES_MESSAGE: &str = "El usuario tiene multas pendientes";

/// Result of a return. The return itself always succeeded; `fine` says what
/// happened to the late-return fine.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnOutcome {
    pub loan: loan::Model,
    pub fine: FineOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum FineOutcome {
    /// Returned on time
    NotLate,
    Created(fine::Model),
    /// The fine could not be stored; the return stands
    Failed(String),
}

fn loan_not_found(id: i32) -> DomainError {
    DomainError::not_found(format!("Préstamo con ID {} no encontrado", id))
}

pub async fn list_loans(
    db: &DatabaseConnection,
    library_id: i32,
    filter: &LoanFilter,
) -> Result<Vec<loan::Model>, DomainError> {
    LoanRepository::new(db, library_id).find_filtered(filter).await
}

pub async fn get_loan(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<loan::Model, DomainError> {
    LoanRepository::new(db, library_id)
        .find_by_id(id)
        .await?
        .ok_or_else(|| loan_not_found(id))
}

/// Lends a copy to a user.
///
/// Preconditions, first failure wins: structural validity, active user,
/// available copy, no overdue loans, no pending fines, unused loan code.
/// The copy moves `Available -> Borrowed` through a guarded update in the
/// same transaction as the insert.
pub async fn create_loan(
    db: &DatabaseConnection,
    library_id: i32,
    policy: &CirculationPolicy,
    new: NewLoan,
) -> Result<loan::Model, DomainError> {
    let now = Utc::now();
    let txn = db.begin().await?;

    let users = UserRepository::new(&txn, library_id);
    let copies = CopyRepository::new(&txn, library_id);
    let loans = LoanRepository::new(&txn, library_id);

    let user = users.find_by_id(new.user_id).await?;

    let loan_days = new.loan_days.unwrap_or_else(|| {
        policy.loan_days_for(user.as_ref().map_or(UserType::Student, |u| u.user_type))
    });
    let loan_date = new.loan_date.unwrap_or(now);
    let due_date = new
        .due_date
        .unwrap_or_else(|| loan_date + Duration::days(i64::from(loan_days)));

    let candidate = loan::Model {
        id: 0,
        library_id,
        loan_code: new.loan_code.trim().to_string(),
        user_id: new.user_id,
        copy_id: new.copy_id,
        loan_date,
        due_date,
        return_date: None,
        status: LoanStatus::Active,
        loan_days,
        renewals: 0,
        notes: new.notes,
        librarian_id: new.librarian_id,
        created_at: String::new(),
        updated_at: String::new(),
    };

    // 1. Structure
    validate_loan(&candidate)?;
    validate_loan_date(candidate.loan_date, now)?;

    // 2. Borrower
    let user = user.ok_or_else(|| DomainError::rule("Usuario no encontrado"))?;
    if user.status != UserStatus::Active {
        tracing::debug!("User {} is {:?}, loan refused", user.id, user.status);
        return Err(DomainError::rule("El usuario no está activo"));
    }

    // 3. Copy
    let copy = copies
        .find_by_id(candidate.copy_id)
        .await?
        .ok_or_else(|| DomainError::rule("Copia no encontrada"))?;
    if copy.status != CopyStatus::Available {
        tracing::debug!("Copy {} is {:?}, loan refused", copy.id, copy.status);
        return Err(DomainError::rule("La copia no está disponible para préstamo"));
    }

    // 4. Overdue loans
    let overdue = loans
        .find_filtered(&LoanFilter::overdue_for_user(user.id))
        .await?;
    if !overdue.is_empty() {
        tracing::debug!("User {} holds {} overdue loans", user.id, overdue.len());
        return Err(DomainError::rule(OVERDUE_LOANS_MESSAGE));
    }

    // 5. Pending fines
    if FineRepository::new(&txn, library_id)
        .count_pending_for_user(user.id)
        .await?
        > 0
    {
        return Err(DomainError::rule(PENDING_FINES_MESSAGE));
    }

    // 6. Code
    if loans.find_by_code(&candidate.loan_code).await?.is_some() {
        return Err(DomainError::rule("El código de préstamo ya existe"));
    }

    let created = loans.create(&candidate).await?;
    if !copies
        .transition_status(copy.id, CopyStatus::Available, CopyStatus::Borrowed)
        .await?
    {
        // Lost the race for the copy; dropping the transaction discards the loan
        return Err(DomainError::rule("La copia no está disponible para préstamo"));
    }
    txn.commit().await?;

    tracing::info!(
        "Loan {} ({}) created in library {}: copy {} to user {}",
        created.id,
        created.loan_code,
        library_id,
        created.copy_id,
        created.user_id
    );
    Ok(created)
}

/// Extends an active loan by its own quota of days.
pub async fn renew_loan(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
    librarian_id: Option<i32>,
) -> Result<loan::Model, DomainError> {
    let now = Utc::now();
    let txn = db.begin().await?;
    let loans = LoanRepository::new(&txn, library_id);

    let mut loan = loans.find_by_id(id).await?.ok_or_else(|| loan_not_found(id))?;

    validate_loan_renewal(&loan, now)?;

    if FineRepository::new(&txn, library_id)
        .count_pending_for_user(loan.user_id)
        .await?
        > 0
    {
        return Err(DomainError::rule(PENDING_FINES_MESSAGE));
    }

    loan.renewals += 1;
    loan.due_date += Duration::days(i64::from(loan.loan_days));
    if librarian_id.is_some() {
        loan.librarian_id = librarian_id;
    }
    validate_loan(&loan)?;

    let renewed = loans.update(&loan).await?;
    txn.commit().await?;

    tracing::info!(
        "Loan {} renewed in library {} ({} renewals, due {})",
        id,
        library_id,
        renewed.renewals,
        renewed.due_date
    );
    Ok(renewed)
}

/// Closes a loan and puts its copy back on the shelf. A late return then
/// generates a `Pending` fine of `days_late * fine_per_day`.
pub async fn return_loan(
    db: &DatabaseConnection,
    library_id: i32,
    policy: &CirculationPolicy,
    id: i32,
    notes: Option<String>,
) -> Result<ReturnOutcome, DomainError> {
    let now = Utc::now();
    let txn = db.begin().await?;
    let loans = LoanRepository::new(&txn, library_id);

    let mut loan = loans.find_by_id(id).await?.ok_or_else(|| loan_not_found(id))?;
    if !loan.status.is_open() {
        tracing::debug!("Loan {} is {:?}, return refused", id, loan.status);
        return Err(DomainError::rule("Solo se pueden devolver préstamos activos"));
    }

    loan.status = LoanStatus::Returned;
    loan.return_date = Some(now);
    if notes.is_some() {
        loan.notes = notes;
    }
    validate_loan(&loan)?;

    let returned = loans.update(&loan).await?;
    CopyRepository::new(&txn, library_id)
        .set_status(returned.copy_id, CopyStatus::Available)
        .await?;
    txn.commit().await?;

    tracing::info!(
        "Loan {} returned in library {}, copy {} available",
        id,
        library_id,
        returned.copy_id
    );

    let days_late = returned.days_past_due(now);
    let fine = if days_late > 0 {
        match fine_service::create_late_return_fine(db, library_id, policy, &returned, days_late)
            .await
        {
            Ok(fine) => FineOutcome::Created(fine),
            Err(e) => {
                tracing::warn!("Late return fine for loan {} not created: {}", id, e);
                FineOutcome::Failed(e.to_string())
            }
        }
    } else {
        FineOutcome::NotLate
    };

    Ok(ReturnOutcome {
        loan: returned,
        fine,
    })
}

/// Administrative correction of a loan. Status moves are limited to
/// [`LoanStatus::can_become`]; marking a loan `Lost` marks its copy `Lost`.
pub async fn update_loan(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
    update: LoanUpdate,
) -> Result<loan::Model, DomainError> {
    let txn = db.begin().await?;
    let loans = LoanRepository::new(&txn, library_id);

    let mut loan = loans.find_by_id(id).await?.ok_or_else(|| loan_not_found(id))?;
    let previous = loan.status;

    if let Some(status) = update.status {
        if !previous.can_become(status) {
            return Err(DomainError::rule(format!(
                "No se puede cambiar el estado del préstamo de {:?} a {:?}",
                previous, status
            )));
        }
        loan.status = status;
    }
    if let Some(loan_date) = update.loan_date {
        validate_loan_date(loan_date, Utc::now())?;
        loan.loan_date = loan_date;
    }
    if let Some(due_date) = update.due_date {
        loan.due_date = due_date;
    }
    if let Some(loan_days) = update.loan_days {
        loan.loan_days = loan_days;
    }
    if let Some(renewals) = update.renewals {
        loan.renewals = renewals;
    }
    if update.notes.is_some() {
        loan.notes = update.notes;
    }
    if update.librarian_id.is_some() {
        loan.librarian_id = update.librarian_id;
    }
    validate_loan(&loan)?;

    let updated = loans.update(&loan).await?;
    if previous != LoanStatus::Lost && updated.status == LoanStatus::Lost {
        CopyRepository::new(&txn, library_id)
            .set_status(updated.copy_id, CopyStatus::Lost)
            .await?;
    }
    txn.commit().await?;

    tracing::info!("Loan {} updated in library {}", id, library_id);
    Ok(updated)
}

/// Removes the loan record only; the copy and any fines are left as they are.
pub async fn delete_loan(
    db: &DatabaseConnection,
    library_id: i32,
    id: i32,
) -> Result<(), DomainError> {
    LoanRepository::new(db, library_id).delete(id).await?;
    tracing::info!("Loan {} deleted from library {}", id, library_id);
    Ok(())
}
