//! Circulation rules - stateless validators.
//!
//! Each validator inspects one record before it is persisted and returns the
//! first violation found as `DomainError::Validation`. Status and reason
//! columns are closed enums, so only dates, ranges and formats are checked.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::DomainError;
use crate::models::{fine, loan, reservation};
use crate::models::loan::LoanStatus;

/// `LOAN-YYYY-NNNN` with a 4 to 6 digit sequence.
static LOAN_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^LOAN-\d{4}-\d{4,6}$").expect("loan code pattern is valid")
});

pub const MIN_LOAN_DAYS: i32 = 1;
pub const MAX_LOAN_DAYS: i32 = 90;
pub const MAX_RENEWALS: i32 = 5;
/// Days past due during which an overdue loan may still be renewed.
pub const RENEWAL_GRACE_DAYS: i64 = 3;
pub const MAX_NOTES_LEN: usize = 1000;
pub const MIN_PRIORITY: i32 = 1;
pub const MAX_PRIORITY: i32 = 10;
pub const MAX_FINE_AMOUNT: f64 = 10_000.0;

fn invalid(msg: &str) -> Result<(), DomainError> {
    Err(DomainError::validation(msg))
}

fn check_notes(notes: Option<&str>) -> Result<(), DomainError> {
    match notes {
        Some(n) if n.chars().count() > MAX_NOTES_LEN => {
            invalid("Las notas no pueden exceder 1000 caracteres")
        }
        _ => Ok(()),
    }
}

pub fn is_valid_loan_code(code: &str) -> bool {
    LOAN_CODE.is_match(code)
}

pub fn validate_loan(loan: &loan::Model) -> Result<(), DomainError> {
    if loan.loan_code.trim().is_empty() {
        return invalid("El código de préstamo es requerido");
    }
    if !is_valid_loan_code(&loan.loan_code) {
        return invalid("El código debe tener el formato LOAN-YYYY-NNNN (ej: LOAN-2024-0001)");
    }
    if loan.user_id <= 0 {
        return invalid("El ID del usuario debe ser un número positivo");
    }
    if loan.copy_id <= 0 {
        return invalid("El ID de la copia debe ser un número positivo");
    }
    if loan.due_date <= loan.loan_date {
        return invalid("La fecha de vencimiento debe ser posterior a la fecha de préstamo");
    }
    if let Some(returned) = loan.return_date {
        if returned < loan.loan_date {
            return invalid("La fecha de devolución no puede ser anterior a la fecha de préstamo");
        }
    }
    if !(MIN_LOAN_DAYS..=MAX_LOAN_DAYS).contains(&loan.loan_days) {
        return invalid("Los días de préstamo deben estar entre 1 y 90");
    }
    if !(0..=MAX_RENEWALS).contains(&loan.renewals) {
        return invalid("Las renovaciones deben estar entre 0 y 5");
    }
    check_notes(loan.notes.as_deref())?;
    if matches!(loan.librarian_id, Some(id) if id <= 0) {
        return invalid("El ID del bibliotecario debe ser un número positivo");
    }
    Ok(())
}

pub fn validate_reservation(reservation: &reservation::Model) -> Result<(), DomainError> {
    if reservation.user_id <= 0 {
        return invalid("El ID del usuario debe ser un número positivo");
    }
    if reservation.book_id <= 0 {
        return invalid("El ID del libro debe ser un número positivo");
    }
    if reservation.expiration_date <= reservation.reservation_date {
        return invalid("La fecha de expiración debe ser posterior a la fecha de reservación");
    }
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&reservation.priority) {
        return invalid("La prioridad debe estar entre 1 y 10");
    }
    Ok(())
}

pub fn validate_fine(fine: &fine::Model) -> Result<(), DomainError> {
    if fine.user_id <= 0 {
        return invalid("El ID del usuario debe ser un número positivo");
    }
    if matches!(fine.loan_id, Some(id) if id <= 0) {
        return invalid("El ID del préstamo debe ser un número positivo");
    }
    if !fine.amount.is_finite() || fine.amount < 0.0 {
        return invalid("El monto no puede ser negativo");
    }
    if fine.amount > MAX_FINE_AMOUNT {
        return invalid("El monto no puede exceder 10,000");
    }
    if let Some(paid) = fine.payment_date {
        if paid < fine.generated_date {
            return invalid("La fecha de pago no puede ser anterior a la fecha de generación");
        }
    }
    check_notes(fine.notes.as_deref())
}

/// A loan cannot start after `now`; its return would then predate it.
pub fn validate_loan_date(loan_date: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), DomainError> {
    if loan_date > now {
        return invalid("La fecha de préstamo no puede ser futura");
    }
    Ok(())
}

/// Renewal eligibility at `now`: the loan is `Active`, below the renewal cap,
/// and when already past due, no more than the grace window late.
pub fn validate_loan_renewal(loan: &loan::Model, now: DateTime<Utc>) -> Result<(), DomainError> {
    if loan.status != LoanStatus::Active {
        return invalid("Solo se pueden renovar préstamos activos");
    }
    if loan.renewals >= MAX_RENEWALS {
        return invalid("Se ha alcanzado el máximo de renovaciones permitidas");
    }
    if loan.is_overdue_at(now) && loan.days_past_due(now) > RENEWAL_GRACE_DAYS {
        return invalid("No se puede renovar un préstamo vencido por más de 3 días");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fine::{FineReason, FineStatus};
    use crate::models::reservation::ReservationStatus;
    use chrono::Duration;

    fn sample_loan(now: DateTime<Utc>) -> loan::Model {
        loan::Model {
            id: 1,
            library_id: 1,
            loan_code: "LOAN-2024-0001".to_string(),
            user_id: 1,
            copy_id: 1,
            loan_date: now - Duration::days(10),
            due_date: now + Duration::days(5),
            return_date: None,
            status: LoanStatus::Active,
            loan_days: 15,
            renewals: 0,
            notes: None,
            librarian_id: None,
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        }
    }

    fn sample_fine(now: DateTime<Utc>) -> fine::Model {
        fine::Model {
            id: 1,
            library_id: 1,
            user_id: 1,
            loan_id: Some(1),
            reason: FineReason::Damage,
            amount: 25.0,
            generated_date: now,
            payment_date: None,
            status: FineStatus::Pending,
            notes: None,
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        }
    }

    #[test]
    fn test_loan_code_format() {
        assert!(is_valid_loan_code("LOAN-2024-0001"));
        assert!(is_valid_loan_code("LOAN-2024-123456"));
        assert!(!is_valid_loan_code("LOAN-24-0001"));
        assert!(!is_valid_loan_code("LOAN-2024-001"));
        assert!(!is_valid_loan_code("loan-2024-0001"));
    }

    #[test]
    fn test_validate_loan_accepts_well_formed_loan() {
        let now = Utc::now();
        assert_eq!(validate_loan(&sample_loan(now)), Ok(()));
    }

    #[test]
    fn test_validate_loan_rejects_due_date_before_loan_date() {
        let now = Utc::now();
        let mut loan = sample_loan(now);
        loan.due_date = loan.loan_date - Duration::hours(1);
        assert!(matches!(validate_loan(&loan), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_validate_loan_ranges() {
        let now = Utc::now();

        let mut loan = sample_loan(now);
        loan.loan_days = 91;
        assert!(validate_loan(&loan).is_err());

        let mut loan = sample_loan(now);
        loan.renewals = 6;
        assert!(validate_loan(&loan).is_err());

        let mut loan = sample_loan(now);
        loan.notes = Some("x".repeat(1001));
        assert!(validate_loan(&loan).is_err());

        let mut loan = sample_loan(now);
        loan.return_date = Some(loan.loan_date - Duration::days(1));
        assert!(validate_loan(&loan).is_err());
    }

    #[test]
    fn test_validate_reservation_priority_and_dates() {
        let now = Utc::now();
        let mut reservation = reservation::Model {
            id: 1,
            library_id: 1,
            user_id: 1,
            book_id: 1,
            reservation_date: now,
            expiration_date: now + Duration::days(3),
            status: ReservationStatus::Pending,
            priority: 5,
            notified: false,
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        };
        assert!(validate_reservation(&reservation).is_ok());

        reservation.priority = 11;
        assert!(validate_reservation(&reservation).is_err());

        reservation.priority = 10;
        reservation.expiration_date = now;
        assert!(validate_reservation(&reservation).is_err());
    }

    #[test]
    fn test_validate_fine_amount_and_payment_date() {
        let now = Utc::now();
        assert!(validate_fine(&sample_fine(now)).is_ok());

        let mut fine = sample_fine(now);
        fine.amount = 10_000.01;
        assert!(validate_fine(&fine).is_err());

        let mut fine = sample_fine(now);
        fine.amount = -1.0;
        assert!(validate_fine(&fine).is_err());

        let mut fine = sample_fine(now);
        fine.payment_date = Some(now - Duration::minutes(1));
        assert!(validate_fine(&fine).is_err());
    }

    #[test]
    fn test_renewal_refused_at_cap_regardless_of_due_date() {
        let now = Utc::now();
        let mut loan = sample_loan(now);
        loan.renewals = 5;
        assert!(validate_loan_renewal(&loan, now).is_err());

        loan.due_date = now - Duration::days(1);
        assert!(validate_loan_renewal(&loan, now).is_err());
    }

    #[test]
    fn test_renewal_grace_window_boundary() {
        let now = Utc::now();
        let mut loan = sample_loan(now);

        loan.due_date = now - Duration::days(3) - Duration::hours(1);
        assert_eq!(validate_loan_renewal(&loan, now), Ok(()));

        loan.due_date = now - Duration::days(4) - Duration::hours(1);
        assert!(validate_loan_renewal(&loan, now).is_err());
    }

    #[test]
    fn test_loan_date_cannot_be_in_the_future() {
        let now = Utc::now();
        assert_eq!(validate_loan_date(now, now), Ok(()));
        assert_eq!(validate_loan_date(now - Duration::days(2), now), Ok(()));
        assert!(matches!(
            validate_loan_date(now + Duration::days(2), now),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_renewal_requires_active_loan() {
        let now = Utc::now();
        let mut loan = sample_loan(now);
        loan.status = LoanStatus::Returned;
        assert!(validate_loan_renewal(&loan, now).is_err());
    }
}
