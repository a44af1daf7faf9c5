//! Per-library circulation configuration

use sea_orm::{ConnectionTrait, DatabaseConnection};

use crate::domain::rules::{MAX_LOAN_DAYS, MIN_LOAN_DAYS};
use crate::domain::{CirculationPolicy, DomainError};
use crate::infrastructure::repositories::ConfigurationRepository;
use crate::models::configuration::ConfigurationUpdate;

/// The library's policy, or the defaults when it has never been configured.
pub async fn load_policy<C: ConnectionTrait>(
    db: &C,
    library_id: i32,
) -> Result<CirculationPolicy, DomainError> {
    Ok(ConfigurationRepository::new(db, library_id)
        .find()
        .await?
        .map(CirculationPolicy::from)
        .unwrap_or_default())
}

fn validate_policy(policy: &CirculationPolicy) -> Result<(), DomainError> {
    let loan_days = MIN_LOAN_DAYS..=MAX_LOAN_DAYS;
    if !loan_days.contains(&policy.student_loan_days)
        || !loan_days.contains(&policy.teacher_loan_days)
    {
        return Err(DomainError::validation(
            "Los días de préstamo deben estar entre 1 y 90",
        ));
    }
    if policy.reservation_days < 1 {
        return Err(DomainError::validation(
            "Los días de reservación deben ser al menos 1",
        ));
    }
    if policy.max_books_per_loan < 1 {
        return Err(DomainError::validation(
            "El máximo de libros por préstamo debe ser al menos 1",
        ));
    }
    if policy.max_renewals < 0 || policy.grace_days < 0 {
        return Err(DomainError::validation(
            "Las renovaciones y los días de gracia no pueden ser negativos",
        ));
    }
    if !policy.fine_per_day.is_finite() || policy.fine_per_day < 0.0 {
        return Err(DomainError::validation(
            "La multa por día no puede ser negativa",
        ));
    }
    Ok(())
}

pub async fn get_configuration(
    db: &DatabaseConnection,
    library_id: i32,
) -> Result<CirculationPolicy, DomainError> {
    load_policy(db, library_id).await
}

/// Applies the given fields over the current policy and stores the result.
pub async fn update_configuration(
    db: &DatabaseConnection,
    library_id: i32,
    update: ConfigurationUpdate,
) -> Result<CirculationPolicy, DomainError> {
    let mut policy = load_policy(db, library_id).await?;

    if let Some(v) = update.student_loan_days {
        policy.student_loan_days = v;
    }
    if let Some(v) = update.teacher_loan_days {
        policy.teacher_loan_days = v;
    }
    if let Some(v) = update.max_renewals {
        policy.max_renewals = v;
    }
    if let Some(v) = update.max_books_per_loan {
        policy.max_books_per_loan = v;
    }
    if let Some(v) = update.fine_per_day {
        policy.fine_per_day = v;
    }
    if let Some(v) = update.reservation_days {
        policy.reservation_days = v;
    }
    if let Some(v) = update.grace_days {
        policy.grace_days = v;
    }
    validate_policy(&policy)?;

    let stored = ConfigurationRepository::new(db, library_id)
        .upsert(&policy)
        .await?;
    tracing::info!("Configuration of library {} updated", library_id);
    Ok(CirculationPolicy::from(stored))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        assert!(validate_policy(&CirculationPolicy::default()).is_ok());
    }

    #[test]
    fn test_policy_bounds() {
        let mut policy = CirculationPolicy::default();
        policy.fine_per_day = -0.5;
        assert!(validate_policy(&policy).is_err());

        let mut policy = CirculationPolicy::default();
        policy.teacher_loan_days = 0;
        assert!(validate_policy(&policy).is_err());

        let mut policy = CirculationPolicy::default();
        policy.reservation_days = 0;
        assert!(validate_policy(&policy).is_err());

        let mut policy = CirculationPolicy::default();
        policy.grace_days = 0;
        policy.fine_per_day = 0.0;
        assert!(validate_policy(&policy).is_ok());
    }
}
