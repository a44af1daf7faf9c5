//! Per-library circulation policy.
//!
//! Loaded from the `configurations` table by `services::configuration_service`
//! and handed explicitly to the coordinators.

use serde::{Deserialize, Serialize};

use crate::models::configuration;
use crate::models::user::UserType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CirculationPolicy {
    pub student_loan_days: i32,
    pub teacher_loan_days: i32,
    pub max_renewals: i32,
    pub max_books_per_loan: i32,
    pub fine_per_day: f64,
    pub reservation_days: i32,
    pub grace_days: i32,
}

impl Default for CirculationPolicy {
    fn default() -> Self {
        Self {
            student_loan_days: 15,
            teacher_loan_days: 30,
            max_renewals: 2,
            max_books_per_loan: 5,
            fine_per_day: 0.50,
            reservation_days: 3,
            grace_days: 2,
        }
    }
}

impl CirculationPolicy {
    /// Loan-day quota granted to a borrower of the given type.
    pub fn loan_days_for(&self, user_type: UserType) -> i32 {
        match user_type {
            UserType::Teacher => self.teacher_loan_days,
            UserType::Student | UserType::Staff | UserType::External => self.student_loan_days,
        }
    }

    pub fn late_fee(&self, days_late: i64) -> f64 {
        days_late as f64 * self.fine_per_day
    }
}

impl From<configuration::Model> for CirculationPolicy {
    fn from(model: configuration::Model) -> Self {
        Self {
            student_loan_days: model.student_loan_days,
            teacher_loan_days: model.teacher_loan_days,
            max_renewals: model.max_renewals,
            max_books_per_loan: model.max_books_per_loan,
            fine_per_day: model.fine_per_day,
            reservation_days: model.reservation_days,
            grace_days: model.grace_days,
        }
    }
}
