//! Filter criteria for the tenant-scoped repositories.
//!
//! Every field is optional; an empty filter matches everything in the library.

use serde::Deserialize;

use crate::models::copy::CopyStatus;
use crate::models::fine::FineStatus;
use crate::models::loan::LoanStatus;
use crate::models::reservation::ReservationStatus;

/// Filter criteria for loan queries
#[derive(Debug, Default, Clone)]
pub struct LoanFilter {
    pub code: Option<String>,
    pub user_id: Option<i32>,
    pub copy_id: Option<i32>,
    pub status: Option<LoanStatus>,
    /// `status = Overdue`, or `status = Active AND due_date < now`
    pub overdue: bool,
}

impl LoanFilter {
    pub fn overdue_for_user(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
            overdue: true,
            ..Default::default()
        }
    }
}

/// Filter criteria for reservation queries
#[derive(Debug, Default, Clone)]
pub struct ReservationFilter {
    pub user_id: Option<i32>,
    pub book_id: Option<i32>,
    pub status: Option<ReservationStatus>,
    /// `status IN (Pending, Active) AND expiration_date < now`
    pub expired: bool,
}

/// Filter criteria for fine queries
#[derive(Debug, Default, Clone)]
pub struct FineFilter {
    pub user_id: Option<i32>,
    pub loan_id: Option<i32>,
    pub status: Option<FineStatus>,
    /// Shorthand for `status = Pending`
    pub pending: bool,
}

impl FineFilter {
    pub fn pending_for_user(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
            pending: true,
            ..Default::default()
        }
    }
}

/// Filter criteria for copy queries
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CopyFilter {
    pub book_id: Option<i32>,
    pub status: Option<CopyStatus>,
}
