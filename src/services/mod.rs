//! Services Layer
//!
//! The circulation coordinators and the catalog/configuration services.
//! Handlers resolve the tenant and policy, then call straight into these.

pub mod catalog_service;
pub mod configuration_service;
pub mod fine_service;
pub mod loan_service;
pub mod reservation_service;

pub use loan_service::{FineOutcome, ReturnOutcome};
