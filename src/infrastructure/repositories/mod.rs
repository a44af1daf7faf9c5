//! Repository implementations using SeaORM
//!
//! Each repository is bound to one library at construction and adds the
//! `library_id` condition to every statement it issues, so a row belonging to
//! another tenant is simply not found. Repositories are generic over
//! `ConnectionTrait` so the coordinators can run them inside a transaction.

pub mod book_repository;
pub mod configuration_repository;
pub mod copy_repository;
pub mod fine_repository;
pub mod loan_repository;
pub mod reservation_repository;
pub mod user_repository;

pub use book_repository::BookRepository;
pub use configuration_repository::ConfigurationRepository;
pub use copy_repository::CopyRepository;
pub use fine_repository::FineRepository;
pub use loan_repository::LoanRepository;
pub use reservation_repository::ReservationRepository;
pub use user_repository::UserRepository;

/// Timestamp format used for `created_at`/`updated_at` columns.
pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
