//! Domain layer - circulation abstractions
//!
//! Error type, repository filters, the per-library policy value object and
//! the pure validation rules. Nothing here touches the database or HTTP.

pub mod errors;
pub mod filters;
pub mod policy;
pub mod rules;

pub use errors::DomainError;
pub use filters::*;
pub use policy::CirculationPolicy;
