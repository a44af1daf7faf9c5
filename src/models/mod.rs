pub mod book;
pub mod configuration;
pub mod copy;
pub mod fine;
pub mod library;
pub mod loan;
pub mod reservation;
pub mod user;

pub use book::Book;
