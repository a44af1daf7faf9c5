pub mod catalog;
pub mod configuration;
pub mod error;
pub mod fine;
pub mod health;
pub mod loan;
pub mod reservation;
pub mod tenant;

use axum::{
    routing::{get, post},
    Router,
};

use crate::infrastructure::AppState;

/// Routes relative to `/api`. Everything but the health check lives under
/// the `/:library_id` tenant segment.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Configuration
        .route(
            "/:library_id/configuration",
            get(configuration::get_configuration).put(configuration::update_configuration),
        )
        // Loans
        .route(
            "/:library_id/loans",
            get(loan::list_loans).post(loan::create_loan),
        )
        .route(
            "/:library_id/loans/:id",
            get(loan::get_loan)
                .put(loan::update_loan)
                .delete(loan::delete_loan),
        )
        .route("/:library_id/loans/:id/renew", post(loan::renew_loan))
        .route("/:library_id/loans/:id/return", post(loan::return_loan))
        // Reservations
        .route(
            "/:library_id/reservations",
            get(reservation::list_reservations).post(reservation::create_reservation),
        )
        .route(
            "/:library_id/reservations/offer/:book_id",
            post(reservation::offer_next_reservation),
        )
        .route(
            "/:library_id/reservations/:id",
            get(reservation::get_reservation)
                .put(reservation::update_reservation)
                .delete(reservation::delete_reservation),
        )
        .route(
            "/:library_id/reservations/:id/cancel",
            post(reservation::cancel_reservation),
        )
        .route(
            "/:library_id/reservations/:id/process",
            post(reservation::process_reservation),
        )
        // Fines
        .route(
            "/:library_id/fines",
            get(fine::list_fines).post(fine::create_fine),
        )
        .route(
            "/:library_id/fines/:id",
            get(fine::get_fine)
                .put(fine::update_fine)
                .delete(fine::delete_fine),
        )
        .route("/:library_id/fines/:id/pay", post(fine::pay_fine))
        .route("/:library_id/fines/:id/waive", post(fine::waive_fine))
        // Catalog
        .route(
            "/:library_id/users",
            get(catalog::list_users).post(catalog::create_user),
        )
        .route(
            "/:library_id/users/:id",
            get(catalog::get_user).delete(catalog::delete_user),
        )
        .route(
            "/:library_id/books",
            get(catalog::list_books).post(catalog::create_book),
        )
        .route(
            "/:library_id/books/:id",
            get(catalog::get_book).delete(catalog::delete_book),
        )
        .route(
            "/:library_id/copies",
            get(catalog::list_copies).post(catalog::create_copy),
        )
        .route(
            "/:library_id/copies/:id",
            get(catalog::get_copy).delete(catalog::delete_copy),
        )
        .with_state(state)
}
