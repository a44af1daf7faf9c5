use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::configuration::get_configuration,
        api::configuration::update_configuration,
        api::loan::list_loans,
        api::loan::create_loan,
        api::loan::get_loan,
        api::loan::update_loan,
        api::loan::delete_loan,
        api::loan::renew_loan,
        api::loan::return_loan,
        api::reservation::list_reservations,
        api::reservation::create_reservation,
        api::reservation::get_reservation,
        api::reservation::update_reservation,
        api::reservation::delete_reservation,
        api::reservation::cancel_reservation,
        api::reservation::process_reservation,
        api::reservation::offer_next_reservation,
        api::fine::list_fines,
        api::fine::create_fine,
        api::fine::get_fine,
        api::fine::update_fine,
        api::fine::delete_fine,
        api::fine::pay_fine,
        api::fine::waive_fine,
        api::catalog::list_users,
        api::catalog::create_user,
        api::catalog::get_user,
        api::catalog::delete_user,
        api::catalog::list_books,
        api::catalog::create_book,
        api::catalog::get_book,
        api::catalog::delete_book,
        api::catalog::list_copies,
        api::catalog::create_copy,
        api::catalog::get_copy,
        api::catalog::delete_copy,
    ),
    tags(
        (name = "biblio-circulation", description = "Library circulation API")
    )
)]
pub struct ApiDoc;
