use biblio_circulation::db;
use biblio_circulation::domain::{CirculationPolicy, DomainError, ReservationFilter};
use biblio_circulation::infrastructure::repositories::CopyRepository;
use biblio_circulation::models::configuration::ConfigurationUpdate;
use biblio_circulation::models::copy::{self, CopyCondition, CopyStatus, NewCopy};
use biblio_circulation::models::fine::{FineReason, FineStatus, NewFine};
use biblio_circulation::models::loan::{LoanStatus, LoanUpdate, NewLoan};
use biblio_circulation::models::reservation::{NewReservation, ReservationStatus, ReservationUpdate};
use biblio_circulation::models::user::{self, UserStatus, UserType};
use biblio_circulation::models::{book, library};
use biblio_circulation::services::loan_service::OVERDUE_LOANS_MESSAGE;
use biblio_circulation::services::reservation_service::COPIES_AVAILABLE_MESSAGE;
use biblio_circulation::services::{
    catalog_service, configuration_service, fine_service, loan_service, reservation_service,
    FineOutcome,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

async fn create_test_library(db: &DatabaseConnection, name: &str) -> i32 {
    let now = Utc::now().to_rfc3339();
    let library = library::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    library.insert(db).await.expect("Failed to create library").id
}

async fn create_test_user(
    db: &DatabaseConnection,
    library_id: i32,
    code: &str,
    user_type: UserType,
    status: UserStatus,
) -> i32 {
    let now = Utc::now();
    let user = user::ActiveModel {
        library_id: Set(library_id),
        code: Set(code.to_string()),
        dni: Set(format!("DNI-{}", code)),
        first_name: Set("Test".to_string()),
        last_name: Set(code.to_string()),
        email: Set(None),
        phone: Set(None),
        user_type: Set(user_type),
        status: Set(status),
        registration_date: Set(now),
        created_at: Set(now.to_rfc3339()),
        updated_at: Set(now.to_rfc3339()),
        ..Default::default()
    };
    user.insert(db).await.expect("Failed to create user").id
}

async fn create_test_book(db: &DatabaseConnection, library_id: i32, title: &str) -> i32 {
    let now = Utc::now().to_rfc3339();
    let book = book::ActiveModel {
        library_id: Set(library_id),
        title: Set(title.to_string()),
        isbn: Set(None),
        publisher: Set(None),
        publication_year: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    book.insert(db).await.expect("Failed to create book").id
}

async fn create_test_copy(
    db: &DatabaseConnection,
    library_id: i32,
    book_id: i32,
    code: &str,
    status: CopyStatus,
) -> i32 {
    let now = Utc::now().to_rfc3339();
    let copy = copy::ActiveModel {
        library_id: Set(library_id),
        book_id: Set(book_id),
        code: Set(code.to_string()),
        status: Set(status),
        condition: Set(CopyCondition::Good),
        acquisition_date: Set(None),
        notes: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    copy.insert(db).await.expect("Failed to create copy").id
}

async fn copy_status(db: &DatabaseConnection, library_id: i32, copy_id: i32) -> CopyStatus {
    catalog_service::get_copy(db, library_id, copy_id)
        .await
        .expect("Copy should exist")
        .status
}

fn new_loan(code: &str, user_id: i32, copy_id: i32) -> NewLoan {
    NewLoan {
        loan_code: code.to_string(),
        user_id,
        copy_id,
        loan_date: None,
        due_date: None,
        loan_days: None,
        notes: None,
        librarian_id: None,
    }
}

/// Loan whose due date lies `overdue_by` in the past.
fn overdue_loan(code: &str, user_id: i32, copy_id: i32, overdue_by: Duration) -> NewLoan {
    let now = Utc::now();
    NewLoan {
        loan_date: Some(now - Duration::days(20)),
        due_date: Some(now - overdue_by),
        ..new_loan(code, user_id, copy_id)
    }
}

fn new_reservation(user_id: i32, book_id: i32) -> NewReservation {
    NewReservation {
        user_id,
        book_id,
        reservation_date: None,
        expiration_date: None,
        status: None,
        priority: None,
    }
}

fn reservation_at(
    user_id: i32,
    book_id: i32,
    priority: i32,
    reservation_date: DateTime<Utc>,
) -> NewReservation {
    NewReservation {
        priority: Some(priority),
        reservation_date: Some(reservation_date),
        ..new_reservation(user_id, book_id)
    }
}

struct Fixture {
    db: DatabaseConnection,
    library_id: i32,
    user_id: i32,
    book_id: i32,
    copy_id: i32,
    policy: CirculationPolicy,
}

/// One library with an active student and a single available copy.
async fn fixture() -> Fixture {
    let db = setup_test_db().await;
    let library_id = create_test_library(&db, "Central").await;
    let user_id =
        create_test_user(&db, library_id, "EST-1", UserType::Student, UserStatus::Active).await;
    let book_id = create_test_book(&db, library_id, "Rayuela").await;
    let copy_id = create_test_copy(&db, library_id, book_id, "CP-1", CopyStatus::Available).await;
    let policy = configuration_service::load_policy(&db, library_id)
        .await
        .expect("Failed to load policy");

    Fixture {
        db,
        library_id,
        user_id,
        book_id,
        copy_id,
        policy,
    }
}

// --- Loans ---

#[tokio::test]
async fn test_create_loan_borrows_copy() {
    let f = fixture().await;

    let loan = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0001", f.user_id, f.copy_id),
    )
    .await
    .expect("Loan should be created");

    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(loan.renewals, 0);
    assert_eq!(loan.loan_days, 15);
    assert_eq!(loan.due_date - loan.loan_date, Duration::days(15));
    assert_eq!(
        copy_status(&f.db, f.library_id, f.copy_id).await,
        CopyStatus::Borrowed
    );
}

#[tokio::test]
async fn test_teacher_gets_teacher_loan_days() {
    let f = fixture().await;
    let teacher =
        create_test_user(&f.db, f.library_id, "DOC-1", UserType::Teacher, UserStatus::Active)
            .await;

    let loan = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0002", teacher, f.copy_id),
    )
    .await
    .expect("Loan should be created");

    assert_eq!(loan.loan_days, 30);
}

#[tokio::test]
async fn test_create_loan_preconditions() {
    let f = fixture().await;

    // Malformed code
    let err = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("PRESTAMO-1", f.user_id, f.copy_id),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    // Suspended user
    let suspended =
        create_test_user(&f.db, f.library_id, "EST-2", UserType::Student, UserStatus::Suspended)
            .await;
    let err = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0003", suspended, f.copy_id),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Rule(_)));

    // Copy not available
    let damaged =
        create_test_copy(&f.db, f.library_id, f.book_id, "CP-2", CopyStatus::Damaged).await;
    let err = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0004", f.user_id, damaged),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Rule(_)));

    // Duplicate code
    loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0005", f.user_id, f.copy_id),
    )
    .await
    .expect("First loan should be created");
    let other = create_test_copy(&f.db, f.library_id, f.book_id, "CP-3", CopyStatus::Available).await;
    let err = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0005", f.user_id, other),
    )
    .await
    .unwrap_err();
    assert_eq!(err, DomainError::rule("El código de préstamo ya existe"));
    assert_eq!(
        copy_status(&f.db, f.library_id, other).await,
        CopyStatus::Available
    );
}

#[tokio::test]
async fn test_overdue_loan_blocks_new_loan() {
    let f = fixture().await;
    loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        overdue_loan("LOAN-2024-0010", f.user_id, f.copy_id, Duration::days(2)),
    )
    .await
    .expect("Overdue loan should be created");

    let second = create_test_copy(&f.db, f.library_id, f.book_id, "CP-2", CopyStatus::Available).await;
    let err = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0011", f.user_id, second),
    )
    .await
    .unwrap_err();

    assert_eq!(err, DomainError::rule(OVERDUE_LOANS_MESSAGE));
    let loans = loan_service::list_loans(&f.db, f.library_id, &Default::default())
        .await
        .unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(
        copy_status(&f.db, f.library_id, second).await,
        CopyStatus::Available
    );
}

#[tokio::test]
async fn test_loan_marked_overdue_blocks_new_loan() {
    let f = fixture().await;
    let loan = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0012", f.user_id, f.copy_id),
    )
    .await
    .unwrap();

    // Still within its loan period, but flagged by a librarian
    let flagged = loan_service::update_loan(
        &f.db,
        f.library_id,
        loan.id,
        LoanUpdate {
            status: Some(LoanStatus::Overdue),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(flagged.status, LoanStatus::Overdue);

    let second = create_test_copy(&f.db, f.library_id, f.book_id, "CP-2", CopyStatus::Available).await;
    let err = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0013", f.user_id, second),
    )
    .await
    .unwrap_err();

    assert_eq!(err, DomainError::rule(OVERDUE_LOANS_MESSAGE));
    assert_eq!(
        copy_status(&f.db, f.library_id, second).await,
        CopyStatus::Available
    );
}

#[tokio::test]
async fn test_future_loan_date_is_refused() {
    let f = fixture().await;
    let now = Utc::now();

    let err = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        NewLoan {
            loan_date: Some(now + Duration::days(2)),
            ..new_loan("LOAN-2024-0014", f.user_id, f.copy_id)
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    assert_eq!(
        copy_status(&f.db, f.library_id, f.copy_id).await,
        CopyStatus::Available
    );

    let loan = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0015", f.user_id, f.copy_id),
    )
    .await
    .unwrap();

    let err = loan_service::update_loan(
        &f.db,
        f.library_id,
        loan.id,
        LoanUpdate {
            loan_date: Some(now + Duration::days(2)),
            due_date: Some(now + Duration::days(20)),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    // The loan can still be closed normally
    let outcome = loan_service::return_loan(&f.db, f.library_id, &f.policy, loan.id, None)
        .await
        .expect("Return should succeed");
    assert_eq!(outcome.loan.status, LoanStatus::Returned);
    assert_eq!(
        copy_status(&f.db, f.library_id, f.copy_id).await,
        CopyStatus::Available
    );
}

#[tokio::test]
async fn test_pending_fine_blocks_new_loan() {
    let f = fixture().await;
    fine_service::create_fine(
        &f.db,
        f.library_id,
        NewFine {
            user_id: f.user_id,
            loan_id: None,
            reason: FineReason::Damage,
            amount: 12.0,
            notes: None,
        },
    )
    .await
    .expect("Fine should be created");

    let err = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0020", f.user_id, f.copy_id),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Rule(_)));
}

#[tokio::test]
async fn test_late_return_generates_fine() {
    let f = fixture().await;
    configuration_service::update_configuration(
        &f.db,
        f.library_id,
        ConfigurationUpdate {
            fine_per_day: Some(5.0),
            ..Default::default()
        },
    )
    .await
    .expect("Configuration should be stored");
    let policy = configuration_service::load_policy(&f.db, f.library_id)
        .await
        .unwrap();

    let loan = loan_service::create_loan(
        &f.db,
        f.library_id,
        &policy,
        overdue_loan(
            "LOAN-2024-0030",
            f.user_id,
            f.copy_id,
            Duration::days(3) + Duration::hours(1),
        ),
    )
    .await
    .expect("Loan should be created");

    let outcome = loan_service::return_loan(&f.db, f.library_id, &policy, loan.id, None)
        .await
        .expect("Return should succeed");

    assert_eq!(outcome.loan.status, LoanStatus::Returned);
    assert!(outcome.loan.return_date.is_some());
    assert_eq!(
        copy_status(&f.db, f.library_id, f.copy_id).await,
        CopyStatus::Available
    );

    let FineOutcome::Created(fine) = outcome.fine else {
        panic!("Expected a late return fine, got {:?}", outcome.fine);
    };
    assert_eq!(fine.amount, 15.0);
    assert_eq!(fine.reason, FineReason::Overdue);
    assert_eq!(fine.status, FineStatus::Pending);
    assert_eq!(fine.loan_id, Some(loan.id));
    assert!(fine.notes.unwrap_or_default().contains("3 días"));
}

#[tokio::test]
async fn test_on_time_return_has_no_fine() {
    let f = fixture().await;
    let loan = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0031", f.user_id, f.copy_id),
    )
    .await
    .unwrap();

    let outcome = loan_service::return_loan(
        &f.db,
        f.library_id,
        &f.policy,
        loan.id,
        Some("Sin novedad".to_string()),
    )
    .await
    .unwrap();

    assert_eq!(outcome.fine, FineOutcome::NotLate);
    assert_eq!(outcome.loan.notes.as_deref(), Some("Sin novedad"));

    // A returned loan cannot be returned again
    let err = loan_service::return_loan(&f.db, f.library_id, &f.policy, loan.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Rule(_)));
}

#[tokio::test]
async fn test_fine_failure_does_not_undo_return() {
    let f = fixture().await;
    let policy = CirculationPolicy {
        fine_per_day: 5_000.0,
        ..f.policy.clone()
    };
    let loan = loan_service::create_loan(
        &f.db,
        f.library_id,
        &policy,
        overdue_loan(
            "LOAN-2024-0032",
            f.user_id,
            f.copy_id,
            Duration::days(3) + Duration::hours(1),
        ),
    )
    .await
    .unwrap();

    let outcome = loan_service::return_loan(&f.db, f.library_id, &policy, loan.id, None)
        .await
        .expect("Return should succeed even if the fine is rejected");

    assert!(matches!(outcome.fine, FineOutcome::Failed(_)));
    let stored = loan_service::get_loan(&f.db, f.library_id, loan.id)
        .await
        .unwrap();
    assert_eq!(stored.status, LoanStatus::Returned);
    assert_eq!(
        copy_status(&f.db, f.library_id, f.copy_id).await,
        CopyStatus::Available
    );
}

#[tokio::test]
async fn test_renewal_extends_due_date() {
    let f = fixture().await;
    let loan = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0040", f.user_id, f.copy_id),
    )
    .await
    .unwrap();

    let renewed = loan_service::renew_loan(&f.db, f.library_id, loan.id, Some(7))
        .await
        .expect("Renewal should succeed");

    assert_eq!(renewed.renewals, 1);
    assert_eq!(renewed.due_date, loan.due_date + Duration::days(15));
    assert_eq!(renewed.librarian_id, Some(7));
    assert_eq!(
        copy_status(&f.db, f.library_id, f.copy_id).await,
        CopyStatus::Borrowed
    );
}

#[tokio::test]
async fn test_renewal_refused_at_cap() {
    let f = fixture().await;
    let loan = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0041", f.user_id, f.copy_id),
    )
    .await
    .unwrap();
    loan_service::update_loan(
        &f.db,
        f.library_id,
        loan.id,
        LoanUpdate {
            renewals: Some(5),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let err = loan_service::renew_loan(&f.db, f.library_id, loan.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_renewal_grace_window() {
    let f = fixture().await;
    let late = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        overdue_loan(
            "LOAN-2024-0042",
            f.user_id,
            f.copy_id,
            Duration::days(4) + Duration::hours(1),
        ),
    )
    .await
    .unwrap();
    let err = loan_service::renew_loan(&f.db, f.library_id, late.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let other_user =
        create_test_user(&f.db, f.library_id, "EST-9", UserType::Student, UserStatus::Active)
            .await;
    let other_copy =
        create_test_copy(&f.db, f.library_id, f.book_id, "CP-9", CopyStatus::Available).await;
    let within_grace = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        overdue_loan(
            "LOAN-2024-0043",
            other_user,
            other_copy,
            Duration::days(3) + Duration::hours(1),
        ),
    )
    .await
    .unwrap();
    let renewed = loan_service::renew_loan(&f.db, f.library_id, within_grace.id, None)
        .await
        .expect("Renewal within the grace window should succeed");
    assert_eq!(renewed.renewals, 1);
}

#[tokio::test]
async fn test_marking_loan_lost_marks_copy_lost() {
    let f = fixture().await;
    let loan = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0050", f.user_id, f.copy_id),
    )
    .await
    .unwrap();

    let lost = loan_service::update_loan(
        &f.db,
        f.library_id,
        loan.id,
        LoanUpdate {
            status: Some(LoanStatus::Lost),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(lost.status, LoanStatus::Lost);
    assert_eq!(
        copy_status(&f.db, f.library_id, f.copy_id).await,
        CopyStatus::Lost
    );

    let err = loan_service::update_loan(
        &f.db,
        f.library_id,
        loan.id,
        LoanUpdate {
            status: Some(LoanStatus::Active),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Rule(_)));
}

#[tokio::test]
async fn test_copy_transition_is_compare_and_set() {
    let f = fixture().await;
    let copies = CopyRepository::new(&f.db, f.library_id);

    assert!(copies
        .transition_status(f.copy_id, CopyStatus::Available, CopyStatus::Borrowed)
        .await
        .unwrap());
    assert!(!copies
        .transition_status(f.copy_id, CopyStatus::Available, CopyStatus::Borrowed)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_loans_are_tenant_scoped() {
    let f = fixture().await;
    let other_library = create_test_library(&f.db, "Sucursal").await;
    let loan = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0060", f.user_id, f.copy_id),
    )
    .await
    .unwrap();

    let err = loan_service::get_loan(&f.db, other_library, loan.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    let err = loan_service::return_loan(&f.db, other_library, &f.policy, loan.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    // The other library cannot lend this library's copy to this library's user
    let err = loan_service::create_loan(
        &f.db,
        other_library,
        &f.policy,
        new_loan("LOAN-2024-0061", f.user_id, f.copy_id),
    )
    .await
    .unwrap_err();
    assert_eq!(err, DomainError::rule("Usuario no encontrado"));
}

// --- Reservations ---

#[tokio::test]
async fn test_reservation_refused_when_copy_available() {
    let f = fixture().await;

    let err = reservation_service::create_reservation(
        &f.db,
        f.library_id,
        &f.policy,
        new_reservation(f.user_id, f.book_id),
    )
    .await
    .unwrap_err();

    assert_eq!(err, DomainError::rule(COPIES_AVAILABLE_MESSAGE));
}

#[tokio::test]
async fn test_reservation_defaults_and_duplicates() {
    let f = fixture().await;
    let other =
        create_test_user(&f.db, f.library_id, "EST-2", UserType::Student, UserStatus::Active)
            .await;
    loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0070", other, f.copy_id),
    )
    .await
    .unwrap();

    let reservation = reservation_service::create_reservation(
        &f.db,
        f.library_id,
        &f.policy,
        new_reservation(f.user_id, f.book_id),
    )
    .await
    .expect("Reservation should be created");

    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(reservation.priority, 5);
    assert!(!reservation.notified);
    assert_eq!(
        reservation.expiration_date - reservation.reservation_date,
        Duration::days(3)
    );

    let err = reservation_service::create_reservation(
        &f.db,
        f.library_id,
        &f.policy,
        new_reservation(f.user_id, f.book_id),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Rule(_)));

    // Once cancelled, the user may queue again
    reservation_service::cancel_reservation(&f.db, f.library_id, reservation.id)
        .await
        .unwrap();
    reservation_service::create_reservation(
        &f.db,
        f.library_id,
        &f.policy,
        new_reservation(f.user_id, f.book_id),
    )
    .await
    .expect("A new reservation after cancelling should be accepted");
}

#[tokio::test]
async fn test_reservation_queue_order_and_offer() {
    let f = fixture().await;
    let now = Utc::now();
    let holder =
        create_test_user(&f.db, f.library_id, "EST-H", UserType::Student, UserStatus::Active)
            .await;
    let loan = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0080", holder, f.copy_id),
    )
    .await
    .unwrap();

    let low = create_test_user(&f.db, f.library_id, "EST-A", UserType::Student, UserStatus::Active).await;
    let early = create_test_user(&f.db, f.library_id, "EST-B", UserType::Student, UserStatus::Active).await;
    let late = create_test_user(&f.db, f.library_id, "EST-C", UserType::Student, UserStatus::Active).await;

    for (user_id, priority, at) in [
        (low, 3, now - Duration::hours(3)),
        (late, 8, now - Duration::hours(1)),
        (early, 8, now - Duration::hours(2)),
    ] {
        reservation_service::create_reservation(
            &f.db,
            f.library_id,
            &f.policy,
            reservation_at(user_id, f.book_id, priority, at),
        )
        .await
        .expect("Reservation should be created");
    }

    let queue = reservation_service::list_reservations(
        &f.db,
        f.library_id,
        &ReservationFilter {
            book_id: Some(f.book_id),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let order: Vec<i32> = queue.iter().map(|r| r.user_id).collect();
    assert_eq!(order, vec![early, late, low]);

    // Nothing to offer while the only copy is out
    let err = reservation_service::offer_next_reservation(&f.db, f.library_id, f.book_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Rule(_)));

    loan_service::return_loan(&f.db, f.library_id, &f.policy, loan.id, None)
        .await
        .unwrap();
    let offered = reservation_service::offer_next_reservation(&f.db, f.library_id, f.book_id)
        .await
        .unwrap()
        .expect("Head of the queue should be offered the copy");

    assert_eq!(offered.user_id, early);
    assert_eq!(offered.status, ReservationStatus::Active);
    assert!(offered.notified);

    let completed = reservation_service::process_reservation(&f.db, f.library_id, offered.id)
        .await
        .unwrap();
    assert_eq!(completed.status, ReservationStatus::Completed);
}

#[tokio::test]
async fn test_reservation_status_moves() {
    let f = fixture().await;
    CopyRepository::new(&f.db, f.library_id)
        .set_status(f.copy_id, CopyStatus::Damaged)
        .await
        .unwrap();

    let reservation = reservation_service::create_reservation(
        &f.db,
        f.library_id,
        &f.policy,
        new_reservation(f.user_id, f.book_id),
    )
    .await
    .unwrap();

    // Pending reservations cannot be processed
    let err = reservation_service::process_reservation(&f.db, f.library_id, reservation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Rule(_)));

    let cancelled = reservation_service::cancel_reservation(&f.db, f.library_id, reservation.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);

    let err = reservation_service::cancel_reservation(&f.db, f.library_id, reservation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Rule(_)));
}

#[tokio::test]
async fn test_update_reservation_rechecks_duplicates() {
    let f = fixture().await;
    CopyRepository::new(&f.db, f.library_id)
        .set_status(f.copy_id, CopyStatus::Damaged)
        .await
        .unwrap();

    let first = reservation_service::create_reservation(
        &f.db,
        f.library_id,
        &f.policy,
        new_reservation(f.user_id, f.book_id),
    )
    .await
    .unwrap();
    reservation_service::cancel_reservation(&f.db, f.library_id, first.id)
        .await
        .unwrap();
    reservation_service::create_reservation(
        &f.db,
        f.library_id,
        &f.policy,
        new_reservation(f.user_id, f.book_id),
    )
    .await
    .unwrap();

    // Reopening the cancelled one would give the user two open reservations
    let err = reservation_service::update_reservation(
        &f.db,
        f.library_id,
        first.id,
        ReservationUpdate {
            status: Some(ReservationStatus::Pending),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Rule(_)));

    // Updating an open reservation does not collide with itself
    let second = reservation_service::list_reservations(
        &f.db,
        f.library_id,
        &ReservationFilter {
            status: Some(ReservationStatus::Pending),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(second.len(), 1);
    let updated = reservation_service::update_reservation(
        &f.db,
        f.library_id,
        second[0].id,
        ReservationUpdate {
            priority: Some(9),
            ..Default::default()
        },
    )
    .await
    .expect("Priority change should be accepted");
    assert_eq!(updated.priority, 9);
}

#[tokio::test]
async fn test_offer_skips_expired_reservations() {
    let f = fixture().await;
    let now = Utc::now();
    let copies = CopyRepository::new(&f.db, f.library_id);
    copies.set_status(f.copy_id, CopyStatus::Damaged).await.unwrap();

    let waiting =
        create_test_user(&f.db, f.library_id, "EST-W", UserType::Student, UserStatus::Active)
            .await;
    let expired = reservation_service::create_reservation(
        &f.db,
        f.library_id,
        &f.policy,
        NewReservation {
            expiration_date: Some(now - Duration::days(1)),
            ..reservation_at(f.user_id, f.book_id, 10, now - Duration::days(4))
        },
    )
    .await
    .expect("Backdated reservation should be created");
    reservation_service::create_reservation(
        &f.db,
        f.library_id,
        &f.policy,
        reservation_at(waiting, f.book_id, 1, now - Duration::hours(1)),
    )
    .await
    .unwrap();

    let lapsed = reservation_service::list_reservations(
        &f.db,
        f.library_id,
        &ReservationFilter {
            expired: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(lapsed.len(), 1);
    assert_eq!(lapsed[0].id, expired.id);

    copies.set_status(f.copy_id, CopyStatus::Available).await.unwrap();
    let offered = reservation_service::offer_next_reservation(&f.db, f.library_id, f.book_id)
        .await
        .unwrap()
        .expect("The unexpired reservation should be offered");
    assert_eq!(offered.user_id, waiting);

    let untouched = reservation_service::get_reservation(&f.db, f.library_id, expired.id)
        .await
        .unwrap();
    assert_eq!(untouched.status, ReservationStatus::Pending);
    assert!(!untouched.notified);
}

// --- Fines ---

#[tokio::test]
async fn test_pay_fine_twice_fails() {
    let f = fixture().await;
    let fine = fine_service::create_fine(
        &f.db,
        f.library_id,
        NewFine {
            user_id: f.user_id,
            loan_id: None,
            reason: FineReason::Loss,
            amount: 40.0,
            notes: None,
        },
    )
    .await
    .unwrap();

    let paid = fine_service::pay_fine(&f.db, f.library_id, fine.id, Some("Efectivo".into()))
        .await
        .expect("First payment should succeed");
    assert_eq!(paid.status, FineStatus::Paid);
    assert!(paid.payment_date.is_some());

    let err = fine_service::pay_fine(&f.db, f.library_id, fine.id, None)
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::rule("La multa no está pendiente"));

    let stored = fine_service::get_fine(&f.db, f.library_id, fine.id)
        .await
        .unwrap();
    assert_eq!(stored, paid);
}

#[tokio::test]
async fn test_waive_fine_has_no_payment_date() {
    let f = fixture().await;
    let fine = fine_service::create_fine(
        &f.db,
        f.library_id,
        NewFine {
            user_id: f.user_id,
            loan_id: None,
            reason: FineReason::Damage,
            amount: 10.0,
            notes: None,
        },
    )
    .await
    .unwrap();

    let waived = fine_service::waive_fine(&f.db, f.library_id, fine.id, None)
        .await
        .unwrap();
    assert_eq!(waived.status, FineStatus::Waived);
    assert!(waived.payment_date.is_none());

    let err = fine_service::pay_fine(&f.db, f.library_id, fine.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Rule(_)));
}

#[tokio::test]
async fn test_fine_amount_out_of_range() {
    let f = fixture().await;
    let err = fine_service::create_fine(
        &f.db,
        f.library_id,
        NewFine {
            user_id: f.user_id,
            loan_id: None,
            reason: FineReason::Damage,
            amount: 10_500.0,
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

// --- Deletion guards ---

#[tokio::test]
async fn test_delete_guards_follow_circulation_state() {
    let f = fixture().await;
    let loan = loan_service::create_loan(
        &f.db,
        f.library_id,
        &f.policy,
        new_loan("LOAN-2024-0090", f.user_id, f.copy_id),
    )
    .await
    .unwrap();

    assert!(matches!(
        catalog_service::delete_book(&f.db, f.library_id, f.book_id).await,
        Err(DomainError::Rule(_))
    ));
    assert!(matches!(
        catalog_service::delete_copy(&f.db, f.library_id, f.copy_id).await,
        Err(DomainError::Rule(_))
    ));
    assert!(matches!(
        catalog_service::delete_user(&f.db, f.library_id, f.user_id).await,
        Err(DomainError::Rule(_))
    ));

    loan_service::return_loan(&f.db, f.library_id, &f.policy, loan.id, None)
        .await
        .unwrap();

    catalog_service::delete_copy(&f.db, f.library_id, f.copy_id)
        .await
        .expect("Returned copy should be deletable");
    catalog_service::delete_book(&f.db, f.library_id, f.book_id)
        .await
        .expect("Book without borrowed copies should be deletable");
}

#[tokio::test]
async fn test_delete_user_removes_reservations() {
    let f = fixture().await;
    CopyRepository::new(&f.db, f.library_id)
        .set_status(f.copy_id, CopyStatus::Reserved)
        .await
        .unwrap();
    reservation_service::create_reservation(
        &f.db,
        f.library_id,
        &f.policy,
        new_reservation(f.user_id, f.book_id),
    )
    .await
    .unwrap();

    // The open reservation blocks the book
    assert!(matches!(
        catalog_service::delete_book(&f.db, f.library_id, f.book_id).await,
        Err(DomainError::Rule(_))
    ));

    catalog_service::delete_user(&f.db, f.library_id, f.user_id)
        .await
        .expect("User without loans or fines should be deletable");

    let remaining = reservation_service::list_reservations(&f.db, f.library_id, &Default::default())
        .await
        .unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_new_copy_cannot_start_borrowed_or_reserved() {
    let f = fixture().await;
    let new_copy = |code: &str, status: Option<CopyStatus>| NewCopy {
        book_id: f.book_id,
        code: code.to_string(),
        status,
        condition: None,
        acquisition_date: None,
        notes: None,
    };

    for status in [CopyStatus::Borrowed, CopyStatus::Reserved] {
        let err = catalog_service::create_copy(&f.db, f.library_id, new_copy("CP-X", Some(status)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    let damaged =
        catalog_service::create_copy(&f.db, f.library_id, new_copy("CP-D", Some(CopyStatus::Damaged)))
            .await
            .expect("Damaged copy should be created");
    assert_eq!(damaged.status, CopyStatus::Damaged);

    let fresh = catalog_service::create_copy(&f.db, f.library_id, new_copy("CP-N", None))
        .await
        .expect("Copy should be created");
    assert_eq!(fresh.status, CopyStatus::Available);
    assert_eq!(fresh.condition, CopyCondition::Good);
}

#[tokio::test]
async fn test_delete_missing_entities() {
    let f = fixture().await;
    assert!(matches!(
        catalog_service::delete_user(&f.db, f.library_id, 999).await,
        Err(DomainError::NotFound(_))
    ));
    assert!(matches!(
        loan_service::delete_loan(&f.db, f.library_id, 999).await,
        Err(DomainError::NotFound(_))
    ));
}
