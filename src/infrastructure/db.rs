use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(db.get_database_backend(), sql.to_owned()))
        .await?;
    Ok(())
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Tenants
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS libraries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    // Per-library circulation policy
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS configurations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            library_id INTEGER NOT NULL UNIQUE,
            student_loan_days INTEGER NOT NULL DEFAULT 15,
            teacher_loan_days INTEGER NOT NULL DEFAULT 30,
            max_renewals INTEGER NOT NULL DEFAULT 2,
            max_books_per_loan INTEGER NOT NULL DEFAULT 5,
            fine_per_day REAL NOT NULL DEFAULT 0.50,
            reservation_days INTEGER NOT NULL DEFAULT 3,
            grace_days INTEGER NOT NULL DEFAULT 2,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            library_id INTEGER NOT NULL,
            code TEXT NOT NULL,
            dni TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            user_type TEXT NOT NULL DEFAULT 'Student',
            status TEXT NOT NULL DEFAULT 'Active',
            registration_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (library_id, code),
            UNIQUE (library_id, dni)
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            library_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            isbn TEXT,
            publisher TEXT,
            publication_year INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS copies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            library_id INTEGER NOT NULL,
            book_id INTEGER NOT NULL,
            code TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Available',
            condition TEXT NOT NULL DEFAULT 'Good',
            acquisition_date TEXT,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (library_id, code),
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            library_id INTEGER NOT NULL,
            loan_code TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            copy_id INTEGER NOT NULL,
            loan_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            return_date TEXT,
            status TEXT NOT NULL DEFAULT 'Active',
            loan_days INTEGER NOT NULL DEFAULT 15,
            renewals INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            librarian_id INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (library_id, loan_code),
            FOREIGN KEY (copy_id) REFERENCES copies(id) ON DELETE CASCADE,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS reservations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            library_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            book_id INTEGER NOT NULL,
            reservation_date TEXT NOT NULL,
            expiration_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Pending',
            priority INTEGER NOT NULL DEFAULT 5,
            notified INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS fines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            library_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            loan_id INTEGER,
            reason TEXT NOT NULL,
            amount REAL NOT NULL DEFAULT 0,
            generated_date TEXT NOT NULL,
            payment_date TEXT,
            status TEXT NOT NULL DEFAULT 'Pending',
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (loan_id) REFERENCES loans(id) ON DELETE SET NULL
        )
        "#,
    )
    .await?;

    // Indexes for the filtered lookups the coordinators issue
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_copies_book_status ON copies(library_id, book_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_loans_user_status ON loans(library_id, user_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_loans_copy_status ON loans(library_id, copy_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_reservations_queue ON reservations(library_id, book_id, status, priority)",
        "CREATE INDEX IF NOT EXISTS idx_reservations_user ON reservations(library_id, user_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_fines_user_status ON fines(library_id, user_id, status)",
    ] {
        execute(db, statement).await?;
    }

    tracing::debug!("Database schema is up to date");

    Ok(())
}
