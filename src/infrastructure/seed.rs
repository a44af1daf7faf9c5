//! Demo data for a fresh database (`SEED_DEMO`).

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

use crate::domain::{CirculationPolicy, DomainError};
use crate::infrastructure::repositories::{
    BookRepository, ConfigurationRepository, CopyRepository,
};
use crate::models::copy::{CopyCondition, CopyStatus};
use crate::models::user::{UserStatus, UserType};
use crate::models::{copy, library, user, Book};

pub const DEMO_LIBRARY_ID: i32 = 1;

pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DomainError> {
    let now = Utc::now();
    let stamp = now.to_rfc3339();

    // 1. Library
    let demo_library = library::ActiveModel {
        id: Set(DEMO_LIBRARY_ID),
        name: Set("Biblioteca Central".to_owned()),
        description: Set(Some("Biblioteca de demostración".to_owned())),
        created_at: Set(stamp.clone()),
        updated_at: Set(stamp.clone()),
    };
    library::Entity::insert(demo_library)
        .on_conflict(OnConflict::column(library::Column::Id).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;

    // 2. Circulation policy
    let configurations = ConfigurationRepository::new(db, DEMO_LIBRARY_ID);
    if configurations.find().await?.is_none() {
        configurations.upsert(&CirculationPolicy::default()).await?;
    }

    // 3. Members
    let members = [
        ("EST-0001", "40000001", "Ana", "Pérez", UserType::Student),
        ("DOC-0001", "40000002", "Luis", "Gómez", UserType::Teacher),
    ];
    for (code, dni, first_name, last_name, user_type) in members {
        let member = user::ActiveModel {
            library_id: Set(DEMO_LIBRARY_ID),
            code: Set(code.to_owned()),
            dni: Set(dni.to_owned()),
            first_name: Set(first_name.to_owned()),
            last_name: Set(last_name.to_owned()),
            email: Set(None),
            phone: Set(None),
            user_type: Set(user_type),
            status: Set(UserStatus::Active),
            registration_date: Set(now),
            created_at: Set(stamp.clone()),
            updated_at: Set(stamp.clone()),
            ..Default::default()
        };
        user::Entity::insert(member)
            .on_conflict(
                OnConflict::columns([user::Column::LibraryId, user::Column::Code])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    // 4. Books and copies, only into an empty catalog
    let books = BookRepository::new(db, DEMO_LIBRARY_ID);
    if !books.find_all().await?.is_empty() {
        return Ok(());
    }

    let titles = [
        ("Cien años de soledad", "9780307474728", 2),
        ("Rayuela", "9788437604572", 1),
    ];
    let copies = CopyRepository::new(db, DEMO_LIBRARY_ID);
    let mut sequence = 1;
    for (title, isbn, copy_count) in titles {
        let book = books
            .create(&Book {
                id: None,
                title: title.to_owned(),
                isbn: Some(isbn.to_owned()),
                publisher: None,
                publication_year: None,
            })
            .await?;

        for _ in 0..copy_count {
            copies
                .create(&copy::Model {
                    id: 0,
                    library_id: DEMO_LIBRARY_ID,
                    book_id: book.id,
                    code: format!("CP-{:04}", sequence),
                    status: CopyStatus::Available,
                    condition: CopyCondition::Good,
                    acquisition_date: None,
                    notes: None,
                    created_at: stamp.clone(),
                    updated_at: stamp.clone(),
                })
                .await?;
            sequence += 1;
        }
    }

    tracing::info!("Demo library {} seeded", DEMO_LIBRARY_ID);
    Ok(())
}
