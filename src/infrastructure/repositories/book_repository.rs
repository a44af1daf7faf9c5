use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Select, Set,
};

use super::timestamp;
use crate::domain::DomainError;
use crate::models::book::{ActiveModel, Book, Column, Entity as BookEntity, Model};

pub struct BookRepository<'a, C> {
    db: &'a C,
    library_id: i32,
}

impl<'a, C: ConnectionTrait> BookRepository<'a, C> {
    pub fn new(db: &'a C, library_id: i32) -> Self {
        Self { db, library_id }
    }

    fn scoped(&self) -> Select<BookEntity> {
        BookEntity::find().filter(Column::LibraryId.eq(self.library_id))
    }

    pub async fn find_all(&self) -> Result<Vec<Model>, DomainError> {
        Ok(self
            .scoped()
            .order_by_asc(Column::Title)
            .all(self.db)
            .await?)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(self.scoped().filter(Column::Id.eq(id)).one(self.db).await?)
    }

    pub async fn create(&self, book: &Book) -> Result<Model, DomainError> {
        let now = timestamp();
        let active = ActiveModel {
            id: NotSet,
            library_id: Set(self.library_id),
            title: Set(book.title.clone()),
            isbn: Set(book.isbn.clone()),
            publisher: Set(book.publisher.clone()),
            publication_year: Set(book.publication_year),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        Ok(active.insert(self.db).await?)
    }

    pub async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = BookEntity::delete_many()
            .filter(Column::Id.eq(id))
            .filter(Column::LibraryId.eq(self.library_id))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found(format!(
                "Libro con ID {} no encontrado",
                id
            )));
        }
        Ok(())
    }
}
