//! SeaORM implementation of the copy store

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set,
};

use super::timestamp;
use crate::domain::{CopyFilter, DomainError};
use crate::models::copy::{ActiveModel, Column, CopyStatus, Entity as CopyEntity, Model};

pub struct CopyRepository<'a, C> {
    db: &'a C,
    library_id: i32,
}

impl<'a, C: ConnectionTrait> CopyRepository<'a, C> {
    pub fn new(db: &'a C, library_id: i32) -> Self {
        Self { db, library_id }
    }

    fn scoped(&self) -> Select<CopyEntity> {
        CopyEntity::find().filter(Column::LibraryId.eq(self.library_id))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(self.scoped().filter(Column::Id.eq(id)).one(self.db).await?)
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<Model>, DomainError> {
        Ok(self.scoped().filter(Column::Code.eq(code)).one(self.db).await?)
    }

    pub async fn find_filtered(&self, filter: &CopyFilter) -> Result<Vec<Model>, DomainError> {
        let mut condition = Condition::all();
        if let Some(book_id) = filter.book_id {
            condition = condition.add(Column::BookId.eq(book_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(Column::Status.eq(status));
        }

        Ok(self
            .scoped()
            .filter(condition)
            .order_by_asc(Column::Id)
            .all(self.db)
            .await?)
    }

    pub async fn count_by_book_and_status(
        &self,
        book_id: i32,
        status: CopyStatus,
    ) -> Result<u64, DomainError> {
        Ok(self
            .scoped()
            .filter(Column::BookId.eq(book_id))
            .filter(Column::Status.eq(status))
            .count(self.db)
            .await?)
    }

    pub async fn create(&self, copy: &Model) -> Result<Model, DomainError> {
        let now = timestamp();
        let active = ActiveModel {
            id: NotSet,
            library_id: Set(self.library_id),
            book_id: Set(copy.book_id),
            code: Set(copy.code.clone()),
            status: Set(copy.status),
            condition: Set(copy.condition),
            acquisition_date: Set(copy.acquisition_date.clone()),
            notes: Set(copy.notes.clone()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        Ok(active.insert(self.db).await?)
    }

    /// Compare-and-set on the copy status. Returns `false` when the copy is
    /// missing or its status is no longer `from`, leaving the row untouched.
    pub async fn transition_status(
        &self,
        id: i32,
        from: CopyStatus,
        to: CopyStatus,
    ) -> Result<bool, DomainError> {
        let result = CopyEntity::update_many()
            .set(ActiveModel {
                status: Set(to),
                updated_at: Set(timestamp()),
                ..Default::default()
            })
            .filter(Column::Id.eq(id))
            .filter(Column::LibraryId.eq(self.library_id))
            .filter(Column::Status.eq(from))
            .exec(self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Unconditional status write, used when a loan leaves the copy in a
    /// terminal state (`Lost`) or puts it back on the shelf.
    pub async fn set_status(&self, id: i32, status: CopyStatus) -> Result<(), DomainError> {
        let result = CopyEntity::update_many()
            .set(ActiveModel {
                status: Set(status),
                updated_at: Set(timestamp()),
                ..Default::default()
            })
            .filter(Column::Id.eq(id))
            .filter(Column::LibraryId.eq(self.library_id))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found(format!(
                "Copia con ID {} no encontrada",
                id
            )));
        }
        Ok(())
    }

    pub async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = CopyEntity::delete_many()
            .filter(Column::Id.eq(id))
            .filter(Column::LibraryId.eq(self.library_id))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found(format!(
                "Copia con ID {} no encontrada",
                id
            )));
        }
        Ok(())
    }
}
