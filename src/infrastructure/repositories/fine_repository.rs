//! SeaORM implementation of the fine store

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set,
};

use super::timestamp;
use crate::domain::{DomainError, FineFilter};
use crate::models::fine::{Column, Entity as FineEntity, FineStatus, Model};

pub struct FineRepository<'a, C> {
    db: &'a C,
    library_id: i32,
}

impl<'a, C: ConnectionTrait> FineRepository<'a, C> {
    pub fn new(db: &'a C, library_id: i32) -> Self {
        Self { db, library_id }
    }

    fn scoped(&self) -> Select<FineEntity> {
        FineEntity::find().filter(Column::LibraryId.eq(self.library_id))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(self.scoped().filter(Column::Id.eq(id)).one(self.db).await?)
    }

    /// Newest fine first
    pub async fn find_filtered(&self, filter: &FineFilter) -> Result<Vec<Model>, DomainError> {
        let mut condition = Condition::all();

        if let Some(user_id) = filter.user_id {
            condition = condition.add(Column::UserId.eq(user_id));
        }
        if let Some(loan_id) = filter.loan_id {
            condition = condition.add(Column::LoanId.eq(loan_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(Column::Status.eq(status));
        }
        if filter.pending {
            condition = condition.add(Column::Status.eq(FineStatus::Pending));
        }

        Ok(self
            .scoped()
            .filter(condition)
            .order_by_desc(Column::GeneratedDate)
            .all(self.db)
            .await?)
    }

    pub async fn count_pending_for_user(&self, user_id: i32) -> Result<u64, DomainError> {
        Ok(self
            .scoped()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Status.eq(FineStatus::Pending))
            .count(self.db)
            .await?)
    }

    pub async fn create(&self, fine: &Model) -> Result<Model, DomainError> {
        let now = timestamp();
        let mut active = fine.to_active_model(true);
        active.library_id = Set(self.library_id);
        active.created_at = Set(now.clone());
        active.updated_at = Set(now);

        Ok(active.insert(self.db).await?)
    }

    pub async fn update(&self, fine: &Model) -> Result<Model, DomainError> {
        if fine.library_id != self.library_id {
            return Err(DomainError::not_found(format!(
                "Multa con ID {} no encontrada",
                fine.id
            )));
        }
        let mut active = fine.to_active_model(false);
        active.updated_at = Set(timestamp());

        Ok(active.update(self.db).await?)
    }

    pub async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = FineEntity::delete_many()
            .filter(Column::Id.eq(id))
            .filter(Column::LibraryId.eq(self.library_id))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found(format!(
                "Multa con ID {} no encontrada",
                id
            )));
        }
        Ok(())
    }
}
