//! SeaORM implementation of the loan store

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Select, Set,
};

use super::timestamp;
use crate::domain::{DomainError, LoanFilter};
use crate::models::loan::{Column, Entity as LoanEntity, LoanStatus, Model};

pub struct LoanRepository<'a, C> {
    db: &'a C,
    library_id: i32,
}

impl<'a, C: ConnectionTrait> LoanRepository<'a, C> {
    pub fn new(db: &'a C, library_id: i32) -> Self {
        Self { db, library_id }
    }

    fn scoped(&self) -> Select<LoanEntity> {
        LoanEntity::find().filter(Column::LibraryId.eq(self.library_id))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(self.scoped().filter(Column::Id.eq(id)).one(self.db).await?)
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<Model>, DomainError> {
        Ok(self
            .scoped()
            .filter(Column::LoanCode.eq(code))
            .one(self.db)
            .await?)
    }

    /// Newest loan first
    pub async fn find_filtered(&self, filter: &LoanFilter) -> Result<Vec<Model>, DomainError> {
        let mut condition = Condition::all();

        if let Some(code) = &filter.code {
            condition = condition.add(Column::LoanCode.eq(code.trim().to_uppercase()));
        }
        if let Some(user_id) = filter.user_id {
            condition = condition.add(Column::UserId.eq(user_id));
        }
        if let Some(copy_id) = filter.copy_id {
            condition = condition.add(Column::CopyId.eq(copy_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(Column::Status.eq(status));
        }
        if filter.overdue {
            condition = condition.add(
                Condition::any()
                    .add(Column::Status.eq(LoanStatus::Overdue))
                    .add(
                        Condition::all()
                            .add(Column::Status.eq(LoanStatus::Active))
                            .add(Column::DueDate.lt(Utc::now())),
                    ),
            );
        }

        Ok(self
            .scoped()
            .filter(condition)
            .order_by_desc(Column::LoanDate)
            .all(self.db)
            .await?)
    }

    pub async fn create(&self, loan: &Model) -> Result<Model, DomainError> {
        let now = timestamp();
        let mut active = loan.to_active_model(true);
        active.library_id = Set(self.library_id);
        active.created_at = Set(now.clone());
        active.updated_at = Set(now);

        Ok(active.insert(self.db).await?)
    }

    /// Full-row update of a loan previously read through this repository.
    pub async fn update(&self, loan: &Model) -> Result<Model, DomainError> {
        if loan.library_id != self.library_id {
            return Err(DomainError::not_found(format!(
                "Préstamo con ID {} no encontrado",
                loan.id
            )));
        }
        let mut active = loan.to_active_model(false);
        active.updated_at = Set(timestamp());

        Ok(active.update(self.db).await?)
    }

    pub async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = LoanEntity::delete_many()
            .filter(Column::Id.eq(id))
            .filter(Column::LibraryId.eq(self.library_id))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found(format!(
                "Préstamo con ID {} no encontrado",
                id
            )));
        }

        Ok(())
    }
}
