use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set,
};

use super::timestamp;
use crate::domain::{CirculationPolicy, DomainError};
use crate::models::configuration::{ActiveModel, Column, Entity as ConfigurationEntity, Model};

/// One configuration row per library; absent rows mean default policy.
pub struct ConfigurationRepository<'a, C> {
    db: &'a C,
    library_id: i32,
}

impl<'a, C: ConnectionTrait> ConfigurationRepository<'a, C> {
    pub fn new(db: &'a C, library_id: i32) -> Self {
        Self { db, library_id }
    }

    pub async fn find(&self) -> Result<Option<Model>, DomainError> {
        Ok(ConfigurationEntity::find()
            .filter(Column::LibraryId.eq(self.library_id))
            .one(self.db)
            .await?)
    }

    /// Inserts or overwrites the library's policy row.
    pub async fn upsert(&self, policy: &CirculationPolicy) -> Result<Model, DomainError> {
        let now = timestamp();
        let existing = self.find().await?;

        let is_new = existing.is_none();

        let mut active: ActiveModel = match existing {
            Some(model) => model.into(),
            None => ActiveModel {
                id: NotSet,
                library_id: Set(self.library_id),
                created_at: Set(now.clone()),
                ..Default::default()
            },
        };
        active.student_loan_days = Set(policy.student_loan_days);
        active.teacher_loan_days = Set(policy.teacher_loan_days);
        active.max_renewals = Set(policy.max_renewals);
        active.max_books_per_loan = Set(policy.max_books_per_loan);
        active.fine_per_day = Set(policy.fine_per_day);
        active.reservation_days = Set(policy.reservation_days);
        active.grace_days = Set(policy.grace_days);
        active.updated_at = Set(now);

        let model = if is_new {
            active.insert(self.db).await?
        } else {
            active.update(self.db).await?
        };
        Ok(model)
    }
}
