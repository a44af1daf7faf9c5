//! SeaORM implementation of the reservation store

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set,
};

use super::timestamp;
use crate::domain::{DomainError, ReservationFilter};
use crate::models::reservation::{Column, Entity as ReservationEntity, Model, ReservationStatus};

pub struct ReservationRepository<'a, C> {
    db: &'a C,
    library_id: i32,
}

impl<'a, C: ConnectionTrait> ReservationRepository<'a, C> {
    pub fn new(db: &'a C, library_id: i32) -> Self {
        Self { db, library_id }
    }

    fn scoped(&self) -> Select<ReservationEntity> {
        ReservationEntity::find().filter(Column::LibraryId.eq(self.library_id))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(self.scoped().filter(Column::Id.eq(id)).one(self.db).await?)
    }

    /// Queue order: highest priority first, then oldest reservation first.
    pub async fn find_filtered(
        &self,
        filter: &ReservationFilter,
    ) -> Result<Vec<Model>, DomainError> {
        let mut condition = Condition::all();

        if let Some(user_id) = filter.user_id {
            condition = condition.add(Column::UserId.eq(user_id));
        }
        if let Some(book_id) = filter.book_id {
            condition = condition.add(Column::BookId.eq(book_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(Column::Status.eq(status));
        }
        if filter.expired {
            condition = condition
                .add(Column::Status.is_in(ReservationStatus::OPEN))
                .add(Column::ExpirationDate.lt(Utc::now()));
        }

        Ok(self
            .scoped()
            .filter(condition)
            .order_by_desc(Column::Priority)
            .order_by_asc(Column::ReservationDate)
            .all(self.db)
            .await?)
    }

    /// The open (Pending/Active) reservation a user holds on a book, ignoring
    /// `except_id` so an update does not collide with itself.
    pub async fn find_open_for(
        &self,
        user_id: i32,
        book_id: i32,
        except_id: Option<i32>,
    ) -> Result<Option<Model>, DomainError> {
        let mut query = self
            .scoped()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::BookId.eq(book_id))
            .filter(Column::Status.is_in(ReservationStatus::OPEN));
        if let Some(id) = except_id {
            query = query.filter(Column::Id.ne(id));
        }

        Ok(query.one(self.db).await?)
    }

    pub async fn count_open_for_book(&self, book_id: i32) -> Result<u64, DomainError> {
        Ok(self
            .scoped()
            .filter(Column::BookId.eq(book_id))
            .filter(Column::Status.is_in(ReservationStatus::OPEN))
            .count(self.db)
            .await?)
    }

    pub async fn create(&self, reservation: &Model) -> Result<Model, DomainError> {
        let now = timestamp();
        let mut active = reservation.to_active_model(true);
        active.library_id = Set(self.library_id);
        active.created_at = Set(now.clone());
        active.updated_at = Set(now);

        Ok(active.insert(self.db).await?)
    }

    pub async fn update(&self, reservation: &Model) -> Result<Model, DomainError> {
        if reservation.library_id != self.library_id {
            return Err(DomainError::not_found(format!(
                "Reservación con ID {} no encontrada",
                reservation.id
            )));
        }
        let mut active = reservation.to_active_model(false);
        active.updated_at = Set(timestamp());

        Ok(active.update(self.db).await?)
    }

    pub async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = ReservationEntity::delete_many()
            .filter(Column::Id.eq(id))
            .filter(Column::LibraryId.eq(self.library_id))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found(format!(
                "Reservación con ID {} no encontrada",
                id
            )));
        }
        Ok(())
    }

    /// Removes every reservation of a user, whatever its status.
    pub async fn delete_for_user(&self, user_id: i32) -> Result<u64, DomainError> {
        let result = ReservationEntity::delete_many()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::LibraryId.eq(self.library_id))
            .exec(self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
