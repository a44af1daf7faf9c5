use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Select, Set,
};

use super::timestamp;
use crate::domain::DomainError;
use crate::models::user::{ActiveModel, Column, Entity as UserEntity, Model};

pub struct UserRepository<'a, C> {
    db: &'a C,
    library_id: i32,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    pub fn new(db: &'a C, library_id: i32) -> Self {
        Self { db, library_id }
    }

    fn scoped(&self) -> Select<UserEntity> {
        UserEntity::find().filter(Column::LibraryId.eq(self.library_id))
    }

    pub async fn find_all(&self) -> Result<Vec<Model>, DomainError> {
        Ok(self
            .scoped()
            .order_by_asc(Column::LastName)
            .order_by_asc(Column::FirstName)
            .all(self.db)
            .await?)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Model>, DomainError> {
        Ok(self.scoped().filter(Column::Id.eq(id)).one(self.db).await?)
    }

    pub async fn find_by_code(&self, code: &str) -> Result<Option<Model>, DomainError> {
        Ok(self.scoped().filter(Column::Code.eq(code)).one(self.db).await?)
    }

    pub async fn find_by_dni(&self, dni: &str) -> Result<Option<Model>, DomainError> {
        Ok(self.scoped().filter(Column::Dni.eq(dni)).one(self.db).await?)
    }

    pub async fn create(&self, user: &Model) -> Result<Model, DomainError> {
        let now = timestamp();
        let active = ActiveModel {
            id: NotSet,
            library_id: Set(self.library_id),
            code: Set(user.code.clone()),
            dni: Set(user.dni.clone()),
            first_name: Set(user.first_name.clone()),
            last_name: Set(user.last_name.clone()),
            email: Set(user.email.clone()),
            phone: Set(user.phone.clone()),
            user_type: Set(user.user_type),
            status: Set(user.status),
            registration_date: Set(user.registration_date),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        Ok(active.insert(self.db).await?)
    }

    pub async fn delete(&self, id: i32) -> Result<(), DomainError> {
        let result = UserEntity::delete_many()
            .filter(Column::Id.eq(id))
            .filter(Column::LibraryId.eq(self.library_id))
            .exec(self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found(format!(
                "Usuario con ID {} no encontrado",
                id
            )));
        }
        Ok(())
    }
}
