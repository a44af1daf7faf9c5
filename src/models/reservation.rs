use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Unchanged};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub library_id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub reservation_date: DateTimeUtc,
    pub expiration_date: DateTimeUtc,
    pub status: ReservationStatus,
    /// 1..=10, higher is served first
    pub priority: i32,
    pub notified: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ReservationStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
    #[sea_orm(string_value = "Expired")]
    Expired,
    #[sea_orm(string_value = "Completed")]
    Completed,
}

impl ReservationStatus {
    /// The two states that hold a place in the book's queue.
    pub const OPEN: [ReservationStatus; 2] = [ReservationStatus::Pending, ReservationStatus::Active];

    pub fn is_open(self) -> bool {
        match self {
            ReservationStatus::Pending | ReservationStatus::Active => true,
            ReservationStatus::Cancelled
            | ReservationStatus::Expired
            | ReservationStatus::Completed => false,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book::Entity",
        from = "Column::BookId",
        to = "super::book::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Book,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn to_active_model(&self, insert: bool) -> ActiveModel {
        ActiveModel {
            id: if insert { NotSet } else { Unchanged(self.id) },
            library_id: Set(self.library_id),
            user_id: Set(self.user_id),
            book_id: Set(self.book_id),
            reservation_date: Set(self.reservation_date),
            expiration_date: Set(self.expiration_date),
            status: Set(self.status),
            priority: Set(self.priority),
            notified: Set(self.notified),
            created_at: Set(self.created_at.clone()),
            updated_at: Set(self.updated_at.clone()),
        }
    }
}

/// Body of `POST /reservations`
#[derive(Debug, Clone, Deserialize)]
pub struct NewReservation {
    pub user_id: i32,
    pub book_id: i32,
    pub reservation_date: Option<DateTimeUtc>,
    pub expiration_date: Option<DateTimeUtc>,
    pub status: Option<ReservationStatus>,
    pub priority: Option<i32>,
}

/// Body of `PUT /reservations/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationUpdate {
    pub expiration_date: Option<DateTimeUtc>,
    pub status: Option<ReservationStatus>,
    pub priority: Option<i32>,
    pub notified: Option<bool>,
}
