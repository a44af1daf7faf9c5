use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Circulation parameters of one library (at most one row per `library_id`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "configurations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub library_id: i32,
    pub student_loan_days: i32,
    pub teacher_loan_days: i32,
    pub max_renewals: i32,
    pub max_books_per_loan: i32,
    pub fine_per_day: f64,
    pub reservation_days: i32,
    pub grace_days: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::library::Entity",
        from = "Column::LibraryId",
        to = "super::library::Column::Id"
    )]
    Library,
}

impl Related<super::library::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Library.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Partial update accepted by `PUT /configuration`
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ConfigurationUpdate {
    pub student_loan_days: Option<i32>,
    pub teacher_loan_days: Option<i32>,
    pub max_renewals: Option<i32>,
    pub max_books_per_loan: Option<i32>,
    pub fine_per_day: Option<f64>,
    pub reservation_days: Option<i32>,
    pub grace_days: Option<i32>,
}
