use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "copies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub library_id: i32,
    pub book_id: i32,
    /// Barcode, unique within the library
    pub code: String,
    pub status: CopyStatus,
    pub condition: CopyCondition,
    pub acquisition_date: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Availability status of a physical copy.
/// - `Available`: on shelf, can be loaned
/// - `Borrowed`: held by exactly one open Loan
/// - `Reserved`: set aside for a reservation
/// - `Damaged` / `Lost`: out of circulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum CopyStatus {
    #[sea_orm(string_value = "Available")]
    Available,
    #[sea_orm(string_value = "Borrowed")]
    Borrowed,
    #[sea_orm(string_value = "Reserved")]
    Reserved,
    #[sea_orm(string_value = "Damaged")]
    Damaged,
    #[sea_orm(string_value = "Lost")]
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum CopyCondition {
    #[sea_orm(string_value = "New")]
    New,
    #[sea_orm(string_value = "Good")]
    Good,
    #[sea_orm(string_value = "Fair")]
    Fair,
    #[sea_orm(string_value = "Poor")]
    Poor,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::book::Entity",
        from = "Column::BookId",
        to = "super::book::Column::Id"
    )]
    Book,
    #[sea_orm(
        belongs_to = "super::library::Entity",
        from = "Column::LibraryId",
        to = "super::library::Column::Id"
    )]
    Library,
}

impl Related<super::book::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Book.def()
    }
}

impl Related<super::library::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Library.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Body of `POST /copies`; new copies default to `Available` and `Good`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCopy {
    pub book_id: i32,
    pub code: String,
    pub status: Option<CopyStatus>,
    pub condition: Option<CopyCondition>,
    pub acquisition_date: Option<String>,
    pub notes: Option<String>,
}
