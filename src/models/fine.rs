use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Unchanged};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub library_id: i32,
    pub user_id: i32,
    pub loan_id: Option<i32>,
    pub reason: FineReason,
    pub amount: f64,
    pub generated_date: DateTimeUtc,
    pub payment_date: Option<DateTimeUtc>,
    pub status: FineStatus,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum FineReason {
    #[sea_orm(string_value = "Overdue")]
    Overdue,
    #[sea_orm(string_value = "Damage")]
    Damage,
    #[sea_orm(string_value = "Loss")]
    Loss,
}

/// `Pending` until it reaches one of the terminal states `Paid` or `Waived`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum FineStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Paid")]
    Paid,
    #[sea_orm(string_value = "Waived")]
    Waived,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::loan::Entity",
        from = "Column::LoanId",
        to = "super::loan::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Loan,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn to_active_model(&self, insert: bool) -> ActiveModel {
        ActiveModel {
            id: if insert { NotSet } else { Unchanged(self.id) },
            library_id: Set(self.library_id),
            user_id: Set(self.user_id),
            loan_id: Set(self.loan_id),
            reason: Set(self.reason),
            amount: Set(self.amount),
            generated_date: Set(self.generated_date),
            payment_date: Set(self.payment_date),
            status: Set(self.status),
            notes: Set(self.notes.clone()),
            created_at: Set(self.created_at.clone()),
            updated_at: Set(self.updated_at.clone()),
        }
    }
}

/// Body of `POST /fines`. New fines always start `Pending`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFine {
    pub user_id: i32,
    pub loan_id: Option<i32>,
    pub reason: FineReason,
    pub amount: f64,
    pub notes: Option<String>,
}

/// Body of `PUT /fines/{id}`. Status moves go through pay/waive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FineUpdate {
    pub reason: Option<FineReason>,
    pub amount: Option<f64>,
    pub notes: Option<String>,
}
