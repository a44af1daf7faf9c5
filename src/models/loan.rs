use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Unchanged};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub library_id: i32,
    #[sea_orm(unique)]
    pub loan_code: String,
    pub user_id: i32,
    pub copy_id: i32,
    pub loan_date: DateTimeUtc,
    pub due_date: DateTimeUtc,
    pub return_date: Option<DateTimeUtc>,
    pub status: LoanStatus,
    pub loan_days: i32,
    pub renewals: i32,
    pub notes: Option<String>,
    pub librarian_id: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

/// Lifecycle of a borrowing contract.
///
/// `Overdue` is normally derived (`Active` with a past due date); the stored
/// variant only exists for administrative updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum LoanStatus {
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Returned")]
    Returned,
    #[sea_orm(string_value = "Overdue")]
    Overdue,
    #[sea_orm(string_value = "Lost")]
    Lost,
}

impl LoanStatus {
    /// Whether the loan still holds its copy.
    pub fn is_open(self) -> bool {
        match self {
            LoanStatus::Active | LoanStatus::Overdue => true,
            LoanStatus::Returned | LoanStatus::Lost => false,
        }
    }

    /// Status moves accepted through the administrative update path.
    /// Returning a loan goes through `loan_service::return_loan` only.
    pub fn can_become(self, next: LoanStatus) -> bool {
        if self == next {
            return true;
        }
        match (self, next) {
            (LoanStatus::Active, LoanStatus::Overdue) | (LoanStatus::Overdue, LoanStatus::Active) => {
                true
            }
            (LoanStatus::Active | LoanStatus::Overdue, LoanStatus::Lost) => true,
            _ => false,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::copy::Entity",
        from = "Column::CopyId",
        to = "super::copy::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Copy,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::copy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Copy.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Derived overdue state: still `Active` and past its due date.
    pub fn is_overdue_at(&self, now: DateTimeUtc) -> bool {
        self.status == LoanStatus::Active && self.due_date < now
    }

    /// Whole days elapsed since the due date (`floor(hours / 24)`), zero when not due yet.
    pub fn days_past_due(&self, now: DateTimeUtc) -> i64 {
        if now <= self.due_date {
            return 0;
        }
        (now - self.due_date).num_hours() / 24
    }

    /// Active model with every column set, ready for an insert (`insert = true`)
    /// or a full-row update.
    pub fn to_active_model(&self, insert: bool) -> ActiveModel {
        ActiveModel {
            id: if insert { NotSet } else { Unchanged(self.id) },
            library_id: Set(self.library_id),
            loan_code: Set(self.loan_code.clone()),
            user_id: Set(self.user_id),
            copy_id: Set(self.copy_id),
            loan_date: Set(self.loan_date),
            due_date: Set(self.due_date),
            return_date: Set(self.return_date),
            status: Set(self.status),
            loan_days: Set(self.loan_days),
            renewals: Set(self.renewals),
            notes: Set(self.notes.clone()),
            librarian_id: Set(self.librarian_id),
            created_at: Set(self.created_at.clone()),
            updated_at: Set(self.updated_at.clone()),
        }
    }
}

/// Body of `POST /loans`. Omitted dates and quota are filled from the
/// library's circulation policy.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLoan {
    pub loan_code: String,
    pub user_id: i32,
    pub copy_id: i32,
    pub loan_date: Option<DateTimeUtc>,
    pub due_date: Option<DateTimeUtc>,
    pub loan_days: Option<i32>,
    pub notes: Option<String>,
    pub librarian_id: Option<i32>,
}

/// Body of `PUT /loans/{id}`. The borrower and the copy are fixed for the
/// life of a loan.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoanUpdate {
    pub loan_date: Option<DateTimeUtc>,
    pub due_date: Option<DateTimeUtc>,
    pub status: Option<LoanStatus>,
    pub loan_days: Option<i32>,
    pub renewals: Option<i32>,
    pub notes: Option<String>,
    pub librarian_id: Option<i32>,
}
