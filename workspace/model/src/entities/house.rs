use sea_orm::entity::prelude::*;

/// A shared household. `user_id` is the head of house.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "houses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub house_id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub invite_code: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The head of house. Deleting a user that still heads a house is rejected.
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::UserId",
        on_delete = "Restrict"
    )]
    User,
    #[sea_orm(has_many = "super::house_member::Entity")]
    HouseMember,
    #[sea_orm(has_many = "super::expense::Entity")]
    Expense,
    #[sea_orm(has_many = "super::recurring_expense::Entity")]
    RecurringExpense,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::house_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HouseMember.def()
    }
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl Related<super::recurring_expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringExpense.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
