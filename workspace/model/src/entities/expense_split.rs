use sea_orm::entity::prelude::*;

/// The share of an expense owed by one house member.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_splits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub expense_split_id: Uuid,
    pub expense_id: Uuid,
    pub house_member_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount_owed: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expense::Entity",
        from = "Column::ExpenseId",
        to = "super::expense::Column::ExpenseId",
        on_delete = "Cascade"
    )]
    Expense,
    #[sea_orm(
        belongs_to = "super::house_member::Entity",
        from = "Column::HouseMemberId",
        to = "super::house_member::Column::HouseMemberId",
        on_delete = "Cascade"
    )]
    HouseMember,
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl Related<super::house_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HouseMember.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
