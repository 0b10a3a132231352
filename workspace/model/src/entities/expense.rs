use sea_orm::entity::prelude::*;

/// A cost incurred by a house and paid by one of its members.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub expense_id: Uuid,
    pub house_id: Uuid,
    /// Paying house member; cleared if that membership is removed.
    pub paid_by: Option<Uuid>,
    pub description: String,
    pub category: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_amount: Decimal,
    pub expense_date: Date,
    pub is_settled: bool,
    pub settled_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::house::Entity",
        from = "Column::HouseId",
        to = "super::house::Column::HouseId",
        on_delete = "Cascade"
    )]
    House,
    #[sea_orm(
        belongs_to = "super::house_member::Entity",
        from = "Column::PaidBy",
        to = "super::house_member::Column::HouseMemberId",
        on_delete = "SetNull"
    )]
    Payer,
    #[sea_orm(has_many = "super::expense_split::Entity")]
    ExpenseSplit,
    #[sea_orm(has_many = "super::receipt::Entity")]
    Receipt,
}

impl Related<super::house::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::House.def()
    }
}

impl Related<super::expense_split::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseSplit.def()
    }
}

impl Related<super::receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipt.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
