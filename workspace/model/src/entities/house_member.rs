use sea_orm::entity::prelude::*;

/// Membership of a user in a house. `(house_id, user_id)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "house_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub house_member_id: Uuid,
    pub house_id: Uuid,
    pub user_id: Uuid,
    pub nickname: Option<String>,
    /// Elevated role; always set on the head of house.
    pub is_admin: bool,
    pub is_active: bool,
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
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::UserId",
        on_delete = "Restrict"
    )]
    User,
    #[sea_orm(has_many = "super::expense_split::Entity")]
    ExpenseSplit,
}

impl Related<super::house::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::House.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::expense_split::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseSplit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
