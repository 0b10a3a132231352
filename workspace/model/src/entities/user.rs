use sea_orm::entity::prelude::*;

/// A registered person. The primary key is the subject of their bearer token.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub display_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub photo_url: Option<String>,
    pub payment_method: Option<String>,
    pub payment_link: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Houses this user is head of.
    #[sea_orm(has_many = "super::house::Entity")]
    House,
    #[sea_orm(has_many = "super::house_member::Entity")]
    HouseMember,
}

impl Related<super::house::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::House.def()
    }
}

impl Related<super::house_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HouseMember.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
