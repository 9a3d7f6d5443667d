use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "resultat")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id_resultat: i32,
    pub score: i32,
    pub niveau: String,
    pub date_test: Option<DateTimeUtc>,
    pub id_user: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
