use sea_orm::entity::prelude::*;

/// `is_active` is left out on purpose: older databases lack the column, so
/// it is only ever read or written through raw statements.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "utilisateur")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id_user: i32,
    pub nom: String,
    #[sea_orm(unique)]
    pub email: String,
    pub mot_de_passe: String,
    pub date_inscription: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
