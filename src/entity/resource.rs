use std::str::FromStr;

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "resources")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id_resource: i32,
    pub titre: String,
    pub description: String,
    pub lien: String,
    #[sea_orm(column_name = "type")]
    pub resource_type: String,
    pub date_ajout: Option<DateTimeUtc>,
    pub id_admin: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceType {
    Article,
    Video,
    Poster,
    ExternalLink,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "Article",
            Self::Video => "Video",
            Self::Poster => "Poster",
            Self::ExternalLink => "External link",
        }
    }
}

impl FromStr for ResourceType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Article" => Ok(Self::Article),
            "Video" => Ok(Self::Video),
            "Poster" => Ok(Self::Poster),
            "External link" => Ok(Self::ExternalLink),
            _ => Err(()),
        }
    }
}
