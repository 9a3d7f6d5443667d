use actix_web::{web, HttpResponse};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use crate::auth::AdminAuth;
use crate::entity::resource::{self, ResourceType};
use crate::error::{db_error, AppError};
use crate::response::MessageDto;
use crate::routes::{required, to_rfc3339};

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(
        web::resource("/{id:\\d+}")
            .route(web::get().to(get_resource))
            .route(web::put().to(update))
            .route(web::delete().to(remove)),
    );
}

pub fn public_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(public_list)));
}

#[derive(Deserialize)]
struct ResourceQuery {
    #[serde(rename = "type")]
    resource_type: Option<String>,
}

#[derive(Deserialize)]
struct SaveResourceRequest {
    titre: Option<String>,
    description: Option<String>,
    lien: Option<String>,
    #[serde(rename = "type")]
    resource_type: Option<String>,
}

#[derive(Serialize)]
struct ResourceDto {
    id: i32,
    titre: String,
    description: String,
    lien: String,
    #[serde(rename = "type")]
    resource_type: String,
    date_ajout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_admin: Option<i32>,
}

struct ValidResource {
    titre: String,
    description: String,
    lien: String,
    resource_type: ResourceType,
}

impl SaveResourceRequest {
    fn validate(&self) -> Result<ValidResource, AppError> {
        let (titre, description, lien, resource_type) = match (
            required(&self.titre),
            required(&self.description),
            required(&self.lien),
            required(&self.resource_type),
        ) {
            (Some(t), Some(d), Some(l), Some(r)) => (t, d, l, r),
            _ => return Err(AppError::param_error("Missing required fields")),
        };
        let resource_type = parse_type(resource_type)?;
        Ok(ValidResource {
            titre: titre.to_string(),
            description: description.to_string(),
            lien: lien.to_string(),
            resource_type,
        })
    }
}

fn parse_type(value: &str) -> Result<ResourceType, AppError> {
    value
        .parse::<ResourceType>()
        .map_err(|_| AppError::param_error("Invalid resource type"))
}

async fn find_resources(
    db: &DatabaseConnection,
    query: &ResourceQuery,
) -> Result<Vec<resource::Model>, AppError> {
    let mut select = resource::Entity::find();
    if let Some(kind) = required(&query.resource_type) {
        let kind = parse_type(kind)?;
        select = select.filter(resource::Column::ResourceType.eq(kind.as_str()));
    }
    select
        .order_by_desc(resource::Column::IdResource)
        .all(db)
        .await
        .map_err(db_error("Failed to fetch resources"))
}

async fn list(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    query: web::Query<ResourceQuery>,
) -> Result<HttpResponse, AppError> {
    let rows = find_resources(db.get_ref(), &query).await?;
    let list = rows.into_iter().map(to_dto).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(list))
}

async fn public_list(
    db: web::Data<DatabaseConnection>,
    query: web::Query<ResourceQuery>,
) -> Result<HttpResponse, AppError> {
    let rows = find_resources(db.get_ref(), &query).await?;
    let list = rows
        .into_iter()
        .map(|r| ResourceDto {
            id_admin: None,
            ..to_dto(r)
        })
        .collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(list))
}

async fn get_resource(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let row = resource::Entity::find_by_id(*path)
        .one(db.get_ref())
        .await
        .map_err(db_error("Failed to fetch resource"))?
        .ok_or_else(|| AppError::not_found("Resource not found"))?;
    Ok(HttpResponse::Ok().json(to_dto(row)))
}

async fn create(
    db: web::Data<DatabaseConnection>,
    auth: AdminAuth,
    payload: web::Json<SaveResourceRequest>,
) -> Result<HttpResponse, AppError> {
    let data = payload.validate()?;
    let active = resource::ActiveModel {
        titre: Set(data.titre),
        description: Set(data.description),
        lien: Set(data.lien),
        resource_type: Set(data.resource_type.as_str().to_string()),
        id_admin: Set(Some(auth.admin_id)),
        ..Default::default()
    };
    let res = resource::Entity::insert(active)
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to create resource"))?;
    Ok(HttpResponse::Ok().json(MessageDto::with_id(
        res.last_insert_id,
        "Resource created successfully",
    )))
}

async fn update(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
    payload: web::Json<SaveResourceRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let data = payload.validate()?;
    let res = resource::Entity::update_many()
        .set(resource::ActiveModel {
            titre: Set(data.titre),
            description: Set(data.description),
            lien: Set(data.lien),
            resource_type: Set(data.resource_type.as_str().to_string()),
            ..Default::default()
        })
        .filter(resource::Column::IdResource.eq(id))
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to update resource"))?;
    if res.rows_affected == 0 {
        return Err(AppError::not_found("Resource not found"));
    }
    Ok(HttpResponse::Ok().json(MessageDto::with_id(id, "Resource updated successfully")))
}

/// Answers success even when no row had that id.
async fn remove(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    resource::Entity::delete_by_id(path.into_inner())
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to delete resource"))?;
    Ok(HttpResponse::Ok().json(MessageDto::new("Resource deleted successfully")))
}

fn to_dto(model: resource::Model) -> ResourceDto {
    ResourceDto {
        id: model.id_resource,
        titre: model.titre,
        description: model.description,
        lien: model.lien,
        resource_type: model.resource_type,
        date_ajout: model.date_ajout.map(to_rfc3339),
        id_admin: model.id_admin,
    }
}
