use actix_web::{web, HttpResponse};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use crate::auth::AdminAuth;
use crate::entity::challenge;
use crate::error::{db_error, AppError};
use crate::response::MessageDto;
use crate::routes::required;

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(
        web::resource("/{id:\\d+}")
            .route(web::get().to(get_challenge))
            .route(web::put().to(update))
            .route(web::delete().to(remove)),
    );
}

pub fn public_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(public_list)))
        .service(web::resource("/{id:\\d+}").route(web::get().to(public_get)));
}

#[derive(Deserialize)]
struct ChallengeQuery {
    niveau: Option<String>,
}

#[derive(Deserialize)]
struct SaveChallengeRequest {
    titre: Option<String>,
    description: Option<String>,
    niveau: Option<String>,
    duree: Option<i32>,
}

#[derive(Serialize)]
struct ChallengeDto {
    id: i32,
    titre: String,
    description: String,
    niveau: String,
    duree: i32,
}

impl SaveChallengeRequest {
    fn validate(&self) -> Result<challenge::ActiveModel, AppError> {
        match (
            required(&self.titre),
            required(&self.description),
            required(&self.niveau),
            self.duree,
        ) {
            (Some(titre), Some(description), Some(niveau), Some(duree)) if duree >= 1 => {
                Ok(challenge::ActiveModel {
                    titre: Set(titre.to_string()),
                    description: Set(description.to_string()),
                    niveau: Set(niveau.to_string()),
                    duree: Set(duree),
                    ..Default::default()
                })
            }
            _ => Err(AppError::param_error("Missing required fields")),
        }
    }
}

async fn find_challenges(
    db: &DatabaseConnection,
    query: &ChallengeQuery,
) -> Result<Vec<challenge::Model>, AppError> {
    let mut select = challenge::Entity::find();
    if let Some(niveau) = required(&query.niveau) {
        select = select.filter(challenge::Column::Niveau.eq(niveau));
    }
    select
        .order_by_desc(challenge::Column::IdChallenge)
        .all(db)
        .await
        .map_err(db_error("Failed to fetch challenges"))
}

async fn find_challenge(db: &DatabaseConnection, id: i32) -> Result<challenge::Model, AppError> {
    challenge::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(db_error("Failed to fetch challenge"))?
        .ok_or_else(|| AppError::not_found("Challenge not found"))
}

async fn list(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    query: web::Query<ChallengeQuery>,
) -> Result<HttpResponse, AppError> {
    public_list(db, query).await
}

async fn public_list(
    db: web::Data<DatabaseConnection>,
    query: web::Query<ChallengeQuery>,
) -> Result<HttpResponse, AppError> {
    let rows = find_challenges(db.get_ref(), &query).await?;
    let list = rows.into_iter().map(to_dto).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(list))
}

async fn get_challenge(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    public_get(db, path).await
}

async fn public_get(
    db: web::Data<DatabaseConnection>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let row = find_challenge(db.get_ref(), *path).await?;
    Ok(HttpResponse::Ok().json(to_dto(row)))
}

async fn create(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    payload: web::Json<SaveChallengeRequest>,
) -> Result<HttpResponse, AppError> {
    let active = payload.validate()?;
    let res = challenge::Entity::insert(active)
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to create challenge"))?;
    Ok(HttpResponse::Ok().json(MessageDto::with_id(
        res.last_insert_id,
        "Challenge created successfully",
    )))
}

async fn update(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
    payload: web::Json<SaveChallengeRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let active = payload.validate()?;
    let res = challenge::Entity::update_many()
        .set(active)
        .filter(challenge::Column::IdChallenge.eq(id))
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to update challenge"))?;
    if res.rows_affected == 0 {
        return Err(AppError::not_found("Challenge not found"));
    }
    Ok(HttpResponse::Ok().json(MessageDto::with_id(id, "Challenge updated successfully")))
}

async fn remove(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    challenge::Entity::delete_by_id(path.into_inner())
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to delete challenge"))?;
    Ok(HttpResponse::Ok().json(MessageDto::new("Challenge deleted successfully")))
}

fn to_dto(model: challenge::Model) -> ChallengeDto {
    ChallengeDto {
        id: model.id_challenge,
        titre: model.titre,
        description: model.description,
        niveau: model.niveau,
        duree: model.duree,
    }
}
