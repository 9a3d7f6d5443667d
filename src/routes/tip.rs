use actix_web::{web, HttpResponse};
use log::info;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use crate::auth::AdminAuth;
use crate::entity::tip::{self, TipLevel};
use crate::error::{db_error, AppError};
use crate::quiz::RiskTier;
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
            .route(web::get().to(get_tip))
            .route(web::put().to(update))
            .route(web::delete().to(remove)),
    );
}

pub fn public_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(public_list)));
}

#[derive(Deserialize)]
struct TipQuery {
    niveau: Option<String>,
    risk: Option<String>,
}

#[derive(Deserialize)]
struct SaveTipRequest {
    titre: Option<String>,
    contenu: Option<String>,
    niveau: Option<String>,
}

#[derive(Serialize)]
struct TipDto {
    id: i32,
    titre: String,
    contenu: String,
    niveau: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_admin: Option<i32>,
}

struct ValidTip {
    titre: String,
    contenu: String,
    niveau: TipLevel,
}

impl SaveTipRequest {
    fn validate(&self) -> Result<ValidTip, AppError> {
        let (titre, contenu, niveau) = match (
            required(&self.titre),
            required(&self.contenu),
            required(&self.niveau),
        ) {
            (Some(t), Some(c), Some(n)) => (t, c, n),
            _ => return Err(AppError::param_error("Missing required fields")),
        };
        let niveau = niveau
            .parse::<TipLevel>()
            .map_err(|_| AppError::param_error("Invalid level"))?;
        Ok(ValidTip {
            titre: titre.to_string(),
            contenu: contenu.to_string(),
            niveau,
        })
    }
}

impl TipQuery {
    /// `niveau` wins over `risk`; a risk category maps to its tip level.
    fn level(&self) -> Result<Option<TipLevel>, AppError> {
        if let Some(niveau) = required(&self.niveau) {
            return niveau
                .parse::<TipLevel>()
                .map(Some)
                .map_err(|_| AppError::param_error("Invalid level"));
        }
        if let Some(risk) = required(&self.risk) {
            return risk
                .parse::<RiskTier>()
                .map(|tier| Some(tier.tip_level()))
                .map_err(|_| AppError::param_error("Invalid risk category"));
        }
        Ok(None)
    }
}

async fn find_tips(
    db: &DatabaseConnection,
    level: Option<TipLevel>,
) -> Result<Vec<tip::Model>, AppError> {
    let mut select = tip::Entity::find();
    if let Some(level) = level {
        select = select.filter(tip::Column::Niveau.eq(level.as_str()));
    }
    select
        .order_by_desc(tip::Column::IdTip)
        .all(db)
        .await
        .map_err(db_error("Failed to fetch tips"))
}

async fn list(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    query: web::Query<TipQuery>,
) -> Result<HttpResponse, AppError> {
    let rows = find_tips(db.get_ref(), query.level()?).await?;
    let list = rows.into_iter().map(to_dto).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(list))
}

async fn public_list(
    db: web::Data<DatabaseConnection>,
    query: web::Query<TipQuery>,
) -> Result<HttpResponse, AppError> {
    let rows = find_tips(db.get_ref(), query.level()?).await?;
    let list = rows
        .into_iter()
        .map(|t| TipDto {
            id_admin: None,
            ..to_dto(t)
        })
        .collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(list))
}

async fn get_tip(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let row = tip::Entity::find_by_id(*path)
        .one(db.get_ref())
        .await
        .map_err(db_error("Failed to fetch tip"))?
        .ok_or_else(|| AppError::not_found("Tip not found"))?;
    Ok(HttpResponse::Ok().json(to_dto(row)))
}

async fn create(
    db: web::Data<DatabaseConnection>,
    auth: AdminAuth,
    payload: web::Json<SaveTipRequest>,
) -> Result<HttpResponse, AppError> {
    let tip_data = payload.validate()?;
    let active = tip::ActiveModel {
        titre: Set(tip_data.titre),
        contenu: Set(tip_data.contenu),
        niveau: Set(tip_data.niveau.as_str().to_string()),
        id_admin: Set(Some(auth.admin_id)),
        ..Default::default()
    };
    let res = tip::Entity::insert(active)
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to create tip"))?;
    info!("admin {} created {} tip {}", auth.admin_id, tip_data.niveau, res.last_insert_id);
    Ok(HttpResponse::Ok().json(MessageDto::with_id(res.last_insert_id, "Tip created successfully")))
}

async fn update(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
    payload: web::Json<SaveTipRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let tip_data = payload.validate()?;
    let res = tip::Entity::update_many()
        .set(tip::ActiveModel {
            titre: Set(tip_data.titre),
            contenu: Set(tip_data.contenu),
            niveau: Set(tip_data.niveau.as_str().to_string()),
            ..Default::default()
        })
        .filter(tip::Column::IdTip.eq(id))
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to update tip"))?;
    if res.rows_affected == 0 {
        return Err(AppError::not_found("Tip not found"));
    }
    Ok(HttpResponse::Ok().json(MessageDto::with_id(id, "Tip updated successfully")))
}

async fn remove(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    tip::Entity::delete_by_id(path.into_inner())
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to delete tip"))?;
    Ok(HttpResponse::Ok().json(MessageDto::new("Tip deleted successfully")))
}

fn to_dto(model: tip::Model) -> TipDto {
    TipDto {
        id: model.id_tip,
        titre: model.titre,
        contenu: model.contenu,
        niveau: model.niveau,
        id_admin: model.id_admin,
    }
}
