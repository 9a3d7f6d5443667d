use actix_web::{web, HttpResponse};
use log::{info, warn};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, issue_admin_token, verify_password, AdminAuth};
use crate::config::AppConfig;
use crate::entity::admin;
use crate::error::{db_error, is_duplicate_key, AppError};
use crate::response::MessageDto;
use crate::routes::required;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(
        web::resource("/{id:\\d+}")
            .route(web::get().to(get_admin))
            .route(web::put().to(update))
            .route(web::delete().to(remove)),
    );
}

#[derive(Deserialize)]
pub struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    admin: AdminDto,
}

#[derive(Deserialize)]
struct SaveAdminRequest {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct AdminDto {
    id: i32,
    username: String,
}

pub async fn login(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let (username, password) = match (required(&payload.username), payload.password.as_deref()) {
        (Some(u), Some(p)) if !p.is_empty() => (u, p),
        _ => return Err(AppError::param_error("Username and password required")),
    };

    let account = admin::Entity::find()
        .filter(admin::Column::Username.eq(username))
        .one(db.get_ref())
        .await
        .map_err(db_error("Database error"))?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(password, &account.mot_de_passe) {
        warn!("failed admin login for {}", account.username);
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_admin_token(&config, account.id_admin, &account.username)?;
    info!("admin {} logged in", account.username);
    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        admin: to_dto(account),
    }))
}

async fn list(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
) -> Result<HttpResponse, AppError> {
    let rows = admin::Entity::find()
        .order_by_desc(admin::Column::IdAdmin)
        .all(db.get_ref())
        .await
        .map_err(db_error("Failed to fetch admins"))?;
    Ok(HttpResponse::Ok().json(rows.into_iter().map(to_dto).collect::<Vec<_>>()))
}

async fn get_admin(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let row = admin::Entity::find_by_id(*path)
        .one(db.get_ref())
        .await
        .map_err(db_error("Failed to fetch admin"))?
        .ok_or_else(|| AppError::not_found("Admin not found"))?;
    Ok(HttpResponse::Ok().json(to_dto(row)))
}

/// Duplicate usernames surface from the unique index, not a pre-check.
async fn create(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    payload: web::Json<SaveAdminRequest>,
) -> Result<HttpResponse, AppError> {
    let (username, password) = match (required(&payload.username), payload.password.as_deref()) {
        (Some(u), Some(p)) if !p.is_empty() => (u, p),
        _ => return Err(AppError::param_error("Username and password required")),
    };
    let active = admin::ActiveModel {
        username: Set(username.to_string()),
        mot_de_passe: Set(hash_password(password)?),
        ..Default::default()
    };
    let res = admin::Entity::insert(active)
        .exec(db.get_ref())
        .await
        .map_err(|err| duplicate_or(err, "Failed to create admin"))?;
    info!("admin {} created", username);
    Ok(HttpResponse::Ok().json(MessageDto::with_id(
        res.last_insert_id,
        "Admin created successfully",
    )))
}

async fn update(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
    payload: web::Json<SaveAdminRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let username = required(&payload.username);
    let password = payload.password.as_deref().filter(|p| !p.is_empty());
    if username.is_none() && password.is_none() {
        return Err(AppError::param_error("Nothing to update"));
    }

    let active = admin::ActiveModel {
        username: username.map_or(NotSet, |u| Set(u.to_string())),
        mot_de_passe: match password {
            Some(p) => Set(hash_password(p)?),
            None => NotSet,
        },
        ..Default::default()
    };
    let res = admin::Entity::update_many()
        .set(active)
        .filter(admin::Column::IdAdmin.eq(id))
        .exec(db.get_ref())
        .await
        .map_err(|err| duplicate_or(err, "Failed to update admin"))?;
    if res.rows_affected == 0 {
        return Err(AppError::not_found("Admin not found"));
    }
    Ok(HttpResponse::Ok().json(MessageDto::with_id(id, "Admin updated successfully")))
}

async fn remove(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    admin::Entity::delete_by_id(path.into_inner())
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to delete admin"))?;
    Ok(HttpResponse::Ok().json(MessageDto::new("Admin deleted successfully")))
}

fn duplicate_or(err: sea_orm::DbErr, msg: &'static str) -> AppError {
    if is_duplicate_key(&err) {
        AppError::conflict("Username already exists")
    } else {
        db_error(msg)(err)
    }
}

fn to_dto(model: admin::Model) -> AdminDto {
    AdminDto {
        id: model.id_admin,
        username: model.username,
    }
}
