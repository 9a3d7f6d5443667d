use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, issue_user_token, verify_password, UserAuth};
use crate::config::AppConfig;
use crate::entity::utilisateur;
use crate::error::{db_error, is_duplicate_key, AppError};
use crate::response::{ping, MessageDto};
use crate::routes::{required, to_rfc3339};

static EMAIL_RE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"));

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ping").route(web::get().to(ping)))
        .service(web::resource("/register").route(web::post().to(register)))
        .service(web::resource("/login").route(web::post().to(login)))
        .service(web::resource("/me").route(web::get().to(me)));
}

#[derive(Deserialize)]
pub(crate) struct RegisterRequest {
    #[serde(alias = "name")]
    nom: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: UserSummaryDto,
}

#[derive(Serialize)]
struct UserSummaryDto {
    id: i32,
    nom: String,
    email: String,
}

#[derive(Serialize)]
struct ProfileDto {
    id: i32,
    nom: String,
    email: String,
    date_inscription: Option<String>,
}

pub(crate) fn check_email(email: &str) -> Result<(), AppError> {
    let re = EMAIL_RE.as_ref().map_err(|_| AppError::system_exception())?;
    if !re.is_match(email) {
        return Err(AppError::param_error("Invalid email"));
    }
    Ok(())
}

/// Registers a user account; shared by self sign-up and the admin dashboard.
pub(crate) async fn create_user(
    db: &DatabaseConnection,
    payload: &RegisterRequest,
) -> Result<i32, AppError> {
    let (nom, email, password) = match (
        required(&payload.nom),
        required(&payload.email),
        payload.password.as_deref().filter(|p| !p.is_empty()),
    ) {
        (Some(n), Some(e), Some(p)) => (n, e, p),
        _ => return Err(AppError::param_error("All fields are required")),
    };
    check_email(email)?;

    let existing = utilisateur::Entity::find()
        .filter(utilisateur::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(db_error("Database error"))?;
    if existing.is_some() {
        return Err(AppError::conflict("Email already exists"));
    }

    let active = utilisateur::ActiveModel {
        nom: Set(nom.to_string()),
        email: Set(email.to_string()),
        mot_de_passe: Set(hash_password(password)?),
        date_inscription: Set(Some(Utc::now())),
        ..Default::default()
    };
    match utilisateur::Entity::insert(active).exec(db).await {
        Ok(res) => Ok(res.last_insert_id),
        Err(err) if is_duplicate_key(&err) => Err(AppError::conflict("Email already exists")),
        Err(err) => Err(db_error("Failed to register")(err)),
    }
}

async fn register(
    db: web::Data<DatabaseConnection>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let id = create_user(db.get_ref(), &payload).await?;
    info!("user {} registered", id);
    Ok(HttpResponse::Created().json(MessageDto::with_id(id, "User registered successfully")))
}

async fn login(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let (email, password) = match (required(&payload.email), payload.password.as_deref()) {
        (Some(e), Some(p)) if !p.is_empty() => (e, p),
        _ => return Err(AppError::param_error("Email and password required")),
    };

    let user = utilisateur::Entity::find()
        .filter(utilisateur::Column::Email.eq(email))
        .one(db.get_ref())
        .await
        .map_err(db_error("Database error"))?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(password, &user.mot_de_passe) {
        warn!("failed login for user {}", user.id_user);
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_user_token(&config, user.id_user, &user.email)?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: UserSummaryDto {
            id: user.id_user,
            nom: user.nom,
            email: user.email,
        },
    }))
}

async fn me(
    db: web::Data<DatabaseConnection>,
    auth: UserAuth,
) -> Result<HttpResponse, AppError> {
    let user = utilisateur::Entity::find_by_id(auth.user_id)
        .one(db.get_ref())
        .await
        .map_err(db_error("Database error"))?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(HttpResponse::Ok().json(ProfileDto {
        id: user.id_user,
        nom: user.nom,
        email: user.email,
        date_inscription: user.date_inscription.map(to_rfc3339),
    }))
}
