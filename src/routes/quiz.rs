use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};

use crate::auth::OptionalUserAuth;
use crate::entity::resultat;
use crate::error::{db_error, AppError};
use crate::quiz::{all_answered, evaluate, questionnaire, QuizResult, RiskTier};
use crate::response::MessageDto;

/// Highest score a ten-question questionnaire can produce.
const MAX_SCORE: i32 = 10;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(get_quiz)))
        .service(web::resource("/submit").route(web::post().to(submit)));
}

pub fn results_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::post().to(save_result)));
}

#[derive(Deserialize)]
struct SubmitRequest {
    #[serde(default)]
    answers: HashMap<i32, usize>,
}

#[derive(Serialize)]
struct SubmitResponse {
    id: i32,
    #[serde(flatten)]
    result: QuizResult,
}

#[derive(Deserialize)]
struct SaveResultRequest {
    score: Option<i32>,
    niveau: Option<String>,
}

async fn get_quiz() -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(questionnaire()?))
}

fn result_row(score: i32, tier: RiskTier, user_id: Option<i32>) -> resultat::ActiveModel {
    resultat::ActiveModel {
        score: Set(score),
        niveau: Set(tier.label().to_string()),
        date_test: Set(Some(Utc::now())),
        id_user: Set(user_id),
        ..Default::default()
    }
}

async fn store_result(
    db: &DatabaseConnection,
    score: i32,
    tier: RiskTier,
    user_id: Option<i32>,
) -> Result<i32, AppError> {
    let res = resultat::Entity::insert(result_row(score, tier, user_id))
        .exec(db)
        .await
        .map_err(db_error("Failed to save result"))?;
    Ok(res.last_insert_id)
}

async fn submit(
    db: web::Data<DatabaseConnection>,
    auth: OptionalUserAuth,
    payload: web::Json<SubmitRequest>,
) -> Result<HttpResponse, AppError> {
    let quiz = questionnaire()?;
    if !all_answered(quiz, &payload.answers) {
        return Err(AppError::param_error("All questions must be answered"));
    }
    let result = evaluate(quiz, &payload.answers);
    let user_id = auth.0.map(|u| u.user_id);
    let id = store_result(db.get_ref(), result.score as i32, result.category, user_id).await?;
    info!("quiz result {} stored: {}", id, result.category.label());
    Ok(HttpResponse::Created().json(SubmitResponse { id, result }))
}

async fn save_result(
    db: web::Data<DatabaseConnection>,
    auth: OptionalUserAuth,
    payload: web::Json<SaveResultRequest>,
) -> Result<HttpResponse, AppError> {
    let score = payload
        .score
        .filter(|s| (0..=MAX_SCORE).contains(s))
        .ok_or_else(|| AppError::param_error("Invalid score"))?;
    let tier = payload
        .niveau
        .as_deref()
        .and_then(|n| n.parse::<RiskTier>().ok())
        .ok_or_else(|| AppError::param_error("Invalid level"))?;
    if RiskTier::from_score(score as u32) != tier {
        return Err(AppError::param_error("Level does not match score"));
    }
    let user_id = auth.0.map(|u| u.user_id);
    let id = store_result(db.get_ref(), score, tier, user_id).await?;
    Ok(HttpResponse::Created().json(MessageDto::with_id(id, "Result saved successfully")))
}
