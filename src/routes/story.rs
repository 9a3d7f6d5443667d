use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Select, Set,
};
use serde::{Deserialize, Serialize};

use crate::auth::{AdminAuth, UserAuth};
use crate::entity::story::{self, StoryStatus};
use crate::error::{db_error, AppError};
use crate::response::MessageDto;
use crate::routes::{required, to_rfc3339};

const TITLE_FALLBACK_CHARS: usize = 80;

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(
        web::resource("/{id:\\d+}")
            .route(web::get().to(get_story))
            .route(web::patch().to(update_status))
            .route(web::delete().to(remove)),
    );
}

pub fn public_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(public_list))
            .route(web::post().to(submit)),
    );
}

#[derive(Deserialize)]
struct StoryQuery {
    statut: Option<String>,
}

#[derive(Deserialize)]
struct UpdateStatusRequest {
    statut: Option<String>,
}

#[derive(Deserialize)]
struct SaveStoryRequest {
    titre: Option<String>,
    contenu: Option<String>,
    statut: Option<String>,
    is_anonymous: Option<bool>,
    id_user: Option<i32>,
}

#[derive(Serialize)]
struct StoryDto {
    id: i32,
    titre: String,
    contenu: String,
    statut: String,
    is_anonymous: bool,
    date_creation: Option<String>,
    id_user: Option<i32>,
    id_admin: Option<i32>,
}

#[derive(Serialize)]
struct PublicStoryDto {
    id: i32,
    titre: String,
    contenu: String,
    is_anonymous: bool,
    date_creation: Option<String>,
}

fn parse_status(value: Option<&str>) -> Result<StoryStatus, AppError> {
    value
        .and_then(|s| s.parse::<StoryStatus>().ok())
        .ok_or_else(|| AppError::param_error("Invalid status"))
}

/// Stored title, or the first 80 characters of the content followed by `...`.
fn display_title(titre: Option<&str>, contenu: &str) -> String {
    if let Some(titre) = titre.map(str::trim).filter(|t| !t.is_empty()) {
        return titre.to_string();
    }
    if contenu.chars().count() > TITLE_FALLBACK_CHARS {
        let head: String = contenu.chars().take(TITLE_FALLBACK_CHARS).collect();
        format!("{}...", head)
    } else {
        contenu.to_string()
    }
}

async fn list(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    query: web::Query<StoryQuery>,
) -> Result<HttpResponse, AppError> {
    let mut select = story::Entity::find();
    if let Some(statut) = required(&query.statut) {
        let statut = parse_status(Some(statut))?;
        select = select.filter(story::Column::Statut.eq(statut.as_str()));
    }
    let rows = select
        .order_by_desc(story::Column::DatePub)
        .all(db.get_ref())
        .await
        .map_err(db_error("Failed to fetch stories"))?;
    let list = rows.into_iter().map(to_dto).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(list))
}

fn approved_stories() -> Select<story::Entity> {
    story::Entity::find()
        .filter(story::Column::Statut.eq(StoryStatus::Approved.as_str()))
        .order_by_desc(story::Column::DatePub)
}

async fn public_list(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let rows = approved_stories()
        .all(db.get_ref())
        .await
        .map_err(db_error("Failed to fetch stories"))?;
    let list = rows
        .into_iter()
        .map(|s| PublicStoryDto {
            id: s.id_story,
            titre: display_title(s.titre.as_deref(), &s.contenu),
            is_anonymous: s.is_anonymous.unwrap_or(false),
            date_creation: s.date_pub.map(to_rfc3339),
            contenu: s.contenu,
        })
        .collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(list))
}

async fn get_story(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let row = story::Entity::find_by_id(*path)
        .one(db.get_ref())
        .await
        .map_err(db_error("Failed to fetch story"))?
        .ok_or_else(|| AppError::not_found("Story not found"))?;
    Ok(HttpResponse::Ok().json(to_dto(row)))
}

async fn create(
    db: web::Data<DatabaseConnection>,
    auth: AdminAuth,
    payload: web::Json<SaveStoryRequest>,
) -> Result<HttpResponse, AppError> {
    let contenu = required(&payload.contenu)
        .ok_or_else(|| AppError::param_error("Missing required fields"))?;
    let statut = match payload.statut.as_deref() {
        Some(s) => parse_status(Some(s))?,
        None => StoryStatus::Pending,
    };
    let active = story::ActiveModel {
        titre: Set(required(&payload.titre).map(str::to_string)),
        contenu: Set(contenu.to_string()),
        statut: Set(statut.as_str().to_string()),
        is_anonymous: Set(Some(payload.is_anonymous.unwrap_or(false))),
        date_pub: Set(Some(Utc::now())),
        id_user: Set(payload.id_user),
        id_admin: Set(Some(auth.admin_id)),
        ..Default::default()
    };
    let res = story::Entity::insert(active)
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to create story"))?;
    Ok(HttpResponse::Created().json(MessageDto::with_id(
        res.last_insert_id,
        "Story created successfully",
    )))
}

/// User submissions always start as pending and wait for moderation; any
/// `statut` in the payload is ignored.
fn pending_submission(
    payload: &SaveStoryRequest,
    user_id: i32,
) -> Result<story::ActiveModel, AppError> {
    let contenu = required(&payload.contenu)
        .ok_or_else(|| AppError::param_error("Missing required fields"))?;
    Ok(story::ActiveModel {
        titre: Set(required(&payload.titre).map(str::to_string)),
        contenu: Set(contenu.to_string()),
        statut: Set(StoryStatus::Pending.as_str().to_string()),
        is_anonymous: Set(Some(payload.is_anonymous.unwrap_or(false))),
        date_pub: Set(Some(Utc::now())),
        id_user: Set(Some(user_id)),
        ..Default::default()
    })
}

async fn submit(
    db: web::Data<DatabaseConnection>,
    auth: UserAuth,
    payload: web::Json<SaveStoryRequest>,
) -> Result<HttpResponse, AppError> {
    let active = pending_submission(&payload, auth.user_id)?;
    let res = story::Entity::insert(active)
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to submit story"))?;
    info!("user {} submitted story {}", auth.user_id, res.last_insert_id);
    Ok(HttpResponse::Created().json(MessageDto::with_id(
        res.last_insert_id,
        "Story submitted for review",
    )))
}

async fn update_status(
    db: web::Data<DatabaseConnection>,
    auth: AdminAuth,
    path: web::Path<i32>,
    payload: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let statut = parse_status(payload.statut.as_deref())?;
    let res = story::Entity::update_many()
        .set(story::ActiveModel {
            statut: Set(statut.as_str().to_string()),
            id_admin: Set(Some(auth.admin_id)),
            ..Default::default()
        })
        .filter(story::Column::IdStory.eq(id))
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to update story"))?;
    if res.rows_affected == 0 {
        return Err(AppError::not_found("Story not found"));
    }
    info!("admin {} marked story {} as {}", auth.admin_id, id, statut);
    Ok(HttpResponse::Ok().json(MessageDto::with_id(id, "Story updated successfully")))
}

async fn remove(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    story::Entity::delete_by_id(path.into_inner())
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to delete story"))?;
    Ok(HttpResponse::Ok().json(MessageDto::new("Story deleted successfully")))
}

fn to_dto(model: story::Model) -> StoryDto {
    StoryDto {
        id: model.id_story,
        titre: display_title(model.titre.as_deref(), &model.contenu),
        statut: model.statut,
        is_anonymous: model.is_anonymous.unwrap_or(false),
        date_creation: model.date_pub.map(to_rfc3339),
        id_user: model.id_user,
        id_admin: model.id_admin,
        contenu: model.contenu,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin_bearer, config_data, user_bearer};
    use actix_web::{http::StatusCode, App};
    use actix_web::test::{
        call_and_read_body_json, call_service, init_service, read_body_json, TestRequest,
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait};
    use serde_json::{json, Value};

    fn approved_story() -> story::Model {
        story::Model {
            id_story: 5,
            titre: None,
            contenu: "I deleted the app for a month.".to_string(),
            statut: "approved".to_string(),
            is_anonymous: Some(true),
            date_pub: None,
            id_user: Some(2),
            id_admin: Some(1),
        }
    }

    #[test]
    fn title_falls_back_to_content_prefix() {
        assert_eq!(display_title(Some("My month"), "body"), "My month");
        assert_eq!(display_title(Some("  "), "short body"), "short body");
        let long = "é".repeat(100);
        let title = display_title(None, &long);
        assert_eq!(title.chars().count(), 83);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn only_three_statuses_are_valid() {
        assert_eq!(parse_status(Some("approved")).unwrap(), StoryStatus::Approved);
        assert!(parse_status(Some("archived")).is_err());
        assert!(parse_status(Some("Approved")).is_err());
        assert!(parse_status(None).is_err());
    }

    #[actix_rt::test]
    async fn public_list_only_queries_approved_stories() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![approved_story()]])
            .into_connection();
        let app = init_service(
            App::new()
                .app_data(web::Data::new(db))
                .service(web::scope("/stories").configure(public_config)),
        )
        .await;

        let req = TestRequest::get().uri("/stories").to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(
            body,
            json!([{
                "id": 5,
                "titre": "I deleted the app for a month.",
                "contenu": "I deleted the app for a month.",
                "is_anonymous": true,
                "date_creation": null
            }])
        );

    }

    #[test]
    fn public_query_filters_on_approved_status() {
        let sql = approved_stories().build(DatabaseBackend::MySql).to_string();
        assert!(sql.contains("`stories`.`statut` = 'approved'"));
        assert!(sql.contains("ORDER BY `stories`.`date_pub` DESC"));
    }

    #[actix_rt::test]
    async fn status_outside_the_three_values_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::MySql).into_connection();
        let config = config_data();
        let bearer = admin_bearer(&config);
        let app = init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(config)
                .service(web::scope("/api/admin/stories").configure(admin_config)),
        )
        .await;

        let req = TestRequest::patch()
            .uri("/api/admin/stories/5")
            .insert_header(("Authorization", bearer))
            .set_json(json!({"statut": "published"}))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Invalid status"}));
    }

    #[actix_rt::test]
    async fn admin_can_approve_a_story() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let config = config_data();
        let bearer = admin_bearer(&config);
        let app = init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(config)
                .service(web::scope("/api/admin/stories").configure(admin_config)),
        )
        .await;

        let req = TestRequest::patch()
            .uri("/api/admin/stories/5")
            .insert_header(("Authorization", bearer))
            .set_json(json!({"statut": "approved"}))
            .to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"id": 5, "message": "Story updated successfully"}));
    }

    #[actix_rt::test]
    async fn user_submission_is_stored_as_pending() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_exec_results([MockExecResult {
                last_insert_id: 21,
                rows_affected: 1,
            }])
            .into_connection();
        let config = config_data();
        let bearer = user_bearer(&config, 2);
        let app = init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(config)
                .service(web::scope("/stories").configure(public_config)),
        )
        .await;

        let req = TestRequest::post()
            .uri("/stories")
            .insert_header(("Authorization", bearer))
            .set_json(json!({"contenu": "Week one without reels", "statut": "approved"}))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body, json!({"id": 21, "message": "Story submitted for review"}));
    }

    #[test]
    fn submitted_status_is_forced_to_pending() {
        let payload: SaveStoryRequest = serde_json::from_value(json!({
            "contenu": "Week one without reels",
            "statut": "approved"
        }))
        .unwrap();
        let row = pending_submission(&payload, 2).unwrap();
        assert_eq!(row.statut, Set("pending".to_string()));
        assert_eq!(row.id_user, Set(Some(2)));
        assert_eq!(row.id_admin, sea_orm::ActiveValue::NotSet);

        let empty: SaveStoryRequest = serde_json::from_value(json!({"contenu": "  "})).unwrap();
        assert!(pending_submission(&empty, 2).is_err());
    }
}
