use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryResult,
    Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::auth::AdminAuth;
use crate::entity::utilisateur;
use crate::error::{db_error, is_duplicate_key, AppError};
use crate::response::MessageDto;
use crate::routes::auth::{check_email, create_user, RegisterRequest};
use crate::routes::{exec_sql, query_all, query_one, required, to_rfc3339};

const STATUS_SKIPPED: &str =
    "User status feature not available (schema missing), client updated locally";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(
        web::resource("/{id:\\d+}")
            .route(web::get().to(get_user))
            .route(web::patch().to(patch_user))
            .route(web::delete().to(remove)),
    );
}

#[derive(Deserialize)]
struct PatchUserRequest {
    is_active: Option<JsonValue>,
    #[serde(alias = "nom")]
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct UserDto {
    id: i32,
    name: String,
    email: String,
    date_inscription: Option<String>,
    is_active: bool,
}

/// Older databases were created before the `is_active` column existed.
async fn has_active_column(db: &DatabaseConnection) -> bool {
    query_all(
        db,
        "SHOW COLUMNS FROM utilisateur LIKE 'is_active'",
        vec![],
        "Failed to inspect utilisateur columns",
    )
    .await
    .map(|rows| !rows.is_empty())
    .unwrap_or(false)
}

fn select_sql(with_active: bool) -> String {
    let active = if with_active { "is_active" } else { "1" };
    format!(
        "SELECT id_user AS id, nom AS name, email, date_inscription, {} AS is_active \
         FROM utilisateur",
        active
    )
}

async fn list(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
) -> Result<HttpResponse, AppError> {
    let with_active = has_active_column(db.get_ref()).await;
    let sql = format!("{} ORDER BY date_inscription DESC", select_sql(with_active));
    let rows = query_all(db.get_ref(), &sql, vec![], "Failed to fetch users").await?;
    let list = rows.iter().map(map_user_row).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(list))
}

async fn get_user(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let with_active = has_active_column(db.get_ref()).await;
    let sql = format!("{} WHERE id_user = ?", select_sql(with_active));
    let row = query_one(db.get_ref(), &sql, vec![(*path).into()], "Failed to fetch user")
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(HttpResponse::Ok().json(map_user_row(&row)))
}

async fn create(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let id = create_user(db.get_ref(), &payload).await?;
    Ok(HttpResponse::Created().json(MessageDto::with_id(id, "User created successfully")))
}

async fn patch_user(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
    payload: web::Json<PatchUserRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let active_flag = payload.is_active.as_ref().map(parse_flag).transpose()?;
    let name = required(&payload.name);
    let email = required(&payload.email);
    if active_flag.is_none() && name.is_none() && email.is_none() {
        return Err(AppError::param_error("Nothing to update"));
    }

    if name.is_some() || email.is_some() {
        if let Some(email) = email {
            check_email(email)?;
        }
        let res = utilisateur::Entity::update_many()
            .set(utilisateur::ActiveModel {
                nom: name.map_or(NotSet, |n| Set(n.to_string())),
                email: email.map_or(NotSet, |e| Set(e.to_string())),
                ..Default::default()
            })
            .filter(utilisateur::Column::IdUser.eq(id))
            .exec(db.get_ref())
            .await
            .map_err(|err| {
                if is_duplicate_key(&err) {
                    AppError::conflict("Email already exists")
                } else {
                    db_error("Failed to update user")(err)
                }
            })?;
        if res.rows_affected == 0 {
            return Err(AppError::not_found("User not found"));
        }
    }

    if let Some(flag) = active_flag {
        if !has_active_column(db.get_ref()).await {
            warn!("is_active column missing, status for user {} not stored", id);
            return Ok(HttpResponse::Ok().json(MessageDto::with_id(id, STATUS_SKIPPED)));
        }
        let affected = exec_sql(
            db.get_ref(),
            "UPDATE utilisateur SET is_active = ? WHERE id_user = ?",
            vec![flag.into(), id.into()],
            "Failed to update user",
        )
        .await?;
        if affected == 0 {
            return Err(AppError::not_found("User not found"));
        }
    }

    Ok(HttpResponse::Ok().json(MessageDto::with_id(id, "User updated successfully")))
}

async fn remove(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    utilisateur::Entity::delete_by_id(path.into_inner())
        .exec(db.get_ref())
        .await
        .map_err(db_error("Failed to delete user"))?;
    Ok(HttpResponse::Ok().json(MessageDto::new("User deleted successfully")))
}

/// Accepts `true`/`false` as well as `1`/`0`.
fn parse_flag(value: &JsonValue) -> Result<bool, AppError> {
    match value {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::Number(n) => n
            .as_i64()
            .map(|v| v != 0)
            .ok_or_else(|| AppError::param_error("Invalid is_active value")),
        _ => Err(AppError::param_error("Invalid is_active value")),
    }
}

fn map_user_row(row: &QueryResult) -> UserDto {
    UserDto {
        id: row.try_get("", "id").unwrap_or(0),
        name: row.try_get("", "name").unwrap_or_default(),
        email: row.try_get("", "email").unwrap_or_default(),
        date_inscription: get_datetime(row, "date_inscription").map(to_rfc3339),
        is_active: get_flag(row, "is_active"),
    }
}

fn get_flag(row: &QueryResult, col: &str) -> bool {
    row.try_get::<bool>("", col)
        .ok()
        .or_else(|| row.try_get::<i64>("", col).ok().map(|v| v != 0))
        .or_else(|| row.try_get::<i32>("", col).ok().map(|v| v != 0))
        .or_else(|| row.try_get::<i8>("", col).ok().map(|v| v != 0))
        .unwrap_or(true)
}

fn get_datetime(row: &QueryResult, col: &str) -> Option<DateTime<Utc>> {
    row.try_get::<DateTime<Utc>>("", col)
        .ok()
        .or_else(|| row.try_get::<NaiveDateTime>("", col).ok().map(|dt| dt.and_utc()))
        .or_else(|| {
            row.try_get::<String>("", col).ok().and_then(|s| {
                NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|dt| dt.and_utc())
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin_bearer, config_data};
    use actix_web::{http::StatusCode, App};
    use actix_web::test::{
        call_and_read_body_json, call_service, init_service, read_body_json, TestRequest,
    };
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn column_row() -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("Field", Value::String(Some(Box::new("is_active".to_string()))))])
    }

    fn user_row(id: i32, active: Value) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("id", Value::Int(Some(id))),
            ("name", Value::String(Some(Box::new("Jessica".to_string())))),
            ("email", Value::String(Some(Box::new("jessica@example.com".to_string())))),
            (
                "date_inscription",
                Value::String(Some(Box::new("2025-01-02 03:04:05".to_string()))),
            ),
            ("is_active", active),
        ])
    }

    #[test]
    fn flag_accepts_bools_and_numbers() {
        assert!(parse_flag(&json!(true)).unwrap());
        assert!(!parse_flag(&json!(0)).unwrap());
        assert!(parse_flag(&json!(1)).unwrap());
        assert!(parse_flag(&json!("yes")).is_err());
    }

    #[test]
    fn select_falls_back_to_constant_status() {
        assert!(select_sql(false).contains("1 AS is_active"));
        assert!(select_sql(true).contains("is_active AS is_active"));
    }

    #[actix_rt::test]
    async fn list_reads_status_column() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![column_row()]])
            .append_query_results([vec![user_row(3, Value::Int(Some(0)))]])
            .into_connection();
        let config = config_data();
        let bearer = admin_bearer(&config);
        let app = init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(config)
                .service(web::scope("/api/admin/users").configure(super::config)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/api/admin/users")
            .insert_header(("Authorization", bearer))
            .to_request();
        let body: JsonValue = call_and_read_body_json(&app, req).await;
        assert_eq!(
            body,
            json!([{
                "id": 3,
                "name": "Jessica",
                "email": "jessica@example.com",
                "date_inscription": "2025-01-02T03:04:05.000+00:00",
                "is_active": false
            }])
        );
    }

    #[actix_rt::test]
    async fn status_patch_is_skipped_without_column() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();
        let config = config_data();
        let bearer = admin_bearer(&config);
        let app = init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(config)
                .service(web::scope("/api/admin/users").configure(super::config)),
        )
        .await;

        let req = TestRequest::patch()
            .uri("/api/admin/users/3")
            .insert_header(("Authorization", bearer))
            .set_json(json!({"is_active": false}))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: JsonValue = read_body_json(resp).await;
        assert_eq!(body["message"], STATUS_SKIPPED);
    }

    #[actix_rt::test]
    async fn status_patch_writes_column() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![column_row()]])
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
                .service(web::scope("/api/admin/users").configure(super::config)),
        )
        .await;

        let req = TestRequest::patch()
            .uri("/api/admin/users/3")
            .insert_header(("Authorization", bearer))
            .set_json(json!({"is_active": 1}))
            .to_request();
        let body: JsonValue = call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"id": 3, "message": "User updated successfully"}));
    }

    #[actix_rt::test]
    async fn unknown_user_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![column_row()]])
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();
        let config = config_data();
        let bearer = admin_bearer(&config);
        let app = init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(config)
                .service(web::scope("/api/admin/users").configure(super::config)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/api/admin/users/404")
            .insert_header(("Authorization", bearer))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
