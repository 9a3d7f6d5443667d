pub mod admin;
pub mod auth;
pub mod challenge;
pub mod cors;
pub mod quiz;
pub mod resource;
pub mod stats;
pub mod story;
pub mod tip;
pub mod user;

use actix_web::web;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{ConnectionTrait, QueryResult, Statement};

use crate::error::{db_error, AppError};
use crate::response::ping;

/// Everything served under `/api`.
pub fn api_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/admin").configure(admin_config))
        .service(web::scope("/auth").configure(auth::config))
        .service(web::scope("/quiz").configure(quiz::config))
        .service(web::scope("/results").configure(quiz::results_config))
        .service(web::resource("/ping").route(web::get().to(ping)))
        .configure(public_config);
}

/// Endpoints readable without a token, mounted both under `/api` and at the root.
pub fn public_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/stories").configure(story::public_config))
        .service(web::scope("/tips").configure(tip::public_config))
        .service(web::scope("/resources").configure(resource::public_config))
        .service(web::scope("/challenges").configure(challenge::public_config));
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/login").route(web::post().to(admin::login)))
        .service(web::scope("/admins").configure(admin::config))
        .service(web::scope("/users").configure(user::config))
        .service(web::scope("/stories").configure(story::admin_config))
        .service(web::scope("/tips").configure(tip::admin_config))
        .service(web::scope("/resources").configure(resource::admin_config))
        .service(web::scope("/challenges").configure(challenge::admin_config))
        .configure(stats::config);
}

pub(crate) fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// Trimmed, non-empty value of a required text field.
pub(crate) fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) async fn query_all<C: ConnectionTrait>(
    db: &C,
    sql: &str,
    values: Vec<sea_orm::Value>,
    context: &'static str,
) -> Result<Vec<QueryResult>, AppError> {
    let stmt = Statement::from_sql_and_values(db.get_database_backend(), sql, values);
    db.query_all(stmt).await.map_err(db_error(context))
}

pub(crate) async fn query_one<C: ConnectionTrait>(
    db: &C,
    sql: &str,
    values: Vec<sea_orm::Value>,
    context: &'static str,
) -> Result<Option<QueryResult>, AppError> {
    let stmt = Statement::from_sql_and_values(db.get_database_backend(), sql, values);
    db.query_one(stmt).await.map_err(db_error(context))
}

pub(crate) async fn exec_sql<C: ConnectionTrait>(
    db: &C,
    sql: &str,
    values: Vec<sea_orm::Value>,
    context: &'static str,
) -> Result<u64, AppError> {
    let stmt = Statement::from_sql_and_values(db.get_database_backend(), sql, values);
    db.execute(stmt)
        .await
        .map(|res| res.rows_affected())
        .map_err(db_error(context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{not_found, path_error_handler, query_error_handler};
    use crate::testing::config_data;
    use actix_web::{http::StatusCode, App};
    use actix_web::test::{
        call_and_read_body_json, call_service, init_service, read_body_json, TestRequest,
    };
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::{json, Value};

    #[actix_rt::test]
    async fn api_routes_are_mounted() {
        let db = MockDatabase::new(DatabaseBackend::MySql).into_connection();
        let app = init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(config_data())
                .app_data(web::QueryConfig::default().error_handler(query_error_handler))
                .app_data(web::PathConfig::default().error_handler(path_error_handler))
                .service(web::scope("/api").configure(api_config))
                .configure(public_config)
                .default_service(web::to(not_found)),
        )
        .await;

        let req = TestRequest::get().uri("/api/ping").to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"ok": true}));

        let req = TestRequest::get().uri("/api/admin/stats").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body, json!({"error": "No token provided", "type": "auth"}));

        let req = TestRequest::get().uri("/api/nowhere").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Not Found"}));
    }

    #[actix_rt::test]
    async fn malformed_path_and_query_answer_json_errors() {
        let db = MockDatabase::new(DatabaseBackend::MySql).into_connection();
        let app = init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::QueryConfig::default().error_handler(query_error_handler))
                .app_data(web::PathConfig::default().error_handler(path_error_handler))
                .service(web::scope("/api").configure(api_config)),
        )
        .await;

        let req = TestRequest::get().uri("/api/challenges/99999999999").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Not Found"}));

        let req = TestRequest::get().uri("/api/tips?niveau=low&niveau=high").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Invalid query parameters"}));
    }

    #[test]
    fn timestamps_render_with_millis() {
        let dt = Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(to_rfc3339(dt), "2025-03-01T08:30:00.000+00:00");
    }

    #[test]
    fn required_rejects_blank_values() {
        assert_eq!(required(&Some("  hi ".to_string())), Some("hi"));
        assert_eq!(required(&Some("   ".to_string())), None);
        assert_eq!(required(&None), None);
    }
}
