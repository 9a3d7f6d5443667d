use actix_web::web;

use crate::auth::{issue_admin_token, issue_user_token};
use crate::config::AppConfig;

pub fn config_data() -> web::Data<AppConfig> {
    web::Data::new(AppConfig::for_tests())
}

pub fn admin_bearer(config: &AppConfig) -> String {
    let token = issue_admin_token(config, 1, "root").unwrap();
    format!("Bearer {}", token)
}

pub fn user_bearer(config: &AppConfig, user_id: i32) -> String {
    let token = issue_user_token(config, user_id, "user@example.com").unwrap();
    format!("Bearer {}", token)
}
