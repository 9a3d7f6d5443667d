use std::env;

use log::warn;

const DEFAULT_JWT_EXPIRES_DAYS: i64 = 30;
const MAX_JWT_EXPIRES_DAYS: i64 = 3650;
const DEFAULT_JWT_SECRET: &str = "scrolloff-secret-key-change-in-production";

#[derive(Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: Option<String>,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub jwt_secret: String,
    pub jwt_expires_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server_port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3000);

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
        let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = env::var("DB_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3306);
        let db_user = env::var("DB_USER").unwrap_or_else(|_| "root".to_string());
        let db_password = env::var("DB_PASSWORD").unwrap_or_default();
        let db_name = env::var("DB_NAME").unwrap_or_else(|_| "scrolloff".to_string());

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("JWT_SECRET is not set, falling back to the built-in development secret");
                DEFAULT_JWT_SECRET.to_string()
            }
        };

        let jwt_expires_days = parse_expires_days(env::var("JWT_EXPIRES_DAYS").ok().as_deref());

        Self {
            server_port,
            database_url,
            db_host,
            db_port,
            db_user,
            db_password,
            db_name,
            jwt_secret,
            jwt_expires_days,
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        if self.db_password.is_empty() {
            format!(
                "mysql://{}@{}:{}/{}",
                self.db_user, self.db_host, self.db_port, self.db_name
            )
        } else {
            format!(
                "mysql://{}:{}@{}:{}/{}",
                self.db_user, self.db_password, self.db_host, self.db_port, self.db_name
            )
        }
    }
}

/// Non-positive or unparsable values fall back to the default; large ones
/// are capped so the expiry timestamp stays representable.
fn parse_expires_days(raw: Option<&str>) -> i64 {
    match raw.and_then(|v| v.trim().parse::<i64>().ok()) {
        Some(days) if days > MAX_JWT_EXPIRES_DAYS => {
            warn!(
                "JWT_EXPIRES_DAYS={} is too large, capping at {}",
                days, MAX_JWT_EXPIRES_DAYS
            );
            MAX_JWT_EXPIRES_DAYS
        }
        Some(days) if days > 0 => days,
        _ => DEFAULT_JWT_EXPIRES_DAYS,
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            server_port: 0,
            database_url: None,
            db_host: "localhost".to_string(),
            db_port: 3306,
            db_user: "root".to_string(),
            db_password: String::new(),
            db_name: "scrolloff".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_expires_days: DEFAULT_JWT_EXPIRES_DAYS,
        }
    }
}
