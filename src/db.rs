use std::time::Duration;

use log::{error, info, warn};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

use crate::config::AppConfig;

/// The pool connects lazily, so an unreachable server does not stop the
/// process from booting. Requests fail with a database error until MySQL
/// comes up; the schema is only applied when the first check succeeds.
/// Only a malformed URL is returned as an error.
pub async fn connect_db(config: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.database_url());
    options
        .connect_lazy(true)
        .acquire_timeout(Duration::from_secs(5))
        .sqlx_logging(false);
    let db = Database::connect(options).await?;
    match db
        .execute(Statement::from_string(db.get_database_backend(), "SELECT 1"))
        .await
    {
        Ok(_) => {
            info!("MySQL connected");
            init_mysql_schema(&db).await;
        }
        Err(err) => error!("MySQL unreachable, skipping schema setup: {}", err),
    }
    Ok(db)
}

async fn init_mysql_schema(db: &DatabaseConnection) {
    let backend = db.get_database_backend();
    let sql = include_str!("../schema-mysql.sql");
    for stmt in split_sql(sql) {
        let table = table_name(&stmt).unwrap_or("?").to_string();
        match db.execute(Statement::from_string(backend, stmt)).await {
            Ok(_) => info!("table {} ready", table),
            Err(err) => warn!("could not create table {}: {}", table, err),
        }
    }
}

fn split_sql(input: &str) -> Vec<String> {
    let mut buf = String::new();
    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") || trimmed.is_empty() {
            continue;
        }
        buf.push_str(line);
        buf.push('\n');
    }
    buf.split(';')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn table_name(stmt: &str) -> Option<&str> {
    stmt.split_whitespace()
        .skip_while(|w| !w.eq_ignore_ascii_case("EXISTS"))
        .nth(1)
}
