use actix_web::{web, HttpResponse};
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::auth::AdminAuth;
use crate::error::AppError;
use crate::routes::{query_all, query_one};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/stats").route(web::get().to(dashboard)))
        .service(web::resource("/results/stats").route(web::get().to(results_stats)));
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardDto {
    total_users: i64,
    total_tests: i64,
    pending_stories: i64,
    active_challenges: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultsStatsDto {
    total_tests: i64,
    average_score: f64,
    distribution_by_level: Vec<LevelCountDto>,
    evolution_by_date: Vec<DateCountDto>,
}

#[derive(Serialize)]
struct LevelCountDto {
    niveau: String,
    count: i64,
}

#[derive(Serialize)]
struct DateCountDto {
    date: String,
    count: i64,
}

/// Multiplying by a DOUBLE literal turns the DECIMAL average into a float on
/// every MySQL and MariaDB version.
const AVERAGE_SCORE_SQL: &str =
    "SELECT COALESCE(AVG(score), 0) * 1.0E0 AS average FROM resultat";

/// A failing sub-query is logged and reported as zero.
async fn count_or_zero(db: &DatabaseConnection, sql: &str) -> i64 {
    match query_one(db, sql, vec![], "Stats query failed").await {
        Ok(Some(row)) => row.try_get("", "total").unwrap_or(0),
        _ => 0,
    }
}

async fn dashboard(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
) -> Result<HttpResponse, AppError> {
    let db = db.get_ref();
    let stats = DashboardDto {
        total_users: count_or_zero(db, "SELECT COUNT(*) AS total FROM utilisateur").await,
        total_tests: count_or_zero(db, "SELECT COUNT(*) AS total FROM resultat").await,
        pending_stories: count_or_zero(
            db,
            "SELECT COUNT(*) AS total FROM stories WHERE statut = 'pending'",
        )
        .await,
        active_challenges: count_or_zero(db, "SELECT COUNT(*) AS total FROM challenges").await,
    };
    Ok(HttpResponse::Ok().json(stats))
}

async fn results_stats(
    db: web::Data<DatabaseConnection>,
    _auth: AdminAuth,
) -> Result<HttpResponse, AppError> {
    let db = db.get_ref();
    let total_tests = count_or_zero(db, "SELECT COUNT(*) AS total FROM resultat").await;

    let average_score = match query_one(db, AVERAGE_SCORE_SQL, vec![], "Stats query failed")
        .await
    {
        Ok(Some(row)) => row.try_get("", "average").unwrap_or(0.0),
        _ => 0.0,
    };

    let distribution_by_level = query_all(
        db,
        "SELECT niveau, COUNT(*) AS count FROM resultat GROUP BY niveau",
        vec![],
        "Stats query failed",
    )
    .await
    .map(|rows| {
        rows.iter()
            .map(|row| LevelCountDto {
                niveau: row.try_get("", "niveau").unwrap_or_default(),
                count: row.try_get("", "count").unwrap_or(0),
            })
            .collect()
    })
    .unwrap_or_default();

    let evolution_by_date = query_all(
        db,
        "SELECT DATE_FORMAT(date_test, '%Y-%m-%d') AS date, COUNT(*) AS count \
         FROM resultat WHERE date_test IS NOT NULL \
         GROUP BY date ORDER BY date DESC LIMIT 30",
        vec![],
        "Stats query failed",
    )
    .await
    .map(|rows| {
        rows.iter()
            .map(|row| DateCountDto {
                date: row.try_get("", "date").unwrap_or_default(),
                count: row.try_get("", "count").unwrap_or(0),
            })
            .collect()
    })
    .unwrap_or_default();

    Ok(HttpResponse::Ok().json(ResultsStatsDto {
        total_tests,
        average_score,
        distribution_by_level,
        evolution_by_date,
    }))
}
