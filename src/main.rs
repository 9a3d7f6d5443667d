mod auth;
mod config;
mod db;
mod entity;
mod error;
mod quiz;
mod response;
mod routes;
#[cfg(test)]
mod testing;

use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use config::AppConfig;
use db::connect_db;
use log::{error, info};
use response::{json_error_handler, not_found, path_error_handler, query_error_handler};

const JSON_LIMIT: usize = 100 * 1024;

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("ScrollOff API is running")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let config = AppConfig::from_env();
    let db = connect_db(&config).await.map_err(|err| {
        error!("invalid database configuration: {}", err);
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    })?;
    let db = web::Data::new(db);
    let config_data = web::Data::new(config.clone());
    let server_port = config.server_port;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(db.clone())
            .app_data(
                web::JsonConfig::default()
                    .limit(JSON_LIMIT)
                    .error_handler(json_error_handler),
            )
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            .app_data(web::PathConfig::default().error_handler(path_error_handler))
            .wrap(middleware::Logger::default())
            .wrap(middleware::from_fn(routes::cors::cors_handler))
            .service(web::scope("/api").configure(routes::api_config))
            .configure(routes::public_config)
            .route("/", web::get().to(index))
            .default_service(web::to(not_found))
    })
    .bind(("0.0.0.0", server_port))?;
    info!("server started at http://0.0.0.0:{}", server_port);
    server.run().await
}
