use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use log::warn;
use serde::Serialize;

use crate::error::AppError;

#[derive(Serialize)]
pub struct MessageDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub message: String,
}

impl MessageDto {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: None,
            message: message.into(),
        }
    }

    pub fn with_id(id: i32, message: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorDto<'a> {
    pub error: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'a str>,
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!("rejected request body: {}", err);
    AppError::param_error("Invalid JSON payload").into()
}

pub fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!("rejected query string {:?}: {}", req.query_string(), err);
    AppError::param_error("Invalid query parameters").into()
}

/// Path segments that match the route but fail to parse, such as an id
/// overflowing `i32`, are treated as unknown resources.
pub fn path_error_handler(err: PathError, req: &HttpRequest) -> actix_web::Error {
    warn!("rejected path {}: {}", req.path(), err);
    AppError::not_found("Not Found").into()
}

pub fn response_from_error(err: &AppError) -> HttpResponse {
    let msg = err.to_string();
    let kind = match err {
        AppError::MissingToken => Some("auth"),
        _ => None,
    };
    HttpResponse::build(err.status_code()).json(ErrorDto {
        error: &msg,
        kind,
        details: err.details(),
    })
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorDto {
        error: "Not Found",
        kind: None,
        details: None,
    })
}

#[derive(Serialize)]
pub struct PingDto {
    pub ok: bool,
}

pub async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(PingDto { ok: true })
}
