use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use futures_util::future::{ready, Ready};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;

const BCRYPT_COST: u32 = 10;
const ACCESS_TOKEN_HEADER: &str = "x-access-token";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// Identity of the admin behind a verified bearer token.
#[derive(Clone, Debug)]
pub struct AdminAuth {
    pub admin_id: i32,
    #[allow(dead_code)]
    pub username: Option<String>,
}

#[derive(Clone, Debug)]
pub struct UserAuth {
    pub user_id: i32,
    #[allow(dead_code)]
    pub email: Option<String>,
}

/// Like [`UserAuth`] but never rejects; a bad or missing token yields `None`.
#[derive(Clone, Debug)]
pub struct OptionalUserAuth(pub Option<UserAuth>);

impl FromRequest for AdminAuth {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let auth = authenticate(req, Role::Admin).map(|claims| AdminAuth {
            admin_id: claims.id,
            username: claims.username,
        });
        ready(auth.map_err(Into::into))
    }
}

impl FromRequest for UserAuth {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let auth = authenticate(req, Role::User).map(|claims| UserAuth {
            user_id: claims.id,
            email: claims.email,
        });
        ready(auth.map_err(Into::into))
    }
}

impl FromRequest for OptionalUserAuth {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let auth = authenticate(req, Role::User).ok().map(|claims| UserAuth {
            user_id: claims.id,
            email: claims.email,
        });
        ready(Ok(OptionalUserAuth(auth)))
    }
}

fn authenticate(req: &HttpRequest, role: Role) -> Result<Claims, AppError> {
    let config = req
        .app_data::<web::Data<AppConfig>>()
        .ok_or_else(AppError::system_exception)?;
    let token = match extract_token(req) {
        Some(token) => token,
        None => {
            warn!("missing token on {}", req.path());
            return Err(AppError::MissingToken);
        }
    };
    let claims = decode_token(config, &token)?;
    if claims.role != role {
        warn!("{:?} token used on a {:?} route: {}", claims.role, role, req.path());
        return Err(AppError::InvalidToken);
    }
    debug!("token valid for {:?} {} on {}", claims.role, claims.id, req.path());
    Ok(claims)
}

/// Reads `Authorization: Bearer <t>`, a raw `Authorization` value, or `x-access-token`.
fn extract_token(req: &HttpRequest) -> Option<String> {
    let headers = req.headers();
    let raw = headers
        .get(header::AUTHORIZATION)
        .or_else(|| headers.get(ACCESS_TOKEN_HEADER))
        .and_then(|v| v.to_str().ok())?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();
    if token.is_empty() || token == "null" || token == "undefined" {
        return None;
    }
    Some(token.to_string())
}

pub fn issue_admin_token(
    config: &AppConfig,
    admin_id: i32,
    username: &str,
) -> Result<String, AppError> {
    encode_claims(config, admin_id, Role::Admin, Some(username.to_string()), None)
}

pub fn issue_user_token(
    config: &AppConfig,
    user_id: i32,
    email: &str,
) -> Result<String, AppError> {
    encode_claims(config, user_id, Role::User, None, Some(email.to_string()))
}

fn encode_claims(
    config: &AppConfig,
    id: i32,
    role: Role,
    username: Option<String>,
    email: Option<String>,
) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = Duration::try_days(config.jwt_expires_days)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            error!("token lifetime of {} days is out of range", config.jwt_expires_days);
            AppError::system_exception()
        })?;
    let claims = Claims {
        id,
        username,
        email,
        role,
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        error!("token signing failed: {}", e);
        AppError::system_exception()
    })
}

pub fn decode_token(config: &AppConfig, token: &str) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => warn!("token expired"),
                _ => debug!("token verification failed: {}", err),
            }
            AppError::InvalidToken
        })
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, BCRYPT_COST).map_err(|e| {
        error!("password hashing failed: {}", e);
        AppError::system_exception()
    })
}

fn is_bcrypt_hash(stored: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"].iter().any(|p| stored.starts_with(p))
}

/// Checks a bcrypt hash, or falls back to a plain comparison for legacy rows.
pub fn verify_password(password: &str, stored: &str) -> bool {
    if is_bcrypt_hash(stored) {
        return verify(password, stored).unwrap_or_else(|e| {
            warn!("stored bcrypt hash is unreadable: {}", e);
            false
        });
    }
    !stored.is_empty() && password == stored
}
