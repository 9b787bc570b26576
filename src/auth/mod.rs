//! Admin authentication: argon2id credential storage and HS256 bearer
//! tokens. Every staff-facing order operation requires a valid token; the
//! submission and tracking surfaces stay public.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
    routing::post,
    Extension, Json, Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::admin::{self, ActiveModel as AdminActiveModel, Entity as AdminEntity},
    errors::ServiceError,
};

/// JWT claims issued to admins.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_expiration_secs: u64,
}

#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DbPool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 64, message = "username must be 3-64 characters"))]
    pub username: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminResponse {
    pub id: Uuid,
    pub username: String,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DbPool>) -> Self {
        Self { config, db }
    }

    /// Creates an admin account. Duplicate usernames surface as a conflict
    /// via the unique index rather than a racy pre-check.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> Result<AdminResponse, ServiceError> {
        request.validate()?;

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(request.password.as_bytes(), &salt)
            .map_err(|e| ServiceError::InternalError(format!("password hashing failed: {e}")))?
            .to_string();

        let active = AdminActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(request.username.trim().to_string()),
            password_hash: Set(password_hash),
            created_at: Set(Utc::now()),
        };

        let saved = active.insert(&*self.db).await.map_err(|err| {
            if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                ServiceError::Conflict("Username is already taken".to_string())
            } else {
                ServiceError::DatabaseError(err)
            }
        })?;

        info!(admin_id = %saved.id, "Admin account created");

        Ok(AdminResponse {
            id: saved.id,
            username: saved.username,
        })
    }

    /// Verifies credentials and issues a bearer token. The failure message
    /// never distinguishes an unknown username from a wrong password.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, ServiceError> {
        let admin = AdminEntity::find()
            .filter(admin::Column::Username.eq(request.username.trim()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid credentials".to_string()))?;

        let parsed = PasswordHash::new(&admin.password_hash)
            .map_err(|e| ServiceError::InternalError(format!("stored hash unreadable: {e}")))?;

        if Argon2::default()
            .verify_password(request.password.as_bytes(), &parsed)
            .is_err()
        {
            warn!(admin_id = %admin.id, "Failed login attempt");
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }

        self.issue_token(&admin)
    }

    fn issue_token(&self, admin: &admin::Model) -> Result<TokenResponse, ServiceError> {
        let now = Utc::now();
        let expires_in = self.config.token_expiration_secs as i64;
        let exp = now + ChronoDuration::seconds(expires_in);

        let claims = Claims {
            sub: admin.id.to_string(),
            username: admin.username.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("token creation failed: {e}")))?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
        })
    }

    /// Validates a bearer token, enforcing signature, expiry, issuer and
    /// audience.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.set_issuer(&[self.config.issuer.clone()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("Token expired".to_string())
            }
            _ => ServiceError::Unauthorized("Invalid token".to_string()),
        })
    }
}

/// Authenticated admin identity, extracted from the `Authorization: Bearer`
/// header. Rejects with 401 when the header is missing or the token fails
/// validation.
#[derive(Debug, Clone)]
pub struct AuthAdmin {
    pub admin_id: Uuid,
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthAdmin
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_service = parts
            .extensions
            .get::<Arc<AuthService>>()
            .cloned()
            .ok_or_else(|| {
                ServiceError::InternalError("Auth service not configured".to_string())
            })?;

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized("Missing authorization header".to_string())
            })?;

        let token = header_value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ServiceError::Unauthorized("Expected a bearer token".to_string())
            })?;

        let claims = auth_service.validate_token(token)?;
        let admin_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid token".to_string()))?;

        Ok(AuthAdmin {
            admin_id,
            username: claims.username,
        })
    }
}

/// Registers an admin account.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Admin account created", body = AdminResponse),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 409, description = "Username already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    Extension(auth): Extension<Arc<AuthService>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(axum::http::StatusCode, Json<AdminResponse>), ServiceError> {
    let admin = auth.register(request).await?;
    Ok((axum::http::StatusCode::CREATED, Json(admin)))
}

/// Exchanges credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(auth): Extension<Arc<AuthService>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ServiceError> {
    Ok(Json(auth.login(request).await?))
}

pub fn routes() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}
