pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod pricing;
pub mod services;

use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{delete, get, post, put},
    Extension, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

/// Common list query parameters. `page` and `limit` arrive as raw strings
/// so absent, non-numeric or non-positive values fall back to the defaults
/// instead of failing query deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    page: Option<String>,
    limit: Option<String>,
    pub status: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> u64 {
        parse_positive_or(self.page.as_deref(), DEFAULT_PAGE)
    }

    pub fn limit(&self) -> u64 {
        parse_positive_or(self.limit.as_deref(), DEFAULT_LIMIT).min(MAX_LIMIT)
    }
}

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;

fn parse_positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|n| *n >= 1)
        .unwrap_or(default)
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = total.div_ceil(limit.max(1));
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1 && total_pages > 0,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// All versioned API routes. The multipart submission route carries its own
/// body limit sized from the upload ceiling plus form-field headroom.
pub fn api_v1_routes(upload_max_bytes: u64) -> Router<AppState> {
    let submission_body_limit = (upload_max_bytes as usize).saturating_add(64 * 1024);

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Public intake and tracking
        .route(
            "/orders",
            post(handlers::orders::submit_order)
                .layer(DefaultBodyLimit::max(submission_body_limit)),
        )
        .route(
            "/orders/track/:tracking_code",
            get(handlers::orders::track_order),
        )
        // Payments (public: driven by the checkout callback)
        .route("/payments/intent", post(handlers::payments::create_intent))
        .route("/payments/verify", post(handlers::payments::verify_payment))
        // Admin order management (bearer token required)
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route(
            "/orders/:id/status",
            put(handlers::orders::update_order_status),
        )
        .route("/orders/:id", delete(handlers::orders::delete_order))
}

/// Assembles the application router: auth routes, versioned API, OpenAPI UI,
/// and the auth-service extension the admin extractor relies on.
pub fn build_router(state: AppState, auth_service: Arc<auth::AuthService>) -> Router {
    Router::new()
        .nest("/auth", auth::routes())
        .nest(
            "/api/v1",
            api_v1_routes(state.config.upload_max_bytes).with_state(state),
        )
        .merge(openapi::swagger_ui())
        .layer(Extension(auth_service))
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "service": "printhub-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    Ok(Json(ApiResponse::success(json!({
        "status": if db_status == "healthy" { "ok" } else { "degraded" },
        "database": db_status,
        "timestamp": Utc::now().to_rfc3339(),
    }))))
}
