use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use printhub_api::{
    auth::{AuthConfig, AuthService, Claims},
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    services::{
        files::FileStore,
        orders::OrderService,
        payments::{HttpPaymentGateway, PaymentService},
    },
    AppState,
};

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const TEST_GATEWAY_SECRET: &str = "test_gateway_callback_secret";

/// Harness backed by a throwaway SQLite database and upload directory.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: tempfile::TempDir,
}

impl TestApp {
    /// Construct a test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_gateway_url(None).await
    }

    /// Same, but the payment gateway client points at the given base URL
    /// (a wiremock server in tests).
    pub async fn with_gateway_url(gateway_url: Option<&str>) -> Self {
        let dir = tempfile::tempdir().expect("create test dir");
        let db_path = dir.path().join("printhub_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET,
            "127.0.0.1",
            18_080,
            "test",
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.payment_gateway_key_id = "rzp_test_key".to_string();
        cfg.payment_gateway_key_secret = TEST_GATEWAY_SECRET.to_string();
        if let Some(url) = gateway_url {
            cfg.payment_gateway_url = url.to_string();
        }
        cfg.upload_dir = dir.path().join("uploads").display().to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx, None, None));

        let auth_service = Arc::new(AuthService::new(
            AuthConfig {
                jwt_secret: cfg.jwt_secret.clone(),
                issuer: cfg.auth_issuer.clone(),
                audience: cfg.auth_audience.clone(),
                token_expiration_secs: cfg.jwt_expiration,
            },
            db_arc.clone(),
        ));

        let order_service = OrderService::new(db_arc.clone(), Some(Arc::new(event_sender)));
        let gateway = Arc::new(HttpPaymentGateway::new(
            cfg.payment_gateway_url.clone(),
            cfg.payment_gateway_key_id.clone(),
            cfg.payment_gateway_key_secret.clone(),
            Duration::from_secs(2),
        ));
        let payment_service = PaymentService::new(
            gateway,
            order_service.clone(),
            cfg.payment_gateway_key_id.clone(),
            cfg.payment_gateway_key_secret.clone(),
            cfg.payment_currency.clone(),
        );
        let file_store = FileStore::new(cfg.upload_dir.clone(), cfg.upload_max_bytes);

        let services = AppServices {
            order: order_service,
            payment: payment_service,
            files: file_store,
        };

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            services,
        };

        let token = issue_admin_token(&cfg.jwt_secret, &cfg.auth_issuer, &cfg.auth_audience);
        let router = printhub_api::build_router(state.clone(), auth_service);

        Self {
            router,
            state,
            token,
            _event_task: event_task,
            _dir: dir,
        }
    }

    /// Bearer token for a test admin.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Send a multipart form submission against the public intake endpoint.
    pub async fn submit_multipart(
        &self,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
    ) -> axum::response::Response {
        let boundary = format!("----printhub-test-{}", Uuid::new_v4().simple());
        let mut body = Vec::new();

        for (name, value) in fields {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            body.extend_from_slice(value.as_bytes());
            body.extend_from_slice(b"\r\n");
        }

        if let Some((file_name, content_type, data)) = file {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/orders")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("failed to build multipart request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

fn issue_admin_token(secret: &str, issuer: &str, audience: &str) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        username: "test-admin".to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(1)).timestamp(),
        nbf: now.timestamp(),
        iss: issuer.to_string(),
        aud: audience.to_string(),
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("encode admin token")
}

/// Read a response body into JSON.
pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}

/// A complete valid submission as form fields.
#[allow(dead_code)]
pub fn valid_submission_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("student_name", "Asha Verma"),
        ("roll_number", "21CS042"),
        ("college_name", "City Engineering College"),
        ("subject", "Physics"),
        ("practical_number", "7"),
        ("teacher_name", "Prof. Rao"),
        ("mobile_number", "9876543210"),
        ("pages", "10"),
        ("print_type", "color"),
        ("payment_method", "online"),
    ]
}

#[allow(dead_code)]
pub fn assert_status(response: &axum::response::Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

/// Seed an order directly through the service layer (10 color pages, online
/// payment unless overridden). Returns the submission response.
#[allow(dead_code)]
pub async fn seed_order(
    app: &TestApp,
    student_name: &str,
    payment_method: &str,
) -> printhub_api::services::orders::SubmitOrderResponse {
    use printhub_api::services::orders::SubmitOrderRequest;

    let request = SubmitOrderRequest {
        student_name: student_name.to_string(),
        roll_number: "21CS042".to_string(),
        college_name: "City Engineering College".to_string(),
        subject: "Physics".to_string(),
        practical_number: "7".to_string(),
        teacher_name: "Prof. Rao".to_string(),
        mobile_number: "9876543210".to_string(),
        pages: Some("10".to_string()),
        print_type: Some("color".to_string()),
        payment_method: Some(payment_method.to_string()),
        ..Default::default()
    };

    app.state
        .services
        .order
        .submit_order(request)
        .await
        .expect("seed order")
}
