use std::{net::SocketAddr, sync::Arc, time::Duration};

use http::HeaderValue;
use tokio::{signal, sync::mpsc};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use printhub_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = api::events::EventSender::new(event_tx);

    let notifier = cfg.notification_webhook_url.as_ref().map(|url| {
        info!("New-order notifications enabled: {}", url);
        Arc::new(api::services::notifications::NotificationService::new())
    });
    if notifier.is_none() {
        info!("Notification webhook URL not configured; outbound notifications disabled");
    }

    tokio::spawn(api::events::process_events(
        event_rx,
        notifier,
        cfg.notification_webhook_url.clone(),
    ));

    // Auth service, injected into request extensions for the admin extractor
    let auth_config = api::auth::AuthConfig {
        jwt_secret: cfg.jwt_secret.clone(),
        issuer: cfg.auth_issuer.clone(),
        audience: cfg.auth_audience.clone(),
        token_expiration_secs: cfg.jwt_expiration,
    };
    let auth_service = Arc::new(api::auth::AuthService::new(auth_config, db_arc.clone()));

    // Domain services
    let order_service =
        api::services::orders::OrderService::new(db_arc.clone(), Some(Arc::new(event_sender)));
    let gateway = Arc::new(api::services::payments::HttpPaymentGateway::new(
        cfg.payment_gateway_url.clone(),
        cfg.payment_gateway_key_id.clone(),
        cfg.payment_gateway_key_secret.clone(),
        Duration::from_secs(cfg.payment_gateway_timeout_secs),
    ));
    let payment_service = api::services::payments::PaymentService::new(
        gateway,
        order_service.clone(),
        cfg.payment_gateway_key_id.clone(),
        cfg.payment_gateway_key_secret.clone(),
        cfg.payment_currency.clone(),
    );
    let file_store =
        api::services::files::FileStore::new(cfg.upload_dir.clone(), cfg.upload_max_bytes);

    let services = api::handlers::AppServices {
        order: order_service,
        payment: payment_service,
        files: file_store,
    };

    let app_state = api::AppState {
        db: db_arc,
        config: cfg.clone(),
        services,
    };

    // CORS: explicit origins when configured, permissive only in development
    let configured_origins = cfg
        .cors_allowed_origins
        .as_deref()
        .map(|origins| {
            origins
                .split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.is_development() {
        info!("Using permissive CORS (development environment, no explicit origins configured)");
        CorsLayer::permissive()
    } else {
        error!("Missing CORS configuration; set APP__CORS_ALLOWED_ORIGINS");
        return Err("Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS".into());
    };

    let app = api::build_router(app_state, auth_service)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .layer(TimeoutLayer::new(Duration::from_secs(
            cfg.request_timeout_secs,
        )));

    // Bind and serve
    let addr = SocketAddr::from((cfg.host.parse::<std::net::IpAddr>()?, cfg.port));
    info!("printhub-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
