//! Backend of a marketing site's header CMS.
//!
//! An admin panel manages the navigation links and logo shown in the public site's header. The
//! public React site polls the same API on mount.
//!
//!
//!
//! # Resources
//!
//! - **Navigation items** (`/api/header`): ordered menu links. Deleting one renumbers the rest to
//!   a gap-free `0..n-1`. See [`header`].
//! - **Site logo** (`/api/header/logo`): one uploaded image, replaced in place. See [`logo`].
//! - **Header settings** (`/api/header-settings`): text label + logo image + display size, with an
//!   explicit current record. See [`settings`].
//! - **Uploads** (`/uploads/<name>`): stored images, served read-only. See [`uploads`].
//!
//!
//!
//! # Responses
//!
//! Navigation item and logo writes answer `{success, data}`. Failures everywhere answer
//! `{success: false, message, error?}` with 400 for bad input, 404 for unknown ids, 405 for
//! unrouted methods, 413 for oversized uploads and 500 for store failures.
//!
//!
//!
//! # Notes
//!
//! ## Store
//! Small dataset, a few dozen documents at most. Redis holds them as JSON, see [`database`].
//! `STORE_URL=memory` runs without redis, nothing survives a restart.
//!
//! ## Concurrency
//! One operator is the expected load. No request locks another; the multi-document writes (the
//! reorder pass, header settings insert/remove with the current pointer) are each one atomic store
//! call.
//!
//!
//!
//! # Setup
//!
//! Run against redis.
//! ```sh
//! STORE_URL=redis://localhost:6379 FRONTEND_URL=http://localhost:3000 cargo run -p backend
//! ```
//!
//! Run in memory with request payload logging.
//! ```sh
//! RUST_LOG=info cargo run -p backend --features verbose
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderName, HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, put},
};
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod header;
pub mod logo;
pub mod models;
pub mod routes;
pub mod settings;
pub mod state;
pub mod store;
pub mod uploads;
pub mod utils;

use config::Config;
use routes::{
    create_item_handler, create_settings_handler, current_settings_handler,
    delete_item_handler, delete_settings_handler, get_logo_handler, get_settings_handler,
    list_items_handler, list_settings_handler, method_not_allowed_handler, not_found_handler,
    root_handler,
    update_item_handler, update_logo_handler, update_settings_handler,
};
use state::State;
use uploads::{MAX_UPLOAD_BYTES, PUBLIC_PREFIX};

/// Leaves room for multipart framing so the upload size check, not the framework, rejects files.
pub const MAX_BODY_BYTES: usize = 2 * MAX_UPLOAD_BYTES;

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = State::new(config).await?;

    info!("Starting server...");
    let app = build_router(state.clone())?;

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    Ok(())
}

pub fn build_router(state: Arc<State>) -> Result<Router> {
    let origin = HeaderValue::from_str(&state.config.frontend_url)
        .with_context(|| format!("Invalid FRONTEND_URL {}", state.config.frontend_url))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route("/header", get(list_items_handler).post(create_item_handler))
        .route("/header/logo", get(get_logo_handler).put(update_logo_handler))
        .route(
            "/header/{id}",
            put(update_item_handler).delete(delete_item_handler),
        )
        .route(
            "/header-settings",
            get(list_settings_handler).post(create_settings_handler),
        )
        .route("/header-settings/current", get(current_settings_handler))
        .route(
            "/header-settings/{id}",
            get(get_settings_handler)
                .put(update_settings_handler)
                .delete(delete_settings_handler),
        )
        .method_not_allowed_fallback(method_not_allowed_handler);

    let app = Router::new()
        .route("/", get(root_handler))
        .method_not_allowed_fallback(method_not_allowed_handler)
        .nest("/api", api)
        .nest_service(PUBLIC_PREFIX, ServeDir::new(state.uploads.dir()))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("cross-origin"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            return std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
