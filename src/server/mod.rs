use crate::activity::LogSink;
use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod error;
pub mod multipart;
pub mod routes_files;
pub mod routes_process;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub catalog: Arc<CatalogStore>,
    /// Activity log shared with the catalog and pipeline
    pub log: LogSink,
    pub pipeline: Pipeline,
}

impl AppContext {
    pub fn new(config: Config, catalog: Arc<CatalogStore>, log: LogSink) -> Self {
        let pipeline = Pipeline::new(catalog.clone(), log.clone(), config.processing.clone());
        Self {
            config: Arc::new(config),
            catalog,
            log,
            pipeline,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = cors_layer(&ctx.config.server.cors_origins);
    let static_dir = ctx.config.server.static_dir.clone();

    let mut app = Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .merge(routes_process::process_routes(
            ctx.config.processing.max_upload_bytes,
        ))
        .merge(routes_files::file_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            app = app.fallback_service(ServeDir::new(&dir).append_index_html_on_directories(true));
        } else {
            tracing::warn!("Static directory {:?} does not exist, not serving it", dir);
        }
    }

    app
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn hello(State(ctx): State<AppContext>) -> &'static str {
    ctx.log.log("hello world requested");
    "Hello, World!"
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server and serve until a shutdown signal arrives.
///
/// The caller owns the catalog and log sink and is responsible for the final
/// persist and flush once this returns.
pub async fn start_server(config: Config, catalog: Arc<CatalogStore>, log: LogSink) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let app = create_router(AppContext::new(config, catalog, log));

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped accepting requests");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
