use analysis_core::{AnalysisError, PriceStore};
use analysis_orchestrator::AnalyticsEngine;
use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use price_store::SqlitePriceStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod analytics_routes;
pub mod config;

pub use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub engine: AnalyticsEngine,
}

/// Envelope for every JSON response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error carrying the status code it renders with
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl From<AnalysisError> for AppError {
    fn from(error: AnalysisError) -> Self {
        let status = match &error {
            AnalysisError::SymbolNotFound(_) => StatusCode::NOT_FOUND,
            AnalysisError::InvalidData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            e if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::with_status(status, error.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed ({}): {:#}", self.status, self.error);
        } else {
            tracing::debug!("Request rejected ({}): {}", self.status, self.error);
        }

        (self.status, Json(ApiResponse::<()>::error(self.error.to_string()))).into_response()
    }
}

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", analytics_routes::analytics_routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .with_state(state)
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    init_tracing(config.json_logs);

    tracing::info!("Starting analytics API server");
    tracing::info!(
        "Cache TTL {:?}, fetch timeout {:?}, history {} days",
        config.engine.cache_ttl,
        config.engine.fetch_timeout,
        config.engine.history_days
    );

    let store = SqlitePriceStore::connect(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("failed to open {}: {}", config.database_url, e))?;
    match store.list_symbols().await {
        Ok(symbols) => tracing::info!("{} symbols available", symbols.len()),
        Err(e) => tracing::warn!("Could not list symbols: {}", e),
    }

    let engine = AnalyticsEngine::with_config(Arc::new(store), config.engine.clone());
    let app = build_router(AppState { engine }, config.request_timeout);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
