//! `GatewayServer`: Axum router and listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use herald_content::{NewsClient, Summarizer, WeatherClient};
use herald_session::BroadcastDispatcher;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::GatewayConfig;
use crate::handlers::{news, wa, weather};
use crate::health::{self, HealthResponse};
use crate::metrics::track_requests;
use crate::shutdown::{DrainOutcome, ShutdownCoordinator};

/// Collaborators the handlers call into.
#[derive(Clone)]
pub struct Services {
    /// Session manager plus fan-out.
    pub dispatcher: Arc<BroadcastDispatcher>,
    /// NewsAPI client.
    pub news: Arc<NewsClient>,
    /// OpenWeather client.
    pub weather: Arc<WeatherClient>,
    /// LLM used for news analysis and weather reports.
    pub summarizer: Arc<dyn Summarizer>,
}

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session manager plus fan-out.
    pub dispatcher: Arc<BroadcastDispatcher>,
    /// NewsAPI client.
    pub news: Arc<NewsClient>,
    /// OpenWeather client.
    pub weather: Arc<WeatherClient>,
    /// LLM summarizer.
    pub summarizer: Arc<dyn Summarizer>,
    /// Limits and timeouts.
    pub config: Arc<GatewayConfig>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// When the server started.
    pub start_time: Instant,
}

/// The HTTP gateway.
pub struct GatewayServer {
    config: Arc<GatewayConfig>,
    services: Services,
    metrics: Option<PrometheusHandle>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl GatewayServer {
    /// Create a server.
    pub fn new(config: GatewayConfig, services: Services) -> Self {
        Self {
            config: Arc::new(config),
            services,
            metrics: None,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            dispatcher: self.services.dispatcher.clone(),
            news: self.services.news.clone(),
            weather: self.services.weather.clone(),
            summarizer: self.services.summarizer.clone(),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/wa/status", get(wa::status))
            .route("/wa/logout", post(wa::logout))
            .route("/wa/messages", post(wa::send_messages))
            .route("/wa/news", post(news::send_news))
            .route("/wa/weathers", post(weather::send_weather))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route_layer(middleware::from_fn(track_requests))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// The server configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Stop accepting requests, drain `serve`, then close the chat session.
    pub async fn stop(&self, serve: JoinHandle<()>) -> DrainOutcome {
        self.shutdown
            .drain(serve, self.services.dispatcher.manager())
            .await
    }

    /// Bind and serve until the shutdown token is cancelled.
    ///
    /// Returns the bound address and the serving task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "http server stopped with an error");
            }
        });
        info!(%addr, "gateway listening");
        Ok((addr, handle))
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, state.dispatcher.manager()))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
