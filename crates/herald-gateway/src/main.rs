//! # herald-gateway
//!
//! Herald gateway binary. Loads settings, opens the session store, wires the
//! session manager and content providers into the HTTP server, and runs
//! until ctrl-c.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use herald_content::{NewsClient, OpenAiClient, OpenAiConfig, Summarizer, WeatherClient};
use herald_core::logging::{self, LogFormat};
use herald_server::{GatewayConfig, GatewayServer, Services};
use herald_session::bridge::{BridgeConfig, BridgeConnector};
use herald_session::{BroadcastDispatcher, DispatchConfig, SessionManager};
use herald_settings::HeraldSettings;
use herald_store::{ConnectionConfig, SqliteSessionStore};

/// Herald notification gateway.
#[derive(Parser, Debug)]
#[command(name = "herald-gateway", about = "Herald notification gateway")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Session store database path (overrides settings).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Settings file (default: `~/.herald/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log filter directive (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Fold command-line overrides into loaded settings.
    fn apply(&self, settings: &mut HeraldSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(path) = &self.db_path {
            settings.session.db_path = path.to_string_lossy().into_owned();
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.format = LogFormat::Json;
        }
    }
}

/// Relative store paths live under the Herald home directory.
fn resolve_db_path(raw: &str, home: &Path) -> String {
    if raw == herald_store::connection::IN_MEMORY || Path::new(raw).is_absolute() {
        raw.to_owned()
    } else {
        home.join(raw).to_string_lossy().into_owned()
    }
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Build the session manager, dispatcher and provider clients.
fn build_services(settings: &HeraldSettings) -> Result<Services> {
    let db_path = resolve_db_path(&settings.session.db_path, &herald_settings::herald_home());
    if db_path != herald_store::connection::IN_MEMORY {
        ensure_parent_dir(&db_path)?;
    }
    let store = SqliteSessionStore::open(&db_path, &ConnectionConfig::default())
        .context("Failed to open session store")?;

    let bridge = BridgeConfig::new(settings.session.bridge_url.clone())
        .with_token(settings.session.bridge_token.clone());
    let connector = BridgeConnector::new(bridge).context("Failed to build bridge connector")?;

    let manager = Arc::new(SessionManager::new(Arc::new(store), Arc::new(connector)));
    let dispatcher = Arc::new(BroadcastDispatcher::new(
        manager,
        DispatchConfig {
            inter_send_delay: settings.session.inter_send_delay(),
            max_concurrency: settings.session.max_concurrent_sends,
        },
    ));

    let providers = &settings.providers;
    if providers.open_ai_api_key.is_none() {
        tracing::info!("no OpenAI key configured, LLM summaries will fail");
    }
    let summarizer: Arc<dyn Summarizer> = Arc::new(OpenAiClient::new(OpenAiConfig {
        api_key: providers.open_ai_api_key.clone().unwrap_or_default(),
        base_url: providers.open_ai_base_url.clone(),
        model: providers.open_ai_model.clone(),
    }));

    Ok(Services {
        dispatcher,
        news: Arc::new(NewsClient::new(
            providers.news_api_key.clone().unwrap_or_default(),
            &providers.news_base_url,
        )),
        weather: Arc::new(WeatherClient::new(
            providers.open_weather_api_key.clone().unwrap_or_default(),
            &providers.open_weather_base_url,
        )),
        summarizer,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(herald_settings::settings_path);
    let mut settings = herald_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);

    logging::init_subscriber(&settings.logging.level, settings.logging.format);

    let metrics = herald_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let services = build_services(&settings)?;
    let server = GatewayServer::new(GatewayConfig::from(&settings.server), services)
        .with_metrics(metrics);

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!(%addr, bridge = %settings.session.bridge_url, "Herald gateway listening");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let outcome = server.stop(handle).await;
    if !outcome.requests_drained {
        tracing::warn!("some requests were cut off at shutdown");
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_override_nothing() {
        let cli = Cli::try_parse_from(["herald-gateway"]).unwrap();
        let mut settings = HeraldSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.session.db_path, "session.db");
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    #[test]
    fn cli_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "herald-gateway",
            "--host",
            "127.0.0.1",
            "--port",
            "0",
            "--db-path",
            "/var/lib/herald/session.db",
            "--log-level",
            "herald_session=debug",
            "--json-logs",
        ])
        .unwrap();
        let mut settings = HeraldSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 0);
        assert_eq!(settings.session.db_path, "/var/lib/herald/session.db");
        assert_eq!(settings.logging.level, "herald_session=debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn invalid_port_is_rejected() {
        assert!(Cli::try_parse_from(["herald-gateway", "--port", "70000"]).is_err());
    }

    #[test]
    fn relative_db_path_resolves_under_home() {
        let home = Path::new("/home/u/.herald");
        assert_eq!(
            resolve_db_path("session.db", home),
            "/home/u/.herald/session.db"
        );
        assert_eq!(resolve_db_path("/tmp/s.db", home), "/tmp/s.db");
        assert_eq!(resolve_db_path(":memory:", home), ":memory:");
    }

    #[test]
    fn ensure_parent_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("session.db");
        ensure_parent_dir(&path.to_string_lossy()).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }

    #[tokio::test]
    async fn wired_server_serves_health_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = HeraldSettings::default();
        settings.server.host = "127.0.0.1".into();
        settings.server.port = 0;
        settings.session.db_path = dir.path().join("session.db").to_string_lossy().into_owned();

        let services = build_services(&settings).unwrap();
        let server = GatewayServer::new(GatewayConfig::from(&settings.server), services);
        let (addr, handle) = server.listen().await.unwrap();

        let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["session"], "uninitialized");

        let outcome = tokio::time::timeout(std::time::Duration::from_secs(15), server.stop(handle))
            .await
            .expect("shutdown timed out");
        assert!(outcome.requests_drained);
        assert!(!outcome.session_closed);
    }
}
