//! Backend entry-point: loads configuration, wires adapters, and runs the
//! HTTP server alongside the pending-reservation sweeper.

mod server;

use std::path::Path;
use std::sync::Arc;

use actix_web::cookie::Key;
use actix_web::web;
#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetricsBuilder;
use color_eyre::eyre::{Context as _, Result, eyre};
use ortho_config::OrthoConfig as _;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use lodging_backend::domain::ports::BookingMetrics;
#[cfg(not(feature = "metrics"))]
use lodging_backend::domain::ports::NoOpBookingMetrics;
use lodging_backend::domain::run_expiry_schedule;
use lodging_backend::inbound::http::health::HealthState;
#[cfg(feature = "metrics")]
use lodging_backend::outbound::metrics::PrometheusBookingMetrics;
use lodging_backend::settings::AppSettings;

use server::{ServerConfig, build_engine, create_server};

const SESSION_KEY_MIN_LEN: usize = 64;

fn load_session_key(path: &Path) -> Result<Key> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.len() >= SESSION_KEY_MIN_LEN => Ok(Key::derive_from(&bytes)),
        Ok(bytes) => Err(eyre!(
            "session key at {} too short: need >= {SESSION_KEY_MIN_LEN} bytes, got {}",
            path.display(),
            bytes.len()
        )),
        Err(err) if cfg!(debug_assertions) => {
            warn!(path = %path.display(), error = %err, "using temporary session key (dev only)");
            Ok(Key::generate())
        }
        Err(err) => {
            Err(err).wrap_err_with(|| format!("failed to read session key at {}", path.display()))
        }
    }
}

#[cfg(feature = "metrics")]
fn make_metrics() -> Result<(actix_web_prom::PrometheusMetrics, Arc<dyn BookingMetrics>)> {
    let prometheus = PrometheusMetricsBuilder::new("lodging")
        .endpoint("/metrics")
        .build()
        .map_err(|err| eyre!("configure Prometheus metrics: {err}"))?;
    let booking = PrometheusBookingMetrics::new(&prometheus.registry)
        .wrap_err("registering booking metrics")?;
    Ok((prometheus, Arc::new(booking)))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let runtime = AppSettings::load()
        .wrap_err("loading configuration")?
        .runtime()
        .wrap_err("validating configuration")?;
    info!(config = ?runtime, "configuration loaded");

    let key = load_session_key(&runtime.session_key_file)?;

    #[cfg(feature = "metrics")]
    let (prometheus, metrics) = make_metrics()?;
    #[cfg(not(feature = "metrics"))]
    let metrics: Arc<dyn BookingMetrics> = Arc::new(NoOpBookingMetrics);

    let engine = build_engine(&runtime, metrics).await?;

    let mut health = HealthState::new();
    if let Some(dependency) = engine.readiness.clone() {
        health = health.with_dependency(dependency);
    }
    let health_state = web::Data::new(health);

    let config = ServerConfig::new(key, runtime.cookie_secure, runtime.bind_addr);
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(prometheus);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(run_expiry_schedule(
        engine.sweeper.clone(),
        runtime.expiry,
        shutdown_rx,
    ));

    info!(addr = %runtime.bind_addr, "starting HTTP server");
    let served = create_server(health_state.clone(), engine.http_state, config)?.await;

    health_state.mark_unhealthy();
    if shutdown_tx.send(true).is_err() {
        warn!("sweeper already stopped");
    }
    if let Err(err) = sweeper.await {
        warn!(error = %err, "sweeper task ended abnormally");
    }
    served.wrap_err("HTTP server failed")
}
