//! Fundrelease API Server
//!
//! Main entry point for the fund release authorization service.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fundrelease_api::{AppState, create_router};
use fundrelease_core::currency::{RateBook, RateOracle};
use fundrelease_core::ledger::{InMemoryLedger, NewCampaign};
use fundrelease_core::{EngineSettings, SystemClock, WithdrawalEngine};
use fundrelease_oracle::CoinbaseOracle;
use fundrelease_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fundrelease=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    // Ledger
    let clock = Arc::new(SystemClock);
    let ledger = Arc::new(InMemoryLedger::new(clock.clone()));
    if let Some(path) = &config.ledger.seed_path {
        let count = seed_ledger(&ledger, path).await?;
        info!(path = %path.display(), campaigns = count, "Ledger seeded");
    } else {
        warn!("No ledger seed configured; all campaigns will be unknown");
    }

    // Exchange rates
    let rates = RateBook::with_ttl(Duration::from_secs(config.rates.ttl_secs));
    let oracle = CoinbaseOracle::new(
        config.rates.oracle_url.clone(),
        config.rates.native_symbol.clone(),
    );
    spawn_rate_poller(rates.clone(), oracle, &config);
    info!(
        currency = %config.rates.display_currency,
        native = %config.rates.native_symbol,
        interval_secs = config.rates.poll_interval_secs,
        "Rate poller started"
    );

    let engine = WithdrawalEngine::new(ledger, rates, clock, EngineSettings::from(&config));
    let state = AppState {
        engine: Arc::new(engine),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn seed_ledger(ledger: &InMemoryLedger, path: &Path) -> anyhow::Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read ledger seed {}", path.display()))?;
    let campaigns: Vec<NewCampaign> =
        serde_json::from_str(&raw).context("failed to parse ledger seed")?;

    let count = campaigns.len();
    for campaign in campaigns {
        let address = campaign.address.clone();
        ledger
            .open(campaign)
            .await
            .with_context(|| format!("failed to open campaign {address}"))?;
    }
    Ok(count)
}

fn spawn_rate_poller(rates: RateBook, oracle: CoinbaseOracle, config: &AppConfig) {
    let currency = config.rates.display_currency;
    let period = Duration::from_secs(config.rates.poll_interval_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = rates.poll(&oracle, currency).await {
                warn!(
                    source = oracle.source_name(),
                    currency = %currency,
                    retryable = e.is_retryable(),
                    error = %e,
                    "Exchange rate poll failed"
                );
            }
        }
    });
}
