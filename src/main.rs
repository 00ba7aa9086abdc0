use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use verimail::config::Args;
use verimail::domains::DomainSet;
use verimail::handlers::{health_handler, metrics_handler, verify_handler};
use verimail::metrics::DOMAINS_LOADED;
use verimail::rate_limit::{FileStore, RateLimiter, SystemClock};
use verimail::state::AppState;

// this is main async function with tokio
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // parse cli arguments
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Serving without the list would classify everything as valid, so
    // a missing or broken domain file must not start the server
    let domains = match DomainSet::load(Path::new(&args.domains_file)) {
        Ok(domains) => domains,
        Err(e) => {
            error!("cannot load disposable domain list: {e}");
            std::process::exit(1);
        }
    };
    info!("Successfully loaded {} disposable domains", domains.len());
    DOMAINS_LOADED.set(domains.len() as f64);

    let limiter = RateLimiter::new(
        Arc::new(FileStore::new(&args.rate_limit_file)),
        Arc::new(SystemClock),
        args.rate_limit,
        Duration::from_secs(args.rate_window),
    );

    // creating shared state
    let state = Arc::new(AppState {
        domains,
        limiter,
        trust_proxy: args.trust_proxy,
    });

    // creating the router with routes
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/verify", post(verify_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server is running on port {}", args.port);
    info!(
        "Rate limit: {} requests per {} seconds",
        args.rate_limit, args.rate_window
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
