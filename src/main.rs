use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let cfg = feedup::config::AppConfig::from_env()?;
    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "feedup",
        "FeedUp auth starting: RUST_LOG='{}', http_bind={}, identity_url={:?}, session_file={:?}, seed_demo={}",
        rust_log, cfg.http_bind, cfg.identity_url, cfg.session_file, cfg.seed_demo_accounts
    );

    feedup::server::run_with_config(cfg).await
}
