use anyhow::Result;
use granola_cache::config::Config;
use granola_cache::tools::ToolBox;
use granola_cache::{driver, CacheAccessor, FileStateLoader};
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::load("config.toml")?;

    // Initialize logging; RUST_LOG wins over the configured level
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone());
    pretty_env_logger::formatted_builder().parse_filters(&filters).init();
    log::info!("Starting Granola cache tools...");

    let loader = FileStateLoader::new(config.cache.path());
    log::info!("Reading cache from {}", loader.path().display());

    let policy = config.polling.policy();
    log::info!(
        "Polling empty results every {:?} for up to {:?}",
        policy.interval,
        policy.timeout
    );

    let toolbox = Arc::new(ToolBox::new(CacheAccessor::new(Arc::new(loader), policy)));
    for (name, description) in toolbox.describe() {
        log::info!("Tool available: {} - {}", name, description);
    }

    // Ctrl+C cancels in-flight polls
    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    driver::serve(toolbox, stdin, tokio::io::stdout(), shutdown.clone()).await?;

    log::info!("Granola cache tools stopped");
    if shutdown.is_cancelled() {
        // A blocked stdin read would otherwise keep the runtime alive.
        std::process::exit(0);
    }
    Ok(())
}
