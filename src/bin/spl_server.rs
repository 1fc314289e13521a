use nl_spl_engine::config::AppConfig;
use nl_spl_engine::engine::SplQueryEngine;
use nl_spl_engine::logging::init_tracing;
use nl_spl_engine::web::{start_server, AppState};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    init_tracing(if config.debug { "debug" } else { config.log_level.as_str() });

    // missing settings show up as a degraded health check
    if let Err(e) = config.validate() {
        warn!("Configuration incomplete: {}", e);
    }

    info!("Connecting to Splunk at {}", config.splunk.base_url());
    let engine = SplQueryEngine::from_config(&config)?;

    let state = AppState::new(engine).with_search_config(&config.search);
    start_server(state, &config.server.host, config.server.port).await
}
