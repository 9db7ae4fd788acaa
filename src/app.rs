use std::sync::Arc;

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::llm_clients::{LLMClient, RouterClient};
use crate::interfaces::http::{start_server, HttpState};

pub async fn run() -> std::io::Result<()> {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();

    let config = AppConfig::load().map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
    })?;

    if config.llm.api_key.is_none() {
        tracing::warn!("no provider API key configured; generate calls will fail");
    }
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        model = %config.llm.model,
        "starting caseforge API"
    );

    let llm_client: Arc<dyn LLMClient + Send + Sync> = Arc::new(RouterClient::new());
    let state = HttpState::new(config, llm_client);

    start_server(state)?.await
}
