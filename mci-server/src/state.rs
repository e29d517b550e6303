//! Process-wide shared state: the validated config, the pooled model
//! client, and process start time. Built once in `main` and shared via
//! `Arc`.

use std::sync::Arc;
use std::time::Instant;

use mci_core::{AppConfig, HttpModelClient, ModelClient, ModelClientConfig};

pub struct AppState {
    pub config: AppConfig,
    pub model_client: Arc<dyn ModelClient>,
    pub started_at: Instant,
}

/// A client that never calls out, used when `model_calls_enabled` is false
/// or no provider is configured. Every invocation fails immediately so the
/// model invocation pipeline always falls through to deterministic
/// rendering.
struct DisabledModelClient;

#[async_trait::async_trait]
impl ModelClient for DisabledModelClient {
    async fn invoke(
        &self,
        _request: &mci_core::ModelInvocationRequest,
    ) -> Result<String, mci_core::model::ClientError> {
        Err(mci_core::model::ClientError::Request("model calls disabled".into()))
    }
}

impl AppState {
    pub fn build(config: AppConfig) -> Arc<AppState> {
        let model_client: Arc<dyn ModelClient> = if config.model.model_calls_enabled
            && config.model.model_provider != "none"
        {
            let client_config = ModelClientConfig::new(
                config.model.model_base_url.clone().unwrap_or_default(),
                config.model.model_api_key.clone().unwrap_or_default(),
                config.model.model_name.clone(),
            )
            .with_timeout_ms(config.model.model_timeout_seconds * 1_000);
            Arc::new(HttpModelClient::new(client_config))
        } else {
            Arc::new(DisabledModelClient)
        };

        Arc::new(AppState { config, model_client, started_at: Instant::now() })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
