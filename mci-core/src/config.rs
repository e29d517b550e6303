//! Process-wide configuration: one validated struct, loaded once, env-sourced.
//!
//! Field set and production-readiness rule grounded on
//! `examples/original_source/backend/app/config/settings.py`.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::types::MAX_PASSES_EVER;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("configuration could not be loaded: {0}")]
    Load(String),
    #[error("unknown configuration key rejected: {0}")]
    UnknownKey(String),
    #[error("production readiness check failed: {0}")]
    NotProductionReady(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Local,
    Staging,
    Production,
}

impl Default for AppEnv {
    fn default() -> Self {
        AppEnv::Local
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub app_env: AppEnv,
    pub debug_errors: bool,
    pub log_level: String,
    pub request_id_header: String,
    pub backend_public_base_url: Option<String>,
    pub cors_origins: Option<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig {
            app_env: AppEnv::Local,
            debug_errors: false,
            log_level: "info".to_string(),
            request_id_header: "x-request-id".to_string(),
            backend_public_base_url: None,
            cors_origins: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelProviderConfig {
    pub model_provider: String,
    pub model_name: String,
    pub model_base_url: Option<String>,
    pub model_api_key: Option<String>,
    pub model_calls_enabled: bool,
    pub model_timeout_seconds: u64,
    pub model_connect_timeout_seconds: u64,
    pub model_max_output_tokens: u32,
    pub model_max_input_tokens: u32,
    pub model_max_total_tokens: u32,
    pub model_circuit_breaker_failures: u32,
    pub model_circuit_breaker_window_seconds: u64,
    pub model_circuit_breaker_open_seconds: u64,
}

impl Default for ModelProviderConfig {
    fn default() -> Self {
        ModelProviderConfig {
            model_provider: "none".to_string(),
            model_name: "default".to_string(),
            model_base_url: None,
            model_api_key: None,
            model_calls_enabled: true,
            model_timeout_seconds: 30,
            model_connect_timeout_seconds: 10,
            model_max_output_tokens: 512,
            model_max_input_tokens: 4096,
            model_max_total_tokens: 4608,
            model_circuit_breaker_failures: 5,
            model_circuit_breaker_window_seconds: 60,
            model_circuit_breaker_open_seconds: 120,
        }
    }
}

impl ModelProviderConfig {
    /// Clamped, internally-consistent token caps: never below 1, and the
    /// total is never less than output+input or either individually.
    pub fn validated_caps(&self) -> (u32, u32, u32) {
        let max_output = self.model_max_output_tokens.max(1);
        let max_input = self.model_max_input_tokens.max(1);
        let mut max_total = self.model_max_total_tokens.max(max_output + max_input);
        max_total = max_total.max(max_input).max(max_output);
        (max_output, max_input, max_total)
    }

    fn is_local_or_custom(&self) -> bool {
        matches!(self.model_provider.as_str(), "local" | "custom")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub api_chat_total_timeout_ms: u64,
    pub model_call_timeout_ms: u64,
    pub outbound_http_timeout_s: f64,
    pub outbound_http_connect_timeout_s: f64,
    pub outbound_http_read_timeout_s: f64,
    pub outbound_http_max_connections: u32,
    pub outbound_http_max_keepalive_connections: u32,
    pub outbound_http_keepalive_expiry_s: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        BudgetConfig {
            api_chat_total_timeout_ms: 20_000,
            model_call_timeout_ms: 12_000,
            outbound_http_timeout_s: 8.0,
            outbound_http_connect_timeout_s: 3.0,
            outbound_http_read_timeout_s: 8.0,
            outbound_http_max_connections: 20,
            outbound_http_max_keepalive_connections: 10,
            outbound_http_keepalive_expiry_s: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepThinkConfig {
    pub min_pass_timeout_ms: u64,
    pub min_budget_per_pass: i64,
    pub max_passes_ever: u8,
}

impl Default for DeepThinkConfig {
    fn default() -> Self {
        DeepThinkConfig { min_pass_timeout_ms: 250, min_budget_per_pass: 50, max_passes_ever: MAX_PASSES_EVER }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub environment: EnvironmentConfig,
    pub model: ModelProviderConfig,
    pub budgets: BudgetConfig,
    pub deep_think: DeepThinkConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            environment: EnvironmentConfig::default(),
            model: ModelProviderConfig::default(),
            budgets: BudgetConfig::default(),
            deep_think: DeepThinkConfig::default(),
        }
    }
}

const KNOWN_KEY_PREFIXES: &[&str] = &["environment", "model", "budgets", "deep_think"];

fn reject_unknown_top_level_keys(value: &figment::value::Value) -> Result<(), ConfigError> {
    let figment::value::Value::Dict(_, map) = value else {
        return Ok(());
    };
    for key in map.keys() {
        if !KNOWN_KEY_PREFIXES.contains(&key.as_str()) {
            return Err(ConfigError::UnknownKey(key.clone()));
        }
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration by layering environment variables over the
    /// struct's defaults. Optionally layers a TOML file first if present.
    pub fn load() -> Result<AppConfig, ConfigError> {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("mci.toml"))
            .merge(Env::prefixed("MCI_").split("__"));

        let extracted: figment::value::Value =
            figment.extract().map_err(|e| ConfigError::Load(e.to_string()))?;
        reject_unknown_top_level_keys(&extracted)?;

        let config: AppConfig = figment.extract().map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate_for_env()?;
        Ok(config)
    }

    /// Production-readiness gate: fails closed rather than starting with a
    /// silently-misconfigured environment.
    pub fn validate_for_env(&self) -> Result<(), ConfigError> {
        if self.environment.app_env != AppEnv::Production {
            return Ok(());
        }
        if self.environment.debug_errors {
            return Err(ConfigError::NotProductionReady("DEBUG_ERRORS must be false in production".into()));
        }
        if self.environment.backend_public_base_url.is_none() {
            return Err(ConfigError::NotProductionReady("BACKEND_PUBLIC_BASE_URL is required in production".into()));
        }
        if self.environment.cors_origins.is_none() {
            return Err(ConfigError::NotProductionReady("CORS_ORIGINS is required in production".into()));
        }
        if self.model.model_calls_enabled {
            if self.model.model_provider == "none" {
                return Err(ConfigError::NotProductionReady("MODEL_PROVIDER must be set when model calls are enabled".into()));
            }
            if self.model.model_api_key.is_none() && !self.model.is_local_or_custom() {
                return Err(ConfigError::NotProductionReady(
                    "MODEL_API_KEY is required in production unless provider is local/custom".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn cors_origins_list(&self) -> Vec<String> {
        let defaults = || {
            vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ]
        };
        let Some(raw) = &self.environment.cors_origins else { return defaults() };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return defaults();
        }
        if let Ok(serde_json::Value::Array(items)) = serde_json::from_str(trimmed) {
            let cleaned: Vec<String> = items
                .into_iter()
                .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
                .filter(|s| !s.is_empty())
                .collect();
            if !cleaned.is_empty() {
                return cleaned;
            }
            return defaults();
        }
        let cleaned: Vec<String> = trimmed.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect();
        if cleaned.is_empty() {
            defaults()
        } else {
            cleaned
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_production_unready_without_required_fields() {
        let mut config = AppConfig::default();
        config.environment.app_env = AppEnv::Production;
        assert!(config.validate_for_env().is_err());
    }

    #[test]
    fn local_env_never_requires_production_fields() {
        let config = AppConfig::default();
        assert!(config.validate_for_env().is_ok());
    }

    #[test]
    fn production_with_local_provider_does_not_require_api_key() {
        let mut config = AppConfig::default();
        config.environment.app_env = AppEnv::Production;
        config.environment.backend_public_base_url = Some("https://example.test".into());
        config.environment.cors_origins = Some("https://example.test".into());
        config.model.model_provider = "local".to_string();
        assert!(config.validate_for_env().is_ok());
    }

    #[test]
    fn cors_origins_falls_back_to_defaults_when_unset() {
        let config = AppConfig::default();
        assert!(config.cors_origins_list().contains(&"http://localhost:3000".to_string()));
    }

    #[test]
    fn validated_caps_are_never_below_sum_of_output_and_input() {
        let mut model = ModelProviderConfig::default();
        model.model_max_total_tokens = 10;
        let (output, input, total) = model.validated_caps();
        assert!(total >= output + input);
    }
}
