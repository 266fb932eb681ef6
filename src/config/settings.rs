use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::AppError;
use crate::utils::time::{self, MAX_DURATION_SECONDS};

const DEFAULT_CONFIG_PATH: &str = "config/risk-monitor.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub blockchain: BlockchainSettings,
    pub monitor: MonitorSettings,
    pub scoring: ScoringSettings,
    pub alerts: AlertSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockchainSettings {
    pub ethereum_rpc_url: String,
    pub polygon_rpc_url: String,
    pub arbitrum_rpc_url: String,
    pub rpc_retry_attempts: usize,
    pub rpc_retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub sweep_interval_seconds: u64,
    pub recheck_window_seconds: u64,
    pub alert_history_limit: usize,
    pub alert_channel_capacity: usize,
}

/// Heuristic and aggregation constants. These are tunable defaults, not
/// calibrated values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub cache_ttl_seconds: u64,
    pub cache_max_capacity: u64,
    pub transaction_model_damping: f64,
    pub contract_model_damping: f64,
    pub transaction_model_weight: f64,
    pub contract_model_weight: f64,
    pub rug_pull_factor_weight: f64,
    pub confidence_weight_divisor: f64,
    pub large_transfer_threshold: f64,
    pub high_gas_price_gwei: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    pub webhook_url: Option<String>,
    pub webhook_enabled: bool,
    pub email_api_url: Option<String>,
    pub email_api_key: Option<String>,
    pub email_sender: Option<String>,
    pub email_recipients: Vec<String>,
    pub email_enabled: bool,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for BlockchainSettings {
    fn default() -> Self {
        BlockchainSettings {
            ethereum_rpc_url: "https://eth-mainnet.alchemyapi.io/v2/demo".to_string(),
            polygon_rpc_url: "https://polygon-mainnet.alchemyapi.io/v2/demo".to_string(),
            arbitrum_rpc_url: "https://arb-mainnet.alchemyapi.io/v2/demo".to_string(),
            rpc_retry_attempts: 3,
            rpc_retry_base_delay_ms: 100,
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings {
            sweep_interval_seconds: 30,
            recheck_window_seconds: 300,
            alert_history_limit: 1000,
            alert_channel_capacity: 256,
        }
    }
}

impl Default for ScoringSettings {
    fn default() -> Self {
        ScoringSettings {
            cache_ttl_seconds: 300,
            cache_max_capacity: 10_000,
            transaction_model_damping: 0.8,
            contract_model_damping: 0.7,
            transaction_model_weight: 0.6,
            contract_model_weight: 0.8,
            rug_pull_factor_weight: 0.9,
            confidence_weight_divisor: 5.0,
            large_transfer_threshold: 100.0,
            high_gas_price_gwei: 200.0,
        }
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        AlertSettings {
            webhook_url: None,
            webhook_enabled: false,
            email_api_url: None,
            email_api_key: None,
            email_sender: None,
            email_recipients: Vec::new(),
            email_enabled: false,
            request_timeout_seconds: 10,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from defaults, the optional config file and
    /// `RISK_MONITOR__*` environment variables, in that order.
    pub fn new() -> Result<Self, AppError> {
        let path = env::var("RISK_MONITOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(Some(Path::new(&path)))
    }

    pub fn load(config_path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(false));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("RISK_MONITOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.monitor.sweep_interval_seconds == 0 {
            return Err(AppError::ConfigError("monitor.sweep_interval_seconds must be positive".to_string()));
        }
        for (name, value) in [
            ("sweep_interval_seconds", self.monitor.sweep_interval_seconds),
            ("recheck_window_seconds", self.monitor.recheck_window_seconds),
        ] {
            if value > MAX_DURATION_SECONDS {
                return Err(AppError::ConfigError(format!(
                    "monitor.{} must not exceed {} seconds",
                    name, MAX_DURATION_SECONDS
                )));
            }
        }
        if self.scoring.confidence_weight_divisor <= 0.0 {
            return Err(AppError::ConfigError("scoring.confidence_weight_divisor must be positive".to_string()));
        }
        for (name, value) in [
            ("transaction_model_damping", self.scoring.transaction_model_damping),
            ("contract_model_damping", self.scoring.contract_model_damping),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::ConfigError(format!("scoring.{} must be within [0, 1]", name)));
            }
        }
        if self.alerts.webhook_enabled && self.alerts.webhook_url.is_none() {
            return Err(AppError::ConfigError("alerts.webhook_enabled requires alerts.webhook_url".to_string()));
        }
        Ok(())
    }
}

impl MonitorSettings {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    pub fn recheck_window(&self) -> chrono::Duration {
        time::seconds(self.recheck_window_seconds)
    }
}

impl ScoringSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}
