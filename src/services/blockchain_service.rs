use alloy::{
    primitives::Address,
    providers::{Provider, ProviderBuilder, RootProvider},
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::{debug, warn};
use url::Url;

use crate::config::BlockchainSettings;
use crate::error::AppError;

/// Read access to on-chain code, used to tell contracts from plain accounts.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Deployed bytecode at `address`; empty for externally owned accounts.
    async fn get_code(&self, address: &str, chain_id: u64) -> Result<Vec<u8>, AppError>;
}

pub struct BlockchainService {
    ethereum_provider: Arc<RootProvider<Http<Client>>>,
    polygon_provider: Arc<RootProvider<Http<Client>>>,
    arbitrum_provider: Arc<RootProvider<Http<Client>>>,
    retry_attempts: usize,
    retry_base_delay_ms: u64,
}

impl BlockchainService {
    pub fn new(settings: &BlockchainSettings) -> Result<Self, AppError> {
        let ethereum_url = settings.ethereum_rpc_url.parse::<Url>()
            .map_err(|e| AppError::ConfigError(format!("Invalid Ethereum RPC URL: {}", e)))?;
        let polygon_url = settings.polygon_rpc_url.parse::<Url>()
            .map_err(|e| AppError::ConfigError(format!("Invalid Polygon RPC URL: {}", e)))?;
        let arbitrum_url = settings.arbitrum_rpc_url.parse::<Url>()
            .map_err(|e| AppError::ConfigError(format!("Invalid Arbitrum RPC URL: {}", e)))?;

        Ok(Self {
            ethereum_provider: Arc::new(ProviderBuilder::new().on_http(ethereum_url)),
            polygon_provider: Arc::new(ProviderBuilder::new().on_http(polygon_url)),
            arbitrum_provider: Arc::new(ProviderBuilder::new().on_http(arbitrum_url)),
            retry_attempts: settings.rpc_retry_attempts,
            retry_base_delay_ms: settings.rpc_retry_base_delay_ms.max(1),
        })
    }

    pub fn supports_chain(&self, chain_id: u64) -> bool {
        self.get_provider_for_chain(chain_id).is_ok()
    }

    fn get_provider_for_chain(&self, chain_id: u64) -> Result<&Arc<RootProvider<Http<Client>>>, AppError> {
        match chain_id {
            1 => Ok(&self.ethereum_provider),
            137 => Ok(&self.polygon_provider),
            42161 => Ok(&self.arbitrum_provider),
            _ => Err(AppError::UnsupportedChain(chain_id)),
        }
    }
}

#[async_trait]
impl ChainReader for BlockchainService {
    async fn get_code(&self, address: &str, chain_id: u64) -> Result<Vec<u8>, AppError> {
        let provider = self.get_provider_for_chain(chain_id)?;
        let parsed = address.trim().parse::<Address>()
            .map_err(|e| AppError::ValidationError(format!("Invalid address {}: {}", address, e)))?;

        let strategy = ExponentialBackoff::from_millis(self.retry_base_delay_ms)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.retry_attempts);

        let code = Retry::spawn(strategy, || async {
            provider.get_code_at(parsed).await.map_err(|e| {
                warn!(address = %address, chain_id, error = %e, "eth_getCode failed, will retry");
                AppError::ChainError(format!("Failed to get code for {}: {}", address, e))
            })
        })
        .await?;

        debug!(address = %address, chain_id, code_len = code.len(), "Fetched account code");
        Ok(code.to_vec())
    }
}
