//! JSON-RPC client over a pluggable transport.
//!
//! # Responsibilities
//! - Serialize call documents and hand them to the transport
//! - Parse response documents and separate `result` from `error`
//! - Verify the connected chain id against configuration
//! - Provide a health check for node connectivity

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainId, NetworkConfig};
use crate::observability::metrics;
use crate::rpc::builder;
use crate::rpc::{HttpTransport, RpcOutcome, RpcRequest, Transport};

/// Shared handle to a node. Cheap to clone.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    config: NetworkConfig,
}

impl RpcClient {
    /// Create a client talking HTTP to the configured endpoints.
    pub fn new(config: NetworkConfig) -> BlockchainResult<Self> {
        let transport = HttpTransport::new(
            &config.rpc_url,
            &config.failover_urls,
            Duration::from_secs(config.rpc_timeout_secs),
        )?;

        tracing::info!(
            rpc_url = %config.rpc_url,
            failovers = config.failover_urls.len(),
            chain_id = config.chain_id,
            "RPC client initialized"
        );

        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn Transport>, config: NetworkConfig) -> Self {
        Self { transport, config }
    }

    /// Send a call document and return the parsed response document.
    pub async fn send(&self, request: &RpcRequest) -> BlockchainResult<Value> {
        let started = std::time::Instant::now();
        let outcome = self.transport.execute(request.body()).await;
        metrics::record_rpc_latency(&request.method, started.elapsed());

        let text = match outcome {
            Ok(text) => text,
            Err(e) => {
                metrics::record_rpc_call(&request.method, "transport_error");
                return Err(e.into());
            }
        };

        let document: Value = serde_json::from_str(&text).map_err(|e| {
            metrics::record_rpc_call(&request.method, "parse_error");
            BlockchainError::RpcFailed(format!("unparseable response to {}: {}", request.method, e))
        })?;

        let status = match RpcOutcome::classify(&document) {
            RpcOutcome::Success(_) => "ok",
            RpcOutcome::Failure(_) => "rpc_error",
        };
        metrics::record_rpc_call(&request.method, status);

        Ok(document)
    }

    /// Send a call document and return its `result`, mapping `error` to `RpcFailed`.
    pub async fn call(&self, request: &RpcRequest) -> BlockchainResult<Value> {
        let document = self.send(request).await?;
        match RpcOutcome::classify(&document) {
            RpcOutcome::Success(result) => Ok(result),
            RpcOutcome::Failure(error) => {
                tracing::debug!(method = %request.method, error = %error, "RPC call returned error");
                Err(BlockchainError::RpcFailed(error.to_string()))
            }
        }
    }

    /// Chain id from configuration.
    pub fn chain_id(&self) -> ChainId {
        ChainId(self.config.chain_id)
    }

    /// Get the chain id reported by the node.
    pub async fn fetch_chain_id(&self) -> BlockchainResult<ChainId> {
        let result = self.call(&builder::eth_chain_id()).await?;
        let id = result
            .as_str()
            .and_then(|s| u64::from_str_radix(s.trim_start_matches("0x"), 16).ok())
            .ok_or_else(|| BlockchainError::RpcFailed(format!("invalid chain id: {}", result)))?;
        Ok(ChainId(id))
    }

    /// Verify the connected chain id matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let actual = self.fetch_chain_id().await?;
        if actual.0 != self.config.chain_id {
            return Err(crate::blockchain::types::CodecError::ChainMismatch {
                expected: self.config.chain_id,
                actual: actual.0,
            }
            .into());
        }
        Ok(())
    }

    /// Check if the node is reachable and answering.
    ///
    /// Returns true if we can query the block number.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.call(&builder::eth_block_number()).await.is_ok();
        metrics::record_node_health(healthy);
        healthy
    }

    /// Get the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::ErrorKind;
    use crate::rpc::transport::FnTransport;
    use crate::rpc::TransportError;
    use serde_json::json;

    fn client_with<F>(f: F) -> RpcClient
    where
        F: Fn(Value) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        RpcClient::with_transport(Arc::new(FnTransport(f)), NetworkConfig::default())
    }

    #[tokio::test]
    async fn test_call_returns_result() {
        let client = client_with(|req| {
            assert_eq!(req["method"], "eth_chainId");
            Ok(json!({"jsonrpc": "2.0", "id": 1, "result": "0x1"}))
        });
        assert_eq!(client.fetch_chain_id().await.unwrap(), ChainId(1));
        assert!(client.verify_chain_id().await.is_ok());
    }

    #[tokio::test]
    async fn test_chain_mismatch() {
        let client = client_with(|_| Ok(json!({"jsonrpc": "2.0", "id": 1, "result": "0x7a69"})));
        let err = client.verify_chain_id().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Codec);
        assert!(err.to_string().contains("31337"));
    }

    #[tokio::test]
    async fn test_error_document() {
        let client = client_with(|_| {
            Ok(json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32601, "message": "method not found"}}))
        });
        let err = client.call(&builder::eth_block_number()).await.unwrap_err();
        assert!(matches!(err, BlockchainError::RpcFailed(ref m) if m.contains("method not found")));

        // `send` hands back the raw document for callers that inspect it themselves.
        let doc = client.send(&builder::eth_block_number()).await.unwrap();
        assert_eq!(doc["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let client = client_with(|_| Err(TransportError::Exhausted { attempted: 1 }));
        let err = client.call(&builder::eth_block_number()).await.unwrap_err();
        assert_eq!(err.code(), 36);
        assert!(!client.is_healthy().await);
    }
}
