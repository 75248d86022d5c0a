//! Gas and fee estimation.
//!
//! Both remote calls run as independent tasks and are joined. The result is
//! all-or-nothing: either both succeeded or the caller gets one error.

use alloy::primitives::U256;
use serde_json::Value;
use tokio::task::JoinError;

use crate::blockchain::client::RpcClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::observability::metrics;
use crate::rpc::{builder, parse_quantity, RpcOutcome};

/// Blocks of history requested from `eth_feeHistory`.
pub const FEE_HISTORY_BLOCKS: u64 = 5;

/// Reward percentiles for the low, medium and high fee levels.
pub const REWARD_PERCENTILES: [u64; 3] = [10, 50, 90];

/// Network-dependent inputs for pricing a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimations {
    /// Raw `eth_estimateGas` result, before any margin.
    pub gas: U256,
    /// Full `eth_feeHistory` response document.
    pub fee_history: Value,
}

#[derive(Debug, Clone)]
pub struct FeeEstimator {
    client: RpcClient,
}

impl FeeEstimator {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    /// Estimate gas for `call` and fetch recent fee history concurrently.
    ///
    /// Validation errors from either request are returned before anything is
    /// sent. When both calls fail, the gas error is reported.
    pub async fn estimate(&self, call: &Value) -> BlockchainResult<Estimations> {
        let gas_request = builder::eth_estimate_gas(call)?;
        let fee_request = builder::eth_fee_history(FEE_HISTORY_BLOCKS, "latest", &REWARD_PERCENTILES)?;

        let gas_client = self.client.clone();
        let gas_task = tokio::spawn(async move { gas_client.send(&gas_request).await });
        let fee_client = self.client.clone();
        let fee_task = tokio::spawn(async move { fee_client.send(&fee_request).await });

        let (gas_joined, fee_joined) = tokio::join!(gas_task, fee_task);
        let gas_leg = settle("eth_estimateGas", gas_joined);
        let fee_leg = settle("eth_feeHistory", fee_joined);

        let outcome = gas_leg.and_then(|gas_doc| {
            let fee_history = fee_leg?;
            let gas = parse_quantity(&gas_doc["result"]).ok_or_else(|| {
                BlockchainError::RpcFailed(format!("invalid gas estimate: {}", gas_doc["result"]))
            })?;
            Ok(Estimations { gas, fee_history })
        });

        match &outcome {
            Ok(estimations) => {
                metrics::record_estimation("ok");
                tracing::debug!(gas = %estimations.gas, "Estimation complete");
            }
            Err(e) => {
                metrics::record_estimation("failed");
                tracing::warn!(error = %e, "Estimation failed");
            }
        }
        outcome
    }
}

/// Collapse a joined leg into its response document or one `RpcFailed`.
fn settle(
    method: &str,
    joined: Result<BlockchainResult<Value>, JoinError>,
) -> BlockchainResult<Value> {
    let document = match joined {
        Ok(Ok(document)) => document,
        Ok(Err(e)) => return Err(BlockchainError::RpcFailed(format!("{}: {}", method, e))),
        Err(e) => return Err(BlockchainError::RpcFailed(format!("{} task failed: {}", method, e))),
    };
    match RpcOutcome::classify(&document) {
        RpcOutcome::Success(_) => Ok(document),
        RpcOutcome::Failure(error) => Err(BlockchainError::RpcFailed(format!("{}: {}", method, error))),
    }
}
