//! Chain-specific types and error definitions.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::rpc::RequestError;

// Re-export NetworkConfig from config module to avoid duplication
pub use crate::config::schema::NetworkConfig;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

/// Priority fee preference, indexing into the fee-history reward percentiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FeeLevel {
    /// 10th percentile.
    Low,
    /// 50th percentile.
    #[default]
    Medium,
    /// 90th percentile.
    High,
}

impl FeeLevel {
    /// Slot of this level inside a fee-history `reward` row.
    pub fn reward_index(self) -> usize {
        match self {
            FeeLevel::Low => 0,
            FeeLevel::Medium => 1,
            FeeLevel::High => 2,
        }
    }
}

impl FromStr for FeeLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(FeeLevel::Low),
            "medium" => Ok(FeeLevel::Medium),
            "high" => Ok(FeeLevel::High),
            other => Err(format!("unknown fee level '{}'", other)),
        }
    }
}

impl fmt::Display for FeeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeeLevel::Low => "low",
            FeeLevel::Medium => "medium",
            FeeLevel::High => "high",
        };
        f.write_str(name)
    }
}

/// Failures of the transaction codec and signature lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Malformed or unrecognized binary envelope.
    #[error("invalid transaction format ({reason}): {encoding}")]
    InvalidFormat { reason: String, encoding: String },

    /// Gas limit or one of the fee fields has not been set.
    #[error("transaction is incomplete: gas limit and fees must be set")]
    Incomplete,

    /// A signature was required but the transaction has none.
    #[error("transaction unsigned")]
    Unsigned,

    /// Signature is out of range, not canonical, or does not recover.
    #[error("invalid signature")]
    InvalidSignature,

    /// The chain id of the transaction does not match the expected one.
    #[error("chain id mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// `eth_feeHistory` response lacks a field required to price the transaction.
    #[error("malformed fee history response: {0}")]
    MalformedFeeHistory(String),
}

/// Coarse classification of every error this crate reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally before any network call.
    Validation,
    /// Conversion failure while building a transaction skeleton.
    Build,
    /// Failure in the signing primitives.
    Sign,
    /// The remote peer or the transport failed.
    Protocol,
    /// Corrupted payload or upstream programming error.
    Codec,
    /// A signature was read before signing succeeded.
    Unsigned,
    /// Invalid local configuration or key material.
    Configuration,
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// Request parameters failed validation.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Transaction encoding, decoding, or signature lifecycle failure.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Skeleton construction failed on an address or hex conversion.
    #[error("Build error: {0}")]
    Build(String),

    /// Signing failed in the underlying primitives.
    #[error("Sign error: {0}")]
    Sign(String),

    /// The node rejected `eth_sendRawTransaction`.
    #[error("Send failed: {error}")]
    SendFailed { signature: String, error: Value },

    /// The node returned an RPC-level error or a malformed response.
    #[error("RPC error: {0}")]
    RpcFailed(String),

    /// The node rejected `anvil_dropTransaction`.
    #[error("Drop failed: {error}")]
    DropFailed { hash: String, error: Value },

    /// No endpoint produced a response.
    #[error("Transport error: {0}")]
    Transport(#[from] crate::rpc::TransportError),

    /// The supplied address is not derived from the supplied private key.
    #[error("Address {address} does not match private key")]
    KeyMismatch { address: String },

    /// Invalid private key, mnemonic, or signature bytes.
    #[error("Wallet error: {0}")]
    Wallet(String),
}

impl BlockchainError {
    /// Stable numeric classification of the error.
    pub fn code(&self) -> i32 {
        match self {
            BlockchainError::Request(e) => e.code(),
            BlockchainError::Codec(CodecError::Unsigned) => 40,
            BlockchainError::Codec(_) => 39,
            BlockchainError::Build(_) => 11,
            BlockchainError::Sign(_) => 12,
            BlockchainError::SendFailed { .. } => 13,
            BlockchainError::RpcFailed(_) | BlockchainError::Transport(_) => 36,
            BlockchainError::DropFailed { .. } => 37,
            BlockchainError::KeyMismatch { .. } => 5,
            BlockchainError::Wallet(_) => 41,
        }
    }

    /// Which part of the taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlockchainError::Request(_) | BlockchainError::KeyMismatch { .. } => ErrorKind::Validation,
            BlockchainError::Codec(CodecError::Unsigned) => ErrorKind::Unsigned,
            BlockchainError::Codec(_) => ErrorKind::Codec,
            BlockchainError::Build(_) => ErrorKind::Build,
            BlockchainError::Sign(_) => ErrorKind::Sign,
            BlockchainError::SendFailed { .. }
            | BlockchainError::RpcFailed(_)
            | BlockchainError::DropFailed { .. }
            | BlockchainError::Transport(_) => ErrorKind::Protocol,
            BlockchainError::Wallet(_) => ErrorKind::Configuration,
        }
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Transaction confirmation status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Transaction is pending in mempool.
    Pending,
    /// Transaction has been mined and executed successfully.
    Confirmed { block_number: u64 },
    /// Transaction was mined but reverted, or was never accepted.
    Rejected(String),
}
