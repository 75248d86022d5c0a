//! Transaction engine.
//!
//! # Data Flow
//! ```text
//! Wallet::build_transaction → skeleton.rs (from, to, value, data, nonce)
//!     → estimator.rs (eth_estimateGas ‖ eth_feeHistory, joined)
//!     → transaction.rs (gas ×1.2, fees from reward percentile, sign)
//!     → codec.rs (0x02 || rlp(...))
//!     → Wallet::send_transaction (eth_sendRawTransaction)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY passed per call or read from the environment
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod account;
pub mod client;
pub mod codec;
pub mod crypto;
pub mod estimator;
pub mod skeleton;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use account::Account;
pub use client::RpcClient;
pub use estimator::{Estimations, FeeEstimator};
pub use skeleton::TransactionSkeleton;
pub use transaction::{CheckLevel, IncludeSignature, TransactionBase, TxEnvelope, TxStage, TxType};
pub use types::{BlockchainError, BlockchainResult, ChainId, CodecError, ConfirmationStatus, ErrorKind, FeeLevel};
pub use wallet::{DropOutcome, SendOutcome, Wallet};
