//! Client-side EIP-1559 transaction engine.
//!
//! Build a transaction, price it against a live node, sign it locally and
//! submit it over JSON-RPC.

pub mod blockchain;
pub mod config;
pub mod observability;
pub mod rpc;

pub use blockchain::{Account, TransactionBase, TransactionSkeleton, Wallet};
pub use config::schema::WalletConfig;
