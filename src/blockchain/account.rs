//! Keypair-backed accounts.
//!
//! # Security
//! - The private key is never logged; `Debug` redacts it
//! - Balances are always read live, never cached

use alloy::primitives::{Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use serde_json::Value;

use crate::blockchain::client::RpcClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::rpc::{builder, parse_quantity};

/// A named keypair with its next nonce.
#[derive(Clone)]
pub struct Account {
    address: Address,
    name: String,
    signer: PrivateKeySigner,
    nonce: u64,
    client: RpcClient,
}

impl Account {
    /// Load an account, fetching the nonce from the node when not given.
    ///
    /// Fails with `KeyMismatch` if `signer` does not control `address`.
    pub async fn load(
        address: Address,
        name: impl Into<String>,
        signer: PrivateKeySigner,
        nonce: Option<u64>,
        client: RpcClient,
    ) -> BlockchainResult<Self> {
        if signer.address() != address {
            return Err(BlockchainError::KeyMismatch {
                address: address.to_checksum(None),
            });
        }

        let mut account = Self::from_parts(address, name.into(), signer, 0, client);
        account.nonce = match nonce {
            Some(nonce) => nonce,
            None => account.fetch_nonce().await?,
        };

        tracing::info!(
            address = %account.address,
            name = %account.name,
            nonce = account.nonce,
            "Account loaded"
        );
        Ok(account)
    }

    pub(crate) fn from_parts(
        address: Address,
        name: String,
        signer: PrivateKeySigner,
        nonce: u64,
        client: RpcClient,
    ) -> Self {
        Self {
            address,
            name,
            signer,
            nonce,
            client,
        }
    }

    async fn fetch_nonce(&self) -> BlockchainResult<u64> {
        let request = builder::eth_get_transaction_count(&self.address.to_checksum(None), "latest")?;
        let result = self.client.call(&request).await?;
        parse_quantity(&result)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| BlockchainError::RpcFailed(format!("invalid transaction count: {}", result)))
    }

    /// Re-read the nonce from the node.
    pub async fn refresh_nonce(&mut self) -> BlockchainResult<u64> {
        self.nonce = self.fetch_nonce().await?;
        Ok(self.nonce)
    }

    /// Current balance in wei. Any failure is logged and reported as zero.
    pub async fn balance(&self) -> U256 {
        match self.query_balance().await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(address = %self.address, error = %e, "Balance query failed");
                U256::ZERO
            }
        }
    }

    async fn query_balance(&self) -> BlockchainResult<U256> {
        let request = builder::eth_get_balance(&self.address.to_checksum(None), "latest")?;
        let result = self.client.call(&request).await?;
        parse_quantity(&result).ok_or_else(|| BlockchainError::RpcFailed(format!("invalid balance: {}", result)))
    }

    /// Credit `amount` on a development node. Returns the new balance, zero on failure.
    pub async fn add_balance(&self, amount: U256) -> U256 {
        let outcome = match builder::anvil_add_balance(&self.address.to_checksum(None), amount) {
            Ok(request) => self.client.call(&request).await.map(|_| ()),
            Err(e) => Err(e.into()),
        };
        self.after_dev_update("anvil_addBalance", outcome).await
    }

    /// Overwrite the balance on a development node. Returns the new balance, zero on failure.
    pub async fn set_balance(&self, amount: U256) -> U256 {
        let outcome = match builder::anvil_set_balance(&self.address.to_checksum(None), amount) {
            Ok(request) => self.client.call(&request).await.map(|_| ()),
            Err(e) => Err(e.into()),
        };
        self.after_dev_update("anvil_setBalance", outcome).await
    }

    async fn after_dev_update(&self, method: &str, outcome: BlockchainResult<()>) -> U256 {
        match outcome {
            Ok(()) => self.balance().await,
            Err(e) => {
                tracing::warn!(address = %self.address, method, error = %e, "Balance update failed");
                U256::ZERO
            }
        }
    }

    /// Mint ERC-20 `token` to this account on a development node.
    ///
    /// Returns the raw response document.
    pub async fn deal_erc20(&self, token: Address, amount: U256) -> BlockchainResult<Value> {
        let request = builder::anvil_deal_erc20(
            &self.address.to_checksum(None),
            &token.to_checksum(None),
            amount,
        )?;
        self.client.send(&request).await
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    /// Raw secret key bytes.
    pub fn private_key(&self) -> B256 {
        self.signer.to_bytes()
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("name", &self.name)
            .field("private_key", &"<redacted>")
            .field("nonce", &self.nonce)
            .finish()
    }
}
