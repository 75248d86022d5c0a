//! Wallet: account management and the build → estimate → sign → send pipeline.
//!
//! # Security
//! - Private keys are passed in per call or loaded from the environment
//! - Keys are never logged or retained between calls
//! - The wallet holds no accounts, only a client handle

use std::time::Duration;

use alloy::eips::eip2930::AccessList;
use alloy::primitives::{hex, Address, Bytes, Signature, U256};
use alloy::signers::local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use serde_json::Value;
use tokio::time::{interval, timeout};

use crate::blockchain::account::Account;
use crate::blockchain::client::RpcClient;
use crate::blockchain::crypto;
use crate::blockchain::estimator::FeeEstimator;
use crate::blockchain::skeleton::TransactionSkeleton;
use crate::blockchain::transaction::{IncludeSignature, TransactionBase};
use crate::blockchain::types::{BlockchainError, BlockchainResult, ConfirmationStatus, FeeLevel, NetworkConfig};
use crate::rpc::{builder, checks, parse_quantity, RequestError, RpcOutcome};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "WALLET_PRIVATE_KEY";

/// Node accepted a signed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    /// The signed encoding that was submitted.
    pub signature: String,
    /// The node's `result` (the transaction hash).
    pub result: Value,
}

/// Node dropped a pending transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct DropOutcome {
    pub hash: String,
    pub result: Value,
}

fn with_hex_prefix(s: &str) -> String {
    if s.starts_with("0x") || s.starts_with("0X") {
        s.to_string()
    } else {
        format!("0x{}", s)
    }
}

/// Read the private key from `WALLET_PRIVATE_KEY`.
pub fn private_key_from_env() -> BlockchainResult<String> {
    std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
        BlockchainError::Wallet(format!("Environment variable {} not set", PRIVATE_KEY_ENV_VAR))
    })
}

/// Stateless entry point over one node.
#[derive(Debug, Clone)]
pub struct Wallet {
    client: RpcClient,
}

impl Wallet {
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    /// Wallet over HTTP to the configured endpoints.
    pub fn from_config(config: NetworkConfig) -> BlockchainResult<Self> {
        Ok(Self::new(RpcClient::new(config)?))
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    /// Create a fresh account with nonce 0.
    ///
    /// With a seed phrase the key is derived at `m/44'/60'/0'/0/0`; without
    /// one a random key is generated.
    pub fn create_account(&self, name: &str, seed: Option<&str>) -> BlockchainResult<Account> {
        let signer = match seed {
            Some(phrase) => MnemonicBuilder::<English>::default()
                .phrase(phrase)
                .index(0)
                .and_then(|b| b.build())
                .map_err(|e| BlockchainError::Wallet(format!("Mnemonic derivation failed: {}", e)))?,
            None => PrivateKeySigner::random(),
        };
        let address = signer.address();

        tracing::info!(address = %address, name = %name, derived = seed.is_some(), "Account created");
        Ok(Account::from_parts(address, name.to_string(), signer, 0, self.client.clone()))
    }

    /// Load an existing account, checking the key controls the address.
    pub async fn get_account(
        &self,
        address: &str,
        name: &str,
        private_key: &str,
        nonce: Option<u64>,
    ) -> BlockchainResult<Account> {
        if !checks::is_address(address) {
            return Err(RequestError::InvalidAddress.into());
        }
        let address: Address = address.parse().map_err(|_| RequestError::InvalidAddress)?;
        let signer = crypto::parse_private_key(private_key)?;
        Account::load(address, name, signer, nonce, self.client.clone()).await
    }

    /// Sign a personal message. Returns the 65-byte `r || s || v` signature as hex.
    pub fn sign(&self, data: &[u8], private_key: &str) -> BlockchainResult<String> {
        let signer = crypto::parse_private_key(private_key)?;
        let hash = crypto::signed_message_hash(data);
        let signature = crypto::sign_hash(&signer, &hash).map_err(|e| BlockchainError::Sign(e.to_string()))?;
        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }

    /// Recover the address that signed a personal message.
    pub fn ec_recover(&self, data: &[u8], signature: &str) -> BlockchainResult<Address> {
        let raw = hex::decode(signature).map_err(|_| RequestError::InvalidHex)?;
        let signature = Signature::from_raw(&raw).map_err(|e| BlockchainError::Sign(e.to_string()))?;
        let hash = crypto::signed_message_hash(data);
        crypto::recover_address(&signature, &hash)
            .ok_or_else(|| BlockchainError::Sign("signature does not recover".to_string()))
    }

    /// Build an unpriced skeleton. Any conversion failure is a `Build` error.
    ///
    /// A missing or empty `to` makes a contract creation.
    pub fn build_transaction(
        &self,
        from: &str,
        nonce: u64,
        to: Option<&str>,
        data_hex: Option<&str>,
        value: U256,
        access_list: AccessList,
    ) -> BlockchainResult<TransactionSkeleton> {
        let from: Address = from
            .parse()
            .map_err(|e| BlockchainError::Build(format!("invalid from address '{}': {}", from, e)))?;

        let to = match to.filter(|t| !t.is_empty()) {
            Some(to) => Some(
                to.parse::<Address>()
                    .map_err(|e| BlockchainError::Build(format!("invalid to address '{}': {}", to, e)))?,
            ),
            None => None,
        };

        let data = match data_hex.filter(|d| !d.is_empty()) {
            Some(data) => Bytes::from(
                hex::decode(data).map_err(|e| BlockchainError::Build(format!("invalid data: {}", e)))?,
            ),
            None => Bytes::new(),
        };

        let skeleton = TransactionSkeleton::new(from, U256::from(nonce), self.client.chain_id().0)
            .with_value(value)
            .with_data(data)
            .with_access_list(access_list);
        Ok(match to {
            Some(to) => skeleton.with_to(to),
            None => skeleton,
        })
    }

    /// Price a skeleton: estimate gas and fees, then attach both.
    pub async fn estimate_transaction(
        &self,
        skeleton: &TransactionSkeleton,
        fee_level: FeeLevel,
    ) -> BlockchainResult<TransactionBase> {
        let mut tx = TransactionBase::from_skeleton(skeleton, fee_level);
        self.estimate_existing(&mut tx).await?;
        Ok(tx)
    }

    /// Re-price an existing transaction in place. Drops any signature.
    pub async fn estimate_existing(&self, tx: &mut TransactionBase) -> BlockchainResult<()> {
        let estimations = FeeEstimator::new(self.client.clone())
            .estimate(&tx.to_call_object())
            .await?;
        // Fees first: a malformed history must leave the gas limit untouched too.
        tx.set_fees(&estimations.fee_history)?;
        tx.set_gas(estimations.gas);

        tracing::debug!(
            gas_limit = ?tx.gas_limit(),
            max_fee = ?tx.max_fee_per_gas(),
            fee_level = %tx.fee_level(),
            "Transaction priced"
        );
        Ok(())
    }

    /// Sign and return the `0x`-hex wire encoding.
    pub fn sign_transaction(&self, tx: &mut TransactionBase, private_key: &str) -> BlockchainResult<String> {
        let signer = crypto::parse_private_key(private_key).map_err(|e| BlockchainError::Sign(e.to_string()))?;
        tx.sign(&signer).map_err(|e| BlockchainError::Sign(e.to_string()))?;
        let encoded = tx
            .encode(IncludeSignature::With)
            .map_err(|e| BlockchainError::Sign(e.to_string()))?;
        Ok(encoded.to_string())
    }

    /// Submit a signed encoding with `eth_sendRawTransaction`.
    pub async fn send_transaction(&self, signed: &str) -> BlockchainResult<SendOutcome> {
        let signed = with_hex_prefix(signed);
        let request = builder::eth_send_raw_transaction(&signed)?;
        let document = self.client.send(&request).await?;

        match RpcOutcome::classify(&document) {
            RpcOutcome::Success(result) => {
                tracing::info!(tx_hash = %result, "Transaction submitted");
                Ok(SendOutcome { signature: signed, result })
            }
            RpcOutcome::Failure(error) => {
                tracing::warn!(error = %error, "Transaction rejected by node");
                Err(BlockchainError::SendFailed { signature: signed, error })
            }
        }
    }

    /// Remove a pending transaction with `anvil_dropTransaction`.
    pub async fn drop_transaction(&self, hash: &str) -> BlockchainResult<DropOutcome> {
        let hash = with_hex_prefix(hash);
        let request = builder::anvil_drop_transaction(&hash)?;
        let document = self.client.send(&request).await?;

        match RpcOutcome::classify(&document) {
            RpcOutcome::Success(result) => {
                tracing::info!(tx_hash = %hash, "Transaction dropped");
                Ok(DropOutcome { hash, result })
            }
            RpcOutcome::Failure(error) => Err(BlockchainError::DropFailed { hash, error }),
        }
    }

    /// One receipt lookup.
    pub async fn transaction_status(&self, hash: &str) -> BlockchainResult<ConfirmationStatus> {
        let hash = with_hex_prefix(hash);
        let request = builder::eth_get_transaction_receipt(&hash)?;
        let receipt = self.client.call(&request).await?;
        if receipt.is_null() {
            return Ok(ConfirmationStatus::Pending);
        }

        let status = receipt.get("status").and_then(parse_quantity);
        if status == Some(U256::ZERO) {
            return Ok(ConfirmationStatus::Rejected("Transaction reverted".to_string()));
        }
        let block_number = receipt
            .get("blockNumber")
            .and_then(parse_quantity)
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or_default();
        Ok(ConfirmationStatus::Confirmed { block_number })
    }

    /// Poll until the transaction is mined or `timeout_secs` elapses.
    pub async fn wait_for_confirmation(&self, hash: &str, timeout_secs: u64) -> BlockchainResult<ConfirmationStatus> {
        let poll_interval = Duration::from_secs(self.client.config().confirmation_poll_secs.max(1));

        let result = timeout(Duration::from_secs(timeout_secs), async {
            let mut ticker = interval(poll_interval);
            loop {
                ticker.tick().await;
                match self.transaction_status(hash).await? {
                    ConfirmationStatus::Pending => {
                        tracing::debug!(tx_hash = %hash, "Transaction pending");
                    }
                    done => return Ok(done),
                }
            }
        })
        .await;

        match result {
            Ok(status) => status,
            Err(_) => Ok(ConfirmationStatus::Pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::{CodecError, ErrorKind};
    use crate::rpc::transport::FnTransport;
    use crate::rpc::TransportError;
    use alloy::eips::eip2930::AccessListItem;
    use alloy::primitives::B256;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    // Anvil's first account
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

    fn wallet_with<F>(f: F) -> Wallet
    where
        F: Fn(Value) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        Wallet::new(RpcClient::with_transport(Arc::new(FnTransport(f)), NetworkConfig::default()))
    }

    fn offline() -> Wallet {
        wallet_with(|_| Err(TransportError::Exhausted { attempted: 1 }))
    }

    fn result(value: Value) -> Result<Value, TransportError> {
        Ok(json!({"jsonrpc": "2.0", "id": 1, "result": value}))
    }

    #[test]
    fn test_create_account_from_seed() {
        let account = offline().create_account("dev", Some(TEST_MNEMONIC)).unwrap();
        assert_eq!(account.address().to_checksum(None), TEST_ADDRESS);
        assert_eq!(account.nonce(), 0);

        let random = offline().create_account("fresh", None).unwrap();
        assert_ne!(random.address(), account.address());

        let err = offline().create_account("bad", Some("not a mnemonic")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_get_account_checks() {
        let wallet = offline();
        let err = wallet.get_account("0x1234", "x", TEST_PRIVATE_KEY, Some(0)).await.unwrap_err();
        assert!(matches!(err, BlockchainError::Request(RequestError::InvalidAddress)));

        let other = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
        let err = wallet.get_account(other, "x", TEST_PRIVATE_KEY, Some(0)).await.unwrap_err();
        assert!(matches!(err, BlockchainError::KeyMismatch { .. }));

        let account = wallet.get_account(TEST_ADDRESS, "x", TEST_PRIVATE_KEY, Some(9)).await.unwrap();
        assert_eq!(account.nonce(), 9);
    }

    #[test]
    fn test_message_sign_and_recover() {
        let wallet = offline();
        let signature = wallet.sign(b"hello", TEST_PRIVATE_KEY).unwrap();
        assert_eq!(signature.len(), 2 + 130);
        assert!(signature.ends_with("1b") || signature.ends_with("1c"));

        let recovered = wallet.ec_recover(b"hello", &signature).unwrap();
        assert_eq!(recovered.to_checksum(None), TEST_ADDRESS);
        assert_ne!(wallet.ec_recover(b"hullo", &signature).unwrap(), recovered);
        assert!(wallet.ec_recover(b"hello", "0xzz").is_err());
    }

    #[test]
    fn test_build_transaction() {
        let wallet = offline();
        let to = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
        let skeleton = wallet
            .build_transaction(TEST_ADDRESS, 5, Some(to), Some("0xdead"), U256::from(1000), AccessList::default())
            .unwrap();
        assert_eq!(skeleton.chain_id(), 1);
        assert_eq!(skeleton.nonce(), U256::from(5));
        assert_eq!(skeleton.data().to_vec(), vec![0xde, 0xad]);
        assert!(!skeleton.is_creation());

        let creation = wallet
            .build_transaction(TEST_ADDRESS, 0, Some(""), None, U256::ZERO, AccessList::default())
            .unwrap();
        assert!(creation.is_creation());

        for (from, to, data) in [("0xnope", None, None), (TEST_ADDRESS, Some("0x12"), None), (TEST_ADDRESS, None, Some("0xzz"))] {
            let err = wallet
                .build_transaction(from, 0, to, data, U256::ZERO, AccessList::default())
                .unwrap_err();
            assert_eq!(err.code(), 11);
        }
    }

    #[test]
    fn test_sign_transaction_requires_pricing() {
        let wallet = offline();
        let skeleton = wallet
            .build_transaction(TEST_ADDRESS, 0, None, None, U256::ZERO, AccessList::default())
            .unwrap();
        let mut tx = TransactionBase::from_skeleton(&skeleton, FeeLevel::Medium);
        let err = wallet.sign_transaction(&mut tx, TEST_PRIVATE_KEY).unwrap_err();
        assert_eq!(err.code(), 12);
    }

    #[tokio::test]
    async fn test_send_and_drop_outcomes() {
        let hash = format!("0x{}", "ab".repeat(32));
        let expected = hash.clone();
        let wallet = wallet_with(move |req| match req["method"].as_str() {
            Some("eth_sendRawTransaction") => {
                assert_eq!(req["params"][0], "0x02c0");
                result(json!(expected))
            }
            Some("anvil_dropTransaction") => Ok(json!({
                "jsonrpc": "2.0", "id": 1,
                "error": {"code": -32000, "message": "not found"}
            })),
            other => panic!("unexpected method {:?}", other),
        });

        let sent = wallet.send_transaction("02c0").await.unwrap();
        assert_eq!(sent.signature, "0x02c0");
        assert_eq!(sent.result, json!(hash));

        let err = wallet.drop_transaction(&hash[2..]).await.unwrap_err();
        match err {
            BlockchainError::DropFailed { hash: dropped, error } => {
                assert_eq!(dropped, hash);
                assert_eq!(error["message"], "not found");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_rejected() {
        let wallet = wallet_with(|_| {
            Ok(json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "nonce too low"}}))
        });
        let err = wallet.send_transaction("0x02c0").await.unwrap_err();
        assert_eq!(err.code(), 13);
        assert!(err.to_string().contains("nonce too low"));
    }

    #[tokio::test]
    async fn test_transaction_status() {
        let wallet = wallet_with(|req| {
            let hash = req["params"][0].as_str().unwrap_or_default().to_string();
            if hash.ends_with("01") {
                result(Value::Null)
            } else if hash.ends_with("02") {
                result(json!({"status": "0x0", "blockNumber": "0x10"}))
            } else {
                result(json!({"status": "0x1", "blockNumber": "0x10"}))
            }
        });
        let hash = |tail: &str| format!("0x{}{}", "00".repeat(31), tail);

        assert_eq!(wallet.transaction_status(&hash("01")).await.unwrap(), ConfirmationStatus::Pending);
        assert!(matches!(
            wallet.transaction_status(&hash("02")).await.unwrap(),
            ConfirmationStatus::Rejected(_)
        ));
        assert_eq!(
            wallet.wait_for_confirmation(&hash("03"), 5).await.unwrap(),
            ConfirmationStatus::Confirmed { block_number: 16 }
        );
    }

    fn fee_history(reward: Option<Value>) -> Result<Value, TransportError> {
        let mut history = json!({"oldestBlock": "0x1", "baseFeePerGas": ["0x64"], "gasUsedRatio": [0.5]});
        if let Some(reward) = reward {
            history["reward"] = reward;
        }
        result(history)
    }

    #[tokio::test]
    async fn test_estimation_sends_access_list() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();
        let wallet = wallet_with(move |req| match req["method"].as_str() {
            Some("eth_estimateGas") => {
                seen.lock().unwrap().push(req["params"][0].clone());
                result(json!("0x5208"))
            }
            _ => fee_history(Some(json!([["0x5", "0xf", "0x1e"]]))),
        });

        let to = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
        let access_list = AccessList(vec![AccessListItem {
            address: Address::with_last_byte(1),
            storage_keys: vec![B256::ZERO],
        }]);
        let skeleton = wallet
            .build_transaction(TEST_ADDRESS, 0, Some(to), None, U256::ZERO, access_list)
            .unwrap();
        wallet.estimate_transaction(&skeleton, FeeLevel::Medium).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["chainId"], "0x1");
        assert_eq!(
            calls[0]["accessList"],
            json!([{
                "address": "0x0000000000000000000000000000000000000001",
                "storageKeys": ["0x0000000000000000000000000000000000000000000000000000000000000000"]
            }])
        );
    }

    #[tokio::test]
    async fn test_failed_reprice_leaves_transaction_unchanged() {
        let gas_rounds = Arc::new(AtomicUsize::new(0));
        let fee_rounds = Arc::new(AtomicUsize::new(0));
        let wallet = wallet_with(move |req| match req["method"].as_str() {
            Some("eth_estimateGas") => match gas_rounds.fetch_add(1, Ordering::SeqCst) {
                0 => result(json!("0x5208")),
                _ => result(json!("0x186a0")),
            },
            _ => match fee_rounds.fetch_add(1, Ordering::SeqCst) {
                0 => fee_history(Some(json!([["0x5", "0xf", "0x1e"]]))),
                _ => fee_history(None),
            },
        });

        let skeleton = wallet
            .build_transaction(TEST_ADDRESS, 0, None, None, U256::ZERO, AccessList::default())
            .unwrap();
        let mut tx = wallet.estimate_transaction(&skeleton, FeeLevel::Medium).await.unwrap();
        assert_eq!(tx.gas_limit(), Some(U256::from(25200)));
        assert_eq!(tx.max_fee_per_gas(), Some(U256::from(215)));

        let err = wallet.estimate_existing(&mut tx).await.unwrap_err();
        assert!(matches!(err, BlockchainError::Codec(CodecError::MalformedFeeHistory(_))));
        assert_eq!(tx.gas_limit(), Some(U256::from(25200)));
        assert_eq!(tx.max_fee_per_gas(), Some(U256::from(215)));
        assert_eq!(tx.max_priority_fee_per_gas(), Some(U256::from(15)));
    }
}
