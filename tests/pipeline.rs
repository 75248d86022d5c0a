//! End-to-end pipeline against a mock JSON-RPC node over HTTP.

mod common;

use alloy::eips::eip2930::AccessList;
use alloy::primitives::{hex, keccak256, U256};
use serde_json::{json, Value};

use eth_wallet::blockchain::transaction::{CheckLevel, IncludeSignature, TransactionBase, TxStage};
use eth_wallet::blockchain::types::{BlockchainError, ErrorKind, FeeLevel, NetworkConfig};
use eth_wallet::blockchain::{RpcClient, Wallet};

use common::{error, result, start_mock_node};

// Anvil's first account
const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const FROM: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const TO: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

fn config(url: String) -> NetworkConfig {
    NetworkConfig {
        rpc_url: url,
        chain_id: 1,
        rpc_timeout_secs: 5,
        ..NetworkConfig::default()
    }
}

/// A node that prices every transaction the same way and hashes what it receives.
fn happy_node(request: &Value) -> (u16, Value) {
    match request["method"].as_str().unwrap_or_default() {
        "eth_getTransactionCount" => result(request, json!("0x5")),
        "eth_estimateGas" => result(request, json!("0x5208")),
        "eth_feeHistory" => result(
            request,
            json!({
                "oldestBlock": "0x1",
                "baseFeePerGas": ["0x64"],
                "gasUsedRatio": [0.5],
                "reward": [["0x5", "0xf", "0x1e"]]
            }),
        ),
        "eth_sendRawTransaction" => {
            let raw = hex::decode(request["params"][0].as_str().unwrap_or_default()).unwrap_or_default();
            result(request, json!(keccak256(raw).to_string()))
        }
        "eth_chainId" => result(request, json!("0x1")),
        other => error(request, -32601, &format!("method {} not found", other)),
    }
}

#[tokio::test]
async fn test_full_pipeline() {
    let node = start_mock_node(happy_node).await;
    let wallet = Wallet::from_config(config(node.url())).unwrap();

    let account = wallet.get_account(FROM, "alice", TEST_PRIVATE_KEY, None).await.unwrap();
    assert_eq!(account.nonce(), 5);

    let skeleton = wallet
        .build_transaction(FROM, account.nonce(), Some(TO), None, U256::from(1000), AccessList::default())
        .unwrap();
    let mut tx = wallet.estimate_transaction(&skeleton, FeeLevel::Medium).await.unwrap();
    assert_eq!(tx.gas_limit(), Some(U256::from(25200)));
    assert_eq!(tx.max_priority_fee_per_gas(), Some(U256::from(15)));
    assert_eq!(tx.max_fee_per_gas(), Some(U256::from(215)));
    assert_eq!(tx.stage(), TxStage::Estimated);

    let signed = wallet.sign_transaction(&mut tx, TEST_PRIVATE_KEY).unwrap();
    assert!(signed.starts_with("0x02"));

    let decoded = TransactionBase::decode_hex(&signed, CheckLevel::Everything).unwrap();
    assert_eq!(decoded.sender().unwrap().to_checksum(None), FROM);
    assert_eq!(decoded.nonce(), U256::from(5));
    assert_eq!(decoded.value(), U256::from(1000));
    assert_eq!(decoded.encode(IncludeSignature::With).unwrap().to_string(), signed);

    let outcome = wallet.send_transaction(&signed).await.unwrap();
    assert_eq!(outcome.signature, signed);
    assert_eq!(outcome.result, json!(tx.hash().unwrap().to_string()));

    let methods = node.methods();
    assert_eq!(methods.first().map(String::as_str), Some("eth_getTransactionCount"));
    assert_eq!(methods.last().map(String::as_str), Some("eth_sendRawTransaction"));
    assert_eq!(methods.iter().filter(|m| *m == "eth_feeHistory").count(), 1);
}

#[tokio::test]
async fn test_reprice_after_nonce_change() {
    let node = start_mock_node(happy_node).await;
    let wallet = Wallet::from_config(config(node.url())).unwrap();

    let skeleton = wallet
        .build_transaction(FROM, 5, Some(TO), Some("0x"), U256::from(1), AccessList::default())
        .unwrap();
    let mut tx = wallet.estimate_transaction(&skeleton, FeeLevel::High).await.unwrap();
    wallet.sign_transaction(&mut tx, TEST_PRIVATE_KEY).unwrap();

    tx.set_nonce(U256::from(6));
    assert_eq!(tx.stage(), TxStage::Unpriced);
    assert_eq!(wallet.sign_transaction(&mut tx, TEST_PRIVATE_KEY).unwrap_err().code(), 12);

    wallet.estimate_existing(&mut tx).await.unwrap();
    assert_eq!(tx.max_priority_fee_per_gas(), Some(U256::from(30)));
    let signed = wallet.sign_transaction(&mut tx, TEST_PRIVATE_KEY).unwrap();
    let decoded = TransactionBase::decode_hex(&signed, CheckLevel::Cheap).unwrap();
    assert_eq!(decoded.nonce(), U256::from(6));
}

#[tokio::test]
async fn test_estimation_failure_is_all_or_nothing() {
    let node = start_mock_node(|request| match request["method"].as_str().unwrap_or_default() {
        "eth_feeHistory" => error(request, -32000, "fee history unavailable"),
        _ => happy_node(request),
    })
    .await;
    let wallet = Wallet::from_config(config(node.url())).unwrap();

    let skeleton = wallet
        .build_transaction(FROM, 0, Some(TO), None, U256::ZERO, AccessList::default())
        .unwrap();
    let err = wallet.estimate_transaction(&skeleton, FeeLevel::Medium).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(err.to_string().contains("fee history unavailable"));
    assert!(!node.methods().contains(&"eth_sendRawTransaction".to_string()));
}

#[tokio::test]
async fn test_rejected_submission() {
    let node = start_mock_node(|request| match request["method"].as_str().unwrap_or_default() {
        "eth_sendRawTransaction" => error(request, -32000, "nonce too low"),
        _ => happy_node(request),
    })
    .await;
    let wallet = Wallet::from_config(config(node.url())).unwrap();

    let skeleton = wallet
        .build_transaction(FROM, 0, Some(TO), None, U256::ZERO, AccessList::default())
        .unwrap();
    let mut tx = wallet.estimate_transaction(&skeleton, FeeLevel::Low).await.unwrap();
    let signed = wallet.sign_transaction(&mut tx, TEST_PRIVATE_KEY).unwrap();

    match wallet.send_transaction(&signed[2..]).await.unwrap_err() {
        BlockchainError::SendFailed { signature, error } => {
            assert_eq!(signature, signed);
            assert_eq!(error["message"], "nonce too low");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_failover_to_secondary_endpoint() {
    let broken = start_mock_node(|request| (503, json!({"id": request["id"]}))).await;
    let healthy = start_mock_node(happy_node).await;

    let mut network = config(broken.url());
    network.failover_urls = vec![healthy.url()];
    let client = RpcClient::new(network).unwrap();

    assert!(client.verify_chain_id().await.is_ok());
    assert_eq!(broken.methods(), vec!["eth_chainId"]);
    assert_eq!(healthy.methods(), vec!["eth_chainId"]);
}

#[tokio::test]
async fn test_unreachable_node() {
    let client = RpcClient::new(config("http://127.0.0.1:9".to_string())).unwrap();
    let err = client.fetch_chain_id().await.unwrap_err();
    assert_eq!(err.code(), 36);
    assert!(!client.is_healthy().await);
}
