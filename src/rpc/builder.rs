//! One call-document builder per supported remote method.
//!
//! Every builder validates its arguments in a fixed order and returns the
//! first violated contract. On success the document is ready to be handed to
//! a [`Transport`](crate::rpc::Transport).

use alloy::primitives::U256;
use serde_json::{json, Map, Value};

use crate::rpc::checks::{has_byte_length, is_address, is_block_ref, is_hex, is_reward_percentiles};
use crate::rpc::request::{RequestError, RequestResult, RpcRequest};

/// Hex-encoded fields of call and transaction objects, validated when present.
const CALL_HEX_FIELDS: [&str; 9] = [
    "data",
    "input",
    "gas",
    "gasPrice",
    "maxFeePerGas",
    "maxPriorityFeePerGas",
    "value",
    "nonce",
    "chainId",
];

/// Format an integer as a JSON-RPC quantity (`0x`-prefixed, no leading zeros).
pub fn quantity(value: U256) -> String {
    format!("0x{:x}", value)
}

/// Format a block number as a block reference.
pub fn block_number(number: u64) -> String {
    format!("0x{:x}", number)
}

fn ensure(condition: bool, error: RequestError) -> RequestResult<()> {
    if condition {
        Ok(())
    } else {
        Err(error)
    }
}

fn check_hex(s: &str) -> RequestResult<()> {
    ensure(is_hex(s, false), RequestError::InvalidHex)
}

fn check_hash(s: &str) -> RequestResult<()> {
    check_hex(s)?;
    ensure(has_byte_length(s, 32), RequestError::InvalidHashLength)
}

fn check_address(s: &str) -> RequestResult<()> {
    ensure(is_address(s), RequestError::InvalidAddress)
}

fn check_block(s: &str) -> RequestResult<()> {
    ensure(is_block_ref(s), RequestError::InvalidBlockNumber)
}

/// Validate a call or transaction object: addresses first, then hex fields.
fn check_call_object(object: &Value) -> RequestResult<()> {
    let map = object
        .as_object()
        .ok_or(RequestError::InvalidField("callObject"))?;

    match map.get("from") {
        Some(Value::String(from)) => check_address(from)?,
        None | Some(Value::Null) => return Err(RequestError::InvalidAddress),
        Some(_) => return Err(RequestError::InvalidField("from")),
    }
    match map.get("to") {
        Some(Value::String(to)) => check_address(to)?,
        None | Some(Value::Null) => {}
        Some(_) => return Err(RequestError::InvalidField("to")),
    }

    for field in CALL_HEX_FIELDS {
        match map.get(field) {
            Some(Value::String(value)) => check_hex(value)?,
            None | Some(Value::Null) => {}
            Some(_) => return Err(RequestError::InvalidField(field)),
        }
    }
    check_access_list(map.get("accessList"))
}

/// `[{address, storageKeys: [32-byte hex]}]`, when present.
fn check_access_list(access_list: Option<&Value>) -> RequestResult<()> {
    let items = match access_list {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(RequestError::InvalidField("accessList")),
    };
    for item in items {
        match item.get("address") {
            Some(Value::String(address)) => check_address(address)?,
            _ => return Err(RequestError::InvalidField("accessList")),
        }
        match item.get("storageKeys") {
            Some(Value::Array(keys)) => keys.iter().try_for_each(|key| match key {
                Value::String(key) => check_hash(key),
                _ => Err(RequestError::InvalidField("accessList")),
            })?,
            _ => return Err(RequestError::InvalidField("accessList")),
        }
    }
    Ok(())
}

fn check_filter_addresses(map: &Map<String, Value>) -> RequestResult<()> {
    match map.get("address") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(address)) => check_address(address),
        Some(Value::Array(addresses)) => addresses.iter().try_for_each(|address| match address {
            Value::String(address) => check_address(address),
            _ => Err(RequestError::InvalidField("address")),
        }),
        Some(_) => Err(RequestError::InvalidField("address")),
    }
}

fn check_topic(topic: &Value) -> RequestResult<()> {
    match topic {
        Value::Null => Ok(()),
        Value::String(topic) => check_hex(topic),
        _ => Err(RequestError::InvalidField("topics")),
    }
}

fn check_filter_topics(map: &Map<String, Value>) -> RequestResult<()> {
    match map.get("topics") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Array(topics)) => topics.iter().try_for_each(|topic| match topic {
            // A nested array is an OR-set for that position.
            Value::Array(alternatives) => alternatives.iter().try_for_each(check_topic),
            other => check_topic(other),
        }),
        Some(_) => Err(RequestError::InvalidField("topics")),
    }
}

/// Validate a log filter, defaulting missing block bounds to `latest`.
fn check_filter(mut filter: Value, allow_block_hash: bool) -> RequestResult<Value> {
    let map = filter
        .as_object_mut()
        .ok_or(RequestError::InvalidField("filter"))?;

    for bound in ["fromBlock", "toBlock"] {
        let missing = matches!(map.get(bound), None | Some(Value::Null));
        if missing {
            map.insert(bound.to_string(), json!("latest"));
            continue;
        }
        match map.get(bound) {
            Some(Value::String(block)) => check_block(block)?,
            _ => return Err(RequestError::InvalidBlockNumber),
        }
    }

    check_filter_addresses(map)?;
    check_filter_topics(map)?;

    if allow_block_hash {
        for key in ["blockHash", "blockhash"] {
            match map.get(key) {
                Some(Value::String(hash)) => check_hash(hash)?,
                None | Some(Value::Null) => {}
                Some(_) => return Err(RequestError::InvalidField("blockHash")),
            }
        }
    }
    Ok(filter)
}

fn bare(method: &str) -> RpcRequest {
    RpcRequest::new(method, Vec::new())
}

pub fn web3_client_version() -> RpcRequest {
    bare("web3_clientVersion")
}

pub fn web3_sha3(data: &str) -> RequestResult<RpcRequest> {
    check_hex(data)?;
    Ok(RpcRequest::new("web3_sha3", vec![json!(data)]))
}

pub fn net_version() -> RpcRequest {
    bare("net_version")
}

pub fn net_listening() -> RpcRequest {
    bare("net_listening")
}

pub fn net_peer_count() -> RpcRequest {
    bare("net_peerCount")
}

pub fn eth_protocol_version() -> RpcRequest {
    bare("eth_protocolVersion")
}

pub fn eth_syncing() -> RpcRequest {
    bare("eth_syncing")
}

pub fn eth_coinbase() -> RpcRequest {
    bare("eth_coinbase")
}

pub fn eth_mining() -> RpcRequest {
    bare("eth_mining")
}

pub fn eth_hashrate() -> RpcRequest {
    bare("eth_hashrate")
}

pub fn eth_gas_price() -> RpcRequest {
    bare("eth_gasPrice")
}

pub fn eth_accounts() -> RpcRequest {
    bare("eth_accounts")
}

pub fn eth_block_number() -> RpcRequest {
    bare("eth_blockNumber")
}

pub fn eth_chain_id() -> RpcRequest {
    bare("eth_chainId")
}

pub fn eth_max_priority_fee_per_gas() -> RpcRequest {
    bare("eth_maxPriorityFeePerGas")
}

pub fn eth_get_balance(address: &str, block: &str) -> RequestResult<RpcRequest> {
    check_address(address)?;
    check_block(block)?;
    Ok(RpcRequest::new("eth_getBalance", vec![json!(address), json!(block)]))
}

pub fn eth_get_storage_at(address: &str, position: &str, block: &str) -> RequestResult<RpcRequest> {
    check_address(address)?;
    check_hex(position)?;
    check_block(block)?;
    Ok(RpcRequest::new(
        "eth_getStorageAt",
        vec![json!(address), json!(position), json!(block)],
    ))
}

pub fn eth_get_transaction_count(address: &str, block: &str) -> RequestResult<RpcRequest> {
    check_address(address)?;
    check_block(block)?;
    Ok(RpcRequest::new(
        "eth_getTransactionCount",
        vec![json!(address), json!(block)],
    ))
}

pub fn eth_get_block_transaction_count_by_hash(hash: &str) -> RequestResult<RpcRequest> {
    check_hash(hash)?;
    Ok(RpcRequest::new("eth_getBlockTransactionCountByHash", vec![json!(hash)]))
}

pub fn eth_get_block_transaction_count_by_number(block: &str) -> RequestResult<RpcRequest> {
    check_block(block)?;
    Ok(RpcRequest::new("eth_getBlockTransactionCountByNumber", vec![json!(block)]))
}

pub fn eth_get_uncle_count_by_block_hash(hash: &str) -> RequestResult<RpcRequest> {
    check_hash(hash)?;
    Ok(RpcRequest::new("eth_getUncleCountByBlockHash", vec![json!(hash)]))
}

pub fn eth_get_uncle_count_by_block_number(block: &str) -> RequestResult<RpcRequest> {
    check_block(block)?;
    Ok(RpcRequest::new("eth_getUncleCountByBlockNumber", vec![json!(block)]))
}

pub fn eth_get_code(address: &str, block: &str) -> RequestResult<RpcRequest> {
    check_address(address)?;
    check_block(block)?;
    Ok(RpcRequest::new("eth_getCode", vec![json!(address), json!(block)]))
}

pub fn eth_sign(address: &str, data: &str) -> RequestResult<RpcRequest> {
    check_address(address)?;
    check_hex(data)?;
    Ok(RpcRequest::new("eth_sign", vec![json!(address), json!(data)]))
}

pub fn eth_sign_transaction(transaction: &Value) -> RequestResult<RpcRequest> {
    check_call_object(transaction)?;
    Ok(RpcRequest::new("eth_signTransaction", vec![transaction.clone()]))
}

pub fn eth_send_transaction(transaction: &Value) -> RequestResult<RpcRequest> {
    check_call_object(transaction)?;
    Ok(RpcRequest::new("eth_sendTransaction", vec![transaction.clone()]))
}

pub fn eth_send_raw_transaction(signed: &str) -> RequestResult<RpcRequest> {
    check_hex(signed)?;
    Ok(RpcRequest::new("eth_sendRawTransaction", vec![json!(signed)]))
}

pub fn eth_call(call: &Value, block: &str) -> RequestResult<RpcRequest> {
    check_call_object(call)?;
    check_block(block)?;
    Ok(RpcRequest::new("eth_call", vec![call.clone(), json!(block)]))
}

pub fn eth_estimate_gas(call: &Value) -> RequestResult<RpcRequest> {
    check_call_object(call)?;
    Ok(RpcRequest::new("eth_estimateGas", vec![call.clone()]))
}

pub fn eth_get_block_by_hash(hash: &str, full_transactions: bool) -> RequestResult<RpcRequest> {
    check_hash(hash)?;
    Ok(RpcRequest::new(
        "eth_getBlockByHash",
        vec![json!(hash), json!(full_transactions)],
    ))
}

pub fn eth_get_block_by_number(block: &str, full_transactions: bool) -> RequestResult<RpcRequest> {
    check_block(block)?;
    Ok(RpcRequest::new(
        "eth_getBlockByNumber",
        vec![json!(block), json!(full_transactions)],
    ))
}

pub fn eth_get_transaction_by_hash(hash: &str) -> RequestResult<RpcRequest> {
    check_hash(hash)?;
    Ok(RpcRequest::new("eth_getTransactionByHash", vec![json!(hash)]))
}

pub fn eth_get_transaction_by_block_hash_and_index(hash: &str, index: &str) -> RequestResult<RpcRequest> {
    check_hex(hash)?;
    check_hex(index)?;
    ensure(has_byte_length(hash, 32), RequestError::InvalidHashLength)?;
    Ok(RpcRequest::new(
        "eth_getTransactionByBlockHashAndIndex",
        vec![json!(hash), json!(index)],
    ))
}

pub fn eth_get_transaction_by_block_number_and_index(block: &str, index: &str) -> RequestResult<RpcRequest> {
    check_block(block)?;
    check_hex(index)?;
    Ok(RpcRequest::new(
        "eth_getTransactionByBlockNumberAndIndex",
        vec![json!(block), json!(index)],
    ))
}

pub fn eth_get_transaction_receipt(hash: &str) -> RequestResult<RpcRequest> {
    check_hash(hash)?;
    Ok(RpcRequest::new("eth_getTransactionReceipt", vec![json!(hash)]))
}

pub fn eth_get_uncle_by_block_hash_and_index(hash: &str, index: &str) -> RequestResult<RpcRequest> {
    check_hex(hash)?;
    check_hex(index)?;
    ensure(has_byte_length(hash, 32), RequestError::InvalidHashLength)?;
    Ok(RpcRequest::new(
        "eth_getUncleByBlockHashAndIndex",
        vec![json!(hash), json!(index)],
    ))
}

pub fn eth_get_uncle_by_block_number_and_index(block: &str, index: &str) -> RequestResult<RpcRequest> {
    check_block(block)?;
    check_hex(index)?;
    Ok(RpcRequest::new(
        "eth_getUncleByBlockNumberAndIndex",
        vec![json!(block), json!(index)],
    ))
}

pub fn eth_new_filter(filter: Value) -> RequestResult<RpcRequest> {
    let filter = check_filter(filter, false)?;
    Ok(RpcRequest::new("eth_newFilter", vec![filter]))
}

pub fn eth_new_block_filter() -> RpcRequest {
    bare("eth_newBlockFilter")
}

pub fn eth_new_pending_transaction_filter() -> RpcRequest {
    bare("eth_newPendingTransactionFilter")
}

pub fn eth_uninstall_filter(filter_id: &str) -> RequestResult<RpcRequest> {
    check_hex(filter_id)?;
    Ok(RpcRequest::new("eth_uninstallFilter", vec![json!(filter_id)]))
}

pub fn eth_get_filter_changes(filter_id: &str) -> RequestResult<RpcRequest> {
    check_hex(filter_id)?;
    Ok(RpcRequest::new("eth_getFilterChanges", vec![json!(filter_id)]))
}

pub fn eth_get_filter_logs(filter_id: &str) -> RequestResult<RpcRequest> {
    check_hex(filter_id)?;
    Ok(RpcRequest::new("eth_getFilterLogs", vec![json!(filter_id)]))
}

pub fn eth_get_logs(filter: Value) -> RequestResult<RpcRequest> {
    let filter = check_filter(filter, true)?;
    Ok(RpcRequest::new("eth_getLogs", vec![filter]))
}

/// `eth_feeHistory(blockCount, newestBlock, rewardPercentiles)`.
pub fn eth_fee_history(block_count: u64, newest_block: &str, reward_percentiles: &[u64]) -> RequestResult<RpcRequest> {
    ensure(block_count > 0, RequestError::InvalidBlockCount)?;
    check_block(newest_block)?;
    ensure(
        is_reward_percentiles(reward_percentiles),
        RequestError::InvalidRewardPercentiles,
    )?;
    Ok(RpcRequest::new(
        "eth_feeHistory",
        vec![
            json!(block_number(block_count)),
            json!(newest_block),
            json!(reward_percentiles),
        ],
    ))
}

pub fn anvil_drop_transaction(hash: &str) -> RequestResult<RpcRequest> {
    check_hash(hash)?;
    Ok(RpcRequest::new("anvil_dropTransaction", vec![json!(hash)]))
}

pub fn anvil_drop_all_transactions() -> RpcRequest {
    bare("anvil_dropAllTransactions")
}

pub fn anvil_set_next_block_base_fee_per_gas(base_fee: U256) -> RpcRequest {
    RpcRequest::new(
        "anvil_setNextBlockBaseFeePerGas",
        vec![json!(quantity(base_fee))],
    )
}

pub fn anvil_set_balance(address: &str, balance: U256) -> RequestResult<RpcRequest> {
    check_address(address)?;
    Ok(RpcRequest::new(
        "anvil_setBalance",
        vec![json!(address), json!(quantity(balance))],
    ))
}

pub fn anvil_add_balance(address: &str, amount: U256) -> RequestResult<RpcRequest> {
    check_address(address)?;
    Ok(RpcRequest::new(
        "anvil_addBalance",
        vec![json!(address), json!(quantity(amount))],
    ))
}

pub fn anvil_deal_erc20(address: &str, token: &str, amount: U256) -> RequestResult<RpcRequest> {
    check_address(address)?;
    check_address(token)?;
    Ok(RpcRequest::new(
        "anvil_dealERC20",
        vec![json!(address), json!(token), json!(quantity(amount))],
    ))
}

pub fn txpool_status() -> RpcRequest {
    bare("txpool_status")
}

pub fn txpool_content() -> RpcRequest {
    bare("txpool_content")
}
