//! Immutable description of a transaction before pricing.

use alloy::eips::eip2930::AccessList;
use alloy::primitives::{Address, Bytes, U256};
use serde_json::{json, Map, Value};

use crate::rpc::builder::quantity;

/// Who pays, where it goes, what it carries. No gas or fees yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSkeleton {
    from: Address,
    to: Option<Address>,
    value: U256,
    data: Bytes,
    nonce: U256,
    chain_id: u64,
    access_list: AccessList,
}

impl TransactionSkeleton {
    /// A contract creation with zero value and no data.
    pub fn new(from: Address, nonce: U256, chain_id: u64) -> Self {
        Self {
            from,
            to: None,
            value: U256::ZERO,
            data: Bytes::new(),
            nonce,
            chain_id,
            access_list: AccessList::default(),
        }
    }

    pub fn with_to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    /// Drop any destination, turning this into a contract creation.
    pub fn as_creation(mut self) -> Self {
        self.to = None;
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_data(mut self, data: Bytes) -> Self {
        self.data = data;
        self
    }

    pub fn with_access_list(mut self, access_list: AccessList) -> Self {
        self.access_list = access_list;
        self
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn to(&self) -> Option<Address> {
        self.to
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn nonce(&self) -> U256 {
        self.nonce
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn access_list(&self) -> &AccessList {
        &self.access_list
    }

    pub fn is_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Call object for `eth_estimateGas`. Empty data and access lists are omitted.
    pub fn to_call_object(&self) -> Value {
        call_object(
            Some(self.from),
            self.to,
            self.value,
            &self.data,
            self.nonce,
            self.chain_id,
            &self.access_list,
        )
    }
}

/// Shared by skeletons and full transactions. `from` is left out when unknown.
pub(crate) fn call_object(
    from: Option<Address>,
    to: Option<Address>,
    value: U256,
    data: &Bytes,
    nonce: U256,
    chain_id: u64,
    access_list: &AccessList,
) -> Value {
    let mut object = Map::new();
    if let Some(from) = from {
        object.insert("from".into(), json!(from.to_checksum(None)));
    }
    if let Some(to) = to {
        object.insert("to".into(), json!(to.to_checksum(None)));
    }
    object.insert("value".into(), json!(quantity(value)));
    if !data.is_empty() {
        object.insert("data".into(), json!(data.to_string()));
    }
    object.insert("nonce".into(), json!(quantity(nonce)));
    object.insert("chainId".into(), json!(quantity(U256::from(chain_id))));
    if !access_list.is_empty() {
        object.insert("accessList".into(), access_list_json(access_list));
    }
    Value::Object(object)
}

/// `[{address, storageKeys}]` with checksummed addresses.
fn access_list_json(access_list: &AccessList) -> Value {
    access_list
        .iter()
        .map(|item| {
            json!({
                "address": item.address.to_checksum(None),
                "storageKeys": item.storage_keys.iter().map(|key| key.to_string()).collect::<Vec<_>>(),
            })
        })
        .collect()
}
