//! Call documents and response classification.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Protocol version carried by every call document.
pub const JSONRPC_VERSION: &str = "2.0";

/// Input validation failures, detected before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("invalid hex data")]
    InvalidHex,

    #[error("invalid address")]
    InvalidAddress,

    #[error("invalid hash length")]
    InvalidHashLength,

    /// A compound object, or one of its fields, has the wrong JSON shape.
    #[error("invalid field '{0}'")]
    InvalidField(&'static str),

    #[error("invalid block number")]
    InvalidBlockNumber,

    #[error("invalid block count")]
    InvalidBlockCount,

    #[error("invalid reward percentiles")]
    InvalidRewardPercentiles,
}

impl RequestError {
    /// Stable numeric classification of the failure.
    pub fn code(&self) -> i32 {
        match self {
            RequestError::InvalidHex => 4,
            RequestError::InvalidAddress => 5,
            RequestError::InvalidHashLength => 6,
            RequestError::InvalidField(_) => 8,
            RequestError::InvalidBlockNumber => 9,
            RequestError::InvalidBlockCount => 10,
            RequestError::InvalidRewardPercentiles => 38,
        }
    }
}

/// Result type for request builders.
pub type RequestResult<T> = Result<T, RequestError>;

/// A JSON-RPC 2.0 call document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl RpcRequest {
    /// Build a call document with the fixed version and id.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: 1,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "jsonrpc": self.jsonrpc,
            "method": self.method,
            "params": self.params,
            "id": self.id,
        })
    }

    /// Serialized request body.
    pub fn body(&self) -> String {
        self.to_json().to_string()
    }
}

/// What a response document says about the call.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome {
    Success(Value),
    Failure(Value),
}

impl RpcOutcome {
    /// Classify a response document. A document fails only when it carries
    /// `error` and no `result`.
    pub fn classify(response: &Value) -> Self {
        match (response.get("result"), response.get("error")) {
            (None, Some(error)) => RpcOutcome::Failure(error.clone()),
            (Some(result), _) => RpcOutcome::Success(result.clone()),
            (None, None) => RpcOutcome::Success(Value::Null),
        }
    }
}

/// Read a JSON-RPC quantity (`"0x..."` or a plain JSON number).
pub fn parse_quantity(value: &Value) -> Option<U256> {
    match value {
        Value::String(s) => {
            let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
            if digits.is_empty() {
                return None;
            }
            U256::from_str_radix(digits, 16).ok()
        }
        Value::Number(n) => n.as_u64().map(U256::from),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&json!("0x3e8")), Some(U256::from(1000)));
        assert_eq!(parse_quantity(&json!("0x0")), Some(U256::ZERO));
        assert_eq!(parse_quantity(&json!(21000)), Some(U256::from(21000)));
        assert_eq!(parse_quantity(&json!("0x")), None);
        assert_eq!(parse_quantity(&json!("1000")), None);
        assert_eq!(parse_quantity(&json!(null)), None);
    }

    #[test]
    fn test_document_shape() {
        let request = RpcRequest::new("eth_blockNumber", vec![]);
        let doc = request.to_json();
        assert_eq!(doc["jsonrpc"], "2.0");
        assert_eq!(doc["method"], "eth_blockNumber");
        assert_eq!(doc["params"], json!([]));
        assert_eq!(doc["id"], 1);

        let parsed: RpcRequest = serde_json::from_str(&request.body()).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_classify_response() {
        let ok = json!({"jsonrpc": "2.0", "id": 1, "result": "0x1"});
        assert_eq!(RpcOutcome::classify(&ok), RpcOutcome::Success(json!("0x1")));

        let err = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "nonce too low"}});
        assert!(matches!(RpcOutcome::classify(&err), RpcOutcome::Failure(e) if e["code"] == -32000));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(RequestError::InvalidHex.code(), 4);
        assert_eq!(RequestError::InvalidAddress.code(), 5);
        assert_eq!(RequestError::InvalidHashLength.code(), 6);
        assert_eq!(RequestError::InvalidBlockNumber.code(), 9);
        assert_eq!(RequestError::InvalidRewardPercentiles.code(), 38);
    }
}
