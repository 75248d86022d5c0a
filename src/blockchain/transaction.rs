//! Transactions: pricing, signing, hashing and sender recovery.
//!
//! # Lifecycle
//! ```text
//! TransactionSkeleton
//!     → TransactionBase::from_skeleton (unpriced)
//!     → set_gas / set_fees            (estimated, signable)
//!     → sign                          (signed, hash and sender available)
//! ```
//! Any field change drops the signature and both cached values.

use std::cell::OnceCell;
use std::fmt;

use alloy::eips::eip2930::AccessList;
use alloy::primitives::{hex, keccak256, Address, Bytes, Signature, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use serde_json::Value;

use crate::blockchain::codec;
use crate::blockchain::crypto;
use crate::blockchain::skeleton::{call_object, TransactionSkeleton};
use crate::blockchain::types::{CodecError, FeeLevel};
use crate::rpc::parse_quantity;

/// Sender reported for a transaction carrying the all-zero signature.
pub const MAX_ADDRESS: Address = Address::repeat_byte(0xff);

/// Envelope type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TxType {
    Eip1559 = 2,
}

impl TryFrom<u8> for TxType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(TxType::Eip1559),
            other => Err(other),
        }
    }
}

/// Payload of a type-2 transaction. `None` marks a price field not yet set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip1559Fields {
    pub chain_id: u64,
    pub nonce: U256,
    pub max_priority_fee_per_gas: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub gas_limit: Option<U256>,
    /// `None` for contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub access_list: AccessList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEnvelope {
    Eip1559(Eip1559Fields),
}

impl TxEnvelope {
    pub fn tx_type(&self) -> TxType {
        match self {
            TxEnvelope::Eip1559(_) => TxType::Eip1559,
        }
    }
}

/// Whether an encoding carries the signature triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeSignature {
    Without,
    With,
}

/// How much to verify when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckLevel {
    /// Structure only.
    None,
    /// Signature range and low-S.
    #[default]
    Cheap,
    /// Also recover and cache the sender.
    Everything,
}

/// Where a transaction is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStage {
    /// Gas limit or fees missing.
    Unpriced,
    /// Signable but not signed.
    Estimated,
    Signed,
}

/// A type-2 transaction with its signature and memoized identity.
#[derive(Debug, Clone)]
pub struct TransactionBase {
    envelope: TxEnvelope,
    fee_level: FeeLevel,
    from: Option<Address>,
    signature: Option<Signature>,
    hash: OnceCell<B256>,
    sender: OnceCell<Address>,
}

impl TransactionBase {
    /// Start an unpriced transaction from a skeleton.
    pub fn from_skeleton(skeleton: &TransactionSkeleton, fee_level: FeeLevel) -> Self {
        let fields = Eip1559Fields {
            chain_id: skeleton.chain_id(),
            nonce: skeleton.nonce(),
            max_priority_fee_per_gas: None,
            max_fee_per_gas: None,
            gas_limit: None,
            to: skeleton.to(),
            value: skeleton.value(),
            data: skeleton.data().clone(),
            access_list: skeleton.access_list().clone(),
        };
        Self {
            envelope: TxEnvelope::Eip1559(fields),
            fee_level,
            from: Some(skeleton.from()),
            signature: None,
            hash: OnceCell::new(),
            sender: OnceCell::new(),
        }
    }

    /// Decode a wire encoding, verifying the signature as far as `level` asks.
    pub fn decode(raw: &[u8], level: CheckLevel) -> Result<Self, CodecError> {
        let (fields, signature) = codec::decode(raw)?;
        let tx = Self {
            envelope: TxEnvelope::Eip1559(fields),
            fee_level: FeeLevel::default(),
            from: None,
            signature,
            hash: OnceCell::new(),
            sender: OnceCell::new(),
        };

        if level == CheckLevel::None || tx.has_zero_signature() {
            return Ok(tx);
        }
        if let Some(signature) = &tx.signature {
            if !crypto::is_valid_signature(signature) || !crypto::is_low_s(signature) {
                return Err(CodecError::InvalidSignature);
            }
            if level == CheckLevel::Everything {
                tx.sender()?;
            }
        }
        Ok(tx)
    }

    /// Decode a `0x`-prefixed (or bare) hex encoding.
    pub fn decode_hex(encoded: &str, level: CheckLevel) -> Result<Self, CodecError> {
        let raw = hex::decode(encoded).map_err(|e| CodecError::InvalidFormat {
            reason: e.to_string(),
            encoding: encoded.to_string(),
        })?;
        Self::decode(&raw, level)
    }

    fn fields(&self) -> &Eip1559Fields {
        match &self.envelope {
            TxEnvelope::Eip1559(fields) => fields,
        }
    }

    /// The only way fields change. Drops the signature and cached identity.
    fn mutate(&mut self, change: impl FnOnce(&mut Eip1559Fields)) {
        match &mut self.envelope {
            TxEnvelope::Eip1559(fields) => change(fields),
        }
        self.signature = None;
        self.hash.take();
        self.sender.take();
    }

    /// Replace the nonce. Gas and fees are cleared too.
    pub fn set_nonce(&mut self, nonce: U256) {
        self.mutate(|f| {
            f.nonce = nonce;
            f.gas_limit = None;
            f.max_fee_per_gas = None;
            f.max_priority_fee_per_gas = None;
        });
    }

    /// Change the fee preference. Fees must be set again afterwards.
    pub fn set_fee_level(&mut self, fee_level: FeeLevel) {
        self.fee_level = fee_level;
        self.mutate(|f| {
            f.max_fee_per_gas = None;
            f.max_priority_fee_per_gas = None;
        });
    }

    /// Gas limit from an estimate, with a 20% margin.
    pub fn set_gas(&mut self, estimate: U256) {
        let limit = estimate.saturating_mul(U256::from(12)) / U256::from(10);
        self.mutate(|f| f.gas_limit = Some(limit));
    }

    /// Price from an `eth_feeHistory` response document.
    ///
    /// The priority fee is the last block's reward at this fee level; the max
    /// fee is twice the newest base fee plus that priority fee. On error the
    /// transaction is left untouched.
    pub fn set_fees(&mut self, fee_history: &Value) -> Result<(), CodecError> {
        let malformed = |what: &str| CodecError::MalformedFeeHistory(what.to_string());

        let result = fee_history
            .get("result")
            .filter(|r| !r.is_null())
            .ok_or_else(|| malformed("missing result"))?;

        let base_fee = result
            .get("baseFeePerGas")
            .and_then(Value::as_array)
            .and_then(|fees| fees.last())
            .ok_or_else(|| malformed("missing baseFeePerGas"))?;
        let base_fee = parse_quantity(base_fee).ok_or_else(|| malformed("invalid baseFeePerGas"))?;

        let index = self.fee_level.reward_index();
        let reward = result
            .get("reward")
            .and_then(Value::as_array)
            .and_then(|rows| rows.last())
            .ok_or_else(|| malformed("missing reward"))?;
        let priority_fee = reward
            .as_array()
            .and_then(|row| row.get(index))
            .ok_or_else(|| malformed("missing reward percentile"))?;
        let priority_fee = parse_quantity(priority_fee).ok_or_else(|| malformed("invalid reward"))?;

        let max_fee = base_fee.saturating_mul(U256::from(2)).saturating_add(priority_fee);
        self.mutate(|f| {
            f.max_priority_fee_per_gas = Some(priority_fee);
            f.max_fee_per_gas = Some(max_fee);
        });
        Ok(())
    }

    /// Gas limit and both fee fields are set.
    pub fn signable(&self) -> bool {
        let f = self.fields();
        f.gas_limit.is_some() && f.max_fee_per_gas.is_some() && f.max_priority_fee_per_gas.is_some()
    }

    pub fn stage(&self) -> TxStage {
        if self.signature.is_some() {
            TxStage::Signed
        } else if self.signable() {
            TxStage::Estimated
        } else {
            TxStage::Unpriced
        }
    }

    /// Wire encoding: type byte followed by the RLP payload.
    pub fn encode(&self, include: IncludeSignature) -> Result<Bytes, CodecError> {
        let signature = match include {
            IncludeSignature::Without => None,
            IncludeSignature::With => {
                if !self.signable() {
                    return Err(CodecError::Incomplete);
                }
                Some(self.signature.as_ref().ok_or(CodecError::Unsigned)?)
            }
        };
        codec::encode(self.fields(), signature).map(Bytes::from)
    }

    /// Digest that gets signed.
    pub fn signing_hash(&self) -> Result<B256, CodecError> {
        Ok(keccak256(self.encode(IncludeSignature::Without)?))
    }

    /// Transaction hash, computed once per signature.
    pub fn hash(&self) -> Result<B256, CodecError> {
        if let Some(hash) = self.hash.get() {
            return Ok(*hash);
        }
        let hash = keccak256(self.encode(IncludeSignature::With)?);
        let _ = self.hash.set(hash);
        Ok(hash)
    }

    /// Sign with `signer`. Does nothing until the transaction is signable.
    ///
    /// A signature outside the curve range is discarded.
    pub fn sign(&mut self, signer: &PrivateKeySigner) -> alloy::signers::Result<()> {
        let hash = match self.signing_hash() {
            Ok(hash) => hash,
            Err(_) => {
                tracing::debug!(stage = ?self.stage(), "Skipping signature on unpriced transaction");
                return Ok(());
            }
        };

        let signature = crypto::sign_hash(signer, &hash)?;
        if !crypto::is_valid_signature(&signature) {
            tracing::warn!("Signer produced an out-of-range signature, discarding");
            return Ok(());
        }

        self.signature = Some(signature);
        self.hash.take();
        self.sender.take();
        Ok(())
    }

    pub fn signature(&self) -> Result<&Signature, CodecError> {
        self.signature.as_ref().ok_or(CodecError::Unsigned)
    }

    pub fn y_parity(&self) -> Result<bool, CodecError> {
        Ok(self.signature()?.v())
    }

    pub fn has_signature(&self) -> bool {
        self.signature.is_some()
    }

    /// `r` and `s` both zero.
    pub fn has_zero_signature(&self) -> bool {
        self.signature
            .as_ref()
            .is_some_and(|sig| sig.r().is_zero() && sig.s().is_zero())
    }

    /// Recovered signer, computed once per signature.
    pub fn sender(&self) -> Result<Address, CodecError> {
        if let Some(sender) = self.sender.get() {
            return Ok(*sender);
        }
        let signature = self.signature()?;
        let sender = if self.has_zero_signature() {
            MAX_ADDRESS
        } else {
            let hash = self.signing_hash()?;
            crypto::recover_address(signature, &hash).ok_or(CodecError::InvalidSignature)?
        };
        let _ = self.sender.set(sender);
        Ok(sender)
    }

    /// Like [`sender`](Self::sender) but returns the zero address on failure.
    pub fn safe_sender(&self) -> Address {
        self.sender().unwrap_or(Address::ZERO)
    }

    pub fn check_low_s(&self) -> Result<(), CodecError> {
        if crypto::is_low_s(self.signature()?) {
            Ok(())
        } else {
            Err(CodecError::InvalidSignature)
        }
    }

    pub fn check_chain_id(&self, expected: u64) -> Result<(), CodecError> {
        let actual = self.chain_id();
        if actual != expected {
            return Err(CodecError::ChainMismatch { expected, actual });
        }
        Ok(())
    }

    /// Call object for `eth_estimateGas`, sent from the declared or recovered
    /// sender. `from` is omitted when neither is known.
    pub fn to_call_object(&self) -> Value {
        let f = self.fields();
        let from = self.from.or_else(|| self.sender().ok());
        call_object(from, f.to, f.value, &f.data, f.nonce, f.chain_id, &f.access_list)
    }

    pub fn envelope(&self) -> &TxEnvelope {
        &self.envelope
    }

    pub fn tx_type(&self) -> TxType {
        self.envelope.tx_type()
    }

    pub fn fee_level(&self) -> FeeLevel {
        self.fee_level
    }

    /// Sender declared at construction; `None` for decoded transactions.
    pub fn from(&self) -> Option<Address> {
        self.from
    }

    pub fn chain_id(&self) -> u64 {
        self.fields().chain_id
    }

    pub fn nonce(&self) -> U256 {
        self.fields().nonce
    }

    pub fn gas_limit(&self) -> Option<U256> {
        self.fields().gas_limit
    }

    pub fn max_fee_per_gas(&self) -> Option<U256> {
        self.fields().max_fee_per_gas
    }

    pub fn max_priority_fee_per_gas(&self) -> Option<U256> {
        self.fields().max_priority_fee_per_gas
    }

    pub fn to(&self) -> Option<Address> {
        self.fields().to
    }

    pub fn is_creation(&self) -> bool {
        self.fields().to.is_none()
    }

    pub fn value(&self) -> U256 {
        self.fields().value
    }

    pub fn data(&self) -> &Bytes {
        &self.fields().data
    }

    pub fn access_list(&self) -> &AccessList {
        &self.fields().access_list
    }
}

impl PartialEq for TransactionBase {
    fn eq(&self, other: &Self) -> bool {
        self.envelope == other.envelope && self.signature == other.signature
    }
}

impl fmt::Display for TransactionBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields();
        let opt = |v: Option<U256>| v.map_or_else(|| "?".to_string(), |v| v.to_string());

        match self.hash() {
            Ok(hash) => write!(f, "{}", hash)?,
            Err(_) => f.write_str("<unsigned>")?,
        }
        match fields.to {
            Some(to) => write!(f, "{{{}}}", to)?,
            None => f.write_str("{[CREATE]}")?,
        }
        write!(
            f,
            "/{}${}+{}@{}({})<-{} #{}",
            fields.data.len(),
            fields.value,
            opt(fields.gas_limit),
            opt(fields.max_fee_per_gas),
            opt(fields.max_priority_fee_per_gas),
            self.safe_sender(),
            fields.nonce
        )
    }
}
