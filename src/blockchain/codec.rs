//! Typed-envelope wire format.
//!
//! ```text
//! 0x02 || rlp([chainId, nonce, maxPriorityFeePerGas, maxFeePerGas, gasLimit,
//!              to, value, data, accessList(, yParity, r, s)])
//! ```
//!
//! Decoding is strict: canonical integers only, one list, no trailing bytes.

use alloy::eips::eip2930::AccessList;
use alloy::primitives::{hex, Address, Bytes, Signature, U256};
use alloy_rlp::{Decodable, Encodable, Header, EMPTY_STRING_CODE};

use crate::blockchain::transaction::{Eip1559Fields, TxType};
use crate::blockchain::types::CodecError;

/// Item count of an unsigned payload.
const UNSIGNED_ITEMS: usize = 9;
/// Item count of a signed payload.
const SIGNED_ITEMS: usize = 12;

/// Encode the envelope, optionally followed by the signature triple.
pub(crate) fn encode(fields: &Eip1559Fields, signature: Option<&Signature>) -> Result<Vec<u8>, CodecError> {
    let (Some(priority_fee), Some(max_fee), Some(gas_limit)) = (
        fields.max_priority_fee_per_gas,
        fields.max_fee_per_gas,
        fields.gas_limit,
    ) else {
        return Err(CodecError::Incomplete);
    };

    let mut payload = Vec::new();
    fields.chain_id.encode(&mut payload);
    fields.nonce.encode(&mut payload);
    priority_fee.encode(&mut payload);
    max_fee.encode(&mut payload);
    gas_limit.encode(&mut payload);
    match &fields.to {
        Some(to) => to.encode(&mut payload),
        None => payload.push(EMPTY_STRING_CODE),
    }
    fields.value.encode(&mut payload);
    fields.data.encode(&mut payload);
    fields.access_list.encode(&mut payload);
    if let Some(signature) = signature {
        (signature.v() as u8).encode(&mut payload);
        signature.r().encode(&mut payload);
        signature.s().encode(&mut payload);
    }

    let header = Header {
        list: true,
        payload_length: payload.len(),
    };
    let mut out = Vec::with_capacity(1 + header.length() + payload.len());
    out.push(TxType::Eip1559 as u8);
    header.encode(&mut out);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode an enveloped transaction into its fields and optional signature.
pub(crate) fn decode(raw: &[u8]) -> Result<(Eip1559Fields, Option<Signature>), CodecError> {
    let invalid = |reason: String| CodecError::InvalidFormat {
        reason,
        encoding: format!("0x{}", hex::encode(raw)),
    };
    let rlp = |e: alloy_rlp::Error| invalid(e.to_string());

    let (&type_byte, rest) = raw.split_first().ok_or_else(|| invalid("empty input".into()))?;
    TxType::try_from(type_byte).map_err(|_| invalid(format!("unknown transaction type 0x{:02x}", type_byte)))?;

    let mut buf = rest;
    let header = Header::decode(&mut buf).map_err(rlp)?;
    if !header.list {
        return Err(invalid("payload is not a list".into()));
    }
    if buf.len() != header.payload_length {
        return Err(invalid(format!(
            "{} trailing bytes after payload",
            buf.len() - header.payload_length
        )));
    }

    let items = count_items(buf).map_err(rlp)?;
    if items != UNSIGNED_ITEMS && items != SIGNED_ITEMS {
        return Err(invalid(format!("expected 9 or 12 fields, found {}", items)));
    }

    let chain_id = u64::decode(&mut buf).map_err(rlp)?;
    let nonce = U256::decode(&mut buf).map_err(rlp)?;
    let max_priority_fee_per_gas = U256::decode(&mut buf).map_err(rlp)?;
    let max_fee_per_gas = U256::decode(&mut buf).map_err(rlp)?;
    let gas_limit = U256::decode(&mut buf).map_err(rlp)?;
    let to = match Header::decode_bytes(&mut buf, false).map_err(rlp)? {
        [] => None,
        bytes if bytes.len() == 20 => Some(Address::from_slice(bytes)),
        bytes => return Err(invalid(format!("destination of {} bytes", bytes.len()))),
    };
    let value = U256::decode(&mut buf).map_err(rlp)?;
    let data = Bytes::decode(&mut buf).map_err(rlp)?;
    let access_list = AccessList::decode(&mut buf).map_err(rlp)?;

    let signature = if items == SIGNED_ITEMS {
        let y_parity = u8::decode(&mut buf).map_err(rlp)?;
        if y_parity > 1 {
            return Err(invalid(format!("y parity {} out of range", y_parity)));
        }
        let r = U256::decode(&mut buf).map_err(rlp)?;
        let s = U256::decode(&mut buf).map_err(rlp)?;
        Some(Signature::new(r, s, y_parity == 1))
    } else {
        None
    };

    let fields = Eip1559Fields {
        chain_id,
        nonce,
        max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
        max_fee_per_gas: Some(max_fee_per_gas),
        gas_limit: Some(gas_limit),
        to,
        value,
        data,
        access_list,
    };
    Ok((fields, signature))
}

/// Number of top-level items in a list payload.
fn count_items(mut buf: &[u8]) -> alloy_rlp::Result<usize> {
    let mut count = 0;
    while !buf.is_empty() {
        // A single byte below 0x80 is its own payload; the header is not consumed.
        let item = Header::decode(&mut buf)?;
        buf = &buf[item.payload_length..];
        count += 1;
    }
    Ok(count)
}
