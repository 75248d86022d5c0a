//! Syntactic checks shared by the request builders.

use alloy::primitives::Address;

/// Symbolic block tags accepted wherever a block reference is expected.
pub const BLOCK_TAGS: [&str; 3] = ["latest", "earliest", "pending"];

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

/// Hex grammar check. `strict` requires the `0x` prefix; otherwise it is optional.
pub fn is_hex(s: &str, strict: bool) -> bool {
    let digits = match strip_hex_prefix(s) {
        Some(rest) => rest,
        None if strict => return false,
        None => s,
    };
    digits.bytes().all(|b| b.is_ascii_hexdigit())
}

/// True when the hex string (prefix optional) encodes exactly `len` bytes.
pub fn has_byte_length(s: &str, len: usize) -> bool {
    let digits = strip_hex_prefix(s).unwrap_or(s);
    digits.len() == len * 2
}

/// Address syntax: 20 hex bytes, either single-case or a valid EIP-55 checksum.
pub fn is_address(s: &str) -> bool {
    let body = strip_hex_prefix(s).unwrap_or(s);
    if body.len() != 40 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }

    let has_lower = body.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = body.bytes().any(|b| b.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }

    match body.parse::<Address>() {
        Ok(address) => address.to_checksum(None)[2..] == *body,
        Err(_) => false,
    }
}

/// A block reference is a symbolic tag or a strict hex block number.
pub fn is_block_ref(s: &str) -> bool {
    BLOCK_TAGS.contains(&s) || is_hex(s, true)
}

/// Percentiles must lie in `[0, 100]` and be strictly increasing.
pub fn is_reward_percentiles(percentiles: &[u64]) -> bool {
    let mut prev: Option<u64> = None;
    for &p in percentiles {
        if p > 100 {
            return false;
        }
        if prev.is_some_and(|prev| p <= prev) {
            return false;
        }
        prev = Some(p);
    }
    true
}
