//! Thin wrappers over alloy's hashing, signing and recovery primitives.

use alloy::primitives::{Address, Signature, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

pub use alloy::primitives::keccak256;

/// Order of the secp256k1 group.
pub const SECP256K1N: U256 = U256::from_limbs([
    0xBFD2_5E8C_D036_4141,
    0xBAAE_DCE6_AF48_A03B,
    0xFFFF_FFFF_FFFF_FFFE,
    0xFFFF_FFFF_FFFF_FFFF,
]);

/// `SECP256K1N / 2`, the largest canonical `s`.
pub const SECP256K1N_HALF: U256 = U256::from_limbs([
    0xDFE9_2F46_681B_20A0,
    0x5D57_6E73_57A4_501D,
    0xFFFF_FFFF_FFFF_FFFF,
    0x7FFF_FFFF_FFFF_FFFF,
]);

const MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Parse a hex-encoded private key (with or without 0x prefix).
///
/// The key itself never appears in the error.
pub fn parse_private_key(private_key_hex: &str) -> BlockchainResult<PrivateKeySigner> {
    let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
    key_hex
        .parse()
        .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))
}

/// Address controlled by a key.
pub fn address_of(signer: &PrivateKeySigner) -> Address {
    signer.address()
}

/// Sign a 32-byte digest. The resulting `s` is always in the lower half.
pub fn sign_hash(signer: &PrivateKeySigner, hash: &B256) -> alloy::signers::Result<Signature> {
    signer.sign_hash_sync(hash)
}

/// Recover the signing address of a digest.
pub fn recover_address(signature: &Signature, hash: &B256) -> Option<Address> {
    signature.recover_address_from_prehash(hash).ok()
}

/// `r` and `s` both in `[1, n)`.
pub fn is_valid_signature(signature: &Signature) -> bool {
    let (r, s) = (signature.r(), signature.s());
    !r.is_zero() && !s.is_zero() && r < SECP256K1N && s < SECP256K1N
}

pub fn is_low_s(signature: &Signature) -> bool {
    signature.s() <= SECP256K1N_HALF
}

/// Digest of a personal message: keccak256 of the prefixed, length-tagged data.
pub fn signed_message_hash(data: &[u8]) -> B256 {
    let mut message = Vec::with_capacity(MESSAGE_PREFIX.len() + 20 + data.len());
    message.extend_from_slice(MESSAGE_PREFIX.as_bytes());
    message.extend_from_slice(data.len().to_string().as_bytes());
    message.extend_from_slice(data);
    keccak256(&message)
}
