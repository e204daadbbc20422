//! Hash functions used by the transaction engine.
//!
//! SHA-256d backs transaction ids and signature hashes, Hash160 backs
//! pay-to-public-key-hash scripts and addresses, and HMAC-SHA256 backs
//! derived-key signing.

use hmac::{Hmac, Mac};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::PrimitivesError;

/// Compute SHA-256 hash of the input data.
///
/// # Arguments
/// * `data` - Byte slice to hash.
///
/// # Returns
/// A 32-byte SHA-256 digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute double SHA-256: SHA-256(SHA-256(data)).
///
/// Transaction ids and signature digests are produced with this function.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Compute RIPEMD-160 hash of the input data.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute Hash160: RIPEMD-160(SHA-256(data)).
///
/// # Arguments
/// * `data` - Byte slice to hash, usually a serialized public key.
///
/// # Returns
/// A 20-byte digest, the payload of P2PKH scripts and addresses.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

/// Compute HMAC-SHA256 of `data` under `key`.
///
/// # Returns
/// A 32-byte tag, or `PrimitivesError::Other` if the MAC cannot be keyed.
pub fn sha256_hmac(key: &[u8], data: &[u8]) -> Result<[u8; 32], PrimitivesError> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
        .map_err(|e| PrimitivesError::Other(format!("hmac key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}
