//! ECDSA signatures over secp256k1.
//!
//! Signing is deterministic (RFC6979) and always produces a low-S value.
//! Serialization is strict DER, the form carried in unlocking scripts.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa;

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// Length of the digest accepted by `sign` and `verify`.
pub const DIGEST_LEN: usize = 32;

/// An ECDSA signature with R and S components.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    inner: ecdsa::Signature,
}

impl Signature {
    /// Build a signature from big-endian R and S values.
    ///
    /// # Returns
    /// `InvalidSignature` if either value is zero or not below the curve order.
    pub fn from_scalars(r: [u8; 32], s: [u8; 32]) -> Result<Self, PrimitivesError> {
        let inner = ecdsa::Signature::from_scalars(r, s)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(Signature { inner })
    }

    /// Parse a strict DER-encoded signature.
    ///
    /// Expected format: `0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>`.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let inner = ecdsa::Signature::from_der(bytes)
            .map_err(|e| PrimitivesError::InvalidSignature(format!("malformed DER: {}", e)))?;
        Ok(Signature { inner })
    }

    /// Serialize as DER with S normalized to the lower half of the order.
    pub fn to_der(&self) -> Vec<u8> {
        self.normalized().to_der().as_bytes().to_vec()
    }

    /// Big-endian R component.
    pub fn r(&self) -> [u8; 32] {
        self.inner.r().to_bytes().into()
    }

    /// Big-endian S component.
    pub fn s(&self) -> [u8; 32] {
        self.inner.s().to_bytes().into()
    }

    /// Whether S is already in the lower half of the curve order.
    pub fn is_low_s(&self) -> bool {
        self.inner.normalize_s().is_none()
    }

    /// Sign a 32-byte digest with an RFC6979 nonce.
    ///
    /// # Arguments
    /// * `hash` - The digest to sign. Must be exactly 32 bytes.
    /// * `priv_key` - The signing key.
    ///
    /// # Returns
    /// A low-S signature, or `InvalidSignature` if the digest has the wrong
    /// length.
    pub fn sign(hash: &[u8], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        if hash.len() != DIGEST_LEN {
            return Err(PrimitivesError::InvalidSignature(format!(
                "digest must be {} bytes, got {}",
                DIGEST_LEN,
                hash.len()
            )));
        }
        let sig: ecdsa::Signature = priv_key
            .signing_key()
            .sign_prehash(hash)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(Signature { inner: sig }.normalized_sig())
    }

    /// Verify this signature against a 32-byte digest.
    pub fn verify(&self, hash: &[u8], pub_key: &PublicKey) -> bool {
        hash.len() == DIGEST_LEN
            && pub_key
                .verifying_key()
                .verify_prehash(hash, &self.normalized())
                .is_ok()
    }

    fn normalized(&self) -> ecdsa::Signature {
        self.inner.normalize_s().unwrap_or_else(|| self.inner.clone())
    }

    fn normalized_sig(self) -> Self {
        Signature {
            inner: self.normalized(),
        }
    }
}
