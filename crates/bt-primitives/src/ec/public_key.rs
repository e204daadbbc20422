//! secp256k1 public key.
//!
//! Supports compressed and uncompressed SEC1 serialization, Hash160,
//! Base58Check P2PKH addresses, BRC-42 child derivation and ECDSA
//! verification.

use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::ProjectivePoint;
use std::fmt;

use crate::ec::private_key::{scalar_from_bytes, PrivateKey};
use crate::ec::signature::Signature;
use crate::hash::{hash160, sha256_hmac, sha256d};
use crate::network::NetworkParams;
use crate::PrimitivesError;

/// Length of a compressed public key in bytes (prefix + 32 byte x-coordinate).
pub const COMPRESSED_LEN: usize = 33;

/// Length of an uncompressed public key in bytes (prefix + 32 byte x + 32 byte y).
pub const UNCOMPRESSED_LEN: usize = 65;

/// A secp256k1 public key.
///
/// Remembers whether it was parsed from (or derived for) the compressed
/// form so that `to_bytes` and `hash160` match what appears on chain.
#[derive(Clone, Debug)]
pub struct PublicKey {
    inner: VerifyingKey,
    compressed: bool,
}

impl PublicKey {
    /// Parse a SEC1-encoded public key.
    ///
    /// Accepts compressed (33-byte) and uncompressed (65-byte) forms.
    ///
    /// # Returns
    /// `Ok(PublicKey)` on success, or `InvalidPublicKey` if the bytes are not
    /// a point on the curve.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.is_empty() {
            return Err(PrimitivesError::InvalidPublicKey(
                "public key is empty".to_string(),
            ));
        }
        let inner = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| PrimitivesError::InvalidPublicKey(e.to_string()))?;
        Ok(PublicKey {
            inner,
            compressed: bytes.len() == COMPRESSED_LEN,
        })
    }

    /// Parse a hex-encoded SEC1 public key.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Serialize in compressed SEC1 form: 0x02/0x03 followed by X.
    pub fn to_compressed(&self) -> [u8; COMPRESSED_LEN] {
        let point = self.inner.to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Serialize in uncompressed SEC1 form: 0x04 followed by X and Y.
    pub fn to_uncompressed(&self) -> [u8; UNCOMPRESSED_LEN] {
        let point = self.inner.to_encoded_point(false);
        let mut out = [0u8; UNCOMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Serialize in the key's own form (compressed unless parsed uncompressed).
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.compressed {
            self.to_compressed().to_vec()
        } else {
            self.to_uncompressed().to_vec()
        }
    }

    /// Whether `to_bytes` yields the compressed form.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Lowercase hex of `to_bytes`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Hash160 of the serialized key, the payload of a P2PKH script.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.to_bytes())
    }

    /// Encode the key's P2PKH address for `network`.
    ///
    /// # Returns
    /// Base58Check of `network.p2pkh_version || hash160`.
    pub fn to_address(&self, network: &NetworkParams) -> String {
        let mut payload = Vec::with_capacity(25);
        payload.push(network.p2pkh_version);
        payload.extend_from_slice(&self.hash160());
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        bs58::encode(payload).into_string()
    }

    /// Verify an ECDSA signature over a 32-byte digest.
    pub fn verify(&self, hash: &[u8], sig: &Signature) -> bool {
        sig.verify(hash, self)
    }

    /// Derive a child public key using BRC-42.
    ///
    /// Adds `G * HMAC-SHA256(shared_secret, invoice_number)` to this key,
    /// where `shared_secret` is the compressed ECDH point with `private_key`.
    /// The result equals the public half of
    /// [`PrivateKey::derive_child`] run by the holder of this key.
    ///
    /// # Arguments
    /// * `private_key` - The counterparty's private key.
    /// * `invoice_number` - Derivation label agreed with the counterparty.
    pub fn derive_child(
        &self,
        private_key: &PrivateKey,
        invoice_number: &str,
    ) -> Result<PublicKey, PrimitivesError> {
        let shared = private_key.derive_shared_secret(self)?;
        let tweak = sha256_hmac(&shared.to_compressed(), invoice_number.as_bytes())?;

        let child = self.to_projective_point() + ProjectivePoint::GENERATOR * scalar_from_bytes(&tweak);
        let encoded = child.to_affine().to_encoded_point(true);
        PublicKey::from_bytes(encoded.as_bytes())
    }

    pub(crate) fn from_k256_verifying_key(vk: &VerifyingKey, compressed: bool) -> Self {
        PublicKey {
            inner: *vk,
            compressed,
        }
    }

    pub(crate) fn to_projective_point(&self) -> ProjectivePoint {
        ProjectivePoint::from(*self.inner.as_affine())
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.inner
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_compressed() == other.to_compressed()
    }
}

impl Eq for PublicKey {}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
