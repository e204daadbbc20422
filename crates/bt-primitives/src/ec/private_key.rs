//! secp256k1 private key.
//!
//! Wraps the k256 signing key and adds WIF encoding, BRC-42 child key
//! derivation, and deterministic signing of 32-byte digests.

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::ScalarPrimitive;
use k256::{Scalar, Secp256k1, U256};
use rand::rngs::OsRng;

use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::hash::{sha256_hmac, sha256d};
use crate::network::NetworkParams;
use crate::PrimitivesError;

/// Length of a serialized private key in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// Flag byte appended to the WIF payload when the public key is compressed.
const COMPRESS_MAGIC: u8 = 0x01;

/// A secp256k1 private key.
///
/// The scalar is zeroized when the key is dropped.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    inner: SigningKey,
    compressed: bool,
}

impl PrivateKey {
    /// Generate a new random private key from the OS random number generator.
    pub fn new() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
            compressed: true,
        }
    }

    /// Create a private key from a raw 32-byte big-endian scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` if the scalar is in `[1, n)`, otherwise
    /// `PrimitivesError::InvalidPrivateKey`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidKeyLength {
                expected: PRIVATE_KEY_BYTES_LEN,
                got: bytes.len(),
            });
        }
        let inner = SigningKey::from_slice(bytes)
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey {
            inner,
            compressed: true,
        })
    }

    /// Create a private key from a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Decode a WIF (Wallet Import Format) string.
    ///
    /// Accepts both compressed (38-byte payload) and uncompressed (37-byte
    /// payload) encodings and validates the Base58Check checksum. The network
    /// is not checked here; use [`PrivateKey::from_wif_network`] to find out
    /// which network the key was encoded for.
    ///
    /// # Arguments
    /// * `wif` - A Base58Check-encoded WIF string.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` on success, or `InvalidWif` / `ChecksumMismatch`.
    pub fn from_wif(wif: &str) -> Result<Self, PrimitivesError> {
        Self::from_wif_network(wif).map(|(key, _)| key)
    }

    /// Decode a WIF string and report the network whose prefix it carries.
    ///
    /// # Returns
    /// The key and the matching `NetworkParams`, or `InvalidWif` if the
    /// prefix belongs to no known network.
    pub fn from_wif_network(wif: &str) -> Result<(Self, NetworkParams), PrimitivesError> {
        let decoded = bs58::decode(wif)
            .into_vec()
            .map_err(|e| PrimitivesError::InvalidBase58(e.to_string()))?;

        let compressed = match decoded.len() {
            38 if decoded[33] == COMPRESS_MAGIC => true,
            38 => {
                return Err(PrimitivesError::InvalidWif(
                    "invalid compression flag".to_string(),
                ))
            }
            37 => false,
            n => {
                return Err(PrimitivesError::InvalidWif(format!(
                    "invalid length {}",
                    n
                )))
            }
        };

        let (payload, checksum) = decoded.split_at(decoded.len() - 4);
        if sha256d(payload)[..4] != *checksum {
            return Err(PrimitivesError::ChecksumMismatch);
        }

        let network = NetworkParams::from_wif_prefix(payload[0]).ok_or_else(|| {
            PrimitivesError::InvalidWif(format!("unknown network prefix {:#04x}", payload[0]))
        })?;

        let mut key = Self::from_bytes(&payload[1..1 + PRIVATE_KEY_BYTES_LEN])?;
        key.compressed = compressed;
        Ok((key, network))
    }

    /// Encode the key as WIF for the given network.
    ///
    /// The compression flag is preserved from decoding; freshly generated
    /// keys are always compressed.
    pub fn to_wif(&self, network: &NetworkParams) -> String {
        let mut payload = Vec::with_capacity(1 + PRIVATE_KEY_BYTES_LEN + 1 + 4);
        payload.push(network.wif_prefix);
        payload.extend_from_slice(&self.to_bytes());
        if self.compressed {
            payload.push(COMPRESS_MAGIC);
        }
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        bs58::encode(payload).into_string()
    }

    /// Serialize the private key as a 32-byte big-endian array.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes().into()
    }

    /// Serialize the private key as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Whether the matching public key is serialized compressed.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Derive the corresponding public key.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_k256_verifying_key(self.inner.verifying_key(), self.compressed)
    }

    /// Sign a 32-byte digest with a deterministic RFC6979 nonce.
    ///
    /// The signature is low-S normalized.
    pub fn sign(&self, hash: &[u8]) -> Result<Signature, PrimitivesError> {
        Signature::sign(hash, self)
    }

    /// Compute the ECDH shared point with another party's public key.
    pub fn derive_shared_secret(&self, pub_key: &PublicKey) -> Result<PublicKey, PrimitivesError> {
        let shared = pub_key.to_projective_point() * self.to_scalar();
        let encoded = shared.to_affine().to_encoded_point(true);
        PublicKey::from_bytes(encoded.as_bytes())
    }

    /// Derive a child private key using BRC-42.
    ///
    /// The child scalar is `self + HMAC-SHA256(shared_secret, invoice_number)`
    /// modulo the curve order, where `shared_secret` is the compressed ECDH
    /// point with `pub_key`.
    ///
    /// # Arguments
    /// * `pub_key` - The counterparty's public key.
    /// * `invoice_number` - Derivation label agreed with the counterparty.
    pub fn derive_child(
        &self,
        pub_key: &PublicKey,
        invoice_number: &str,
    ) -> Result<PrivateKey, PrimitivesError> {
        let shared = self.derive_shared_secret(pub_key)?;
        let tweak = sha256_hmac(&shared.to_compressed(), invoice_number.as_bytes())?;

        let child = self.to_scalar() + scalar_from_bytes(&tweak);
        let primitive: ScalarPrimitive<Secp256k1> = child.into();
        PrivateKey::from_bytes(&primitive.to_bytes())
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }

    pub(crate) fn to_scalar(&self) -> Scalar {
        *self.inner.as_nonzero_scalar().as_ref()
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        let mut bytes = self.inner.to_bytes();
        bytes.zeroize();
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}

/// Reduce a 32-byte big-endian value into a scalar modulo the curve order.
pub(crate) fn scalar_from_bytes(bytes: &[u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce(U256::from_be_slice(bytes))
}
