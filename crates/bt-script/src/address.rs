//! Base58Check P2PKH addresses.
//!
//! An address is `version || hash160 || checksum`, where the version byte
//! names the network and the checksum is the first four bytes of the
//! double SHA-256 of the preceding 21 bytes.

use std::fmt;

use bt_primitives::ec::PublicKey;
use bt_primitives::hash::sha256d;
use bt_primitives::NetworkParams;

use crate::{Script, ScriptError};

/// Decoded length of a P2PKH address.
const ADDRESS_LEN: usize = 25;

/// A P2PKH address bound to a network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    /// The Base58Check address string.
    pub address_string: String,
    /// The 20-byte RIPEMD-160(SHA-256(pubkey)) hash.
    pub public_key_hash: [u8; 20],
    /// The network the version byte belongs to.
    pub network: NetworkParams,
}

impl Address {
    /// Parse a Base58Check address string.
    ///
    /// The network is detected from the version byte; only mainnet and
    /// testnet P2PKH versions are accepted.
    ///
    /// # Returns
    /// `InvalidAddress` for bad characters or length,
    /// `EncodingChecksumFailed` for a bad checksum and `UnsupportedAddress`
    /// for an unknown version byte.
    pub fn from_string(addr: &str) -> Result<Self, ScriptError> {
        let decoded = bs58::decode(addr)
            .into_vec()
            .map_err(|e| ScriptError::InvalidAddress(format!("'{}': {}", addr, e)))?;

        if decoded.len() != ADDRESS_LEN {
            return Err(ScriptError::InvalidAddress(format!(
                "'{}': decoded length {}",
                addr,
                decoded.len()
            )));
        }

        let checksum = sha256d(&decoded[..21]);
        if decoded[21..] != checksum[..4] {
            return Err(ScriptError::EncodingChecksumFailed);
        }

        let network = NetworkParams::from_p2pkh_version(decoded[0])
            .ok_or_else(|| ScriptError::UnsupportedAddress(addr.to_string()))?;

        let mut public_key_hash = [0u8; 20];
        public_key_hash.copy_from_slice(&decoded[1..21]);

        Ok(Address {
            address_string: addr.to_string(),
            public_key_hash,
            network,
        })
    }

    /// Encode a 20-byte public key hash for `network`.
    pub fn from_public_key_hash(hash: &[u8; 20], network: &NetworkParams) -> Self {
        let mut payload = Vec::with_capacity(ADDRESS_LEN);
        payload.push(network.p2pkh_version);
        payload.extend_from_slice(hash);
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);

        Address {
            address_string: bs58::encode(&payload).into_string(),
            public_key_hash: *hash,
            network: *network,
        }
    }

    /// Encode the address of `pub_key` for `network`.
    pub fn from_public_key(pub_key: &PublicKey, network: &NetworkParams) -> Self {
        Self::from_public_key_hash(&pub_key.hash160(), network)
    }

    /// The P2PKH locking script paying to this address.
    pub fn locking_script(&self) -> Script {
        Script::p2pkh_from_pub_key_hash(&self.public_key_hash)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address_string)
    }
}

impl std::str::FromStr for Address {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_string(s)
    }
}
