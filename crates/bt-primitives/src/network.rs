//! Network-dependent encoding parameters.
//!
//! Addresses and WIF keys carry a version byte identifying the network
//! they belong to. Callers pass a `NetworkParams` explicitly; nothing in
//! the workspace reads a process-wide network setting.

use serde::Serialize;

/// Version bytes and key prefixes for one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkParams {
    /// Human-readable network name.
    pub name: &'static str,
    /// Version byte of pay-to-public-key-hash addresses.
    pub p2pkh_version: u8,
    /// Version byte of pay-to-script-hash addresses.
    pub p2sh_version: u8,
    /// Version byte of WIF-encoded private keys.
    pub wif_prefix: u8,
    /// Extended public key version.
    pub bip32_public: [u8; 4],
    /// Extended private key version.
    pub bip32_private: [u8; 4],
}

impl NetworkParams {
    /// Parameters of the main network.
    pub const MAINNET: NetworkParams = NetworkParams {
        name: "mainnet",
        p2pkh_version: 0x00,
        p2sh_version: 0x05,
        wif_prefix: 0x80,
        bip32_public: [0x04, 0x88, 0xb2, 0x1e],
        bip32_private: [0x04, 0x88, 0xad, 0xe4],
    };

    /// Parameters of the test network.
    pub const TESTNET: NetworkParams = NetworkParams {
        name: "testnet",
        p2pkh_version: 0x6f,
        p2sh_version: 0xc4,
        wif_prefix: 0xef,
        bip32_public: [0x04, 0x35, 0x87, 0xcf],
        bip32_private: [0x04, 0x35, 0x83, 0x94],
    };

    /// Look up the network that uses `prefix` for P2PKH addresses.
    pub fn from_p2pkh_version(prefix: u8) -> Option<NetworkParams> {
        [Self::MAINNET, Self::TESTNET]
            .into_iter()
            .find(|n| n.p2pkh_version == prefix)
    }

    /// Look up the network that uses `prefix` for WIF keys.
    pub fn from_wif_prefix(prefix: u8) -> Option<NetworkParams> {
        [Self::MAINNET, Self::TESTNET]
            .into_iter()
            .find(|n| n.wif_prefix == prefix)
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self::MAINNET
    }
}
