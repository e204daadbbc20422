//! Cryptographic primitives and binary codecs for the transaction engine.
//!
//! This crate provides the foundational building blocks:
//! - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160, HMAC-SHA256)
//! - secp256k1 keys and deterministic ECDSA signatures
//! - Variable-length integers and bounds-checked byte readers/writers
//! - Per-network address and key prefixes

pub mod ec;
pub mod hash;
pub mod network;
pub mod util;

mod error;
pub use error::PrimitivesError;
pub use network::NetworkParams;
