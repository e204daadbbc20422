//! Script push-data codec, pattern recognition and P2PKH helpers.
//!
//! Provides the `Script` byte-vector type, the opcode table, a lazy element
//! decoder, ASM conversion and Base58Check P2PKH addresses. Scripts are
//! encoded, decoded and classified here; they are never executed.

pub mod address;
pub mod chunk;
pub mod opcodes;
pub mod script;

mod error;
pub use address::Address;
pub use chunk::{ScriptElement, ScriptElements};
pub use error::ScriptError;
pub use script::{min_push_size, Script, ScriptType};
