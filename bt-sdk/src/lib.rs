#![deny(missing_docs)]

//! Bitcoin transaction construction and signing engine.
//!
//! Re-exports the workspace crates for single-crate usage.

pub use bt_primitives as primitives;
pub use bt_script as script;
pub use bt_transaction as transaction;
