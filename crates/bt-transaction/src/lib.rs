//! Transaction building, signing and serialization.
//!
//! Provides the `Transaction` type with its inputs and outputs, the wire
//! codec, signature digests for every sighash mode, fee estimation and
//! change, funding from UTXOs, and the signer and unlocker strategies used
//! to fill in unlocking scripts.

pub mod change;
pub mod fees;
pub mod input;
pub mod output;
pub mod sighash;
pub mod signer;
pub mod transaction;
pub mod unlocker;
pub mod utxo;

mod error;
pub use change::{AddressResolver, Base58AddressResolver, ChangeOutcome, ChangePolicy, DUST_LIMIT};
pub use error::TransactionError;
pub use fees::{Fee, FeeQuote, FeeType, FeeUnit, TxFees, TxSize};
pub use input::{Input, DEFAULT_SEQUENCE_NUMBER};
pub use output::Output;
pub use sighash::SigHashFlag;
pub use signer::{AutoSigner, Brc42Deriver, DerivedKeySigner, KeyDeriver, LocalSigner, Signer};
pub use transaction::Transaction;
pub use unlocker::{LocalUnlockerGetter, P2PKHUnlocker, Unlocker, UnlockerGetter};
pub use utxo::UTXO;
