//! Transaction input referencing a previous output.
//!
//! Besides the wire fields an input carries the value and locking script
//! of the output it spends. These are supplied by the caller and are needed
//! for signature hashing and fee estimation; they are never serialized.

use std::fmt;

use bt_primitives::util::{BtReader, BtWriter, VarInt};
use bt_script::Script;

use crate::output::Output;
use crate::TransactionError;

/// Default sequence number indicating a finalized input (no relative lock-time).
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// Serialized size of an input with an empty unlocking script.
pub(crate) const MIN_INPUT_SIZE: usize = 32 + 4 + 1 + 4;

/// A single transaction input.
///
/// # Wire format
///
/// | Field                  | Size             |
/// |------------------------|------------------|
/// | previous_txid          | 32 bytes         |
/// | previous_output_index  | 4 bytes (LE)     |
/// | script length          | VarInt           |
/// | unlocking_script       | variable         |
/// | sequence_number        | 4 bytes (LE)     |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Input {
    /// Id of the transaction holding the spent output, in protocol byte
    /// order (the reverse of the displayed txid).
    pub previous_txid: [u8; 32],

    /// Index of the spent output within that transaction.
    pub previous_output_index: u32,

    /// Sequence number. Defaults to `0xFFFFFFFF` (finalized).
    pub sequence_number: u32,

    /// The unlocking script. Empty until the input is signed.
    pub unlocking_script: Script,

    previous_output: Option<Output>,
}

impl Input {
    /// Create an unsigned input spending `previous_output_index` of the
    /// transaction `previous_txid` (protocol byte order).
    pub fn new(previous_txid: [u8; 32], previous_output_index: u32) -> Self {
        Input {
            previous_txid,
            previous_output_index,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            unlocking_script: Script::new(),
            previous_output: None,
        }
    }

    /// Create an unsigned input from a displayed (big-endian) txid.
    ///
    /// # Returns
    /// `InvalidHex` if the string is not 32 bytes of hex.
    pub fn from_txid_hex(txid_hex: &str, previous_output_index: u32) -> Result<Self, TransactionError> {
        let mut input = Input::new([0u8; 32], previous_output_index);
        input.set_previous_txid_hex(txid_hex)?;
        Ok(input)
    }

    /// Deserialize an input from a `BtReader`.
    pub fn read_from(reader: &mut BtReader) -> Result<Self, TransactionError> {
        let previous_txid = reader
            .read_array::<32>()
            .map_err(TransactionError::truncated("previous txid"))?;
        let previous_output_index = reader
            .read_u32_le()
            .map_err(TransactionError::truncated("previous output index"))?;
        let script_len = reader
            .read_varint()
            .map_err(TransactionError::truncated("unlocking script length"))?;
        let script_len = usize::try_from(script_len.value()).unwrap_or(usize::MAX);
        let script_bytes = reader
            .read_bytes(script_len)
            .map_err(TransactionError::truncated("unlocking script"))?;
        let sequence_number = reader
            .read_u32_le()
            .map_err(TransactionError::truncated("sequence number"))?;

        Ok(Input {
            previous_txid,
            previous_output_index,
            sequence_number,
            unlocking_script: Script::from_bytes(script_bytes),
            previous_output: None,
        })
    }

    /// Serialize this input into a `BtWriter`.
    pub fn write_to(&self, writer: &mut BtWriter) {
        self.write_with_script(writer, self.unlocking_script.to_bytes());
    }

    /// Serialize this input with `script` in place of the unlocking script.
    pub(crate) fn write_with_script(&self, writer: &mut BtWriter, script: &[u8]) {
        writer.write_bytes(&self.previous_txid);
        writer.write_u32_le(self.previous_output_index);
        writer.write_var_bytes(script);
        writer.write_u32_le(self.sequence_number);
    }

    /// Serialize this input to its wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BtWriter::with_capacity(self.size());
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Serialized length in bytes.
    pub fn size(&self) -> usize {
        let script_len = self.unlocking_script.len();
        32 + 4 + VarInt::from(script_len).length() + script_len + 4
    }

    /// Whether an unlocking script has been applied.
    pub fn is_signed(&self) -> bool {
        !self.unlocking_script.is_empty()
    }

    /// The previous txid in display (big-endian) hex.
    pub fn previous_txid_hex(&self) -> String {
        let mut id = self.previous_txid;
        id.reverse();
        hex::encode(id)
    }

    /// Set the previous txid from display (big-endian) hex.
    ///
    /// The input is left unchanged on error.
    pub fn set_previous_txid_hex(&mut self, txid_hex: &str) -> Result<(), TransactionError> {
        let bytes = hex::decode(txid_hex)?;
        let mut id: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            TransactionError::InvalidHex(format!("txid must be 32 bytes, got {}", b.len()))
        })?;
        id.reverse();
        self.previous_txid = id;
        Ok(())
    }

    /// Record the value and locking script of the output being spent.
    pub fn set_previous_output(&mut self, output: Option<Output>) {
        self.previous_output = output;
    }

    /// The output being spent, if supplied.
    pub fn previous_output(&self) -> Option<&Output> {
        self.previous_output.as_ref()
    }

    /// Value of the output being spent, if supplied.
    pub fn previous_satoshis(&self) -> Option<u64> {
        self.previous_output.as_ref().map(|o| o.satoshis)
    }

    /// Locking script of the output being spent, if supplied.
    pub fn previous_locking_script(&self) -> Option<&Script> {
        self.previous_output.as_ref().map(|o| &o.locking_script)
    }
}

impl Default for Input {
    fn default() -> Self {
        Input::new([0u8; 32], 0)
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "prevTxHash:   {}\nprevOutIndex: {}\nscriptLen:    {}\nscript:       {}\nsequence:     {:x}",
            self.previous_txid_hex(),
            self.previous_output_index,
            self.unlocking_script.len(),
            self.unlocking_script.to_hex(),
            self.sequence_number
        )
    }
}
