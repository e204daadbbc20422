//! Transaction output: a satoshi amount and a locking script.

use std::fmt;

use bt_primitives::util::{BtReader, BtWriter, VarInt};
use bt_script::Script;

use crate::TransactionError;

/// A single transaction output.
///
/// # Wire format
///
/// | Field            | Size           |
/// |------------------|----------------|
/// | satoshis         | 8 bytes (LE)   |
/// | script length    | VarInt         |
/// | locking_script   | variable       |
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Output {
    /// Value in satoshis.
    pub satoshis: u64,
    /// Spending conditions for the value.
    pub locking_script: Script,
}

impl Output {
    /// Create an output paying `satoshis` to `locking_script`.
    pub fn new(satoshis: u64, locking_script: Script) -> Self {
        Output {
            satoshis,
            locking_script,
        }
    }

    /// Deserialize an output from a `BtReader`.
    ///
    /// # Returns
    /// `Truncated` naming the field that ran past the end of the buffer.
    pub fn read_from(reader: &mut BtReader) -> Result<Self, TransactionError> {
        let satoshis = reader
            .read_u64_le()
            .map_err(TransactionError::truncated("output satoshis"))?;
        let script_len = reader
            .read_varint()
            .map_err(TransactionError::truncated("locking script length"))?;
        let script_len = usize::try_from(script_len.value()).unwrap_or(usize::MAX);
        let script_bytes = reader
            .read_bytes(script_len)
            .map_err(TransactionError::truncated("locking script"))?;

        Ok(Output {
            satoshis,
            locking_script: Script::from_bytes(script_bytes),
        })
    }

    /// Serialize this output into a `BtWriter`.
    pub fn write_to(&self, writer: &mut BtWriter) {
        writer.write_u64_le(self.satoshis);
        writer.write_var_bytes(self.locking_script.to_bytes());
    }

    /// Serialize this output to its wire bytes.
    ///
    /// This is also the form committed to by the signature hash.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BtWriter::with_capacity(self.size());
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Serialized length in bytes.
    pub fn size(&self) -> usize {
        8 + VarInt::from(self.locking_script.len()).length() + self.locking_script.len()
    }

    pub fn locking_script_hex(&self) -> String {
        self.locking_script.to_hex()
    }

    /// Whether the locking script is a data (`OP_RETURN`) script.
    pub fn is_data(&self) -> bool {
        self.locking_script.is_data()
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value:     {}\nscriptLen: {}\nscript:    {}",
            self.satoshis,
            self.locking_script.len(),
            self.locking_script.to_hex()
        )
    }
}
