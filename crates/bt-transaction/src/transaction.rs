//! Core transaction type.
//!
//! A transaction is a version, a list of inputs, a list of outputs and a
//! lock time. This module covers parsing and serialization, identity, and
//! the builder methods for appending inputs and outputs. Signature hashing,
//! fees, change and signing live in their own modules as further `impl`
//! blocks on `Transaction`.

use std::fmt;

use bt_primitives::hash::{hash160, sha256d};
use bt_primitives::util::{BtReader, BtWriter, VarInt};
use bt_script::opcodes::{OP_CHECKSIG, OP_DUP, OP_EQUALVERIFY, OP_FALSE, OP_HASH160, OP_RETURN};
use bt_script::Script;
use tracing::debug;

use crate::input::{Input, DEFAULT_SEQUENCE_NUMBER, MIN_INPUT_SIZE};
use crate::output::Output;
use crate::TransactionError;

/// Size of the smallest possible transaction: version, two one-byte
/// counts and the lock time.
pub const MIN_TX_SIZE: usize = 4 + 1 + 1 + 4;

/// Serialized size of an output with an empty locking script.
const MIN_OUTPUT_SIZE: usize = 8 + 1;

/// A transaction consisting of a version, inputs, outputs and a lock time.
///
/// # Wire format
///
/// | Field        | Size                      |
/// |--------------|---------------------------|
/// | version      | 4 bytes (LE)              |
/// | input count  | VarInt                    |
/// | inputs       | variable (per input)      |
/// | output count | VarInt                    |
/// | outputs      | variable (per output)     |
/// | lock_time    | 4 bytes (LE)              |
///
/// The transaction id is derived from the serialized bytes and never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,

    /// Ordered list of inputs.
    pub inputs: Vec<Input>,

    /// Ordered list of outputs.
    pub outputs: Vec<Output>,

    /// Block height or timestamp before which the transaction is not final.
    pub lock_time: u32,
}

impl Transaction {
    /// Create an empty transaction with version 1 and lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes.
    ///
    /// The slice must hold exactly one transaction.
    ///
    /// # Returns
    /// `TrailingBytes` if data remains after the lock time.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let (tx, consumed) = Self::from_stream(bytes)?;
        if consumed != bytes.len() {
            return Err(TransactionError::TrailingBytes(bytes.len() - consumed));
        }
        Ok(tx)
    }

    /// Parse the first transaction in `bytes` and report how many bytes it
    /// occupied.
    ///
    /// Repeated calls on the remainder parse transactions laid out
    /// back-to-back, as in a block.
    ///
    /// # Returns
    /// `(transaction, bytes_consumed)`, or `TxTooShort` if fewer than 10
    /// bytes are given.
    pub fn from_stream(bytes: &[u8]) -> Result<(Self, usize), TransactionError> {
        if bytes.len() < MIN_TX_SIZE {
            return Err(TransactionError::TxTooShort(bytes.len()));
        }

        let mut reader = BtReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        let consumed = reader.position();

        debug!(
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            consumed,
            "parsed transaction"
        );
        Ok((tx, consumed))
    }

    /// Deserialize a transaction from a `BtReader`.
    ///
    /// Nothing is returned unless every field parsed.
    pub fn read_from(reader: &mut BtReader) -> Result<Self, TransactionError> {
        let version = reader
            .read_u32_le()
            .map_err(TransactionError::truncated("version"))?;

        let input_count = reader
            .read_varint()
            .map_err(TransactionError::truncated("input count"))?
            .value();
        let mut inputs = Vec::with_capacity(capacity_hint(
            input_count,
            reader.remaining() / MIN_INPUT_SIZE,
        ));
        for _ in 0..input_count {
            inputs.push(Input::read_from(reader)?);
        }

        let output_count = reader
            .read_varint()
            .map_err(TransactionError::truncated("output count"))?
            .value();
        let mut outputs = Vec::with_capacity(capacity_hint(
            output_count,
            reader.remaining() / MIN_OUTPUT_SIZE,
        ));
        for _ in 0..output_count {
            outputs.push(Output::read_from(reader)?);
        }

        let lock_time = reader
            .read_u32_le()
            .map_err(TransactionError::truncated("lock time"))?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize this transaction to raw bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_bytes_with(|_, input, writer| input.write_to(writer))
    }

    /// Serialize this transaction to a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Serialize with every unlocking script cleared, except the input at
    /// `index` which carries `locking_script` instead.
    ///
    /// This is the transaction form committed to by the pre-fork signing
    /// algorithm.
    pub fn bytes_with_cleared_inputs(&self, index: usize, locking_script: &[u8]) -> Vec<u8> {
        self.to_bytes_with(|i, input, writer| {
            let script = if i == index { locking_script } else { &[] };
            input.write_with_script(writer, script);
        })
    }

    fn to_bytes_with<F>(&self, mut write_input: F) -> Vec<u8>
    where
        F: FnMut(usize, &Input, &mut BtWriter),
    {
        let mut writer = BtWriter::with_capacity(256);
        writer.write_u32_le(self.version);

        writer.write_varint(VarInt::from(self.inputs.len()));
        for (i, input) in self.inputs.iter().enumerate() {
            write_input(i, input, &mut writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }

        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    // -----------------------------------------------------------------
    // Identity and queries
    // -----------------------------------------------------------------

    /// Double SHA-256 of the serialized bytes, in protocol byte order.
    pub fn tx_id(&self) -> [u8; 32] {
        sha256d(&self.to_bytes())
    }

    /// The transaction id as conventionally displayed (byte-reversed hex).
    pub fn tx_id_hex(&self) -> String {
        let mut id = self.tx_id();
        id.reverse();
        hex::encode(id)
    }

    /// A coinbase transaction has a single input with an all-zero previous
    /// txid and either the output index or the sequence set to `0xFFFFFFFF`.
    pub fn is_coinbase(&self) -> bool {
        match self.inputs.as_slice() {
            [input] => {
                input.previous_txid == [0u8; 32]
                    && (input.previous_output_index == DEFAULT_SEQUENCE_NUMBER
                        || input.sequence_number == DEFAULT_SEQUENCE_NUMBER)
            }
            _ => false,
        }
    }

    /// Whether any output carries an `OP_RETURN` data script.
    pub fn has_data_outputs(&self) -> bool {
        self.outputs.iter().any(Output::is_data)
    }

    /// Number of inputs.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of outputs.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// The input at `index`.
    pub fn input(&self, index: usize) -> Result<&Input, TransactionError> {
        self.inputs
            .get(index)
            .ok_or(TransactionError::InputIndexOutOfRange {
                index,
                count: self.inputs.len(),
            })
    }

    /// The input at `index`, mutably.
    pub fn input_mut(&mut self, index: usize) -> Result<&mut Input, TransactionError> {
        let count = self.inputs.len();
        self.inputs
            .get_mut(index)
            .ok_or(TransactionError::InputIndexOutOfRange { index, count })
    }

    /// The output at `index`.
    pub fn output(&self, index: usize) -> Result<&Output, TransactionError> {
        self.outputs
            .get(index)
            .ok_or(TransactionError::OutputIndexOutOfRange {
                index,
                count: self.outputs.len(),
            })
    }

    /// Sum of the previous output values of every input.
    ///
    /// # Returns
    /// `MissingPreviousOutputData` naming the first input whose previous
    /// output was never supplied.
    pub fn total_input_satoshis(&self) -> Result<u64, TransactionError> {
        self.inputs.iter().enumerate().try_fold(0u64, |total, (i, input)| {
            input
                .previous_satoshis()
                .map(|sats| total.saturating_add(sats))
                .ok_or(TransactionError::MissingPreviousOutputData(i))
        })
    }

    /// Sum of all output values.
    pub fn total_output_satoshis(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |total, o| total.saturating_add(o.satoshis))
    }

    // -----------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------

    /// Append an input.
    pub fn add_input(&mut self, input: Input) {
        self.inputs.push(input);
    }

    /// Append an unsigned input spending a known previous output.
    ///
    /// # Arguments
    /// * `prev_tx_id` - Previous txid in display (byte-reversed) hex.
    /// * `vout` - Index of the output being spent.
    /// * `prev_locking_script_hex` - Hex locking script of that output.
    /// * `satoshis` - Value of that output.
    ///
    /// The transaction is unchanged on error.
    pub fn add_input_from(
        &mut self,
        prev_tx_id: &str,
        vout: u32,
        prev_locking_script_hex: &str,
        satoshis: u64,
    ) -> Result<(), TransactionError> {
        let mut input = Input::from_txid_hex(prev_tx_id, vout)?;
        let locking_script = Script::from_hex(prev_locking_script_hex)?;
        input.set_previous_output(Some(Output::new(satoshis, locking_script)));
        self.inputs.push(input);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Outputs
    // -----------------------------------------------------------------

    /// Append an output.
    pub fn add_output(&mut self, output: Output) {
        self.outputs.push(output);
    }

    /// Append a P2PKH output paying `satoshis` to a Base58Check address.
    pub fn pay_to_address(&mut self, address: &str, satoshis: u64) -> Result<(), TransactionError> {
        let script = Script::p2pkh_from_address(address)?;
        self.outputs.push(Output::new(satoshis, script));
        Ok(())
    }

    /// Append a P2PKH output paying `satoshis` to a public key hash.
    pub fn add_p2pkh_output_from_pub_key_hash(&mut self, pub_key_hash: &[u8; 20], satoshis: u64) {
        self.outputs.push(Output::new(
            satoshis,
            Script::p2pkh_from_pub_key_hash(pub_key_hash),
        ));
    }

    /// Append a zero-value `OP_FALSE OP_RETURN <data>` output.
    pub fn add_data_output(&mut self, data: &[u8]) -> Result<(), TransactionError> {
        self.add_data_parts_output(&[data])
    }

    /// Append a zero-value `OP_FALSE OP_RETURN` output with one push per part.
    pub fn add_data_parts_output(&mut self, parts: &[&[u8]]) -> Result<(), TransactionError> {
        let mut script = Script::from_bytes(&[OP_FALSE, OP_RETURN]);
        script.append_push_data_array(parts)?;
        self.outputs.push(Output::new(0, script));
        Ok(())
    }

    /// Append an output spendable by whoever knows `secret` and holds the
    /// key for `pub_key_hash`:
    ///
    /// `OP_HASH160 <hash160(secret)> OP_EQUALVERIFY OP_DUP OP_HASH160 <pkh> OP_EQUALVERIFY OP_CHECKSIG`
    pub fn add_hash_puzzle_output(
        &mut self,
        secret: &[u8],
        pub_key_hash: &[u8; 20],
        satoshis: u64,
    ) -> Result<(), TransactionError> {
        let mut script = Script::new();
        script.append_opcodes(&[OP_HASH160])?;
        script.append_push_data(&hash160(secret))?;
        script.append_opcodes(&[OP_EQUALVERIFY, OP_DUP, OP_HASH160])?;
        script.append_push_data(pub_key_hash)?;
        script.append_opcodes(&[OP_EQUALVERIFY, OP_CHECKSIG])?;
        self.outputs.push(Output::new(satoshis, script));
        Ok(())
    }
}

/// Pre-allocation for a declared element count, bounded by what the
/// remaining bytes could possibly hold.
fn capacity_hint(declared: u64, max_fit: usize) -> usize {
    usize::try_from(declared).map_or(max_fit, |n| n.min(max_fit))
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Transaction {
    /// Hex of the serialized transaction.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
