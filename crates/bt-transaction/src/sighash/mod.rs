//! Signature hash computation for transaction signing.
//!
//! Computes the digest signed by ECDSA to authorize spending an input.
//! Flags carrying `FORKID` use the replay-protected algorithm that commits
//! to the spent value; flags without it use the original algorithm, which
//! serializes a modified copy of the transaction.
//!
//! See <https://github.com/bitcoin-sv/bitcoin-sv/blob/master/doc/abc/replay-protected-sighash.md#digest-algorithm>

use std::fmt;

use bt_primitives::hash::sha256d;
use bt_primitives::util::{BtWriter, VarInt};

use crate::output::Output;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Digest returned by the original algorithm for `SINGLE` when the input
/// has no output at the same index.
pub const SIGHASH_SINGLE_SENTINEL: [u8; 32] = {
    let mut h = [0u8; 32];
    h[0] = 0x01;
    h
};

/// Which parts of a transaction a signature commits to.
///
/// The low five bits select `ALL`, `NONE` or `SINGLE`; `ANYONECANPAY` and
/// `FORKID` are independent modifier bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SigHashFlag(pub u32);

impl SigHashFlag {
    /// Sign all inputs and all outputs.
    pub const ALL: SigHashFlag = SigHashFlag(0x01);
    /// Sign all inputs and no outputs.
    pub const NONE: SigHashFlag = SigHashFlag(0x02);
    /// Sign all inputs and only the output at the same index.
    pub const SINGLE: SigHashFlag = SigHashFlag(0x03);
    /// Sign only the current input.
    pub const ANYONECANPAY: SigHashFlag = SigHashFlag(0x80);
    /// Replay protection; selects the value-committing algorithm.
    pub const FORKID: SigHashFlag = SigHashFlag(0x40);
    /// Mask for the base type.
    pub const MASK: SigHashFlag = SigHashFlag(0x1f);
    /// The standard flag: `ALL | FORKID`.
    pub const ALL_FORKID: SigHashFlag = SigHashFlag(0x41);

    /// Whether every bit of `flag` is set.
    pub fn has(self, flag: SigHashFlag) -> bool {
        self.0 & flag.0 == flag.0
    }

    /// Whether the base type equals `flag`.
    pub fn has_with_mask(self, flag: SigHashFlag) -> bool {
        self.0 & Self::MASK.0 == flag.0
    }

    /// The raw flag value.
    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for SigHashFlag {
    fn default() -> Self {
        SigHashFlag::ALL_FORKID
    }
}

impl From<u32> for SigHashFlag {
    fn from(v: u32) -> Self {
        SigHashFlag(v)
    }
}

impl std::ops::BitOr for SigHashFlag {
    type Output = SigHashFlag;

    fn bitor(self, rhs: SigHashFlag) -> SigHashFlag {
        SigHashFlag(self.0 | rhs.0)
    }
}

impl fmt::Display for SigHashFlag {
    /// `ALL`, `NONE` or `SINGLE`, then `|FORKID`, then `|ANYONECANPAY`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = if self.has_with_mask(Self::NONE) {
            "NONE"
        } else if self.has_with_mask(Self::SINGLE) {
            "SINGLE"
        } else {
            "ALL"
        };
        f.write_str(base)?;
        if self.has(Self::FORKID) {
            f.write_str("|FORKID")?;
        }
        if self.has(Self::ANYONECANPAY) {
            f.write_str("|ANYONECANPAY")?;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------
// Replay-protected (FORKID) algorithm
// -----------------------------------------------------------------------

/// Compute the replay-protected preimage for an input, given the spent
/// output's locking script and value explicitly.
///
/// The preimage consists of:
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32 bytes) - sha256d of all outpoints unless ANYONECANPAY
/// 3. hashSequence (32 bytes) - sha256d of all sequences unless ANYONECANPAY/SINGLE/NONE
/// 4. outpoint (32+4 bytes) - txid + vout of the input being signed
/// 5. scriptCode (varint + script) - the locking script being satisfied
/// 6. value (8 bytes LE) - satoshis of the output being spent
/// 7. nSequence (4 bytes LE) - sequence of the input being signed
/// 8. hashOutputs (32 bytes) - sha256d of all outputs or one output
/// 9. nLocktime (4 bytes LE)
/// 10. sighashType (4 bytes LE)
pub fn calc_preimage(
    tx: &Transaction,
    input_index: usize,
    prev_output_script: &[u8],
    satoshis: u64,
    flag: SigHashFlag,
) -> Result<Vec<u8>, TransactionError> {
    let input = tx.input(input_index)?;
    let anyone_can_pay = flag.has(SigHashFlag::ANYONECANPAY);
    let single = flag.has_with_mask(SigHashFlag::SINGLE);
    let none = flag.has_with_mask(SigHashFlag::NONE);

    let hash_prevouts = if anyone_can_pay {
        [0u8; 32]
    } else {
        prevouts_hash(tx)
    };

    let hash_sequence = if anyone_can_pay || single || none {
        [0u8; 32]
    } else {
        sequence_hash(tx)
    };

    let hash_outputs = if !single && !none {
        outputs_hash(tx, None)
    } else if single && input_index < tx.outputs.len() {
        outputs_hash(tx, Some(input_index))
    } else {
        [0u8; 32]
    };

    let mut writer = BtWriter::with_capacity(156 + prev_output_script.len());
    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    writer.write_bytes(&input.previous_txid);
    writer.write_u32_le(input.previous_output_index);
    writer.write_var_bytes(prev_output_script);
    writer.write_u64_le(satoshis);
    writer.write_u32_le(input.sequence_number);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(flag.0);

    Ok(writer.into_bytes())
}

/// sha256d of every input's outpoint.
fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = BtWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        writer.write_bytes(&input.previous_txid);
        writer.write_u32_le(input.previous_output_index);
    }
    sha256d(writer.as_bytes())
}

/// sha256d of every input's sequence number.
fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = BtWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence_number);
    }
    sha256d(writer.as_bytes())
}

/// sha256d of all serialized outputs, or only the one at `only`.
fn outputs_hash(tx: &Transaction, only: Option<usize>) -> [u8; 32] {
    let mut writer = BtWriter::new();
    match only.and_then(|n| tx.outputs.get(n)) {
        Some(output) => output.write_to(&mut writer),
        None => {
            for output in &tx.outputs {
                output.write_to(&mut writer);
            }
        }
    }
    sha256d(writer.as_bytes())
}

impl Transaction {
    /// Replay-protected preimage for `input_index` using the previous
    /// output recorded on that input.
    ///
    /// # Returns
    /// `InputIndexOutOfRange`, or `MissingPreviousOutputData` if the
    /// input's previous output was never supplied.
    pub fn calc_input_preimage(
        &self,
        input_index: usize,
        flag: SigHashFlag,
    ) -> Result<Vec<u8>, TransactionError> {
        let prev = self.previous_output_for(input_index)?;
        calc_preimage(
            self,
            input_index,
            prev.locking_script.to_bytes(),
            prev.satoshis,
            flag,
        )
    }

    /// Preimage under the original (pre-fork) algorithm.
    ///
    /// A copy of the transaction is serialized with the spent locking
    /// script in the signed input's script slot and every other input's
    /// script empty, trimmed according to the base type:
    ///
    /// * `NONE` drops all outputs and zeroes the other inputs' sequences.
    /// * `SINGLE` keeps outputs up to the input's index, blanking earlier
    ///   ones to value `u64::MAX` with an empty script, and zeroes the other
    ///   inputs' sequences.
    /// * `ANYONECANPAY` keeps only the signed input.
    ///
    /// For `SINGLE` with no output at the input's index the 32-byte
    /// `SIGHASH_SINGLE_SENTINEL` is returned in place of a preimage.
    pub fn calc_input_preimage_legacy(
        &self,
        input_index: usize,
        flag: SigHashFlag,
    ) -> Result<Vec<u8>, TransactionError> {
        let prev = self.previous_output_for(input_index)?;

        let single = flag.has_with_mask(SigHashFlag::SINGLE);
        let none = flag.has_with_mask(SigHashFlag::NONE);

        if single && input_index >= self.outputs.len() {
            return Ok(SIGHASH_SINGLE_SENTINEL.to_vec());
        }

        let mut writer = BtWriter::with_capacity(256);
        writer.write_u32_le(self.version);

        let signed_inputs = if flag.has(SigHashFlag::ANYONECANPAY) {
            input_index..input_index + 1
        } else {
            0..self.inputs.len()
        };
        writer.write_varint(VarInt::from(signed_inputs.len()));
        for i in signed_inputs {
            let input = &self.inputs[i];
            let (script, sequence) = if i == input_index {
                (prev.locking_script.to_bytes(), input.sequence_number)
            } else if single || none {
                (&[][..], 0)
            } else {
                (&[][..], input.sequence_number)
            };
            writer.write_bytes(&input.previous_txid);
            writer.write_u32_le(input.previous_output_index);
            writer.write_var_bytes(script);
            writer.write_u32_le(sequence);
        }

        if none {
            writer.write_varint(VarInt::from(0usize));
        } else if single {
            writer.write_varint(VarInt::from(input_index + 1));
            for _ in 0..input_index {
                writer.write_u64_le(u64::MAX);
                writer.write_var_bytes(&[]);
            }
            self.outputs[input_index].write_to(&mut writer);
        } else {
            writer.write_varint(VarInt::from(self.outputs.len()));
            for output in &self.outputs {
                output.write_to(&mut writer);
            }
        }

        writer.write_u32_le(self.lock_time);
        writer.write_u32_le(flag.0);
        Ok(writer.into_bytes())
    }

    /// The digest a signer must sign for `input_index` under `flag`.
    ///
    /// Dispatches on `FORKID` between the replay-protected and original
    /// algorithms and double-hashes the preimage. The original algorithm's
    /// `SINGLE` sentinel is returned as-is.
    pub fn calc_input_signature_hash(
        &self,
        input_index: usize,
        flag: SigHashFlag,
    ) -> Result<[u8; 32], TransactionError> {
        let preimage = if flag.has(SigHashFlag::FORKID) {
            self.calc_input_preimage(input_index, flag)?
        } else {
            self.calc_input_preimage_legacy(input_index, flag)?
        };

        if preimage[..] == SIGHASH_SINGLE_SENTINEL[..] {
            return Ok(SIGHASH_SINGLE_SENTINEL);
        }
        Ok(sha256d(&preimage))
    }

    fn previous_output_for(&self, input_index: usize) -> Result<&Output, TransactionError> {
        self.input(input_index)?
            .previous_output()
            .ok_or(TransactionError::MissingPreviousOutputData(input_index))
    }
}
