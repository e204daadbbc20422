//! Binary serialization helpers.
//!
//! Provides the protocol's variable-length integer (`VarInt`) and the
//! `BtReader` / `BtWriter` cursors used by the script and transaction
//! codecs. Every read is bounds-checked; running off the end of the
//! buffer yields `PrimitivesError::TruncatedInput` instead of a panic.

use crate::PrimitivesError;

// ---------------------------------------------------------------------------
// VarInt
// ---------------------------------------------------------------------------

/// A protocol variable-length unsigned integer.
///
/// Used for input/output counts and script lengths. The encoding is 1, 3,
/// 5, or 9 bytes depending on magnitude, little-endian after the prefix:
///
/// | Value range              | Encoding            |
/// |--------------------------|---------------------|
/// | `< 0xfd`                 | 1 byte              |
/// | `< 0x10000`              | `0xfd` + 2 bytes    |
/// | `< 0x100000000`          | `0xfe` + 4 bytes    |
/// | otherwise                | `0xff` + 8 bytes    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarInt(pub u64);

impl VarInt {
    /// Decode a VarInt from the start of a byte slice.
    ///
    /// # Arguments
    /// * `data` - Byte slice starting with a VarInt encoding. Trailing bytes are ignored.
    ///
    /// # Returns
    /// The decoded value and the number of bytes consumed, or
    /// `PrimitivesError::TruncatedInput` if the prefix announces more bytes
    /// than are available.
    pub fn decode(data: &[u8]) -> Result<(Self, usize), PrimitivesError> {
        let mut reader = BtReader::new(data);
        let value = reader.read_varint()?;
        Ok((value, reader.position()))
    }

    /// Return the wire-format byte length of this VarInt.
    pub fn length(&self) -> usize {
        if self.0 < 0xfd {
            1
        } else if self.0 < 0x10000 {
            3
        } else if self.0 < 0x1_0000_0000 {
            5
        } else {
            9
        }
    }

    /// Encode the VarInt into its minimal byte form (at most 9 bytes).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.length()];
        self.put_bytes(&mut buf);
        buf
    }

    /// Write the VarInt into a destination buffer.
    ///
    /// The buffer must be at least `self.length()` bytes long.
    ///
    /// # Returns
    /// The number of bytes written.
    pub fn put_bytes(&self, dst: &mut [u8]) -> usize {
        let v = self.0;
        if v < 0xfd {
            dst[0] = v as u8;
            1
        } else if v < 0x10000 {
            dst[0] = 0xfd;
            dst[1..3].copy_from_slice(&(v as u16).to_le_bytes());
            3
        } else if v < 0x1_0000_0000 {
            dst[0] = 0xfe;
            dst[1..5].copy_from_slice(&(v as u32).to_le_bytes());
            5
        } else {
            dst[0] = 0xff;
            dst[1..9].copy_from_slice(&v.to_le_bytes());
            9
        }
    }

    /// Report how many extra bytes the encoding grows by if this value is
    /// incremented by one.
    ///
    /// # Returns
    /// 0 inside a size class, 2 at 252 and 65535, 4 at 4294967295, and -1 at
    /// `u64::MAX` where the value cannot be incremented at all.
    pub fn upper_limit_inc(&self) -> i32 {
        match self.0 {
            252 | 65535 => 2,
            4_294_967_295 => 4,
            u64::MAX => -1,
            _ => 0,
        }
    }

    /// Return the underlying u64 value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for VarInt {
    fn from(v: u64) -> Self {
        VarInt(v)
    }
}

impl From<usize> for VarInt {
    fn from(v: usize) -> Self {
        VarInt(v as u64)
    }
}

// ---------------------------------------------------------------------------
// BtReader
// ---------------------------------------------------------------------------

/// A cursor over protocol-encoded bytes.
///
/// Reads borrow from the underlying slice; nothing is copied until the
/// caller decides to own the data.
#[derive(Debug, Clone)]
pub struct BtReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BtReader<'a> {
    /// Create a new reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        BtReader { data, pos: 0 }
    }

    /// Read `n` bytes and advance the position.
    ///
    /// # Returns
    /// A borrowed slice of length `n`, or `TruncatedInput` if fewer than
    /// `n` bytes remain. The position is unchanged on error.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], PrimitivesError> {
        if n > self.remaining() {
            return Err(PrimitivesError::TruncatedInput {
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a fixed-size array and advance the position.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PrimitivesError> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, PrimitivesError> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    /// Read a little-endian u16.
    pub fn read_u16_le(&mut self) -> Result<u16, PrimitivesError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian u32.
    pub fn read_u32_le(&mut self) -> Result<u32, PrimitivesError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian u64.
    pub fn read_u64_le(&mut self) -> Result<u64, PrimitivesError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a VarInt and advance the position past its full encoding.
    ///
    /// On a truncated encoding the error reports how many bytes the prefix
    /// announced. The position is restored so the caller can report the
    /// offset of the bad prefix.
    pub fn read_varint(&mut self) -> Result<VarInt, PrimitivesError> {
        let start = self.pos;
        let first = self.read_u8()?;
        let result = match first {
            0xff => self.read_u64_le().map(VarInt),
            0xfe => self.read_u32_le().map(|v| VarInt(v as u64)),
            0xfd => self.read_u16_le().map(|v| VarInt(v as u64)),
            b => Ok(VarInt(b as u64)),
        };
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    /// Return the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Return the number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }
}

// ---------------------------------------------------------------------------
// BtWriter
// ---------------------------------------------------------------------------

/// An append-only buffer for protocol-encoded bytes.
#[derive(Debug, Clone, Default)]
pub struct BtWriter {
    buf: Vec<u8>,
}

impl BtWriter {
    /// Create a new empty writer.
    pub fn new() -> Self {
        BtWriter { buf: Vec::new() }
    }

    /// Create a new writer with a pre-allocated capacity.
    ///
    /// # Arguments
    /// * `capacity` - Initial byte capacity of the internal buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        BtWriter {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a single byte.
    pub fn write_u8(&mut self, val: u8) {
        self.buf.push(val);
    }

    /// Append a little-endian u16.
    pub fn write_u16_le(&mut self, val: u16) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    /// Append a little-endian u32.
    pub fn write_u32_le(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    /// Append a little-endian u64.
    pub fn write_u64_le(&mut self, val: u64) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    /// Append a VarInt in its minimal encoding.
    pub fn write_varint(&mut self, varint: VarInt) {
        let mut tmp = [0u8; 9];
        let n = varint.put_bytes(&mut tmp);
        self.buf.extend_from_slice(&tmp[..n]);
    }

    /// Append a VarInt length prefix followed by the bytes themselves.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_varint(VarInt::from(bytes.len()));
        self.buf.extend_from_slice(bytes);
    }

    /// Consume the writer and return the accumulated bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Borrow the bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
