//! Script element decoding and push-data encoding.
//!
//! A script element is either a bare opcode or a data push with its payload.
//! `ScriptElements` walks raw script bytes lazily and borrows payloads from
//! the underlying buffer; nothing is copied until the caller asks for it.

use std::fmt;

use crate::opcodes::*;
use crate::ScriptError;

/// A single decoded element of a script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptElement<'a> {
    /// A non-push opcode, including `OP_0` and the small-integer opcodes.
    Op(u8),
    /// A data push. `op` is the push opcode (`OP_DATA_N` or `OP_PUSHDATAn`).
    Push { op: u8, data: &'a [u8] },
}

impl<'a> ScriptElement<'a> {
    /// The opcode byte that introduced this element.
    pub fn op(&self) -> u8 {
        match self {
            ScriptElement::Op(op) => *op,
            ScriptElement::Push { op, .. } => *op,
        }
    }

    /// The pushed payload, if this element is a push.
    pub fn data(&self) -> Option<&'a [u8]> {
        match self {
            ScriptElement::Op(_) => None,
            ScriptElement::Push { data, .. } => Some(data),
        }
    }

    /// Number of bytes this element occupies in the script.
    pub fn encoded_len(&self) -> usize {
        match self {
            ScriptElement::Op(_) => 1,
            ScriptElement::Push { op, data } => {
                let prefix = match *op {
                    OP_PUSHDATA1 => 2,
                    OP_PUSHDATA2 => 3,
                    OP_PUSHDATA4 => 5,
                    _ => 1,
                };
                prefix + data.len()
            }
        }
    }
}

impl fmt::Display for ScriptElement<'_> {
    /// ASM form: pushes as lowercase hex, opcodes as their mnemonic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptElement::Op(op) => f.write_str(opcode_to_string(*op)),
            ScriptElement::Push { data, .. } if data.is_empty() => {
                f.write_str(opcode_to_string(OP_0))
            }
            ScriptElement::Push { data, .. } => f.write_str(&hex::encode(data)),
        }
    }
}

/// Lazy iterator over the elements of a script.
///
/// Yields `Err(ScriptError::TruncatedScript)` once if a push claims more
/// bytes than remain, then stops. Clone it before advancing to walk the
/// same script twice.
#[derive(Clone, Debug)]
pub struct ScriptElements<'a> {
    bytes: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> ScriptElements<'a> {
    /// Start decoding `bytes` from the beginning.
    pub fn new(bytes: &'a [u8]) -> Self {
        ScriptElements {
            bytes,
            pos: 0,
            failed: false,
        }
    }

    /// Byte offset of the next element.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn slice_at(&self, start: usize, len: usize) -> Result<&'a [u8], ScriptError> {
        let available = self.bytes.len().saturating_sub(start);
        if len > available {
            return Err(ScriptError::TruncatedScript {
                offset: self.pos,
                needed: len,
                available,
            });
        }
        Ok(&self.bytes[start..start + len])
    }

    fn decode_next(&mut self) -> Result<ScriptElement<'a>, ScriptError> {
        let op = self.bytes[self.pos];
        let (header, len) = match op {
            OP_DATA_1..=OP_DATA_75 => (1, op as usize),
            OP_PUSHDATA1 => (2, self.slice_at(self.pos + 1, 1)?[0] as usize),
            OP_PUSHDATA2 => {
                let b = self.slice_at(self.pos + 1, 2)?;
                (3, u16::from_le_bytes([b[0], b[1]]) as usize)
            }
            OP_PUSHDATA4 => {
                let b = self.slice_at(self.pos + 1, 4)?;
                (5, u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
            }
            _ => {
                self.pos += 1;
                return Ok(ScriptElement::Op(op));
            }
        };
        let data = self.slice_at(self.pos + header, len)?;
        self.pos += header + len;
        Ok(ScriptElement::Push { op, data })
    }
}

impl<'a> Iterator for ScriptElements<'a> {
    type Item = Result<ScriptElement<'a>, ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.bytes.len() {
            return None;
        }
        let result = self.decode_next();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

impl std::iter::FusedIterator for ScriptElements<'_> {}

/// Decode a whole script into its elements.
///
/// # Returns
/// Every element in order, or `TruncatedScript` at the first malformed push.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptElement<'_>>, ScriptError> {
    ScriptElements::new(bytes).collect()
}

/// Compute the minimal push prefix for a payload of `data_len` bytes.
///
/// # Returns
/// A direct length byte for up to 75 bytes, then `OP_PUSHDATA1`,
/// `OP_PUSHDATA2` or `OP_PUSHDATA4` with a little-endian length.
/// `PayloadTooLarge` above `u32::MAX`.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= OP_DATA_75 as usize {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xff {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xffff {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len as u64 <= 0xffff_ffff {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::PayloadTooLarge(data_len))
    }
}

/// Encode several payloads as consecutive minimal pushes.
pub fn encode_push_datas(parts: &[&[u8]]) -> Result<Vec<u8>, ScriptError> {
    let mut result = Vec::with_capacity(parts.iter().map(|p| p.len() + 5).sum());
    for part in parts {
        result.extend_from_slice(&push_data_prefix(part.len())?);
        result.extend_from_slice(part);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    //! Tests for element decoding and push data encoding.
    //!
    //! Covers simple, complex, and malformed inputs, push_data_prefix
    //! boundary sizes, and OP_PUSHDATA1/2/4 truncation cases.

    use super::*;

    // -----------------------------------------------------------------------
    // decoding - basic cases
    // -----------------------------------------------------------------------

    /// Decode a script with three simple push elements.
    #[test]
    fn test_decode_script_simple() {
        let bytes = hex::decode("05000102030401ff02abcd").expect("valid hex");
        let parts = decode_script(&bytes).expect("should decode");
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].data(), Some(&[0, 1, 2, 3, 4][..]));
        assert_eq!(parts[1].data(), Some(&[0xff][..]));
        assert_eq!(parts[2].data(), Some(&[0xab, 0xcd][..]));

        let data_parts: Vec<&[u8]> = parts.iter().filter_map(|p| p.data()).collect();
        let encoded = encode_push_datas(&data_parts).expect("should encode");
        assert_eq!(encoded, bytes);
    }

    #[test]
    fn test_decode_script_empty() {
        assert!(decode_script(&[]).expect("should decode").is_empty());
    }

    /// A 2-of-2 multisig with OP_PUSHDATA1 payloads decodes to five elements.
    #[test]
    fn test_decode_script_complex() {
        let script_hex = "524c53ff0488b21e000000000000000000362f7a9030543db8751401c387d6a71e870f1895b3a62569d455e8ee5f5f5e5f03036624c6df96984db6b4e625b6707c017eb0e0d137cd13a0c989bfa77a4473fd000000004c53ff0488b21e0000000000000000008b20425398995f3c866ea6ce5c1828a516b007379cf97b136bffbdc86f75df14036454bad23b019eae34f10aff8b8d6d8deb18cb31354e5a169ee09d8a4560e8250000000052ae";
        let bytes = hex::decode(script_hex).expect("valid hex");
        let parts = decode_script(&bytes).expect("should decode");
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], ScriptElement::Op(OP_2));
        assert_eq!(parts[1].op(), OP_PUSHDATA1);
        assert_eq!(parts[4], ScriptElement::Op(OP_CHECKMULTISIG));
        let total: usize = parts.iter().map(|p| p.encoded_len()).sum();
        assert_eq!(total, bytes.len());
    }

    /// OP_RETURN does not swallow the rest of the script.
    #[test]
    fn test_decode_op_return_continues() {
        let bytes = hex::decode("006a026869").expect("valid hex");
        let parts = decode_script(&bytes).expect("should decode");
        assert_eq!(
            parts,
            vec![
                ScriptElement::Op(OP_FALSE),
                ScriptElement::Op(OP_RETURN),
                ScriptElement::Push { op: OP_DATA_2, data: b"hi" },
            ]
        );
    }

    /// The iterator can be cloned and walked again from the same point.
    #[test]
    fn test_elements_restartable() {
        let bytes = hex::decode("76a90102").expect("valid hex");
        let iter = ScriptElements::new(&bytes);
        let first: Vec<_> = iter.clone().collect::<Result<_, _>>().expect("decode");
        let second: Vec<_> = iter.collect::<Result<_, _>>().expect("decode");
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    // -----------------------------------------------------------------------
    // decoding - error / truncation cases
    // -----------------------------------------------------------------------

    #[test]
    fn test_decode_script_truncated_cases() {
        let cases: Vec<&[u8]> = vec![
            // push 5 bytes, 3 follow
            &[0x05, 0x00, 0x00, 0x00],
            // OP_PUSHDATA1 claims 5, 3 follow
            &[OP_PUSHDATA1, 0x05, 0x00, 0x00, 0x00],
            &[OP_PUSHDATA1],
            &[OP_PUSHDATA2],
            // only one of two length bytes
            &[OP_PUSHDATA2, 0x11],
            &[OP_PUSHDATA4],
            &[OP_PUSHDATA4, 0x11, 0x00],
            &[OP_PUSHDATA4, 0xff, 0xff, 0xff, 0xff, 0x00],
        ];
        for bytes in cases {
            let err = decode_script(bytes).unwrap_err();
            assert!(
                matches!(err, ScriptError::TruncatedScript { .. }),
                "{:02x?}: {:?}",
                bytes,
                err
            );
        }
    }

    /// Elements before a malformed push are still yielded, then the error, then nothing.
    #[test]
    fn test_iterator_stops_after_error() {
        let bytes = [OP_DUP, OP_HASH160, 0x14, 0x01];
        let mut iter = ScriptElements::new(&bytes);
        assert_eq!(iter.next().unwrap().unwrap(), ScriptElement::Op(OP_DUP));
        assert_eq!(iter.next().unwrap().unwrap(), ScriptElement::Op(OP_HASH160));
        match iter.next() {
            Some(Err(ScriptError::TruncatedScript { offset, needed, available })) => {
                assert_eq!(offset, 2);
                assert_eq!(needed, 20);
                assert_eq!(available, 1);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_decode_pushdata1_valid() {
        let data = b"testing";
        let mut script_bytes = vec![OP_PUSHDATA1, data.len() as u8];
        script_bytes.extend_from_slice(data);
        let parts = decode_script(&script_bytes).expect("should decode");
        assert_eq!(parts, vec![ScriptElement::Push { op: OP_PUSHDATA1, data }]);
    }

    /// Every push width is sliced from the buffer and advances the cursor past it.
    #[test]
    fn test_elements_every_push_width() {
        let mut bytes = vec![0x02, 0xaa, 0xbb];
        bytes.extend_from_slice(&[OP_PUSHDATA1, 0x01, 0x11]);
        bytes.extend_from_slice(&[OP_PUSHDATA2, 0x02, 0x00, 0x22, 0x23]);
        bytes.extend_from_slice(&[OP_PUSHDATA4, 0x01, 0x00, 0x00, 0x00, 0x44]);
        bytes.push(OP_CHECKSIG);

        let mut iter = ScriptElements::new(&bytes);
        let mut positions = Vec::new();
        let mut parts = Vec::new();
        while let Some(element) = iter.next() {
            parts.push(element.expect("should decode"));
            positions.push(iter.position());
        }
        assert_eq!(
            parts,
            vec![
                ScriptElement::Push { op: OP_DATA_2, data: &[0xaa, 0xbb] },
                ScriptElement::Push { op: OP_PUSHDATA1, data: &[0x11] },
                ScriptElement::Push { op: OP_PUSHDATA2, data: &[0x22, 0x23] },
                ScriptElement::Push { op: OP_PUSHDATA4, data: &[0x44] },
                ScriptElement::Op(OP_CHECKSIG),
            ]
        );
        assert_eq!(positions, vec![3, 6, 11, 17, 18]);
        assert_eq!(bytes.len(), 18);
    }

    // -----------------------------------------------------------------------
    // push_data_prefix boundary tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_push_data_prefix_boundaries() {
        let cases: Vec<(usize, Vec<u8>)> = vec![
            (0, vec![0x00]),
            (20, vec![20]),
            (75, vec![75]),
            (76, vec![OP_PUSHDATA1, 76]),
            (255, vec![OP_PUSHDATA1, 255]),
            (256, vec![OP_PUSHDATA2, 0x00, 0x01]),
            (65535, vec![OP_PUSHDATA2, 0xff, 0xff]),
            (65536, vec![OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]),
        ];
        for (len, expected) in cases {
            assert_eq!(push_data_prefix(len).expect("should succeed"), expected, "len {}", len);
        }
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_push_data_prefix_too_large() {
        let err = push_data_prefix(0x1_0000_0000).unwrap_err();
        assert!(matches!(err, ScriptError::PayloadTooLarge(0x1_0000_0000)));
    }

    #[test]
    fn test_encode_push_datas_multiple() {
        let parts: Vec<&[u8]> = vec![b"hello", b"world"];
        let encoded = encode_push_datas(&parts).expect("should encode");
        assert_eq!(hex::encode(encoded), "0568656c6c6f05776f726c64");
        assert!(encode_push_datas(&[]).expect("should encode").is_empty());
    }

    #[test]
    fn test_element_asm_display() {
        let data = [0xab; 20];
        let push = ScriptElement::Push { op: OP_DATA_20, data: &data };
        assert_eq!(push.to_string(), "ab".repeat(20));
        assert_eq!(ScriptElement::Op(OP_DUP).to_string(), "OP_DUP");
        assert_eq!(ScriptElement::Op(OP_0).to_string(), "OP_FALSE");
    }
}
