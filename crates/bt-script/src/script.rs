//! The `Script` byte-vector newtype.
//!
//! A script is an owned byte buffer used both as an output's locking script
//! and as an input's unlocking script. Construction goes through the
//! push-data codec in [`crate::chunk`], so every push written here is
//! minimally encoded. Pattern recognisers never propagate decode errors; a
//! malformed script simply does not match.

use std::fmt;

use bt_primitives::ec::PublicKey;

use crate::address::Address;
use crate::chunk::{push_data_prefix, ScriptElement, ScriptElements};
use crate::opcodes::*;
use crate::ScriptError;

/// Length of a standard P2PKH locking script.
pub const P2PKH_SCRIPT_LEN: usize = 25;

/// Length of a standard P2SH locking script.
pub const P2SH_SCRIPT_LEN: usize = 23;

/// Broad classification of a locking script.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    /// Zero-length script.
    Empty,
    /// `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`.
    PubKeyHash,
    /// `<pubkey> OP_CHECKSIG`.
    PubKey,
    /// Bare `m <pubkeys...> n OP_CHECKMULTISIG`.
    MultiSig,
    /// `OP_RETURN ...` or `OP_FALSE OP_RETURN ...`.
    NullData,
    /// Anything else.
    NonStandard,
}

impl ScriptType {
    /// Conventional lowercase name of the script type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::Empty => "empty",
            ScriptType::PubKeyHash => "pubkeyhash",
            ScriptType::PubKey => "pubkey",
            ScriptType::MultiSig => "multisig",
            ScriptType::NullData => "nulldata",
            ScriptType::NonStandard => "nonstandard",
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Bitcoin script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or `InvalidHex`.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        Ok(Script(hex::decode(hex_str)?))
    }

    /// Create a script from a copy of raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script from its ASM form.
    ///
    /// Tokens are separated by single spaces. A token naming an opcode
    /// (including the aliases `OP_0`, `OP_1` and friends) is emitted as that
    /// opcode; any other token must be hex and becomes a minimal push.
    ///
    /// # Returns
    /// The assembled script. `InvalidOpcodeData` for a token that is neither
    /// an opcode nor hex, `InvalidOpcodeType` for a bare push opcode name.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        if asm.is_empty() {
            return Ok(script);
        }
        for token in asm.split(' ') {
            match string_to_opcode(token) {
                Some(op) => script.append_opcodes(&[op])?,
                None => {
                    let data = hex::decode(token)
                        .map_err(|_| ScriptError::InvalidOpcodeData(token.to_string()))?;
                    script.append_push_data(&data)?;
                }
            }
        }
        Ok(script)
    }

    /// Build a P2PKH locking script paying to a 20-byte public key hash.
    pub fn p2pkh_from_pub_key_hash(pub_key_hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(P2PKH_SCRIPT_LEN);
        bytes.push(OP_DUP);
        bytes.push(OP_HASH160);
        bytes.push(OP_DATA_20);
        bytes.extend_from_slice(pub_key_hash);
        bytes.push(OP_EQUALVERIFY);
        bytes.push(OP_CHECKSIG);
        Script(bytes)
    }

    /// Build a P2PKH locking script for a public key.
    ///
    /// The hash covers the key in the form it was parsed from, so an
    /// uncompressed key locks to a different script than its compressed twin.
    pub fn p2pkh_from_pub_key(pub_key: &PublicKey) -> Self {
        Self::p2pkh_from_pub_key_hash(&pub_key.hash160())
    }

    /// Build a P2PKH locking script from a Base58Check address string.
    ///
    /// # Returns
    /// The locking script, or the address decoding error.
    pub fn p2pkh_from_address(addr: &str) -> Result<Self, ScriptError> {
        Ok(Address::from_string(addr)?.locking_script())
    }

    /// Build a P2PKH unlocking script: `<der_sig || sighash_flag> <pub_key>`.
    ///
    /// # Arguments
    /// * `pub_key` - SEC1 public key bytes as they should appear on chain.
    /// * `der_sig` - DER-encoded ECDSA signature without the flag byte.
    /// * `sighash_flag` - Low byte of the sighash flag the digest was built with.
    pub fn p2pkh_unlocking_script(
        pub_key: &[u8],
        der_sig: &[u8],
        sighash_flag: u8,
    ) -> Result<Self, ScriptError> {
        let mut sig_buf = Vec::with_capacity(der_sig.len() + 1);
        sig_buf.extend_from_slice(der_sig);
        sig_buf.push(sighash_flag);

        let mut script = Script(Vec::with_capacity(sig_buf.len() + pub_key.len() + 2));
        script.append_push_data(&sig_buf)?;
        script.append_push_data(pub_key)?;
        Ok(script)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Encode the script as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Render the script in ASM form.
    ///
    /// Opcodes appear by their canonical name and pushes as hex; an empty
    /// push renders as `OP_FALSE`. If a push runs past the end of the script
    /// the decodable prefix is rendered followed by `[error]`.
    pub fn to_asm(&self) -> String {
        let mut tokens = Vec::new();
        for element in self.elements() {
            match element {
                Ok(el) => tokens.push(el.to_string()),
                Err(_) => tokens.push("[error]".to_string()),
            }
        }
        tokens.join(" ")
    }

    /// Borrow the underlying bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the script, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Length of the script in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the script has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // -----------------------------------------------------------------------
    // Decoding
    // -----------------------------------------------------------------------

    /// Lazily iterate over the elements of this script.
    ///
    /// The iterator borrows push payloads from the script and may be cloned
    /// to walk the script again.
    pub fn elements(&self) -> ScriptElements<'_> {
        ScriptElements::new(&self.0)
    }

    /// Decode every element of the script.
    ///
    /// # Returns
    /// The elements in order, or `TruncatedScript` at the first malformed push.
    pub fn chunks(&self) -> Result<Vec<ScriptElement<'_>>, ScriptError> {
        self.elements().collect()
    }

    // -----------------------------------------------------------------------
    // Script classification
    // -----------------------------------------------------------------------

    /// Check for `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == P2PKH_SCRIPT_LEN
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Check for `<pubkey> OP_CHECKSIG`.
    ///
    /// The key must be 33 bytes with an `02`/`03` prefix or 65 bytes with an
    /// `04`/`06`/`07` prefix.
    pub fn is_p2pk(&self) -> bool {
        let parts = match self.chunks() {
            Ok(p) => p,
            Err(_) => return false,
        };
        if parts.len() != 2 || parts[1] != ScriptElement::Op(OP_CHECKSIG) {
            return false;
        }
        match parts[0].data() {
            Some(key) if key.len() == 65 => matches!(key[0], 0x04 | 0x06 | 0x07),
            Some(key) if key.len() == 33 => matches!(key[0], 0x02 | 0x03),
            _ => false,
        }
    }

    /// Check for `OP_HASH160 <20 bytes> OP_EQUAL`.
    pub fn is_p2sh(&self) -> bool {
        let b = &self.0;
        b.len() == P2SH_SCRIPT_LEN && b[0] == OP_HASH160 && b[1] == OP_DATA_20 && b[22] == OP_EQUAL
    }

    /// Check whether the script starts with `OP_RETURN` or `OP_FALSE OP_RETURN`.
    pub fn is_data(&self) -> bool {
        let b = &self.0;
        b.first() == Some(&OP_RETURN) || (b.len() > 1 && b[0] == OP_FALSE && b[1] == OP_RETURN)
    }

    /// Check for a bare multisig output.
    ///
    /// Pattern: `<small int> <non-empty push>... <small int> OP_CHECKMULTISIG`.
    pub fn is_multisig_out(&self) -> bool {
        let parts = match self.chunks() {
            Ok(p) => p,
            Err(_) => return false,
        };
        let n = parts.len();
        if n < 3 || !is_small_int_op(parts[0].op()) {
            return false;
        }
        let keys_are_pushes = parts[1..n - 2]
            .iter()
            .all(|el| matches!(el.data(), Some(d) if !d.is_empty()));
        keys_are_pushes
            && is_small_int_op(parts[n - 2].op())
            && parts[n - 1] == ScriptElement::Op(OP_CHECKMULTISIG)
    }

    /// Classify the script.
    ///
    /// Checks run in a fixed order (empty, P2PKH, P2PK, multisig, data), so a
    /// script matching several patterns gets the first.
    pub fn script_type(&self) -> ScriptType {
        if self.is_empty() {
            ScriptType::Empty
        } else if self.is_p2pkh() {
            ScriptType::PubKeyHash
        } else if self.is_p2pk() {
            ScriptType::PubKey
        } else if self.is_multisig_out() {
            ScriptType::MultiSig
        } else if self.is_data() {
            ScriptType::NullData
        } else {
            ScriptType::NonStandard
        }
    }

    // -----------------------------------------------------------------------
    // Data extraction
    // -----------------------------------------------------------------------

    /// Extract the public key hash from a script starting `OP_DUP OP_HASH160`.
    ///
    /// # Returns
    /// The payload of the push following `OP_HASH160`. `EmptyScript` for an
    /// empty script, `NotP2PKH` if the prefix is missing or no push follows,
    /// `TruncatedScript` if that push is malformed.
    pub fn public_key_hash(&self) -> Result<&[u8], ScriptError> {
        if self.0.is_empty() {
            return Err(ScriptError::EmptyScript);
        }
        if self.0.len() <= 2 || self.0[0] != OP_DUP || self.0[1] != OP_HASH160 {
            return Err(ScriptError::NotP2PKH);
        }
        match ScriptElements::new(&self.0[2..]).next() {
            Some(el) => el?.data().ok_or(ScriptError::NotP2PKH),
            None => Err(ScriptError::NotP2PKH),
        }
    }

    // -----------------------------------------------------------------------
    // Mutation / building
    // -----------------------------------------------------------------------

    /// Append `data` as a single minimally-encoded push.
    ///
    /// # Returns
    /// `PayloadTooLarge` if `data` exceeds `u32::MAX` bytes.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.reserve(prefix.len() + data.len());
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Decode `hex_str` and append it as a single push.
    pub fn append_push_data_hex(&mut self, hex_str: &str) -> Result<(), ScriptError> {
        let data = hex::decode(hex_str)?;
        self.append_push_data(&data)
    }

    /// Append each part as its own push, in order.
    ///
    /// Nothing is appended if any part is too large.
    pub fn append_push_data_array(&mut self, parts: &[&[u8]]) -> Result<(), ScriptError> {
        let encoded = crate::chunk::encode_push_datas(parts)?;
        self.0.extend_from_slice(&encoded);
        Ok(())
    }

    /// Append bare opcodes.
    ///
    /// # Returns
    /// `InvalidOpcodeType` if any opcode is a push opcode
    /// (`OP_DATA_1..=OP_PUSHDATA4`); nothing is appended in that case.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        if let Some(&op) = opcodes.iter().find(|&&op| is_push_op(op)) {
            return Err(ScriptError::InvalidOpcodeType(opcode_to_string(op).to_string()));
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    /// Check if this script is byte-equal to another script.
    pub fn equals(&self, other: &Script) -> bool {
        self.0 == other.0
    }
}

/// Smallest number of script bytes needed to push `data`.
///
/// Empty data and single bytes that have a dedicated opcode (`0..=16` and
/// `0x81`) cost one byte. Returns 0 if the data cannot be pushed at all.
pub fn min_push_size(data: &[u8]) -> usize {
    let l = data.len();
    if l as u64 > 0xffff_ffff {
        return 0;
    }
    match l {
        0 => 1,
        1 if data[0] <= 16 || data[0] == 0x81 => 1,
        1 => 2,
        _ if l <= OP_DATA_75 as usize => l + 1,
        _ if l <= 0xff => l + 2,
        _ if l <= 0xffff => l + 3,
        _ => l + 5,
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    //! Tests for the Script type.
    //!
    //! Covers hex and ASM construction, classification of the common
    //! locking-script shapes, public key hash extraction, push building and
    //! the P2PKH builders.

    use super::*;

    const P2PKH_HEX: &str = "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac";

    // -----------------------------------------------------------------------
    // Construction & roundtrip tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_from_hex_roundtrip() {
        let script = Script::from_hex(P2PKH_HEX).expect("valid hex should parse");
        assert_eq!(script.to_hex(), P2PKH_HEX);
        assert_eq!(script.len(), P2PKH_SCRIPT_LEN);
    }

    #[test]
    fn test_from_hex_empty_and_invalid() {
        let script = Script::from_hex("").expect("empty hex should parse");
        assert!(script.is_empty());
        assert!(matches!(Script::from_hex("ZZZZ"), Err(ScriptError::InvalidHex(_))));
    }

    #[test]
    fn test_to_asm_p2pkh() {
        let script = Script::from_hex(P2PKH_HEX).expect("valid hex should parse");
        assert_eq!(
            script.to_asm(),
            "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG"
        );
    }

    /// Canonical names are used for values that have aliases.
    #[test]
    fn test_to_asm_canonical_names() {
        let script = Script::from_bytes(&[OP_0, OP_RETURN, OP_1, OP_2, OP_16, OP_RESERVED]);
        assert_eq!(script.to_asm(), "OP_FALSE OP_RETURN OP_TRUE OP_2 OP_16 OP_BASE");
        assert_eq!(Script::new().to_asm(), "");
    }

    /// A push that runs off the end renders the prefix followed by [error].
    #[test]
    fn test_to_asm_truncated() {
        let script = Script::from_hex("76a914e2a623").expect("valid hex");
        assert_eq!(script.to_asm(), "OP_DUP OP_HASH160 [error]");
    }

    #[test]
    fn test_from_asm_p2pkh() {
        let asm = "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG";
        let script = Script::from_asm(asm).expect("valid ASM should parse");
        assert_eq!(script.to_hex(), P2PKH_HEX);
        assert_eq!(script.to_asm(), asm);
    }

    #[test]
    fn test_from_asm_aliases_and_errors() {
        let script = Script::from_asm("OP_0 OP_1 OP_ZERO OP_ONE").expect("aliases parse");
        assert_eq!(script.to_hex(), "00510051");

        assert!(Script::from_asm("").expect("empty parses").is_empty());
        assert!(matches!(
            Script::from_asm("OP_DUP OP_NOTREAL"),
            Err(ScriptError::InvalidOpcodeData(_))
        ));
        assert!(matches!(Script::from_asm("abc"), Err(ScriptError::InvalidOpcodeData(_))));
        assert!(matches!(
            Script::from_asm("OP_PUSHDATA1"),
            Err(ScriptError::InvalidOpcodeType(_))
        ));
    }

    /// Large pushes in ASM are re-encoded with the minimal PUSHDATA opcode.
    #[test]
    fn test_asm_roundtrip_pushdata() {
        let mut script = Script::from_bytes(&[OP_FALSE, OP_RETURN]);
        script.append_push_data(&[0xcd; 300]).expect("push");
        let reparsed = Script::from_asm(&script.to_asm()).expect("parse");
        assert_eq!(reparsed, script);
    }

    // -----------------------------------------------------------------------
    // Script classification tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_p2pkh_vector() {
        let script =
            Script::from_hex("76a9148be87b3978d8ef936b30ddd4ed903f8da7abd27788ac").expect("hex");
        assert!(script.is_p2pkh());
        assert_eq!(script.script_type(), ScriptType::PubKeyHash);
        assert_eq!(
            hex::encode(script.public_key_hash().expect("pkh")),
            "8be87b3978d8ef936b30ddd4ed903f8da7abd277"
        );
    }

    #[test]
    fn test_is_p2pkh_rejects_near_misses() {
        let good = hex::decode(P2PKH_HEX).expect("hex");
        assert!(!Script::from_bytes(&good[..24]).is_p2pkh());
        let mut extra = good.clone();
        extra.push(OP_NOP);
        assert!(!Script::from_bytes(&extra).is_p2pkh());
        let mut wrong_op = good;
        wrong_op[24] = OP_CHECKSIGVERIFY;
        assert!(!Script::from_bytes(&wrong_op).is_p2pkh());
    }

    #[test]
    fn test_is_p2pk() {
        let compressed = Script::from_hex(
            "2102f0d97c290e79bf2a8660c406aa56b6f189ff79f2245cc5aff82808b58131b4d5ac",
        )
        .expect("valid hex");
        assert!(compressed.is_p2pk());
        assert_eq!(compressed.script_type(), ScriptType::PubKey);

        let uncompressed = Script::from_hex(
            "410411db93e1dcdb8a016b49840f8c53bc1eb68a382e97b1482ecad7b148a6909a5cb2e0eaddfb84ccf9744464f82e160bfa9b8b64f9d4c03f999b8643f656b412a3ac",
        )
        .expect("valid hex");
        assert!(uncompressed.is_p2pk());

        let bad_prefix = Script::from_hex(
            "2105f0d97c290e79bf2a8660c406aa56b6f189ff79f2245cc5aff82808b58131b4d5ac",
        )
        .expect("valid hex");
        assert!(!bad_prefix.is_p2pk());
        assert!(!Script::from_hex(P2PKH_HEX).expect("hex").is_p2pk());
    }

    #[test]
    fn test_is_p2sh() {
        let script = Script::from_hex("a9149de5aeaff9c48431ba4dd6e8af73d51f38e451cb87")
            .expect("valid hex");
        assert!(script.is_p2sh());
        assert!(!script.is_p2pkh());
        assert_eq!(script.script_type(), ScriptType::NonStandard);
        assert!(!Script::from_hex(P2PKH_HEX).expect("hex").is_p2sh());
    }

    #[test]
    fn test_is_data() {
        let safe = Script::from_hex(
            "006a04ac1eed884d53027b2276657273696f6e223a22302e31222c22686569676874223a3634323436307d",
        )
        .expect("valid hex");
        assert!(safe.is_data());
        assert_eq!(safe.script_type(), ScriptType::NullData);

        let bare = Script::from_bytes(&[OP_RETURN, 0x04, 0x01, 0x02, 0x03, 0x04]);
        assert!(bare.is_data());

        // only the leading bytes are inspected
        assert!(Script::from_bytes(&[OP_RETURN, OP_PUSHDATA4]).is_data());
        assert!(!Script::from_bytes(&[OP_FALSE]).is_data());
        assert!(!Script::from_hex(P2PKH_HEX).expect("hex").is_data());
    }

    #[test]
    fn test_is_multisig_out() {
        // OP_2 <11> <22> <33> OP_3 OP_CHECKMULTISIG
        let script = Script::from_hex("5201110122013353ae").expect("valid hex");
        assert!(script.is_multisig_out());
        assert_eq!(script.script_type(), ScriptType::MultiSig);

        // a bare opcode among the keys
        assert!(!Script::from_hex("52011176013353ae").expect("hex").is_multisig_out());
        // not enough elements
        assert!(!Script::from_hex("52ae").expect("hex").is_multisig_out());
        // truncated key push
        assert!(!Script::from_hex("52051153ae").expect("hex").is_multisig_out());
        assert!(!Script::from_hex(P2PKH_HEX).expect("hex").is_multisig_out());
    }

    #[test]
    fn test_script_type_names() {
        assert_eq!(Script::new().script_type(), ScriptType::Empty);
        assert_eq!(Script::from_bytes(&[OP_NOP]).script_type().to_string(), "nonstandard");
        assert_eq!(ScriptType::PubKeyHash.as_str(), "pubkeyhash");
        assert_eq!(
            serde_json::to_string(&ScriptType::NullData).expect("serialize"),
            r#""nulldata""#
        );
    }

    // -----------------------------------------------------------------------
    // Public key hash extraction
    // -----------------------------------------------------------------------

    #[test]
    fn test_public_key_hash_errors() {
        assert!(matches!(Script::new().public_key_hash(), Err(ScriptError::EmptyScript)));
        assert!(matches!(
            Script::from_hex("76").expect("hex").public_key_hash(),
            Err(ScriptError::NotP2PKH)
        ));
        assert!(matches!(
            Script::from_hex("a9149de5aeaff9c48431ba4dd6e8af73d51f38e451cb87")
                .expect("hex")
                .public_key_hash(),
            Err(ScriptError::NotP2PKH)
        ));
        assert!(matches!(
            Script::from_hex("76a9ac").expect("hex").public_key_hash(),
            Err(ScriptError::NotP2PKH)
        ));
        assert!(matches!(
            Script::from_hex("76a91401").expect("hex").public_key_hash(),
            Err(ScriptError::TruncatedScript { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Append operations
    // -----------------------------------------------------------------------

    #[test]
    fn test_append_push_data_sizes() {
        let mut script = Script::new();
        script.append_push_data(&[1, 2, 3, 4, 5]).expect("push should succeed");
        assert_eq!(script.to_hex(), "050102030405");

        let mut script = Script::new();
        script.append_push_data(&[0xaa; 80]).expect("push should succeed");
        assert_eq!(&script.to_hex()[..4], "4c50");
        assert_eq!(script.len(), 2 + 80);

        let mut script = Script::new();
        script.append_push_data(&[0xbb; 256]).expect("push should succeed");
        assert_eq!(&script.to_hex()[..6], "4d0001");
        assert_eq!(script.len(), 3 + 256);
    }

    #[test]
    fn test_append_push_data_hex_and_array() {
        let mut script = Script::new();
        script.append_push_data_hex("cafe").expect("valid hex");
        assert!(script.append_push_data_hex("xyz").is_err());

        let parts: Vec<&[u8]> = vec![b"hello", b"", &[0x01]];
        script.append_push_data_array(&parts).expect("push array");
        assert_eq!(script.to_hex(), "02cafe0568656c6c6f000101");
    }

    #[test]
    fn test_append_opcodes() {
        let mut script = Script::from_asm("OP_2 OP_2 OP_ADD").expect("valid ASM");
        script.append_opcodes(&[OP_EQUAL, OP_VERIFY]).expect("should succeed");
        assert_eq!(script.to_asm(), "OP_2 OP_2 OP_ADD OP_EQUAL OP_VERIFY");

        let before = script.clone();
        let err = script.append_opcodes(&[OP_EQUAL, OP_PUSHDATA1]).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidOpcodeType(ref name) if name == "OP_PUSHDATA1"));
        assert_eq!(script, before);
    }

    #[test]
    fn test_min_push_size() {
        let cases: Vec<(Vec<u8>, usize)> = vec![
            (vec![], 1),
            (vec![0x00], 1),
            (vec![0x10], 1),
            (vec![0x81], 1),
            (vec![0x11], 2),
            (vec![0x80], 2),
            (vec![0xaa; 2], 3),
            (vec![0xaa; 75], 76),
            (vec![0xaa; 76], 78),
            (vec![0xaa; 255], 257),
            (vec![0xaa; 256], 259),
            (vec![0xaa; 65535], 65538),
            (vec![0xaa; 65536], 65541),
        ];
        for (data, expected) in cases {
            assert_eq!(min_push_size(&data), expected, "len {}", data.len());
        }
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    #[test]
    fn test_p2pkh_builders() {
        let pkh: [u8; 20] = hex::decode("e2a623699e81b291c0327f408fea765d534baa2a")
            .expect("hex")
            .try_into()
            .expect("20 bytes");
        assert_eq!(Script::p2pkh_from_pub_key_hash(&pkh).to_hex(), P2PKH_HEX);

        let key = PublicKey::from_hex(
            "02c8803fdd437d902f08e3c2344cb33065c99d7c99982018ff9f7219c3dd352ff0",
        )
        .expect("key");
        let by_key = Script::p2pkh_from_pub_key(&key);
        assert_eq!(by_key.to_hex(), "76a914af2590a45ae401651fdbdf59a76ad43d1862534088ac");

        let by_addr = Script::p2pkh_from_address("mwV3YgnowbJJB3LcyCuqiKpdivvNNFiK7M").expect("addr");
        assert_eq!(by_addr, by_key);
        assert!(Script::p2pkh_from_address("not-an-address").is_err());
    }

    #[test]
    fn test_p2pkh_unlocking_script() {
        let sig = [0x30u8; 71];
        let key = [0x02u8; 33];
        let script = Script::p2pkh_unlocking_script(&key, &sig, 0x41).expect("build");
        let parts = script.chunks().expect("decode");
        assert_eq!(parts.len(), 2);
        let pushed_sig = parts[0].data().expect("push");
        assert_eq!(pushed_sig.len(), 72);
        assert_eq!(pushed_sig[71], 0x41);
        assert_eq!(parts[1].data(), Some(&key[..]));
        assert_eq!(script.len(), 1 + 72 + 1 + 33);
    }

    // -----------------------------------------------------------------------
    // Equality & serde
    // -----------------------------------------------------------------------

    #[test]
    fn test_equals() {
        let s1 = Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac")
            .expect("valid hex");
        let s2 = Script::from(s1.to_bytes().to_vec());
        let s3 = Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26566ac")
            .expect("valid hex");
        assert!(s1.equals(&s2));
        assert!(!s1.equals(&s3));
        assert_ne!(s1, s3);
    }

    #[test]
    fn test_serde_hex_string() {
        let script = Script::from_asm("OP_2 OP_2 OP_ADD OP_4 OP_EQUALVERIFY").expect("valid ASM");
        let json_str = serde_json::to_string(&script).expect("should serialize");
        assert_eq!(json_str, r#""5252935488""#);
        let back: Script = serde_json::from_str(&json_str).expect("should deserialize");
        assert_eq!(back, script);
        assert!(serde_json::from_str::<Script>(r#""zz""#).is_err());
    }

    #[test]
    fn test_display_and_debug() {
        let script = Script::from_hex("76a9").expect("hex");
        assert_eq!(format!("{}", script), "76a9");
        assert_eq!(format!("{:?}", script), "Script(76a9)");
    }
}
