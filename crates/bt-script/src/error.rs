/// Error types for script operations.
///
/// Covers push-data encoding and decoding failures, ASM parsing, script
/// classification and address validation.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// A push payload is larger than `OP_PUSHDATA4` can describe.
    #[error("push payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    /// A push claims more bytes than remain in the script.
    #[error("truncated script at offset {offset}: push needs {needed} bytes, {available} available")]
    TruncatedScript {
        /// Offset of the push opcode.
        offset: usize,
        /// Bytes the push (or its length field) requires.
        needed: usize,
        /// Bytes left after the opcode.
        available: usize,
    },

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Attempted to use `append_opcodes` for a push data opcode.
    #[error("use append_push_data for push data funcs: {0}")]
    InvalidOpcodeType(String),

    /// An ASM token is neither an opcode name nor valid hex.
    #[error("invalid opcode data: {0}")]
    InvalidOpcodeData(String),

    /// Script is empty when a non-empty script was expected.
    #[error("script is empty")]
    EmptyScript,

    /// Script is not a P2PKH script.
    #[error("not a P2PKH")]
    NotP2PKH,

    /// Address string could not be decoded.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Address version byte does not belong to a known P2PKH network.
    #[error("address not supported {0}")]
    UnsupportedAddress(String),

    /// Base58Check checksum does not match.
    #[error("checksum failed")]
    EncodingChecksumFailed,

    /// Error from primitives crate.
    #[error("primitives error: {0}")]
    Primitives(#[from] bt_primitives::PrimitivesError),
}

impl From<hex::FromHexError> for ScriptError {
    fn from(e: hex::FromHexError) -> Self {
        ScriptError::InvalidHex(e.to_string())
    }
}
