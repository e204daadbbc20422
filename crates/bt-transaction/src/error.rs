use bt_primitives::PrimitivesError;
use bt_script::ScriptError;

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// Fewer bytes than the smallest possible transaction.
    #[error("transaction too short: {0} bytes, need at least 10")]
    TxTooShort(usize),

    /// The buffer ended inside a field.
    #[error("truncated transaction reading {field}: {source}")]
    Truncated {
        /// Name of the field being read.
        field: &'static str,
        /// Underlying reader error.
        #[source]
        source: PrimitivesError,
    },

    /// `from_bytes` was given more than one transaction's worth of data.
    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),

    /// Invalid hex string or txid.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Input index beyond the input count.
    #[error("input index {index} out of range (tx has {count} inputs)")]
    InputIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of inputs.
        count: usize,
    },

    /// Output index beyond the output count.
    #[error("output index {index} out of range (tx has {count} outputs)")]
    OutputIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of outputs.
        count: usize,
    },

    /// The previous output's value or locking script was never supplied.
    #[error("previous output data not supplied for input {0}")]
    MissingPreviousOutputData(usize),

    /// Inputs are worth less than the outputs.
    #[error("satoshis inputted to the tx ({inputs}) are less than the outputted satoshis ({outputs})")]
    InsufficientInputs {
        /// Total input value.
        inputs: u64,
        /// Total output value.
        outputs: u64,
    },

    /// Funding stopped with value still missing.
    #[error("insufficient utxos provided, {deficit} satoshis short")]
    InsufficientUtxos {
        /// Satoshis still required.
        deficit: u64,
    },

    /// Returned by a UTXO source to signal that it has nothing more to offer.
    #[error("no remaining utxos")]
    NoUtxo,

    /// The input spends a script type the operation cannot handle.
    #[error("input {index} spends an unsupported script: {script_type}")]
    UnsupportedScript {
        /// Offending input.
        index: usize,
        /// Classification of its previous locking script.
        script_type: String,
    },

    /// A fee quote named a fee type other than `standard` or `data`.
    #[error("unknown fee type '{0}'")]
    UnknownFeeType(String),

    /// A fee quote could not be parsed.
    #[error("invalid fee quote: {0}")]
    FeeQuoteJson(#[from] serde_json::Error),

    /// Failure reported by a signer, passed through unchanged.
    #[error("signer error: {0}")]
    Signer(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An underlying script error.
    #[error("script error: {0}")]
    Script(#[from] ScriptError),

    /// An underlying primitives error.
    #[error("primitives error: {0}")]
    Primitives(#[from] PrimitivesError),
}

impl TransactionError {
    /// Wrap an arbitrary signer failure.
    pub fn signer<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        TransactionError::Signer(err.into())
    }

    pub(crate) fn truncated(field: &'static str) -> impl FnOnce(PrimitivesError) -> Self {
        move |source| TransactionError::Truncated { field, source }
    }
}

impl From<hex::FromHexError> for TransactionError {
    fn from(e: hex::FromHexError) -> Self {
        TransactionError::InvalidHex(e.to_string())
    }
}
