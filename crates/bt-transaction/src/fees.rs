//! Fee quotes and transaction size/fee estimation.
//!
//! A `FeeQuote` prices two categories of bytes: "data" bytes are the
//! locking scripts of `OP_RETURN` outputs and "standard" bytes are
//! everything else. Only the mining fee rate is used when pricing a
//! transaction; the relay fee is carried for callers that need it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;
use crate::TransactionError;

/// Size of a P2PKH unlocking script once signed:
/// push + DER signature (up to 72) + sighash byte + push + compressed key.
pub const P2PKH_UNLOCKING_SCRIPT_ESTIMATE: usize = 107;

/// Category of transaction bytes a fee rate applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeType {
    /// Every byte that is not data.
    Standard,
    /// Locking-script bytes of `OP_RETURN` outputs.
    Data,
}

impl FeeType {
    /// The JSON name of this fee type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeType::Standard => "standard",
            FeeType::Data => "data",
        }
    }
}

impl fmt::Display for FeeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeeType {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(FeeType::Standard),
            "data" => Ok(FeeType::Data),
            other => Err(TransactionError::UnknownFeeType(other.to_string())),
        }
    }
}

/// A rate of `satoshis` per `bytes`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeUnit {
    /// Fee in satoshis for `bytes` bytes.
    pub satoshis: u64,
    /// Number of bytes the fee covers.
    pub bytes: u64,
}

impl FeeUnit {
    /// A rate of `satoshis` per `bytes`.
    pub fn new(satoshis: u64, bytes: u64) -> Self {
        FeeUnit { satoshis, bytes }
    }

    /// Fee for `size` bytes, rounded down. A unit covering zero bytes
    /// charges nothing.
    pub fn fee_for(&self, size: u64) -> u64 {
        if self.bytes == 0 {
            return 0;
        }
        let fee = u128::from(size) * u128::from(self.satoshis) / u128::from(self.bytes);
        u64::try_from(fee).unwrap_or(u64::MAX)
    }
}

/// Mining and relay rates for one fee type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fee {
    /// Rate charged for inclusion in a block.
    pub mining_fee: FeeUnit,
    /// Rate for retention in the secondary mempool.
    pub relay_fee: FeeUnit,
}

impl Default for Fee {
    /// 5 satoshis per 100 bytes for both rates.
    fn default() -> Self {
        Fee {
            mining_fee: FeeUnit::new(5, 100),
            relay_fee: FeeUnit::new(5, 100),
        }
    }
}

/// Fee rates for standard and data bytes.
///
/// # JSON form
///
/// ```json
/// {
///   "standard": { "miningFee": { "satoshis": 5, "bytes": 100 }, "relayFee": { "satoshis": 5, "bytes": 100 } },
///   "data":     { "miningFee": { "satoshis": 5, "bytes": 100 }, "relayFee": { "satoshis": 5, "bytes": 100 } }
/// }
/// ```
///
/// A fee type missing from the JSON keeps its default rate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Fee>",
    into = "BTreeMap<String, Fee>"
)]
pub struct FeeQuote {
    standard: Fee,
    data: Fee,
}

impl FeeQuote {
    /// A quote with the default 5 sat / 100 byte rates.
    pub fn new() -> Self {
        Self::default()
    }

    /// A quote charging `satoshis` per `bytes` for both fee types and both
    /// rates.
    pub fn with_rate(satoshis: u64, bytes: u64) -> Self {
        let fee = Fee {
            mining_fee: FeeUnit::new(satoshis, bytes),
            relay_fee: FeeUnit::new(satoshis, bytes),
        };
        FeeQuote {
            standard: fee,
            data: fee,
        }
    }

    /// The rates for `fee_type`.
    pub fn fee(&self, fee_type: FeeType) -> &Fee {
        match fee_type {
            FeeType::Standard => &self.standard,
            FeeType::Data => &self.data,
        }
    }

    /// Replace the rates for `fee_type`.
    pub fn add_quote(&mut self, fee_type: FeeType, fee: Fee) -> &mut Self {
        match fee_type {
            FeeType::Standard => self.standard = fee,
            FeeType::Data => self.data = fee,
        }
        self
    }

    /// Parse a quote from its JSON form.
    ///
    /// # Returns
    /// `UnknownFeeType` for a key other than `standard` or `data`, and
    /// `FeeQuoteJson` for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, TransactionError> {
        let fees: BTreeMap<String, Fee> = serde_json::from_str(json)?;
        FeeQuote::try_from(fees)
    }

    /// Serialize the quote in the same JSON shape `from_json` reads.
    pub fn to_json(&self) -> Result<String, TransactionError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl TryFrom<BTreeMap<String, Fee>> for FeeQuote {
    type Error = TransactionError;

    fn try_from(fees: BTreeMap<String, Fee>) -> Result<Self, Self::Error> {
        let mut quote = FeeQuote::default();
        for (name, fee) in fees {
            quote.add_quote(name.parse()?, fee);
        }
        Ok(quote)
    }
}

impl From<FeeQuote> for BTreeMap<String, Fee> {
    fn from(quote: FeeQuote) -> Self {
        BTreeMap::from([
            (FeeType::Standard.to_string(), quote.standard),
            (FeeType::Data.to_string(), quote.data),
        ])
    }
}

/// Size of a transaction split by fee type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxSize {
    /// Bytes of the whole transaction.
    pub total_bytes: u64,
    /// Bytes priced at the standard rate.
    pub total_std_bytes: u64,
    /// Bytes of `OP_RETURN` locking scripts.
    pub total_data_bytes: u64,
}

/// Fees required for a transaction, with the size they were derived from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxFees {
    /// `std_fee_paid + data_fee_paid`.
    pub total_fee_paid: u64,
    /// Fee for the standard bytes.
    pub std_fee_paid: u64,
    /// Fee for the data bytes.
    pub data_fee_paid: u64,
    /// The size the fees were computed from.
    pub size: TxSize,
}

impl TxFees {
    /// Price `size` at the mining rates of `quote`.
    pub fn for_size(size: TxSize, quote: &FeeQuote) -> Self {
        let std_fee_paid = quote
            .fee(FeeType::Standard)
            .mining_fee
            .fee_for(size.total_std_bytes);
        let data_fee_paid = quote
            .fee(FeeType::Data)
            .mining_fee
            .fee_for(size.total_data_bytes);
        TxFees {
            total_fee_paid: std_fee_paid.saturating_add(data_fee_paid),
            std_fee_paid,
            data_fee_paid,
            size,
        }
    }
}

impl Transaction {
    /// Current serialized size, split into standard and data bytes.
    pub fn size(&self) -> TxSize {
        self.split_size(self.to_bytes().len())
    }

    /// Estimated size once every input is signed.
    ///
    /// Each unsigned input is counted with a 107-byte P2PKH unlocking
    /// script.
    ///
    /// # Returns
    /// `MissingPreviousOutputData` if an unsigned input has no previous
    /// output, or `UnsupportedScript` if it spends anything but P2PKH.
    pub fn size_unsigned(&self) -> Result<TxSize, TransactionError> {
        self.size_with_placeholder(P2PKH_UNLOCKING_SCRIPT_ESTIMATE)
    }

    /// Size with `placeholder` bytes added per unsigned P2PKH input.
    pub(crate) fn size_with_placeholder(&self, placeholder: usize) -> Result<TxSize, TransactionError> {
        let mut total = self.to_bytes().len();
        for (index, input) in self.inputs.iter().enumerate() {
            if input.is_signed() {
                continue;
            }
            let script = input
                .previous_locking_script()
                .ok_or(TransactionError::MissingPreviousOutputData(index))?;
            if !script.is_p2pkh() {
                return Err(TransactionError::UnsupportedScript {
                    index,
                    script_type: script.script_type().to_string(),
                });
            }
            // an empty script and a 107-byte one both take a one-byte VarInt
            total += placeholder;
        }
        Ok(self.split_size(total))
    }

    fn split_size(&self, total: usize) -> TxSize {
        let data: usize = self
            .outputs
            .iter()
            .filter(|o| o.is_data())
            .map(|o| o.locking_script.len())
            .sum();
        TxSize {
            total_bytes: total as u64,
            total_std_bytes: total.saturating_sub(data) as u64,
            total_data_bytes: data as u64,
        }
    }

    /// Fees this transaction must pay under `quote`, sized as if signed.
    ///
    /// # Returns
    /// `InsufficientInputs` if the inputs are worth less than the outputs.
    pub fn calculate_fees(&self, quote: &FeeQuote) -> Result<TxFees, TransactionError> {
        let inputs = self.total_input_satoshis()?;
        let outputs = self.total_output_satoshis();
        if inputs < outputs {
            return Err(TransactionError::InsufficientInputs { inputs, outputs });
        }
        self.estimate_fees(quote)
    }

    /// Whether the implicit fee (inputs minus outputs) covers the fee
    /// required by `quote`.
    pub fn is_fee_paid_enough(&self, quote: &FeeQuote) -> Result<bool, TransactionError> {
        let inputs = self.total_input_satoshis()?;
        let outputs = self.total_output_satoshis();
        if inputs < outputs {
            return Ok(false);
        }
        let fees = self.estimate_fees(quote)?;
        Ok(inputs - outputs >= fees.total_fee_paid)
    }

    /// Satoshis still missing to cover the outputs and the estimated fee.
    pub fn estimate_deficit(&self, quote: &FeeQuote) -> Result<u64, TransactionError> {
        let inputs = self.total_input_satoshis()?;
        let required = self
            .total_output_satoshis()
            .saturating_add(self.estimate_fees(quote)?.total_fee_paid);
        Ok(required.saturating_sub(inputs))
    }

    pub(crate) fn estimate_fees(&self, quote: &FeeQuote) -> Result<TxFees, TransactionError> {
        Ok(TxFees::for_size(self.size_unsigned()?, quote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Output;
    use bt_script::Script;

    const P2PKH: &str = "76a914af2590a45ae401651fdbdf59a76ad43d1862534088ac";

    fn funded_tx(sats: u64) -> Transaction {
        let mut tx = Transaction::new();
        tx.add_input_from(
            "07912972e42095fe58daaf09161c5a5da57be47c2054dc2aaa52b30fefa1940b",
            0,
            P2PKH,
            sats,
        )
        .expect("input");
        tx
    }

    #[test]
    fn test_fee_unit() {
        assert_eq!(FeeUnit::new(5, 100).fee_for(192), 9);
        assert_eq!(FeeUnit::new(50, 100).fee_for(192), 96);
        assert_eq!(FeeUnit::new(5, 0).fee_for(192), 0);
        assert_eq!(FeeUnit::new(u64::MAX, 1).fee_for(2), u64::MAX);
    }

    #[test]
    fn test_fee_quote_json() {
        let json = r#"{
            "standard": {"miningFee": {"satoshis": 100, "bytes": 10}, "relayFee": {"satoshis": 10, "bytes": 5}},
            "data": {"miningFee": {"satoshis": 5, "bytes": 2}, "relayFee": {"satoshis": 8, "bytes": 4}}
        }"#;
        let quote = FeeQuote::from_json(json).expect("quote");
        assert_eq!(quote.fee(FeeType::Standard).mining_fee, FeeUnit::new(100, 10));
        assert_eq!(quote.fee(FeeType::Data).relay_fee, FeeUnit::new(8, 4));

        let back = FeeQuote::from_json(&quote.to_json().expect("json")).expect("quote");
        assert_eq!(back, quote);
    }

    #[test]
    fn test_fee_quote_json_errors() {
        let unknown = r#"{"mining": {"miningFee": {"satoshis": 1, "bytes": 1}, "relayFee": {"satoshis": 1, "bytes": 1}}}"#;
        assert!(matches!(
            FeeQuote::from_json(unknown),
            Err(TransactionError::UnknownFeeType(t)) if t == "mining"
        ));
        assert!(matches!(
            FeeQuote::from_json("{not json"),
            Err(TransactionError::FeeQuoteJson(_))
        ));

        // missing types keep their defaults
        let partial = r#"{"data": {"miningFee": {"satoshis": 1, "bytes": 1}, "relayFee": {"satoshis": 1, "bytes": 1}}}"#;
        let quote = FeeQuote::from_json(partial).expect("quote");
        assert_eq!(*quote.fee(FeeType::Standard), Fee::default());
    }

    #[test]
    fn test_size_unsigned_adds_placeholder() {
        let mut tx = funded_tx(1000);
        tx.add_output(Output::new(500, Script::from_hex(P2PKH).expect("script")));
        assert_eq!(tx.size().total_bytes, 85);
        let size = tx.size_unsigned().expect("size");
        assert_eq!(size.total_bytes, 192);
        assert_eq!(size.total_std_bytes, 192);
        assert_eq!(size.total_data_bytes, 0);
    }

    #[test]
    fn test_size_splits_data_bytes() {
        let mut tx = funded_tx(1000);
        tx.add_data_output(b"hello world").expect("data");
        let size = tx.size_unsigned().expect("size");
        assert_eq!(size.total_data_bytes, 14);
        assert_eq!(size.total_std_bytes + size.total_data_bytes, size.total_bytes);
    }

    #[test]
    fn test_size_unsigned_rejects_non_p2pkh() {
        let mut tx = Transaction::new();
        tx.add_input_from(&"11".repeat(32), 0, "006a", 1000)
            .expect("input");
        assert!(matches!(
            tx.size_unsigned(),
            Err(TransactionError::UnsupportedScript { index: 0, ref script_type }) if script_type == "nulldata"
        ));
        // signed inputs are not inspected
        tx.inputs[0].unlocking_script = Script::from_bytes(&[0x51]);
        assert!(tx.size_unsigned().is_ok());
    }

    #[test]
    fn test_calculate_fees() {
        let mut tx = funded_tx(1000);
        tx.add_output(Output::new(500, Script::from_hex(P2PKH).expect("script")));
        let fees = tx
            .calculate_fees(&FeeQuote::with_rate(50, 100))
            .expect("fees");
        assert_eq!(fees.total_fee_paid, 96);
        assert_eq!(fees.data_fee_paid, 0);
        assert!(tx.is_fee_paid_enough(&FeeQuote::with_rate(50, 100)).expect("check"));
        assert_eq!(tx.estimate_deficit(&FeeQuote::with_rate(50, 100)).expect("deficit"), 0);

        tx.outputs[0].satoshis = 950;
        assert!(!tx.is_fee_paid_enough(&FeeQuote::with_rate(50, 100)).expect("check"));
        assert_eq!(tx.estimate_deficit(&FeeQuote::with_rate(50, 100)).expect("deficit"), 46);

        tx.outputs[0].satoshis = 2000;
        assert!(matches!(
            tx.calculate_fees(&FeeQuote::new()),
            Err(TransactionError::InsufficientInputs { inputs: 1000, outputs: 2000 })
        ));
        assert!(!tx.is_fee_paid_enough(&FeeQuote::new()).expect("check"));
    }
}
