//! Spendable outputs and funding a transaction from them.

use bt_primitives::hash::hash160;
use bt_script::Script;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fees::FeeQuote;
use crate::input::Input;
use crate::output::Output;
use crate::transaction::Transaction;
use crate::TransactionError;

/// An unspent output that can be turned into an input.
///
/// Serializes as `{"txid", "vout", "lockingScript", "satoshis"}` with the
/// script in hex.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UTXO {
    /// Id of the transaction holding the output, in display hex.
    pub txid: String,
    /// Index of the output in that transaction.
    pub vout: u32,
    /// Script the output is locked with.
    pub locking_script: Script,
    /// Value of the output.
    pub satoshis: u64,
}

impl UTXO {
    /// Create a UTXO from a display-hex txid.
    pub fn new(txid: impl Into<String>, vout: u32, locking_script: Script, satoshis: u64) -> Self {
        UTXO {
            txid: txid.into(),
            vout,
            locking_script,
            satoshis,
        }
    }

    /// An unsigned input spending this output, with the previous output
    /// attached.
    pub fn to_input(&self) -> Result<Input, TransactionError> {
        let mut input = Input::from_txid_hex(&self.txid, self.vout)?;
        input.set_previous_output(Some(Output::new(
            self.satoshis,
            self.locking_script.clone(),
        )));
        Ok(input)
    }
}

impl Transaction {
    /// Append one unsigned input per UTXO, in order.
    ///
    /// Either every UTXO is added or, on error, none is.
    pub fn from_utxos(&mut self, utxos: &[UTXO]) -> Result<(), TransactionError> {
        let inputs = utxos
            .iter()
            .map(UTXO::to_input)
            .collect::<Result<Vec<_>, _>>()?;
        self.inputs.extend(inputs);
        Ok(())
    }

    /// Append an input for every output of `prev_tx` that pays to the hash
    /// of `pub_key`. Outputs of any other shape are skipped.
    ///
    /// # Returns
    /// The number of inputs added.
    pub fn add_p2pkh_inputs_from_tx(&mut self, prev_tx: &Transaction, pub_key: &[u8]) -> usize {
        let txid = prev_tx.tx_id();
        let pkh = hash160(pub_key);
        let before = self.inputs.len();
        for (vout, output) in prev_tx.outputs.iter().enumerate() {
            let matches = output
                .locking_script
                .public_key_hash()
                .map_or(false, |h| h == pkh.as_slice());
            if !matches {
                continue;
            }
            let mut input = Input::new(txid, vout as u32);
            input.set_previous_output(Some(output.clone()));
            self.inputs.push(input);
        }
        self.inputs.len() - before
    }

    /// Add inputs until they cover the outputs plus the estimated fee.
    ///
    /// `next` is called with the current deficit and returns more UTXOs to
    /// spend. It signals exhaustion by returning `TransactionError::NoUtxo`
    /// or an empty batch; any other error aborts funding and is returned as is. The outputs
    /// should already be in place; change can be added afterwards.
    ///
    /// # Returns
    /// `InsufficientUtxos` if `next` runs out while value is still missing.
    pub fn fund<F>(&mut self, quote: &FeeQuote, mut next: F) -> Result<(), TransactionError>
    where
        F: FnMut(u64) -> Result<Vec<UTXO>, TransactionError>,
    {
        let mut deficit = self.estimate_deficit(quote)?;
        let mut round = 0usize;
        while deficit != 0 {
            round += 1;
            let utxos = match next(deficit) {
                Ok(utxos) if utxos.is_empty() => {
                    debug!(round, deficit, "utxo source returned nothing");
                    break;
                }
                Ok(utxos) => utxos,
                Err(TransactionError::NoUtxo) => {
                    debug!(round, deficit, "utxo source exhausted");
                    break;
                }
                Err(e) => return Err(e),
            };
            self.from_utxos(&utxos)?;
            deficit = self.estimate_deficit(quote)?;
            debug!(round, added = utxos.len(), deficit, "funding round");
        }

        if deficit != 0 {
            return Err(TransactionError::InsufficientUtxos { deficit });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXID: &str = "07912972e42095fe58daaf09161c5a5da57be47c2054dc2aaa52b30fefa1940b";
    const P2PKH: &str = "76a914af2590a45ae401651fdbdf59a76ad43d1862534088ac";

    fn utxo(vout: u32, satoshis: u64) -> UTXO {
        UTXO::new(TXID, vout, Script::from_hex(P2PKH).expect("script"), satoshis)
    }

    /// A UTXO source that hands out one stored UTXO per call.
    fn one_at_a_time(mut pool: Vec<UTXO>) -> impl FnMut(u64) -> Result<Vec<UTXO>, TransactionError> {
        pool.reverse();
        move |_deficit| pool.pop().map(|u| vec![u]).ok_or(TransactionError::NoUtxo)
    }

    #[test]
    fn test_utxo_json() {
        let json = serde_json::to_string(&utxo(1, 500)).expect("json");
        assert_eq!(
            json,
            format!(
                r#"{{"txid":"{}","vout":1,"lockingScript":"{}","satoshis":500}}"#,
                TXID, P2PKH
            )
        );
        let back: UTXO = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, utxo(1, 500));
    }

    #[test]
    fn test_from_utxos_is_atomic() {
        let mut tx = Transaction::new();
        let mut bad = utxo(1, 1);
        bad.txid = "zz".into();
        assert!(tx.from_utxos(&[utxo(0, 1_000), bad]).is_err());
        assert_eq!(tx.input_count(), 0);

        tx.from_utxos(&[utxo(0, 1_000), utxo(1, 2_000)]).expect("utxos");
        assert_eq!(tx.input_count(), 2);
        assert_eq!(tx.inputs[1].previous_output_index, 1);
        assert_eq!(tx.inputs[0].previous_txid_hex(), TXID);
        assert_eq!(tx.total_input_satoshis().expect("total"), 3_000);
    }

    #[test]
    fn test_add_p2pkh_inputs_from_tx() {
        let pub_key1 = hex::decode("0280f642908697e8068c2e921bd998d6c2b90553064656f91b9cb9e98f443aac30").expect("hex");
        let pub_key2 = hex::decode("02434dc3db4281c0895d7a126bb266e7648caca7d0e2e487bc41f954722d4ee397").expect("hex");

        let mut prev = Transaction::new();
        prev.add_p2pkh_output_from_pub_key_hash(&hash160(&pub_key1), 100_000);
        prev.add_p2pkh_output_from_pub_key_hash(&hash160(&pub_key1), 100_000);
        prev.add_p2pkh_output_from_pub_key_hash(&hash160(&pub_key2), 100_000);
        prev.add_data_output(b"hi").expect("data");

        let mut tx = Transaction::new();
        assert_eq!(tx.add_p2pkh_inputs_from_tx(&prev, &pub_key1), 2);
        assert_eq!(tx.total_input_satoshis().expect("total"), 200_000);
        assert_eq!(tx.inputs[1].previous_txid, prev.tx_id());
        assert_eq!(tx.inputs[1].previous_output_index, 1);
    }

    #[test]
    fn test_fund_until_covered() {
        let mut tx = Transaction::new();
        tx.add_p2pkh_output_from_pub_key_hash(&[1u8; 20], 1_500);
        let mut calls = Vec::new();
        let mut source = one_at_a_time(vec![utxo(0, 1_000), utxo(1, 1_000), utxo(2, 1_000)]);
        tx.fund(&FeeQuote::new(), |deficit| {
            calls.push(deficit);
            source(deficit)
        })
        .expect("fund");
        assert_eq!(tx.input_count(), 2);
        assert_eq!(calls.len(), 2);
        assert!(calls[0] > 1_500);
        assert_eq!(tx.estimate_deficit(&FeeQuote::new()).expect("deficit"), 0);
    }

    #[test]
    fn test_fund_exhausted() {
        let mut tx = Transaction::new();
        tx.add_p2pkh_output_from_pub_key_hash(&[1u8; 20], 5_000);
        let result = tx.fund(&FeeQuote::new(), one_at_a_time(vec![utxo(0, 1_000)]));
        match result {
            Err(TransactionError::InsufficientUtxos { deficit }) => assert!(deficit > 4_000),
            other => panic!("expected InsufficientUtxos, got {:?}", other),
        }
        assert_eq!(tx.input_count(), 1);
    }

    #[test]
    fn test_fund_empty_batch_stops() {
        let mut tx = Transaction::new();
        tx.add_p2pkh_output_from_pub_key_hash(&[1u8; 20], 5_000);
        let mut calls = 0;
        let result = tx.fund(&FeeQuote::new(), |_| {
            calls += 1;
            Ok(Vec::new())
        });
        assert!(matches!(result, Err(TransactionError::InsufficientUtxos { .. })));
        assert_eq!(calls, 1);
        assert_eq!(tx.input_count(), 0);
    }

    #[test]
    fn test_fund_source_error_passes_through() {
        let mut tx = Transaction::new();
        tx.add_p2pkh_output_from_pub_key_hash(&[1u8; 20], 5_000);
        let result = tx.fund(&FeeQuote::new(), |_| Err(TransactionError::signer("wallet locked")));
        assert!(matches!(result, Err(TransactionError::Signer(_))));
    }

    #[test]
    fn test_fund_nothing_to_do() {
        let mut tx = Transaction::new();
        tx.fund(&FeeQuote::new(), |_| panic!("source must not be called"))
            .expect("fund");
    }
}
