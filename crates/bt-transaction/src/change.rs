//! Change output calculation.
//!
//! Works out what is left after the outputs and the estimated fee and, if
//! that is worth an output of its own, returns it to the spender. Size
//! depends on whether change is added and the fee depends on size; the
//! decision is made in a single forward pass:
//!
//! 1. Skip change if the excess cannot pay for one more P2PKH output plus
//!    the dust limit.
//! 2. Otherwise append the change output, price the whole transaction as
//!    if signed and put the remainder in the change output.
//! 3. If that remainder is below the dust limit, remove the output again.
//!
//! Any skipped excess stays in the transaction as an implicit fee.

use bt_primitives::util::VarInt;
use bt_primitives::NetworkParams;
use bt_script::{Address, Script, ScriptError};
use tracing::debug;

use crate::fees::{FeeQuote, FeeType, TxFees, P2PKH_UNLOCKING_SCRIPT_ESTIMATE};
use crate::output::Output;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Outputs worth less than this are not created as change.
pub const DUST_LIMIT: u64 = 136;

/// Serialized size of a P2PKH output: value, script length, script.
pub const P2PKH_OUTPUT_SIZE: u64 = 8 + 1 + 25;

/// Turns an address string into the locking script that pays it.
pub trait AddressResolver {
    /// The locking script for `address`, or an error if it cannot be parsed.
    fn locking_script(&self, address: &str) -> Result<Script, TransactionError>;
}

/// Resolves Base58Check P2PKH addresses, optionally restricted to one
/// network.
#[derive(Clone, Copy, Debug, Default)]
pub struct Base58AddressResolver {
    network: Option<NetworkParams>,
}

impl Base58AddressResolver {
    /// Accept addresses of any known network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept only addresses of `network`.
    pub fn for_network(network: NetworkParams) -> Self {
        Base58AddressResolver {
            network: Some(network),
        }
    }
}

impl AddressResolver for Base58AddressResolver {
    fn locking_script(&self, address: &str) -> Result<Script, TransactionError> {
        let addr = Address::from_string(address)?;
        if let Some(network) = &self.network {
            if addr.network != *network {
                return Err(ScriptError::UnsupportedAddress(format!(
                    "{} is a {} address, expected {}",
                    address, addr.network.name, network.name
                ))
                .into());
            }
        }
        Ok(addr.locking_script())
    }
}

/// Tunables for the change decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangePolicy {
    /// Smallest change output worth creating, in satoshis.
    pub dust_limit: u64,
    /// Bytes assumed for each unsigned input's unlocking script.
    pub unlocking_script_estimate: usize,
}

impl Default for ChangePolicy {
    fn default() -> Self {
        ChangePolicy {
            dust_limit: DUST_LIMIT,
            unlocking_script_estimate: P2PKH_UNLOCKING_SCRIPT_ESTIMATE,
        }
    }
}

/// Result of a change calculation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// A change output was appended.
    Added {
        /// Index of the new output.
        index: usize,
        /// Its value.
        satoshis: u64,
        /// Fee left to the miner: inputs minus all outputs, change included.
        fee: u64,
    },
    /// No output was added; `available` satoshis over the outputs are left
    /// as fee.
    Suppressed {
        /// Inputs minus outputs.
        available: u64,
    },
}

impl Transaction {
    /// Add a change output paying to `script` under the default policy.
    pub fn change(&mut self, script: &Script, quote: &FeeQuote) -> Result<ChangeOutcome, TransactionError> {
        self.change_with_policy(script, quote, &ChangePolicy::default())
    }

    /// Add a change output paying to the address, resolved by `resolver`.
    pub fn change_to_address(
        &mut self,
        address: &str,
        resolver: &dyn AddressResolver,
        quote: &FeeQuote,
    ) -> Result<ChangeOutcome, TransactionError> {
        let script = resolver.locking_script(address)?;
        self.change(&script, quote)
    }

    /// Add a change output paying to `script` if the excess over the
    /// outputs and fee is at least `policy.dust_limit`.
    ///
    /// # Returns
    /// `InsufficientInputs` if the inputs are worth less than the outputs.
    /// Errors from fee estimation leave the outputs unchanged.
    pub fn change_with_policy(
        &mut self,
        script: &Script,
        quote: &FeeQuote,
        policy: &ChangePolicy,
    ) -> Result<ChangeOutcome, TransactionError> {
        let inputs = self.total_input_satoshis()?;
        let outputs = self.total_output_satoshis();
        if inputs < outputs {
            return Err(TransactionError::InsufficientInputs { inputs, outputs });
        }
        let available = inputs - outputs;

        let count_growth = VarInt::from(self.outputs.len()).upper_limit_inc();
        if count_growth < 0 {
            debug!(available, "output count at maximum, no change added");
            return Ok(ChangeOutcome::Suppressed { available });
        }
        let marginal = quote
            .fee(FeeType::Standard)
            .mining_fee
            .fee_for(P2PKH_OUTPUT_SIZE + count_growth as u64);
        if available < marginal.saturating_add(policy.dust_limit) {
            debug!(available, marginal, "excess below change output cost, no change added");
            return Ok(ChangeOutcome::Suppressed { available });
        }

        self.outputs.push(Output::new(0, script.clone()));
        let index = self.outputs.len() - 1;

        let size = match self.size_with_placeholder(policy.unlocking_script_estimate) {
            Ok(size) => size,
            Err(e) => {
                self.outputs.pop();
                return Err(e);
            }
        };
        let fee = TxFees::for_size(size, quote).total_fee_paid;

        match available.checked_sub(fee) {
            Some(change) if change >= policy.dust_limit => {
                self.outputs[index].satoshis = change;
                debug!(index, change, fee, "added change output");
                Ok(ChangeOutcome::Added {
                    index,
                    satoshis: change,
                    fee,
                })
            }
            _ => {
                self.outputs.pop();
                debug!(available, fee, "change would be dust, no change added");
                Ok(ChangeOutcome::Suppressed { available })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREV_SCRIPT: &str = "76a914af2590a45ae401651fdbdf59a76ad43d1862534088ac";

    fn funded_tx(sats: u64) -> Transaction {
        let mut tx = Transaction::new();
        tx.add_input_from(
            "07912972e42095fe58daaf09161c5a5da57be47c2054dc2aaa52b30fefa1940b",
            0,
            PREV_SCRIPT,
            sats,
        )
        .expect("input");
        tx
    }

    fn change_script() -> Script {
        Script::from_hex(PREV_SCRIPT).expect("script")
    }

    #[test]
    fn test_change_added() {
        let mut tx = funded_tx(4_000_000);
        let outcome = tx
            .change(&change_script(), &FeeQuote::with_rate(50, 100))
            .expect("change");
        assert_eq!(
            outcome,
            ChangeOutcome::Added {
                index: 0,
                satoshis: 3_999_904,
                fee: 96
            }
        );
        assert_eq!(tx.outputs[0].locking_script, change_script());
        assert_eq!(tx.total_input_satoshis().expect("total") - tx.total_output_satoshis(), 96);
    }

    #[test]
    fn test_change_suppressed_below_marginal_cost() {
        let mut tx = funded_tx(1_000);
        tx.add_p2pkh_output_from_pub_key_hash(&[1u8; 20], 900);
        let outcome = tx
            .change(&change_script(), &FeeQuote::with_rate(50, 100))
            .expect("change");
        assert_eq!(outcome, ChangeOutcome::Suppressed { available: 100 });
        assert_eq!(tx.output_count(), 1);
    }

    #[test]
    fn test_change_suppressed_when_dust_after_fee() {
        // 200 clears the marginal cost (17) plus dust (136), but the full
        // fee of 113 leaves only 87.
        let mut tx = funded_tx(1_200);
        tx.add_p2pkh_output_from_pub_key_hash(&[1u8; 20], 1_000);
        let outcome = tx
            .change(&change_script(), &FeeQuote::with_rate(50, 100))
            .expect("change");
        assert_eq!(outcome, ChangeOutcome::Suppressed { available: 200 });
        assert_eq!(tx.output_count(), 1);
    }

    #[test]
    fn test_change_policy_dust_limit() {
        let mut tx = funded_tx(1_200);
        tx.add_p2pkh_output_from_pub_key_hash(&[1u8; 20], 1_000);
        let policy = ChangePolicy {
            dust_limit: 1,
            ..ChangePolicy::default()
        };
        let outcome = tx
            .change_with_policy(&change_script(), &FeeQuote::with_rate(50, 100), &policy)
            .expect("change");
        // 1 input, 2 outputs: 119 bytes + 107 placeholder = 226 -> fee 113
        assert_eq!(
            outcome,
            ChangeOutcome::Added {
                index: 1,
                satoshis: 87,
                fee: 113
            }
        );
    }

    #[test]
    fn test_change_insufficient_inputs() {
        let mut tx = funded_tx(100);
        tx.add_p2pkh_output_from_pub_key_hash(&[1u8; 20], 1_000);
        assert!(matches!(
            tx.change(&change_script(), &FeeQuote::new()),
            Err(TransactionError::InsufficientInputs {
                inputs: 100,
                outputs: 1_000
            })
        ));
    }

    #[test]
    fn test_change_error_leaves_outputs() {
        let mut tx = Transaction::new();
        tx.add_input_from(&"22".repeat(32), 0, "51", 10_000).expect("input");
        assert!(matches!(
            tx.change(&change_script(), &FeeQuote::new()),
            Err(TransactionError::UnsupportedScript { index: 0, .. })
        ));
        assert_eq!(tx.output_count(), 0);
    }

    #[test]
    fn test_change_to_address() {
        let mut tx = funded_tx(4_000_000);
        let outcome = tx
            .change_to_address(
                "mwV3YgnowbJJB3LcyCuqiKpdivvNNFiK7M",
                &Base58AddressResolver::new(),
                &FeeQuote::with_rate(50, 100),
            )
            .expect("change");
        assert!(matches!(outcome, ChangeOutcome::Added { index: 0, .. }));
        assert_eq!(tx.outputs[0].locking_script, change_script());

        let mainnet_only = Base58AddressResolver::for_network(NetworkParams::MAINNET);
        assert!(matches!(
            mainnet_only.locking_script("mwV3YgnowbJJB3LcyCuqiKpdivvNNFiK7M"),
            Err(TransactionError::Script(ScriptError::UnsupportedAddress(_)))
        ));
        assert!(Base58AddressResolver::new().locking_script("not-an-address").is_err());
    }
}
