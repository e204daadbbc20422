//! Unlockers: per-script-type strategies for filling in unlocking scripts.
//!
//! Where a `Signer` only produces signatures, an `Unlocker` owns the whole
//! job of unlocking one input, including choosing the unlocking script
//! layout. An `UnlockerGetter` picks the unlocker for each previous locking
//! script so a whole transaction can be unlocked in one call.

use bt_primitives::ec::PrivateKey;
use bt_script::Script;

use crate::sighash::SigHashFlag;
use crate::signer::{flag_or_default, LocalSigner, Signer};
use crate::transaction::Transaction;
use crate::TransactionError;

/// Fills in the unlocking script of one input.
pub trait Unlocker {
    /// Set the unlocking script of input `index`, signing with `flag`.
    fn unlock(&self, tx: &mut Transaction, index: usize, flag: SigHashFlag) -> Result<(), TransactionError>;
}

/// Chooses an `Unlocker` for a previous locking script.
pub trait UnlockerGetter {
    /// The unlocker for inputs spending `locking_script`.
    fn unlocker(&self, locking_script: &Script) -> Result<Box<dyn Unlocker + '_>, TransactionError>;
}

/// Unlocks P2PKH inputs with signatures from `S`.
#[derive(Clone, Debug)]
pub struct P2PKHUnlocker<S: Signer> {
    signer: S,
}

impl<S: Signer> P2PKHUnlocker<S> {
    pub fn new(signer: S) -> Self {
        P2PKHUnlocker { signer }
    }
}

impl<S: Signer> Unlocker for P2PKHUnlocker<S> {
    /// # Returns
    /// `UnsupportedScript` if the input does not spend a P2PKH output.
    fn unlock(&self, tx: &mut Transaction, index: usize, flag: SigHashFlag) -> Result<(), TransactionError> {
        let script = tx
            .input(index)?
            .previous_locking_script()
            .ok_or(TransactionError::MissingPreviousOutputData(index))?;
        if !script.is_p2pkh() {
            return Err(TransactionError::UnsupportedScript {
                index,
                script_type: script.script_type().to_string(),
            });
        }
        tx.sign_input(index, &self.signer, flag)
    }
}

/// Hands out P2PKH unlockers backed by a single local key.
#[derive(Clone, Debug)]
pub struct LocalUnlockerGetter {
    private_key: PrivateKey,
}

impl LocalUnlockerGetter {
    pub fn new(private_key: PrivateKey) -> Self {
        LocalUnlockerGetter { private_key }
    }
}

impl UnlockerGetter for LocalUnlockerGetter {
    fn unlocker(&self, _locking_script: &Script) -> Result<Box<dyn Unlocker + '_>, TransactionError> {
        Ok(Box::new(P2PKHUnlocker::new(LocalSigner::new(
            self.private_key.clone(),
        ))))
    }
}

impl Transaction {
    /// Unlock input `index` with `unlocker`. A zero flag is treated as
    /// `ALL|FORKID`.
    pub fn unlock(
        &mut self,
        unlocker: &dyn Unlocker,
        index: usize,
        flag: SigHashFlag,
    ) -> Result<(), TransactionError> {
        unlocker.unlock(self, index, flag_or_default(flag))
    }

    /// Unlock every input with `ALL|FORKID`, asking `getter` for the
    /// unlocker of each previous locking script.
    ///
    /// Stops at the first failure; inputs before it stay unlocked.
    pub fn unlock_all(&mut self, getter: &dyn UnlockerGetter) -> Result<(), TransactionError> {
        for index in 0..self.inputs.len() {
            let script = self.inputs[index]
                .previous_locking_script()
                .cloned()
                .ok_or(TransactionError::MissingPreviousOutputData(index))?;
            let unlocker = getter.unlocker(&script)?;
            self.unlock(unlocker.as_ref(), index, SigHashFlag::ALL_FORKID)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIF: &str = "cNGwGSc7KRrTmdLUZ54fiSXWbhLNDc2Eg5zNucgQxyQCzuQ5YRDq";

    #[test]
    fn test_unlock_rejects_non_p2pkh() {
        let key = PrivateKey::from_wif(WIF).expect("wif");
        let mut tx = Transaction::new();
        tx.add_input_from(&"44".repeat(32), 1, "006a0568656c6c6f", 1_000)
            .expect("input");
        let unlocker = P2PKHUnlocker::new(LocalSigner::new(key));
        assert!(matches!(
            tx.unlock(&unlocker, 0, SigHashFlag::ALL_FORKID),
            Err(TransactionError::UnsupportedScript { index: 0, .. })
        ));
        assert!(!tx.inputs[0].is_signed());
    }

    #[test]
    fn test_unlock_all_requires_previous_outputs() {
        let key = PrivateKey::from_wif(WIF).expect("wif");
        let mut tx = Transaction::new();
        tx.add_input(crate::Input::new([9u8; 32], 0));
        assert!(matches!(
            tx.unlock_all(&LocalUnlockerGetter::new(key)),
            Err(TransactionError::MissingPreviousOutputData(0))
        ));
    }
}
