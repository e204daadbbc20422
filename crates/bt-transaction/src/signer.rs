//! Signing strategies and the transaction signing entry points.
//!
//! A `Signer` turns a digest into `(public_key, der_signature)`. The
//! transaction computes the digest, calls the signer once per input and
//! embeds the result in a P2PKH unlocking script; it never touches a
//! private key itself. Signers may wrap a local key, derive a child key
//! first, or delegate to a remote service or hardware device. Their errors
//! are returned unchanged and never retried.

use bt_primitives::ec::{PrivateKey, PublicKey};
use bt_primitives::hash::hash160;
use bt_script::Script;
use tracing::debug;

use crate::sighash::SigHashFlag;
use crate::transaction::Transaction;
use crate::TransactionError;

/// A public key and a DER signature, both as raw bytes.
pub type SignatureResult = (Vec<u8>, Vec<u8>);

/// Produces signatures over transaction digests.
pub trait Signer {
    /// Sign a 32-byte digest.
    ///
    /// # Returns
    /// The public key to place in the unlocking script and the DER
    /// signature, without the sighash byte.
    fn sign_hash(&self, hash: &[u8; 32]) -> Result<SignatureResult, TransactionError>;

    /// Sign input `index` of `tx` under `flag`.
    ///
    /// The default computes the signature hash and passes it to
    /// `sign_hash`.
    fn sign(
        &self,
        tx: &Transaction,
        index: usize,
        flag: SigHashFlag,
    ) -> Result<SignatureResult, TransactionError> {
        let hash = tx.calc_input_signature_hash(index, flag)?;
        self.sign_hash(&hash)
    }
}

/// A signer that can report its public key up front, so the inputs it is
/// able to sign can be found before signing.
pub trait AutoSigner: Signer {
    /// Compressed SEC1 public key of the signing key.
    fn public_key(&self) -> Result<Vec<u8>, TransactionError>;
}

/// Signs with a private key held in memory.
#[derive(Clone, Debug)]
pub struct LocalSigner {
    private_key: PrivateKey,
}

impl LocalSigner {
    /// A signer for `private_key`.
    pub fn new(private_key: PrivateKey) -> Self {
        LocalSigner { private_key }
    }

    /// The key this signer signs with.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

impl Signer for LocalSigner {
    /// Signs with RFC6979 nonces and low-S normalisation. The public key is
    /// serialized in the form the private key was created with (compressed
    /// unless imported from an uncompressed WIF).
    fn sign_hash(&self, hash: &[u8; 32]) -> Result<SignatureResult, TransactionError> {
        let signature = self.private_key.sign(hash)?;
        Ok((self.private_key.pub_key().to_bytes(), signature.to_der()))
    }
}

impl AutoSigner for LocalSigner {
    fn public_key(&self) -> Result<Vec<u8>, TransactionError> {
        Ok(self.private_key.pub_key().to_bytes())
    }
}

/// Maps a root key to the child key that actually signs.
pub trait KeyDeriver {
    /// The child key derived from `root`.
    fn derive(&self, root: &PrivateKey) -> Result<PrivateKey, TransactionError>;
}

/// BRC-42 derivation: the child shared with `counterparty` under
/// `invoice_number`.
#[derive(Clone, Debug)]
pub struct Brc42Deriver {
    pub counterparty: PublicKey,
    pub invoice_number: String,
}

impl Brc42Deriver {
    /// Derive for `counterparty` under `invoice_number`.
    pub fn new(counterparty: PublicKey, invoice_number: impl Into<String>) -> Self {
        Brc42Deriver {
            counterparty,
            invoice_number: invoice_number.into(),
        }
    }
}

impl KeyDeriver for Brc42Deriver {
    fn derive(&self, root: &PrivateKey) -> Result<PrivateKey, TransactionError> {
        Ok(root.derive_child(&self.counterparty, &self.invoice_number)?)
    }
}

/// Derives a child of `root` with `D` on each call and signs with it as a
/// `LocalSigner` would.
#[derive(Clone, Debug)]
pub struct DerivedKeySigner<D: KeyDeriver> {
    root: PrivateKey,
    deriver: D,
}

impl<D: KeyDeriver> DerivedKeySigner<D> {
    /// Sign with the key `deriver` derives from `root`.
    pub fn new(root: PrivateKey, deriver: D) -> Self {
        DerivedKeySigner { root, deriver }
    }

    /// The signer for the derived child key.
    pub fn child_signer(&self) -> Result<LocalSigner, TransactionError> {
        Ok(LocalSigner::new(self.deriver.derive(&self.root)?))
    }
}

impl<D: KeyDeriver> Signer for DerivedKeySigner<D> {
    fn sign_hash(&self, hash: &[u8; 32]) -> Result<SignatureResult, TransactionError> {
        self.child_signer()?.sign_hash(hash)
    }
}

impl<D: KeyDeriver> AutoSigner for DerivedKeySigner<D> {
    fn public_key(&self) -> Result<Vec<u8>, TransactionError> {
        self.child_signer()?.public_key()
    }
}

/// Whether `script` pays to the hash of `pub_key`.
///
/// This is the rule `sign_all_matching_keys` uses to pick inputs; scripts
/// without an embedded public key hash never match.
pub fn signer_matches_script(pub_key: &[u8], script: &Script) -> bool {
    script
        .public_key_hash()
        .map_or(false, |pkh| pkh == hash160(pub_key).as_slice())
}

/// A zero flag means "use the default".
pub(crate) fn flag_or_default(flag: SigHashFlag) -> SigHashFlag {
    if flag.0 == 0 {
        SigHashFlag::ALL_FORKID
    } else {
        flag
    }
}

impl Transaction {
    /// Sign input `index` with `signer` and apply a P2PKH unlocking script.
    ///
    /// A zero flag is treated as `ALL|FORKID`.
    pub fn sign_input<S: Signer + ?Sized>(
        &mut self,
        index: usize,
        signer: &S,
        flag: SigHashFlag,
    ) -> Result<(), TransactionError> {
        let flag = flag_or_default(flag);
        let (pub_key, sig) = signer.sign(self, index, flag)?;
        self.apply_p2pkh_unlocking_script(index, &pub_key, &sig, flag)?;
        debug!(index, %flag, "signed input");
        Ok(())
    }

    /// Like `sign_input`, but computes the digest here and hands the signer
    /// only the hash.
    pub fn sign_input_hash<S: Signer + ?Sized>(
        &mut self,
        index: usize,
        signer: &S,
        flag: SigHashFlag,
    ) -> Result<(), TransactionError> {
        let flag = flag_or_default(flag);
        let hash = self.calc_input_signature_hash(index, flag)?;
        let (pub_key, sig) = signer.sign_hash(&hash)?;
        self.apply_p2pkh_unlocking_script(index, &pub_key, &sig, flag)?;
        debug!(index, %flag, "signed input hash");
        Ok(())
    }

    /// Sign, with `ALL|FORKID`, every input whose previous locking script
    /// pays to the signer's public key hash.
    ///
    /// # Returns
    /// The indices of the inputs signed, in order.
    pub fn sign_all_matching_keys<S: AutoSigner + ?Sized>(
        &mut self,
        signer: &S,
    ) -> Result<Vec<usize>, TransactionError> {
        let pub_key = signer.public_key()?;
        let matching: Vec<usize> = self
            .inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| {
                input
                    .previous_locking_script()
                    .map_or(false, |script| signer_matches_script(&pub_key, script))
            })
            .map(|(i, _)| i)
            .collect();

        for &index in &matching {
            self.sign_input(index, signer, SigHashFlag::ALL_FORKID)?;
        }
        debug!(signed = matching.len(), inputs = self.inputs.len(), "auto-signed inputs");
        Ok(matching)
    }

    /// Set input `index`'s unlocking script to `<sig || flag> <pub_key>`.
    pub fn apply_p2pkh_unlocking_script(
        &mut self,
        index: usize,
        pub_key: &[u8],
        der_sig: &[u8],
        flag: SigHashFlag,
    ) -> Result<(), TransactionError> {
        let script = Script::p2pkh_unlocking_script(pub_key, der_sig, flag.0 as u8)?;
        self.apply_unlocking_script(index, script)
    }

    /// Set input `index`'s unlocking script.
    pub fn apply_unlocking_script(&mut self, index: usize, script: Script) -> Result<(), TransactionError> {
        self.input_mut(index)?.unlocking_script = script;
        Ok(())
    }
}
