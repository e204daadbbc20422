use proptest::prelude::*;

use bt_script::Script;
use bt_transaction::{ChangeOutcome, FeeQuote, Input, Output, SigHashFlag, Transaction, DUST_LIMIT};

const P2PKH: &str = "76a914af2590a45ae401651fdbdf59a76ad43d1862534088ac";

fn arb_input() -> impl Strategy<Value = Input> {
    (
        prop::array::uniform32(any::<u8>()),
        any::<u32>(),
        prop::collection::vec(any::<u8>(), 0..64),
        any::<u32>(),
    )
        .prop_map(|(txid, vout, script, sequence)| {
            let mut input = Input::new(txid, vout);
            input.unlocking_script = Script::from_bytes(&script);
            input.sequence_number = sequence;
            input
        })
}

fn arb_output() -> impl Strategy<Value = Output> {
    (any::<u64>(), prop::collection::vec(any::<u8>(), 0..64))
        .prop_map(|(satoshis, script)| Output::new(satoshis, Script::from_bytes(&script)))
}

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (
        any::<u32>(),
        prop::collection::vec(arb_input(), 0..4),
        prop::collection::vec(arb_output(), 0..4),
        any::<u32>(),
    )
        .prop_map(|(version, inputs, outputs, lock_time)| Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
}

/// Unsigned P2PKH inputs with known values plus a few P2PKH outputs.
fn arb_spend() -> impl Strategy<Value = Transaction> {
    (
        prop::collection::vec(1_000u64..1_000_000, 1..4),
        prop::collection::vec(1u64..500_000, 1..3),
    )
        .prop_map(|(input_values, output_values)| {
            let mut tx = Transaction::new();
            for (i, sats) in input_values.into_iter().enumerate() {
                tx.add_input_from(&format!("{:064x}", i + 1), i as u32, P2PKH, sats)
                    .expect("input");
            }
            for sats in output_values {
                tx.add_p2pkh_output_from_pub_key_hash(&[3u8; 20], sats);
            }
            tx
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn transaction_bytes_roundtrip(tx in arb_transaction()) {
        let bytes = tx.to_bytes();
        let parsed = Transaction::from_bytes(&bytes).unwrap();
        prop_assert_eq!(&parsed, &tx);
        prop_assert_eq!(parsed.to_bytes(), bytes);
        prop_assert_eq!(Transaction::from_hex(&tx.to_hex()).unwrap(), tx);
    }

    #[test]
    fn from_stream_reports_consumed_length(a in arb_transaction(), b in arb_transaction()) {
        let mut stream = a.to_bytes();
        stream.extend(b.to_bytes());
        let (first, used) = Transaction::from_stream(&stream).unwrap();
        prop_assert_eq!(used, a.to_bytes().len());
        prop_assert_eq!(first.to_hex(), a.to_hex());
        let (second, rest) = Transaction::from_stream(&stream[used..]).unwrap();
        prop_assert_eq!(rest, stream.len() - used);
        prop_assert_eq!(second.to_hex(), b.to_hex());
    }

    #[test]
    fn digest_ignores_unlocking_scripts(mut tx in arb_spend(), script in prop::collection::vec(any::<u8>(), 1..64)) {
        let before = tx.calc_input_signature_hash(0, SigHashFlag::ALL_FORKID).unwrap();
        let last = tx.input_count() - 1;
        tx.apply_unlocking_script(last, Script::from_bytes(&script)).unwrap();
        let after = tx.calc_input_signature_hash(0, SigHashFlag::ALL_FORKID).unwrap();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn change_is_never_dust(mut tx in arb_spend(), rate in 1u64..100) {
        let quote = FeeQuote::with_rate(rate, 100);
        let inputs = tx.total_input_satoshis().unwrap();
        if inputs < tx.total_output_satoshis() {
            return Ok(());
        }
        let outputs_before = tx.output_count();
        match tx.change(&Script::from_hex(P2PKH).unwrap(), &quote).unwrap() {
            ChangeOutcome::Added { index, satoshis, fee } => {
                prop_assert_eq!(index, outputs_before);
                prop_assert!(satoshis >= DUST_LIMIT);
                prop_assert_eq!(inputs - tx.total_output_satoshis(), fee);
                prop_assert!(tx.is_fee_paid_enough(&quote).unwrap());
            }
            ChangeOutcome::Suppressed { .. } => {
                prop_assert_eq!(tx.output_count(), outputs_before);
            }
        }
    }
}
