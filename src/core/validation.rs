//! Validation rules for transactions and blocks
//!
//! Transactions are checked against committed chain state (every input
//! must resolve to a committed output, every signature must verify, and
//! outputs may not exceed resolved inputs). Blocks are checked only for
//! structure and for linkage to the current tip.
//!
//! Known gap: the signature check does not confirm that an input's
//! `public_key` is the `owner_public_key` of the output it spends, and
//! nothing tracks whether an output was already spent.

use crate::core::block::Block;
use crate::core::blockchain::Blockchain;
use crate::core::transaction::Transaction;
use crate::crypto::verify_hex_signature;
use thiserror::Error;

/// Transaction validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unresolved input: no committed output {tx_hash}:{index}")]
    UnresolvedInput { tx_hash: String, index: u32 },
    #[error("Bad signature on input {0}")]
    BadSignature(usize),
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: u128, requested: u128 },
}

impl ValidationError {
    /// Stable name of the error kind, for callers that match on text
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::UnresolvedInput { .. } => "UnresolvedInput",
            ValidationError::BadSignature(_) => "BadSignature",
            ValidationError::InsufficientFunds { .. } => "InsufficientFunds",
        }
    }
}

/// Block linkage / structure failures (all of kind `InvalidBlock`)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkageError {
    #[error("Invalid block: empty hash")]
    EmptyHash,
    #[error("Invalid block: no transactions")]
    EmptyTransactions,
    #[error("Invalid block: prev_hash {found} does not match tip {expected}")]
    PrevHashMismatch { expected: String, found: String },
}

impl LinkageError {
    /// Only a prev-link mismatch can be fixed by a later parent commit
    pub fn is_parkable(&self) -> bool {
        matches!(self, LinkageError::PrevHashMismatch { .. })
    }
}

/// Verify a transaction against the chain and assign its hash.
///
/// Zero-input transactions succeed unconditionally. On failure `tx.hash`
/// is left as it was.
pub fn verify_transaction(
    tx: &mut Transaction,
    chain: &Blockchain,
) -> Result<String, ValidationError> {
    if !tx.is_coinbase() {
        let mut available: u128 = 0;
        for input in &tx.inputs {
            let output = chain
                .find_output(&input.source_tx_hash, input.source_output_index)
                .ok_or_else(|| ValidationError::UnresolvedInput {
                    tx_hash: input.source_tx_hash.clone(),
                    index: input.source_output_index,
                })?;
            available += output.amount as u128;
        }

        for (position, input) in tx.inputs.iter().enumerate() {
            if !verify_hex_signature(&input.public_key, &input.signing_message(), &input.signature)
            {
                return Err(ValidationError::BadSignature(position));
            }
        }

        let requested = tx.total_output();
        if available < requested {
            return Err(ValidationError::InsufficientFunds {
                available,
                requested,
            });
        }
    }

    tx.hash = tx.compute_hash();
    Ok(tx.hash.clone())
}

/// Check a block's structure and that it extends the current tip
pub fn verify_block_linkage(block: &Block, chain: &Blockchain) -> Result<(), LinkageError> {
    if block.hash.is_empty() {
        return Err(LinkageError::EmptyHash);
    }

    if block.transactions.is_empty() {
        return Err(LinkageError::EmptyTransactions);
    }

    if block.prev_hash != chain.tip_hash() {
        return Err(LinkageError::PrevHashMismatch {
            expected: chain.tip_hash().to_string(),
            found: block.prev_hash.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::GENESIS_PREV_HASH;
    use crate::core::transaction::{TransactionInput, TransactionOutput};
    use crate::crypto::KeyPair;

    fn funded_chain(owner: &KeyPair) -> Blockchain {
        Blockchain::with_genesis(Block::genesis(&owner.public_key_hex(), 100))
            .expect("genesis commits")
    }

    fn spend(chain: &Blockchain, from: &KeyPair, outputs: Vec<TransactionOutput>) -> Transaction {
        let genesis_tx = &chain.blocks()[0].transactions[0];
        let mut tx = Transaction::new(
            vec![TransactionInput::new(&genesis_tx.hash, 0, &from.public_key_hex())],
            outputs,
        )
        .unwrap();
        tx.sign(from).unwrap();
        tx
    }

    #[test]
    fn test_valid_transfer_gets_deterministic_hash() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let chain = funded_chain(&alice);

        let mut tx = spend(
            &chain,
            &alice,
            vec![
                TransactionOutput::new(5, &bob.public_key_hex()),
                TransactionOutput::new(95, &alice.public_key_hex()),
            ],
        );

        let hash = verify_transaction(&mut tx, &chain).unwrap();
        assert!(!hash.is_empty());
        assert_eq!(tx.hash, hash);

        // Re-verifying reproduces the same hash
        let again = verify_transaction(&mut tx, &chain).unwrap();
        assert_eq!(again, hash);
    }

    #[test]
    fn test_overspend_is_insufficient_funds() {
        let alice = KeyPair::generate();
        let chain = funded_chain(&alice);

        let mut tx = spend(
            &chain,
            &alice,
            vec![TransactionOutput::new(101, &alice.public_key_hex())],
        );

        let err = verify_transaction(&mut tx, &chain).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InsufficientFunds {
                available: 100,
                requested: 101
            }
        );
        assert!(tx.hash.is_empty());
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let alice = KeyPair::generate();
        let chain = funded_chain(&alice);

        let mut tx = spend(
            &chain,
            &alice,
            vec![TransactionOutput::new(10, &alice.public_key_hex())],
        );
        let mut bytes = hex::decode(&tx.inputs[0].signature).unwrap();
        bytes[10] ^= 0x01;
        tx.inputs[0].signature = hex::encode(bytes);

        let err = verify_transaction(&mut tx, &chain).unwrap_err();
        assert_eq!(err, ValidationError::BadSignature(0));
        assert_eq!(err.kind(), "BadSignature");
    }

    #[test]
    fn test_unknown_source_is_unresolved() {
        let alice = KeyPair::generate();
        let chain = funded_chain(&alice);

        let mut tx = Transaction::new(
            vec![TransactionInput::new("ab".repeat(32).as_str(), 0, &alice.public_key_hex())],
            vec![TransactionOutput::new(1, &alice.public_key_hex())],
        )
        .unwrap();
        tx.sign(&alice).unwrap();

        let err = verify_transaction(&mut tx, &chain).unwrap_err();
        assert_eq!(err.kind(), "UnresolvedInput");
    }

    #[test]
    fn test_out_of_range_index_is_unresolved() {
        let alice = KeyPair::generate();
        let chain = funded_chain(&alice);
        let genesis_tx = chain.blocks()[0].transactions[0].hash.clone();

        let mut tx = Transaction::new(
            vec![TransactionInput::new(&genesis_tx, 1, &alice.public_key_hex())],
            vec![TransactionOutput::new(1, &alice.public_key_hex())],
        )
        .unwrap();
        tx.sign(&alice).unwrap();

        assert!(matches!(
            verify_transaction(&mut tx, &chain),
            Err(ValidationError::UnresolvedInput { index: 1, .. })
        ));
    }

    #[test]
    fn test_foreign_key_signature_is_accepted() {
        // Ownership of the spent output is not checked.
        let alice = KeyPair::generate();
        let mallory = KeyPair::generate();
        let chain = funded_chain(&alice);

        let mut tx = spend(
            &chain,
            &mallory,
            vec![TransactionOutput::new(100, &mallory.public_key_hex())],
        );
        assert!(verify_transaction(&mut tx, &chain).is_ok());
    }

    #[test]
    fn test_zero_input_transaction_passes() {
        let chain = Blockchain::new();
        let mut tx = Transaction::new(vec![], vec![TransactionOutput::new(7, "x")]).unwrap();
        let hash = verify_transaction(&mut tx, &chain).unwrap();
        assert_eq!(hash, tx.compute_hash());
    }

    #[test]
    fn test_linkage_distinguishes_causes() {
        let chain = funded_chain(&KeyPair::generate());
        let tip = chain.tip_hash().to_string();

        let mut no_hash = Block::new(vec![Transaction::coinbase("a", 1)], &tip, 1, 4);
        assert_eq!(
            verify_block_linkage(&no_hash, &chain),
            Err(LinkageError::EmptyHash)
        );

        no_hash.set_hash();
        assert!(verify_block_linkage(&no_hash, &chain).is_ok());

        let mut empty = Block::new(vec![], &tip, 1, 4);
        empty.set_hash();
        let err = verify_block_linkage(&empty, &chain).unwrap_err();
        assert_eq!(err, LinkageError::EmptyTransactions);
        assert!(!err.is_parkable());

        let mut stale = Block::new(vec![Transaction::coinbase("a", 1)], "ff", 1, 4);
        stale.set_hash();
        let err = verify_block_linkage(&stale, &chain).unwrap_err();
        assert!(err.is_parkable());
    }

    #[test]
    fn test_multiple_inputs_sum_and_sign_independently() {
        let alice = KeyPair::generate();
        let owner = alice.public_key_hex();

        let mut funding = Transaction::new(
            vec![],
            vec![
                TransactionOutput::new(60, &owner),
                TransactionOutput::new(40, &owner),
            ],
        )
        .unwrap();
        funding.hash = funding.compute_hash();
        let mut genesis = Block::new(vec![funding.clone()], GENESIS_PREV_HASH, 0, 4);
        genesis.set_hash();
        let chain = Blockchain::with_genesis(genesis).unwrap();

        let spend_both = |total: u64| {
            let mut tx = Transaction::new(
                vec![
                    TransactionInput::new(&funding.hash, 0, &owner),
                    TransactionInput::new(&funding.hash, 1, &owner),
                ],
                vec![TransactionOutput::new(total, &owner)],
            )
            .unwrap();
            tx.sign(&alice).unwrap();
            tx
        };

        let mut exact = spend_both(100);
        assert!(verify_transaction(&mut exact, &chain).is_ok());

        let mut over = spend_both(101);
        assert_eq!(
            verify_transaction(&mut over, &chain).unwrap_err(),
            ValidationError::InsufficientFunds {
                available: 100,
                requested: 101
            }
        );

        let mut tampered = spend_both(100);
        let mut bytes = hex::decode(&tampered.inputs[1].signature).unwrap();
        bytes[0] ^= 0x01;
        tampered.inputs[1].signature = hex::encode(bytes);
        assert_eq!(
            verify_transaction(&mut tampered, &chain).unwrap_err(),
            ValidationError::BadSignature(1)
        );
    }
}
