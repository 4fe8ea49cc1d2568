//! Transaction handling for the ledger
//!
//! Implements a UTXO-style value transfer: each input points at an output
//! of an already committed transaction and carries a signature proving the
//! spender holds a key; each output credits an amount to a public key.

use crate::crypto::{sha256_hex, KeyError, KeyPair};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Transaction construction and signing errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction must have at least one output")]
    NoOutputs,
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

// =============================================================================
// Transaction Input
// =============================================================================

/// Transaction input (reference to a previous output)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionInput {
    /// Hash of the transaction holding the spent output
    pub source_tx_hash: String,
    /// Position of the spent output in that transaction
    pub source_output_index: u32,
    /// Hex compact signature, empty until signed
    #[serde(default)]
    pub signature: String,
    /// Hex public key the signature is checked against
    pub public_key: String,
}

impl TransactionInput {
    /// Create an unsigned input
    pub fn new(source_tx_hash: &str, source_output_index: u32, public_key: &str) -> Self {
        Self {
            source_tx_hash: source_tx_hash.to_string(),
            source_output_index,
            signature: String::new(),
            public_key: public_key.to_string(),
        }
    }

    /// The byte string covered by this input's signature
    pub fn signing_message(&self) -> Vec<u8> {
        format!("{}{}", self.source_tx_hash, self.source_output_index).into_bytes()
    }
}

// =============================================================================
// Transaction Output
// =============================================================================

/// Transaction output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionOutput {
    /// Amount of coins
    pub amount: u64,
    /// Hex public key of the recipient
    pub owner_public_key: String,
}

impl TransactionOutput {
    pub fn new(amount: u64, owner_public_key: &str) -> Self {
        Self {
            amount,
            owner_public_key: owner_public_key.to_string(),
        }
    }

    /// Check if this output is credited to the given public key
    pub fn is_owned_by(&self, public_key: &str) -> bool {
        self.owner_public_key == public_key
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Borrowed view hashed to produce a transaction's identity.
///
/// Field order is fixed by declaration order, so the JSON text is stable.
#[derive(Serialize)]
struct CanonicalTransaction<'a> {
    inputs: &'a [TransactionInput],
    outputs: &'a [TransactionOutput],
}

/// Wire form; converted into [`Transaction`] only if it has outputs.
#[derive(Deserialize)]
struct TransactionData {
    #[serde(default)]
    hash: String,
    #[serde(default)]
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
}

impl TryFrom<TransactionData> for Transaction {
    type Error = TransactionError;

    fn try_from(data: TransactionData) -> Result<Self, Self::Error> {
        let mut tx = Transaction::new(data.inputs, data.outputs)?;
        tx.hash = data.hash;
        Ok(tx)
    }
}

/// A ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "TransactionData")]
pub struct Transaction {
    /// Transaction hash, empty until verification succeeds
    pub hash: String,
    /// Transaction inputs
    pub inputs: Vec<TransactionInput>,
    /// Transaction outputs (never empty)
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    /// Create a new unsigned, unverified transaction
    pub fn new(
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
    ) -> Result<Self, TransactionError> {
        if outputs.is_empty() {
            return Err(TransactionError::NoOutputs);
        }

        Ok(Self {
            hash: String::new(),
            inputs,
            outputs,
        })
    }

    /// Create a zero-input transaction crediting `amount` to `owner_public_key`.
    ///
    /// Used for the genesis block; the hash is assigned immediately since
    /// such transactions are never routed through verification.
    pub fn coinbase(owner_public_key: &str, amount: u64) -> Self {
        let mut tx = Self {
            hash: String::new(),
            inputs: Vec::new(),
            outputs: vec![TransactionOutput::new(amount, owner_public_key)],
        };
        tx.hash = tx.compute_hash();
        tx
    }

    /// Whether this transaction spends nothing
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Whether verification has assigned a hash
    pub fn is_verified(&self) -> bool {
        !self.hash.is_empty()
    }

    /// SHA-256 over the canonical JSON of `(inputs, outputs)`.
    ///
    /// Signatures and public keys are included; the `hash` field is not.
    pub fn compute_hash(&self) -> String {
        let canonical = CanonicalTransaction {
            inputs: &self.inputs,
            outputs: &self.outputs,
        };
        // Only strings and integers: serialization cannot fail.
        let encoded = serde_json::to_vec(&canonical).unwrap_or_default();
        sha256_hex(&encoded)
    }

    /// Sign every input with the given key pair.
    ///
    /// Each signature covers `source_tx_hash ‖ source_output_index`.
    /// Leaves `hash` untouched.
    pub fn sign(&mut self, key_pair: &KeyPair) -> Result<(), TransactionError> {
        for input in &mut self.inputs {
            input.signature = key_pair.sign_hex(&input.signing_message())?;
        }
        Ok(())
    }

    /// Sign every input with a hex-encoded private key
    pub fn sign_with_private_key(&mut self, private_key_hex: &str) -> Result<(), TransactionError> {
        let key_pair = KeyPair::from_private_key_hex(private_key_hex)?;
        self.sign(&key_pair)
    }

    /// Sum of all output amounts
    pub fn total_output(&self) -> u128 {
        self.outputs.iter().map(|o| o.amount as u128).sum()
    }
}
