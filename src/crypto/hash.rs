//! Cryptographic hashing utilities for the ledger
//!
//! Provides the SHA-256 based digests used for transaction hashes,
//! block hashes and signed input messages.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// SHA-256 applied to the *hex text* of a first SHA-256 digest.
///
/// Block hashes are defined this way: the outer digest is taken over the
/// 64 ASCII characters of the inner hex digest, not over its raw bytes.
pub fn chained_sha256_hex(data: &[u8]) -> String {
    let inner = sha256_hex(data);
    sha256_hex(inner.as_bytes())
}
