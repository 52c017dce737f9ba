//! Encrypted persistence module.
//!
//! Stores a single JSON document in a file sealed with AES-256-GCM under a
//! passphrase-derived key. The store knows nothing about what the document
//! contains.

mod cipher;
mod crypto;

pub use cipher::{CipherStore, StoreError, WriteOutcome};
pub use crypto::{decrypt, encrypt};

/// Length of the random PBKDF2 salt at the start of a store file.
pub const SALT_LEN: usize = 16;

/// Length of the AES-GCM nonce that follows the salt.
pub const NONCE_LEN: usize = 12;

/// Length of the GCM authentication tag appended to the ciphertext.
pub const TAG_LEN: usize = 16;

/// Length of the derived AES-256 key.
pub const KEY_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256 iteration count.
///
/// Changing this makes existing store files unreadable.
pub const PBKDF2_ITERATIONS: u32 = 100_000;
