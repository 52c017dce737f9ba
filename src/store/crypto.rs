//! Passphrase-based AES-256-GCM sealing of store blobs.
//!
//! Blob layout: `salt[16] || nonce[12] || ciphertext || tag[16]`.
//! Every call to [`encrypt`] draws a fresh salt and nonce from the system
//! CSPRNG, so no nonce is ever reused under the same key.

use std::num::NonZeroU32;

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

use super::{KEY_LEN, NONCE_LEN, PBKDF2_ITERATIONS, SALT_LEN, StoreError, TAG_LEN};

/// Derives the AES-256 key for `salt` from the passphrase.
fn derive_key(passphrase: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, StoreError> {
    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS)
        .ok_or(StoreError::Crypto("PBKDF2 iteration count must be non-zero"))?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        passphrase,
        &mut key[..],
    );
    Ok(key)
}

fn cipher_key(key: &[u8; KEY_LEN]) -> Result<LessSafeKey, StoreError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| StoreError::Crypto("failed to create AES-256-GCM key"))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypts `plaintext` under `passphrase` into a self-contained blob.
pub fn encrypt(plaintext: &[u8], passphrase: &[u8]) -> Result<Vec<u8>, StoreError> {
    let rng = SystemRandom::new();

    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| StoreError::Crypto("failed to generate random salt"))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| StoreError::Crypto("failed to generate random nonce"))?;

    let key = derive_key(passphrase, &salt)?;
    let sealing_key = cipher_key(&key)?;

    let mut in_out = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| StoreError::Crypto("AES-256-GCM encryption failed"))?;

    let mut blob = Vec::with_capacity(SALT_LEN + NONCE_LEN + in_out.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&in_out);
    Ok(blob)
}

/// Decrypts a blob produced by [`encrypt`].
///
/// Fails with [`StoreError::Decryption`] when the blob is truncated, was
/// tampered with, or was sealed under a different passphrase.
pub fn decrypt(blob: &[u8], passphrase: &[u8]) -> Result<Vec<u8>, StoreError> {
    if blob.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
        return Err(StoreError::Decryption(format!(
            "store file is {} bytes, shorter than the {} byte minimum",
            blob.len(),
            SALT_LEN + NONCE_LEN + TAG_LEN
        )));
    }

    let (salt, rest) = blob.split_at(SALT_LEN);
    let (nonce_slice, ciphertext) = rest.split_at(NONCE_LEN);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(nonce_slice);

    let key = derive_key(passphrase, salt)?;
    let opening_key = cipher_key(&key)?;

    let mut in_out = ciphertext.to_vec();
    let plaintext = opening_key
        .open_in_place(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| {
            StoreError::Decryption("authentication failed: wrong passphrase or corrupted file".to_owned())
        })?;

    Ok(plaintext.to_vec())
}
