//! File-backed encrypted JSON store.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use super::crypto;

/// Errors that can occur while reading or writing the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decrypt store: {0}")]
    Decryption(String),

    #[error("Store contents are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Cryptographic failure: {0}")]
    Crypto(&'static str),
}

/// Result of a [`CipherStore::write`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A freshly encrypted file replaced the previous contents.
    Written,
    /// The serialized document matched the last one seen; nothing was written.
    Unchanged,
}

/// Encrypted JSON document stored in a single file.
///
/// Remembers the plaintext it last read or wrote so that writing back an
/// unchanged document costs neither a key derivation nor a disk write.
#[derive(Debug)]
pub struct CipherStore {
    path: PathBuf,
    last_plaintext: Option<String>,
}

impl CipherStore {
    /// Creates a store backed by the file at `path`. Nothing is read yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_plaintext: None,
        }
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and decrypts the document.
    ///
    /// A missing file yields `T::default()`.
    pub async fn read<T>(&mut self, passphrase: &SecretString) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        let blob = match tokio::fs::read(&self.path).await {
            Ok(blob) => blob,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No store file at {}, starting empty", self.path.display());
                self.last_plaintext = None;
                return Ok(T::default());
            }
            Err(e) => return Err(e.into()),
        };

        let plaintext = crypto::decrypt(&blob, passphrase.expose_secret().as_bytes())?;
        let plaintext = String::from_utf8(plaintext).map_err(|e| {
            StoreError::Parse(serde::de::Error::custom(format!(
                "plaintext is not UTF-8: {e}"
            )))
        })?;

        let value = serde_json::from_str(&plaintext)?;
        debug!(
            "Decrypted store {} ({} bytes of plaintext)",
            self.path.display(),
            plaintext.len()
        );
        self.last_plaintext = Some(plaintext);
        Ok(value)
    }

    /// Encrypts and writes the document, replacing the previous file.
    ///
    /// Skipped when the serialized document is identical to the plaintext
    /// most recently read or written by this store.
    pub async fn write<T>(
        &mut self,
        value: &T,
        passphrase: &SecretString,
    ) -> Result<WriteOutcome, StoreError>
    where
        T: Serialize + ?Sized,
    {
        let plaintext = serde_json::to_string_pretty(value)?;

        if self.last_plaintext.as_deref() == Some(plaintext.as_str()) {
            debug!("Store {} unchanged, skipping write", self.path.display());
            return Ok(WriteOutcome::Unchanged);
        }

        let blob = crypto::encrypt(plaintext.as_bytes(), passphrase.expose_secret().as_bytes())?;

        let tmp_path = temp_path_for(&self.path);
        tokio::fs::write(&tmp_path, &blob).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        info!(
            "Wrote store {} ({} bytes encrypted)",
            self.path.display(),
            blob.len()
        );
        self.last_plaintext = Some(plaintext);
        Ok(WriteOutcome::Written)
    }
}

/// Sibling path used for write-then-rename replacement.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("store"), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}
