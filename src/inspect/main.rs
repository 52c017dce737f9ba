//! Standalone inspector for notifier store files.
//!
//! Decrypts a store file and prints its contents, or encrypts a plaintext
//! JSON document into a store file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use secrecy::SecretString;

// Import from the main crate
use subscription_notifier::notifier::StoreDocument;
use subscription_notifier::store::CipherStore;

/// Notifier store inspector.
#[derive(Parser, Debug)]
#[command(name = "inspect_store")]
#[command(about = "Decrypts, prints and imports notifier store files")]
#[command(version)]
struct Args {
    /// Path to the encrypted store file.
    store: PathBuf,

    /// Store passphrase (the bot token unless configured otherwise).
    passphrase: String,

    /// Print only the subscriber ids, one per line.
    #[arg(short, long)]
    subscribers: bool,

    /// Encrypt this plaintext JSON document into the store, replacing it.
    #[arg(long)]
    import: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let passphrase = SecretString::from(args.passphrase.clone());
    let mut store = CipherStore::new(&args.store);

    if let Some(source) = &args.import {
        return import(&mut store, source, &passphrase).await;
    }

    inspect(&mut store, &passphrase, args.subscribers).await
}

async fn inspect(store: &mut CipherStore, passphrase: &SecretString, ids_only: bool) -> ExitCode {
    match tokio::fs::try_exists(store.path()).await {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("✗ No store file at {}", store.path().display());
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("✗ Failed to access {}: {e}", store.path().display());
            return ExitCode::FAILURE;
        }
    }

    let document: StoreDocument = match store.read(passphrase).await {
        Ok(document) => document,
        Err(e) => {
            eprintln!("✗ Failed to read {}: {e}", store.path().display());
            return ExitCode::FAILURE;
        }
    };

    if ids_only {
        for (subscriber_id, _) in &document.subscriptions {
            println!("{subscriber_id}");
        }
        return ExitCode::SUCCESS;
    }

    match serde_json::to_string_pretty(&document) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to render store: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn import(store: &mut CipherStore, source: &Path, passphrase: &SecretString) -> ExitCode {
    let content = match tokio::fs::read_to_string(source).await {
        Ok(content) => content,
        Err(e) => {
            eprintln!("✗ Failed to read {}: {e}", source.display());
            return ExitCode::FAILURE;
        }
    };

    let document: StoreDocument = match serde_json::from_str(&content) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("✗ {} is not a valid store document: {e}", source.display());
            return ExitCode::FAILURE;
        }
    };

    match store.write(&document, passphrase).await {
        Ok(_) => {
            println!(
                "✓ Imported {} subscription(s) into {}",
                document.subscriptions.len(),
                store.path().display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write store: {e}");
            ExitCode::FAILURE
        }
    }
}
