//! Single-run notifier orchestration.
//!
//! One run is strictly sequential:
//! 1. Read the encrypted store document (empty if no file yet)
//! 2. Drain pending updates from the persisted cursor, applying subscriber
//!    commands to the registry and replying to each
//! 3. Persist the registry and the advanced cursor
//! 4. Call the handler once per remaining subscription, in registry order,
//!    replacing records it returns
//! 5. Persist again (skipped by the store when nothing changed)
//!
//! Any error aborts the run at the point it happens. Whatever was persisted
//! before that point stays persisted.

use secrecy::SecretString;
use thiserror::Error;
use tracing::{debug, info};

use super::StoreDocument;
use crate::commands::CommandHandler;
use crate::handler::{HandlerError, SubscriptionHandler};
use crate::store::{CipherStore, StoreError};
use crate::telegram::{BotApi, TelegramError, UpdateCursor, poll_updates};

/// Errors that abort a notifier run.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error("Handler failed for subscriber {subscriber}: {source}")]
    Handler {
        subscriber: String,
        #[source]
        source: HandlerError,
    },
}

/// What a completed run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Updates consumed from the Bot API.
    pub updates: usize,

    /// Subscriptions passed to the handler.
    pub subscriptions: usize,

    /// Cursor persisted at the end of the run.
    pub cursor: UpdateCursor,
}

/// Ties the store, the bot and the handler together for one run.
pub struct Notifier<A> {
    api: A,
    store: CipherStore,
    passphrase: SecretString,
    handler: Box<dyn SubscriptionHandler>,
    clock: Option<fn() -> i64>,
}

impl<A: BotApi> Notifier<A> {
    /// Creates a new notifier.
    #[must_use]
    pub fn new(
        api: A,
        store: CipherStore,
        passphrase: SecretString,
        handler: Box<dyn SubscriptionHandler>,
    ) -> Self {
        Self {
            api,
            store,
            passphrase,
            handler,
            clock: None,
        }
    }

    /// Replaces the clock used to stamp new subscriptions.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Gets a reference to the Bot API client.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Performs one complete run.
    pub async fn run(&mut self) -> Result<RunSummary, NotifierError> {
        let mut document: StoreDocument = self.store.read(&self.passphrase).await?;
        info!(
            "Loaded {} subscription(s), resuming after update {}",
            document.subscriptions.len(),
            document.offset.last_update_id()
        );

        let mut cursor = document.offset;
        let updates = {
            let mut commands = CommandHandler::new(&mut document.subscriptions, &self.api);
            if let Some(clock) = self.clock {
                commands = commands.with_clock(clock);
            }
            poll_updates(&self.api, &mut cursor, &mut commands).await?
        };
        document.offset = cursor;
        info!(
            "Processed {} update(s), {} subscription(s) active",
            updates,
            document.subscriptions.len()
        );

        self.store.write(&document, &self.passphrase).await?;

        let subscriptions = document.subscriptions.len();
        for (subscriber_id, record) in &mut document.subscriptions {
            debug!("Running handler for {}", subscriber_id);
            let updated = self
                .handler
                .update_subscription(subscriber_id, record, &self.api)
                .await
                .map_err(|source| NotifierError::Handler {
                    subscriber: subscriber_id.clone(),
                    source,
                })?;

            if let Some(updated) = updated {
                *record = updated;
            }
        }

        self.store.write(&document, &self.passphrase).await?;

        Ok(RunSummary {
            updates,
            subscriptions,
            cursor,
        })
    }
}

impl<A: std::fmt::Debug> std::fmt::Debug for Notifier<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("api", &self.api)
            .field("store", &self.store.path())
            .finish_non_exhaustive()
    }
}
