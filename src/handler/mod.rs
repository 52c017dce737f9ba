//! Subscription handler module.
//!
//! A handler is called once per subscriber after the update drain. It gets
//! the subscriber id, the record, and the capability to send messages. It may
//! return a replacement record to be persisted.

mod process;

use std::process::ExitStatus;

use async_trait::async_trait;
use thiserror::Error;

use crate::notifier::SubscriptionRecord;
use crate::telegram::{MessageSender, TelegramError};

pub use process::ProcessHandler;

/// Errors raised by a subscription handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Failed to start handler program: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Handler I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Handler did not finish within {0} seconds")]
    TimedOut(u64),

    #[error("Handler exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("Handler produced invalid output: {0}")]
    InvalidOutput(#[from] serde_json::Error),

    #[error("Handler failed to send a message: {0}")]
    Send(#[from] TelegramError),
}

/// Per-subscriber update logic.
#[async_trait]
pub trait SubscriptionHandler: Send + Sync {
    /// Processes one subscription.
    ///
    /// Returns `Some(record)` to replace the stored record, `None` to keep it.
    async fn update_subscription(
        &self,
        subscriber_id: &str,
        record: &SubscriptionRecord,
        sender: &dyn MessageSender,
    ) -> Result<Option<SubscriptionRecord>, HandlerError>;
}

/// Handler that does nothing; the run only processes subscriber commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

#[async_trait]
impl SubscriptionHandler for NoopHandler {
    async fn update_subscription(
        &self,
        _subscriber_id: &str,
        _record: &SubscriptionRecord,
        _sender: &dyn MessageSender,
    ) -> Result<Option<SubscriptionRecord>, HandlerError> {
        Ok(None)
    }
}
