//! Applies drained updates to the subscription registry.

use async_trait::async_trait;
use tracing::{debug, info};

use super::types::SubscriberCommand;
use crate::notifier::{NotifierError, SubscriptionRegistry};
use crate::telegram::{MessageSender, Update, UpdateHandler};

/// Current time in milliseconds since the Unix epoch.
fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Interprets each update's text as a subscriber command.
pub struct CommandHandler<'a> {
    /// Registry mutated in place by the commands.
    registry: &'a mut SubscriptionRegistry,

    /// Used to reply to the subscriber.
    sender: &'a dyn MessageSender,

    /// Clock used to stamp new subscriptions.
    clock: fn() -> i64,
}

impl<'a> CommandHandler<'a> {
    /// Creates a command handler over `registry`.
    #[must_use]
    pub fn new(registry: &'a mut SubscriptionRegistry, sender: &'a dyn MessageSender) -> Self {
        Self {
            registry,
            sender,
            clock: now_millis,
        }
    }

    /// Replaces the clock used for subscription timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl UpdateHandler for CommandHandler<'_> {
    type Error = NotifierError;

    async fn handle_update(&mut self, update: Update) -> Result<(), Self::Error> {
        let Some(message) = update.message() else {
            debug!("Ignoring update {} without a message", update.update_id);
            return Ok(());
        };
        let Some(text) = message.text.as_deref() else {
            debug!("Ignoring update {} without text", update.update_id);
            return Ok(());
        };

        let subscriber_id = message.chat.id.to_string();
        let command = SubscriberCommand::parse(text);
        info!(
            "Update {}: '{}' command from {}",
            update.update_id, command, subscriber_id
        );

        let reply = command.apply(&mut *self.registry, &subscriber_id, (self.clock)());
        self.sender.send_message(&subscriber_id, reply).await?;
        Ok(())
    }
}
