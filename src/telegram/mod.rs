//! Telegram Bot API module.
//!
//! Provides the HTTPS client, the wire types, the update drain loop and
//! outbound rate limiting.

mod client;
#[cfg(test)]
pub(crate) mod fake;
mod polling;
mod rate_limiter;
mod types;

pub use client::{BotApi, BotClient, DEFAULT_API_URL, MessageSender, TelegramError};
pub use polling::{DRAIN_TIMEOUT_SECS, UpdateCursor, UpdateHandler, poll_updates};
pub use rate_limiter::RateLimiter;
pub use types::{Chat, Message, ParseMode, Update};
