//! Subscriber command module.
//!
//! Turns the text of inbound messages into registry mutations and canned
//! replies. A message's whole text is the command: `/start`, `/stop`, or a
//! JSON config object.

mod handler;
mod types;

pub use handler::CommandHandler;
pub use types::{
    REPLY_BAD_CONFIG, REPLY_SUBSCRIBED, REPLY_SUBSCRIBED_WITH_CONFIG, REPLY_UNSUBSCRIBED,
    SubscriberCommand,
};
