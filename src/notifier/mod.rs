//! Subscription state and run orchestration.
//!
//! Holds the persisted subscription registry and drives a single notifier
//! run from store to handler and back.

mod runner;
mod state;

pub use runner::{Notifier, NotifierError, RunSummary};
pub use state::{StoreDocument, SubscriptionRecord, SubscriptionRegistry, TIMESTAMP_KEY};
