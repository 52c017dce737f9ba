//! Configuration module for the notifier.
//!
//! Handles environment-driven runtime settings and resolution of the
//! handler reference given on the command line.

mod settings;

pub use settings::{ConfigError, HandlerSpec, NotifierSettings};
