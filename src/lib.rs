//! Subscription Notifier Library
//!
//! A scheduled Telegram notifier: each run drains pending subscriber
//! commands, updates an encrypted subscription store, and lets a handler
//! push per-subscriber messages.
//!
//! This crate provides the core functionality for:
//! - Reading and writing the passphrase-encrypted store file
//! - Talking to the Telegram Bot API and draining pending updates
//! - Interpreting `/start`, `/stop` and JSON config commands
//! - Running a subscription handler once per subscriber

pub mod commands;
pub mod config;
pub mod handler;
pub mod notifier;
pub mod store;
pub mod telegram;
