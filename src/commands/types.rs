//! Subscriber command grammar.

use std::fmt;

use serde_json::{Map, Value};

use crate::notifier::SubscriptionRegistry;

/// Reply to `/start`.
pub const REPLY_SUBSCRIBED: &str = "subscribed";

/// Reply to `/stop`.
pub const REPLY_UNSUBSCRIBED: &str = "unsubscribed";

/// Reply to a JSON config object.
pub const REPLY_SUBSCRIBED_WITH_CONFIG: &str = "subscribed with config";

/// Reply to anything that is not a command or a JSON object.
pub const REPLY_BAD_CONFIG: &str = "bad config (invalid json)";

/// A command sent by a subscriber as the full text of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriberCommand {
    /// Subscribe with an empty config.
    Start,

    /// Remove the subscription.
    Stop,

    /// Subscribe with the given config object.
    Configure(Map<String, Value>),

    /// Text that is neither a command nor a JSON object.
    Invalid,
}

impl SubscriberCommand {
    /// Classifies the literal message text.
    ///
    /// JSON that parses but is not an object (`42`, `[1]`, `"s"`) is `Invalid`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text {
            "/start" => Self::Start,
            "/stop" => Self::Stop,
            _ => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(config)) => Self::Configure(config),
                _ => Self::Invalid,
            },
        }
    }

    /// Applies the command to the subscriber's registry entry.
    ///
    /// Returns the reply to send back to the subscriber.
    pub fn apply(
        self,
        registry: &mut SubscriptionRegistry,
        subscriber_id: &str,
        now_millis: i64,
    ) -> &'static str {
        match self {
            Self::Start => {
                registry.subscribe(subscriber_id, Map::new(), now_millis);
                REPLY_SUBSCRIBED
            }
            Self::Stop => {
                registry.unsubscribe(subscriber_id);
                REPLY_UNSUBSCRIBED
            }
            Self::Configure(config) => {
                registry.subscribe(subscriber_id, config, now_millis);
                REPLY_SUBSCRIBED_WITH_CONFIG
            }
            Self::Invalid => REPLY_BAD_CONFIG,
        }
    }

    /// Returns the command name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Configure(_) => "configure",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for SubscriberCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::notifier::TIMESTAMP_KEY;

    #[test]
    fn test_parse_commands() {
        assert_eq!(SubscriberCommand::parse("/start"), SubscriberCommand::Start);
        assert_eq!(SubscriberCommand::parse("/stop"), SubscriberCommand::Stop);
        assert!(matches!(
            SubscriberCommand::parse(r#"{"a": 1}"#),
            SubscriberCommand::Configure(ref c) if c["a"] == 1
        ));
        assert_eq!(SubscriberCommand::parse("not json"), SubscriberCommand::Invalid);
    }

    #[test]
    fn test_parse_is_literal() {
        assert_eq!(SubscriberCommand::parse(" /start"), SubscriberCommand::Invalid);
        assert_eq!(SubscriberCommand::parse("/START"), SubscriberCommand::Invalid);
        assert_eq!(SubscriberCommand::parse("/start now"), SubscriberCommand::Invalid);
    }

    #[test]
    fn test_parse_non_object_json_is_invalid() {
        assert_eq!(SubscriberCommand::parse("42"), SubscriberCommand::Invalid);
        assert_eq!(SubscriberCommand::parse("[1, 2]"), SubscriberCommand::Invalid);
        assert_eq!(SubscriberCommand::parse(r#""text""#), SubscriberCommand::Invalid);
        assert_eq!(SubscriberCommand::parse("null"), SubscriberCommand::Invalid);
    }

    #[test]
    fn test_start_twice_keeps_one_record_with_latest_timestamp() {
        let mut registry = SubscriptionRegistry::new();

        assert_eq!(SubscriberCommand::Start.apply(&mut registry, "42", 100), REPLY_SUBSCRIBED);
        assert_eq!(SubscriberCommand::Start.apply(&mut registry, "42", 200), REPLY_SUBSCRIBED);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("42").unwrap().timestamp(), Some(200));
    }

    #[test]
    fn test_stop_never_subscribed_is_noop() {
        let mut registry = SubscriptionRegistry::new();

        let reply = SubscriberCommand::Stop.apply(&mut registry, "42", 100);

        assert_eq!(reply, REPLY_UNSUBSCRIBED);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stop_removes_record() {
        let mut registry = SubscriptionRegistry::new();
        SubscriberCommand::Start.apply(&mut registry, "42", 1);
        SubscriberCommand::Start.apply(&mut registry, "43", 1);

        SubscriberCommand::Stop.apply(&mut registry, "42", 2);

        assert!(!registry.contains("42"));
        assert!(registry.contains("43"));
    }

    #[test]
    fn test_config_object_is_merged_with_timestamp() {
        let mut registry = SubscriptionRegistry::new();

        let reply = SubscriberCommand::parse(r#"{"a":1}"#).apply(&mut registry, "42", 555);

        assert_eq!(reply, REPLY_SUBSCRIBED_WITH_CONFIG);
        let record = registry.get("42").unwrap();
        assert_eq!(record.config["a"], 1);
        assert_eq!(record.config[TIMESTAMP_KEY], 555);
        assert!(record.state.is_empty());
    }

    #[test]
    fn test_config_timestamp_is_overwritten() {
        let mut registry = SubscriptionRegistry::new();
        SubscriberCommand::parse(r#"{"timestamp": 1}"#).apply(&mut registry, "42", 9);
        assert_eq!(registry.get("42").unwrap().timestamp(), Some(9));
    }

    #[test]
    fn test_invalid_leaves_registry_untouched() {
        let mut registry = SubscriptionRegistry::new();
        SubscriberCommand::parse(r#"{"keep": true}"#).apply(&mut registry, "42", 1);
        let before = registry.clone();

        let reply = SubscriberCommand::parse("not json").apply(&mut registry, "42", 2);

        assert_eq!(reply, REPLY_BAD_CONFIG);
        assert_eq!(registry, before);
        assert_eq!(registry.get("42").unwrap().config["keep"], json!(true));
    }
}
