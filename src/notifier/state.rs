//! Subscription state that survives between runs.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::telegram::UpdateCursor;

/// Config key stamped with the subscription time (milliseconds since epoch).
pub const TIMESTAMP_KEY: &str = "timestamp";

/// One subscriber's subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Subscriber-supplied configuration; only ever checked to be a JSON object.
    #[serde(default)]
    pub config: Map<String, Value>,

    /// Handler bookkeeping carried across runs. Never interpreted here.
    #[serde(default)]
    pub state: Map<String, Value>,
}

impl SubscriptionRecord {
    /// Creates a record with `config` stamped at `now_millis` and empty state.
    #[must_use]
    pub fn new(mut config: Map<String, Value>, now_millis: i64) -> Self {
        config.insert(TIMESTAMP_KEY.to_owned(), Value::from(now_millis));
        Self {
            config,
            state: Map::new(),
        }
    }

    /// Returns the subscription timestamp, if present.
    #[must_use]
    pub fn timestamp(&self) -> Option<i64> {
        self.config.get(TIMESTAMP_KEY).and_then(Value::as_i64)
    }
}

/// Subscriber id → subscription record.
///
/// A record exists exactly for the subscribers with an active subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionRegistry {
    entries: BTreeMap<String, SubscriptionRecord>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces the subscription for `subscriber_id`.
    pub fn subscribe(
        &mut self,
        subscriber_id: impl Into<String>,
        config: Map<String, Value>,
        now_millis: i64,
    ) {
        self.entries.insert(
            subscriber_id.into(),
            SubscriptionRecord::new(config, now_millis),
        );
    }

    /// Removes the subscription for `subscriber_id`, returning it if present.
    pub fn unsubscribe(&mut self, subscriber_id: &str) -> Option<SubscriptionRecord> {
        self.entries.remove(subscriber_id)
    }

    #[must_use]
    pub fn get(&self, subscriber_id: &str) -> Option<&SubscriptionRecord> {
        self.entries.get(subscriber_id)
    }

    #[must_use]
    pub fn contains(&self, subscriber_id: &str) -> bool {
        self.entries.contains_key(subscriber_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, SubscriptionRecord> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, SubscriptionRecord> {
        self.entries.iter_mut()
    }
}

impl<'a> IntoIterator for &'a SubscriptionRegistry {
    type Item = (&'a String, &'a SubscriptionRecord);
    type IntoIter = btree_map::Iter<'a, String, SubscriptionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a mut SubscriptionRegistry {
    type Item = (&'a String, &'a mut SubscriptionRecord);
    type IntoIter = btree_map::IterMut<'a, String, SubscriptionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Everything persisted in the store file.
///
/// Written as `{"offset": …, "subscriptions": {…}}`. Files holding only a
/// bare subscriptions mapping are still read, with the cursor at zero. Every
/// key of such a mapping must be a chat id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredLayout")]
pub struct StoreDocument {
    /// Last consumed update id.
    pub offset: UpdateCursor,

    pub subscriptions: SubscriptionRegistry,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredLayout {
    Current(CurrentLayout),
    Legacy(SubscriptionRegistry),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CurrentLayout {
    offset: UpdateCursor,
    subscriptions: SubscriptionRegistry,
}

impl TryFrom<StoredLayout> for StoreDocument {
    type Error = String;

    fn try_from(layout: StoredLayout) -> Result<Self, Self::Error> {
        match layout {
            StoredLayout::Current(CurrentLayout {
                offset,
                subscriptions,
            }) => Ok(Self {
                offset,
                subscriptions,
            }),
            StoredLayout::Legacy(subscriptions) => {
                if let Some((id, _)) = subscriptions
                    .iter()
                    .find(|(id, _)| id.parse::<i64>().is_err())
                {
                    return Err(format!(
                        "not a store document: key '{id}' is not a chat id"
                    ));
                }
                Ok(Self {
                    offset: UpdateCursor::default(),
                    subscriptions,
                })
            }
        }
    }
}
