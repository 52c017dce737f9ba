//! Update draining.
//!
//! The drain loop is a small state machine:
//! 1. Fetch updates with id greater than the cursor (no server-side wait)
//! 2. Empty batch → drained, stop
//! 3. Otherwise, for each update in order:
//!    - advance the cursor to the update's id
//!    - hand the update to the handler and wait for it to finish
//! 4. Go back to 1
//!
//! The cursor is advanced before the handler runs, so after an error it
//! still tells the caller exactly which updates were consumed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BotApi, TelegramError, Update};

/// Server-side wait passed to `getUpdates`. Zero makes every fetch a plain drain.
pub const DRAIN_TIMEOUT_SECS: u64 = 0;

/// Watermark of the highest update id already consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateCursor(i64);

impl UpdateCursor {
    #[must_use]
    pub const fn new(last_update_id: i64) -> Self {
        Self(last_update_id)
    }

    /// Id of the last consumed update (0 when nothing was consumed yet).
    #[must_use]
    pub const fn last_update_id(self) -> i64 {
        self.0
    }

    /// Offset to request next: one past the last consumed update.
    #[must_use]
    pub const fn next_offset(self) -> i64 {
        self.0 + 1
    }

    /// Moves the cursor forward to `update_id`. Never moves it backwards.
    pub fn advance(&mut self, update_id: i64) {
        if update_id > self.0 {
            self.0 = update_id;
        }
    }
}

/// Receives drained updates one at a time.
#[async_trait]
pub trait UpdateHandler: Send {
    type Error: From<TelegramError> + Send;

    async fn handle_update(&mut self, update: Update) -> Result<(), Self::Error>;
}

/// Drains all pending updates, dispatching them sequentially to `handler`.
///
/// Returns the number of updates dispatched.
pub async fn poll_updates<A, H>(
    api: &A,
    cursor: &mut UpdateCursor,
    handler: &mut H,
) -> Result<usize, H::Error>
where
    A: BotApi + ?Sized,
    H: UpdateHandler,
{
    let mut dispatched = 0;

    loop {
        let batch = api
            .get_updates(cursor.next_offset(), DRAIN_TIMEOUT_SECS)
            .await?;

        if batch.is_empty() {
            debug!(
                "Update queue drained at cursor {} ({} dispatched)",
                cursor.last_update_id(),
                dispatched
            );
            return Ok(dispatched);
        }

        debug!("Fetched batch of {} updates", batch.len());

        for update in batch {
            cursor.advance(update.update_id);
            handler.handle_update(update).await?;
            dispatched += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fake::{FakeBotApi, text_update};
    use super::*;

    /// Records dispatched update ids; optionally fails on one of them.
    struct Recorder {
        seen: Vec<i64>,
        fail_on: Option<i64>,
    }

    #[derive(Debug)]
    enum RecorderError {
        Telegram,
        Refused(i64),
    }

    impl From<TelegramError> for RecorderError {
        fn from(_: TelegramError) -> Self {
            Self::Telegram
        }
    }

    #[async_trait]
    impl UpdateHandler for Recorder {
        type Error = RecorderError;

        async fn handle_update(&mut self, update: Update) -> Result<(), Self::Error> {
            if self.fail_on == Some(update.update_id) {
                return Err(RecorderError::Refused(update.update_id));
            }
            self.seen.push(update.update_id);
            Ok(())
        }
    }

    fn batch(ids: &[i64]) -> Vec<Update> {
        ids.iter().map(|&id| text_update(id, 1, "x")).collect()
    }

    #[test]
    fn test_cursor_defaults_to_zero() {
        let cursor = UpdateCursor::default();
        assert_eq!(cursor.last_update_id(), 0);
        assert_eq!(cursor.next_offset(), 1);
    }

    #[test]
    fn test_cursor_never_moves_backwards() {
        let mut cursor = UpdateCursor::new(10);
        cursor.advance(4);
        assert_eq!(cursor.last_update_id(), 10);
        cursor.advance(11);
        assert_eq!(cursor.last_update_id(), 11);
    }

    #[tokio::test]
    async fn test_drains_until_empty_batch() {
        let api = FakeBotApi::with_batches(vec![batch(&[1, 2, 3]), batch(&[4, 5]), vec![]]);
        let mut cursor = UpdateCursor::default();
        let mut recorder = Recorder {
            seen: Vec::new(),
            fail_on: None,
        };

        let dispatched = poll_updates(&api, &mut cursor, &mut recorder).await.unwrap();

        assert_eq!(dispatched, 5);
        assert_eq!(recorder.seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(cursor.last_update_id(), 5);
        // Each fetch asks for one past the last consumed id; three fetches total.
        assert_eq!(api.requested_offsets(), vec![1, 4, 6]);
    }

    #[tokio::test]
    async fn test_empty_queue_dispatches_nothing() {
        let api = FakeBotApi::with_batches(vec![]);
        let mut cursor = UpdateCursor::new(41);
        let mut recorder = Recorder {
            seen: Vec::new(),
            fail_on: None,
        };

        let dispatched = poll_updates(&api, &mut cursor, &mut recorder).await.unwrap();

        assert_eq!(dispatched, 0);
        assert_eq!(cursor.last_update_id(), 41);
        assert_eq!(api.requested_offsets(), vec![42]);
    }

    #[tokio::test]
    async fn test_cursor_covers_failed_update() {
        let api = FakeBotApi::with_batches(vec![batch(&[7, 8, 9])]);
        let mut cursor = UpdateCursor::default();
        let mut recorder = Recorder {
            seen: Vec::new(),
            fail_on: Some(8),
        };

        let result = poll_updates(&api, &mut cursor, &mut recorder).await;

        assert!(matches!(result, Err(RecorderError::Refused(8))));
        assert_eq!(recorder.seen, vec![7]);
        assert_eq!(cursor.last_update_id(), 8);
    }
}
