//! In-memory Bot API used by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BotApi, Chat, Message, MessageSender, TelegramError, Update};

/// Serves scripted update batches and records every sent message.
#[derive(Debug, Default)]
pub struct FakeBotApi {
    batches: Mutex<VecDeque<Vec<Update>>>,
    requested_offsets: Mutex<Vec<i64>>,
    sent: Mutex<Vec<(String, String)>>,
    reject_sends: bool,
}

impl FakeBotApi {
    /// Each `get_updates` call pops the next batch; an empty batch once exhausted.
    pub fn with_batches(batches: Vec<Vec<Update>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            ..Self::default()
        }
    }

    /// Makes every `send_message` fail with an API error.
    pub fn rejecting_sends(mut self) -> Self {
        self.reject_sends = true;
        self
    }

    pub fn requested_offsets(&self) -> Vec<i64> {
        self.requested_offsets.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for FakeBotApi {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TelegramError> {
        if self.reject_sends {
            return Err(TelegramError::Api {
                method: "sendMessage".to_owned(),
                request: format!(r#"{{"chat_id":"{chat_id}"}}"#),
                response: r#"{"ok":false}"#.to_owned(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_owned(), text.to_owned()));
        Ok(())
    }
}

#[async_trait]
impl BotApi for FakeBotApi {
    async fn get_updates(&self, offset: i64, _timeout: u64) -> Result<Vec<Update>, TelegramError> {
        self.requested_offsets.lock().unwrap().push(offset);
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// Builds a `message` update carrying `text` from `chat_id`.
pub fn text_update(update_id: i64, chat_id: i64, text: &str) -> Update {
    Update {
        update_id,
        message: Some(Message {
            message_id: update_id,
            chat: Chat { id: chat_id },
            text: Some(text.to_owned()),
        }),
        edited_message: None,
    }
}
