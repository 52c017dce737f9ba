//! Telegram Bot API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use thiserror::Error;
use tracing::{debug, warn};

use super::RateLimiter;
use super::types::{ApiResponse, GetUpdatesParams, ParseMode, SendMessageParams, Update};

/// Default Bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Errors that can occur during Bot API calls.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// The HTTP request itself failed (connect, TLS, timeout, body read).
    #[error("Network error calling {method}: {source}")]
    Network {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered `ok: false` or with a body that could not be understood.
    #[error("/{method} ({request}) => ({response})")]
    Api {
        method: String,
        request: String,
        response: String,
    },

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl TelegramError {
    fn network(method: &str, source: reqwest::Error) -> Self {
        // Request URLs embed the bot token.
        Self::Network {
            method: method.to_owned(),
            source: source.without_url(),
        }
    }

    fn api(method: &str, request: &str, response: &str) -> Self {
        Self::Api {
            method: method.to_owned(),
            request: request.to_owned(),
            response: response.to_owned(),
        }
    }
}

/// Capability to send a text message to a chat.
///
/// This is everything a subscription handler is allowed to do with the bot.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TelegramError>;
}

/// The Bot API surface the notifier needs: sending plus update retrieval.
#[async_trait]
pub trait BotApi: MessageSender {
    /// Fetches updates with id `>= offset`, waiting at most `timeout` seconds.
    async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, TelegramError>;
}

/// HTTPS client for a single bot.
pub struct BotClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    parse_mode: Option<ParseMode>,
    send_limiter: RateLimiter,
}

impl BotClient {
    /// Creates a client for the bot identified by `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>, request_timeout: Duration) -> Result<Self, TelegramError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TelegramError::network("client", e))?;

        Ok(Self {
            http,
            base_url: DEFAULT_API_URL.to_owned(),
            token: token.into(),
            parse_mode: Some(ParseMode::Html),
            send_limiter: RateLimiter::from_millis(0),
        })
    }

    /// Overrides the API base URL (self-hosted Bot API server, tests).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Sets the parse mode used for outgoing messages (`None` for plain text).
    #[must_use]
    pub const fn with_parse_mode(mut self, parse_mode: Option<ParseMode>) -> Self {
        self.parse_mode = parse_mode;
        self
    }

    /// Sets the minimum spacing between outgoing messages.
    #[must_use]
    pub fn with_send_interval(mut self, interval: Duration) -> Self {
        self.send_limiter = RateLimiter::new(interval);
        self
    }

    /// Calls a Bot API method and unwraps its response envelope.
    async fn call_api<P, R>(&self, method: &str, params: &P) -> Result<R, TelegramError>
    where
        P: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let request = serde_json::to_string(params)?;
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(request.clone())
            .send()
            .await
            .map_err(|e| TelegramError::network(method, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TelegramError::network(method, e))?;

        let envelope: ApiResponse<serde_json::Value> = serde_json::from_str(&body).map_err(|e| {
            warn!("{} returned a malformed envelope (HTTP {}): {}", method, status, e);
            TelegramError::api(method, &request, &body)
        })?;

        if !envelope.ok {
            warn!(
                "{} failed with code {:?}: {}",
                method,
                envelope.error_code,
                envelope.description.as_deref().unwrap_or("no description")
            );
            return Err(TelegramError::api(method, &request, &body));
        }

        let result = envelope.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(result).map_err(|e| {
            warn!("{} returned an unexpected result: {}", method, e);
            TelegramError::api(method, &request, &body)
        })
    }
}

#[async_trait]
impl MessageSender for BotClient {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TelegramError> {
        let waited = self.send_limiter.wait_and_acquire().await;
        if !waited.is_zero() {
            debug!("Waited {:?} before sending", waited);
        }

        let params = SendMessageParams {
            chat_id,
            text,
            parse_mode: self.parse_mode,
        };
        let _: IgnoredAny = self.call_api("sendMessage", &params).await?;
        debug!("Sent message to {} ({} chars)", chat_id, text.chars().count());
        Ok(())
    }
}

#[async_trait]
impl BotApi for BotClient {
    async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, TelegramError> {
        self.call_api("getUpdates", &GetUpdatesParams { offset, timeout })
            .await
    }
}

impl std::fmt::Debug for BotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotClient")
            .field("base_url", &self.base_url)
            .field("token", &mask_token(&self.token))
            .field("parse_mode", &self.parse_mode)
            .field("send_limiter", &self.send_limiter)
            .finish_non_exhaustive()
    }
}

/// Masks a bot token for display (keeps the numeric bot id only).
fn mask_token(token: &str) -> String {
    match token.split_once(':') {
        Some((bot_id, _)) if !bot_id.is_empty() => format!("{bot_id}:***"),
        _ => "***".to_owned(),
    }
}
