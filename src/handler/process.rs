//! Handler backed by an external program.
//!
//! For every subscriber the program is started once and receives on stdin:
//!
//! ```json
//! {"subscriber_id": "123", "record": {"config": {...}, "state": {...}}}
//! ```
//!
//! It answers on stdout with:
//!
//! ```json
//! {"messages": ["text to send", ...], "record": {"config": {...}, "state": {...}}}
//! ```
//!
//! Both fields are optional and empty output means "nothing to do". The
//! messages are sent to the subscriber in order before the record is returned.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use super::{HandlerError, SubscriptionHandler};
use crate::notifier::SubscriptionRecord;
use crate::telegram::MessageSender;

#[derive(Serialize)]
struct HandlerInput<'a> {
    subscriber_id: &'a str,
    record: &'a SubscriptionRecord,
}

#[derive(Debug, Default, Deserialize)]
struct HandlerOutput {
    #[serde(default)]
    messages: Vec<String>,
    #[serde(default)]
    record: Option<SubscriptionRecord>,
}

/// Runs an external program per subscriber.
#[derive(Debug, Clone)]
pub struct ProcessHandler {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessHandler {
    /// Creates a handler running `program` with no extra arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
        }
    }

    /// Sets the arguments passed to the program.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Runs the program once and decodes its answer.
    async fn invoke(&self, input: &[u8]) -> Result<HandlerOutput, HandlerError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(HandlerError::Spawn)?;

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(input).await {
                    // The program is free to exit without reading its input.
                    Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            // Dropping stdin closes the pipe so the program sees EOF.
            Ok(())
        };

        // Feeding stdin and collecting output run concurrently under one
        // deadline. On timeout the child is dropped and killed.
        let output = tokio::time::timeout(self.timeout, async {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed.and(output)
        })
        .await
        .map_err(|_| HandlerError::TimedOut(self.timeout.as_secs()))??;

        if !output.status.success() {
            return Err(HandlerError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(HandlerOutput::default());
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[async_trait]
impl SubscriptionHandler for ProcessHandler {
    async fn update_subscription(
        &self,
        subscriber_id: &str,
        record: &SubscriptionRecord,
        sender: &dyn MessageSender,
    ) -> Result<Option<SubscriptionRecord>, HandlerError> {
        let input = serde_json::to_vec(&HandlerInput {
            subscriber_id,
            record,
        })?;

        debug!("Running {} for {}", self.program.display(), subscriber_id);
        let output = self.invoke(&input).await?;

        if !output.messages.is_empty() {
            info!("Sending {} message(s) to {}", output.messages.len(), subscriber_id);
        }
        for text in &output.messages {
            sender.send_message(subscriber_id, text).await?;
        }

        Ok(output.record)
    }
}
