//! Launch & stream consumer
//!
//! Drives one launch from request to final outcome: every decoded record is
//! pushed to a [`RecordSink`] the moment it is complete, and the way the
//! stream ended is reported as a [`StreamOutcome`]. Failures never escape as
//! errors; they become `[ERROR]` records plus a failed outcome.

use super::client::MigrationClient;
use super::console::LogConsole;
use super::form::MigrationConfig;
use super::stream::{StreamFrame, StreamSession};
use crate::error::{ErrorCode, Result};
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// First record of every launch
pub const START_MESSAGE: &str = "[SYSTEM] Starting migration process...";
/// Appended when the completion sentinel arrives
pub const COMPLETION_MESSAGE: &str = "[SYSTEM] Migration task finished!";
/// Appended when the operator aborts a running launch
pub const ABORT_MESSAGE: &str = "[ERROR] Migration aborted by operator";

/// Record for a launch that never produced a stream
pub fn connection_failed(cause: &str) -> String {
    format!("[ERROR] Connection failed: {}", cause)
}

/// Record for a stream that broke after it was established
pub fn connection_lost(cause: &str) -> String {
    format!("[ERROR] Connection lost: {}", cause)
}

/// Receiver of decoded records
pub trait RecordSink {
    fn push(&mut self, text: String);
}

impl RecordSink for LogConsole {
    fn push(&mut self, text: String) {
        self.append(text);
    }
}

impl RecordSink for Vec<String> {
    fn push(&mut self, text: String) {
        Vec::push(self, text);
    }
}

/// How a launch ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StreamOutcome {
    /// The completion sentinel was received
    Completed,
    /// The service closed the stream without sending the sentinel
    EndedWithoutSentinel,
    /// No stream was established
    LaunchFailed(String),
    /// The stream broke while being read
    TransportFailed(String),
    /// Aborted by the operator
    Cancelled,
}

impl StreamOutcome {
    /// The job ran to the end of its stream
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::EndedWithoutSentinel)
    }

    /// Error code of a failed outcome. A refused connection is reported as
    /// a launch failure; the finer distinction only survives in the logs.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Completed | Self::EndedWithoutSentinel => None,
            Self::LaunchFailed(_) => Some(ErrorCode::Launch),
            Self::TransportFailed(_) => Some(ErrorCode::Transport),
            Self::Cancelled => Some(ErrorCode::Cancelled),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Completed => "migration finished".to_string(),
            Self::EndedWithoutSentinel => "stream closed without completion signal".to_string(),
            Self::LaunchFailed(cause) => format!("launch failed: {}", cause),
            Self::TransportFailed(cause) => format!("connection lost: {}", cause),
            Self::Cancelled => "aborted by operator".to_string(),
        }
    }
}

/// Read `stream` to its end, pushing records as they complete
pub async fn consume<S, K>(mut stream: S, sink: &mut K, cancel: &CancellationToken) -> StreamOutcome
where
    S: Stream<Item = Result<Vec<u8>>> + Unpin,
    K: RecordSink + ?Sized,
{
    let mut session = StreamSession::new();
    let mut chunks = 0usize;
    let mut records = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(chunks, records, "stream cancelled by operator");
                sink.push(ABORT_MESSAGE.to_string());
                return StreamOutcome::Cancelled;
            }
            next = stream.next() => next,
        };

        let frames = match next {
            Some(Ok(chunk)) => {
                chunks += 1;
                tracing::trace!(bytes = chunk.len(), "chunk received");
                session.feed(&chunk)
            }
            Some(Err(e)) => {
                let cause = e.to_string();
                tracing::error!(chunks, records, code = e.code().as_str(), "stream failed: {}", cause);
                sink.push(connection_lost(&cause));
                return StreamOutcome::TransportFailed(cause);
            }
            None => session.finish(),
        };

        for frame in frames {
            match frame {
                StreamFrame::Record(text) => {
                    records += 1;
                    sink.push(text);
                }
                StreamFrame::Done => {
                    tracing::info!(chunks, records, "migration stream completed");
                    sink.push(COMPLETION_MESSAGE.to_string());
                    return StreamOutcome::Completed;
                }
            }
        }

        if session.is_finished() {
            tracing::warn!(chunks, records, "stream closed without completion signal");
            return StreamOutcome::EndedWithoutSentinel;
        }
    }
}

/// Launch a job and consume its stream. The start record is not pushed
/// here; the caller seeds it when it opens the session.
pub async fn launch_and_consume<K>(
    client: &dyn MigrationClient,
    config: &MigrationConfig,
    sink: &mut K,
    cancel: &CancellationToken,
) -> StreamOutcome
where
    K: RecordSink + ?Sized,
{
    let launched = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            sink.push(ABORT_MESSAGE.to_string());
            return StreamOutcome::Cancelled;
        }
        launched = client.launch(config) => launched,
    };

    match launched {
        Ok(stream) => consume(stream, sink, cancel).await,
        Err(e) => {
            let cause = e.to_string();
            tracing::error!(
                endpoint = client.endpoint(),
                code = e.code().as_str(),
                "launch failed: {}",
                cause
            );
            sink.push(connection_failed(&cause));
            StreamOutcome::LaunchFailed(cause)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigratorError;
    use crate::migration::client::ByteStream;
    use async_trait::async_trait;
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>>> + Unpin {
        let items: Vec<Result<Vec<u8>>> = parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(items)
    }

    #[tokio::test]
    async fn test_records_then_completion() {
        let mut sink: Vec<String> = Vec::new();
        let outcome = consume(
            chunks(&["data: hello\n\n", "data: [DONE]\n\n"]),
            &mut sink,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(sink, vec!["hello", COMPLETION_MESSAGE]);
    }

    #[tokio::test]
    async fn test_split_error_record() {
        let mut sink: Vec<String> = Vec::new();
        let outcome = consume(
            chunks(&["data: a\n\ndata: [ERR", "OR] boom\n\n"]),
            &mut sink,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, StreamOutcome::EndedWithoutSentinel);
        assert_eq!(sink, vec!["a", "[ERROR] boom"]);
    }

    #[tokio::test]
    async fn test_records_after_done_are_ignored() {
        let mut sink: Vec<String> = Vec::new();
        let outcome = consume(
            chunks(&["data: one\n\ndata: [DONE]\n\ndata: ghost\n\n", "data: later\n\n"]),
            &mut sink,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(sink, vec!["one", COMPLETION_MESSAGE]);
    }

    #[tokio::test]
    async fn test_transport_error_midway() {
        let items: Vec<Result<Vec<u8>>> = vec![
            Ok(b"data: step 1\n\n".to_vec()),
            Err(MigratorError::Transport("connection reset".into())),
            Ok(b"data: unreachable\n\n".to_vec()),
        ];
        let mut sink: Vec<String> = Vec::new();
        let outcome = consume(stream::iter(items), &mut sink, &CancellationToken::new()).await;

        assert!(matches!(outcome, StreamOutcome::TransportFailed(ref c) if c.contains("connection reset")));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0], "step 1");
        assert!(sink[1].starts_with("[ERROR] Connection lost: "));
    }

    #[tokio::test]
    async fn test_cancel_stops_consumption() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut sink: Vec<String> = Vec::new();
        let outcome = consume(chunks(&["data: never\n\n"]), &mut sink, &cancel).await;

        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert_eq!(sink, vec![ABORT_MESSAGE]);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_chunk() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let mut sink: Vec<String> = Vec::new();
        let outcome = consume(stream::pending::<Result<Vec<u8>>>(), &mut sink, &cancel).await;
        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert_eq!(sink, vec![ABORT_MESSAGE]);
    }

    #[tokio::test]
    async fn test_console_sink_tags_errors() {
        let mut console = LogConsole::new();
        consume(
            chunks(&["data: fine\n\ndata: [ERROR] Login failed\n\ndata: [DONE]\n\n"]),
            &mut console,
            &CancellationToken::new(),
        )
        .await;

        let flags: Vec<bool> = console.records().iter().map(|r| r.is_error).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    struct StaticClient {
        body: Option<&'static str>,
    }

    #[async_trait]
    impl MigrationClient for StaticClient {
        async fn launch(&self, _config: &MigrationConfig) -> Result<ByteStream> {
            match self.body {
                Some(body) => Ok(Box::pin(stream::iter(vec![Ok(body.as_bytes().to_vec())]))),
                None => Err(MigratorError::Connect("connection refused".into())),
            }
        }

        fn endpoint(&self) -> &str {
            "test://static"
        }
    }

    #[tokio::test]
    async fn test_launch_failure_record() {
        let client = StaticClient { body: None };
        let mut sink: Vec<String> = Vec::new();
        let outcome = launch_and_consume(
            &client,
            &MigrationConfig::default(),
            &mut sink,
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(outcome, StreamOutcome::LaunchFailed(_)));
        assert!(!outcome.is_success());
        assert_eq!(sink.len(), 1);
        assert!(sink[0].starts_with("[ERROR] Connection failed: "));
        assert!(sink[0].contains("connection refused"));
    }

    #[tokio::test]
    async fn test_launch_and_consume_success() {
        let client = StaticClient {
            body: Some("data: Logging in...\n\ndata: [DONE]\n\n"),
        };
        let mut sink: Vec<String> = Vec::new();
        let outcome = launch_and_consume(
            &client,
            &MigrationConfig::default(),
            &mut sink,
            &CancellationToken::new(),
        )
        .await;

        assert!(outcome.is_success());
        assert_eq!(sink, vec!["Logging in...", COMPLETION_MESSAGE]);
    }

    #[test]
    fn test_outcome_error_codes() {
        assert_eq!(StreamOutcome::Completed.error_code(), None);
        assert_eq!(StreamOutcome::EndedWithoutSentinel.error_code(), None);
        assert_eq!(
            StreamOutcome::LaunchFailed("HTTP 500".into()).error_code(),
            Some(ErrorCode::Launch)
        );
        assert_eq!(
            StreamOutcome::TransportFailed("reset".into()).error_code(),
            Some(ErrorCode::Transport)
        );
        assert_eq!(StreamOutcome::Cancelled.error_code(), Some(ErrorCode::Cancelled));
    }

    #[test]
    fn test_outcome_serializes_tagged() {
        let json = serde_json::to_value(StreamOutcome::TransportFailed("reset".into())).unwrap();
        assert_eq!(json["outcome"], "transport_failed");
        assert_eq!(json["detail"], "reset");
    }
}
