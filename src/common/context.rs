//! Call context: cooperative cancellation plus an optional deadline

use crate::PingError;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Header carrying the caller's remaining time budget
pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Lifecycle of one RPC as seen by the code serving it
///
/// Clones share the same cancellation state.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context without a deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Builds a context from request metadata, honoring `grpc-timeout`
    pub fn from_metadata(metadata: &tonic::metadata::MetadataMap) -> Self {
        metadata
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_grpc_timeout)
            .map(Self::with_timeout)
            .unwrap_or_default()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every clone of it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns the reason the context is done, if it is
    pub fn err(&self) -> Option<PingError> {
        if self.token.is_cancelled() {
            return Some(PingError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(PingError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Fails with the context's error once it is cancelled or expired
    pub fn check(&self) -> crate::Result<()> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Resolves when the context is cancelled or its deadline passes
    pub async fn done(&self) -> PingError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => PingError::Cancelled,
                    _ = sleep_until(deadline) => PingError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                PingError::Cancelled
            }
        }
    }
}

/// Parses a gRPC timeout value such as `5S` or `250m`
///
/// The value is at most eight ASCII digits followed by one unit:
/// `H` hours, `M` minutes, `S` seconds, `m` millis, `u` micros, `n` nanos.
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.len() < 2 || value.len() > 9 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let timeout = match unit {
        "H" => Duration::from_secs(amount * 60 * 60),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(timeout)
}
