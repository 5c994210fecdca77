//! Error types for the DuckDNS updater
//!
//! One enum covers every failure the fetchers, the update client and the
//! scheduler can surface. The variants fall into a small number of kinds
//! (transport, protocol, validation, application, configuration,
//! cancellation) which callers inspect through [`Error::kind`].

use std::fmt;
use thiserror::Error;

/// Result type alias for DuckDNS updater operations
pub type Result<T> = std::result::Result<T, Error>;

/// One failed (or skipped) entry in a failover sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    /// Position of the source in the configured list
    pub index: usize,
    /// The URL as configured (may be blank)
    pub url: String,
    /// Why this source produced no address
    pub reason: SourceFailureReason,
}

/// Reason a failover entry produced no address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFailureReason {
    /// Blank entry, never requested
    Skipped,
    /// The request was made and failed with this message
    Failed(String),
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            SourceFailureReason::Skipped => write!(f, "[{}] skipped: URL is empty", self.index),
            SourceFailureReason::Failed(msg) => write!(f, "[{}] {}: {}", self.index, self.url, msg),
        }
    }
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network or timeout failure
    Transport,
    /// Unexpected HTTP status, empty or unreadable body
    Protocol,
    /// Body was not a well-formed IPv4 literal
    Validation,
    /// Provider answered, but refused the update
    Application,
    /// Missing or invalid configuration
    Configuration,
    /// The cancellation token fired
    Cancellation,
    /// Every failover source failed
    AllSourcesFailed,
    /// Every retry attempt failed
    RetriesExhausted,
}

/// Core error type for the DuckDNS updater
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure (DNS lookup, connect, TLS, read, timeout)
    #[error("request to {url} failed: {message}")]
    Request {
        /// Target URL (never contains credentials)
        url: String,
        /// Underlying transport error message
        message: String,
    },

    /// Non-200 HTTP status
    #[error("unexpected HTTP status {status} from {url}")]
    Status {
        /// Target URL (never contains credentials)
        url: String,
        /// Status code received
        status: u16,
    },

    /// Trimmed response body was empty
    #[error("empty response from {url}")]
    EmptyResponse {
        /// Target URL
        url: String,
    },

    /// Text that should have been an IPv4 address was not
    #[error("invalid IPv4 address {input:?}: {reason}")]
    Validation {
        /// The offending text
        input: String,
        /// Which check failed
        reason: String,
    },

    /// Provider returned something other than its success marker
    #[error("update rejected by provider: response={response:?}")]
    Rejected {
        /// Raw trimmed response text
        response: String,
    },

    /// The failover list is empty
    #[error("no IP sources configured")]
    NoSourcesConfigured,

    /// Every configured IP source failed
    #[error("all IP sources failed:{}", format_failures(.0))]
    AllSourcesFailed(Vec<SourceFailure>),

    /// Every update attempt failed
    #[error("update failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: usize,
        /// Error from the final attempt
        last: Box<Error>,
    },

    /// Cancelled before or during a request
    #[error("operation cancelled")]
    Cancelled,

    /// Cancelled while sleeping between retry attempts
    #[error("operation cancelled during backoff")]
    CancelledDuringBackoff,

    /// A single configuration problem
    #[error("configuration error: {0}")]
    Config(String),

    /// Every problem found while validating a configuration
    #[error("invalid configuration:{}", format_list(.0))]
    InvalidConfig(Vec<String>),
}

fn format_failures(failures: &[SourceFailure]) -> String {
    failures.iter().map(|f| format!("\n  - {f}")).collect()
}

fn format_list(items: &[String]) -> String {
    items.iter().map(|i| format!("\n  - {i}")).collect()
}

impl Error {
    /// Create a transport error
    pub fn request(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Request {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an IPv4 validation error
    pub fn validation(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Request { .. } => ErrorKind::Transport,
            Error::Status { .. } | Error::EmptyResponse { .. } => ErrorKind::Protocol,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Rejected { .. } => ErrorKind::Application,
            Error::NoSourcesConfigured | Error::Config(_) | Error::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            Error::Cancelled | Error::CancelledDuringBackoff => ErrorKind::Cancellation,
            Error::AllSourcesFailed(_) => ErrorKind::AllSourcesFailed,
            Error::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
        }
    }

    /// True for failures that a later attempt may not repeat
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport | ErrorKind::Protocol | ErrorKind::Application
        )
    }

    /// True if the cancellation token caused this error
    pub fn is_cancellation(&self) -> bool {
        self.kind() == ErrorKind::Cancellation
    }
}
