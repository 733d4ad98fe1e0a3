use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upstream error message that marks an expired or revoked token.
///
/// This exact string is the only failure the sync engine answers with a
/// reauthentication.
pub const ACCESS_DENIED: &str = "Access denied";

/// Classification of a failed period-values fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum FetchFailureKind {
    /// The upstream rejected the token (`"Access denied"`).
    AccessDenied,
    /// Transport-level failure (connection refused, reset, DNS, ...).
    Network,
    /// The call did not complete within the configured timeout.
    Timeout,
    /// The response could not be decoded.
    Malformed,
    /// The upstream throttled the caller.
    RateLimited,
    /// Any other upstream status/message pair.
    Upstream,
}

/// Failure reported by the fetch collaborator.
///
/// Mirrors the upstream's `(status, error message)` pair and carries a
/// classification so callers never have to string-match themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind:?} (status={status}): {message}")]
pub struct FetchFailure {
    /// Classification used to decide between reauthentication and retry-later.
    pub kind: FetchFailureKind,
    /// Opaque upstream status code.
    pub status: String,
    /// Human-readable reason reported by the upstream.
    pub message: String,
}

impl FetchFailure {
    /// Classify a raw upstream `(status, message)` pair.
    ///
    /// Only the literal [`ACCESS_DENIED`] message maps to
    /// [`FetchFailureKind::AccessDenied`]; everything else is `Upstream`.
    pub fn classify(status: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = if message == ACCESS_DENIED {
            FetchFailureKind::AccessDenied
        } else {
            FetchFailureKind::Upstream
        };
        Self {
            kind,
            status: status.into(),
            message,
        }
    }

    /// Helper: an access-denied failure with the given status.
    pub fn access_denied(status: impl Into<String>) -> Self {
        Self::classify(status, ACCESS_DENIED)
    }

    /// Helper: a transport failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: FetchFailureKind::Network,
            status: String::new(),
            message: message.into(),
        }
    }

    /// Helper: a timeout for the named operation.
    pub fn timeout(operation: &str) -> Self {
        Self {
            kind: FetchFailureKind::Timeout,
            status: String::new(),
            message: format!("{operation} timed out"),
        }
    }

    /// Helper: an undecodable response.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: FetchFailureKind::Malformed,
            status: String::new(),
            message: message.into(),
        }
    }

    /// Helper: upstream throttling.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: FetchFailureKind::RateLimited,
            status: String::new(),
            message: message.into(),
        }
    }

    /// Returns true if this failure should trigger a reauthentication.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        self.kind == FetchFailureKind::AccessDenied
    }
}

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The authentication collaborator rejected the stored credentials.
    #[error("authentication rejected (status={status}): {message}")]
    Rejected {
        /// Opaque upstream status code.
        status: String,
        /// Human-readable reason.
        message: String,
    },

    /// Reauthentication succeeded but the retried fetch was denied again.
    #[error("access denied after reauthentication: {message}")]
    StillDenied {
        /// Message returned by the retried fetch.
        message: String,
    },

    /// The authentication call did not complete in time.
    #[error("authentication timed out")]
    Timeout,
}

impl AuthError {
    /// Helper: build a `Rejected` error.
    pub fn rejected(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            status: status.into(),
            message: message.into(),
        }
    }
}

/// Unified error type for the metersync workspace.
///
/// Cycle-scoped failures (`Parse`, `Auth`, `Fetch`, `Store`) never terminate a
/// session; `InvalidConfig` is only produced while constructing one.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq)]
#[non_exhaustive]
pub enum SyncError {
    /// Configuration rejected at session construction.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A single upstream record could not be parsed and was dropped.
    #[error("unparseable record {time:?}={value:?}: {reason}")]
    Parse {
        /// Raw `time` field as received.
        time: String,
        /// Raw `value` field as received.
        value: String,
        /// Why parsing failed.
        reason: String,
    },

    /// Authentication could not be (re)established for this cycle.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The upstream fetch failed for a non-authentication reason.
    #[error("fetch failed: {0}")]
    Fetch(FetchFailure),

    /// The persistence collaborator failed.
    #[error("store failed: {0}")]
    Store(String),

    /// Another cycle is already running for this meter.
    #[error("a sync cycle is already running for meter {meter}")]
    CycleInProgress {
        /// Meter whose session is busy.
        meter: String,
    },

    /// A meter with this id is already registered.
    #[error("meter {meter} is already registered")]
    DuplicateMeter {
        /// Offending meter id.
        meter: String,
    },

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl SyncError {
    /// Helper: build an `InvalidConfig` error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Helper: build a `Parse` error for a dropped record.
    pub fn parse(
        time: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Parse {
            time: time.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Helper: build a `Store` error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Returns true when the next scheduled cycle may succeed without
    /// operator intervention.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidConfig(_) | Self::DuplicateMeter { .. })
    }

    /// Returns true for errors that can only happen at construction time.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::InvalidConfig(_) | Self::DuplicateMeter { .. })
    }
}

impl From<FetchFailure> for SyncError {
    fn from(f: FetchFailure) -> Self {
        Self::Fetch(f)
    }
}
