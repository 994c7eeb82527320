//! Error types for alert scheduling and reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by an alert platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The platform refused the request (e.g. a malformed trigger).
    #[error("alert rejected: {0}")]
    Rejected(String),

    /// Communication with the platform failed.
    #[error("platform transport failed: {0}")]
    Transport(String),
}

/// Why a scheduling attempt did not produce a confirmed alert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The user declined alert permission, now or earlier.
    #[error("alert permission denied")]
    PermissionDenied,

    /// The platform refused the alert.
    #[error("platform rejected alert: {0}")]
    PlatformRejected(String),

    /// The platform could not be reached.
    #[error("platform transport fault: {0}")]
    TransportFault(String),

    /// The reminder carries no notification to schedule.
    #[error("reminder {0} has no notification attached")]
    NoNotification(String),
}

impl ScheduleError {
    /// The persisted failure kind for this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::PermissionDenied => FailureKind::PermissionDenied,
            Self::PlatformRejected(_) | Self::NoNotification(_) => FailureKind::PlatformRejected,
            Self::TransportFault(_) => FailureKind::TransportFault,
        }
    }
}

impl From<PlatformError> for ScheduleError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Rejected(msg) => Self::PlatformRejected(msg),
            PlatformError::Transport(msg) => Self::TransportFault(msg),
        }
    }
}

/// Reason recorded on a notification whose last attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Recoverable by sending the user to system settings.
    PermissionDenied,
    /// Recoverable by adjusting the time and retrying.
    PlatformRejected,
    /// Treated like `PlatformRejected`.
    TransportFault,
}

impl FailureKind {
    /// Whether the user has to change system settings before a retry can succeed.
    pub fn needs_settings(self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

/// Precondition violations that abort a reconciliation before any platform call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Requested alert time is not strictly in the future.
    #[error("requested alert time {requested} is not after {now}")]
    NotInFuture {
        requested: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// Reminder title is empty after trimming.
    #[error("reminder title must not be empty")]
    EmptyTitle,

    /// No reminder with this id exists in the collection.
    #[error("reminder not found: {0}")]
    NotFound(String),
}
