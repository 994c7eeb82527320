//! Reminder and notification types.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{FailureKind, ReconcileError};

/// Identifier of a reminder, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(Uuid);

impl ReminderId {
    /// Mint a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ReminderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Identifier of one scheduling intent. Also the key the platform alert is
/// registered and cancelled under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Mint a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A user-visible task item, optionally bound to one scheduled alert.
///
/// Equality and hashing use `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    /// Immutable identity.
    pub id: ReminderId,
    /// Display text. Non-empty; checked by the collection.
    pub title: String,
    /// Completion flag. Irrelevant to scheduling.
    pub done: bool,
    /// Present iff an alert is currently requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

impl Reminder {
    /// Create a new, not-done reminder without a notification.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: ReminderId::new(),
            title: title.into(),
            done: false,
            notification: None,
        }
    }

    pub fn has_notification(&self) -> bool {
        self.notification.is_some()
    }

    /// Position of this reminder's alert in its lifecycle.
    pub fn alert_state(&self) -> AlertState {
        match &self.notification {
            None => AlertState::Absent,
            Some(n) if n.successfully_created => AlertState::Scheduled,
            Some(n) if n.failure.is_some() => AlertState::Failed,
            Some(_) => AlertState::PendingPermission,
        }
    }

    /// Sample reminders for a fresh list.
    pub fn examples() -> Vec<Reminder> {
        let mut finished = Reminder::new("Finish Computer Science task");
        finished.done = true;
        vec![
            Reminder::new("Study for Chemistry quiz"),
            finished,
            Reminder::new("Go for a run around campus"),
        ]
    }
}

impl PartialEq for Reminder {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Reminder {}

impl Hash for Reminder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The scheduled-alert record owned by a reminder.
///
/// Equality and hashing use `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Key for registering and cancelling the platform alert.
    pub id: NotificationId,
    /// When the alert should fire.
    pub scheduled_for: DateTime<Utc>,
    /// True only if the platform accepted the last attempt.
    #[serde(default)]
    pub successfully_created: bool,
    /// Why the last settled attempt failed, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl Notification {
    /// A new, not yet attempted notification with a fresh id.
    pub fn new(scheduled_for: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            scheduled_for,
            successfully_created: false,
            failure: None,
        }
    }

    /// Move the alert to a new time, keeping its id. Clears the previous outcome.
    pub fn reschedule(&mut self, scheduled_for: DateTime<Utc>) {
        self.scheduled_for = scheduled_for;
        self.successfully_created = false;
        self.failure = None;
    }

    /// Record the outcome of a settled attempt.
    pub fn record(&mut self, result: Result<(), FailureKind>) {
        match result {
            Ok(()) => {
                self.successfully_created = true;
                self.failure = None;
            }
            Err(kind) => {
                self.successfully_created = false;
                self.failure = Some(kind);
            }
        }
    }
}

impl PartialEq for Notification {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Notification {}

impl Hash for Notification {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Lifecycle state of a single reminder's alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    /// No alert requested.
    Absent,
    /// Attempt staged, waiting on consent or the platform.
    PendingPermission,
    /// Platform accepted the alert.
    Scheduled,
    /// Permission denied or platform rejected; user may retry.
    Failed,
}

/// The alert state a user asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedAlert {
    /// No alert.
    None,
    /// An alert at this time.
    At(DateTime<Utc>),
}

impl RequestedAlert {
    /// Reject requested times that are not strictly after `now`.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ReconcileError> {
        match self {
            Self::At(requested) if *requested <= now => Err(ReconcileError::NotInFuture {
                requested: *requested,
                now,
            }),
            _ => Ok(()),
        }
    }
}

impl From<Option<DateTime<Utc>>> for RequestedAlert {
    fn from(at: Option<DateTime<Utc>>) -> Self {
        at.map_or(Self::None, Self::At)
    }
}
