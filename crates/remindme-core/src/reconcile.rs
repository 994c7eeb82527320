//! Reconciliation of a reminder's requested alert against its current one.
//!
//! Each request is classified into exactly one [`Transition`] and carried out
//! with at most one cancel and one schedule call. Work on the same reminder is
//! serialized through [`ReminderLocks`]; different reminders never contend.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::{
    AlertPlatform, FailureKind, Notification, NotificationScheduler, ReconcileError, Reminder,
    ReminderId, RequestedAlert,
};

/// What a reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing requested, nothing attached.
    Unchanged,
    /// A new alert was scheduled.
    Created,
    /// An existing alert was cancelled and scheduled again.
    Updated,
    /// The alert was cancelled and the notification cleared.
    Removed,
    /// The schedule attempt failed; the notification stays attached, unconfirmed.
    Failed(FailureKind),
}

impl ReconcileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A reminder after reconciliation, with what happened to it.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub reminder: Reminder,
    pub outcome: ReconcileOutcome,
}

/// Classified change between a reminder's prior and requested alert state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// none -> none
    Unchanged,
    /// none -> some(at)
    Create { at: DateTime<Utc> },
    /// some -> some(at)
    Update { at: DateTime<Utc> },
    /// some -> none
    Remove,
}

impl Transition {
    /// Classify a request against the currently attached notification.
    pub fn classify(prior: Option<&Notification>, requested: RequestedAlert) -> Self {
        match (prior, requested) {
            (None, RequestedAlert::None) => Self::Unchanged,
            (None, RequestedAlert::At(at)) => Self::Create { at },
            (Some(_), RequestedAlert::At(at)) => Self::Update { at },
            (Some(_), RequestedAlert::None) => Self::Remove,
        }
    }

    /// Put the reminder's notification into its pending form for this
    /// transition. A new id is minted only when none is attached; an update
    /// keeps the id. Staging twice is harmless.
    pub fn stage(&self, reminder: &mut Reminder) {
        match *self {
            Self::Create { at } => {
                if reminder.notification.is_none() {
                    reminder.notification = Some(Notification::new(at));
                }
            }
            Self::Update { at } => match reminder.notification.as_mut() {
                Some(notification) => notification.reschedule(at),
                None => reminder.notification = Some(Notification::new(at)),
            },
            Self::Unchanged | Self::Remove => {}
        }
    }
}

/// Per-reminder single-flight locks.
///
/// An entry lives only while some task holds or waits for it.
#[derive(Default)]
pub struct ReminderLocks {
    locks: Arc<DashMap<ReminderId, Arc<Mutex<()>>>>,
}

/// Proof that the holder is the only task operating on one reminder.
pub struct ReminderGuard {
    id: ReminderId,
    locks: Arc<DashMap<ReminderId, Arc<Mutex<()>>>>,
    held: OwnedMutexGuard<()>,
}

impl ReminderGuard {
    pub fn id(&self) -> ReminderId {
        self.id
    }
}

impl Drop for ReminderGuard {
    fn drop(&mut self) {
        // The map's copy plus the one inside `held`; anything more is a waiter.
        let lock = OwnedMutexGuard::mutex(&self.held);
        self.locks.remove_if(&self.id, |_, entry| {
            Arc::ptr_eq(entry, lock) && Arc::strong_count(entry) == 2
        });
    }
}

impl ReminderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other operation is in flight for `id`, then hold it.
    /// Waiters are served in arrival order.
    pub async fn acquire(&self, id: ReminderId) -> ReminderGuard {
        let lock = self.locks.entry(id).or_default().clone();
        let held = lock.lock_owned().await;
        ReminderGuard {
            id,
            locks: Arc::clone(&self.locks),
            held,
        }
    }

    /// Whether an operation currently holds `id`.
    pub fn is_busy(&self, id: ReminderId) -> bool {
        self.locks
            .get(&id)
            .is_some_and(|lock| lock.try_lock().is_err())
    }

    /// Number of reminders with an operation holding or waiting.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// The reconciliation engine.
pub struct Reconciler {
    scheduler: NotificationScheduler,
    locks: ReminderLocks,
}

impl Reconciler {
    pub fn new(scheduler: NotificationScheduler) -> Self {
        Self {
            scheduler,
            locks: ReminderLocks::new(),
        }
    }

    /// Build an engine with a scheduler over `platform`.
    pub fn with_platform(platform: Arc<dyn AlertPlatform>) -> Self {
        Self::new(NotificationScheduler::new(platform))
    }

    pub fn locks(&self) -> &ReminderLocks {
        &self.locks
    }

    /// Editing-surface entry point: wait for the reminder's turn, then reconcile.
    pub async fn apply_notification_request(
        &self,
        reminder: Reminder,
        requested: RequestedAlert,
    ) -> Result<Reconciled, ReconcileError> {
        let guard = self.locks.acquire(reminder.id).await;
        self.reconcile(&guard, reminder, requested).await
    }

    /// Validate, classify and carry out a request.
    ///
    /// A requested time that is not strictly in the future is the only error;
    /// scheduling failures land in the notification and the outcome.
    #[tracing::instrument(skip(self, guard, reminder), fields(reminder = %reminder.id))]
    pub async fn reconcile(
        &self,
        guard: &ReminderGuard,
        reminder: Reminder,
        requested: RequestedAlert,
    ) -> Result<Reconciled, ReconcileError> {
        requested.validate(Utc::now())?;
        let transition = Transition::classify(reminder.notification.as_ref(), requested);
        debug!(?transition, "classified alert request");
        Ok(self.execute(guard, reminder, transition).await)
    }

    /// Carry out an already classified transition. Stages it first if the
    /// caller has not.
    pub async fn execute(
        &self,
        guard: &ReminderGuard,
        mut reminder: Reminder,
        transition: Transition,
    ) -> Reconciled {
        debug_assert_eq!(guard.id(), reminder.id, "guard held for another reminder");
        transition.stage(&mut reminder);

        let outcome = match transition {
            Transition::Unchanged => ReconcileOutcome::Unchanged,
            Transition::Create { .. } => {
                self.schedule_and_record(&mut reminder, ReconcileOutcome::Created)
                    .await
            }
            Transition::Update { .. } => {
                // The old registration goes first so two ids never coexist.
                self.scheduler.cancel(&reminder).await;
                self.schedule_and_record(&mut reminder, ReconcileOutcome::Updated)
                    .await
            }
            Transition::Remove => {
                self.scheduler.cancel(&reminder).await;
                reminder.notification = None;
                ReconcileOutcome::Removed
            }
        };

        match outcome {
            ReconcileOutcome::Failed(kind) => {
                warn!(reminder = %reminder.id, ?kind, "alert left unconfirmed")
            }
            ReconcileOutcome::Unchanged => {}
            _ => info!(reminder = %reminder.id, ?outcome, "alert reconciled"),
        }

        Reconciled { reminder, outcome }
    }

    /// Re-register an already attached alert so its content follows the
    /// reminder's current title. Alerts whose time has passed are left alone.
    pub async fn refresh_content(&self, guard: &ReminderGuard, reminder: Reminder) -> Reconciled {
        let transition = match &reminder.notification {
            Some(notification) if notification.scheduled_for > Utc::now() => Transition::Update {
                at: notification.scheduled_for,
            },
            _ => Transition::Unchanged,
        };
        self.execute(guard, reminder, transition).await
    }

    async fn schedule_and_record(
        &self,
        reminder: &mut Reminder,
        success: ReconcileOutcome,
    ) -> ReconcileOutcome {
        let result = self.scheduler.schedule(reminder).await.map_err(|e| e.kind());
        if let Some(notification) = reminder.notification.as_mut() {
            notification.record(result);
        }
        match result {
            Ok(()) => success,
            Err(kind) => ReconcileOutcome::Failed(kind),
        }
    }
}
