//! Ordered, shared list of reminders.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    ReconcileError, Reconciled, Reconciler, Reminder, ReminderId, RequestedAlert, Transition,
};

/// The reminder list the UI works against.
///
/// Insertion order is stable. Alert changes are routed through the
/// [`Reconciler`], one operation per reminder at a time; deleting a reminder
/// cancels its alert first.
pub struct ReminderCollection {
    reminders: RwLock<Vec<Reminder>>,
    reconciler: Arc<Reconciler>,
}

impl ReminderCollection {
    /// Create an empty collection.
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self {
            reminders: RwLock::new(Vec::new()),
            reconciler,
        }
    }

    /// Create a collection holding the sample reminders.
    pub fn seeded(reconciler: Arc<Reconciler>) -> Self {
        Self {
            reminders: RwLock::new(Reminder::examples()),
            reconciler,
        }
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Snapshot of all reminders in insertion order.
    pub async fn list(&self) -> Vec<Reminder> {
        self.reminders.read().await.clone()
    }

    pub async fn get(&self, id: ReminderId) -> Option<Reminder> {
        self.reminders
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.reminders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reminders.read().await.is_empty()
    }

    /// Add a reminder, optionally with an alert.
    ///
    /// The reminder is listed (with a pending alert, if one was requested)
    /// before the platform is contacted.
    pub async fn create(
        &self,
        title: &str,
        requested: RequestedAlert,
    ) -> Result<Reconciled, ReconcileError> {
        let title = normalize_title(title)?;
        requested.validate(Utc::now())?;

        let mut reminder = Reminder::new(title);
        let guard = self.reconciler.locks().acquire(reminder.id).await;

        let transition = Transition::classify(None, requested);
        transition.stage(&mut reminder);
        self.reminders.write().await.push(reminder.clone());
        info!(reminder = %reminder.id, title = %reminder.title, "reminder created");

        let reconciled = self.reconciler.execute(&guard, reminder, transition).await;
        self.store_notification(&reconciled.reminder).await;
        Ok(reconciled)
    }

    /// Change the alert of an existing reminder. Waits for any operation
    /// already in flight for the same reminder.
    pub async fn apply_notification_request(
        &self,
        id: ReminderId,
        requested: RequestedAlert,
    ) -> Result<Reconciled, ReconcileError> {
        let guard = self.reconciler.locks().acquire(id).await;
        let mut reminder = self
            .get(id)
            .await
            .ok_or_else(|| ReconcileError::NotFound(id.to_string()))?;
        requested.validate(Utc::now())?;

        let transition = Transition::classify(reminder.notification.as_ref(), requested);
        transition.stage(&mut reminder);
        self.store_notification(&reminder).await;

        let reconciled = self.reconciler.execute(&guard, reminder, transition).await;
        self.store_notification(&reconciled.reminder).await;
        Ok(reconciled)
    }

    /// Change a reminder's title. An attached alert is re-registered so its
    /// content shows the new title.
    pub async fn rename(&self, id: ReminderId, title: &str) -> Result<Reconciled, ReconcileError> {
        let title = normalize_title(title)?;
        let guard = self.reconciler.locks().acquire(id).await;

        let reminder = {
            let mut reminders = self.reminders.write().await;
            let entry = reminders
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| ReconcileError::NotFound(id.to_string()))?;
            entry.title = title;
            entry.clone()
        };
        debug!(reminder = %id, "reminder renamed");

        let reconciled = self.reconciler.refresh_content(&guard, reminder).await;
        self.store_notification(&reconciled.reminder).await;
        Ok(reconciled)
    }

    /// Mark a reminder done or not done. Scheduling is unaffected.
    pub async fn set_done(&self, id: ReminderId, done: bool) -> Result<Reminder, ReconcileError> {
        let mut reminders = self.reminders.write().await;
        let entry = reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ReconcileError::NotFound(id.to_string()))?;
        entry.done = done;
        Ok(entry.clone())
    }

    /// Remove a reminder, cancelling its alert first.
    ///
    /// Waits for an in-flight operation on the same reminder to settle, so a
    /// schedule racing with the delete is still cancelled afterwards.
    pub async fn delete(&self, id: ReminderId) -> Result<Reminder, ReconcileError> {
        let guard = self.reconciler.locks().acquire(id).await;
        let reminder = self
            .get(id)
            .await
            .ok_or_else(|| ReconcileError::NotFound(id.to_string()))?;

        let reminder = if reminder.has_notification() {
            self.reconciler
                .execute(&guard, reminder, Transition::Remove)
                .await
                .reminder
        } else {
            reminder
        };

        self.reminders.write().await.retain(|r| r.id != id);
        drop(guard);

        info!(reminder = %id, "reminder deleted");
        Ok(reminder)
    }

    /// Write back the engine-owned field. Title and done may have changed
    /// meanwhile and are kept.
    async fn store_notification(&self, reminder: &Reminder) {
        let mut reminders = self.reminders.write().await;
        if let Some(entry) = reminders.iter_mut().find(|r| r.id == reminder.id) {
            entry.notification = reminder.notification.clone();
        }
    }
}

fn normalize_title(title: &str) -> Result<String, ReconcileError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ReconcileError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}
