//! Places, replaces and cancels the single platform alert of a reminder.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    AlertPlatform, AlertRegistration, AuthorizationStatus, PermissionGate, Reminder,
    ScheduleError,
};

/// Scheduler for reminder alerts.
#[derive(Clone)]
pub struct NotificationScheduler {
    platform: Arc<dyn AlertPlatform>,
    gate: PermissionGate,
}

impl NotificationScheduler {
    /// Create a scheduler over `platform`.
    pub fn new(platform: Arc<dyn AlertPlatform>) -> Self {
        let gate = PermissionGate::new(Arc::clone(&platform));
        Self { platform, gate }
    }

    /// Register the reminder's alert, keyed by its notification id.
    ///
    /// Permission is re-checked on every call and requested if still
    /// undetermined. Every failure comes back as a `ScheduleError`; none is
    /// fatal. Registering the same id twice overwrites on the platform side.
    #[tracing::instrument(skip(self, reminder), fields(reminder = %reminder.id))]
    pub async fn schedule(&self, reminder: &Reminder) -> Result<(), ScheduleError> {
        let notification = reminder
            .notification
            .as_ref()
            .ok_or_else(|| ScheduleError::NoNotification(reminder.id.to_string()))?;

        match self.gate.current_status().await {
            AuthorizationStatus::Granted => {}
            AuthorizationStatus::Undetermined => {
                if !self.gate.request_permission().await.is_granted() {
                    info!("permission declined at prompt, not scheduling");
                    return Err(ScheduleError::PermissionDenied);
                }
            }
            AuthorizationStatus::Denied => {
                debug!("permission previously denied, not scheduling");
                return Err(ScheduleError::PermissionDenied);
            }
        }

        let registration = AlertRegistration {
            key: notification.id.as_uuid(),
            fire_at: notification.scheduled_for,
            title: reminder.title.clone(),
        };

        match self.platform.register_alert(&registration).await {
            Ok(()) => {
                info!(
                    notification = %notification.id,
                    fire_at = %notification.scheduled_for,
                    "alert scheduled"
                );
                Ok(())
            }
            Err(e) => {
                warn!(notification = %notification.id, error = %e, "platform refused alert");
                Err(e.into())
            }
        }
    }

    /// Remove the reminder's platform alert. Keyed by the notification id, or
    /// by the reminder id when no notification is attached. Leaves the
    /// reminder itself untouched.
    pub async fn cancel(&self, reminder: &Reminder) {
        let key = match &reminder.notification {
            Some(notification) => notification.id.as_uuid(),
            None => reminder.id.as_uuid(),
        };
        self.platform.cancel_alert(key).await;
        debug!(reminder = %reminder.id, %key, "alert cancelled");
    }
}
