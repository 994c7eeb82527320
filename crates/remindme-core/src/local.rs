//! In-process alert platform backed by tokio timers.
//!
//! Alerts are held as sleeping tasks keyed by their registration key and
//! delivered on a channel when they fire. Consent is simulated by a fixed
//! [`ConsentPolicy`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{AlertPlatform, AlertRegistration, AuthorizationStatus, PlatformError};

/// How the simulated user answers the consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentPolicy {
    /// Permission was granted before the app started.
    Granted,
    /// Permission was denied before the app started.
    Denied,
    /// Not asked yet; the first prompt is answered with `allow`.
    Ask { allow: bool },
}

/// An alert that reached its time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredAlert {
    pub key: Uuid,
    pub title: String,
    pub fire_at: DateTime<Utc>,
}

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Timer-backed [`AlertPlatform`].
pub struct LocalPlatform {
    status: RwLock<AuthorizationStatus>,
    prompt_answer: bool,
    timers: Arc<DashMap<Uuid, Timer>>,
    generation: AtomicU64,
    fired_tx: mpsc::UnboundedSender<FiredAlert>,
}

impl LocalPlatform {
    /// Create a platform and the receiver its fired alerts are sent to.
    pub fn new(policy: ConsentPolicy) -> (Arc<Self>, mpsc::UnboundedReceiver<FiredAlert>) {
        let (status, prompt_answer) = match policy {
            ConsentPolicy::Granted => (AuthorizationStatus::Granted, true),
            ConsentPolicy::Denied => (AuthorizationStatus::Denied, false),
            ConsentPolicy::Ask { allow } => (AuthorizationStatus::Undetermined, allow),
        };
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();

        let platform = Arc::new(Self {
            status: RwLock::new(status),
            prompt_answer,
            timers: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
            fired_tx,
        });
        (platform, fired_rx)
    }

    /// Number of alerts registered and not yet fired or cancelled.
    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }

    /// Whether an alert is registered under `key`.
    pub fn is_pending(&self, key: Uuid) -> bool {
        self.timers.contains_key(&key)
    }
}

#[async_trait]
impl AlertPlatform for LocalPlatform {
    async fn authorization_status(&self) -> AuthorizationStatus {
        *self.status.read().await
    }

    async fn request_authorization(&self) -> Result<bool, PlatformError> {
        let mut status = self.status.write().await;
        if *status == AuthorizationStatus::Undetermined {
            *status = if self.prompt_answer {
                AuthorizationStatus::Granted
            } else {
                AuthorizationStatus::Denied
            };
            info!(status = ?*status, "consent prompt answered");
        }
        Ok(*status == AuthorizationStatus::Granted)
    }

    async fn register_alert(&self, registration: &AlertRegistration) -> Result<(), PlatformError> {
        if *self.status.read().await != AuthorizationStatus::Granted {
            return Err(PlatformError::Rejected("alerts are not authorized".to_string()));
        }

        let delay = (registration.fire_at - Utc::now())
            .to_std()
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| {
                PlatformError::Rejected(format!(
                    "trigger time {} is not in the future",
                    registration.fire_at
                ))
            })?;

        let key = registration.key;
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let fired = FiredAlert {
            key,
            title: registration.title.clone(),
            fire_at: registration.fire_at,
        };
        let timers = Arc::clone(&self.timers);
        let fired_tx = self.fired_tx.clone();

        // The entry stays locked until the timer is stored, so a timer that
        // fires immediately still finds itself in the table.
        let spawn = || {
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                timers.remove_if(&key, |_, timer| timer.generation == generation);
                info!(%key, title = %fired.title, "alert fired");
                // Receiver gone means nobody is listening any more.
                let _ = fired_tx.send(fired);
            });
            Timer { generation, handle }
        };
        match self.timers.entry(key) {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(spawn());
                previous.handle.abort();
                debug!(%key, "replaced existing alert");
            }
            Entry::Vacant(vacant) => {
                vacant.insert(spawn());
            }
        }
        Ok(())
    }

    async fn cancel_alert(&self, key: Uuid) {
        if let Some((_, timer)) = self.timers.remove(&key) {
            timer.handle.abort();
            debug!(%key, "alert timer aborted");
        }
    }
}

impl Drop for LocalPlatform {
    fn drop(&mut self) {
        for timer in self.timers.iter() {
            timer.handle.abort();
        }
    }
}
