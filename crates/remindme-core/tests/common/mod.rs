//! Shared test fixtures: a recording alert platform.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Semaphore;
use uuid::Uuid;

use remindme_core::{
    AlertPlatform, AlertRegistration, AuthorizationStatus, PlatformError, ReminderCollection,
    Reconciler,
};

/// A call made against the platform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Status,
    RequestAuthorization,
    Register {
        key: Uuid,
        fire_at: DateTime<Utc>,
        title: String,
    },
    Cancel {
        key: Uuid,
    },
}

/// Fake platform that records every call and keeps a table of live alerts.
pub struct RecordingPlatform {
    status: Mutex<AuthorizationStatus>,
    prompt_answer: Mutex<Result<bool, PlatformError>>,
    register_failure: Mutex<Option<PlatformError>>,
    calls: Mutex<Vec<PlatformCall>>,
    live: Mutex<HashMap<Uuid, AlertRegistration>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl RecordingPlatform {
    pub fn new(status: AuthorizationStatus) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(status),
            prompt_answer: Mutex::new(Ok(true)),
            register_failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            live: Mutex::new(HashMap::new()),
            gate: Mutex::new(None),
        })
    }

    pub fn granted() -> Arc<Self> {
        Self::new(AuthorizationStatus::Granted)
    }

    /// Permission not asked yet; the prompt answers with `answer`.
    pub fn undetermined(answer: Result<bool, PlatformError>) -> Arc<Self> {
        let platform = Self::new(AuthorizationStatus::Undetermined);
        platform.set_prompt_answer(answer);
        platform
    }

    pub fn set_status(&self, status: AuthorizationStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn status(&self) -> AuthorizationStatus {
        *self.status.lock().unwrap()
    }

    pub fn set_prompt_answer(&self, answer: Result<bool, PlatformError>) {
        *self.prompt_answer.lock().unwrap() = answer;
    }

    /// Make every registration fail with `failure` until cleared with `None`.
    pub fn set_register_failure(&self, failure: Option<PlatformError>) {
        *self.register_failure.lock().unwrap() = failure;
    }

    /// Block registrations until permits are added to the returned semaphore.
    pub fn hold_registrations(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Only register and cancel calls.
    pub fn alert_calls(&self) -> Vec<PlatformCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, PlatformCall::Register { .. } | PlatformCall::Cancel { .. }))
            .collect()
    }

    pub fn registrations(&self) -> Vec<PlatformCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, PlatformCall::Register { .. }))
            .collect()
    }

    pub fn cancellations(&self) -> Vec<PlatformCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, PlatformCall::Cancel { .. }))
            .collect()
    }

    pub fn prompt_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, PlatformCall::RequestAuthorization))
            .count()
    }

    /// Alerts currently registered and not cancelled.
    pub fn live(&self) -> HashMap<Uuid, AlertRegistration> {
        self.live.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AlertPlatform for RecordingPlatform {
    async fn authorization_status(&self) -> AuthorizationStatus {
        self.record(PlatformCall::Status);
        self.status()
    }

    async fn request_authorization(&self) -> Result<bool, PlatformError> {
        self.record(PlatformCall::RequestAuthorization);
        let answer = self.prompt_answer.lock().unwrap().clone();
        if let Ok(allow) = answer {
            let mut status = self.status.lock().unwrap();
            if *status == AuthorizationStatus::Undetermined {
                *status = if allow {
                    AuthorizationStatus::Granted
                } else {
                    AuthorizationStatus::Denied
                };
            }
        }
        answer
    }

    async fn register_alert(&self, registration: &AlertRegistration) -> Result<(), PlatformError> {
        self.record(PlatformCall::Register {
            key: registration.key,
            fire_at: registration.fire_at,
            title: registration.title.clone(),
        });

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        if let Some(failure) = self.register_failure.lock().unwrap().clone() {
            return Err(failure);
        }
        self.live
            .lock()
            .unwrap()
            .insert(registration.key, registration.clone());
        Ok(())
    }

    async fn cancel_alert(&self, key: Uuid) {
        self.record(PlatformCall::Cancel { key });
        self.live.lock().unwrap().remove(&key);
    }
}

pub fn reconciler(platform: &Arc<RecordingPlatform>) -> Arc<Reconciler> {
    Arc::new(Reconciler::with_platform(platform.clone()))
}

pub fn collection(platform: &Arc<RecordingPlatform>) -> Arc<ReminderCollection> {
    Arc::new(ReminderCollection::new(reconciler(platform)))
}

pub fn in_hours(hours: i64) -> DateTime<Utc> {
    Utc::now() + Duration::hours(hours)
}

/// Yield until `check` holds, giving spawned tasks a chance to run.
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if check() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
