//! Alert platform collaborator and the permission gate over it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::PlatformError;

/// Platform alert-permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    Undetermined,
    Granted,
    Denied,
}

/// Answer to a consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionDecision {
    Granted,
    Denied,
}

impl PermissionDecision {
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }

    /// Whether the user must be pointed at system settings to recover.
    pub fn needs_settings(self) -> bool {
        matches!(self, Self::Denied)
    }
}

/// A request to fire one alert at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRegistration {
    /// Stable key; registering twice with the same key overwrites.
    pub key: Uuid,
    pub fire_at: DateTime<Utc>,
    pub title: String,
}

/// The platform that owns alert permission and delivery.
#[async_trait]
pub trait AlertPlatform: Send + Sync {
    /// Read the permission state without prompting.
    async fn authorization_status(&self) -> AuthorizationStatus;

    /// Show the consent prompt and wait for the answer.
    async fn request_authorization(&self) -> Result<bool, PlatformError>;

    /// Register (or overwrite) an alert under `registration.key`.
    async fn register_alert(&self, registration: &AlertRegistration) -> Result<(), PlatformError>;

    /// Remove any alert registered under `key`. Unknown keys are ignored.
    async fn cancel_alert(&self, key: Uuid);
}

/// Negotiates alert permission. Holds no state of its own: every call goes
/// back to the platform, so a revocation between sessions is seen at once.
#[derive(Clone)]
pub struct PermissionGate {
    platform: Arc<dyn AlertPlatform>,
}

impl PermissionGate {
    pub fn new(platform: Arc<dyn AlertPlatform>) -> Self {
        Self { platform }
    }

    /// Current permission state, without prompting.
    pub async fn current_status(&self) -> AuthorizationStatus {
        self.platform.authorization_status().await
    }

    /// Prompt for consent. Platform faults count as a denial.
    pub async fn request_permission(&self) -> PermissionDecision {
        match self.platform.request_authorization().await {
            Ok(true) => {
                debug!("alert permission granted");
                PermissionDecision::Granted
            }
            Ok(false) => {
                debug!("alert permission declined");
                PermissionDecision::Denied
            }
            Err(e) => {
                warn!(error = %e, "permission request failed, treating as denied");
                PermissionDecision::Denied
            }
        }
    }
}
