//! Reminder alert reconciliation and scheduling.
//!
//! This crate provides the decision core behind remindme's alerts:
//! - Entity types for reminders and their optional scheduled notification
//! - A permission gate over the platform's alert authorization
//! - A scheduler that places, replaces and cancels one alert per reminder
//! - A reconciliation engine mapping (prior, requested) alert state to
//!   scheduler calls, serialized per reminder
//! - An ordered reminder collection that cancels alerts on delete
//! - An in-process, timer-backed alert platform

mod collection;
mod error;
pub mod local;
mod permission;
mod reconcile;
mod scheduler;
mod types;

pub use collection::ReminderCollection;
pub use error::{FailureKind, PlatformError, ReconcileError, ScheduleError};
pub use local::{ConsentPolicy, FiredAlert, LocalPlatform};
pub use permission::{
    AlertPlatform, AlertRegistration, AuthorizationStatus, PermissionDecision, PermissionGate,
};
pub use reconcile::{
    ReconcileOutcome, Reconciled, Reconciler, ReminderGuard, ReminderLocks, Transition,
};
pub use scheduler::NotificationScheduler;
pub use types::{AlertState, Notification, NotificationId, Reminder, ReminderId, RequestedAlert};
