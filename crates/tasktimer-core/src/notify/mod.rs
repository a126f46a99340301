//! Desktop notification slots.
//!
//! A [`NotificationTransport`] is the boundary to whatever actually draws
//! notifications. A [`NotificationChannel`] sits on top of it and owns one
//! logical slot: every show for a slot supersedes the previous one, so at
//! most one notification per slot is visible at any time.

mod channel;
pub mod log;
pub mod memory;
pub mod notify_send;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

pub use channel::{Notice, NotificationChannel};

/// Stable identity of one logical notification slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The running countdown.
    pub fn active() -> Self {
        Self::new("task-timer")
    }

    /// The timeline entry of task `index`.
    pub fn timeline(index: usize) -> Self {
        Self(format!("timeline-{index}"))
    }

    /// The expiry alarm.
    pub fn alarm() -> Self {
        Self::new("alarm")
    }

    /// The end-of-schedule notice.
    pub fn finished() -> Self {
        Self::new("schedule-finished")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Normal,
    Critical,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        }
    }
}

/// How long a notification stays on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Stays until closed or replaced.
    Persistent,
    /// Dismissed by the daemon after the given time.
    After(Duration),
}

/// One rendering of a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub slot: SlotId,
    pub title: String,
    pub body: String,
    pub urgency: Urgency,
    pub expiry: Expiry,
    pub icon: Option<String>,
}

/// Identity of the OS-level notification currently shown for a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationHandle {
    pub slot: SlotId,
    /// Daemon-assigned id. `None` when the transport could not report one,
    /// in which case replacement falls back to the slot's stack tag.
    pub id: Option<u32>,
}

/// What a transport can do natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// A new notification can replace an existing one in place.
    pub replace: bool,
}

/// Boundary to the notification daemon.
///
/// Implementations are called from a single control thread, one slot
/// operation at a time.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Short name for logs (e.g. "notify-send").
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Show a notification. With `replaces`, the new one takes the place of
    /// that handle's notification.
    async fn notify(
        &self,
        request: &NotificationRequest,
        replaces: Option<&NotificationHandle>,
    ) -> Result<NotificationHandle, NotifyError>;

    /// Refresh the content of an open notification.
    async fn update(
        &self,
        handle: &NotificationHandle,
        request: &NotificationRequest,
    ) -> Result<NotificationHandle, NotifyError>;

    async fn close(&self, handle: &NotificationHandle) -> Result<(), NotifyError>;

    /// Best-effort removal of every notification on screen, ours or not.
    async fn clear_all(&self) -> Result<(), NotifyError> {
        Ok(()) // default no-op
    }
}
