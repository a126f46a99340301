//! Timeline of the day's tasks.
//!
//! Each task owns one persistent notification slot showing whether it is
//! upcoming or completed. A slot is shown once by `initialize` and re-shown
//! at most once by `mark_completed`. The active state is tracked here but
//! drawn by the countdown's own slot, so no slot has two owners.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::notify::{Notice, NotificationChannel, NotificationTransport, SlotId, Urgency};
use crate::schedule::Task;

/// Courtesy gap between consecutive timeline shows.
pub const DEFAULT_SHOW_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineStatus {
    Completed,
    Active,
    Upcoming,
}

impl TimelineStatus {
    pub fn label(self) -> &'static str {
        match self {
            TimelineStatus::Completed => "✅ Completed",
            TimelineStatus::Active => "⏳ Active Now",
            TimelineStatus::Upcoming => "📅 Upcoming",
        }
    }

    pub fn urgency(self) -> Urgency {
        match self {
            TimelineStatus::Completed => Urgency::Low,
            TimelineStatus::Active => Urgency::Critical,
            TimelineStatus::Upcoming => Urgency::Normal,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            TimelineStatus::Completed => "emblem-ok",
            TimelineStatus::Active => "dialog-information",
            TimelineStatus::Upcoming => "appointment-soon",
        }
    }
}

struct Entry {
    task: Task,
    status: TimelineStatus,
    channel: NotificationChannel,
}

pub struct TimelineTracker {
    transport: Arc<dyn NotificationTransport>,
    entries: Vec<Entry>,
    delay: Duration,
    display: bool,
}

impl TimelineTracker {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self {
            transport,
            entries: Vec::new(),
            delay: DEFAULT_SHOW_DELAY,
            display: true,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Track statuses without drawing any notification.
    pub fn hidden(mut self) -> Self {
        self.display = false;
        self
    }

    pub fn status(&self, index: usize) -> Option<TimelineStatus> {
        self.entries.get(index).map(|e| e.status)
    }

    /// Show every task as upcoming, in order.
    pub async fn initialize(&mut self, tasks: &[Task]) {
        if !self.entries.is_empty() {
            warn!("timeline already initialized");
            return;
        }

        for (index, task) in tasks.iter().enumerate() {
            if index > 0 && self.display && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let mut entry = Entry {
                task: task.clone(),
                status: TimelineStatus::Upcoming,
                channel: NotificationChannel::new(SlotId::timeline(index), self.transport.clone()),
            };
            if self.display {
                render(&mut entry).await;
            }
            self.entries.push(entry);
        }
    }

    /// Record `index` as the running task. Drawn by the countdown slot.
    pub fn mark_active(&mut self, index: usize) {
        match self.entries.get_mut(index) {
            Some(entry) if entry.status == TimelineStatus::Upcoming => {
                entry.status = TimelineStatus::Active;
                debug!(index, task = %entry.task.name, "timeline entry active");
            }
            Some(entry) => {
                warn!(index, status = ?entry.status, "timeline entry cannot become active");
            }
            None => warn!(index, "no timeline entry"),
        }
    }

    /// Re-show the slot of `index` as completed, replacing it in place.
    pub async fn mark_completed(&mut self, index: usize) {
        let display = self.display;
        let Some(entry) = self.entries.get_mut(index) else {
            warn!(index, "no timeline entry");
            return;
        };
        if entry.status == TimelineStatus::Completed {
            warn!(index, "timeline entry already completed");
            return;
        }

        entry.status = TimelineStatus::Completed;
        if display {
            render(entry).await;
        }
    }
}

async fn render(entry: &mut Entry) {
    let status = entry.status;
    let notice = Notice::new(
        format!("{}: {}", status.label(), entry.task.name),
        format!(
            "Time: {} | Duration: {} min",
            entry.task.start_time, entry.task.duration_minutes
        ),
    )
    .urgency(status.urgency())
    .icon(status.icon());

    if let Err(e) = entry.channel.show(notice).await {
        warn!(slot = %entry.channel.slot(), error = %e, "timeline notification failed");
    }
}
