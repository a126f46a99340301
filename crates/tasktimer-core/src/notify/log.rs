//! Headless transport: notifications become tracing events.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Capabilities, NotificationHandle, NotificationRequest, NotificationTransport};
use crate::error::NotifyError;

#[derive(Debug, Default)]
pub struct LogTransport {
    next_id: AtomicU32,
}

impl LogTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationTransport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { replace: true }
    }

    async fn notify(
        &self,
        request: &NotificationRequest,
        replaces: Option<&NotificationHandle>,
    ) -> Result<NotificationHandle, NotifyError> {
        let id = match replaces.and_then(|h| h.id) {
            Some(id) => id,
            None => self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
        };
        info!(
            slot = %request.slot,
            id,
            urgency = request.urgency.as_str(),
            title = %request.title,
            body = %request.body,
            "notification"
        );
        Ok(NotificationHandle {
            slot: request.slot.clone(),
            id: Some(id),
        })
    }

    async fn update(
        &self,
        handle: &NotificationHandle,
        request: &NotificationRequest,
    ) -> Result<NotificationHandle, NotifyError> {
        debug!(slot = %request.slot, id = ?handle.id, body = %request.body, "notification updated");
        Ok(handle.clone())
    }

    async fn close(&self, handle: &NotificationHandle) -> Result<(), NotifyError> {
        debug!(slot = %handle.slot, id = ?handle.id, "notification closed");
        Ok(())
    }
}
