use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::{Expiry, NotificationHandle, NotificationRequest, NotificationTransport, SlotId, Urgency};
use crate::error::NotifyError;

/// Content for one show of a slot.
#[derive(Debug, Clone)]
pub struct Notice {
    title: String,
    body: String,
    urgency: Urgency,
    expiry: Expiry,
    icon: Option<String>,
}

impl Notice {
    /// A persistent, normal-urgency notice.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            urgency: Urgency::Normal,
            expiry: Expiry::Persistent,
            icon: None,
        }
    }

    pub fn urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn expires_after(mut self, after: Duration) -> Self {
        self.expiry = Expiry::After(after);
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    fn into_request(self, slot: SlotId) -> NotificationRequest {
        NotificationRequest {
            slot,
            title: self.title,
            body: self.body,
            urgency: self.urgency,
            expiry: self.expiry,
            icon: self.icon,
        }
    }
}

#[derive(Debug)]
struct Shown {
    handle: NotificationHandle,
    request: NotificationRequest,
}

/// Owner of one notification slot.
///
/// `show` supersedes whatever the slot currently displays: in place when
/// the transport can replace, otherwise by closing the old notification
/// first. When that close fails the old notification stays current and
/// `show` returns the error. `close` is idempotent.
pub struct NotificationChannel {
    slot: SlotId,
    transport: Arc<dyn NotificationTransport>,
    current: Option<Shown>,
}

impl NotificationChannel {
    pub fn new(slot: SlotId, transport: Arc<dyn NotificationTransport>) -> Self {
        Self {
            slot,
            transport,
            current: None,
        }
    }

    pub fn slot(&self) -> &SlotId {
        &self.slot
    }

    /// Whether a notification of ours is currently shown in this slot.
    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub async fn show(&mut self, notice: Notice) -> Result<(), NotifyError> {
        let request = notice.into_request(self.slot.clone());
        let replace = self.transport.capabilities().replace;
        let previous = self.current.take();

        if !replace {
            if let Some(shown) = &previous {
                // Showing on top of a notification that is still up would
                // leave two in the slot.
                if let Err(e) = self.transport.close(&shown.handle).await {
                    warn!(slot = %self.slot, error = %e, "failed to close superseded notification");
                    self.current = previous;
                    return Err(e);
                }
            }
        }

        let replaces = if replace {
            previous.as_ref().map(|shown| &shown.handle)
        } else {
            None
        };

        match self.transport.notify(&request, replaces).await {
            Ok(handle) => {
                self.current = Some(Shown { handle, request });
                Ok(())
            }
            Err(e) => {
                // A failed in-place replace leaves the old notification up.
                if replace {
                    self.current = previous;
                }
                Err(e)
            }
        }
    }

    /// Change title and body of the open notification, keeping its urgency
    /// and expiry.
    pub async fn update(&mut self, title: &str, body: &str) -> Result<(), NotifyError> {
        let Some(shown) = self.current.as_mut() else {
            return Err(NotifyError::ChannelClosed {
                slot: self.slot.clone(),
            });
        };

        let mut request = shown.request.clone();
        request.title = title.to_string();
        request.body = body.to_string();

        let handle = self.transport.update(&shown.handle, &request).await?;
        shown.handle = handle;
        shown.request = request;
        Ok(())
    }

    /// Remove this slot's notification. Safe to call on a closed channel.
    pub async fn close(&mut self) {
        let Some(shown) = self.current.take() else {
            return;
        };
        if let Err(e) = self.transport.close(&shown.handle).await {
            warn!(slot = %self.slot, error = %e, "failed to close notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::memory::{CallKind, MemoryTransport};

    fn channel(transport: &Arc<MemoryTransport>) -> NotificationChannel {
        NotificationChannel::new(SlotId::new("slot"), transport.clone())
    }

    #[tokio::test]
    async fn show_twice_replaces_in_place() {
        let transport = Arc::new(MemoryTransport::new());
        let mut ch = channel(&transport);

        ch.show(Notice::new("one", "")).await.unwrap();
        ch.show(Notice::new("two", "")).await.unwrap();

        assert_eq!(transport.count(&SlotId::new("slot"), CallKind::Notify), 2);
        assert_eq!(transport.visible(&SlotId::new("slot")), 1);
    }

    #[tokio::test]
    async fn show_without_replace_support_closes_first() {
        let transport = Arc::new(MemoryTransport::without_replace());
        let mut ch = channel(&transport);

        ch.show(Notice::new("one", "")).await.unwrap();
        ch.show(Notice::new("two", "")).await.unwrap();

        let slot = SlotId::new("slot");
        assert_eq!(transport.count(&slot, CallKind::Close), 1);
        assert_eq!(transport.visible(&slot), 1);
    }

    #[tokio::test]
    async fn failed_close_without_replace_support_keeps_one_visible() {
        let transport = Arc::new(MemoryTransport::without_replace());
        let mut ch = channel(&transport);
        let slot = SlotId::new("slot");

        ch.show(Notice::new("one", "")).await.unwrap();
        transport.set_failing_closes(true);
        assert!(ch.show(Notice::new("two", "")).await.is_err());

        assert_eq!(transport.count(&slot, CallKind::Notify), 1);
        assert_eq!(transport.visible(&slot), 1);
        assert!(ch.is_open());

        transport.set_failing_closes(false);
        ch.show(Notice::new("two", "")).await.unwrap();
        assert_eq!(transport.visible(&slot), 1);
        ch.close().await;
        assert_eq!(transport.visible(&slot), 0);
    }

    #[tokio::test]
    async fn update_requires_open_notification() {
        let transport = Arc::new(MemoryTransport::new());
        let mut ch = channel(&transport);

        let err = ch.update("t", "b").await.unwrap_err();
        assert!(matches!(err, NotifyError::ChannelClosed { .. }));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn update_keeps_urgency_and_expiry() {
        let transport = Arc::new(MemoryTransport::new());
        let mut ch = channel(&transport);

        ch.show(Notice::new("t", "b").urgency(Urgency::Critical))
            .await
            .unwrap();
        ch.update("t2", "b2").await.unwrap();

        let last = transport.calls().pop().unwrap();
        assert_eq!(last.kind, CallKind::Update);
        assert_eq!(last.title, "t2");
        assert_eq!(last.urgency, Some(Urgency::Critical));
        assert_eq!(last.expiry, Some(Expiry::Persistent));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let transport = Arc::new(MemoryTransport::new());
        let mut ch = channel(&transport);

        ch.close().await;
        ch.show(Notice::new("t", "b")).await.unwrap();
        ch.close().await;
        ch.close().await;

        assert!(!ch.is_open());
        assert_eq!(transport.count(&SlotId::new("slot"), CallKind::Close), 1);
        assert_eq!(transport.visible(&SlotId::new("slot")), 0);
    }

    #[tokio::test]
    async fn failed_replace_keeps_previous_handle() {
        let transport = Arc::new(MemoryTransport::new());
        let mut ch = channel(&transport);

        ch.show(Notice::new("one", "")).await.unwrap();
        transport.set_failing(true);
        assert!(ch.show(Notice::new("two", "")).await.is_err());
        transport.set_failing(false);

        assert!(ch.is_open());
        ch.close().await;
        assert_eq!(transport.visible(&SlotId::new("slot")), 0);
    }
}
