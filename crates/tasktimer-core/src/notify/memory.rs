//! In-process transport that records every call.
//!
//! The transport double for tests. It tracks which notifications would be
//! on screen, so the one-per-slot rule can be asserted directly.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{
    Capabilities, Expiry, NotificationHandle, NotificationRequest, NotificationTransport, SlotId,
    Urgency,
};
use crate::error::NotifyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Notify,
    Update,
    Close,
}

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub kind: CallKind,
    pub slot: SlotId,
    pub id: Option<u32>,
    /// Id of the notification a `Notify` replaced.
    pub replaces: Option<u32>,
    pub title: String,
    pub body: String,
    pub urgency: Option<Urgency>,
    pub expiry: Option<Expiry>,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    /// (slot, id) of every notification currently on "screen".
    visible: Vec<(SlotId, u32)>,
    next_id: u32,
    failing: bool,
    failing_closes: bool,
}

#[derive(Debug)]
pub struct MemoryTransport {
    state: Mutex<State>,
    replace: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            replace: true,
        }
    }

    /// A transport that cannot replace in place.
    pub fn without_replace() -> Self {
        Self {
            replace: false,
            ..Self::new()
        }
    }

    /// Make every subsequent call fail (calls are still recorded).
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Make only `close` fail.
    pub fn set_failing_closes(&self, failing: bool) {
        self.lock().failing_closes = failing;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, slot: &SlotId, kind: CallKind) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.kind == kind && &c.slot == slot)
            .count()
    }

    /// Calls of `kind` across all slots.
    pub fn total(&self, kind: CallKind) -> usize {
        self.lock().calls.iter().filter(|c| c.kind == kind).count()
    }

    /// Notifications currently visible for `slot`.
    pub fn visible(&self, slot: &SlotId) -> usize {
        self.lock().visible.iter().filter(|(s, _)| s == slot).count()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn failure(slot: &SlotId) -> NotifyError {
        NotifyError::CommandFailed {
            program: "memory".to_string(),
            status: "simulated failure".to_string(),
            stderr: format!("slot {slot}"),
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationTransport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            replace: self.replace,
        }
    }

    async fn notify(
        &self,
        request: &NotificationRequest,
        replaces: Option<&NotificationHandle>,
    ) -> Result<NotificationHandle, NotifyError> {
        let mut state = self.lock();
        let replaced = replaces.and_then(|h| h.id);
        let id = if state.failing {
            None
        } else {
            state.next_id += 1;
            Some(state.next_id)
        };
        state.calls.push(Call {
            kind: CallKind::Notify,
            slot: request.slot.clone(),
            id,
            replaces: replaced,
            title: request.title.clone(),
            body: request.body.clone(),
            urgency: Some(request.urgency),
            expiry: Some(request.expiry),
        });

        let Some(id) = id else {
            return Err(Self::failure(&request.slot));
        };
        if let Some(old) = replaced {
            state.visible.retain(|(_, v)| *v != old);
        }
        state.visible.push((request.slot.clone(), id));
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
        let mut state = self.lock();
        state.calls.push(Call {
            kind: CallKind::Update,
            slot: request.slot.clone(),
            id: handle.id,
            replaces: None,
            title: request.title.clone(),
            body: request.body.clone(),
            urgency: Some(request.urgency),
            expiry: Some(request.expiry),
        });

        if state.failing {
            return Err(Self::failure(&request.slot));
        }
        let open = state.visible.iter().any(|(_, v)| Some(*v) == handle.id);
        if !open {
            return Err(NotifyError::ChannelClosed {
                slot: handle.slot.clone(),
            });
        }
        Ok(handle.clone())
    }

    async fn close(&self, handle: &NotificationHandle) -> Result<(), NotifyError> {
        let mut state = self.lock();
        state.calls.push(Call {
            kind: CallKind::Close,
            slot: handle.slot.clone(),
            id: handle.id,
            replaces: None,
            title: String::new(),
            body: String::new(),
            urgency: None,
            expiry: None,
        });

        if state.failing || state.failing_closes {
            return Err(Self::failure(&handle.slot));
        }
        state.visible.retain(|(_, v)| Some(*v) != handle.id);
        Ok(())
    }
}
