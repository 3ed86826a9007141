use crate::foreground::registry::RequestId;
use crate::foreground::request::{Decision, RequestDescriptor, RequestKind};
use std::sync::mpsc::Sender;

/// Short user-facing notices the UI thread forwards to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    CaptchaInvalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMessage {
    Present(RequestDescriptor),
    Interrupt(RequestId),
    ResultAvailable { id: RequestId, decision: Decision },
    Notice(Notice),
}

/// Handle presenters use to report a decision back to the UI thread.
#[derive(Debug, Clone)]
pub struct ReplySender {
    sender: Sender<UiMessage>,
}

impl ReplySender {
    pub(crate) fn new(sender: Sender<UiMessage>) -> Self {
        Self { sender }
    }

    /// Returns `false` when the coordinator is gone.
    pub fn reply(&self, id: RequestId, decision: Decision) -> bool {
        self.sender
            .send(UiMessage::ResultAvailable { id, decision })
            .is_ok()
    }

    pub fn cancel(&self, id: RequestId, kind: RequestKind) -> bool {
        self.reply(id, Decision::cancelled(kind))
    }
}
