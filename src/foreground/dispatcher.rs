use crate::foreground::delayed::{DelayedMessage, DelayedMessages};
use crate::foreground::host::{
    can_transition, is_same_host, HostEvent, HostState, PresenterFactory, SurvivalStoreId, UiHost,
};
use crate::foreground::messages::{Notice, ReplySender, UiMessage};
use crate::foreground::registry::{RequestId, RequestRegistry};
use crate::foreground::request::{Decision, RequestDescriptor, Resolution};
use std::collections::{BTreeMap, HashSet};
use std::rc::{Rc, Weak};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

struct HostBinding {
    host: Option<Weak<dyn UiHost>>,
    store: Option<SurvivalStoreId>,
    state: HostState,
}

impl Default for HostBinding {
    fn default() -> Self {
        Self {
            host: None,
            store: None,
            state: HostState::Unbound,
        }
    }
}

impl HostBinding {
    fn is_bound_to(&self, host: &Rc<dyn UiHost>) -> bool {
        self.host
            .as_ref()
            .is_some_and(|bound| is_same_host(bound, host))
    }

    fn live_host(&self) -> Option<Rc<dyn UiHost>> {
        self.host.as_ref().and_then(Weak::upgrade)
    }
}

struct Presented {
    descriptor: RequestDescriptor,
    store: SurvivalStoreId,
}

enum Target {
    Host(Rc<dyn UiHost>, SurvivalStoreId),
    Deferred(SurvivalStoreId),
    Absent,
}

/// UI-thread half of the coordinator.
///
/// Owns the message receiver, the delayed-message buffer and the host
/// binding. Every method must be called from the UI thread; the type is
/// deliberately `!Send`.
pub struct ForegroundDispatcher {
    receiver: Receiver<UiMessage>,
    sender: Sender<UiMessage>,
    registry: Arc<RequestRegistry>,
    factory: Box<dyn PresenterFactory>,
    binding: HostBinding,
    delayed: DelayedMessages,
    presented: BTreeMap<RequestId, Presented>,
    delayed_warn_threshold: usize,
}

impl ForegroundDispatcher {
    pub(crate) fn new(
        receiver: Receiver<UiMessage>,
        sender: Sender<UiMessage>,
        registry: Arc<RequestRegistry>,
        factory: Box<dyn PresenterFactory>,
        delayed_warn_threshold: usize,
    ) -> Self {
        Self {
            receiver,
            sender,
            registry,
            factory,
            binding: HostBinding::default(),
            delayed: DelayedMessages::new(),
            presented: BTreeMap::new(),
            delayed_warn_threshold,
        }
    }

    pub fn host_state(&self) -> HostState {
        self.binding.state
    }

    pub fn survival_store(&self) -> Option<SurvivalStoreId> {
        self.binding.store
    }

    pub fn delayed_ids(&self) -> Vec<RequestId> {
        self.delayed.ids()
    }

    pub fn presented_ids(&self) -> Vec<RequestId> {
        self.presented.keys().copied().collect()
    }

    /// Handle every message already queued. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(message) => {
                    self.handle_message(message);
                    handled += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        handled
    }

    /// Wait up to `timeout` for a message, then drain the queue.
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => {
                self.handle_message(message);
                1 + self.pump()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    pub fn handle_message(&mut self, message: UiMessage) {
        match message {
            UiMessage::Present(descriptor) => self.deliver(descriptor),
            UiMessage::Interrupt(id) => self.handle_interrupt(id),
            UiMessage::ResultAvailable { id, decision } => self.handle_result(id, decision),
            UiMessage::Notice(notice) => self.handle_notice(notice),
        }
    }

    /// Attach `host` and reconcile what it already shows with the registry.
    ///
    /// Binding the instance that is already bound does nothing.
    pub fn bind(&mut self, host: &Rc<dyn UiHost>, store: SurvivalStoreId, initial: HostState) {
        if self.binding.is_bound_to(host) {
            tracing::debug!("host already bound; skipping reconciliation");
            return;
        }
        let state = match initial {
            HostState::Active | HostState::Transient => initial,
            other => {
                tracing::warn!(state = ?other, "host bound in unexpected state; treating as transient");
                HostState::Transient
            }
        };
        if self.binding.store.is_some_and(|previous| previous != store) {
            tracing::debug!(?store, "host bound with a new survival store");
        }
        self.binding = HostBinding {
            host: Some(Rc::downgrade(host)),
            store: Some(store),
            state,
        };
        tracing::debug!(?state, ?store, "host bound");
        self.reconcile(host, store);
    }

    /// Detach `host` if it is the bound one. Later requests are released
    /// immediately until another host binds.
    pub fn unbind(&mut self, host: &Rc<dyn UiHost>) {
        if !self.binding.is_bound_to(host) {
            return;
        }
        self.binding = HostBinding::default();
        for message in self.delayed.take_all() {
            self.registry.release(message.id());
        }
        tracing::debug!("host unbound");
    }

    /// Apply a lifecycle transition reported by `host`. Events from a host
    /// other than the bound one are ignored.
    pub fn on_host_event(&mut self, host: &Rc<dyn UiHost>, event: HostEvent) {
        if !self.binding.is_bound_to(host) {
            tracing::debug!(?event, "ignoring event from unbound host");
            return;
        }
        let from = self.binding.state;
        let to = event.target_state();
        if !can_transition(from, to) {
            tracing::warn!(?from, ?to, "illegal host transition ignored");
            return;
        }
        self.binding.state = to;
        tracing::debug!(?from, ?to, "host lifecycle changed");
        match event {
            HostEvent::Activated if from != HostState::Active => {
                self.dismiss_orphans(host);
                self.replay();
            }
            HostEvent::TornDown => {
                self.binding.host = None;
            }
            _ => {}
        }
    }

    /// The store backing the parked requests is gone for good: release every
    /// request presented or held back under it, whichever store is bound now.
    pub fn discard_survival_store(&mut self, store: SurvivalStoreId) {
        let parked: Vec<RequestId> = self
            .presented
            .iter()
            .filter(|(_, p)| p.store == store)
            .map(|(id, _)| *id)
            .collect();
        for id in parked {
            self.presented.remove(&id);
            self.registry.release(id);
        }
        for message in self.delayed.take_store(store) {
            self.registry.release(message.id());
        }
        if self.binding.store == Some(store) {
            for message in self.delayed.take_all() {
                self.registry.release(message.id());
            }
            self.binding = HostBinding::default();
        }
        tracing::debug!(?store, "survival store discarded");
    }

    fn target(&self) -> Target {
        let Some(store) = self.binding.store else {
            return Target::Absent;
        };
        match self.binding.live_host() {
            Some(host) if self.binding.state.can_present() => Target::Host(host, store),
            _ => Target::Deferred(store),
        }
    }

    fn deliver(&mut self, descriptor: RequestDescriptor) {
        let id = descriptor.id();
        if !self.registry.contains(id) {
            tracing::debug!(%id, "present skipped; request no longer pending");
            return;
        }
        match self.target() {
            Target::Absent => {
                tracing::debug!(%id, "no host bound; releasing request");
                self.registry.release(id);
            }
            Target::Deferred(store) => {
                tracing::debug!(%id, kind = ?descriptor.kind(), ?store, "host unavailable; delaying present");
                self.delayed.push(DelayedMessage::new(store, descriptor));
                if self.delayed.len() > self.delayed_warn_threshold {
                    tracing::warn!(
                        delayed = self.delayed.len(),
                        "delayed present messages piling up"
                    );
                }
            }
            Target::Host(host, store) => self.show(&host, descriptor, store),
        }
    }

    fn show(&mut self, host: &Rc<dyn UiHost>, descriptor: RequestDescriptor, store: SurvivalStoreId) {
        let id = descriptor.id();
        tracing::debug!(%id, kind = ?descriptor.kind(), "presenting request");
        let presenter = self.factory.create(&descriptor, self.reply_sender());
        host.show(presenter);
        self.presented.insert(id, Presented { descriptor, store });
    }

    fn replay(&mut self) {
        let queued = self.delayed.take_all();
        if queued.is_empty() {
            return;
        }
        tracing::debug!(count = queued.len(), "replaying delayed present messages");
        for message in queued {
            self.deliver(message.descriptor);
        }
    }

    fn reconcile(&mut self, host: &Rc<dyn UiHost>, store: SurvivalStoreId) {
        let mut shown = HashSet::new();
        for presenter in host.shown_presenters() {
            let id = presenter.request_id();
            if self.registry.contains(id) {
                presenter.reattach(self.reply_sender());
                if let Some(entry) = self.presented.get_mut(&id) {
                    entry.store = store;
                }
                shown.insert(id);
            } else {
                tracing::debug!(%id, "dismissing orphaned presenter");
                presenter.dismiss();
                self.presented.remove(&id);
            }
        }

        let registry = &self.registry;
        self.presented.retain(|id, _| registry.contains(*id));
        let missing: Vec<RequestId> = self
            .presented
            .iter()
            .filter(|(id, p)| p.store == store && !shown.contains(*id))
            .map(|(id, _)| *id)
            .collect();
        for id in missing {
            if let Some(entry) = self.presented.remove(&id) {
                tracing::debug!(%id, "re-presenting request lost with the previous host");
                self.deliver(entry.descriptor);
            }
        }

        if self.binding.state.can_present() {
            self.replay();
        }
    }

    fn dismiss_orphans(&mut self, host: &Rc<dyn UiHost>) {
        for presenter in host.shown_presenters() {
            let id = presenter.request_id();
            if !self.registry.contains(id) {
                tracing::debug!(%id, "dismissing orphaned presenter");
                presenter.dismiss();
                self.presented.remove(&id);
            }
        }
    }

    fn handle_interrupt(&mut self, id: RequestId) {
        if self.delayed.remove(id) {
            tracing::debug!(%id, "interrupted request dropped from delayed queue");
        }
        if self.presented.remove(&id).is_none() {
            return;
        }
        if !self.binding.state.can_present() {
            return;
        }
        if let Some(host) = self.binding.live_host() {
            for presenter in host.shown_presenters() {
                if presenter.request_id() == id {
                    tracing::debug!(%id, "dismissing presenter of interrupted request");
                    presenter.dismiss();
                }
            }
        }
    }

    fn handle_result(&mut self, id: RequestId, decision: Decision) {
        self.presented.remove(&id);
        let Some(request) = self.registry.get(id) else {
            tracing::debug!(%id, "result for a request no longer pending ignored");
            return;
        };
        if !request.resolve(Resolution::Decided(decision)) {
            tracing::debug!(%id, "duplicate result ignored");
        }
    }

    fn handle_notice(&mut self, notice: Notice) {
        match self.binding.live_host() {
            Some(host) if self.binding.state.can_present() => host.notify(notice),
            _ => tracing::debug!(?notice, "notice dropped; no active host"),
        }
    }

    fn reply_sender(&self) -> ReplySender {
        ReplySender::new(self.sender.clone())
    }
}
