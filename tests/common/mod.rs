#![allow(dead_code)]

use foreground_coordinator::foreground::{
    self, Decision, DialogPresenter, ForegroundCoordinator, ForegroundDispatcher, HostState,
    Notice, PresenterFactory, ReplySender, RequestDescriptor, RequestId, RequestKind,
    SurvivalStoreId, UiHost,
};
use foreground_coordinator::settings::Settings;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

pub const WAIT: Duration = Duration::from_secs(5);

pub struct ScriptedPresenter {
    pub descriptor: RequestDescriptor,
    replies: RefCell<ReplySender>,
    dismissed: Cell<bool>,
    pub reattached: Cell<usize>,
}

impl ScriptedPresenter {
    pub fn id(&self) -> RequestId {
        self.descriptor.id()
    }

    pub fn kind(&self) -> RequestKind {
        self.descriptor.kind()
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed.get()
    }

    /// Report `decision` and close, the way a real dialog does.
    pub fn answer(&self, decision: Decision) -> bool {
        let sent = self.replies.borrow().reply(self.id(), decision);
        self.dismissed.set(true);
        sent
    }

    pub fn cancel(&self) -> bool {
        self.answer(Decision::cancelled(self.kind()))
    }
}

impl DialogPresenter for ScriptedPresenter {
    fn request_id(&self) -> RequestId {
        self.descriptor.id()
    }

    fn dismiss(&self) {
        self.dismissed.set(true);
    }

    fn reattach(&self, replies: ReplySender) {
        *self.replies.borrow_mut() = replies;
        self.reattached.set(self.reattached.get() + 1);
    }
}

pub type Created = Rc<RefCell<Vec<Rc<ScriptedPresenter>>>>;

pub struct ScriptedFactory {
    created: Created,
}

impl PresenterFactory for ScriptedFactory {
    fn create(
        &self,
        descriptor: &RequestDescriptor,
        replies: ReplySender,
    ) -> Rc<dyn DialogPresenter> {
        let presenter = Rc::new(ScriptedPresenter {
            descriptor: descriptor.clone(),
            replies: RefCell::new(replies),
            dismissed: Cell::new(false),
            reattached: Cell::new(0),
        });
        self.created.borrow_mut().push(Rc::clone(&presenter));
        presenter
    }
}

pub struct ScriptedHost {
    created: Created,
    shown: RefCell<Vec<Rc<ScriptedPresenter>>>,
    pub notices: RefCell<Vec<Notice>>,
}

impl ScriptedHost {
    /// Presenters attached and not dismissed, in the order they were shown.
    pub fn visible(&self) -> Vec<Rc<ScriptedPresenter>> {
        self.shown
            .borrow()
            .iter()
            .filter(|p| !p.is_dismissed())
            .cloned()
            .collect()
    }

    pub fn visible_ids(&self) -> Vec<RequestId> {
        self.visible().iter().map(|p| p.id()).collect()
    }

    /// Simulate a recreated host that brought its previous presenters back.
    pub fn restore(&self, presenters: Vec<Rc<ScriptedPresenter>>) {
        self.shown.borrow_mut().extend(presenters);
    }
}

impl UiHost for ScriptedHost {
    fn show(&self, presenter: Rc<dyn DialogPresenter>) {
        let id = presenter.request_id();
        let created = self
            .created
            .borrow()
            .iter()
            .rev()
            .find(|p| p.id() == id)
            .cloned();
        if let Some(p) = created {
            self.shown.borrow_mut().push(p);
        }
    }

    fn shown_presenters(&self) -> Vec<Rc<dyn DialogPresenter>> {
        self.visible()
            .into_iter()
            .map(|p| p as Rc<dyn DialogPresenter>)
            .collect()
    }

    fn notify(&self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }
}

pub struct Harness {
    pub coordinator: ForegroundCoordinator,
    pub dispatcher: ForegroundDispatcher,
    pub created: Created,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let created: Created = Rc::new(RefCell::new(Vec::new()));
        let (coordinator, dispatcher) = foreground::new(
            &settings,
            Box::new(ScriptedFactory {
                created: Rc::clone(&created),
            }),
        );
        Self {
            coordinator,
            dispatcher,
            created,
        }
    }

    pub fn host(&self) -> Rc<ScriptedHost> {
        Rc::new(ScriptedHost {
            created: Rc::clone(&self.created),
            shown: RefCell::new(Vec::new()),
            notices: RefCell::new(Vec::new()),
        })
    }

    pub fn bind(&mut self, host: &Rc<ScriptedHost>, store: SurvivalStoreId, state: HostState) {
        let host: Rc<dyn UiHost> = host.clone();
        self.dispatcher.bind(&host, store, state);
    }

    pub fn created_count(&self) -> usize {
        self.created.borrow().len()
    }

    /// Pump the dispatcher until `done` holds or the wait times out.
    pub fn pump_until(&mut self, mut done: impl FnMut(&Self) -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        loop {
            if done(self) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            self.dispatcher.pump_timeout(Duration::from_millis(10));
        }
    }
}

pub fn as_dyn(host: &Rc<ScriptedHost>) -> Rc<dyn UiHost> {
    host.clone()
}

pub fn text_items(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
