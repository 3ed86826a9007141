use foreground_coordinator::foreground::{
    self, CaptchaData, CaptchaRequest, ChallengeTokenRequest, ChoiceItems, ChoiceRequest, Decision,
    DialogPresenter, HostState, Interrupt, Notice, PresenterFactory, ReplySender,
    RequestDescriptor, RequestId, RequestPayload, SolvedCaptcha, SurvivalStoreId, TokenOutcome,
    UiHost,
};
use foreground_coordinator::logging;
use foreground_coordinator::settings::Settings;
use std::cell::{Cell, RefCell};
use std::io::BufRead;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;

const SETTINGS_FILE: &str = "foreground.json";

struct ConsolePresenter {
    descriptor: RequestDescriptor,
    replies: RefCell<ReplySender>,
    dismissed: Cell<bool>,
}

impl ConsolePresenter {
    fn prompt(&self) -> String {
        let id = self.descriptor.id();
        match self.descriptor.payload() {
            RequestPayload::Captcha(req) => format!(
                "[{id}] captcha ({}){}: type the answer or 'c' to cancel",
                req.captcha_type,
                req.description
                    .as_deref()
                    .map(|d| format!(" - {d}"))
                    .unwrap_or_default()
            ),
            RequestPayload::CaptchaCheck { captcha_type, .. } => {
                format!("[{id}] checking {captcha_type} answer: 'y' to accept, anything else fails")
            }
            RequestPayload::Choice(req) => {
                let items = match &req.items {
                    ChoiceItems::Text(items) => items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| format!("  {i}: {item}"))
                        .collect::<Vec<_>>()
                        .join("\n"),
                    ChoiceItems::Images { columns, images } => {
                        format!("  {} images in {columns} columns", images.len())
                    }
                };
                let how = if req.multiple {
                    "comma separated indices"
                } else {
                    "one index"
                };
                format!(
                    "[{id}] {}\n{items}\nenter {how} or 'c' to cancel",
                    req.description_text.as_deref().unwrap_or("choose")
                )
            }
            RequestPayload::ChallengeToken(req) => format!(
                "[{id}] {} challenge for {}: paste a token, '!reason' to fail, 'c' to cancel",
                req.challenge_type, req.referer
            ),
        }
    }

    /// Turn a console line into a decision. Returns `false` when the line
    /// was not understood and the prompt stays open.
    fn answer(&self, line: &str) -> bool {
        let line = line.trim();
        let id = self.descriptor.id();
        let kind = self.descriptor.kind();
        if line == "c" {
            self.replies.borrow().cancel(id, kind);
            return true;
        }
        let decision = match self.descriptor.payload() {
            RequestPayload::Captcha(_) => Decision::Captcha(Some(SolvedCaptcha {
                data: CaptchaData::new()
                    .with(CaptchaData::API_KEY, "console")
                    .with(CaptchaData::INPUT, line),
                loaded_type: None,
            })),
            RequestPayload::CaptchaCheck { data, .. } => {
                Decision::CaptchaCheck((line == "y").then(|| data.clone()))
            }
            RequestPayload::Choice(req) => match parse_selection(req, line) {
                Some(selection) => Decision::Choice(Some(selection)),
                None => return false,
            },
            RequestPayload::ChallengeToken(_) => match line.strip_prefix('!') {
                Some(reason) => Decision::ChallengeToken(Some(TokenOutcome::Failed(reason.into()))),
                None => Decision::ChallengeToken(Some(TokenOutcome::Token(line.into()))),
            },
        };
        self.replies.borrow().reply(id, decision);
        true
    }
}

/// Parse comma separated indices. Multiple-choice input toggles entries of
/// the preset selection; single-choice input must name exactly one index.
fn parse_selection(req: &ChoiceRequest, line: &str) -> Option<Vec<bool>> {
    let parts: Vec<&str> = line.split(',').collect();
    if !req.multiple && parts.len() != 1 {
        return None;
    }
    let mut selection = if req.multiple {
        req.initial_selection()
    } else {
        vec![false; req.items.len()]
    };
    for part in parts {
        let index = part.trim().parse::<usize>().ok().filter(|&i| i < selection.len())?;
        selection[index] = if req.multiple { !selection[index] } else { true };
    }
    Some(selection)
}

impl DialogPresenter for ConsolePresenter {
    fn request_id(&self) -> RequestId {
        self.descriptor.id()
    }

    fn dismiss(&self) {
        if !self.dismissed.replace(true) {
            println!("[{}] dismissed", self.descriptor.id());
        }
    }

    fn reattach(&self, replies: ReplySender) {
        *self.replies.borrow_mut() = replies;
    }
}

type Shown = Rc<RefCell<Vec<Rc<ConsolePresenter>>>>;

struct ConsoleFactory {
    shown: Shown,
}

impl PresenterFactory for ConsoleFactory {
    fn create(
        &self,
        descriptor: &RequestDescriptor,
        replies: ReplySender,
    ) -> Rc<dyn DialogPresenter> {
        let presenter = Rc::new(ConsolePresenter {
            descriptor: descriptor.clone(),
            replies: RefCell::new(replies),
            dismissed: Cell::new(false),
        });
        self.shown.borrow_mut().push(Rc::clone(&presenter));
        presenter
    }
}

struct ConsoleHost {
    shown: Shown,
}

impl ConsoleHost {
    /// Oldest presenter still waiting for input.
    fn front(&self) -> Option<Rc<ConsolePresenter>> {
        self.shown.borrow_mut().retain(|p| !p.dismissed.get());
        self.shown.borrow().first().cloned()
    }
}

impl UiHost for ConsoleHost {
    fn show(&self, presenter: Rc<dyn DialogPresenter>) {
        let id = presenter.request_id();
        if let Some(p) = self.shown.borrow().iter().find(|p| p.request_id() == id) {
            println!("{}", p.prompt());
        }
    }

    fn shown_presenters(&self) -> Vec<Rc<dyn DialogPresenter>> {
        self.shown
            .borrow()
            .iter()
            .filter(|p| !p.dismissed.get())
            .map(|p| Rc::clone(p) as Rc<dyn DialogPresenter>)
            .collect()
    }

    fn notify(&self, notice: Notice) {
        match notice {
            Notice::CaptchaInvalid => println!("previous captcha answer was not accepted"),
        }
    }
}

fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .map(|_| ())
        .unwrap_or_else(|e| tracing::error!("failed to spawn stdin reader: {e}"));
    rx
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::load(SETTINGS_FILE)?;
    logging::init(settings.debug_logging);

    let shown: Shown = Rc::new(RefCell::new(Vec::new()));
    let (coordinator, mut dispatcher) = foreground::new(
        &settings,
        Box::new(ConsoleFactory {
            shown: Rc::clone(&shown),
        }),
    );
    let console = Rc::new(ConsoleHost { shown });
    let host: Rc<dyn UiHost> = console.clone();
    dispatcher.bind(&host, SurvivalStoreId::next(), HostState::Active);

    let mut workers = Vec::new();
    {
        let coordinator = coordinator.clone();
        workers.push(thread::Builder::new().name("worker-choice".into()).spawn(move || {
            let result = coordinator.require_user_item_single_choice(
                None,
                vec!["/a/".into(), "/b/".into(), "/g/".into()],
                Some("Pick a board".into()),
                None,
                &Interrupt::new(),
            );
            println!("choice worker finished: {result:?}");
        })?);
    }
    {
        let coordinator = coordinator.clone();
        workers.push(thread::Builder::new().name("worker-captcha".into()).spawn(move || {
            let mut request = CaptchaRequest::new("recaptcha_2");
            request.description = Some("Posting to /b/".into());
            let result = coordinator.require_user_captcha(request, &Interrupt::new());
            println!("captcha worker finished: {result:?}");
        })?);
    }
    {
        let coordinator = coordinator.clone();
        workers.push(thread::Builder::new().name("worker-token".into()).spawn(move || {
            let result = coordinator.require_user_challenge_token(
                ChallengeTokenRequest {
                    challenge_type: "turnstile".into(),
                    site_key: "0x4AAAAAAA".into(),
                    referer: "https://example.org/b/".into(),
                    description: None,
                },
                &Interrupt::new(),
            );
            println!("token worker finished: {result:?}");
        })?);
    }

    let lines = spawn_stdin_reader();
    while workers.iter().any(|w| !w.is_finished()) {
        dispatcher.pump_timeout(settings.pump_interval());
        while let Ok(line) = lines.try_recv() {
            let Some(presenter) = console.front() else {
                println!("nothing to answer");
                continue;
            };
            if presenter.answer(&line) {
                presenter.dismissed.set(true);
            } else {
                println!("{}", presenter.prompt());
            }
        }
    }
    dispatcher.pump();

    for worker in workers {
        if worker.join().is_err() {
            tracing::error!("worker thread panicked");
        }
    }
    Ok(())
}
