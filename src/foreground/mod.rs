//! Lets worker threads block on decisions that only the UI thread can
//! produce.
//!
//! [`new`] returns the two halves: a [`ForegroundCoordinator`] that workers
//! clone and call, and a [`ForegroundDispatcher`] that stays on the UI thread,
//! pumps messages and follows the lifecycle of the current [`UiHost`].

pub mod coordinator;
pub mod delayed;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod interrupt;
pub mod messages;
pub mod registry;
pub mod request;

pub use coordinator::ForegroundCoordinator;
pub use dispatcher::ForegroundDispatcher;
pub use error::RequireError;
pub use host::{
    DialogPresenter, HostEvent, HostState, PresenterFactory, SurvivalStoreId, UiHost,
};
pub use interrupt::Interrupt;
pub use messages::{Notice, ReplySender, UiMessage};
pub use registry::{RequestId, RequestRegistry};
pub use request::{
    CaptchaData, CaptchaRequest, ChallengeTokenRequest, ChoiceItems, ChoiceRequest, Decision,
    ImageData, RequestDescriptor, RequestKind, RequestPayload, SingleChoice, SolvedCaptcha,
    TokenOutcome,
};

use crate::settings::Settings;
use std::sync::Arc;

/// Create a coordinator and the dispatcher that serves it. Call on the UI
/// thread; the dispatcher cannot leave it.
pub fn new(
    settings: &Settings,
    factory: Box<dyn PresenterFactory>,
) -> (ForegroundCoordinator, ForegroundDispatcher) {
    let registry = Arc::new(RequestRegistry::new());
    let (sender, receiver) = std::sync::mpsc::channel();
    let coordinator = ForegroundCoordinator::new(
        Arc::clone(&registry),
        sender.clone(),
        settings.verified_captcha_types.clone(),
    );
    let dispatcher = ForegroundDispatcher::new(
        receiver,
        sender,
        registry,
        factory,
        settings.delayed_warn_threshold,
    );
    (coordinator, dispatcher)
}
