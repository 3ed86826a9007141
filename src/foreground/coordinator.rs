use crate::foreground::error::RequireError;
use crate::foreground::interrupt::Interrupt;
use crate::foreground::messages::{Notice, UiMessage};
use crate::foreground::registry::{RegistryGuard, RequestId, RequestRegistry};
use crate::foreground::request::{
    single_selection, CaptchaData, CaptchaRequest, ChallengeTokenRequest, ChoiceItems,
    ChoiceRequest, Decision, ImageData, RequestDescriptor, RequestKind, RequestPayload,
    Resolution, SingleChoice, TokenOutcome,
};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// Worker-facing half of the coordinator.
///
/// Cheap to clone and safe to share between threads. Every `require_*` call
/// blocks the calling thread until the UI thread produces a decision, the
/// request is released because no host can show it, or `interrupt` fires.
#[derive(Debug, Clone)]
pub struct ForegroundCoordinator {
    registry: Arc<RequestRegistry>,
    sender: Sender<UiMessage>,
    verified_captcha_types: Arc<[String]>,
}

impl ForegroundCoordinator {
    pub(crate) fn new(
        registry: Arc<RequestRegistry>,
        sender: Sender<UiMessage>,
        verified_captcha_types: Vec<String>,
    ) -> Self {
        Self {
            registry,
            sender,
            verified_captcha_types: verified_captcha_types.into(),
        }
    }

    pub fn pending_ids(&self) -> Vec<RequestId> {
        self.registry.ids()
    }

    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// Ask the user to solve a captcha. `Ok(None)` means cancelled.
    ///
    /// Types listed as verified get a second round in which the UI checks
    /// the answer with the captcha service; a failed check starts over.
    pub fn require_user_captcha(
        &self,
        request: CaptchaRequest,
        interrupt: &Interrupt,
    ) -> Result<Option<CaptchaData>, RequireError> {
        let mut request = request;
        loop {
            let retry = request.retry;
            let (_, resolution) = self.require(
                RequestPayload::Captcha(request.clone()),
                retry.then_some(Notice::CaptchaInvalid),
                interrupt,
            )?;
            let solved = match resolution {
                Resolution::Released => return Ok(None),
                Resolution::Decided(Decision::Captcha(solved)) => solved,
                Resolution::Decided(other) => return Err(mismatch(RequestKind::Captcha, &other)),
            };
            let Some(solved) = solved else {
                return Ok(None);
            };

            let work_type = solved
                .loaded_type
                .unwrap_or_else(|| request.captcha_type.clone());
            let mut data = solved.data;
            if data.get(CaptchaData::API_KEY).is_none() || !self.is_verified_type(&work_type) {
                return Ok(Some(data));
            }
            if let Some(response) = data.get(CaptchaData::SKIP_RESPONSE).map(str::to_owned) {
                data.put(CaptchaData::INPUT, response);
                return Ok(Some(data));
            }

            let (check_id, checked) = self.require(
                RequestPayload::CaptchaCheck {
                    captcha_type: work_type,
                    data,
                },
                None,
                interrupt,
            )?;
            match checked {
                Resolution::Decided(Decision::CaptchaCheck(Some(data))) => return Ok(Some(data)),
                Resolution::Decided(Decision::CaptchaCheck(None)) | Resolution::Released => {
                    tracing::debug!(
                        id = %check_id,
                        kind = ?RequestKind::CaptchaCheck,
                        "captcha check failed or cancelled; asking again"
                    );
                    request.retry = false;
                }
                Resolution::Decided(other) => {
                    return Err(mismatch(RequestKind::CaptchaCheck, &other))
                }
            }
        }
    }

    pub fn require_user_item_single_choice(
        &self,
        selected: Option<usize>,
        items: Vec<String>,
        description_text: Option<String>,
        description_image: Option<ImageData>,
        interrupt: &Interrupt,
    ) -> Result<Option<SingleChoice>, RequireError> {
        let selected = single_selection(selected, items.len());
        self.require_single(
            ChoiceRequest {
                items: ChoiceItems::Text(items),
                selected,
                description_text,
                description_image,
                multiple: false,
            },
            interrupt,
        )
    }

    pub fn require_user_item_multiple_choice(
        &self,
        selected: Option<Vec<bool>>,
        items: Vec<String>,
        description_text: Option<String>,
        description_image: Option<ImageData>,
        interrupt: &Interrupt,
    ) -> Result<Option<Vec<bool>>, RequireError> {
        self.require_user_choice(
            ChoiceRequest {
                items: ChoiceItems::Text(items),
                selected,
                description_text,
                description_image,
                multiple: true,
            },
            interrupt,
        )
    }

    pub fn require_user_image_single_choice(
        &self,
        columns: usize,
        selected: Option<usize>,
        images: Vec<ImageData>,
        description_text: Option<String>,
        description_image: Option<ImageData>,
        interrupt: &Interrupt,
    ) -> Result<Option<SingleChoice>, RequireError> {
        let selected = single_selection(selected, images.len());
        self.require_single(
            ChoiceRequest {
                items: ChoiceItems::Images { columns, images },
                selected,
                description_text,
                description_image,
                multiple: false,
            },
            interrupt,
        )
    }

    pub fn require_user_image_multiple_choice(
        &self,
        columns: usize,
        selected: Option<Vec<bool>>,
        images: Vec<ImageData>,
        description_text: Option<String>,
        description_image: Option<ImageData>,
        interrupt: &Interrupt,
    ) -> Result<Option<Vec<bool>>, RequireError> {
        self.require_user_choice(
            ChoiceRequest {
                items: ChoiceItems::Images { columns, images },
                selected,
                description_text,
                description_image,
                multiple: true,
            },
            interrupt,
        )
    }

    /// Show a choice prompt and return the selection state the user
    /// confirmed, or `Ok(None)` if they cancelled.
    pub fn require_user_choice(
        &self,
        request: ChoiceRequest,
        interrupt: &Interrupt,
    ) -> Result<Option<Vec<bool>>, RequireError> {
        request.validate().map_err(RequireError::InvalidRequest)?;
        let (_, resolution) = self.require(RequestPayload::Choice(request), None, interrupt)?;
        match resolution {
            Resolution::Released => Ok(None),
            Resolution::Decided(Decision::Choice(selection)) => Ok(selection),
            Resolution::Decided(other) => Err(mismatch(RequestKind::Choice, &other)),
        }
    }

    /// Ask the UI to run a web challenge and hand back its token.
    pub fn require_user_challenge_token(
        &self,
        request: ChallengeTokenRequest,
        interrupt: &Interrupt,
    ) -> Result<Option<String>, RequireError> {
        let (_, resolution) =
            self.require(RequestPayload::ChallengeToken(request), None, interrupt)?;
        match resolution {
            Resolution::Released | Resolution::Decided(Decision::ChallengeToken(None)) => Ok(None),
            Resolution::Decided(Decision::ChallengeToken(Some(TokenOutcome::Token(token)))) => {
                Ok(Some(token))
            }
            Resolution::Decided(Decision::ChallengeToken(Some(TokenOutcome::Failed(reason)))) => {
                Err(RequireError::Challenge(reason))
            }
            Resolution::Decided(other) => Err(mismatch(RequestKind::ChallengeToken, &other)),
        }
    }

    fn require_single(
        &self,
        request: ChoiceRequest,
        interrupt: &Interrupt,
    ) -> Result<Option<SingleChoice>, RequireError> {
        Ok(self
            .require_user_choice(request, interrupt)?
            .map(|selection| SingleChoice::from_selection(&selection)))
    }

    fn is_verified_type(&self, captcha_type: &str) -> bool {
        self.verified_captcha_types.iter().any(|t| t == captcha_type)
    }

    /// Register `payload`, post it to the UI thread and block until it is
    /// resolved. Returns the id the request ran under with its resolution.
    fn require(
        &self,
        payload: RequestPayload,
        notice: Option<Notice>,
        interrupt: &Interrupt,
    ) -> Result<(RequestId, Resolution), RequireError> {
        let request = self.registry.put(payload.kind());
        let id = request.id();
        let _guard = RegistryGuard {
            registry: &self.registry,
            id,
        };
        let descriptor = RequestDescriptor::new(id, payload);
        tracing::debug!(%id, kind = ?descriptor.kind(), "requiring user decision");
        self.post(UiMessage::Present(descriptor))?;
        if let Some(notice) = notice {
            self.post(UiMessage::Notice(notice))?;
        }

        match request.wait(interrupt) {
            Ok(resolution) => Ok((id, resolution)),
            Err(_) => {
                tracing::debug!(%id, "worker interrupted while waiting");
                let _ = self.sender.send(UiMessage::Interrupt(id));
                Err(RequireError::Interrupted)
            }
        }
    }

    fn post(&self, message: UiMessage) -> Result<(), RequireError> {
        self.sender
            .send(message)
            .map_err(|_| RequireError::Disconnected)
    }
}

fn mismatch(expected: RequestKind, decision: &Decision) -> RequireError {
    RequireError::KindMismatch {
        expected,
        actual: decision.kind(),
    }
}
