use crate::foreground::registry::RequestId;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Captcha,
    CaptchaCheck,
    Choice,
    ChallengeToken,
}

/// Key/value data produced while solving a captcha.
///
/// Well-known keys are exposed as associated constants; readers are free to
/// store anything else they need between the solve and the post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptchaData {
    fields: BTreeMap<String, String>,
}

impl CaptchaData {
    pub const API_KEY: &'static str = "apiKey";
    pub const CHALLENGE: &'static str = "challenge";
    pub const INPUT: &'static str = "input";
    /// Response token returned by a reader that already passed the check.
    pub const SKIP_RESPONSE: &'static str = "skipResponse";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.put(key, value);
        self
    }
}

/// What a captcha presenter hands back once the user confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedCaptcha {
    pub data: CaptchaData,
    /// Captcha type actually loaded, when the reader switched types.
    pub loaded_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptchaRequest {
    pub captcha_type: String,
    pub requirement: Option<String>,
    pub chan_name: Option<String>,
    pub board_name: Option<String>,
    pub thread_number: Option<String>,
    pub description: Option<String>,
    /// The previous answer was rejected; the user gets an "invalid" notice.
    pub retry: bool,
}

impl CaptchaRequest {
    pub fn new(captcha_type: impl Into<String>) -> Self {
        Self {
            captcha_type: captcha_type.into(),
            ..Self::default()
        }
    }
}

pub type ImageData = Arc<[u8]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceItems {
    Text(Vec<String>),
    Images { columns: usize, images: Vec<ImageData> },
}

impl ChoiceItems {
    pub fn len(&self) -> usize {
        match self {
            Self::Text(items) => items.len(),
            Self::Images { images, .. } => images.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceRequest {
    pub items: ChoiceItems,
    pub selected: Option<Vec<bool>>,
    pub description_text: Option<String>,
    pub description_image: Option<ImageData>,
    pub multiple: bool,
}

impl ChoiceRequest {
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        match &self.items {
            ChoiceItems::Text(items) if items.is_empty() => Err("choice items are empty"),
            ChoiceItems::Images { images, .. } if images.is_empty() => {
                Err("choice images are empty")
            }
            ChoiceItems::Images { columns: 0, .. } => Err("image choice needs at least one column"),
            _ => Ok(()),
        }
    }

    /// Selection state the presenter should start from, padded to the item
    /// count. A preset of the wrong length is ignored.
    pub fn initial_selection(&self) -> Vec<bool> {
        let len = self.items.len();
        match &self.selected {
            Some(selected) if selected.len() == len => selected.clone(),
            _ => vec![false; len],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeTokenRequest {
    pub challenge_type: String,
    pub site_key: String,
    pub referer: String,
    pub description: Option<String>,
}

/// Result of a single-choice prompt the user confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleChoice {
    Selected(usize),
    Nothing,
}

impl SingleChoice {
    pub fn from_selection(selection: &[bool]) -> Self {
        selection
            .iter()
            .position(|&s| s)
            .map_or(Self::Nothing, Self::Selected)
    }
}

pub(crate) fn single_selection(selected: Option<usize>, len: usize) -> Option<Vec<bool>> {
    let index = selected.filter(|&i| i < len)?;
    let mut out = vec![false; len];
    out[index] = true;
    Some(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPayload {
    Captcha(CaptchaRequest),
    CaptchaCheck {
        captcha_type: String,
        data: CaptchaData,
    },
    Choice(ChoiceRequest),
    ChallengeToken(ChallengeTokenRequest),
}

impl RequestPayload {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Captcha(_) => RequestKind::Captcha,
            Self::CaptchaCheck { .. } => RequestKind::CaptchaCheck,
            Self::Choice(_) => RequestKind::Choice,
            Self::ChallengeToken(_) => RequestKind::ChallengeToken,
        }
    }
}

/// Immutable description of a request, shared by every message that refers
/// to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    id: RequestId,
    payload: Arc<RequestPayload>,
}

impl RequestDescriptor {
    pub fn new(id: RequestId, payload: RequestPayload) -> Self {
        Self {
            id,
            payload: Arc::new(payload),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> RequestKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &RequestPayload {
        &self.payload
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    Token(String),
    Failed(String),
}

/// A decision reported by a presenter. `None` payloads mean the user
/// cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Captcha(Option<SolvedCaptcha>),
    CaptchaCheck(Option<CaptchaData>),
    Choice(Option<Vec<bool>>),
    ChallengeToken(Option<TokenOutcome>),
}

impl Decision {
    pub fn cancelled(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Captcha => Self::Captcha(None),
            RequestKind::CaptchaCheck => Self::CaptchaCheck(None),
            RequestKind::Choice => Self::Choice(None),
            RequestKind::ChallengeToken => Self::ChallengeToken(None),
        }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Captcha(_) => RequestKind::Captcha,
            Self::CaptchaCheck(_) => RequestKind::CaptchaCheck,
            Self::Choice(_) => RequestKind::Choice,
            Self::ChallengeToken(_) => RequestKind::ChallengeToken,
        }
    }
}

/// Final state of a pending request as seen by the waiting worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Released without a decision: no host exists or will ever exist.
    Released,
    Decided(Decision),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_choice(items: &[&str], selected: Option<Vec<bool>>) -> ChoiceRequest {
        ChoiceRequest {
            items: ChoiceItems::Text(items.iter().map(|s| s.to_string()).collect()),
            selected,
            description_text: None,
            description_image: None,
            multiple: false,
        }
    }

    #[test]
    fn single_selection_ignores_out_of_range_index() {
        assert_eq!(single_selection(Some(1), 3), Some(vec![false, true, false]));
        assert_eq!(single_selection(Some(3), 3), None);
        assert_eq!(single_selection(None, 3), None);
    }

    #[test]
    fn single_choice_picks_first_selected_index() {
        assert_eq!(
            SingleChoice::from_selection(&[false, true, true]),
            SingleChoice::Selected(1)
        );
        assert_eq!(SingleChoice::from_selection(&[false, false]), SingleChoice::Nothing);
    }

    #[test]
    fn validation_rejects_empty_or_columnless_choices() {
        assert!(text_choice(&[], None).validate().is_err());
        assert!(text_choice(&["a"], None).validate().is_ok());
        let images = ChoiceRequest {
            items: ChoiceItems::Images {
                columns: 0,
                images: vec![Arc::from(vec![1u8, 2, 3])],
            },
            ..text_choice(&["a"], None)
        };
        assert!(images.validate().is_err());
    }

    #[test]
    fn initial_selection_drops_mismatched_preset() {
        let request = text_choice(&["a", "b"], Some(vec![true]));
        assert_eq!(request.initial_selection(), vec![false, false]);
        let request = text_choice(&["a", "b"], Some(vec![false, true]));
        assert_eq!(request.initial_selection(), vec![false, true]);
    }

    #[test]
    fn cancelled_decision_matches_kind() {
        for kind in [
            RequestKind::Captcha,
            RequestKind::CaptchaCheck,
            RequestKind::Choice,
            RequestKind::ChallengeToken,
        ] {
            assert_eq!(Decision::cancelled(kind).kind(), kind);
        }
    }
}
