use crate::foreground::request::RequestKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequireError {
    #[error("interrupted while waiting for the user")]
    Interrupted,
    #[error("web challenge failed: {0}")]
    Challenge(String),
    #[error("foreground dispatcher is gone")]
    Disconnected,
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("expected a {expected:?} decision, got {actual:?}")]
    KindMismatch {
        expected: RequestKind,
        actual: RequestKind,
    },
}
