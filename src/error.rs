use thiserror::Error;

/// Engine errors are value-returned; the state handed in by the caller
/// is never mutated on failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error("spell unavailable: {0}")]
    SpellUnavailable(String),

    #[error("invalid spell target: {0}")]
    SpellTargetInvalid(String),

    #[error("promotion required: {0}")]
    PromotionRequired(String),

    #[error("no promotion pending: {0}")]
    PromotionUnexpected(String),

    #[error("game is already over")]
    GameOver,
}
