//! Reconstruct a full game from a flat sequence of compact actions.
//!
//! The compact log is the sole source of truth; everything else in a
//! `GameState` is a cache this driver can rebuild. Replay is strictly
//! deterministic: the same tokens always produce the same state, piece
//! ids included.

use crate::error::EngineError;
use crate::game::{GameState, MoveOutcome};
use crate::notation::Action;

/// Replay a token sequence from the initial position. A spell token
/// must be followed by a move token of the same half-move; two spells
/// in a row, or a trailing spell, is a malformed log. Tokens after the
/// game ends are ignored (truncation protection).
pub fn replay<S: AsRef<str>>(actions: &[S]) -> Result<GameState, EngineError> {
    let mut state = GameState::new();
    let mut pending_spell: Option<String> = None;

    for token in actions {
        let token = token.as_ref().trim();
        if state.is_game_over {
            break;
        }
        let action = Action::parse(token).ok_or_else(|| {
            EngineError::InvalidAction(format!("unrecognized action token '{token}'"))
        })?;
        match action {
            Action::Resign => {
                state = state.apply_resign();
            }
            Action::Spell { kind, r, c } => {
                if pending_spell.is_some() {
                    return Err(EngineError::InvalidAction(format!(
                        "spell token '{token}' follows another spell cast in the same half-move"
                    )));
                }
                let (next, notation) = state
                    .apply_spell(kind, r, c)
                    .map_err(|e| at_token(token, e))?;
                state = next;
                pending_spell = Some(notation);
            }
            Action::Move {
                from,
                to,
                promotion,
            } => {
                let outcome = state
                    .apply_move(
                        from.0,
                        from.1,
                        to.0,
                        to.1,
                        pending_spell.as_deref(),
                        promotion,
                    )
                    .map_err(|e| at_token(token, e))?;
                match outcome {
                    MoveOutcome::Done(next) => {
                        state = next;
                        pending_spell = None;
                    }
                    MoveOutcome::AwaitingPromotion(_) => {
                        return Err(EngineError::PromotionRequired(format!(
                            "token '{token}' reaches the last rank without a promotion piece"
                        )));
                    }
                }
            }
        }
    }

    if pending_spell.is_some() && !state.is_game_over {
        return Err(EngineError::InvalidAction(
            "log ends with a spell cast and no move".to_string(),
        ));
    }
    Ok(state)
}

/// Replay a comma-joined compact log. The empty log is the initial
/// position.
pub fn replay_log(log: &str) -> Result<GameState, EngineError> {
    let log = log.trim();
    if log.is_empty() {
        return Ok(GameState::new());
    }
    let tokens: Vec<&str> = log.split(',').collect();
    replay(&tokens)
}

/// Prefix the token onto the error message so callers can point at the
/// offending action.
fn at_token(token: &str, err: EngineError) -> EngineError {
    let wrap = |msg: String| format!("token '{token}': {msg}");
    match err {
        EngineError::InvalidAction(m) => EngineError::InvalidAction(wrap(m)),
        EngineError::IllegalMove(m) => EngineError::IllegalMove(wrap(m)),
        EngineError::SpellUnavailable(m) => EngineError::SpellUnavailable(wrap(m)),
        EngineError::SpellTargetInvalid(m) => EngineError::SpellTargetInvalid(wrap(m)),
        EngineError::PromotionRequired(m) => EngineError::PromotionRequired(wrap(m)),
        EngineError::PromotionUnexpected(m) => EngineError::PromotionUnexpected(wrap(m)),
        EngineError::GameOver => EngineError::GameOver,
    }
}
