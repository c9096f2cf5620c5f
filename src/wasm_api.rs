use crate::game::{GameState, MoveOutcome};
use crate::piece::{Color, PieceType};
use crate::replay::replay_log;
use crate::rules;
use crate::spells::{self, ActiveSpell, SpellKind};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct SquarePiece {
    piece_type: String,
    color: String,
    is_jumpable: bool,
    is_frozen: bool,
}

#[derive(Serialize)]
struct SpellsJson {
    jump_left: u8,
    freeze_left: u8,
    jump_ready: bool,
    freeze_ready: bool,
}

#[derive(Serialize)]
struct MoveLogJson {
    turn: u32,
    player: String,
    notation: String,
}

#[derive(Serialize)]
struct MoveJson {
    from: [usize; 2],
    to: [usize; 2],
}

#[derive(Serialize)]
struct StateJson {
    squares: Vec<Vec<Option<SquarePiece>>>,
    current_player: String,
    game_turn_number: u32,
    ply_count: u32,
    is_game_over: bool,
    game_end_message: Option<String>,
    is_in_check: bool,
    awaiting_promotion: Option<[usize; 2]>,
    white_spells: SpellsJson,
    black_spells: SpellsJson,
    freeze_zones: Vec<[usize; 2]>,
    legal_moves: Vec<MoveJson>,
    move_log: Vec<MoveLogJson>,
}

#[derive(Serialize)]
struct ActionResult {
    #[serde(flatten)]
    state: Option<StateJson>,
    error: Option<String>,
}

fn piece_type_to_string(pt: PieceType) -> String {
    match pt {
        PieceType::King => "King".to_string(),
        PieceType::Queen => "Queen".to_string(),
        PieceType::Rook => "Rook".to_string(),
        PieceType::Bishop => "Bishop".to_string(),
        PieceType::Knight => "Knight".to_string(),
        PieceType::Pawn => "Pawn".to_string(),
    }
}

fn color_to_string(c: Color) -> String {
    c.name().to_string()
}

fn spells_json(state: &GameState, color: Color) -> SpellsJson {
    let s = state.spells(color);
    SpellsJson {
        jump_left: s.jump_left,
        freeze_left: s.freeze_left,
        jump_ready: s.can_cast(SpellKind::Jump, state.game_turn_number),
        freeze_ready: s.can_cast(SpellKind::Freeze, state.game_turn_number),
    }
}

fn build_state_json(state: &GameState) -> StateJson {
    let squares: Vec<Vec<Option<SquarePiece>>> = (0..8)
        .map(|r| {
            (0..8)
                .map(|c| {
                    state.board.squares[r][c].map(|p| SquarePiece {
                        piece_type: piece_type_to_string(p.piece_type),
                        color: color_to_string(p.color),
                        is_jumpable: p.is_jumpable,
                        is_frozen: spells::piece_frozen(
                            p,
                            &state.active_spells,
                            state.ply_count,
                            r,
                            c,
                        ),
                    })
                })
                .collect()
        })
        .collect();

    let mut legal_moves = Vec::new();
    for r in 0..8 {
        for c in 0..8 {
            match state.board.squares[r][c] {
                Some(p) if p.color == state.current_player => {}
                _ => continue,
            }
            for (tr, tc) in rules::valid_moves_for(r, c, state) {
                legal_moves.push(MoveJson {
                    from: [r, c],
                    to: [tr, tc],
                });
            }
        }
    }

    let freeze_zones = state
        .active_spells
        .iter()
        .filter_map(|spell| match spell {
            ActiveSpell::Freeze { target, .. } if spell.is_active(state.ply_count) => {
                Some([target.0, target.1])
            }
            _ => None,
        })
        .collect();

    StateJson {
        squares,
        current_player: color_to_string(state.current_player),
        game_turn_number: state.game_turn_number,
        ply_count: state.ply_count,
        is_game_over: state.is_game_over,
        game_end_message: state.game_end_message.clone(),
        is_in_check: state.board.is_in_check(
            state.current_player,
            &state.active_spells,
            state.ply_count,
        ),
        awaiting_promotion: state.awaiting_promotion.as_ref().map(|p| [p.r, p.c]),
        white_spells: spells_json(state, Color::White),
        black_spells: spells_json(state, Color::Black),
        freeze_zones,
        legal_moves,
        move_log: state
            .move_log
            .iter()
            .map(|e| MoveLogJson {
                turn: e.turn,
                player: color_to_string(e.player),
                notation: e.notation.clone(),
            })
            .collect(),
    }
}

fn ok(state: &GameState) -> JsValue {
    let result = ActionResult {
        state: Some(build_state_json(state)),
        error: None,
    };
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn err(message: String) -> JsValue {
    let result = ActionResult {
        state: None,
        error: Some(message),
    };
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

#[wasm_bindgen]
pub struct Game {
    state: GameState,
    pending_spell: Option<String>,
}

#[wasm_bindgen]
impl Game {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Game {
        Game {
            state: GameState::new(),
            pending_spell: None,
        }
    }

    pub fn get_state(&self) -> JsValue {
        ok(&self.state)
    }

    pub fn cast_spell(&mut self, kind: &str, row: usize, col: usize) -> JsValue {
        let kind = match SpellKind::parse_prefix(kind) {
            Some(k) => k,
            None => return err(format!("unknown spell '{kind}'")),
        };
        if self.pending_spell.is_some() {
            return err("a spell was already cast this half-move".to_string());
        }
        match self.state.apply_spell(kind, row, col) {
            Ok((next, notation)) => {
                self.state = next;
                self.pending_spell = Some(notation);
                ok(&self.state)
            }
            Err(e) => err(e.to_string()),
        }
    }

    pub fn make_move(
        &mut self,
        from_row: usize,
        from_col: usize,
        to_row: usize,
        to_col: usize,
        promotion: Option<String>,
    ) -> JsValue {
        let promo = match promotion.as_deref() {
            Some(s) => match s.chars().next().and_then(PieceType::from_promotion_char) {
                Some(pt) => Some(pt),
                None => return err(format!("invalid promotion piece '{s}'")),
            },
            None => None,
        };
        match self.state.apply_move(
            from_row,
            from_col,
            to_row,
            to_col,
            self.pending_spell.as_deref(),
            promo,
        ) {
            Ok(MoveOutcome::Done(next)) => {
                self.state = next;
                self.pending_spell = None;
                ok(&self.state)
            }
            Ok(MoveOutcome::AwaitingPromotion(next)) => {
                // Keep the pending spell: it finalizes with the
                // promotion choice.
                self.state = next;
                ok(&self.state)
            }
            Err(e) => err(e.to_string()),
        }
    }

    pub fn promote(&mut self, piece: &str) -> JsValue {
        let promo = match piece.chars().next().and_then(PieceType::from_promotion_char) {
            Some(pt) => pt,
            None => return err(format!("invalid promotion piece '{piece}'")),
        };
        match self
            .state
            .apply_promotion(promo, self.pending_spell.as_deref())
        {
            Ok(next) => {
                self.state = next;
                self.pending_spell = None;
                ok(&self.state)
            }
            Err(e) => err(e.to_string()),
        }
    }

    pub fn resign(&mut self) -> JsValue {
        self.state = self.state.apply_resign();
        self.pending_spell = None;
        ok(&self.state)
    }

    /// Replace the game with one rebuilt from a compact action log.
    pub fn load_log(&mut self, log: &str) -> JsValue {
        match replay_log(log) {
            Ok(state) => {
                self.state = state;
                self.pending_spell = None;
                ok(&self.state)
            }
            Err(e) => err(e.to_string()),
        }
    }

    pub fn get_compact_log(&self) -> String {
        self.state.build_compact_log()
    }

    pub fn get_legal_moves_for_square(&self, row: usize, col: usize) -> JsValue {
        let moves: Vec<MoveJson> = rules::valid_moves_for(row, col, &self.state)
            .into_iter()
            .map(|(tr, tc)| MoveJson {
                from: [row, col],
                to: [tr, tc],
            })
            .collect();
        serde_wasm_bindgen::to_value(&moves).unwrap_or(JsValue::NULL)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}
