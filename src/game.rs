//! Game state and the turn executor.
//!
//! Every public operation takes `&self` and returns a fresh state (or an
//! error); callers never observe in-place mutation. A half-move is at
//! most one spell cast followed by exactly one move (or a resign), and
//! finalization assembles notation, detects game end, snapshots, and
//! folds the position into the repetition counter.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::EngineError;
use crate::notation::{self, algebraic, file_char, rank_char};
use crate::piece::{Color, Piece, PieceId, PieceType};
use crate::rules;
use crate::spells::{
    self, ActiveSpell, SpellKind, SpellState, SPELL_COOLDOWN_TURNS, SPELL_DURATION_PLIES,
};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl Default for CastlingRights {
    fn default() -> Self {
        CastlingRights {
            white_kingside: true,
            white_queenside: true,
            black_kingside: true,
            black_queenside: true,
        }
    }
}

impl CastlingRights {
    /// Canonical serialization for position signatures ("KQkq" / "-").
    pub fn signature(&self) -> String {
        let mut s = String::new();
        if self.white_kingside {
            s.push('K');
        }
        if self.white_queenside {
            s.push('Q');
        }
        if self.black_kingside {
            s.push('k');
        }
        if self.black_queenside {
            s.push('q');
        }
        if s.is_empty() {
            s.push('-');
        }
        s
    }
}

/// One finalized half-move (or a resign) in the game record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct MoveLogEntry {
    pub turn: u32,
    pub player: Color,
    /// Human-readable: optional spell prefix, SAN-like move, check/mate
    /// suffix.
    pub notation: String,
    /// The 1-2 compact tokens that produced this half-move.
    pub actions: Vec<String>,
    /// Index into `history` of the post-state snapshot.
    pub ply_snapshot_index: usize,
}

/// A pawn reached its last rank and the caller has not yet chosen the
/// promotion piece.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct AwaitingPromotion {
    pub r: usize,
    pub c: usize,
    pub color: Color,
    pub from_r: usize,
    pub from_c: usize,
    pub original_move_notation: String,
    pub moving_piece_id: PieceId,
}

/// Deep copy of the per-ply state, minus history and repetition
/// bookkeeping. One per finalized ply, plus the initial position.
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct GameSnapshot {
    pub board: Board,
    pub current_player: Color,
    pub game_turn_number: u32,
    pub ply_count: u32,
    pub white_spells: SpellState,
    pub black_spells: SpellState,
    pub active_spells: Vec<ActiveSpell>,
    pub move_log: Vec<MoveLogEntry>,
    pub en_passant_target: Option<(usize, usize)>,
    pub castling_rights: CastlingRights,
    pub is_game_over: bool,
    pub game_end_message: Option<String>,
    pub awaiting_promotion: Option<AwaitingPromotion>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct GameState {
    pub board: Board,
    pub current_player: Color,
    /// Full-move number, from 1; increments after black's finalized ply.
    pub game_turn_number: u32,
    /// Half-moves played, from 0.
    pub ply_count: u32,
    pub white_spells: SpellState,
    pub black_spells: SpellState,
    pub active_spells: Vec<ActiveSpell>,
    pub move_log: Vec<MoveLogEntry>,
    pub en_passant_target: Option<(usize, usize)>,
    pub castling_rights: CastlingRights,
    pub is_game_over: bool,
    pub game_end_message: Option<String>,
    pub awaiting_promotion: Option<AwaitingPromotion>,
    pub history: Vec<GameSnapshot>,
    pub repetition_counter: FxHashMap<String, u32>,
}

/// The result of `apply_move`: either a finalized ply, or a state
/// waiting for the caller to pick a promotion piece.
#[derive(Clone, Debug)]
pub enum MoveOutcome {
    Done(GameState),
    AwaitingPromotion(GameState),
}

/// The standard starting position, white to move.
pub fn initial_state() -> GameState {
    GameState::new()
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> GameState {
        let mut state = GameState {
            board: Board::initial(),
            current_player: Color::White,
            game_turn_number: 1,
            ply_count: 0,
            white_spells: SpellState::default(),
            black_spells: SpellState::default(),
            active_spells: Vec::new(),
            move_log: Vec::new(),
            en_passant_target: None,
            castling_rights: CastlingRights::default(),
            is_game_over: false,
            game_end_message: None,
            awaiting_promotion: None,
            history: Vec::new(),
            repetition_counter: FxHashMap::default(),
        };
        state.history.push(state.snapshot());
        let signature = state.position_signature();
        state.repetition_counter.insert(signature, 1);
        state
    }

    pub fn spells(&self, color: Color) -> &SpellState {
        match color {
            Color::White => &self.white_spells,
            Color::Black => &self.black_spells,
        }
    }

    pub fn spells_mut(&mut self, color: Color) -> &mut SpellState {
        match color {
            Color::White => &mut self.white_spells,
            Color::Black => &mut self.black_spells,
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            board: self.board.clone(),
            current_player: self.current_player,
            game_turn_number: self.game_turn_number,
            ply_count: self.ply_count,
            white_spells: self.white_spells,
            black_spells: self.black_spells,
            active_spells: self.active_spells.clone(),
            move_log: self.move_log.clone(),
            en_passant_target: self.en_passant_target,
            castling_rights: self.castling_rights.clone(),
            is_game_over: self.is_game_over,
            game_end_message: self.game_end_message.clone(),
            awaiting_promotion: self.awaiting_promotion.clone(),
        }
    }

    /// Canonical string identifying a playable position for repetition
    /// purposes: board layout (with jumpable markers), side to move,
    /// castling rights, en passant target, and the four spell cooldown
    /// markers. Piece ids and remaining charges are deliberately
    /// omitted.
    pub fn position_signature(&self) -> String {
        let mut sig = String::with_capacity(96);
        for r in 0..8 {
            if r > 0 {
                sig.push('/');
            }
            for c in 0..8 {
                match self.board.squares[r][c] {
                    Some(p) => {
                        sig.push(p.to_char());
                        if p.is_jumpable {
                            sig.push('*');
                        }
                    }
                    None => sig.push(' '),
                }
            }
        }
        sig.push('|');
        sig.push(match self.current_player {
            Color::White => 'w',
            Color::Black => 'b',
        });
        sig.push('|');
        sig.push_str(&self.castling_rights.signature());
        sig.push('|');
        match self.en_passant_target {
            Some((r, c)) => sig.push_str(&algebraic(r, c)),
            None => sig.push('-'),
        }
        sig.push('|');
        sig.push_str(&format!(
            "{},{},{},{}",
            self.white_spells.jump_last_used_turn,
            self.white_spells.freeze_last_used_turn,
            self.black_spells.jump_last_used_turn,
            self.black_spells.freeze_last_used_turn,
        ));
        sig
    }

    /// The comma-joined concatenation of every compact action taken so
    /// far; the authoritative game record.
    pub fn build_compact_log(&self) -> String {
        self.move_log
            .iter()
            .flat_map(|entry| entry.actions.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Cast a spell for the current player. Does not advance the turn
    /// or ply; the caster must still move (or resign) to finalize the
    /// half-move. Returns the new state and the human spell notation
    /// (`jump@e3` / `freeze@c6`) to pass along to `apply_move`.
    pub fn apply_spell(
        &self,
        kind: SpellKind,
        r: usize,
        c: usize,
    ) -> Result<(GameState, String), EngineError> {
        if self.is_game_over {
            return Err(EngineError::GameOver);
        }
        if self.awaiting_promotion.is_some() {
            return Err(EngineError::PromotionRequired(
                "a promotion is pending; choose the piece first".to_string(),
            ));
        }
        if r >= 8 || c >= 8 {
            return Err(EngineError::InvalidAction(format!(
                "spell target ({r}, {c}) is off the board"
            )));
        }
        let caster = self.current_player;
        let spell_state = self.spells(caster);
        if !spell_state.can_cast(kind, self.game_turn_number) {
            let message = if spell_state.charges_left(kind) == 0 {
                format!("{} has no {} charges left", caster.name(), kind.name())
            } else {
                format!(
                    "{} is on cooldown until turn {}",
                    kind.name(),
                    spell_state.last_used_turn(kind) + SPELL_COOLDOWN_TURNS
                )
            };
            return Err(EngineError::SpellUnavailable(message));
        }

        let notation = format!("{}@{}", kind.name(), algebraic(r, c));
        let mut next = self.clone();
        match kind {
            SpellKind::Jump => match next.board.squares[r][c].as_mut() {
                Some(piece) => {
                    piece.is_jumpable = true;
                    let piece_id = piece.id;
                    next.active_spells.push(ActiveSpell::Jump {
                        piece_id,
                        expires_at_ply: self.ply_count + SPELL_DURATION_PLIES,
                    });
                }
                None => {
                    return Err(EngineError::SpellTargetInvalid(format!(
                        "no piece on {} to jump",
                        algebraic(r, c)
                    )));
                }
            },
            SpellKind::Freeze => {
                let caught = spells::zone_occupants(&next.board, (r, c));
                next.active_spells.push(ActiveSpell::Freeze {
                    target: (r, c),
                    caught,
                    expires_at_ply: self.ply_count + SPELL_DURATION_PLIES,
                });
            }
        }
        next.spells_mut(caster).note_cast(kind, self.game_turn_number);
        Ok((next, notation))
    }

    /// Play a move for the current player. `spell_notation` is the
    /// string returned by `apply_spell` earlier in the same half-move.
    /// If a pawn reaches its last rank without `promotion_piece`, the
    /// returned state is waiting on `apply_promotion`.
    pub fn apply_move(
        &self,
        from_r: usize,
        from_c: usize,
        to_r: usize,
        to_c: usize,
        spell_notation: Option<&str>,
        promotion_piece: Option<PieceType>,
    ) -> Result<MoveOutcome, EngineError> {
        if self.is_game_over {
            return Err(EngineError::GameOver);
        }
        if self.awaiting_promotion.is_some() {
            return Err(EngineError::PromotionRequired(
                "a promotion is pending; choose the piece first".to_string(),
            ));
        }
        if from_r >= 8 || from_c >= 8 || to_r >= 8 || to_c >= 8 {
            return Err(EngineError::InvalidAction(
                "move square is off the board".to_string(),
            ));
        }
        let from = (from_r, from_c);
        let to = (to_r, to_c);
        if !rules::is_valid_move(from, to, self) {
            return Err(EngineError::IllegalMove(format!(
                "{}-{} is not legal for {}",
                algebraic(from_r, from_c),
                algebraic(to_r, to_c),
                self.current_player.name()
            )));
        }
        let piece = match self.board.squares[from_r][from_c] {
            Some(p) => p,
            None => {
                return Err(EngineError::IllegalMove(format!(
                    "no piece on {}",
                    algebraic(from_r, from_c)
                )));
            }
        };

        let mut move_notation = self.move_notation(piece, from, to);

        let mut next = self.clone();
        next.perform_move(piece, from, to);

        if piece.piece_type == PieceType::Pawn && to_r == piece.color.promotion_row() {
            match promotion_piece {
                Some(promo) if promo.is_promotion_choice() => {
                    if let Some(p) = next.board.squares[to_r][to_c].as_mut() {
                        p.piece_type = promo;
                    }
                    move_notation = format!("{}={}", move_notation, promo.letter());
                    next.finalize(move_notation, piece, from, to, spell_notation, Some(promo));
                    return Ok(MoveOutcome::Done(next));
                }
                Some(_) => {
                    return Err(EngineError::InvalidAction(
                        "pawns promote to queen, rook, bishop or knight".to_string(),
                    ));
                }
                None => {
                    next.awaiting_promotion = Some(AwaitingPromotion {
                        r: to_r,
                        c: to_c,
                        color: piece.color,
                        from_r,
                        from_c,
                        original_move_notation: move_notation,
                        moving_piece_id: piece.id,
                    });
                    return Ok(MoveOutcome::AwaitingPromotion(next));
                }
            }
        }

        next.finalize(move_notation, piece, from, to, spell_notation, None);
        Ok(MoveOutcome::Done(next))
    }

    /// Complete a pending promotion and finalize the half-move.
    pub fn apply_promotion(
        &self,
        promotion: PieceType,
        spell_notation: Option<&str>,
    ) -> Result<GameState, EngineError> {
        if self.is_game_over {
            return Err(EngineError::GameOver);
        }
        let pending = match &self.awaiting_promotion {
            Some(p) => p.clone(),
            None => {
                return Err(EngineError::PromotionUnexpected(
                    "no pawn is waiting to promote".to_string(),
                ));
            }
        };
        if !promotion.is_promotion_choice() {
            return Err(EngineError::InvalidAction(
                "pawns promote to queen, rook, bishop or knight".to_string(),
            ));
        }

        let mut next = self.clone();
        next.awaiting_promotion = None;
        let moved = match next.board.squares[pending.r][pending.c].as_mut() {
            Some(piece) if piece.id == pending.moving_piece_id => {
                piece.piece_type = promotion;
                *piece
            }
            _ => {
                return Err(EngineError::PromotionUnexpected(
                    "the promoting pawn is no longer on its square".to_string(),
                ));
            }
        };
        let notation = format!("{}={}", pending.original_move_notation, promotion.letter());
        next.finalize(
            notation,
            moved,
            (pending.from_r, pending.from_c),
            (pending.r, pending.c),
            spell_notation,
            Some(promotion),
        );
        Ok(next)
    }

    /// Resign for the current player. Ends the game without changing
    /// the player to move or the ply count. Calling this on a finished
    /// game is the caller's mistake; the state comes back unchanged.
    pub fn apply_resign(&self) -> GameState {
        if self.is_game_over {
            return self.clone();
        }
        let mut next = self.clone();
        let loser = next.current_player;
        next.is_game_over = true;
        next.game_end_message = Some(format!(
            "{} resigned. {} wins.",
            loser.name(),
            loser.opposite().name()
        ));
        next.move_log.push(MoveLogEntry {
            turn: next.game_turn_number,
            player: loser,
            notation: "R".to_string(),
            actions: vec!["R".to_string()],
            ply_snapshot_index: next.history.len(),
        });
        next.history.push(next.snapshot());
        next
    }

    /// SAN-like notation for a move, computed from the pre-move
    /// position. No check/mate suffix; finalization appends it.
    fn move_notation(&self, piece: Piece, from: (usize, usize), to: (usize, usize)) -> String {
        if piece.piece_type == PieceType::King && from.0 == to.0 && from.1.abs_diff(to.1) == 2 {
            return if to.1 == 6 { "O-O" } else { "O-O-O" }.to_string();
        }
        let target = self.board.squares[to.0][to.1];
        let is_en_passant = piece.piece_type == PieceType::Pawn
            && from.1 != to.1
            && target.is_none()
            && self.en_passant_target == Some(to);
        let is_capture = target.is_some() || is_en_passant;

        if piece.piece_type == PieceType::Pawn {
            if is_capture {
                format!("{}x{}", file_char(from.1), algebraic(to.0, to.1))
            } else {
                algebraic(to.0, to.1)
            }
        } else {
            let mut s = String::from(piece.piece_type.letter());
            s.push_str(&self.disambiguation(piece, from, to));
            if is_capture {
                s.push('x');
            }
            s.push_str(&algebraic(to.0, to.1));
            s
        }
    }

    /// SAN tie-break: file if the files differ, else rank, else both.
    fn disambiguation(&self, piece: Piece, from: (usize, usize), to: (usize, usize)) -> String {
        let mut rivals = Vec::new();
        for r in 0..8 {
            for c in 0..8 {
                if (r, c) == from {
                    continue;
                }
                if let Some(p) = self.board.squares[r][c] {
                    if p.color == piece.color
                        && p.piece_type == piece.piece_type
                        && rules::is_valid_move_for(self, piece.color, (r, c), to)
                    {
                        rivals.push((r, c));
                    }
                }
            }
        }
        if rivals.is_empty() {
            return String::new();
        }
        let shares_file = rivals.iter().any(|&(_, c)| c == from.1);
        let shares_rank = rivals.iter().any(|&(r, _)| r == from.0);
        if !shares_file {
            file_char(from.1).to_string()
        } else if !shares_rank {
            rank_char(from.0).to_string()
        } else {
            format!("{}{}", file_char(from.1), rank_char(from.0))
        }
    }

    /// Mutate the board for a validated move: en passant removal, the
    /// move itself, castling rook relocation, castling-rights upkeep.
    fn perform_move(&mut self, piece: Piece, from: (usize, usize), to: (usize, usize)) {
        // En passant: the captured pawn sits beside the mover, not on
        // the destination square.
        if piece.piece_type == PieceType::Pawn
            && from.1 != to.1
            && self.board.squares[to.0][to.1].is_none()
            && self.en_passant_target == Some(to)
        {
            self.board.squares[from.0][to.1] = None;
        }

        let mut moved = piece;
        moved.has_moved = true;
        self.board.squares[to.0][to.1] = Some(moved);
        self.board.squares[from.0][from.1] = None;

        // Castling: relocate the rook alongside the king.
        if piece.piece_type == PieceType::King && from.1.abs_diff(to.1) == 2 {
            let (rook_from, rook_to) = if to.1 == 6 { (7, 5) } else { (0, 3) };
            if let Some(mut rook) = self.board.squares[from.0][rook_from].take() {
                rook.has_moved = true;
                self.board.squares[from.0][rook_to] = Some(rook);
            }
        }

        // A king move clears both rights for its color.
        if piece.piece_type == PieceType::King {
            match piece.color {
                Color::White => {
                    self.castling_rights.white_kingside = false;
                    self.castling_rights.white_queenside = false;
                }
                Color::Black => {
                    self.castling_rights.black_kingside = false;
                    self.castling_rights.black_queenside = false;
                }
            }
        }
        // A rook move from a starting corner clears that corner's right.
        if piece.piece_type == PieceType::Rook {
            match (piece.color, from) {
                (Color::White, (7, 0)) => self.castling_rights.white_queenside = false,
                (Color::White, (7, 7)) => self.castling_rights.white_kingside = false,
                (Color::Black, (0, 0)) => self.castling_rights.black_queenside = false,
                (Color::Black, (0, 7)) => self.castling_rights.black_kingside = false,
                _ => {}
            }
        }
        // Capturing a rook on its corner also revokes the right.
        match to {
            (7, 0) => self.castling_rights.white_queenside = false,
            (7, 7) => self.castling_rights.white_kingside = false,
            (0, 0) => self.castling_rights.black_queenside = false,
            (0, 7) => self.castling_rights.black_kingside = false,
            _ => {}
        }
    }

    /// Finalize a half-move: compact actions, ply advance and spell
    /// expiry, game-end detection, en passant refresh, move log,
    /// player rotation, snapshot, repetition bookkeeping.
    fn finalize(
        &mut self,
        move_notation: String,
        moved_piece: Piece,
        from: (usize, usize),
        to: (usize, usize),
        spell_notation: Option<&str>,
        promotion: Option<PieceType>,
    ) {
        let mover = moved_piece.color;

        let mut actions = Vec::with_capacity(2);
        if let Some(spell) = spell_notation {
            actions.push(compact_spell_token(spell));
        }
        let mut move_token = format!(
            "{}-{}",
            algebraic(from.0, from.1),
            algebraic(to.0, to.1)
        );
        if let Some(promo) = promotion {
            move_token.push('=');
            move_token.push(notation::promotion_letter(promo, mover));
        }
        actions.push(move_token);

        self.ply_count += 1;
        spells::update_active_spells(&mut self.board, &mut self.active_spells, self.ply_count);

        let opponent = mover.opposite();
        let mut suffix = "";
        if self.board.find_king(opponent).is_none() {
            self.is_game_over = true;
            self.game_end_message = Some(format!("{} wins by king capture!", mover.name()));
            suffix = "#";
        } else {
            let in_check = self
                .board
                .is_in_check(opponent, &self.active_spells, self.ply_count);
            let can_reply = rules::has_legal_moves(opponent, self);
            if in_check && !can_reply {
                self.is_game_over = true;
                self.game_end_message = Some(format!("{} wins by checkmate!", mover.name()));
                suffix = "#";
            } else if !in_check && !can_reply {
                self.is_game_over = true;
                self.game_end_message = Some("Draw by stalemate.".to_string());
            } else if in_check {
                suffix = "+";
            }
        }

        self.en_passant_target =
            if moved_piece.piece_type == PieceType::Pawn && from.0.abs_diff(to.0) == 2 {
                Some(((from.0 + to.0) / 2, from.1))
            } else {
                None
            };

        let full_notation = match spell_notation {
            Some(spell) => format!("{spell} {move_notation}{suffix}"),
            None => format!("{move_notation}{suffix}"),
        };
        self.move_log.push(MoveLogEntry {
            turn: self.game_turn_number,
            player: mover,
            notation: full_notation,
            actions,
            ply_snapshot_index: self.history.len(),
        });

        if !self.is_game_over {
            if mover == Color::Black {
                self.game_turn_number += 1;
            }
            self.current_player = opponent;
        }

        self.history.push(self.snapshot());

        let signature = self.position_signature();
        let count = {
            let entry = self.repetition_counter.entry(signature).or_insert(0);
            *entry += 1;
            *entry
        };
        if count >= 3 && !self.is_game_over {
            self.is_game_over = true;
            self.game_end_message = Some("Draw by threefold repetition.".to_string());
            // The just-pushed snapshot must match what replaying the
            // full log yields; earlier snapshots and notation stay.
            if let Some(last) = self.history.last_mut() {
                last.is_game_over = true;
                last.game_end_message = self.game_end_message.clone();
            }
        }
    }
}

/// `jump@e3` → `j@e3`, `freeze@c6` → `f@c6`.
fn compact_spell_token(spell_notation: &str) -> String {
    match spell_notation.split_once('@') {
        Some((prefix, square)) => match SpellKind::parse_prefix(prefix) {
            Some(kind) => format!("{}@{}", kind.short(), square),
            None => spell_notation.to_string(),
        },
        None => spell_notation.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{replay, replay_log};

    fn put(state: &mut GameState, r: usize, c: usize, pt: PieceType, color: Color, id: u32) {
        state.board.squares[r][c] = Some(Piece::new(pt, color, PieceId(id)));
    }

    fn bare_state() -> GameState {
        let mut state = GameState::new();
        state.board = crate::board::Board::empty();
        state
    }

    fn play(state: &GameState, from: (usize, usize), to: (usize, usize)) -> GameState {
        match state
            .apply_move(from.0, from.1, to.0, to.1, None, None)
            .unwrap()
        {
            MoveOutcome::Done(next) => next,
            MoveOutcome::AwaitingPromotion(_) => panic!("unexpected promotion"),
        }
    }

    #[test]
    fn spell_cast_does_not_advance_the_turn() {
        let state = GameState::new();
        let (cast, notation) = state.apply_spell(SpellKind::Jump, 6, 4).unwrap();
        assert_eq!(notation, "jump@e2");
        assert_eq!(cast.ply_count, 0);
        assert_eq!(cast.game_turn_number, 1);
        assert_eq!(cast.current_player, Color::White);
        assert_eq!(cast.white_spells.jump_left, 1);
        assert_eq!(cast.white_spells.jump_last_used_turn, 1);
        assert_eq!(cast.active_spells.len(), 1);
        assert!(cast.move_log.is_empty());
        assert!(cast.board.squares[6][4].unwrap().is_jumpable);
        // The caller's state is untouched.
        assert_eq!(state, GameState::new());
    }

    #[test]
    fn jump_needs_a_piece_freeze_does_not() {
        let state = GameState::new();
        assert!(matches!(
            state.apply_spell(SpellKind::Jump, 4, 4),
            Err(EngineError::SpellTargetInvalid(_))
        ));
        let (cast, notation) = state.apply_spell(SpellKind::Freeze, 4, 4).unwrap();
        assert_eq!(notation, "freeze@e4");
        match &cast.active_spells[0] {
            ActiveSpell::Freeze {
                target,
                caught,
                expires_at_ply,
            } => {
                assert_eq!(*target, (4, 4));
                assert!(caught.is_empty());
                assert_eq!(*expires_at_ply, 2);
            }
            other => panic!("expected a freeze, got {other:?}"),
        }
        // Freezing a populated corner records the occupants.
        let (corner, _) = state.apply_spell(SpellKind::Freeze, 7, 0).unwrap();
        match &corner.active_spells[0] {
            ActiveSpell::Freeze { caught, .. } => assert_eq!(caught.len(), 4),
            other => panic!("expected a freeze, got {other:?}"),
        }
    }

    #[test]
    fn cooldown_is_enforced_across_turns() {
        let state = GameState::new();
        let (state, spell) = state.apply_spell(SpellKind::Freeze, 4, 4).unwrap();
        let state = match state
            .apply_move(6, 4, 4, 4, Some(&spell), None)
            .unwrap()
        {
            MoveOutcome::Done(s) => s,
            _ => panic!("unexpected promotion"),
        };
        let state = play(&state, (1, 4), (3, 4)); // turn 2 begins
        assert!(matches!(
            state.apply_spell(SpellKind::Freeze, 4, 4),
            Err(EngineError::SpellUnavailable(_))
        ));
        let state = play(&state, (7, 6), (5, 5));
        let state = play(&state, (0, 1), (2, 2)); // turn 3
        assert!(matches!(
            state.apply_spell(SpellKind::Freeze, 4, 4),
            Err(EngineError::SpellUnavailable(_))
        ));
        let state = play(&state, (7, 1), (5, 2));
        let state = play(&state, (0, 6), (2, 5)); // turn 4: cooldown over
        let (state, _) = state.apply_spell(SpellKind::Freeze, 4, 4).unwrap();
        assert_eq!(state.white_spells.freeze_left, 3);
        assert_eq!(state.white_spells.freeze_last_used_turn, 4);
    }

    #[test]
    fn promotion_two_step_protocol() {
        let mut state = bare_state();
        put(&mut state, 7, 7, PieceType::King, Color::White, 0);
        put(&mut state, 3, 7, PieceType::King, Color::Black, 1);
        put(&mut state, 1, 0, PieceType::Pawn, Color::White, 2);
        let pawn_id = PieceId(2);

        let pending = match state.apply_move(1, 0, 0, 0, None, None).unwrap() {
            MoveOutcome::AwaitingPromotion(s) => s,
            MoveOutcome::Done(_) => panic!("expected a pending promotion"),
        };
        assert!(pending.awaiting_promotion.is_some());
        assert_eq!(pending.ply_count, 0);
        assert!(pending.move_log.is_empty());
        assert_eq!(pending.board.squares[0][0].unwrap().piece_type, PieceType::Pawn);

        // Everything except apply_promotion is refused while pending.
        assert!(matches!(
            pending.apply_move(7, 7, 7, 6, None, None),
            Err(EngineError::PromotionRequired(_))
        ));
        assert!(matches!(
            pending.apply_spell(SpellKind::Freeze, 4, 4),
            Err(EngineError::PromotionRequired(_))
        ));

        let done = pending.apply_promotion(PieceType::Queen, None).unwrap();
        let queen = done.board.squares[0][0].unwrap();
        assert_eq!(queen.piece_type, PieceType::Queen);
        assert_eq!(queen.id, pawn_id);
        assert!(done.awaiting_promotion.is_none());
        assert_eq!(done.ply_count, 1);
        assert_eq!(done.move_log[0].notation, "a8=Q");
        assert_eq!(done.move_log[0].actions, vec!["a7-a8=Q"]);

        // No pending promotion: refused.
        assert!(matches!(
            GameState::new().apply_promotion(PieceType::Queen, None),
            Err(EngineError::PromotionUnexpected(_))
        ));
    }

    #[test]
    fn black_promotion_token_uses_lowercase() {
        let mut state = bare_state();
        put(&mut state, 2, 7, PieceType::King, Color::White, 0);
        put(&mut state, 0, 3, PieceType::King, Color::Black, 1);
        put(&mut state, 6, 0, PieceType::Pawn, Color::Black, 2);
        state.current_player = Color::Black;

        let done = match state
            .apply_move(6, 0, 7, 0, None, Some(PieceType::Knight))
            .unwrap()
        {
            MoveOutcome::Done(s) => s,
            _ => panic!("promotion piece was supplied"),
        };
        assert_eq!(done.move_log[0].notation, "a1=N");
        assert_eq!(done.move_log[0].actions, vec!["a2-a1=n"]);
    }

    #[test]
    fn jump_enables_double_push_until_expiry() {
        // A friendly knight parked on e3 blocks e2-e4.
        let mut state = GameState::new();
        let knight = state.board.squares[7][6].take().unwrap();
        state.board.squares[5][4] = Some(knight);
        assert!(matches!(
            state.apply_move(6, 4, 4, 4, None, None),
            Err(EngineError::IllegalMove(_))
        ));

        let (cast, spell) = state.apply_spell(SpellKind::Jump, 5, 4).unwrap();
        let done = match cast.apply_move(6, 4, 4, 4, Some(&spell), None).unwrap() {
            MoveOutcome::Done(s) => s,
            _ => panic!("unexpected promotion"),
        };
        assert_eq!(done.board.squares[4][4].unwrap().piece_type, PieceType::Pawn);
        assert_eq!(done.move_log[0].notation, "jump@e3 e4");
        assert_eq!(done.move_log[0].actions, vec!["j@e3", "e2-e4"]);

        // Same setup, but the caster pushes a wing pawn instead; two
        // plies later the spell is gone and the double push is illegal
        // again.
        let (cast, spell) = state.apply_spell(SpellKind::Jump, 5, 4).unwrap();
        let s = match cast.apply_move(6, 0, 5, 0, Some(&spell), None).unwrap() {
            MoveOutcome::Done(s) => s,
            _ => panic!("unexpected promotion"),
        };
        let s = play(&s, (1, 0), (2, 0));
        assert!(s.active_spells.is_empty());
        assert!(!s.board.squares[5][4].unwrap().is_jumpable);
        assert!(matches!(
            s.apply_move(6, 4, 4, 4, None, None),
            Err(EngineError::IllegalMove(_))
        ));
    }

    #[test]
    fn notation_disambiguates_by_file_then_rank() {
        // Knights on b1 and f1 can both reach d2.
        let mut state = bare_state();
        put(&mut state, 7, 7, PieceType::King, Color::White, 0);
        put(&mut state, 0, 0, PieceType::King, Color::Black, 1);
        put(&mut state, 7, 1, PieceType::Knight, Color::White, 2);
        put(&mut state, 7, 5, PieceType::Knight, Color::White, 3);
        let done = play(&state, (7, 1), (6, 3));
        assert_eq!(done.move_log[0].notation, "Nbd2");

        // Rooks on a1 and a5 share a file; the rank breaks the tie.
        let mut state = bare_state();
        put(&mut state, 7, 7, PieceType::King, Color::White, 0);
        put(&mut state, 0, 7, PieceType::King, Color::Black, 1);
        put(&mut state, 7, 0, PieceType::Rook, Color::White, 2);
        put(&mut state, 3, 0, PieceType::Rook, Color::White, 3);
        let done = play(&state, (7, 0), (5, 0));
        assert_eq!(done.move_log[0].notation, "R1a3");

        // A lone piece needs no disambiguation.
        let done = play(&GameState::new(), (7, 6), (5, 5));
        assert_eq!(done.move_log[0].notation, "Nf3");
    }

    #[test]
    fn check_gets_a_plus_suffix() {
        let s = replay_log("e2-e4,e7-e5,d1-h5,b8-c6,h5-f7").unwrap();
        assert_eq!(s.move_log.last().unwrap().notation, "Qxf7+");
        assert!(!s.is_game_over);
        assert_eq!(s.current_player, Color::Black);
    }

    #[test]
    fn capturing_the_king_ends_the_game() {
        let mut state = bare_state();
        put(&mut state, 7, 7, PieceType::King, Color::White, 0);
        put(&mut state, 4, 3, PieceType::Queen, Color::White, 1);
        put(&mut state, 0, 3, PieceType::King, Color::Black, 2);
        let done = play(&state, (4, 3), (0, 3));
        assert!(done.is_game_over);
        assert_eq!(
            done.game_end_message.as_deref(),
            Some("White wins by king capture!")
        );
        assert_eq!(done.move_log[0].notation, "Qxd8#");
        // The loser stays the player to move after a terminal ply.
        assert_eq!(done.current_player, Color::White);
    }

    #[test]
    fn stalemate_is_a_draw() {
        let mut state = bare_state();
        put(&mut state, 0, 7, PieceType::King, Color::Black, 0);
        put(&mut state, 3, 6, PieceType::Queen, Color::White, 1);
        put(&mut state, 6, 1, PieceType::King, Color::White, 2);
        let done = play(&state, (3, 6), (2, 6));
        assert!(done.is_game_over);
        assert_eq!(done.game_end_message.as_deref(), Some("Draw by stalemate."));
        let last = done.move_log.last().unwrap();
        assert!(!last.notation.ends_with('#'));
    }

    #[test]
    fn resign_bookkeeping_and_game_over_guards() {
        let s = replay_log("e2-e4").unwrap();
        let resigned = s.apply_resign();
        assert!(resigned.is_game_over);
        assert_eq!(
            resigned.game_end_message.as_deref(),
            Some("Black resigned. White wins.")
        );
        assert_eq!(resigned.current_player, Color::Black);
        assert_eq!(resigned.ply_count, 1);
        assert_eq!(resigned.history.len(), resigned.move_log.len() + 1);
        assert_eq!(resigned.move_log.last().unwrap().ply_snapshot_index, 2);

        assert!(matches!(
            resigned.apply_move(1, 4, 3, 4, None, None),
            Err(EngineError::GameOver)
        ));
        assert!(matches!(
            resigned.apply_spell(SpellKind::Freeze, 4, 4),
            Err(EngineError::GameOver)
        ));
        // Resigning a finished game changes nothing.
        assert_eq!(resigned.apply_resign(), resigned);
    }

    #[test]
    fn history_matches_prefix_replays() {
        let log = "e2-e4,e7-e5,g1-f3,b8-c6,f1-b5,a7-a6";
        let s = replay_log(log).unwrap();
        assert_eq!(s.history.len(), s.move_log.len() + 1);
        let tokens: Vec<&str> = log.split(',').collect();
        for i in 0..=tokens.len() {
            let prefix = replay(&tokens[..i]).unwrap();
            assert_eq!(s.history[i], prefix.snapshot(), "prefix of {i} half-moves");
        }
    }

    #[test]
    fn signature_tracks_cooldowns_but_not_charges() {
        let a = GameState::new();
        let mut b = GameState::new();
        b.white_spells.jump_last_used_turn = 1;
        assert_ne!(a.position_signature(), b.position_signature());

        let mut c = GameState::new();
        c.white_spells.jump_left = 0;
        assert_eq!(a.position_signature(), c.position_signature());

        let mut d = GameState::new();
        d.board.squares[6][4].as_mut().unwrap().is_jumpable = true;
        assert_ne!(a.position_signature(), d.position_signature());
    }
}
