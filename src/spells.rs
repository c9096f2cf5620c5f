//! Spell state: charges, cooldowns, and the active-effect lifecycle.
//!
//! Jump marks one piece transparent to path clearance; Freeze locks down
//! a 3x3 zone. Both last for the caster's current ply and the opponent's
//! reply, then expire at finalization.

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::piece::{Piece, PieceId, PieceType};

pub const JUMP_CHARGES: u8 = 2;
pub const FREEZE_CHARGES: u8 = 5;
/// A spell cast at turn T cannot be recast before turn T + 3.
pub const SPELL_COOLDOWN_TURNS: u32 = 3;
/// Effects live for two plies: the caster's and the opponent's.
pub const SPELL_DURATION_PLIES: u32 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SpellKind {
    Jump,
    Freeze,
}

impl SpellKind {
    pub fn name(self) -> &'static str {
        match self {
            SpellKind::Jump => "jump",
            SpellKind::Freeze => "freeze",
        }
    }

    /// Single-letter prefix used in compact tokens.
    pub fn short(self) -> char {
        match self {
            SpellKind::Jump => 'j',
            SpellKind::Freeze => 'f',
        }
    }

    /// Accepts both the compact (`j`, `f`) and human (`jump`, `freeze`)
    /// prefixes.
    pub fn parse_prefix(s: &str) -> Option<SpellKind> {
        match s {
            "j" | "jump" => Some(SpellKind::Jump),
            "f" | "freeze" => Some(SpellKind::Freeze),
            _ => None,
        }
    }
}

/// Per-player spell bookkeeping. A `last_used_turn` of 0 means never
/// used; turns are counted per full move and start at 1.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SpellState {
    pub jump_left: u8,
    pub freeze_left: u8,
    pub jump_last_used_turn: u32,
    pub freeze_last_used_turn: u32,
}

impl Default for SpellState {
    fn default() -> Self {
        SpellState {
            jump_left: JUMP_CHARGES,
            freeze_left: FREEZE_CHARGES,
            jump_last_used_turn: 0,
            freeze_last_used_turn: 0,
        }
    }
}

impl SpellState {
    pub fn charges_left(&self, kind: SpellKind) -> u8 {
        match kind {
            SpellKind::Jump => self.jump_left,
            SpellKind::Freeze => self.freeze_left,
        }
    }

    pub fn last_used_turn(&self, kind: SpellKind) -> u32 {
        match kind {
            SpellKind::Jump => self.jump_last_used_turn,
            SpellKind::Freeze => self.freeze_last_used_turn,
        }
    }

    pub fn can_cast(&self, kind: SpellKind, game_turn_number: u32) -> bool {
        if self.charges_left(kind) == 0 {
            return false;
        }
        let last = self.last_used_turn(kind);
        last == 0 || game_turn_number >= last + SPELL_COOLDOWN_TURNS
    }

    pub fn note_cast(&mut self, kind: SpellKind, game_turn_number: u32) {
        match kind {
            SpellKind::Jump => {
                self.jump_left -= 1;
                self.jump_last_used_turn = game_turn_number;
            }
            SpellKind::Freeze => {
                self.freeze_left -= 1;
                self.freeze_last_used_turn = game_turn_number;
            }
        }
    }
}

/// A live spell effect with a ply-count expiry horizon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveSpell {
    Jump {
        piece_id: PieceId,
        expires_at_ply: u32,
    },
    Freeze {
        target: (usize, usize),
        /// Occupants of the zone at cast time; diagnostics only. The
        /// live frozen predicate is positional.
        caught: Vec<PieceId>,
        expires_at_ply: u32,
    },
}

impl ActiveSpell {
    pub fn expires_at_ply(&self) -> u32 {
        match self {
            ActiveSpell::Jump { expires_at_ply, .. } => *expires_at_ply,
            ActiveSpell::Freeze { expires_at_ply, .. } => *expires_at_ply,
        }
    }

    pub fn is_active(&self, ply_count: u32) -> bool {
        ply_count < self.expires_at_ply()
    }
}

/// Is `(r, c)` inside the 3x3 zone centered on `target`?
pub fn in_freeze_zone(target: (usize, usize), r: usize, c: usize) -> bool {
    target.0.abs_diff(r) <= 1 && target.1.abs_diff(c) <= 1
}

/// Is the square covered by any active freeze?
pub fn square_frozen(active_spells: &[ActiveSpell], ply_count: u32, r: usize, c: usize) -> bool {
    active_spells.iter().any(|spell| match spell {
        ActiveSpell::Freeze { target, .. } => {
            spell.is_active(ply_count) && in_freeze_zone(*target, r, c)
        }
        ActiveSpell::Jump { .. } => false,
    })
}

/// The live frozen predicate for a piece standing on `(r, c)`. Kings are
/// never frozen, for either attack or movement purposes.
pub fn piece_frozen(
    piece: Piece,
    active_spells: &[ActiveSpell],
    ply_count: u32,
    r: usize,
    c: usize,
) -> bool {
    piece.piece_type != PieceType::King && square_frozen(active_spells, ply_count, r, c)
}

/// Drop expired spells and clear `is_jumpable` on pieces whose jump
/// effect just lapsed (if the piece is still on the board). Invoked at
/// turn finalization, after the ply counter advances.
pub fn update_active_spells(
    board: &mut Board,
    active_spells: &mut Vec<ActiveSpell>,
    ply_count: u32,
) {
    let mut kept = Vec::with_capacity(active_spells.len());
    let mut lapsed = Vec::new();
    for spell in active_spells.drain(..) {
        if spell.is_active(ply_count) {
            kept.push(spell);
        } else if let ActiveSpell::Jump { piece_id, .. } = spell {
            lapsed.push(piece_id);
        }
    }
    for piece_id in lapsed {
        // A second, still-active jump on the same piece keeps the flag.
        let still_jumped = kept
            .iter()
            .any(|s| matches!(s, ActiveSpell::Jump { piece_id: id, .. } if *id == piece_id));
        if still_jumped {
            continue;
        }
        if let Some((r, c)) = board.find_piece(piece_id) {
            if let Some(piece) = &mut board.squares[r][c] {
                piece.is_jumpable = false;
            }
        }
    }
    *active_spells = kept;
}

/// Piece ids standing in the clipped 3x3 around `target`, in board scan
/// order. Recorded on a freeze cast for diagnostics.
pub fn zone_occupants(board: &Board, target: (usize, usize)) -> Vec<PieceId> {
    let mut ids = Vec::new();
    for r in target.0.saturating_sub(1)..=(target.0 + 1).min(7) {
        for c in target.1.saturating_sub(1)..=(target.1 + 1).min(7) {
            if let Some(piece) = board.squares[r][c] {
                ids.push(piece.id);
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Color;

    #[test]
    fn cooldown_blocks_recast_for_three_turns() {
        let mut spells = SpellState::default();
        assert!(spells.can_cast(SpellKind::Jump, 1));
        spells.note_cast(SpellKind::Jump, 2);
        assert_eq!(spells.jump_left, JUMP_CHARGES - 1);
        assert!(!spells.can_cast(SpellKind::Jump, 2));
        assert!(!spells.can_cast(SpellKind::Jump, 3));
        assert!(!spells.can_cast(SpellKind::Jump, 4));
        assert!(spells.can_cast(SpellKind::Jump, 5));
        // The other spell is unaffected.
        assert!(spells.can_cast(SpellKind::Freeze, 2));
    }

    #[test]
    fn charges_run_out() {
        let mut spells = SpellState::default();
        spells.note_cast(SpellKind::Jump, 1);
        spells.note_cast(SpellKind::Jump, 4);
        assert_eq!(spells.jump_left, 0);
        assert!(!spells.can_cast(SpellKind::Jump, 100));
    }

    #[test]
    fn spell_lifetime_covers_caster_and_reply_plies() {
        // Cast during ply 2 → active while ply_count is 2 and 3, gone at 4.
        let spell = ActiveSpell::Jump {
            piece_id: PieceId(0),
            expires_at_ply: 2 + SPELL_DURATION_PLIES,
        };
        assert!(spell.is_active(2));
        assert!(spell.is_active(3));
        assert!(!spell.is_active(4));
    }

    #[test]
    fn freeze_zone_clips_at_the_board_edge() {
        assert!(in_freeze_zone((0, 0), 0, 0));
        assert!(in_freeze_zone((0, 0), 1, 1));
        assert!(!in_freeze_zone((0, 0), 2, 0));
        assert!(!in_freeze_zone((4, 4), 4, 6));

        let board = Board::initial();
        // Zone centered on a8 covers a8, b8, a7, b7: rook, knight, two pawns.
        assert_eq!(zone_occupants(&board, (0, 0)).len(), 4);
        // Mid-board zone in the empty middle catches nothing.
        assert!(zone_occupants(&board, (4, 4)).is_empty());
    }

    #[test]
    fn expired_jump_clears_the_piece_flag() {
        let mut board = Board::initial();
        let knight_id = board.squares[7][1].unwrap().id;
        board.squares[7][1].as_mut().unwrap().is_jumpable = true;
        let mut active = vec![ActiveSpell::Jump {
            piece_id: knight_id,
            expires_at_ply: 2,
        }];

        update_active_spells(&mut board, &mut active, 1);
        assert_eq!(active.len(), 1);
        assert!(board.squares[7][1].unwrap().is_jumpable);

        update_active_spells(&mut board, &mut active, 2);
        assert!(active.is_empty());
        assert!(!board.squares[7][1].unwrap().is_jumpable);
    }

    #[test]
    fn kings_are_exempt_from_freeze() {
        let board = Board::initial();
        let active = vec![ActiveSpell::Freeze {
            target: (7, 4),
            caught: Vec::new(),
            expires_at_ply: 2,
        }];
        let king = board.squares[7][4].unwrap();
        let queen = board.squares[7][3].unwrap();
        assert_eq!(king.color, Color::White);
        assert!(!piece_frozen(king, &active, 0, 7, 4));
        assert!(piece_frozen(queen, &active, 0, 7, 3));
    }
}
