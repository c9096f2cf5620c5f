//! The 8x8 board and its attack queries.
//!
//! Indexed `[row][col]` with row 0 = rank 8 (black's back rank) and
//! col 0 = file 'a'. Attack queries take the active spell list because
//! frozen pieces give no attacks and jumpable pieces are transparent to
//! sliders.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::piece::{Color, Piece, PieceId, PieceType};
use crate::spells::{self, ActiveSpell};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Board {
    pub squares: [[Option<Piece>; 8]; 8],
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

impl Board {
    /// An empty board. Useful for setting up test positions.
    pub fn empty() -> Self {
        Board {
            squares: [[None; 8]; 8],
        }
    }

    /// The standard starting position. Piece ids are assigned in
    /// row-major scan order, so every fresh board (and every replay)
    /// produces identical ids.
    pub fn initial() -> Self {
        use PieceType::*;
        let back_rank = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook];

        let mut squares = [[None; 8]; 8];
        let mut next_id = 0u32;
        let mut place = |slot: &mut Option<Piece>, piece_type: PieceType, color: Color| {
            *slot = Some(Piece::new(piece_type, color, PieceId(next_id)));
            next_id += 1;
        };

        // Black pieces (rows 0-1), then white pieces (rows 6-7).
        for (c, &pt) in back_rank.iter().enumerate() {
            place(&mut squares[0][c], pt, Color::Black);
        }
        for slot in &mut squares[1] {
            place(slot, Pawn, Color::Black);
        }
        for slot in &mut squares[6] {
            place(slot, Pawn, Color::White);
        }
        for (c, &pt) in back_rank.iter().enumerate() {
            place(&mut squares[7][c], pt, Color::White);
        }

        Board { squares }
    }

    pub fn in_bounds(row: i32, col: i32) -> bool {
        (0..8).contains(&row) && (0..8).contains(&col)
    }

    pub fn piece_at(&self, r: usize, c: usize) -> Option<Piece> {
        self.squares[r][c]
    }

    pub fn find_king(&self, color: Color) -> Option<(usize, usize)> {
        for r in 0..8 {
            for c in 0..8 {
                if let Some(p) = self.squares[r][c] {
                    if p.piece_type == PieceType::King && p.color == color {
                        return Some((r, c));
                    }
                }
            }
        }
        None
    }

    pub fn find_piece(&self, id: PieceId) -> Option<(usize, usize)> {
        for r in 0..8 {
            for c in 0..8 {
                if let Some(p) = self.squares[r][c] {
                    if p.id == id {
                        return Some((r, c));
                    }
                }
            }
        }
        None
    }

    /// Are the squares strictly between `from` and `to` passable? A
    /// square blocks iff it holds a piece that is not jumpable. Only
    /// meaningful for colinear (straight or diagonal) pairs.
    pub fn path_clear(&self, from: (usize, usize), to: (usize, usize)) -> bool {
        let dr = (to.0 as i32 - from.0 as i32).signum();
        let dc = (to.1 as i32 - from.1 as i32).signum();
        let mut r = from.0 as i32 + dr;
        let mut c = from.1 as i32 + dc;
        while (r, c) != (to.0 as i32, to.1 as i32) {
            if !Self::in_bounds(r, c) {
                return true;
            }
            if let Some(p) = self.squares[r as usize][c as usize] {
                if !p.is_jumpable {
                    return false;
                }
            }
            r += dr;
            c += dc;
        }
        true
    }

    /// Does the piece standing on `from` attack `target`? Pure geometry
    /// plus path clearance; freeze is the caller's concern.
    fn piece_attacks(&self, from: (usize, usize), piece: Piece, target: (usize, usize)) -> bool {
        if from == target {
            return false;
        }
        let dr = target.0 as i32 - from.0 as i32;
        let dc = target.1 as i32 - from.1 as i32;
        match piece.piece_type {
            PieceType::Pawn => {
                // The two forward diagonals.
                dr == piece.color.pawn_dir() && dc.abs() == 1
            }
            PieceType::Knight => {
                (dr.abs() == 2 && dc.abs() == 1) || (dr.abs() == 1 && dc.abs() == 2)
            }
            PieceType::King => dr.abs() <= 1 && dc.abs() <= 1,
            PieceType::Bishop => dr.abs() == dc.abs() && self.path_clear(from, target),
            PieceType::Rook => (dr == 0 || dc == 0) && self.path_clear(from, target),
            PieceType::Queen => {
                (dr == 0 || dc == 0 || dr.abs() == dc.abs()) && self.path_clear(from, target)
            }
        }
    }

    /// Is `(row, col)` attacked by any piece of `attacker`? Frozen
    /// pieces contribute no attacks; kings are exempt from freeze.
    pub fn is_square_attacked_by(
        &self,
        row: usize,
        col: usize,
        attacker: Color,
        active_spells: &[ActiveSpell],
        ply_count: u32,
    ) -> bool {
        for r in 0..8 {
            for c in 0..8 {
                if let Some(p) = self.squares[r][c] {
                    if p.color != attacker {
                        continue;
                    }
                    if spells::piece_frozen(p, active_spells, ply_count, r, c) {
                        continue;
                    }
                    if self.piece_attacks((r, c), p, (row, col)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Every square holding an `attacker` piece that attacks the target.
    /// Used by the mate-escape analysis.
    pub fn attackers_of(
        &self,
        row: usize,
        col: usize,
        attacker: Color,
        active_spells: &[ActiveSpell],
        ply_count: u32,
    ) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for r in 0..8 {
            for c in 0..8 {
                if let Some(p) = self.squares[r][c] {
                    if p.color != attacker
                        || spells::piece_frozen(p, active_spells, ply_count, r, c)
                    {
                        continue;
                    }
                    if self.piece_attacks((r, c), p, (row, col)) {
                        out.push((r, c));
                    }
                }
            }
        }
        out
    }

    /// False (not an error) when the king is absent; mid-transition
    /// queries rely on that.
    pub fn is_in_check(
        &self,
        color: Color,
        active_spells: &[ActiveSpell],
        ply_count: u32,
    ) -> bool {
        match self.find_king(color) {
            Some((kr, kc)) => {
                self.is_square_attacked_by(kr, kc, color.opposite(), active_spells, ply_count)
            }
            None => false,
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..8 {
            write!(f, "  {} ", 8 - r)?;
            for c in 0..8 {
                match self.squares[r][c] {
                    Some(p) => write!(f, "{} ", p.to_char())?,
                    None => write!(f, ". ")?,
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "    a b c d e f g h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_layout_matches_standard_chess() {
        let board = Board::initial();
        let white_king = board.squares[7][4].unwrap();
        assert_eq!(white_king.piece_type, PieceType::King);
        assert_eq!(white_king.color, Color::White);
        assert_eq!(board.find_king(Color::Black), Some((0, 4)));
        for c in 0..8 {
            assert_eq!(board.squares[6][c].unwrap().piece_type, PieceType::Pawn);
            assert_eq!(board.squares[1][c].unwrap().color, Color::Black);
        }
        for r in 2..6 {
            for c in 0..8 {
                assert!(board.squares[r][c].is_none());
            }
        }
    }

    #[test]
    fn piece_ids_are_deterministic_and_unique() {
        let a = Board::initial();
        let b = Board::initial();
        assert_eq!(a, b);

        let mut ids: Vec<u32> = a
            .squares
            .iter()
            .flatten()
            .filter_map(|sq| sq.map(|p| p.id.0))
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn path_clear_respects_jumpable_pieces() {
        let mut board = Board::initial();
        // a1 rook is walled in by the a2 pawn.
        assert!(!board.path_clear((7, 0), (0, 0)));
        board.squares[6][0].as_mut().unwrap().is_jumpable = true;
        // The jumped pawn is transparent; the a7 pawn still blocks a8.
        assert!(!board.path_clear((7, 0), (0, 0)));
        assert!(board.path_clear((7, 0), (2, 0)));
        // Adjacent squares have no strictly-between squares.
        assert!(board.path_clear((7, 0), (6, 0)));
    }

    #[test]
    fn pawn_and_knight_attacks() {
        let board = Board::initial();
        // e2 pawn attacks d3 and f3.
        assert!(board.is_square_attacked_by(5, 3, Color::White, &[], 0));
        assert!(board.is_square_attacked_by(5, 5, Color::White, &[], 0));
        // b1 knight attacks c3.
        let attackers = board.attackers_of(5, 2, Color::White, &[], 0);
        assert!(attackers.contains(&(7, 1)));
        // Nothing attacks e5 from the starting position.
        assert!(!board.is_square_attacked_by(3, 4, Color::White, &[], 0));
    }

    #[test]
    fn frozen_pieces_do_not_attack_but_frozen_kings_do() {
        let mut board = Board::empty();
        board.squares[4][4] = Some(Piece::new(PieceType::Queen, Color::Black, PieceId(0)));
        board.squares[4][6] = Some(Piece::new(PieceType::King, Color::Black, PieceId(1)));
        assert!(board.is_square_attacked_by(4, 0, Color::Black, &[], 0));

        let freeze = vec![ActiveSpell::Freeze {
            target: (4, 5),
            caught: Vec::new(),
            expires_at_ply: 2,
        }];
        // The queen at e4 sits in the zone and goes quiet.
        assert!(!board.is_square_attacked_by(4, 0, Color::Black, &freeze, 0));
        // The king at g4 is in the same zone but still gives check.
        assert!(board.is_square_attacked_by(4, 7, Color::Black, &freeze, 0));
        // Expired zones have no effect.
        assert!(board.is_square_attacked_by(4, 0, Color::Black, &freeze, 2));
    }

    #[test]
    fn sliders_attack_through_jumpable_pieces() {
        let mut board = Board::empty();
        board.squares[4][0] = Some(Piece::new(PieceType::Rook, Color::White, PieceId(0)));
        board.squares[4][3] = Some(Piece::new(PieceType::Pawn, Color::White, PieceId(1)));
        assert!(!board.is_square_attacked_by(4, 6, Color::White, &[], 0));
        board.squares[4][3].as_mut().unwrap().is_jumpable = true;
        assert!(board.is_square_attacked_by(4, 6, Color::White, &[], 0));
    }

    #[test]
    fn check_detection_and_absent_king() {
        let mut board = Board::empty();
        board.squares[7][4] = Some(Piece::new(PieceType::King, Color::White, PieceId(0)));
        board.squares[0][4] = Some(Piece::new(PieceType::Rook, Color::Black, PieceId(1)));
        assert!(board.is_in_check(Color::White, &[], 0));
        // No king on the board is "not in check", not an error.
        assert!(!board.is_in_check(Color::Black, &[], 0));
    }
}
