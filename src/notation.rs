//! Square coordinates and the compact action grammar.
//!
//! Board coordinates are `(row, col)` with row 0 = rank 8 (black's back
//! rank) and col 0 = file 'a'. Compact tokens are the wire form of every
//! action ever taken in a game: `j@e3`, `f@c6`, `e2-e4`, `e7-e8=Q`, `R`.

use serde::{Deserialize, Serialize};

use crate::piece::{Color, PieceType};
use crate::spells::SpellKind;

/// Convert `(row, col)` to algebraic notation ("a1".."h8").
pub fn algebraic(row: usize, col: usize) -> String {
    let file = (b'a' + col as u8) as char;
    let rank = (b'0' + (8 - row) as u8) as char;
    format!("{file}{rank}")
}

/// Parse algebraic notation back to `(row, col)`.
pub fn parse_algebraic(s: &str) -> Option<(usize, usize)> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let col = bytes[0].wrapping_sub(b'a');
    let rank = bytes[1].wrapping_sub(b'1');
    if col < 8 && rank < 8 {
        Some((7 - rank as usize, col as usize))
    } else {
        None
    }
}

pub fn file_char(col: usize) -> char {
    (b'a' + col as u8) as char
}

pub fn rank_char(row: usize) -> char {
    (b'0' + (8 - row) as u8) as char
}

/// One compact action. The comma-separated concatenation of every action
/// in a game is the authoritative game record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Spell {
        kind: SpellKind,
        r: usize,
        c: usize,
    },
    Move {
        from: (usize, usize),
        to: (usize, usize),
        promotion: Option<PieceType>,
    },
    Resign,
}

impl Action {
    /// Parse a single compact token. Accepts the short (`j@`, `f@`) and
    /// long (`jump@`, `freeze@`) spell prefixes, case-insensitive
    /// promotion letters, and `R`/`r` for resign.
    pub fn parse(token: &str) -> Option<Action> {
        if token.eq_ignore_ascii_case("R") {
            return Some(Action::Resign);
        }
        if let Some((prefix, square)) = token.split_once('@') {
            let kind = SpellKind::parse_prefix(prefix)?;
            let (r, c) = parse_algebraic(square)?;
            return Some(Action::Spell { kind, r, c });
        }
        if let Some((from_part, rest)) = token.split_once('-') {
            let from = parse_algebraic(from_part)?;
            let (to_part, promotion) = match rest.split_once('=') {
                Some((to_part, promo_part)) => {
                    let mut chars = promo_part.chars();
                    let promo = PieceType::from_promotion_char(chars.next()?)?;
                    if chars.next().is_some() {
                        return None;
                    }
                    (to_part, Some(promo))
                }
                None => (rest, None),
            };
            let to = parse_algebraic(to_part)?;
            return Some(Action::Move {
                from,
                to,
                promotion,
            });
        }
        None
    }

    /// Encode back to the compact form. Promotion letters are written in
    /// the mover's case: uppercase for white, lowercase for black.
    pub fn encode(&self, mover: Color) -> String {
        match self {
            Action::Spell { kind, r, c } => format!("{}@{}", kind.short(), algebraic(*r, *c)),
            Action::Move {
                from,
                to,
                promotion,
            } => {
                let mut s = format!("{}-{}", algebraic(from.0, from.1), algebraic(to.0, to.1));
                if let Some(promo) = promotion {
                    s.push('=');
                    s.push(promotion_letter(*promo, mover));
                }
                s
            }
            Action::Resign => "R".to_string(),
        }
    }
}

/// The promotion letter in the mover's case.
pub fn promotion_letter(piece_type: PieceType, mover: Color) -> char {
    let c = piece_type.letter().chars().next().unwrap_or('Q');
    match mover {
        Color::White => c,
        Color::Black => c.to_ascii_lowercase(),
    }
}
