//! Random playouts (moves and spells) that re-replay their own compact
//! log after every game and verify the rebuilt state matches.
//!
//! Usage: selfplay [games] [seed]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use spellchess::game::{GameState, MoveOutcome};
use spellchess::piece::PieceType;
use spellchess::replay::replay_log;
use spellchess::rules;
use spellchess::spells::SpellKind;

fn legal_moves(state: &GameState) -> Vec<((usize, usize), (usize, usize))> {
    let mut moves = Vec::new();
    for r in 0..8 {
        for c in 0..8 {
            match state.board.squares[r][c] {
                Some(p) if p.color == state.current_player => {}
                _ => continue,
            }
            for to in rules::valid_moves_for(r, c, state) {
                moves.push(((r, c), to));
            }
        }
    }
    moves
}

fn main() {
    let mut args = std::env::args().skip(1);
    let games: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(20);
    let seed: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(1);
    let mut rng = StdRng::seed_from_u64(seed);

    for game in 0..games {
        let mut state = GameState::new();
        while !state.is_game_over && state.ply_count < 300 {
            let mut spell_notation: Option<String> = None;

            // Sometimes open the half-move with a random spell. Skip
            // casts that would leave the caster with no move to
            // finalize the half-move (a self-freeze can do that).
            if rng.gen_bool(0.15) {
                let kind = if rng.gen_bool(0.5) {
                    SpellKind::Jump
                } else {
                    SpellKind::Freeze
                };
                let r = rng.gen_range(0..8);
                let c = rng.gen_range(0..8);
                if let Ok((next, notation)) = state.apply_spell(kind, r, c) {
                    if !legal_moves(&next).is_empty() {
                        state = next;
                        spell_notation = Some(notation);
                    }
                }
            }

            let moves = legal_moves(&state);
            let Some(&(from, to)) = moves.get(rng.gen_range(0..moves.len().max(1))) else {
                break;
            };
            match state.apply_move(
                from.0,
                from.1,
                to.0,
                to.1,
                spell_notation.as_deref(),
                Some(PieceType::Queen),
            ) {
                Ok(MoveOutcome::Done(next)) => state = next,
                Ok(MoveOutcome::AwaitingPromotion(_)) => {
                    eprintln!(
                        "game {game}: engine returned AwaitingPromotion despite an explicit promotion piece"
                    );
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("game {game}: engine rejected a generated move: {e}");
                    std::process::exit(1);
                }
            }
        }

        let log = state.build_compact_log();
        let replayed = replay_log(&log).unwrap_or_else(|e| {
            eprintln!("game {game}: replay of our own log failed: {e}");
            eprintln!("log: {log}");
            std::process::exit(1);
        });
        assert_eq!(state, replayed, "game {game}: replay diverged");

        let result = state.game_end_message.as_deref().unwrap_or("ongoing");
        eprintln!(
            "game {game}: {} plies, {result}",
            state.ply_count
        );
    }
    eprintln!("{games} games replayed bit-identically");
}
