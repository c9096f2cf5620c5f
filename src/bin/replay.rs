//! Replay a compact action log and print the resulting position.
//!
//! Usage: replay "e2-e4,e7-e5,j@e5,g1-f3"

use spellchess::replay::replay_log;

fn main() {
    let log = std::env::args().nth(1).unwrap_or_default();
    match replay_log(&log) {
        Ok(state) => {
            print!("{}", state.board);
            for entry in &state.move_log {
                println!("{:>3}. {:<5} {}", entry.turn, entry.player.name(), entry.notation);
            }
            match &state.game_end_message {
                Some(message) => println!("{message}"),
                None => println!(
                    "{} to move (turn {})",
                    state.current_player.name(),
                    state.game_turn_number
                ),
            }
        }
        Err(e) => {
            eprintln!("replay failed: {e}");
            std::process::exit(1);
        }
    }
}
