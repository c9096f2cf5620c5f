//! Spell Chess rules engine.
//!
//! Standard chess plus two spells: **Jump** (one piece becomes
//! transparent to path clearance for two plies) and **Freeze** (a 3x3
//! zone whose occupants, kings excepted, can neither move nor attack
//! for two plies). The engine is a pure state machine: every operation
//! takes a state and returns a new one, and the comma-separated compact
//! action log is the sole source of truth: `replay` rebuilds any game
//! from it, bit for bit.

pub mod board;
pub mod error;
pub mod game;
pub mod notation;
pub mod piece;
pub mod replay;
pub mod rules;
pub mod spells;

#[cfg(target_arch = "wasm32")]
mod wasm_api;
