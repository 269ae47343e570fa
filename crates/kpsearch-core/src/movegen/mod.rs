//! 指し手生成モジュール

mod generator;
mod types;

pub use generator::{generate_all, generate_legal, generate_with_type, GenType};
pub use types::{ExtMove, ExtMoveBuffer, MoveList, MAX_MOVES};
