//! 基本型モジュール
//!
//! 将棋エンジンで使用する基本的な型を定義する。
//!
//! # 型の依存関係
//!
//! ```text
//! Color
//!   ↓
//! File, Rank, Direction
//!   ↓
//! Square
//!   ↓
//! PieceType
//!   ↓
//! Piece ← Move
//!   ↓
//! Hand
//!
//! Value, Depth, Bound は独立
//! ```

mod bound;
mod color;
mod depth;
mod direction;
mod file;
mod hand;
mod moves;
mod piece;
mod piece_type;
mod rank;
mod square;
mod value;

pub use bound::Bound;
pub use color::Color;
pub use depth::*;
pub use direction::Direction;
pub use file::File;
pub use hand::Hand;
pub use moves::Move;
pub use piece::Piece;
pub use piece_type::PieceType;
pub use rank::Rank;
pub use square::Square;
pub use value::Value;
