//! 局面状態（StateInfo）
//!
//! `do_move` のたびに1つ積み、`undo_move` で取り除く。

use crate::types::{Move, Piece, Square};

/// 手番側の玉に王手している駒の情報
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Checkers {
    /// 王手している駒の数
    pub count: u8,
    /// 王手している駒の升（複数あるときは最初に見つかったもの）
    pub square: Option<Square>,
}

/// 局面の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateInfo {
    /// Zobristハッシュ
    pub key: u64,
    /// 直前の手で取られた駒
    pub captured: Piece,
    /// 直前の手
    pub last_move: Move,
    /// 手番側の玉への王手
    pub checkers: Checkers,
    /// 最後の null move からの手数
    pub plies_from_null: i32,
}
