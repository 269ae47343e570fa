//! 探索で使う型
//!
//! - `NodeType`: ノードの種類（const generic の引数として使う）
//! - `Stack`: ply ごとの探索情報
//! - `RootMove` / `RootMoves`: ルートの指し手と PV
//! - 置換表に保存する詰みスコアの変換

use crate::movegen::{generate_legal, MoveList};
use crate::position::Position;
use crate::types::{Move, Value, MAX_PLY};

use super::history::ContKey;

/// 探索スタックの大きさ（ply + 数手先の参照に備えて余裕を持たせる）
pub const STACK_SIZE: usize = MAX_PLY as usize + 8;

// =============================================================================
// NodeType
// =============================================================================

/// ノードの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeType {
    NonPV = 0,
    PV = 1,
    Root = 2,
}

// =============================================================================
// Stack
// =============================================================================

/// ply ごとの探索情報
#[derive(Clone)]
pub struct Stack {
    /// この ply で指した手
    pub current_move: Move,
    /// キラー手
    pub killers: [Move; 2],
    /// 静的評価値（王手中は NONE）
    pub static_eval: Value,
    /// この ply で指した手の ContinuationHistory のキー
    pub cont_key: ContKey,
    /// この ply で指した手が何手目か
    pub move_count: i32,
    pub in_check: bool,
    /// 直前の手の履歴スコア（LMR の補正に使う）
    pub stat_score: i32,
    /// この ply から先の読み筋
    pub pv: Vec<Move>,
}

impl Default for Stack {
    fn default() -> Self {
        Self {
            current_move: Move::NONE,
            killers: [Move::NONE; 2],
            static_eval: Value::NONE,
            cont_key: ContKey::SENTINEL,
            move_count: 0,
            in_check: false,
            stat_score: 0,
            pv: Vec::new(),
        }
    }
}

/// 探索スタックを確保する
pub fn init_stack_array() -> Vec<Stack> {
    vec![Stack::default(); STACK_SIZE]
}

// =============================================================================
// RootMove
// =============================================================================

/// ルートの指し手
#[derive(Debug, Clone)]
pub struct RootMove {
    /// 今回の反復での評価値
    pub score: Value,
    /// 前回の反復での評価値
    pub previous_score: Value,
    pub sel_depth: i32,
    /// 読み筋（先頭はこの指し手）
    pub pv: Vec<Move>,
}

impl RootMove {
    pub fn new(mv: Move) -> Self {
        Self {
            score: -Value::INFINITE,
            previous_score: -Value::INFINITE,
            sel_depth: 0,
            pv: vec![mv],
        }
    }

    #[inline]
    pub fn mv(&self) -> Move {
        self.pv[0]
    }
}

/// ルートの指し手一覧
#[derive(Debug, Clone, Default)]
pub struct RootMoves {
    moves: Vec<RootMove>,
}

impl RootMoves {
    pub fn new() -> Self {
        Self { moves: Vec::new() }
    }

    /// 合法手から作る（`search_moves` が空でなければその手だけに絞る）
    pub fn from_legal_moves(pos: &Position, search_moves: &[Move]) -> Self {
        let mut list = MoveList::new();
        generate_legal(pos, &mut list);
        let moves = list
            .iter()
            .filter(|m| search_moves.is_empty() || search_moves.contains(m))
            .map(|&m| RootMove::new(m))
            .collect();
        Self { moves }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RootMove> {
        self.moves.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, RootMove> {
        self.moves.iter_mut()
    }

    /// 評価値の高い順に並べる（同点は元の順序を保つ）
    pub fn stable_sort(&mut self) {
        self.moves
            .sort_by(|a, b| (b.score, b.previous_score).cmp(&(a.score, a.previous_score)));
    }
}

impl std::ops::Index<usize> for RootMoves {
    type Output = RootMove;

    fn index(&self, index: usize) -> &RootMove {
        &self.moves[index]
    }
}

impl std::ops::IndexMut<usize> for RootMoves {
    fn index_mut(&mut self, index: usize) -> &mut RootMove {
        &mut self.moves[index]
    }
}

// =============================================================================
// 置換表の値変換
// =============================================================================

/// 詰みスコアを「この局面からの手数」に直して保存する
#[inline]
pub fn value_to_tt(v: Value, ply: i32) -> Value {
    if v == Value::NONE {
        return v;
    }
    if v.is_win() {
        Value::new(v.raw() + ply)
    } else if v.is_loss() {
        Value::new(v.raw() - ply)
    } else {
        v
    }
}

/// 保存した詰みスコアを「ルートからの手数」に戻す
#[inline]
pub fn value_from_tt(v: Value, ply: i32) -> Value {
    if v == Value::NONE {
        return v;
    }
    if v.is_win() {
        Value::new(v.raw() - ply)
    } else if v.is_loss() {
        Value::new(v.raw() + ply)
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::SFEN_HIRATE;

    #[test]
    fn test_value_tt_roundtrip_for_mate_scores() {
        let v = Value::mate_in(7);
        let stored = value_to_tt(v, 3);
        assert_eq!(stored, Value::mate_in(4));
        assert_eq!(value_from_tt(stored, 3), v);

        let v = Value::mated_in(6);
        assert_eq!(value_from_tt(value_to_tt(v, 2), 2), v);

        assert_eq!(value_to_tt(Value::new(123), 10), Value::new(123));
        assert_eq!(value_from_tt(Value::NONE, 10), Value::NONE);
    }

    #[test]
    fn test_root_moves_from_legal_moves() {
        let mut pos = Position::new();
        pos.set_sfen(SFEN_HIRATE).unwrap();
        let all = RootMoves::from_legal_moves(&pos, &[]);
        assert_eq!(all.len(), 30);

        let first = all[0].mv();
        let only = RootMoves::from_legal_moves(&pos, &[first]);
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].mv(), first);
    }

    #[test]
    fn test_root_moves_stable_sort() {
        let mut pos = Position::new();
        pos.set_sfen(SFEN_HIRATE).unwrap();
        let mut rms = RootMoves::from_legal_moves(&pos, &[]);
        let order: Vec<Move> = rms.iter().map(|rm| rm.mv()).collect();
        rms[3].score = Value::new(50);
        rms.stable_sort();
        assert_eq!(rms[0].mv(), order[3]);
        // 同点の手は元の順序のまま
        assert_eq!(rms[1].mv(), order[0]);
        assert_eq!(rms[2].mv(), order[1]);
    }
}
