//! 指し手バッファ

use crate::types::Move;

/// 1局面の指し手数の上限（将棋の最大合法手数593を上回る値）
pub const MAX_MOVES: usize = 600;

/// スコア付きの指し手
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtMove {
    pub mv: Move,
    pub value: i32,
}

impl ExtMove {
    #[inline]
    pub const fn new(mv: Move, value: i32) -> Self {
        ExtMove { mv, value }
    }
}

/// スコア付き指し手のバッファ（MovePicker用）
#[derive(Debug, Clone)]
pub struct ExtMoveBuffer {
    moves: Vec<ExtMove>,
}

impl Default for ExtMoveBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtMoveBuffer {
    pub fn new() -> Self {
        ExtMoveBuffer {
            moves: Vec::with_capacity(MAX_MOVES),
        }
    }

    #[inline]
    pub fn push_move(&mut self, mv: Move) {
        self.moves.push(ExtMove::new(mv, 0));
    }

    #[inline]
    pub fn push(&mut self, ext: ExtMove) {
        self.moves.push(ext);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.moves.clear();
    }

    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.moves.truncate(len);
    }

    #[inline]
    pub fn get(&self, i: usize) -> ExtMove {
        self.moves[i]
    }

    #[inline]
    pub fn swap(&mut self, a: usize, b: usize) {
        self.moves.swap(a, b);
    }

    #[inline]
    pub fn as_slice(&self) -> &[ExtMove] {
        &self.moves
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [ExtMove] {
        &mut self.moves
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtMove> {
        self.moves.iter()
    }

    /// 指定の手を含むか
    pub fn contains(&self, mv: Move) -> bool {
        self.moves.iter().any(|e| e.mv == mv)
    }
}

/// 指し手リスト（合法手列挙用）
#[derive(Debug, Clone, Default)]
pub struct MoveList {
    moves: Vec<Move>,
}

impl MoveList {
    pub fn new() -> Self {
        MoveList {
            moves: Vec::with_capacity(MAX_MOVES),
        }
    }

    #[inline]
    pub fn push(&mut self, mv: Move) {
        self.moves.push(mv);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Move] {
        &self.moves
    }

    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.moves.iter()
    }

    pub fn contains(&self, mv: Move) -> bool {
        self.moves.contains(&mv)
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.moves.iter()
    }
}
