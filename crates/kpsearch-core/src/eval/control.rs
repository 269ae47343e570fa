//! 升ごとの利きインデックス
//!
//! 各升について「その升にある駒・先手の利き数・後手の利き数」を
//! 1 つのインデックスにまとめる。利き数は 3 で頭打ちにする。

use crate::position::Position;
use crate::types::{Color, Piece, Square};

/// 駒の次元（Piece::NUM を 2 の冪に切り上げたもの）
const PIECE_DIM: usize = 32;

/// 利き数の上限 + 1
const CONTROL_DIM: usize = 4;

/// PsqControlIndex の総数
pub const PSQ_CONTROL_INDEX_MAX: usize = Square::NUM * PIECE_DIM * CONTROL_DIM * CONTROL_DIM;

/// 升・駒・先後の利き数をまとめたインデックス
///
/// `((sq * 32 + piece) * 4 + 先手の利き数) * 4 + 後手の利き数`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct PsqControlIndex(u16);

impl PsqControlIndex {
    #[inline]
    pub fn new(sq: Square, piece: Piece, black_controls: u8, white_controls: u8) -> Self {
        let b = black_controls.min(3) as usize;
        let w = white_controls.min(3) as usize;
        let v = ((sq.index() * PIECE_DIM + piece.index()) * CONTROL_DIM + b) * CONTROL_DIM + w;
        debug_assert!(v < PSQ_CONTROL_INDEX_MAX);
        PsqControlIndex(v as u16)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn square(self) -> Square {
        let sq = self.index() / (PIECE_DIM * CONTROL_DIM * CONTROL_DIM);
        Square::from_u8(sq as u8).unwrap_or_default()
    }
}

/// 全升の PsqControlIndex
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PsqControlList {
    list: [PsqControlIndex; Square::NUM],
}

impl PsqControlList {
    /// 局面が差分更新している利き数から作る
    pub fn new(pos: &Position) -> Self {
        let effects = pos.effects();
        let mut list = [PsqControlIndex::default(); Square::NUM];
        for sq in Square::all() {
            list[sq.index()] = PsqControlIndex::new(
                sq,
                pos.piece_on(sq),
                effects.effect(Color::Black, sq),
                effects.effect(Color::White, sq),
            );
        }
        PsqControlList { list }
    }

    #[inline]
    pub fn get(&self, sq: Square) -> PsqControlIndex {
        self.list[sq.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Square, PsqControlIndex)> + '_ {
        Square::all().map(move |sq| (sq, self.list[sq.index()]))
    }

    /// 2つのリストで値が異なる升の集合（bit i が升 i）
    pub fn compute_difference(lhs: &PsqControlList, rhs: &PsqControlList) -> u128 {
        let mut bits = 0u128;
        for (i, (a, b)) in lhs.list.iter().zip(rhs.list.iter()).enumerate() {
            if a != b {
                bits |= 1u128 << i;
            }
        }
        bits
    }
}

/// ビット集合の升を列挙する
pub fn squares_of(mut bits: u128) -> impl Iterator<Item = Square> {
    std::iter::from_fn(move || {
        if bits == 0 {
            return None;
        }
        let i = bits.trailing_zeros();
        bits &= bits - 1;
        Square::from_u8(i as u8)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::SFEN_HIRATE;
    use crate::types::{File, Rank};

    #[test]
    fn test_index_range() {
        let idx = PsqControlIndex::new(Square::SQ_99, Piece::W_DRAGON, 9, 7);
        assert!(idx.index() < PSQ_CONTROL_INDEX_MAX);
        assert_eq!(idx.square(), Square::SQ_99);
        assert_eq!(
            PsqControlIndex::new(Square::SQ_55, Piece::NONE, 5, 0),
            PsqControlIndex::new(Square::SQ_55, Piece::NONE, 3, 0)
        );
    }

    #[test]
    fn test_difference_after_pawn_push() {
        let mut pos = Position::new();
        pos.set_sfen(SFEN_HIRATE).unwrap();
        let before = PsqControlList::new(&pos);
        let from = Square::new(File::File7, Rank::Rank7);
        let to = Square::new(File::File7, Rank::Rank6);
        let m = pos.make_move(from, to, false);
        pos.do_move(m);
        let after = PsqControlList::new(&pos);

        let diff = PsqControlList::compute_difference(&before, &after);
        let squares: Vec<Square> = squares_of(diff).collect();
        assert!(squares.contains(&from));
        assert!(squares.contains(&to));
        // 歩の利きが 7五 に移り、角道が開く
        assert!(squares.contains(&Square::new(File::File7, Rank::Rank5)));
        assert!(squares.contains(&Square::new(File::File6, Rank::Rank6)));
        for sq in Square::all() {
            let changed = before.get(sq) != after.get(sq);
            assert_eq!(diff >> sq.index() & 1 == 1, changed);
        }
    }
}
