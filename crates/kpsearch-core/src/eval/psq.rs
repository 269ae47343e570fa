//! PsqIndex - 駒の種類・持ち主・位置を一意に表すインデックス
//!
//! ## 並び順
//!
//! ### 手駒 (0〜75)
//! 先手→後手の順に、歩(18)・香(4)・桂(4)・銀(4)・金(4)・角(2)・飛(2) の
//! 「n 枚目」を 1 つずつ割り当てる。1 手番あたり 38 個。
//!
//! ### 盤上駒 (76〜2109)
//! 先手→後手、駒種インデックス順（玉を除く）に 81 升を割り当てる。
//! 行き所のない升（歩・香の 1 段目、桂の 1・2 段目）には割り当てない。
//! 後手の駒は 1093 から始まる。
//!
//! 先手視点と後手視点のインデックスは、180度回転と先後反転で対応する。

use std::sync::LazyLock;

use crate::position::is_dead_square;
use crate::types::{Color, Piece, PieceType, Square};

/// 手駒領域の終端
pub const HAND_END: usize = 76;

/// PsqIndex の総数
pub const PSQ_INDEX_MAX: usize = 2110;

/// 駒の種類・持ち主・位置のインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PsqIndex(u16);

impl PsqIndex {
    /// 無効値（テーブル未割り当て）
    pub const INVALID: PsqIndex = PsqIndex(u16::MAX);

    #[inline]
    pub const fn new(v: u16) -> Self {
        PsqIndex(v)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_hand(self) -> bool {
        (self.0 as usize) < HAND_END
    }

    /// 盤上の駒のインデックス
    #[inline]
    pub fn of_board(piece: Piece, sq: Square) -> PsqIndex {
        debug_assert!(piece.is_some() && !piece.is(PieceType::King), "no index for {piece:?}");
        let idx = TABLES.board[piece.index()][sq.index()];
        debug_assert!(idx != PsqIndex::INVALID, "{piece:?} cannot stand on {sq}");
        idx
    }

    /// 手駒の `num` 枚目のインデックス（`num` は 1 始まり）
    #[inline]
    pub fn of_hand(c: Color, pt: PieceType, num: u32) -> PsqIndex {
        debug_assert!(
            (1..=pt.max_hand_count()).contains(&num),
            "hand count {num} out of range for {pt:?}"
        );
        let base = TABLES.hand_offset[c.index()][pt.hand_index()];
        PsqIndex(base + num as u16 - 1)
    }

    /// インデックスが表す駒と位置
    #[inline]
    pub fn location(self) -> PsqLocation {
        TABLES.reverse[self.index()]
    }

    pub fn all() -> impl Iterator<Item = PsqIndex> {
        (0..PSQ_INDEX_MAX as u16).map(PsqIndex)
    }
}

/// インデックスの逆引き結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsqLocation {
    /// 手駒（持ち主、駒種、何枚目か）
    Hand(Color, PieceType, u32),
    /// 盤上（駒、升）
    Board(Piece, Square),
}

/// 先手視点と後手視点のインデックスの組
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PsqPair {
    black: PsqIndex,
    white: PsqIndex,
}

impl PsqPair {
    #[inline]
    pub const fn new(black: PsqIndex, white: PsqIndex) -> Self {
        PsqPair { black, white }
    }

    /// 盤上の駒
    #[inline]
    pub fn of_board(piece: Piece, sq: Square) -> Self {
        PsqPair {
            black: PsqIndex::of_board(piece, sq),
            white: PsqIndex::of_board(piece.opponent_piece(), sq.inverse()),
        }
    }

    /// `c` の手駒の `num` 枚目
    #[inline]
    pub fn of_hand(c: Color, pt: PieceType, num: u32) -> Self {
        PsqPair {
            black: PsqIndex::of_hand(c, pt, num),
            white: PsqIndex::of_hand(!c, pt, num),
        }
    }

    /// 先手視点のインデックス
    #[inline]
    pub const fn black(self) -> PsqIndex {
        self.black
    }

    /// 後手視点のインデックス
    #[inline]
    pub const fn white(self) -> PsqIndex {
        self.white
    }

    /// 視点を指定して取得
    #[inline]
    pub const fn get(self, c: Color) -> PsqIndex {
        match c {
            Color::Black => self.black,
            Color::White => self.white,
        }
    }
}

// =============================================================================
// テーブル
// =============================================================================

struct PsqTables {
    board: [[PsqIndex; Square::NUM]; Piece::NUM],
    hand_offset: [[u16; PieceType::HAND_NUM]; Color::NUM],
    reverse: Vec<PsqLocation>,
}

static TABLES: LazyLock<PsqTables> = LazyLock::new(|| {
    let mut reverse = Vec::with_capacity(PSQ_INDEX_MAX);

    let mut hand_offset = [[0u16; PieceType::HAND_NUM]; Color::NUM];
    for c in Color::ALL {
        for pt in PieceType::HAND_PIECES {
            hand_offset[c.index()][pt.hand_index()] = reverse.len() as u16;
            for num in 1..=pt.max_hand_count() {
                reverse.push(PsqLocation::Hand(c, pt, num));
            }
        }
    }
    debug_assert_eq!(reverse.len(), HAND_END);

    let mut board = [[PsqIndex::INVALID; Square::NUM]; Piece::NUM];
    for piece in Piece::all().filter(|p| !p.is(PieceType::King)) {
        for sq in Square::all() {
            if is_dead_square(piece.piece_type(), piece.color(), sq) {
                continue;
            }
            board[piece.index()][sq.index()] = PsqIndex(reverse.len() as u16);
            reverse.push(PsqLocation::Board(piece, sq));
        }
    }
    debug_assert_eq!(reverse.len(), PSQ_INDEX_MAX);

    PsqTables {
        board,
        hand_offset,
        reverse,
    }
});
