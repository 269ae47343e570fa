//! 駒（Piece）

use super::{Color, PieceType};

/// 駒（先後の区別あり）
///
/// 下位4bit: PieceType、bit 4: Color
/// - 0: NONE
/// - 1-14: 先手の駒
/// - 17-30: 後手の駒
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Piece(u8);

impl Piece {
    /// 駒なし
    pub const NONE: Piece = Piece(0);

    pub const B_PAWN: Piece = Piece(1);
    pub const B_LANCE: Piece = Piece(2);
    pub const B_KNIGHT: Piece = Piece(3);
    pub const B_SILVER: Piece = Piece(4);
    pub const B_BISHOP: Piece = Piece(5);
    pub const B_ROOK: Piece = Piece(6);
    pub const B_GOLD: Piece = Piece(7);
    pub const B_KING: Piece = Piece(8);
    pub const B_PRO_PAWN: Piece = Piece(9);
    pub const B_HORSE: Piece = Piece(13);
    pub const B_DRAGON: Piece = Piece(14);

    pub const W_PAWN: Piece = Piece(17);
    pub const W_LANCE: Piece = Piece(18);
    pub const W_KNIGHT: Piece = Piece(19);
    pub const W_SILVER: Piece = Piece(20);
    pub const W_BISHOP: Piece = Piece(21);
    pub const W_ROOK: Piece = Piece(22);
    pub const W_GOLD: Piece = Piece(23);
    pub const W_KING: Piece = Piece(24);
    pub const W_HORSE: Piece = Piece(29);
    pub const W_DRAGON: Piece = Piece(30);

    /// 駒の数（配列サイズ、NONE と欠番を含む）
    pub const NUM: usize = 31;

    /// ColorとPieceTypeから生成
    #[inline]
    pub const fn new(color: Color, piece_type: PieceType) -> Piece {
        Piece(piece_type as u8 | ((color as u8) << 4))
    }

    /// 駒種を取得
    ///
    /// NONE に対して呼んではならない。
    #[inline]
    pub const fn piece_type(self) -> PieceType {
        debug_assert!(self.0 != 0, "piece_type() called on Piece::NONE");
        match PieceType::from_u8(self.0 & 0x0F) {
            Some(pt) => pt,
            None => PieceType::Pawn,
        }
    }

    /// 手番を取得
    #[inline]
    pub const fn color(self) -> Color {
        if self.0 & 0x10 == 0 { Color::Black } else { Color::White }
    }

    /// 駒がないか
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// 駒があるか
    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }

    /// 指定駒種かどうか（NONE は常に false）
    #[inline]
    pub const fn is(self, pt: PieceType) -> bool {
        self.0 != 0 && (self.0 & 0x0F) == pt as u8
    }

    /// 成り駒を返す
    #[inline]
    pub const fn promote(self) -> Option<Piece> {
        match self.piece_type().promote() {
            Some(pt) => Some(Piece::new(self.color(), pt)),
            None => None,
        }
    }

    /// 生駒を返す
    #[inline]
    pub const fn unpromote(self) -> Piece {
        Piece::new(self.color(), self.piece_type().unpromote())
    }

    /// 先後を入れ替えた駒（NONE はそのまま）
    #[inline]
    pub const fn opponent_piece(self) -> Piece {
        if self.0 == 0 { self } else { Piece(self.0 ^ 0x10) }
    }

    /// 駒を取ったときに手駒になる駒種
    #[inline]
    pub const fn hand_type(self) -> PieceType {
        self.piece_type().unpromote()
    }

    /// インデックス（0-30、0は無効）
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// 内部値を取得
    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// 内部値から生成（不正な値は None）
    #[inline]
    pub const fn from_raw(raw: u8) -> Option<Piece> {
        if raw == 0 {
            return Some(Piece::NONE);
        }
        if raw & !0x1F != 0 || PieceType::from_u8(raw & 0x0F).is_none() {
            return None;
        }
        Some(Piece(raw))
    }

    /// 盤上にある全ての駒（先手→後手、駒種インデックス順）
    pub fn all() -> impl Iterator<Item = Piece> {
        Color::ALL
            .into_iter()
            .flat_map(|c| PieceType::ALL.into_iter().map(move |pt| Piece::new(c, pt)))
    }

    /// SFEN 表記（"+p" など）
    pub fn to_sfen(self) -> String {
        if self.is_none() {
            return String::new();
        }
        let pt = self.piece_type();
        let c = match self.color() {
            Color::Black => pt.sfen_char(),
            Color::White => pt.sfen_char().to_ascii_lowercase(),
        };
        if pt.is_promoted() { format!("+{c}") } else { c.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_new() {
        assert_eq!(Piece::new(Color::Black, PieceType::Pawn), Piece::B_PAWN);
        assert_eq!(Piece::new(Color::White, PieceType::Dragon), Piece::W_DRAGON);
        assert_eq!(Piece::W_DRAGON.piece_type(), PieceType::Dragon);
        assert_eq!(Piece::W_KING.color(), Color::White);
    }

    #[test]
    fn test_piece_opponent() {
        assert_eq!(Piece::B_PAWN.opponent_piece(), Piece::W_PAWN);
        assert_eq!(Piece::W_HORSE.opponent_piece(), Piece::B_HORSE);
        assert_eq!(Piece::NONE.opponent_piece(), Piece::NONE);
    }

    #[test]
    fn test_piece_hand_type() {
        assert_eq!(Piece::W_HORSE.hand_type(), PieceType::Bishop);
        assert_eq!(Piece::B_PRO_PAWN.hand_type(), PieceType::Pawn);
        assert_eq!(Piece::B_GOLD.hand_type(), PieceType::Gold);
    }

    #[test]
    fn test_piece_all_and_raw() {
        assert_eq!(Piece::all().count(), 28);
        for p in Piece::all() {
            assert_eq!(Piece::from_raw(p.raw()), Some(p));
            assert!(p.index() < Piece::NUM);
        }
        assert_eq!(Piece::from_raw(15), None);
        assert_eq!(Piece::from_raw(40), None);
    }

    #[test]
    fn test_piece_sfen() {
        assert_eq!(Piece::B_PAWN.to_sfen(), "P");
        assert_eq!(Piece::W_DRAGON.to_sfen(), "+r");
    }
}
