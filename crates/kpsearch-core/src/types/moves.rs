//! 指し手（Move）

use super::{Color, Piece, PieceType, Square};

/// 指し手（32bit）
///
/// - bit 0-6:   移動先 (to)
/// - bit 7-13:  移動元 (from) / 駒打ちの場合は手駒の添字
/// - bit 14:    駒打ちフラグ
/// - bit 15:    成りフラグ
/// - bit 16-20: 動かす駒（移動前）
/// - bit 21-25: 取った駒
///
/// 駒情報を持つため、局面なしで差分評価・履歴更新に必要な情報が揃う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Move(u32);

impl Move {
    /// 無効な指し手
    pub const NONE: Move = Move(0);
    /// 探索用 null move（from == to となる不可能な組み合わせ）
    pub const NULL: Move = Move(0x0081);

    const TO_MASK: u32 = 0x007F;
    const FROM_SHIFT: u32 = 7;
    const FROM_MASK: u32 = 0x7F;
    const DROP_FLAG: u32 = 1 << 14;
    const PROMOTE_FLAG: u32 = 1 << 15;
    const PIECE_SHIFT: u32 = 16;
    const CAPTURED_SHIFT: u32 = 21;
    const PIECE_MASK: u32 = 0x1F;

    /// 盤上の駒を動かす指し手
    #[inline]
    pub const fn new_move(
        from: Square,
        to: Square,
        promote: bool,
        piece: Piece,
        captured: Piece,
    ) -> Move {
        let mut m = (to.raw() as u32)
            | ((from.raw() as u32) << Self::FROM_SHIFT)
            | ((piece.raw() as u32) << Self::PIECE_SHIFT)
            | ((captured.raw() as u32) << Self::CAPTURED_SHIFT);
        if promote {
            m |= Self::PROMOTE_FLAG;
        }
        Move(m)
    }

    /// 駒打ちの指し手
    #[inline]
    pub const fn new_drop(color: Color, piece_type: PieceType, to: Square) -> Move {
        let piece = Piece::new(color, piece_type);
        Move(
            (to.raw() as u32)
                | (((Square::NUM + piece_type.hand_index()) as u32) << Self::FROM_SHIFT)
                | Self::DROP_FLAG
                | ((piece.raw() as u32) << Self::PIECE_SHIFT),
        )
    }

    /// 移動先
    #[inline]
    pub const fn to(self) -> Square {
        match Square::from_u8((self.0 & Self::TO_MASK) as u8) {
            Some(sq) => sq,
            None => Square::SQ_11,
        }
    }

    /// 移動元（駒打ちでは無意味）
    #[inline]
    pub const fn from(self) -> Square {
        debug_assert!(!self.is_drop(), "from() called on a drop move");
        match Square::from_u8(((self.0 >> Self::FROM_SHIFT) & Self::FROM_MASK) as u8) {
            Some(sq) => sq,
            None => Square::SQ_11,
        }
    }

    /// 動かす駒（移動前）
    #[inline]
    pub const fn piece(self) -> Piece {
        match Piece::from_raw(((self.0 >> Self::PIECE_SHIFT) & Self::PIECE_MASK) as u8) {
            Some(p) => p,
            None => Piece::NONE,
        }
    }

    /// 移動後の駒（成りの場合は成った後の駒）
    #[inline]
    pub const fn piece_after_move(self) -> Piece {
        let p = self.piece();
        if self.is_promotion() {
            match p.promote() {
                Some(pp) => pp,
                None => p,
            }
        } else {
            p
        }
    }

    /// 動かす駒の駒種
    #[inline]
    pub const fn piece_type(self) -> PieceType {
        self.piece().piece_type()
    }

    /// 取った駒（取らない手なら NONE）
    #[inline]
    pub const fn captured_piece(self) -> Piece {
        match Piece::from_raw(((self.0 >> Self::CAPTURED_SHIFT) & Self::PIECE_MASK) as u8) {
            Some(p) => p,
            None => Piece::NONE,
        }
    }

    /// 打つ駒の駒種
    #[inline]
    pub const fn drop_piece_type(self) -> PieceType {
        debug_assert!(self.is_drop());
        self.piece().piece_type()
    }

    /// 駒打ちか
    #[inline]
    pub const fn is_drop(self) -> bool {
        self.0 & Self::DROP_FLAG != 0
    }

    /// 成る手か
    #[inline]
    pub const fn is_promotion(self) -> bool {
        self.0 & Self::PROMOTE_FLAG != 0
    }

    /// 駒を取る手か
    #[inline]
    pub const fn is_capture(self) -> bool {
        (self.0 >> Self::CAPTURED_SHIFT) & Self::PIECE_MASK != 0
    }

    /// 駒取りまたは成り
    #[inline]
    pub const fn is_capture_or_promotion(self) -> bool {
        self.is_capture() || self.is_promotion()
    }

    /// 駒を取らない手か
    #[inline]
    pub const fn is_quiet(self) -> bool {
        !self.is_capture()
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == Self::NULL.0
    }

    /// 実際に盤面を変化させる手か（NONE/NULL 以外）
    #[inline]
    pub const fn is_real_move(self) -> bool {
        self.0 != Self::NONE.0 && self.0 != Self::NULL.0
    }

    /// ButterflyHistory 用の from_to インデックス
    #[inline]
    pub const fn history_index(self) -> usize {
        let from = ((self.0 >> Self::FROM_SHIFT) & Self::FROM_MASK) as usize;
        from * Square::NUM + (self.0 & Self::TO_MASK) as usize
    }

    /// 内部値
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// 内部値から復元（置換表からの読み出し用。正当性は呼び出し側で検証する）
    #[inline]
    pub const fn from_raw(raw: u32) -> Move {
        Move(raw)
    }

    /// USI形式の文字列
    pub fn to_usi(self) -> String {
        if self.is_none() {
            return "none".to_string();
        }
        if self.is_null() {
            return "null".to_string();
        }
        if self.is_drop() {
            format!("{}*{}", self.drop_piece_type().sfen_char(), self.to().to_usi())
        } else {
            let promote = if self.is_promotion() { "+" } else { "" };
            format!("{}{}{}", self.from().to_usi(), self.to().to_usi(), promote)
        }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_usi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{File, Rank};

    #[test]
    fn test_move_fields() {
        let from = Square::new(File::File2, Rank::Rank8);
        let to = Square::new(File::File2, Rank::Rank2);
        let m = Move::new_move(from, to, true, Piece::B_ROOK, Piece::W_SILVER);
        assert_eq!(m.from(), from);
        assert_eq!(m.to(), to);
        assert!(m.is_promotion());
        assert!(m.is_capture());
        assert!(!m.is_drop());
        assert_eq!(m.piece(), Piece::B_ROOK);
        assert_eq!(m.piece_after_move(), Piece::B_DRAGON);
        assert_eq!(m.captured_piece(), Piece::W_SILVER);
        assert_eq!(m.to_usi(), "2h2b+");
    }

    #[test]
    fn test_drop_move() {
        let to = Square::new(File::File5, Rank::Rank5);
        let m = Move::new_drop(Color::White, PieceType::Bishop, to);
        assert!(m.is_drop());
        assert!(!m.is_capture());
        assert_eq!(m.piece(), Piece::W_BISHOP);
        assert_eq!(m.to_usi(), "B*5e");
        assert!(m.history_index() < (Square::NUM + 7) * Square::NUM);
    }

    #[test]
    fn test_special_moves() {
        assert!(!Move::NONE.is_real_move());
        assert!(!Move::NULL.is_real_move());
        assert!(Move::NULL.is_null());
    }
}
