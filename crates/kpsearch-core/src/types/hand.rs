//! 手駒（Hand）

use super::PieceType;

/// 手駒（32bit packed）
///
/// ビット配置:
/// - bit 0-4:   歩 (5bit, 最大18枚)
/// - bit 5-7:   香 (3bit, 最大4枚)
/// - bit 8-10:  桂 (3bit, 最大4枚)
/// - bit 11-13: 銀 (3bit, 最大4枚)
/// - bit 14-16: 金 (3bit, 最大4枚)
/// - bit 17-18: 角 (2bit, 最大2枚)
/// - bit 19-20: 飛 (2bit, 最大2枚)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Hand(u32);

impl Hand {
    /// 空の手駒
    pub const EMPTY: Hand = Hand(0);

    /// (shift, mask) を駒種ごとに返す
    #[inline]
    const fn shift_mask(pt: PieceType) -> (u32, u32) {
        match pt {
            PieceType::Pawn => (0, 0x1F),
            PieceType::Lance => (5, 0x07),
            PieceType::Knight => (8, 0x07),
            PieceType::Silver => (11, 0x07),
            PieceType::Gold => (14, 0x07),
            PieceType::Bishop => (17, 0x03),
            PieceType::Rook => (19, 0x03),
            _ => (0, 0),
        }
    }

    /// 指定駒種の枚数を取得
    #[inline]
    pub const fn count(self, pt: PieceType) -> u32 {
        let (shift, mask) = Self::shift_mask(pt);
        (self.0 >> shift) & mask
    }

    /// 指定駒種を持っているか
    #[inline]
    pub const fn has(self, pt: PieceType) -> bool {
        self.count(pt) > 0
    }

    /// 1枚追加
    #[inline]
    pub const fn add(self, pt: PieceType) -> Hand {
        debug_assert!(self.count(pt) < pt.max_hand_count());
        let (shift, _) = Self::shift_mask(pt);
        Hand(self.0 + (1 << shift))
    }

    /// 1枚減らす
    #[inline]
    pub const fn sub(self, pt: PieceType) -> Hand {
        debug_assert!(self.count(pt) > 0);
        let (shift, _) = Self::shift_mask(pt);
        Hand(self.0 - (1 << shift))
    }

    /// 枚数を設定
    #[inline]
    pub const fn set(self, pt: PieceType, count: u32) -> Hand {
        let (shift, mask) = Self::shift_mask(pt);
        Hand((self.0 & !(mask << shift)) | ((count & mask) << shift))
    }

    /// 何も持っていないか
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// 持っている駒種の集合（bit 1..=7 が HAND_PIECES の順、bit 0 は未使用）
    #[inline]
    pub const fn hand_set(self) -> u8 {
        let mut set = 0u8;
        let mut i = 0;
        while i < PieceType::HAND_NUM {
            if self.has(PieceType::HAND_PIECES[i]) {
                set |= 1 << (i + 1);
            }
            i += 1;
        }
        set
    }

    /// 内部値を取得
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_add_sub() {
        let h = Hand::EMPTY.add(PieceType::Pawn).add(PieceType::Pawn).add(PieceType::Rook);
        assert_eq!(h.count(PieceType::Pawn), 2);
        assert_eq!(h.count(PieceType::Rook), 1);
        assert_eq!(h.sub(PieceType::Rook).count(PieceType::Rook), 0);
        assert_eq!(Hand::EMPTY.set(PieceType::Pawn, 18).count(PieceType::Pawn), 18);
    }

    #[test]
    fn test_hand_set_bits() {
        let h = Hand::EMPTY.add(PieceType::Pawn).add(PieceType::Rook);
        assert_eq!(h.hand_set(), 0b1000_0010);
        assert_eq!(Hand::EMPTY.hand_set(), 0);
    }
}
