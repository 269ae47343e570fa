//! 評価値の境界（Bound）

use super::Value;

/// 置換表に保存する評価値の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Bound {
    /// 境界なし
    #[default]
    None = 0,
    /// 上界（fail low）
    Upper = 1,
    /// 下界（fail high）
    Lower = 2,
    /// 正確な値
    Exact = 3,
}

impl Bound {
    /// 下界を含むか
    #[inline]
    pub const fn is_lower_or_exact(self) -> bool {
        (self as u8) & (Bound::Lower as u8) != 0
    }

    /// 上界を含むか
    #[inline]
    pub const fn is_upper_or_exact(self) -> bool {
        (self as u8) & (Bound::Upper as u8) != 0
    }

    /// この境界で beta カットできるか（value >= beta なら下界、それ以外は上界が必要）
    #[inline]
    pub const fn can_cutoff(self, value: Value, beta: Value) -> bool {
        if value.raw() >= beta.raw() {
            self.is_lower_or_exact()
        } else {
            self.is_upper_or_exact()
        }
    }

    /// u8から変換
    #[inline]
    pub const fn from_u8(n: u8) -> Bound {
        match n & 3 {
            1 => Bound::Upper,
            2 => Bound::Lower,
            3 => Bound::Exact,
            _ => Bound::None,
        }
    }
}
