//! 段（Rank）

use super::Color;

/// 段（一段〜九段）
///
/// 先手から見て上端（後手陣の奥）が一段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Rank {
    Rank1 = 0,
    Rank2 = 1,
    Rank3 = 2,
    Rank4 = 3,
    Rank5 = 4,
    Rank6 = 5,
    Rank7 = 6,
    Rank8 = 7,
    Rank9 = 8,
}

impl Rank {
    /// 段の数
    pub const NUM: usize = 9;

    /// 全ての段
    pub const ALL: [Rank; 9] = [
        Rank::Rank1,
        Rank::Rank2,
        Rank::Rank3,
        Rank::Rank4,
        Rank::Rank5,
        Rank::Rank6,
        Rank::Rank7,
        Rank::Rank8,
        Rank::Rank9,
    ];

    /// 成れる段かどうか（敵陣三段）
    #[inline]
    pub const fn can_promote(self, color: Color) -> bool {
        (self.relative(color) as u8) <= Rank::Rank3 as u8
    }

    /// 手番から見た段（後手なら上下反転）
    #[inline]
    pub const fn relative(self, color: Color) -> Rank {
        match color {
            Color::Black => self,
            Color::White => Rank::ALL[8 - self as usize],
        }
    }

    /// u8から生成
    #[inline]
    pub const fn from_u8(n: u8) -> Option<Rank> {
        if n < 9 { Some(Rank::ALL[n as usize]) } else { None }
    }

    /// インデックスとして使用
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// USI形式の文字（'a'〜'i'）
    #[inline]
    pub const fn to_usi_char(self) -> char {
        (b'a' + self as u8) as char
    }

    /// USI形式の文字から変換
    #[inline]
    pub const fn from_usi_char(c: char) -> Option<Rank> {
        match c {
            'a'..='i' => Rank::from_u8(c as u8 - b'a'),
            _ => None,
        }
    }
}
