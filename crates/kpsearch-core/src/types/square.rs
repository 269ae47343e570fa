//! 升目（Square）

use super::{Color, Direction, File, Rank};

/// 升目（0-80）
///
/// SQ_11(1一)=0, SQ_12(1二)=1, ..., SQ_19(1九)=8, SQ_21(2一)=9, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Square(u8);

impl Square {
    /// 升目の数
    pub const NUM: usize = 81;

    /// 1一
    pub const SQ_11: Square = Square(0);
    /// 1九
    pub const SQ_19: Square = Square(8);
    /// 5一（後手玉の初期位置）
    pub const SQ_51: Square = Square(36);
    /// 5五（中央）
    pub const SQ_55: Square = Square(40);
    /// 5九（先手玉の初期位置）
    pub const SQ_59: Square = Square(44);
    /// 9九
    pub const SQ_99: Square = Square(80);

    /// FileとRankからSquareを生成
    #[inline]
    pub const fn new(file: File, rank: Rank) -> Square {
        Square(file as u8 * 9 + rank as u8)
    }

    /// 筋を取得
    #[inline]
    pub const fn file(self) -> File {
        File::ALL[(self.0 / 9) as usize]
    }

    /// 段を取得
    #[inline]
    pub const fn rank(self) -> Rank {
        Rank::ALL[(self.0 % 9) as usize]
    }

    /// インデックスとして使用
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// 内部値を取得
    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// u8から生成（範囲チェックあり）
    #[inline]
    pub const fn from_u8(n: u8) -> Option<Square> {
        if n < 81 { Some(Square(n)) } else { None }
    }

    /// 180度回転
    #[inline]
    pub const fn inverse(self) -> Square {
        Square(80 - self.0)
    }

    /// 左右反転（5筋軸）
    #[inline]
    pub const fn mirror(self) -> Square {
        let file = 8 - self.0 / 9;
        let rank = self.0 % 9;
        Square(file * 9 + rank)
    }

    /// 手番側から見た升目（後手なら180度回転）
    #[inline]
    pub const fn relative(self, color: Color) -> Square {
        match color {
            Color::Black => self,
            Color::White => self.inverse(),
        }
    }

    /// 筋・段の差分だけ移動した升目（盤外なら None）
    #[inline]
    pub const fn offset(self, df: i32, dr: i32) -> Option<Square> {
        let f = (self.0 / 9) as i32 + df;
        let r = (self.0 % 9) as i32 + dr;
        if f < 0 || f >= 9 || r < 0 || r >= 9 {
            None
        } else {
            Some(Square((f * 9 + r) as u8))
        }
    }

    /// 指定方向に1マス進んだ升目
    #[inline]
    pub const fn step(self, dir: Direction) -> Option<Square> {
        let (df, dr) = dir.delta();
        self.offset(df, dr)
    }

    /// USI形式の文字列（"7g"等）に変換
    pub fn to_usi(self) -> String {
        let file = self.file().to_usi_char();
        let rank = self.rank().to_usi_char();
        format!("{file}{rank}")
    }

    /// USI形式の文字列からSquareに変換
    pub fn from_usi(s: &str) -> Option<Square> {
        let mut chars = s.chars();
        let file = File::from_usi_char(chars.next()?)?;
        let rank = Rank::from_usi_char(chars.next()?)?;
        Some(Square::new(file, rank))
    }

    /// 全ての升を返すイテレータ
    pub fn all() -> impl Iterator<Item = Square> {
        (0..81).map(Square)
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_usi())
    }
}
