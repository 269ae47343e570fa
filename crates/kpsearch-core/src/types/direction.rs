//! 方向（Direction）
//!
//! 先手から見た8方向。東は1筋側、北は一段側。

/// 8近傍の方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    NE = 0,
    E = 1,
    SE = 2,
    N = 3,
    S = 4,
    NW = 5,
    W = 6,
    SW = 7,
}

impl Direction {
    /// 方向の数
    pub const NUM: usize = 8;

    /// 全方向
    pub const ALL: [Direction; 8] = [
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::N,
        Direction::S,
        Direction::NW,
        Direction::W,
        Direction::SW,
    ];

    /// インデックスとして使用
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// (筋の差分, 段の差分)
    #[inline]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::NE => (-1, -1),
            Direction::E => (-1, 0),
            Direction::SE => (-1, 1),
            Direction::N => (0, -1),
            Direction::S => (0, 1),
            Direction::NW => (1, -1),
            Direction::W => (1, 0),
            Direction::SW => (1, 1),
        }
    }

    /// 180度反転した方向
    #[inline]
    pub const fn inverse(self) -> Direction {
        Direction::ALL[7 - self as usize]
    }

    /// 左右反転した方向
    #[inline]
    pub const fn mirror(self) -> Direction {
        match self {
            Direction::NE => Direction::NW,
            Direction::E => Direction::W,
            Direction::SE => Direction::SW,
            Direction::N => Direction::N,
            Direction::S => Direction::S,
            Direction::NW => Direction::NE,
            Direction::W => Direction::E,
            Direction::SW => Direction::SE,
        }
    }

    /// 斜め方向か
    #[inline]
    pub const fn is_diagonal(self) -> bool {
        matches!(self, Direction::NE | Direction::SE | Direction::NW | Direction::SW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_inverse() {
        for d in Direction::ALL {
            let (df, dr) = d.delta();
            assert_eq!(d.inverse().delta(), (-df, -dr));
            let (mf, mr) = d.mirror().delta();
            assert_eq!((mf, mr), (-df, dr));
        }
    }
}
