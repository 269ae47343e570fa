//! 4要素の固定小数点スコア
//!
//! 要素の意味は評価項目によって異なる。
//!
//! - KP: `[0]` 序盤, `[1]` 中盤, `[2]` 終盤, `[3]` 進行度計算用の重み
//! - KP 以外: `[0]` 序盤, `[1]` 手番（序盤）, `[2]` 終盤, `[3]` 手番（終盤）
//!
//! 加減算と符号反転は 2^32 を法とする（wrapping）。読み込んだパラメータの値域は
//! 制限しないので、途中で桁あふれしても差分更新と全計算は同じ値に揃う。

use std::ops::{Add, AddAssign, Index, Neg, Sub, SubAssign};

/// 4要素をまとめて加減算するスコア
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[repr(transparent)]
pub struct PackedScore(pub [i32; 4]);

impl PackedScore {
    pub const ZERO: PackedScore = PackedScore([0; 4]);

    #[inline]
    pub const fn new(a: i32, b: i32, c: i32, d: i32) -> Self {
        PackedScore([a, b, c, d])
    }

    /// `[0..3]` の符号を反転し、`[3]` はそのまま
    ///
    /// 後手玉から見た KP を先手視点に揃えるときに使う。
    /// 進行度の重みは先後で共通なので反転しない。
    #[inline]
    pub const fn flip3x1(self) -> Self {
        let [a, b, c, d] = self.0;
        PackedScore([a.wrapping_neg(), b.wrapping_neg(), c.wrapping_neg(), d])
    }

    /// `[0]` と `[2]` の符号を反転し、手番成分 `[1]` `[3]` はそのまま
    #[inline]
    pub const fn flip2x2(self) -> Self {
        let [a, b, c, d] = self.0;
        PackedScore([a.wrapping_neg(), b, c.wrapping_neg(), d])
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }
}

impl From<[i32; 4]> for PackedScore {
    #[inline]
    fn from(v: [i32; 4]) -> Self {
        PackedScore(v)
    }
}

impl Index<usize> for PackedScore {
    type Output = i32;

    #[inline]
    fn index(&self, i: usize) -> &i32 {
        &self.0[i]
    }
}

impl Add for PackedScore {
    type Output = PackedScore;

    #[inline]
    fn add(self, rhs: PackedScore) -> PackedScore {
        let mut out = self;
        out += rhs;
        out
    }
}

impl Sub for PackedScore {
    type Output = PackedScore;

    #[inline]
    fn sub(self, rhs: PackedScore) -> PackedScore {
        let mut out = self;
        out -= rhs;
        out
    }
}

impl AddAssign for PackedScore {
    #[inline]
    fn add_assign(&mut self, rhs: PackedScore) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a = a.wrapping_add(b);
        }
    }
}

impl SubAssign for PackedScore {
    #[inline]
    fn sub_assign(&mut self, rhs: PackedScore) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a = a.wrapping_sub(b);
        }
    }
}

impl Neg for PackedScore {
    type Output = PackedScore;

    #[inline]
    fn neg(self) -> PackedScore {
        PackedScore(self.0.map(i32::wrapping_neg))
    }
}

impl std::iter::Sum for PackedScore {
    fn sum<I: Iterator<Item = PackedScore>>(iter: I) -> Self {
        iter.fold(PackedScore::ZERO, |acc, x| acc + x)
    }
}
