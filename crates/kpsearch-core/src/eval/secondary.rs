//! 副評価関数のインターフェース
//!
//! 主評価関数とは別のテーブル群で局面を評価し、進行度に応じた比率で
//! 主評価とブレンドする。副評価関数は差分計算に必要な値を
//! `SecondaryDetail` に保持し、主評価の `EvalDetail` と一緒に探索スタックに積まれる。

use std::ops::{Add, AddAssign, Sub, SubAssign};

use super::psq_list::{ChangedPsq, PsqList};
use crate::position::Position;
use crate::types::Color;

/// 副評価関数の内訳（先手視点の生の値）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecondaryDetail {
    /// 駒割り
    pub material: i32,
    /// 玉-玉
    pub kk: i32,
    /// 玉-玉-駒
    pub kkp: i32,
    /// 玉-駒-駒（[先手玉, 後手玉]）
    pub kpp: [i32; 2],
}

impl SecondaryDetail {
    /// 先手から見た合計
    #[inline]
    pub fn sum(&self) -> i64 {
        self.material as i64 + self.kk as i64 + self.kkp as i64 + self.kpp[0] as i64
            - self.kpp[1] as i64
    }
}

impl Add for SecondaryDetail {
    type Output = SecondaryDetail;

    #[inline]
    fn add(self, rhs: SecondaryDetail) -> SecondaryDetail {
        SecondaryDetail {
            material: self.material + rhs.material,
            kk: self.kk + rhs.kk,
            kkp: self.kkp + rhs.kkp,
            kpp: [self.kpp[0] + rhs.kpp[0], self.kpp[1] + rhs.kpp[1]],
        }
    }
}

impl Sub for SecondaryDetail {
    type Output = SecondaryDetail;

    #[inline]
    fn sub(self, rhs: SecondaryDetail) -> SecondaryDetail {
        SecondaryDetail {
            material: self.material - rhs.material,
            kk: self.kk - rhs.kk,
            kkp: self.kkp - rhs.kkp,
            kpp: [self.kpp[0] - rhs.kpp[0], self.kpp[1] - rhs.kpp[1]],
        }
    }
}

impl AddAssign for SecondaryDetail {
    #[inline]
    fn add_assign(&mut self, rhs: SecondaryDetail) {
        *self = *self + rhs;
    }
}

impl SubAssign for SecondaryDetail {
    #[inline]
    fn sub_assign(&mut self, rhs: SecondaryDetail) {
        *self = *self - rhs;
    }
}

/// 副評価関数
///
/// 実装はスレッド間で共有されるため、テーブルは読み取り専用でなければならない。
pub trait SecondaryEvaluator: Send + Sync {
    /// ログ表示用の名前
    fn name(&self) -> &str;

    /// 局面全体から内訳を計算する
    fn evaluate_all(&self, pos: &Position, list: &PsqList) -> SecondaryDetail;

    /// 直前の指し手による内訳の変化量を計算する
    ///
    /// `pos` は指し手を適用した後の局面、`after` は更新後の PsqList、
    /// `changed` は `PsqList::make_move` が返した変更記録（更新前のリストは
    /// `changed.before(after)` で辿れる）。
    fn evaluate_difference(
        &self,
        pos: &Position,
        previous: &SecondaryDetail,
        after: &PsqList,
        changed: &ChangedPsq,
    ) -> SecondaryDetail;

    /// 生の値をセンチポーンへ変換する比率 (分子, 分母)
    fn centipawn_ratio(&self) -> (i64, i64);

    /// 手番側から見た生の値
    #[inline]
    fn score(&self, detail: &SecondaryDetail, side_to_move: Color) -> i64 {
        match side_to_move {
            Color::Black => detail.sum(),
            Color::White => -detail.sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_arithmetic() {
        let a = SecondaryDetail {
            material: 10,
            kk: 1,
            kkp: 2,
            kpp: [3, 4],
        };
        let b = SecondaryDetail {
            material: 5,
            kk: -1,
            kkp: 0,
            kpp: [1, 1],
        };
        assert_eq!((a + b) - b, a);
        assert_eq!(a.sum(), 10 + 1 + 2 + 3 - 4);
    }
}
