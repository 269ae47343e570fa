//! 評価値の内訳と最終スコアの合成
//!
//! 各項は `PackedScore`（序盤・中盤・終盤・手番、または 2x2 形式）の和として保持し、
//! 差分計算では項ごとに足し引きする。最終スコアへの変換は進行度で
//! 線形補間した固定小数点の整数演算で行う。

use std::ops::{Add, AddAssign, Sub, SubAssign};

use super::packed::PackedScore;
use super::secondary::SecondaryDetail;
use crate::types::Color;

/// 進行度の固定小数点スケール（1.0 に相当）
pub const PROGRESS_SCALE: i64 = 1 << 16;

/// 評価パラメータの固定小数点スケール（1 センチポーンに相当）
pub const FV_SCALE: i64 = 1 << 16;

/// 評価値の内訳（先手視点）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvalDetail {
    /// 玉-駒（[先手玉, 後手玉]、後手玉の分は先手視点へ変換済み）
    pub kp: [PackedScore; 2],
    /// 升ごとの利き
    pub controls: PackedScore,
    /// 駒-駒
    pub two_pieces: PackedScore,
    /// 玉の安全度
    pub king_safety: PackedScore,
    /// 飛び駒
    pub sliders: PackedScore,
    /// 副評価関数
    pub secondary: SecondaryDetail,
}

impl EvalDetail {
    /// 玉-駒の合計
    #[inline]
    pub fn kp_total(&self) -> PackedScore {
        self.kp[0] + self.kp[1]
    }

    /// 進行度（0 〜 PROGRESS_SCALE）
    ///
    /// 玉-駒の第 4 成分をシグモイド関数に通したもの。
    pub fn progress(&self) -> i64 {
        let x = self.kp_total()[3] as f64 / FV_SCALE as f64;
        let p = 1.0 / (1.0 + (-x).exp());
        (p * PROGRESS_SCALE as f64) as i64
    }

    /// 主評価関数の生の値（手番側から見た値、単位は 1 / (PROGRESS_SCALE * FV_SCALE) センチポーン）
    pub fn primary_sum(
        &self,
        side_to_move: Color,
        progress: i64,
        tempo: [i32; 3],
        rates: &TermRates,
    ) -> i64 {
        debug_assert!((0..=PROGRESS_SCALE).contains(&progress));

        let weights = phase_weights(progress);
        let kp = self.kp_total();
        let kp_sum: i64 = (0..3).map(|i| weights[i] * kp[i] as i64).sum();
        let tempo_sum: i64 = (0..3).map(|i| weights[i] * tempo[i] as i64).sum();

        let sign = match side_to_move {
            Color::Black => 1,
            Color::White => -1,
        };
        let others = |s: PackedScore| -> i64 {
            let (o0, o1, o2, o3) = (s[0] as i64, s[1] as i64, s[2] as i64, s[3] as i64);
            (PROGRESS_SCALE - progress) * (o0 + sign * o1 / 10) + progress * (o2 + sign * o3 / 10)
        };

        let mut sum = if rates.is_neutral() {
            kp_sum + others(self.controls + self.two_pieces + self.king_safety + self.sliders)
        } else {
            let terms = [
                (kp_sum, rates.kp),
                (others(self.two_pieces), rates.two_pieces),
                (others(self.controls), rates.controls),
                (others(self.king_safety), rates.king_safety),
                (others(self.sliders), rates.sliders),
            ];
            let weighted: i128 = terms
                .iter()
                .map(|&(v, rate)| v as i128 * rate.at(progress) as i128)
                .sum();
            (weighted / (100 * PROGRESS_SCALE) as i128) as i64
        };
        sum += sign * (tempo_sum / 2);
        sign * sum
    }
}

/// 項ごとの重み（序盤・終盤のパーセント、進行度で線形補間）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseRate {
    pub opening: u32,
    pub end: u32,
}

impl PhaseRate {
    pub const FULL: PhaseRate = PhaseRate { opening: 100, end: 100 };

    /// 進行度における重み（単位は パーセント * PROGRESS_SCALE）
    #[inline]
    pub fn at(&self, progress: i64) -> i64 {
        self.opening as i64 * (PROGRESS_SCALE - progress) + self.end as i64 * progress
    }
}

/// 主評価関数の項ごとの重み
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermRates {
    pub kp: PhaseRate,
    pub two_pieces: PhaseRate,
    pub controls: PhaseRate,
    pub king_safety: PhaseRate,
    pub sliders: PhaseRate,
}

impl TermRates {
    /// 全て 100%
    pub const NEUTRAL: TermRates = TermRates {
        kp: PhaseRate::FULL,
        two_pieces: PhaseRate::FULL,
        controls: PhaseRate::FULL,
        king_safety: PhaseRate::FULL,
        sliders: PhaseRate::FULL,
    };

    #[inline]
    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

impl Default for TermRates {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// 序盤・中盤・終盤の重み（和は PROGRESS_SCALE）
///
/// 進行度 0.5 を境に、前半は序盤と中盤、後半は中盤と終盤を線形補間する。
#[inline]
pub fn phase_weights(progress: i64) -> [i64; 3] {
    if progress < PROGRESS_SCALE / 2 {
        [PROGRESS_SCALE - 2 * progress, 2 * progress, 0]
    } else {
        [0, 2 * PROGRESS_SCALE - 2 * progress, 2 * progress - PROGRESS_SCALE]
    }
}

/// 副評価関数の混合率（パーセント）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendRates {
    pub opening: u32,
    pub middle: u32,
    pub end: u32,
}

impl BlendRates {
    /// 主評価関数のみ
    pub const PRIMARY_ONLY: BlendRates = BlendRates {
        opening: 0,
        middle: 0,
        end: 0,
    };

    /// 進行度における (主評価, 副評価) の比率
    ///
    /// 2 つの和は常に `100 * PROGRESS_SCALE`。
    pub fn at(&self, progress: i64) -> (i64, i64) {
        let [wo, wm, we] = phase_weights(progress);
        let secondary = wo * self.opening as i64 + wm * self.middle as i64 + we * self.end as i64;
        (100 * PROGRESS_SCALE - secondary, secondary)
    }
}

impl Default for BlendRates {
    fn default() -> Self {
        Self::PRIMARY_ONLY
    }
}

impl Add for EvalDetail {
    type Output = EvalDetail;

    #[inline]
    fn add(self, rhs: EvalDetail) -> EvalDetail {
        EvalDetail {
            kp: [self.kp[0] + rhs.kp[0], self.kp[1] + rhs.kp[1]],
            controls: self.controls + rhs.controls,
            two_pieces: self.two_pieces + rhs.two_pieces,
            king_safety: self.king_safety + rhs.king_safety,
            sliders: self.sliders + rhs.sliders,
            secondary: self.secondary + rhs.secondary,
        }
    }
}

impl Sub for EvalDetail {
    type Output = EvalDetail;

    #[inline]
    fn sub(self, rhs: EvalDetail) -> EvalDetail {
        EvalDetail {
            kp: [self.kp[0] - rhs.kp[0], self.kp[1] - rhs.kp[1]],
            controls: self.controls - rhs.controls,
            two_pieces: self.two_pieces - rhs.two_pieces,
            king_safety: self.king_safety - rhs.king_safety,
            sliders: self.sliders - rhs.sliders,
            secondary: self.secondary - rhs.secondary,
        }
    }
}

impl AddAssign for EvalDetail {
    #[inline]
    fn add_assign(&mut self, rhs: EvalDetail) {
        *self = *self + rhs;
    }
}

impl SubAssign for EvalDetail {
    #[inline]
    fn sub_assign(&mut self, rhs: EvalDetail) {
        *self = *self - rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EvalDetail {
        EvalDetail {
            kp: [PackedScore::new(100, 200, 300, 0), PackedScore::new(-10, -20, -30, 0)],
            controls: PackedScore::new(40, 50, 60, 70),
            two_pieces: PackedScore::new(1, 2, 3, 4),
            king_safety: PackedScore::new(-5, 15, 25, -35),
            sliders: PackedScore::new(7, -8, 9, -10),
            secondary: SecondaryDetail::default(),
        }
    }

    #[test]
    fn test_phase_weights_sum() {
        let q = PROGRESS_SCALE / 4;
        for p in [0, 1, q, 2 * q - 1, 2 * q, PROGRESS_SCALE] {
            assert_eq!(phase_weights(p).iter().sum::<i64>(), PROGRESS_SCALE);
        }
    }

    #[test]
    fn test_opening_boundary() {
        let d = sample();
        let tempo = [6, 8, 10];
        let kp = d.kp_total();
        let others = d.controls + d.two_pieces + d.king_safety + d.sliders;
        let expected = PROGRESS_SCALE * (kp[0] as i64 + others[0] as i64 + others[1] as i64 / 10)
            + PROGRESS_SCALE * tempo[0] as i64 / 2;
        assert_eq!(d.primary_sum(Color::Black, 0, tempo, &TermRates::NEUTRAL), expected);
    }

    #[test]
    fn test_endgame_boundary() {
        let d = sample();
        let tempo = [6, 8, 10];
        let kp = d.kp_total();
        let others = d.controls + d.two_pieces + d.king_safety + d.sliders;
        let expected = PROGRESS_SCALE * (kp[2] as i64 + others[2] as i64 - others[3] as i64 / 10)
            - PROGRESS_SCALE * tempo[2] as i64 / 2;
        let score = d.primary_sum(Color::White, PROGRESS_SCALE, tempo, &TermRates::NEUTRAL);
        assert_eq!(score, -expected);
    }

    #[test]
    fn test_midpoint_continuity() {
        // 前半の式を 0.5 で評価した値と後半の式の値が一致する
        let half = PROGRESS_SCALE / 2;
        let first_half = [PROGRESS_SCALE - 2 * half, 2 * half, 0];
        assert_eq!(phase_weights(half), first_half);
        assert_eq!(phase_weights(half), [0, PROGRESS_SCALE, 0]);
    }

    #[test]
    fn test_term_rates() {
        let d = sample();
        let tempo = [0; 3];
        let p = PROGRESS_SCALE / 3;

        // 100% を明示しても結果は変わらない
        let explicit = TermRates {
            kp: PhaseRate { opening: 100, end: 100 },
            ..TermRates::NEUTRAL
        };
        assert_eq!(
            d.primary_sum(Color::Black, p, tempo, &explicit),
            d.primary_sum(Color::Black, p, tempo, &TermRates::NEUTRAL)
        );

        // KP 以外を 0% にすると KP だけが残る
        let zero = PhaseRate { opening: 0, end: 0 };
        let kp_only = TermRates {
            kp: PhaseRate { opening: 100, end: 99 },
            two_pieces: zero,
            controls: zero,
            king_safety: zero,
            sliders: zero,
        };
        let kp_alone = EvalDetail {
            kp: d.kp,
            ..Default::default()
        };
        let full_weight = kp_alone.primary_sum(Color::Black, 0, tempo, &TermRates::NEUTRAL);
        assert_eq!(d.primary_sum(Color::Black, 0, tempo, &kp_only), full_weight);
    }

    #[test]
    fn test_progress_of_zero_is_half() {
        assert_eq!(EvalDetail::default().progress(), PROGRESS_SCALE / 2);
    }

    #[test]
    fn test_blend_rates_sum() {
        let rates = BlendRates {
            opening: 10,
            middle: 30,
            end: 70,
        };
        for p in [0, PROGRESS_SCALE / 3, PROGRESS_SCALE / 2, PROGRESS_SCALE] {
            let (a, b) = rates.at(p);
            assert_eq!(a + b, 100 * PROGRESS_SCALE);
        }
        assert_eq!(rates.at(0).1, 10 * PROGRESS_SCALE);
        assert_eq!(rates.at(PROGRESS_SCALE / 2).1, 30 * PROGRESS_SCALE);
        assert_eq!(rates.at(PROGRESS_SCALE).1, 70 * PROGRESS_SCALE);
    }

    #[test]
    fn test_add_sub() {
        let a = sample();
        let mut b = EvalDetail::default();
        b += a;
        b += a;
        b -= a;
        assert_eq!(b, a);
    }
}
