//! 評価関数本体
//!
//! 全計算（`evaluate_all`）と差分計算（`evaluate_difference`）の 2 つの経路を持つ。
//! 差分計算は 1 手ごとに呼ばれ、次の性質を満たす。
//!
//! ```text
//! evaluate_all(指した後) == evaluate_all(指す前) + evaluate_difference(指し手)
//! ```
//!
//! この等式は内訳の項ごとに成り立つ（`verify-eval` feature で毎回検証できる）。
//!
//! - 玉以外の移動: 動いた駒（取った手なら取られた駒も）の KP・PP を引いて足し直し、
//!   利きは値の変わった升だけ更新する
//! - 玉の移動: 動いた玉の KP と利きを全て計算し直す
//! - 玉の安全度と飛び駒は常に全計算する

use std::sync::Arc;

use super::control::{squares_of, PsqControlList};
use super::detail::{BlendRates, EvalDetail, TermRates, FV_SCALE, PROGRESS_SCALE};
use super::king_safety::evaluate_king_safety;
use super::packed::PackedScore;
use super::params::EvalParameters;
use super::psq::PsqPair;
use super::psq_list::PsqList;
use super::secondary::SecondaryEvaluator;
use super::sliders::evaluate_sliders;
use crate::position::Position;
use crate::types::{Color, Square, Value};

/// 評価関数
///
/// パラメータは `Arc` で共有し、探索スレッドごとに `clone` して使う。
#[derive(Clone)]
pub struct Evaluator {
    params: Arc<EvalParameters>,
    secondary: Option<Arc<dyn SecondaryEvaluator>>,
    rates: BlendRates,
    term_rates: TermRates,
}

impl Evaluator {
    pub fn new(params: Arc<EvalParameters>) -> Self {
        Evaluator {
            params,
            secondary: None,
            rates: BlendRates::PRIMARY_ONLY,
            term_rates: TermRates::NEUTRAL,
        }
    }

    /// 主評価関数の項ごとの重みを設定する
    pub fn with_term_rates(mut self, term_rates: TermRates) -> Self {
        if !term_rates.is_neutral() {
            log::info!("evaluation term rates: {term_rates:?}");
        }
        self.term_rates = term_rates;
        self
    }

    /// 副評価関数と混合率を設定する
    pub fn with_secondary(
        mut self,
        secondary: Arc<dyn SecondaryEvaluator>,
        rates: BlendRates,
    ) -> Self {
        log::info!(
            "secondary evaluator '{}' enabled (opening {}%, middle {}%, end {}%)",
            secondary.name(),
            rates.opening,
            rates.middle,
            rates.end
        );
        self.secondary = Some(secondary);
        self.rates = rates;
        self
    }

    #[inline]
    pub fn params(&self) -> &EvalParameters {
        &self.params
    }

    #[inline]
    pub fn rates(&self) -> BlendRates {
        self.rates
    }

    #[inline]
    pub fn term_rates(&self) -> &TermRates {
        &self.term_rates
    }

    /// 局面を一から評価する（手番側から見た値）
    pub fn evaluate(&self, pos: &Position) -> Value {
        let list = PsqList::new(pos);
        let controls = PsqControlList::new(pos);
        let detail = self.evaluate_all(pos, &list, &controls);
        self.final_score(pos, &detail)
    }

    // =========================================================================
    // 全計算
    // =========================================================================

    /// 全ての項を計算する
    ///
    /// どちらかの玉がいない局面では全て 0 を返す。
    pub fn evaluate_all(
        &self,
        pos: &Position,
        list: &PsqList,
        controls: &PsqControlList,
    ) -> EvalDetail {
        let (Some(bk), Some(wk)) = (pos.king_square(Color::Black), pos.king_square(Color::White))
        else {
            return EvalDetail::default();
        };
        let p = &*self.params;

        let mut detail = EvalDetail {
            kp: [
                self.king_piece_sum(Color::Black, bk, list),
                self.king_piece_sum(Color::White, wk, list),
            ],
            controls: self.controls_sum(bk, wk, controls),
            king_safety: evaluate_king_safety(p, pos),
            sliders: evaluate_sliders(p, pos),
            ..Default::default()
        };

        let items = list.as_slice();
        for (i, a) in items.iter().enumerate() {
            for b in &items[..=i] {
                detail.two_pieces += p.two_pieces(a.black(), b.black());
            }
        }

        if let Some(secondary) = &self.secondary {
            detail.secondary = secondary.evaluate_all(pos, list);
        }
        detail
    }

    /// 玉 `c` から見た KP の和（後手玉の分は先手視点へ変換する）
    fn king_piece_sum(&self, c: Color, ksq: Square, list: &PsqList) -> PackedScore {
        let ksq = ksq.relative(c);
        let sum: PackedScore =
            list.iter().map(|pair| self.params.king_piece(ksq, pair.get(c))).sum();
        match c {
            Color::Black => sum,
            Color::White => sum.flip3x1(),
        }
    }

    fn controls_sum(&self, bk: Square, wk: Square, controls: &PsqControlList) -> PackedScore {
        let p = &*self.params;
        controls
            .iter()
            .map(|(_, idx)| {
                let i = idx.index();
                p.controls(Color::Black, bk, i) + p.controls(Color::White, wk, i)
            })
            .sum()
    }

    // =========================================================================
    // 差分計算
    // =========================================================================

    /// 指定した駒（1 個か 2 個）が関わる KP・PP の和
    ///
    /// 2 個のときは、2 駒の組が二重に数えられる分を引く。
    fn pieces_sum<I>(&self, bk: Square, wk: Square, pieces: &[PsqPair], list: I) -> EvalDetail
    where
        I: Iterator<Item = PsqPair> + Clone,
    {
        debug_assert!(pieces.len() <= 2);
        let p = &*self.params;
        let wk_inv = wk.inverse();
        let mut kp_black = PackedScore::ZERO;
        let mut kp_white = PackedScore::ZERO;
        let mut pp = PackedScore::ZERO;
        for &piece in pieces {
            kp_black += p.king_piece(bk, piece.black());
            kp_white += p.king_piece(wk_inv, piece.white());
            for other in list.clone() {
                pp += p.two_pieces(piece.black(), other.black());
            }
        }
        if let [p1, p2] = pieces {
            pp -= p.two_pieces(p1.black(), p2.black());
        }
        EvalDetail {
            kp: [kp_black, kp_white.flip3x1()],
            two_pieces: pp,
            ..Default::default()
        }
    }

    /// 直前の指し手による内訳の変化量を計算し、`list` を指し手に合わせて更新する
    ///
    /// `pos` は指し手を適用した後の局面、`previous` と `prev_controls` は適用前の値、
    /// `controls` は適用後の局面から作った利きインデックス。
    pub fn evaluate_difference(
        &self,
        pos: &Position,
        previous: &EvalDetail,
        prev_controls: &PsqControlList,
        controls: &PsqControlList,
        list: &mut PsqList,
    ) -> EvalDetail {
        let m = pos.last_move();
        debug_assert!(m.is_real_move(), "evaluate_difference() after {m:?}");

        let (Some(bk), Some(wk)) = (pos.king_square(Color::Black), pos.king_square(Color::White))
        else {
            list.make_move(m);
            return EvalDetail::default();
        };

        let changed = list.make_move(m);
        let p = &*self.params;

        let mut diff = EvalDetail::default();
        diff -= self.pieces_sum(bk, wk, changed.old_pairs(), changed.before(list));
        diff += self.pieces_sum(bk, wk, changed.new_pairs(), list.iter().copied());

        match changed.moved_king {
            Some(c) => {
                let ksq = if c == Color::Black { bk } else { wk };
                diff.kp[c.index()] = self.king_piece_sum(c, ksq, list) - previous.kp[c.index()];
                diff.controls = self.controls_sum(bk, wk, controls) - previous.controls;
            }
            None => {
                for sq in squares_of(PsqControlList::compute_difference(prev_controls, controls)) {
                    let old = prev_controls.get(sq).index();
                    let new = controls.get(sq).index();
                    diff.controls -=
                        p.controls(Color::Black, bk, old) + p.controls(Color::White, wk, old);
                    diff.controls +=
                        p.controls(Color::Black, bk, new) + p.controls(Color::White, wk, new);
                }
            }
        }

        diff.king_safety = evaluate_king_safety(p, pos) - previous.king_safety;
        diff.sliders = evaluate_sliders(p, pos) - previous.sliders;

        if let Some(secondary) = &self.secondary {
            diff.secondary =
                secondary.evaluate_difference(pos, &previous.secondary, list, &changed);
        }

        #[cfg(feature = "verify-eval")]
        {
            let full = self.evaluate_all(pos, &PsqList::new(pos), controls);
            assert_eq!(*previous + diff, full, "incremental eval diverged after {}", m.to_usi());
        }

        diff
    }

    // =========================================================================
    // 最終スコア
    // =========================================================================

    /// 内訳から手番側の評価値を求める
    pub fn final_score(&self, pos: &Position, detail: &EvalDetail) -> Value {
        self.final_score_at(pos, detail, detail.progress())
    }

    /// 進行度を指定して評価値を求める
    ///
    /// どちらかの玉がいない局面は 0。
    pub fn final_score_at(&self, pos: &Position, detail: &EvalDetail, progress: i64) -> Value {
        if !pos.has_both_kings() {
            return Value::ZERO;
        }
        let stm = pos.side_to_move();
        let primary =
            detail.primary_sum(stm, progress, self.params.tempo, &self.term_rates) as i128;
        let unit = (PROGRESS_SCALE * FV_SCALE) as i128;

        let score = match &self.secondary {
            None => primary / unit,
            Some(secondary) => {
                let (num, den) = secondary.centipawn_ratio();
                let (num, den) = (num as i128, den as i128);
                let raw = secondary.score(&detail.secondary, stm) as i128;
                let (rate_primary, rate_secondary) = self.rates.at(progress);
                let rate_scale = 100 * PROGRESS_SCALE as i128;
                (primary * rate_primary as i128 * den + raw * num * unit * rate_secondary as i128)
                    / (unit * den * rate_scale)
            }
        };

        let limit = (Value::MAX_EVAL.raw() - 1) as i128;
        Value::new(score.clamp(-limit, limit) as i32)
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("secondary", &self.secondary.as_ref().map(|s| s.name().to_string()))
            .field("rates", &self.rates)
            .field("term_rates", &self.term_rates)
            .finish_non_exhaustive()
    }
}
