//! MovePicker（指し手オーダリング）
//!
//! 探索中に指し手を段階的に生成し、カットオフを起こしやすい順に返す。
//!
//! ## Lazy Generation
//!
//! 捕獲手で枝刈りが起きれば静かな手は生成しない。LMP 等の条件が成立したら
//! `skip_quiets()` を呼ぶことで残りの静かな手の生成・返却を打ち切れる。
//!
//! ## History参照を保持しない設計
//!
//! 再帰呼び出し中に履歴表を更新するため、MovePicker は `HistoryTables` への参照を
//! フィールドとして持たない。`next_move()` の呼び出しごとに受け取る。
//!
//! ## Stage
//!
//! ### 通常探索（王手なし）
//! 1. MainTT - 置換表の指し手
//! 2. CaptureInit / GoodCapture - 捕獲手（SEE が負の手は後回し）
//! 3. KillerInit / Killer - キラー手2つとカウンター手
//! 4. QuietInit / GoodQuiet - 履歴スコアの高い静かな手
//! 5. Quiet - 残りの静かな手
//! 6. BadCapture - 後回しにした捕獲手
//!
//! ### 確率オーダリング（深い探索でのみ使う）
//! 1. ProbabilityTT - 置換表の指し手
//! 2. ProbabilityInit / Probability - 全ての手を推定確率の高い順に
//!
//! ### 王手回避
//! 1. EvasionTT
//! 2. EvasionInit / Evasion
//!
//! ### 静止探索
//! 1. QSearchTT - 置換表の指し手（捕獲手のみ）
//! 2. QCaptureInit / QCapture
//! 3. QCheckInit / QCheck - 駒を取らない王手（王手を読む深さのみ）
//!
//! 深い静止探索では直前の手の移動先への取り返し（RecaptureInit / Recapture）だけを返す。
//!
//! ### ProbCut
//! 1. ProbCutTT
//! 2. ProbCutInit / ProbCut - SEE が閾値を超える捕獲手

use super::history::{ContKey, HistoryTables, BUTTERFLY_MAX};
use crate::eval::material::{exchange_order, exchange_value, promotion_value};
use crate::movegen::{generate_with_type, ExtMove, ExtMoveBuffer, GenType};
use crate::position::Position;
use crate::types::{Color, Depth, Move, Square, DEPTH_QS_NO_CHECKS, DEPTH_QS_RECAPTURES};

/// 静かな手を「良い手」として先に返すスコアの下限
const GOOD_QUIET_THRESHOLD: i32 = BUTTERFLY_MAX / 2;

/// 王手回避の捕獲手・SEE が負の手に加えるオフセット
const EVASION_CAPTURE_BONUS: i32 = 25000;

/// 確率オーダリングの温度（履歴スコアの単位）
const PROBABILITY_TEMPERATURE: f64 = 512.0;

/// 確率を整数スコアに直すときの倍率
const PROBABILITY_SCALE: f64 = (1u64 << 30) as f64;

// =============================================================================
// Stage（指し手生成の段階）
// =============================================================================

/// 指し手生成の段階
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Stage {
    // 通常探索
    MainTT,
    CaptureInit,
    GoodCapture,
    KillerInit,
    Killer,
    QuietInit,
    GoodQuiet,
    Quiet,
    BadCapture,

    // 確率オーダリング
    ProbabilityTT,
    ProbabilityInit,
    Probability,

    // 王手回避
    EvasionTT,
    EvasionInit,
    Evasion,

    // 静止探索
    QSearchTT,
    QCaptureInit,
    QCapture,
    QCheckInit,
    QCheck,
    RecaptureInit,
    Recapture,

    // ProbCut
    ProbCutTT,
    ProbCutInit,
    ProbCut,

    /// 終端
    Stop,
}

impl Stage {
    /// 置換表の手を返した後の段階
    fn after_tt(self) -> Self {
        match self {
            Stage::MainTT => Stage::CaptureInit,
            Stage::ProbabilityTT => Stage::ProbabilityInit,
            Stage::EvasionTT => Stage::EvasionInit,
            Stage::QSearchTT => Stage::QCaptureInit,
            Stage::ProbCutTT => Stage::ProbCutInit,
            _ => unreachable!("after_tt() called on {self:?}"),
        }
    }
}

// =============================================================================
// MovePicker
// =============================================================================

/// 指し手オーダリング器
///
/// ```ignore
/// let mut mp = MovePicker::new(pos, tt_move, depth, killers, cont_keys, false);
/// loop {
///     let mv = mp.next_move(pos, &st.history);
///     if mv.is_none() { break; }
///     // ここで &HistoryTables は解放済みなので、再帰先で履歴を更新できる
///     let value = -search_node(...);
/// }
/// ```
pub struct MovePicker {
    stage: Stage,
    tt_move: Move,
    depth: Depth,
    side_to_move: Color,

    /// キラー手2つとカウンター手（この順で返す）
    killers: [Move; 3],
    /// Killer 段階で実際に返した手
    refutations: [Move; 3],
    refutation_count: usize,
    /// 1, 2, 4 手前の手に対応する ContinuationHistory のキー
    cont_keys: [ContKey; 3],

    recapture_square: Option<Square>,
    probcut_threshold: i32,
    skip_quiets: bool,

    moves: ExtMoveBuffer,
    bad_captures: Vec<Move>,
    cur: usize,
    end_cur: usize,
    /// 良い静かな手の末尾
    end_good_quiets: usize,
}

impl MovePicker {
    fn with_stage(pos: &Position, stage: Stage, tt_move: Move, depth: Depth) -> Self {
        Self {
            stage,
            tt_move,
            depth,
            side_to_move: pos.side_to_move(),
            killers: [Move::NONE; 3],
            refutations: [Move::NONE; 3],
            refutation_count: 0,
            cont_keys: [ContKey::SENTINEL; 3],
            recapture_square: None,
            probcut_threshold: 0,
            skip_quiets: false,
            moves: ExtMoveBuffer::new(),
            bad_captures: Vec::new(),
            cur: 0,
            end_cur: 0,
            end_good_quiets: 0,
        }
    }

    /// 通常探索用コンストラクタ
    ///
    /// 王手がかかっていれば回避手を、`use_probability` なら確率オーダリングを使う。
    /// `killers` はキラー手2つとカウンター手。
    pub fn new(
        pos: &Position,
        tt_move: Move,
        depth: Depth,
        killers: [Move; 3],
        cont_keys: [ContKey; 3],
        use_probability: bool,
    ) -> Self {
        debug_assert!(depth > 0);
        let has_tt = tt_move.is_some() && pos.pseudo_legal(tt_move);
        let stage = match (pos.in_check(), use_probability, has_tt) {
            (true, _, true) => Stage::EvasionTT,
            (true, _, false) => Stage::EvasionInit,
            (false, true, true) => Stage::ProbabilityTT,
            (false, true, false) => Stage::ProbabilityInit,
            (false, false, true) => Stage::MainTT,
            (false, false, false) => Stage::CaptureInit,
        };
        let mut mp = Self::with_stage(pos, stage, if has_tt { tt_move } else { Move::NONE }, depth);
        mp.killers = killers;
        mp.cont_keys = cont_keys;
        mp
    }

    /// 静止探索用コンストラクタ
    ///
    /// `recapture_square` は直前の手の移動先（深い静止探索で取り返しだけを読むときに使う）。
    pub fn new_qsearch(
        pos: &Position,
        tt_move: Move,
        depth: Depth,
        cont_keys: [ContKey; 3],
        recapture_square: Square,
    ) -> Self {
        debug_assert!(depth <= 0);
        let mut mp = if pos.in_check() {
            let has_tt = tt_move.is_some() && pos.pseudo_legal(tt_move);
            let stage = if has_tt { Stage::EvasionTT } else { Stage::EvasionInit };
            Self::with_stage(pos, stage, if has_tt { tt_move } else { Move::NONE }, depth)
        } else if depth > DEPTH_QS_RECAPTURES {
            // 静止探索では駒を取らない置換表の手は使わない
            let has_tt = tt_move.is_some() && tt_move.is_capture() && pos.pseudo_legal(tt_move);
            let stage = if has_tt { Stage::QSearchTT } else { Stage::QCaptureInit };
            Self::with_stage(pos, stage, if has_tt { tt_move } else { Move::NONE }, depth)
        } else {
            Self::with_stage(pos, Stage::RecaptureInit, Move::NONE, depth)
        };
        mp.cont_keys = cont_keys;
        mp.recapture_square = Some(recapture_square);
        mp
    }

    /// ProbCut専用コンストラクタ
    ///
    /// SEE が `threshold` を超える捕獲手だけを返す。
    pub fn new_probcut(pos: &Position, tt_move: Move, threshold: i32) -> Self {
        debug_assert!(!pos.in_check());
        let has_tt = tt_move.is_some()
            && tt_move.is_capture()
            && pos.pseudo_legal(tt_move)
            && pos.see(tt_move) > threshold;
        let stage = if has_tt { Stage::ProbCutTT } else { Stage::ProbCutInit };
        let mut mp = Self::with_stage(pos, stage, if has_tt { tt_move } else { Move::NONE }, 0);
        mp.probcut_threshold = threshold;
        mp
    }

    /// 静かな手の生成・返却を打ち切る（LMP条件成立時に呼び出す）
    pub fn skip_quiets(&mut self) {
        self.skip_quiets = true;
    }

    /// 現在のステージを取得
    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// 次の指し手を返す
    ///
    /// 指し手が尽きたら `Move::NONE` を返す。
    pub fn next_move(&mut self, pos: &Position, history: &HistoryTables) -> Move {
        loop {
            match self.stage {
                // ==============================
                // 置換表の手
                // ==============================
                Stage::MainTT
                | Stage::ProbabilityTT
                | Stage::EvasionTT
                | Stage::QSearchTT
                | Stage::ProbCutTT => {
                    self.stage = self.stage.after_tt();
                    return self.tt_move;
                }

                // ==============================
                // 捕獲手の生成
                // ==============================
                Stage::CaptureInit | Stage::QCaptureInit | Stage::ProbCutInit => {
                    self.generate(pos, GenType::Captures);
                    self.score_captures(history);
                    self.stage = match self.stage {
                        Stage::CaptureInit => Stage::GoodCapture,
                        Stage::QCaptureInit => Stage::QCapture,
                        _ => Stage::ProbCut,
                    };
                }

                Stage::GoodCapture => {
                    while let Some(ext) = self.pick_best() {
                        if ext.mv == self.tt_move {
                            continue;
                        }
                        if pos.see(ext.mv) < 0 {
                            self.bad_captures.push(ext.mv);
                            continue;
                        }
                        return ext.mv;
                    }
                    self.stage = Stage::KillerInit;
                }

                // ==============================
                // キラー手・カウンター手
                // ==============================
                Stage::KillerInit => {
                    self.cur = 0;
                    self.stage = Stage::Killer;
                }

                Stage::Killer => {
                    while !self.skip_quiets && self.cur < self.killers.len() {
                        let mv = self.killers[self.cur];
                        self.cur += 1;
                        if mv.is_none()
                            || mv == self.tt_move
                            || mv.is_capture()
                            || self.refutations[..self.refutation_count].contains(&mv)
                            || !pos.pseudo_legal(mv)
                        {
                            continue;
                        }
                        self.refutations[self.refutation_count] = mv;
                        self.refutation_count += 1;
                        return mv;
                    }
                    self.stage = Stage::QuietInit;
                }

                // ==============================
                // 静かな手
                // ==============================
                Stage::QuietInit => {
                    if self.skip_quiets {
                        self.stage = Stage::BadCapture;
                        self.cur = 0;
                        continue;
                    }
                    self.generate(pos, GenType::Quiets);
                    let us = self.side_to_move;
                    for ext in self.moves.as_mut_slice() {
                        ext.value = history.quiet_score(us, ext.mv, &self.cont_keys);
                    }
                    self.end_good_quiets = self.order_quiets();
                    self.stage = Stage::GoodQuiet;
                }

                Stage::GoodQuiet | Stage::Quiet => {
                    if self.stage == Stage::GoodQuiet {
                        self.end_cur = self.end_good_quiets;
                    } else {
                        self.end_cur = self.moves.len();
                    }
                    if !self.skip_quiets {
                        if let Some(mv) = self.select(|mp, mv| !mp.is_refutation(mv)) {
                            return mv;
                        }
                    }
                    if self.stage == Stage::GoodQuiet && !self.skip_quiets {
                        self.stage = Stage::Quiet;
                    } else {
                        self.stage = Stage::BadCapture;
                        self.cur = 0;
                    }
                }

                Stage::BadCapture => {
                    // 後回しにした順に返す
                    if let Some(&mv) = self.bad_captures.get(self.cur) {
                        self.cur += 1;
                        return mv;
                    }
                    self.stage = Stage::Stop;
                }

                // ==============================
                // 確率オーダリング
                // ==============================
                Stage::ProbabilityInit => {
                    self.generate(pos, GenType::NonEvasions);
                    self.score_probability(history);
                    self.moves
                        .as_mut_slice()
                        .sort_by(|a, b| b.value.cmp(&a.value));
                    self.stage = Stage::Probability;
                }

                Stage::Probability => {
                    if let Some(mv) = self.select(|_, _| true) {
                        return mv;
                    }
                    self.stage = Stage::Stop;
                }

                // ==============================
                // 王手回避
                // ==============================
                Stage::EvasionInit => {
                    self.generate(pos, GenType::Evasions);
                    if self.moves.len() > 1 {
                        self.score_evasions(pos, history);
                    }
                    self.stage = Stage::Evasion;
                }

                Stage::Evasion | Stage::QCapture | Stage::Recapture => {
                    while let Some(ext) = self.pick_best() {
                        if ext.mv != self.tt_move {
                            return ext.mv;
                        }
                    }
                    let with_checks =
                        self.stage == Stage::QCapture && self.depth > DEPTH_QS_NO_CHECKS;
                    self.stage = if with_checks {
                        Stage::QCheckInit
                    } else {
                        Stage::Stop
                    };
                }

                // ==============================
                // 静止探索の王手・取り返し
                // ==============================
                Stage::QCheckInit => {
                    self.generate(pos, GenType::QuietChecks);
                    self.stage = Stage::QCheck;
                }

                Stage::QCheck => {
                    if let Some(mv) = self.select(|_, _| true) {
                        return mv;
                    }
                    self.stage = Stage::Stop;
                }

                Stage::RecaptureInit => {
                    match self.recapture_square {
                        Some(sq) => {
                            self.generate(pos, GenType::Recaptures(sq));
                            self.score_captures(history);
                            self.stage = Stage::Recapture;
                        }
                        None => self.stage = Stage::Stop,
                    }
                }

                // ==============================
                // ProbCut
                // ==============================
                Stage::ProbCut => {
                    let threshold = self.probcut_threshold;
                    while let Some(ext) = self.pick_best() {
                        if ext.mv != self.tt_move && pos.see(ext.mv) > threshold {
                            return ext.mv;
                        }
                    }
                    self.stage = Stage::Stop;
                }

                Stage::Stop => return Move::NONE,
            }
        }
    }

    // =========================================================================
    // 生成とスコアリング
    // =========================================================================

    fn generate(&mut self, pos: &Position, gen_type: GenType) {
        self.moves.clear();
        generate_with_type(pos, gen_type, &mut self.moves);
        self.cur = 0;
        self.end_cur = self.moves.len();
    }

    /// 捕獲手のスコア（MVV-LVA + CaptureHistory）
    fn score_captures(&mut self, history: &HistoryTables) {
        for ext in self.moves.as_mut_slice() {
            let mv = ext.mv;
            let hist =
                history.capture_history.get(mv.piece_after_move(), mv.to(), mv.captured_piece());
            ext.value = mvv_lva(mv) + hist as i32 / 16;
        }
    }

    /// 王手回避手のスコア
    ///
    /// SEE が負の手は最後に、捕獲手は静かな手より前に並ぶようにする。
    fn score_evasions(&mut self, pos: &Position, history: &HistoryTables) {
        let us = self.side_to_move;
        let cont_keys = self.cont_keys;
        for ext in self.moves.as_mut_slice() {
            let mv = ext.mv;
            let see = pos.see(mv);
            ext.value = if see < 0 {
                see - EVASION_CAPTURE_BONUS
            } else if mv.is_capture() {
                mvv_lva(mv) + EVASION_CAPTURE_BONUS + mv.is_promotion() as i32
            } else {
                let cont =
                    history.continuation_history.get(cont_keys[0], mv.piece_after_move(), mv.to());
                history.main_history.get(us, mv) as i32 + cont as i32
            };
        }
    }

    /// 全ての手のスコアを softmax で確率に直し、2^30 倍した整数を値とする
    fn score_probability(&mut self, history: &HistoryTables) {
        let us = self.side_to_move;
        let cont_keys = self.cont_keys;
        for ext in self.moves.as_mut_slice() {
            ext.value = if ext.mv.is_capture() {
                BUTTERFLY_MAX + 4 * mvv_lva(ext.mv)
            } else {
                history.quiet_score(us, ext.mv, &cont_keys)
            };
        }
        let Some(max) = self.moves.iter().map(|e| e.value).max() else {
            return;
        };
        let weights: Vec<f64> = self
            .moves
            .iter()
            .map(|e| ((e.value - max) as f64 / PROBABILITY_TEMPERATURE).exp())
            .collect();
        let sum: f64 = weights.iter().sum();
        for (ext, w) in self.moves.as_mut_slice().iter_mut().zip(weights) {
            ext.value = (w / sum * PROBABILITY_SCALE) as i32;
        }
    }

    /// 静かな手を並べ替え、良い静かな手の末尾を返す
    ///
    /// 閾値を超える手は先頭に集めて降順に並べ、残りは深さに応じた下限以上の手だけを整列する。
    fn order_quiets(&mut self) -> usize {
        let slice = self.moves.as_mut_slice();
        // 閾値を超える手を、相対順序を保ったまま前に寄せる
        let mut end_good = 0;
        for i in 0..slice.len() {
            if slice[i].value > GOOD_QUIET_THRESHOLD {
                slice[end_good..=i].rotate_right(1);
                end_good += 1;
            }
        }
        partial_insertion_sort(&mut slice[..end_good], end_good, i32::MIN);
        let rest = &mut slice[end_good..];
        let rest_len = rest.len();
        partial_insertion_sort(rest, rest_len, -4000 * self.depth);
        end_good
    }

    #[inline]
    fn is_refutation(&self, mv: Move) -> bool {
        self.refutations[..self.refutation_count].contains(&mv)
    }

    // =========================================================================
    // 選択
    // =========================================================================

    /// 残りの中で最もスコアの高い手を取り出す（同点なら先に並んでいる手）
    fn pick_best(&mut self) -> Option<ExtMove> {
        if self.cur >= self.end_cur {
            return None;
        }
        let slice = &mut self.moves.as_mut_slice()[self.cur..self.end_cur];
        let mut best = 0;
        for i in 1..slice.len() {
            if slice[i].value > slice[best].value {
                best = i;
            }
        }
        slice[..=best].rotate_right(1);
        let ext = slice[0];
        self.cur += 1;
        Some(ext)
    }

    /// 並んでいる順に、置換表の手と `filter` で除外される手を飛ばして返す
    fn select(&mut self, filter: impl Fn(&Self, Move) -> bool) -> Option<Move> {
        while self.cur < self.end_cur {
            let mv = self.moves.get(self.cur).mv;
            self.cur += 1;
            if mv != self.tt_move && filter(self, mv) {
                return Some(mv);
            }
        }
        None
    }
}

// =============================================================================
// ユーティリティ関数
// =============================================================================

/// MVV-LVA（取る駒の価値 - 動かす駒の順位、成りの価値を加える）
#[inline]
pub fn mvv_lva(mv: Move) -> i32 {
    let mut value = 0;
    if mv.is_capture() {
        value += exchange_value(mv.captured_piece().piece_type()) - exchange_order(mv.piece_type());
    }
    if mv.is_promotion() {
        value += promotion_value(mv.piece_type());
    }
    value
}

/// 部分ソート
///
/// `limit` 以上のスコアの手を先頭に集め、降順でソートする。
/// 先頭要素（index 0）を初期 sorted 領域とみなし、index 1 から走査する。
/// sorted 領域の末尾インデックスを返す（`end <= 1` なら 0）。
fn partial_insertion_sort(moves: &mut [ExtMove], end: usize, limit: i32) -> usize {
    let mut sorted_end: usize = 0;
    for p in 1..end {
        if moves[p].value >= limit {
            let tmp = moves[p];
            sorted_end += 1;
            moves[p] = moves[sorted_end];
            let mut q = sorted_end;
            while q > 0 && moves[q - 1].value < tmp.value {
                moves[q] = moves[q - 1];
                q -= 1;
            }
            moves[q] = tmp;
        }
    }
    sorted_end
}

// =============================================================================
// テスト
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movegen::{generate_all, generate_legal, MoveList};
    use crate::position::SFEN_HIRATE;
    use crate::types::{File, Piece, PieceType, Rank};

    fn pos_from(sfen: &str) -> Position {
        let mut pos = Position::new();
        pos.set_sfen(sfen).unwrap();
        pos
    }

    fn drain(mp: &mut MovePicker, pos: &Position, history: &HistoryTables) -> Vec<Move> {
        let mut out = Vec::new();
        loop {
            let mv = mp.next_move(pos, history);
            if mv.is_none() {
                break;
            }
            out.push(mv);
        }
        out
    }

    fn sorted(moves: Vec<Move>) -> Vec<u32> {
        let mut raw: Vec<u32> = moves.into_iter().map(|m| m.raw()).collect();
        raw.sort_unstable();
        raw
    }

    fn all_pseudo_legal(pos: &Position) -> Vec<Move> {
        let mut buf = ExtMoveBuffer::new();
        generate_all(pos, &mut buf);
        buf.iter().map(|e| e.mv).collect()
    }

    fn picker(
        pos: &Position,
        tt: Move,
        depth: Depth,
        killers: [Move; 3],
        probability: bool,
    ) -> MovePicker {
        MovePicker::new(pos, tt, depth, killers, [ContKey::SENTINEL; 3], probability)
    }

    const MIDGAME: &str =
        "ln1g2snl/1r1sk1gb1/p1pppp1pp/1p4p2/7P1/2P1P4/PP1P1PP1P/1BG2S1R1/LNS1KG1NL b - 15";

    #[test]
    fn test_main_search_returns_every_move_once() {
        let history = HistoryTables::new_boxed();
        for sfen in [SFEN_HIRATE, MIDGAME] {
            let pos = pos_from(sfen);
            let mut mp = picker(&pos, Move::NONE, 6, [Move::NONE; 3], false);
            let moves = drain(&mut mp, &pos, &history);
            assert_eq!(sorted(moves), sorted(all_pseudo_legal(&pos)), "{sfen}");
        }
    }

    #[test]
    fn test_tt_move_first_and_not_repeated() {
        let history = HistoryTables::new_boxed();
        let pos = pos_from(SFEN_HIRATE);
        let tt = pos.move_from_usi("2g2f").unwrap();
        let mut mp = picker(&pos, tt, 6, [Move::NONE; 3], false);
        let moves = drain(&mut mp, &pos, &history);
        assert_eq!(moves[0], tt);
        assert_eq!(moves.iter().filter(|&&m| m == tt).count(), 1);
        assert_eq!(sorted(moves), sorted(all_pseudo_legal(&pos)));
    }

    #[test]
    fn test_stale_tt_move_is_dropped() {
        let history = HistoryTables::new_boxed();
        let pos = pos_from(SFEN_HIRATE);
        // 後手の手は先手番の局面では pseudo-legal でない
        let stale = Move::new_move(
            Square::new(File::File3, Rank::Rank3),
            Square::new(File::File3, Rank::Rank4),
            false,
            Piece::W_PAWN,
            Piece::NONE,
        );
        let mut mp = picker(&pos, stale, 4, [Move::NONE; 3], false);
        let moves = drain(&mut mp, &pos, &history);
        assert!(!moves.contains(&stale));
        assert_eq!(sorted(moves), sorted(all_pseudo_legal(&pos)));
    }

    #[test]
    fn test_killers_come_before_other_quiets() {
        let history = HistoryTables::new_boxed();
        let pos = pos_from(SFEN_HIRATE);
        let k1 = pos.move_from_usi("7g7f").unwrap();
        let k2 = pos.move_from_usi("5i5h").unwrap();
        // カウンター手がキラー手と重複しても一度しか返さない
        let mut mp = picker(&pos, Move::NONE, 6, [k1, k2, k1], false);
        let moves = drain(&mut mp, &pos, &history);
        // 初期局面には捕獲手がない
        assert_eq!(moves[0], k1);
        assert_eq!(moves[1], k2);
        assert_eq!(sorted(moves), sorted(all_pseudo_legal(&pos)));
    }

    #[test]
    fn test_good_quiets_follow_history() {
        let mut history = HistoryTables::new_boxed();
        let pos = pos_from(SFEN_HIRATE);
        let favored = pos.move_from_usi("1g1f").unwrap();
        for _ in 0..20 {
            history.update_quiet(Color::Black, favored, &[ContKey::SENTINEL; 3], 1000);
        }
        let mut mp = picker(&pos, Move::NONE, 6, [Move::NONE; 3], false);
        assert_eq!(mp.next_move(&pos, &history), favored);
    }

    #[test]
    fn test_order_quiets_partitions_in_place() {
        let pos = pos_from(SFEN_HIRATE);
        let mut mp = picker(&pos, Move::NONE, 3, [Move::NONE; 3], false);
        let values = [-20_000, 25_000, -3_000, 40_000, 100, 25_000, -12_000, 31_000, 0, -11_999];
        for (i, &mv) in all_pseudo_legal(&pos).iter().take(values.len()).enumerate() {
            mp.moves.push(ExtMove::new(mv, values[i]));
        }
        let input: Vec<ExtMove> = mp.moves.iter().copied().collect();

        let end_good = mp.order_quiets();

        // 閾値超えの手は降順（同点は元の順）、残りは元の順で並べ替え前と同じ集合
        let mut good: Vec<ExtMove> =
            input.iter().copied().filter(|e| e.value > GOOD_QUIET_THRESHOLD).collect();
        good.sort_by(|a, b| b.value.cmp(&a.value));
        let out = mp.moves.as_slice();
        assert_eq!(end_good, good.len());
        assert_eq!(&out[..end_good], good.as_slice());

        let mut rest: Vec<u32> = out[end_good..].iter().map(|e| e.mv.raw()).collect();
        let mut expected: Vec<u32> = input
            .iter()
            .filter(|e| e.value <= GOOD_QUIET_THRESHOLD)
            .map(|e| e.mv.raw())
            .collect();
        rest.sort_unstable();
        expected.sort_unstable();
        assert_eq!(rest, expected);
        // 深さ3の下限 -12000 以上の手は残りの先頭に降順で並ぶ
        let head: Vec<i32> = out[end_good..end_good + 4].iter().map(|e| e.value).collect();
        assert_eq!(head, vec![100, 0, -3_000, -11_999]);
    }

    #[test]
    fn test_losing_capture_is_deferred() {
        let history = HistoryTables::new_boxed();
        // 飛車で守られた歩を取る手（SEE < 0）と、ただの金を取る手
        let pos = pos_from("4k4/9/4r4/4p4/9/4R2g1/9/9/4K4 b - 1");
        let mut mp = picker(&pos, Move::NONE, 6, [Move::NONE; 3], false);
        let moves = drain(&mut mp, &pos, &history);
        let losing = moves
            .iter()
            .position(|m| m.is_capture() && m.captured_piece().piece_type() == PieceType::Pawn)
            .unwrap();
        assert_eq!(losing, moves.len() - 1);
        assert_eq!(sorted(moves), sorted(all_pseudo_legal(&pos)));
    }

    #[test]
    fn test_skip_quiets_keeps_captures() {
        let history = HistoryTables::new_boxed();
        let pos = pos_from(MIDGAME);
        let mut mp = picker(&pos, Move::NONE, 6, [Move::NONE; 3], false);
        mp.skip_quiets();
        let moves = drain(&mut mp, &pos, &history);
        assert!(moves.iter().all(|m| m.is_capture()));
        assert_eq!(moves.len(), all_pseudo_legal(&pos).iter().filter(|m| m.is_capture()).count());
    }

    #[test]
    fn test_evasions_are_legal_moves() {
        let history = HistoryTables::new_boxed();
        let pos = pos_from("4k4/9/9/9/9/9/9/4r4/4K4 b G 1");
        assert!(pos.in_check());
        let mut mp = picker(&pos, Move::NONE, 3, [Move::NONE; 3], false);
        let moves = drain(&mut mp, &pos, &history);
        let mut legal = MoveList::new();
        generate_legal(&pos, &mut legal);
        assert_eq!(sorted(moves.clone()), sorted(legal.iter().copied().collect()));
        // 飛車を取る手が先頭
        assert!(moves[0].is_capture());
    }

    #[test]
    fn test_probability_ordering_returns_every_move_once() {
        let history = HistoryTables::new_boxed();
        let pos = pos_from(MIDGAME);
        let mut mp = picker(&pos, Move::NONE, 10, [Move::NONE; 3], true);
        let moves = drain(&mut mp, &pos, &history);
        assert_eq!(sorted(moves.clone()), sorted(all_pseudo_legal(&pos)));
        // 捕獲手は静かな手より確率が高い
        assert!(moves[0].is_capture());
    }

    #[test]
    fn test_qsearch_returns_captures_then_checks() {
        let history = HistoryTables::new_boxed();
        let pos = pos_from("4k4/9/4p4/9/9/9/9/9/4K4 b R 1");
        let keys = [ContKey::SENTINEL; 3];
        let mut mp = MovePicker::new_qsearch(&pos, Move::NONE, 0, keys, Square::SQ_55);
        let moves = drain(&mut mp, &pos, &history);
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|&m| pos.gives_check(m) || m.is_capture()));

        // 王手を読まない深さでは捕獲手のみ（この局面には捕獲手がない）
        let mut mp =
            MovePicker::new_qsearch(&pos, Move::NONE, DEPTH_QS_NO_CHECKS, keys, Square::SQ_55);
        assert!(drain(&mut mp, &pos, &history).is_empty());
    }

    #[test]
    fn test_recaptures_only_target_square() {
        let history = HistoryTables::new_boxed();
        let pos = pos_from("4k4/9/9/3p1p3/4G4/9/9/9/4K4 b R 1");
        let target = Square::new(File::File4, Rank::Rank4);
        let mut mp = MovePicker::new_qsearch(
            &pos,
            Move::NONE,
            DEPTH_QS_RECAPTURES,
            [ContKey::SENTINEL; 3],
            target,
        );
        let moves = drain(&mut mp, &pos, &history);
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|m| m.to() == target && m.is_capture()));
    }

    #[test]
    fn test_probcut_threshold() {
        let history = HistoryTables::new_boxed();
        let pos = pos_from("4k4/9/4r4/4p4/9/4R2g1/9/9/4K4 b - 1");
        let mut mp = MovePicker::new_probcut(&pos, Move::NONE, 0);
        let moves = drain(&mut mp, &pos, &history);
        assert!(moves.iter().all(|&m| pos.see(m) > 0));
        assert!(moves.iter().any(|m| m.captured_piece().piece_type() == PieceType::Gold));
    }

    #[test]
    fn test_mvv_lva() {
        let to = Square::new(File::File5, Rank::Rank4);
        let from = Square::SQ_55;
        let pawn_takes_rook = Move::new_move(from, to, false, Piece::B_PAWN, Piece::W_ROOK);
        let rook_takes_pawn = Move::new_move(from, to, false, Piece::B_ROOK, Piece::W_PAWN);
        assert!(mvv_lva(pawn_takes_rook) > mvv_lva(rook_takes_pawn));
        let drop = Move::new_drop(Color::Black, PieceType::Gold, Square::SQ_55);
        assert_eq!(mvv_lva(drop), 0);
    }

    #[test]
    fn test_partial_insertion_sort() {
        let mut moves = vec![
            ExtMove::new(Move::NONE, 100),
            ExtMove::new(Move::NONE, 50),
            ExtMove::new(Move::NONE, 200),
            ExtMove::new(Move::NONE, 10),
            ExtMove::new(Move::NONE, 150),
        ];
        let len = moves.len();
        let sorted_end = partial_insertion_sort(&mut moves, len, 100);
        assert_eq!(sorted_end, 2);
        assert_eq!(moves[0].value, 200);
        assert_eq!(moves[1].value, 150);
        assert_eq!(moves[2].value, 100);
    }

    #[test]
    fn test_partial_insertion_sort_full_sort() {
        let mut moves = vec![
            ExtMove::new(Move::NONE, 50),
            ExtMove::new(Move::NONE, -100),
            ExtMove::new(Move::NONE, 200),
            ExtMove::new(Move::NONE, 0),
        ];
        let len = moves.len();
        assert_eq!(partial_insertion_sort(&mut moves, len, i32::MIN), 3);
        let values: Vec<i32> = moves.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![200, 50, 0, -100]);
    }

    #[test]
    fn test_partial_insertion_sort_empty() {
        let mut moves: Vec<ExtMove> = vec![];
        assert_eq!(partial_insertion_sort(&mut moves, 0, 100), 0);
    }
}
