//! Alpha-Beta 探索
//!
//! 反復深化 + aspiration window + PVS。各ノードでは置換表、静的評価による枝刈り
//! （reverse futility / null move / ProbCut）、MovePicker による指し手の順序付け、
//! LMR と SEE による枝刈りを行う。
//!
//! 評価値の内訳は ply ごとのフレームに差分で積み上げ、戻るときは
//! フレームを捨てるだけで済むようにしている。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;
use std::time::Instant;

use crate::eval::material::exchange_value;
use crate::eval::{EvalDetail, Evaluator, PsqControlList, PsqList};
use crate::movegen::MAX_MOVES;
use crate::position::Position;
use crate::tt::TranspositionTable;
use crate::types::{Bound, Color, Depth, Move, Value, MAX_PLY};

use super::history::{stat_bonus, ContKey, HistoryTables};
use super::movepicker::MovePicker;
use super::qsearch::qsearch;
use super::search_helpers::{
    check_abort, cont_keys, do_move, do_null_move, evaluate, has_non_pawn_material, undo_move,
    undo_null_move, update_pv,
};
use super::types::{
    init_stack_array, value_from_tt, value_to_tt, NodeType, RootMove, RootMoves, Stack, STACK_SIZE,
};
use super::{InfoSink, LimitsType, SearchInfo, SearchOptions};

/// 記録しておく試行済みの手の上限
const MAX_TRIED_MOVES: usize = 32;

/// aspiration window の初期幅
const ASPIRATION_DELTA: i32 = 18;

// =============================================================================
// 枝刈り・削減のパラメータ
// =============================================================================

type Reductions = [i32; MAX_MOVES];

/// LMR の削減量テーブル（1024 倍スケール、深さと手数で共用）
static REDUCTIONS: LazyLock<Reductions> = LazyLock::new(|| {
    let mut table: Reductions = [0; MAX_MOVES];
    for (i, value) in table.iter_mut().enumerate().skip(1) {
        *value = (2809.0 / 128.0 * (i as f64).ln()) as i32;
    }
    table
});

/// LMR で減らす深さ
#[inline]
pub(crate) fn reduction(improving: bool, depth: Depth, move_count: i32) -> Depth {
    if depth <= 0 || move_count <= 0 {
        return 0;
    }
    let max_idx = MAX_MOVES as i32 - 1;
    let scale = REDUCTIONS[depth.clamp(1, max_idx) as usize]
        * REDUCTIONS[move_count.clamp(1, max_idx) as usize];
    (scale + 512) / 1024 + (!improving && scale > 1024) as i32
}

#[inline]
fn futility_margin(depth: Depth, improving: bool) -> i32 {
    (175 - 50 * improving as i32) * depth
}

/// これ以上の手数になったら静かな手を読まない
#[inline]
fn futility_move_count(improving: bool, depth: Depth) -> i32 {
    (3 + depth * depth) / (2 - improving as i32)
}

// =============================================================================
// SearchContext / SearchState
// =============================================================================

/// 評価値の内訳と利きインデックス（ply ごとに1つ）
#[derive(Clone)]
pub struct EvalFrame {
    pub detail: EvalDetail,
    pub controls: PsqControlList,
}

/// 探索中に変化しない共有データ
pub struct SearchContext<'a> {
    pub tt: &'a TranspositionTable,
    pub evaluator: &'a Evaluator,
    /// 全スレッドで共有する停止フラグ
    pub stop: &'a AtomicBool,
    pub limits: &'a LimitsType,
    pub options: &'a SearchOptions,
    /// スレッドID（0=main）
    pub thread_id: usize,
    /// 探索開始時刻
    pub start: Instant,
}

/// 探索中に変化する状態
///
/// 各探索スレッドが1つずつ持つ。履歴表は探索をまたいで引き継ぐ。
pub struct SearchState {
    /// 探索ノード数
    pub nodes: u64,
    /// 探索スタック
    pub stack: Vec<Stack>,
    /// ply ごとの評価値の内訳
    pub frames: Vec<EvalFrame>,
    /// 現局面の駒リスト（指し手に合わせて差分更新する）
    pub psq_list: PsqList,
    pub history: Box<HistoryTables>,
    /// 中断フラグ
    pub abort: bool,
    /// 選択的深さ
    pub sel_depth: i32,
    pub root_depth: Depth,
    pub completed_depth: Depth,
    /// null move の検証探索中はこの ply 未満で null move をしない
    pub nmp_min_ply: i32,
    pub root_moves: RootMoves,
    /// 千日手の評価値（手番ごと）
    pub draw_scores: [Value; Color::NUM],
    /// check_abort呼び出しカウンター
    pub calls_cnt: i32,
}

impl SearchState {
    pub fn new() -> Self {
        let empty = Position::new();
        Self {
            nodes: 0,
            stack: init_stack_array(),
            frames: Vec::new(),
            psq_list: PsqList::new(&empty),
            history: HistoryTables::new_boxed(),
            abort: false,
            sel_depth: 0,
            root_depth: 0,
            completed_depth: 0,
            nmp_min_ply: 0,
            root_moves: RootMoves::new(),
            draw_scores: [Value::DRAW; Color::NUM],
            calls_cnt: 0,
        }
    }

    /// ルート局面から探索を始める準備をする
    pub fn prepare(&mut self, ctx: &SearchContext<'_>, pos: &Position, draw_value: Value) {
        self.nodes = 0;
        self.abort = false;
        self.sel_depth = 0;
        self.root_depth = 0;
        self.completed_depth = 0;
        self.nmp_min_ply = 0;
        self.calls_cnt = ctx.options.node_check_interval.max(1);
        self.stack = init_stack_array();

        self.psq_list = PsqList::new(pos);
        let controls = PsqControlList::new(pos);
        let detail = ctx.evaluator.evaluate_all(pos, &self.psq_list, &controls);
        self.frames = vec![EvalFrame { detail, controls }; STACK_SIZE];

        self.root_moves = RootMoves::from_legal_moves(pos, &ctx.limits.search_moves);

        let us = pos.side_to_move();
        self.draw_scores[us.index()] = draw_value;
        self.draw_scores[us.opponent().index()] = -draw_value;
    }
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SearchWorker
// =============================================================================

/// 1スレッド分の探索結果（最後に完了した反復のもの）
#[derive(Debug, Clone)]
pub struct WorkerResult {
    pub best: RootMove,
    pub completed_depth: Depth,
    pub nodes: u64,
}

/// 探索スレッド1つ分のワーカー
///
/// ゲームを通して再利用し、履歴表は `clear` するまで引き継ぐ。
pub struct SearchWorker {
    pub thread_id: usize,
    pub state: SearchState,
}

impl SearchWorker {
    pub fn new(thread_id: usize) -> Self {
        Self {
            thread_id,
            state: SearchState::new(),
        }
    }

    /// 履歴表を消す（新しい対局の開始時）
    pub fn clear(&mut self) {
        self.state.history.clear();
    }

    /// 反復深化で探索する
    ///
    /// 合法手がなければ `None`、1反復も完了しなければ先頭の合法手を返す。
    /// 中断した反復の結果は捨てる。
    pub fn search(
        &mut self,
        ctx: &SearchContext<'_>,
        pos: &mut Position,
        draw_value: Value,
        info: &dyn InfoSink,
    ) -> Option<WorkerResult> {
        let st = &mut self.state;
        st.prepare(ctx, pos, draw_value);
        if st.root_moves.is_empty() {
            return None;
        }

        let max_depth = if ctx.limits.depth > 0 {
            ctx.limits.depth.min(MAX_PLY - 1)
        } else {
            MAX_PLY - 1
        };
        // helper は開始深さをずらして main と違う木を読む
        let start_depth = 1 + (self.thread_id % 2) as Depth;

        let mut best = st.root_moves[0].clone();

        for depth in start_depth..=max_depth {
            if st.abort {
                break;
            }

            for rm in st.root_moves.iter_mut() {
                rm.previous_score = rm.score;
            }
            st.root_depth = depth;
            st.sel_depth = 0;

            let prev = st.root_moves[0].previous_score;
            let mut delta = ASPIRATION_DELTA;
            let (mut alpha, mut beta) = if depth >= 4 && !prev.is_mate_score() {
                (
                    (prev - delta).max(-Value::INFINITE),
                    (prev + delta).min(Value::INFINITE),
                )
            } else {
                (-Value::INFINITE, Value::INFINITE)
            };

            loop {
                let score = search_root(st, ctx, pos, depth, alpha, beta);
                st.root_moves.stable_sort();

                if st.abort {
                    break;
                }

                if score <= alpha {
                    beta = Value::new((alpha.raw() + beta.raw()) / 2);
                    alpha = (score - delta).max(-Value::INFINITE);
                } else if score >= beta {
                    beta = (score + delta).min(Value::INFINITE);
                } else {
                    break;
                }
                delta += delta / 3;
            }

            if st.abort {
                break;
            }

            st.completed_depth = depth;
            best = st.root_moves[0].clone();

            if self.thread_id == 0 {
                let report = SearchInfo {
                    depth,
                    sel_depth: best.sel_depth,
                    score: best.score,
                    nodes: st.nodes,
                    time_ms: ctx.start.elapsed().as_millis() as u64,
                    hashfull: ctx.tt.hashfull(0),
                    pv: best.pv.clone(),
                };
                log::debug!("{}", report.to_usi());
                info.on_info(&report);
            }

            // 詰みを読み切ったらそれ以上深くしない
            if !ctx.limits.infinite
                && !ctx.limits.ponder
                && best.score.is_mate_score()
                && best.score.mate_ply() <= depth
            {
                break;
            }
            if ctx.stop.load(Ordering::Relaxed) {
                break;
            }
        }

        Some(WorkerResult {
            best,
            completed_depth: st.completed_depth,
            nodes: st.nodes,
        })
    }
}

// =============================================================================
// ルート探索
// =============================================================================

/// ルートノードの探索
///
/// ルートの手は `root_moves` の順に読み、読み終えた手のスコアと読み筋を書き戻す。
fn search_root(
    st: &mut SearchState,
    ctx: &SearchContext<'_>,
    pos: &mut Position,
    depth: Depth,
    alpha: Value,
    beta: Value,
) -> Value {
    let mut alpha = alpha;
    let in_check = pos.in_check();
    let us = pos.side_to_move();

    st.stack[0].in_check = in_check;
    st.stack[0].pv.clear();
    st.stack[0].static_eval = if in_check {
        Value::NONE
    } else {
        evaluate(st, ctx, pos, 0)
    };
    st.stack[2].killers = [Move::NONE; 2];

    let key = pos.key();
    let tt_result = ctx.tt.probe(key, pos);
    let keys = cont_keys(st, 0);

    let mut best_value = -Value::INFINITE;
    let mut best_move = Move::NONE;
    let mut quiets_tried = Vec::with_capacity(MAX_TRIED_MOVES);
    let mut captures_tried = Vec::with_capacity(MAX_TRIED_MOVES);

    for idx in 0..st.root_moves.len() {
        let mv = st.root_moves[idx].mv();
        let move_count = idx as i32 + 1;
        st.sel_depth = 0;
        st.stack[0].move_count = move_count;

        let capture = mv.is_capture();
        let gives_check = pos.gives_check(mv);
        let new_depth = depth - 1;

        do_move(st, ctx, pos, mv, 0);

        let mut value;
        if idx == 0 {
            value = -search_node::<{ NodeType::PV as u8 }>(
                st, ctx, pos, new_depth, -beta, -alpha, 1, false,
            );
        } else {
            let mut full_search = true;
            value = -Value::INFINITE;
            if depth >= 3 && move_count > 3 && !capture && !gives_check {
                let r = (reduction(false, depth, move_count) - 1).max(0);
                let d = (new_depth - r).max(1);
                if d < new_depth {
                    value = -search_node::<{ NodeType::NonPV as u8 }>(
                        st,
                        ctx,
                        pos,
                        d,
                        -(alpha + 1),
                        -alpha,
                        1,
                        true,
                    );
                    full_search = value > alpha;
                }
            }
            if full_search {
                value = -search_node::<{ NodeType::NonPV as u8 }>(
                    st,
                    ctx,
                    pos,
                    new_depth,
                    -(alpha + 1),
                    -alpha,
                    1,
                    false,
                );
            }
            if value > alpha {
                value = -search_node::<{ NodeType::PV as u8 }>(
                    st, ctx, pos, new_depth, -beta, -alpha, 1, false,
                );
            }
        }

        undo_move(st, pos, mv);

        if st.abort {
            return Value::ZERO;
        }

        let sel_depth = st.sel_depth;
        let child_pv = &st.stack[1].pv;
        let rm = &mut st.root_moves[idx];
        if move_count == 1 || value > alpha {
            rm.score = value;
            rm.sel_depth = sel_depth;
            rm.pv.truncate(1);
            rm.pv.extend_from_slice(child_pv);
        } else {
            rm.score = -Value::INFINITE;
        }

        if value > best_value {
            best_value = value;
            if value > alpha {
                best_move = mv;
                if value >= beta {
                    break;
                }
                alpha = value;
            }
        }

        if mv != best_move {
            push_tried(&mut quiets_tried, &mut captures_tried, mv);
        }
    }

    if best_move.is_some() {
        update_all_stats(st, us, 0, best_move, depth, &quiets_tried, &captures_tried, &keys);
    }

    let bound = if best_value >= beta {
        Bound::Lower
    } else if best_move.is_some() {
        Bound::Exact
    } else {
        Bound::Upper
    };
    tt_result.write(
        key,
        value_to_tt(best_value, 0),
        true,
        bound,
        depth,
        best_move,
        st.stack[0].static_eval,
        ctx.tt.generation(),
    );

    best_value
}

// =============================================================================
// 通常探索ノード
// =============================================================================

/// 通常探索ノード
///
/// NT は NodeType（PV / NonPV）を const generic で受け取る。
/// `cut_node` は β カットが期待されるゼロウィンドウのノードで true。
#[allow(clippy::too_many_arguments)]
pub(super) fn search_node<const NT: u8>(
    st: &mut SearchState,
    ctx: &SearchContext<'_>,
    pos: &mut Position,
    depth: Depth,
    alpha: Value,
    beta: Value,
    ply: i32,
    cut_node: bool,
) -> Value {
    let pv_node = NT == NodeType::PV as u8;

    if depth <= 0 {
        return if pv_node {
            qsearch::<{ NodeType::PV as u8 }>(st, ctx, pos, 0, alpha, beta, ply)
        } else {
            qsearch::<{ NodeType::NonPV as u8 }>(st, ctx, pos, 0, alpha, beta, ply)
        };
    }

    let p = ply as usize;
    let in_check = pos.in_check();
    let us = pos.side_to_move();
    let mut alpha = alpha;
    let mut beta = beta;
    let mut depth = depth;

    if pv_node {
        st.stack[p].pv.clear();
        if st.sel_depth < ply + 1 {
            st.sel_depth = ply + 1;
        }
    }
    st.stack[p].in_check = in_check;
    st.stack[p].move_count = 0;
    st.stack[p].stat_score = 0;
    st.stack[p + 2].killers = [Move::NONE; 2];

    // =========================================================================
    // 終局・中断の判定
    // =========================================================================

    if check_abort(st, ctx) {
        return Value::ZERO;
    }

    if ply >= MAX_PLY {
        return if in_check {
            Value::ZERO
        } else {
            evaluate(st, ctx, pos, ply)
        };
    }

    if !pos.has_both_kings() {
        return Value::ZERO;
    }

    if pos.is_repetition() {
        return st.draw_scores[us.index()];
    }

    // 詰みまでの距離による枝刈り
    alpha = alpha.max(Value::mated_in(ply));
    beta = beta.min(Value::mate_in(ply + 1));
    if alpha >= beta {
        return alpha;
    }

    if pos.win_declaration_possible() {
        return Value::mate_in(ply + 1);
    }

    // =========================================================================
    // 置換表
    // =========================================================================

    let keys = cont_keys(st, ply);
    let key = pos.key();
    let tt_result = ctx.tt.probe(key, pos);
    let tt_hit = tt_result.found;
    let tt_data = tt_result.data;
    let mut tt_move = if tt_hit { tt_data.mv } else { Move::NONE };
    if tt_move.is_some() && !(pos.pseudo_legal(tt_move) && pos.is_legal(tt_move)) {
        tt_move = Move::NONE;
    }
    let tt_value = if tt_hit {
        value_from_tt(tt_data.value, ply)
    } else {
        Value::NONE
    };
    let tt_pv = pv_node || (tt_hit && tt_data.is_pv);
    let tt_capture = tt_move.is_some() && tt_move.is_capture();

    if !pv_node
        && tt_hit
        && tt_data.depth >= depth
        && tt_value != Value::NONE
        && tt_data.bound.can_cutoff(tt_value, beta)
    {
        if tt_move.is_some() && tt_value >= beta && tt_move.is_quiet() {
            update_quiet_stats(st, us, ply, tt_move, &keys, stat_bonus(depth));
        }
        return tt_value;
    }

    // =========================================================================
    // 静的評価と枝刈り
    // =========================================================================

    let static_eval;
    let improving;
    if in_check {
        static_eval = Value::NONE;
        improving = false;
        st.stack[p].static_eval = Value::NONE;
    } else {
        static_eval = evaluate(st, ctx, pos, ply);
        st.stack[p].static_eval = static_eval;
        improving = ply >= 2
            && st.stack[p - 2].static_eval != Value::NONE
            && static_eval > st.stack[p - 2].static_eval;

        let mut eval = static_eval;
        if tt_value != Value::NONE
            && ((tt_value > eval && tt_data.bound.is_lower_or_exact())
                || (tt_value < eval && tt_data.bound.is_upper_or_exact()))
        {
            eval = tt_value;
        }

        // reverse futility pruning
        if !pv_node
            && depth < 7
            && eval - futility_margin(depth, improving) >= beta
            && !eval.is_win()
            && !beta.is_loss()
        {
            return eval;
        }

        // null move pruning
        if !pv_node
            && st.stack[p - 1].current_move != Move::NULL
            && eval >= beta
            && depth >= 2
            && ply >= st.nmp_min_ply
            && !beta.is_loss()
            && has_non_pawn_material(pos)
        {
            let r = 3 + depth / 4 + ((eval - beta).raw() / 200).min(3);

            do_null_move(st, pos, ply);
            let null_value = -search_node::<{ NodeType::NonPV as u8 }>(
                st,
                ctx,
                pos,
                depth - r,
                -beta,
                -beta + 1,
                ply + 1,
                !cut_node,
            );
            undo_null_move(pos);

            if st.abort {
                return Value::ZERO;
            }

            if null_value >= beta && !null_value.is_win() {
                if st.nmp_min_ply != 0 || depth < 12 {
                    return null_value;
                }

                // 深いところでは null move を禁じて検証する
                st.nmp_min_ply = ply + 3 * (depth - r) / 4;
                let v = search_node::<{ NodeType::NonPV as u8 }>(
                    st,
                    ctx,
                    pos,
                    depth - r,
                    beta - 1,
                    beta,
                    ply,
                    false,
                );
                st.nmp_min_ply = 0;

                if st.abort {
                    return Value::ZERO;
                }
                if v >= beta {
                    return null_value;
                }
            }
        }

        // ProbCut
        let prob_beta = beta + 200;
        if !pv_node
            && depth >= 5
            && !beta.is_mate_score()
            && !(tt_hit
                && tt_data.depth >= depth - 3
                && tt_value != Value::NONE
                && tt_value < prob_beta)
        {
            let captured = pos.captured_piece();
            let threshold = if captured.is_none() {
                0
            } else {
                exchange_value(captured.piece_type())
            };
            let mut mp = MovePicker::new_probcut(pos, tt_move, threshold);
            loop {
                let mv = mp.next_move(pos, &st.history);
                if mv.is_none() {
                    break;
                }
                if !pos.is_legal(mv) {
                    continue;
                }

                do_move(st, ctx, pos, mv, ply);
                let mut value = -qsearch::<{ NodeType::NonPV as u8 }>(
                    st,
                    ctx,
                    pos,
                    0,
                    -prob_beta,
                    -prob_beta + 1,
                    ply + 1,
                );
                if value >= prob_beta {
                    value = -search_node::<{ NodeType::NonPV as u8 }>(
                        st,
                        ctx,
                        pos,
                        depth - 4,
                        -prob_beta,
                        -prob_beta + 1,
                        ply + 1,
                        !cut_node,
                    );
                }
                undo_move(st, pos, mv);

                if st.abort {
                    return Value::ZERO;
                }
                if value >= prob_beta {
                    tt_result.write(
                        key,
                        value_to_tt(value, ply),
                        tt_pv,
                        Bound::Lower,
                        depth - 3,
                        mv,
                        static_eval,
                        ctx.tt.generation(),
                    );
                    return value;
                }
            }
        }
    }

    // internal iterative reduction
    if depth >= 6 && tt_move.is_none() {
        depth -= 1;
    }

    // =========================================================================
    // 指し手のループ
    // =========================================================================

    let prev_move = st.stack[p - 1].current_move;
    let counter_move = if prev_move.is_real_move() {
        st.history
            .counter_moves
            .get(prev_move.piece_after_move(), prev_move.to())
    } else {
        Move::NONE
    };
    let killers = [st.stack[p].killers[0], st.stack[p].killers[1], counter_move];
    let use_probability = depth >= ctx.options.probability_min_depth;
    let mut mp = MovePicker::new(pos, tt_move, depth, killers, keys, use_probability);

    let mut best_value = -Value::INFINITE;
    let mut best_move = Move::NONE;
    let mut move_count = 0;
    let mut quiets_tried = Vec::with_capacity(MAX_TRIED_MOVES);
    let mut captures_tried = Vec::with_capacity(MAX_TRIED_MOVES);

    loop {
        let mv = mp.next_move(pos, &st.history);
        if mv.is_none() {
            break;
        }
        if !pos.is_legal(mv) {
            continue;
        }
        move_count += 1;
        st.stack[p].move_count = move_count;

        let capture = mv.is_capture();
        let gives_check = pos.gives_check(mv);
        let mut new_depth = depth - 1;

        // 手数と SEE による枝刈り（詰まされる読み筋しか見つかっていない間はしない）
        if !best_value.is_loss() {
            let lmr_depth = (new_depth - reduction(improving, depth, move_count)).max(0);
            if capture || gives_check {
                if !pos.see_ge(mv, Value::new(-100 * depth)) {
                    continue;
                }
            } else {
                if move_count >= futility_move_count(improving, depth) {
                    mp.skip_quiets();
                    continue;
                }
                if !pos.see_ge(mv, Value::new(-20 * lmr_depth * lmr_depth)) {
                    continue;
                }
            }
        }

        // 王手延長
        if gives_check && ply < 2 * st.root_depth && pos.see_ge(mv, Value::ZERO) {
            new_depth += 1;
        }

        do_move(st, ctx, pos, mv, ply);

        let mut value = -Value::INFINITE;
        let full_search;
        if depth >= 2 && move_count > 1 + pv_node as i32 && (!capture || cut_node) {
            let mut r = reduction(improving, depth, move_count);
            if tt_pv {
                r -= 1;
            }
            if cut_node {
                r += 1;
            }
            if tt_capture {
                r += 1;
            }
            if !capture {
                let stat_score = st.history.quiet_score(us, mv, &keys);
                st.stack[p].stat_score = stat_score;
                r -= stat_score / 8192;
            }

            let d = (new_depth - r).clamp(1, new_depth + 1);
            value = -search_node::<{ NodeType::NonPV as u8 }>(
                st,
                ctx,
                pos,
                d,
                -(alpha + 1),
                -alpha,
                ply + 1,
                true,
            );
            full_search = value > alpha && d < new_depth;
        } else {
            full_search = !pv_node || move_count > 1;
        }

        if full_search {
            value = -search_node::<{ NodeType::NonPV as u8 }>(
                st,
                ctx,
                pos,
                new_depth,
                -(alpha + 1),
                -alpha,
                ply + 1,
                !cut_node,
            );
        }

        if pv_node && (move_count == 1 || (value > alpha && value < beta)) {
            value = -search_node::<{ NodeType::PV as u8 }>(
                st,
                ctx,
                pos,
                new_depth,
                -beta,
                -alpha,
                ply + 1,
                false,
            );
        }

        undo_move(st, pos, mv);

        if st.abort {
            return Value::ZERO;
        }

        if value > best_value {
            best_value = value;
            if value > alpha {
                best_move = mv;
                if pv_node {
                    update_pv(st, ply, mv);
                }
                if value >= beta {
                    break;
                }
                alpha = value;
            }
        }

        if mv != best_move {
            push_tried(&mut quiets_tried, &mut captures_tried, mv);
        }
    }

    // 合法手がなければ負け（王手がかかっていなくても）
    if move_count == 0 {
        return Value::mated_in(ply);
    }

    if best_move.is_some() {
        update_all_stats(st, us, ply, best_move, depth, &quiets_tried, &captures_tried, &keys);
    }

    let bound = if best_value >= beta {
        Bound::Lower
    } else if pv_node && best_move.is_some() {
        Bound::Exact
    } else {
        Bound::Upper
    };
    tt_result.write(
        key,
        value_to_tt(best_value, ply),
        tt_pv,
        bound,
        depth,
        best_move,
        static_eval,
        ctx.tt.generation(),
    );

    best_value
}

// =============================================================================
// 統計の更新
// =============================================================================

#[inline]
fn push_tried(quiets: &mut Vec<Move>, captures: &mut Vec<Move>, mv: Move) {
    let list = if mv.is_capture() { captures } else { quiets };
    if list.len() < MAX_TRIED_MOVES {
        list.push(mv);
    }
}

/// 静かな手でカットしたときの更新（キラー・履歴・カウンター手）
fn update_quiet_stats(
    st: &mut SearchState,
    us: Color,
    ply: i32,
    mv: Move,
    keys: &[ContKey; 3],
    bonus: i32,
) {
    let p = ply as usize;
    if st.stack[p].killers[0] != mv {
        st.stack[p].killers[1] = st.stack[p].killers[0];
        st.stack[p].killers[0] = mv;
    }
    st.history.update_quiet(us, mv, keys, bonus);

    if ply >= 1 {
        let prev = st.stack[p - 1].current_move;
        if prev.is_real_move() {
            st.history
                .counter_moves
                .set(prev.piece_after_move(), prev.to(), mv);
        }
    }
}

/// 最善手にボーナス、試して外れた手にペナルティを与える
#[allow(clippy::too_many_arguments)]
fn update_all_stats(
    st: &mut SearchState,
    us: Color,
    ply: i32,
    best_move: Move,
    depth: Depth,
    quiets_tried: &[Move],
    captures_tried: &[Move],
    keys: &[ContKey; 3],
) {
    let bonus = stat_bonus(depth + 1);
    let malus = stat_bonus(depth);

    if best_move.is_quiet() {
        update_quiet_stats(st, us, ply, best_move, keys, bonus);
        for &m in quiets_tried {
            st.history.update_quiet(us, m, keys, -malus);
        }
    } else {
        st.history.update_capture(best_move, bonus);
    }

    for &m in captures_tried {
        st.history.update_capture(m, -malus);
    }
}
