//! 静止探索 (Quiescence Search)
//!
//! 駒を取る手（浅いうちは王手も）だけを読んで、局面が落ち着いたところで評価する。
//! 王手がかかっていれば全ての回避手を読む。

use crate::eval::material::{exchange_value, promotion_value};
use crate::position::Position;
use crate::types::{Bound, Depth, Move, Square, Value, DEPTH_QS_CHECKS, DEPTH_QS_NO_CHECKS, MAX_PLY};

use super::alpha_beta::{SearchContext, SearchState};
use super::movepicker::MovePicker;
use super::search_helpers::{check_abort, cont_keys, do_move, evaluate, undo_move, update_pv};
use super::types::{value_from_tt, value_to_tt, NodeType};

/// futility pruning で静的評価値に足す余裕
const FUTILITY_MARGIN_QS: i32 = 128;

/// 静止探索
pub(super) fn qsearch<const NT: u8>(
    st: &mut SearchState,
    ctx: &SearchContext<'_>,
    pos: &mut Position,
    depth: Depth,
    alpha: Value,
    beta: Value,
    ply: i32,
) -> Value {
    let pv_node = NT == NodeType::PV as u8;
    let in_check = pos.in_check();
    let p = ply as usize;
    let mut alpha = alpha;

    if pv_node {
        st.stack[p].pv.clear();
        if st.sel_depth < ply + 1 {
            st.sel_depth = ply + 1;
        }
    }

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
        return st.draw_scores[pos.side_to_move().index()];
    }

    // 置換表
    let tt_depth = if in_check || depth >= DEPTH_QS_CHECKS {
        DEPTH_QS_CHECKS
    } else {
        DEPTH_QS_NO_CHECKS
    };
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

    if !pv_node
        && tt_hit
        && tt_data.depth >= tt_depth
        && tt_value != Value::NONE
        && tt_data.bound.can_cutoff(tt_value, beta)
    {
        return tt_value;
    }

    if pos.win_declaration_possible() {
        return Value::mate_in(ply + 1);
    }

    // 静的評価（stand pat）
    let mut best_value;
    let futility_base;
    if in_check {
        st.stack[p].static_eval = Value::NONE;
        best_value = -Value::INFINITE;
        futility_base = -Value::INFINITE;
    } else {
        let static_eval = evaluate(st, ctx, pos, ply);
        st.stack[p].static_eval = static_eval;
        best_value = static_eval;

        if tt_value != Value::NONE
            && !tt_value.is_mate_score()
            && ((tt_value > best_value && tt_data.bound.is_lower_or_exact())
                || (tt_value < best_value && tt_data.bound.is_upper_or_exact()))
        {
            best_value = tt_value;
        }

        if best_value >= beta {
            return best_value;
        }
        if best_value > alpha {
            alpha = best_value;
        }
        futility_base = static_eval + FUTILITY_MARGIN_QS;
    }

    let last = pos.last_move();
    let recapture_square = if last.is_real_move() { last.to() } else { Square::SQ_11 };
    let mut mp = MovePicker::new_qsearch(pos, tt_move, depth, cont_keys(st, ply), recapture_square);

    let mut best_move = Move::NONE;
    let mut move_count = 0;

    loop {
        let mv = mp.next_move(pos, &st.history);
        if mv.is_none() {
            break;
        }
        if !pos.is_legal(mv) {
            continue;
        }
        move_count += 1;

        let gives_check = pos.gives_check(mv);

        // 枝刈り（王手中と王手をかける手は読む）
        if !in_check && !gives_check && !best_value.is_loss() {
            let captured = mv.captured_piece();
            let mut gain = if captured.is_none() {
                0
            } else {
                exchange_value(captured.piece_type())
            };
            if mv.is_promotion() {
                gain += promotion_value(mv.piece_type());
            }

            let futility_value = futility_base + gain;
            if futility_value <= alpha {
                best_value = best_value.max(futility_value);
                continue;
            }
            if futility_base <= alpha && !pos.see_ge(mv, Value::new(1)) {
                best_value = best_value.max(futility_base);
                continue;
            }
            if !pos.see_ge(mv, Value::ZERO) {
                continue;
            }
        }

        do_move(st, ctx, pos, mv, ply);
        let value = -qsearch::<NT>(st, ctx, pos, depth - 1, -beta, -alpha, ply + 1);
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
                if value < beta {
                    alpha = value;
                } else {
                    break;
                }
            }
        }
    }

    if in_check && move_count == 0 {
        return Value::mated_in(ply);
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
        pv_node || (tt_hit && tt_data.is_pv),
        bound,
        tt_depth,
        best_move,
        st.stack[p].static_eval,
        ctx.tt.generation(),
    );

    best_value
}

#[cfg(test)]
mod tests {
    use super::super::alpha_beta::tests::{fixture, state_for};
    use super::*;
    use crate::position::Position;

    fn position(sfen: &str) -> Position {
        let mut pos = Position::new();
        pos.set_sfen(sfen).unwrap();
        pos
    }

    #[test]
    fn test_qsearch_mated_when_no_evasion() {
        // 後手玉は金で詰んでいる
        let mut pos = position("4k4/4G4/4G4/9/9/9/9/9/4K4 w - 1");
        assert!(pos.in_check());
        let fixture = fixture();
        let ctx = fixture.context();
        let mut st = state_for(&fixture, &pos);
        let v = qsearch::<{ NodeType::PV as u8 }>(
            &mut st,
            &ctx,
            &mut pos,
            0,
            -Value::INFINITE,
            Value::INFINITE,
            0,
        );
        assert_eq!(v, Value::mated_in(0));
    }

    #[test]
    fn test_qsearch_searches_checking_capture() {
        // 飛車を取る手は王手になるので枝刈りされずに読まれる
        let mut pos = position("4k4/9/9/9/4r4/9/9/4R4/4K4 b - 1");
        let fixture = fixture();
        let ctx = fixture.context();
        let mut st = state_for(&fixture, &pos);
        let stand_pat = evaluate(&st, &ctx, &pos, 0);
        let v = qsearch::<{ NodeType::PV as u8 }>(
            &mut st,
            &ctx,
            &mut pos,
            0,
            -Value::INFINITE,
            Value::INFINITE,
            0,
        );
        assert!(v >= stand_pat);
        assert!(st.nodes > 0);
        // 局面は元に戻っている
        assert_eq!(pos.to_sfen(), "4k4/9/9/9/4r4/9/9/4R4/4K4 b - 1");
    }
}
