//! 探索ノードで共通に使う補助関数
//!
//! 指し手の実行と評価値内訳の差分更新、中断判定、PV の更新など。

use crate::eval::PsqControlList;
use crate::position::Position;
use crate::types::{Move, PieceType, Value};

use super::alpha_beta::{SearchContext, SearchState};
use super::history::ContKey;

// =============================================================================
// 指し手の実行
// =============================================================================

/// 指し手を進め、子ノードの評価値内訳を差分で求める
///
/// `ply` は指す側のノードの ply。子ノードのフレームは `ply + 1` に書き込む。
pub(super) fn do_move(
    st: &mut SearchState,
    ctx: &SearchContext<'_>,
    pos: &mut Position,
    mv: Move,
    ply: i32,
) {
    let p = ply as usize;
    st.nodes += 1;
    st.stack[p].current_move = mv;
    st.stack[p].cont_key = ContKey::from_move(mv);
    pos.do_move(mv);

    let (head, tail) = st.frames.split_at_mut(p + 1);
    let prev = &head[p];
    let next = &mut tail[0];
    next.controls = PsqControlList::new(pos);
    let diff = ctx.evaluator.evaluate_difference(
        pos,
        &prev.detail,
        &prev.controls,
        &next.controls,
        &mut st.psq_list,
    );
    next.detail = prev.detail + diff;
}

/// `do_move` で進めた手を戻す
#[inline]
pub(super) fn undo_move(st: &mut SearchState, pos: &mut Position, mv: Move) {
    st.psq_list.unmake_move(mv);
    pos.undo_move(mv);
}

/// パスして手番だけを渡す（駒の配置は変わらないので内訳はそのまま引き継ぐ）
pub(super) fn do_null_move(st: &mut SearchState, pos: &mut Position, ply: i32) {
    let p = ply as usize;
    st.nodes += 1;
    st.stack[p].current_move = Move::NULL;
    st.stack[p].cont_key = ContKey::SENTINEL;

    let (head, tail) = st.frames.split_at_mut(p + 1);
    tail[0].clone_from(&head[p]);
    pos.do_null_move();
}

#[inline]
pub(super) fn undo_null_move(pos: &mut Position) {
    pos.undo_null_move();
}

/// 現局面の静的評価値（手番側から見た値）
#[inline]
pub(super) fn evaluate(
    st: &SearchState,
    ctx: &SearchContext<'_>,
    pos: &Position,
    ply: i32,
) -> Value {
    ctx.evaluator.final_score(pos, &st.frames[ply as usize].detail)
}

// =============================================================================
// 中断判定
// =============================================================================

/// 探索を打ち切るべきか
///
/// 停止要求・ノード数・思考時間を `node_check_interval` 回に1回だけ確かめる。
/// 時間の判定はメインスレッドだけが行い、超えたら全スレッドに停止を伝える。
pub(super) fn check_abort(st: &mut SearchState, ctx: &SearchContext<'_>) -> bool {
    if st.abort {
        return true;
    }

    st.calls_cnt -= 1;
    if st.calls_cnt > 0 {
        return false;
    }
    let interval = ctx.options.node_check_interval.max(1);
    st.calls_cnt = if ctx.limits.nodes > 0 {
        std::cmp::min(interval, (ctx.limits.nodes / 1024) as i32).max(1)
    } else {
        interval
    };

    if ctx.stop.load(std::sync::atomic::Ordering::Relaxed) {
        st.abort = true;
        return true;
    }

    if ctx.limits.nodes > 0 && st.nodes >= ctx.limits.nodes {
        log::trace!("thread {}: node limit reached ({})", ctx.thread_id, st.nodes);
        st.abort = true;
        return true;
    }

    if ctx.thread_id == 0 && ctx.limits.movetime > 0 {
        let elapsed = ctx.start.elapsed().as_millis() as u64;
        if elapsed >= ctx.limits.movetime {
            log::trace!("movetime reached ({elapsed} ms)");
            ctx.stop.store(true, std::sync::atomic::Ordering::Relaxed);
            st.abort = true;
            return true;
        }
    }

    false
}

// =============================================================================
// スタック操作
// =============================================================================

/// 1, 2, 4 手前の手の ContinuationHistory キー（さかのぼれなければ番兵）
#[inline]
pub(super) fn cont_keys(st: &SearchState, ply: i32) -> [ContKey; 3] {
    let key = |back: i32| {
        if ply >= back {
            st.stack[(ply - back) as usize].cont_key
        } else {
            ContKey::SENTINEL
        }
    };
    [key(1), key(2), key(4)]
}

/// 子ノードの読み筋の前に `mv` をつないでこのノードの読み筋にする
pub(super) fn update_pv(st: &mut SearchState, ply: i32, mv: Move) {
    let p = ply as usize;
    let (head, tail) = st.stack.split_at_mut(p + 1);
    let pv = &mut head[p].pv;
    pv.clear();
    pv.push(mv);
    pv.extend_from_slice(&tail[0].pv);
}

/// 歩と玉以外の駒を盤上か手駒に持っているか（null move の条件）
pub(super) fn has_non_pawn_material(pos: &Position) -> bool {
    let us = pos.side_to_move();
    let hand = pos.hand(us);
    if PieceType::HAND_PIECES
        .iter()
        .any(|&pt| pt != PieceType::Pawn && hand.count(pt) > 0)
    {
        return true;
    }
    pos.pieces().any(|(_, pc)| {
        pc.color() == us && !matches!(pc.piece_type(), PieceType::Pawn | PieceType::King)
    })
}
