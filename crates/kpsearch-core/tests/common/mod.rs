//! 結合テスト共通の補助関数

#![allow(dead_code)]

use std::sync::{Arc, LazyLock};

use kpsearch_core::eval::{EvalParameters, ThreePieceEvaluator};
use kpsearch_core::movegen::{generate_legal, MoveList};
use kpsearch_core::position::Position;
use kpsearch_core::types::Move;
use rand::Rng;

static PARAMS: LazyLock<Arc<EvalParameters>> =
    LazyLock::new(|| Arc::new(EvalParameters::random(0x5eed)));

static THREE_PIECE: LazyLock<Arc<ThreePieceEvaluator>> =
    LazyLock::new(|| Arc::new(ThreePieceEvaluator::random(0x7a11)));

pub fn params() -> Arc<EvalParameters> {
    Arc::clone(&PARAMS)
}

pub fn three_piece() -> Arc<ThreePieceEvaluator> {
    Arc::clone(&THREE_PIECE)
}

pub fn position(sfen: &str) -> Position {
    let mut pos = Position::new();
    pos.set_sfen(sfen).unwrap();
    pos
}

pub fn legal_moves(pos: &Position) -> MoveList {
    let mut moves = MoveList::new();
    generate_legal(pos, &mut moves);
    moves
}

/// 合法手から一様に1手選ぶ（合法手がなければ None）
pub fn random_legal_move<R: Rng>(rng: &mut R, pos: &Position) -> Option<Move> {
    let moves = legal_moves(pos);
    if moves.is_empty() {
        None
    } else {
        Some(moves.as_slice()[rng.random_range(0..moves.len())])
    }
}

/// 平手から乱数で指し進めた局面列（初期局面を含む）
pub fn random_trajectory<R: Rng>(rng: &mut R, start: &Position, max_plies: usize) -> Vec<Position> {
    let mut pos = start.clone();
    let mut out = vec![pos.clone()];
    for _ in 0..max_plies {
        let Some(m) = random_legal_move(rng, &pos) else {
            break;
        };
        pos.do_move(m);
        out.push(pos.clone());
    }
    out
}
