//! 指し手生成器
//!
//! 盤上の駒の移動は、移動先に相手の駒があるかどうかで「駒を取る手」と
//! 「駒を取らない手」に分かれる。駒打ちは常に駒を取らない手。
//! 成れる手は、行き所のない升でない限り成・不成の両方を生成する。

use crate::position::{is_dead_square, Position};
use crate::position::attacks::for_each_attack;
use crate::types::{Move, PieceType, Square};

use super::types::{ExtMoveBuffer, MoveList};

/// 生成する指し手の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenType {
    /// 駒を取る手（成る手を含む）
    Captures,
    /// 駒を取らない手（駒打ちを含む）
    Quiets,
    /// 取る手と取らない手の全て（pseudo-legal）
    NonEvasions,
    /// 王手回避手（合法手のみ）
    Evasions,
    /// 駒を取らない王手
    QuietChecks,
    /// 指定升への駒を取る手
    Recaptures(Square),
    /// 全ての合法手
    Legal,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Target {
    Captures,
    Quiets,
    Both,
}

/// 盤上の駒の移動を生成する
fn generate_board_moves<F: FnMut(Move)>(pos: &Position, target: Target, mut add: F) {
    let us = pos.side_to_move();
    let view = |sq: Square| pos.piece_on(sq);
    for (from, pc) in pos.pieces() {
        if pc.color() != us {
            continue;
        }
        let pt = pc.piece_type();
        for_each_attack(&view, pc, from, |to| {
            let captured = pos.piece_on(to);
            if captured.is_some() && captured.color() == us {
                return;
            }
            match target {
                Target::Captures if captured.is_none() => return,
                Target::Quiets if captured.is_some() => return,
                _ => {}
            }
            if pt.can_promote() && (from.rank().can_promote(us) || to.rank().can_promote(us)) {
                add(Move::new_move(from, to, true, pc, captured));
            }
            if !is_dead_square(pt, us, to) {
                add(Move::new_move(from, to, false, pc, captured));
            }
        });
    }
}

/// 駒打ちを生成する
fn generate_drops<F: FnMut(Move)>(pos: &Position, mut add: F) {
    let us = pos.side_to_move();
    let hand = pos.hand(us);
    if hand.is_empty() {
        return;
    }
    for pt in PieceType::HAND_PIECES {
        if !hand.has(pt) {
            continue;
        }
        for to in Square::all() {
            if pos.piece_on(to).is_some() || is_dead_square(pt, us, to) {
                continue;
            }
            if pt == PieceType::Pawn && pos.has_pawn_on_file(us, to) {
                continue;
            }
            add(Move::new_drop(us, pt, to));
        }
    }
}

/// 指定の種類の指し手を生成する
pub fn generate_with_type(pos: &Position, gen_type: GenType, buffer: &mut ExtMoveBuffer) {
    match gen_type {
        GenType::Captures => generate_board_moves(pos, Target::Captures, |m| buffer.push_move(m)),
        GenType::Quiets => {
            generate_board_moves(pos, Target::Quiets, |m| buffer.push_move(m));
            generate_drops(pos, |m| buffer.push_move(m));
        }
        GenType::NonEvasions => {
            generate_board_moves(pos, Target::Both, |m| buffer.push_move(m));
            generate_drops(pos, |m| buffer.push_move(m));
        }
        GenType::Evasions | GenType::Legal => {
            generate_board_moves(pos, Target::Both, |m| {
                if pos.is_legal(m) {
                    buffer.push_move(m);
                }
            });
            generate_drops(pos, |m| {
                if pos.is_legal(m) {
                    buffer.push_move(m);
                }
            });
        }
        GenType::QuietChecks => {
            generate_board_moves(pos, Target::Quiets, |m| {
                if pos.gives_check(m) {
                    buffer.push_move(m);
                }
            });
            generate_drops(pos, |m| {
                if pos.gives_check(m) {
                    buffer.push_move(m);
                }
            });
        }
        GenType::Recaptures(sq) => generate_board_moves(pos, Target::Captures, |m| {
            if m.to() == sq {
                buffer.push_move(m);
            }
        }),
    }
}

/// 全ての pseudo-legal な手を生成する
pub fn generate_all(pos: &Position, buffer: &mut ExtMoveBuffer) {
    generate_with_type(pos, GenType::NonEvasions, buffer);
}

/// 合法手を列挙する
pub fn generate_legal(pos: &Position, list: &mut MoveList) {
    let mut buffer = ExtMoveBuffer::new();
    generate_with_type(pos, GenType::Legal, &mut buffer);
    for ext in buffer.iter() {
        list.push(ext.mv);
    }
}
