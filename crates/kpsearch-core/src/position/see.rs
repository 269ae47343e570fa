//! 静的交換評価（SEE）
//!
//! 移動先の升での駒の取り合いを、安い駒から順に取り返すとして評価する。
//! 取り合いの途中で利きが通る遠方駒（X線）は、取り除いた升を空として
//! 利きを引き直すことで自然に扱う。

use crate::eval::material::{exchange_order, exchange_value, promotion_value};
use crate::types::{Color, Move, Piece, Square, Value};

use super::Position;
use super::attacks::for_each_attacker;

/// 取り合いの最大手数
const MAX_SWAP: usize = 40;

#[inline]
fn bit(sq: Square) -> u128 {
    1u128 << sq.index()
}

impl Position {
    /// 取り除いた升を空として `sq` への `by` 側の最も安い利き駒を探す
    fn least_valuable_attacker(
        &self,
        sq: Square,
        by: Color,
        removed: u128,
    ) -> Option<(Square, Piece)> {
        let view = |s: Square| {
            if removed & bit(s) != 0 { Piece::NONE } else { self.board[s.index()] }
        };
        let mut best: Option<(Square, Piece)> = None;
        for_each_attacker(&view, sq, by, |s, pc| {
            let better = match best {
                None => true,
                Some((_, b)) => exchange_order(pc.piece_type()) < exchange_order(b.piece_type()),
            };
            if better {
                best = Some((s, pc));
            }
        });
        best
    }

    /// 指し手の静的交換評価値（駒交換の価値の単位）
    pub fn see(&self, m: Move) -> i32 {
        let to = m.to();
        let us = self.side_to_move;
        let mut removed = 0u128;
        if !m.is_drop() {
            removed |= bit(m.from());
        }

        let mut gain = [0i32; MAX_SWAP];
        let captured = m.captured_piece();
        gain[0] = if captured.is_some() { exchange_value(captured.piece_type()) } else { 0 };
        if m.is_promotion() {
            gain[0] += promotion_value(m.piece_type());
        }

        let mut on_square = m.piece_after_move();
        let mut side = !us;
        let mut d = 0;
        while d + 1 < MAX_SWAP {
            let Some((sq, attacker)) = self.least_valuable_attacker(to, side, removed) else {
                break;
            };
            let next_removed = removed | bit(sq);
            // 玉は取り返される升には入れない
            if attacker.piece_type() == crate::types::PieceType::King
                && self.least_valuable_attacker(to, !side, next_removed).is_some()
            {
                break;
            }
            d += 1;
            gain[d] = exchange_value(on_square.piece_type()) - gain[d - 1];
            removed = next_removed;
            on_square = attacker;
            side = !side;
        }
        while d > 0 {
            gain[d - 1] = -(-gain[d - 1]).max(gain[d]);
            d -= 1;
        }
        gain[0]
    }

    /// SEE が `threshold` 以上か
    #[inline]
    pub fn see_ge(&self, m: Move, threshold: Value) -> bool {
        self.see(m) >= threshold.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PieceType;

    fn pos_from(sfen: &str) -> Position {
        let mut pos = Position::new();
        pos.set_sfen(sfen).unwrap();
        pos
    }

    #[test]
    fn test_see_free_capture() {
        let pos = pos_from("4k4/9/9/4p4/9/4R4/9/9/4K4 b - 1");
        let m = pos.move_from_usi("5f5d").unwrap();
        assert_eq!(pos.see(m), exchange_value(PieceType::Pawn));
    }

    #[test]
    fn test_see_defended_pawn() {
        // 5四の歩は5三の金に守られている
        let pos = pos_from("4k4/9/4g4/4p4/9/4R4/9/9/4K4 b - 1");
        let m = pos.move_from_usi("5f5d").unwrap();
        let expected = exchange_value(PieceType::Pawn) - exchange_value(PieceType::Rook);
        assert_eq!(pos.see(m), expected);
        assert!(!pos.see_ge(m, Value::ZERO));
    }

    #[test]
    fn test_see_xray() {
        // 飛車の後ろの香が取り返しに参加する
        let pos = pos_from("4k4/9/4g4/4p4/9/4R4/4L4/9/4K4 b - 1");
        let m = pos.move_from_usi("5f5d").unwrap();
        // 飛で歩を取り、金で飛を取られ、香で金を取り返す
        let pawn = exchange_value(PieceType::Pawn);
        let rook = exchange_value(PieceType::Rook);
        let gold = exchange_value(PieceType::Gold);
        assert_eq!(pos.see(m), (pawn - rook + gold).min(pawn));
    }
}
