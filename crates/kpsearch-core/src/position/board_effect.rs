//! 升ごとの利き数
//!
//! `Position` は利き数を常に持ち、`do_move` / `undo_move` のたびに差分で更新する。
//! 駒の有無が変わった升に置かれていた駒・置かれた駒と、その升を通る飛び駒だけを
//! いったん外してから付け直す。歩や桂のような跳ばない駒の利きは遮られないので、
//! 変化した升の駒以外は触らない。

use crate::types::{Color, Piece, Square};

use super::Position;
use super::attacks::{ALL_DIRECTIONS, for_each_attack, oriented, slide_deltas};

/// 升ごと・手番ごとの利きの数
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BoardEffects {
    counts: [[u8; Square::NUM]; Color::NUM],
}

/// 利きを付け直す駒の升（駒の有無が変わった升と、そこを通る飛び駒）
///
/// 変化する升は最大2つ、それぞれに8方向から飛び駒が届く。
pub(super) struct Touched {
    squares: [Square; 18],
    len: usize,
}

impl Touched {
    fn push(&mut self, sq: Square) {
        if !self.as_slice().contains(&sq) {
            self.squares[self.len] = sq;
            self.len += 1;
        }
    }

    fn as_slice(&self) -> &[Square] {
        &self.squares[..self.len]
    }
}

impl Default for BoardEffects {
    fn default() -> Self {
        BoardEffects {
            counts: [[0; Square::NUM]; Color::NUM],
        }
    }
}

impl BoardEffects {
    /// 盤面全体を走査して利き数を数える
    pub fn compute(pos: &Position) -> Self {
        Self::from_board(&pos.board)
    }

    pub(super) fn from_board(board: &[Piece; Square::NUM]) -> Self {
        let mut effects = BoardEffects::default();
        for sq in Square::all() {
            effects.add_piece(board, sq);
        }
        effects
    }

    /// `c` 側から `sq` への利きの数
    #[inline]
    pub fn effect(&self, c: Color, sq: Square) -> u8 {
        self.counts[c.index()][sq.index()]
    }

    fn add_piece(&mut self, board: &[Piece; Square::NUM], sq: Square) {
        let pc = board[sq.index()];
        if pc.is_none() {
            return;
        }
        let row = &mut self.counts[pc.color().index()];
        // 片側の利きは最大でも駒数（40）に収まる
        for_each_attack(&|s: Square| board[s.index()], pc, sq, |to| row[to.index()] += 1);
    }

    fn remove_piece(&mut self, board: &[Piece; Square::NUM], sq: Square) {
        let pc = board[sq.index()];
        if pc.is_none() {
            return;
        }
        let row = &mut self.counts[pc.color().index()];
        for_each_attack(&|s: Square| board[s.index()], pc, sq, |to| row[to.index()] -= 1);
    }

    /// 盤面を書き換える前に呼ぶ。`changed` の駒と、そこを通る飛び駒の利きを外す。
    pub(super) fn detach(&mut self, board: &[Piece; Square::NUM], changed: &[Square]) -> Touched {
        let mut touched = Touched {
            squares: [Square::default(); 18],
            len: 0,
        };
        for &sq in changed {
            touched.push(sq);
        }
        for &sq in changed {
            for &(df, dr) in ALL_DIRECTIONS {
                let mut cur = sq;
                while let Some(s) = cur.offset(df, dr) {
                    let pc = board[s.index()];
                    if pc.is_some() {
                        let toward = oriented(pc.color(), (-df, -dr));
                        if slide_deltas(pc.piece_type()).contains(&toward) {
                            touched.push(s);
                        }
                        break;
                    }
                    cur = s;
                }
            }
        }
        for &sq in touched.as_slice() {
            self.remove_piece(board, sq);
        }
        touched
    }

    /// 盤面を書き換えた後に呼ぶ。`detach` で外した升の駒の利きを付け直す。
    pub(super) fn attach(&mut self, board: &[Piece; Square::NUM], touched: &Touched) {
        for &sq in touched.as_slice() {
            self.add_piece(board, sq);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::SFEN_HIRATE;
    use crate::position::attacks::count_attackers;

    #[test]
    fn test_effects_match_attacker_scan() {
        let mut pos = Position::new();
        pos.set_sfen(SFEN_HIRATE).unwrap();
        let effects = BoardEffects::compute(&pos);
        let view = pos.view();
        for sq in Square::all() {
            for c in Color::ALL {
                assert_eq!(
                    effects.effect(c, sq) as u32,
                    count_attackers(&view, sq, c),
                    "sq={sq} color={c:?}"
                );
            }
        }
    }

    #[test]
    fn test_maintained_effects_follow_slider_unblocking() {
        // 角道を開ける、飛車先の歩を取り合う、打った駒で飛車の利きを止める
        let mut pos = Position::new();
        pos.set_sfen(SFEN_HIRATE).unwrap();
        let mut played = Vec::new();
        let line = ["7g7f", "3c3d", "2g2f", "8c8d", "2f2e", "8d8e", "2e2d", "2c2d", "2h2d", "P*2c"];
        for usi in line {
            let m = pos.move_from_usi(usi).unwrap();
            pos.do_move(m);
            played.push(m);
            assert_eq!(*pos.effects(), BoardEffects::compute(&pos), "after {usi}");
        }
        while let Some(m) = played.pop() {
            pos.undo_move(m);
            assert_eq!(*pos.effects(), BoardEffects::compute(&pos), "undo {m}");
        }
        assert_eq!(pos.to_sfen(), SFEN_HIRATE);
    }

    #[test]
    fn test_maintained_effects_survive_null_move() {
        let mut pos = Position::new();
        pos.set_sfen("4k4/9/9/9/4r4/9/9/4B4/4K4 b - 1").unwrap();
        let before = pos.effects().clone();
        pos.do_null_move();
        assert_eq!(*pos.effects(), before);
        pos.undo_null_move();
        assert_eq!(*pos.effects(), BoardEffects::compute(&pos));
    }
}
