//! 指し手の妥当性判定
//!
//! - `pseudo_legal`: 駒の動きとして正しいか（置換表・キラー手の検証用）
//! - `is_legal`: 自玉に王手がかからないか、打ち歩詰めでないか
//! - `gives_check`: 相手玉に王手をかけるか

use crate::types::{Color, Move, Piece, PieceType, Rank, Square};

use super::Position;
use super::attacks::{attacks_square, for_each_attacker, is_attacked, ALL_DIRECTIONS};

/// 行き所のない升か（歩・香は最奥段、桂は奥2段）
#[inline]
pub(crate) fn is_dead_square(pt: PieceType, c: Color, to: Square) -> bool {
    let r = to.rank().relative(c) as u8;
    match pt {
        PieceType::Pawn | PieceType::Lance => r == Rank::Rank1 as u8,
        PieceType::Knight => r <= Rank::Rank2 as u8,
        _ => false,
    }
}

impl Position {
    // =========================================================================
    // 二歩
    // =========================================================================

    /// `c` の歩がその筋にあるか
    pub(crate) fn has_pawn_on_file(&self, c: Color, sq: Square) -> bool {
        let pawn = Piece::new(c, PieceType::Pawn);
        let base = sq.file() as usize * 9;
        self.board[base..base + 9].contains(&pawn)
    }

    // =========================================================================
    // pseudo-legal
    // =========================================================================

    /// 指し手がこの局面で pseudo-legal か
    ///
    /// 駒情報（動かす駒・取る駒）まで盤面と一致することを確認する。
    /// 自玉の安全は見ない。
    pub fn pseudo_legal(&self, m: Move) -> bool {
        if !m.is_real_move() {
            return false;
        }
        let us = self.side_to_move;
        let pc = m.piece();
        if pc.is_none() || pc.color() != us {
            return false;
        }
        let to = m.to();

        if m.is_drop() {
            let pt = pc.piece_type();
            if pt.hand_index() >= PieceType::HAND_NUM
                || m != Move::new_drop(us, pt, to)
                || !self.hand(us).has(pt)
                || self.piece_on(to).is_some()
                || is_dead_square(pt, us, to)
            {
                return false;
            }
            return pt != PieceType::Pawn || !self.has_pawn_on_file(us, to);
        }

        let from = m.from();
        if from == to || self.piece_on(from) != pc {
            return false;
        }
        let captured = self.piece_on(to);
        if captured != m.captured_piece() {
            return false;
        }
        if captured.is_some() && captured.color() == us {
            return false;
        }
        let pt = pc.piece_type();
        if m.is_promotion() {
            if !pt.can_promote()
                || !(from.rank().can_promote(us) || to.rank().can_promote(us))
            {
                return false;
            }
        } else if is_dead_square(pt, us, to) {
            return false;
        }
        attacks_square(&self.view(), pc, from, to)
    }

    // =========================================================================
    // 合法性
    // =========================================================================

    /// pseudo-legal な指し手が合法か
    pub fn is_legal(&self, m: Move) -> bool {
        let us = self.side_to_move;
        let to = m.to();
        let moved = m.piece_after_move();

        if m.is_drop() {
            // 駒打ちで自玉に王手がかかることはないが、王手中なら合駒になっている必要がある
            if self.in_check() {
                let view = |sq: Square| if sq == to { moved } else { self.board[sq.index()] };
                if let Some(ksq) = self.king_square(us) {
                    if is_attacked(&view, ksq, !us) {
                        return false;
                    }
                }
            }
            if m.drop_piece_type() == PieceType::Pawn && self.is_pawn_drop_mate(to) {
                return false;
            }
            return true;
        }

        let from = m.from();
        let view = |sq: Square| {
            if sq == to {
                moved
            } else if sq == from {
                Piece::NONE
            } else {
                self.board[sq.index()]
            }
        };
        let ksq = if m.piece_type() == PieceType::King {
            Some(to)
        } else {
            self.king_square(us)
        };
        match ksq {
            Some(ksq) => !is_attacked(&view, ksq, !us),
            None => true,
        }
    }

    /// 指し手が相手玉に王手をかけるか（開き王手を含む）
    pub fn gives_check(&self, m: Move) -> bool {
        let us = self.side_to_move;
        let Some(eksq) = self.king_square(!us) else {
            return false;
        };
        let to = m.to();
        let moved = m.piece_after_move();
        let from = if m.is_drop() { None } else { Some(m.from()) };
        let view = |sq: Square| {
            if sq == to {
                moved
            } else if Some(sq) == from {
                Piece::NONE
            } else {
                self.board[sq.index()]
            }
        };
        is_attacked(&view, eksq, us)
    }

    /// `to` に歩を打つと打ち歩詰めになるか
    pub(crate) fn is_pawn_drop_mate(&self, to: Square) -> bool {
        let us = self.side_to_move;
        let them = !us;
        let Some(eksq) = self.king_square(them) else {
            return false;
        };
        // 歩が玉の正面に打たれる場合のみ王手
        let front = match us {
            Color::Black => to.offset(0, -1),
            Color::White => to.offset(0, 1),
        };
        if front != Some(eksq) {
            return false;
        }
        let pawn = Piece::new(us, PieceType::Pawn);

        // 玉以外の駒で歩を取れるか（取った後に自玉が素抜かれないこと）
        let after_drop = |sq: Square| if sq == to { pawn } else { self.board[sq.index()] };
        let mut can_capture = false;
        for_each_attacker(&after_drop, to, them, |from, pc| {
            if can_capture || pc.piece_type() == PieceType::King {
                return;
            }
            let after_capture = |sq: Square| {
                if sq == to {
                    pc
                } else if sq == from {
                    Piece::NONE
                } else {
                    self.board[sq.index()]
                }
            };
            if !is_attacked(&after_capture, eksq, us) {
                can_capture = true;
            }
        });
        if can_capture {
            return false;
        }

        // 玉が逃げられるか（歩を取る手を含む）
        let king = Piece::new(them, PieceType::King);
        for &(df, dr) in ALL_DIRECTIONS {
            let Some(dest) = eksq.offset(df, dr) else {
                continue;
            };
            let occupant = after_drop(dest);
            if occupant.is_some() && occupant.color() == them {
                continue;
            }
            let after_escape = |sq: Square| {
                if sq == dest {
                    king
                } else if sq == eksq {
                    Piece::NONE
                } else {
                    after_drop(sq)
                }
            };
            if !is_attacked(&after_escape, dest, us) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::SFEN_HIRATE;

    fn pos_from(sfen: &str) -> Position {
        let mut pos = Position::new();
        pos.set_sfen(sfen).unwrap();
        pos
    }

    #[test]
    fn test_pseudo_legal_basic() {
        let pos = pos_from(SFEN_HIRATE);
        let m = pos.move_from_usi("7g7f").unwrap();
        assert!(pos.pseudo_legal(m));
        assert!(pos.is_legal(m));
        // 飛車は味方の駒を飛び越えられない
        let bad = pos.move_from_usi("2h2c").unwrap();
        assert!(!pos.pseudo_legal(bad));
        // 相手の手番の駒は動かせない
        let theirs = pos.move_from_usi("3c3d").unwrap();
        assert!(!pos.pseudo_legal(theirs));
        assert!(!pos.pseudo_legal(Move::NONE));
        assert!(!pos.pseudo_legal(Move::NULL));
    }

    #[test]
    fn test_double_pawn_drop_rejected() {
        let pos = pos_from("4k4/9/9/9/9/9/4P4/9/4K4 b P 1");
        let drop = pos.move_from_usi("P*5e").unwrap();
        assert!(!pos.pseudo_legal(drop));
        let ok = pos.move_from_usi("P*4e").unwrap();
        assert!(pos.pseudo_legal(ok));
    }

    #[test]
    fn test_pinned_piece_is_illegal() {
        // 5八の金が5二の飛車にピンされている
        let pos = pos_from("4k4/4r4/9/9/9/9/9/4G4/4K4 b - 1");
        let m = pos.move_from_usi("5h4h").unwrap();
        assert!(pos.pseudo_legal(m));
        assert!(!pos.is_legal(m));
        let along = pos.move_from_usi("5h5g").unwrap();
        assert!(pos.is_legal(along));
    }

    #[test]
    fn test_pawn_drop_mate() {
        // 1一の玉、2一は自駒で塞がり、1二の歩と2二は2三の金が支えている
        let pos = pos_from("7lk/9/7G1/9/9/9/9/9/4K4 b P 1");
        let m = pos.move_from_usi("P*1b").unwrap();
        assert!(pos.pseudo_legal(m));
        assert!(pos.gives_check(m));
        assert!(!pos.is_legal(m));

        // 金がなければ玉で取れるので合法
        let pos = pos_from("8k/9/9/9/9/9/9/9/4K4 b P 1");
        let m = pos.move_from_usi("P*1b").unwrap();
        assert!(pos.is_legal(m));
    }

    #[test]
    fn test_discovered_check() {
        // 5九の香の前の銀が動くと開き王手
        let pos = pos_from("4k4/9/9/9/9/9/9/4S4/4L3K b - 1");
        let m = pos.move_from_usi("5h4g").unwrap();
        assert!(pos.gives_check(m));
    }
}
