//! 局面本体（Position）

use crate::types::{Color, Hand, Move, Piece, PieceType, Square};

use super::attacks::for_each_attacker;
use super::board_effect::BoardEffects;
use super::state::{Checkers, StateInfo};
use super::zobrist::{zobrist_hand, zobrist_psq, zobrist_side};

/// 局面
///
/// 81升の盤面配列と手駒、手番、状態スタックを持つ。
/// 盤面・手駒・Zobristキー・利き数は `do_move` / `undo_move` 系を通じてのみ更新し、
/// 常に互いに整合させる。
#[derive(Clone)]
pub struct Position {
    pub(super) board: [Piece; Square::NUM],
    pub(super) hands: [Hand; Color::NUM],
    pub(super) side_to_move: Color,
    pub(super) king_square: [Option<Square>; Color::NUM],
    pub(super) effects: BoardEffects,
    pub(super) game_ply: i32,
    pub(super) states: Vec<StateInfo>,
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl Position {
    /// 空の局面（駒なし、先手番）
    pub fn new() -> Self {
        Position {
            board: [Piece::NONE; Square::NUM],
            hands: [Hand::EMPTY; Color::NUM],
            side_to_move: Color::Black,
            king_square: [None; Color::NUM],
            effects: BoardEffects::default(),
            game_ply: 1,
            states: vec![StateInfo::default()],
        }
    }

    // =========================================================================
    // 参照
    // =========================================================================

    #[inline]
    pub fn piece_on(&self, sq: Square) -> Piece {
        self.board[sq.index()]
    }

    #[inline]
    pub fn hand(&self, c: Color) -> Hand {
        self.hands[c.index()]
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// 玉の升（玉がない局面では None）
    #[inline]
    pub fn king_square(&self, c: Color) -> Option<Square> {
        self.king_square[c.index()]
    }

    /// 両方の玉が盤上にあるか
    #[inline]
    pub fn has_both_kings(&self) -> bool {
        self.king_square[0].is_some() && self.king_square[1].is_some()
    }

    /// 手数（初期局面が1）
    #[inline]
    pub fn game_ply(&self) -> i32 {
        self.game_ply
    }

    #[inline]
    pub fn state(&self) -> &StateInfo {
        // 状態スタックは常に1つ以上ある
        &self.states[self.states.len() - 1]
    }

    #[inline]
    pub fn key(&self) -> u64 {
        self.state().key
    }

    #[inline]
    pub fn in_check(&self) -> bool {
        self.state().checkers.count > 0
    }

    #[inline]
    pub fn checkers(&self) -> Checkers {
        self.state().checkers
    }

    /// 直前の手（初期局面では NONE）
    #[inline]
    pub fn last_move(&self) -> Move {
        self.state().last_move
    }

    /// 直前の手で取られた駒
    #[inline]
    pub fn captured_piece(&self) -> Piece {
        self.state().captured
    }

    /// 差分更新されている升ごとの利き数
    #[inline]
    pub fn effects(&self) -> &BoardEffects {
        &self.effects
    }

    /// 盤面を `Fn(Square) -> Piece` として参照する
    #[inline]
    pub(crate) fn view(&self) -> impl Fn(Square) -> Piece + '_ {
        move |sq| self.board[sq.index()]
    }

    /// 盤上の駒（升と駒）を升の順に列挙する
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| {
            let pc = self.board[sq.index()];
            pc.is_some().then_some((sq, pc))
        })
    }

    /// 指定升の駒を取り、動かした駒で指し手を組み立てる
    pub fn make_move(&self, from: Square, to: Square, promote: bool) -> Move {
        Move::new_move(from, to, promote, self.piece_on(from), self.piece_on(to))
    }

    /// 指定駒種を打つ手
    pub fn make_drop(&self, pt: PieceType, to: Square) -> Move {
        Move::new_drop(self.side_to_move, pt, to)
    }

    /// USI形式の指し手文字列を、この局面での指し手に変換する（合法性は見ない）
    pub fn move_from_usi(&self, s: &str) -> Option<Move> {
        let bytes = s.as_bytes();
        if bytes.len() < 4 {
            return None;
        }
        let to = Square::from_usi(s.get(2..4)?)?;
        if bytes[1] == b'*' {
            let pt = PieceType::from_sfen_char(bytes[0] as char)?;
            if pt == PieceType::King {
                return None;
            }
            return Some(self.make_drop(pt, to));
        }
        let from = Square::from_usi(s.get(0..2)?)?;
        let promote = match bytes.get(4) {
            None => false,
            Some(b'+') => true,
            Some(_) => return None,
        };
        if self.piece_on(from).is_none() {
            return None;
        }
        Some(self.make_move(from, to, promote))
    }

    // =========================================================================
    // 配置（SFEN読み込み用）
    // =========================================================================

    pub(super) fn put_piece(&mut self, pc: Piece, sq: Square) {
        debug_assert!(self.board[sq.index()].is_none());
        self.board[sq.index()] = pc;
        if pc.piece_type() == PieceType::King {
            self.king_square[pc.color().index()] = Some(sq);
        }
    }

    pub(super) fn clear(&mut self) {
        *self = Position::new();
    }

    /// 盤面・手駒・手番からキーと王手情報を作り直す
    pub(super) fn reset_state(&mut self) {
        let mut key = 0u64;
        for (sq, pc) in self.pieces() {
            key ^= zobrist_psq(pc, sq);
        }
        for c in Color::ALL {
            for pt in PieceType::HAND_PIECES {
                key ^= zobrist_hand(c, pt, self.hands[c.index()].count(pt));
            }
        }
        if self.side_to_move == Color::White {
            key ^= zobrist_side();
        }
        let checkers = self.compute_checkers(self.side_to_move);
        self.effects = BoardEffects::from_board(&self.board);
        self.states.clear();
        self.states.push(StateInfo {
            key,
            captured: Piece::NONE,
            last_move: Move::NONE,
            checkers,
            plies_from_null: 0,
        });
    }

    /// 手番 `us` の玉に利いている相手の駒
    fn compute_checkers(&self, us: Color) -> Checkers {
        let mut checkers = Checkers::default();
        if let Some(ksq) = self.king_square(us) {
            for_each_attacker(&self.view(), ksq, !us, |sq, _| {
                if checkers.square.is_none() {
                    checkers.square = Some(sq);
                }
                checkers.count += 1;
            });
        }
        checkers
    }

    // =========================================================================
    // 手の実行・巻き戻し
    // =========================================================================

    /// 指し手を実行する（`m` は pseudo-legal かつ合法であること）
    pub fn do_move(&mut self, m: Move) {
        debug_assert!(m.is_real_move(), "do_move called with {m:?}");
        debug_assert!(m.piece().color() == self.side_to_move);

        let us = self.side_to_move;
        let to = m.to();
        let prev = *self.state();
        let mut key = prev.key;
        let mut captured = Piece::NONE;

        if m.is_drop() {
            let pt = m.drop_piece_type();
            let hand = self.hands[us.index()];
            let n = hand.count(pt);
            debug_assert!(n > 0, "dropping a piece that is not in hand: {m}");
            key ^= zobrist_hand(us, pt, n) ^ zobrist_hand(us, pt, n - 1);
            self.hands[us.index()] = hand.sub(pt);
            let pc = Piece::new(us, pt);
            let touched = self.effects.detach(&self.board, &[to]);
            self.board[to.index()] = pc;
            self.effects.attach(&self.board, &touched);
            key ^= zobrist_psq(pc, to);
        } else {
            let from = m.from();
            let pc = self.board[from.index()];
            debug_assert_eq!(pc, m.piece(), "moved piece mismatch: {m}");
            captured = self.board[to.index()];
            debug_assert_eq!(captured, m.captured_piece(), "captured piece mismatch: {m}");

            if captured.is_some() {
                key ^= zobrist_psq(captured, to);
                let ht = captured.hand_type();
                if ht == PieceType::King {
                    self.king_square[captured.color().index()] = None;
                } else {
                    let hand = self.hands[us.index()];
                    let n = hand.count(ht);
                    key ^= zobrist_hand(us, ht, n) ^ zobrist_hand(us, ht, n + 1);
                    self.hands[us.index()] = hand.add(ht);
                }
            }

            let after = m.piece_after_move();
            let touched = self.effects.detach(&self.board, &[from, to]);
            self.board[from.index()] = Piece::NONE;
            self.board[to.index()] = after;
            self.effects.attach(&self.board, &touched);
            key ^= zobrist_psq(pc, from) ^ zobrist_psq(after, to);
            if pc.piece_type() == PieceType::King {
                self.king_square[us.index()] = Some(to);
            }
        }

        key ^= zobrist_side();
        self.side_to_move = !us;
        self.game_ply += 1;
        let checkers = self.compute_checkers(!us);
        self.states.push(StateInfo {
            key,
            captured,
            last_move: m,
            checkers,
            plies_from_null: prev.plies_from_null + 1,
        });
    }

    /// 指し手を巻き戻す（直前の `do_move` と同じ手を渡すこと）
    pub fn undo_move(&mut self, m: Move) {
        debug_assert!(self.states.len() > 1, "undo_move without do_move");
        debug_assert_eq!(self.state().last_move, m, "undo_move order violation");

        let st = self.states.pop().unwrap_or_default();
        let us = !self.side_to_move;
        self.side_to_move = us;
        self.game_ply -= 1;
        let to = m.to();

        if m.is_drop() {
            let pt = m.drop_piece_type();
            let touched = self.effects.detach(&self.board, &[to]);
            self.board[to.index()] = Piece::NONE;
            self.effects.attach(&self.board, &touched);
            self.hands[us.index()] = self.hands[us.index()].add(pt);
        } else {
            let from = m.from();
            let pc = m.piece();
            let touched = self.effects.detach(&self.board, &[from, to]);
            self.board[from.index()] = pc;
            self.board[to.index()] = st.captured;
            self.effects.attach(&self.board, &touched);
            if pc.piece_type() == PieceType::King {
                self.king_square[us.index()] = Some(from);
            }
            if st.captured.is_some() {
                let ht = st.captured.hand_type();
                if ht == PieceType::King {
                    self.king_square[st.captured.color().index()] = Some(to);
                } else {
                    self.hands[us.index()] = self.hands[us.index()].sub(ht);
                }
            }
        }
    }

    /// null move（手番だけを渡す）を実行する
    pub fn do_null_move(&mut self) {
        debug_assert!(!self.in_check(), "null move while in check");
        let prev = *self.state();
        self.side_to_move = !self.side_to_move;
        self.states.push(StateInfo {
            key: prev.key ^ zobrist_side(),
            captured: Piece::NONE,
            last_move: Move::NULL,
            checkers: Checkers::default(),
            plies_from_null: 0,
        });
    }

    /// null move を巻き戻す
    pub fn undo_null_move(&mut self) {
        debug_assert!(self.state().last_move.is_null());
        self.states.pop();
        self.side_to_move = !self.side_to_move;
    }

    // =========================================================================
    // 千日手・宣言勝ち
    // =========================================================================

    /// 探索経路上で同一局面が現れたか（null move をまたがない）
    pub fn is_repetition(&self) -> bool {
        let st = self.state();
        let n = self.states.len();
        let mut i = 4;
        while i <= st.plies_from_null as usize && i < n {
            if self.states[n - 1 - i].key == st.key {
                return true;
            }
            i += 2;
        }
        false
    }

    /// 入玉宣言勝ちの条件（27点法）を満たしているか
    ///
    /// - 玉が敵陣三段目以内にいて、王手されていない
    /// - 玉以外の自駒が敵陣に10枚以上ある
    /// - 敵陣の駒と手駒の点数（大駒5点、小駒1点）が先手28点・後手27点以上
    pub fn win_declaration_possible(&self) -> bool {
        let us = self.side_to_move;
        let Some(ksq) = self.king_square(us) else {
            return false;
        };
        if !ksq.rank().can_promote(us) || self.in_check() {
            return false;
        }
        let big = |pt: PieceType| {
            matches!(pt.unpromote(), PieceType::Bishop | PieceType::Rook)
        };
        let mut count = 0;
        let mut points = 0;
        for (sq, pc) in self.pieces() {
            if pc.color() != us || pc.piece_type() == PieceType::King {
                continue;
            }
            if sq.rank().can_promote(us) {
                count += 1;
                points += if big(pc.piece_type()) { 5 } else { 1 };
            }
        }
        let hand = self.hand(us);
        for pt in PieceType::HAND_PIECES {
            let n = hand.count(pt) as i32;
            points += n * if big(pt) { 5 } else { 1 };
        }
        let required = match us {
            Color::Black => 28,
            Color::White => 27,
        };
        count >= 10 && points >= required
    }
}

impl std::fmt::Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Position({})", self.to_sfen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::SFEN_HIRATE;
    use crate::types::{File, Rank};

    fn hirate() -> Position {
        let mut pos = Position::new();
        pos.set_sfen(SFEN_HIRATE).unwrap();
        pos
    }

    #[test]
    fn test_do_undo_restores_key() {
        let mut pos = hirate();
        let key = pos.key();
        let m = pos.move_from_usi("7g7f").unwrap();
        pos.do_move(m);
        assert_ne!(pos.key(), key);
        assert_eq!(pos.side_to_move(), Color::White);
        pos.undo_move(m);
        assert_eq!(pos.key(), key);
        assert_eq!(pos.to_sfen(), SFEN_HIRATE);
    }

    #[test]
    fn test_capture_goes_to_hand() {
        let mut pos = Position::new();
        pos.set_sfen("4k4/9/9/9/4p4/4P4/9/9/4K4 b - 1").unwrap();
        let m = pos.move_from_usi("5f5e").unwrap();
        assert!(m.is_capture());
        pos.do_move(m);
        assert_eq!(pos.hand(Color::Black).count(PieceType::Pawn), 1);
        let sfen_after = pos.to_sfen();
        let mut fresh = Position::new();
        fresh.set_sfen(&sfen_after).unwrap();
        assert_eq!(fresh.key(), pos.key());
        pos.undo_move(m);
        assert!(pos.hand(Color::Black).is_empty());
    }

    #[test]
    fn test_check_detection() {
        let mut pos = Position::new();
        pos.set_sfen("4k4/9/9/9/9/9/9/4r4/4K4 b - 1").unwrap();
        assert!(pos.in_check());
        assert_eq!(
            pos.checkers().square,
            Some(Square::new(File::File5, Rank::Rank8))
        );
    }

    #[test]
    fn test_null_move() {
        let mut pos = hirate();
        let key = pos.key();
        pos.do_null_move();
        assert_eq!(pos.side_to_move(), Color::White);
        assert_eq!(pos.key(), key ^ zobrist_side());
        pos.undo_null_move();
        assert_eq!(pos.key(), key);
    }

    #[test]
    fn test_repetition() {
        let mut pos = hirate();
        for usi in ["5i5h", "5a5b", "5h5i", "5b5a"] {
            let m = pos.move_from_usi(usi).unwrap();
            pos.do_move(m);
        }
        assert!(pos.is_repetition());
    }

    #[test]
    fn test_win_declaration() {
        // 敵陣に小駒11枚と飛1枚（16点）、手駒に飛角3枚（15点）
        let sfen = "K1GGGGSSS/1S1PPP3/R8/9/9/9/9/9/4k4 b R2B 1";
        let mut pos = Position::new();
        pos.set_sfen(sfen).unwrap();
        assert!(pos.win_declaration_possible());

        // 手駒がなければ点数不足
        pos.set_sfen("K1GGGGSSS/1S1PPP3/R8/9/9/9/9/9/4k4 b - 1").unwrap();
        assert!(!pos.win_declaration_possible());
    }
}
