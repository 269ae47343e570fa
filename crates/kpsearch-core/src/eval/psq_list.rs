//! PsqList - 玉以外の全駒の PsqPair と逆引きテーブル
//!
//! 盤上の駒は升から、手駒は「持ち主・駒種・何枚目か」から、
//! リスト内の位置を O(1) で引ける。指し手ごとに書き換わるのは
//! 動いた駒と取られた駒のエントリだけで、リストの長さは変わらない
//! （取られた駒は盤上のエントリから手駒のエントリに置き換わる）。
//!
//! 手駒の枚数はリスト自身が保持するため、`make_move` / `unmake_move` に
//! 局面を渡す必要はない。

use super::psq::{PsqIndex, PsqLocation, PsqPair};
use crate::position::Position;
use crate::types::{Color, Hand, Move, PieceType, Square};

/// 玉以外の駒の最大数
pub const MAX_PSQ_LIST_SIZE: usize = 38;

/// 手駒の枚数の最大値 + 1（歩18枚）
const HAND_SLOTS: usize = 19;

/// 逆引きテーブルの無効値
const NO_SLOT: u8 = u8::MAX;

/// 1手で書き換わった PsqPair（HalfKP の差分更新用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangedPsq {
    /// 動いた玉の持ち主（玉の移動でなければ None）
    pub moved_king: Option<Color>,
    len: u8,
    /// 書き換わったリスト位置
    slots: [u8; 2],
    old: [PsqPair; 2],
    new: [PsqPair; 2],
}

impl ChangedPsq {
    #[inline]
    fn push(&mut self, slot: u8, old: PsqPair, new: PsqPair) {
        debug_assert!(self.len < 2, "at most two pieces change per move");
        self.slots[self.len as usize] = slot;
        self.old[self.len as usize] = old;
        self.new[self.len as usize] = new;
        self.len += 1;
    }

    /// 書き換わったエントリ数（0〜2）
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 変更前の PsqPair
    #[inline]
    pub fn old_pairs(&self) -> &[PsqPair] {
        &self.old[..self.len()]
    }

    /// 変更後の PsqPair
    #[inline]
    pub fn new_pairs(&self) -> &[PsqPair] {
        &self.new[..self.len()]
    }

    /// (変更前, 変更後) の組を列挙
    pub fn iter(&self) -> impl Iterator<Item = (PsqPair, PsqPair)> + '_ {
        self.old_pairs().iter().copied().zip(self.new_pairs().iter().copied())
    }

    /// 指し手の前のリストを、指した後のリスト `after` に変更前の値を重ねて列挙する
    ///
    /// 並び順は `make_move` を呼ぶ前のリストと同じ。
    pub fn before<'a>(&'a self, after: &'a PsqList) -> impl Iterator<Item = PsqPair> + Clone + 'a {
        let slots = &self.slots[..self.len()];
        after.iter().enumerate().map(move |(i, &pair)| {
            match slots.iter().position(|&s| s as usize == i) {
                Some(k) => self.old[k],
                None => pair,
            }
        })
    }
}

/// 玉以外の駒の PsqPair のリスト
#[derive(Clone, PartialEq, Eq)]
pub struct PsqList {
    list: [PsqPair; MAX_PSQ_LIST_SIZE],
    size: usize,
    /// 盤上逆引き: Square → リスト位置
    index: [u8; Square::NUM],
    /// 手駒逆引き: [color][hand_index][枚数] → リスト位置
    hand_index: [[[u8; HAND_SLOTS]; PieceType::HAND_NUM]; Color::NUM],
    hand: [Hand; Color::NUM],
}

impl PsqList {
    /// 局面を走査してリストを作る
    ///
    /// 先手→後手の手駒（駒種ごとに 1 枚目から）、続いて盤上の駒を升の順に並べる。
    pub fn new(pos: &Position) -> Self {
        let mut list = PsqList {
            list: [PsqPair::default(); MAX_PSQ_LIST_SIZE],
            size: 0,
            index: [NO_SLOT; Square::NUM],
            hand_index: [[[NO_SLOT; HAND_SLOTS]; PieceType::HAND_NUM]; Color::NUM],
            hand: [pos.hand(Color::Black), pos.hand(Color::White)],
        };

        for c in Color::ALL {
            for pt in PieceType::HAND_PIECES {
                for num in 1..=pos.hand(c).count(pt) {
                    let slot = list.push(PsqPair::of_hand(c, pt, num));
                    list.hand_index[c.index()][pt.hand_index()][num as usize] = slot;
                }
            }
        }

        for (sq, pc) in pos.pieces() {
            if pc.is(PieceType::King) {
                continue;
            }
            let slot = list.push(PsqPair::of_board(pc, sq));
            list.index[sq.index()] = slot;
        }

        debug_assert!(list.is_ok(), "freshly built PsqList is inconsistent");
        list
    }

    #[inline]
    fn push(&mut self, pair: PsqPair) -> u8 {
        debug_assert!(self.size < MAX_PSQ_LIST_SIZE, "PsqList overflow");
        self.list[self.size] = pair;
        self.size += 1;
        (self.size - 1) as u8
    }

    #[inline]
    fn hand_slot(&mut self, c: Color, pt: PieceType, num: u32) -> &mut u8 {
        &mut self.hand_index[c.index()][pt.hand_index()][num as usize]
    }

    /// 指し手に合わせてリストを更新する
    ///
    /// 駒を打つ手は駒台のエントリを盤上のエントリで上書きし、
    /// 駒を取る手は取られた駒のエントリを手駒のエントリで上書きする。
    /// 玉の移動そのものはリストに影響しない。
    pub fn make_move(&mut self, m: Move) -> ChangedPsq {
        debug_assert!(m.is_real_move(), "make_move() with {m:?}");

        let to = m.to();
        let piece = m.piece();
        let c = piece.color();
        let mut changed = ChangedPsq::default();

        if m.is_drop() {
            let pt = piece.piece_type();
            let num = self.hand[c.index()].count(pt);
            let slot = std::mem::replace(self.hand_slot(c, pt, num), NO_SLOT);
            debug_assert!(slot != NO_SLOT, "no hand entry for {pt:?} #{num}");
            let new = PsqPair::of_board(piece, to);
            changed.push(slot, self.list[slot as usize], new);
            self.list[slot as usize] = new;
            self.index[to.index()] = slot;
            self.hand[c.index()] = self.hand[c.index()].sub(pt);
            return changed;
        }

        let from = m.from();

        if m.is_capture() {
            let hand_type = m.captured_piece().hand_type();
            let num = self.hand[c.index()].count(hand_type) + 1;
            let slot = std::mem::replace(&mut self.index[to.index()], NO_SLOT);
            debug_assert!(slot != NO_SLOT, "no board entry on {to}");
            let new = PsqPair::of_hand(c, hand_type, num);
            changed.push(slot, self.list[slot as usize], new);
            self.list[slot as usize] = new;
            *self.hand_slot(c, hand_type, num) = slot;
            self.hand[c.index()] = self.hand[c.index()].add(hand_type);
        }

        if piece.is(PieceType::King) {
            changed.moved_king = Some(c);
        } else {
            let slot = std::mem::replace(&mut self.index[from.index()], NO_SLOT);
            debug_assert!(slot != NO_SLOT, "no board entry on {from}");
            let new = PsqPair::of_board(m.piece_after_move(), to);
            changed.push(slot, self.list[slot as usize], new);
            self.list[slot as usize] = new;
            self.index[to.index()] = slot;
        }

        changed
    }

    /// `make_move` の逆操作
    ///
    /// 直前の `make_move` と同じ指し手で呼ばなければならない。
    pub fn unmake_move(&mut self, m: Move) {
        debug_assert!(m.is_real_move(), "unmake_move() with {m:?}");

        let to = m.to();
        let piece = m.piece();
        let c = piece.color();

        if m.is_drop() {
            let pt = piece.piece_type();
            let num = self.hand[c.index()].count(pt) + 1;
            let slot = std::mem::replace(&mut self.index[to.index()], NO_SLOT);
            debug_assert!(slot != NO_SLOT, "no board entry on {to}");
            self.list[slot as usize] = PsqPair::of_hand(c, pt, num);
            *self.hand_slot(c, pt, num) = slot;
            self.hand[c.index()] = self.hand[c.index()].add(pt);
            return;
        }

        let from = m.from();

        if !piece.is(PieceType::King) {
            let slot = std::mem::replace(&mut self.index[to.index()], NO_SLOT);
            debug_assert!(slot != NO_SLOT, "no board entry on {to}");
            self.list[slot as usize] = PsqPair::of_board(piece, from);
            self.index[from.index()] = slot;
        }

        if m.is_capture() {
            let captured = m.captured_piece();
            let hand_type = captured.hand_type();
            let num = self.hand[c.index()].count(hand_type);
            let slot = std::mem::replace(self.hand_slot(c, hand_type, num), NO_SLOT);
            debug_assert!(slot != NO_SLOT, "no hand entry for {hand_type:?} #{num}");
            self.list[slot as usize] = PsqPair::of_board(captured, to);
            self.index[to.index()] = slot;
            self.hand[c.index()] = self.hand[c.index()].sub(hand_type);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[PsqPair] {
        &self.list[..self.size]
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, PsqPair> {
        self.as_slice().iter()
    }

    /// 逆引きテーブルとの整合性を確認する
    pub fn is_ok(&self) -> bool {
        if self.size > MAX_PSQ_LIST_SIZE {
            return false;
        }

        // 手駒のエントリがリスト内の正しい位置にあるか
        for c in Color::ALL {
            for pt in PieceType::HAND_PIECES {
                for num in 1..=self.hand[c.index()].count(pt) {
                    let slot = self.hand_index[c.index()][pt.hand_index()][num as usize];
                    if slot == NO_SLOT || slot as usize >= self.size {
                        return false;
                    }
                    if self.list[slot as usize].black() != PsqIndex::of_hand(c, pt, num) {
                        return false;
                    }
                }
            }
        }

        // 盤上のエントリが逆引きと一致するか
        for (i, pair) in self.as_slice().iter().enumerate() {
            match pair.black().location() {
                PsqLocation::Board(_, sq) => {
                    if self.index[sq.index()] as usize != i {
                        return false;
                    }
                }
                PsqLocation::Hand(c, pt, num) => {
                    if num > self.hand[c.index()].count(pt) {
                        return false;
                    }
                }
            }
        }

        true
    }

    /// 2つのリストが（並び順を無視して）同じ要素を持つか
    pub fn same_items(lhs: &PsqList, rhs: &PsqList) -> bool {
        if lhs.size != rhs.size {
            return false;
        }
        let mut l: Vec<PsqPair> = lhs.as_slice().to_vec();
        let mut r: Vec<PsqPair> = rhs.as_slice().to_vec();
        l.sort_by_key(|p| p.black());
        r.sort_by_key(|p| p.black());
        l == r
    }
}

impl std::fmt::Debug for PsqList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter().map(|p| p.black().location())).finish()
    }
}

impl<'a> IntoIterator for &'a PsqList {
    type Item = &'a PsqPair;
    type IntoIter = std::slice::Iter<'a, PsqPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movegen::{generate_legal, MoveList};
    use crate::position::SFEN_HIRATE;

    fn position(sfen: &str) -> Position {
        let mut pos = Position::new();
        pos.set_sfen(sfen).unwrap();
        pos
    }

    #[test]
    fn test_build_hirate() {
        let pos = position(SFEN_HIRATE);
        let list = PsqList::new(&pos);
        assert_eq!(list.len(), 38);
        assert!(list.is_ok());
    }

    #[test]
    fn test_build_bare_kings() {
        let pos = position("4k4/9/9/9/9/9/9/9/4K4 b - 1");
        let list = PsqList::new(&pos);
        assert!(list.is_empty());
        assert!(list.is_ok());
    }

    #[test]
    fn test_hand_entries_first() {
        let pos = position("4k4/9/9/9/9/9/9/9/4K4 b 2Pr 1");
        let list = PsqList::new(&pos);
        assert_eq!(list.len(), 3);
        assert_eq!(list.as_slice()[0], PsqPair::of_hand(Color::Black, PieceType::Pawn, 1));
        assert_eq!(list.as_slice()[1], PsqPair::of_hand(Color::Black, PieceType::Pawn, 2));
        assert_eq!(list.as_slice()[2], PsqPair::of_hand(Color::White, PieceType::Rook, 1));
    }

    #[test]
    fn test_make_unmake_every_move() {
        // 駒打ち・駒取り・成り・玉の移動を含む局面
        let mut pos = position(
            "l6nl/3g1kg2/2n1pp1p1/p1pps1p1p/1p5P1/P1PPSPP1P/1PSG1G3/2K4R1/LN5NL b RBSPb 1",
        );
        let base = PsqList::new(&pos);
        let mut moves = MoveList::new();
        generate_legal(&pos, &mut moves);
        assert!(!moves.is_empty());

        for &m in moves.iter() {
            let mut list = base.clone();
            let changed = list.make_move(m);
            pos.do_move(m);
            assert!(list.is_ok(), "{}", m.to_usi());
            assert!(PsqList::same_items(&list, &PsqList::new(&pos)), "{}", m.to_usi());
            assert_eq!(changed.moved_king.is_some(), m.piece().is(PieceType::King));
            pos.undo_move(m);

            list.unmake_move(m);
            assert_eq!(list, base, "{}", m.to_usi());
        }
    }

    #[test]
    fn test_changed_entries_restore_previous_list() {
        let pos = position(
            "l6nl/3g1kg2/2n1pp1p1/p1pps1p1p/1p5P1/P1PPSPP1P/1PSG1G3/2K4R1/LN5NL b RBSPb 1",
        );
        let base = PsqList::new(&pos);
        let mut moves = MoveList::new();
        generate_legal(&pos, &mut moves);

        for &m in moves.iter() {
            let mut list = base.clone();
            let changed = list.make_move(m);
            let restored: Vec<PsqPair> = changed.before(&list).collect();
            assert_eq!(restored.as_slice(), base.as_slice(), "{}", m.to_usi());
        }
    }
}
