//! 手の順序付けに使う履歴統計
//!
//! ベータカットを起こした手には加点、起こさなかった手には減点して、
//! 次に同じ（似た）局面で手を並べるときの手がかりにする。
//!
//! | 表 | 添字 | 値 |
//! |---|---|---|
//! | `ButterflyHistory` | 手番, from/to | 静かな手の点数 |
//! | `PieceToHistory` | 移動後の駒, 移動先 | 静かな手の点数 |
//! | `CapturePieceToHistory` | 移動後の駒, 移動先, 取った駒 | 駒取りの点数 |
//! | `ContinuationHistory` | `ContKey`（数手前の駒と移動先）, 駒, 移動先 | 静かな手の点数 |
//! | `CounterMoveHistory` | 直前の相手の駒, 移動先 | 応手 |
//!
//! 1スレッドぶんをまとめたものが `HistoryTables`。

use crate::types::{Color, Move, Piece, PieceType, Square};

// =============================================================================
// 定数
// =============================================================================

/// from/to 添字の数（駒打ちは移動元を 81 + 手駒の添字 とみなす）
pub const FROM_TO_SIZE: usize = (Square::NUM + PieceType::HAND_NUM) * Square::NUM;

/// ButterflyHistory の上限
pub const BUTTERFLY_MAX: i32 = 7183;

/// PieceToHistory / ContinuationHistory の上限
pub const PIECE_TO_MAX: i32 = 30000;

/// CapturePieceToHistory の上限
pub const CAPTURE_MAX: i32 = 10692;

/// 取られた駒種の添字数（0 は駒なし）
const CAPTURED_NUM: usize = PieceType::NUM + 1;

// =============================================================================
// StatsEntry
// =============================================================================

/// 絶対値が `D` を超えない統計値
#[derive(Clone, Copy)]
pub struct StatsEntry<const D: i32> {
    value: i16,
}

impl<const D: i32> Default for StatsEntry<D> {
    fn default() -> Self {
        Self { value: 0 }
    }
}

impl<const D: i32> StatsEntry<D> {
    #[inline]
    pub fn get(&self) -> i16 {
        self.value
    }

    /// `bonus` を足す
    ///
    /// 現在値が ±D に近いほど同じ向きの加算は小さくなる（gravity）。
    #[inline]
    pub fn update(&mut self, bonus: i32) {
        let clamped = bonus.clamp(-D, D);
        let delta = clamped - (self.value as i32) * clamped.abs() / D;
        self.value = (self.value as i32 + delta) as i16;
        debug_assert!((self.value as i32).abs() <= D, "history value {} exceeds {D}", self.value);
    }
}

// =============================================================================
// ButterflyHistory
// =============================================================================

/// 手番と from/to ごとの静かな手の点数
pub struct ButterflyHistory {
    table: [[StatsEntry<BUTTERFLY_MAX>; FROM_TO_SIZE]; Color::NUM],
}

impl ButterflyHistory {
    pub fn new() -> Self {
        Self {
            table: [[StatsEntry::default(); FROM_TO_SIZE]; Color::NUM],
        }
    }

    #[inline]
    pub fn get(&self, color: Color, mv: Move) -> i16 {
        self.table[color.index()][mv.history_index()].get()
    }

    #[inline]
    pub fn update(&mut self, color: Color, mv: Move, bonus: i32) {
        self.table[color.index()][mv.history_index()].update(bonus);
    }

    pub fn clear(&mut self) {
        self.table.as_flattened_mut().fill(StatsEntry::default());
    }
}

impl Default for ButterflyHistory {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// PieceToHistory
// =============================================================================

/// 移動後の駒（成りを反映）と移動先ごとの点数
#[derive(Clone)]
pub struct PieceToHistory {
    table: [[StatsEntry<PIECE_TO_MAX>; Square::NUM]; Piece::NUM],
}

impl PieceToHistory {
    pub fn new() -> Self {
        Self {
            table: [[StatsEntry::default(); Square::NUM]; Piece::NUM],
        }
    }

    #[inline]
    pub fn get(&self, pc: Piece, to: Square) -> i16 {
        self.table[pc.index()][to.index()].get()
    }

    #[inline]
    pub fn update(&mut self, pc: Piece, to: Square, bonus: i32) {
        self.table[pc.index()][to.index()].update(bonus);
    }

    pub fn clear(&mut self) {
        self.table.as_flattened_mut().fill(StatsEntry::default());
    }
}

impl Default for PieceToHistory {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// CapturePieceToHistory
// =============================================================================

/// CapturePieceToHistory: [piece][to][captured_pt] -> score
pub struct CapturePieceToHistory {
    table: [[[StatsEntry<CAPTURE_MAX>; CAPTURED_NUM]; Square::NUM]; Piece::NUM],
}

impl CapturePieceToHistory {
    pub fn new() -> Self {
        Self {
            table: [[[StatsEntry::default(); CAPTURED_NUM]; Square::NUM]; Piece::NUM],
        }
    }

    /// 取られた駒の下位4bit（0=なし, 1..=14=駒種）を添字に使う
    #[inline]
    fn captured_index(captured: Piece) -> usize {
        (captured.raw() & 0x0F) as usize
    }

    #[inline]
    pub fn get(&self, pc: Piece, to: Square, captured: Piece) -> i16 {
        self.table[pc.index()][to.index()][Self::captured_index(captured)].get()
    }

    #[inline]
    pub fn update(&mut self, pc: Piece, to: Square, captured: Piece, bonus: i32) {
        self.table[pc.index()][to.index()][Self::captured_index(captured)].update(bonus);
    }

    pub fn clear(&mut self) {
        self.table.as_flattened_mut().as_flattened_mut().fill(StatsEntry::default());
    }
}

impl Default for CapturePieceToHistory {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ContinuationHistory
// =============================================================================

/// ContinuationHistory の表を選ぶキー（数手前に動いた駒とその移動先）
///
/// ルート・null move の後など、直前の手がない場合は `SENTINEL` を使う。
/// `SENTINEL` の表は参照されるが更新はされない（常に 0）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContKey {
    pub piece: Piece,
    pub to: Square,
}

impl ContKey {
    pub const SENTINEL: ContKey = ContKey {
        piece: Piece::NONE,
        to: Square::SQ_11,
    };

    /// 指し手からキーを作る（NONE / NULL は `SENTINEL`）
    #[inline]
    pub fn from_move(mv: Move) -> ContKey {
        if mv.is_real_move() {
            ContKey {
                piece: mv.piece_after_move(),
                to: mv.to(),
            }
        } else {
            ContKey::SENTINEL
        }
    }

    #[inline]
    pub fn is_sentinel(self) -> bool {
        self.piece.is_none()
    }

    #[inline]
    fn index(self) -> usize {
        self.piece.index() * Square::NUM + self.to.index()
    }
}

/// 数手前の手と今の手の組み合わせの点数
///
/// `ContKey` ごとに `PieceToHistory` を1枚持つ（ヒープ上に確保）。
pub struct ContinuationHistory {
    tables: Vec<PieceToHistory>,
}

impl ContinuationHistory {
    pub fn new() -> Self {
        Self {
            tables: vec![PieceToHistory::new(); Piece::NUM * Square::NUM],
        }
    }

    #[inline]
    pub fn table(&self, key: ContKey) -> &PieceToHistory {
        &self.tables[key.index()]
    }

    /// 値を取得
    #[inline]
    pub fn get(&self, key: ContKey, pc: Piece, to: Square) -> i16 {
        self.table(key).get(pc, to)
    }

    /// 値を更新（`SENTINEL` は更新しない）
    #[inline]
    pub fn update(&mut self, key: ContKey, pc: Piece, to: Square, bonus: i32) {
        if !key.is_sentinel() {
            self.tables[key.index()].update(pc, to, bonus);
        }
    }

    pub fn clear(&mut self) {
        for table in &mut self.tables {
            table.clear();
        }
    }
}

impl Default for ContinuationHistory {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// CounterMoveHistory
// =============================================================================

/// 直前の相手の手に対してベータカットを起こした応手
pub struct CounterMoveHistory {
    table: [[Move; Square::NUM]; Piece::NUM],
}

impl CounterMoveHistory {
    pub fn new() -> Self {
        Self {
            table: [[Move::NONE; Square::NUM]; Piece::NUM],
        }
    }

    #[inline]
    pub fn get(&self, pc: Piece, sq: Square) -> Move {
        self.table[pc.index()][sq.index()]
    }

    #[inline]
    pub fn set(&mut self, pc: Piece, sq: Square, mv: Move) {
        self.table[pc.index()][sq.index()] = mv;
    }

    pub fn clear(&mut self) {
        self.table.as_flattened_mut().fill(Move::NONE);
    }
}

impl Default for CounterMoveHistory {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// HistoryTables
// =============================================================================

/// スレッドごとの履歴表一式
///
/// 探索ワーカーが `Box` で1つずつ所有し、スレッド間では共有しない。
pub struct HistoryTables {
    pub main_history: ButterflyHistory,
    pub piece_to_history: PieceToHistory,
    pub capture_history: CapturePieceToHistory,
    pub continuation_history: ContinuationHistory,
    pub counter_moves: CounterMoveHistory,
}

impl HistoryTables {
    /// ヒープ上に確保する
    pub fn new_boxed() -> Box<Self> {
        Box::new(Self {
            main_history: ButterflyHistory::new(),
            piece_to_history: PieceToHistory::new(),
            capture_history: CapturePieceToHistory::new(),
            continuation_history: ContinuationHistory::new(),
            counter_moves: CounterMoveHistory::new(),
        })
    }

    pub fn clear(&mut self) {
        self.main_history.clear();
        self.piece_to_history.clear();
        self.capture_history.clear();
        self.continuation_history.clear();
        self.counter_moves.clear();
    }

    /// 静かな手のスコア（手の順序付けと LMR の補正に使う）
    ///
    /// `cont_keys` は 1, 2, 4 手前の手に対応するキー。
    #[inline]
    pub fn quiet_score(&self, us: Color, mv: Move, cont_keys: &[ContKey; 3]) -> i32 {
        let pc = mv.piece_after_move();
        let to = mv.to();
        let mut value = self.main_history.get(us, mv) as i32;
        value += self.piece_to_history.get(pc, to) as i32;
        for &key in cont_keys {
            value += self.continuation_history.get(key, pc, to) as i32;
        }
        value
    }

    /// 静かな手の統計を一括で更新する
    pub fn update_quiet(&mut self, us: Color, mv: Move, cont_keys: &[ContKey; 3], bonus: i32) {
        let pc = mv.piece_after_move();
        let to = mv.to();
        self.main_history.update(us, mv, bonus);
        self.piece_to_history.update(pc, to, bonus);
        for &key in cont_keys {
            self.continuation_history.update(key, pc, to, bonus);
        }
    }

    /// 駒を取る手の統計を更新する
    #[inline]
    pub fn update_capture(&mut self, mv: Move, bonus: i32) {
        self.capture_history
            .update(mv.piece_after_move(), mv.to(), mv.captured_piece(), bonus);
    }
}

// =============================================================================
// ボーナス計算
// =============================================================================

/// 深さに応じた統計更新量
#[inline]
pub fn stat_bonus(depth: i32) -> i32 {
    (130 * depth - 103).clamp(0, 1652)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{File, Rank};

    fn sq(file: File, rank: Rank) -> Square {
        Square::new(file, rank)
    }

    #[test]
    fn test_stats_entry_update_positive() {
        let mut entry = StatsEntry::<1000>::default();
        entry.update(100);
        assert_eq!(entry.get(), 100);
        entry.update(100);
        // 100 + 100 - 100 * 100 / 1000 = 190
        assert_eq!(entry.get(), 190);
    }

    #[test]
    fn test_stats_entry_update_convergence() {
        let mut entry = StatsEntry::<1000>::default();
        for _ in 0..200 {
            entry.update(1000);
        }
        assert_eq!(entry.get(), 1000);

        // D を超えるボーナスは D に丸められる
        let mut entry = StatsEntry::<1000>::default();
        entry.update(5000);
        assert_eq!(entry.get(), 1000);
    }

    #[test]
    fn test_stats_entry_update_negative() {
        let mut entry = StatsEntry::<1000>::default();
        entry.update(-100);
        assert_eq!(entry.get(), -100);
        for _ in 0..200 {
            entry.update(-1000);
        }
        assert_eq!(entry.get(), -1000);
    }

    #[test]
    fn test_butterfly_history() {
        let mut history = ButterflyHistory::new();
        let mv = Move::new_move(
            sq(File::File7, Rank::Rank7),
            sq(File::File7, Rank::Rank6),
            false,
            Piece::B_PAWN,
            Piece::NONE,
        );
        assert_eq!(history.get(Color::Black, mv), 0);
        history.update(Color::Black, mv, 100);
        assert_eq!(history.get(Color::Black, mv), 100);
        assert_eq!(history.get(Color::White, mv), 0);
        history.clear();
        assert_eq!(history.get(Color::Black, mv), 0);
    }

    #[test]
    fn test_drop_history_index_in_range() {
        let mut history = ButterflyHistory::new();
        for pt in PieceType::HAND_PIECES {
            let mv = Move::new_drop(Color::White, pt, sq(File::File9, Rank::Rank9));
            assert!(mv.history_index() < FROM_TO_SIZE);
            history.update(Color::White, mv, 10);
        }
    }

    #[test]
    fn test_counter_move_history() {
        let mut history = CounterMoveHistory::new();
        let mv = Move::new_drop(Color::Black, PieceType::Gold, Square::SQ_55);
        assert_eq!(history.get(Piece::W_ROOK, Square::SQ_55), Move::NONE);
        history.set(Piece::W_ROOK, Square::SQ_55, mv);
        assert_eq!(history.get(Piece::W_ROOK, Square::SQ_55), mv);
        history.clear();
        assert_eq!(history.get(Piece::W_ROOK, Square::SQ_55), Move::NONE);
    }

    #[test]
    fn test_continuation_sentinel_is_never_updated() {
        let mut history = ContinuationHistory::new();
        history.update(ContKey::SENTINEL, Piece::B_GOLD, Square::SQ_55, 500);
        assert_eq!(history.get(ContKey::SENTINEL, Piece::B_GOLD, Square::SQ_55), 0);

        let key = ContKey::from_move(Move::new_drop(Color::White, PieceType::Pawn, Square::SQ_55));
        assert!(!key.is_sentinel());
        history.update(key, Piece::B_GOLD, Square::SQ_55, 500);
        assert_eq!(history.get(key, Piece::B_GOLD, Square::SQ_55), 500);
        assert_eq!(ContKey::from_move(Move::NULL), ContKey::SENTINEL);
    }

    #[test]
    fn test_quiet_score_sums_tables() {
        let mut tables = HistoryTables::new_boxed();
        let prev =
            ContKey::from_move(Move::new_drop(Color::White, PieceType::Silver, Square::SQ_55));
        let keys = [prev, ContKey::SENTINEL, ContKey::SENTINEL];
        let mv = Move::new_drop(Color::Black, PieceType::Gold, sq(File::File5, Rank::Rank6));
        tables.update_quiet(Color::Black, mv, &keys, 200);
        // main + piece_to + 1 手前の continuation
        assert_eq!(tables.quiet_score(Color::Black, mv, &keys), 600);
        tables.clear();
        assert_eq!(tables.quiet_score(Color::Black, mv, &keys), 0);
    }

    #[test]
    fn test_stat_bonus() {
        assert_eq!(stat_bonus(0), 0);
        assert_eq!(stat_bonus(1), 27);
        assert_eq!(stat_bonus(5), 547);
        assert_eq!(stat_bonus(30), 1652);
    }
}
