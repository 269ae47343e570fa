//! 置換表エントリ
//!
//! データ 64bit の内訳:
//!
//! | bit | 内容 |
//! |---|---|
//! | 0-15 | 指し手（移動先・移動元・駒打ち・成りの下位 16bit） |
//! | 16-31 | 評価値（探索結果） |
//! | 32-47 | 静的評価値 |
//! | 48-55 | depth8（深さ - DEPTH_NONE、0 は空き） |
//! | 56-63 | genbound8（世代 5bit + PV 1bit + Bound 2bit） |
//!
//! キーは `key ^ data` として保存し、読み出し時に同じ XOR で復元して照合する。

use std::sync::atomic::{AtomicU64, Ordering};

use super::{GENERATION_CYCLE, GENERATION_MASK};
use crate::types::{Bound, Depth, Move, Value, DEPTH_NONE};

/// 読み出したデータ（指し手は 16bit のまま）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTData {
    /// 指し手（`TranspositionTable::probe` が局面から復元する）
    pub mv: Move,
    pub value: Value,
    pub eval: Value,
    pub depth: Depth,
    pub bound: Bound,
    pub is_pv: bool,
}

impl TTData {
    pub const EMPTY: TTData = TTData {
        mv: Move::NONE,
        value: Value::NONE,
        eval: Value::NONE,
        depth: DEPTH_NONE,
        bound: Bound::None,
        is_pv: false,
    };
}

#[inline]
const fn move16(data: u64) -> u16 {
    data as u16
}

#[inline]
const fn depth8(data: u64) -> u8 {
    (data >> 48) as u8
}

#[inline]
const fn genbound8(data: u64) -> u8 {
    (data >> 56) as u8
}

/// 置換表エントリ（16 バイト）
#[derive(Default)]
pub(super) struct TTEntry {
    key: AtomicU64,
    data: AtomicU64,
}

impl TTEntry {
    /// キーが一致すればデータを返す
    #[inline]
    pub(super) fn read(&self, key: u64) -> Option<u64> {
        let data = self.data.load(Ordering::Relaxed);
        let stored = self.key.load(Ordering::Relaxed);
        (stored ^ data == key && depth8(data) != 0).then_some(data)
    }

    #[inline]
    pub(super) fn is_occupied(&self) -> bool {
        depth8(self.data.load(Ordering::Relaxed)) != 0
    }

    /// 置換の優先度（小さいほど置換されやすい）
    #[inline]
    pub(super) fn replace_value(&self, generation8: u8) -> i32 {
        let data = self.data.load(Ordering::Relaxed);
        depth8(data) as i32 - relative_age(genbound8(data), generation8) as i32
    }

    /// 世代の古さを返す
    #[inline]
    pub(super) fn relative_age(&self, generation8: u8) -> u8 {
        relative_age(genbound8(self.data.load(Ordering::Relaxed)), generation8)
    }

    #[inline]
    pub(super) fn clear(&self) {
        self.data.store(0, Ordering::Relaxed);
        self.key.store(0, Ordering::Relaxed);
    }

    /// 書き込む
    ///
    /// 同じ局面の浅い結果で深い結果を上書きしない。指し手が無い場合は既存の指し手を残す。
    #[allow(clippy::too_many_arguments)]
    pub(super) fn save(
        &self,
        key: u64,
        value: Value,
        is_pv: bool,
        bound: Bound,
        depth: Depth,
        mv: Move,
        eval: Value,
        generation8: u8,
    ) {
        debug_assert!(depth > DEPTH_NONE, "save() with depth {depth}");
        let old = self.data.load(Ordering::Relaxed);
        let same_key = self.key.load(Ordering::Relaxed) ^ old == key && depth8(old) != 0;

        let mut mv16 = mv.raw() as u16;
        if mv.is_none() && same_key {
            mv16 = move16(old);
        }

        let new_depth8 = (depth - DEPTH_NONE) as i32;
        if bound != Bound::Exact
            && same_key
            && new_depth8 + 2 * is_pv as i32 <= depth8(old) as i32 - 4
            && relative_age(genbound8(old), generation8) == 0
        {
            return;
        }

        let genbound = generation8 | ((is_pv as u8) << 2) | bound as u8;
        let data = mv16 as u64
            | ((value.raw() as i16 as u16 as u64) << 16)
            | ((eval.raw() as i16 as u16 as u64) << 32)
            | ((new_depth8.clamp(1, 255) as u64) << 48)
            | ((genbound as u64) << 56);
        self.data.store(data, Ordering::Relaxed);
        self.key.store(key ^ data, Ordering::Relaxed);
    }
}

#[inline]
fn relative_age(genbound8: u8, generation8: u8) -> u8 {
    ((GENERATION_CYCLE + generation8 as u16 - genbound8 as u16) & GENERATION_MASK as u16) as u8
}

/// 生のデータを `TTData` へ展開する（指し手は 16bit のまま）
#[inline]
pub(super) fn unpack(data: u64) -> (u16, TTData) {
    let gb = genbound8(data);
    let tt = TTData {
        mv: Move::NONE,
        value: Value::new((data >> 16) as u16 as i16 as i32),
        eval: Value::new((data >> 32) as u16 as i16 as i32),
        depth: depth8(data) as Depth + DEPTH_NONE,
        bound: Bound::from_u8(gb & 3),
        is_pv: gb & 4 != 0,
    };
    (move16(data), tt)
}
