//! 置換表の本体
//!
//! キーの上位ビットでクラスターを選び、クラスター内の 4 エントリから
//! 一致するものを探す。見つからなければ深さと世代で置き換え先を決める。

use std::sync::atomic::{AtomicU8, Ordering};

use super::entry::{unpack, TTEntry};
use super::{TTData, CLUSTER_SIZE, GENERATION_BITS, GENERATION_DELTA};
use crate::position::Position;
use crate::types::{Bound, Depth, Move, PieceType, Square, Value};

/// 同じ添字に入るエントリの組
#[repr(C, align(64))]
#[derive(Default)]
struct Cluster {
    entries: [TTEntry; CLUSTER_SIZE],
}

const _: () = assert!(std::mem::size_of::<Cluster>() == 64);

fn allocate(count: usize) -> Box<[Cluster]> {
    (0..count).map(|_| Cluster::default()).collect()
}

fn cluster_count(mb_size: usize) -> usize {
    (mb_size * 1024 * 1024 / std::mem::size_of::<Cluster>()).max(1)
}

/// 置換表
pub struct TranspositionTable {
    /// クラスターの配列
    table: Box<[Cluster]>,
    /// 世代カウンター（下位3bitは使用しない）
    generation8: AtomicU8,
}

impl TranspositionTable {
    /// 新しい置換表を作成（サイズはMB単位）
    pub fn new(mb_size: usize) -> Self {
        let count = cluster_count(mb_size);
        log::debug!("allocating transposition table: {mb_size} MB ({count} clusters)");
        Self {
            table: allocate(count),
            generation8: AtomicU8::new(0),
        }
    }

    /// サイズを変更（内容は失われる）
    pub fn resize(&mut self, mb_size: usize) {
        let count = cluster_count(mb_size);
        if count != self.table.len() {
            self.table = allocate(count);
        }
        self.generation8.store(0, Ordering::Relaxed);
    }

    /// クリア
    pub fn clear(&mut self) {
        self.generation8.store(0, Ordering::Relaxed);
        for cluster in self.table.iter() {
            for entry in &cluster.entries {
                entry.clear();
            }
        }
    }

    /// 新しい探索を開始（世代を進める）
    pub fn new_search(&self) {
        self.generation8.fetch_add(GENERATION_DELTA, Ordering::Relaxed);
    }

    /// 現在の世代を取得
    #[inline]
    pub fn generation(&self) -> u8 {
        self.generation8.load(Ordering::Relaxed)
    }

    #[inline]
    fn cluster(&self, key: u64) -> &Cluster {
        // key * cluster_count / 2^64 でインデックスを計算
        let index = ((key as u128 * self.table.len() as u128) >> 64) as usize;
        &self.table[index]
    }

    /// 置換表を検索する
    ///
    /// 指し手は局面から復元し、復元できなければ `Move::NONE` にする。
    /// 合法手かどうかは確かめないので、使う前に `pseudo_legal` と `is_legal` で検証すること。
    pub fn probe(&self, key: u64, pos: &Position) -> ProbeResult<'_> {
        let cluster = self.cluster(key);

        for entry in &cluster.entries {
            if let Some(raw) = entry.read(key) {
                let (mv16, mut data) = unpack(raw);
                data.mv = restore_move(pos, mv16).unwrap_or(Move::NONE);
                return ProbeResult {
                    found: true,
                    data,
                    writer: entry,
                };
            }
        }

        // 置換するエントリを選択（価値が最小のもの）
        let gen8 = self.generation();
        let mut writer = &cluster.entries[0];
        for entry in &cluster.entries[1..] {
            if entry.replace_value(gen8) < writer.replace_value(gen8) {
                writer = entry;
            }
        }

        ProbeResult {
            found: false,
            data: TTData::EMPTY,
            writer,
        }
    }

    /// 置換表の使用率を1000分率で返す
    pub fn hashfull(&self, max_age: u8) -> i32 {
        let max_age_internal = max_age << GENERATION_BITS;
        let gen8 = self.generation();
        let sample_count = 1000.min(self.table.len());
        let mut count = 0;

        for cluster in self.table.iter().take(sample_count) {
            for entry in &cluster.entries {
                if entry.is_occupied() && entry.relative_age(gen8) <= max_age_internal {
                    count += 1;
                }
            }
        }

        (count * 1000 / (sample_count * CLUSTER_SIZE)) as i32
    }
}

/// 16bit の指し手を局面から復元する
fn restore_move(pos: &Position, mv16: u16) -> Option<Move> {
    if mv16 == 0 {
        return None;
    }
    let to = Square::from_u8((mv16 & 0x7F) as u8)?;
    let from = ((mv16 >> 7) & 0x7F) as usize;
    let is_drop = mv16 & (1 << 14) != 0;
    let promote = mv16 & (1 << 15) != 0;

    if is_drop {
        let pt = *PieceType::HAND_PIECES.get(from.checked_sub(Square::NUM)?)?;
        return Some(pos.make_drop(pt, to));
    }
    let from = Square::from_u8(from as u8)?;
    let pc = pos.piece_on(from);
    if pc.is_none() || pc.color() != pos.side_to_move() {
        return None;
    }
    Some(pos.make_move(from, to, promote))
}

/// probe結果
pub struct ProbeResult<'a> {
    /// ヒットしたか
    pub found: bool,
    /// 読み取ったデータ
    pub data: TTData,
    /// 書き込み用エントリ
    writer: &'a TTEntry,
}

impl ProbeResult<'_> {
    /// エントリに書き込む
    #[allow(clippy::too_many_arguments)]
    pub fn write(
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
        self.writer.save(key, value, is_pv, bound, depth, mv, eval, generation8);
    }
}
