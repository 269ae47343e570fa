//! 置換表モジュール
//!
//! 探索結果をキャッシュする置換表（Transposition Table）。
//!
//! - `TTEntry`: エントリ（`AtomicU64` 2 個、キーはデータとの XOR で保存）
//! - `Cluster`: エントリのグループ（64 バイト）
//! - `TranspositionTable`: テーブル本体
//! - 世代管理
//!
//! 複数スレッドからロックなしで読み書きする。書き込みが競合すると
//! キーとデータの組が壊れることがあるが、XOR による検証でそのエントリは
//! 単にヒットしなくなる。読み出した指し手は呼び出し側で合法性を確かめること。

mod entry;
mod table;

pub use entry::TTData;
pub use table::{ProbeResult, TranspositionTable};

/// クラスターサイズ（エントリ数）
pub const CLUSTER_SIZE: usize = 4;

/// Generation関連の定数
pub const GENERATION_BITS: u32 = 3;
pub const GENERATION_DELTA: u8 = 1 << GENERATION_BITS; // 8
pub const GENERATION_CYCLE: u16 = 255 + GENERATION_DELTA as u16;
pub const GENERATION_MASK: u8 = 0xF8;
