//! 探索モジュール
//!
//! - `history`: 指し手の順序付けに使う履歴統計
//! - `movepicker`: 段階的な指し手生成と順序付け
//! - `alpha_beta`: 反復深化と通常探索ノード
//! - `qsearch`: 静止探索
//! - `thread`: 置換表を共有して複数スレッドで探索する（Lazy SMP）
//!
//! 探索の打ち切り条件は `LimitsType`、探索の調整値は `SearchOptions` で渡す。
//! 反復ごとの読み筋は `InfoSink` に通知する。

mod alpha_beta;
pub mod history;
pub mod movepicker;
mod qsearch;
mod search_helpers;
mod thread;
pub mod types;

pub use alpha_beta::{SearchContext, SearchState, SearchWorker, WorkerResult};
pub use history::{stat_bonus, ContKey, HistoryTables};
pub use movepicker::{MovePicker, Stage};
pub use thread::ThreadPool;
pub use types::{NodeType, RootMove, RootMoves, Stack};

use crate::types::{Depth, Move, Value};

// =============================================================================
// 探索条件
// =============================================================================

/// 探索の打ち切り条件
///
/// 0 は「制限なし」。
#[derive(Debug, Clone, Default)]
pub struct LimitsType {
    /// 最大深さ
    pub depth: Depth,
    /// 最大ノード数（スレッドごと）
    pub nodes: u64,
    /// 思考時間（ミリ秒）
    pub movetime: u64,
    /// 停止されるまで探索する（詰みを読み切っても止めない）
    pub infinite: bool,
    /// 先読み中（定跡は使わない）
    pub ponder: bool,
    /// ルートで読む手を限定する
    pub search_moves: Vec<Move>,
}

impl LimitsType {
    pub fn depth(depth: Depth) -> Self {
        Self {
            depth,
            ..Default::default()
        }
    }

    pub fn nodes(nodes: u64) -> Self {
        Self {
            nodes,
            ..Default::default()
        }
    }

    pub fn movetime(ms: u64) -> Self {
        Self {
            movetime: ms,
            ..Default::default()
        }
    }
}

/// 探索の調整値
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// この深さ以上のノードでは確率による順序付けを使う
    pub probability_min_depth: Depth,
    /// 停止判定を何ノードに1回行うか
    pub node_check_interval: i32,
    /// ルート手番から見た千日手の評価値
    pub draw_value: Value,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            probability_min_depth: 64,
            node_check_interval: 512,
            draw_value: Value::DRAW,
        }
    }
}

// =============================================================================
// 探索情報の通知
// =============================================================================

/// 1反復ぶんの探索情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchInfo {
    pub depth: Depth,
    pub sel_depth: i32,
    pub score: Value,
    pub nodes: u64,
    pub time_ms: u64,
    /// 置換表の使用率（1000分率）
    pub hashfull: i32,
    pub pv: Vec<Move>,
}

impl SearchInfo {
    /// USI の info 行
    pub fn to_usi(&self) -> String {
        let nps = if self.time_ms > 0 {
            self.nodes * 1000 / self.time_ms
        } else {
            0
        };
        let mut s = format!(
            "info depth {} seldepth {} score {} nodes {} nps {} time {} hashfull {}",
            self.depth,
            self.sel_depth,
            self.score.to_usi(),
            self.nodes,
            nps,
            self.time_ms,
            self.hashfull
        );
        if !self.pv.is_empty() {
            s.push_str(" pv");
            for m in &self.pv {
                s.push(' ');
                s.push_str(&m.to_usi());
            }
        }
        s
    }
}

/// 探索情報の通知先
///
/// メインスレッドが反復を終えるたびに呼ぶ。
pub trait InfoSink: Sync {
    fn on_info(&self, info: &SearchInfo);
}

impl<F> InfoSink for F
where
    F: Fn(&SearchInfo) + Sync,
{
    fn on_info(&self, info: &SearchInfo) {
        self(info)
    }
}

/// 何もしない通知先
pub struct NoInfo;

impl InfoSink for NoInfo {
    fn on_info(&self, _info: &SearchInfo) {}
}

// =============================================================================
// 探索結果
// =============================================================================

/// 探索結果
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_move: Move,
    /// 読み筋の2手目（なければ NONE）
    pub ponder_move: Move,
    pub score: Value,
    /// メインスレッドが完了した深さ
    pub depth: Depth,
    /// 全スレッドの合計ノード数
    pub nodes: u64,
    pub pv: Vec<Move>,
}

impl SearchResult {
    /// 合法手がないときの結果
    pub fn no_move() -> Self {
        Self {
            best_move: Move::NONE,
            ponder_move: Move::NONE,
            score: Value::mated_in(0),
            depth: 0,
            nodes: 0,
            pv: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{Position, SFEN_HIRATE};

    #[test]
    fn test_search_info_to_usi() {
        let mut pos = Position::new();
        pos.set_sfen(SFEN_HIRATE).unwrap();
        let m1 = pos.move_from_usi("7g7f").unwrap();
        let info = SearchInfo {
            depth: 3,
            sel_depth: 5,
            score: Value::new(42),
            nodes: 2000,
            time_ms: 100,
            hashfull: 7,
            pv: vec![m1],
        };
        assert_eq!(
            info.to_usi(),
            "info depth 3 seldepth 5 score cp 42 nodes 2000 nps 20000 time 100 hashfull 7 pv 7g7f"
        );
    }

    #[test]
    fn test_closure_info_sink() {
        use std::sync::Mutex;

        let seen = Mutex::new(Vec::new());
        let sink = |info: &SearchInfo| seen.lock().unwrap().push(info.depth);
        let info = SearchInfo {
            depth: 1,
            sel_depth: 1,
            score: Value::ZERO,
            nodes: 0,
            time_ms: 0,
            hashfull: 0,
            pv: Vec::new(),
        };
        sink.on_info(&info);
        NoInfo.on_info(&info);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }
}
