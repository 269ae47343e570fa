//! 探索スレッドの管理（Lazy SMP）
//!
//! 全スレッドが同じルート局面を独立に反復深化し、置換表だけを共有する。
//! 結果はメインスレッド（thread_id 0）のものを使い、メインが終わったら
//! 停止フラグで helper を止める。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::eval::Evaluator;
use crate::position::Position;
use crate::tt::TranspositionTable;
use crate::types::Move;

use super::alpha_beta::{SearchContext, SearchWorker};
use super::{InfoSink, LimitsType, NoInfo, SearchOptions, SearchResult};

/// 探索スレッドのプール
pub struct ThreadPool {
    workers: Vec<SearchWorker>,
    stop: Arc<AtomicBool>,
}

impl ThreadPool {
    pub fn new(threads: usize) -> Self {
        let mut pool = Self {
            workers: Vec::new(),
            stop: Arc::new(AtomicBool::new(false)),
        };
        pool.set_threads(threads);
        pool
    }

    #[inline]
    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// スレッド数を変える（最低1）
    pub fn set_threads(&mut self, threads: usize) {
        let threads = threads.max(1);
        self.workers.truncate(threads);
        while self.workers.len() < threads {
            let id = self.workers.len();
            self.workers.push(SearchWorker::new(id));
        }
    }

    /// 全ワーカーの履歴表を消す
    pub fn clear(&mut self) {
        for worker in &mut self.workers {
            worker.clear();
        }
    }

    /// 外部から探索を止めるためのフラグ
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// 全スレッドで探索し、メインスレッドの結果を返す
    pub fn search(
        &mut self,
        pos: &Position,
        tt: &TranspositionTable,
        evaluator: &Evaluator,
        limits: &LimitsType,
        options: &SearchOptions,
        info: &dyn InfoSink,
    ) -> SearchResult {
        self.stop.store(false, Ordering::Relaxed);
        tt.new_search();

        let start = Instant::now();
        let stop: &AtomicBool = &self.stop;
        let Some((main, helpers)) = self.workers.split_first_mut() else {
            return SearchResult::no_move();
        };

        let (main_result, helper_nodes) = std::thread::scope(|scope| {
            let handles: Vec<_> = helpers
                .iter_mut()
                .map(|worker| {
                    let mut pos = pos.clone();
                    scope.spawn(move || {
                        let ctx = SearchContext {
                            tt,
                            evaluator,
                            stop,
                            limits,
                            options,
                            thread_id: worker.thread_id,
                            start,
                        };
                        worker
                            .search(&ctx, &mut pos, options.draw_value, &NoInfo)
                            .map_or(0, |r| r.nodes)
                    })
                })
                .collect();

            let mut root = pos.clone();
            let ctx = SearchContext {
                tt,
                evaluator,
                stop,
                limits,
                options,
                thread_id: main.thread_id,
                start,
            };
            let result = main.search(&ctx, &mut root, options.draw_value, info);
            stop.store(true, Ordering::Relaxed);

            let helper_nodes: u64 = handles
                .into_iter()
                .map(|h| match h.join() {
                    Ok(nodes) => nodes,
                    Err(_) => {
                        log::warn!("helper search thread panicked");
                        0
                    }
                })
                .sum();
            (result, helper_nodes)
        });

        let Some(result) = main_result else {
            return SearchResult::no_move();
        };

        let best = result.best;
        log::debug!(
            "search finished: bestmove {} depth {} nodes {} ({} ms)",
            best.mv().to_usi(),
            result.completed_depth,
            result.nodes + helper_nodes,
            start.elapsed().as_millis()
        );

        SearchResult {
            best_move: best.mv(),
            ponder_move: best.pv.get(1).copied().unwrap_or(Move::NONE),
            score: best.score,
            depth: result.completed_depth,
            nodes: result.nodes + helper_nodes,
            pv: best.pv,
        }
    }
}
