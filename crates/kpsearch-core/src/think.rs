//! 思考の入口
//!
//! 1局面ぶんの指し手を、宣言勝ち → 投了（合法手なし）→ 定跡 → 探索 の順に決める。

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::book::Book;
use crate::config::{ConfigError, EngineConfig};
use crate::eval::Evaluator;
use crate::movegen::{generate_legal, MoveList};
use crate::position::Position;
use crate::search::{InfoSink, LimitsType, NoInfo, SearchOptions, ThreadPool};
use crate::tt::TranspositionTable;
use crate::types::{Depth, Move, Value};

/// 思考の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThinkResult {
    /// 入玉宣言勝ち
    Win,
    /// 合法手がない
    Resign,
    /// 定跡の手
    Book { best: Move, ponder: Move },
    /// 探索で選んだ手
    Search {
        best: Move,
        ponder: Move,
        score: Value,
        depth: Depth,
    },
}

impl ThinkResult {
    /// 指す手（宣言勝ち・投了では NONE）
    pub fn best_move(&self) -> Move {
        match self {
            ThinkResult::Win | ThinkResult::Resign => Move::NONE,
            ThinkResult::Book { best, .. } | ThinkResult::Search { best, .. } => *best,
        }
    }

    /// USI の bestmove 行
    pub fn to_usi(&self) -> String {
        match self {
            ThinkResult::Win => "bestmove win".to_string(),
            ThinkResult::Resign => "bestmove resign".to_string(),
            ThinkResult::Book { best, ponder } | ThinkResult::Search { best, ponder, .. } => {
                if ponder.is_some() {
                    format!("bestmove {} ponder {}", best.to_usi(), ponder.to_usi())
                } else {
                    format!("bestmove {}", best.to_usi())
                }
            }
        }
    }
}

/// 思考エンジン本体（評価関数・置換表・探索スレッド・定跡をまとめて持つ）
pub struct Think {
    evaluator: Evaluator,
    tt: TranspositionTable,
    pool: ThreadPool,
    book: Option<Book>,
    options: SearchOptions,
    book_max_ply: i32,
}

impl Think {
    pub fn new(config: &EngineConfig, evaluator: Evaluator, book: Option<Book>) -> Self {
        Self {
            evaluator,
            tt: TranspositionTable::new(config.hash_mb),
            pool: ThreadPool::new(config.threads),
            book,
            options: config.search_options(),
            book_max_ply: config.book_max_ply,
        }
    }

    /// 設定に書かれたファイルを読み込んで組み立てる
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let evaluator = config.load_evaluator()?;
        let book = config.load_book()?;
        Ok(Self::new(config, evaluator, book))
    }

    /// 新しい対局を始める（置換表と履歴を消す）
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.pool.clear();
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// 探索を外から止めるためのフラグ
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.pool.stop_handle()
    }

    pub fn think(&mut self, pos: &Position, limits: &LimitsType) -> ThinkResult {
        self.think_with_info(pos, limits, &NoInfo)
    }

    /// 指し手を決める（探索中の読み筋は `info` に通知する）
    pub fn think_with_info(
        &mut self,
        pos: &Position,
        limits: &LimitsType,
        info: &dyn InfoSink,
    ) -> ThinkResult {
        if pos.win_declaration_possible() {
            log::info!("declaring win at ply {}", pos.game_ply());
            return ThinkResult::Win;
        }

        let mut legal = MoveList::new();
        generate_legal(pos, &mut legal);
        if legal.is_empty() {
            log::info!("no legal move; resigning");
            return ThinkResult::Resign;
        }

        if let Some(best) = self.probe_book(pos, limits) {
            log::info!("book move {}", best.to_usi());
            return ThinkResult::Book {
                best,
                ponder: Move::NONE,
            };
        }

        let result = self
            .pool
            .search(pos, &self.tt, &self.evaluator, limits, &self.options, info);
        if result.best_move.is_none() {
            return ThinkResult::Resign;
        }

        let ponder = if result.ponder_move.is_some() {
            result.ponder_move
        } else {
            self.ponder_from_tt(pos, result.best_move)
        };
        ThinkResult::Search {
            best: result.best_move,
            ponder,
            score: result.score,
            depth: result.depth,
        }
    }

    fn probe_book(&self, pos: &Position, limits: &LimitsType) -> Option<Move> {
        let book = self.book.as_ref()?;
        if limits.infinite || limits.ponder || pos.game_ply() + 1 > self.book_max_ply {
            return None;
        }
        book.probe(pos)
    }

    /// 読み筋が1手しかないとき、置換表から相手の応手を探す
    fn ponder_from_tt(&self, pos: &Position, best: Move) -> Move {
        let mut next = pos.clone();
        next.do_move(best);
        let probe = self.tt.probe(next.key(), &next);
        let m = probe.data.mv;
        if probe.found && m.is_some() && next.pseudo_legal(m) && next.is_legal(m) {
            m
        } else {
            Move::NONE
        }
    }
}
