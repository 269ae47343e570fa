//! 指し手の順序付けと探索・思考の結合テスト

mod common;

use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use kpsearch_core::config::EngineConfig;
use kpsearch_core::eval::Evaluator;
use kpsearch_core::movegen::{generate_all, ExtMoveBuffer};
use kpsearch_core::position::{Position, SFEN_HIRATE};
use kpsearch_core::search::{ContKey, HistoryTables, LimitsType, MovePicker, SearchInfo};
use kpsearch_core::think::{Think, ThinkResult};
use kpsearch_core::types::Move;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use common::{legal_moves, position, random_trajectory};

const MIDGAME: &str =
    "ln1g2snl/1r1sk1gb1/p1pppp1pp/1p4p2/7P1/2P1P4/PP1P1PP1P/1BG2S1R1/LNS1KG1NL b - 15";

fn engine(config: &EngineConfig) -> Think {
    let evaluator = config.build_evaluator(common::params()).unwrap();
    Think::new(config, evaluator, None)
}

// =============================================================================
// 指し手の順序付け
// =============================================================================

fn drain(mp: &mut MovePicker, pos: &Position, history: &HistoryTables) -> Vec<Move> {
    let mut out = Vec::new();
    loop {
        let mv = mp.next_move(pos, history);
        if mv.is_none() {
            return out;
        }
        out.push(mv);
    }
}

fn sorted(moves: &[Move]) -> Vec<u32> {
    let mut raw: Vec<u32> = moves.iter().map(|m| m.raw()).collect();
    raw.sort_unstable();
    raw
}

/// 王手がかかっていれば合法な回避手、そうでなければ全ての pseudo-legal な手
fn expected_moves(pos: &Position) -> Vec<Move> {
    if pos.in_check() {
        legal_moves(pos).iter().copied().collect()
    } else {
        let mut buf = ExtMoveBuffer::new();
        generate_all(pos, &mut buf);
        buf.iter().map(|e| e.mv).collect()
    }
}

#[test]
fn test_move_picker_returns_each_move_once() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(2024);
    let history = HistoryTables::new_boxed();
    let start = position(SFEN_HIRATE);

    for _ in 0..20 {
        for pos in random_trajectory(&mut rng, &start, 160) {
            let expected = expected_moves(&pos);
            if expected.is_empty() {
                continue;
            }
            let tt_move = if rng.random_bool(0.75) {
                expected[rng.random_range(0..expected.len())]
            } else {
                Move::NONE
            };
            let quiets: Vec<Move> = expected.iter().copied().filter(|m| m.is_quiet()).collect();
            let mut killers = [Move::NONE; 3];
            if !quiets.is_empty() {
                for k in killers.iter_mut().take(2) {
                    *k = quiets[rng.random_range(0..quiets.len())];
                }
            }
            let use_probability = rng.random_bool(0.5);

            let keys = [ContKey::SENTINEL; 3];
            let mut mp = MovePicker::new(&pos, tt_move, 6, killers, keys, use_probability);
            let moves = drain(&mut mp, &pos, &history);

            assert_eq!(sorted(&moves), sorted(&expected), "{}", pos.to_sfen());
            if tt_move.is_some() {
                assert_eq!(moves[0], tt_move, "{}", pos.to_sfen());
            }
        }
    }
}

// =============================================================================
// 探索
// =============================================================================

#[test]
fn test_single_thread_search_is_reproducible() {
    let config = EngineConfig::default();
    let limits = LimitsType::depth(5);
    for sfen in [SFEN_HIRATE, MIDGAME] {
        let pos = position(sfen);
        let first = engine(&config).think(&pos, &limits);
        let second = engine(&config).think(&pos, &limits);
        assert_eq!(first, second, "{sfen}");

        // 置換表と履歴を消せば同じインスタンスでも同じ結果になる
        let mut think = engine(&config);
        think.think(&pos, &LimitsType::depth(3));
        think.new_game();
        assert_eq!(think.think(&pos, &limits), first, "{sfen}");
    }
}

#[test]
fn test_info_depths_are_increasing() {
    use std::sync::Mutex;

    let mut think = engine(&EngineConfig::default());
    let pos = position(MIDGAME);
    let seen = Mutex::new(Vec::new());
    let sink = |info: &SearchInfo| seen.lock().unwrap().push((info.depth, info.pv.clone()));
    let result = think.think_with_info(&pos, &LimitsType::depth(4), &sink);

    let seen = seen.into_inner().unwrap();
    let depths: Vec<i32> = seen.iter().map(|(d, _)| *d).collect();
    assert_eq!(depths, vec![1, 2, 3, 4]);
    // 最後の読み筋の先頭が指す手
    assert_eq!(seen.last().unwrap().1[0], result.best_move());
}

#[test]
fn test_stop_flag_ends_infinite_search() {
    let config = EngineConfig {
        threads: 2,
        ..Default::default()
    };
    let mut think = engine(&config);
    let stop = think.stop_handle();
    let pos = position(SFEN_HIRATE);
    let limits = LimitsType {
        infinite: true,
        ..Default::default()
    };

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        stop.store(true, Ordering::Relaxed);
    });
    let result = think.think(&pos, &limits);
    stopper.join().unwrap();

    assert!(matches!(result, ThinkResult::Search { .. }));
    assert!(legal_moves(&pos).contains(result.best_move()));
}

#[test]
fn test_movetime_limit() {
    let mut think = engine(&EngineConfig::default());
    let pos = position(MIDGAME);
    let start = std::time::Instant::now();
    let result = think.think(&pos, &LimitsType::movetime(100));
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(legal_moves(&pos).contains(result.best_move()));
}

// =============================================================================
// 設定から定跡と探索まで
// =============================================================================

#[test]
fn test_config_book_then_search() {
    let dir = std::env::temp_dir().join(format!("kpsearch-book-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let book_path = dir.join("book.txt");
    std::fs::write(&book_path, format!("sfen {SFEN_HIRATE}\n2g2f 12\n7g7f 8\n")).unwrap();

    let toml = format!(
        "own_book = true\nbook_max_ply = 4\nbook_file = {:?}\n\n[search]\nnode_check_interval = 256\n",
        book_path.to_string_lossy()
    );
    let config = EngineConfig::from_toml_str(&toml).unwrap();
    let evaluator: Evaluator = config.build_evaluator(common::params()).unwrap();
    let book = config.load_book().unwrap();
    assert!(book.is_some());
    let mut think = Think::new(&config, evaluator, book);

    let limits = LimitsType::depth(2);
    let pos = position(SFEN_HIRATE);
    assert_eq!(think.think(&pos, &limits).to_usi(), "bestmove 2g2f");

    // 手数が定跡の範囲を超えたら同じ局面でも探索する
    let late = position("lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 9");
    assert!(matches!(think.think(&late, &limits), ThinkResult::Search { .. }));

    std::fs::remove_dir_all(&dir).unwrap();
}
