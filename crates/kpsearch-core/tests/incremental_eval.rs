//! 差分評価と全計算の一致、駒リスト・利きインデックス・HalfKP 特徴量の差分更新の検証
//!
//! 平手から乱数で指し進めた局面列を使う。既定では 100 局 x 256 手、
//! `--ignored` で 1000 局に増やした版も走る。

mod common;

use kpsearch_core::eval::control::squares_of;
use kpsearch_core::eval::features::{append_active_indices, append_changed_indices, needs_refresh};
use kpsearch_core::eval::{BlendRates, EvalDetail, Evaluator, PsqControlList, PsqList};
use kpsearch_core::position::{BoardEffects, Position, SFEN_HIRATE};
use kpsearch_core::types::{Color, Square};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use common::{legal_moves, position, random_legal_move, random_trajectory};

const MAX_PLIES: usize = 256;

fn full(eval: &Evaluator, pos: &Position) -> EvalDetail {
    eval.evaluate_all(pos, &PsqList::new(pos), &PsqControlList::new(pos))
}

/// 1局ぶん指し進めながら、差分で積み上げた内訳と全計算を毎手比べる
fn run_trajectory(eval: &Evaluator, seed: u64) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut pos = position(SFEN_HIRATE);
    let mut list = PsqList::new(&pos);
    let mut controls = PsqControlList::new(&pos);
    let mut detail = eval.evaluate_all(&pos, &list, &controls);

    for ply in 0..MAX_PLIES {
        let Some(m) = random_legal_move(&mut rng, &pos) else {
            break;
        };
        pos.do_move(m);
        let next = PsqControlList::new(&pos);
        let diff = eval.evaluate_difference(&pos, &detail, &controls, &next, &mut list);
        detail += diff;
        controls = next;

        let expected = full(eval, &pos);
        // 項ごとに比べて、ずれた項が分かるようにする
        let context = format!("seed {seed} ply {ply} move {} sfen {}", m.to_usi(), pos.to_sfen());
        assert_eq!(detail.kp, expected.kp, "kp: {context}");
        assert_eq!(detail.two_pieces, expected.two_pieces, "two_pieces: {context}");
        assert_eq!(detail.controls, expected.controls, "controls: {context}");
        assert_eq!(detail.king_safety, expected.king_safety, "king_safety: {context}");
        assert_eq!(detail.sliders, expected.sliders, "sliders: {context}");
        assert_eq!(detail.secondary, expected.secondary, "secondary: {context}");
        assert_eq!(eval.final_score(&pos, &detail), eval.evaluate(&pos), "score: {context}");
        assert!(list.is_ok(), "list: {context}");
    }
}

fn blended_evaluator() -> Evaluator {
    Evaluator::new(common::params()).with_secondary(
        common::three_piece(),
        BlendRates {
            opening: 30,
            middle: 50,
            end: 70,
        },
    )
}

#[test]
fn test_difference_matches_full_evaluation() {
    let eval = Evaluator::new(common::params());
    for seed in 0..100 {
        run_trajectory(&eval, seed);
    }
}

#[test]
fn test_difference_matches_full_evaluation_with_secondary() {
    let eval = blended_evaluator();
    for seed in 1000..1020 {
        run_trajectory(&eval, seed);
    }
}

#[test]
#[ignore]
fn test_difference_matches_full_evaluation_exhaustive() {
    let eval = blended_evaluator();
    for seed in 0..1000 {
        run_trajectory(&eval, seed);
    }
}

#[test]
fn test_pawn_push_changes_only_affected_terms() {
    let eval = Evaluator::new(common::params());
    let mut pos = position(SFEN_HIRATE);
    let list0 = PsqList::new(&pos);
    let controls0 = PsqControlList::new(&pos);
    let before = eval.evaluate_all(&pos, &list0, &controls0);

    let m = pos.move_from_usi("2g2f").unwrap();
    pos.do_move(m);
    let controls = PsqControlList::new(&pos);
    let mut list = list0.clone();
    let diff = eval.evaluate_difference(&pos, &before, &controls0, &controls, &mut list);

    let after = full(&eval, &pos);
    assert_eq!(before + diff, after);
    assert!(!diff.kp[0].is_zero());
    assert!(!diff.two_pieces.is_zero());
    assert!(!diff.controls.is_zero());
    // 玉の安全度と飛び駒は全計算の差と一致する
    assert_eq!(diff.king_safety, after.king_safety - before.king_safety);
    assert_eq!(diff.sliders, after.sliders - before.sliders);

    // 利きが変わったのは 2g, 2f と飛車の利きが伸びた升だけ
    let bits = PsqControlList::compute_difference(&controls0, &controls);
    let changed: Vec<Square> = squares_of(bits).collect();
    assert!(changed.contains(&m.from()));
    assert!(changed.contains(&m.to()));
    assert!(changed.iter().all(|sq| sq.file() == m.to().file()));
}

// =============================================================================
// 駒リスト
// =============================================================================

#[test]
fn test_psq_list_make_unmake_round_trip() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(77);
    let start = position(SFEN_HIRATE);
    for _ in 0..20 {
        for pos in random_trajectory(&mut rng, &start, 128) {
            let list = PsqList::new(&pos);
            for &m in legal_moves(&pos).iter() {
                let mut updated = list.clone();
                updated.make_move(m);

                let mut next = pos.clone();
                next.do_move(m);
                let rebuilt = PsqList::new(&next);
                assert!(
                    PsqList::same_items(&updated, &rebuilt),
                    "{} after {}",
                    pos.to_sfen(),
                    m.to_usi()
                );
                assert!(updated.is_ok());

                updated.unmake_move(m);
                assert!(updated == list, "{} unmake {}", pos.to_sfen(), m.to_usi());
            }
        }
    }
}

// =============================================================================
// 利きインデックス
// =============================================================================

#[test]
fn test_control_difference_is_complete() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(91);
    let start = position(SFEN_HIRATE);
    for _ in 0..10 {
        for pos in random_trajectory(&mut rng, &start, 128) {
            let before = PsqControlList::new(&pos);
            for &m in legal_moves(&pos).iter() {
                let mut next = pos.clone();
                next.do_move(m);
                let after = PsqControlList::new(&next);
                let bits = PsqControlList::compute_difference(&before, &after);

                assert!(bits & (1u128 << m.to().index()) != 0, "to square of {}", m.to_usi());
                if !m.is_drop() {
                    let from_bit = 1u128 << m.from().index();
                assert!(bits & from_bit != 0, "from square of {}", m.to_usi());
                }
                for sq in Square::all() {
                    let differs = before.get(sq) != after.get(sq);
                    let marked = bits & (1u128 << sq.index()) != 0;
                    assert_eq!(marked, differs, "{sq:?} after {}", m.to_usi());
                }
            }
        }
    }
}

#[test]
fn test_maintained_effects_match_full_scan() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(33);
    for _ in 0..20 {
        let mut pos = position(SFEN_HIRATE);
        let mut played = Vec::new();
        for _ in 0..MAX_PLIES {
            let Some(m) = random_legal_move(&mut rng, &pos) else {
                break;
            };
            pos.do_move(m);
            played.push(m);
            assert_eq!(*pos.effects(), BoardEffects::compute(&pos), "after {}", m.to_usi());
        }
        // 巻き戻しでも同じ利き数に戻る
        while let Some(m) = played.pop() {
            pos.undo_move(m);
            assert_eq!(*pos.effects(), BoardEffects::compute(&pos), "undo {}", m.to_usi());
        }
    }
}

// =============================================================================
// HalfKP 特徴量
// =============================================================================

fn sorted(mut v: Vec<usize>) -> Vec<usize> {
    v.sort_unstable();
    v
}

#[test]
fn test_half_kp_changes_reproduce_active_set() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
    for _ in 0..10 {
        let mut pos = position(SFEN_HIRATE);
        let mut list = PsqList::new(&pos);
        let mut active: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
        for c in Color::ALL {
            append_active_indices(&pos, &list, c, &mut active[c.index()]);
        }

        for _ in 0..MAX_PLIES {
            let Some(m) = random_legal_move(&mut rng, &pos) else {
                break;
            };
            pos.do_move(m);
            let changed = list.make_move(m);

            for c in Color::ALL {
                let features = &mut active[c.index()];
                if needs_refresh(&changed, c) {
                    features.clear();
                    append_active_indices(&pos, &list, c, features);
                    continue;
                }
                let (mut removed, mut added) = (Vec::new(), Vec::new());
                append_changed_indices(&pos, &changed, c, &mut removed, &mut added);
                for r in removed {
                    let i = features.iter().position(|&f| f == r).unwrap();
                    features.swap_remove(i);
                }
                features.extend(added);

                let mut expected = Vec::new();
                append_active_indices(&pos, &PsqList::new(&pos), c, &mut expected);
                let actual = sorted(features.clone());
                assert_eq!(actual, sorted(expected), "{c:?} after {}", m.to_usi());
            }
        }
    }
}
