//! HalfKP 形式の入力特徴量
//!
//! 玉の升と PsqIndex の組 `king_square * PSQ_INDEX_MAX + psq_index` を
//! 先手・後手の両視点で列挙する。後手視点では玉の升を 180 度回転し、
//! 後手視点の PsqIndex を使う。
//!
//! 差分は `PsqList::make_move` が返す `ChangedPsq` から作る。
//! 自玉が動いた視点は全特徴量が入れ替わるので、差分ではなく作り直しになる。

use super::psq::{PsqIndex, PSQ_INDEX_MAX};
use super::psq_list::{ChangedPsq, PsqList};
use crate::position::Position;
use crate::types::{Color, Square};

/// 1 視点あたりの特徴量の次元
pub const HALF_KP_DIMENSIONS: usize = Square::NUM * PSQ_INDEX_MAX;

/// 特徴量インデックス
#[inline]
pub fn make_index(ksq: Square, psq: PsqIndex) -> usize {
    ksq.index() * PSQ_INDEX_MAX + psq.index()
}

/// 視点 `perspective` の玉の升（後手は回転済み）
#[inline]
fn king_square(pos: &Position, perspective: Color) -> Option<Square> {
    pos.king_square(perspective).map(|sq| sq.relative(perspective))
}

/// 有効な特徴量を全て追加する
pub fn append_active_indices(
    pos: &Position,
    list: &PsqList,
    perspective: Color,
    active: &mut Vec<usize>,
) {
    let Some(ksq) = king_square(pos, perspective) else {
        return;
    };
    active.extend(list.iter().map(|pair| make_index(ksq, pair.get(perspective))));
}

/// 直前の指し手で消えた特徴量と加わった特徴量を追加する
///
/// `pos` は指し手を適用した後の局面。`needs_refresh` が真の視点では使わないこと。
pub fn append_changed_indices(
    pos: &Position,
    changed: &ChangedPsq,
    perspective: Color,
    removed: &mut Vec<usize>,
    added: &mut Vec<usize>,
) {
    debug_assert!(!needs_refresh(changed, perspective));
    let Some(ksq) = king_square(pos, perspective) else {
        return;
    };
    for (old, new) in changed.iter() {
        removed.push(make_index(ksq, old.get(perspective)));
        added.push(make_index(ksq, new.get(perspective)));
    }
}

/// 視点 `perspective` の特徴量を作り直す必要があるか（自玉が動いた）
#[inline]
pub fn needs_refresh(changed: &ChangedPsq, perspective: Color) -> bool {
    changed.moved_king == Some(perspective)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movegen::{generate_legal, MoveList};
    use crate::position::SFEN_HIRATE;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn sorted(mut v: Vec<usize>) -> Vec<usize> {
        v.sort_unstable();
        v
    }

    #[test]
    fn test_incremental_matches_active() {
        let mut pos = Position::new();
        pos.set_sfen(SFEN_HIRATE).unwrap();
        let mut list = PsqList::new(&pos);
        let mut active: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
        for c in Color::ALL {
            append_active_indices(&pos, &list, c, &mut active[c.index()]);
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        for _ in 0..120 {
            let mut moves = MoveList::new();
            generate_legal(&pos, &mut moves);
            if moves.is_empty() {
                break;
            }
            let m = moves.as_slice()[rng.random_range(0..moves.len())];
            pos.do_move(m);
            let changed = list.make_move(m);

            for c in Color::ALL {
                let features = &mut active[c.index()];
                if needs_refresh(&changed, c) {
                    features.clear();
                    append_active_indices(&pos, &list, c, features);
                } else {
                    let mut removed = Vec::new();
                    let mut added = Vec::new();
                    append_changed_indices(&pos, &changed, c, &mut removed, &mut added);
                    for r in removed {
                        let i = features.iter().position(|&f| f == r).unwrap();
                        features.swap_remove(i);
                    }
                    features.extend(added);
                }

                let mut expected = Vec::new();
                append_active_indices(&pos, &PsqList::new(&pos), c, &mut expected);
                assert_eq!(sorted(features.clone()), sorted(expected), "after {}", m.to_usi());
            }
        }
    }

    #[test]
    fn test_index_range() {
        let mut pos = Position::new();
        pos.set_sfen(SFEN_HIRATE).unwrap();
        let list = PsqList::new(&pos);
        let mut active = Vec::new();
        append_active_indices(&pos, &list, Color::White, &mut active);
        assert_eq!(active.len(), 38);
        assert!(active.iter().all(|&i| i < HALF_KP_DIMENSIONS));
    }
}
