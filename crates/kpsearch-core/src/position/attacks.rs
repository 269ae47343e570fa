//! 駒の利き
//!
//! 盤面は `Fn(Square) -> Piece` の「ビュー」として受け取る。
//! 合法性判定やSEEでは、実際の盤面に一時的な変更を重ねたビューを渡すことで
//! 局面を書き換えずに利きを調べる。
//!
//! 差分 (df, dr) は先手から見た向きで持ち、後手の駒は符号を反転して使う。
//! dr = -1 が前（一段目の方向）。

use crate::types::{Color, Piece, PieceType, Square};

const UP: (i32, i32) = (0, -1);
const DOWN: (i32, i32) = (0, 1);
const LEFT: (i32, i32) = (1, 0);
const RIGHT: (i32, i32) = (-1, 0);
const UP_LEFT: (i32, i32) = (1, -1);
const UP_RIGHT: (i32, i32) = (-1, -1);
const DOWN_LEFT: (i32, i32) = (1, 1);
const DOWN_RIGHT: (i32, i32) = (-1, 1);

const GOLD_STEPS: &[(i32, i32)] = &[UP_RIGHT, UP, UP_LEFT, RIGHT, LEFT, DOWN];
const SILVER_STEPS: &[(i32, i32)] = &[UP_RIGHT, UP, UP_LEFT, DOWN_RIGHT, DOWN_LEFT];
const KING_STEPS: &[(i32, i32)] =
    &[UP_RIGHT, RIGHT, DOWN_RIGHT, UP, DOWN, UP_LEFT, LEFT, DOWN_LEFT];
const ORTHOGONAL: &[(i32, i32)] = &[RIGHT, UP, DOWN, LEFT];
const DIAGONAL: &[(i32, i32)] = &[UP_RIGHT, DOWN_RIGHT, UP_LEFT, DOWN_LEFT];

/// 全8方向（逆引き走査用）
pub(crate) const ALL_DIRECTIONS: &[(i32, i32)] = KING_STEPS;

/// 1マスだけ動ける方向（先手視点）
pub(crate) const fn step_deltas(pt: PieceType) -> &'static [(i32, i32)] {
    match pt {
        PieceType::Pawn => &[UP],
        PieceType::Knight => &[(-1, -2), (1, -2)],
        PieceType::Silver => SILVER_STEPS,
        PieceType::Gold
        | PieceType::ProPawn
        | PieceType::ProLance
        | PieceType::ProKnight
        | PieceType::ProSilver => GOLD_STEPS,
        PieceType::King => KING_STEPS,
        PieceType::Horse => ORTHOGONAL,
        PieceType::Dragon => DIAGONAL,
        PieceType::Lance | PieceType::Bishop | PieceType::Rook => &[],
    }
}

/// 遠方に利く方向（先手視点）
pub(crate) const fn slide_deltas(pt: PieceType) -> &'static [(i32, i32)] {
    match pt {
        PieceType::Lance => &[UP],
        PieceType::Bishop | PieceType::Horse => DIAGONAL,
        PieceType::Rook | PieceType::Dragon => ORTHOGONAL,
        _ => &[],
    }
}

/// 手番に合わせて向きを変えた差分
#[inline]
pub(crate) const fn oriented(c: Color, d: (i32, i32)) -> (i32, i32) {
    match c {
        Color::Black => d,
        Color::White => (-d.0, -d.1),
    }
}

fn contains(deltas: &[(i32, i32)], d: (i32, i32)) -> bool {
    deltas.iter().any(|&x| x == d)
}

/// 駒 `pc` が `from` から利いている升を列挙する
pub(crate) fn for_each_attack<V, F>(view: &V, pc: Piece, from: Square, mut f: F)
where
    V: Fn(Square) -> Piece,
    F: FnMut(Square),
{
    let c = pc.color();
    let pt = pc.piece_type();
    for &d in step_deltas(pt) {
        let (df, dr) = oriented(c, d);
        if let Some(to) = from.offset(df, dr) {
            f(to);
        }
    }
    for &d in slide_deltas(pt) {
        let (df, dr) = oriented(c, d);
        let mut cur = from;
        while let Some(to) = cur.offset(df, dr) {
            f(to);
            if view(to).is_some() {
                break;
            }
            cur = to;
        }
    }
}

/// `sq` に利いている `by` 側の駒の升を列挙する
///
/// 8方向を逆向きにたどり、最初に当たった駒が利いているかを調べる。桂馬は別途。
pub(crate) fn for_each_attacker<V, F>(view: &V, sq: Square, by: Color, mut f: F)
where
    V: Fn(Square) -> Piece,
    F: FnMut(Square, Piece),
{
    for &(df, dr) in ALL_DIRECTIONS {
        let mut cur = sq;
        let mut distance = 0;
        while let Some(s) = cur.offset(df, dr) {
            distance += 1;
            let pc = view(s);
            if pc.is_some() {
                if pc.color() == by {
                    // 駒から sq への向き（駒の手番視点）
                    let toward = oriented(by, (-df, -dr));
                    let pt = pc.piece_type();
                    let hit = contains(slide_deltas(pt), toward)
                        || (distance == 1 && contains(step_deltas(pt), toward));
                    if hit {
                        f(s, pc);
                    }
                }
                break;
            }
            cur = s;
        }
    }
    // 桂馬は sq から見て (±1, +2)（先手の桂）の位置にいる
    for df in [-1, 1] {
        let (kf, kr) = oriented(by, (df, 2));
        if let Some(s) = sq.offset(kf, kr) {
            let pc = view(s);
            if pc.is_some() && pc.color() == by && pc.piece_type() == PieceType::Knight {
                f(s, pc);
            }
        }
    }
}

/// `sq` に `by` 側の利きがあるか
#[inline]
pub(crate) fn is_attacked<V>(view: &V, sq: Square, by: Color) -> bool
where
    V: Fn(Square) -> Piece,
{
    let mut found = false;
    for_each_attacker(view, sq, by, |_, _| found = true);
    found
}

/// `sq` に利いている `by` 側の駒の数
#[inline]
pub(crate) fn count_attackers<V>(view: &V, sq: Square, by: Color) -> u32
where
    V: Fn(Square) -> Piece,
{
    let mut n = 0;
    for_each_attacker(view, sq, by, |_, _| n += 1);
    n
}

/// `from` の駒が `to` に利いているか（盤面の遮りを考慮）
pub(crate) fn attacks_square<V>(view: &V, pc: Piece, from: Square, to: Square) -> bool
where
    V: Fn(Square) -> Piece,
{
    let mut hit = false;
    for_each_attack(view, pc, from, |s| hit |= s == to);
    hit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{File, Rank};

    fn empty(_: Square) -> Piece {
        Piece::NONE
    }

    #[test]
    fn test_knight_attacks() {
        let from = Square::new(File::File5, Rank::Rank5);
        let mut targets = Vec::new();
        for_each_attack(&empty, Piece::B_KNIGHT, from, |s| targets.push(s));
        targets.sort();
        let mut expected = vec![
            Square::new(File::File4, Rank::Rank3),
            Square::new(File::File6, Rank::Rank3),
        ];
        expected.sort();
        assert_eq!(targets, expected);

        // 後手の桂は下向き
        let mut white = Vec::new();
        for_each_attack(&empty, Piece::W_KNIGHT, from, |s| white.push(s));
        assert!(white.contains(&Square::new(File::File4, Rank::Rank7)));
    }

    #[test]
    fn test_attacker_scan_matches_forward_scan() {
        let rook_sq = Square::new(File::File2, Rank::Rank8);
        let blocker = Square::new(File::File2, Rank::Rank4);
        let view = |s: Square| {
            if s == rook_sq {
                Piece::B_ROOK
            } else if s == blocker {
                Piece::W_PAWN
            } else {
                Piece::NONE
            }
        };
        assert!(is_attacked(&view, blocker, Color::Black));
        assert!(!is_attacked(&view, Square::new(File::File2, Rank::Rank3), Color::Black));
        assert_eq!(count_attackers(&view, Square::new(File::File5, Rank::Rank8), Color::Black), 1);
        assert!(attacks_square(&view, Piece::B_ROOK, rook_sq, blocker));
    }

    #[test]
    fn test_white_pawn_attacks_downward() {
        let sq = Square::new(File::File7, Rank::Rank3);
        let view = |s: Square| if s == sq { Piece::W_PAWN } else { Piece::NONE };
        assert!(is_attacked(&view, Square::new(File::File7, Rank::Rank4), Color::White));
        assert!(!is_attacked(&view, Square::new(File::File7, Rank::Rank2), Color::White));
    }
}
