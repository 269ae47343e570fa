//! 玉の安全度
//!
//! 玉の周囲 8 升について「その升の駒・攻め方の利き数・受け方の利き数」を、
//! 相手の持ち駒の集合と組み合わせて評価する。
//!
//! - 攻め方の利き数は 3 で頭打ち
//! - 受け方の利き数は玉自身の利きを除いてから 3 で頭打ち
//! - 持ち駒集合の bit 0 には穴熊（玉が 9九 か 1九）かどうかを入れる
//! - 後手玉は盤を 180 度回転して先手玉として評価する
//! - 玉が 1〜4 筋（手番側から見て）にいるときは左右反転し、
//!   「盤の端か中央か」で評価をそろえる

use super::packed::PackedScore;
use super::params::{EvalParameters, WALL};
use crate::position::Position;
use crate::position::attacks::count_attackers;
use crate::types::{Color, Direction, File, Square};

/// 両玉の安全度の合計（先手視点）
pub fn evaluate_king_safety(params: &EvalParameters, pos: &Position) -> PackedScore {
    king_safety_of(params, pos, Color::Black) + king_safety_of(params, pos, Color::White)
}

fn king_safety_of(params: &EvalParameters, pos: &Position, king_color: Color) -> PackedScore {
    let Some(ksq) = pos.king_square(king_color) else {
        return PackedScore::ZERO;
    };
    let relative_ksq = ksq.relative(king_color);
    let mirror = relative_ksq.file().index() <= File::File4.index();

    let mut hand_set = pos.hand(!king_color).hand_set() as usize;
    if relative_ksq == Square::SQ_99 || relative_ksq == Square::SQ_19 {
        hand_set |= 1;
    }

    let view = pos.view();
    let mut sum = PackedScore::ZERO;
    for dir in Direction::ALL {
        let dir_i = match king_color {
            Color::Black => dir,
            Color::White => dir.inverse(),
        };
        let dir_m = if mirror { dir_i.mirror() } else { dir_i };

        let (piece, attackers, defenders) = match ksq.step(dir_m) {
            None => (WALL, 0, 0),
            Some(sq) => {
                let pc = pos.piece_on(sq);
                let pc = match king_color {
                    Color::Black => pc,
                    Color::White => pc.opponent_piece(),
                };
                let attackers = count_attackers(&view, sq, !king_color).min(3);
                let defenders = count_attackers(&view, sq, king_color).saturating_sub(1).min(3);
                (pc.index(), attackers as usize, defenders as usize)
            }
        };
        sum += params.king_safety(hand_set, dir, piece, attackers, defenders);
    }

    match king_color {
        Color::Black => sum,
        Color::White => sum.flip2x2(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(sfen: &str) -> Position {
        let mut pos = Position::new();
        pos.set_sfen(sfen).unwrap();
        pos
    }

    #[test]
    fn test_symmetric_position_cancels() {
        // 先後対称な局面では、先手玉と後手玉の評価が打ち消し合う（手番成分を除く）
        let params = crate::eval::tests::random_params();
        let pos = position("lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1");
        let s = evaluate_king_safety(params, &pos);
        assert_eq!(s[0], 0);
        assert_eq!(s[2], 0);
    }

    #[test]
    fn test_mirrored_king_same_score() {
        // 左右反転した局面は同じ評価になる
        let params = crate::eval::tests::random_params();
        let left = position("4k4/9/9/9/9/9/9/1G7/1K7 b P 1");
        let right = position("4k4/9/9/9/9/9/9/7G1/7K1 b P 1");
        let l = king_safety_of(params, &left, Color::Black);
        let r = king_safety_of(params, &right, Color::Black);
        assert_eq!(l, r);
    }
}
