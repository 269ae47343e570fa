//! 飛車・角・香車の利き
//!
//! 飛び駒の各方向について、利きの届く最後の升（駒に当たった升、または盤端）を
//! 自玉・相手玉との位置関係と、そこにある駒への当たりで評価する。
//! 後手の駒は盤を 180 度回転して先手の駒として評価する。

use super::packed::PackedScore;
use super::params::{EvalParameters, SliderKind};
use crate::position::Position;
use crate::position::attacks::{oriented, slide_deltas};
use crate::types::{Color, PieceType, Square};

/// 両者の飛び駒の評価の合計（先手視点）
pub fn evaluate_sliders(params: &EvalParameters, pos: &Position) -> PackedScore {
    sliders_of(params, pos, Color::Black) + sliders_of(params, pos, Color::White)
}

/// `from` から (df, dr) 方向に進み、駒に当たるか盤端に着いた升
#[inline]
fn ray_end(pos: &Position, from: Square, df: i32, dr: i32) -> Option<Square> {
    let mut last = None;
    let mut cur = from;
    while let Some(sq) = cur.offset(df, dr) {
        last = Some(sq);
        if pos.piece_on(sq).is_some() {
            break;
        }
        cur = sq;
    }
    last
}

fn sliders_of(params: &EvalParameters, pos: &Position, c: Color) -> PackedScore {
    let (Some(own_ksq), Some(opp_ksq)) = (pos.king_square(c), pos.king_square(!c)) else {
        return PackedScore::ZERO;
    };
    let own_ksq = own_ksq.relative(c);
    let opp_ksq = opp_ksq.relative(c);

    let mut sum = PackedScore::ZERO;
    for (from, pc) in pos.pieces() {
        if pc.color() != c {
            continue;
        }
        let pt = pc.piece_type();
        let kind = match pt {
            PieceType::Rook | PieceType::Dragon => SliderKind::Rook,
            PieceType::Bishop | PieceType::Horse => SliderKind::Bishop,
            PieceType::Lance => SliderKind::Lance,
            _ => continue,
        };

        for &d in slide_deltas(pt) {
            let (df, dr) = oriented(c, d);
            let Some(to) = ray_end(pos, from, df, dr) else {
                continue;
            };
            let threatened = pos.piece_on(to);
            let (from, to, threatened) = match c {
                Color::Black => (from, to, threatened),
                Color::White => (from.inverse(), to.inverse(), threatened.opponent_piece()),
            };
            sum += params.slider_control(kind, Color::Black, own_ksq, from, to);
            sum += params.slider_control(kind, Color::White, opp_ksq, from, to);
            sum += params.slider_threat(kind, opp_ksq, to, threatened.index());
        }
    }

    match c {
        Color::Black => sum,
        Color::White => sum.flip2x2(),
    }
}
