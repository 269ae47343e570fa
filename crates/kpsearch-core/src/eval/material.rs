//! 駒の価値
//!
//! 駒割り（三駒関係評価の駒得点）、駒交換の価値（SEE・MVV-LVA）、
//! 成りによる価値の上昇をまとめる。

use crate::types::{Piece, PieceType};

/// 駒の価値（歩 = 90）
#[inline]
pub const fn piece_value(pt: PieceType) -> i32 {
    match pt {
        PieceType::Pawn => 90,
        PieceType::Lance => 315,
        PieceType::Knight => 405,
        PieceType::Silver => 495,
        PieceType::Gold
        | PieceType::ProPawn
        | PieceType::ProLance
        | PieceType::ProKnight
        | PieceType::ProSilver => 540,
        PieceType::Bishop => 855,
        PieceType::Rook => 990,
        PieceType::Horse => 945,
        PieceType::Dragon => 1395,
        PieceType::King => 15000,
    }
}

/// 駒の価値（NONE は 0）
#[inline]
pub const fn piece_value_of(pc: Piece) -> i32 {
    if pc.is_none() { 0 } else { piece_value(pc.piece_type()) }
}

/// 駒を取ったときに動く価値（盤上から消える分 + 手駒に加わる分）
#[inline]
pub const fn exchange_value(pt: PieceType) -> i32 {
    piece_value(pt) + piece_value(pt.unpromote())
}

/// 成ったときに増える価値（成れない駒は 0）
#[inline]
pub const fn promotion_value(pt: PieceType) -> i32 {
    match pt.promote() {
        Some(promoted) => piece_value(promoted) - piece_value(pt),
        None => 0,
    }
}

/// 駒交換で先に使う順（安い駒ほど小さい、16未満）
#[inline]
pub const fn exchange_order(pt: PieceType) -> i32 {
    match pt {
        PieceType::Pawn => 1,
        PieceType::Lance => 2,
        PieceType::Knight => 3,
        PieceType::ProPawn => 4,
        PieceType::ProLance => 5,
        PieceType::ProKnight => 6,
        PieceType::Silver => 7,
        PieceType::ProSilver => 8,
        PieceType::Gold => 9,
        PieceType::Bishop => 10,
        PieceType::Horse => 11,
        PieceType::Rook => 12,
        PieceType::Dragon => 13,
        PieceType::King => 14,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_values() {
        assert_eq!(exchange_value(PieceType::Pawn), 180);
        assert_eq!(exchange_value(PieceType::Dragon), 1395 + 990);
        assert_eq!(promotion_value(PieceType::Pawn), 450);
        assert_eq!(promotion_value(PieceType::Gold), 0);
        assert!(PieceType::ALL.iter().all(|&pt| exchange_order(pt) < 16));
        assert_eq!(piece_value_of(Piece::NONE), 0);
    }
}
