//! Zobristハッシュ
//!
//! 乱数テーブルは固定シードの xoshiro で生成するため、実行ごとに同じキーになる。

use std::sync::LazyLock;

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::types::{Color, Piece, PieceType, Square};

/// 手駒の枚数ごとのキー数（歩の最大18枚 + 0枚分）
const HAND_COUNT_MAX: usize = 19;

/// Zobristテーブル
pub struct Zobrist {
    /// 手番（後手番のときに XOR する）
    pub side: u64,
    /// 駒×升
    psq: [[u64; Square::NUM]; Piece::NUM],
    /// 手駒 [color][hand_index][count]
    hand: [[[u64; HAND_COUNT_MAX]; PieceType::HAND_NUM]; Color::NUM],
}

/// グローバルなZobristテーブル
pub static ZOBRIST: LazyLock<Zobrist> = LazyLock::new(|| {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0x5EED_5106_1A15_0000);
    // bit 0 は手番専用にする
    let mut next = || rng.next_u64() & !1;

    let mut psq = [[0u64; Square::NUM]; Piece::NUM];
    for row in psq.iter_mut().skip(1) {
        for key in row.iter_mut() {
            *key = next();
        }
    }
    let mut hand = [[[0u64; HAND_COUNT_MAX]; PieceType::HAND_NUM]; Color::NUM];
    for per_color in hand.iter_mut() {
        for per_type in per_color.iter_mut() {
            // 0枚は 0 のまま
            for key in per_type.iter_mut().skip(1) {
                *key = next();
            }
        }
    }
    Zobrist { side: 1, psq, hand }
});

/// 駒×升のキー
#[inline]
pub fn zobrist_psq(pc: Piece, sq: Square) -> u64 {
    ZOBRIST.psq[pc.index()][sq.index()]
}

/// 手駒のキー（枚数ごと）
#[inline]
pub fn zobrist_hand(c: Color, pt: PieceType, count: u32) -> u64 {
    ZOBRIST.hand[c.index()][pt.hand_index()][count as usize]
}

/// 手番のキー
#[inline]
pub fn zobrist_side() -> u64 {
    ZOBRIST.side
}
