//! 三駒関係の副評価関数（KK / KKP / KPP + 駒割り）
//!
//! 主評価関数と同じ PsqIndex をキーにした 3 つのテーブルを持つ。
//!
//! - KK  [先手玉の升][後手玉の升]
//! - KKP [先手玉の升][後手玉の升][駒（先手視点）]
//! - KPP [玉の升][駒1][駒2]（駒1 > 駒2 の三角行列）
//!
//! KPP は後手玉について盤を 180 度回転し、後手視点の PsqIndex で引く。
//! 駒割りは `FV_SCALE` 倍して他の項と同じ単位にそろえる。
//!
//! ## ファイル形式
//!
//! KK（i32）、KKP（i32）、KPP（i16）をこの順にリトルエンディアンで並べる。

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::material::{exchange_value, piece_value, promotion_value};
use super::params::EvalLoadError;
use super::psq::{PsqIndex, PsqPair, PSQ_INDEX_MAX};
use super::psq_list::{ChangedPsq, PsqList};
use super::secondary::{SecondaryDetail, SecondaryEvaluator};
use crate::position::Position;
use crate::types::{Color, PieceType, Square};

/// 生の値の 1 単位（駒割り 1 点あたり）
pub const FV_SCALE: i32 = 32;

/// センチポーン換算で 100 になる歩の価値
const PAWN_VALUE: i64 = 90;

const KK_SIZE: usize = Square::NUM * Square::NUM;
const KKP_SIZE: usize = Square::NUM * Square::NUM * PSQ_INDEX_MAX;
const KPP_PER_KING: usize = PSQ_INDEX_MAX * (PSQ_INDEX_MAX - 1) / 2;
const KPP_SIZE: usize = Square::NUM * KPP_PER_KING;

/// 読み込み時のチャンク（要素数）
const CHUNK: usize = 1 << 16;

/// 三駒関係の評価関数
pub struct ThreePieceEvaluator {
    kk: Vec<i32>,
    kkp: Vec<i32>,
    kpp: Vec<i16>,
}

impl ThreePieceEvaluator {
    pub fn zeroed() -> Self {
        ThreePieceEvaluator {
            kk: vec![0; KK_SIZE],
            kkp: vec![0; KKP_SIZE],
            kpp: vec![0; KPP_SIZE],
        }
    }

    /// 乱数で埋めた評価関数（動作確認・テスト用）
    ///
    /// KPP は表が大きいため、初期配置の玉の周辺（手番側から見て 4〜6 筋の 8・9 段目）だけを埋める。
    pub fn random(seed: u64) -> Self {
        let mut eval = Self::zeroed();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        eval.fill_random(&mut rng, |ksq| {
            (3..=5).contains(&ksq.file().index()) && ksq.rank().index() >= 7
        });
        eval
    }

    /// KK・KKP を全て、KPP は `kpp_kings` が真を返す玉の升だけ乱数で埋める
    pub fn fill_random<R: Rng>(&mut self, rng: &mut R, kpp_kings: impl Fn(Square) -> bool) {
        for v in self.kk.iter_mut() {
            *v = rng.random_range(-2048..=2048);
        }
        for v in self.kkp.iter_mut() {
            *v = rng.random_range(-512..=512);
        }
        for ksq in Square::all().filter(|&sq| kpp_kings(sq)) {
            let base = ksq.index() * KPP_PER_KING;
            for v in self.kpp[base..base + KPP_PER_KING].iter_mut() {
                *v = rng.random_range(-256..=256);
            }
        }
    }

    /// ファイルの期待サイズ（バイト）
    pub const fn blob_size() -> u64 {
        ((KK_SIZE + KKP_SIZE) * 4 + KPP_SIZE * 2) as u64
    }

    /// ファイルから読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EvalLoadError> {
        let path = path.as_ref();
        let io_err = |source| EvalLoadError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(io_err)?;
        let actual = file.metadata().map_err(io_err)?.len();
        let expected = Self::blob_size();
        if actual != expected {
            return Err(EvalLoadError::SizeMismatch {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }

        let mut reader = BufReader::new(file);
        let eval = Self::read(&mut reader).map_err(io_err)?;
        log::info!("loaded three-piece tables from {} ({} bytes)", path.display(), actual);
        Ok(eval)
    }

    /// リーダーから読み込む
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut eval = Self::zeroed();
        read_values(reader, &mut eval.kk, |b: &[u8; 4]| i32::from_le_bytes(*b))?;
        read_values(reader, &mut eval.kkp, |b: &[u8; 4]| i32::from_le_bytes(*b))?;
        read_values(reader, &mut eval.kpp, |b: &[u8; 2]| i16::from_le_bytes(*b))?;

        let mut extra = [0u8; 1];
        if reader.read(&mut extra)? != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "trailing data after three-piece tables",
            ));
        }
        Ok(eval)
    }

    // =========================================================================
    // テーブル参照
    // =========================================================================

    #[inline]
    fn kk(&self, bk: Square, wk: Square) -> i32 {
        self.kk[bk.index() * Square::NUM + wk.index()]
    }

    #[inline]
    fn kkp(&self, bk: Square, wk: Square, psq: PsqIndex) -> i32 {
        self.kkp[(bk.index() * Square::NUM + wk.index()) * PSQ_INDEX_MAX + psq.index()]
    }

    /// KPP（a ≠ b、順不同）
    #[inline]
    fn kpp(&self, ksq: Square, a: PsqIndex, b: PsqIndex) -> i32 {
        debug_assert!(a != b, "KPP with identical pieces");
        let (hi, lo) = if a > b { (a.index(), b.index()) } else { (b.index(), a.index()) };
        self.kpp[ksq.index() * KPP_PER_KING + hi * (hi - 1) / 2 + lo] as i32
    }

    /// 先手玉と回転した後手玉の升
    #[inline]
    fn kings(pos: &Position) -> Option<(Square, Square)> {
        Some((pos.king_square(Color::Black)?, pos.king_square(Color::White)?))
    }

    /// 指定した駒（1 個か 2 個）が関わる KKP・KPP の和
    ///
    /// 2 個のときは、2 駒の組が二重に数えられる分を引く。
    fn pieces<I>(&self, bk: Square, wk: Square, pieces: &[PsqPair], list: I) -> SecondaryDetail
    where
        I: Iterator<Item = PsqPair> + Clone,
    {
        debug_assert!(pieces.len() <= 2);
        let wk_inv = wk.inverse();
        let mut detail = SecondaryDetail::default();
        for &p in pieces {
            detail.kkp += self.kkp(bk, wk, p.black());
            for q in list.clone() {
                if q.black() == p.black() {
                    continue;
                }
                detail.kpp[0] += self.kpp(bk, p.black(), q.black());
                detail.kpp[1] += self.kpp(wk_inv, p.white(), q.white());
            }
        }
        if let [p1, p2] = pieces {
            detail.kpp[0] -= self.kpp(bk, p1.black(), p2.black());
            detail.kpp[1] -= self.kpp(wk_inv, p1.white(), p2.white());
        }
        detail
    }

    /// 玉の移動で全体が変わる KK・KKP・KPP[c]
    fn king_terms(&self, bk: Square, wk: Square, c: Color, list: &PsqList) -> SecondaryDetail {
        let mut detail = SecondaryDetail {
            kk: self.kk(bk, wk),
            ..Default::default()
        };
        for &p in list.iter() {
            detail.kkp += self.kkp(bk, wk, p.black());
        }
        let ksq = match c {
            Color::Black => bk,
            Color::White => wk.inverse(),
        };
        let items = list.as_slice();
        for (i, p) in items.iter().enumerate() {
            for q in &items[..i] {
                detail.kpp[c.index()] += self.kpp(ksq, p.get(c), q.get(c));
            }
        }
        detail
    }
}

fn read_values<R: Read, T, const N: usize>(
    reader: &mut R,
    table: &mut [T],
    decode: impl Fn(&[u8; N]) -> T,
) -> io::Result<()> {
    let mut buf = vec![0u8; CHUNK * N];
    for chunk in table.chunks_mut(CHUNK) {
        let bytes = &mut buf[..chunk.len() * N];
        reader.read_exact(bytes)?;
        for (v, raw) in chunk.iter_mut().zip(bytes.chunks_exact(N)) {
            let mut b = [0u8; N];
            b.copy_from_slice(raw);
            *v = decode(&b);
        }
    }
    Ok(())
}

/// 先手から見た駒割り（玉を除く）
fn material(pos: &Position) -> i32 {
    let mut sum = 0;
    for (_, pc) in pos.pieces() {
        if pc.is(PieceType::King) {
            continue;
        }
        let v = piece_value(pc.piece_type());
        sum += if pc.color() == Color::Black { v } else { -v };
    }
    for c in Color::ALL {
        let hand = pos.hand(c);
        for pt in PieceType::HAND_PIECES {
            let v = piece_value(pt) * hand.count(pt) as i32;
            sum += if c == Color::Black { v } else { -v };
        }
    }
    sum
}

/// 直前の指し手による駒割りの変化（先手から見た値）
fn material_difference(pos: &Position) -> i32 {
    let m = pos.last_move();
    if m.is_drop() {
        return 0;
    }
    let mut diff = 0;
    if m.is_promotion() {
        diff += promotion_value(m.piece().piece_type());
    }
    if m.is_capture() {
        diff += exchange_value(m.captured_piece().piece_type());
    }
    // 指した側は手番の反対側
    match pos.side_to_move() {
        Color::Black => -diff,
        Color::White => diff,
    }
}

impl SecondaryEvaluator for ThreePieceEvaluator {
    fn name(&self) -> &str {
        "three-piece"
    }

    fn evaluate_all(&self, pos: &Position, list: &PsqList) -> SecondaryDetail {
        let Some((bk, wk)) = Self::kings(pos) else {
            return SecondaryDetail::default();
        };
        let mut detail = self.king_terms(bk, wk, Color::Black, list);
        detail.kpp[1] = self.king_terms(bk, wk, Color::White, list).kpp[1];
        detail.material = material(pos) * FV_SCALE;
        detail
    }

    fn evaluate_difference(
        &self,
        pos: &Position,
        previous: &SecondaryDetail,
        after: &PsqList,
        changed: &ChangedPsq,
    ) -> SecondaryDetail {
        let Some((bk, wk)) = Self::kings(pos) else {
            return SecondaryDetail::default();
        };

        let mut diff = SecondaryDetail::default();
        diff -= self.pieces(bk, wk, changed.old_pairs(), changed.before(after));
        diff += self.pieces(bk, wk, changed.new_pairs(), after.iter().copied());

        if let Some(c) = changed.moved_king {
            let terms = self.king_terms(bk, wk, c, after);
            diff.kk = terms.kk - previous.kk;
            diff.kkp = terms.kkp - previous.kkp;
            diff.kpp[c.index()] = terms.kpp[c.index()] - previous.kpp[c.index()];
        }

        diff.material = material_difference(pos) * FV_SCALE;
        diff
    }

    fn centipawn_ratio(&self) -> (i64, i64) {
        (100, FV_SCALE as i64 * PAWN_VALUE)
    }
}

impl std::fmt::Debug for ThreePieceEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreePieceEvaluator").finish_non_exhaustive()
    }
}
