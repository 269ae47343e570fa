//! 評価パラメータ
//!
//! 全テーブルを 1 つの構造体にまとめ、`Arc` で共有して使う。
//! 読み込み後は不変なので、複数スレッドから同時に参照してよい。
//!
//! ## ファイル形式
//!
//! 各エントリは 4 個の i32（リトルエンディアン）。以下の順に連続して並ぶ。
//!
//! | テーブル | 次元 |
//! |---|---|
//! | king_piece | [玉の升 81][PsqIndex 2110] |
//! | two_pieces | PsqIndex の組（三角行列、対角を含む） |
//! | controls | [先手玉/後手玉 2][玉の升 81][PsqControlIndex 41472] |
//! | king_safety | [持ち駒集合 256][方向 8][駒 32][攻め方の利き 4][受け方の利き 4] |
//! | rook/bishop/lance control | [先手玉/後手玉 2][玉の升 81][駒の升 81][利きの升 81] × 3 |
//! | rook/bishop/lance threat | [相手玉の升 81][利きの升 81][駒 32] × 3 |
//!
//! 末尾に手番評価 `tempo` の i32 が 3 個（序盤・中盤・終盤）続く。

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::control::PSQ_CONTROL_INDEX_MAX;
use super::packed::PackedScore;
use super::psq::{PsqIndex, PSQ_INDEX_MAX};
use crate::types::{Color, Direction, Square};

/// 持ち駒集合の次元（bit 0 は穴熊フラグ）
pub const HAND_SET_DIM: usize = 256;

/// 駒の次元（盤外を表す 31 を含む）
pub const PIECE_DIM: usize = 32;

/// 盤外（壁）を表す駒インデックス
pub const WALL: usize = 31;

const KP_SIZE: usize = Square::NUM * PSQ_INDEX_MAX;
const PP_SIZE: usize = PSQ_INDEX_MAX * (PSQ_INDEX_MAX + 1) / 2;
const CONTROLS_SIZE: usize = Color::NUM * Square::NUM * PSQ_CONTROL_INDEX_MAX;
const KING_SAFETY_SIZE: usize = HAND_SET_DIM * Direction::NUM * PIECE_DIM * 4 * 4;
const SLIDER_CONTROL_SIZE: usize = Color::NUM * Square::NUM * Square::NUM * Square::NUM;
const SLIDER_THREAT_SIZE: usize = Square::NUM * Square::NUM * PIECE_DIM;

/// 1エントリのバイト数
const ENTRY_BYTES: usize = 16;

/// 読み込み時のチャンク（エントリ数）
const CHUNK: usize = 1 << 14;

/// 飛び駒の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderKind {
    Rook = 0,
    Bishop = 1,
    Lance = 2,
}

/// 評価パラメータ読み込みのエラー
#[derive(thiserror::Error, Debug)]
pub enum EvalLoadError {
    /// ファイルの読み込みに失敗
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// ファイルサイズがテーブルの大きさと一致しない
    #[error("{path}: size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
}

/// 評価パラメータ（重み）
pub struct EvalParameters {
    king_piece: Vec<[i32; 4]>,
    two_pieces: Vec<[i32; 4]>,
    controls: Vec<[i32; 4]>,
    king_safety: Vec<[i32; 4]>,
    slider_control: [Vec<[i32; 4]>; 3],
    slider_threat: [Vec<[i32; 4]>; 3],
    /// 手番評価（序盤・中盤・終盤）
    pub tempo: [i32; 3],
}

impl EvalParameters {
    /// 全てゼロのパラメータ
    pub fn zeroed() -> Self {
        EvalParameters {
            king_piece: vec![[0; 4]; KP_SIZE],
            two_pieces: vec![[0; 4]; PP_SIZE],
            controls: vec![[0; 4]; CONTROLS_SIZE],
            king_safety: vec![[0; 4]; KING_SAFETY_SIZE],
            slider_control: std::array::from_fn(|_| vec![[0; 4]; SLIDER_CONTROL_SIZE]),
            slider_threat: std::array::from_fn(|_| vec![[0; 4]; SLIDER_THREAT_SIZE]),
            tempo: [0; 3],
        }
    }

    /// 乱数で埋めたパラメータ（動作確認・テスト用）
    pub fn random(seed: u64) -> Self {
        let mut params = Self::zeroed();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        params.fill_random(&mut rng);
        params
    }

    /// 全テーブルを乱数で埋める
    ///
    /// 値はおよそ ±1 歩の範囲に収める。
    pub fn fill_random<R: Rng>(&mut self, rng: &mut R) {
        const RANGE: i32 = 1 << 16;
        for table in self.tables_mut() {
            for entry in table.iter_mut() {
                for v in entry.iter_mut() {
                    *v = rng.random_range(-RANGE..=RANGE);
                }
            }
        }
        for t in self.tempo.iter_mut() {
            *t = rng.random_range(-RANGE..=RANGE);
        }
    }

    /// ファイルの期待サイズ（バイト）
    pub const fn blob_size() -> u64 {
        let entries = KP_SIZE
            + PP_SIZE
            + CONTROLS_SIZE
            + KING_SAFETY_SIZE
            + 3 * SLIDER_CONTROL_SIZE
            + 3 * SLIDER_THREAT_SIZE;
        (entries * ENTRY_BYTES + 3 * 4) as u64
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
        let params = Self::read(&mut reader).map_err(io_err)?;
        log::info!("loaded eval parameters from {} ({} bytes)", path.display(), actual);
        Ok(params)
    }

    /// リーダーから読み込む
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut params = Self::zeroed();
        let mut buf = vec![0u8; CHUNK * ENTRY_BYTES];
        for table in params.tables_mut() {
            for chunk in table.chunks_mut(CHUNK) {
                let bytes = &mut buf[..chunk.len() * ENTRY_BYTES];
                reader.read_exact(bytes)?;
                for (entry, raw) in chunk.iter_mut().zip(bytes.chunks_exact(ENTRY_BYTES)) {
                    for (v, b) in entry.iter_mut().zip(raw.chunks_exact(4)) {
                        *v = i32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                    }
                }
            }
        }
        let mut buf4 = [0u8; 4];
        for t in params.tempo.iter_mut() {
            reader.read_exact(&mut buf4)?;
            *t = i32::from_le_bytes(buf4);
        }

        // 余分なデータが残っていれば形式違い
        let mut extra = [0u8; 1];
        if reader.read(&mut extra)? != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "trailing data after eval parameters",
            ));
        }
        Ok(params)
    }

    fn tables_mut(&mut self) -> impl Iterator<Item = &mut Vec<[i32; 4]>> {
        let [rc, bc, lc] = &mut self.slider_control;
        let [rt, bt, lt] = &mut self.slider_threat;
        [
            &mut self.king_piece,
            &mut self.two_pieces,
            &mut self.controls,
            &mut self.king_safety,
            rc,
            bc,
            lc,
            rt,
            bt,
            lt,
        ]
        .into_iter()
    }

    // =========================================================================
    // テーブル参照
    // =========================================================================

    /// KP [玉の升][駒]
    #[inline]
    pub fn king_piece(&self, ksq: Square, psq: PsqIndex) -> PackedScore {
        PackedScore(self.king_piece[ksq.index() * PSQ_INDEX_MAX + psq.index()])
    }

    /// PP [駒1][駒2]（対称）
    #[inline]
    pub fn two_pieces(&self, a: PsqIndex, b: PsqIndex) -> PackedScore {
        let (hi, lo) = if a >= b { (a.index(), b.index()) } else { (b.index(), a.index()) };
        PackedScore(self.two_pieces[hi * (hi + 1) / 2 + lo])
    }

    /// 利き [先手玉/後手玉][玉の升][利きインデックス]
    #[inline]
    pub fn controls(&self, king: Color, ksq: Square, idx: usize) -> PackedScore {
        debug_assert!(idx < PSQ_CONTROL_INDEX_MAX);
        let i = (king.index() * Square::NUM + ksq.index()) * PSQ_CONTROL_INDEX_MAX + idx;
        PackedScore(self.controls[i])
    }

    /// 玉の安全度 [持ち駒集合][方向][駒][攻め方の利き][受け方の利き]
    #[inline]
    pub fn king_safety(
        &self,
        hand_set: usize,
        dir: Direction,
        piece: usize,
        attacks: usize,
        defenses: usize,
    ) -> PackedScore {
        debug_assert!(hand_set < HAND_SET_DIM && piece < PIECE_DIM);
        debug_assert!(attacks < 4 && defenses < 4);
        let i = (((hand_set * Direction::NUM + dir.index()) * PIECE_DIM + piece) * 4 + attacks) * 4
            + defenses;
        PackedScore(self.king_safety[i])
    }

    /// 飛び駒の利き [先手玉/後手玉][玉の升][駒の升][利きの升]
    #[inline]
    pub fn slider_control(
        &self,
        kind: SliderKind,
        king: Color,
        ksq: Square,
        from: Square,
        to: Square,
    ) -> PackedScore {
        let i = ((king.index() * Square::NUM + ksq.index()) * Square::NUM + from.index())
            * Square::NUM
            + to.index();
        PackedScore(self.slider_control[kind as usize][i])
    }

    /// 飛び駒の利きがついている駒 [相手玉の升][利きの升][駒]
    #[inline]
    pub fn slider_threat(
        &self,
        kind: SliderKind,
        ksq: Square,
        to: Square,
        piece: usize,
    ) -> PackedScore {
        debug_assert!(piece < PIECE_DIM);
        let i = (ksq.index() * Square::NUM + to.index()) * PIECE_DIM + piece;
        PackedScore(self.slider_threat[kind as usize][i])
    }
}

impl std::fmt::Debug for EvalParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalParameters")
            .field("tempo", &self.tempo)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_pieces_symmetric() {
        let mut params = EvalParameters::zeroed();
        let a = PsqIndex::new(10);
        let b = PsqIndex::new(2000);
        let hi = b.index();
        params.two_pieces[hi * (hi + 1) / 2 + a.index()] = [1, 2, 3, 4];
        assert_eq!(params.two_pieces(a, b), PackedScore::new(1, 2, 3, 4));
        assert_eq!(params.two_pieces(b, a), PackedScore::new(1, 2, 3, 4));
        assert!(params.two_pieces(a, a).is_zero());
    }

    #[test]
    fn test_read_truncated() {
        let bytes = vec![0u8; 1024];
        let err = EvalParameters::read(&mut bytes.as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_load_size_mismatch() {
        let path = std::env::temp_dir().join(format!("kpsearch-params-{}.bin", std::process::id()));
        std::fs::write(&path, [0u8; 64]).unwrap();
        let err = EvalParameters::load(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        match err {
            EvalLoadError::SizeMismatch { expected, actual, .. } => {
                assert_eq!(expected, EvalParameters::blob_size());
                assert_eq!(actual, 64);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = EvalParameters::load("/nonexistent/params.bin").unwrap_err();
        assert!(matches!(err, EvalLoadError::Io { .. }));
    }
}
