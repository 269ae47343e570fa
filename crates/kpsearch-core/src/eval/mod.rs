//! 評価関数モジュール
//!
//! - `PsqIndex` / `PsqList`: 玉以外の駒の特徴量インデックスとその差分更新
//! - `PsqControlList`: 升ごとの「駒・先後の利き数」インデックス
//! - `EvalParameters`: 重みテーブル（ファイルから読み込み、`Arc` で共有）
//! - `Evaluator`: KP・PP・利き・玉の安全度・飛び駒の全計算と差分計算、
//!   進行度による補間と副評価関数とのブレンド
//! - `ThreePieceEvaluator`: KK・KKP・KPP による副評価関数
//! - `features`: HalfKP 形式の入力特徴量

pub mod control;
pub mod detail;
pub mod evaluator;
pub mod features;
pub mod king_safety;
pub mod material;
pub mod packed;
pub mod params;
pub mod psq;
pub mod psq_list;
pub mod secondary;
pub mod sliders;
pub mod three_piece;

pub use control::{PsqControlIndex, PsqControlList, PSQ_CONTROL_INDEX_MAX};
pub use detail::{BlendRates, EvalDetail, PhaseRate, TermRates, PROGRESS_SCALE};
pub use evaluator::Evaluator;
pub use packed::PackedScore;
pub use params::{EvalLoadError, EvalParameters};
pub use psq::{PsqIndex, PsqPair, PSQ_INDEX_MAX};
pub use psq_list::{ChangedPsq, PsqList, MAX_PSQ_LIST_SIZE};
pub use secondary::{SecondaryDetail, SecondaryEvaluator};
pub use three_piece::ThreePieceEvaluator;

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, LazyLock};

    use super::{EvalParameters, ThreePieceEvaluator};

    static PARAMS: LazyLock<Arc<EvalParameters>> =
        LazyLock::new(|| Arc::new(EvalParameters::random(20)));

    static THREE_PIECE: LazyLock<Arc<ThreePieceEvaluator>> =
        LazyLock::new(|| Arc::new(ThreePieceEvaluator::random(21)));

    /// テスト全体で共有する乱数パラメータ
    pub(crate) fn random_params() -> &'static EvalParameters {
        &PARAMS
    }

    pub(crate) fn shared_params() -> Arc<EvalParameters> {
        Arc::clone(&PARAMS)
    }

    pub(crate) fn three_piece() -> Arc<ThreePieceEvaluator> {
        Arc::clone(&THREE_PIECE)
    }
}
