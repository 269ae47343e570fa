//! エンジン設定
//!
//! TOML ファイルから読み込む。書かれていない項目は既定値になる。
//!
//! ```toml
//! threads = 4
//! hash_mb = 256
//! own_book = true
//! book_file = "book.txt"
//!
//! [eval]
//! params_file = "eval/params.bin"
//! secondary_file = "eval/three_piece.bin"
//! secondary_rate_opening = 30
//! secondary_rate_middle = 20
//! secondary_rate_end = 10
//!
//! [search]
//! probability_min_depth = 64
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::book::{Book, BookError};
use crate::eval::{
    BlendRates, EvalLoadError, EvalParameters, Evaluator, PhaseRate, TermRates, ThreePieceEvaluator,
};
use crate::search::SearchOptions;
use crate::types::{Depth, Value};

/// 項ごとの重みに許す上限（パーセント）
const MAX_TERM_RATE: u32 = 200;

/// 設定ファイルのエラー
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("eval.params_file is not set")]
    MissingParams,

    #[error(transparent)]
    Eval(#[from] EvalLoadError),

    #[error(transparent)]
    Book(#[from] BookError),
}

// =============================================================================
// 設定項目
// =============================================================================

/// エンジン全体の設定
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// 探索スレッド数
    pub threads: usize,
    /// 置換表の大きさ（MB）
    pub hash_mb: usize,
    /// 千日手の評価値（自分から見た値）
    pub draw_score: i32,
    /// 定跡を使うか
    pub own_book: bool,
    /// この手数までは定跡を引く
    pub book_max_ply: i32,
    pub book_file: Option<PathBuf>,
    /// 1 以外は未対応（警告して 1 として扱う）
    pub multi_pv: usize,
    pub eval: EvalConfig,
    pub search: SearchConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            hash_mb: 16,
            draw_score: 0,
            own_book: false,
            book_max_ply: 32,
            book_file: None,
            multi_pv: 1,
            eval: EvalConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

/// 評価関数の設定
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    /// 主評価関数のパラメータ
    pub params_file: Option<PathBuf>,
    /// 副評価関数（三駒関係）のパラメータ
    pub secondary_file: Option<PathBuf>,
    /// 副評価関数の混合率（パーセント）
    pub secondary_rate_opening: u32,
    pub secondary_rate_middle: u32,
    pub secondary_rate_end: u32,
    /// 主評価関数の項ごとの重み（パーセント）
    pub terms: TermRatesConfig,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            params_file: None,
            secondary_file: None,
            secondary_rate_opening: 0,
            secondary_rate_middle: 0,
            secondary_rate_end: 0,
            terms: TermRatesConfig::default(),
        }
    }
}

/// 項ごとの序盤・終盤の重み
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhaseRateConfig {
    pub opening: u32,
    pub end: u32,
}

impl Default for PhaseRateConfig {
    fn default() -> Self {
        Self {
            opening: 100,
            end: 100,
        }
    }
}

impl From<PhaseRateConfig> for PhaseRate {
    fn from(c: PhaseRateConfig) -> PhaseRate {
        PhaseRate {
            opening: c.opening,
            end: c.end,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TermRatesConfig {
    pub kp: PhaseRateConfig,
    pub two_pieces: PhaseRateConfig,
    pub controls: PhaseRateConfig,
    pub king_safety: PhaseRateConfig,
    pub sliders: PhaseRateConfig,
}

impl TermRatesConfig {
    fn all(&self) -> [(&'static str, PhaseRateConfig); 5] {
        [
            ("kp", self.kp),
            ("two_pieces", self.two_pieces),
            ("controls", self.controls),
            ("king_safety", self.king_safety),
            ("sliders", self.sliders),
        ]
    }
}

/// 探索の設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// この深さ以上で確率による順序付けを使う（既定値では実質使わない）
    pub probability_min_depth: Depth,
    /// 停止判定の間隔（ノード数）
    pub node_check_interval: i32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let options = SearchOptions::default();
        Self {
            probability_min_depth: options.probability_min_depth,
            node_check_interval: options.node_check_interval,
        }
    }
}

// =============================================================================
// 読み込みと検証
// =============================================================================

impl EngineConfig {
    /// ファイルから読み込んで検証する
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// TOML 文字列から読み込んで検証する
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if self.hash_mb == 0 {
            return Err(ConfigError::Invalid("hash_mb must be at least 1".into()));
        }
        if self.draw_score.abs() >= Value::MAX_EVAL.raw() {
            return Err(ConfigError::Invalid(format!(
                "draw_score {} is out of range",
                self.draw_score
            )));
        }

        let eval = &self.eval;
        for (name, rate) in [
            ("secondary_rate_opening", eval.secondary_rate_opening),
            ("secondary_rate_middle", eval.secondary_rate_middle),
            ("secondary_rate_end", eval.secondary_rate_end),
        ] {
            if rate > 100 {
                return Err(ConfigError::Invalid(format!(
                    "eval.{name} must be within 0..=100, got {rate}"
                )));
            }
        }
        for (name, rate) in eval.terms.all() {
            if rate.opening > MAX_TERM_RATE || rate.end > MAX_TERM_RATE {
                return Err(ConfigError::Invalid(format!(
                    "eval.terms.{name} must be within 0..={MAX_TERM_RATE}"
                )));
            }
        }

        if self.search.node_check_interval <= 0 {
            return Err(ConfigError::Invalid(
                "search.node_check_interval must be positive".into(),
            ));
        }

        if self.multi_pv != 1 {
            log::warn!("multi_pv = {} is not supported; searching a single PV", self.multi_pv);
        }
        Ok(())
    }

    // =========================================================================
    // 設定からの構築
    // =========================================================================

    pub fn blend_rates(&self) -> BlendRates {
        BlendRates {
            opening: self.eval.secondary_rate_opening,
            middle: self.eval.secondary_rate_middle,
            end: self.eval.secondary_rate_end,
        }
    }

    pub fn term_rates(&self) -> TermRates {
        let t = &self.eval.terms;
        TermRates {
            kp: t.kp.into(),
            two_pieces: t.two_pieces.into(),
            controls: t.controls.into(),
            king_safety: t.king_safety.into(),
            sliders: t.sliders.into(),
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            probability_min_depth: self.search.probability_min_depth,
            node_check_interval: self.search.node_check_interval,
            draw_value: Value::new(self.draw_score),
        }
    }

    /// 主評価関数のパラメータを読み込んで評価関数を組み立てる
    pub fn load_evaluator(&self) -> Result<Evaluator, ConfigError> {
        let path = self.eval.params_file.as_ref().ok_or(ConfigError::MissingParams)?;
        let params = Arc::new(EvalParameters::load(path)?);
        self.build_evaluator(params)
    }

    /// 読み込み済みの主評価パラメータに、設定された副評価関数と重みを付ける
    pub fn build_evaluator(&self, params: Arc<EvalParameters>) -> Result<Evaluator, ConfigError> {
        let mut evaluator = Evaluator::new(params).with_term_rates(self.term_rates());
        if let Some(path) = &self.eval.secondary_file {
            let secondary = Arc::new(ThreePieceEvaluator::load(path)?);
            evaluator = evaluator.with_secondary(secondary, self.blend_rates());
        }
        Ok(evaluator)
    }

    /// 定跡ファイルを読み込む（使わない設定なら `None`）
    pub fn load_book(&self) -> Result<Option<Book>, ConfigError> {
        match (&self.book_file, self.own_book) {
            (Some(path), true) => Ok(Some(Book::load(path)?)),
            (None, true) => {
                log::warn!("own_book is enabled but book_file is not set");
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}
