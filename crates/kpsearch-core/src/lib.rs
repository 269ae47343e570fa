//! 将棋思考エンジンのコア
//!
//! - `types`: 基本型（手番・升・駒・指し手・評価値など）
//! - `position`: 局面の表現と手の実行、合法性判定、SEE
//! - `movegen`: 種類別の指し手生成
//! - `eval`: 駒リストと利きによる差分評価、副評価関数とのブレンド
//! - `search`: 段階的な指し手の順序付けと Alpha-Beta 探索、Lazy SMP
//! - `tt`: 置換表
//! - `book`: テキスト形式の定跡
//! - `config`: TOML 設定ファイル
//! - `think`: 宣言勝ち・投了・定跡・探索の順に指し手を決める

pub mod book;
pub mod config;
pub mod eval;
pub mod movegen;
pub mod position;
pub mod search;
pub mod think;
pub mod tt;
pub mod types;
