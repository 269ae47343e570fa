//! 局面表現モジュール
//!
//! 将棋の局面を表現し、手の実行・巻き戻しを行う。
//!
//! - `Position`: 局面本体（盤面配列・手駒・手番・手数）
//! - `StateInfo`: 局面状態（Zobristハッシュ、王手情報、直前の手など）
//! - `do_move` / `undo_move` / `do_null_move`: 手の実行と巻き戻し（`StateInfo` をスタックとして管理）
//! - 利きの計算、合法性判定、SEE、入玉宣言
//! - SFEN形式の解析・出力
//!
//! 盤面配列・手駒・Zobristキーは `Position` のメソッドを通じて更新されることを前提とし、
//! 常に互いに整合しているように保つ。

pub(crate) mod attacks;
mod board_effect;
mod legality;
mod pos;
mod see;
mod sfen;
mod state;
mod zobrist;

pub use board_effect::BoardEffects;
pub(crate) use legality::is_dead_square;
pub use pos::Position;
pub use sfen::{SfenError, SFEN_HIRATE};
pub use state::{Checkers, StateInfo};
pub use zobrist::{zobrist_hand, zobrist_psq, zobrist_side, ZOBRIST};
