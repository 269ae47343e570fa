//! 探索深さ（Depth）

/// 探索深さ（1手 = 1）
pub type Depth = i32;

/// 最大探索手数
pub const MAX_PLY: i32 = 128;

/// 静止探索で王手も生成する深さの下限（これより深い間は王手を含める）
pub const DEPTH_QS_CHECKS: Depth = 0;

/// 静止探索で駒取りのみを生成する深さの下限（これ以下は取り返しのみ）
pub const DEPTH_QS_NO_CHECKS: Depth = -1;

/// 静止探索で取り返しのみに制限する深さ
pub const DEPTH_QS_RECAPTURES: Depth = -5;

/// 置換表上で未探索を表す深さ
pub const DEPTH_NONE: Depth = -6;
