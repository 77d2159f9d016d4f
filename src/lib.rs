//! # gridcov
//!
//! 衛星搭載センサーの視野による地上グリッド点のカバレッジ計算。
//!
//! - [`models`]: 姿勢、センサー視野、グリッド点、可視判定
//! - [`records`]: グリッド・衛星状態・アクセスファイルの入出力
//! - [`scenario`]: YAMLシナリオ設定
//! - [`simulation`]: 状態履歴に沿った時刻ループ
//! - [`logging`]: tracing によるログ初期化

pub mod logging;
pub mod models;
pub mod records;
pub mod scenario;
pub mod simulation;
