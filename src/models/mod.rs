// 基本的なデータ型と数学ユーティリティ
pub mod common;

// 設定エラー
pub mod error;

// 視野・座標変換のインターフェース（trait）定義
pub mod traits;

// 各モデルの実装
pub mod orbit;
pub mod attitude;
pub mod sensor;
pub mod point_group;
pub mod coverage_checker;
pub mod coverage_record;

// 便利な re-export
pub use common::*;
pub use error::ConfigError;
pub use traits::*;
pub use orbit::{OrbitState, GmstEarthRotation, BodyFixedFrame};
pub use attitude::{AttitudeModel, AttitudeOffset};
pub use sensor::{ConicalSensor, RectangularSensor, CustomSensor, SensorFov};
pub use point_group::{GroundPoint, PointGroup};
pub use coverage_checker::CoverageChecker;
pub use coverage_record::CoverageRecord;
