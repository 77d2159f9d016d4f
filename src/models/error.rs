use thiserror::Error;

/// 設定エラー
///
/// いずれも最初のタイムステップを処理する前に検出され、実行全体を中止させる。
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("無効なオイラー角シーケンス {0:?}: 1, 2, 3 の異なる3軸を指定してください")]
    InvalidEulerSequence([u8; 3]),

    #[error("コーン角が1つも指定されていません")]
    EmptyConeAngles,

    #[error("コーン角 ({cone}個) とクロック角 ({clock}個) の数が一致しません")]
    AngleCountMismatch { cone: usize, clock: usize },

    #[error("無効な角度 {name} = {value} rad")]
    InvalidAngle { name: &'static str, value: f64 },

    #[error("センサー形状が縮退しています: {0}")]
    DegenerateGeometry(String),

    #[error("コーン角・クロック角が矩形視野を表していません: {0}")]
    NotRectangular(String),

    #[error("緯度 ({lat}個) と経度 ({lon}個) の数が一致しません")]
    PointCountMismatch { lat: usize, lon: usize },

    #[error("グリッド点 {index} が範囲外です (lat = {lat} rad, lon = {lon} rad)")]
    PointOutOfRange { index: usize, lat: f64, lon: f64 },

    #[error("無効な軌道状態: {0}")]
    InvalidOrbitState(String),
}
