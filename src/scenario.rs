//! # Scenario モジュール
//!
//! カバレッジ計算のシナリオ設定（YAML）を読み込み、検証します。
//!
//! 設定ファイル中の角度はすべて度で記述し、モデルを構築する時点でラジアンに変換します。
//! 設定エラーは最初のタイムステップを処理する前にすべて検出されます。

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    common::{math_utils, EARTH_RADIUS_KM},
    error::ConfigError,
    traits::IFrameConverter,
    AttitudeModel, AttitudeOffset, BodyFixedFrame, ConicalSensor, CustomSensor, GmstEarthRotation,
    RectangularSensor, SensorFov,
};

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// 地上グリッド設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GridConfig {
    pub file: PathBuf,
}

/// 衛星状態履歴の設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatesConfig {
    pub file: PathBuf,
}

/// センサー視野の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FovGeometry {
    Conical,
    Rectangular,
    Custom,
}

impl fmt::Display for FovGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FovGeometry::Conical => "CONICAL",
            FovGeometry::Rectangular => "RECTANGULAR",
            FovGeometry::Custom => "CUSTOM",
        };
        f.write_str(name)
    }
}

/// センサー設定
///
/// `orientation` は `[軸1, 軸2, 軸3, 角度1, 角度2, 角度3 (deg)]`（例: `[1, 2, 3, 10, 0, 30]`）。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SensorConfig {
    pub fov_geometry: FovGeometry,
    #[serde(default = "default_orientation")]
    pub orientation: [f64; 6],
    #[serde(default)]
    pub cone_angles_deg: Vec<f64>,
    #[serde(default)]
    pub clock_angles_deg: Vec<f64>,
    /// RECTANGULAR のみ。指定された場合はコーン角・クロック角より優先
    pub angle_height_deg: Option<f64>,
    pub angle_width_deg: Option<f64>,
}

fn default_orientation() -> [f64; 6] {
    [1.0, 2.0, 3.0, 0.0, 0.0, 0.0]
}

/// 衛星状態の座標系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateFrame {
    #[default]
    Inertial,
    BodyFixed,
}

/// カバレッジ計算の設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoverageConfig {
    #[serde(default)]
    pub yaw180: bool,
    #[serde(default)]
    pub state_frame: StateFrame,
    /// 衛星本体の天底指向からのオフセット（`orientation` と同じ並び、省略時は天底指向）
    pub body_orientation: Option<[f64; 6]>,
    #[serde(default = "default_body_radius")]
    pub body_radius_km: f64,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_body_radius() -> f64 {
    EARTH_RADIUS_KM
}

fn default_parallel() -> bool {
    true
}

fn default_chunk_size() -> usize {
    1000
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            yaw180: false,
            state_frame: StateFrame::default(),
            body_orientation: None,
            body_radius_km: default_body_radius(),
            parallel: default_parallel(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// 出力設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub access_file: PathBuf,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub grid: GridConfig,
    pub states: StatesConfig,
    pub sensor: SensorConfig,
    #[serde(default)]
    pub coverage: CoverageConfig,
    pub output: OutputConfig,
}

impl FromStr for ScenarioConfig {
    type Err = ScenarioError;

    /// YAML文字列から読み込み、検証する（相対パスはそのまま）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: ScenarioConfig = serde_yaml::from_str(s).map_err(ScenarioError::Yaml)?;
        config.validate()?;
        Ok(config)
    }
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    ///
    /// グリッド・状態・出力の相対パスはシナリオファイルのディレクトリ基準で解決する。
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path).map_err(|e| ScenarioError::Io(path.to_path_buf(), e))?;

        let mut config: ScenarioConfig =
            serde_yaml::from_str(&contents).map_err(|e| ScenarioError::Parse(path.to_path_buf(), e))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }

        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for file in [&mut self.grid.file, &mut self.states.file, &mut self.output.access_file] {
            if file.is_relative() {
                *file = base.join(&*file);
            }
        }
    }

    /// 設定の検証
    ///
    /// センサーと姿勢を実際に構築してみることで、モデル側の検証規則と一致させる。
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.coverage.chunk_size == 0 {
            return Err(ScenarioError::Validation("chunk_size は1以上が必要です".to_string()));
        }
        if !(self.coverage.body_radius_km.is_finite() && self.coverage.body_radius_km > 0.0) {
            return Err(ScenarioError::Validation(format!(
                "body_radius_km は正の値が必要です: {}",
                self.coverage.body_radius_km
            )));
        }
        self.build_sensor()?;
        self.build_attitude()?;
        Ok(())
    }

    /// センサー視野を構築
    pub fn build_sensor(&self) -> Result<SensorFov, ScenarioError> {
        let sensor = &self.sensor;
        let cones: Vec<f64> = sensor.cone_angles_deg.iter().copied().map(math_utils::deg_to_rad).collect();
        let clocks: Vec<f64> = sensor.clock_angles_deg.iter().copied().map(math_utils::deg_to_rad).collect();

        let fov = match sensor.fov_geometry {
            FovGeometry::Conical => {
                let half_angle = cones.first().copied().ok_or(ConfigError::EmptyConeAngles)?;
                SensorFov::Conical(ConicalSensor::new(half_angle)?)
            }
            FovGeometry::Rectangular => match (sensor.angle_height_deg, sensor.angle_width_deg) {
                (Some(height), Some(width)) => SensorFov::Rectangular(RectangularSensor::new(
                    math_utils::deg_to_rad(height),
                    math_utils::deg_to_rad(width),
                )?),
                (None, None) => SensorFov::Rectangular(RectangularSensor::from_corner_angles(&cones, &clocks)?),
                _ => {
                    return Err(ScenarioError::Validation(
                        "angle_height_deg と angle_width_deg は両方指定してください".to_string(),
                    ))
                }
            },
            FovGeometry::Custom => SensorFov::Custom(CustomSensor::new(cones, clocks)?),
        };
        Ok(fov)
    }

    /// 姿勢モデルを構築（ヨー反転は実行時にコピーで適用するため含めない）
    pub fn build_attitude(&self) -> Result<AttitudeModel, ScenarioError> {
        let sensor_offset = parse_orientation(&self.sensor.orientation)?;
        let body_offset = match &self.coverage.body_orientation {
            Some(raw) => parse_orientation(raw)?,
            None => AttitudeOffset::zero(),
        };
        Ok(AttitudeModel::with_body_offset(body_offset, sensor_offset)?)
    }

    /// 状態ファイルの座標系に応じた変換器
    pub fn frame_converter(&self) -> Box<dyn IFrameConverter> {
        match self.coverage.state_frame {
            StateFrame::Inertial => Box::new(GmstEarthRotation),
            StateFrame::BodyFixed => Box::new(BodyFixedFrame),
        }
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== 入力 ===");
        println!("グリッド: {}", self.grid.file.display());
        println!("衛星状態: {} ({:?})", self.states.file.display(), self.coverage.state_frame);
        println!();

        println!("=== センサー ===");
        println!("視野形状: {}", self.sensor.fov_geometry);
        let o = &self.sensor.orientation;
        println!(
            "取付姿勢: シーケンス {}-{}-{}, ({:.3}, {:.3}, {:.3}) deg",
            o[0], o[1], o[2], o[3], o[4], o[5]
        );
        match self.sensor.fov_geometry {
            FovGeometry::Conical => {
                if let Some(half) = self.sensor.cone_angles_deg.first() {
                    println!("半頂角: {:.3} deg", half);
                }
            }
            FovGeometry::Rectangular => {
                if let (Some(h), Some(w)) = (self.sensor.angle_height_deg, self.sensor.angle_width_deg) {
                    println!("高さ × 幅: {:.3} × {:.3} deg", h, w);
                } else {
                    println!("頂点数: {}", self.sensor.cone_angles_deg.len());
                }
            }
            FovGeometry::Custom => println!("頂点数: {}", self.sensor.cone_angles_deg.len()),
        }
        println!();

        println!("=== カバレッジ設定 ===");
        println!("ヨー180°反転: {}", if self.coverage.yaw180 { "有効" } else { "無効" });
        println!("並列実行: {} (チャンク {}ステップ)", self.coverage.parallel, self.coverage.chunk_size);
        println!("天体半径: {:.4} km", self.coverage.body_radius_km);
        println!("出力: {}", self.output.access_file.display());
    }
}

/// `[s1, s2, s3, a1, a2, a3 (deg)]` を姿勢オフセットに変換
fn parse_orientation(raw: &[f64; 6]) -> Result<AttitudeOffset, ScenarioError> {
    let mut sequence = [0u8; 3];
    for (slot, value) in sequence.iter_mut().zip(&raw[..3]) {
        if value.fract() != 0.0 || !(1.0..=3.0).contains(value) {
            return Err(ScenarioError::Validation(format!(
                "姿勢シーケンスは 1, 2, 3 のいずれかの整数が必要です: {:?}",
                &raw[..3]
            )));
        }
        *slot = *value as u8;
    }
    Ok(AttitudeOffset::from_degrees([raw[3], raw[4], raw[5]], sequence)?)
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_yaml::Error),

    #[error("YAML解析エラー: {0}")]
    Yaml(#[source] serde_yaml::Error),

    #[error("設定検証エラー: {0}")]
    Validation(String),

    #[error("設定エラー: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::traits::IFieldOfView;
    use approx::assert_relative_eq;

    const BASE: &str = r#"
meta:
  version: "1.0"
  name: "test"
grid:
  file: grid.csv
states:
  file: states.csv
sensor:
  fov_geometry: CONICAL
  orientation: [1, 2, 3, 0, 0, 0]
  cone_angles_deg: [25]
  clock_angles_deg: []
output:
  access_file: access.csv
"#;

    fn with_sensor(sensor_yaml: &str) -> String {
        let start = BASE.find("sensor:").unwrap();
        let end = BASE.find("output:").unwrap();
        format!("{}{}{}", &BASE[..start], sensor_yaml, &BASE[end..])
    }

    #[test]
    fn test_defaults_and_conical() {
        let config: ScenarioConfig = BASE.parse().unwrap();
        assert!(!config.coverage.yaw180);
        assert!(config.coverage.parallel);
        assert_eq!(config.coverage.state_frame, StateFrame::Inertial);
        assert_eq!(config.coverage.chunk_size, 1000);
        assert_relative_eq!(config.coverage.body_radius_km, EARTH_RADIUS_KM);

        match config.build_sensor().unwrap() {
            SensorFov::Conical(c) => assert_relative_eq!(c.half_angle(), 25f64.to_radians()),
            other => panic!("unexpected sensor {}", other.kind()),
        }
        assert_eq!(config.frame_converter().name(), GmstEarthRotation.name());
    }

    #[test]
    fn test_rectangular_from_corners() {
        let yaml = with_sensor(
            "sensor:\n  fov_geometry: RECTANGULAR\n  cone_angles_deg: [20, 20, 20, 20]\n  clock_angles_deg: [30, 150, 210, 330]\n",
        );
        let config: ScenarioConfig = yaml.parse().unwrap();
        let sensor = config.build_sensor().unwrap();
        assert_eq!(sensor.kind(), "RECTANGULAR");
        assert_relative_eq!(sensor.max_excursion_angle(), 20f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_rectangular_explicit_extent() {
        let yaml = with_sensor(
            "sensor:\n  fov_geometry: RECTANGULAR\n  angle_height_deg: 10\n  angle_width_deg: 40\n",
        );
        let config: ScenarioConfig = yaml.parse().unwrap();
        match config.build_sensor().unwrap() {
            SensorFov::Rectangular(r) => {
                assert_relative_eq!(r.angle_height(), 10f64.to_radians());
                assert_relative_eq!(r.angle_width(), 40f64.to_radians());
            }
            other => panic!("unexpected sensor {}", other.kind()),
        }

        let half = with_sensor("sensor:\n  fov_geometry: RECTANGULAR\n  angle_height_deg: 10\n");
        assert!(matches!(half.parse::<ScenarioConfig>(), Err(ScenarioError::Validation(_))));
    }

    #[test]
    fn test_configuration_errors_are_reported() {
        let empty = with_sensor("sensor:\n  fov_geometry: CONICAL\n");
        assert!(matches!(
            empty.parse::<ScenarioConfig>(),
            Err(ScenarioError::Config(ConfigError::EmptyConeAngles))
        ));

        let mismatch = with_sensor(
            "sensor:\n  fov_geometry: CUSTOM\n  cone_angles_deg: [10, 10, 10]\n  clock_angles_deg: [0, 120]\n",
        );
        assert!(matches!(
            mismatch.parse::<ScenarioConfig>(),
            Err(ScenarioError::Config(ConfigError::AngleCountMismatch { cone: 3, clock: 2 }))
        ));

        let bad_sequence = with_sensor(
            "sensor:\n  fov_geometry: CONICAL\n  orientation: [1, 1, 3, 0, 0, 0]\n  cone_angles_deg: [10]\n",
        );
        assert!(matches!(
            bad_sequence.parse::<ScenarioConfig>(),
            Err(ScenarioError::Config(ConfigError::InvalidEulerSequence([1, 1, 3])))
        ));

        let out_of_range = with_sensor(
            "sensor:\n  fov_geometry: CONICAL\n  orientation: [1, 2, 4, 0, 0, 0]\n  cone_angles_deg: [10]\n",
        );
        assert!(matches!(out_of_range.parse::<ScenarioConfig>(), Err(ScenarioError::Validation(_))));
    }

    #[test]
    fn test_orientation_lists_sequence_before_angles() {
        let yaml = with_sensor(
            "sensor:\n  fov_geometry: CONICAL\n  orientation: [1, 2, 3, 10, 0, 30]\n  cone_angles_deg: [10]\n",
        );
        let config: ScenarioConfig = yaml.parse().unwrap();
        let offset = *config.build_attitude().unwrap().sensor_offset();
        assert_eq!((offset.seq1, offset.seq2, offset.seq3), (1, 2, 3));
        assert_relative_eq!(offset.angle1, 10f64.to_radians());
        assert_relative_eq!(offset.angle2, 0.0);
        assert_relative_eq!(offset.angle3, 30f64.to_radians());

        let omitted: ScenarioConfig = with_sensor("sensor:\n  fov_geometry: CONICAL\n  cone_angles_deg: [10]\n")
            .parse()
            .unwrap();
        assert_eq!(omitted.sensor.orientation, [1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rectangular_without_extent_or_corners() {
        let yaml = with_sensor("sensor:\n  fov_geometry: RECTANGULAR\n");
        assert!(matches!(
            yaml.parse::<ScenarioConfig>(),
            Err(ScenarioError::Config(ConfigError::EmptyConeAngles))
        ));
    }

    #[test]
    fn test_attitude_with_body_orientation() {
        let yaml = BASE.replace(
            "output:",
            "coverage:\n  yaw180: true\n  state_frame: BODY_FIXED\n  body_orientation: [1, 2, 3, 0, 0, 15]\noutput:",
        );
        let config: ScenarioConfig = yaml.parse().unwrap();
        assert!(config.coverage.yaw180);
        assert_eq!(config.frame_converter().name(), BodyFixedFrame.name());

        let attitude = config.build_attitude().unwrap();
        assert_relative_eq!(attitude.body_offset().angle3, 15f64.to_radians());
        assert!(!attitude.is_yaw_flipped());
    }

    #[test]
    fn test_from_file_resolves_relative_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scenario.yaml");
        fs::write(&path, BASE).unwrap();

        let config = ScenarioConfig::from_file(&path).unwrap();
        assert_eq!(config.grid.file, dir.path().join("grid.csv"));
        assert_eq!(config.output.access_file, dir.path().join("access.csv"));

        assert!(matches!(
            ScenarioConfig::from_file(dir.path().join("missing.yaml")),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_bundled_scenarios_are_valid() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios");
        let expected = [
            ("nadir_conical.yaml", "CONICAL"),
            ("side_looking_rectangular.yaml", "RECTANGULAR"),
            ("custom_polygon.yaml", "CUSTOM"),
        ];
        for (file, kind) in expected {
            let config = ScenarioConfig::from_file(dir.join(file)).unwrap();
            assert_eq!(config.build_sensor().unwrap().kind(), kind);
            assert!(config.grid.file.exists());
            assert!(config.states.file.exists());
        }

        let side = ScenarioConfig::from_file(dir.join("side_looking_rectangular.yaml")).unwrap();
        let offset = *side.build_attitude().unwrap().sensor_offset();
        assert_eq!(offset.seq2, 2);
        assert_relative_eq!(offset.angle2, 25f64.to_radians());
        assert_relative_eq!(offset.angle1, 0.0);
    }
}
