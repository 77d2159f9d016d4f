//! # Sensor モジュール
//!
//! 衛星搭載センサーの視野 (FOV) モデルを提供します。
//!
//! 視野判定はすべてセンサー座標系（+Z が視軸）におけるターゲット方向の
//! コーン角・クロック角に対して行います。
//!
//! ## 視野形状
//!
//! - **Conical**: 半頂角で定義される円錐視野
//! - **Rectangular**: 角高さ・角幅で定義される球面矩形視野
//! - **Custom**: コーン角・クロック角の頂点列で定義される任意の球面多角形視野
//!
//! 矩形・任意形状の判定では、まず最大コーン角（最大偏位角）で安価に除外し、
//! 残った点だけ単位ベクトルを構築して辺の大円による半空間判定を行います。

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::models::{
    common::{math_utils, Vec3, GEOMETRY_EPSILON},
    error::ConfigError,
    traits::IFieldOfView,
};

/// 円錐視野センサー
#[derive(Debug, Clone, PartialEq)]
pub struct ConicalSensor {
    /// 半頂角 (rad)
    half_angle: f64,
}

impl ConicalSensor {
    pub fn new(half_angle: f64) -> Result<Self, ConfigError> {
        if !half_angle.is_finite() || half_angle <= 0.0 || half_angle > PI {
            return Err(ConfigError::InvalidAngle { name: "half_angle", value: half_angle });
        }
        Ok(Self { half_angle })
    }

    pub fn half_angle(&self) -> f64 {
        self.half_angle
    }
}

impl IFieldOfView for ConicalSensor {
    /// 回転対称なのでクロック角は使わない
    fn check_target_visibility(&self, cone_angle: f64, _clock_angle: f64) -> bool {
        cone_angle <= self.half_angle
    }

    fn max_excursion_angle(&self) -> f64 {
        self.half_angle
    }
}

/// 球面矩形視野センサー
///
/// 角の方向と辺の極ベクトルは構築時に一度だけ計算する。
#[derive(Debug, Clone, PartialEq)]
pub struct RectangularSensor {
    /// 角高さ (rad)、センサーY軸方向の全幅
    angle_height: f64,
    /// 角幅 (rad)、センサーX軸方向の全幅
    angle_width: f64,
    /// 最大偏位角: 四隅のコーン角
    max_excursion_angle: f64,
    /// 四隅の単位ベクトル（反時計回り）
    corners: [Vec3; 4],
    /// 各辺の大円の極（内向き法線）
    poles: [Vec3; 4],
}

impl RectangularSensor {
    pub fn new(angle_height: f64, angle_width: f64) -> Result<Self, ConfigError> {
        for (name, value) in [("angle_height", angle_height), ("angle_width", angle_width)] {
            if !value.is_finite() || value <= 0.0 || value >= PI {
                return Err(ConfigError::InvalidAngle { name, value });
            }
        }

        // 原点から (height/2, width/2) までの大円距離 = 四隅のコーン角
        let max_excursion_angle =
            math_utils::safe_acos((angle_height / 2.0).cos() * (angle_width / 2.0).cos());
        // 高さ・幅が極小 (約 2e-8 rad 未満) だと cos が 1 に丸められ、四隅が視軸に潰れる
        if max_excursion_angle.sin().abs() < GEOMETRY_EPSILON {
            return Err(ConfigError::DegenerateGeometry(format!(
                "sin(max_excursion_angle) = 0 (height = {}, width = {})",
                angle_height, angle_width
            )));
        }

        let clocks = Self::corner_clock_angles(angle_height, max_excursion_angle);
        let corners = clocks.map(|clock| math_utils::cone_clock_to_unit_vec(max_excursion_angle, clock));
        let poles: [Vec3; 4] = std::array::from_fn(|i| edge_pole(&corners, i));

        Ok(Self {
            angle_height,
            angle_width,
            max_excursion_angle,
            corners,
            poles,
        })
    }

    /// 四隅のコーン角・クロック角から作成
    ///
    /// 4点、または最初の点を末尾で繰り返した5点を受け付ける。
    /// 全コーン角が等しく、クロック角が `[θ, π-θ, π+θ, 2π-θ]` であること。
    pub fn from_corner_angles(cones: &[f64], clocks: &[f64]) -> Result<Self, ConfigError> {
        if cones.len() != clocks.len() {
            return Err(ConfigError::AngleCountMismatch { cone: cones.len(), clock: clocks.len() });
        }
        if cones.is_empty() {
            return Err(ConfigError::EmptyConeAngles);
        }
        let n = match cones.len() {
            4 => 4,
            5 if is_same_vertex(cones[0], clocks[0], cones[4], clocks[4]) => 4,
            other => {
                return Err(ConfigError::NotRectangular(format!("頂点数 {} (4 または閉じた5点が必要)", other)));
            }
        };

        const TOL: f64 = 1e-9;
        let cone = cones[0];
        if cones[..n].iter().any(|c| (c - cone).abs() > TOL) {
            return Err(ConfigError::NotRectangular("コーン角がすべて等しくありません".to_string()));
        }
        let theta = math_utils::normalize_clock_angle(clocks[0]);
        let expected = [theta, PI - theta, PI + theta, TAU - theta];
        let matches = clocks[..n]
            .iter()
            .zip(expected.iter())
            .all(|(actual, want)| angular_distance(*actual, *want) <= TOL);
        if !matches {
            return Err(ConfigError::NotRectangular(
                "クロック角が [θ, 180-θ, 180+θ, 360-θ] の並びではありません".to_string(),
            ));
        }

        let half_height = math_utils::safe_asin(cone.sin() * theta.sin());
        let half_width = math_utils::safe_acos(cone.cos() / half_height.cos());
        Self::new(2.0 * half_height, 2.0 * half_width)
    }

    /// 四隅のクロック角（反時計回り）
    ///
    /// この順序が極ベクトルの向き（内向き）を決めるため、並べ替えてはならない。
    fn corner_clock_angles(angle_height: f64, max_excursion_angle: f64) -> [f64; 4] {
        let clock = math_utils::safe_asin((angle_height / 2.0).sin() / max_excursion_angle.sin());
        [clock, PI - clock, PI + clock, TAU - clock]
    }

    pub fn angle_height(&self) -> f64 {
        self.angle_height
    }

    pub fn angle_width(&self) -> f64 {
        self.angle_width
    }

    pub fn corners(&self) -> &[Vec3; 4] {
        &self.corners
    }

    /// 四隅のコーン角・クロック角（任意形状センサーとの比較用）
    pub fn corner_cone_clock(&self) -> ([f64; 4], [f64; 4]) {
        let clocks = Self::corner_clock_angles(self.angle_height, self.max_excursion_angle);
        ([self.max_excursion_angle; 4], clocks)
    }
}

impl IFieldOfView for RectangularSensor {
    fn check_target_visibility(&self, cone_angle: f64, clock_angle: f64) -> bool {
        if self.is_beyond_max_excursion(cone_angle) {
            return false;
        }
        let target = math_utils::cone_clock_to_unit_vec(cone_angle, clock_angle);
        inside_all_poles(&self.poles, &target)
    }

    fn max_excursion_angle(&self) -> f64 {
        self.max_excursion_angle
    }
}

/// 内部判定の方式
#[derive(Debug, Clone, Copy, PartialEq)]
enum PolygonTest {
    /// 凸多角形: 全辺の半空間の共通部分
    ConvexPoles,
    /// 非凸多角形: 球面上の回転数
    WindingNumber,
}

/// 任意形状（球面多角形）視野センサー
#[derive(Debug, Clone, PartialEq)]
pub struct CustomSensor {
    /// 頂点の単位ベクトル（反時計回りに正規化済み）
    vertices: Vec<Vec3>,
    /// 辺 i (頂点 i → i+1) の極
    poles: Vec<Vec3>,
    max_excursion_angle: f64,
    test: PolygonTest,
}

impl CustomSensor {
    /// コーン角・クロック角の頂点列から作成
    ///
    /// 末尾が先頭と同じ点（閉じた多角形表記）は取り除く。
    /// 頂点は単純多角形をなすこと。自己交差する多角形の結果は未定義。
    pub fn new(cone_angles: Vec<f64>, clock_angles: Vec<f64>) -> Result<Self, ConfigError> {
        if cone_angles.is_empty() {
            return Err(ConfigError::EmptyConeAngles);
        }
        if cone_angles.len() != clock_angles.len() {
            return Err(ConfigError::AngleCountMismatch {
                cone: cone_angles.len(),
                clock: clock_angles.len(),
            });
        }
        for &cone in &cone_angles {
            if !cone.is_finite() || !(0.0..FRAC_PI_2).contains(&cone) {
                return Err(ConfigError::InvalidAngle { name: "cone_angle", value: cone });
            }
        }
        if let Some(&clock) = clock_angles.iter().find(|c| !c.is_finite()) {
            return Err(ConfigError::InvalidAngle { name: "clock_angle", value: clock });
        }

        let mut cones = cone_angles;
        let mut clocks = clock_angles;
        let last = cones.len() - 1;
        if last > 0 && is_same_vertex(cones[0], clocks[0], cones[last], clocks[last]) {
            cones.pop();
            clocks.pop();
        }
        if cones.len() < 3 {
            return Err(ConfigError::DegenerateGeometry(format!(
                "多角形には3頂点以上が必要です ({}頂点)",
                cones.len()
            )));
        }

        let mut vertices: Vec<Vec3> = cones
            .iter()
            .zip(clocks.iter())
            .map(|(&cone, &clock)| math_utils::cone_clock_to_unit_vec(cone, clock))
            .collect();

        // 時計回りで与えられた場合は反時計回りに並べ直す
        if signed_orientation(&vertices) < 0.0 {
            vertices.reverse();
        }

        let poles = pole_headings(&vertices);
        if poles.iter().any(|p| p.norm() < GEOMETRY_EPSILON) {
            return Err(ConfigError::DegenerateGeometry(
                "隣接する頂点が一致または対蹠点です".to_string(),
            ));
        }

        let convex = vertices.iter().all(|v| {
            poles.iter().all(|p| p.dot(v) >= -GEOMETRY_EPSILON)
        });
        let test = if convex { PolygonTest::ConvexPoles } else { PolygonTest::WindingNumber };
        let max_excursion_angle = cones.iter().cloned().fold(0.0, f64::max);

        Ok(Self {
            vertices,
            poles,
            max_excursion_angle,
            test,
        })
    }

    pub fn is_convex(&self) -> bool {
        self.test == PolygonTest::ConvexPoles
    }

    fn winding_contains(&self, target: &Vec3) -> bool {
        let n = self.vertices.len();
        let total: f64 = (0..n)
            .map(|i| {
                let a = &self.vertices[i];
                let b = &self.vertices[(i + 1) % n];
                // 接平面上で target から見た辺の張る符号付き角
                let num = target.dot(&a.cross(b));
                let den = a.dot(b) - a.dot(target) * b.dot(target);
                num.atan2(den)
            })
            .sum();
        total.abs() > PI
    }
}

impl IFieldOfView for CustomSensor {
    fn check_target_visibility(&self, cone_angle: f64, clock_angle: f64) -> bool {
        if self.is_beyond_max_excursion(cone_angle) {
            return false;
        }
        let target = math_utils::cone_clock_to_unit_vec(cone_angle, clock_angle);
        match self.test {
            PolygonTest::ConvexPoles => inside_all_poles(&self.poles, &target),
            PolygonTest::WindingNumber => self.winding_contains(&target),
        }
    }

    fn max_excursion_angle(&self) -> f64 {
        self.max_excursion_angle
    }
}

/// センサー視野（3種類のいずれか）
#[derive(Debug, Clone, PartialEq)]
pub enum SensorFov {
    Conical(ConicalSensor),
    Rectangular(RectangularSensor),
    Custom(CustomSensor),
}

impl SensorFov {
    pub fn kind(&self) -> &'static str {
        match self {
            SensorFov::Conical(_) => "CONICAL",
            SensorFov::Rectangular(_) => "RECTANGULAR",
            SensorFov::Custom(_) => "CUSTOM",
        }
    }
}

impl IFieldOfView for SensorFov {
    fn check_target_visibility(&self, cone_angle: f64, clock_angle: f64) -> bool {
        match self {
            SensorFov::Conical(s) => s.check_target_visibility(cone_angle, clock_angle),
            SensorFov::Rectangular(s) => s.check_target_visibility(cone_angle, clock_angle),
            SensorFov::Custom(s) => s.check_target_visibility(cone_angle, clock_angle),
        }
    }

    fn max_excursion_angle(&self) -> f64 {
        match self {
            SensorFov::Conical(s) => s.max_excursion_angle(),
            SensorFov::Rectangular(s) => s.max_excursion_angle(),
            SensorFov::Custom(s) => s.max_excursion_angle(),
        }
    }
}

/// 辺 i (頂点 i → i+1、末尾は先頭へ回り込む) の大円の極
fn edge_pole(vertices: &[Vec3], i: usize) -> Vec3 {
    vertices[i].cross(&vertices[(i + 1) % vertices.len()])
}

fn pole_headings(vertices: &[Vec3]) -> Vec<Vec3> {
    (0..vertices.len()).map(|i| edge_pole(vertices, i)).collect()
}

fn inside_all_poles(poles: &[Vec3], target: &Vec3) -> bool {
    poles.iter().all(|p| p.dot(target) > 0.0)
}

/// 多角形の回り方向。正なら反時計回り（外側から見て）
fn signed_orientation(vertices: &[Vec3]) -> f64 {
    let n = vertices.len();
    let centroid: Vec3 = vertices.iter().sum();
    (0..n)
        .map(|i| vertices[i].cross(&vertices[(i + 1) % n]).dot(&centroid))
        .sum()
}

fn angular_distance(a: f64, b: f64) -> f64 {
    let d = math_utils::normalize_clock_angle(a - b);
    d.min(TAU - d)
}

fn is_same_vertex(cone_a: f64, clock_a: f64, cone_b: f64, clock_b: f64) -> bool {
    (cone_a - cone_b).abs() < 1e-12 && angular_distance(clock_a, clock_b) < 1e-12
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPS: f64 = 1e-6;

    fn square(width_deg: f64) -> RectangularSensor {
        let w = width_deg.to_radians();
        RectangularSensor::new(w, w).unwrap()
    }

    #[test]
    fn test_conical_boundary_is_inclusive() {
        let h = 0.3;
        let sensor = ConicalSensor::new(h).unwrap();
        assert!(sensor.check_target_visibility(0.0, 1.0));
        assert!(sensor.check_target_visibility(h, 5.0));
        assert!(!sensor.check_target_visibility(h + EPS, 0.0));
        assert!(!sensor.check_target_visibility(PI, 0.0));
    }

    #[test]
    fn test_conical_rejects_invalid_half_angle() {
        assert!(ConicalSensor::new(0.0).is_err());
        assert!(ConicalSensor::new(-0.1).is_err());
        assert!(ConicalSensor::new(f64::NAN).is_err());
    }

    #[test]
    fn test_rectangular_square_corners_are_equidistant() {
        let w = 20f64.to_radians();
        let sensor = square(20.0);
        let expected = ((w / 2.0).cos().powi(2)).acos();
        assert_relative_eq!(sensor.max_excursion_angle(), expected, epsilon = 1e-12);
        for corner in sensor.corners() {
            assert_relative_eq!(math_utils::cone_angle(corner), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rectangular_corner_perturbation() {
        let sensor = square(20.0);
        let (cones, clocks) = sensor.corner_cone_clock();
        for (cone, clock) in cones.iter().zip(clocks.iter()) {
            assert!(sensor.check_target_visibility(cone - EPS, *clock));
            assert!(!sensor.check_target_visibility(cone + EPS, *clock));
        }
    }

    #[test]
    fn test_rectangular_height_and_width_axes() {
        // 高さ 10°, 幅 30°: X軸方向には 14° まで、Y軸方向には 4° までしか見えない
        let sensor = RectangularSensor::new(10f64.to_radians(), 30f64.to_radians()).unwrap();
        assert!(sensor.check_target_visibility(14f64.to_radians(), 0.0));
        assert!(!sensor.check_target_visibility(16f64.to_radians(), 0.0));
        assert!(sensor.check_target_visibility(4f64.to_radians(), FRAC_PI_2));
        assert!(!sensor.check_target_visibility(6f64.to_radians(), FRAC_PI_2));
        assert!(sensor.check_target_visibility(14f64.to_radians(), PI));
        assert!(!sensor.check_target_visibility(6f64.to_radians(), 1.5 * PI));
    }

    #[test]
    fn test_reversed_corner_winding_inverts_pole_test() {
        let sensor = square(20.0);
        let mut reversed = *sensor.corners();
        reversed.reverse();
        let reversed_poles = pole_headings(&reversed);

        for (cone_deg, clock_deg) in [(0.0, 0.0), (3.0, 45.0), (5.0, 200.0), (8.0, 300.0)] {
            let cone = f64::to_radians(cone_deg);
            let clock = f64::to_radians(clock_deg);
            assert!(sensor.check_target_visibility(cone, clock));
            let target = math_utils::cone_clock_to_unit_vec(cone, clock);
            assert!(!inside_all_poles(&reversed_poles, &target));
            assert!(reversed_poles.iter().all(|p| p.dot(&target) < 0.0));
        }
    }

    #[test]
    fn test_rectangular_from_corner_angles() {
        let original = RectangularSensor::new(10f64.to_radians(), 30f64.to_radians()).unwrap();
        let (cones, clocks) = original.corner_cone_clock();

        let rebuilt = RectangularSensor::from_corner_angles(&cones, &clocks).unwrap();
        assert_relative_eq!(rebuilt.angle_height(), original.angle_height(), epsilon = 1e-9);
        assert_relative_eq!(rebuilt.angle_width(), original.angle_width(), epsilon = 1e-9);

        let mut closed_cones = cones.to_vec();
        let mut closed_clocks = clocks.to_vec();
        closed_cones.push(cones[0]);
        closed_clocks.push(clocks[0]);
        assert!(RectangularSensor::from_corner_angles(&closed_cones, &closed_clocks).is_ok());

        let skewed = [clocks[0], clocks[1] + 0.1, clocks[2], clocks[3]];
        assert!(matches!(
            RectangularSensor::from_corner_angles(&cones, &skewed),
            Err(ConfigError::NotRectangular(_))
        ));
        assert!(matches!(
            RectangularSensor::from_corner_angles(&[], &[]),
            Err(ConfigError::EmptyConeAngles)
        ));
        assert!(matches!(
            RectangularSensor::from_corner_angles(&cones[..3], &clocks[..3]),
            Err(ConfigError::NotRectangular(_))
        ));
    }

    #[test]
    fn test_rectangular_rejects_vanishing_extent() {
        assert!(matches!(
            RectangularSensor::new(1e-13, 1e-13),
            Err(ConfigError::DegenerateGeometry(_))
        ));
        assert!(RectangularSensor::new(1e-3, 1e-3).is_ok());
    }

    #[test]
    fn test_custom_equals_rectangular() {
        let rect = RectangularSensor::new(12f64.to_radians(), 25f64.to_radians()).unwrap();
        let (cones, clocks) = rect.corner_cone_clock();
        let custom = CustomSensor::new(cones.to_vec(), clocks.to_vec()).unwrap();
        assert!(custom.is_convex());

        for i in 0..=60 {
            let cone = 16f64.to_radians() * i as f64 / 60.0;
            for j in 0..72 {
                let clock = TAU * j as f64 / 72.0;
                assert_eq!(
                    custom.check_target_visibility(cone, clock),
                    rect.check_target_visibility(cone, clock),
                    "cone = {cone}, clock = {clock}"
                );
            }
        }
    }

    #[test]
    fn test_custom_clockwise_input_is_normalized() {
        let rect = square(20.0);
        let (cones, clocks) = rect.corner_cone_clock();
        let mut cw_clocks = clocks.to_vec();
        cw_clocks.reverse();
        let custom = CustomSensor::new(cones.to_vec(), cw_clocks).unwrap();
        assert!(custom.check_target_visibility(0.0, 0.0));
        assert!(custom.check_target_visibility(5f64.to_radians(), 1.0));
        assert!(!custom.check_target_visibility(12f64.to_radians(), 0.0));
    }

    #[test]
    fn test_custom_concave_polygon() {
        // L字形: 第1象限の一部が欠けている
        let pts_deg: [(f64, f64); 6] = [(10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (-10.0, 10.0), (-10.0, -10.0), (10.0, -10.0)];
        let mut pts = pts_deg.to_vec();
        pts[1] = (2.0, 2.0);
        let (cones, clocks): (Vec<f64>, Vec<f64>) = pts
            .iter()
            .map(|&(x, y)| {
                let v = Vec3::new(f64::to_radians(x).tan(), f64::to_radians(y).tan(), 1.0);
                math_utils::vector_to_cone_clock(&v)
            })
            .unzip();
        let custom = CustomSensor::new(cones, clocks).unwrap();
        assert!(!custom.is_convex());

        let look = |x: f64, y: f64| {
            let v = Vec3::new(f64::to_radians(x).tan(), f64::to_radians(y).tan(), 1.0);
            let (cone, clock) = math_utils::vector_to_cone_clock(&v);
            custom.check_target_visibility(cone, clock)
        };
        assert!(look(-5.0, -5.0));
        assert!(look(-5.0, 5.0));
        assert!(look(5.0, -5.0));
        assert!(!look(6.0, 6.0));
        assert!(!look(12.0, 0.0));
    }

    #[test]
    fn test_custom_configuration_errors() {
        assert_eq!(CustomSensor::new(vec![], vec![]), Err(ConfigError::EmptyConeAngles));
        assert_eq!(
            CustomSensor::new(vec![0.1, 0.1, 0.1], vec![0.0, 1.0]),
            Err(ConfigError::AngleCountMismatch { cone: 3, clock: 2 })
        );
        assert!(matches!(
            CustomSensor::new(vec![0.1, 0.1, 0.1], vec![0.0, 2.0, 0.0]),
            Err(ConfigError::DegenerateGeometry(_))
        ));
        assert!(matches!(
            CustomSensor::new(vec![0.1, 0.1, 0.1, 0.1], vec![0.0, 0.0, 2.0, 4.0]),
            Err(ConfigError::DegenerateGeometry(_))
        ));
        assert!(matches!(
            CustomSensor::new(vec![2.0, 0.1, 0.1], vec![0.0, 2.0, 4.0]),
            Err(ConfigError::InvalidAngle { .. })
        ));
    }

    #[test]
    fn test_sensor_fov_dispatch() {
        let fov = SensorFov::Conical(ConicalSensor::new(0.2).unwrap());
        assert_eq!(fov.kind(), "CONICAL");
        assert!(fov.check_target_visibility(0.1, 0.0));
        assert!(fov.is_beyond_max_excursion(0.25));
    }
}
