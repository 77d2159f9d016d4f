//! # Coverage Checker モジュール
//!
//! 1タイムステップ分の可視判定を行います。
//!
//! 各グリッド点について
//!
//! 1. 半球判定と地平線判定で明らかに見えない点を除外
//! 2. 衛星→点の視線ベクトルを地球固定系 → 天底座標系 → センサー座標系へ回転
//! 3. コーン角で最大偏位角による安価な除外を行い、残った点だけクロック角を求めて
//!    センサー視野の判定を呼ぶ
//!
//! ヨー反転が有効な場合は、同じ衛星位置に対してヨー180°の姿勢コピーで
//! 2回目のパスを実行し、和集合を昇順・重複なしで返します。
//! 姿勢は引数として渡され、このモジュールは共有状態を書き換えません。

use crate::models::{
    attitude::AttitudeModel,
    common::{math_utils, Mat3, Vec3, EARTH_RADIUS_KM},
    orbit::OrbitState,
    point_group::{GroundPoint, PointGroup},
    sensor::SensorFov,
    traits::IFieldOfView,
};

#[derive(Debug, Clone)]
pub struct CoverageChecker {
    point_group: PointGroup,
    sensor: SensorFov,
    /// 中心天体の半径 (km)
    body_radius: f64,
}

impl CoverageChecker {
    pub fn new(point_group: PointGroup, sensor: SensorFov) -> Self {
        Self {
            point_group,
            sensor,
            body_radius: EARTH_RADIUS_KM,
        }
    }

    pub fn with_body_radius(mut self, body_radius: f64) -> Self {
        self.body_radius = body_radius;
        self
    }

    pub fn point_group(&self) -> &PointGroup {
        &self.point_group
    }

    pub fn sensor(&self) -> &SensorFov {
        &self.sensor
    }

    /// 1ステップ分のカバレッジ（必要ならヨー反転パスとの和集合）
    ///
    /// `body_fixed_state` は地球固定系の衛星状態。
    pub fn check_step(
        &self,
        body_fixed_state: &OrbitState,
        attitude: &AttitudeModel,
        yaw180: bool,
    ) -> Vec<usize> {
        let mut points = self.check_point_coverage(body_fixed_state, attitude);
        if yaw180 {
            // 時刻は進めず、姿勢のコピーだけを反転させる
            let flipped = attitude.yaw_flipped();
            points.extend(self.check_point_coverage(body_fixed_state, &flipped));
            points.sort_unstable();
            points.dedup();
        }
        points
    }

    /// 全グリッド点に対する単一パスのカバレッジ（昇順）
    pub fn check_point_coverage(&self, body_fixed_state: &OrbitState, attitude: &AttitudeModel) -> Vec<usize> {
        let view = self.view_geometry(body_fixed_state, attitude);
        self.point_group
            .points()
            .iter()
            .filter(|point| view.is_visible(point, &self.sensor))
            .map(|point| point.index)
            .collect()
    }

    fn view_geometry(&self, body_fixed_state: &OrbitState, attitude: &AttitudeModel) -> ViewGeometry {
        let position = body_fixed_state.position;
        ViewGeometry {
            position,
            position_unit: position.normalize(),
            scaled_position: position / self.body_radius,
            body_radius: self.body_radius,
            fixed_to_sensor: attitude.nadir_to_sensor() * body_fixed_state.body_fixed_to_nadir(),
        }
    }
}

/// 1パス分の衛星位置と回転（点ごとに再計算しない）
struct ViewGeometry {
    position: Vec3,
    position_unit: Vec3,
    /// 天体半径で割った衛星位置
    scaled_position: Vec3,
    body_radius: f64,
    /// 地球固定系 → センサー座標系
    fixed_to_sensor: Mat3,
}

impl ViewGeometry {
    /// 半球判定と地平線判定
    fn is_feasible(&self, point: &GroundPoint) -> bool {
        let unit = &point.direction;
        if unit.dot(&self.position_unit) <= 0.0 {
            return false;
        }
        (self.scaled_position - unit).dot(unit) > 0.0
    }

    fn line_of_sight(&self, point: &GroundPoint) -> Vec3 {
        self.fixed_to_sensor * (point.direction * self.body_radius - self.position)
    }

    fn is_visible(&self, point: &GroundPoint, sensor: &SensorFov) -> bool {
        if !self.is_feasible(point) {
            return false;
        }
        let los = self.line_of_sight(point);
        let cone = math_utils::cone_angle(&los);
        if sensor.is_beyond_max_excursion(cone) {
            return false;
        }
        sensor.check_target_visibility(cone, math_utils::clock_angle(&los))
    }
}
