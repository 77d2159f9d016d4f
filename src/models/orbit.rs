use crate::models::{
    common::{math_utils, Mat3, Vec3, GEOMETRY_EPSILON},
    error::ConfigError,
    traits::IFrameConverter,
};

/// 衛星の軌道状態（位置 km、速度 km/s）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitState {
    pub position: Vec3,
    pub velocity: Vec3,
}

impl OrbitState {
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self { position, velocity }
    }

    /// `[x, y, z, vx, vy, vz]` から作成
    pub fn from_array(e: [f64; 6]) -> Self {
        Self::new(Vec3::new(e[0], e[1], e[2]), Vec3::new(e[3], e[4], e[5]))
    }

    /// 天底座標系を構築できる状態かどうかを検証
    ///
    /// 非有限値、ゼロ位置、位置と速度が平行な状態は後段でNaNを生むため、
    /// 時刻ループに入る前に弾く。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = self.position.iter().chain(self.velocity.iter()).all(|v| v.is_finite());
        if !finite {
            return Err(ConfigError::InvalidOrbitState("非有限値を含んでいます".to_string()));
        }
        if self.position.norm() < GEOMETRY_EPSILON {
            return Err(ConfigError::InvalidOrbitState("位置ベクトルがゼロです".to_string()));
        }
        if self.position.cross(&self.velocity).norm() < GEOMETRY_EPSILON {
            return Err(ConfigError::InvalidOrbitState(
                "位置と速度が平行なため天底座標系を定義できません".to_string(),
            ));
        }
        Ok(())
    }

    /// 地球固定系から天底指向座標系への回転行列
    ///
    /// - Z軸: 天底方向 (-r)
    /// - X軸: -(Z × v)
    /// - Y軸: Z × X
    pub fn body_fixed_to_nadir(&self) -> Mat3 {
        let z = -self.position.normalize();
        let x = -(z.cross(&self.velocity)).normalize();
        let y = z.cross(&x);
        Mat3::from_rows(&[x.transpose(), y.transpose(), z.transpose()])
    }
}

/// グリニッジ平均恒星時 (IAU-1982) をラジアンで返す
pub fn gmst_rad(julian_date_ut1: f64) -> f64 {
    let t = (julian_date_ut1 - 2_451_545.0) / 36_525.0;
    let gmst_sec = 67_310.548_41
        + (876_600.0 * 3_600.0 + 8_640_184.812_866) * t
        + 0.093_104 * t * t
        - 6.2e-6 * t * t * t;
    let gmst_deg = gmst_sec.rem_euclid(86_400.0) / 240.0;
    math_utils::normalize_clock_angle(math_utils::deg_to_rad(gmst_deg))
}

/// 地球自転（GMSTによるZ軸回転）で慣性系を地球固定系へ変換
///
/// 速度に対する ω×r 項は無視する。
#[derive(Debug, Clone, Copy, Default)]
pub struct GmstEarthRotation;

impl IFrameConverter for GmstEarthRotation {
    fn to_body_fixed(&self, inertial: &OrbitState, julian_date: f64) -> OrbitState {
        let rot = math_utils::axis_rotation(3, gmst_rad(julian_date));
        OrbitState::new(rot * inertial.position, rot * inertial.velocity)
    }

    fn name(&self) -> &'static str {
        "GMST地球自転"
    }
}

/// 状態がすでに地球固定系で与えられている場合の恒等変換
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyFixedFrame;

impl IFrameConverter for BodyFixedFrame {
    fn to_body_fixed(&self, inertial: &OrbitState, _julian_date: f64) -> OrbitState {
        *inertial
    }

    fn name(&self) -> &'static str {
        "地球固定系（変換なし）"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn equatorial_state() -> OrbitState {
        OrbitState::new(Vec3::new(7000.0, 0.0, 0.0), Vec3::new(0.0, 7.5, 0.0))
    }

    #[test]
    fn test_nadir_frame_points_z_down() {
        let r = equatorial_state().body_fixed_to_nadir();
        // 地心方向は天底座標系の +Z
        let to_center = r * Vec3::new(-1.0, 0.0, 0.0);
        assert_relative_eq!(to_center, Vec3::z(), epsilon = 1e-12);
        // 速度方向は天底座標系で +Y
        let along_track = r * Vec3::new(0.0, 1.0, 0.0);
        assert_relative_eq!(along_track, Vec3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_nadir_frame_is_orthonormal() {
        let state = OrbitState::new(Vec3::new(5000.0, 3000.0, 3500.0), Vec3::new(-3.0, 6.0, 1.0));
        let r = state.body_fixed_to_nadir();
        assert_relative_eq!(r * r.transpose(), Mat3::identity(), epsilon = 1e-12);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_validate_rejects_degenerate_states() {
        assert!(equatorial_state().validate().is_ok());

        let radial = OrbitState::new(Vec3::new(7000.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(radial.validate().is_err());

        let nan = OrbitState::new(Vec3::new(f64::NAN, 0.0, 0.0), Vec3::new(0.0, 7.5, 0.0));
        assert!(nan.validate().is_err());

        let zero = OrbitState::new(Vec3::zeros(), Vec3::new(0.0, 7.5, 0.0));
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_gmst_at_j2000() {
        // J2000.0 (2000-01-01 12:00 UT1) の GMST は約 280.46°
        let gmst = math_utils::rad_to_deg(gmst_rad(2_451_545.0));
        assert_relative_eq!(gmst, 280.460_618_37, epsilon = 1e-6);
    }

    #[test]
    fn test_gmst_rotation_preserves_magnitude_and_z() {
        let inertial = OrbitState::new(Vec3::new(4000.0, 5000.0, 1000.0), Vec3::new(1.0, -2.0, 7.0));
        let fixed = GmstEarthRotation.to_body_fixed(&inertial, 2_459_000.25);
        assert_relative_eq!(fixed.position.norm(), inertial.position.norm(), epsilon = 1e-9);
        assert_relative_eq!(fixed.position.z, inertial.position.z, epsilon = 1e-12);
        assert_eq!(BodyFixedFrame.to_body_fixed(&inertial, 0.0), inertial);
    }
}
