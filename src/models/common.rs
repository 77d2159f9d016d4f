use nalgebra::{Matrix3, Vector3};

/// 3次元ベクトル（km または無次元の単位ベクトル）
pub type Vec3 = Vector3<f64>;

/// 3x3回転行列
pub type Mat3 = Matrix3<f64>;

/// 地球赤道半径 (km)
pub const EARTH_RADIUS_KM: f64 = 6378.1363;

/// 1日あたりの秒数
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// 幾何計算で「ゼロ」とみなす閾値
pub const GEOMETRY_EPSILON: f64 = 1e-12;

/// 数学ユーティリティ関数
pub mod math_utils {
    use super::{Mat3, Vec3};
    use std::f64::consts::{FRAC_PI_2, TAU};

    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees.to_radians()
    }

    /// ラジアンを度に変換
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians.to_degrees()
    }

    /// 角度を [0, 2π) の範囲に正規化
    pub fn normalize_clock_angle(angle_rad: f64) -> f64 {
        let normalized = angle_rad.rem_euclid(TAU);
        // rem_euclid は丸めで TAU そのものを返すことがある
        if normalized >= TAU { 0.0 } else { normalized }
    }

    /// [-1, 1] にクランプしてから arccos を取る
    pub fn safe_acos(x: f64) -> f64 {
        x.clamp(-1.0, 1.0).acos()
    }

    /// [-1, 1] にクランプしてから arcsin を取る
    pub fn safe_asin(x: f64) -> f64 {
        x.clamp(-1.0, 1.0).asin()
    }

    /// 赤経・赤緯（センサー座標系では クロック角・90°-コーン角）から単位ベクトルを作成
    pub fn ra_dec_to_unit_vec(ra: f64, dec: f64) -> Vec3 {
        let cos_dec = dec.cos();
        Vec3::new(cos_dec * ra.cos(), cos_dec * ra.sin(), dec.sin())
    }

    /// コーン角・クロック角から単位ベクトルを作成
    pub fn cone_clock_to_unit_vec(cone: f64, clock: f64) -> Vec3 {
        ra_dec_to_unit_vec(clock, FRAC_PI_2 - cone)
    }

    /// ベクトルのコーン角（+Z軸からの角距離）
    ///
    /// ゼロベクトルに対してはNaNが伝播する。
    pub fn cone_angle(v: &Vec3) -> f64 {
        safe_acos(v.z / v.norm())
    }

    /// ベクトルのクロック角（+X軸から反時計回り、[0, 2π)）
    pub fn clock_angle(v: &Vec3) -> f64 {
        normalize_clock_angle(v.y.atan2(v.x))
    }

    /// ベクトルをコーン角・クロック角に変換
    pub fn vector_to_cone_clock(v: &Vec3) -> (f64, f64) {
        (cone_angle(v), clock_angle(v))
    }

    /// 主軸まわりの座標系回転行列（受動回転）
    ///
    /// `axis` は 1, 2, 3 のいずれか（X, Y, Z）。呼び出し側で検証済みであること。
    #[rustfmt::skip]
    pub fn axis_rotation(axis: u8, angle: f64) -> Mat3 {
        let (s, c) = angle.sin_cos();
        match axis {
            1 => Mat3::new(
                1.0, 0.0, 0.0,
                0.0, c, s,
                0.0, -s, c,
            ),
            2 => Mat3::new(
                c, 0.0, -s,
                0.0, 1.0, 0.0,
                s, 0.0, c,
            ),
            _ => Mat3::new(
                c, s, 0.0,
                -s, c, 0.0,
                0.0, 0.0, 1.0,
            ),
        }
    }
}
