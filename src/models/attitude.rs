use std::f64::consts::PI;

use crate::models::{
    common::{math_utils, Mat3},
    error::ConfigError,
};

/// オイラー角オフセット
///
/// 角度はラジアン。シーケンスは 1 (X), 2 (Y), 3 (Z) の異なる3軸。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttitudeOffset {
    pub angle1: f64,
    pub angle2: f64,
    pub angle3: f64,
    pub seq1: u8,
    pub seq2: u8,
    pub seq3: u8,
}

impl AttitudeOffset {
    /// オイラー角とシーケンスから作成し、シーケンスを検証
    pub fn new(angles: [f64; 3], sequence: [u8; 3]) -> Result<Self, ConfigError> {
        let offset = Self {
            angle1: angles[0],
            angle2: angles[1],
            angle3: angles[2],
            seq1: sequence[0],
            seq2: sequence[1],
            seq3: sequence[2],
        };
        offset.validate()?;
        Ok(offset)
    }

    /// 度単位の角度から作成
    pub fn from_degrees(angles_deg: [f64; 3], sequence: [u8; 3]) -> Result<Self, ConfigError> {
        Self::new(angles_deg.map(math_utils::deg_to_rad), sequence)
    }

    /// 回転なし (0, 0, 0, 1-2-3)
    pub fn zero() -> Self {
        Self {
            angle1: 0.0,
            angle2: 0.0,
            angle3: 0.0,
            seq1: 1,
            seq2: 2,
            seq3: 3,
        }
    }

    pub fn sequence(&self) -> [u8; 3] {
        [self.seq1, self.seq2, self.seq3]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let seq = self.sequence();
        let axes_valid = seq.iter().all(|axis| (1..=3).contains(axis));
        let distinct = seq[0] != seq[1] && seq[1] != seq[2] && seq[0] != seq[2];
        if !axes_valid || !distinct {
            return Err(ConfigError::InvalidEulerSequence(seq));
        }
        let angles = [self.angle1, self.angle2, self.angle3];
        if let Some(bad) = angles.iter().find(|a| !a.is_finite()) {
            return Err(ConfigError::InvalidAngle { name: "euler_angle", value: *bad });
        }
        Ok(())
    }

    /// 回転前の座標系から回転後の座標系への方向余弦行列
    ///
    /// `R = R_seq3(angle3) · R_seq2(angle2) · R_seq1(angle1)`
    pub fn to_cosine_matrix(&self) -> Mat3 {
        math_utils::axis_rotation(self.seq3, self.angle3)
            * math_utils::axis_rotation(self.seq2, self.angle2)
            * math_utils::axis_rotation(self.seq1, self.angle1)
    }
}

impl Default for AttitudeOffset {
    fn default() -> Self {
        Self::zero()
    }
}

/// 姿勢モデル
///
/// 天底指向を基準とし、衛星本体のオフセット、ヨー反転、センサー取付オフセットを
/// 合成して「天底座標系 → センサー座標系」の回転行列を保持する。
///
/// 値型であり、ヨー反転パスでは共有状態を書き換えずに [`AttitudeModel::yaw_flipped`]
/// でコピーを作る。並列実行時も各タスクが独立した姿勢を持てる。
#[derive(Debug, Clone, PartialEq)]
pub struct AttitudeModel {
    /// 衛星本体の天底指向からのオフセット
    body_offset: AttitudeOffset,
    /// 衛星本体座標系からセンサー座標系へのオフセット
    sensor_offset: AttitudeOffset,
    /// 衛星本体をヨー軸まわりに180°回転させているか
    yaw180: bool,
    /// 合成済みの回転行列（天底座標系 → センサー座標系）
    nadir_to_sensor: Mat3,
}

impl AttitudeModel {
    /// センサー取付オフセットのみを持つ天底指向姿勢を作成
    pub fn new(sensor_offset: AttitudeOffset) -> Result<Self, ConfigError> {
        Self::with_body_offset(AttitudeOffset::zero(), sensor_offset)
    }

    pub fn with_body_offset(
        body_offset: AttitudeOffset,
        sensor_offset: AttitudeOffset,
    ) -> Result<Self, ConfigError> {
        body_offset.validate()?;
        sensor_offset.validate()?;
        let mut model = Self {
            body_offset,
            sensor_offset,
            yaw180: false,
            nadir_to_sensor: Mat3::identity(),
        };
        model.recompute();
        Ok(model)
    }

    /// 衛星本体オフセットを丸ごと置き換える
    pub fn set_offset(&mut self, offset: AttitudeOffset) -> Result<(), ConfigError> {
        offset.validate()?;
        self.body_offset = offset;
        self.recompute();
        Ok(())
    }

    pub fn body_offset(&self) -> &AttitudeOffset {
        &self.body_offset
    }

    pub fn sensor_offset(&self) -> &AttitudeOffset {
        &self.sensor_offset
    }

    pub fn is_yaw_flipped(&self) -> bool {
        self.yaw180
    }

    /// 衛星本体をヨー軸まわりに180°回した姿勢のコピー
    ///
    /// 元の姿勢は変更しない。2回適用すると元に戻る。
    pub fn yaw_flipped(&self) -> Self {
        let mut flipped = self.clone();
        flipped.yaw180 = !self.yaw180;
        flipped.recompute();
        flipped
    }

    /// 指定したオフセットで衛星本体を回した場合の天底座標系 → 本体座標系の回転行列
    pub fn rotation_to_body(offset: &AttitudeOffset) -> Mat3 {
        offset.to_cosine_matrix()
    }

    /// 天底座標系 → センサー座標系の回転行列
    pub fn nadir_to_sensor(&self) -> &Mat3 {
        &self.nadir_to_sensor
    }

    fn recompute(&mut self) {
        let mut nadir_to_body = Self::rotation_to_body(&self.body_offset);
        if self.yaw180 {
            nadir_to_body = math_utils::axis_rotation(3, PI) * nadir_to_body;
        }
        self.nadir_to_sensor = self.sensor_offset.to_cosine_matrix() * nadir_to_body;
    }
}

impl Default for AttitudeModel {
    fn default() -> Self {
        Self {
            body_offset: AttitudeOffset::zero(),
            sensor_offset: AttitudeOffset::zero(),
            yaw180: false,
            nadir_to_sensor: Mat3::identity(),
        }
    }
}
