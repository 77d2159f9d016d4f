use crate::models::orbit::OrbitState;

/// センサー視野のインターフェース
///
/// 入力はすべてセンサー座標系で表現済みのコーン角・クロック角（ラジアン）。
pub trait IFieldOfView {
    /// ターゲット方向が視野内にあるかどうか
    fn check_target_visibility(&self, cone_angle: f64, clock_angle: f64) -> bool;

    /// 視野内の点が取り得る最大コーン角（安価な除外判定に使う）
    fn max_excursion_angle(&self) -> f64;

    /// コーン角だけで視野外と確定できるかどうか
    fn is_beyond_max_excursion(&self, cone_angle: f64) -> bool {
        cone_angle > self.max_excursion_angle()
    }
}

/// 衛星状態を慣性系から地球固定系へ変換するインターフェース
pub trait IFrameConverter: Send + Sync {
    /// 指定ユリウス日 (JDUT1) の地球固定系状態を返す
    fn to_body_fixed(&self, inertial: &OrbitState, julian_date: f64) -> OrbitState;

    /// 変換名（ログ出力用）
    fn name(&self) -> &'static str;
}
