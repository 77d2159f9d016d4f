use std::f64::consts::{FRAC_PI_2, PI};

use crate::models::{common::Vec3, error::ConfigError};

/// 地上グリッド点
///
/// 一度作成されたら変更されない。インデックスは出力の列番号になる。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPoint {
    pub index: usize,
    /// 緯度 (rad)
    pub latitude: f64,
    /// 経度 (rad)
    pub longitude: f64,
    /// 基準球面上の単位方向ベクトル（地球固定系）
    pub direction: Vec3,
}

impl GroundPoint {
    fn new(index: usize, latitude: f64, longitude: f64) -> Self {
        let cos_lat = latitude.cos();
        let direction = Vec3::new(
            cos_lat * longitude.cos(),
            cos_lat * longitude.sin(),
            latitude.sin(),
        );
        Self { index, latitude, longitude, direction }
    }
}

/// 地上グリッド点の登録簿
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointGroup {
    points: Vec<GroundPoint>,
}

impl PointGroup {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// 緯度・経度の配列（ラジアン）から点を追加し、続きのインデックスを割り当てる
    ///
    /// 範囲外の値は丸めずに拒否する。エラー時は何も追加しない。
    pub fn add_points(&mut self, latitudes: &[f64], longitudes: &[f64]) -> Result<(), ConfigError> {
        if latitudes.len() != longitudes.len() {
            return Err(ConfigError::PointCountMismatch {
                lat: latitudes.len(),
                lon: longitudes.len(),
            });
        }

        let start = self.points.len();
        for (offset, (&lat, &lon)) in latitudes.iter().zip(longitudes.iter()).enumerate() {
            let lat_ok = (-FRAC_PI_2..=FRAC_PI_2).contains(&lat);
            let lon_ok = (-PI..=PI).contains(&lon);
            if !lat_ok || !lon_ok {
                return Err(ConfigError::PointOutOfRange { index: start + offset, lat, lon });
            }
        }

        self.points.extend(
            latitudes
                .iter()
                .zip(longitudes.iter())
                .enumerate()
                .map(|(offset, (&lat, &lon))| GroundPoint::new(start + offset, lat, lon)),
        );
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point_at(&self, index: usize) -> Option<&GroundPoint> {
        self.points.get(index)
    }

    pub fn points(&self) -> &[GroundPoint] {
        &self.points
    }
}
