//! # Records モジュール
//!
//! カバレッジ計算の入出力ファイルを扱います。
//!
//! - **グリッドファイル**: ヘッダー1行 + `region_index, gp_index, lat[deg], lon[deg]`
//! - **衛星状態ファイル**: ヘッダー5行（2〜4行目にエポック、刻み幅、期間）+
//!   `time_index, x, y, z, vx, vy, vz` (km, km/s)
//! - **アクセスファイル**: ヘッダー4行 + `TimeIndex,gpi` + アクセスのあった組のみ
//!
//! 角度は読み込み時にラジアンへ変換します。

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{common::SECONDS_PER_DAY, math_utils, CoverageRecord, OrbitState};

/// 入出力エラー
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("ファイル入出力エラー {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("CSV解析エラー {0}: {1}")]
    Csv(PathBuf, #[source] csv::Error),

    #[error("ヘッダー形式エラー {path} ({line}行目): {message}")]
    Header { path: PathBuf, line: usize, message: String },

    #[error("データ行形式エラー {path} ({line}行目): {message}")]
    Row { path: PathBuf, line: usize, message: String },
}

/// 読み込んだグリッド（ラジアン）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridData {
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
}

/// グリッドファイルを読み込む
///
/// 3列目と4列目（緯度・経度、度）だけを使う。
pub fn read_grid_file<P: AsRef<Path>>(path: P) -> Result<GridData, RecordError> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| RecordError::Csv(path.to_path_buf(), e))?;

    let mut grid = GridData::default();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| RecordError::Csv(path.to_path_buf(), e))?;
        let line = row + 2;
        let lat = parse_field(&record, 2, path, line)?;
        let lon = parse_field(&record, 3, path, line)?;
        grid.latitudes.push(math_utils::deg_to_rad(lat));
        grid.longitudes.push(math_utils::deg_to_rad(lon));
    }

    debug!("グリッド読み込み: {} ({}点)", path.display(), grid.latitudes.len());
    Ok(grid)
}

/// 衛星状態ファイルのヘッダー
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateFileHeader {
    /// エポック (JDUT1)
    pub epoch_jd: f64,
    /// 刻み幅 (s)
    pub step_size_s: f64,
    /// ミッション期間 (日)
    pub duration_days: f64,
}

impl StateFileHeader {
    /// 時刻インデックスに対応するユリウス日
    pub fn julian_date(&self, time_index: i64) -> f64 {
        self.epoch_jd + time_index as f64 * self.step_size_s / SECONDS_PER_DAY
    }
}

/// 状態ファイルの1行
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateRecord {
    pub time_index: i64,
    pub julian_date: f64,
    /// 慣性系（または設定によっては地球固定系）の状態
    pub state: OrbitState,
}

/// 読み込んだ状態履歴
#[derive(Debug, Clone, PartialEq)]
pub struct StateHistory {
    pub header: StateFileHeader,
    pub records: Vec<StateRecord>,
}

const STATE_HEADER_LINES: usize = 5;

/// 衛星状態ファイルを読み込む
pub fn read_state_file<P: AsRef<Path>>(path: P) -> Result<StateHistory, RecordError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| RecordError::Io(path.to_path_buf(), e))?;
    let lines: Vec<&str> = contents.lines().collect();
    if lines.len() < STATE_HEADER_LINES {
        return Err(RecordError::Header {
            path: path.to_path_buf(),
            line: lines.len() + 1,
            message: format!("ヘッダーは{}行必要です", STATE_HEADER_LINES),
        });
    }

    let header = StateFileHeader {
        epoch_jd: header_value(lines[1], 2, path, 2)?,
        step_size_s: header_value(lines[2], 4, path, 3)?,
        duration_days: header_value(lines[3], 4, path, 4)?,
    };

    let body = lines[STATE_HEADER_LINES..].join("\n");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut records = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let line = STATE_HEADER_LINES + row + 1;
        let record = record.map_err(|e| RecordError::Csv(path.to_path_buf(), e))?;
        if record.len() < 7 {
            return Err(RecordError::Row {
                path: path.to_path_buf(),
                line,
                message: format!("7列必要ですが{}列です", record.len()),
            });
        }
        let time_index = record[0].parse::<i64>().map_err(|e| RecordError::Row {
            path: path.to_path_buf(),
            line,
            message: format!("時刻インデックス '{}': {}", &record[0], e),
        })?;
        let mut e = [0.0; 6];
        for (k, value) in e.iter_mut().enumerate() {
            *value = parse_field(&record, k + 1, path, line)?;
        }
        records.push(StateRecord {
            time_index,
            julian_date: header.julian_date(time_index),
            state: OrbitState::from_array(e),
        });
    }

    debug!("状態ファイル読み込み: {} ({}ステップ)", path.display(), records.len());
    Ok(StateHistory { header, records })
}

/// アクセスファイルの1行
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccessRow {
    #[serde(rename = "TimeIndex")]
    pub time_index: usize,
    pub gpi: usize,
}

const ACCESS_HEADER_LINES: usize = 4;

/// アクセスファイルを書き出す（アクセスのないステップは出力しない）
pub fn write_access_file<P: AsRef<Path>>(
    path: P,
    header: &StateFileHeader,
    record: &CoverageRecord,
) -> Result<(), RecordError> {
    let path = path.as_ref();
    let io_err = |e| RecordError::Io(path.to_path_buf(), e);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
    writeln!(out, "Satellite states are in Earth-Centered-Inertial equatorial-plane frame.").map_err(io_err)?;
    writeln!(out, "Epoch[JDUT1] is {}", header.epoch_jd).map_err(io_err)?;
    writeln!(out, "Step size [s] is {}", header.step_size_s).map_err(io_err)?;
    writeln!(out, "Mission Duration [Days] is {}.", header.duration_days).map_err(io_err)?;

    let mut writer = csv::Writer::from_writer(out);
    let mut written = 0usize;
    for (time_index, gpi) in record.access_pairs() {
        writer
            .serialize(AccessRow { time_index, gpi })
            .map_err(|e| RecordError::Csv(path.to_path_buf(), e))?;
        written += 1;
    }
    // 組が1つもない場合でも列ヘッダーは出力する
    if written == 0 {
        writer
            .write_record(["TimeIndex", "gpi"])
            .map_err(|e| RecordError::Csv(path.to_path_buf(), e))?;
    }
    writer.flush().map_err(io_err)?;

    debug!("アクセスファイル書き出し: {} ({}組)", path.display(), written);
    Ok(())
}

/// アクセスファイルを読み込んで疎なカバレッジ記録に戻す
pub fn read_access_file<P: AsRef<Path>>(path: P) -> Result<CoverageRecord, RecordError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| RecordError::Io(path.to_path_buf(), e))?;
    let body: String = contents
        .lines()
        .skip(ACCESS_HEADER_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());
    let rows = reader
        .deserialize::<AccessRow>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RecordError::Csv(path.to_path_buf(), e))?;

    Ok(CoverageRecord::from_access_pairs(
        rows.into_iter().map(|row| (row.time_index, row.gpi)),
    ))
}

fn parse_field(record: &csv::StringRecord, column: usize, path: &Path, line: usize) -> Result<f64, RecordError> {
    let raw = record.get(column).ok_or_else(|| RecordError::Row {
        path: path.to_path_buf(),
        line,
        message: format!("{}列目がありません", column + 1),
    })?;
    raw.parse::<f64>().map_err(|e| RecordError::Row {
        path: path.to_path_buf(),
        line,
        message: format!("{}列目 '{}': {}", column + 1, raw, e),
    })
}

/// 空白区切りヘッダー行の `token` 番目の値
fn header_value(text: &str, token: usize, path: &Path, line: usize) -> Result<f64, RecordError> {
    let raw = text.split_whitespace().nth(token).ok_or_else(|| RecordError::Header {
        path: path.to_path_buf(),
        line,
        message: format!("'{}' に{}番目の値がありません", text, token + 1),
    })?;
    raw.trim_end_matches('.').parse::<f64>().map_err(|e| RecordError::Header {
        path: path.to_path_buf(),
        line,
        message: format!("'{}': {}", raw, e),
    })
}
