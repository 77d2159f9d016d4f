//! # Simulation モジュール
//!
//! 衛星状態履歴に沿ってグリッドカバレッジを計算する実行エンジンを提供します。
//!
//! ## 主要機能
//!
//! - **初期化**: グリッド・センサー・姿勢・状態履歴をすべて読み込み、
//!   設定エラーを最初のタイムステップより前に検出
//! - **時刻ループ**: 状態履歴をチャンクに分け、チャンク内のステップを
//!   `rayon` で並列に評価（設定で逐次実行も可）
//! - **出力**: アクセスのあった (ステップ, 点) の組だけをアクセスファイルへ書き出し
//!
//! ## 処理順序
//!
//! 各ステップでは以下を行います：
//!
//! 1. 状態を地球固定系へ変換（初期化時に済ませておく）
//! 2. 主パスのカバレッジ判定
//! 3. ヨー反転が有効なら、姿勢のコピーを反転させて2回目の判定
//! 4. 和集合を昇順・重複なしで記録（空なら記録しない）
//!
//! 各ステップは他のステップに依存しないため、並列実行しても結果は逐次実行と一致します。
//!
//! ## 使用例
//!
//! ```no_run
//! use gridcov::scenario::ScenarioConfig;
//! use gridcov::simulation::CoverageSimulation;
//!
//! let config = ScenarioConfig::from_file("scenarios/nadir_conical.yaml")?;
//! let mut simulation = CoverageSimulation::new(config, 1);
//! simulation.initialize()?;
//! let summary = simulation.run()?;
//! simulation.write_output()?;
//! println!("{}", summary.steps_with_access);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::time::Instant;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::models::{
    error::ConfigError, traits::IFieldOfView, AttitudeModel, CoverageChecker, CoverageRecord, OrbitState,
    PointGroup,
};
use crate::records::{self, RecordError, StateFileHeader};
use crate::scenario::{ScenarioConfig, ScenarioError};

/// 実行エラー
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("状態ファイル {row}行目 (時刻インデックス {time_index}): {source}")]
    InvalidState {
        row: usize,
        time_index: i64,
        #[source]
        source: ConfigError,
    },

    #[error("初期化されていません (initialize() を先に呼んでください)")]
    NotInitialized,
}

/// 実行結果の統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageSummary {
    pub grid_points: usize,
    pub steps_processed: usize,
    pub steps_with_access: usize,
    pub total_accesses: usize,
    pub distinct_points: usize,
}

impl CoverageSummary {
    fn from_record(record: &CoverageRecord, grid_points: usize, steps_processed: usize) -> Self {
        Self {
            grid_points,
            steps_processed,
            steps_with_access: record.len(),
            total_accesses: record.total_accesses(),
            distinct_points: record.distinct_points(),
        }
    }

    /// 一度でも可視になったグリッド点の割合 (%)
    pub fn coverage_percent(&self) -> f64 {
        if self.grid_points == 0 {
            return 0.0;
        }
        self.distinct_points as f64 / self.grid_points as f64 * 100.0
    }
}

/// 初期化後に確定する実行状態
struct PreparedRun {
    checker: CoverageChecker,
    attitude: AttitudeModel,
    header: StateFileHeader,
    /// 地球固定系の状態（行順 = ステップ番号）
    states: Vec<OrbitState>,
}

pub struct CoverageSimulation {
    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,
    prepared: Option<PreparedRun>,
    record: CoverageRecord,
    steps_processed: usize,
}

impl CoverageSimulation {
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Self {
        Self {
            scenario_config: scenario,
            verbose_level,
            prepared: None,
            record: CoverageRecord::new(),
            steps_processed: 0,
        }
    }

    /// 入力を読み込み、モデルを構築する
    pub fn initialize(&mut self) -> Result<(), SimulationError> {
        if self.verbose_level > 0 {
            info!("カバレッジ計算を初期化中...");
        }

        let point_group = self.initialize_grid()?;
        let sensor = self.scenario_config.build_sensor()?;
        let attitude = self.scenario_config.build_attitude()?;
        let (header, states) = self.initialize_states()?;

        if self.verbose_level > 1 {
            debug!(
                "センサー: {} (最大偏位角 {:.4} deg)",
                sensor.kind(),
                sensor.max_excursion_angle().to_degrees()
            );
            debug!("姿勢: 本体 {:?} / センサー {:?}", attitude.body_offset(), attitude.sensor_offset());
        }

        let checker = CoverageChecker::new(point_group, sensor)
            .with_body_radius(self.scenario_config.coverage.body_radius_km);

        if self.verbose_level > 0 {
            info!("初期化完了:");
            info!("  グリッド点: {}点", checker.point_group().count());
            info!("  タイムステップ: {}", states.len());
            info!("  ヨー180°反転: {}", self.scenario_config.coverage.yaw180);
        }

        self.prepared = Some(PreparedRun { checker, attitude, header, states });
        self.record = CoverageRecord::new();
        self.steps_processed = 0;
        Ok(())
    }

    fn initialize_grid(&self) -> Result<PointGroup, SimulationError> {
        let grid = records::read_grid_file(&self.scenario_config.grid.file)?;
        let mut point_group = PointGroup::new();
        point_group.add_points(&grid.latitudes, &grid.longitudes)?;
        if point_group.is_empty() {
            warn!("グリッド点が0点です: {}", self.scenario_config.grid.file.display());
        }
        Ok(point_group)
    }

    fn initialize_states(&self) -> Result<(StateFileHeader, Vec<OrbitState>), SimulationError> {
        let history = records::read_state_file(&self.scenario_config.states.file)?;
        let converter = self.scenario_config.frame_converter();
        if self.verbose_level > 1 {
            debug!("座標変換: {}", converter.name());
        }

        let mut states = Vec::with_capacity(history.records.len());
        for (row, record) in history.records.iter().enumerate() {
            let fixed = converter.to_body_fixed(&record.state, record.julian_date);
            fixed.validate().map_err(|source| SimulationError::InvalidState {
                row,
                time_index: record.time_index,
                source,
            })?;
            states.push(fixed);
        }
        Ok((history.header, states))
    }

    /// 全タイムステップを評価する
    pub fn run(&mut self) -> Result<CoverageSummary, SimulationError> {
        let prepared = self.prepared.as_ref().ok_or(SimulationError::NotInitialized)?;
        let coverage = &self.scenario_config.coverage;
        let total = prepared.states.len();
        let chunk_size = coverage.chunk_size.max(1);

        info!("=== カバレッジ計算開始 ===");
        let started = Instant::now();

        let mut record = CoverageRecord::new();
        for (chunk_index, chunk) in prepared.states.chunks(chunk_size).enumerate() {
            let first_step = chunk_index * chunk_size;
            let results = evaluate_steps(
                &prepared.checker,
                &prepared.attitude,
                chunk,
                first_step,
                coverage.yaw180,
                coverage.parallel,
            );
            for (step, points) in results {
                if self.verbose_level > 2 {
                    trace!("ステップ {}: {}点", step, points.len());
                }
                record.insert(step, points);
            }

            if self.verbose_level > 0 {
                let done = first_step + chunk.len();
                let progress = done as f64 / total as f64 * 100.0;
                info!("進行状況: {:.1}% ({}/{}ステップ)", progress, done, total);
            }
        }

        let summary = CoverageSummary::from_record(&record, prepared.checker.point_group().count(), total);
        self.record = record;
        self.steps_processed = total;

        info!("=== カバレッジ計算完了 ===");
        info!("処理時間: {:.3}秒", started.elapsed().as_secs_f64());
        info!("総ステップ数: {}", summary.steps_processed);
        info!("アクセスのあったステップ: {}", summary.steps_with_access);
        info!("アクセス総数: {}", summary.total_accesses);
        info!(
            "可視になったグリッド点: {} / {} ({:.1}%)",
            summary.distinct_points,
            summary.grid_points,
            summary.coverage_percent()
        );

        Ok(summary)
    }

    /// アクセスファイルを書き出す
    pub fn write_output(&self) -> Result<(), SimulationError> {
        let prepared = self.prepared.as_ref().ok_or(SimulationError::NotInitialized)?;
        let path = &self.scenario_config.output.access_file;
        records::write_access_file(path, &prepared.header, &self.record)?;
        info!("アクセスファイルを出力しました: {}", path.display());
        Ok(())
    }

    pub fn record(&self) -> &CoverageRecord {
        &self.record
    }

    pub fn summary(&self) -> CoverageSummary {
        let grid_points = self
            .prepared
            .as_ref()
            .map_or(0, |p| p.checker.point_group().count());
        CoverageSummary::from_record(&self.record, grid_points, self.steps_processed)
    }
}

/// 連続するステップ群を評価し、(ステップ番号, 可視点) を昇順で返す
///
/// 姿勢は共有参照で渡され、ヨー反転は各タスクが作るコピーに対して行われる。
pub fn evaluate_steps(
    checker: &CoverageChecker,
    attitude: &AttitudeModel,
    states: &[OrbitState],
    first_step: usize,
    yaw180: bool,
    parallel: bool,
) -> Vec<(usize, Vec<usize>)> {
    let evaluate = |(offset, state): (usize, &OrbitState)| {
        (first_step + offset, checker.check_step(state, attitude, yaw180))
    };
    if parallel {
        states.par_iter().enumerate().map(evaluate).collect()
    } else {
        states.iter().enumerate().map(evaluate).collect()
    }
}
