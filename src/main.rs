use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};
use tracing::{error, info};

use gridcov::logging::{init_logging, level_for_verbosity, parse_log_level, LogConfig, LogOutput};
use gridcov::scenario::ScenarioConfig;
use gridcov::simulation::CoverageSimulation;

fn build_cli() -> Command {
    Command::new("gridcov")
        .version(env!("CARGO_PKG_VERSION"))
        .about("衛星センサー視野による地上グリッドカバレッジ計算")
        .long_about(
            "衛星の状態履歴とセンサー視野（円錐・矩形・任意多角形）から、\n\
             各タイムステップで視野内にある地上グリッド点を求めてアクセスファイルに出力します。",
        )
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .required(true)
                .help("シナリオファイル(.yaml)のパスを指定"),
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了"),
        )
        .arg(
            Arg::new("yaw180")
                .long("yaw180")
                .action(ArgAction::SetTrue)
                .help("ヨー180°反転パスを有効にする（シナリオの設定を上書き）"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("アクセスファイルの出力先（シナリオの設定を上書き）"),
        )
        .arg(
            Arg::new("sequential")
                .long("sequential")
                .action(ArgAction::SetTrue)
                .help("タイムステップを逐次実行する"),
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .value_parser(|s: &str| s.parse::<LogOutput>())
                .help("ログ出力先 (console, file, both)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .default_value("info")
                .help("ログレベル (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .value_name("DIR")
                .default_value("logs")
                .help("ログファイルの出力ディレクトリ"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: ステップごと)"),
        )
}

fn main() {
    let matches = build_cli().get_matches();

    let verbose_level = matches.get_count("verbose");
    let log_config = LogConfig {
        level: level_for_verbosity(
            verbose_level,
            parse_log_level(matches.get_one::<String>("log-level").map_or("info", String::as_str)),
        ),
        output: matches
            .get_one::<LogOutput>("log-output")
            .copied()
            .unwrap_or(LogOutput::Console),
        log_dir: matches
            .get_one::<String>("log-dir")
            .cloned()
            .unwrap_or_else(|| "logs".to_string()),
        ..LogConfig::default()
    };

    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            std::process::exit(1);
        }
    };

    let Some(scenario_path) = matches.get_one::<String>("scenario") else {
        eprintln!("エラー: シナリオファイルを指定してください (-s FILE)");
        std::process::exit(1);
    };

    let overrides = Overrides {
        yaw180: matches.get_flag("yaw180"),
        sequential: matches.get_flag("sequential"),
        output: matches.get_one::<PathBuf>("output").cloned(),
    };

    match run_scenario(scenario_path, matches.get_flag("info"), verbose_level, overrides) {
        Ok(()) => {
            if verbose_level > 0 {
                info!("カバレッジ計算が正常に完了しました");
            }
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("エラー: {}", e);
            std::process::exit(1);
        }
    }
}

/// コマンドラインによるシナリオ設定の上書き
struct Overrides {
    yaw180: bool,
    sequential: bool,
    output: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, scenario: &mut ScenarioConfig) {
        if self.yaw180 {
            scenario.coverage.yaw180 = true;
        }
        if self.sequential {
            scenario.coverage.parallel = false;
        }
        if let Some(output) = self.output {
            scenario.output.access_file = output;
        }
    }
}

/// シナリオファイルを読み込んで実行
fn run_scenario(
    scenario_path: &str,
    info_only: bool,
    verbose_level: u8,
    overrides: Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut scenario = ScenarioConfig::from_file(scenario_path)?;
    overrides.apply(&mut scenario);

    if verbose_level > 0 {
        info!("シナリオファイル読み込み完了: {}", scenario_path);
    }

    if info_only {
        scenario.print_summary();
        return Ok(());
    }

    if verbose_level > 0 {
        scenario.print_summary();
        println!();
    }

    let mut simulation = CoverageSimulation::new(scenario, verbose_level);
    simulation.initialize()?;
    let summary = simulation.run()?;
    simulation.write_output()?;

    println!(
        "ステップ {} / アクセスあり {} / アクセス総数 {} / 可視点 {} ({:.1}%)",
        summary.steps_processed,
        summary.steps_with_access,
        summary.total_accesses,
        summary.distinct_points,
        summary.coverage_percent()
    );
    Ok(())
}
