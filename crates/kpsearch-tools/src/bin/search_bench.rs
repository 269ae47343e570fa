//! 探索ベンチマーク
//!
//! 設定ファイルからエンジンを組み立て、与えた局面を順に思考させて結果を表示する。
//! 評価パラメータがなくても `--random-weights` で乱数の重みを使って動作確認できる。
//!
//! # よく使うコマンド例
//!
//! - 平手初期局面を深さ8で:
//!   `cargo run -p kpsearch-tools --bin search_bench -- --random-weights --depth 8`
//!
//! - 設定ファイルとSFENファイルを使い、1局面あたり3秒:
//!   `cargo run -p kpsearch-tools --release --bin search_bench -- --config engine.toml --sfen-file bench.sfen --movetime 3000`

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use kpsearch_core::config::EngineConfig;
use kpsearch_core::eval::EvalParameters;
use kpsearch_core::position::{Position, SFEN_HIRATE};
use kpsearch_core::search::{LimitsType, SearchInfo};
use kpsearch_core::think::{Think, ThinkResult};

#[derive(Parser, Debug)]
#[command(name = "search_bench")]
#[command(about = "指定局面を探索して思考結果を表示する")]
struct Cli {
    /// エンジン設定（TOML）。省略時は既定値
    #[arg(long)]
    config: Option<PathBuf>,

    /// 主評価関数のパラメータ（設定ファイルの指定を上書きする）
    #[arg(long, conflicts_with = "random_weights")]
    params: Option<PathBuf>,

    /// 乱数の重みで評価する（動作確認用）
    #[arg(long, default_value_t = false)]
    random_weights: bool,

    /// 乱数の重みのシード
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// 探索する局面（SFEN、複数指定可）
    #[arg(long)]
    sfen: Vec<String>,

    /// 1行1局面のSFENファイル（`#` で始まる行は読み飛ばす）
    #[arg(long)]
    sfen_file: Option<PathBuf>,

    /// 最大深さ（0 は制限なし）
    #[arg(long, default_value_t = 0)]
    depth: i32,

    /// スレッドあたりの最大ノード数（0 は制限なし）
    #[arg(long, default_value_t = 0)]
    nodes: u64,

    /// 1局面あたりの思考時間（ミリ秒、0 は制限なし）
    #[arg(long, default_value_t = 0)]
    movetime: u64,

    /// 探索スレッド数（設定ファイルの指定を上書きする）
    #[arg(long)]
    threads: Option<usize>,

    /// 反復ごとの info 行を表示する
    #[arg(long, default_value_t = false)]
    info: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    if cli.depth == 0 && cli.nodes == 0 && cli.movetime == 0 {
        bail!("one of --depth, --nodes or --movetime must be given");
    }
    if cli.depth < 0 {
        bail!("--depth must be >= 0");
    }

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(threads) = cli.threads {
        if threads == 0 {
            bail!("--threads must be >= 1");
        }
        config.threads = threads;
    }

    let params = if cli.random_weights {
        log::info!("using random weights (seed {})", cli.seed);
        EvalParameters::random(cli.seed)
    } else {
        let path = cli
            .params
            .as_ref()
            .or(config.eval.params_file.as_ref())
            .context("no evaluation parameters: pass --params, set eval.params_file or use --random-weights")?;
        EvalParameters::load(path)
            .with_context(|| format!("failed to load parameters {}", path.display()))?
    };
    let evaluator = config.build_evaluator(Arc::new(params))?;
    let book = config.load_book()?;
    let mut think = Think::new(&config, evaluator, book);

    let sfens = collect_sfens(&cli)?;
    let limits = LimitsType {
        depth: cli.depth,
        nodes: cli.nodes,
        movetime: cli.movetime,
        ..Default::default()
    };

    let print_info = |info: &SearchInfo| println!("{}", info.to_usi());
    let total_start = Instant::now();
    let mut searched = 0usize;

    for (i, sfen) in sfens.iter().enumerate() {
        let mut pos = Position::new();
        pos.set_sfen(sfen)
            .with_context(|| format!("invalid sfen #{}: {sfen}", i + 1))?;

        think.new_game();
        println!("position {}/{}: {sfen}", i + 1, sfens.len());
        let start = Instant::now();
        let result = if cli.info {
            think.think_with_info(&pos, &limits, &print_info)
        } else {
            think.think(&pos, &limits)
        };
        let elapsed = start.elapsed();

        match &result {
            ThinkResult::Search { score, depth, .. } => {
                searched += 1;
                println!("  depth {depth} score {} time {}ms", score.to_usi(), elapsed.as_millis());
            }
            ThinkResult::Book { .. } => println!("  book move"),
            ThinkResult::Win | ThinkResult::Resign => {}
        }
        println!("{}", result.to_usi());
    }

    log::info!(
        "searched {searched} of {} positions in {:.2}s",
        sfens.len(),
        total_start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// コマンドラインとファイルから局面を集める（何もなければ平手初期局面）
fn collect_sfens(cli: &Cli) -> Result<Vec<String>> {
    let mut sfens = cli.sfen.clone();
    if let Some(path) = &cli.sfen_file {
        sfens.extend(read_sfen_file(path)?);
    }
    if sfens.is_empty() {
        sfens.push(SFEN_HIRATE.to_string());
    }
    Ok(sfens)
}

fn read_sfen_file(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut sfens = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // "sfen " や "position sfen " の前置きは外す
        let sfen = line
            .strip_prefix("position ")
            .unwrap_or(line)
            .trim_start();
        let sfen = sfen.strip_prefix("sfen ").unwrap_or(sfen);
        sfens.push(sfen.to_string());
    }
    Ok(sfens)
}
