//! CallLab CLI — validate, simulate, sweep and synthetic data commands.
//!
//! Commands:
//! - `validate` — compile a strategy file and report every rejection reason
//! - `simulate` — replay one strategy over one candle CSV, print events + summary as JSON
//! - `sweep` — run a parameter grid over many candle files, one JSON line per job
//! - `synth` — write a seeded synthetic candle CSV
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); stdout carries only JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use calllab_core::domain::{Event, TradeSummary};
use calllab_core::fingerprint::{plan_hash, OutputDigest, PlanHash};
use calllab_core::plan::{compile, StrategyPlan};
use calllab_core::run;
use calllab_runner::{
    load_grid, load_strategy, load_token, load_tokens, run_sweep, save_candles,
    synthetic_candles, SweepOptions,
};

#[derive(Parser)]
#[command(
    name = "calllab",
    about = "CallLab CLI — deterministic candle replay for token call strategies"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a strategy file and print the plan or every rejection reason.
    Validate {
        /// Strategy config (.toml or .json).
        #[arg(long)]
        strategy: PathBuf,
    },
    /// Replay one strategy over one token's candles.
    Simulate {
        /// Strategy config (.toml or .json).
        #[arg(long)]
        strategy: PathBuf,

        /// Candle CSV with header timestamp,open,high,low,close,volume.
        #[arg(long)]
        candles: PathBuf,

        /// Also write the JSON result to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run a parameter grid over one or more candle files.
    Sweep {
        /// Base strategy config (.toml or .json).
        #[arg(long)]
        strategy: PathBuf,

        /// Parameter grid (.toml or .json).
        #[arg(long)]
        grid: PathBuf,

        /// Candle CSV files, one per token. The token id is the file stem.
        #[arg(long, required = true, num_args = 1..)]
        candles: Vec<PathBuf>,

        /// Worker thread cap. Defaults to all cores.
        #[arg(long)]
        threads: Option<usize>,

        /// Run every job on one thread, in order.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Write a seeded synthetic candle CSV.
    Synth {
        /// Master seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Number of candles.
        #[arg(long, default_value_t = 1_000)]
        candles: usize,

        /// Output CSV path. The file stem doubles as the token id.
        #[arg(long)]
        output: PathBuf,
    },
}

/// JSON printed by `simulate`.
#[derive(Serialize)]
struct SimulateOutput<'a> {
    strategy: Option<&'a str>,
    token: &'a str,
    plan_hash: PlanHash,
    digest: OutputDigest,
    events: &'a [Event],
    summary: Option<&'a TradeSummary>,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Validate { strategy } => run_validate(&strategy),
        Commands::Simulate {
            strategy,
            candles,
            output,
        } => run_simulate(&strategy, &candles, output.as_deref()).map(|()| true),
        Commands::Sweep {
            strategy,
            grid,
            candles,
            threads,
            sequential,
        } => run_sweep_cmd(
            &strategy,
            &grid,
            &candles,
            SweepOptions {
                threads,
                sequential,
            },
        )
        .map(|()| true),
        Commands::Synth {
            seed,
            candles,
            output,
        } => run_synth(seed, candles, &output).map(|()| true),
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns `Ok(false)` when the strategy is rejected.
fn run_validate(strategy_path: &Path) -> Result<bool> {
    let config = load_strategy(strategy_path)?;
    match compile(&config) {
        Ok(plan) => {
            info!(plan_hash = %plan_hash(&plan), "strategy accepted");
            print_json(&plan)?;
            Ok(true)
        }
        Err(rejected) => {
            eprintln!("{rejected}");
            print_json(&rejected.reasons)?;
            Ok(false)
        }
    }
}

fn compile_file(strategy_path: &Path) -> Result<StrategyPlan> {
    let config = load_strategy(strategy_path)?;
    compile(&config).with_context(|| format!("compiling {}", strategy_path.display()))
}

fn run_simulate(strategy_path: &Path, candles_path: &Path, output: Option<&Path>) -> Result<()> {
    let plan = compile_file(strategy_path)?;
    let token = load_token(candles_path)?;
    let result = run(&token.candles, &plan)
        .with_context(|| format!("simulating {}", candles_path.display()))?;

    match &result.summary {
        Some(s) => info!(
            token = %token.token,
            exit_reason = %s.exit_reason,
            pnl_pct = s.realized_pnl_pct,
            held_minutes = s.holding_time().num_minutes(),
            "trade closed"
        ),
        None => info!(token = %token.token, "no entry"),
    }

    let out = SimulateOutput {
        strategy: plan.name(),
        token: &token.token,
        plan_hash: plan_hash(&plan),
        digest: result.digest(),
        events: &result.events,
        summary: result.summary.as_ref(),
    };
    let json = serde_json::to_string_pretty(&out)?;
    println!("{json}");

    if let Some(path) = output {
        std::fs::write(path, &json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "result saved");
    }
    Ok(())
}

fn run_sweep_cmd(
    strategy_path: &Path,
    grid_path: &Path,
    candle_paths: &[PathBuf],
    options: SweepOptions,
) -> Result<()> {
    let base = load_strategy(strategy_path)?;
    let grid = load_grid(grid_path)?;
    let tokens = load_tokens(candle_paths)?;

    let report = run_sweep(&base, &grid, &tokens, options, None)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for outcome in &report.outcomes {
        serde_json::to_writer(&mut out, outcome)?;
        writeln!(out)?;
    }
    for rejected in &report.rejected {
        eprintln!(
            "rejected {}: {}",
            rejected.variant,
            rejected
                .reasons
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        );
    }
    Ok(())
}

fn run_synth(seed: u64, n: usize, output: &Path) -> Result<()> {
    let token = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "SYNTH".to_string());
    let series = synthetic_candles(seed, &token, n);
    save_candles(output, &series.candles)?;
    info!(token = %token, candles = n, path = %output.display(), "synthetic candles written");
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
