//! Parameter sweeps: many strategy variants over many tokens.
//!
//! A [`ParamGrid`] expands a base strategy into variants. Each variant is
//! compiled exactly once; rejected variants are reported and never run.
//! Jobs are the cross product of compiled plans and token candle sets, in
//! plan-major order, and results come back in that order whatever the
//! thread count. Workers share only `&[Candle]` and `&StrategyPlan`.
//!
//! Cancellation is cooperative: a shared flag is checked before each job
//! starts and passed into each run, which checks it between candles.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{info, warn};

use calllab_core::domain::{DataIntegrityError, TradeSummary};
use calllab_core::fingerprint::{plan_hash, OutputDigest, PlanHash};
use calllab_core::plan::{compile, RejectionReason, StrategyConfig, StrategyPlan};
use calllab_core::{run_with_cancel, SimulationError};

use crate::config::ParamGrid;
use crate::data_loader::TokenCandles;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("no token candle sets to sweep over")]
    NoTokens,

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// How jobs are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOptions {
    /// Worker thread cap; `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// Run every job on the calling thread, in order.
    pub sequential: bool,
}

/// One expanded grid point, before compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub label: String,
    pub config: StrategyConfig,
}

/// A variant that failed to compile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedVariant {
    pub variant: String,
    pub reasons: Vec<RejectionReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Completed {
        summary: Option<TradeSummary>,
        event_count: usize,
        digest: OutputDigest,
    },
    DataError {
        error: DataIntegrityError,
    },
}

/// Result of one (variant, token) job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOutcome {
    pub job: usize,
    pub token: String,
    pub variant: String,
    pub plan_hash: PlanHash,
    #[serde(flatten)]
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    /// Finished jobs in job order. Jobs skipped by cancellation are absent.
    pub outcomes: Vec<SweepOutcome>,
    pub rejected: Vec<RejectedVariant>,
    pub total_jobs: usize,
    pub cancelled: bool,
}

/// Expand `base` over every axis of `grid`, in a fixed order.
pub fn expand_grid(base: &StrategyConfig, grid: &ParamGrid) -> Vec<Variant> {
    fn axis<T: Clone>(values: &[T]) -> Vec<Option<T>> {
        if values.is_empty() {
            vec![None]
        } else {
            values.iter().cloned().map(Some).collect()
        }
    }

    let mut variants = Vec::with_capacity(grid.size());
    for stop in axis(&grid.stop_loss_pct) {
        for trailing in axis(&grid.trailing) {
            for max_candles in axis(&grid.max_candles_in_trade) {
                for (ladder_idx, ladder) in axis(&grid.ladders).into_iter().enumerate() {
                    let mut config = base.clone();
                    let mut parts = Vec::new();
                    if let Some(pct) = stop {
                        config.exits.stop_loss_pct = Some(pct);
                        parts.push(format!("stop={pct}"));
                    }
                    if let Some(t) = trailing {
                        config.exits.trailing = Some(t);
                        parts.push(format!("trail={}/{}", t.trail_pct, t.activate_profit_pct));
                    }
                    if let Some(n) = max_candles {
                        config.exits.max_candles_in_trade = Some(n);
                        parts.push(format!("time={n}"));
                    }
                    if let Some(targets) = ladder {
                        config.exits.targets = targets;
                        parts.push(format!("ladder={ladder_idx}"));
                    }
                    let label = if parts.is_empty() {
                        "base".to_string()
                    } else {
                        parts.join(",")
                    };
                    variants.push(Variant { label, config });
                }
            }
        }
    }
    variants
}

/// Compile every variant once. Returns the runnable plans and the rejects.
pub fn compile_variants(
    variants: Vec<Variant>,
) -> (Vec<(String, StrategyPlan)>, Vec<RejectedVariant>) {
    let mut plans = Vec::new();
    let mut rejected = Vec::new();
    for Variant { label, config } in variants {
        match compile(&config) {
            Ok(plan) => plans.push((label, plan)),
            Err(err) => {
                warn!(variant = %label, %err, "variant rejected");
                rejected.push(RejectedVariant {
                    variant: label,
                    reasons: err.reasons,
                });
            }
        }
    }
    (plans, rejected)
}

struct Job<'a> {
    index: usize,
    variant: &'a str,
    plan: &'a StrategyPlan,
    hash: &'a PlanHash,
    token: &'a TokenCandles,
}

fn run_job(job: &Job<'_>, cancel: Option<&AtomicBool>) -> Option<SweepOutcome> {
    if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
        return None;
    }
    let status = match run_with_cancel(&job.token.candles, job.plan, cancel) {
        Ok(result) => JobStatus::Completed {
            event_count: result.events.len(),
            digest: result.digest(),
            summary: result.summary,
        },
        Err(SimulationError::DataIntegrity(error)) => {
            warn!(token = %job.token.token, %error, "data integrity failure");
            JobStatus::DataError { error }
        }
        Err(SimulationError::Cancelled { .. }) => return None,
    };
    Some(SweepOutcome {
        job: job.index,
        token: job.token.token.clone(),
        variant: job.variant.to_string(),
        plan_hash: job.hash.clone(),
        status,
    })
}

/// Run every (variant, token) job of the grid.
pub fn run_sweep(
    base: &StrategyConfig,
    grid: &ParamGrid,
    tokens: &[TokenCandles],
    options: SweepOptions,
    cancel: Option<&AtomicBool>,
) -> Result<SweepReport, SweepError> {
    if tokens.is_empty() {
        return Err(SweepError::NoTokens);
    }

    let (plans, rejected) = compile_variants(expand_grid(base, grid));
    let hashes: Vec<PlanHash> = plans.iter().map(|(_, plan)| plan_hash(plan)).collect();

    let jobs: Vec<Job<'_>> = plans
        .iter()
        .zip(&hashes)
        .flat_map(|((label, plan), hash)| {
            tokens.iter().map(move |token| (label, plan, hash, token))
        })
        .enumerate()
        .map(|(index, (label, plan, hash, token))| Job {
            index,
            variant: label,
            plan,
            hash,
            token,
        })
        .collect();
    let total_jobs = jobs.len();

    info!(
        variants = plans.len(),
        rejected = rejected.len(),
        tokens = tokens.len(),
        jobs = total_jobs,
        "sweep started"
    );

    let results: Vec<Option<SweepOutcome>> = if options.sequential {
        jobs.iter().map(|job| run_job(job, cancel)).collect()
    } else if let Some(threads) = options.threads {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .build()?;
        pool.install(|| jobs.par_iter().map(|job| run_job(job, cancel)).collect())
    } else {
        jobs.par_iter().map(|job| run_job(job, cancel)).collect()
    };

    let (outcomes, cancelled) = gather(results);
    if cancelled {
        warn!(completed = outcomes.len(), total = total_jobs, "sweep cancelled");
    } else {
        info!(completed = outcomes.len(), "sweep finished");
    }

    Ok(SweepReport {
        outcomes,
        rejected,
        total_jobs,
        cancelled,
    })
}

/// Flatten per-job results. Only cancellation skips a job, so the sweep
/// counts as cancelled exactly when some job produced no outcome; a flag
/// raised after the last job finished does not.
fn gather(results: Vec<Option<SweepOutcome>>) -> (Vec<SweepOutcome>, bool) {
    let total = results.len();
    let outcomes: Vec<SweepOutcome> = results.into_iter().flatten().collect();
    let cancelled = outcomes.len() < total;
    (outcomes, cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calllab_core::plan::{ExitConfig, TargetConfig, TrailingConfig};

    fn base() -> StrategyConfig {
        StrategyConfig {
            exits: ExitConfig {
                stop_loss_pct: Some(30.0),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn empty_grid_is_the_base_strategy() {
        let variants = expand_grid(&base(), &ParamGrid::default());
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].label, "base");
        assert_eq!(variants[0].config, base());
    }

    #[test]
    fn expansion_order_and_labels() {
        let grid = ParamGrid {
            stop_loss_pct: vec![10.0, 20.0],
            max_candles_in_trade: vec![12, 24],
            ..Default::default()
        };
        let labels: Vec<String> = expand_grid(&base(), &grid)
            .into_iter()
            .map(|v| v.label)
            .collect();
        assert_eq!(
            labels,
            vec![
                "stop=10,time=12",
                "stop=10,time=24",
                "stop=20,time=12",
                "stop=20,time=24",
            ]
        );
    }

    #[test]
    fn axes_override_base_values() {
        let grid = ParamGrid {
            trailing: vec![TrailingConfig {
                trail_pct: 10.0,
                activate_profit_pct: 25.0,
                breakeven_after_first_target: false,
            }],
            ladders: vec![vec![TargetConfig {
                size_pct: 100.0,
                profit_pct: 200.0,
            }]],
            ..Default::default()
        };
        let variants = expand_grid(&base(), &grid);
        assert_eq!(variants.len(), 1);
        let exits = &variants[0].config.exits;
        assert_eq!(exits.stop_loss_pct, Some(30.0));
        assert_eq!(exits.trailing.unwrap().trail_pct, 10.0);
        assert_eq!(exits.targets[0].profit_pct, 200.0);
        assert_eq!(variants[0].label, "trail=10/25,ladder=0");
    }

    #[test]
    fn rejected_variants_are_reported_not_run() {
        let grid = ParamGrid {
            stop_loss_pct: vec![20.0, -5.0],
            ..Default::default()
        };
        let (plans, rejected) = compile_variants(expand_grid(&base(), &grid));
        assert_eq!(plans.len(), 1);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].variant, "stop=-5");
    }

    #[test]
    fn no_tokens_is_an_error() {
        let err = run_sweep(&base(), &ParamGrid::default(), &[], SweepOptions::default(), None)
            .unwrap_err();
        assert!(matches!(err, SweepError::NoTokens));
    }

    fn outcome(job: usize) -> SweepOutcome {
        SweepOutcome {
            job,
            token: "WIF".into(),
            variant: "base".into(),
            plan_hash: PlanHash("h".into()),
            status: JobStatus::Completed {
                summary: None,
                event_count: 0,
                digest: OutputDigest("d".into()),
            },
        }
    }

    #[test]
    fn all_jobs_finished_is_not_cancelled() {
        let (outcomes, cancelled) = gather(vec![Some(outcome(0)), Some(outcome(1))]);
        assert_eq!(outcomes.len(), 2);
        assert!(!cancelled);
    }

    #[test]
    fn skipped_job_marks_sweep_cancelled() {
        let (outcomes, cancelled) = gather(vec![Some(outcome(0)), None]);
        assert_eq!(outcomes, vec![outcome(0)]);
        assert!(cancelled);
    }

    #[test]
    fn flag_raised_after_sweep_leaves_report_complete() {
        let cancel = AtomicBool::new(false);
        let tokens = [crate::data_loader::synthetic_candles(3, "WIF", 50)];
        let report = run_sweep(
            &base(),
            &ParamGrid::default(),
            &tokens,
            SweepOptions::default(),
            Some(&cancel),
        )
        .unwrap();
        cancel.store(true, Ordering::Relaxed);
        assert!(!report.cancelled);
        assert_eq!(report.outcomes.len(), report.total_jobs);
    }
}
