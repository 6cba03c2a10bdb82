//! Prop Scanner Entry Point.
//!
//! Subcommands:
//! 1. `stats`      : enriched per-prop statistics
//! 2. `plays`      : ranked value plays
//! 3. `compare`    : edges at one target bookmaker
//! 4. `bookmakers` : list bookmakers in a snapshot
//! 5. `watch`      : re-rank on an interval until Ctrl+C

mod config;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use common::Error;
use prop_strategy::odds::format_american;
use prop_strategy::{
    collect_bookmakers, EdgeFinder, EdgeScan, Snapshot, SnapshotCache, StatsAggregator,
    ValuePlay, ValuePlayRanker,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{load_config_from, ScannerConfig};

#[derive(Debug, Parser)]
#[command(
    name = "prop-scanner",
    about = "Player-prop EV scanner and cross-bookmaker edge finder"
)]
struct Cli {
    /// Config file (defaults to ./config.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// Output file; a timestamped name is used when omitted.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Write JSON to stdout instead of a file.
    #[arg(long)]
    stdout: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute enriched statistics for every prop.
    Stats {
        #[arg(long, short)]
        input: PathBuf,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Rank value plays.
    Plays {
        #[arg(long, short)]
        input: PathBuf,
        #[arg(long)]
        min_ev: Option<f64>,
        #[arg(long)]
        max_ev: Option<f64>,
        #[arg(long)]
        min_bookmakers: Option<usize>,
        #[arg(long)]
        top_n: Option<usize>,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Find edges at one bookmaker against the rest of the market.
    Compare {
        #[arg(long, short)]
        input: PathBuf,
        #[arg(long, short)]
        bookmaker: Option<String>,
        #[arg(long)]
        min_edge: Option<f64>,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// List every bookmaker quoted in a snapshot.
    Bookmakers {
        #[arg(long, short)]
        input: PathBuf,
    },
    /// Re-rank a snapshot file on an interval until Ctrl+C.
    Watch {
        #[arg(long, short)]
        input: PathBuf,
        #[arg(long)]
        interval_secs: Option<u64>,
        #[arg(long, default_value_t = 10)]
        show: usize,
    },
}

// ── Output ────────────────────────────────────────────────────────────

fn timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn stats_output_name(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "props".to_string());
    input.with_file_name(format!("{}_enhanced_stats.json", stem))
}

fn write_json<T: Serialize>(items: &[T], out: &OutputArgs, default_name: PathBuf) -> Result<()> {
    let body = serde_json::to_string_pretty(items).context("serializing output")?;
    if out.stdout {
        println!("{}", body);
        return Ok(());
    }
    let path = out.output.clone().unwrap_or(default_name);
    std::fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
    info!("Wrote {} rows to {}", items.len(), path.display());
    Ok(())
}

fn load_snapshot(input: &Path) -> Result<Snapshot> {
    Snapshot::from_path(input).with_context(|| format!("loading snapshot {}", input.display()))
}

fn print_plays(plays: &[ValuePlay], limit: usize) {
    for (i, p) in plays.iter().take(limit).enumerate() {
        println!(
            "{:>3}. {:<24} {:<12} {:<5} fair {:>5} book {:>5} @ {:>5}  EV {:>6.2}%  score {:>6.2}{}",
            i + 1,
            p.player,
            p.prop_type,
            p.direction,
            p.fair_line.map(|l| l.to_string()).unwrap_or_else(|| "-".into()),
            p.book_line.map(|l| l.to_string()).unwrap_or_else(|| "-".into()),
            format_american(p.price),
            p.ev,
            p.score,
            if p.direction_corrected { "  (corrected)" } else { "" }
        );
    }
}

fn print_edge_summary(target: &str, scan: &EdgeScan) {
    let summary = scan.summary();
    println!("Edges at {}: {}", target, summary.total);
    println!(
        "  processed {}  valid {}  outliers {}",
        scan.processed, scan.valid, scan.outliers
    );
    println!(
        "  same line {}  line shopping {}  over {}  under {}",
        summary.same_line, summary.line_shopping, summary.over, summary.under
    );
    if let (Some(avg), Some(min), Some(max)) =
        (summary.average_edge, summary.min_edge, summary.max_edge)
    {
        println!("  edge avg {:.2}%  min {:.2}%  max {:.2}%", avg, min, max);
    }
    for r in scan.records.iter().take(10) {
        println!(
            "  {:<24} {:<12} {:<5} {} @ {} vs {} @ {}  edge {:.2}%  EV {:.2}%  {}",
            r.player,
            r.prop_type,
            r.direction,
            r.target_line,
            format_american(r.target_odds),
            r.compared_line,
            format_american(r.compared_odds),
            r.edge,
            r.ev_percentage,
            r.recommendation
        );
    }
}

// ── Commands ──────────────────────────────────────────────────────────

fn run_stats(cfg: &ScannerConfig, input: &Path, out: &OutputArgs) -> Result<()> {
    let snapshot = load_snapshot(input)?;
    let aggregator = StatsAggregator::new(cfg.adjuster.clone(), cfg.sanity.clone());
    let report = aggregator.aggregate(&snapshot.rows);
    info!(
        "Computed {} prop stats ({} one-sided pairs skipped, {} warnings)",
        report.stats.len(),
        report.skipped,
        report.warnings.len()
    );
    write_json(&report.stats, out, stats_output_name(input))
}

fn run_plays(cfg: &ScannerConfig, input: &Path, out: &OutputArgs) -> Result<()> {
    let snapshot = load_snapshot(input)?;
    let aggregator = StatsAggregator::new(cfg.adjuster.clone(), cfg.sanity.clone());
    let ranker = ValuePlayRanker::new(cfg.ranker.clone())?;

    let report = aggregator.aggregate(&snapshot.rows);
    let ranking = ranker.rank(&report.stats);
    if !out.stdout {
        print_plays(&ranking.plays, 20);
    }
    write_json(
        &ranking.plays,
        out,
        PathBuf::from(format!("best_props_{}.json", timestamp())),
    )
}

fn run_compare(cfg: &ScannerConfig, input: &Path, target: &str, out: &OutputArgs) -> Result<()> {
    let snapshot = load_snapshot(input)?;
    let finder = EdgeFinder::new(cfg.edge.clone(), cfg.sanity.clone())?;

    let scan = match finder.scan(&snapshot.rows, target) {
        Ok(scan) => scan,
        Err(Error::BookmakerNotFound(book)) => {
            let available = collect_bookmakers(&snapshot.rows);
            bail!(
                "Bookmaker '{}' not found. Available: {}",
                book,
                available.join(", ")
            );
        }
        Err(e) => return Err(e.into()),
    };

    if !out.stdout {
        print_edge_summary(target, &scan);
    }
    write_json(
        &scan.records,
        out,
        PathBuf::from(format!("{}_value_plays_{}.json", target, timestamp())),
    )
}

async fn run_watch(cfg: &ScannerConfig, input: PathBuf, show: usize) -> Result<()> {
    let aggregator = StatsAggregator::new(cfg.adjuster.clone(), cfg.sanity.clone());
    let ranker = ValuePlayRanker::new(cfg.ranker.clone())?;
    let mut cache = SnapshotCache::new(cfg.timing.snapshot_max_age_secs);
    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.timing.refresh_interval_secs));

    info!(
        "Watching {} every {}s. Press Ctrl+C to stop.",
        input.display(),
        cfg.timing.refresh_interval_secs
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                let snapshot = match cache.get_or_refresh(|| Snapshot::from_path(&input)) {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        warn!("No snapshot available: {}", e);
                        continue;
                    }
                };
                let report = aggregator.aggregate(&snapshot.rows);
                let ranking = ranker.rank(&report.stats);
                println!(
                    "── {} ── {} plays from {} props",
                    Utc::now().format("%H:%M:%S"),
                    ranking.plays.len(),
                    report.stats.len()
                );
                print_plays(&ranking.plays, show);
            }
        }
    }

    info!("Snapshot reloaded {} times", cache.refreshes());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prop_scanner=info,prop_strategy=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = load_config_from(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Command::Stats { input, out } => run_stats(&cfg, &input, &out),
        Command::Plays {
            input,
            min_ev,
            max_ev,
            min_bookmakers,
            top_n,
            out,
        } => {
            // CLI flags win over config.
            if let Some(v) = min_ev {
                cfg.ranker.min_ev = v;
            }
            if let Some(v) = max_ev {
                cfg.ranker.max_ev = v;
            }
            if let Some(v) = min_bookmakers {
                cfg.ranker.min_bookmakers = v;
            }
            if let Some(v) = top_n {
                cfg.ranker.top_n = v;
            }
            run_plays(&cfg, &input, &out)
        }
        Command::Compare {
            input,
            bookmaker,
            min_edge,
            out,
        } => {
            if let Some(v) = min_edge {
                cfg.edge.min_edge = v;
            }
            let Some(target) = bookmaker.or_else(|| cfg.target_bookmaker.clone()) else {
                bail!("No target bookmaker: pass --bookmaker or set PROP_TARGET_BOOKMAKER");
            };
            run_compare(&cfg, &input, &target, &out)
        }
        Command::Bookmakers { input } => {
            let snapshot = load_snapshot(&input)?;
            for book in collect_bookmakers(&snapshot.rows) {
                println!("{}", book);
            }
            Ok(())
        }
        Command::Watch {
            input,
            interval_secs,
            show,
        } => {
            if let Some(v) = interval_secs {
                if v == 0 {
                    bail!("--interval-secs must be > 0");
                }
                cfg.timing.refresh_interval_secs = v;
            }
            run_watch(&cfg, input, show).await
        }
    }
}
