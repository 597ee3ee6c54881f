//! Quantlab CLI — run backtests, trend reports, and watchlist plans.
//!
//! Commands:
//! - `backtest` — run a strategy over CSV bars per a TOML run config
//! - `compare` — run several strategies over the same data in parallel
//! - `trend` — evaluate one symbol's history and print the trend report
//! - `momentum` — build the watchlist momentum plan
//!
//! This binary stands in for the platform's HTTP/cron surface: it loads
//! in-memory structures, calls the core, and prints JSON.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use quantlab_core::alerts::{compute_watchlist_momentum_plan, WatchlistEntry};
use quantlab_core::data::{InMemoryProvider, MarketData};
use quantlab_core::domain::{Bar, BarSeries, ScoreConfig, TrendDecision};
use quantlab_core::engine::{run_backtest, BacktestParams, BacktestResult};
use quantlab_core::filters::{DailyRuleFilter, StockListing, UniverseCriteria, UniverseFilter};
use quantlab_core::regime::{RegimeClassifier, RegimeConfig};
use quantlab_core::strategy::{StrategyConfig, StrategyContext, StrategyRegistry};
use quantlab_core::trend::{evaluate_trend, TrendConfig, TrendInput};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quantlab", about = "Quantlab CLI — backtests and trend reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest from CSV bars and a TOML run config.
    Backtest {
        /// CSV file with columns: symbol,date,open,high,low,close,volume,amount.
        #[arg(long)]
        bars: PathBuf,

        /// TOML run config (dates, cash, strategy, filters, regime indexes).
        #[arg(long)]
        config: PathBuf,

        /// Optional TOML listing table for universe criteria.
        #[arg(long)]
        listings: Option<PathBuf>,

        /// Write the full result JSON here (summary always prints).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Run several strategies over the same data and compare summaries.
    Compare {
        #[arg(long)]
        bars: PathBuf,

        #[arg(long)]
        config: PathBuf,

        /// Strategy names, comma-separated (defaults to every registered one).
        #[arg(long)]
        strategies: Option<String>,
    },
    /// Evaluate one symbol's trend and print the report JSON.
    Trend {
        #[arg(long)]
        bars: PathBuf,

        #[arg(long)]
        symbol: String,

        /// Regime reference index symbols present in the bars file.
        #[arg(long, value_delimiter = ',')]
        index_symbols: Vec<String>,

        /// Print only the distilled decision instead of the full report.
        #[arg(long, default_value_t = false)]
        decision: bool,
    },
    /// Build the watchlist momentum plan.
    Momentum {
        #[arg(long)]
        bars: PathBuf,

        /// TOML watchlist: [[entries]] symbol = "...", position_pct = 0.1.
        #[arg(long)]
        watchlist: PathBuf,

        #[arg(long, value_delimiter = ',')]
        index_symbols: Vec<String>,
    },
}

// ── Config files ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RunConfig {
    start: NaiveDate,
    end: NaiveDate,
    initial_cash: Decimal,
    #[serde(default)]
    fee_rate: Decimal,
    #[serde(default)]
    slippage_rate: Decimal,
    #[serde(default = "default_warmup_days")]
    warmup_days: u32,
    strategy: StrategyConfig,
    #[serde(default)]
    universe: UniverseCriteria,
    #[serde(default)]
    rules: DailyRuleFilter,
    #[serde(default)]
    score: ScoreConfig,
    #[serde(default)]
    regime: RegimeSection,
}

fn default_warmup_days() -> u32 {
    20
}

#[derive(Debug, Default, Deserialize)]
struct RegimeSection {
    #[serde(default)]
    index_symbols: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListingsFile {
    listings: Vec<StockListing>,
}

#[derive(Debug, Deserialize)]
struct WatchlistFile {
    entries: Vec<WatchlistEntry>,
}

#[derive(Debug, Deserialize)]
struct BarRow {
    symbol: String,
    date: NaiveDate,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
    #[serde(default)]
    amount: Decimal,
}

// ── Loaders ──────────────────────────────────────────────────────────

fn load_bar_series(path: &Path) -> Result<Vec<BarSeries>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open bars file {}", path.display()))?;
    let mut rows: Vec<BarRow> = Vec::new();
    for record in reader.deserialize() {
        rows.push(record.context("parse bar row")?);
    }
    if rows.is_empty() {
        bail!("no bar rows in {}", path.display());
    }
    rows.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));

    let mut grouped: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
    for row in rows {
        let amount = if row.amount > Decimal::ZERO {
            row.amount
        } else {
            row.close * row.volume
        };
        grouped.entry(row.symbol.clone()).or_default().push(Bar::from_ohlcv(
            row.symbol,
            row.date,
            row.open,
            row.high,
            row.low,
            row.close,
            row.volume,
            amount,
        ));
    }
    grouped
        .into_iter()
        .map(|(symbol, bars)| {
            BarSeries::from_bars(symbol.clone(), bars)
                .with_context(|| format!("invalid bar series for {symbol}"))
        })
        .collect()
}

fn load_toml<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read {what} {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parse {what} {}", path.display()))
}

fn build_classifier(series: &[BarSeries], index_symbols: &[String]) -> RegimeClassifier {
    let indexes: Vec<(String, BarSeries)> = series
        .iter()
        .filter(|s| index_symbols.contains(&s.symbol().to_string()))
        .map(|s| (s.symbol().to_string(), s.clone()))
        .collect();
    RegimeClassifier::new(indexes, RegimeConfig::default())
}

fn build_universe(
    series: &[BarSeries],
    index_symbols: &[String],
    listings: Option<ListingsFile>,
    criteria: UniverseCriteria,
) -> UniverseFilter {
    match listings {
        Some(file) => UniverseFilter::new(file.listings, criteria),
        None => {
            // No listing table: every non-index symbol in the data is tradable.
            let symbols: Vec<String> = series
                .iter()
                .map(|s| s.symbol().to_string())
                .filter(|s| !index_symbols.contains(s))
                .collect();
            UniverseFilter::from_symbols(symbols)
        }
    }
}

fn run_one(
    data: &MarketData,
    config: &RunConfig,
    strategy_config: &StrategyConfig,
    universe: &UniverseFilter,
    ctx: &StrategyContext,
    registry: &StrategyRegistry,
) -> Result<BacktestResult> {
    let params = BacktestParams::new(config.start, config.end, config.initial_cash)?
        .with_costs(config.fee_rate, config.slippage_rate)?
        .with_warmup(config.warmup_days);
    let mut strategy = registry.create(strategy_config, ctx)?;
    let result = run_backtest(
        data,
        &params,
        strategy.as_mut(),
        universe,
        &config.rules,
        &config.score,
    )?;
    Ok(result)
}

fn print_summary(name: &str, result: &BacktestResult) {
    println!(
        "{name}: return {:+.2}%  max drawdown {:.2}%  trades {}  rejections {}  final equity {}",
        result.summary.total_return * 100.0,
        result.summary.max_drawdown * 100.0,
        result.summary.total_trades,
        result.summary.total_rejections,
        result.summary.final_equity,
    );
}

// ── Entry point ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match Cli::parse().command {
        Commands::Backtest {
            bars,
            config,
            listings,
            output,
        } => {
            let series = load_bar_series(&bars)?;
            let config: RunConfig = load_toml(&config, "run config")?;
            let listings = match listings {
                Some(path) => Some(load_toml::<ListingsFile>(&path, "listings")?),
                None => None,
            };
            let classifier = build_classifier(&series, &config.regime.index_symbols);
            let universe = build_universe(
                &series,
                &config.regime.index_symbols,
                listings,
                config.universe.clone(),
            );
            let data = MarketData::from_series(series);
            let ctx = StrategyContext {
                regime: Arc::new(classifier),
            };
            let registry = StrategyRegistry::builtin();
            let result = run_one(&data, &config, &config.strategy, &universe, &ctx, &registry)?;
            print_summary(&config.strategy.name, &result);
            println!("fingerprint: {}", result.fingerprint);
            if let Some(path) = output {
                fs::write(&path, serde_json::to_string_pretty(&result)?)
                    .with_context(|| format!("write result to {}", path.display()))?;
                println!("result written to {}", path.display());
            }
        }
        Commands::Compare {
            bars,
            config,
            strategies,
        } => {
            let series = load_bar_series(&bars)?;
            let config: RunConfig = load_toml(&config, "run config")?;
            let classifier = build_classifier(&series, &config.regime.index_symbols);
            let universe = build_universe(
                &series,
                &config.regime.index_symbols,
                None,
                config.universe.clone(),
            );
            let data = MarketData::from_series(series);
            let ctx = StrategyContext {
                regime: Arc::new(classifier),
            };
            let registry = StrategyRegistry::builtin();
            let names: Vec<String> = match strategies {
                Some(list) => list.split(',').map(|s| s.trim().to_string()).collect(),
                None => registry.names().iter().map(|s| s.to_string()).collect(),
            };

            // Independent runs, each with a private portfolio — no shared
            // mutable state, so they can fan out across threads.
            let results: Vec<(String, Result<BacktestResult>)> = names
                .par_iter()
                .map(|name| {
                    let strategy_config = StrategyConfig {
                        name: name.clone(),
                        params: config.strategy.params.clone(),
                    };
                    let result =
                        run_one(&data, &config, &strategy_config, &universe, &ctx, &registry);
                    (name.clone(), result)
                })
                .collect();
            for (name, result) in results {
                match result {
                    Ok(result) => print_summary(&name, &result),
                    Err(err) => println!("{name}: failed ({err})"),
                }
            }
        }
        Commands::Trend {
            bars,
            symbol,
            index_symbols,
            decision,
        } => {
            let series = load_bar_series(&bars)?;
            let classifier = build_classifier(&series, &index_symbols);
            let Some(target) = series.iter().find(|s| s.symbol() == symbol) else {
                bail!("symbol {symbol} not present in {}", bars.display());
            };
            let regime = classifier.classify(target.last().map(|b| b.trade_date));
            let report = evaluate_trend(
                &TrendInput {
                    series: target,
                    name: None,
                    industry: None,
                    flow: None,
                    regime: regime.regime,
                },
                &TrendConfig::default(),
            );
            if decision {
                println!("{}", serde_json::to_string_pretty(&TrendDecision::from(&report))?);
            } else {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Commands::Momentum {
            bars,
            watchlist,
            index_symbols,
        } => {
            let series = load_bar_series(&bars)?;
            let watchlist: WatchlistFile = load_toml(&watchlist, "watchlist")?;
            let classifier = build_classifier(&series, &index_symbols);
            let provider = InMemoryProvider::from_series(series);
            let plan =
                compute_watchlist_momentum_plan(&watchlist.entries, &provider, &classifier);
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
    }
    Ok(())
}
