//! CLI definition and dispatch.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::adapters::csv_adapter::CsvDataAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::error::FoliosimError;
use crate::domain::metrics::Summary;
use crate::domain::orchestrator::{self, BacktestReport};
use crate::domain::prices::{AssetId, PricePoint, PriceTable};
use crate::domain::schedule::Schedule;
use crate::domain::selector::Selector;
use crate::domain::strategy::{BacktestSettings, StrategyConfig};
use crate::domain::weighting::{Weighting, DEFAULT_FAST_WINDOW, DEFAULT_SLOW_SPAN};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{MarketCapPort, PriceSeriesPort};
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "foliosim", about = "Deterministic portfolio backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every configured strategy and write the equity report
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        quiet: bool,
    },
    /// Validate a configuration without touching price data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List assets available in a data directory
    ListAssets {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long, default_value = "1d")]
        interval: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            output,
            quiet,
        } => run_pipeline(&config, output.as_ref(), quiet),
        Command::Validate { config } => run_validate(&config),
        Command::ListAssets { data, interval } => run_list_assets(&data, &interval),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

/// The `[data]` section: where price files live and how much history to load.
#[derive(Debug)]
pub struct DataSettings {
    pub path: PathBuf,
    pub interval: String,
    pub periods: usize,
    pub assets: Vec<AssetId>,
}

pub fn build_data_settings(adapter: &dyn ConfigPort) -> Result<DataSettings, FoliosimError> {
    let path = adapter
        .get_string("data", "path")
        .ok_or_else(|| FoliosimError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        })?;

    let periods = adapter.get_int("data", "periods", 365);
    if periods < 0 {
        return Err(FoliosimError::ConfigInvalid {
            section: "data".into(),
            key: "periods".into(),
            reason: "must not be negative".into(),
        });
    }

    let assets = adapter
        .get_list("data", "assets")
        .into_iter()
        .map(AssetId::from)
        .collect();

    Ok(DataSettings {
        path: PathBuf::from(path),
        interval: adapter
            .get_string("data", "interval")
            .unwrap_or_else(|| "1d".to_string()),
        periods: periods as usize,
        assets,
    })
}

pub fn build_settings(adapter: &dyn ConfigPort) -> Result<BacktestSettings, FoliosimError> {
    let baseline = adapter.get_double("backtest", "baseline", 100.0);
    if !baseline.is_finite() || baseline <= 0.0 {
        return Err(FoliosimError::ConfigInvalid {
            section: "backtest".into(),
            key: "baseline".into(),
            reason: "must be a positive number".into(),
        });
    }

    let risk_free_rate = adapter.get_double("backtest", "risk_free_rate", 0.0);
    if !risk_free_rate.is_finite() {
        return Err(FoliosimError::ConfigInvalid {
            section: "backtest".into(),
            key: "risk_free_rate".into(),
            reason: "must be a finite number".into(),
        });
    }

    Ok(BacktestSettings {
        baseline,
        risk_free_rate,
    })
}

/// A strategy parsed from config but not yet bound to loaded data. Market-cap
/// weighting stays symbolic until the capitalization table exists.
#[derive(Debug)]
pub struct StrategyDraft {
    pub name: String,
    pub schedule: Schedule,
    pub selector: Selector,
    pub weighting: WeightingDraft,
}

#[derive(Debug)]
pub enum WeightingDraft {
    Equal,
    MarketCap,
    InverseVolatility,
    MeanVariance { long_only: bool },
    MinimumVariance,
    SignalCrossover {
        reference: AssetId,
        fast: usize,
        slow: usize,
    },
}

impl WeightingDraft {
    fn config_name(&self) -> &'static str {
        match self {
            WeightingDraft::Equal => "equal",
            WeightingDraft::MarketCap => "market_cap",
            WeightingDraft::InverseVolatility => "inverse_volatility",
            WeightingDraft::MeanVariance { .. } => "mean_variance",
            WeightingDraft::MinimumVariance => "minimum_variance",
            WeightingDraft::SignalCrossover { .. } => "crossover",
        }
    }
}

/// Parse every `[strategy.<name>]` section.
///
/// Section iteration order is not stable in the INI parser, so sections are
/// sorted by name for a reproducible strategy order.
pub fn parse_strategies(adapter: &dyn ConfigPort) -> Result<Vec<StrategyDraft>, FoliosimError> {
    let mut sections: Vec<String> = adapter
        .sections()
        .into_iter()
        .filter(|s| s.starts_with("strategy."))
        .collect();
    sections.sort();

    let mut drafts = Vec::with_capacity(sections.len());
    for section in &sections {
        let name = section["strategy.".len()..].to_string();
        if name.is_empty() {
            return Err(FoliosimError::ConfigInvalid {
                section: section.clone(),
                key: "name".into(),
                reason: "strategy section needs a name after the dot".into(),
            });
        }

        let schedule_str = adapter
            .get_string(section, "schedule")
            .unwrap_or_else(|| "monthly".to_string());
        let schedule =
            Schedule::parse(&schedule_str).ok_or_else(|| FoliosimError::ConfigInvalid {
                section: section.clone(),
                key: "schedule".into(),
                reason: format!("unknown schedule '{}'", schedule_str),
            })?;

        let selector_str = adapter
            .get_string(section, "selector")
            .unwrap_or_else(|| "all".to_string());
        let selector = match selector_str.trim().to_ascii_lowercase().as_str() {
            "all" => Selector::All,
            "none" => Selector::None,
            "these" => {
                let names = adapter.get_list(section, "select");
                if names.is_empty() {
                    return Err(FoliosimError::ConfigInvalid {
                        section: section.clone(),
                        key: "select".into(),
                        reason: "selector 'these' needs a non-empty select list".into(),
                    });
                }
                Selector::These(names.into_iter().map(AssetId::from).collect())
            }
            other => {
                return Err(FoliosimError::ConfigInvalid {
                    section: section.clone(),
                    key: "selector".into(),
                    reason: format!("unknown selector '{}'", other),
                });
            }
        };

        let weighting_str = adapter
            .get_string(section, "weighting")
            .unwrap_or_else(|| "equal".to_string());
        // Hyphen and underscore spellings are both accepted.
        let weighting = match weighting_str.trim().to_ascii_lowercase().as_str() {
            "equal" => WeightingDraft::Equal,
            "market_cap" | "market-cap" => WeightingDraft::MarketCap,
            "inverse_volatility" | "inverse-volatility" => WeightingDraft::InverseVolatility,
            "mean_variance" | "mean-variance" => WeightingDraft::MeanVariance {
                long_only: adapter.get_bool(section, "long_only", false),
            },
            "minimum_variance" | "minimum-variance" => WeightingDraft::MinimumVariance,
            "crossover" | "signal-crossover" => {
                let reference = adapter.get_string(section, "reference").ok_or_else(|| {
                    FoliosimError::ConfigMissing {
                        section: section.clone(),
                        key: "reference".into(),
                    }
                })?;
                let fast = adapter.get_int(section, "fast", DEFAULT_FAST_WINDOW as i64);
                let slow = adapter.get_int(section, "slow", DEFAULT_SLOW_SPAN as i64);
                if fast < 1 || slow < 1 {
                    return Err(FoliosimError::ConfigInvalid {
                        section: section.clone(),
                        key: "fast".into(),
                        reason: "crossover windows must be at least 1".into(),
                    });
                }
                WeightingDraft::SignalCrossover {
                    reference: AssetId::from(reference),
                    fast: fast as usize,
                    slow: slow as usize,
                }
            }
            other => {
                return Err(FoliosimError::ConfigInvalid {
                    section: section.clone(),
                    key: "weighting".into(),
                    reason: format!("unknown weighting '{}'", other),
                });
            }
        };

        drafts.push(StrategyDraft {
            name,
            schedule,
            selector,
            weighting,
        });
    }

    if drafts.is_empty() {
        return Err(FoliosimError::NoStrategies);
    }
    Ok(drafts)
}

/// Pre-flight drafts against the configured asset roster, before any price
/// file is touched. A crossover reference outside the roster can never
/// resolve at run time, so `validate` rejects it here. An empty roster means
/// the assets are discovered from the data directory; nothing to check yet.
pub fn validate_drafts(
    drafts: &[StrategyDraft],
    assets: &[AssetId],
) -> Result<(), FoliosimError> {
    if assets.is_empty() {
        return Ok(());
    }
    for draft in drafts {
        if let WeightingDraft::SignalCrossover { reference, .. } = &draft.weighting {
            if !assets.contains(reference) {
                return Err(FoliosimError::UnknownAsset {
                    asset: reference.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Bind drafts to loaded data. `caps` must be present when any draft uses
/// market-cap weighting.
pub fn build_strategies(
    drafts: Vec<StrategyDraft>,
    caps: Option<&Arc<PriceTable>>,
) -> Result<Vec<StrategyConfig>, FoliosimError> {
    drafts
        .into_iter()
        .map(|draft| {
            let weighting = match draft.weighting {
                WeightingDraft::Equal => Weighting::Equal,
                WeightingDraft::MarketCap => {
                    let caps = caps.ok_or_else(|| FoliosimError::Data {
                        reason: "market-cap weighting requires a capitalization table".into(),
                    })?;
                    Weighting::MarketCap {
                        caps: Arc::clone(caps),
                    }
                }
                WeightingDraft::InverseVolatility => Weighting::InverseVolatility,
                WeightingDraft::MeanVariance { long_only } => {
                    Weighting::MeanVariance { long_only }
                }
                WeightingDraft::MinimumVariance => Weighting::MinimumVariance,
                WeightingDraft::SignalCrossover {
                    reference,
                    fast,
                    slow,
                } => Weighting::SignalCrossover {
                    reference,
                    fast,
                    slow,
                },
            };
            Ok(StrategyConfig {
                name: draft.name,
                schedule: draft.schedule,
                selector: draft.selector,
                weighting,
            })
        })
        .collect()
}

pub fn load_price_table(
    port: &dyn PriceSeriesPort,
    assets: &[AssetId],
    interval: &str,
    periods: usize,
) -> Result<PriceTable, FoliosimError> {
    let mut series: Vec<(AssetId, Vec<PricePoint>)> = Vec::with_capacity(assets.len());
    for asset in assets {
        series.push((asset.clone(), port.fetch_closes(asset, interval, periods)?));
    }
    PriceTable::from_series(series)
}

pub fn load_cap_table(
    port: &dyn MarketCapPort,
    assets: &[AssetId],
    interval: &str,
    periods: usize,
) -> Result<PriceTable, FoliosimError> {
    let mut series: Vec<(AssetId, Vec<PricePoint>)> = Vec::with_capacity(assets.len());
    for asset in assets {
        series.push((asset.clone(), port.fetch_caps(asset, interval, periods)?));
    }
    PriceTable::from_series(series)
}

fn run_pipeline(config_path: &PathBuf, output: Option<&PathBuf>, quiet: bool) -> ExitCode {
    // Stage 1: Load config
    if !quiet {
        eprintln!("Loading config from {}", config_path.display());
    }
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Parse settings and strategies
    let data_settings = match build_data_settings(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let settings = match build_settings(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let drafts = match parse_strategies(&adapter) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: Resolve the asset roster
    let data_port = CsvDataAdapter::new(data_settings.path.clone());
    let roster = if data_settings.assets.is_empty() {
        match data_port.list_assets(&data_settings.interval) {
            Ok(found) => found,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    } else {
        data_settings.assets.clone()
    };
    if roster.is_empty() {
        let e = FoliosimError::EmptyTable {
            reason: format!("no assets configured or found in {}", data_settings.path.display()),
        };
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 4: Load prices and build the table
    if !quiet {
        eprintln!(
            "Loading {} assets ({} interval, up to {} periods)",
            roster.len(),
            data_settings.interval,
            data_settings.periods,
        );
    }
    let table = match load_price_table(
        &data_port,
        &roster,
        &data_settings.interval,
        data_settings.periods,
    ) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let table = if adapter.get_bool("backtest", "rebase", true) {
        table.rebase(settings.baseline)
    } else {
        table
    };

    // Stage 5: Load capitalizations when some strategy weighs by market cap
    let needs_caps = drafts
        .iter()
        .any(|d| matches!(d.weighting, WeightingDraft::MarketCap));
    let caps = if needs_caps {
        match load_cap_table(
            &data_port,
            table.assets(),
            &data_settings.interval,
            data_settings.periods,
        ) {
            Ok(t) => Some(Arc::new(t)),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    } else {
        None
    };

    // Stage 6: Bind strategies and run
    let strategies = match build_strategies(drafts, caps.as_ref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if !quiet {
        eprintln!(
            "Running {} strategies over {} periods, {} assets",
            strategies.len(),
            table.periods().len(),
            table.assets().len(),
        );
    }
    let report = match orchestrator::run_backtest(&table, &strategies, &settings) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 7: Write the equity report
    let output = output
        .cloned()
        .unwrap_or_else(|| PathBuf::from("report.csv"));
    if let Err(e) = CsvReportAdapter::new().write(&report, &output) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if !quiet {
        eprintln!("Report written to: {}", output.display());
    }

    // Stage 8: Console summary. Quiet silences the stage progress above,
    // never the summaries or the per-slot warnings.
    print_summaries(&report, settings.risk_free_rate);
    for (name, err) in report.failed() {
        eprintln!("warning: strategy '{}' failed: {}", name, err);
    }

    // A run where nothing completed exits with the first failure's class.
    if report.completed().next().is_none() {
        if let Some((_, err)) = report.failed().next() {
            eprintln!("error: every strategy failed");
            return err.into();
        }
    }
    ExitCode::SUCCESS
}

fn print_summaries(report: &BacktestReport, risk_free_rate: f64) {
    for outcome in report.completed() {
        let summary = Summary::from_curve(&outcome.equity_curve, risk_free_rate);
        eprintln!("\n=== {} ===", outcome.name);
        eprintln!("Total Return:     {:.2}%", summary.total_return * 100.0);
        eprintln!("Annualized:       {:.2}%", summary.annualized_return * 100.0);
        eprintln!(
            "Volatility:       {:.2}%",
            summary.annualized_volatility * 100.0
        );
        eprintln!("Sharpe Ratio:     {:.2}", summary.sharpe_ratio);
        eprintln!("Sortino Ratio:    {:.2}", summary.sortino_ratio);
        eprintln!("Max Drawdown:     -{:.1}%", summary.max_drawdown * 100.0);
        eprintln!(
            "Drawdown Length:  {} periods",
            summary.max_drawdown_duration
        );
        eprintln!("Rebalances:       {}", outcome.rebalances.len());
        if !outcome.warnings.is_empty() {
            eprintln!("Warnings:");
            for warning in &outcome.warnings {
                eprintln!("  {}", warning);
            }
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let data_settings = match build_data_settings(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Err(e) = build_settings(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let drafts = match parse_strategies(&adapter) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Err(e) = validate_drafts(&drafts, &data_settings.assets) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!(
        "\nData: {} ({} interval, up to {} periods)",
        data_settings.path.display(),
        data_settings.interval,
        data_settings.periods,
    );
    eprintln!("Strategies:");
    for draft in &drafts {
        let selector = match &draft.selector {
            Selector::All => "all".to_string(),
            Selector::None => "none".to_string(),
            Selector::These(names) => format!("these({})", names.len()),
        };
        eprintln!(
            "  {}: {:?} schedule, {} selection, {} weighting",
            draft.name,
            draft.schedule,
            selector,
            draft.weighting.config_name(),
        );
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_list_assets(data: &PathBuf, interval: &str) -> ExitCode {
    let port = CsvDataAdapter::new(data.clone());
    let assets = match port.list_assets(interval) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if assets.is_empty() {
        eprintln!("No assets found in {}", data.display());
    } else {
        for asset in &assets {
            println!("{}", asset);
        }
        eprintln!("{} assets found", assets.len());
    }
    ExitCode::SUCCESS
}
