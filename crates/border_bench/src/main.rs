use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use border_core::{rng::split_seed, RunRecord};
use clap::{Parser, ValueEnum};
use rayon::prelude::*;

mod runner;
mod scenario;
mod summary;

/// Monte-Carlo simulator for border-inspection release programs (spec §1).
#[derive(Parser)]
#[command(name = "border-sim", about = "Border-inspection Monte-Carlo simulator")]
struct Cli {
    /// Number of independent simulations to run per scenario variant.
    #[arg(long, default_value_t = 1)]
    num_simulations: u64,

    /// Number of consignments processed within each simulation.
    #[arg(long)]
    num_consignments: u64,

    /// Scenario configuration: a JSON/YAML file, or a `.csv` scenario table.
    #[arg(long)]
    config_file: PathBuf,

    /// Where to write F280 output lines (and pretty-printed consignments,
    /// when `--pretty` is set). Defaults to stdout when omitted.
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Master seed. Each (scenario, simulation) pair derives its own child
    /// seed from this via `split_seed`, so runs are reproducible.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Render each consignment with the glyph pretty-printer alongside the
    /// F280 line.
    #[arg(long, value_enum)]
    pretty: Option<PrettyModeArg>,

    /// Emit one NDJSON line per consignment record, in addition to the
    /// aggregated summary.
    #[arg(long)]
    detailed: bool,

    /// Abort on the first malformed scenario-table row instead of skipping
    /// it with a diagnostic.
    #[arg(long)]
    strict_input: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PrettyModeArg {
    Boxes,
    Items,
    BoxesOnly,
}

fn run(cli: &Cli) -> Result<()> {
    let variants = scenario::load_scenarios(&cli.config_file, cli.strict_input)?;
    anyhow::ensure!(!variants.is_empty(), "scenario table {} produced no runnable variants", cli.config_file.display());

    for variant in &variants {
        variant
            .config
            .validate()
            .with_context(|| format!("scenario {} failed validation", variant.label))?;
    }

    let cancel = AtomicBool::new(false);

    let jobs: Vec<(usize, u64)> =
        (0..variants.len()).flat_map(|s| (0..cli.num_simulations).map(move |i| (s, i))).collect();

    let outcomes: Vec<(usize, runner::IterationOutcome)> = jobs
        .par_iter()
        .map(|&(scenario_index, sim_index)| {
            let combined_index = scenario_index as u64 * cli.num_simulations + sim_index;
            let child_seed = split_seed(cli.seed, combined_index);
            let outcome = runner::run_iteration(
                &variants[scenario_index].config,
                child_seed,
                cli.num_consignments,
                &cancel,
            )?;
            Ok((scenario_index, outcome))
        })
        .collect::<Result<Vec<_>>>()
        .context("running simulation")?;

    let incomplete = outcomes.iter().any(|(_, outcome)| !outcome.complete);
    let mut all_records: Vec<(usize, border_core::Consignment, RunRecord)> = Vec::new();
    for (scenario_index, outcome) in outcomes {
        for (consignment, record) in outcome.records {
            all_records.push((scenario_index, consignment, record));
        }
    }

    tracing::info!(consignments = all_records.len(), incomplete, "simulation complete");

    write_output(cli, &variants, &all_records)?;

    let records_only: Vec<RunRecord> = all_records.iter().map(|(_, _, r)| r.clone()).collect();
    let stats = summary::compute_summary(&records_only, incomplete);
    summary::print_summary(&cli.config_file.display().to_string(), &stats);

    Ok(())
}

fn write_output(
    cli: &Cli,
    variants: &[scenario::ScenarioVariant],
    records: &[(usize, border_core::Consignment, RunRecord)],
) -> Result<()> {
    let mut out: Box<dyn Write> = match &cli.output_file {
        Some(path) => {
            Box::new(BufWriter::new(File::create(path).with_context(|| format!("creating {}", path.display()))?))
        }
        None => Box::new(BufWriter::new(std::io::stdout())),
    };

    for (scenario_index, consignment, record) in records {
        writeln!(out, "{}", border_world::format_record(consignment, record))?;

        if let Some(mode) = cli.pretty {
            let config = pretty_config(mode, &variants[*scenario_index]);
            writeln!(out, "{}", border_world::render(consignment, &config))?;
        }

        if cli.detailed {
            let line = serde_json::to_string(record).context("serializing detailed record")?;
            writeln!(out, "{line}")?;
        }
    }

    out.flush().context("flushing output")?;
    Ok(())
}

fn pretty_config(mode: PrettyModeArg, variant: &scenario::ScenarioVariant) -> border_world::PrettyConfig {
    let mut config = variant.config.pretty.clone().unwrap_or_default();
    config.mode = match mode {
        PrettyModeArg::Boxes => border_world::PrettyMode::Boxes,
        PrettyModeArg::Items => border_world::PrettyMode::Items,
        PrettyModeArg::BoxesOnly => border_world::PrettyMode::BoxesOnly,
    };
    config
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    run(&cli)
}
