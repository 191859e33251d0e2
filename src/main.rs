// Entry point and high-level CLI flow.
//
// - Reads a delivery export (CSV or JSON) and normalizes it, printing
//   data-quality diagnostics.
// - Builds the report and the synthesis, writes them as JSON next to two
//   CSV tables, and previews the depot table and synthesis on stdout.
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use delivery_report::config::Settings;
use delivery_report::normalize::{filter_by_date_range, normalize_rows};
use delivery_report::reports::{build_report, depot_summary_rows, ranking_rows};
use delivery_report::synthesis::{render_text, synthesize};
use delivery_report::{import, output, util};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "delivery_report")]
#[command(about = "Delivery KPIs, rankings and synthesis from a delivery export", long_about = None)]
struct Cli {
    /// Delivery export to analyze (.csv or .json)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// JSON settings file with objectives, carrier rules and extra warehouses
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the report files are written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Keep deliveries on or after this date (yyyy-mm-dd)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Keep deliveries on or before this date (yyyy-mm-dd)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Number of depot rows shown in the console preview
    #[arg(long, default_value_t = 5)]
    preview_rows: usize,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;
    let rows = import::read_rows(&cli.input)?;
    let (records, load_report) = normalize_rows(&rows, &settings.lookups());

    println!(
        "Processing dataset... ({} rows loaded)",
        util::format_int(load_report.total_rows as u64)
    );
    if load_report.unparsed_dates > 0 || load_report.unknown_statuses > 0 {
        println!(
            "Note: {} unparsed dates, {} unknown statuses (counted as pending).",
            util::format_int(load_report.unparsed_dates as u64),
            util::format_int(load_report.unknown_statuses as u64)
        );
    }
    if load_report.unresolved_depots > 0 || load_report.unresolved_carriers > 0 {
        warn!(
            depots = load_report.unresolved_depots,
            carriers = load_report.unresolved_carriers,
            "rows with unresolved depot or carrier"
        );
    }

    let records = filter_by_date_range(&records, cli.from, cli.to);
    if cli.from.is_some() || cli.to.is_some() {
        info!(kept = records.len(), "applied date range");
    }

    let report = build_report(&records, &settings.objectives);
    let synthesis = synthesize(&report, &settings.objectives);

    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("creating {}", cli.out_dir.display()))?;
    output::write_json(&cli.out_dir.join("report.json"), &report)?;
    output::write_json(&cli.out_dir.join("synthesis.json"), &synthesis)?;

    let depots = depot_summary_rows(&report);
    output::write_csv(&cli.out_dir.join("depot_summary.csv"), &depots)?;
    output::write_csv(&cli.out_dir.join("rankings.csv"), &ranking_rows(&report))?;

    println!("\nDepot Performance Summary");
    println!("(Busiest depots first, closed deliveries only)\n");
    output::preview_table_rows(&depots, cli.preview_rows);
    println!("(Full tables exported to {})\n", cli.out_dir.display());

    println!("Synthesis\n");
    println!("{}\n", render_text(&synthesis));
    info!(
        deliveries = report.global.stats.total_deliveries,
        depots = report.depots.len(),
        "report written"
    );
    Ok(())
}
