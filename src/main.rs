use anyhow::{Context, Result};
use clap::Parser;
use corrections_loader::{
    export, heatmap, load_corrections, DateInput, FileOutcome, LoaderConfig,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Consolidate daily corrections reports (HTML) for a date range.
#[derive(Debug, Parser)]
#[command(name = "corrections-loader", version)]
struct Cli {
    /// First day to load, YYYY-MM-DD (falls back to `start` in the config file)
    #[arg(long)]
    start: Option<String>,

    /// Last day to load, YYYY-MM-DD, inclusive (falls back to `end` in the config file)
    #[arg(long)]
    end: Option<String>,

    /// YAML config; flags given here override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory searched recursively for reports
    #[arg(long)]
    root: Option<PathBuf>,

    /// Report filename prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Process files in parallel
    #[arg(long)]
    parallel: bool,

    /// Write the consolidated table to this Parquet file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print per-day delay line × rail bucket counts
    #[arg(long)]
    heatmap: bool,

    /// Rail bucket width for --heatmap
    #[arg(long, default_value_t = heatmap::DEFAULT_BIN_WIDTH)]
    bin_width: u32,

    /// Rows of the table to print
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) config: defaults < file < flags ──────────────────────────
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => LoaderConfig::from_yaml_file(path)?,
        None => LoaderConfig::default(),
    };
    if let Some(root) = cli.root.clone() {
        config.root = root;
    }
    if let Some(prefix) = cli.prefix.clone() {
        config.prefix = prefix;
    }
    config.parallel |= cli.parallel;

    let start = date_arg(cli.start.as_deref(), config.start.as_ref(), "start")?;
    let end = date_arg(cli.end.as_deref(), config.end.as_ref(), "end")?;
    info!(root = %config.root.display(), ?start, ?end, "loading corrections");

    // ─── 3) load ─────────────────────────────────────────────────────
    let report = load_corrections(&config, &start, &end);
    for f in &report.files {
        match &f.outcome {
            FileOutcome::Success { rows, .. } => println!("processed {} ({} rows)", f.display_name, rows),
            FileOutcome::Failure { reason } => println!("failed {}: {}", f.display_name, reason),
        }
    }
    if let Some(e) = &report.date_error {
        println!("error converting dates: {}", e);
    }

    let dataset = report.into_dataset();
    if dataset.is_empty() {
        warn!("no data found for the selected range");
        println!("No data found for the selected range.");
        return Ok(());
    }

    // ─── 4) outputs ──────────────────────────────────────────────────
    println!("{}", export::format_dataset(&dataset, cli.limit)?);

    if cli.heatmap {
        let maps = heatmap::heatmaps(&dataset, cli.bin_width).context("binning heatmap")?;
        for m in maps {
            println!("\n{}", m);
        }
    }

    if let Some(out) = &cli.output {
        export::write_parquet(&dataset, out)?;
        println!("wrote {} rows to {}", dataset.num_rows(), out.display());
    }

    Ok(())
}

/// A flag wins over the config file; with neither, the bound is missing.
fn date_arg(
    flag: Option<&str>,
    from_config: Option<&serde_json::Value>,
    param: &str,
) -> Result<DateInput> {
    match (flag, from_config) {
        (Some(s), _) => Ok(DateInput::from(s)),
        (None, Some(v)) => DateInput::from_value(v, param).map_err(Into::into),
        (None, None) => anyhow::bail!("--{} is required (or set `{}` in the config)", param, param),
    }
}
