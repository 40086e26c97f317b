use clap::Parser;
use eyre::{Result, eyre};
use skypescape::{ConvoIds, DumpConfig};
use std::path::PathBuf;

/// Dump Skype conversations to one HTML file per year.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to Skype's main.db.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Comma-separated conversation ids (e.g. "101405,182685").
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    ids: Option<Vec<i64>>,

    /// Base HTML path; each year is written to `<year>_<name>` beside it.
    /// Without it, the most recent year is printed to stdout.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Replace year files that already exist.
    #[arg(long)]
    overwrite: bool,

    /// How many calendar years to look back, the current one included.
    #[arg(long, value_name = "N")]
    max_years: Option<u32>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/skypescape/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Render years concurrently (file output only).
    #[arg(long)]
    parallel: bool,

    /// Export from a temporary copy of the database.
    #[arg(long)]
    snapshot: bool,

    /// Log debug diagnostics to stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress the summary of written files.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    skypescape::init_tracing(if cli.verbose { "debug" } else { "warn" });

    // 1. Load config file (CLI path > default path)
    let file_cfg = skypescape::load_file_config(cli.config.as_deref())?;
    let max_years = cli.max_years.unwrap_or_else(|| file_cfg.max_years_or_default());

    // 2. Resolve everything else (CLI > Config > Default)
    let db_path = cli.db.or(file_cfg.db_path).ok_or_else(|| {
        eyre!("Could not determine database path.\nUse --db to specify it, or set db_path in config.toml.")
    })?;
    if !db_path.exists() {
        return Err(eyre!("Database not found at: {}", db_path.display()));
    }

    let convo_ids = cli
        .ids
        .map(ConvoIds::from)
        .or(file_cfg.convo_ids)
        .unwrap_or_default();
    if convo_ids.is_empty() {
        tracing::warn!("no conversation ids selected, every year will be empty");
    }

    let config = DumpConfig {
        db_path,
        convo_ids,
        output: cli.output.or(file_cfg.output),
        overwrite: cli.overwrite || file_cfg.overwrite.unwrap_or(false),
        max_years,
        parallel: cli.parallel,
        snapshot: cli.snapshot,
        quiet: cli.quiet,
    };

    skypescape::execute_dump(&config)
}
