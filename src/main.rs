use clap::Parser;
use eyre::Result;
use skypescape::{DEFAULT_OUTPUT, ListConfig};
use std::path::PathBuf;

const USAGE: &str = "Specify path to main.db (and optionally, path to HTML file to output).";

/// Export the list of Skype conversations to an HTML overview.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to Skype's main.db.
    #[arg(value_name = "DB_PATH")]
    db_path: Option<PathBuf>,

    /// HTML file to write. Defaults to ./conversations.html.
    #[arg(value_name = "OUTPUT_HTML")]
    output: Option<PathBuf>,

    /// Export from a temporary copy of the database.
    #[arg(long)]
    snapshot: bool,

    /// Log debug diagnostics to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(db_path) = cli.db_path else {
        println!("{}", USAGE);
        std::process::exit(1);
    };

    skypescape::init_tracing(if cli.verbose { "debug" } else { "error" });

    let config = ListConfig {
        db_path,
        output: cli.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        overwrite: false,
        snapshot: cli.snapshot,
        quiet: !cli.verbose,
    };

    skypescape::execute_list(&config)
}
