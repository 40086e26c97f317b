use crate::error::{ExportError, Result};
use eyre::WrapErr;
use rusqlite::backup::{Backup, StepResult};
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Open Skype's `main.db` without ever writing to it.
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.execute_batch("PRAGMA cache_size = -16384;")?;
    Ok(conn)
}

/// Refuse to clobber `path` unless `overwrite` is set, and make sure its directory exists.
pub fn ensure_writable(path: &Path, overwrite: bool) -> Result<()> {
    if path.try_exists()? && !overwrite {
        return Err(ExportError::Conflict {
            path: path.to_path_buf(),
        });
    }
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Install the global `tracing` subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

const SNAPSHOT_PAGES_PER_STEP: i32 = 1000;
const SNAPSHOT_RETRY_DELAY: Duration = Duration::from_millis(5);

/// Snapshot `db_path` into a private temporary database and hand back the file.
///
/// A running Skype client keeps `main.db` open and may write to it mid-export.
/// The snapshot is deleted when the returned handle is dropped.
pub fn backup_database(db_path: &Path, quiet: bool) -> eyre::Result<NamedTempFile> {
    let notice = SnapshotNotice::show(quiet);
    let snapshot = tempfile::Builder::new()
        .prefix("skypescape-")
        .suffix(".db")
        .tempfile()
        .wrap_err("Could not allocate a snapshot file")?;

    copy_pages(db_path, snapshot.path())
        .wrap_err_with(|| format!("Could not snapshot {}", db_path.display()))?;

    notice.done();
    debug!(snapshot = %snapshot.path().display(), "database snapshot ready");
    Ok(snapshot)
}

// Page-by-page online backup; busy or locked steps are retried after a short pause.
fn copy_pages(from: &Path, to: &Path) -> Result<()> {
    let source = open_database(from)?;
    let mut target = Connection::open(to)?;
    let backup = Backup::new(&source, &mut target)?;
    loop {
        match backup.step(SNAPSHOT_PAGES_PER_STEP)? {
            StepResult::Done => return Ok(()),
            StepResult::More => {}
            _ => thread::sleep(SNAPSHOT_RETRY_DELAY),
        }
    }
}

/// Terminal feedback while a snapshot is taken. Silent without the `progress` feature.
struct SnapshotNotice {
    #[cfg(feature = "progress")]
    spinner: indicatif::ProgressBar,
}

impl SnapshotNotice {
    #[cfg(feature = "progress")]
    fn show(quiet: bool) -> Self {
        use indicatif::{ProgressBar, ProgressStyle};

        if quiet {
            return Self {
                spinner: ProgressBar::hidden(),
            };
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Copying main.db...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self { spinner }
    }

    #[cfg(not(feature = "progress"))]
    fn show(_quiet: bool) -> Self {
        Self {}
    }

    fn done(self) {
        #[cfg(feature = "progress")]
        self.spinner.finish_and_clear();
    }
}
