//! Renders the years of a message dump concurrently.
//!
//! Every target file is checked (and its directory created) serially before any
//! worker starts, so the existence check can never race with another year's write.

use crate::dump::{ConvoIds, DumpOptions, write_year, year_file_name};
use crate::error::{ExportError, Result};
use crate::utils::{ensure_writable, open_database};
use crossbeam_channel::bounded;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info};

struct YearJob {
    year: i32,
    range: Range<i64>,
    target: PathBuf,
}

/// Parallel counterpart of [`crate::ConversationExtractor::dump`] in file mode.
///
/// Each worker opens its own read-only connection to `db_path`. If any year fails,
/// the remaining years still finish and the first error is returned.
pub fn dump_parallel(
    db_path: &Path,
    convo_ids: &ConvoIds,
    file_name: &Path,
    options: DumpOptions,
) -> Result<Vec<PathBuf>> {
    let buckets = options.buckets()?;

    let jobs = buckets
        .iter()
        .map(|(year, range)| -> Result<YearJob> {
            let target = year_file_name(file_name, year)?;
            ensure_writable(&target, options.overwrite)?;
            Ok(YearJob {
                year,
                range,
                target,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if jobs.is_empty() {
        return Ok(Vec::new());
    }

    let targets: Vec<PathBuf> = jobs.iter().map(|job| job.target.clone()).collect();
    let n_workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(jobs.len());

    let (tx, rx) = bounded::<YearJob>(jobs.len());
    let failures: Mutex<Vec<ExportError>> = Mutex::new(Vec::new());

    std::thread::scope(|s| {
        for _ in 0..n_workers {
            let rx = rx.clone();
            let failures = &failures;

            s.spawn(move || {
                let record = |e: ExportError| {
                    if let Ok(mut list) = failures.lock() {
                        list.push(e);
                    }
                };

                let conn = match open_database(db_path) {
                    Ok(c) => c,
                    Err(e) => {
                        error!(error = %e, "worker failed to open database");
                        record(e);
                        return;
                    }
                };

                while let Ok(job) = rx.recv() {
                    match write_year(&conn, convo_ids, &job.range, &job.target) {
                        Ok(stats) => {
                            info!(year = job.year, rows = stats.rows, path = %job.target.display(), "wrote year");
                        }
                        Err(e) => {
                            error!(year = job.year, error = %e, "year export failed");
                            record(e);
                        }
                    }
                }
            });
        }

        drop(rx);
        for job in jobs {
            if tx.send(job).is_err() {
                break;
            }
        }
        drop(tx);
    });

    let mut failures = failures
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if failures.is_empty() {
        Ok(targets)
    } else {
        Err(failures.remove(0))
    }
}
