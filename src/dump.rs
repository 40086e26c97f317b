//! Per-conversation message dumps, one HTML document per calendar year.

use crate::config::DumpConfig;
use crate::error::Result;
use crate::html::Layout;
use crate::records::{MessageColumns, map_message_row};
use crate::render::{self, RenderStats};
use crate::utils::{self, ensure_writable};
use crate::years::YearBuckets;
use chrono::{Datelike, Local};
use eyre::Context;
use rusqlite::{Connection, params_from_iter};
use serde::{Deserialize, Deserializer};
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_MAX_YEARS: u32 = 10;

pub const MESSAGE_LAYOUT: Layout = Layout {
    title: "Skype Messages",
    column_widths: &[10, 10, 80],
    headers: &["Timestamp", "User", "Message"],
    extra_style: "\
td.td_user { text-align: center; padding: 2px;}
td.td_msg { padding: 4px; }
span.username { color: #536073; font-size: xx-small; font-weight: bold;}
",
};

/// The conversations whose messages are exported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvoIds(Vec<i64>);

impl ConvoIds {
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<i64> for ConvoIds {
    fn from(id: i64) -> Self {
        Self(vec![id])
    }
}

impl From<Vec<i64>> for ConvoIds {
    fn from(ids: Vec<i64>) -> Self {
        Self(ids)
    }
}

impl From<&[i64]> for ConvoIds {
    fn from(ids: &[i64]) -> Self {
        Self(ids.to_vec())
    }
}

impl<'de> Deserialize<'de> for ConvoIds {
    /// Accepts one id or a list of ids; anything else selects nothing.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(i64),
            Many(Vec<i64>),
            Other(serde::de::IgnoredAny),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::One(id) => id.into(),
            Raw::Many(ids) => ids.into(),
            Raw::Other(_) => {
                warn!("convo_ids is neither an integer nor a list of integers, selecting nothing");
                Self::default()
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpOptions {
    pub overwrite: bool,
    pub max_years: u32,
    /// Defaults to the wall-clock year.
    pub current_year: Option<i32>,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            max_years: DEFAULT_MAX_YEARS,
            current_year: None,
        }
    }
}

impl DumpOptions {
    pub fn buckets(&self) -> Result<YearBuckets> {
        let current_year = self.current_year.unwrap_or_else(|| Local::now().year());
        YearBuckets::new(current_year, self.max_years, &Local)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpOutcome {
    /// One file per year, most recent first.
    Written(Vec<PathBuf>),
    /// The most recent year only, rendered in memory.
    Document(String),
    /// In-memory mode with an empty year window.
    Nothing,
}

pub struct ConversationExtractor<'c> {
    connection: &'c Connection,
    convo_ids: ConvoIds,
}

impl<'c> ConversationExtractor<'c> {
    pub fn new(connection: &'c Connection, convo_ids: impl Into<ConvoIds>) -> Self {
        Self {
            connection,
            convo_ids: convo_ids.into(),
        }
    }

    /// Export every year in the window to `<year>_<file name>` next to `file_name`.
    ///
    /// Without a `file_name` only the most recent year is rendered and returned.
    /// An existing year file aborts the export unless `overwrite` is set; years
    /// already written stay on disk.
    pub fn dump(&self, file_name: Option<&Path>, options: DumpOptions) -> Result<DumpOutcome> {
        let buckets = options.buckets()?;
        let mut written = Vec::with_capacity(buckets.len());

        for (year, range) in buckets.iter() {
            let Some(base) = file_name else {
                let mut buf = Vec::new();
                render_year(self.connection, &self.convo_ids, &range, &mut buf)?;
                let content = String::from_utf8(buf)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                return Ok(DumpOutcome::Document(content));
            };

            let target = year_file_name(base, year)?;
            ensure_writable(&target, options.overwrite)?;
            let stats = write_year(self.connection, &self.convo_ids, &range, &target)?;
            info!(year, rows = stats.rows, path = %target.display(), "wrote year");
            written.push(target);
        }

        Ok(match file_name {
            Some(_) => DumpOutcome::Written(written),
            None => DumpOutcome::Nothing,
        })
    }
}

/// `/out/chat.html` becomes `/out/2024_chat.html`.
pub fn year_file_name(base: &Path, year: i32) -> Result<PathBuf> {
    let name = base.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Not a file path: {}", base.display()),
        )
    })?;
    let mut prefixed = OsString::from(format!("{}_", year));
    prefixed.push(name);
    Ok(base.with_file_name(prefixed))
}

fn message_query(id_count: usize) -> String {
    let placeholders = vec!["?"; id_count].join(", ");
    format!(
        "SELECT m.id, m.from_dispname, m.body_xml, m.author, m.timestamp, \
         m.chatmsg_type, m.type \
         FROM messages m, conversations c \
         WHERE m.convo_id = c.id AND m.convo_id IN ({}) \
         AND m.timestamp >= ? AND m.timestamp < ? \
         ORDER BY m.timestamp__ms ASC",
        placeholders
    )
}

/// Query one year of messages and stream it into `out`.
pub fn render_year<W: Write + ?Sized>(
    conn: &Connection,
    convo_ids: &ConvoIds,
    range: &Range<i64>,
    out: &mut W,
) -> Result<RenderStats> {
    let mut stmt = conn.prepare(&message_query(convo_ids.as_slice().len()))?;
    let columns = MessageColumns::from_names(&stmt.column_names())?;
    let params = convo_ids
        .as_slice()
        .iter()
        .copied()
        .chain([range.start, range.end]);
    let rows = stmt.query_and_then(params_from_iter(params), |row| {
        map_message_row(&columns, row)
    })?;
    render::render(out, &MESSAGE_LAYOUT, rows)
}

/// Render one year into `target`, which the caller has already cleared for writing.
pub fn write_year(
    conn: &Connection,
    convo_ids: &ConvoIds,
    range: &Range<i64>,
    target: &Path,
) -> Result<RenderStats> {
    let mut out = BufWriter::new(File::create(target)?);
    let stats = render_year(conn, convo_ids, range, &mut out)?;
    out.flush()?;
    Ok(stats)
}

/// Command-line entry point.
pub fn execute(config: &DumpConfig) -> eyre::Result<()> {
    let snapshot = if config.snapshot {
        Some(utils::backup_database(&config.db_path, config.quiet)?)
    } else {
        None
    };
    let db_path = snapshot
        .as_ref()
        .map(|s| s.path())
        .unwrap_or(config.db_path.as_path());

    let options = DumpOptions {
        overwrite: config.overwrite,
        max_years: config.max_years,
        current_year: None,
    };

    if config.parallel
        && let Some(output) = config.output.as_deref()
    {
        let written = crate::parallel::dump_parallel(db_path, &config.convo_ids, output, options)
            .wrap_err("Parallel export failed")?;
        report_written(&written, config.quiet);
        return Ok(());
    }

    let conn = utils::open_database(db_path)
        .wrap_err_with(|| format!("Failed to open database: {}", db_path.display()))?;
    let extractor = ConversationExtractor::new(&conn, config.convo_ids.clone());
    match extractor
        .dump(config.output.as_deref(), options)
        .wrap_err("Export failed")?
    {
        DumpOutcome::Written(written) => report_written(&written, config.quiet),
        DumpOutcome::Document(content) => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(content.as_bytes())?;
            lock.flush()?;
        }
        DumpOutcome::Nothing => {
            if !config.quiet {
                eprintln!("Nothing to export: the year window is empty.");
            }
        }
    }
    Ok(())
}

fn report_written(written: &[PathBuf], quiet: bool) {
    if quiet {
        return;
    }
    for path in written {
        eprintln!("Written: {}", path.display());
    }
    eprintln!("Done. {} file(s) written.", written.len());
}
