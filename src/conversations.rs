//! Overview table of every conversation in the database.

use crate::config::ListConfig;
use crate::error::Result;
use crate::html::Layout;
use crate::records::{ConversationSummary, SummaryColumns};
use crate::render::{self, RenderStats};
use crate::utils::{self, ensure_writable};
use eyre::Context;
use rusqlite::Connection;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_OUTPUT: &str = "conversations.html";

pub const LIST_LAYOUT: Layout = Layout {
    title: "Skype Conversations",
    column_widths: &[15, 5, 5, 5, 40, 10, 10, 10],
    headers: &[
        "Chat Name",
        "Chat ID",
        "Image",
        "Num. People",
        "People",
        "Last Activity",
        "Created",
    ],
    extra_style: "\
td.td_numpeople { text-align: center; }
td.td_people, td.td_id, td.td_img { text-align: center; }
td.td_name{ font-weight: bold; }
.red { background-color: rgba(255,0,1,0.69); }
.orange { background-color: rgba(219,150,3,0.77); }
.yellow { background-color: rgba(255,244,4,0.44); }
.green { background-color: rgba(30,255,0,0.35); }
",
};

const LIST_QUERY: &str = "\
SELECT
    c.displayname,
    c.picture,
    c.meta_picture,
    c.id AS convo_id,
    count(c.id) AS numpeople,
    group_concat(ct.displayname, ', ') AS people,
    c.creation_timestamp,
    c.last_activity_timestamp
FROM conversations c, participants p, contacts ct
WHERE c.id = p.convo_id
AND p.identity = ct.skypename
GROUP BY c.id
ORDER BY numpeople DESC";

const STATS_QUERY: &str = "\
SELECT convo_id, count(convo_id) AS num
FROM messages
WHERE convo_id IS NOT NULL
GROUP BY convo_id
ORDER BY num DESC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    Written(PathBuf),
    Document(String),
}

pub struct ConversationListExtractor<'c> {
    connection: &'c Connection,
}

impl<'c> ConversationListExtractor<'c> {
    pub fn new(connection: &'c Connection) -> Self {
        Self { connection }
    }

    /// Message count per conversation id. Messages without a conversation are not counted.
    pub fn message_stats(&self) -> Result<HashMap<i64, i64>> {
        let mut stmt = self.connection.prepare(STATS_QUERY)?;
        let stats = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        debug!(conversations = stats.len(), "collected message stats");
        Ok(stats)
    }

    /// Stream the conversation list into `out`.
    pub fn render<W: Write + ?Sized>(&self, out: &mut W) -> Result<RenderStats> {
        let stats = self.message_stats()?;
        let mut stmt = self.connection.prepare(LIST_QUERY)?;
        let columns = SummaryColumns::from_names(&stmt.column_names())?;
        let mut index = 0usize;
        let rows = stmt.query_and_then([], |row| -> Result<ConversationSummary> {
            let mut summary = ConversationSummary::from_row(&columns, row)?;
            summary.message_count = stats.get(&summary.convo_id).copied();
            debug!(index, convo_id = summary.convo_id, "conversation row");
            index += 1;
            Ok(summary)
        })?;
        render::render(out, &LIST_LAYOUT, rows)
    }

    /// Write the list to `file_name`, or return it when no file is given.
    pub fn extract_list(&self, file_name: Option<&Path>, overwrite: bool) -> Result<ListOutcome> {
        let Some(path) = file_name else {
            let mut buf = Vec::new();
            self.render(&mut buf)?;
            let content = String::from_utf8(buf)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            return Ok(ListOutcome::Document(content));
        };

        ensure_writable(path, overwrite)?;
        let mut out = BufWriter::new(File::create(path)?);
        let stats = self.render(&mut out)?;
        out.flush()?;
        info!(rows = stats.rows, path = %path.display(), "wrote conversation list");
        Ok(ListOutcome::Written(path.to_path_buf()))
    }
}

/// Command-line entry point.
pub fn execute(config: &ListConfig) -> eyre::Result<()> {
    let snapshot = if config.snapshot {
        Some(utils::backup_database(&config.db_path, config.quiet)?)
    } else {
        None
    };
    let db_path = snapshot
        .as_ref()
        .map(|s| s.path())
        .unwrap_or(config.db_path.as_path());

    let conn = utils::open_database(db_path)
        .wrap_err_with(|| format!("Failed to open database: {}", db_path.display()))?;
    ConversationListExtractor::new(&conn)
        .extract_list(Some(config.output.as_path()), config.overwrite)
        .wrap_err("Export failed")?;
    info!("Completed export!");
    Ok(())
}
