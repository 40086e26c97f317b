//! Streams query rows into a complete HTML document.
//!
//! Rows are pulled one at a time from a single-pass iterator and written straight
//! to the sink, so a year of chat history never has to sit in memory at once.

use crate::error::Result;
use crate::html::{self, Layout};
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Message-volume bands for the conversation list, ascending.
pub const ACTIVITY_THRESHOLDS: &[(i64, &str)] = &[
    (500, "green"),
    (1000, "yellow"),
    (5000, "orange"),
    (10000, "red"),
];

/// Per-row styling context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowStyle {
    pub index: usize,
}

impl RowStyle {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    /// `row_odd` for the first row of a document, then alternating.
    pub fn parity_class(&self) -> &'static str {
        if self.index % 2 == 0 {
            "row_odd"
        } else {
            "row_even"
        }
    }
}

/// A record that knows how to print itself as one `<tr>`.
pub trait TableRow {
    fn write_row<W: Write + ?Sized>(&self, out: &mut W, style: RowStyle) -> io::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    pub rows: usize,
    /// Time spent on the rows only, header and footer excluded.
    pub elapsed: Duration,
}

/// The most severe band whose threshold `count` exceeds.
pub fn activity_class(count: i64, thresholds: &[(i64, &'static str)]) -> Option<&'static str> {
    thresholds
        .iter()
        .filter(|(threshold, _)| count > *threshold)
        .map(|(_, class)| *class)
        .last()
}

/// Write header, one row per item of `rows`, and footer to `out`.
///
/// The first failing row aborts the document; whatever was written so far stays in the sink.
pub fn render<W, I, R>(out: &mut W, layout: &Layout, rows: I) -> Result<RenderStats>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = Result<R>>,
    R: TableRow,
{
    html::write_header(out, layout)?;

    let start = Instant::now();
    let mut count = 0;
    for (index, row) in rows.into_iter().enumerate() {
        row?.write_row(out, RowStyle::new(index))?;
        count += 1;
    }
    let elapsed = start.elapsed();

    html::write_footer(out, elapsed)?;
    Ok(RenderStats {
        rows: count,
        elapsed,
    })
}

/// In-memory variant of [`render`].
pub fn render_to_string<I, R>(layout: &Layout, rows: I) -> Result<(String, RenderStats)>
where
    I: IntoIterator<Item = Result<R>>,
    R: TableRow,
{
    let mut buf = Vec::new();
    let stats = render(&mut buf, layout, rows)?;
    let content =
        String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok((content, stats))
}
