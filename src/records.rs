//! Maps positional query rows onto typed records.
//!
//! Skype's `main.db` schema drifted between client versions, so every query result
//! is described by a column set built from the statement's own column names.
//! Optional fields that are missing or `NULL` fall back to empty values.

use crate::error::{ExportError, Result};
use crate::html::{escape_attr, escape_text};
use crate::markup;
use crate::render::{ACTIVITY_THRESHOLDS, RowStyle, TableRow, activity_class};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Local, TimeZone};
use rusqlite::Row;
use rusqlite::types::ValueRef;
use std::fmt::Display;
use std::io::{self, Write};
use tracing::debug;
use url::Url;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stored value of `conversations.picture` meaning "no picture".
const NO_PICTURE: &str = "0";
const FALLBACK_IMAGE_MIME: &str = "image/png";

fn position(names: &[&str], column: &str) -> Option<usize> {
    names.iter().position(|n| *n == column)
}

fn required(names: &[&str], column: &'static str) -> Result<usize> {
    position(names, column).ok_or(ExportError::MissingColumn { column })
}

// ── Lenient cell readers ──────────────────────────────────────────────────────

fn text_at(row: &Row<'_>, index: Option<usize>) -> Result<Option<String>> {
    let Some(index) = index else {
        return Ok(None);
    };
    Ok(match row.get_ref(index)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    })
}

fn int_at(row: &Row<'_>, index: Option<usize>) -> Result<Option<i64>> {
    let Some(index) = index else {
        return Ok(None);
    };
    Ok(match row.get_ref(index)? {
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) => Some(f as i64),
        ValueRef::Text(t) => std::str::from_utf8(t).ok().and_then(|s| s.trim().parse().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

fn blob_at(row: &Row<'_>, index: Option<usize>) -> Result<Option<Vec<u8>>> {
    let Some(index) = index else {
        return Ok(None);
    };
    Ok(match row.get_ref(index)? {
        ValueRef::Blob(b) | ValueRef::Text(b) if !b.is_empty() => Some(b.to_vec()),
        _ => None,
    })
}

/// Format Unix seconds as local time. Never fails: unrepresentable values print the epoch.
pub fn format_timestamp(ts: i64) -> String {
    format_timestamp_in(ts, &Local)
}

pub fn format_timestamp_in<Tz>(ts: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    tz.timestamp_opt(ts, 0)
        .earliest()
        .or_else(|| tz.timestamp_opt(0, 0).earliest())
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// Which message fields a result set carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageColumns {
    pub id: usize,
    pub timestamp: Option<usize>,
    pub author: Option<usize>,
    pub from_dispname: Option<usize>,
    pub body_xml: Option<usize>,
}

impl MessageColumns {
    pub fn from_names(names: &[&str]) -> Result<Self> {
        Ok(Self {
            id: required(names, "id")?,
            timestamp: position(names, "timestamp"),
            author: position(names, "author"),
            from_dispname: position(names, "from_dispname"),
            body_xml: position(names, "body_xml"),
        })
    }
}

/// One row of the `messages` table, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: i64,
    pub timestamp: Option<i64>,
    pub author_id: Option<String>,
    pub author_display_name: Option<String>,
    pub body_markup: Option<String>,
}

impl MessageRecord {
    pub fn from_row(columns: &MessageColumns, row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            id: row.get(columns.id)?,
            timestamp: int_at(row, columns.timestamp)?,
            author_id: text_at(row, columns.author)?,
            author_display_name: text_at(row, columns.from_dispname)?,
            body_markup: text_at(row, columns.body_xml)?,
        })
    }
}

/// A message with every field ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: i64,
    pub timestamp: String,
    pub author_id: String,
    pub author_name: String,
    /// HTML produced by [`markup::transform`].
    pub body: String,
}

impl TryFrom<MessageRecord> for MessageRow {
    type Error = ExportError;

    fn try_from(record: MessageRecord) -> Result<Self> {
        let body = match record.body_markup.as_deref() {
            Some(markup) => markup::transform(markup)?,
            None => String::new(),
        };
        Ok(Self {
            id: record.id,
            timestamp: format_timestamp(record.timestamp.unwrap_or(0)),
            author_id: record.author_id.unwrap_or_default(),
            author_name: record.author_display_name.unwrap_or_default(),
            body,
        })
    }
}

/// Row mapper handed to `query_and_then` for message queries.
pub fn map_message_row(columns: &MessageColumns, row: &Row<'_>) -> Result<MessageRow> {
    MessageRow::try_from(MessageRecord::from_row(columns, row)?)
}

impl TableRow for MessageRow {
    fn write_row<W: Write + ?Sized>(&self, out: &mut W, style: RowStyle) -> io::Result<()> {
        write!(
            out,
            "<tr class=\"{}\">\n    <td class=\"timestamp\">{}</td>\n    \
             <td class=\"td_user\"><span class=\"username\" alt=\"{}\">{}</span></td>\n    \
             <td class=\"td_msg\"><span class=\"msg\" id=\"{}\">{}</span></td>\n</tr>\n",
            style.parity_class(),
            self.timestamp,
            escape_attr(&self.author_id),
            escape_text(&self.author_name),
            self.id,
            self.body
        )
    }
}

// ── Conversation summaries ────────────────────────────────────────────────────

/// Which summary fields a result set carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryColumns {
    pub convo_id: usize,
    pub displayname: Option<usize>,
    pub picture: Option<usize>,
    pub meta_picture: Option<usize>,
    pub numpeople: Option<usize>,
    pub people: Option<usize>,
    pub creation_timestamp: Option<usize>,
    pub last_activity_timestamp: Option<usize>,
}

impl SummaryColumns {
    pub fn from_names(names: &[&str]) -> Result<Self> {
        Ok(Self {
            convo_id: required(names, "convo_id")?,
            displayname: position(names, "displayname"),
            picture: position(names, "picture"),
            meta_picture: position(names, "meta_picture"),
            numpeople: position(names, "numpeople"),
            people: position(names, "people"),
            creation_timestamp: position(names, "creation_timestamp"),
            last_activity_timestamp: position(names, "last_activity_timestamp"),
        })
    }
}

/// Conversation avatar. A conversation stores either a link or raw bytes, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Picture {
    Url(Url),
    Inline(Vec<u8>),
    None,
}

impl Picture {
    /// Prefer the `picture` link; fall back to the inline `meta_picture` bytes.
    pub fn from_fields(picture: Option<&str>, meta_picture: Option<Vec<u8>>) -> Self {
        if let Some(value) = picture.filter(|v| *v != NO_PICTURE)
            && let Some(url) = embedded_url(value)
        {
            return Picture::Url(url);
        }
        match meta_picture {
            Some(bytes) => Picture::Inline(bytes),
            None => Picture::None,
        }
    }

    pub fn to_html(&self) -> String {
        match self {
            Picture::Url(url) => format!(
                "<a href=\"{}\"><small>Download</small></a>",
                escape_attr(url.as_str())
            ),
            Picture::Inline(bytes) => {
                let mime = infer::get(bytes)
                    .map(|kind| kind.mime_type())
                    .unwrap_or(FALLBACK_IMAGE_MIME);
                format!(
                    "<img src=\"data:{};base64,{}\" width=\"64\"/>",
                    mime,
                    STANDARD.encode(bytes)
                )
            }
            Picture::None => String::new(),
        }
    }
}

// The picture column holds space-separated tokens, e.g. "2 https://host/avatar.jpg".
fn embedded_url(value: &str) -> Option<Url> {
    let url = value
        .split_whitespace()
        .find_map(|token| Url::parse(token).ok().filter(|u| u.has_host()));
    if url.is_none() {
        debug!(picture = %value, "no URL in picture field");
    }
    url
}

/// One line of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub convo_id: i64,
    pub display_name: Option<String>,
    pub picture: Picture,
    pub participant_count: Option<i64>,
    pub participant_names: Option<String>,
    pub created_at: Option<i64>,
    pub last_activity_at: Option<i64>,
    pub message_count: Option<i64>,
}

impl ConversationSummary {
    pub fn from_row(columns: &SummaryColumns, row: &Row<'_>) -> Result<Self> {
        let picture = text_at(row, columns.picture)?;
        let meta_picture = blob_at(row, columns.meta_picture)?;
        Ok(Self {
            convo_id: row.get(columns.convo_id)?,
            display_name: text_at(row, columns.displayname)?,
            picture: Picture::from_fields(picture.as_deref(), meta_picture),
            participant_count: int_at(row, columns.numpeople)?,
            participant_names: text_at(row, columns.people)?,
            created_at: int_at(row, columns.creation_timestamp)?,
            last_activity_at: int_at(row, columns.last_activity_timestamp)?,
            message_count: None,
        })
    }

    pub fn row_class(&self, style: RowStyle) -> String {
        let parity = style.parity_class();
        match self
            .message_count
            .and_then(|count| activity_class(count, ACTIVITY_THRESHOLDS))
        {
            Some(activity) => format!("{} {}", parity, activity),
            None => parity.to_string(),
        }
    }
}

impl TableRow for ConversationSummary {
    fn write_row<W: Write + ?Sized>(&self, out: &mut W, style: RowStyle) -> io::Result<()> {
        let num_participants = self
            .participant_count
            .map(|n| n.to_string())
            .unwrap_or_default();
        write!(
            out,
            "<tr class=\"{}\">\n    <td class=\"td_name\">{}</td>\n    \
             <td class=\"td_id\">{}</td>\n    <td class=\"td_img\">{}</td>\n    \
             <td class=\"td_numpeople\">{}</td>\n    <td class=\"td_people\">{}</td>\n    \
             <td class=\"timestamp\">{}</td>\n    <td class=\"timestamp\">{}</td>\n    </tr>\n",
            self.row_class(style),
            escape_text(self.display_name.as_deref().unwrap_or("")),
            self.convo_id,
            self.picture.to_html(),
            num_participants,
            escape_text(self.participant_names.as_deref().unwrap_or("")),
            format_timestamp(self.last_activity_at.unwrap_or(0)),
            format_timestamp(self.created_at.unwrap_or(0)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rusqlite::Connection;

    fn query_message(sql: &str) -> Result<MessageRow> {
        let conn = Connection::open_in_memory()?;
        let mut stmt = conn.prepare(sql)?;
        let columns = MessageColumns::from_names(&stmt.column_names())?;
        let mut rows = stmt.query([])?;
        let row = rows.next()?.expect("one row");
        map_message_row(&columns, row)
    }

    #[test]
    fn formats_timestamps_with_space_separator() {
        assert_eq!(format_timestamp_in(0, &Utc), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp_in(1_700_000_000, &Utc), "2023-11-14 22:13:20");
    }

    #[test]
    fn out_of_range_timestamp_falls_back_to_epoch() {
        assert_eq!(format_timestamp_in(i64::MAX, &Utc), "1970-01-01 00:00:00");
    }

    #[test]
    fn maps_a_full_message_row() {
        let row = query_message(
            "SELECT 7 AS id, 'alice' AS author, 'Alice <A>' AS from_dispname, \
             '<ss type=\"smile\">:)</ss> hi' AS body_xml, 0 AS timestamp",
        )
        .unwrap();
        assert_eq!(row.id, 7);
        assert_eq!(row.author_id, "alice");
        assert_eq!(row.author_name, "Alice <A>");
        assert_eq!(row.body, ":) hi");
        assert_eq!(row.timestamp, format_timestamp(0));
    }

    #[test]
    fn nulls_and_missing_columns_default_to_empty() {
        let row = query_message("SELECT 1 AS id, NULL AS author, NULL AS timestamp").unwrap();
        assert_eq!(row.author_id, "");
        assert_eq!(row.author_name, "");
        assert_eq!(row.body, "");
        assert_eq!(row.timestamp, format_timestamp(0));
    }

    #[test]
    fn column_at_index_zero_is_honored() {
        let row = query_message("SELECT 'bob' AS author, 3 AS id").unwrap();
        assert_eq!(row.author_id, "bob");
    }

    #[test]
    fn numeric_author_is_read_as_text() {
        let row = query_message("SELECT 1 AS id, 42 AS author").unwrap();
        assert_eq!(row.author_id, "42");
    }

    #[test]
    fn missing_id_column_is_an_error() {
        let err = MessageColumns::from_names(&["author", "body_xml"]).unwrap_err();
        assert!(matches!(err, ExportError::MissingColumn { column: "id" }));
    }

    #[test]
    fn malformed_body_propagates() {
        let err = query_message("SELECT 1 AS id, '<b>oops' AS body_xml").unwrap_err();
        assert!(matches!(err, ExportError::Markup { .. }));
    }

    #[test]
    fn message_row_html_escapes_names() {
        let row = MessageRow {
            id: 9,
            timestamp: "2020-01-01 00:00:00".into(),
            author_id: "a\"b".into(),
            author_name: "<script>".into(),
            body: "<b>kept</b>".into(),
        };
        let mut buf = Vec::new();
        row.write_row(&mut buf, RowStyle::new(1)).unwrap();
        let html = String::from_utf8(buf).unwrap();
        assert!(html.starts_with("<tr class=\"row_even\">"));
        assert!(html.contains("alt=\"a&quot;b\">&lt;script&gt;</span>"));
        assert!(html.contains("id=\"9\"><b>kept</b></span>"));
    }

    #[test]
    fn picture_link_wins_over_inline_bytes() {
        let pic = Picture::from_fields(Some("1 https://example.com/a.jpg"), Some(vec![1, 2]));
        assert_eq!(
            pic.to_html(),
            "<a href=\"https://example.com/a.jpg\"><small>Download</small></a>"
        );
    }

    #[test]
    fn no_picture_marker_falls_back_to_inline_bytes() {
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        let pic = Picture::from_fields(Some("0"), Some(png.clone()));
        assert_eq!(pic, Picture::Inline(png));
        assert_eq!(
            pic.to_html(),
            "<img src=\"data:image/png;base64,iVBORw0KGgo=\" width=\"64\"/>"
        );
    }

    #[test]
    fn unknown_bytes_default_to_png_mime() {
        let html = Picture::Inline(b"abc".to_vec()).to_html();
        assert_eq!(html, "<img src=\"data:image/png;base64,YWJj\" width=\"64\"/>");
    }

    #[test]
    fn no_picture_at_all_is_empty() {
        assert_eq!(Picture::from_fields(None, None), Picture::None);
        assert_eq!(Picture::from_fields(Some("0"), None).to_html(), "");
        assert_eq!(Picture::from_fields(Some("garbage"), None), Picture::None);
    }

    #[test]
    fn summary_row_carries_activity_class() {
        let summary = ConversationSummary {
            convo_id: 5,
            display_name: Some("Team".into()),
            picture: Picture::None,
            participant_count: Some(3),
            participant_names: Some("A, B, C".into()),
            created_at: None,
            last_activity_at: None,
            message_count: Some(1200),
        };
        assert_eq!(summary.row_class(RowStyle::new(0)), "row_odd yellow");
        assert_eq!(summary.row_class(RowStyle::new(1)), "row_even yellow");

        let quiet = ConversationSummary {
            message_count: Some(10),
            ..summary.clone()
        };
        assert_eq!(quiet.row_class(RowStyle::new(0)), "row_odd");

        let mut buf = Vec::new();
        summary.write_row(&mut buf, RowStyle::new(0)).unwrap();
        let html = String::from_utf8(buf).unwrap();
        assert!(html.contains("<td class=\"td_name\">Team</td>"));
        assert!(html.contains("<td class=\"td_numpeople\">3</td>"));
        assert!(html.contains("<td class=\"td_people\">A, B, C</td>"));
    }

    #[test]
    fn summary_from_row_reads_picture_columns() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT 'Chat' AS displayname, NULL AS picture, x'616263' AS meta_picture, \
                 11 AS convo_id, 2 AS numpeople, 'A, B' AS people, \
                 NULL AS creation_timestamp, 0 AS last_activity_timestamp",
            )
            .unwrap();
        let columns = SummaryColumns::from_names(&stmt.column_names()).unwrap();
        let mut rows = stmt.query([]).unwrap();
        let row = rows.next().unwrap().unwrap();
        let summary = ConversationSummary::from_row(&columns, row).unwrap();
        assert_eq!(summary.convo_id, 11);
        assert_eq!(summary.display_name.as_deref(), Some("Chat"));
        assert_eq!(summary.picture, Picture::Inline(b"abc".to_vec()));
        assert_eq!(summary.participant_count, Some(2));
        assert_eq!(summary.created_at, None);
        assert_eq!(summary.message_count, None);
    }
}
