//! # skypescape
//!
//! Exports chat history from a legacy Skype `main.db` SQLite database into static,
//! browsable HTML archives.
//!
//! ## What it does
//!
//! Two independent exports are available:
//!
//! - **Message dumps** ([`ConversationExtractor`]): all messages of a set of
//!   conversations, one HTML table per calendar year, going back a configurable
//!   number of years. Message bodies are stored in Skype's own XML markup; emoticons
//!   and quotes are unwrapped to their text, file transfers and pictures become
//!   `[FILE name]` / `[IMAGE]` placeholders, anything else passes through.
//! - **Conversation list** ([`ConversationListExtractor`]): one overview table with
//!   participants, timestamps, avatar, and a colour band for message volume.
//!
//! Rows are streamed from the query cursor straight into the output file, so memory
//! use does not grow with the size of the history. The database is opened
//! **read-only**; existing output files are never overwritten unless asked to.
//!
//! ## Usage
//!
//! ```sh
//! # Conversation overview, written to ./conversations.html
//! skypescape ~/.Skype/alice/main.db
//!
//! # Per-year dumps of two conversations: out/2024_chat.html, out/2023_chat.html, ...
//! dump-chat --db ~/.Skype/alice/main.db --ids 101405,182685 --output out/chat.html
//! ```
//!
//! Dump preferences can be persisted in `~/.config/skypescape/config.toml`.
mod config;
mod conversations;
mod dump;
mod error;
mod html;
pub mod markup;
mod parallel;
mod records;
mod render;
mod utils;
mod years;

pub use config::{DumpConfig, FileConfig, ListConfig, load_file_config};
pub use conversations::{
    ConversationListExtractor, DEFAULT_OUTPUT, LIST_LAYOUT, ListOutcome,
    execute as execute_list,
};
pub use dump::{
    ConversationExtractor, ConvoIds, DEFAULT_MAX_YEARS, DumpOptions, DumpOutcome, MESSAGE_LAYOUT,
    execute as execute_dump, render_year, year_file_name,
};
pub use error::{ExportError, Result};
pub use html::Layout;
pub use parallel::dump_parallel;
pub use records::{
    ConversationSummary, MessageColumns, MessageRecord, MessageRow, Picture, SummaryColumns,
    format_timestamp, map_message_row,
};
pub use render::{
    ACTIVITY_THRESHOLDS, RenderStats, RowStyle, TableRow, activity_class, render,
    render_to_string,
};
pub use utils::{backup_database, init_tracing, open_database};
pub use years::YearBuckets;
