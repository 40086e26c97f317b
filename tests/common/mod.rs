//! Fixture `main.db` builder shared by the integration tests.

#![allow(dead_code)]

use chrono::{Local, TimeZone};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};

const SCHEMA: &str = "
CREATE TABLE conversations (
    id INTEGER PRIMARY KEY,
    displayname TEXT,
    picture TEXT,
    meta_picture BLOB,
    creation_timestamp INTEGER,
    last_activity_timestamp INTEGER
);
CREATE TABLE contacts (
    id INTEGER PRIMARY KEY,
    skypename TEXT,
    displayname TEXT
);
CREATE TABLE participants (
    id INTEGER PRIMARY KEY,
    convo_id INTEGER,
    identity TEXT
);
CREATE TABLE messages (
    id INTEGER PRIMARY KEY,
    convo_id INTEGER,
    author TEXT,
    from_dispname TEXT,
    body_xml TEXT,
    timestamp INTEGER,
    timestamp__ms INTEGER,
    chatmsg_type INTEGER,
    type INTEGER
);
";

/// Noon local time on the given day, in Unix seconds.
pub fn local_ts(year: i32, month: u32, day: u32) -> i64 {
    Local
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .earliest()
        .expect("valid local noon")
        .timestamp()
}

pub struct Fixture {
    pub conn: Connection,
    pub path: PathBuf,
}

impl Fixture {
    pub fn create(dir: &Path) -> Self {
        let path = dir.join("main.db");
        let conn = Connection::open(&path).expect("create fixture db");
        conn.execute_batch(SCHEMA).expect("create schema");
        Self { conn, path }
    }

    pub fn conversation(&self, id: i64, name: &str) -> &Self {
        self.conn
            .execute(
                "INSERT INTO conversations (id, displayname, creation_timestamp, last_activity_timestamp) \
                 VALUES (?1, ?2, 0, 0)",
                params![id, name],
            )
            .expect("insert conversation");
        self
    }

    pub fn participant(&self, convo_id: i64, skypename: &str, display: &str) -> &Self {
        self.conn
            .execute(
                "INSERT INTO contacts (skypename, displayname) \
                 SELECT ?1, ?2 WHERE NOT EXISTS (SELECT 1 FROM contacts WHERE skypename = ?1)",
                params![skypename, display],
            )
            .expect("insert contact");
        self.conn
            .execute(
                "INSERT INTO participants (convo_id, identity) VALUES (?1, ?2)",
                params![convo_id, skypename],
            )
            .expect("insert participant");
        self
    }

    /// Insert a message; `timestamp__ms` is derived from `ts` plus `ms_offset`.
    pub fn message(&self, id: i64, convo_id: i64, author: &str, body: &str, ts: i64, ms_offset: i64) -> &Self {
        self.conn
            .execute(
                "INSERT INTO messages (id, convo_id, author, from_dispname, body_xml, timestamp, timestamp__ms, chatmsg_type, type) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 3, 61)",
                params![id, convo_id, author, author.to_uppercase(), body, ts, ts * 1000 + ms_offset],
            )
            .expect("insert message");
        self
    }

    pub fn bulk_messages(&self, convo_id: i64, count: i64, ts: i64) -> &Self {
        let base: i64 = self
            .conn
            .query_row("SELECT coalesce(max(id), 0) FROM messages", [], |r| r.get(0))
            .expect("max id");
        self.conn.execute_batch("BEGIN").expect("begin");
        for i in 1..=count {
            self.message(base + i, convo_id, "bulk", "x", ts, i);
        }
        self.conn.execute_batch("COMMIT").expect("commit");
        self
    }
}

pub fn row_count(html: &str) -> usize {
    html.matches("<tr class=\"row_").count()
}
