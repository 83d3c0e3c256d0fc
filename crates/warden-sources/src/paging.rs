//! Keyset pagination over legacy plugin tables
//!
//! Reads one table after another, `page_size` rows at a time, ordered by the
//! integer `id` column. Only the current page is ever held in memory.

use crate::{SourceError, SourceItem};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, Row};
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, warn};

/// One table to page through
#[derive(Debug, Clone)]
pub(crate) struct Segment {
    /// Full table name
    pub table: String,
    /// Prefix used for native ids of this table's rows
    pub label: &'static str,
    /// Columns after `id`, in the order the row mapper reads them
    pub columns: &'static str,
}

impl Segment {
    pub(crate) fn new(table: impl Into<String>, label: &'static str, columns: &'static str) -> Self {
        Self {
            table: table.into(),
            label,
            columns,
        }
    }
}

/// Open a legacy database without ever writing to it
pub(crate) fn open_read_only(path: &Path) -> Result<Connection, SourceError> {
    if !path.exists() {
        return Err(SourceError::NotFound(path.display().to_string()));
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, SourceError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Row mapper: `None` skips a row the import has no use for
pub(crate) type RowMapper =
    Box<dyn FnMut(&Segment, i64, &Row<'_>) -> rusqlite::Result<Option<SourceItem>> + Send>;

/// Lazily paged rows of several tables, in table order then id order
pub(crate) struct PagedRows {
    conn: Connection,
    segments: Vec<Segment>,
    current: usize,
    last_id: i64,
    page_size: usize,
    buffer: VecDeque<SourceItem>,
    map_row: RowMapper,
}

impl PagedRows {
    /// Page through the segments that exist in the database
    ///
    /// Missing tables are skipped with a warning; if none exist the database
    /// is not a source of this kind.
    pub(crate) fn new(
        conn: Connection,
        segments: Vec<Segment>,
        page_size: usize,
        map_row: RowMapper,
    ) -> Result<Self, SourceError> {
        let mut present = Vec::with_capacity(segments.len());
        for segment in segments {
            if table_exists(&conn, &segment.table)? {
                present.push(segment);
            } else {
                warn!(table = %segment.table, "Table not found, skipping");
            }
        }
        if present.is_empty() {
            return Err(SourceError::NotFound("no punishment tables in database".to_string()));
        }

        Ok(Self {
            conn,
            segments: present,
            current: 0,
            last_id: i64::MIN,
            page_size: page_size.max(1),
            buffer: VecDeque::new(),
            map_row,
        })
    }

    /// Fetch the next page of the current segment, returns rows read
    fn fetch_page(&mut self) -> Result<usize, SourceError> {
        let segment = &self.segments[self.current];
        let sql = format!(
            "SELECT id, {} FROM {} WHERE id > ?1 ORDER BY id LIMIT ?2",
            segment.columns, segment.table
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params![self.last_id, self.page_size as i64])?;

        let mut read = 0;
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            self.last_id = id;
            read += 1;
            if let Some(item) = (self.map_row)(segment, id, row)? {
                self.buffer.push_back(item);
            }
        }
        debug!(table = %segment.table, rows = read, last_id = self.last_id, "Fetched page");
        Ok(read)
    }
}

impl Iterator for PagedRows {
    type Item = Result<SourceItem, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            if self.current >= self.segments.len() {
                return None;
            }
            match self.fetch_page() {
                Ok(read) if read < self.page_size => {
                    self.current += 1;
                    self.last_id = i64::MIN;
                }
                Ok(_) => {}
                Err(e) => {
                    self.current = self.segments.len();
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Read an integer column some plugins store as text
pub(crate) fn column_i64(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(v) => Some(v),
        ValueRef::Real(v) => Some(v as i64),
        ValueRef::Text(t) => std::str::from_utf8(t).ok().and_then(|s| s.trim().parse().ok()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

/// Read a text column, `None` for NULL or blank
pub(crate) fn column_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(t) => {
            let s = String::from_utf8_lossy(t).trim().to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        }
        ValueRef::Integer(v) => Some(v.to_string()),
        ValueRef::Real(v) => Some(v.to_string()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    })
}

/// Read a boolean column stored as 0/1 or text
pub(crate) fn column_bool(row: &Row<'_>, idx: usize) -> rusqlite::Result<bool> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(v) => v != 0,
        ValueRef::Text(t) => matches!(t, b"1" | b"true" | b"TRUE"),
        _ => false,
    })
}

/// Legacy plugins store milliseconds, the portable record uses seconds
pub(crate) fn millis_to_secs(millis: i64) -> i64 {
    millis.div_euclid(1000)
}
