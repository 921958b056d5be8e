//! The sheet store contract and an in-process implementation.
//!
//! [`SheetStore`] mirrors the REST API of the sheet backend one method per
//! endpoint. [`crate::http::HttpStore`] talks to the real backend;
//! [`MemoryStore`] keeps sheets in memory with the same server-side rules
//! and is used for tests and for reports over local CSV exports.

use crate::category::is_extra;
use crate::config::SheetNames;
use crate::parser::{ColumnMap, Field};
use crate::sheet::{SheetData, EXTRAS_HEADERS};
use crate::text::{split_names, tr_lower};
use anyhow::Context;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Number of notices removed by "delete oldest".
pub const OLDEST_NOTICE_BATCH: usize = 20;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sheet '{0}' does not exist")]
    SheetNotFound(String),
    #[error("store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        StoreError::Rejected {
            status,
            message: message.into(),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Position-addressed operations offered by the sheet backend.
///
/// Row indices are zero-based data-row positions (the header row is not
/// counted) as seen by the most recent read.
pub trait SheetStore {
    fn list_sheets(&self) -> StoreResult<Vec<String>>;
    fn fetch_sheet(&self, name: &str) -> StoreResult<SheetData>;
    fn update_cell(&mut self, sheet: &str, row: usize, col: usize, value: &str) -> StoreResult<()>;
    fn append_row(&mut self, sheet: &str, values: &[String]) -> StoreResult<()>;
    /// `after_row == -1` inserts at the very top.
    fn insert_row_after(&mut self, sheet: &str, after_row: i64, values: &[String]) -> StoreResult<()>;
    fn delete_row(&mut self, sheet: &str, row: usize) -> StoreResult<()>;
    /// Move every roster row of `play` to the archive. Returns the moved count.
    fn archive_play(&mut self, play: &str) -> StoreResult<usize>;
    /// Add roster extras missing from the extras registry. Returns the added count.
    fn sync_extras(&mut self) -> StoreResult<usize>;
    fn clear_notifications(&mut self) -> StoreResult<()>;
    fn delete_oldest_notifications(&mut self) -> StoreResult<()>;
}

/// Operations that can be told to fail in a [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    UpdateCell,
    AppendRow,
    InsertRow,
    DeleteRow,
    ArchivePlay,
    SyncExtras,
    ClearNotifications,
}

/// In-memory sheet backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: Vec<(String, SheetData)>,
    names: SheetNames,
    budgets: HashMap<StoreOp, usize>,
    archive_midway_failure: bool,
}

impl MemoryStore {
    pub fn new(names: SheetNames) -> Self {
        MemoryStore {
            names,
            ..Default::default()
        }
    }

    /// Add or replace a sheet.
    pub fn with_sheet(mut self, name: &str, data: SheetData) -> Self {
        self.put_sheet(name, data);
        self
    }

    pub fn put_sheet(&mut self, name: &str, data: SheetData) {
        match self.sheets.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = data,
            None => self.sheets.push((name.to_string(), data)),
        }
    }

    /// Load a CSV export (first line is the header row) as sheet `name`.
    pub fn load_csv(&mut self, name: &str, path: &Path) -> anyhow::Result<usize> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect::<Vec<String>>()))
            .collect::<std::result::Result<_, _>>()
            .context("Failed to read CSV row")?;
        let count = rows.len();
        self.put_sheet(name, SheetData::new(headers, rows));
        log::info!("Loaded {} rows from {} into '{}'", count, path.display(), name);
        Ok(count)
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetData> {
        self.sheets.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// Let `op` succeed `successes` more times, then reject every call.
    pub fn fail_after(&mut self, op: StoreOp, successes: usize) {
        self.budgets.insert(op, successes);
    }

    /// Make the next archive copy rows into the archive and then fail
    /// before removing them from the roster.
    pub fn fail_archive_midway(&mut self) {
        self.archive_midway_failure = true;
    }

    fn check(&mut self, op: StoreOp) -> StoreResult<()> {
        match self.budgets.get_mut(&op) {
            Some(0) => Err(StoreError::rejected(503, format!("{:?} unavailable", op))),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn sheet_mut(&mut self, name: &str) -> StoreResult<&mut SheetData> {
        self.sheets
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d)
            .ok_or_else(|| StoreError::SheetNotFound(name.to_string()))
    }
}

impl SheetStore for MemoryStore {
    fn list_sheets(&self) -> StoreResult<Vec<String>> {
        Ok(self.sheets.iter().map(|(n, _)| n.clone()).collect())
    }

    fn fetch_sheet(&self, name: &str) -> StoreResult<SheetData> {
        self.sheet(name)
            .cloned()
            .ok_or_else(|| StoreError::SheetNotFound(name.to_string()))
    }

    fn update_cell(&mut self, sheet: &str, row: usize, col: usize, value: &str) -> StoreResult<()> {
        self.check(StoreOp::UpdateCell)?;
        let data = self.sheet_mut(sheet)?;
        let cells = data
            .rows
            .get_mut(row)
            .ok_or_else(|| StoreError::rejected(400, format!("row {} out of range", row)))?;
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value.to_string();
        Ok(())
    }

    fn append_row(&mut self, sheet: &str, values: &[String]) -> StoreResult<()> {
        self.check(StoreOp::AppendRow)?;
        match self.sheet_mut(sheet) {
            Ok(data) => data.rows.push(values.to_vec()),
            Err(StoreError::SheetNotFound(_)) => {
                // A new sheet takes its first row as the header.
                self.put_sheet(sheet, SheetData::new(values.to_vec(), Vec::new()));
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn insert_row_after(&mut self, sheet: &str, after_row: i64, values: &[String]) -> StoreResult<()> {
        self.check(StoreOp::InsertRow)?;
        let data = self.sheet_mut(sheet)?;
        let position = usize::try_from(after_row + 1)
            .ok()
            .filter(|pos| *pos <= data.rows.len())
            .ok_or_else(|| StoreError::rejected(400, format!("cannot insert after row {}", after_row)))?;
        data.rows.insert(position, values.to_vec());
        Ok(())
    }

    fn delete_row(&mut self, sheet: &str, row: usize) -> StoreResult<()> {
        self.check(StoreOp::DeleteRow)?;
        let data = self.sheet_mut(sheet)?;
        if row >= data.rows.len() {
            return Err(StoreError::rejected(400, format!("row {} out of range", row)));
        }
        data.rows.remove(row);
        Ok(())
    }

    fn archive_play(&mut self, play: &str) -> StoreResult<usize> {
        self.check(StoreOp::ArchivePlay)?;
        if play.trim().is_empty() {
            return Err(StoreError::rejected(400, "playName is required"));
        }
        let roster_name = self.names.roster.clone();
        let archive_name = self.names.archive.clone();

        let roster = self.sheet_mut(&roster_name)?;
        let columns = ColumnMap::resolve(&roster.headers);
        let headers = roster.headers.clone();
        let matching: Vec<usize> = roster
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| columns.cell(row, Field::Play) == play.trim())
            .map(|(i, _)| i)
            .collect();
        if matching.is_empty() {
            return Ok(0);
        }
        let moved: Vec<Vec<String>> = matching.iter().map(|&i| roster.rows[i].clone()).collect();

        if self.sheet(&archive_name).is_none() {
            self.put_sheet(&archive_name, SheetData::new(headers, Vec::new()));
        }
        self.sheet_mut(&archive_name)?.rows.extend(moved);

        if self.archive_midway_failure {
            self.archive_midway_failure = false;
            return Err(StoreError::rejected(500, "roster update failed after archive copy"));
        }

        let roster = self.sheet_mut(&roster_name)?;
        for &i in matching.iter().rev() {
            roster.rows.remove(i);
        }
        Ok(matching.len())
    }

    fn sync_extras(&mut self) -> StoreResult<usize> {
        self.check(StoreOp::SyncExtras)?;
        let roster = self
            .sheet(&self.names.roster)
            .cloned()
            .ok_or_else(|| StoreError::SheetNotFound(self.names.roster.clone()))?;
        let records = crate::parser::parse_records(&roster.headers, &roster.rows);

        let mut order: Vec<String> = Vec::new();
        let mut plays: HashMap<String, Vec<String>> = HashMap::new();
        for record in records.iter().filter(|r| is_extra(&r.category)) {
            for name in split_names(&record.person) {
                let entry = plays.entry(name.to_string()).or_insert_with(|| {
                    order.push(name.to_string());
                    Vec::new()
                });
                if !entry.contains(&record.play) {
                    entry.push(record.play.clone());
                }
            }
        }

        let extras_name = self.names.extras.clone();
        if self.sheet(&extras_name).is_none() {
            let headers = EXTRAS_HEADERS.iter().map(|h| h.to_string()).collect();
            self.put_sheet(&extras_name, SheetData::new(headers, Vec::new()));
        }
        let registry = self.sheet_mut(&extras_name)?;
        let person_col = ColumnMap::resolve(&registry.headers).person.unwrap_or(0);
        let mut known: Vec<String> = registry
            .rows
            .iter()
            .filter_map(|row| row.get(person_col))
            .map(|name| tr_lower(name.trim()))
            .collect();

        let mut added = 0;
        for name in order {
            let key = tr_lower(&name);
            if known.contains(&key) {
                continue;
            }
            let plays_col = if person_col == 0 { 1 } else { 0 };
            let width = registry.headers.len().max(person_col.max(plays_col) + 1);
            let mut row = vec![String::new(); width];
            row[plays_col] = plays.get(&name).map(|p| p.join(", ")).unwrap_or_default();
            row[person_col] = name;
            registry.rows.push(row);
            known.push(key);
            added += 1;
        }
        Ok(added)
    }

    fn clear_notifications(&mut self) -> StoreResult<()> {
        self.check(StoreOp::ClearNotifications)?;
        let name = self.names.notifications.clone();
        if let Ok(data) = self.sheet_mut(&name) {
            data.rows.clear();
        }
        Ok(())
    }

    fn delete_oldest_notifications(&mut self) -> StoreResult<()> {
        self.check(StoreOp::ClearNotifications)?;
        let name = self.names.notifications.clone();
        if let Ok(data) = self.sheet_mut(&name) {
            let n = OLDEST_NOTICE_BATCH.min(data.rows.len());
            data.rows.drain(..n);
        }
        Ok(())
    }
}
