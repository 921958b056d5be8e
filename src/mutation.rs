//! Mutation protocol.
//!
//! [`Roster`] owns the store and the snapshot cache. Reads go through the
//! cache; every successful write invalidates the sheets it touched. Writes
//! that address a row by position must carry the generation of the snapshot
//! the position came from, and are refused without contacting the store when
//! that snapshot is no longer the cached one.

use crate::aggregate::overlap;
use crate::cache::SnapshotCache;
use crate::category::is_extra;
use crate::config::SheetNames;
use crate::parser::{ColumnMap, Record};
use crate::sheet::{visible_sheets, RowRef, Snapshot, HOLDING_HEADERS};
use crate::store::{SheetStore, StoreError};
use crate::sync::{display_to_original, last_assignment, Clipboard, InsertTarget, LastAssignment, SyncError};
use crate::text::{split_names, tr_lower};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("row {index} of '{sheet}' comes from a superseded snapshot, re-read the sheet first")]
    StaleSnapshot { sheet: String, index: usize },
    #[error("archiving '{play}' failed midway ({removed} rows left the roster, {archived} reached the archive): {source}")]
    ArchivePartial {
        play: String,
        /// Rows of the play that disappeared from the roster
        removed: usize,
        /// Rows of the play that appeared in the archive
        archived: usize,
        #[source]
        source: StoreError,
    },
    #[error("play name is empty")]
    EmptyPlay,
}

pub type RosterResult<T> = std::result::Result<T, RosterError>;

/// Result of a cached read.
#[derive(Debug, Clone)]
pub enum SheetState {
    Ready(Arc<Snapshot>),
    /// The store has no sheet by that name
    Missing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Set when the deleted roster row was the person's only one
    pub last_assignment: Option<LastAssignment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveWarning {
    /// Rows of the play are still in the roster after the archive call
    Unverified { remaining: usize },
    /// The roster could not be re-read to check the result
    VerifyFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub moved: usize,
    pub warning: Option<ArchiveWarning>,
}

/// Per-row results of a paste, in clipboard order.
#[derive(Debug, Default)]
pub struct PasteReport {
    pub results: Vec<Result<(), StoreError>>,
}

impl PasteReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// Clipboard positions that failed, with their errors.
    pub fn failed(&self) -> Vec<(usize, &StoreError)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.results.iter().all(|r| r.is_ok())
    }
}

/// Registered extras compared with the extras found in the roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtrasReconciliation {
    /// Extras in the roster but not in the registry
    pub unregistered: Vec<String>,
    /// Registry entries with no extra role in the roster
    pub idle: Vec<String>,
    /// Registered and assigned
    pub registered: Vec<String>,
}

/// Compare the extras registry with the figurant names of `records`.
///
/// Names match case-insensitively; each side is reported with its own
/// spelling. A missing registry counts as empty.
pub fn reconcile_extras(registry: Option<&Snapshot>, records: &[Record]) -> ExtrasReconciliation {
    let mut roster_names: HashMap<String, String> = HashMap::new();
    for record in records.iter().filter(|r| is_extra(&r.category)) {
        for name in split_names(&record.person) {
            roster_names
                .entry(tr_lower(name))
                .or_insert_with(|| name.to_string());
        }
    }

    let mut registry_names: HashMap<String, String> = HashMap::new();
    if let Some(snapshot) = registry {
        let col = ColumnMap::resolve(&snapshot.headers).person.unwrap_or(0);
        for row in &snapshot.rows {
            let name = row.cell(col).trim();
            if !name.is_empty() {
                registry_names
                    .entry(tr_lower(name))
                    .or_insert_with(|| name.to_string());
            }
        }
    }

    let keys = overlap(roster_names.keys(), registry_names.keys());
    let display = |keys: Vec<String>, names: &HashMap<String, String>| -> Vec<String> {
        let mut out: Vec<String> = keys.iter().filter_map(|k| names.get(k).cloned()).collect();
        crate::text::tr_sort(&mut out);
        out
    };
    ExtrasReconciliation {
        unregistered: display(keys.only_a, &roster_names),
        idle: display(keys.only_b, &registry_names),
        registered: display(keys.common, &roster_names),
    }
}

/// Date format used in every sheet.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

pub struct Roster<S: SheetStore> {
    store: S,
    cache: SnapshotCache,
    names: SheetNames,
}

impl<S: SheetStore> Roster<S> {
    pub fn new(store: S, names: SheetNames) -> Self {
        Roster {
            store,
            cache: SnapshotCache::new(),
            names,
        }
    }

    pub fn names(&self) -> &SheetNames {
        &self.names
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access. Cached snapshots are not refreshed by changes
    /// made this way.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Editable sheet names.
    pub fn list_sheets(&self) -> RosterResult<Vec<String>> {
        let upstream = self.store.list_sheets()?;
        Ok(visible_sheets(&upstream, &self.names.pinned()))
    }

    /// Cached snapshot of `name`, fetched on a miss.
    pub fn sheet(&mut self, name: &str) -> RosterResult<Arc<Snapshot>> {
        if let Some(snapshot) = self.cache.get(name) {
            return Ok(snapshot);
        }
        let data = self.store.fetch_sheet(name)?;
        Ok(self.cache.insert(name, data))
    }

    /// Like [`Roster::sheet`], with a missing sheet as a state instead of an error.
    pub fn sheet_state(&mut self, name: &str) -> RosterResult<SheetState> {
        match self.sheet(name) {
            Ok(snapshot) => Ok(SheetState::Ready(snapshot)),
            Err(RosterError::Store(StoreError::SheetNotFound(_))) => Ok(SheetState::Missing),
            Err(e) => Err(e),
        }
    }

    /// Drop the cached copy of `name` and read it again.
    pub fn refresh(&mut self, name: &str) -> RosterResult<Arc<Snapshot>> {
        self.cache.invalidate(name);
        self.sheet(name)
    }

    /// Parsed records of the primary roster.
    pub fn records(&mut self) -> RosterResult<Vec<Record>> {
        let name = self.names.roster.clone();
        Ok(self.sheet(&name)?.records())
    }

    fn current(&self, sheet: &str, generation: u64, index: usize) -> RosterResult<Arc<Snapshot>> {
        match self.cache.get(sheet) {
            Some(snapshot) if snapshot.generation == generation => Ok(snapshot),
            _ => {
                log::warn!(
                    "Refusing write to '{}' row {}: generation {} is no longer current",
                    sheet,
                    index,
                    generation
                );
                Err(RosterError::StaleSnapshot {
                    sheet: sheet.to_string(),
                    index,
                })
            }
        }
    }

    fn current_row(&self, row: &RowRef) -> RosterResult<Arc<Snapshot>> {
        let snapshot = self.current(&row.sheet, row.generation, row.index)?;
        if snapshot.row(row.index).is_none() {
            return Err(SyncError::OutOfRange {
                sheet: row.sheet.clone(),
                index: row.index,
            }
            .into());
        }
        Ok(snapshot)
    }

    // ========================================================================
    // Positional writes
    // ========================================================================

    pub fn update_cell(&mut self, row: &RowRef, col: usize, value: &str) -> RosterResult<()> {
        self.current_row(row)?;
        self.store.update_cell(&row.sheet, row.index, col, value)?;
        self.cache.invalidate(&row.sheet);
        log::info!("Updated '{}' row {} col {}", row.sheet, row.index, col);
        Ok(())
    }

    pub fn insert_row_after(&mut self, target: &InsertTarget, values: &[String]) -> RosterResult<()> {
        let anchor = target.slot.anchor().unwrap_or(0);
        self.current(&target.sheet, target.generation, anchor)?;
        self.store
            .insert_row_after(&target.sheet, target.slot.wire_value(), values)?;
        self.cache.invalidate(&target.sheet);
        log::info!("Inserted row into '{}' at {:?}", target.sheet, target.slot);
        Ok(())
    }

    /// Delete a row. Deleting from the primary roster also reports whether
    /// the row was its person's last assignment.
    pub fn delete_row(&mut self, row: &RowRef) -> RosterResult<DeleteOutcome> {
        let snapshot = self.current_row(row)?;
        let on_roster = row.sheet == self.names.roster;
        let last = if on_roster {
            last_assignment(&snapshot, row.index)
        } else {
            None
        };

        self.store.delete_row(&row.sheet, row.index)?;
        self.cache.invalidate(&row.sheet);
        if on_roster {
            self.cache.invalidate(&self.names.holding);
        }
        if let Some(last) = &last {
            log::info!("'{}' has no assignment left after leaving '{}'", last.person, last.play);
        }
        Ok(DeleteOutcome {
            last_assignment: last,
        })
    }

    // ========================================================================
    // Appends
    // ========================================================================

    pub fn append_row(&mut self, sheet: &str, values: &[String]) -> RosterResult<()> {
        self.store.append_row(sheet, values)?;
        self.cache.invalidate(sheet);
        Ok(())
    }

    /// Create `name` with `headers` when the store does not have it.
    /// Returns whether the sheet was created.
    pub fn ensure_sheet(&mut self, name: &str, headers: &[&str]) -> RosterResult<bool> {
        if let SheetState::Ready(_) = self.sheet_state(name)? {
            return Ok(false);
        }
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        self.append_row(name, &headers)?;
        log::info!("Created sheet '{}'", name);
        Ok(true)
    }

    /// Add `person` to the holding list dated today.
    pub fn move_to_holding(&mut self, person: &str, category: &str) -> RosterResult<()> {
        let today = chrono::Local::now().date_naive();
        self.move_to_holding_on(person, category, today)
    }

    pub fn move_to_holding_on(&mut self, person: &str, category: &str, date: NaiveDate) -> RosterResult<()> {
        let holding = self.names.holding.clone();
        self.ensure_sheet(&holding, HOLDING_HEADERS)?;
        let row = vec![
            person.trim().to_string(),
            category.trim().to_string(),
            format_date(date),
            String::new(),
            String::new(),
        ];
        self.append_row(&holding, &row)
    }

    /// Append every clipboard row in order. Failures do not stop the batch.
    pub fn paste(&mut self, sheet: &str, clipboard: &Clipboard) -> PasteReport {
        let results: Vec<Result<(), StoreError>> = clipboard
            .rows
            .iter()
            .map(|row| self.store.append_row(sheet, row))
            .collect();
        let report = PasteReport { results };
        if report.succeeded() > 0 {
            self.cache.invalidate(sheet);
        }
        if !report.is_complete() {
            log::warn!(
                "Pasted {} of {} rows into '{}'",
                report.succeeded(),
                report.results.len(),
                sheet
            );
        }
        report
    }

    // ========================================================================
    // Whole-sheet operations
    // ========================================================================

    fn play_row_count(&mut self, sheet: &str, play: &str) -> RosterResult<usize> {
        Ok(match self.sheet_state(sheet)? {
            SheetState::Ready(snapshot) => snapshot.records().iter().filter(|r| r.play == play).count(),
            SheetState::Missing => 0,
        })
    }

    /// Move every roster row of `play` into the archive.
    ///
    /// Archiving a play that has no roster rows moves nothing, so a retry
    /// after a partial failure is safe.
    pub fn archive_play(&mut self, play: &str) -> RosterResult<ArchiveOutcome> {
        let play = play.trim();
        if play.is_empty() {
            return Err(RosterError::EmptyPlay);
        }
        let roster = self.names.roster.clone();
        let archive = self.names.archive.clone();
        let roster_before = self.play_row_count(&roster, play)?;
        let archived_before = self.play_row_count(&archive, play)?;

        let result = self.store.archive_play(play);
        self.cache.invalidate(&roster);
        self.cache.invalidate(&archive);

        let moved = match result {
            Ok(moved) => moved,
            Err(e) => {
                // Either sheet may have changed before the store gave up.
                let removed = self
                    .play_row_count(&roster, play)
                    .map(|after| roster_before.saturating_sub(after))
                    .unwrap_or(0);
                let archived = self
                    .play_row_count(&archive, play)
                    .map(|after| after.saturating_sub(archived_before))
                    .unwrap_or(0);
                if removed == 0 && archived == 0 {
                    return Err(e.into());
                }
                log::warn!(
                    "Archive of '{}' failed midway: {} rows removed, {} rows archived",
                    play,
                    removed,
                    archived
                );
                return Err(RosterError::ArchivePartial {
                    play: play.to_string(),
                    removed,
                    archived,
                    source: e,
                });
            }
        };

        let warning = match self.play_row_count(&roster, play) {
            Ok(0) => None,
            Ok(remaining) => Some(ArchiveWarning::Unverified { remaining }),
            Err(e) => Some(ArchiveWarning::VerifyFailed(e.to_string())),
        };
        if let Some(w) = &warning {
            log::warn!("Archive of '{}' not confirmed: {:?}", play, w);
        }
        log::info!("Archived '{}' ({} rows)", play, moved);
        Ok(ArchiveOutcome { moved, warning })
    }

    /// Register roster extras missing from the extras list.
    pub fn sync_extras(&mut self) -> RosterResult<usize> {
        let added = self.store.sync_extras()?;
        self.cache.invalidate(&self.names.extras);
        log::info!("Extras sync added {} names", added);
        Ok(added)
    }

    pub fn reconcile_extras(&mut self) -> RosterResult<ExtrasReconciliation> {
        let records = self.records()?;
        let extras = self.names.extras.clone();
        let registry = match self.sheet_state(&extras)? {
            SheetState::Ready(snapshot) => Some(snapshot),
            SheetState::Missing => None,
        };
        Ok(reconcile_extras(registry.as_deref(), &records))
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    pub fn clear_notifications(&mut self) -> RosterResult<()> {
        self.store.clear_notifications()?;
        self.cache.invalidate(&self.names.notifications);
        Ok(())
    }

    pub fn delete_oldest_notifications(&mut self) -> RosterResult<()> {
        self.store.delete_oldest_notifications()?;
        self.cache.invalidate(&self.names.notifications);
        Ok(())
    }

    /// Delete the `displayed`-th entry of the newest-first feed.
    pub fn delete_notification(&mut self, displayed: usize) -> RosterResult<()> {
        let name = self.names.notifications.clone();
        let snapshot = self.sheet(&name)?;
        let row = display_to_original(snapshot.len(), displayed)
            .and_then(|index| snapshot.row_ref(index))
            .ok_or(SyncError::OutOfRange {
                sheet: name,
                index: displayed,
            })?;
        self.delete_row(&row)?;
        Ok(())
    }
}
