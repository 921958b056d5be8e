//! Integration tests for the roster toolkit
//!
//! Drives the public API end to end against the in-memory store: parsing
//! and aggregation of a small roster, positional edits through the mutation
//! layer, archive, extras sync and the notification feed.

use roster_toolkit::aggregate::{compare_plays, group_by_person, group_by_play, overlap};
use roster_toolkit::config::SheetNames;
use roster_toolkit::mutation::{ArchiveWarning, Roster, RosterError};
use roster_toolkit::notifications::{feed, NoticeKind, SeenSet};
use roster_toolkit::parser::parse_records;
use roster_toolkit::sheet::{SheetData, NOTIFICATION_HEADERS};
use roster_toolkit::store::{MemoryStore, SheetStore, StoreError, StoreOp, StoreResult};
use roster_toolkit::sync::{insert_target, last_assignment, ClickModifier, Clipboard, InsertSlot, Selection};

fn cells(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn roster_data() -> SheetData {
    SheetData::new(
        cells(&["Oyun Adı", "Kategori", "Görev", "Kişi"]),
        vec![
            cells(&["Hamlet", "Oyuncu", "Hamlet", "Ahmet"]),
            cells(&["Hamlet", "Figüran", "Asker", "Ahmet, Mehmet"]),
            cells(&["Kral Lear", "Oyuncu", "Lear", "Zeynep"]),
            cells(&["Kral Lear", "FİGÜRAN", "Şövalye", "Ayşe"]),
            cells(&["Pinokyo (Ç)", "Oyuncu", "Pinokyo", "Zeynep"]),
            cells(&["", "Oyuncu", "Kayıp", "Can"]),
        ],
    )
}

fn roster() -> Roster<MemoryStore> {
    let names = SheetNames::default();
    let store = MemoryStore::new(names.clone()).with_sheet(&names.roster, roster_data());
    Roster::new(store, names)
}

#[test]
fn test_hamlet_scenario() {
    let data = roster_data();
    let records = parse_records(&data.headers, &data.rows);
    assert_eq!(records.len(), 5);

    let plays = group_by_play(&records);
    let hamlet = plays.iter().find(|p| p.name == "Hamlet").unwrap();
    assert_eq!(hamlet.person_count, 2);
    assert_eq!(hamlet.record_count, 2);
    assert_eq!(hamlet.categories, vec!["Figüran", "Oyuncu"]);

    let people = group_by_person(&records);
    assert_eq!(people.iter().filter(|p| p.name == "Mehmet").count(), 1);
    assert_eq!(people[0].plays.len(), 2);
}

#[test]
fn test_overlap_partition_is_exhaustive_and_disjoint() {
    let a = ["Hamlet", "Kral Lear", "Martı"];
    let b = ["Martı", "Pinokyo (Ç)"];
    let ov = overlap(a, b);
    assert_eq!(ov.total(), 4);
    assert_eq!(ov.common, vec!["Martı"]);
    for name in &ov.only_a {
        assert!(!ov.only_b.contains(name) && !ov.common.contains(name));
    }
}

#[test]
fn test_compare_plays_carries_roles() {
    let data = roster_data();
    let records = parse_records(&data.headers, &data.rows);
    let cmp = compare_plays(&records, "Kral Lear", "Pinokyo (Ç)");
    assert_eq!(cmp.common.len(), 1);
    assert_eq!(cmp.common[0].name, "Zeynep");
    assert_eq!(cmp.common[0].roles_a, vec!["Lear"]);
    assert_eq!(cmp.common[0].roles_b, vec!["Pinokyo"]);
    assert_eq!(cmp.only_a[0].name, "Ayşe");
}

#[test]
fn test_deleting_only_mehmet_row_flags_last_assignment() {
    let mut r = roster();
    let name = r.names().roster.clone();
    let snapshot = r.sheet(&name).unwrap();
    let flagged = last_assignment(&snapshot, 1);
    // The person cell is "Ahmet, Mehmet": the cell as a whole appears once.
    assert_eq!(flagged.map(|l| l.person), Some("Ahmet, Mehmet".to_string()));

    r.store_mut().put_sheet(
        &name,
        SheetData::new(
            cells(&["Oyun", "Kategori", "Görev", "Kişi"]),
            vec![
                cells(&["Hamlet", "Oyuncu", "Hamlet", "Ahmet"]),
                cells(&["Hamlet", "Figüran", "Asker", "Mehmet"]),
            ],
        ),
    );
    let snapshot = r.refresh(&name).unwrap();
    let outcome = r.delete_row(&snapshot.row_ref(1).unwrap()).unwrap();
    let last = outcome.last_assignment.unwrap();
    assert_eq!(last.person, "Mehmet");
    assert_eq!(last.play, "Hamlet");
}

#[test]
fn test_insert_after_then_delete_without_refetch_is_rejected() {
    let mut r = roster();
    let name = r.names().roster.clone();
    let snapshot = r.sheet(&name).unwrap();

    let target = insert_target(&snapshot, InsertSlot::After(3)).unwrap();
    r.insert_row_after(&target, &cells(&["Kral Lear", "Oyuncu", "Soytarı", "Can"]))
        .unwrap();

    let stale = snapshot.row_ref(3).unwrap();
    match r.delete_row(&stale) {
        Err(RosterError::StaleSnapshot { index, .. }) => assert_eq!(index, 3),
        other => panic!("expected stale snapshot, got {:?}", other),
    }

    // After a re-read the row below the inserted one is addressable again.
    let fresh = r.sheet(&name).unwrap();
    assert_eq!(fresh.rows[4].cell(2), "Soytarı");
    r.delete_row(&fresh.row_ref(4).unwrap()).unwrap();
    assert_eq!(r.sheet(&name).unwrap().len(), 6);
}

#[test]
fn test_copy_then_paste_with_partial_failure() {
    let mut r = roster();
    let name = r.names().roster.clone();
    let snapshot = r.sheet(&name).unwrap();

    let mut selection = Selection::new();
    selection.click(2, ClickModifier::None);
    selection.click(0, ClickModifier::Extend);
    let clipboard = Clipboard::copy(&selection, &snapshot);
    assert_eq!(clipboard.len(), 3);
    assert_eq!(clipboard.rows[0][3], "Ahmet");

    r.store_mut().fail_after(StoreOp::AppendRow, 2);
    let report = r.paste(&name, &clipboard);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed().len(), 1);
    assert_eq!(report.failed()[0].0, 2);
    assert_eq!(r.sheet(&name).unwrap().len(), 8);
}

#[test]
fn test_archive_partial_failure_then_retry() {
    let mut r = roster();
    let archive = r.names().archive.clone();
    r.store_mut().fail_archive_midway();

    match r.archive_play("Hamlet") {
        Err(RosterError::ArchivePartial { archived, play, .. }) => {
            assert_eq!(archived, 2);
            assert_eq!(play, "Hamlet");
        }
        other => panic!("expected partial archive, got {:?}", other),
    }

    // Rows were copied but not removed, so the retry moves them again.
    let outcome = r.archive_play("Hamlet").unwrap();
    assert_eq!(outcome.moved, 2);
    assert_eq!(outcome.warning, None);
    assert_eq!(r.sheet(&archive).unwrap().len(), 4);

    let again = r.archive_play("Hamlet").unwrap();
    assert_eq!(again.moved, 0);
}

/// What the wrapped store does when asked to archive.
enum ArchiveScript {
    /// Report two moved rows without touching either sheet
    ClaimSuccess,
    /// Drop the play's roster rows, then fail before writing the archive
    DropThenFail,
}

struct ScriptedStore {
    inner: MemoryStore,
    roster: String,
    script: ArchiveScript,
}

impl SheetStore for ScriptedStore {
    fn list_sheets(&self) -> StoreResult<Vec<String>> {
        self.inner.list_sheets()
    }
    fn fetch_sheet(&self, name: &str) -> StoreResult<SheetData> {
        self.inner.fetch_sheet(name)
    }
    fn update_cell(&mut self, s: &str, row: usize, col: usize, v: &str) -> StoreResult<()> {
        self.inner.update_cell(s, row, col, v)
    }
    fn append_row(&mut self, s: &str, values: &[String]) -> StoreResult<()> {
        self.inner.append_row(s, values)
    }
    fn insert_row_after(&mut self, s: &str, after: i64, values: &[String]) -> StoreResult<()> {
        self.inner.insert_row_after(s, after, values)
    }
    fn delete_row(&mut self, s: &str, row: usize) -> StoreResult<()> {
        self.inner.delete_row(s, row)
    }
    fn archive_play(&mut self, play: &str) -> StoreResult<usize> {
        match self.script {
            ArchiveScript::ClaimSuccess => Ok(2),
            ArchiveScript::DropThenFail => {
                let mut data = self.inner.fetch_sheet(&self.roster)?;
                data.rows.retain(|row| row.first().map(String::as_str) != Some(play));
                self.inner.put_sheet(&self.roster, data);
                Err(StoreError::rejected(500, "archive write failed"))
            }
        }
    }
    fn sync_extras(&mut self) -> StoreResult<usize> {
        self.inner.sync_extras()
    }
    fn clear_notifications(&mut self) -> StoreResult<()> {
        self.inner.clear_notifications()
    }
    fn delete_oldest_notifications(&mut self) -> StoreResult<()> {
        self.inner.delete_oldest_notifications()
    }
}

fn scripted(script: ArchiveScript) -> Roster<ScriptedStore> {
    let names = SheetNames::default();
    let inner = MemoryStore::new(names.clone()).with_sheet(&names.roster, roster_data());
    let store = ScriptedStore {
        inner,
        roster: names.roster.clone(),
        script,
    };
    Roster::new(store, names)
}

#[test]
fn test_archive_reports_unverified_when_rows_remain() {
    let mut r = scripted(ArchiveScript::ClaimSuccess);
    let outcome = r.archive_play("Hamlet").unwrap();
    assert_eq!(outcome.warning, Some(ArchiveWarning::Unverified { remaining: 2 }));
}

#[test]
fn test_archive_failure_after_roster_rows_dropped_is_partial() {
    let mut r = scripted(ArchiveScript::DropThenFail);
    match r.archive_play("Hamlet") {
        Err(RosterError::ArchivePartial {
            removed, archived, ..
        }) => {
            assert_eq!(removed, 2);
            assert_eq!(archived, 0);
        }
        other => panic!("expected partial archive, got {:?}", other),
    }
    let name = r.names().roster.clone();
    assert_eq!(r.sheet(&name).unwrap().len(), 4);
}

#[test]
fn test_sync_extras_registers_each_extra_once() {
    let mut r = roster();
    let extras = r.names().extras.clone();
    assert_eq!(r.sync_extras().unwrap(), 3);
    let registry = r.sheet(&extras).unwrap();
    let names: Vec<&str> = registry.rows.iter().map(|row| row.cell(0)).collect();
    assert_eq!(names, vec!["Ahmet", "Mehmet", "Ayşe"]);
    assert_eq!(registry.rows[2].cell(1), "Kral Lear");
    assert_eq!(r.sync_extras().unwrap(), 0);

    let rec = r.reconcile_extras().unwrap();
    assert!(rec.unregistered.is_empty());
    assert_eq!(rec.registered.len(), 3);
}

#[test]
fn test_sheet_listing_hides_legacy_and_pins_holding() {
    let names = SheetNames::default();
    let store = MemoryStore::new(names.clone())
        .with_sheet(&names.roster, roster_data())
        .with_sheet("__backup", SheetData::default())
        .with_sheet(&names.notifications, SheetData::default());
    let r = Roster::new(store, names.clone());
    assert_eq!(
        r.list_sheets().unwrap(),
        vec![names.roster.clone(), names.holding.clone(), names.archive.clone()]
    );
}

#[test]
fn test_notification_feed_and_deletion() {
    let names = SheetNames::default();
    let headers = cells(NOTIFICATION_HEADERS);
    let rows = (1..=3)
        .map(|day| cells(&[format!("0{}.03.2025", day).as_str(), "EKLENDİ", "Hamlet", "Ahmet", "Hamlet", ""]))
        .collect();
    let store = MemoryStore::new(names.clone())
        .with_sheet(&names.roster, roster_data())
        .with_sheet(&names.notifications, SheetData::new(headers, rows));
    let mut r = Roster::new(store, names.clone());

    let snapshot = r.sheet(&names.notifications).unwrap();
    let notices = feed(&snapshot);
    assert_eq!(notices[0].date, "03.03.2025");
    assert_eq!(notices[0].kind, NoticeKind::Added);

    let mut seen = SeenSet::new();
    seen.mark_seen(notices[0].index);
    assert_eq!(seen.unread_count(snapshot.len()), 2);

    r.delete_notification(0).unwrap();
    let left = r.sheet(&names.notifications).unwrap();
    assert_eq!(left.len(), 2);
    assert_eq!(left.rows[1].cell(0), "02.03.2025");

    r.clear_notifications().unwrap();
    assert!(r.sheet(&names.notifications).unwrap().is_empty());
}
