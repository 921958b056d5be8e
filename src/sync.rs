//! Row-index synchronization.
//!
//! The sheet backend has no row identifiers, only positions. Every view in
//! this module (search results, play groups, pages, reversed feeds) keeps
//! handing out the fetch-time index of each row so that the mutation layer
//! always addresses the complete sheet, never a filtered or paged slice.

use crate::sheet::{RowRef, SheetRow, Snapshot};
use crate::text::{tr_compare, tr_contains, tr_lower};
use std::collections::BTreeSet;
use thiserror::Error;

/// Rows shown per page of a flat sheet.
pub const ROWS_PER_PAGE: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("row {index} is not part of the snapshot of '{sheet}'")]
    OutOfRange { sheet: String, index: usize },
    #[error("row {index} of '{sheet}' no longer matches the snapshot")]
    Mismatch { sheet: String, index: usize },
}

/// Absolute index of a displayed row.
///
/// The row must still sit at its fetch-time index in `snapshot` with the
/// same cells; a structurally different row there means the display was
/// built from another fetch.
pub fn resolve_absolute_index(row: &SheetRow, snapshot: &Snapshot) -> Result<usize, SyncError> {
    match snapshot.row(row.index) {
        Some(current) if current.cells == row.cells => Ok(row.index),
        Some(_) => Err(SyncError::Mismatch {
            sheet: snapshot.name.clone(),
            index: row.index,
        }),
        None => Err(SyncError::OutOfRange {
            sheet: snapshot.name.clone(),
            index: row.index,
        }),
    }
}

/// [`resolve_absolute_index`] packaged as a [`RowRef`] for the mutation layer.
pub fn resolve_ref(row: &SheetRow, snapshot: &Snapshot) -> Result<RowRef, SyncError> {
    let index = resolve_absolute_index(row, snapshot)?;
    snapshot.row_ref(index).ok_or(SyncError::OutOfRange {
        sheet: snapshot.name.clone(),
        index,
    })
}

/// Sheet index of the `displayed`-th entry of a newest-first view.
pub fn display_to_original(total: usize, displayed: usize) -> Option<usize> {
    (displayed < total).then(|| total - 1 - displayed)
}

/// Inverse of [`display_to_original`].
pub fn original_to_display(total: usize, original: usize) -> Option<usize> {
    display_to_original(total, original)
}

// ============================================================================
// Insert cursor
// ============================================================================

/// Gap between two rows where a new row can be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertSlot {
    /// Above the first row
    Top,
    /// Below the row with this absolute index
    After(usize),
}

impl InsertSlot {
    /// The gap directly above row `index`.
    pub fn before(index: usize) -> Self {
        match index {
            0 => InsertSlot::Top,
            i => InsertSlot::After(i - 1),
        }
    }

    /// `afterRow` value sent to the backend.
    pub fn wire_value(self) -> i64 {
        match self {
            InsertSlot::Top => -1,
            InsertSlot::After(i) => i as i64,
        }
    }

    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            -1 => Some(InsertSlot::Top),
            v => usize::try_from(v).ok().map(InsertSlot::After),
        }
    }

    /// Index of the row above the gap, if any.
    pub fn anchor(self) -> Option<usize> {
        match self {
            InsertSlot::Top => None,
            InsertSlot::After(i) => Some(i),
        }
    }
}

/// An insert slot bound to the snapshot it was chosen in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertTarget {
    pub sheet: String,
    pub generation: u64,
    pub slot: InsertSlot,
}

/// Bind `slot` to `snapshot`. `After` must name a row of the snapshot.
pub fn insert_target(snapshot: &Snapshot, slot: InsertSlot) -> Result<InsertTarget, SyncError> {
    if let InsertSlot::After(index) = slot {
        if snapshot.row(index).is_none() {
            return Err(SyncError::OutOfRange {
                sheet: snapshot.name.clone(),
                index,
            });
        }
    }
    Ok(InsertTarget {
        sheet: snapshot.name.clone(),
        generation: snapshot.generation,
        slot,
    })
}

/// At most one open insert slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertCursor {
    active: Option<InsertSlot>,
}

impl InsertCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `slot`, or close it when it is already the open one.
    pub fn toggle(&mut self, slot: InsertSlot) -> Option<InsertSlot> {
        self.active = if self.active == Some(slot) { None } else { Some(slot) };
        self.active
    }

    pub fn toggle_after(&mut self, index: usize) -> Option<InsertSlot> {
        self.toggle(InsertSlot::After(index))
    }

    pub fn toggle_before(&mut self, index: usize) -> Option<InsertSlot> {
        self.toggle(InsertSlot::before(index))
    }

    pub fn active(&self) -> Option<InsertSlot> {
        self.active
    }

    pub fn is_after(&self, index: usize) -> bool {
        self.active == Some(InsertSlot::After(index))
    }

    pub fn is_before(&self, index: usize) -> bool {
        self.active == Some(InsertSlot::before(index))
    }

    pub fn close(&mut self) {
        self.active = None;
    }
}

// ============================================================================
// Selection and clipboard
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClickModifier {
    #[default]
    None,
    /// Ctrl/Cmd click
    Toggle,
    /// Shift click
    Extend,
}

/// Selected rows by absolute index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    indices: BTreeSet<usize>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn click(&mut self, index: usize, modifier: ClickModifier) {
        match modifier {
            ClickModifier::Toggle => {
                if !self.indices.remove(&index) {
                    self.indices.insert(index);
                }
            }
            ClickModifier::Extend if !self.indices.is_empty() => {
                let anchor = self.indices.iter().next_back().copied().unwrap_or(index);
                let (lo, hi) = if anchor <= index { (anchor, index) } else { (index, anchor) };
                self.indices = (lo..=hi).collect();
            }
            _ => {
                let only_this = self.indices.len() == 1 && self.indices.contains(&index);
                self.indices.clear();
                if !only_this {
                    self.indices.insert(index);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Selected indices in ascending order.
    pub fn indices(&self) -> Vec<usize> {
        self.indices.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Copied row values, detached from any snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clipboard {
    pub rows: Vec<Vec<String>>,
}

impl Clipboard {
    /// Copy the selected rows in ascending sheet order. Indices missing from
    /// the snapshot are skipped.
    pub fn copy(selection: &Selection, snapshot: &Snapshot) -> Self {
        let rows = selection
            .indices()
            .into_iter()
            .filter_map(|i| snapshot.row(i))
            .map(|row| row.cells.clone())
            .collect();
        Clipboard { rows }
    }

    /// Rows pasted from a spreadsheet: one record per row, tab-separated
    /// cells. Quoted cells may hold tabs and line breaks. Blank rows are
    /// dropped.
    pub fn from_tsv(text: &str) -> csv::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Clipboard { rows })
    }

    /// Tab-separated text, quoting cells that contain tabs, quotes or line
    /// breaks the way spreadsheets do.
    pub fn to_tsv(&self) -> csv::Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_writer(Vec::new());
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        Ok(text.trim_end_matches('\n').to_string())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// Last assignment
// ============================================================================

/// A person whose only roster row is about to be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastAssignment {
    pub person: String,
    pub play: String,
}

/// Whether deleting row `index` removes the last row naming its person.
///
/// The person column is the header `kişi`, the play column the first header
/// containing `oyun`. Person cells compare trimmed and case-folded.
pub fn last_assignment(snapshot: &Snapshot, index: usize) -> Option<LastAssignment> {
    let person_col = snapshot.header_position(|h| h == "kişi")?;
    let play_col = snapshot.header_position(|h| h.contains("oyun"));
    let row = snapshot.row(index)?;
    let person = row.cell(person_col).trim();
    if person.is_empty() {
        return None;
    }

    let key = tr_lower(person);
    let occurrences = snapshot
        .rows
        .iter()
        .filter(|r| tr_lower(r.cell(person_col).trim()) == key)
        .count();
    if occurrences != 1 {
        return None;
    }

    Some(LastAssignment {
        person: person.to_string(),
        play: play_col
            .map(|col| row.cell(col).trim().to_string())
            .unwrap_or_default(),
    })
}

// ============================================================================
// Sheet view
// ============================================================================

/// Rows of one play in a grouped view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayGroup<'a> {
    pub name: String,
    pub rows: Vec<&'a SheetRow>,
}

/// Filtered view over a snapshot. Rows keep their absolute indices.
#[derive(Debug, Clone)]
pub struct SheetView<'a> {
    snapshot: &'a Snapshot,
    rows: Vec<&'a SheetRow>,
}

impl<'a> SheetView<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        SheetView {
            snapshot,
            rows: snapshot.rows.iter().collect(),
        }
    }

    /// Rows with any cell containing `query`. A blank query keeps every row.
    pub fn search(snapshot: &'a Snapshot, query: &str) -> Self {
        let query = query.trim();
        let rows = snapshot
            .rows
            .iter()
            .filter(|row| query.is_empty() || row.cells.iter().any(|c| tr_contains(c, query)))
            .collect();
        SheetView { snapshot, rows }
    }

    pub fn snapshot(&self) -> &'a Snapshot {
        self.snapshot
    }

    pub fn rows(&self) -> &[&'a SheetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Absolute index of the `displayed`-th row of this view.
    pub fn absolute_index(&self, displayed: usize) -> Option<usize> {
        self.rows.get(displayed).map(|row| row.index)
    }

    pub fn total_pages(&self) -> usize {
        self.rows.len().div_ceil(ROWS_PER_PAGE).max(1)
    }

    /// Page `page` (numbered from 1). Out-of-range pages are empty.
    pub fn page(&self, page: usize) -> &[&'a SheetRow] {
        let start = page.saturating_sub(1).saturating_mul(ROWS_PER_PAGE);
        if page == 0 || start >= self.rows.len() {
            return &[];
        }
        let end = (start + ROWS_PER_PAGE).min(self.rows.len());
        &self.rows[start..end]
    }

    /// Rows grouped by their trimmed first cell, groups in collation order.
    pub fn play_groups(&self) -> Vec<PlayGroup<'a>> {
        let mut groups: Vec<PlayGroup<'a>> = Vec::new();
        for row in &self.rows {
            let name = row.cell(0).trim();
            match groups.iter_mut().find(|g| g.name == name) {
                Some(group) => group.rows.push(*row),
                None => groups.push(PlayGroup {
                    name: name.to_string(),
                    rows: vec![*row],
                }),
            }
        }
        groups.sort_by(|a, b| tr_compare(&a.name, &b.name));
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::SheetData;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn snapshot() -> Snapshot {
        Snapshot::new(
            "BÜTÜN OYUNLAR",
            3,
            SheetData::new(
                cells(&["Oyun Adı", "Kategori", "Görev", "Kişi"]),
                vec![
                    cells(&["Hamlet", "Oyuncu", "Kral", "Ahmet"]),
                    cells(&["Hamlet", "Figüran", "-", "Mehmet"]),
                    cells(&["Çehov", "Oyuncu", "Vanya", "AHMET "]),
                    cells(&["Bahar", "Oyuncu", "", ""]),
                ],
            ),
        )
    }

    #[test]
    fn test_resolve_absolute_index() {
        let snap = snapshot();
        let row = snap.rows[2].clone();
        assert_eq!(resolve_absolute_index(&row, &snap), Ok(2));
        assert_eq!(resolve_ref(&row, &snap).unwrap().generation, 3);

        let moved = SheetRow { index: 1, cells: row.cells.clone() };
        assert!(matches!(
            resolve_absolute_index(&moved, &snap),
            Err(SyncError::Mismatch { index: 1, .. })
        ));
        let gone = SheetRow { index: 9, cells: Vec::new() };
        assert!(matches!(
            resolve_absolute_index(&gone, &snap),
            Err(SyncError::OutOfRange { index: 9, .. })
        ));
    }

    #[test]
    fn test_display_mapping() {
        assert_eq!(display_to_original(5, 0), Some(4));
        assert_eq!(display_to_original(5, 4), Some(0));
        assert_eq!(display_to_original(5, 5), None);
        assert_eq!(display_to_original(0, 0), None);
        assert_eq!(original_to_display(5, display_to_original(5, 2).unwrap()), Some(2));
    }

    #[test]
    fn test_insert_cursor_after_and_before_share_slot() {
        let mut cursor = InsertCursor::new();
        assert_eq!(cursor.toggle_after(3), Some(InsertSlot::After(3)));
        assert!(cursor.is_after(3));
        assert!(cursor.is_before(4));
        assert!(!cursor.is_before(3));
        // Same gap reached from the row below closes it.
        assert_eq!(cursor.toggle_before(4), None);
        assert_eq!(cursor.toggle_before(0), Some(InsertSlot::Top));
        assert!(cursor.is_before(0));
        cursor.close();
        assert_eq!(cursor.active(), None);
    }

    #[test]
    fn test_insert_slot_wire_value() {
        assert_eq!(InsertSlot::Top.wire_value(), -1);
        assert_eq!(InsertSlot::After(7).wire_value(), 7);
        assert_eq!(InsertSlot::from_wire(-1), Some(InsertSlot::Top));
        assert_eq!(InsertSlot::from_wire(2), Some(InsertSlot::After(2)));
        assert_eq!(InsertSlot::from_wire(-5), None);
    }

    #[test]
    fn test_insert_target_checks_anchor() {
        let snap = snapshot();
        let target = insert_target(&snap, InsertSlot::After(3)).unwrap();
        assert_eq!(target.generation, 3);
        assert!(insert_target(&snap, InsertSlot::Top).is_ok());
        assert!(insert_target(&snap, InsertSlot::After(4)).is_err());
    }

    #[test]
    fn test_selection_clicks() {
        let mut sel = Selection::new();
        sel.click(4, ClickModifier::None);
        assert_eq!(sel.indices(), vec![4]);
        sel.click(4, ClickModifier::None);
        assert!(sel.is_empty());

        sel.click(2, ClickModifier::Toggle);
        sel.click(6, ClickModifier::Toggle);
        sel.click(2, ClickModifier::Toggle);
        assert_eq!(sel.indices(), vec![6]);

        sel.click(2, ClickModifier::Toggle);
        sel.click(9, ClickModifier::Extend);
        assert_eq!(sel.indices(), vec![6, 7, 8, 9]);
        sel.click(7, ClickModifier::Extend);
        assert_eq!(sel.indices(), vec![7, 8, 9]);

        sel.click(1, ClickModifier::None);
        assert_eq!(sel.indices(), vec![1]);
        sel.clear();
        sel.click(5, ClickModifier::Extend);
        assert_eq!(sel.indices(), vec![5]);
    }

    #[test]
    fn test_clipboard_copies_in_sheet_order() {
        let snap = snapshot();
        let mut sel = Selection::new();
        sel.click(2, ClickModifier::Toggle);
        sel.click(0, ClickModifier::Toggle);
        sel.click(42, ClickModifier::Toggle);
        let clip = Clipboard::copy(&sel, &snap);
        assert_eq!(clip.len(), 2);
        assert_eq!(clip.rows[0][3], "Ahmet");
        let tsv = clip.to_tsv().unwrap();
        assert_eq!(tsv, "Hamlet\tOyuncu\tKral\tAhmet\nÇehov\tOyuncu\tVanya\tAHMET ");
        assert_eq!(Clipboard::from_tsv(&tsv).unwrap(), clip);
    }

    #[test]
    fn test_clipboard_keeps_tabs_and_newlines_inside_cells() {
        let clip = Clipboard {
            rows: vec![
                vec!["Hamlet".to_string(), "Oyuncu".to_string(), "Kral\tHayalet".to_string(), "Ahmet".to_string()],
                vec!["Lear".to_string(), "Figüran".to_string(), "Asker\nUşak".to_string(), "Ayşe".to_string()],
            ],
        };
        let tsv = clip.to_tsv().unwrap();
        assert_eq!(tsv.lines().count(), 3);
        let pasted = Clipboard::from_tsv(&tsv).unwrap();
        assert_eq!(pasted, clip);
        assert_eq!(pasted.rows[1][2], "Asker\nUşak");
    }

    #[test]
    fn test_clipboard_from_spreadsheet_text() {
        let clip = Clipboard::from_tsv("Hamlet\tOyuncu\r\n\r\n  \nLear\tFigüran\tAsker\n").unwrap();
        assert_eq!(clip.len(), 2);
        assert_eq!(clip.rows[0], vec!["Hamlet", "Oyuncu"]);
        assert_eq!(clip.rows[1].len(), 3);
    }

    #[test]
    fn test_last_assignment() {
        let snap = snapshot();
        assert_eq!(
            last_assignment(&snap, 1),
            Some(LastAssignment {
                person: "Mehmet".to_string(),
                play: "Hamlet".to_string()
            })
        );
        // Ahmet also appears as "AHMET " in another play.
        assert_eq!(last_assignment(&snap, 0), None);
        assert_eq!(last_assignment(&snap, 3), None);
        assert_eq!(last_assignment(&snap, 10), None);
    }

    #[test]
    fn test_last_assignment_needs_person_header() {
        let snap = Snapshot::new(
            "x",
            1,
            SheetData::new(cells(&["Oyun", "Kişiler"]), vec![cells(&["Hamlet", "Mehmet"])]),
        );
        assert_eq!(last_assignment(&snap, 0), None);
    }

    #[test]
    fn test_search_keeps_absolute_indices() {
        let snap = snapshot();
        let view = SheetView::search(&snap, "ahmet");
        assert_eq!(view.len(), 2);
        assert_eq!(view.absolute_index(1), Some(2));
        assert_eq!(SheetView::search(&snap, "  ").len(), 4);
    }

    #[test]
    fn test_play_groups_and_pages() {
        let snap = snapshot();
        let view = SheetView::new(&snap);
        let groups = view.play_groups();
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Bahar", "Çehov", "Hamlet"]);
        assert_eq!(groups[2].rows[1].index, 1);

        assert_eq!(view.total_pages(), 1);
        assert_eq!(view.page(1).len(), 4);
        assert!(view.page(2).is_empty());
        assert!(view.page(0).is_empty());
    }

    #[test]
    fn test_paging_large_sheet() {
        let rows = (0..120).map(|i| vec![format!("P{}", i)]).collect();
        let snap = Snapshot::new("x", 1, SheetData::new(cells(&["Oyun"]), rows));
        let view = SheetView::new(&snap);
        assert_eq!(view.total_pages(), 3);
        assert_eq!(view.page(3).len(), 20);
        assert_eq!(view.page(3)[0].index, 100);
    }
}
