//! Sheet snapshots.
//!
//! A [`Snapshot`] is one fetched copy of an external sheet. Every row keeps
//! the index it had at fetch time, and the snapshot carries the generation
//! number the cache assigned to it. Positions are only meaningful together
//! with that generation.

use crate::parser::{parse_records, ColumnMap, Record};

/// Header row used when the holding list has to be created.
pub const HOLDING_HEADERS: &[&str] = &["Kişi", "Kategori", "Başlangıç", "Bitiş", "Açıklama"];

/// Header row used when the extras registry has to be created.
pub const EXTRAS_HEADERS: &[&str] = &["Kişi", "Oyunlar"];

/// Header row of the notification log.
pub const NOTIFICATION_HEADERS: &[&str] = &["Tarih", "Tür", "Oyun", "Kişi", "Görev", "Açıklama"];

/// Raw sheet payload as exchanged with the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetData {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        SheetData { headers, rows }
    }

    pub fn is_blank(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }
}

/// A row paired with its fetch-time position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub index: usize,
    pub cells: Vec<String>,
}

impl SheetRow {
    /// Cell text, empty when the row is shorter than `col`.
    pub fn cell(&self, col: usize) -> &str {
        self.cells.get(col).map(String::as_str).unwrap_or("")
    }
}

/// Position of a row inside one specific snapshot.
///
/// Only the mutation layer consumes these; it rejects refs whose generation
/// is no longer the cached one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowRef {
    pub sheet: String,
    pub generation: u64,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub name: String,
    pub generation: u64,
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
}

impl Snapshot {
    pub fn new(name: &str, generation: u64, data: SheetData) -> Self {
        let rows = data
            .rows
            .into_iter()
            .enumerate()
            .map(|(index, cells)| SheetRow { index, cells })
            .collect();
        Snapshot {
            name: name.to_string(),
            generation,
            headers: data.headers,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&SheetRow> {
        self.rows.get(index)
    }

    /// Reference to the row at `index`, if it exists in this snapshot.
    pub fn row_ref(&self, index: usize) -> Option<RowRef> {
        self.row(index).map(|row| RowRef {
            sheet: self.name.clone(),
            generation: self.generation,
            index: row.index,
        })
    }

    pub fn columns(&self) -> ColumnMap {
        ColumnMap::resolve(&self.headers)
    }

    pub fn raw_rows(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(|r| r.cells.clone()).collect()
    }

    pub fn records(&self) -> Vec<Record> {
        parse_records(&self.headers, &self.raw_rows())
    }

    /// Position of the first header for which `pred` holds on the trimmed,
    /// lowercased label.
    pub fn header_position(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| pred(&crate::text::tr_lower(h.trim())))
    }
}

/// Backend-internal sheets that are never shown in the editable list.
pub fn is_legacy_sheet(name: &str) -> bool {
    name.starts_with("__")
        || name.starts_with("_SNAPSHOT")
        || matches!(
            name,
            "LOG" | "Log" | "Snapshot" | "BİLDİRİMLER_ARŞİV" | "BİLDİRİMLER"
        )
}

/// Editable sheet list: upstream sheets minus legacy ones, followed by any
/// pinned sheet that does not exist upstream yet.
pub fn visible_sheets(upstream: &[String], pinned: &[String]) -> Vec<String> {
    let mut visible: Vec<String> = upstream
        .iter()
        .filter(|name| !is_legacy_sheet(name))
        .cloned()
        .collect();
    let missing: Vec<String> = pinned
        .iter()
        .filter(|name| !visible.contains(name))
        .cloned()
        .collect();
    visible.extend(missing);
    visible
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> SheetData {
        SheetData::new(
            vec!["Oyun".into(), "Kategori".into(), "Görev".into(), "Kişi".into()],
            vec![
                vec!["Hamlet".into(), "Oyuncu".into(), "Kral".into(), "Ahmet".into()],
                vec!["".into(), "Oyuncu".into()],
            ],
        )
    }

    #[test]
    fn test_snapshot_indexes_rows() {
        let snap = Snapshot::new("BÜTÜN OYUNLAR", 7, data());
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.rows[1].index, 1);
        assert_eq!(snap.rows[1].cell(3), "");
        let r = snap.row_ref(1).unwrap();
        assert_eq!(r.generation, 7);
        assert_eq!(r.sheet, "BÜTÜN OYUNLAR");
        assert!(snap.row_ref(2).is_none());
        assert_eq!(snap.records().len(), 1);
    }

    #[test]
    fn test_header_position() {
        let snap = Snapshot::new("x", 1, data());
        assert_eq!(snap.header_position(|h| h == "kişi"), Some(3));
        assert_eq!(snap.header_position(|h| h.contains("oyun")), Some(0));
        assert_eq!(snap.header_position(|h| h == "tarih"), None);
    }

    #[test]
    fn test_visible_sheets() {
        let upstream: Vec<String> = ["BÜTÜN OYUNLAR", "__cache", "LOG", "BİLDİRİMLER", "ARŞİV OYUNLAR"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let pinned = vec!["GÖREVLİ OLMAYAN".to_string(), "ARŞİV OYUNLAR".to_string()];
        assert_eq!(
            visible_sheets(&upstream, &pinned),
            vec!["BÜTÜN OYUNLAR", "ARŞİV OYUNLAR", "GÖREVLİ OLMAYAN"]
        );
    }
}
