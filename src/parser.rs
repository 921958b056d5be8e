//! Row parser: raw header + rows into [`Record`]s.
//!
//! Column positions are resolved by header label, never assumed, so the same
//! code works for the roster, the archive and any hand-made sheet that uses
//! a header variant such as "Oyun Adı" instead of "Oyun".

use crate::text::{decode_entities, tr_lower};

/// One play/category/role/person assignment.
///
/// `person` may hold several comma-separated names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    pub play: String,
    pub category: String,
    pub role: String,
    pub person: String,
}

impl Record {
    pub fn new(play: &str, category: &str, role: &str, person: &str) -> Self {
        Record {
            play: play.to_string(),
            category: category.to_string(),
            role: role.to_string(),
            person: person.to_string(),
        }
    }

    /// Cells in canonical column order, as written back to a sheet.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.play.clone(),
            self.category.clone(),
            self.role.clone(),
            self.person.clone(),
        ]
    }
}

/// The four semantic columns of a roster sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Play,
    Category,
    Role,
    Person,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Play, Field::Category, Field::Role, Field::Person];

    fn exact_labels(self) -> &'static [&'static str] {
        match self {
            Field::Play => &["oyun", "oyun adı"],
            Field::Category => &["kategori"],
            Field::Role => &["görev"],
            Field::Person => &["kişi"],
        }
    }

    fn prefixes(self) -> &'static [&'static str] {
        match self {
            Field::Play => &["oyun"],
            Field::Category => &["kategori"],
            Field::Role => &["görev", "gorev"],
            Field::Person => &["kişi", "kisi"],
        }
    }

    /// Header label used when a sheet has to be created from scratch.
    pub fn default_label(self) -> &'static str {
        match self {
            Field::Play => "Oyun",
            Field::Category => "Kategori",
            Field::Role => "Görev",
            Field::Person => "Kişi",
        }
    }
}

/// Canonical header row for roster-shaped sheets.
pub fn default_headers() -> Vec<String> {
    Field::ALL
        .iter()
        .map(|f| f.default_label().to_string())
        .collect()
}

/// Resolved column index per field. `None` means the header had no match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub play: Option<usize>,
    pub category: Option<usize>,
    pub role: Option<usize>,
    pub person: Option<usize>,
}

impl ColumnMap {
    /// Resolve columns from a header row: exact labels first, then prefixes.
    ///
    /// Each header is tried in both Turkish and plain lowercase so ASCII
    /// spellings such as `KATEGORI` resolve as well as `KİŞİ`.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        let normalized: Vec<[String; 2]> = headers
            .iter()
            .map(|h| {
                let h = h.as_ref().trim();
                [tr_lower(h), h.to_lowercase()]
            })
            .collect();

        let find = |field: Field| -> Option<usize> {
            normalized
                .iter()
                .position(|forms| forms.iter().any(|h| field.exact_labels().contains(&h.as_str())))
                .or_else(|| {
                    normalized.iter().position(|forms| {
                        forms
                            .iter()
                            .any(|h| field.prefixes().iter().any(|p| h.starts_with(p)))
                    })
                })
        };

        ColumnMap {
            play: find(Field::Play),
            category: find(Field::Category),
            role: find(Field::Role),
            person: find(Field::Person),
        }
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        match field {
            Field::Play => self.play,
            Field::Category => self.category,
            Field::Role => self.role,
            Field::Person => self.person,
        }
    }

    /// Fields that could not be resolved.
    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .iter()
            .copied()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }

    /// Decoded, trimmed cell for `field`; empty when unresolved or absent.
    pub fn cell(&self, row: &[String], field: Field) -> String {
        self.get(field)
            .and_then(|idx| row.get(idx))
            .map(|raw| decode_entities(raw.trim()).trim().to_string())
            .unwrap_or_default()
    }

    pub fn record(&self, row: &[String]) -> Record {
        Record {
            play: self.cell(row, Field::Play),
            category: self.cell(row, Field::Category),
            role: self.cell(row, Field::Role),
            person: self.cell(row, Field::Person),
        }
    }
}

/// Parse a sheet into records, dropping rows with an empty play.
pub fn parse_records<S: AsRef<str>>(headers: &[S], rows: &[Vec<String>]) -> Vec<Record> {
    let columns = ColumnMap::resolve(headers);
    let missing = columns.missing();
    if !missing.is_empty() {
        log::debug!("Unresolved roster columns {:?}; using empty values", missing);
    }

    let records: Vec<Record> = rows
        .iter()
        .map(|row| columns.record(row))
        .filter(|r| !r.play.is_empty())
        .collect();

    if records.len() < rows.len() {
        log::debug!(
            "Dropped {} of {} rows without a play name",
            rows.len() - records.len(),
            rows.len()
        );
    }
    records
}
