//! Notification feed over the notification log sheet.
//!
//! Log rows are `[date, type, play, person, role, description]`, appended
//! oldest first. The feed shows them newest first; seen-state is kept by
//! sheet index so it survives re-fetches.

use crate::sheet::{SheetRow, Snapshot};
use crate::sync::display_to_original;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Descriptions the backend writes when nothing more specific is known.
const GENERIC_DESCRIPTIONS: &[&str] = &["Web uygulamasından", "Web uygulamasından eklendi"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    Added,
    Deleted,
    Updated,
    Info,
    Archived,
    Other(String),
}

impl NoticeKind {
    /// Dotted and ASCII spellings are both accepted, in any case.
    pub fn classify(kind: &str) -> Self {
        match kind.trim().to_uppercase().as_str() {
            "EKLENDİ" | "EKLENDI" => NoticeKind::Added,
            "SİLİNDİ" | "SILINDI" => NoticeKind::Deleted,
            "GÜNCELLENDİ" | "GUNCELLENDI" => NoticeKind::Updated,
            "BİLGİ" | "BILGI" => NoticeKind::Info,
            "ARŞİVLENDİ" | "ARSIVLENDI" => NoticeKind::Archived,
            other => NoticeKind::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            NoticeKind::Added => "EKLENDİ",
            NoticeKind::Deleted => "SİLİNDİ",
            NoticeKind::Updated => "GÜNCELLENDİ",
            NoticeKind::Info => "BİLGİ",
            NoticeKind::Archived => "ARŞİVLENDİ",
            NoticeKind::Other(raw) if raw.is_empty() => "—",
            NoticeKind::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Row index in the notification log
    pub index: usize,
    pub date: String,
    pub kind: NoticeKind,
    pub play: String,
    pub person: String,
    pub role: String,
    pub description: String,
}

impl Notice {
    pub fn from_row(row: &SheetRow) -> Self {
        let cell = |col: usize| row.cell(col).trim().to_string();
        Notice {
            index: row.index,
            date: cell(0),
            kind: NoticeKind::classify(row.cell(1)),
            play: cell(2),
            person: cell(3),
            role: cell(4),
            description: cell(5),
        }
    }

    pub fn is_generic(&self) -> bool {
        GENERIC_DESCRIPTIONS.contains(&self.description.as_str())
    }

    /// Description worth showing. Generic descriptions only show when the
    /// notice has nothing else to say.
    pub fn shown_description(&self) -> Option<&str> {
        if self.description.is_empty() {
            return None;
        }
        let bare = self.play.is_empty() && self.person.is_empty() && self.role.is_empty();
        (!self.is_generic() || bare).then_some(self.description.as_str())
    }
}

/// Notices newest first.
pub fn feed(snapshot: &Snapshot) -> Vec<Notice> {
    snapshot.rows.iter().rev().map(Notice::from_row).collect()
}

/// Sheet index behind the `displayed`-th feed entry.
pub fn feed_index(snapshot: &Snapshot, displayed: usize) -> Option<usize> {
    display_to_original(snapshot.len(), displayed)
}

/// Indices of notices the user has looked at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenSet {
    seen: BTreeSet<usize>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing file is an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string(self)?;
        std::fs::write(path, raw).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn mark_seen(&mut self, index: usize) {
        self.seen.insert(index);
    }

    pub fn mark_all_seen(&mut self, total: usize) {
        self.seen = (0..total).collect();
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn is_seen(&self, index: usize) -> bool {
        self.seen.contains(&index)
    }

    pub fn unread_count(&self, total: usize) -> usize {
        (0..total).filter(|i| !self.seen.contains(i)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::SheetData;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn log() -> Snapshot {
        Snapshot::new(
            "BİLDİRİMLER",
            1,
            SheetData::new(
                cells(&["Tarih", "Tür", "Oyun", "Kişi", "Görev", "Açıklama"]),
                vec![
                    cells(&["01.03.2025", "EKLENDI", "Hamlet", "Ahmet", "Kral", "Web uygulamasından"]),
                    cells(&["02.03.2025", "silindi", "Hamlet", "Mehmet"]),
                    cells(&["03.03.2025", "BİLGİ", "", "", "", "Web uygulamasından eklendi"]),
                ],
            ),
        )
    }

    #[test]
    fn test_classify_kinds() {
        assert_eq!(NoticeKind::classify("EKLENDİ"), NoticeKind::Added);
        assert_eq!(NoticeKind::classify(" eklendi "), NoticeKind::Added);
        assert_eq!(NoticeKind::classify("ARSIVLENDI"), NoticeKind::Archived);
        assert_eq!(NoticeKind::classify("GUNCELLENDI"), NoticeKind::Updated);
        assert_eq!(NoticeKind::classify("x"), NoticeKind::Other("X".to_string()));
        assert_eq!(NoticeKind::classify("").label(), "—");
    }

    #[test]
    fn test_feed_is_newest_first() {
        let snap = log();
        let notices = feed(&snap);
        assert_eq!(notices[0].index, 2);
        assert_eq!(notices[2].kind, NoticeKind::Added);
        assert_eq!(notices[1].kind, NoticeKind::Deleted);
        assert_eq!(notices[1].description, "");
        assert_eq!(feed_index(&snap, 0), Some(2));
        assert_eq!(feed_index(&snap, 3), None);
    }

    #[test]
    fn test_generic_descriptions_hidden_unless_bare() {
        let notices = feed(&log());
        assert_eq!(notices[2].shown_description(), None);
        assert_eq!(notices[0].shown_description(), Some("Web uygulamasından eklendi"));
        assert_eq!(notices[1].shown_description(), None);
    }

    #[test]
    fn test_seen_set_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        let mut seen = SeenSet::load(&path).unwrap();
        assert_eq!(seen.unread_count(3), 3);
        seen.mark_seen(1);
        assert_eq!(seen.unread_count(3), 2);
        seen.save(&path).unwrap();

        let mut loaded = SeenSet::load(&path).unwrap();
        assert!(loaded.is_seen(1));
        loaded.mark_all_seen(5);
        assert_eq!(loaded.unread_count(5), 0);
        assert_eq!(loaded.unread_count(7), 2);
    }
}
