//! Report functions shared by the CLI.
//!
//! Each function reads what it needs (records, a snapshot, a mutation
//! outcome) and returns formatted text instead of printing, so the CLI stays
//! a thin argument-parsing layer.

use crate::aggregate::{
    category_breakdown, compare_people, compare_plays, distribution, filter_records, group_by_person,
    group_by_play, play_count_histogram, roster_stats, search_plays, PlayKind, RecordFilter,
};
use crate::category::classify;
use crate::config::SheetNames;
use crate::mutation::{ArchiveOutcome, ArchiveWarning, DeleteOutcome, ExtrasReconciliation, PasteReport};
use crate::notifications::{feed, SeenSet};
use crate::parser::{Field, Record};
use crate::sheet::Snapshot;
use crate::store::MemoryStore;
use crate::sync::SheetView;
use anyhow::Result;
use std::fmt::Write;
use std::path::Path;

/// Categories listed before the rest are folded into one bucket.
pub const CATEGORY_TOP_N: usize = 12;

/// People shown in the most-assigned chart.
pub const TOP_PEOPLE: usize = 25;

fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        name.to_string()
    } else {
        let cut: String = name.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

/// Store backed by CSV exports instead of the live backend.
///
/// `roster` becomes the primary roster sheet; `extras` and `holding`, when
/// given, become the registry and holding list.
pub fn local_store(
    names: &SheetNames,
    roster: &Path,
    extras: Option<&Path>,
    holding: Option<&Path>,
) -> Result<MemoryStore> {
    let mut store = MemoryStore::new(names.clone());
    store.load_csv(&names.roster, roster)?;
    if let Some(path) = extras {
        store.load_csv(&names.extras, path)?;
    }
    if let Some(path) = holding {
        store.load_csv(&names.holding, path)?;
    }
    Ok(store)
}

// ============================================================================
// Plays
// ============================================================================

pub fn plays_report(records: &[Record], query: &str, kind: PlayKind) -> Result<String> {
    let plays = group_by_play(records);
    let found = search_plays(records, &plays, query, kind);
    let mut out = String::new();

    writeln!(out, "{:<40} {:>7} {:>7}  Categories", "Play", "People", "Rows")?;
    writeln!(out, "{:-<90}", "")?;
    for play in &found {
        writeln!(
            out,
            "{:<40} {:>7} {:>7}  {}",
            truncate_name(&play.name, 40),
            play.person_count,
            play.record_count,
            play.categories.join(", ")
        )?;
    }
    writeln!(out, "\n{} of {} plays", found.len(), plays.len())?;
    Ok(out)
}

/// Cast list of one play, grouped by category.
pub fn play_detail_report(records: &[Record], play: &str) -> Result<String> {
    let rows: Vec<&Record> = records.iter().filter(|r| r.play == play.trim()).collect();
    if rows.is_empty() {
        anyhow::bail!("No rows for play '{}'", play);
    }
    let summary = group_by_play(records)
        .into_iter()
        .find(|p| p.name == play.trim())
        .ok_or_else(|| anyhow::anyhow!("No rows for play '{}'", play))?;

    let mut out = String::new();
    writeln!(out, "{}", summary.name)?;
    writeln!(out, "{} people, {} rows\n", summary.person_count, summary.record_count)?;
    for category in &summary.categories {
        let class = classify(category);
        writeln!(out, "[{}] {}", class.style.label(), category)?;
        for record in rows.iter().filter(|r| r.category.trim() == category) {
            writeln!(out, "    {:<28} {}", truncate_name(&record.role, 28), record.person)?;
        }
    }
    let uncategorized: Vec<&&Record> = rows.iter().filter(|r| r.category.trim().is_empty()).collect();
    if !uncategorized.is_empty() {
        writeln!(out, "[other] (no category)")?;
        for record in uncategorized {
            writeln!(out, "    {:<28} {}", truncate_name(&record.role, 28), record.person)?;
        }
    }
    Ok(out)
}

// ============================================================================
// People
// ============================================================================

/// People filtered by play count, name and play, with the play-count histogram.
pub fn people_report(records: &[Record], exact_plays: usize, name_query: &str, play_query: &str) -> Result<String> {
    let people = group_by_person(records);
    let shown = distribution(&people, exact_plays, name_query, play_query);
    let mut out = String::new();

    writeln!(out, "{:<30} {:>6}  Plays", "Person", "Plays")?;
    writeln!(out, "{:-<90}", "")?;
    for person in &shown {
        writeln!(
            out,
            "{:<30} {:>6}  {}",
            truncate_name(&person.name, 30),
            person.plays.len(),
            person.plays.join(", ")
        )?;
    }
    writeln!(out, "\n{} of {} people", shown.len(), people.len())?;

    writeln!(out, "\nPlays per person:")?;
    for (count, people) in play_count_histogram(&people) {
        writeln!(out, "  {:>3} play(s): {}", count, people)?;
    }
    Ok(out)
}

pub fn person_report(records: &[Record], person: &str) -> Result<String> {
    let people = group_by_person(records);
    let found = people
        .iter()
        .find(|p| crate::text::tr_eq(&p.name, person))
        .ok_or_else(|| anyhow::anyhow!("No assignments for '{}'", person))?;

    let mut out = String::new();
    writeln!(out, "{}", found.name)?;
    writeln!(out, "Plays ({}):", found.plays.len())?;
    for play in &found.plays {
        writeln!(out, "  {}", play)?;
    }
    if !found.roles.is_empty() {
        writeln!(out, "Roles: {}", found.roles.join(", "))?;
    }
    Ok(out)
}

pub fn compare_people_report(records: &[Record], person_a: &str, person_b: &str) -> Result<String> {
    let overlap = compare_people(records, person_a, person_b);
    let mut out = String::new();
    writeln!(out, "{} vs {}: {:.0}% shared", person_a, person_b, overlap.ratio() * 100.0)?;
    writeln!(out, "\nCommon ({}):", overlap.common.len())?;
    for play in &overlap.common {
        writeln!(out, "  {}", play)?;
    }
    writeln!(out, "\nOnly {} ({}):", person_a, overlap.only_a.len())?;
    for play in &overlap.only_a {
        writeln!(out, "  {}", play)?;
    }
    writeln!(out, "\nOnly {} ({}):", person_b, overlap.only_b.len())?;
    for play in &overlap.only_b {
        writeln!(out, "  {}", play)?;
    }
    Ok(out)
}

pub fn compare_plays_report(records: &[Record], play_a: &str, play_b: &str) -> Result<String> {
    let cmp = compare_plays(records, play_a, play_b);
    let mut out = String::new();
    writeln!(out, "{} vs {}", play_a, play_b)?;
    writeln!(out, "\nCommon ({}):", cmp.common.len())?;
    for shared in &cmp.common {
        writeln!(
            out,
            "  {:<28} {} | {}",
            truncate_name(&shared.name, 28),
            shared.roles_a.join(", "),
            shared.roles_b.join(", ")
        )?;
    }
    for (label, entries) in [(play_a, &cmp.only_a), (play_b, &cmp.only_b)] {
        writeln!(out, "\nOnly {} ({}):", label, entries.len())?;
        for entry in entries {
            writeln!(out, "  {:<28} {}", truncate_name(&entry.name, 28), entry.roles.join(", "))?;
        }
    }
    Ok(out)
}

// ============================================================================
// Query and stats
// ============================================================================

pub fn query_report(records: &[Record], filter: &RecordFilter) -> Result<String> {
    let matched = filter_records(records, filter);
    let mut out = String::new();
    writeln!(
        out,
        "{:<32} {:<20} {:<24} {}",
        Field::Play.default_label(),
        Field::Category.default_label(),
        Field::Role.default_label(),
        Field::Person.default_label()
    )?;
    writeln!(out, "{:-<100}", "")?;
    for record in &matched {
        writeln!(
            out,
            "{:<32} {:<20} {:<24} {}",
            truncate_name(&record.play, 32),
            truncate_name(&record.category, 20),
            truncate_name(&record.role, 24),
            record.person
        )?;
    }
    writeln!(out, "\n{} of {} rows", matched.len(), records.len())?;
    Ok(out)
}

pub fn stats_report(records: &[Record]) -> Result<String> {
    let stats = roster_stats(records);
    let mut out = String::new();

    writeln!(out, "{:=^60}", " Roster ")?;
    writeln!(out, "Plays:   {} ({} adult, {} children's)", stats.plays, stats.adult_plays, stats.child_plays)?;
    writeln!(out, "People:  {}", stats.people)?;
    writeln!(out, "Rows:    {}", stats.records)?;

    writeln!(out, "\n{:=^60}", " Categories ")?;
    for (category, count) in category_breakdown(records, CATEGORY_TOP_N) {
        writeln!(out, "{:<36} {:>6}", truncate_name(&category, 36), count)?;
    }

    writeln!(out, "\n{:=^60}", " Most assigned people ")?;
    for person in group_by_person(records).iter().take(TOP_PEOPLE) {
        writeln!(out, "{:<36} {:>6}", truncate_name(&person.name, 36), person.plays.len())?;
    }

    let mut plays = group_by_play(records);
    plays.sort_by(|a, b| b.person_count.cmp(&a.person_count));
    writeln!(out, "\n{:=^60}", " Largest casts ")?;
    for play in &plays {
        writeln!(out, "{:<36} {:>6}", truncate_name(&play.name, 36), play.person_count)?;
    }
    Ok(out)
}

// ============================================================================
// Sheets
// ============================================================================

pub fn sheets_report(names: &[String]) -> Result<String> {
    let mut out = String::new();
    for name in names {
        writeln!(out, "{}", name)?;
    }
    Ok(out)
}

fn write_row(out: &mut String, index: usize, cells: &[String]) -> std::fmt::Result {
    writeln!(out, "{:>5}  {}", index, cells.join(" | "))
}

/// One page of a sheet, or every row matching `query`. Row numbers are the
/// absolute indices that row-addressed commands expect.
pub fn sheet_report(snapshot: &Snapshot, query: &str, page: usize) -> Result<String> {
    let view = SheetView::search(snapshot, query);
    let mut out = String::new();
    writeln!(out, "{:>5}  {}", "#", snapshot.headers.join(" | "))?;
    writeln!(out, "{:-<100}", "")?;
    let rows = if query.trim().is_empty() { view.page(page) } else { view.rows() };
    for row in rows {
        write_row(&mut out, row.index, &row.cells)?;
    }
    if query.trim().is_empty() {
        writeln!(out, "\nPage {}/{} ({} rows)", page, view.total_pages(), view.len())?;
    } else {
        writeln!(out, "\n{} of {} rows match '{}'", view.len(), snapshot.len(), query.trim())?;
    }
    Ok(out)
}

/// Sheet rows grouped by play, absolute indices kept.
pub fn sheet_groups_report(snapshot: &Snapshot) -> Result<String> {
    let view = SheetView::new(snapshot);
    let mut out = String::new();
    for group in view.play_groups() {
        let title = if group.name.is_empty() { "(no play)" } else { group.name.as_str() };
        writeln!(out, "{} ({})", title, group.rows.len())?;
        for row in &group.rows {
            write_row(&mut out, row.index, &row.cells)?;
        }
        writeln!(out)?;
    }
    Ok(out)
}

// ============================================================================
// Mutation outcomes
// ============================================================================

pub fn delete_report(outcome: &DeleteOutcome) -> Result<String> {
    let mut out = String::from("Row deleted.\n");
    if let Some(last) = &outcome.last_assignment {
        writeln!(
            out,
            "'{}' has no other assignment after leaving '{}'. Consider moving them to the holding list.",
            last.person, last.play
        )?;
    }
    Ok(out)
}

pub fn archive_report(play: &str, outcome: &ArchiveOutcome) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "Archived '{}': {} rows moved.", play, outcome.moved)?;
    match &outcome.warning {
        Some(ArchiveWarning::Unverified { remaining }) => writeln!(
            out,
            "Warning: {} rows of '{}' are still in the roster. Archiving again is safe.",
            remaining, play
        )?,
        Some(ArchiveWarning::VerifyFailed(reason)) => {
            writeln!(out, "Warning: could not re-read the roster to confirm: {}", reason)?
        }
        None => {}
    }
    Ok(out)
}

pub fn paste_report(sheet: &str, report: &PasteReport) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "Pasted {} of {} rows into '{}'.", report.succeeded(), report.results.len(), sheet)?;
    for (position, error) in report.failed() {
        writeln!(out, "  row {} failed: {}", position + 1, error)?;
    }
    Ok(out)
}

pub fn extras_report(reconciliation: &ExtrasReconciliation) -> Result<String> {
    let mut out = String::new();
    let sections = [
        ("Not registered", &reconciliation.unregistered),
        ("Registered, no current role", &reconciliation.idle),
        ("Registered and assigned", &reconciliation.registered),
    ];
    for (title, names) in sections {
        writeln!(out, "{} ({}):", title, names.len())?;
        for name in names {
            writeln!(out, "  {}", name)?;
        }
    }
    Ok(out)
}

// ============================================================================
// Notifications
// ============================================================================

pub fn notifications_report(snapshot: &Snapshot, seen: &SeenSet, limit: usize) -> Result<String> {
    let notices = feed(snapshot);
    let mut out = String::new();
    writeln!(out, "{} notifications, {} unread", notices.len(), seen.unread_count(snapshot.len()))?;
    for (displayed, notice) in notices.iter().take(limit).enumerate() {
        let marker = if seen.is_seen(notice.index) { ' ' } else { '*' };
        let mut line = format!("{}{:>4}  {:<12} {:<11}", marker, displayed, notice.kind.label(), notice.date);
        if !notice.play.is_empty() {
            write!(line, " {}", notice.play)?;
        }
        if !notice.person.is_empty() {
            write!(line, " / {}", notice.person)?;
        }
        if !notice.role.is_empty() {
            write!(line, " · {}", notice.role)?;
        }
        if let Some(description) = notice.shown_description() {
            write!(line, " ({})", description)?;
        }
        writeln!(out, "{}", line)?;
    }
    Ok(out)
}
