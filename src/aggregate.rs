//! Aggregation engine
//!
//! Derives every roster view (per play, per person, overlap, distribution)
//! from a flat slice of [`Record`]s. Nothing here is incremental: callers
//! re-run these functions on every fresh snapshot.

use crate::parser::Record;
use crate::text::{split_names, tr_compare, tr_contains, tr_eq, tr_sort};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Name of the bucket that collects categories outside the top N.
pub const OTHER_CATEGORY: &str = "Diğer";

/// Per-play view of the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaySummary {
    pub name: String,
    /// Distinct people assigned to the play
    pub person_count: usize,
    /// Rows for the play, including rows without a person
    pub record_count: usize,
    /// Distinct non-empty categories, collated
    pub categories: Vec<String>,
}

/// Per-person view of the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonSummary {
    pub name: String,
    pub plays: Vec<String>,
    pub roles: Vec<String>,
}

/// Three-way partition of two string sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlap {
    pub only_a: Vec<String>,
    pub only_b: Vec<String>,
    pub common: Vec<String>,
}

impl Overlap {
    /// Size of the union.
    pub fn total(&self) -> usize {
        self.only_a.len() + self.only_b.len() + self.common.len()
    }

    /// Share of the union that is common, 0.0 for two empty sets.
    pub fn ratio(&self) -> f64 {
        self.common.len() as f64 / self.total().max(1) as f64
    }
}

/// Counts shown on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterStats {
    pub plays: usize,
    pub people: usize,
    pub records: usize,
    pub child_plays: usize,
    pub adult_plays: usize,
}

/// Which plays a play search should consider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayKind {
    #[default]
    All,
    Adult,
    Child,
}

/// True for children's/youth productions, marked in the play name.
pub fn is_child_play(name: &str) -> bool {
    name.contains("Ç.O") || name.contains("(Ç)")
}

fn sorted(set: HashSet<String>) -> Vec<String> {
    let mut items: Vec<String> = set.into_iter().collect();
    tr_sort(&mut items);
    items
}

// ============================================================================
// Core views
// ============================================================================

pub fn group_by_play(records: &[Record]) -> Vec<PlaySummary> {
    struct Bucket {
        people: HashSet<String>,
        rows: usize,
        categories: HashSet<String>,
    }

    let mut buckets: HashMap<&str, Bucket> = HashMap::new();
    for record in records {
        let bucket = buckets.entry(record.play.as_str()).or_insert_with(|| Bucket {
            people: HashSet::new(),
            rows: 0,
            categories: HashSet::new(),
        });
        for name in split_names(&record.person) {
            bucket.people.insert(name.to_string());
        }
        bucket.rows += 1;
        let category = record.category.trim();
        if !category.is_empty() {
            bucket.categories.insert(category.to_string());
        }
    }

    let mut plays: Vec<PlaySummary> = buckets
        .into_iter()
        .map(|(name, bucket)| PlaySummary {
            name: name.to_string(),
            person_count: bucket.people.len(),
            record_count: bucket.rows,
            categories: sorted(bucket.categories),
        })
        .collect();
    plays.sort_by(|a, b| tr_compare(&a.name, &b.name));
    plays
}

/// People sorted by descending play count; ties keep first-appearance order.
pub fn group_by_person(records: &[Record]) -> Vec<PersonSummary> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, (HashSet<String>, HashSet<String>)> = HashMap::new();

    for record in records {
        if record.person.trim().is_empty() {
            continue;
        }
        for name in split_names(&record.person) {
            let (plays, roles) = buckets.entry(name.to_string()).or_insert_with(|| {
                order.push(name.to_string());
                (HashSet::new(), HashSet::new())
            });
            plays.insert(record.play.clone());
            let role = record.role.trim();
            if !role.is_empty() {
                roles.insert(role.to_string());
            }
        }
    }

    let mut people: Vec<PersonSummary> = order
        .into_iter()
        .filter_map(|name| {
            let (plays, roles) = buckets.remove(&name)?;
            Some(PersonSummary {
                name,
                plays: sorted(plays),
                roles: sorted(roles),
            })
        })
        .collect();
    people.sort_by(|a, b| b.plays.len().cmp(&a.plays.len()));
    people
}

/// Partition two string collections into only-A, only-B and common.
///
/// Works for people of two plays as well as plays of two people.
pub fn overlap<A, B, S, T>(a: A, b: B) -> Overlap
where
    A: IntoIterator<Item = S>,
    B: IntoIterator<Item = T>,
    S: AsRef<str>,
    T: AsRef<str>,
{
    let set_a: HashSet<String> = a.into_iter().map(|s| s.as_ref().to_string()).collect();
    let set_b: HashSet<String> = b.into_iter().map(|s| s.as_ref().to_string()).collect();

    Overlap {
        only_a: sorted(set_a.difference(&set_b).cloned().collect()),
        only_b: sorted(set_b.difference(&set_a).cloned().collect()),
        common: sorted(set_a.intersection(&set_b).cloned().collect()),
    }
}

// ============================================================================
// Overlap call sites
// ============================================================================

/// Distinct people assigned to `play`, collated.
pub fn people_in_play(records: &[Record], play: &str) -> Vec<String> {
    let names: HashSet<String> = records
        .iter()
        .filter(|r| r.play == play)
        .flat_map(|r| split_names(&r.person).map(str::to_string))
        .collect();
    sorted(names)
}

/// Distinct plays in which `person` appears (case-insensitive name match).
pub fn plays_of_person(records: &[Record], person: &str) -> Vec<String> {
    let plays: HashSet<String> = records
        .iter()
        .filter(|r| split_names(&r.person).any(|name| tr_eq(name, person)))
        .map(|r| r.play.clone())
        .collect();
    sorted(plays)
}

/// Plays shared and not shared by two people.
pub fn compare_people(records: &[Record], person_a: &str, person_b: &str) -> Overlap {
    overlap(
        plays_of_person(records, person_a),
        plays_of_person(records, person_b),
    )
}

/// A person present in only one of two compared plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastEntry {
    pub name: String,
    pub roles: Vec<String>,
}

/// A person present in both compared plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedCast {
    pub name: String,
    pub roles_a: Vec<String>,
    pub roles_b: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayComparison {
    pub only_a: Vec<CastEntry>,
    pub only_b: Vec<CastEntry>,
    pub common: Vec<SharedCast>,
}

/// Person -> roles in first-appearance order, for one play.
fn role_map(records: &[Record], play: &str) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for record in records.iter().filter(|r| r.play == play) {
        let role = record.role.trim();
        for name in split_names(&record.person) {
            let roles = map.entry(name.to_string()).or_default();
            if !role.is_empty() && !roles.iter().any(|r| r == role) {
                roles.push(role.to_string());
            }
        }
    }
    map
}

/// People overlap of two plays, each person carrying the roles they hold.
pub fn compare_plays(records: &[Record], play_a: &str, play_b: &str) -> PlayComparison {
    let roles_a = role_map(records, play_a);
    let roles_b = role_map(records, play_b);
    let split = overlap(roles_a.keys(), roles_b.keys());

    let entry = |map: &HashMap<String, Vec<String>>, name: String| CastEntry {
        roles: map.get(&name).cloned().unwrap_or_default(),
        name,
    };

    PlayComparison {
        only_a: split.only_a.into_iter().map(|n| entry(&roles_a, n)).collect(),
        only_b: split.only_b.into_iter().map(|n| entry(&roles_b, n)).collect(),
        common: split
            .common
            .into_iter()
            .map(|name| SharedCast {
                roles_a: roles_a.get(&name).cloned().unwrap_or_default(),
                roles_b: roles_b.get(&name).cloned().unwrap_or_default(),
                name,
            })
            .collect(),
    }
}

// ============================================================================
// Filters and distributions
// ============================================================================

/// Substring filter over records; empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub category: String,
    pub play: String,
    pub person: String,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self.category.trim().is_empty() && self.play.trim().is_empty() && self.person.trim().is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        tr_contains(&record.category, self.category.trim())
            && tr_contains(&record.play, self.play.trim())
            && tr_contains(&record.person, self.person.trim())
    }
}

pub fn filter_records<'a>(records: &'a [Record], filter: &RecordFilter) -> Vec<&'a Record> {
    records.iter().filter(|r| filter.matches(r)).collect()
}

/// Search the play list by play name or by anything inside the play.
pub fn search_plays<'a>(
    records: &[Record],
    plays: &'a [PlaySummary],
    query: &str,
    kind: PlayKind,
) -> Vec<&'a PlaySummary> {
    let query = query.trim();
    plays
        .iter()
        .filter(|p| match kind {
            PlayKind::All => true,
            PlayKind::Adult => !is_child_play(&p.name),
            PlayKind::Child => is_child_play(&p.name),
        })
        .filter(|p| {
            query.is_empty()
                || tr_contains(&p.name, query)
                || records.iter().filter(|r| r.play == p.name).any(|r| {
                    tr_contains(&r.person, query)
                        || tr_contains(&r.role, query)
                        || tr_contains(&r.category, query)
                })
        })
        .collect()
}

/// People filtered for the distribution view.
///
/// `exact_plays == 1` disables the play-count filter; any other value keeps
/// only people with exactly that many plays.
pub fn distribution<'a>(
    people: &'a [PersonSummary],
    exact_plays: usize,
    name_query: &str,
    play_query: &str,
) -> Vec<&'a PersonSummary> {
    people
        .iter()
        .filter(|p| exact_plays <= 1 || p.plays.len() == exact_plays)
        .filter(|p| tr_contains(&p.name, name_query.trim()))
        .filter(|p| play_query.trim().is_empty() || p.plays.iter().any(|o| tr_contains(o, play_query.trim())))
        .collect()
}

/// Number of people per play count.
pub fn play_count_histogram(people: &[PersonSummary]) -> BTreeMap<usize, usize> {
    let mut histogram = BTreeMap::new();
    for person in people {
        *histogram.entry(person.plays.len()).or_insert(0) += 1;
    }
    histogram
}

/// Record counts per category, largest first, with the tail folded into
/// [`OTHER_CATEGORY`].
pub fn category_breakdown(records: &[Record], top: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let category = record.category.trim();
        if !category.is_empty() {
            *counts.entry(category).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| tr_compare(&a.0, &b.0)));

    let rest: usize = ranked.iter().skip(top).map(|(_, count)| count).sum();
    ranked.truncate(top);
    if rest > 0 {
        ranked.push((OTHER_CATEGORY.to_string(), rest));
    }
    ranked
}

pub fn roster_stats(records: &[Record]) -> RosterStats {
    let plays = group_by_play(records);
    let people: HashSet<&str> = records.iter().flat_map(|r| split_names(&r.person)).collect();
    let child_plays = plays.iter().filter(|p| is_child_play(&p.name)).count();

    RosterStats {
        plays: plays.len(),
        people: people.len(),
        records: records.len(),
        child_plays,
        adult_plays: plays.len() - child_plays,
    }
}

/// Distinct comma-split values of the first `columns` columns, collated.
///
/// Feeds autocompletion in the row editor.
pub fn column_suggestions(rows: &[Vec<String>], columns: usize) -> Vec<Vec<String>> {
    (0..columns)
        .map(|col| {
            let values: HashSet<String> = rows
                .iter()
                .filter_map(|row| row.get(col))
                .flat_map(|cell| split_names(cell).map(str::to_string))
                .collect();
            sorted(values)
        })
        .collect()
}
