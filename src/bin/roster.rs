//! Roster CLI
//!
//! Reports and edits for the theater roster sheets. Talks to the sheet API
//! by default; `--from-csv` runs the same commands against local CSV exports
//! (edits then only live for the duration of the command).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use roster_toolkit::aggregate::{column_suggestions, compare_people, compare_plays, PlayKind, RecordFilter};
use roster_toolkit::category::{classify, KNOWN_CATEGORIES};
use roster_toolkit::config::{Config, SheetNames, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use roster_toolkit::export::{comparison_to_tsv, export_workbook, overlap_to_tsv, records_to_tsv};
use roster_toolkit::http::HttpStore;
use roster_toolkit::mutation::Roster;
use roster_toolkit::notifications::SeenSet;
use roster_toolkit::pipeline;
use roster_toolkit::store::SheetStore;
use roster_toolkit::sync::{insert_target, ClickModifier, Clipboard, InsertSlot, Selection};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Theater roster reports and sheet editing")]
struct Cli {
    /// Base URL of the sheet API
    #[arg(long, global = true, env = "ROSTER_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "ROSTER_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Read the primary roster from a CSV export instead of the API
    #[arg(long, global = true)]
    from_csv: Option<PathBuf>,

    /// Extras registry CSV (with --from-csv)
    #[arg(long, global = true, requires = "from_csv")]
    extras_csv: Option<PathBuf>,

    /// Holding list CSV (with --from-csv)
    #[arg(long, global = true, requires = "from_csv")]
    holding_csv: Option<PathBuf>,

    #[arg(long, global = true, env = "ROSTER_SHEET")]
    roster_sheet: Option<String>,

    #[arg(long, global = true, env = "ROSTER_ARCHIVE_SHEET")]
    archive_sheet: Option<String>,

    #[arg(long, global = true, env = "ROSTER_EXTRAS_SHEET")]
    extras_sheet: Option<String>,

    #[arg(long, global = true, env = "ROSTER_HOLDING_SHEET")]
    holding_sheet: Option<String>,

    #[arg(long, global = true, env = "ROSTER_NOTIFICATIONS_SHEET")]
    notifications_sheet: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn config(&self) -> Config {
        let defaults = SheetNames::default();
        let pick = |value: &Option<String>, default: String| value.clone().unwrap_or(default);
        Config {
            base_url: self.api_url.clone(),
            timeout_secs: self.timeout_secs,
            sheets: SheetNames {
                roster: pick(&self.roster_sheet, defaults.roster),
                archive: pick(&self.archive_sheet, defaults.archive),
                extras: pick(&self.extras_sheet, defaults.extras),
                holding: pick(&self.holding_sheet, defaults.holding),
                notifications: pick(&self.notifications_sheet, defaults.notifications),
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List plays with head counts
    Plays {
        /// Match play names or anyone/anything inside a play
        #[arg(default_value = "")]
        query: String,

        /// Only children's productions
        #[arg(long, conflicts_with = "adults")]
        children: bool,

        /// Only adult productions
        #[arg(long)]
        adults: bool,
    },

    /// Show the cast of one play
    Play { name: String },

    /// List people by number of plays
    People {
        /// Keep only people with exactly this many plays (1 = no filter)
        #[arg(long, default_value = "1")]
        plays: usize,

        #[arg(long, default_value = "")]
        name: String,

        /// Keep only people in a play matching this text
        #[arg(long, default_value = "")]
        play: String,
    },

    /// Show one person's plays and roles
    Person { name: String },

    /// Compare the plays of two people
    ComparePeople {
        a: String,
        b: String,

        /// Print tab-separated output for pasting into a spreadsheet
        #[arg(long)]
        tsv: bool,
    },

    /// Compare the casts of two plays
    ComparePlays {
        a: String,
        b: String,

        #[arg(long)]
        tsv: bool,
    },

    /// Filter roster rows by category, play and person
    Query {
        #[arg(long, default_value = "")]
        category: String,

        #[arg(long, default_value = "")]
        play: String,

        #[arg(long, default_value = "")]
        person: String,

        #[arg(long)]
        tsv: bool,
    },

    /// Roster totals, category breakdown and largest casts
    Stats,

    /// List the known categories with their badge style
    Categories,

    /// List editable sheets
    Sheets,

    /// Print a sheet with absolute row numbers
    Show {
        sheet: String,

        #[arg(long, default_value = "")]
        search: String,

        #[arg(long, default_value = "1")]
        page: usize,

        /// Group rows by play
        #[arg(long)]
        grouped: bool,
    },

    /// Distinct values of a column, for filling in new rows
    Suggest {
        sheet: String,

        #[arg(long, default_value = "0")]
        column: usize,
    },

    /// Set one cell
    UpdateCell {
        sheet: String,
        row: usize,
        col: usize,
        value: String,
    },

    /// Append a row to the end of a sheet
    Append { sheet: String, values: Vec<String> },

    /// Insert a row below `--after`, or at the top when omitted
    Insert {
        sheet: String,

        #[arg(long)]
        after: Option<usize>,

        values: Vec<String>,
    },

    /// Delete a row
    Delete {
        sheet: String,
        row: usize,

        /// Move the person to the holding list if this was their last assignment
        #[arg(long)]
        hold: bool,
    },

    /// Move every row of a play into the archive
    Archive { play: String },

    /// Register roster extras missing from the extras list
    SyncExtras,

    /// Compare the extras list with the extras in the roster
    Extras,

    /// Add a person to the holding list
    Hold {
        person: String,

        #[arg(default_value = "")]
        category: String,
    },

    /// Print rows as tab-separated text
    Copy { sheet: String, rows: Vec<usize> },

    /// Append tab-separated rows (from a file or stdin) to a sheet
    Paste {
        sheet: String,

        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Show the notification feed, newest first
    Notifications {
        #[arg(long, default_value = "50")]
        limit: usize,

        /// Where read-state is kept
        #[arg(long, env = "ROSTER_SEEN_FILE", default_value = "roster_seen.json")]
        seen_file: PathBuf,

        /// Mark everything as read after printing
        #[arg(long)]
        mark_read: bool,
    },

    /// Delete all notifications, or only the oldest batch
    ClearNotifications {
        #[arg(long)]
        oldest: bool,
    },

    /// Delete one notification by its feed position (0 = newest)
    DeleteNotification { index: usize },

    /// Write the roster to an xlsx workbook, or TSV with --tsv
    Export {
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        tsv: bool,

        /// Only these categories (TSV only)
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.config();

    match &cli.from_csv {
        Some(path) => {
            let store = pipeline::local_store(
                &config.sheets,
                path,
                cli.extras_csv.as_deref(),
                cli.holding_csv.as_deref(),
            )?;
            log::info!("Using local CSV data from {}", path.display());
            let mut roster = Roster::new(store, config.sheets.clone());
            run(&mut roster, cli.command)
        }
        None => {
            let store = HttpStore::new(config.clone()).context("Failed to create HTTP client")?;
            let mut roster = Roster::new(store, config.sheets.clone());
            run(&mut roster, cli.command)
        }
    }
}

fn run<S: SheetStore>(roster: &mut Roster<S>, command: Commands) -> Result<()> {
    match command {
        Commands::Plays { query, children, adults } => {
            let kind = match (children, adults) {
                (true, _) => PlayKind::Child,
                (_, true) => PlayKind::Adult,
                _ => PlayKind::All,
            };
            print!("{}", pipeline::plays_report(&roster.records()?, &query, kind)?);
        }
        Commands::Play { name } => {
            print!("{}", pipeline::play_detail_report(&roster.records()?, &name)?);
        }
        Commands::People { plays, name, play } => {
            print!("{}", pipeline::people_report(&roster.records()?, plays, &name, &play)?);
        }
        Commands::Person { name } => {
            print!("{}", pipeline::person_report(&roster.records()?, &name)?);
        }
        Commands::ComparePeople { a, b, tsv } => {
            let records = roster.records()?;
            if tsv {
                println!("{}", overlap_to_tsv(&compare_people(&records, &a, &b), &a, &b)?);
            } else {
                print!("{}", pipeline::compare_people_report(&records, &a, &b)?);
            }
        }
        Commands::ComparePlays { a, b, tsv } => {
            let records = roster.records()?;
            if tsv {
                println!("{}", comparison_to_tsv(&compare_plays(&records, &a, &b), &a, &b)?);
            } else {
                print!("{}", pipeline::compare_plays_report(&records, &a, &b)?);
            }
        }
        Commands::Query { category, play, person, tsv } => {
            let records = roster.records()?;
            let filter = RecordFilter { category, play, person };
            if tsv {
                let matched: Vec<_> = records.iter().filter(|r| filter.matches(r)).cloned().collect();
                println!("{}", records_to_tsv(&matched, &[])?);
            } else {
                print!("{}", pipeline::query_report(&records, &filter)?);
            }
        }
        Commands::Stats => {
            print!("{}", pipeline::stats_report(&roster.records()?)?);
        }
        Commands::Categories => {
            for category in KNOWN_CATEGORIES {
                let class = classify(category);
                let marker = if class.is_extra { " (extra)" } else { "" };
                println!("{:<28} {}{}", category, class.style.label(), marker);
            }
        }
        Commands::Sheets => {
            print!("{}", pipeline::sheets_report(&roster.list_sheets()?)?);
        }
        Commands::Show { sheet, search, page, grouped } => {
            let snapshot = roster.sheet(&sheet)?;
            if grouped {
                print!("{}", pipeline::sheet_groups_report(&snapshot)?);
            } else {
                print!("{}", pipeline::sheet_report(&snapshot, &search, page)?);
            }
        }
        Commands::Suggest { sheet, column } => {
            let snapshot = roster.sheet(&sheet)?;
            let suggestions = column_suggestions(&snapshot.raw_rows(), column + 1);
            for value in suggestions.get(column).into_iter().flatten() {
                println!("{}", value);
            }
        }
        Commands::UpdateCell { sheet, row, col, value } => {
            let snapshot = roster.sheet(&sheet)?;
            let row_ref = snapshot
                .row_ref(row)
                .ok_or_else(|| anyhow::anyhow!("Row {} not found in '{}'", row, sheet))?;
            roster.update_cell(&row_ref, col, &value)?;
            println!("Updated row {} column {} of '{}'.", row, col, sheet);
        }
        Commands::Append { sheet, values } => {
            roster.append_row(&sheet, &values)?;
            println!("Appended 1 row to '{}'.", sheet);
        }
        Commands::Insert { sheet, after, values } => {
            let snapshot = roster.sheet(&sheet)?;
            let slot = after.map(InsertSlot::After).unwrap_or(InsertSlot::Top);
            let target = insert_target(&snapshot, slot)?;
            roster.insert_row_after(&target, &values)?;
            println!("Inserted 1 row into '{}'.", sheet);
        }
        Commands::Delete { sheet, row, hold } => {
            let snapshot = roster.sheet(&sheet)?;
            let row_ref = snapshot
                .row_ref(row)
                .ok_or_else(|| anyhow::anyhow!("Row {} not found in '{}'", row, sheet))?;
            let category = snapshot
                .row(row)
                .map(|r| snapshot.columns().cell(&r.cells, roster_toolkit::parser::Field::Category))
                .unwrap_or_default();
            let outcome = roster.delete_row(&row_ref)?;
            print!("{}", pipeline::delete_report(&outcome)?);
            if let (true, Some(last)) = (hold, &outcome.last_assignment) {
                roster.move_to_holding(&last.person, &category)?;
                println!("Moved '{}' to the holding list.", last.person);
            }
        }
        Commands::Archive { play } => {
            let outcome = roster.archive_play(&play)?;
            print!("{}", pipeline::archive_report(&play, &outcome)?);
        }
        Commands::SyncExtras => {
            let added = roster.sync_extras()?;
            if added > 0 {
                println!("{} extras added to the list.", added);
            } else {
                println!("Extras list is up to date.");
            }
        }
        Commands::Extras => {
            print!("{}", pipeline::extras_report(&roster.reconcile_extras()?)?);
        }
        Commands::Hold { person, category } => {
            roster.move_to_holding(&person, &category)?;
            println!("Added '{}' to the holding list.", person.trim());
        }
        Commands::Copy { sheet, rows } => {
            let snapshot = roster.sheet(&sheet)?;
            let mut selection = Selection::new();
            for row in rows {
                if !selection.contains(row) {
                    selection.click(row, ClickModifier::Toggle);
                }
            }
            let clipboard = Clipboard::copy(&selection, &snapshot);
            println!("{}", clipboard.to_tsv().context("Failed to render copied rows")?);
            eprintln!("{} rows copied", clipboard.len());
        }
        Commands::Paste { sheet, input } => {
            let text = match input {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            let clipboard = Clipboard::from_tsv(&text).context("Failed to parse pasted rows")?;
            let report = roster.paste(&sheet, &clipboard);
            print!("{}", pipeline::paste_report(&sheet, &report)?);
            if !report.is_complete() {
                anyhow::bail!("{} rows could not be pasted", report.failed().len());
            }
        }
        Commands::Notifications { limit, seen_file, mark_read } => {
            let name = roster.names().notifications.clone();
            let mut seen = SeenSet::load(&seen_file)?;
            let snapshot = roster.sheet(&name)?;
            print!("{}", pipeline::notifications_report(&snapshot, &seen, limit)?);
            if mark_read {
                seen.mark_all_seen(snapshot.len());
                seen.save(&seen_file)?;
            }
        }
        Commands::ClearNotifications { oldest } => {
            if oldest {
                roster.delete_oldest_notifications()?;
                println!("Deleted the oldest notifications.");
            } else {
                roster.clear_notifications()?;
                println!("Notifications cleared.");
            }
        }
        Commands::DeleteNotification { index } => {
            roster.delete_notification(index)?;
            println!("Notification deleted.");
        }
        Commands::Export { output, tsv, categories } => {
            let records = roster.records()?;
            if tsv {
                std::fs::write(&output, records_to_tsv(&records, &categories)?)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
            } else {
                export_workbook(&output, &records)?;
            }
            println!("Wrote {} rows to {}", records.len(), output.display());
        }
    }
    Ok(())
}
