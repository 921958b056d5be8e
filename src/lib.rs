//! Roster Toolkit
//!
//! Staffing views and sheet editing for a theater's production roster.
//!
//! The roster is a flat sheet of `play, category, role, person(s)` rows kept
//! in an external spreadsheet store. This library provides:
//! - `text`, `parser`: Turkish-aware normalization and row parsing
//! - `aggregate`, `category`: per-play and per-person views, overlaps, stats
//! - `sheet`, `cache`, `sync`: fetched snapshots and position bookkeeping
//! - `store`, `http`, `mutation`: the store contract and safe writes against it
//! - `notifications`, `export`, `pipeline`: feed, spreadsheet output, reports
//!
//! Binaries:
//! - `roster`: reports and edits from the command line

pub mod aggregate;
pub mod cache;
pub mod category;
pub mod config;
pub mod export;
pub mod http;
pub mod mutation;
pub mod notifications;
pub mod parser;
pub mod pipeline;
pub mod sheet;
pub mod store;
pub mod sync;
pub mod text;

pub use mutation::{Roster, RosterError};
pub use parser::Record;
pub use store::{MemoryStore, SheetStore, StoreError};
