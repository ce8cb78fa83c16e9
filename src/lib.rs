//! Classify accreditation documents stored in Google Drive folders.
//!
//! Files named `<date>_<code>_<text>` are matched against a code table read
//! from the classification workbook, assigned to an academic year, persisted
//! in SQLite and aggregated into per-category counts and a NAAC rollup.

pub mod aggregate;
pub mod classify;
pub mod cli;
pub mod codes;
pub mod config;
pub mod drive;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod repository;
pub mod server;
pub mod services;
pub mod year_range;

pub use error::{Error, Result};
