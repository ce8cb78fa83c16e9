//! Service layer for naac-drive business logic.
//!
//! This module contains domain logic separated from UI concerns.
//! Services can be used by the CLI, the web server, or other interfaces.

pub mod report;
pub mod scan;

pub use report::{build_report, export_report, naac_report, NaacReport, Report};
pub use scan::{ScanEvent, ScanSummary, Scanner};
