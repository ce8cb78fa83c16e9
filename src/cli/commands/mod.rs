//! CLI command implementations.

mod codes;
mod report;
mod scan;
mod serve;
mod status;

pub use codes::{cmd_codes, cmd_fetch_sheet};
pub use report::{cmd_naac, cmd_report};
pub use scan::cmd_scan;
pub use serve::cmd_serve;
pub use status::cmd_status;
