// WAN route audit library
//
// Parses captured routing tables, groups devices by site and compares every
// pair of devices at a site by exact subnet.

pub mod audit;
pub mod capture;
pub mod collect;
pub mod config;
pub mod error;
pub mod report;
pub mod routes;
pub mod running_config;

pub use audit::{AuditRun, SiteKey};
pub use error::{AuditError, AuditResult};
pub use report::AuditReport;
