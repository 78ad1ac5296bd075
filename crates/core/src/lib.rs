use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod identity;
pub mod units;

pub use identity::{Identity, IdentityResolver, IdentityRule, IdentityRuleError, NULL_ROLE};
pub use units::{UnitFormatError, to_bytes, to_integer, to_seconds};

/// One normalized row describing a completed batch job.
///
/// Memory columns are bytes, duration columns are seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingRecord {
    pub jobid: String,
    /// Calendar date of the exit event, `YYYY-MM-DD`.
    pub date: String,
    /// Epoch seconds taken from `etime`, when the log line carries one.
    pub timestamp: Option<i64>,
    pub user: String,
    pub vo: String,
    pub role: String,
    pub queue: Option<String>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub wn: Option<String>,
    pub req_cputime: u64,
    pub req_walltime: u64,
    pub req_mem: u64,
    pub used_cputime: u64,
    pub used_walltime: u64,
    pub used_mem: u64,
    pub used_vmem: u64,
    pub exit_status: Option<i64>,
    /// Attributes with no canonical column; kept for inspection, never stored.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// Worker-node short hostname: the host part before the first dot.
pub fn short_hostname(exec_host: &str) -> &str {
    exec_host.split('.').next().unwrap_or(exec_host)
}
