/// Read filter used by the reporting queries. Dates are inclusive `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub vo: Option<String>,
    pub role: Option<String>,
}

/// Per-date totals, the grouping the reporting layer charts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyUsage {
    pub date: String,
    pub jobs: u64,
    pub used_cputime: u64,
    pub used_walltime: u64,
}
