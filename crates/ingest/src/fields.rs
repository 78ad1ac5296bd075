use std::collections::BTreeMap;

/// Raw PBS attribute name to canonical column. `None` marks attributes that
/// are recognized but intentionally not stored.
const FIELD_MAP: &[(&str, Option<&str>)] = &[
    ("Exit_status", Some("exit_status")),
    ("Resource_List.cput", Some("req_cputime")),
    ("Resource_List.mem", Some("req_mem")),
    ("Resource_List.pmem", None),
    ("Resource_List.pvmem", None),
    ("Resource_List.vmem", None),
    ("Resource_List.neednodes", None),
    ("Resource_List.nodect", None),
    ("Resource_List.nodes", None),
    ("Resource_List.walltime", Some("req_walltime")),
    ("ctime", None),
    ("end", Some("end_time")),
    ("etime", Some("timestamp")),
    ("exec_host", Some("wn")),
    ("group", Some("group")),
    ("jobname", None),
    ("owner", None),
    ("queue", Some("queue")),
    ("qtime", None),
    ("resources_used.cput", Some("used_cputime")),
    ("resources_used.mem", Some("used_mem")),
    ("resources_used.vmem", Some("used_vmem")),
    ("resources_used.walltime", Some("used_walltime")),
    ("session", None),
    ("start", Some("start_time")),
    ("user", Some("user")),
];

/// Column a raw attribute lands in. Unknown keys pass through unchanged;
/// dropped keys yield `None`.
pub fn canonical_column(raw_key: &str) -> Option<&str> {
    match FIELD_MAP.iter().find(|(key, _)| *key == raw_key) {
        Some((_, target)) => *target,
        None => Some(raw_key),
    }
}

/// Renames raw attributes to canonical columns, dropping the unstored ones.
pub fn map_fields(raw: BTreeMap<String, String>) -> BTreeMap<String, String> {
    raw.into_iter()
        .filter_map(|(key, value)| {
            canonical_column(&key).map(|column| (column.to_string(), value))
        })
        .collect()
}
