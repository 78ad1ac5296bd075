use std::collections::BTreeMap;

use accounting_core::{
    AccountingRecord, IdentityResolver, short_hostname, to_bytes, to_integer, to_seconds,
};
use chrono::NaiveDateTime;

use crate::fields::map_fields;
use crate::parser::{LogLine, parse_attributes};
use crate::types::LineError;

const EVENT_TIME_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Calendar date (`YYYY-MM-DD`) of a `MM/DD/YYYY HH:MM:SS` event time.
pub fn event_date(raw: &str) -> Result<String, LineError> {
    let parsed = NaiveDateTime::parse_from_str(raw.trim(), EVENT_TIME_FORMAT).map_err(|_| {
        LineError::InvalidTimestamp {
            value: raw.to_string(),
        }
    })?;
    Ok(parsed.date().format("%Y-%m-%d").to_string())
}

fn required(field: &'static str, value: Option<String>) -> Result<String, LineError> {
    value.ok_or(LineError::MissingField { field })
}

fn memory(field: &'static str, value: Option<&str>) -> Result<u64, LineError> {
    value
        .map(|raw| to_bytes(raw).map_err(|source| LineError::UnitFormat { field, source }))
        .transpose()
        .map(Option::unwrap_or_default)
}

fn duration(field: &'static str, value: Option<&str>) -> Result<u64, LineError> {
    value
        .map(|raw| to_seconds(raw).map_err(|source| LineError::UnitFormat { field, source }))
        .transpose()
        .map(Option::unwrap_or_default)
}

fn integer(field: &'static str, value: Option<&str>) -> Result<Option<i64>, LineError> {
    value
        .map(|raw| to_integer(raw).map_err(|source| LineError::UnitFormat { field, source }))
        .transpose()
}

/// Collects canonical columns for one exit event before conversion.
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    jobid: String,
    date: String,
    timestamp: Option<String>,
    user: Option<String>,
    group: Option<String>,
    queue: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    wn: Option<String>,
    req_cputime: Option<String>,
    req_walltime: Option<String>,
    req_mem: Option<String>,
    used_cputime: Option<String>,
    used_walltime: Option<String>,
    used_mem: Option<String>,
    used_vmem: Option<String>,
    exit_status: Option<String>,
    extra: BTreeMap<String, String>,
}

impl RecordBuilder {
    pub fn new(jobid: &str, event_time: &str) -> Result<Self, LineError> {
        Ok(Self {
            jobid: jobid.to_string(),
            date: event_date(event_time)?,
            ..Self::default()
        })
    }

    /// Assigns one canonical column. Unknown columns are kept as extras.
    pub fn set(&mut self, column: &str, value: String) {
        let slot = match column {
            "timestamp" => &mut self.timestamp,
            "user" => &mut self.user,
            "group" => &mut self.group,
            "queue" => &mut self.queue,
            "start_time" => &mut self.start_time,
            "end_time" => &mut self.end_time,
            "wn" => &mut self.wn,
            "req_cputime" => &mut self.req_cputime,
            "req_walltime" => &mut self.req_walltime,
            "req_mem" => &mut self.req_mem,
            "used_cputime" => &mut self.used_cputime,
            "used_walltime" => &mut self.used_walltime,
            "used_mem" => &mut self.used_mem,
            "used_vmem" => &mut self.used_vmem,
            "exit_status" => &mut self.exit_status,
            _ => {
                self.extra.insert(column.to_string(), value);
                return;
            }
        };
        *slot = Some(value);
    }

    pub fn apply(mut self, fields: BTreeMap<String, String>) -> Self {
        for (column, value) in fields {
            self.set(&column, value);
        }
        self
    }

    /// Validates required columns, converts units and resolves the VO/role.
    pub fn build(self, resolver: &IdentityResolver) -> Result<AccountingRecord, LineError> {
        let used_mem = required("used_mem", self.used_mem)?;
        let used_vmem = required("used_vmem", self.used_vmem)?;
        let used_cputime = required("used_cputime", self.used_cputime)?;
        let used_walltime = required("used_walltime", self.used_walltime)?;
        let user = required("user", self.user)?;
        let group = required("group", self.group)?;

        let identity = resolver.resolve(&user, &group);
        Ok(AccountingRecord {
            jobid: self.jobid,
            date: self.date,
            timestamp: integer("timestamp", self.timestamp.as_deref())?,
            user,
            vo: identity.vo,
            role: identity.role,
            queue: self.queue,
            start_time: integer("start_time", self.start_time.as_deref())?,
            end_time: integer("end_time", self.end_time.as_deref())?,
            wn: self.wn.as_deref().map(|host| short_hostname(host).to_string()),
            req_cputime: duration("req_cputime", self.req_cputime.as_deref())?,
            req_walltime: duration("req_walltime", self.req_walltime.as_deref())?,
            req_mem: memory("req_mem", self.req_mem.as_deref())?,
            used_cputime: duration("used_cputime", Some(&used_cputime))?,
            used_walltime: duration("used_walltime", Some(&used_walltime))?,
            used_mem: memory("used_mem", Some(&used_mem))?,
            used_vmem: memory("used_vmem", Some(&used_vmem))?,
            exit_status: integer("exit_status", self.exit_status.as_deref())?,
            extra: self.extra,
        })
    }
}

/// Turns one exit-event line into a validated record.
pub fn build_record(
    line: &LogLine<'_>,
    resolver: &IdentityResolver,
) -> Result<AccountingRecord, LineError> {
    let fields = map_fields(parse_attributes(line.attributes)?);
    RecordBuilder::new(line.jobid, line.timestamp)?
        .apply(fields)
        .build(resolver)
}

#[cfg(test)]
mod tests {
    use accounting_core::{NULL_ROLE, UnitFormatError};

    use super::*;
    use crate::parser::split_line;

    const SAMPLE: &str = "11/23/2009 00:00:00;E;2931170.ce01.lcg.cscs.ch;user=atlasplt group=atlas jobname=STDIN queue=egee48h ctime=1258930667 qtime=1258930667 etime=1258930667 start=1258930691 owner=atlasplt@ce01.lcg.cscs.ch exec_host=wn14.lcg.cscs.ch/7 Resource_List.cput=48:00:00 Resource_List.mem=2000mb Resource_List.neednodes=1 Resource_List.nodect=1 Resource_List.nodes=1 Resource_List.walltime=60:00:00 session=13810 end=1258930800 Exit_status=0 resources_used.cput=00:00:04 resources_used.mem=26312kb resources_used.vmem=253280kb resources_used.walltime=00:01:49";

    fn build(line: &str) -> Result<AccountingRecord, LineError> {
        let parsed = split_line(line).expect("split").expect("exit line");
        build_record(&parsed, &IdentityResolver::builtin())
    }

    #[test]
    fn builds_sample_record() {
        let record = build(SAMPLE).expect("record");
        assert_eq!(
            record,
            AccountingRecord {
                jobid: "2931170.ce01.lcg.cscs.ch".to_string(),
                date: "2009-11-23".to_string(),
                timestamp: Some(1_258_930_667),
                user: "atlasplt".to_string(),
                vo: "atlas".to_string(),
                role: "pilot".to_string(),
                queue: Some("egee48h".to_string()),
                start_time: Some(1_258_930_691),
                end_time: Some(1_258_930_800),
                wn: Some("wn14".to_string()),
                req_cputime: 172_800,
                req_walltime: 216_000,
                req_mem: 2000 * 1024 * 1024,
                used_cputime: 4,
                used_walltime: 109,
                used_mem: 26_312 * 1024,
                used_vmem: 253_280 * 1024,
                exit_status: Some(0),
                extra: BTreeMap::new(),
            }
        );
    }

    #[test]
    fn request_fields_default_to_zero() {
        let record = build(
            "01/02/2010 10:00:00;E;7.ce01;user=u1 group=dteam resources_used.cput=00:00:01 \
             resources_used.mem=1kb resources_used.vmem=2kb resources_used.walltime=00:00:02",
        )
        .expect("record");
        assert_eq!(record.req_mem, 0);
        assert_eq!(record.req_cputime, 0);
        assert_eq!(record.req_walltime, 0);
        assert_eq!(record.timestamp, None);
        assert_eq!(record.wn, None);
        assert_eq!(record.vo, "dteam");
        assert_eq!(record.role, NULL_ROLE);
    }

    #[test]
    fn missing_usage_field_is_named() {
        let line = SAMPLE.replace(" resources_used.mem=26312kb", "");
        assert_eq!(
            build(&line),
            Err(LineError::MissingField { field: "used_mem" })
        );
        let line = SAMPLE.replace(" group=atlas", "");
        assert_eq!(build(&line), Err(LineError::MissingField { field: "group" }));
    }

    #[test]
    fn unit_errors_name_the_column() {
        let line = SAMPLE.replace("resources_used.walltime=00:01:49", "resources_used.walltime=109");
        assert_eq!(
            build(&line),
            Err(LineError::UnitFormat {
                field: "used_walltime",
                source: UnitFormatError::Duration("109".to_string()),
            })
        );
        let line = SAMPLE.replace("Resource_List.mem=2000mb", "Resource_List.mem=2tb");
        assert!(matches!(
            build(&line),
            Err(LineError::UnitFormat { field: "req_mem", .. })
        ));
        let line = SAMPLE.replace("end=1258930800", "end=later");
        assert!(matches!(
            build(&line),
            Err(LineError::UnitFormat { field: "end_time", .. })
        ));
    }

    #[test]
    fn rejects_bad_event_time() {
        let line = SAMPLE.replace("11/23/2009 00:00:00", "2009-11-23 00:00:00");
        assert!(matches!(
            build(&line),
            Err(LineError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn unknown_attributes_become_extras() {
        let line = format!("{SAMPLE} accounting_id=abc");
        let record = build(&line).expect("record");
        assert_eq!(record.extra.get("accounting_id").map(String::as_str), Some("abc"));
    }

    #[test]
    fn set_assigns_columns_by_name() {
        let mut builder = RecordBuilder::new("1", "11/23/2009 00:00:00").expect("builder");
        builder.set("used_mem", "1kb".to_string());
        builder.set("used_vmem", "1kb".to_string());
        builder.set("used_cputime", "0:00:01".to_string());
        builder.set("used_walltime", "0:00:01".to_string());
        builder.set("user", "atlasprd".to_string());
        builder.set("group", "atlas".to_string());
        builder.set("exec_host_alias", "x".to_string());
        let record = builder.build(&IdentityResolver::builtin()).expect("record");
        assert_eq!(record.role, "production");
        assert_eq!(record.used_mem, 1024);
        assert_eq!(record.extra.len(), 1);
    }
}
