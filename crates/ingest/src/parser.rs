use std::collections::BTreeMap;

use crate::types::LineError;

/// Event kind marking job completion in PBS accounting logs.
pub const EXIT_EVENT: &str = "E";

/// One accounting log line split into its four `;`-separated fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLine<'a> {
    pub timestamp: &'a str,
    pub kind: &'a str,
    pub jobid: &'a str,
    pub attributes: &'a str,
}

impl LogLine<'_> {
    pub fn is_exit(&self) -> bool {
        self.kind == EXIT_EVENT
    }
}

/// Splits a log line. Returns `Ok(None)` for blank lines and for events
/// other than job exits, which are skipped without a diagnostic.
pub fn split_line(line: &str) -> Result<Option<LogLine<'_>>, LineError> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    let fields = line.split(';').collect::<Vec<_>>();
    if let Some(kind) = fields.get(1)
        && *kind != EXIT_EVENT
    {
        return Ok(None);
    }
    let &[timestamp, kind, jobid, attributes] = fields.as_slice() else {
        return Err(LineError::MalformedLine {
            found: fields.len(),
        });
    };
    Ok(Some(LogLine {
        timestamp,
        kind,
        jobid,
        attributes,
    }))
}

/// Splits the attribute blob into raw `key=value` pairs.
/// Later occurrences of a key replace earlier ones.
pub fn parse_attributes(blob: &str) -> Result<BTreeMap<String, String>, LineError> {
    let mut attrs = BTreeMap::new();
    for token in blob.split_whitespace() {
        let malformed = || LineError::MalformedAttribute {
            token: token.to_string(),
        };
        let (key, value) = token.split_once('=').ok_or_else(malformed)?;
        if key.is_empty() || value.contains('=') {
            return Err(malformed());
        }
        attrs.insert(key.to_string(), value.to_string());
    }
    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_exit_line() {
        let line = "11/23/2009 00:00:00;E;2931170.ce01;user=atlasplt group=atlas\n";
        let parsed = split_line(line).expect("split").expect("exit line");
        assert_eq!(parsed.timestamp, "11/23/2009 00:00:00");
        assert_eq!(parsed.jobid, "2931170.ce01");
        assert_eq!(parsed.attributes, "user=atlasplt group=atlas");
        assert!(parsed.is_exit());
    }

    #[test]
    fn skips_other_events_and_blank_lines() {
        assert_eq!(
            split_line("11/23/2009 00:00:00;Q;2931170.ce01;queue=egee48h"),
            Ok(None)
        );
        assert_eq!(split_line("11/23/2009 00:00:00;S;1.ce01"), Ok(None));
        assert_eq!(split_line("   \r\n"), Ok(None));
    }

    #[test]
    fn rejects_wrong_field_count_for_exit_events() {
        assert_eq!(
            split_line("11/23/2009 00:00:00;E;1.ce01"),
            Err(LineError::MalformedLine { found: 3 })
        );
        assert_eq!(
            split_line("11/23/2009 00:00:00;E;1.ce01;a=b;c=d"),
            Err(LineError::MalformedLine { found: 5 })
        );
        assert_eq!(
            split_line("garbage"),
            Err(LineError::MalformedLine { found: 1 })
        );
    }

    #[test]
    fn parses_attribute_pairs() {
        let attrs = parse_attributes("user=atlasplt  exec_host=wn14.lcg/7 Exit_status=0 ")
            .expect("attrs");
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs["exec_host"], "wn14.lcg/7");
        assert_eq!(attrs["Exit_status"], "0");
    }

    #[test]
    fn last_duplicate_wins() {
        let attrs = parse_attributes("queue=short queue=long").expect("attrs");
        assert_eq!(attrs["queue"], "long");
    }

    #[test]
    fn empty_values_are_kept() {
        let attrs = parse_attributes("jobname=").expect("attrs");
        assert_eq!(attrs["jobname"], "");
    }

    #[test]
    fn rejects_tokens_without_exactly_one_equals() {
        for token in ["user", "a=b=c", "=value"] {
            assert_eq!(
                parse_attributes(&format!("queue=q {token}")),
                Err(LineError::MalformedAttribute {
                    token: token.to_string(),
                })
            );
        }
    }
}
