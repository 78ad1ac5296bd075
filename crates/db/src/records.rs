use accounting_core::AccountingRecord;
use rusqlite::{Connection, OptionalExtension, params};

use crate::Db;
use crate::error::Result;
use crate::helpers::{RECORD_COLUMNS, row_to_record};
use crate::types::{DailyUsage, RecordFilter};

const UPSERT_SQL: &str = r#"
    INSERT INTO accounting (
      jobid, date, timestamp, user, vo, role, queue, start_time, end_time, wn,
      req_cputime, req_walltime, req_mem, used_cputime, used_walltime, used_mem,
      used_vmem, exit_status
    ) VALUES (
      ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
    )
    ON CONFLICT(jobid) DO UPDATE SET
      date = excluded.date,
      timestamp = excluded.timestamp,
      user = excluded.user,
      vo = excluded.vo,
      role = excluded.role,
      queue = excluded.queue,
      start_time = excluded.start_time,
      end_time = excluded.end_time,
      wn = excluded.wn,
      req_cputime = excluded.req_cputime,
      req_walltime = excluded.req_walltime,
      req_mem = excluded.req_mem,
      used_cputime = excluded.used_cputime,
      used_walltime = excluded.used_walltime,
      used_mem = excluded.used_mem,
      used_vmem = excluded.used_vmem,
      exit_status = excluded.exit_status
"#;

const FILTER_SQL: &str = r#"
    (?1 IS NULL OR date >= ?1)
    AND (?2 IS NULL OR date <= ?2)
    AND (?3 IS NULL OR vo = ?3)
    AND (?4 IS NULL OR role = ?4)
"#;

fn upsert_with(conn: &Connection, record: &AccountingRecord) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(UPSERT_SQL)?;
    stmt.execute(params![
        record.jobid,
        record.date,
        record.timestamp,
        record.user,
        record.vo,
        record.role,
        record.queue,
        record.start_time,
        record.end_time,
        record.wn,
        record.req_cputime,
        record.req_walltime,
        record.req_mem,
        record.used_cputime,
        record.used_walltime,
        record.used_mem,
        record.used_vmem,
        record.exit_status,
    ])
}

impl Db {
    /// Inserts the record, replacing any row with the same `jobid`.
    pub fn upsert_record(&self, record: &AccountingRecord) -> Result<()> {
        upsert_with(&self.conn, record)?;
        Ok(())
    }

    /// Upserts a batch inside one transaction; nothing is kept if any row fails.
    pub fn upsert_records(&mut self, records: &[AccountingRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut written = 0usize;
        for record in records {
            written += upsert_with(&tx, record)?;
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn get_record(&self, jobid: &str) -> Result<Option<AccountingRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM accounting WHERE jobid = ?1");
        let record = self
            .conn
            .query_row(&sql, params![jobid], row_to_record)
            .optional()?;
        Ok(record)
    }

    pub fn count_records(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM accounting", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub fn list_records(&self, filter: &RecordFilter) -> Result<Vec<AccountingRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM accounting WHERE {FILTER_SQL} ORDER BY date ASC, jobid ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![filter.start_date, filter.end_date, filter.vo, filter.role],
            row_to_record,
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub fn daily_usage(&self, filter: &RecordFilter) -> Result<Vec<DailyUsage>> {
        let sql = format!(
            r#"
            SELECT date, COUNT(*), COALESCE(SUM(used_cputime), 0), COALESCE(SUM(used_walltime), 0)
            FROM accounting
            WHERE {FILTER_SQL}
            GROUP BY date
            ORDER BY date ASC
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![filter.start_date, filter.end_date, filter.vo, filter.role],
            |row| {
                Ok(DailyUsage {
                    date: row.get(0)?,
                    jobs: row.get::<_, i64>(1)?.max(0) as u64,
                    used_cputime: row.get::<_, i64>(2)?.max(0) as u64,
                    used_walltime: row.get::<_, i64>(3)?.max(0) as u64,
                })
            },
        )?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}
