use accounting_core::AccountingRecord;
use rusqlite::Row;

pub(crate) const RECORD_COLUMNS: &str = "jobid, date, timestamp, user, vo, role, queue, \
     start_time, end_time, wn, req_cputime, req_walltime, req_mem, used_cputime, \
     used_walltime, used_mem, used_vmem, exit_status";

pub(crate) fn row_to_record(
    row: &Row<'_>,
) -> std::result::Result<AccountingRecord, rusqlite::Error> {
    Ok(AccountingRecord {
        jobid: row.get(0)?,
        date: row.get(1)?,
        timestamp: row.get(2)?,
        user: row.get(3)?,
        vo: row.get(4)?,
        role: row.get(5)?,
        queue: row.get(6)?,
        start_time: row.get(7)?,
        end_time: row.get(8)?,
        wn: row.get(9)?,
        req_cputime: row.get(10)?,
        req_walltime: row.get(11)?,
        req_mem: row.get(12)?,
        used_cputime: row.get(13)?,
        used_walltime: row.get(14)?,
        used_mem: row.get(15)?,
        used_vmem: row.get(16)?,
        exit_status: row.get(17)?,
        extra: Default::default(),
    })
}
