#![allow(dead_code)]

use std::path::PathBuf;

use accounting_core::AccountingRecord;
use accounting_db::Db;
use tempfile::TempDir;

pub struct TestDb {
    pub _dir: TempDir,
    pub db: Db,
    pub path: PathBuf,
}

pub fn setup_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let mut db = Db::open(&path).expect("open db");
    db.ensure_schema().expect("ensure schema");
    TestDb {
        _dir: dir,
        db,
        path,
    }
}

pub fn make_record(jobid: &str, date: &str, vo: &str, role: &str) -> AccountingRecord {
    AccountingRecord {
        jobid: jobid.to_string(),
        date: date.to_string(),
        timestamp: Some(1_258_930_667),
        user: "atlasplt".to_string(),
        vo: vo.to_string(),
        role: role.to_string(),
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
        extra: Default::default(),
    }
}
