//! SQLite-backed job store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{Job, JobDescriptor, JobFilter, JobStatus, JobStore, JobStoreError, OriginContext};

const JOB_COLUMNS: &str = "id, target_url, dedup_key, retry_url, resource_type, display_name, \
                           display_artist, origin, status, created_at, updated_at";

/// How long a writer waits on another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// SQLite-backed job store.
///
/// All access goes through one connection behind a mutex, so every store
/// method is a single critical section. Read-then-write methods take the
/// database write lock up front, so separate processes sharing the file
/// serialize on it as well.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Create a new SQLite job store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, JobStoreError> {
        let conn = Connection::open(path).map_err(db_error)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(db_error)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;").map_err(db_error)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite job store (useful for testing).
    pub fn in_memory() -> Result<Self, JobStoreError> {
        let conn = Connection::open_in_memory().map_err(db_error)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobStoreError> {
        // `active` mirrors JobStatus::is_active; the partial unique index keeps
        // at most one active job per dedup key.
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                target_url TEXT NOT NULL,
                dedup_key TEXT NOT NULL,
                retry_url TEXT NOT NULL,
                resource_type TEXT NOT NULL,
                display_name TEXT NOT NULL,
                display_artist TEXT NOT NULL,
                origin TEXT NOT NULL,
                status TEXT NOT NULL,
                state TEXT NOT NULL,
                active INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_active_dedup_key
                ON jobs(dedup_key) WHERE active = 1;
            CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state);
            CREATE INDEX IF NOT EXISTS idx_jobs_updated_at ON jobs(updated_at);
            "#,
        )
        .map_err(db_error)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, JobStoreError> {
        self.conn
            .lock()
            .map_err(|_| JobStoreError::Database("connection mutex poisoned".to_string()))
    }

    fn build_where_clause(filter: &JobFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref state) = filter.state {
            conditions.push("state = ?");
            params.push(Box::new(state.clone()));
        }

        if let Some(ref dedup_key) = filter.dedup_key {
            conditions.push("dedup_key = ?");
            params.push(Box::new(dedup_key.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let origin_json: String = row.get(7)?;
        let status_json: String = row.get(8)?;
        let created_at_str: String = row.get(9)?;
        let updated_at_str: String = row.get(10)?;

        let origin: OriginContext =
            serde_json::from_str(&origin_json).map_err(|e| conversion_error(7, e))?;
        let status: JobStatus =
            serde_json::from_str(&status_json).map_err(|e| conversion_error(8, e))?;
        let created_at = parse_timestamp(&created_at_str).map_err(|e| conversion_error(9, e))?;
        let updated_at = parse_timestamp(&updated_at_str).map_err(|e| conversion_error(10, e))?;

        Ok(Job {
            id: row.get(0)?,
            target_url: row.get(1)?,
            dedup_key: row.get(2)?,
            retry_url: row.get(3)?,
            resource_type: row.get(4)?,
            display_name: row.get(5)?,
            display_artist: row.get(6)?,
            origin,
            status,
            created_at,
            updated_at,
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<Job>, JobStoreError> {
        conn.query_row(
            &format!("SELECT {} FROM jobs WHERE id = ?", JOB_COLUMNS),
            params![id],
            Self::row_to_job,
        )
        .optional()
        .map_err(db_error)
    }

    fn insert(conn: &Connection, job: &Job) -> Result<(), JobStoreError> {
        let origin_json = serde_json::to_string(&job.origin).map_err(db_error)?;
        let status_json = serde_json::to_string(&job.status).map_err(db_error)?;

        conn.execute(
            &format!(
                "INSERT INTO jobs ({}, state, active) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                JOB_COLUMNS
            ),
            params![
                job.id,
                job.target_url,
                job.dedup_key,
                job.retry_url,
                job.resource_type,
                job.display_name,
                job.display_artist,
                origin_json,
                status_json,
                timestamp(&job.created_at),
                timestamp(&job.updated_at),
                job.status.state_type(),
                job.status.is_active(),
            ],
        )
        .map_err(db_error)?;

        Ok(())
    }

    fn write_status(
        conn: &Connection,
        current: Job,
        new_status: JobStatus,
    ) -> Result<Job, JobStoreError> {
        let now = Utc::now();
        let status_json = serde_json::to_string(&new_status).map_err(db_error)?;

        conn.execute(
            "UPDATE jobs SET status = ?, state = ?, active = ?, updated_at = ? WHERE id = ?",
            params![
                status_json,
                new_status.state_type(),
                new_status.is_active(),
                timestamp(&now),
                current.id,
            ],
        )
        .map_err(db_error)?;

        Ok(Job {
            status: new_status,
            updated_at: now,
            ..current
        })
    }
}

impl JobStore for SqliteJobStore {
    fn admit(&self, descriptor: JobDescriptor, dedup_key: &str) -> Result<Job, JobStoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error)?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM jobs WHERE dedup_key = ? AND active = 1",
                params![dedup_key],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;

        let status = match existing {
            Some(existing_job_id) => JobStatus::Duplicate {
                message: format!(
                    "Duplicate download attempt: {} is already being processed by job {}",
                    descriptor.target_url, existing_job_id
                ),
                existing_job_id,
            },
            None => JobStatus::Queued,
        };

        let job = Job::new(descriptor, dedup_key, status);
        Self::insert(&tx, &job)?;
        tx.commit().map_err(db_error)?;

        Ok(job)
    }

    fn get(&self, id: &str) -> Result<Option<Job>, JobStoreError> {
        let conn = self.lock()?;
        Self::fetch(&conn, id)
    }

    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobStoreError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM jobs {} ORDER BY created_at ASC, rowid ASC LIMIT ? OFFSET ?",
            JOB_COLUMNS, where_clause
        );

        let mut stmt = conn.prepare(&sql).map_err(db_error)?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_job)
            .map_err(db_error)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_error)
    }

    fn count(&self, filter: &JobFilter) -> Result<i64, JobStoreError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM jobs {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(db_error)
    }

    fn transition(&self, id: &str, new_status: JobStatus) -> Result<Job, JobStoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error)?;

        let current = Self::fetch(&tx, id)?.ok_or_else(|| JobStoreError::NotFound(id.to_string()))?;

        if !current.status.can_transition_to(&new_status) {
            return Err(JobStoreError::InvalidTransition {
                job_id: id.to_string(),
                from: current.status.state_type().to_string(),
                to: new_status.state_type().to_string(),
            });
        }

        let updated = Self::write_status(&tx, current, new_status)?;
        tx.commit().map_err(db_error)?;

        Ok(updated)
    }

    fn claim_next(&self) -> Result<Option<Job>, JobStoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error)?;

        let next = tx
            .query_row(
                &format!(
                    "SELECT {} FROM jobs WHERE state = 'queued' \
                     ORDER BY created_at ASC, rowid ASC LIMIT 1",
                    JOB_COLUMNS
                ),
                [],
                Self::row_to_job,
            )
            .optional()
            .map_err(db_error)?;

        let Some(job) = next else {
            return Ok(None);
        };

        let claimed = Self::write_status(&tx, job, JobStatus::Processing)?;
        tx.commit().map_err(db_error)?;

        Ok(Some(claimed))
    }

    fn purge_terminal(&self, before: DateTime<Utc>) -> Result<usize, JobStoreError> {
        let conn = self.lock()?;

        conn.execute(
            "DELETE FROM jobs WHERE active = 0 AND updated_at < ?",
            params![timestamp(&before)],
        )
        .map_err(db_error)
    }
}

/// Fixed-width UTC timestamps so stored values compare lexicographically.
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

fn db_error(err: impl std::fmt::Display) -> JobStoreError {
    JobStoreError::Database(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    const ALBUM_URL: &str = "https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy";

    fn create_test_store() -> SqliteJobStore {
        SqliteJobStore::in_memory().unwrap()
    }

    fn descriptor(url: &str) -> JobDescriptor {
        JobDescriptor::album(url, "Abbey Road", "The Beatles")
            .with_origin(OriginContext::new().with("parent_request_type", "artist"))
    }

    #[test]
    fn test_admit_queues_new_job() {
        let store = create_test_store();

        let job = store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();

        assert!(!job.id.is_empty());
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.dedup_key, ALBUM_URL);
        assert_eq!(job.display_name, "Abbey Road");
    }

    #[test]
    fn test_get_roundtrips_job() {
        let store = create_test_store();
        let created = store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.origin, created.origin);
        assert_eq!(fetched.status, JobStatus::Queued);
        assert_eq!(fetched.created_at.timestamp(), created.created_at.timestamp());
    }

    #[test]
    fn test_get_nonexistent_job() {
        let store = create_test_store();
        assert!(store.get("nonexistent-id").unwrap().is_none());
    }

    #[test]
    fn test_admit_same_key_while_active_is_duplicate() {
        let store = create_test_store();
        let first = store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();

        let second = store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();

        assert_ne!(second.id, first.id);
        assert_eq!(second.status.existing_job_id(), Some(first.id.as_str()));

        // The duplicate is recorded and pollable.
        let stored = store.get(&second.id).unwrap().unwrap();
        assert!(stored.is_duplicate());
    }

    #[test]
    fn test_duplicate_points_at_processing_job() {
        let store = create_test_store();
        let first = store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();
        store.transition(&first.id, JobStatus::Processing).unwrap();

        let second = store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();
        assert_eq!(second.status.existing_job_id(), Some(first.id.as_str()));
    }

    #[test]
    fn test_admit_after_terminal_is_not_duplicate() {
        let store = create_test_store();

        let first = store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();
        store.transition(&first.id, JobStatus::Processing).unwrap();
        store.transition(&first.id, JobStatus::Complete).unwrap();
        let second = store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();
        assert_eq!(second.status, JobStatus::Queued);

        store
            .transition(
                &second.id,
                JobStatus::Error {
                    message: "network".to_string(),
                },
            )
            .unwrap();
        let third = store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();
        assert_eq!(third.status, JobStatus::Queued);
    }

    #[test]
    fn test_duplicates_do_not_hold_key() {
        let store = create_test_store();
        let first = store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();
        let dup = store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();
        assert!(dup.is_duplicate());

        store
            .transition(
                &first.id,
                JobStatus::Error {
                    message: "cancelled".to_string(),
                },
            )
            .unwrap();

        let next = store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();
        assert_eq!(next.status, JobStatus::Queued);
    }

    #[test]
    fn test_concurrent_admit_single_winner() {
        let store = Arc::new(create_test_store());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap())
            })
            .collect();

        let jobs: Vec<Job> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<&Job> = jobs.iter().filter(|j| j.status == JobStatus::Queued).collect();

        assert_eq!(winners.len(), 1);
        for job in jobs.iter().filter(|j| j.is_duplicate()) {
            assert_eq!(job.status.existing_job_id(), Some(winners[0].id.as_str()));
        }
    }

    #[test]
    fn test_separate_connections_admit_single_winner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");
        let stores: Vec<Arc<SqliteJobStore>> = (0..4)
            .map(|_| Arc::new(SqliteJobStore::new(&path).unwrap()))
            .collect();

        for round in 0..10 {
            let key = format!("https://x/album/{}", round);
            let barrier = Arc::new(std::sync::Barrier::new(stores.len()));

            let handles: Vec<_> = stores
                .iter()
                .map(|store| {
                    let store = Arc::clone(store);
                    let barrier = Arc::clone(&barrier);
                    let key = key.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        store.admit(descriptor(&key), &key)
                    })
                })
                .collect();

            let jobs: Vec<Job> = handles
                .into_iter()
                .map(|h| h.join().unwrap().expect("admit must not fail on lock contention"))
                .collect();

            let winners: Vec<&Job> = jobs
                .iter()
                .filter(|j| j.status == JobStatus::Queued)
                .collect();
            assert_eq!(winners.len(), 1);
            for job in jobs.iter().filter(|j| j.id != winners[0].id) {
                assert_eq!(job.status.existing_job_id(), Some(winners[0].id.as_str()));
            }
        }
    }

    #[test]
    fn test_separate_connections_claim_each_job_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");
        let seed = SqliteJobStore::new(&path).unwrap();
        for i in 0..6 {
            let url = format!("https://x/album/{}", i);
            seed.admit(descriptor(&url), &url).unwrap();
        }

        let barrier = Arc::new(std::sync::Barrier::new(3));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let store = SqliteJobStore::new(&path).unwrap();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    let mut claimed = Vec::new();
                    while let Some(job) = store.claim_next().unwrap() {
                        claimed.push(job.id);
                    }
                    claimed
                })
            })
            .collect();

        let mut claimed: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(claimed.len(), 6);
        claimed.sort();
        claimed.dedup();
        assert_eq!(claimed.len(), 6);
        assert_eq!(seed.count(&JobFilter::new().with_state("processing")).unwrap(), 6);
    }

    #[test]
    fn test_invalid_transition() {
        let store = create_test_store();
        let job = store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();

        let result = store.transition(&job.id, JobStatus::Complete);
        assert!(matches!(
            result,
            Err(JobStoreError::InvalidTransition { ref from, ref to, .. })
                if from == "queued" && to == "complete"
        ));
    }

    #[test]
    fn test_transition_nonexistent_job() {
        let store = create_test_store();
        let result = store.transition("missing", JobStatus::Processing);
        assert!(matches!(result, Err(JobStoreError::NotFound(_))));
    }

    #[test]
    fn test_claim_next_is_fifo() {
        let store = create_test_store();
        let first = store.admit(descriptor("https://x/album/1"), "https://x/album/1").unwrap();
        let second = store.admit(descriptor("https://x/album/2"), "https://x/album/2").unwrap();

        let claimed = store.claim_next().unwrap().unwrap();
        assert_eq!(claimed.id, first.id);
        assert_eq!(claimed.status, JobStatus::Processing);

        let claimed = store.claim_next().unwrap().unwrap();
        assert_eq!(claimed.id, second.id);

        assert!(store.claim_next().unwrap().is_none());
    }

    #[test]
    fn test_list_and_count_with_filter() {
        let store = create_test_store();
        store.admit(descriptor("https://x/album/1"), "https://x/album/1").unwrap();
        store.admit(descriptor("https://x/album/1"), "https://x/album/1").unwrap();
        store.admit(descriptor("https://x/album/2"), "https://x/album/2").unwrap();

        assert_eq!(store.count(&JobFilter::new()).unwrap(), 3);
        assert_eq!(store.count(&JobFilter::new().with_state("queued")).unwrap(), 2);
        assert_eq!(store.count(&JobFilter::new().with_state("duplicate")).unwrap(), 1);
        assert_eq!(
            store
                .count(&JobFilter::new().with_dedup_key("https://x/album/1"))
                .unwrap(),
            2
        );

        let page = store.list(&JobFilter::new().with_limit(2)).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].target_url, "https://x/album/1");

        let rest = store.list(&JobFilter::new().with_offset(2)).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].target_url, "https://x/album/2");
    }

    #[test]
    fn test_purge_terminal() {
        let store = create_test_store();
        let done = store.admit(descriptor("https://x/album/1"), "https://x/album/1").unwrap();
        store.transition(&done.id, JobStatus::Processing).unwrap();
        store.transition(&done.id, JobStatus::Complete).unwrap();
        let pending = store.admit(descriptor("https://x/album/2"), "https://x/album/2").unwrap();

        // Nothing is older than an hour ago.
        assert_eq!(store.purge_terminal(Utc::now() - Duration::hours(1)).unwrap(), 0);

        let purged = store.purge_terminal(Utc::now() + Duration::seconds(1)).unwrap();
        assert_eq!(purged, 1);
        assert!(store.get(&done.id).unwrap().is_none());
        assert!(store.get(&pending.id).unwrap().is_some());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");

        let id = {
            let store = SqliteJobStore::new(&path).unwrap();
            store.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap().id
        };

        let reopened = SqliteJobStore::new(&path).unwrap();
        let job = reopened.get(&id).unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Queued);

        // Dedup state survives the reopen.
        let dup = reopened.admit(descriptor(ALBUM_URL), ALBUM_URL).unwrap();
        assert_eq!(dup.status.existing_job_id(), Some(id.as_str()));
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let a = timestamp(&Utc::now());
        let b = timestamp(&(Utc::now() + Duration::days(3)));
        assert_eq!(a.len(), b.len());
        assert!(a.ends_with('Z'));
    }
}
