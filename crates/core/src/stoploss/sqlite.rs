use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{NewViolation, StopLossError, StopLossViolation, ViolationFilter, ViolationStore};
use crate::campaign::{format_timestamp, parse_timestamp};

const VIOLATION_COLUMNS: &str = "id, campaign_id, manager_id, kind, net_revenue, active_hours, \
     detected_at, acknowledged_at, acknowledged_by";

fn db(e: rusqlite::Error) -> StopLossError {
    StopLossError::Database(e.to_string())
}

/// SQLite-backed violation store.
pub struct SqliteViolationStore {
    conn: Mutex<Connection>,
}

impl SqliteViolationStore {
    pub fn new(path: &Path) -> Result<Self, StopLossError> {
        let conn = Connection::open(path).map_err(db)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, StopLossError> {
        let conn = Connection::open_in_memory().map_err(db)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StopLossError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS stop_loss_violations (
                id TEXT PRIMARY KEY,
                campaign_id TEXT NOT NULL,
                manager_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                net_revenue REAL NOT NULL,
                active_hours REAL NOT NULL,
                detected_at TEXT NOT NULL,
                acknowledged_at TEXT,
                acknowledged_by TEXT
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_violations_open
                ON stop_loss_violations(campaign_id, kind) WHERE acknowledged_at IS NULL;
            CREATE INDEX IF NOT EXISTS idx_violations_manager ON stop_loss_violations(manager_id);
            CREATE INDEX IF NOT EXISTS idx_violations_detected ON stop_loss_violations(detected_at);
            "#,
        )
        .map_err(db)
    }

    fn row_to_violation(row: &rusqlite::Row) -> rusqlite::Result<StopLossViolation> {
        let kind: String = row.get(3)?;
        let kind = kind.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
        })?;
        let detected_at: String = row.get(6)?;
        let acknowledged_at = row
            .get::<_, Option<String>>(7)?
            .map(|raw| parse_timestamp(7, &raw))
            .transpose()?;

        Ok(StopLossViolation {
            id: row.get(0)?,
            campaign_id: row.get(1)?,
            manager_id: row.get(2)?,
            kind,
            net_revenue: row.get(4)?,
            active_hours: row.get(5)?,
            detected_at: parse_timestamp(6, &detected_at)?,
            acknowledged_at,
            acknowledged_by: row.get(8)?,
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<StopLossViolation>, StopLossError> {
        let sql = format!(
            "SELECT {} FROM stop_loss_violations WHERE id = ?",
            VIOLATION_COLUMNS
        );
        conn.query_row(&sql, params![id], Self::row_to_violation)
            .optional()
            .map_err(db)
    }

    fn build_where_clause(filter: &ViolationFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref manager_id) = filter.manager_id {
            conditions.push("manager_id = ?");
            params.push(Box::new(manager_id.clone()));
        }
        if let Some(ref campaign_id) = filter.campaign_id {
            conditions.push("campaign_id = ?");
            params.push(Box::new(campaign_id.clone()));
        }
        if filter.open_only {
            conditions.push("acknowledged_at IS NULL");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (where_clause, params)
    }
}

impl ViolationStore for SqliteViolationStore {
    fn record(&self, violation: NewViolation) -> Result<Option<StopLossViolation>, StopLossError> {
        let conn = self.conn.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();

        // The partial unique index turns a duplicate open violation into a no-op.
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO stop_loss_violations \
                 (id, campaign_id, manager_id, kind, net_revenue, active_hours, detected_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    violation.campaign_id,
                    violation.manager_id,
                    violation.kind.as_str(),
                    violation.net_revenue,
                    violation.active_hours,
                    format_timestamp(&violation.detected_at),
                ],
            )
            .map_err(db)?;

        if inserted == 0 {
            return Ok(None);
        }
        Self::fetch(&conn, &id)
    }

    fn get(&self, id: &str) -> Result<Option<StopLossViolation>, StopLossError> {
        let conn = self.conn.lock().unwrap();
        Self::fetch(&conn, id)
    }

    fn list(&self, filter: &ViolationFilter) -> Result<Vec<StopLossViolation>, StopLossError> {
        let conn = self.conn.lock().unwrap();
        let (where_clause, mut params) = Self::build_where_clause(filter);
        let sql = format!(
            "SELECT {} FROM stop_loss_violations {} ORDER BY detected_at DESC, rowid DESC LIMIT ? OFFSET ?",
            VIOLATION_COLUMNS, where_clause
        );
        params.push(Box::new(filter.limit));
        params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql).map_err(db)?;
        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_violation)
            .map_err(db)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db)
    }

    fn count(&self, filter: &ViolationFilter) -> Result<i64, StopLossError> {
        let conn = self.conn.lock().unwrap();
        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM stop_loss_violations {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(db)
    }

    fn acknowledge(
        &self,
        id: &str,
        acknowledged_by: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StopLossError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE stop_loss_violations SET acknowledged_at = ?, acknowledged_by = ? \
                 WHERE id = ? AND acknowledged_at IS NULL",
                params![format_timestamp(&at), acknowledged_by, id],
            )
            .map_err(db)?;
        Ok(changed == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stoploss::ViolationKind;
    use chrono::Duration;

    fn new_violation(campaign_id: &str, kind: ViolationKind) -> NewViolation {
        NewViolation {
            campaign_id: campaign_id.to_string(),
            manager_id: "manager-1".to_string(),
            kind,
            net_revenue: -40.0,
            active_hours: 2.0,
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_and_get() {
        let store = SqliteViolationStore::in_memory().unwrap();
        let violation = store
            .record(new_violation("c-1", ViolationKind::ImmediateLoss))
            .unwrap()
            .expect("should insert");

        assert!(violation.is_open());
        assert_eq!(violation.kind, ViolationKind::ImmediateLoss);
        assert_eq!(violation.net_revenue, -40.0);

        let fetched = store.get(&violation.id).unwrap().unwrap();
        assert_eq!(fetched, violation);
    }

    #[test]
    fn test_one_open_violation_per_kind() {
        let store = SqliteViolationStore::in_memory().unwrap();

        assert!(store
            .record(new_violation("c-1", ViolationKind::ImmediateLoss))
            .unwrap()
            .is_some());
        assert!(store
            .record(new_violation("c-1", ViolationKind::ImmediateLoss))
            .unwrap()
            .is_none());
        // Other kind and other campaign are independent.
        assert!(store
            .record(new_violation("c-1", ViolationKind::TimeBasedLoss))
            .unwrap()
            .is_some());
        assert!(store
            .record(new_violation("c-2", ViolationKind::ImmediateLoss))
            .unwrap()
            .is_some());

        assert_eq!(store.count(&ViolationFilter::new()).unwrap(), 3);
    }

    #[test]
    fn test_acknowledge_reopens_slot() {
        let store = SqliteViolationStore::in_memory().unwrap();
        let first = store
            .record(new_violation("c-1", ViolationKind::ImmediateLoss))
            .unwrap()
            .unwrap();

        assert!(store.acknowledge(&first.id, "manager-1", Utc::now()).unwrap());
        assert!(!store.acknowledge(&first.id, "manager-1", Utc::now()).unwrap());

        let acked = store.get(&first.id).unwrap().unwrap();
        assert_eq!(acked.acknowledged_by.as_deref(), Some("manager-1"));
        assert!(!acked.is_open());

        // A new breach after acknowledgement is recorded again.
        assert!(store
            .record(new_violation("c-1", ViolationKind::ImmediateLoss))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_list_filters() {
        let store = SqliteViolationStore::in_memory().unwrap();
        let mut older = new_violation("c-1", ViolationKind::ImmediateLoss);
        older.detected_at = Utc::now() - Duration::hours(1);
        let older = store.record(older).unwrap().unwrap();

        let mut other_manager = new_violation("c-2", ViolationKind::TimeBasedLoss);
        other_manager.manager_id = "manager-2".to_string();
        store.record(other_manager).unwrap();

        store.acknowledge(&older.id, "manager-1", Utc::now()).unwrap();

        let all = store.list(&ViolationFilter::new()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].campaign_id, "c-2");

        let open = store.list(&ViolationFilter::new().open_only()).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].campaign_id, "c-2");

        let mine = store
            .list(&ViolationFilter::new().with_manager("manager-1"))
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, older.id);
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("launchpro.db");

        let id = {
            let store = SqliteViolationStore::new(&db_path).unwrap();
            store
                .record(new_violation("c-1", ViolationKind::ImmediateLoss))
                .unwrap()
                .unwrap()
                .id
        };

        let store = SqliteViolationStore::new(&db_path).unwrap();
        assert!(store.get(&id).unwrap().is_some());
    }
}
