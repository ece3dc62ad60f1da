use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use super::{AuditError, AuditEvent, AuditFilter, AuditRecord, AuditStore};
use crate::campaign::{format_timestamp, parse_timestamp};

/// SQLite-backed audit store
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    /// Create a new SQLite audit store, creating the database file and tables if needed
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        let conn = Connection::open(path).map_err(|e| AuditError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite audit store (useful for testing)
    pub fn in_memory() -> Result<Self, AuditError> {
        let conn = Connection::open_in_memory().map_err(|e| AuditError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), AuditError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS audit_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_type TEXT NOT NULL,
                campaign_id TEXT,
                user_id TEXT,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_events_timestamp ON audit_events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_events_campaign_id ON audit_events(campaign_id);
            CREATE INDEX IF NOT EXISTS idx_audit_events_event_type ON audit_events(event_type);
            CREATE INDEX IF NOT EXISTS idx_audit_events_user_id ON audit_events(user_id);
            "#,
        )
        .map_err(|e| AuditError::Database(e.to_string()))
    }

    fn build_where_clause(filter: &AuditFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref campaign_id) = filter.campaign_id {
            conditions.push("campaign_id = ?");
            params.push(Box::new(campaign_id.clone()));
        }

        if let Some(ref event_type) = filter.event_type {
            conditions.push("event_type = ?");
            params.push(Box::new(event_type.clone()));
        }

        if let Some(ref user_id) = filter.user_id {
            conditions.push("user_id = ?");
            params.push(Box::new(user_id.clone()));
        }

        if let Some(status) = filter.status {
            conditions.push(
                "(json_extract(data, '$.from_status') = ? \
                 OR json_extract(data, '$.to_status') = ? \
                 OR json_extract(data, '$.status') = ?)",
            );
            for _ in 0..3 {
                params.push(Box::new(status.as_str()));
            }
        }

        if let Some(platform) = filter.platform {
            conditions.push("json_extract(data, '$.platform') = ?");
            params.push(Box::new(platform.as_str()));
        }

        if let Some(ref from) = filter.from {
            conditions.push("timestamp >= ?");
            params.push(Box::new(format_timestamp(from)));
        }

        if let Some(ref to) = filter.to {
            conditions.push("timestamp <= ?");
            params.push(Box::new(format_timestamp(to)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

impl AuditStore for SqliteAuditStore {
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError> {
        let conn = self.conn.lock().unwrap();

        let data_json = serde_json::to_string(&record.data)
            .map_err(|e| AuditError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO audit_events (timestamp, event_type, campaign_id, user_id, data) VALUES (?, ?, ?, ?, ?)",
            params![
                format_timestamp(&record.timestamp),
                record.event_type,
                record.campaign_id,
                record.user_id,
                data_json,
            ],
        )
        .map_err(|e| AuditError::Database(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT id, timestamp, event_type, campaign_id, user_id, data FROM audit_events {} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AuditError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .map_err(|e| AuditError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row_result in rows {
            let (id, timestamp, event_type, campaign_id, user_id, data_json) =
                row_result.map_err(|e| AuditError::Database(e.to_string()))?;

            let data: AuditEvent = serde_json::from_str(&data_json)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;

            let timestamp = parse_timestamp(1, &timestamp)
                .map_err(|e| AuditError::Database(e.to_string()))?;

            records.push(AuditRecord {
                id,
                timestamp,
                event_type,
                campaign_id,
                user_id,
                data,
            });
        }

        Ok(records)
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM audit_events {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| AuditError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::{CampaignStatus, Platform};
    use chrono::{Duration, Utc};

    fn create_test_store() -> SqliteAuditStore {
        SqliteAuditStore::in_memory().unwrap()
    }

    fn record(event: AuditEvent) -> AuditRecord {
        AuditRecord {
            id: 0,
            timestamp: Utc::now(),
            event_type: event.event_type().to_string(),
            campaign_id: event.campaign_id().map(String::from),
            user_id: event.user_id().map(String::from),
            data: event,
        }
    }

    fn service_started() -> AuditRecord {
        record(AuditEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc123".to_string(),
        })
    }

    fn campaign_created(campaign_id: &str, user_id: &str) -> AuditRecord {
        record(AuditEvent::CampaignCreated {
            campaign_id: campaign_id.to_string(),
            created_by: user_id.to_string(),
            name: "promo".to_string(),
            platforms: vec!["meta".to_string(), "taboola".to_string()],
            queue_order: Some(1),
        })
    }

    #[test]
    fn test_insert_and_query() {
        let store = create_test_store();

        let id = store.insert(&service_started()).unwrap();
        assert!(id > 0);

        let results = store.query(&AuditFilter::new()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert_eq!(results[0].event_type, "service_started");
    }

    #[test]
    fn test_query_filters() {
        let store = create_test_store();

        store.insert(&service_started()).unwrap();
        store.insert(&campaign_created("c-1", "alice")).unwrap();
        store.insert(&campaign_created("c-2", "alice")).unwrap();
        store.insert(&campaign_created("c-3", "bob")).unwrap();

        let by_type = AuditFilter::new().with_event_type("campaign_created");
        assert_eq!(store.query(&by_type).unwrap().len(), 3);

        let by_campaign = AuditFilter::new().with_campaign_id("c-2");
        let results = store.query(&by_campaign).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].campaign_id.as_deref(), Some("c-2"));

        let by_user = AuditFilter::new().with_user_id("alice");
        assert_eq!(store.count(&by_user).unwrap(), 2);
    }

    #[test]
    fn test_status_filter_matches_either_side_of_transition() {
        let store = create_test_store();

        let transition = |from: CampaignStatus, to: CampaignStatus| {
            record(AuditEvent::CampaignStatusChanged {
                campaign_id: "c-1".to_string(),
                from_status: from.as_str().to_string(),
                to_status: to.as_str().to_string(),
                reason: None,
            })
        };
        store
            .insert(&transition(CampaignStatus::Queued, CampaignStatus::PendingArticle))
            .unwrap();
        store
            .insert(&transition(
                CampaignStatus::PendingArticle,
                CampaignStatus::AwaitingTracking,
            ))
            .unwrap();
        store
            .insert(&record(AuditEvent::StaleCampaignFailed {
                campaign_id: "c-2".to_string(),
                status: CampaignStatus::PendingArticle.as_str().to_string(),
                reason: "stuck".to_string(),
            }))
            .unwrap();
        store.insert(&campaign_created("c-3", "alice")).unwrap();

        let pending = AuditFilter::new().with_status(CampaignStatus::PendingArticle);
        assert_eq!(store.count(&pending).unwrap(), 3);

        let narrowed = pending.with_campaign_id("c-1");
        let results = store.query(&narrowed).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.event_type == "campaign_status_changed"));

        let queued = AuditFilter::new().with_status(CampaignStatus::Queued);
        assert_eq!(store.count(&queued).unwrap(), 1);
        assert_eq!(
            store
                .count(&AuditFilter::new().with_status(CampaignStatus::Active))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_platform_filter() {
        let store = create_test_store();

        store
            .insert(&record(AuditEvent::PlatformLaunchSucceeded {
                campaign_id: "c-1".to_string(),
                platform: "meta".to_string(),
                account_id: "act-1".to_string(),
                platform_campaign_id: "m-1".to_string(),
                ad_count: 2,
                strategy: "abo".to_string(),
            }))
            .unwrap();
        store
            .insert(&record(AuditEvent::PlatformLaunchFailed {
                campaign_id: "c-1".to_string(),
                platform: "taboola".to_string(),
                account_id: "tb-9".to_string(),
                error: "budget too low".to_string(),
            }))
            .unwrap();
        store.insert(&campaign_created("c-1", "alice")).unwrap();

        let taboola = AuditFilter::for_campaign("c-1").with_platform(Platform::Taboola);
        let results = store.query(&taboola).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].event_type, "platform_launch_failed");

        let meta = AuditFilter::new().with_platform(Platform::Meta);
        assert_eq!(store.count(&meta).unwrap(), 1);
    }

    #[test]
    fn test_newest_first() {
        let store = create_test_store();
        let now = Utc::now();

        let mut older = campaign_created("c-old", "alice");
        older.timestamp = now - Duration::minutes(5);
        store.insert(&older).unwrap();
        store.insert(&campaign_created("c-new", "alice")).unwrap();

        let results = store.query(&AuditFilter::new()).unwrap();
        assert_eq!(results[0].campaign_id.as_deref(), Some("c-new"));
        assert_eq!(results[1].campaign_id.as_deref(), Some("c-old"));
    }

    #[test]
    fn test_query_with_time_range() {
        let store = create_test_store();

        let now = Utc::now();
        let mut old_record = service_started();
        old_record.timestamp = now - Duration::hours(2);
        store.insert(&old_record).unwrap();
        store.insert(&service_started()).unwrap();

        let filter = AuditFilter::new().with_time_range(Some(now - Duration::hours(1)), None);
        assert_eq!(store.query(&filter).unwrap().len(), 1);
    }

    #[test]
    fn test_pagination() {
        let store = create_test_store();

        for i in 0..5 {
            store
                .insert(&campaign_created(&format!("c-{}", i), "alice"))
                .unwrap();
        }

        let filter = AuditFilter::new().with_limit(2).with_offset(4);
        assert_eq!(store.query(&filter).unwrap().len(), 1);
        assert_eq!(store.count(&AuditFilter::new()).unwrap(), 5);
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("audit.db");

        let store = SqliteAuditStore::new(&db_path).unwrap();
        store.insert(&service_started()).unwrap();

        assert!(db_path.exists());
        assert_eq!(store.query(&AuditFilter::new()).unwrap().len(), 1);
    }
}
