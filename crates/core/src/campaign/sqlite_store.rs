//! SQLite-backed campaign store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;

use super::{
    BudgetMode, Campaign, CampaignError, CampaignFilter, CampaignStatus, CampaignStore,
    ClaimResult, CreateCampaignRequest, ErrorDetails, Platform, PlatformTarget, StatusUpdate,
    TargetStatus, TargetUpdate,
};

const CAMPAIGN_COLUMNS: &str = "id, name, manager_id, status, queue_order, queued_at, \
     created_at, updated_at, status_changed_at, launched_at, retry_count, error_details, \
     offer, article_reference, tracking_link, creative";

const TARGET_COLUMNS: &str = "id, campaign_id, platform, account_id, budget_mode, \
     daily_budget, status, platform_campaign_id, platform_ad_ids, error, launched_at";

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
pub(crate) fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp column. A malformed value is a conversion error on
/// column `idx`, never a substitute time.
pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("invalid timestamp {:?}: {}", raw, e)))
}

fn parse_optional_timestamp(
    idx: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|raw| parse_timestamp(idx, &raw)).transpose()
}

/// `'PENDING_ARTICLE', 'AWAITING_TRACKING', ...` for `IN (...)` clauses.
fn processing_list() -> String {
    CampaignStatus::PROCESSING
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn db(e: rusqlite::Error) -> CampaignError {
    CampaignError::Database(e.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CampaignError> {
    serde_json::to_string(value).map_err(|e| CampaignError::Database(e.to_string()))
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn json_column<T: DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| conversion_error(idx, e.to_string()))
}

fn budget_mode_str(mode: BudgetMode) -> &'static str {
    match mode {
        BudgetMode::Cbo => "cbo",
        BudgetMode::Abo => "abo",
    }
}

/// SQLite-backed campaign store.
pub struct SqliteCampaignStore {
    conn: Mutex<Connection>,
}

impl SqliteCampaignStore {
    /// Create a new SQLite campaign store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, CampaignError> {
        let conn = Connection::open(path).map_err(db)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite campaign store (useful for testing).
    pub fn in_memory() -> Result<Self, CampaignError> {
        let conn = Connection::open_in_memory().map_err(db)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CampaignError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS campaigns (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                manager_id TEXT NOT NULL,
                status TEXT NOT NULL,
                queue_order INTEGER,
                queued_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                status_changed_at TEXT NOT NULL,
                launched_at TEXT,
                retry_count INTEGER NOT NULL DEFAULT 0,
                error_details TEXT,
                offer TEXT NOT NULL,
                article_reference TEXT,
                tracking_link TEXT,
                creative TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_campaigns_status ON campaigns(status);
            CREATE INDEX IF NOT EXISTS idx_campaigns_manager ON campaigns(manager_id);
            CREATE INDEX IF NOT EXISTS idx_campaigns_queue
                ON campaigns(status, queue_order, queued_at, created_at);

            CREATE TABLE IF NOT EXISTS platform_targets (
                id TEXT PRIMARY KEY,
                campaign_id TEXT NOT NULL REFERENCES campaigns(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                platform TEXT NOT NULL,
                account_id TEXT NOT NULL,
                budget_mode TEXT NOT NULL,
                daily_budget REAL NOT NULL,
                status TEXT NOT NULL,
                platform_campaign_id TEXT,
                platform_ad_ids TEXT NOT NULL DEFAULT '[]',
                error TEXT,
                launched_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_platform_targets_campaign
                ON platform_targets(campaign_id, position);
            "#,
        )
        .map_err(db)?;

        Ok(())
    }

    fn build_where_clause(filter: &CampaignFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(ref manager_id) = filter.manager_id {
            conditions.push("manager_id = ?");
            params.push(Box::new(manager_id.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_campaign(row: &rusqlite::Row) -> rusqlite::Result<Campaign> {
        let status_str: String = row.get(3)?;
        let status = status_str
            .parse::<CampaignStatus>()
            .map_err(|e| conversion_error(3, e))?;

        let retry_count: u32 = row.get(10)?;

        let error_details: Option<ErrorDetails> = row
            .get::<_, Option<String>>(11)?
            .map(|raw| json_column::<ErrorDetails>(11, &raw))
            .transpose()?
            .map(|mut details| {
                details.retry_count = retry_count;
                details
            });

        let offer_json: String = row.get(12)?;
        let creative = row
            .get::<_, Option<String>>(15)?
            .map(|raw| json_column(15, &raw))
            .transpose()?;

        Ok(Campaign {
            id: row.get(0)?,
            name: row.get(1)?,
            manager_id: row.get(2)?,
            status,
            queue_order: row.get(4)?,
            queued_at: parse_timestamp(5, &row.get::<_, String>(5)?)?,
            created_at: parse_timestamp(6, &row.get::<_, String>(6)?)?,
            updated_at: parse_timestamp(7, &row.get::<_, String>(7)?)?,
            status_changed_at: parse_timestamp(8, &row.get::<_, String>(8)?)?,
            launched_at: parse_optional_timestamp(9, row.get(9)?)?,
            retry_count,
            error_details,
            offer: json_column(12, &offer_json)?,
            article_reference: row.get(13)?,
            tracking_link: row.get(14)?,
            creative,
            platform_targets: Vec::new(),
        })
    }

    fn row_to_target(row: &rusqlite::Row) -> rusqlite::Result<PlatformTarget> {
        let platform: String = row.get(2)?;
        let budget_mode: String = row.get(4)?;
        let status: String = row.get(6)?;
        let ad_ids: String = row.get(8)?;

        Ok(PlatformTarget {
            id: row.get(0)?,
            campaign_id: row.get(1)?,
            platform: platform
                .parse::<Platform>()
                .map_err(|e| conversion_error(2, e))?,
            account_id: row.get(3)?,
            budget_mode: match budget_mode.as_str() {
                "abo" => BudgetMode::Abo,
                _ => BudgetMode::Cbo,
            },
            daily_budget: row.get(5)?,
            status: status
                .parse::<TargetStatus>()
                .map_err(|e| conversion_error(6, e))?,
            platform_campaign_id: row.get(7)?,
            platform_ad_ids: json_column(8, &ad_ids)?,
            error: row.get(9)?,
            launched_at: parse_optional_timestamp(10, row.get(10)?)?,
        })
    }

    fn load_targets(conn: &Connection, campaign_id: &str) -> Result<Vec<PlatformTarget>, CampaignError> {
        let sql = format!(
            "SELECT {} FROM platform_targets WHERE campaign_id = ? ORDER BY position ASC",
            TARGET_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).map_err(db)?;
        let rows = stmt
            .query_map(params![campaign_id], Self::row_to_target)
            .map_err(db)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db)
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<Campaign>, CampaignError> {
        let sql = format!("SELECT {} FROM campaigns WHERE id = ?", CAMPAIGN_COLUMNS);
        let campaign = conn
            .query_row(&sql, params![id], Self::row_to_campaign)
            .optional()
            .map_err(db)?;

        match campaign {
            Some(mut campaign) => {
                campaign.platform_targets = Self::load_targets(conn, &campaign.id)?;
                Ok(Some(campaign))
            }
            None => Ok(None),
        }
    }

    fn fetch_required(conn: &Connection, id: &str) -> Result<Campaign, CampaignError> {
        Self::fetch(conn, id)?.ok_or_else(|| CampaignError::NotFound(id.to_string()))
    }

    fn fetch_status(conn: &Connection, id: &str) -> Result<Option<CampaignStatus>, CampaignError> {
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM campaigns WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db)?;

        status
            .map(|s| s.parse::<CampaignStatus>().map_err(CampaignError::Database))
            .transpose()
    }

    fn target_exists(conn: &Connection, target_id: &str) -> Result<bool, CampaignError> {
        conn.query_row(
            "SELECT 1 FROM platform_targets WHERE id = ?",
            params![target_id],
            |_| Ok(()),
        )
        .optional()
        .map(|found| found.is_some())
        .map_err(db)
    }

    /// Run a campaign query and attach targets to every row.
    fn query_campaigns(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Campaign>, CampaignError> {
        let mut stmt = conn.prepare(sql).map_err(db)?;
        let rows = stmt
            .query_map(params, Self::row_to_campaign)
            .map_err(db)?;

        let mut campaigns = Vec::new();
        for row_result in rows {
            let mut campaign = row_result.map_err(db)?;
            campaign.platform_targets = Self::load_targets(conn, &campaign.id)?;
            campaigns.push(campaign);
        }

        Ok(campaigns)
    }

    fn validate(request: &CreateCampaignRequest) -> Result<(), CampaignError> {
        if request.name.trim().is_empty() {
            return Err(CampaignError::Invalid("name cannot be empty".to_string()));
        }
        if request.manager_id.trim().is_empty() {
            return Err(CampaignError::Invalid(
                "manager_id cannot be empty".to_string(),
            ));
        }
        if request.offer.landing_url.trim().is_empty() {
            return Err(CampaignError::Invalid(
                "offer.landing_url cannot be empty".to_string(),
            ));
        }
        for target in &request.targets {
            if !target.daily_budget.is_finite() || target.daily_budget <= 0.0 {
                return Err(CampaignError::Invalid(format!(
                    "{} target daily_budget must be positive",
                    target.platform
                )));
            }
        }
        Ok(())
    }
}

impl CampaignStore for SqliteCampaignStore {
    fn create(&self, request: CreateCampaignRequest) -> Result<Campaign, CampaignError> {
        Self::validate(&request)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(db)?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let now_str = format_timestamp(&now);
        let offer_json = to_json(&request.offer)?;

        tx.execute(
            "INSERT INTO campaigns (id, name, manager_id, status, queue_order, queued_at, created_at, updated_at, status_changed_at, retry_count, offer) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
            params![
                id,
                request.name,
                request.manager_id,
                CampaignStatus::Queued.as_str(),
                request.queue_order,
                now_str,
                now_str,
                now_str,
                now_str,
                offer_json,
            ],
        )
        .map_err(db)?;

        let mut targets = Vec::with_capacity(request.targets.len());
        for (position, target) in request.targets.into_iter().enumerate() {
            let target_id = uuid::Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO platform_targets (id, campaign_id, position, platform, account_id, budget_mode, daily_budget, status) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    target_id,
                    id,
                    position as i64,
                    target.platform.as_str(),
                    target.account_id,
                    budget_mode_str(target.budget_mode),
                    target.daily_budget,
                    TargetStatus::Pending.as_str(),
                ],
            )
            .map_err(db)?;

            targets.push(PlatformTarget {
                id: target_id,
                campaign_id: id.clone(),
                platform: target.platform,
                account_id: target.account_id,
                budget_mode: target.budget_mode,
                daily_budget: target.daily_budget,
                status: TargetStatus::Pending,
                platform_campaign_id: None,
                platform_ad_ids: Vec::new(),
                error: None,
                launched_at: None,
            });
        }

        tx.commit().map_err(db)?;

        Ok(Campaign {
            id,
            name: request.name,
            manager_id: request.manager_id,
            status: CampaignStatus::Queued,
            queue_order: request.queue_order,
            queued_at: now,
            created_at: now,
            updated_at: now,
            status_changed_at: now,
            launched_at: None,
            retry_count: 0,
            error_details: None,
            offer: request.offer,
            article_reference: None,
            tracking_link: None,
            creative: None,
            platform_targets: targets,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Campaign>, CampaignError> {
        let conn = self.conn.lock().unwrap();
        Self::fetch(&conn, id)
    }

    fn list(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>, CampaignError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!(
            "SELECT {} FROM campaigns {} ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?",
            CAMPAIGN_COLUMNS, where_clause
        );

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        Self::query_campaigns(&conn, &sql, &param_refs)
    }

    fn count(&self, filter: &CampaignFilter) -> Result<i64, CampaignError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM campaigns {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(db)
    }

    fn count_by_status(&self) -> Result<Vec<(CampaignStatus, i64)>, CampaignError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM campaigns GROUP BY status")
            .map_err(db)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(db)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db)?;

        Ok(CampaignStatus::ALL
            .into_iter()
            .map(|status| {
                let count = rows
                    .iter()
                    .find(|(s, _)| s == status.as_str())
                    .map(|(_, c)| *c)
                    .unwrap_or(0);
                (status, count)
            })
            .collect())
    }

    fn find_processing(&self) -> Result<Option<Campaign>, CampaignError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM campaigns WHERE status IN ({}) ORDER BY status_changed_at ASC LIMIT 1",
            CAMPAIGN_COLUMNS,
            processing_list()
        );
        Ok(Self::query_campaigns(&conn, &sql, &[])?.into_iter().next())
    }

    fn next_queued(&self) -> Result<Option<Campaign>, CampaignError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM campaigns WHERE status = ? \
             ORDER BY queue_order IS NULL, queue_order ASC, queued_at ASC, created_at ASC, rowid ASC \
             LIMIT 1",
            CAMPAIGN_COLUMNS
        );
        Ok(
            Self::query_campaigns(&conn, &sql, &[&CampaignStatus::Queued.as_str()])?
                .into_iter()
                .next(),
        )
    }

    fn claim(&self, id: &str) -> Result<ClaimResult, CampaignError> {
        let conn = self.conn.lock().unwrap();
        let now = format_timestamp(&Utc::now());

        // The slot check and the status check are one statement, so two
        // claimers that picked different campaigns cannot both succeed.
        let sql = format!(
            "UPDATE campaigns SET status = ?1, status_changed_at = ?2, updated_at = ?2 \
             WHERE id = ?3 AND status = ?4 \
             AND NOT EXISTS (SELECT 1 FROM campaigns WHERE status IN ({}))",
            processing_list()
        );
        let changed = conn
            .execute(
                &sql,
                params![
                    CampaignStatus::PendingArticle.as_str(),
                    now,
                    id,
                    CampaignStatus::Queued.as_str()
                ],
            )
            .map_err(db)?;

        if changed == 1 {
            return Ok(ClaimResult::Claimed(Self::fetch_required(&conn, id)?));
        }

        match Self::fetch_status(&conn, id)? {
            None => Err(CampaignError::NotFound(id.to_string())),
            Some(CampaignStatus::Queued) => Ok(ClaimResult::Blocked),
            Some(_) => Ok(ClaimResult::AlreadyClaimed),
        }
    }

    fn compare_and_set_status(
        &self,
        id: &str,
        expected: CampaignStatus,
        next: CampaignStatus,
        update: StatusUpdate,
    ) -> Result<bool, CampaignError> {
        let conn = self.conn.lock().unwrap();
        let now = format_timestamp(&Utc::now());

        let creative = update.creative.as_ref().map(to_json).transpose()?;
        let error_details = update.error_details.as_ref().map(to_json).transpose()?;
        let launched_at = update.launched_at.as_ref().map(format_timestamp);

        // Entering the processing set must not bypass the single-flight slot.
        let slot_guard = if next.is_processing() {
            format!(
                " AND NOT EXISTS (SELECT 1 FROM campaigns WHERE id <> ?8 AND status IN ({}))",
                processing_list()
            )
        } else {
            String::new()
        };

        let sql = format!(
            "UPDATE campaigns SET status = ?1, status_changed_at = ?2, updated_at = ?2, \
             article_reference = COALESCE(?3, article_reference), \
             tracking_link = COALESCE(?4, tracking_link), \
             creative = COALESCE(?5, creative), \
             error_details = COALESCE(?6, error_details), \
             launched_at = COALESCE(?7, launched_at) \
             WHERE id = ?8 AND status = ?9{}",
            slot_guard
        );

        let changed = conn
            .execute(
                &sql,
                params![
                    next.as_str(),
                    now,
                    update.article_reference,
                    update.tracking_link,
                    creative,
                    error_details,
                    launched_at,
                    id,
                    expected.as_str(),
                ],
            )
            .map_err(db)?;

        Ok(changed == 1)
    }

    fn fail_unless_terminal(
        &self,
        id: &str,
        details: ErrorDetails,
    ) -> Result<bool, CampaignError> {
        let conn = self.conn.lock().unwrap();
        let now = format_timestamp(&Utc::now());
        let details_json = to_json(&details)?;

        let changed = conn
            .execute(
                "UPDATE campaigns SET status = ?1, error_details = ?2, status_changed_at = ?3, updated_at = ?3 \
                 WHERE id = ?4 AND status NOT IN (?5, ?6)",
                params![
                    CampaignStatus::Failed.as_str(),
                    details_json,
                    now,
                    id,
                    CampaignStatus::Active.as_str(),
                    CampaignStatus::Failed.as_str(),
                ],
            )
            .map_err(db)?;

        Ok(changed == 1)
    }

    fn requeue_failed(&self, id: &str) -> Result<Campaign, CampaignError> {
        let conn = self.conn.lock().unwrap();
        let now = format_timestamp(&Utc::now());

        let changed = conn
            .execute(
                "UPDATE campaigns SET status = ?1, retry_count = retry_count + 1, \
                 queued_at = ?2, status_changed_at = ?2, updated_at = ?2 \
                 WHERE id = ?3 AND status = ?4",
                params![
                    CampaignStatus::Queued.as_str(),
                    now,
                    id,
                    CampaignStatus::Failed.as_str(),
                ],
            )
            .map_err(db)?;

        if changed == 0 {
            return match Self::fetch_status(&conn, id)? {
                None => Err(CampaignError::NotFound(id.to_string())),
                Some(current) => Err(CampaignError::InvalidState {
                    campaign_id: id.to_string(),
                    current,
                    operation: "retry".to_string(),
                }),
            };
        }

        Self::fetch_required(&conn, id)
    }

    fn begin_resume(
        &self,
        id: &str,
        observed: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<Option<Campaign>, CampaignError> {
        let conn = self.conn.lock().unwrap();
        let at = format_timestamp(&at);

        let sql = format!(
            "UPDATE campaigns SET retry_count = retry_count + 1, status_changed_at = ?1, \
             updated_at = ?1 WHERE id = ?2 AND status_changed_at = ?3 AND status IN ({})",
            processing_list()
        );
        let changed = conn
            .execute(&sql, params![at, id, format_timestamp(&observed)])
            .map_err(db)?;

        if changed == 0 {
            return match Self::fetch_status(&conn, id)? {
                None => Err(CampaignError::NotFound(id.to_string())),
                Some(_) => Ok(None),
            };
        }

        Self::fetch(&conn, id)
    }

    fn stale_processing(&self, before: DateTime<Utc>) -> Result<Vec<Campaign>, CampaignError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM campaigns WHERE status IN ({}) AND status_changed_at < ? \
             ORDER BY status_changed_at ASC",
            CAMPAIGN_COLUMNS,
            processing_list()
        );
        let before = format_timestamp(&before);
        Self::query_campaigns(&conn, &sql, &[&before])
    }

    fn claim_target(&self, target_id: &str) -> Result<bool, CampaignError> {
        let conn = self.conn.lock().unwrap();

        let changed = conn
            .execute(
                "UPDATE platform_targets SET status = ?1, error = NULL \
                 WHERE id = ?2 AND status IN (?3, ?4)",
                params![
                    TargetStatus::Launching.as_str(),
                    target_id,
                    TargetStatus::Pending.as_str(),
                    TargetStatus::Failed.as_str(),
                ],
            )
            .map_err(db)?;

        if changed == 0 && !Self::target_exists(&conn, target_id)? {
            return Err(CampaignError::TargetNotFound(target_id.to_string()));
        }
        Ok(changed == 1)
    }

    fn update_target(&self, target_id: &str, update: TargetUpdate) -> Result<bool, CampaignError> {
        let conn = self.conn.lock().unwrap();

        let ad_ids = to_json(&update.platform_ad_ids)?;
        let changed = conn
            .execute(
                "UPDATE platform_targets SET status = ?1, platform_campaign_id = ?2, \
                 platform_ad_ids = ?3, error = ?4, launched_at = ?5 \
                 WHERE id = ?6 AND status = ?7",
                params![
                    update.status.as_str(),
                    update.platform_campaign_id,
                    ad_ids,
                    update.error,
                    update.launched_at.as_ref().map(format_timestamp),
                    target_id,
                    TargetStatus::Launching.as_str(),
                ],
            )
            .map_err(db)?;

        if changed == 0 && !Self::target_exists(&conn, target_id)? {
            return Err(CampaignError::TargetNotFound(target_id.to_string()));
        }
        Ok(changed == 1)
    }
}
