//! # PostgreSQL Complaint Store
//!
//! `sqlx`-backed implementation of [`ComplaintStore`]. Complaint creation
//! writes `complaints` and `complaint_locations` in one transaction; assignment
//! performs a conditional workload increment and the assignee write in one
//! transaction so concurrent workers cannot push an operator over its limit.

use super::errors::{StoreError, StoreResult};
use super::store::ComplaintStore;
use crate::config::DatabaseConfig;
use crate::models::{
    ComplaintLocation, DuplicateKey, NewComplaint, OperatorCandidate, OperatorPool,
    PersistedComplaint,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct ComplaintRow {
    id: Uuid,
    seq: i64,
    submitter_id: String,
    category_id: String,
    sub_category: String,
    description: String,
    description_fingerprint: String,
    urgency: String,
    department: String,
    is_public: bool,
    is_duplicate: bool,
    attachment_url: Option<String>,
    status: String,
    assigned_agent_id: Option<Uuid>,
    managed_by_admin_id: Option<Uuid>,
    submission_date: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    pin: Option<String>,
    district: Option<String>,
    city: Option<String>,
    locality: Option<String>,
    street: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl TryFrom<ComplaintRow> for PersistedComplaint {
    type Error = StoreError;

    fn try_from(row: ComplaintRow) -> Result<Self, Self::Error> {
        let location = match (row.pin, row.district, row.city, row.locality) {
            (Some(pin), Some(district), Some(city), Some(locality)) => Some(ComplaintLocation {
                pin,
                district,
                city,
                locality,
                street: row.street,
                latitude: row.latitude,
                longitude: row.longitude,
            }),
            _ => None,
        };

        Ok(PersistedComplaint {
            id: row.id,
            seq: row.seq,
            submitter_id: row.submitter_id,
            category_id: row.category_id,
            sub_category: row.sub_category,
            description: row.description,
            description_fingerprint: row.description_fingerprint,
            urgency: row.urgency.parse().map_err(StoreError::serialization)?,
            department: row.department.parse().map_err(StoreError::serialization)?,
            is_public: row.is_public,
            is_duplicate: row.is_duplicate,
            attachment_url: row.attachment_url,
            status: row.status.parse().map_err(StoreError::serialization)?,
            assigned_agent_id: row.assigned_agent_id,
            managed_by_admin_id: row.managed_by_admin_id,
            location,
            submission_date: row.submission_date,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OperatorRow {
    id: Uuid,
    full_name: String,
    municipality: String,
    current_workload: i32,
    workload_limit: i32,
    status: String,
}

impl TryFrom<OperatorRow> for OperatorCandidate {
    type Error = StoreError;

    fn try_from(row: OperatorRow) -> Result<Self, Self::Error> {
        Ok(OperatorCandidate {
            id: row.id,
            name: row.full_name,
            jurisdiction: row.municipality,
            current_workload: row.current_workload,
            workload_limit: row.workload_limit,
            status: row.status.parse().map_err(StoreError::serialization)?,
        })
    }
}

const COMPLAINT_SELECT: &str = r#"
    SELECT c.id, c.seq, c.submitter_id, c.category_id, c.sub_category, c.description,
           c.description_fingerprint, c.urgency, c.department, c.is_public, c.is_duplicate,
           c.attachment_url, c.status, c.assigned_agent_id, c.managed_by_admin_id,
           c.submission_date, c.updated_at,
           l.pin, l.district, l.city, l.locality, l.street, l.latitude, l.longitude
    FROM complaints c
    LEFT JOIN complaint_locations l ON l.complaint_id = c.id
"#;

#[derive(Debug, Clone)]
pub struct PgComplaintStore {
    pool: PgPool,
}

impl PgComplaintStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!(max_connections = config.max_connections, "💾 Database pool established");
        Ok(Self { pool })
    }

    /// Apply pending migrations from `migrations/`
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("💾 Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ComplaintStore for PgComplaintStore {
    #[instrument(skip(self, key), fields(submitter_id = %key.submitter_id))]
    async fn find_recent_duplicate(
        &self,
        key: &DuplicateKey,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM complaints
            WHERE submitter_id = $1
              AND category_id = $2
              AND sub_category = $3
              AND description_fingerprint = $4
              AND submission_date >= $5
            ORDER BY submission_date ASC
            LIMIT 1
            "#,
        )
        .bind(&key.submitter_id)
        .bind(&key.category_id)
        .bind(&key.sub_category)
        .bind(&key.description_fingerprint)
        .bind(since)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    #[instrument(skip(self, complaint), fields(submitter_id = %complaint.submitter_id))]
    async fn create_complaint(&self, complaint: NewComplaint) -> StoreResult<PersistedComplaint> {
        let mut tx = self.pool.begin().await?;

        let (id, seq, status, submission_date, updated_at) =
            sqlx::query_as::<_, (Uuid, i64, String, DateTime<Utc>, DateTime<Utc>)>(
                r#"
                INSERT INTO complaints (
                    id, submitter_id, category_id, sub_category, description,
                    description_fingerprint, urgency, department, is_public, is_duplicate,
                    attachment_url, status
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'REGISTERED')
                RETURNING id, seq, status, submission_date, updated_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&complaint.submitter_id)
            .bind(&complaint.category_id)
            .bind(&complaint.sub_category)
            .bind(&complaint.description)
            .bind(&complaint.description_fingerprint)
            .bind(complaint.urgency.as_str())
            .bind(complaint.department.as_str())
            .bind(complaint.is_public)
            .bind(complaint.is_duplicate)
            .bind(&complaint.attachment_url)
            .fetch_one(&mut *tx)
            .await?;

        let location = &complaint.location;
        sqlx::query(
            r#"
            INSERT INTO complaint_locations (
                complaint_id, pin, district, city, locality, street, latitude, longitude
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(&location.pin)
        .bind(&location.district)
        .bind(&location.city)
        .bind(&location.locality)
        .bind(&location.street)
        .bind(location.latitude)
        .bind(location.longitude)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(complaint_id = %id, seq = seq, "Complaint persisted");

        Ok(PersistedComplaint {
            id,
            seq,
            submitter_id: complaint.submitter_id,
            category_id: complaint.category_id,
            sub_category: complaint.sub_category,
            description: complaint.description,
            description_fingerprint: complaint.description_fingerprint,
            urgency: complaint.urgency,
            department: complaint.department,
            is_public: complaint.is_public,
            is_duplicate: complaint.is_duplicate,
            attachment_url: complaint.attachment_url,
            status: status.parse().map_err(StoreError::serialization)?,
            assigned_agent_id: None,
            managed_by_admin_id: None,
            location: Some(complaint.location),
            submission_date,
            updated_at,
        })
    }

    async fn find_complaint(&self, id: Uuid) -> StoreResult<Option<PersistedComplaint>> {
        let query = format!("{COMPLAINT_SELECT} WHERE c.id = $1");
        let row = sqlx::query_as::<_, ComplaintRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(PersistedComplaint::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn eligible_candidates(
        &self,
        pool: OperatorPool,
        jurisdiction: &str,
    ) -> StoreResult<Vec<OperatorCandidate>> {
        let query = format!(
            r#"
            SELECT id, full_name, municipality, current_workload, workload_limit, status
            FROM {table}
            WHERE LOWER(TRIM(municipality)) = LOWER(TRIM($1))
              AND status = 'ACTIVE'
              AND current_workload < workload_limit
            ORDER BY id
            "#,
            table = pool.table()
        );

        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query_as::<_, OperatorRow>(&query)
            .bind(jurisdiction)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        rows.into_iter().map(OperatorCandidate::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn assign_complaint(
        &self,
        complaint_id: Uuid,
        pool: OperatorPool,
        operator_id: Uuid,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes redelivered references for the same complaint
        let current: Option<(Option<Uuid>, Option<Uuid>)> = sqlx::query_as(
            r#"
            SELECT assigned_agent_id, managed_by_admin_id
            FROM complaints
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(complaint_id)
        .fetch_optional(&mut *tx)
        .await?;

        match current {
            None => {
                tx.rollback().await?;
                return Err(StoreError::not_found("Complaint", complaint_id));
            }
            Some((Some(_), _)) | Some((_, Some(_))) => {
                tx.rollback().await?;
                return Err(StoreError::already_assigned(complaint_id));
            }
            Some((None, None)) => {}
        }

        let increment = format!(
            r#"
            UPDATE {table}
            SET current_workload = current_workload + 1, updated_at = NOW()
            WHERE id = $1 AND status = 'ACTIVE' AND current_workload < workload_limit
            "#,
            table = pool.table()
        );
        let incremented = sqlx::query(&increment)
            .bind(operator_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if incremented == 0 {
            tx.rollback().await?;
            return Err(StoreError::capacity_exhausted(operator_id));
        }

        let assignee_column = match pool {
            OperatorPool::Agent => "assigned_agent_id",
            OperatorPool::MunicipalAdmin => "managed_by_admin_id",
        };
        let assign = format!(
            r#"
            UPDATE complaints
            SET {assignee_column} = $2, status = 'UNDER_PROCESSING', updated_at = NOW()
            WHERE id = $1
              AND assigned_agent_id IS NULL
              AND managed_by_admin_id IS NULL
            "#
        );
        let updated = sqlx::query(&assign)
            .bind(complaint_id)
            .bind(operator_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Err(StoreError::already_assigned(complaint_id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
