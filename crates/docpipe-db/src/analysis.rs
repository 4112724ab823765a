use async_trait::async_trait;
use chrono::Utc;
use docpipe_core::models::{AnalysisJob, AnalysisStatus, NewAnalysisJob};
use docpipe_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for analysis job rows. Jobs are never deleted; a retried
/// request gets a fresh row and the failed one stays for auditability.
#[async_trait]
pub trait AnalysisJobRepository: Send + Sync {
    /// Record a new job in PENDING with the outbound payload verbatim.
    async fn create(&self, job: NewAnalysisJob) -> Result<AnalysisJob, AppError>;

    /// The most recent job for a request id whose status is not FAIL.
    async fn find_latest_non_failed(
        &self,
        request_id: Uuid,
    ) -> Result<Option<AnalysisJob>, AppError>;

    /// The SUCCESS job for a request id, if any.
    async fn find_success(&self, request_id: Uuid) -> Result<Option<AnalysisJob>, AppError>;

    /// Set status and (when provided) response payload. A `None` response
    /// leaves the stored response unchanged.
    async fn update(
        &self,
        id: Uuid,
        status: AnalysisStatus,
        response: Option<serde_json::Value>,
    ) -> Result<AnalysisJob, AppError>;
}

#[derive(Clone)]
pub struct PgAnalysisJobRepository {
    pool: PgPool,
}

impl PgAnalysisJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalysisJobRepository for PgAnalysisJobRepository {
    #[tracing::instrument(skip(self, job), fields(db.table = "analysis_jobs", db.operation = "insert"))]
    async fn create(&self, job: NewAnalysisJob) -> Result<AnalysisJob, AppError> {
        let now = Utc::now();
        let row = AnalysisJob {
            id: Uuid::new_v4(),
            request_id: job.request_id,
            request: job.request,
            response: None,
            status: AnalysisStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO analysis_jobs (id, request_id, request, response, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(row.id)
        .bind(row.request_id)
        .bind(&row.request)
        .bind(&row.response)
        .bind(row.status)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "analysis_jobs", db.operation = "select", request_id = %request_id))]
    async fn find_latest_non_failed(
        &self,
        request_id: Uuid,
    ) -> Result<Option<AnalysisJob>, AppError> {
        let row = sqlx::query_as::<_, AnalysisJob>(
            r#"
            SELECT * FROM analysis_jobs
            WHERE request_id = $1 AND status <> 'FAIL'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "analysis_jobs", db.operation = "select", request_id = %request_id))]
    async fn find_success(&self, request_id: Uuid) -> Result<Option<AnalysisJob>, AppError> {
        let row = sqlx::query_as::<_, AnalysisJob>(
            r#"
            SELECT * FROM analysis_jobs
            WHERE request_id = $1 AND status = 'SUCCESS'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self, response), fields(db.table = "analysis_jobs", db.operation = "update", db.record_id = %id))]
    async fn update(
        &self,
        id: Uuid,
        status: AnalysisStatus,
        response: Option<serde_json::Value>,
    ) -> Result<AnalysisJob, AppError> {
        let row = sqlx::query_as::<_, AnalysisJob>(
            r#"
            UPDATE analysis_jobs
            SET status = $2, response = COALESCE($3, response), updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(response)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis job not found: {}", id)))?;

        Ok(row)
    }
}
