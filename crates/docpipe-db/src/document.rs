use async_trait::async_trait;
use chrono::Utc;
use docpipe_core::models::{Document, DocumentStatus, NewDocument};
use docpipe_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Repository for document rows.
///
/// Every scoped operation takes `owner_scope`: `Some(owner)` restricts the
/// query to rows owned by that caller, `None` is unscoped (elevated role).
/// A row that exists but is outside the caller's scope is indistinguishable
/// from a missing row.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn create(&self, doc: NewDocument) -> Result<Document, AppError>;

    async fn find_by_id(
        &self,
        id: Uuid,
        owner_scope: Option<Uuid>,
    ) -> Result<Option<Document>, AppError>;

    async fn find_active_by_id(
        &self,
        id: Uuid,
        owner_scope: Option<Uuid>,
    ) -> Result<Option<Document>, AppError>;

    /// Page of documents plus the total count for the same scope.
    async fn list(
        &self,
        limit: i64,
        offset: i64,
        owner_scope: Option<Uuid>,
    ) -> Result<(Vec<Document>, i64), AppError>;

    async fn set_status(
        &self,
        id: Uuid,
        owner_scope: Option<Uuid>,
        status: DocumentStatus,
    ) -> Result<Option<Document>, AppError>;

    /// Returns true if a row was deleted.
    async fn delete(&self, id: Uuid, owner_scope: Option<Uuid>) -> Result<bool, AppError>;

    /// All ACTIVE documents sharing a logical id, oldest first.
    async fn find_active_by_unified_id(&self, unified_id: Uuid)
        -> Result<Vec<Document>, AppError>;
}

#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    #[tracing::instrument(skip(self, doc), fields(db.table = "documents", db.operation = "insert"))]
    async fn create(&self, doc: NewDocument) -> Result<Document, AppError> {
        let now = Utc::now();
        let row = Document {
            id: Uuid::new_v4(),
            unified_id: doc.unified_id,
            owner: doc.owner,
            file_name: doc.file_name,
            actual_file_name: doc.actual_file_name,
            file_path: doc.file_path,
            file_size: doc.file_size,
            file_type: doc.file_type,
            status: DocumentStatus::Active,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, unified_id, owner, file_name, actual_file_name,
                file_path, file_size, file_type, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(row.id)
        .bind(row.unified_id)
        .bind(row.owner)
        .bind(&row.file_name)
        .bind(&row.actual_file_name)
        .bind(&row.file_path)
        .bind(row.file_size)
        .bind(row.file_type)
        .bind(row.status)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select", db.record_id = %id))]
    async fn find_by_id(
        &self,
        id: Uuid,
        owner_scope: Option<Uuid>,
    ) -> Result<Option<Document>, AppError> {
        let row = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE id = $1 AND ($2::uuid IS NULL OR owner = $2)",
        )
        .bind(id)
        .bind(owner_scope)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select", db.record_id = %id))]
    async fn find_active_by_id(
        &self,
        id: Uuid,
        owner_scope: Option<Uuid>,
    ) -> Result<Option<Document>, AppError> {
        let row = sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM documents
            WHERE id = $1 AND status = 'ACTIVE' AND ($2::uuid IS NULL OR owner = $2)
            "#,
        )
        .bind(id)
        .bind(owner_scope)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn list(
        &self,
        limit: i64,
        offset: i64,
        owner_scope: Option<Uuid>,
    ) -> Result<(Vec<Document>, i64), AppError> {
        let rows = sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM documents
            WHERE ($1::uuid IS NULL OR owner = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_scope)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM documents WHERE ($1::uuid IS NULL OR owner = $1)",
        )
        .bind(owner_scope)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows, count))
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update", db.record_id = %id))]
    async fn set_status(
        &self,
        id: Uuid,
        owner_scope: Option<Uuid>,
        status: DocumentStatus,
    ) -> Result<Option<Document>, AppError> {
        let row = sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents
            SET status = $3, updated_at = $4
            WHERE id = $1 AND ($2::uuid IS NULL OR owner = $2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner_scope)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid, owner_scope: Option<Uuid>) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM documents WHERE id = $1 AND ($2::uuid IS NULL OR owner = $2)")
                .bind(id)
                .bind(owner_scope)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "select"))]
    async fn find_active_by_unified_id(
        &self,
        unified_id: Uuid,
    ) -> Result<Vec<Document>, AppError> {
        let rows = sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM documents
            WHERE unified_id = $1 AND status = 'ACTIVE'
            ORDER BY created_at ASC
            "#,
        )
        .bind(unified_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
