//! Database service for conciliacion-service.

use crate::dictionary::{DictionaryRule, RuleSnapshot};
use crate::models::{Category, IngestionError, IngestionLog, Movement, Source};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{DictionarySource, MovementStore, PncSource};
use async_trait::async_trait;
use chrono::NaiveDate;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "conciliacion-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl MovementStore for Database {
    #[instrument(skip(self, movements), fields(count = movements.len()))]
    async fn insert_movements(&self, movements: &[Movement]) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_movements"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        for movement in movements {
            sqlx::query(
                r#"
                INSERT INTO movements (movement_id, company_id, source, effective_date, amount, debit, credit, description, category, abbreviation, report_type, voucher, sequence, raw, position, created_utc)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                "#,
            )
            .bind(movement.movement_id)
            .bind(movement.company_id)
            .bind(&movement.source)
            .bind(movement.effective_date)
            .bind(movement.amount)
            .bind(movement.debit)
            .bind(movement.credit)
            .bind(&movement.description)
            .bind(&movement.category)
            .bind(&movement.abbreviation)
            .bind(&movement.report_type)
            .bind(&movement.voucher)
            .bind(&movement.sequence)
            .bind(&movement.raw)
            .bind(movement.position)
            .bind(movement.created_utc)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert movement: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit movement batch: {}", e))
        })?;

        timer.observe_duration();
        info!(count = movements.len(), "Movement batch committed");
        Ok(())
    }

    #[instrument(skip(self, log), fields(company_id = %log.company_id, source = %log.source))]
    async fn insert_log(&self, log: &IngestionLog) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_log"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO ingestion_logs (log_id, company_id, source, file_name, status, processed, failed, message, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(log.log_id)
        .bind(log.company_id)
        .bind(log.source.as_str())
        .bind(&log.file_name)
        .bind(log.status.as_str())
        .bind(log.processed)
        .bind(log.failed)
        .bind(&log.message)
        .bind(log.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert ingestion log: {}", e))
        })?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self, errors), fields(company_id = %company_id, count = errors.len()))]
    async fn insert_errors(
        &self,
        company_id: Uuid,
        source: Source,
        file_name: &str,
        errors: &[IngestionError],
    ) -> Result<(), AppError> {
        if errors.is_empty() {
            return Ok(());
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_errors"])
            .start_timer();

        for error in errors {
            sqlx::query(
                r#"
                INSERT INTO ingestion_errors (error_id, company_id, source, file_name, row_position, message, raw)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(company_id)
            .bind(source.as_str())
            .bind(file_name)
            .bind(error.row)
            .bind(&error.message)
            .bind(&error.raw)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert ingestion error: {}", e))
            })?;
        }

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn movements_in_scope(
        &self,
        company_id: Option<Uuid>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Movement>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["movements_in_scope"])
            .start_timer();

        // Ingestion order: batch insertion time, then position within the
        // file. Ledger dedup keeps the first occurrence in this order.
        let movements = match company_id {
            Some(company_id) => {
                sqlx::query_as::<_, Movement>(
                    r#"
                    SELECT movement_id, company_id, source, effective_date, amount, debit, credit, description, category, abbreviation, report_type, voucher, sequence, raw, position, created_utc
                    FROM movements
                    WHERE company_id = $1 AND effective_date >= $2 AND effective_date < $3
                    ORDER BY created_utc, position, movement_id
                    "#,
                )
                .bind(company_id)
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Movement>(
                    r#"
                    SELECT movement_id, company_id, source, effective_date, amount, debit, credit, description, category, abbreviation, report_type, voucher, sequence, raw, position, created_utc
                    FROM movements
                    WHERE effective_date >= $1 AND effective_date < $2
                    ORDER BY created_utc, position, movement_id
                    "#,
                )
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch movements: {}", e))
        })?;

        timer.observe_duration();
        Ok(movements)
    }

    #[instrument(skip(self))]
    async fn companies_in_scope(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Uuid>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["companies_in_scope"])
            .start_timer();

        let rows = sqlx::query_as::<_, (Uuid,)>(
            r#"
            SELECT DISTINCT company_id
            FROM movements
            WHERE effective_date >= $1 AND effective_date < $2
            ORDER BY company_id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch companies: {}", e))
        })?;

        timer.observe_duration();
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl DictionarySource for Database {
    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn load_snapshot(&self, company_id: Uuid) -> Result<RuleSnapshot, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["load_snapshot"])
            .start_timer();

        let mut snapshot = RuleSnapshot::new();

        let fiscal = sqlx::query_as::<_, (String, String, String, String, String)>(
            r#"
            SELECT doc_group, doc_type, abbreviation, category, report_type
            FROM fiscal_rules
            WHERE active
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load fiscal rules: {}", e))
        })?;

        for (doc_group, doc_type, abbreviation, category, report_type) in fiscal {
            match Category::parse(&category) {
                Some(category) => snapshot.insert_fiscal(
                    &doc_group,
                    &doc_type,
                    DictionaryRule {
                        abbreviation,
                        category,
                        report_type,
                    },
                ),
                None => warn!(category = %category, "Fiscal rule with unknown category skipped"),
            }
        }

        let ledger = sqlx::query_as::<_, (String, String, String, String)>(
            r#"
            SELECT voucher, abbreviation, category, report_type
            FROM ledger_rules
            WHERE company_id = $1 AND active
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load ledger rules: {}", e))
        })?;

        for (voucher, abbreviation, category, report_type) in ledger {
            match Category::parse(&category) {
                Some(category) => snapshot.insert_ledger(
                    &voucher,
                    DictionaryRule {
                        abbreviation,
                        category,
                        report_type,
                    },
                ),
                None => warn!(category = %category, "Ledger rule with unknown category skipped"),
            }
        }

        let concepts = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT keyword
            FROM bank_concepts
            WHERE active
            ORDER BY priority, keyword
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load bank concepts: {}", e))
        })?;

        for (keyword,) in concepts {
            snapshot.push_bank_keyword(&keyword);
        }

        timer.observe_duration();
        Ok(snapshot)
    }
}

#[async_trait]
impl PncSource for Database {
    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn pnc_counts(
        &self,
        company_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<Category, i64>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["pnc_counts"])
            .start_timer();

        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT category, COALESCE(SUM(pending), 0)
            FROM pnc_counts
            WHERE company_id = $1 AND effective_date >= $2 AND effective_date < $3
            GROUP BY category
            "#,
        )
        .bind(company_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load PNC counts: {}", e))
        })?;

        timer.observe_duration();

        let mut counts = HashMap::new();
        for (category, pending) in rows {
            match Category::parse(&category) {
                Some(category) => {
                    counts.insert(category, pending);
                }
                None => warn!(category = %category, "PNC row with unknown category skipped"),
            }
        }
        Ok(counts)
    }
}
