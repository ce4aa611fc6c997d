//! HTTP API: ingestion uploads and reconciliation reports.

use crate::ingest::{self, BankParser, FiscalParser, LedgerParser, SourceParser};
use crate::models::{IngestionOutcome, Source};
use crate::periods::Period;
use crate::report::{build_matrix, detailed_report, global_report, DetailedReport, GlobalReport, Matrix};
use crate::services::metrics::record_report_build;
use crate::services::store::{DictionarySource, MovementStore, PncSource};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Shared handler state: the collaborator seams behind trait objects.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MovementStore>,
    pub dictionary: Arc<dyn DictionarySource>,
    pub pnc: Arc<dyn PncSource>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ingest/:source", post(ingest_handler))
        .route("/reports/matrix", get(matrix_handler))
        .route("/reports/detailed", get(detailed_handler))
        .route("/reports/global", get(global_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct IngestQuery {
    pub company_id: Uuid,
    pub file_name: Option<String>,
}

async fn ingest_handler(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(query): Query<IngestQuery>,
    body: Bytes,
) -> Result<Json<IngestionOutcome>, AppError> {
    let source = Source::parse(&source).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "unknown source `{}`, expected fiscal, ledger or bank",
            source
        ))
    })?;

    let parser: &dyn SourceParser = match source {
        Source::Fiscal => &FiscalParser,
        Source::Ledger => &LedgerParser,
        Source::Bank => &BankParser,
    };

    let file_name = query.file_name.as_deref().unwrap_or("upload");
    let outcome = ingest::run(
        state.store.as_ref(),
        state.dictionary.as_ref(),
        parser,
        query.company_id,
        file_name,
        &body,
    )
    .await?;

    Ok(Json(outcome))
}

/// Reporting scope: a `period` month, or an explicit inclusive date range.
/// Exactly one of the two forms must be given.
#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    pub company_id: Option<Uuid>,
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ScopeQuery {
    /// Resolve to a half-open `[start, end)` range.
    fn resolve(&self) -> Result<(NaiveDate, NaiveDate), AppError> {
        match (&self.period, self.start, self.end) {
            (Some(period), None, None) => Ok(Period::parse(period)?.range()),
            (None, Some(start), Some(end)) => {
                if end < start {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "end date precedes start date"
                    )));
                }
                let exclusive = end.succ_opt().ok_or_else(|| {
                    AppError::BadRequest(anyhow::anyhow!("end date out of range"))
                })?;
                Ok((start, exclusive))
            }
            _ => Err(AppError::BadRequest(anyhow::anyhow!(
                "scope must be either `period` or both `start` and `end`"
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MatrixResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(flatten)]
    pub matrix: Matrix,
}

async fn matrix_handler(
    State(state): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<MatrixResponse>, AppError> {
    let (start, end) = query.resolve()?;

    let movements = state
        .store
        .movements_in_scope(query.company_id, start, end)
        .await?;
    let matrix = build_matrix(&movements);

    record_report_build("matrix");
    Ok(Json(MatrixResponse {
        company_id: query.company_id,
        start,
        end,
        matrix,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DetailedQuery {
    pub company_id: Uuid,
    pub period: String,
}

async fn detailed_handler(
    State(state): State<AppState>,
    Query(query): Query<DetailedQuery>,
) -> Result<Json<DetailedReport>, AppError> {
    let period = Period::parse(&query.period)?;
    let report = detailed_report(state.store.as_ref(), query.company_id, period).await?;

    record_report_build("detailed");
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct GlobalQuery {
    pub period: String,
}

async fn global_handler(
    State(state): State<AppState>,
    Query(query): Query<GlobalQuery>,
) -> Result<Json<GlobalReport>, AppError> {
    let period = Period::parse(&query.period)?;
    let report = global_report(state.store.as_ref(), state.pnc.as_ref(), period).await?;

    record_report_build("global");
    Ok(Json(report))
}
