//! Per-source ingestion pipeline: parse, normalize, resolve, persist.
//!
//! Row-level failures are values, not control flow: every row yields
//! `Ok(Movement)` or a recorded [`IngestionError`], and the run summary is a
//! fold over that list. Only a failure while committing the accepted batch
//! aborts a run.

pub mod bank;
pub mod fiscal;
pub mod ledger;

pub use bank::BankParser;
pub use fiscal::FiscalParser;
pub use ledger::LedgerParser;

use crate::dictionary::RuleSnapshot;
use crate::models::{IngestionError, IngestionLog, IngestionOutcome, Movement, Source};
use crate::services::metrics::{record_ingest_rows, record_ingest_run};
use crate::services::store::{DictionarySource, MovementStore};
use anyhow::anyhow;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use service_core::error::AppError;
use std::str::FromStr;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// Row-level failure taxonomy. Recovered and recorded, never run-fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid date `{value}` in field `{field}`, expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    #[error("invalid number `{value}` in field `{field}`")]
    InvalidNumber { field: &'static str, value: String },

    #[error("no dictionary rule for key `{key}`")]
    UnmappedDocument { key: String },
}

/// One raw uploaded row: untyped field bag plus its 1-based file position.
/// Transient; only its JSON copy outlives ingestion (on the movement or on
/// the error record).
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub row: i64,
    pub fields: serde_json::Map<String, Value>,
}

impl RawRecord {
    /// Field as trimmed text; absent, null and blank all count as missing.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
            _ => None,
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// One slot of the parsed upload, in file order. Structurally unreadable
/// rows are carried through so they surface as row errors, not run aborts.
#[derive(Debug, Clone)]
pub enum RowSlot {
    Record(RawRecord),
    Unreadable {
        row: i64,
        message: String,
        raw: Value,
    },
}

/// Source-specific half of the pipeline: input shape and movement assembly.
pub trait SourceParser: Send + Sync {
    fn source(&self) -> Source;

    /// Split the upload into rows. Fails only when the file as a whole is
    /// unreadable; malformed individual rows become [`RowSlot::Unreadable`].
    fn parse(&self, raw: &[u8]) -> Result<Vec<RowSlot>, AppError>;

    /// Assemble one movement: extract, normalize, resolve, validate.
    fn build(
        &self,
        company_id: Uuid,
        record: &RawRecord,
        rules: &RuleSnapshot,
    ) -> Result<Movement, RowError>;
}

/// Outcome of the pure planning phase: accepted movements and recorded
/// errors, both in file order.
#[derive(Debug, Clone)]
pub struct IngestPlan {
    pub movements: Vec<Movement>,
    pub errors: Vec<IngestionError>,
}

/// Run every row through the parser. Pure: no I/O, no persistence.
pub fn plan(
    parser: &dyn SourceParser,
    company_id: Uuid,
    rules: &RuleSnapshot,
    raw: &[u8],
) -> Result<IngestPlan, AppError> {
    let slots = parser.parse(raw)?;

    let mut movements = Vec::new();
    let mut errors = Vec::new();

    for slot in slots {
        match slot {
            RowSlot::Record(record) => match parser.build(company_id, &record, rules) {
                Ok(movement) => movements.push(movement),
                Err(cause) => errors.push(IngestionError {
                    row: record.row,
                    message: cause.to_string(),
                    raw: record.to_value(),
                }),
            },
            RowSlot::Unreadable { row, message, raw } => {
                errors.push(IngestionError { row, message, raw })
            }
        }
    }

    Ok(IngestPlan { movements, errors })
}

/// Execute one ingestion run end to end.
///
/// Order of effects is part of the contract: rule snapshot load, then the
/// atomic movement batch, then the run log, then the individual error
/// records. A batch persistence failure aborts the run with nothing
/// partially visible; the log and error records are never written in that
/// case.
#[instrument(skip(store, dictionary, parser, raw), fields(source = %parser.source(), company_id = %company_id))]
pub async fn run(
    store: &dyn MovementStore,
    dictionary: &dyn DictionarySource,
    parser: &dyn SourceParser,
    company_id: Uuid,
    file_name: &str,
    raw: &[u8],
) -> Result<IngestionOutcome, AppError> {
    let rules = dictionary.load_snapshot(company_id).await?;
    let IngestPlan { movements, errors } = plan(parser, company_id, &rules, raw)?;

    let source = parser.source();

    store.insert_movements(&movements).await.map_err(|e| {
        record_ingest_run(source, "failed");
        tracing::error!(error = %e, "movement batch commit failed, aborting run");
        e
    })?;

    let log = IngestionLog::new(
        company_id,
        source,
        file_name,
        movements.len() as i64,
        errors.len() as i64,
    );
    store.insert_log(&log).await?;
    store.insert_errors(company_id, source, file_name, &errors).await?;

    record_ingest_run(source, log.status.as_str());
    record_ingest_rows(source, movements.len(), errors.len());
    tracing::info!(
        processed = movements.len(),
        failed = errors.len(),
        file_name = file_name,
        "ingestion run complete"
    );

    Ok(IngestionOutcome {
        processed: movements.len(),
        errors,
    })
}

// ============================================================================
// Shared field extraction
// ============================================================================

/// Parse a CSV upload with a header line into field-bag rows. Data rows are
/// numbered from 2 so error positions match what the uploader sees.
pub(crate) fn parse_csv(raw: &[u8]) -> Result<Vec<RowSlot>, AppError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(raw);
    let headers = reader
        .headers()
        .map_err(|e| AppError::BadRequest(anyhow!("could not read upload: {}", e)))?
        .clone();

    let mut slots = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row = index as i64 + 2;
        match record {
            Ok(values) => {
                let mut fields = serde_json::Map::new();
                for (name, value) in headers.iter().zip(values.iter()) {
                    fields.insert(name.to_string(), Value::String(value.to_string()));
                }
                slots.push(RowSlot::Record(RawRecord { row, fields }));
            }
            Err(e) => slots.push(RowSlot::Unreadable {
                row,
                message: format!("unreadable row: {}", e),
                raw: Value::Null,
            }),
        }
    }

    Ok(slots)
}

pub(crate) fn require_text<'a>(
    record: &'a RawRecord,
    field: &'static str,
) -> Result<&'a str, RowError> {
    record.text(field).ok_or(RowError::MissingField(field))
}

pub(crate) fn parse_date(record: &RawRecord, field: &'static str) -> Result<NaiveDate, RowError> {
    let value = require_text(record, field)?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| RowError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

/// Monetary field that defaults to zero when blank, as the feeds leave
/// unused columns empty rather than writing zeros.
pub(crate) fn decimal_or_zero(record: &RawRecord, field: &'static str) -> Result<Decimal, RowError> {
    match record.text(field) {
        None => Ok(Decimal::ZERO),
        Some(value) => Decimal::from_str(value).map_err(|_| RowError::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}

/// Monetary field from a JSON value (number or numeric string).
pub(crate) fn decimal_from_value(value: &Value, field: &'static str) -> Result<Decimal, RowError> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).map_err(|_| RowError::InvalidNumber {
            field,
            value: n.to_string(),
        }),
        Value::String(s) => Decimal::from_str(s.trim()).map_err(|_| RowError::InvalidNumber {
            field,
            value: s.clone(),
        }),
        other => Err(RowError::InvalidNumber {
            field,
            value: other.to_string(),
        }),
    }
}
