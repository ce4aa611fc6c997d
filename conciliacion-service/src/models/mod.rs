//! Domain models for conciliacion-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Source
// ============================================================================

/// Origin of a movement: one of the three upstream feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Tax-authority document feed (invoices, credit/debit notes).
    Fiscal,
    /// Accounting-system journal export.
    Ledger,
    /// Bank-statement feed.
    Bank,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fiscal => "fiscal",
            Self::Ledger => "ledger",
            Self::Bank => "bank",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fiscal" => Some(Self::Fiscal),
            "ledger" => Some(Self::Ledger),
            "bank" => Some(Self::Bank),
            _ => None,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// Category
// ============================================================================

/// Closed set of reconciliation categories.
///
/// The first seven are the accounting categories shared by the fiscal and
/// ledger feeds; the `B-*` ones are produced only by bank classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    EDe,
    EDss,
    RDe,
    RDne,
    OEgr,
    ORcj,
    ONbk,
    BRcj,
    BEgr,
    BNbk,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Self::EDe,
        Self::EDss,
        Self::RDe,
        Self::RDne,
        Self::OEgr,
        Self::ORcj,
        Self::ONbk,
        Self::BRcj,
        Self::BEgr,
        Self::BNbk,
    ];

    /// Accounting categories used for the indicator buckets.
    pub const ACCOUNTING: [Category; 7] = [
        Self::EDe,
        Self::EDss,
        Self::RDe,
        Self::RDne,
        Self::OEgr,
        Self::ORcj,
        Self::ONbk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EDe => "E-DE",
            Self::EDss => "E-DSS",
            Self::RDe => "R-DE",
            Self::RDne => "R-DNE",
            Self::OEgr => "O-EGR",
            Self::ORcj => "O-RCJ",
            Self::ONbk => "O-NBK",
            Self::BRcj => "B-RCJ",
            Self::BEgr => "B-EGR",
            Self::BNbk => "B-NBK",
        }
    }

    /// Parse a stored category code. Unknown codes yield `None` so callers
    /// decide how to handle them; there is no silent default.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "E-DE" => Some(Self::EDe),
            "E-DSS" => Some(Self::EDss),
            "R-DE" => Some(Self::RDe),
            "R-DNE" => Some(Self::RDne),
            "O-EGR" => Some(Self::OEgr),
            "O-RCJ" => Some(Self::ORcj),
            "O-NBK" => Some(Self::ONbk),
            "B-RCJ" => Some(Self::BRcj),
            "B-EGR" => Some(Self::BEgr),
            "B-NBK" => Some(Self::BNbk),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// Reconciliation state
// ============================================================================

/// Derived reconciliation state of one movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// PUB: authoritative/visible upstream.
    Published,
    /// CON: ledger entry matches the expected business rule.
    Reconciled,
    /// PNI: present but not validly classified.
    Unidentified,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "PUB",
            Self::Reconciled => "CON",
            Self::Unidentified => "PNI",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// Movement
// ============================================================================

/// The unit of reconciliation: one normalized, dictionary-classified record
/// from one of the three feeds. Immutable once persisted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Movement {
    pub movement_id: Uuid,
    pub company_id: Uuid,
    pub source: String,
    pub effective_date: NaiveDate,
    /// Signed amount; for the ledger source this is debit − credit.
    pub amount: Decimal,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
    pub description: Option<String>,
    pub category: String,
    pub abbreviation: String,
    pub report_type: String,
    /// Ledger voucher code; with `sequence` forms the dedup composite key.
    pub voucher: Option<String>,
    pub sequence: Option<String>,
    /// Opaque copy of the source record as uploaded.
    pub raw: serde_json::Value,
    /// 1-based file position; preserves upload order within a run.
    pub position: i32,
    pub created_utc: DateTime<Utc>,
}

impl Movement {
    pub fn parsed_source(&self) -> Option<Source> {
        Source::parse(&self.source)
    }

    pub fn parsed_category(&self) -> Option<Category> {
        Category::parse(&self.category)
    }

    /// Signed value used by the classification rules: the stored debit/credit
    /// pair when present, otherwise the signed amount.
    pub fn signed_value(&self) -> Decimal {
        match (self.debit, self.credit) {
            (Some(d), Some(c)) => d - c,
            (Some(d), None) => d,
            (None, Some(c)) => -c,
            (None, None) => self.amount,
        }
    }

    /// Composite dedup key for ledger movements.
    pub fn voucher_key(&self) -> (String, String) {
        (
            self.voucher.clone().unwrap_or_default(),
            self.sequence.clone().unwrap_or_default(),
        )
    }
}

// ============================================================================
// Ingestion audit records
// ============================================================================

/// One rejected row: position, cause, and a copy of the offending record.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionError {
    pub row: i64,
    pub message: String,
    pub raw: serde_json::Value,
}

/// Outcome status of one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Processed,
    HasErrors,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::HasErrors => "has_errors",
        }
    }
}

impl Serialize for RunStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One record per ingestion run, written after the movement batch commits.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionLog {
    pub log_id: Uuid,
    pub company_id: Uuid,
    pub source: Source,
    pub file_name: String,
    pub status: RunStatus,
    pub processed: i64,
    pub failed: i64,
    pub message: String,
    pub created_utc: DateTime<Utc>,
}

impl IngestionLog {
    pub fn new(
        company_id: Uuid,
        source: Source,
        file_name: &str,
        processed: i64,
        failed: i64,
    ) -> Self {
        let status = if failed == 0 {
            RunStatus::Processed
        } else {
            RunStatus::HasErrors
        };
        Self {
            log_id: Uuid::new_v4(),
            company_id,
            source,
            file_name: file_name.to_string(),
            status,
            processed,
            failed,
            message: format!("{} processed, {} errors", processed, failed),
            created_utc: Utc::now(),
        }
    }
}

/// Response of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionOutcome {
    pub processed: usize,
    pub errors: Vec<IngestionError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_codes_round_trip() {
        for cat in Category::ALL {
            assert_eq!(Category::parse(cat.as_str()), Some(cat));
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert_eq!(Category::parse("X-FOO"), None);
        assert_eq!(Category::parse("e-de"), None);
    }

    #[test]
    fn signed_value_prefers_debit_credit_pair() {
        let mut mov = Movement {
            movement_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            source: "ledger".to_string(),
            effective_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            amount: Decimal::ZERO,
            debit: Some(Decimal::new(10000, 2)),
            credit: Some(Decimal::new(2500, 2)),
            description: None,
            category: "O-RCJ".to_string(),
            abbreviation: "RCJ".to_string(),
            report_type: "INGRESOS".to_string(),
            voucher: Some("FAC001".to_string()),
            sequence: Some("1".to_string()),
            raw: serde_json::json!({}),
            position: 2,
            created_utc: Utc::now(),
        };
        assert_eq!(mov.signed_value(), Decimal::new(7500, 2));

        mov.debit = None;
        mov.credit = None;
        mov.amount = Decimal::new(-5000, 2);
        assert_eq!(mov.signed_value(), Decimal::new(-5000, 2));
    }

    #[test]
    fn log_status_tracks_error_count() {
        let company = Uuid::new_v4();
        let ok = IngestionLog::new(company, Source::Fiscal, "docs.csv", 10, 0);
        assert_eq!(ok.status, RunStatus::Processed);
        assert_eq!(ok.message, "10 processed, 0 errors");

        let bad = IngestionLog::new(company, Source::Ledger, "journal.csv", 9, 1);
        assert_eq!(bad.status, RunStatus::HasErrors);
    }
}
