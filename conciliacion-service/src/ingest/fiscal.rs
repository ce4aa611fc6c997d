//! Fiscal feed: CSV export of tax-authority documents.
//!
//! Classification is a key lookup on the normalized
//! `{Grupo}_{Tipo de documento}` pair; the economic amount is the document
//! total net of VAT.

use super::{decimal_or_zero, parse_date, require_text, RawRecord, RowError, RowSlot, SourceParser};
use crate::dictionary::RuleSnapshot;
use crate::models::{Movement, Source};
use crate::normalize::normalize;
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

pub struct FiscalParser;

impl SourceParser for FiscalParser {
    fn source(&self) -> Source {
        Source::Fiscal
    }

    fn parse(&self, raw: &[u8]) -> Result<Vec<RowSlot>, AppError> {
        super::parse_csv(raw)
    }

    fn build(
        &self,
        company_id: Uuid,
        record: &RawRecord,
        rules: &RuleSnapshot,
    ) -> Result<Movement, RowError> {
        let group = normalize(require_text(record, "Grupo")?);
        let doc_type = normalize(require_text(record, "Tipo de documento")?);

        let rule = rules
            .resolve_fiscal(&group, &doc_type)
            .ok_or_else(|| RowError::UnmappedDocument {
                key: format!("{}_{}", group, doc_type),
            })?;

        let effective_date = parse_date(record, "Fecha Emisión")?;
        let total = decimal_or_zero(record, "Total")?;
        let iva = decimal_or_zero(record, "IVA")?;

        Ok(Movement {
            movement_id: Uuid::new_v4(),
            company_id,
            source: Source::Fiscal.as_str().to_string(),
            effective_date,
            amount: total - iva,
            debit: None,
            credit: None,
            description: record.text("Nombre Emisor").map(str::to_string),
            category: rule.category.as_str().to_string(),
            abbreviation: rule.abbreviation.clone(),
            report_type: rule.report_type.clone(),
            voucher: None,
            sequence: None,
            raw: record.to_value(),
            position: record.row as i32,
            created_utc: Utc::now(),
        })
    }
}
