//! Ledger feed: CSV journal export from the accounting system.
//!
//! Classification is a company-scoped lookup on the normalized voucher
//! code; the signed amount is debit minus credit. The `(voucher, Secuencia)`
//! pair is kept verbatim for matrix deduplication.

use super::{decimal_or_zero, parse_date, require_text, RawRecord, RowError, RowSlot, SourceParser};
use crate::dictionary::RuleSnapshot;
use crate::models::{Movement, Source};
use crate::normalize::normalize;
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;

pub struct LedgerParser;

impl SourceParser for LedgerParser {
    fn source(&self) -> Source {
        Source::Ledger
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
        let voucher = normalize(require_text(record, "Comprobante")?);

        let rule = rules
            .resolve_ledger(&voucher)
            .ok_or_else(|| RowError::UnmappedDocument {
                key: voucher.clone(),
            })?;

        let effective_date = parse_date(record, "Fecha elaboración")?;
        let debit = decimal_or_zero(record, "Débito")?;
        let credit = decimal_or_zero(record, "Crédito")?;

        Ok(Movement {
            movement_id: Uuid::new_v4(),
            company_id,
            source: Source::Ledger.as_str().to_string(),
            effective_date,
            amount: debit - credit,
            debit: Some(debit),
            credit: Some(credit),
            description: record.text("Descripción").map(str::to_string),
            category: rule.category.as_str().to_string(),
            abbreviation: rule.abbreviation.clone(),
            report_type: rule.report_type.clone(),
            voucher: Some(voucher),
            sequence: record.text("Secuencia").map(str::to_string),
            raw: record.to_value(),
            position: record.row as i32,
            created_utc: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::DictionaryRule;
    use crate::models::Category;
    use rust_decimal::Decimal;

    fn snapshot() -> RuleSnapshot {
        let mut rules = RuleSnapshot::new();
        rules.insert_ledger(
            "FAC",
            DictionaryRule {
                abbreviation: "FAC".to_string(),
                category: Category::ORcj,
                report_type: "INGRESOS".to_string(),
            },
        );
        rules
    }

    fn record(fields: serde_json::Value) -> RawRecord {
        RawRecord {
            row: 3,
            fields: fields.as_object().unwrap().clone(),
        }
    }

    #[test]
    fn builds_signed_movement_from_debit_and_credit() {
        let rec = record(serde_json::json!({
            "Comprobante": "fac",
            "Fecha elaboración": "2024-03-10",
            "Débito": "250000",
            "Crédito": "50000",
            "Secuencia": "7",
            "Descripción": "Venta marzo",
        }));

        let movement = LedgerParser.build(Uuid::new_v4(), &rec, &snapshot()).unwrap();
        assert_eq!(movement.amount, Decimal::new(200000, 0));
        assert_eq!(movement.debit, Some(Decimal::new(250000, 0)));
        assert_eq!(movement.credit, Some(Decimal::new(50000, 0)));
        assert_eq!(movement.voucher.as_deref(), Some("FAC"));
        assert_eq!(movement.sequence.as_deref(), Some("7"));
        assert_eq!(movement.category, "O-RCJ");
    }

    #[test]
    fn unknown_voucher_is_a_dictionary_miss() {
        let rec = record(serde_json::json!({
            "Comprobante": "ZZZ",
            "Fecha elaboración": "2024-03-10",
            "Débito": "10",
            "Crédito": "0",
        }));
        let err = LedgerParser
            .build(Uuid::new_v4(), &rec, &snapshot())
            .unwrap_err();
        assert_eq!(
            err,
            RowError::UnmappedDocument {
                key: "ZZZ".to_string()
            }
        );
    }

    #[test]
    fn blank_sides_default_to_zero() {
        let rec = record(serde_json::json!({
            "Comprobante": "FAC",
            "Fecha elaboración": "2024-03-10",
            "Débito": "",
            "Crédito": "125.50",
        }));
        let movement = LedgerParser.build(Uuid::new_v4(), &rec, &snapshot()).unwrap();
        assert_eq!(movement.amount, Decimal::new(-12550, 2));
    }

    #[test]
    fn bad_date_reports_field_and_value() {
        let rec = record(serde_json::json!({
            "Comprobante": "FAC",
            "Fecha elaboración": "10-03-2024",
            "Débito": "1",
        }));
        let err = LedgerParser
            .build(Uuid::new_v4(), &rec, &snapshot())
            .unwrap_err();
        assert!(matches!(
            err,
            RowError::InvalidDate {
                field: "Fecha elaboración",
                ..
            }
        ));
    }
}
