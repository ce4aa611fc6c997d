//! Bank feed: JSON array of statement entries.
//!
//! Bank classification never misses: a keyword-containment hit yields
//! `B-NBK`, otherwise the sign of the amount decides between `B-RCJ` and
//! `B-EGR`. Feeds differ in key casing, so each field accepts a capitalized
//! fallback.

use super::{decimal_from_value, RawRecord, RowError, RowSlot, SourceParser};
use crate::dictionary::RuleSnapshot;
use crate::models::{Movement, Source};
use crate::normalize::normalize;
use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use service_core::error::AppError;
use uuid::Uuid;

pub struct BankParser;

impl SourceParser for BankParser {
    fn source(&self) -> Source {
        Source::Bank
    }

    fn parse(&self, raw: &[u8]) -> Result<Vec<RowSlot>, AppError> {
        let document: Value = serde_json::from_slice(raw)
            .map_err(|e| AppError::BadRequest(anyhow!("could not read upload: {}", e)))?;
        let entries = document
            .as_array()
            .ok_or_else(|| AppError::BadRequest(anyhow!("bank upload must be a JSON array")))?;

        let slots = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let row = index as i64 + 1;
                match entry.as_object() {
                    Some(fields) => RowSlot::Record(RawRecord {
                        row,
                        fields: fields.clone(),
                    }),
                    None => RowSlot::Unreadable {
                        row,
                        message: "entry is not an object".to_string(),
                        raw: entry.clone(),
                    },
                }
            })
            .collect();

        Ok(slots)
    }

    fn build(
        &self,
        company_id: Uuid,
        record: &RawRecord,
        rules: &RuleSnapshot,
    ) -> Result<Movement, RowError> {
        let description = record
            .text("descripcion")
            .or_else(|| record.text("Descripcion"))
            .unwrap_or("");

        let date_raw = record
            .text("fecha")
            .or_else(|| record.text("Fecha"))
            .ok_or(RowError::MissingField("fecha"))?;
        let effective_date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d").map_err(|_| {
            RowError::InvalidDate {
                field: "fecha",
                value: date_raw.to_string(),
            }
        })?;

        let amount_raw = record
            .value("valor")
            .or_else(|| record.value("Valor"))
            .ok_or(RowError::MissingField("valor"))?;
        let amount = decimal_from_value(amount_raw, "valor")?;

        let category = rules.classify_bank(&normalize(description), amount);

        Ok(Movement {
            movement_id: Uuid::new_v4(),
            company_id,
            source: Source::Bank.as_str().to_string(),
            effective_date,
            amount,
            debit: None,
            credit: None,
            description: (!description.is_empty()).then(|| description.to_string()),
            category: category.as_str().to_string(),
            abbreviation: category.as_str().to_string(),
            report_type: "INDICADORES".to_string(),
            voucher: None,
            sequence: None,
            raw: record.to_value(),
            position: record.row as i32,
            created_utc: Utc::now(),
        })
    }
}
