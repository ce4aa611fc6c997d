//! Detailed report: the movement rows behind the matrix counters.
//!
//! Same scope and classification as the matrix, but returning the rows
//! themselves bucketed by state, so a reviewer can see which documents sit
//! behind each counter. No deduplication here: every ledger line is listed,
//! the matrix alone collapses voucher duplicates into units.

use crate::classify::classify;
use crate::models::{Category, Movement, State};
use crate::periods::Period;
use crate::services::store::MovementStore;
use serde::Serialize;
use service_core::error::AppError;
use std::collections::BTreeMap;
use uuid::Uuid;

type Buckets = BTreeMap<Category, Vec<Movement>>;

fn empty_buckets() -> Buckets {
    Category::ALL.iter().map(|c| (*c, Vec::new())).collect()
}

/// Movement rows for one company and period, bucketed by reconciliation
/// state and category. Every category is present, empty when nothing
/// landed in it.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedReport {
    pub company_id: Uuid,
    pub period: String,
    pub publicados: Buckets,
    pub contabilizados: Buckets,
    pub por_identificar: Buckets,
}

/// Build the detailed report for one company and period.
pub async fn detailed_report(
    store: &dyn MovementStore,
    company_id: Uuid,
    period: Period,
) -> Result<DetailedReport, AppError> {
    let (start, end) = period.range();
    let movements = store.movements_in_scope(Some(company_id), start, end).await?;

    let mut publicados = empty_buckets();
    let mut contabilizados = empty_buckets();
    let mut por_identificar = empty_buckets();
    let mut skipped = 0usize;

    for movement in movements {
        let Some(category) = movement.parsed_category() else {
            skipped += 1;
            continue;
        };

        let buckets = match classify(&movement) {
            State::Published => &mut publicados,
            State::Reconciled => &mut contabilizados,
            State::Unidentified => &mut por_identificar,
        };
        if let Some(rows) = buckets.get_mut(&category) {
            rows.push(movement);
        }
    }

    if skipped > 0 {
        tracing::warn!(
            skipped = skipped,
            "movements with unrecognized category dropped from detailed report"
        );
    }

    Ok(DetailedReport {
        company_id,
        period: period.to_string(),
        publicados,
        contabilizados,
        por_identificar,
    })
}
