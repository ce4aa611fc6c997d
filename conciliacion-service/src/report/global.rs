//! Global multi-company report: per-company breakdown plus consolidated
//! totals with the indicators recomputed from summed counters.

use crate::models::Category;
use crate::periods::Period;
use crate::report::indicators::{avance_ratio, compute_indicators, BucketTotals, Indicators};
use crate::report::matrix::build_matrix;
use crate::services::store::{MovementStore, PncSource};
use serde::Serialize;
use service_core::error::AppError;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One category row in the per-company breakdown.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CategoryBreakdown {
    #[serde(rename = "pub")]
    pub published: i64,
    #[serde(rename = "con")]
    pub reconciled: i64,
    pub pnc: i64,
    pub pni: i64,
    pub avance: f64,
}

/// Per-company section of the global report.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyReport {
    pub company_id: Uuid,
    pub categories: BTreeMap<Category, CategoryBreakdown>,
    pub summary: BucketTotals,
    #[serde(flatten)]
    pub indicators: Indicators,
}

/// Consolidated section: summed counters, ratios recomputed from the sums.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalTotals {
    #[serde(flatten)]
    pub summary: BucketTotals,
    #[serde(flatten)]
    pub indicators: Indicators,
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalReport {
    pub period: String,
    pub companies: Vec<CompanyReport>,
    pub totals: GlobalTotals,
}

/// Build the global report for one period across every company with
/// movements in scope. Indicator buckets cover the accounting categories;
/// ratios are never averaged across companies.
pub async fn global_report(
    store: &dyn MovementStore,
    pnc_source: &dyn PncSource,
    period: Period,
) -> Result<GlobalReport, AppError> {
    let (start, end) = period.range();

    let mut companies = Vec::new();
    let mut consolidated = BucketTotals::default();

    for company_id in store.companies_in_scope(start, end).await? {
        let movements = store.movements_in_scope(Some(company_id), start, end).await?;
        let matrix = build_matrix(&movements);
        let pnc = pnc_source.pnc_counts(company_id, start, end).await?;

        let mut categories = BTreeMap::new();
        let mut summary = BucketTotals::default();

        for category in Category::ACCOUNTING {
            let counts = matrix.counts(category);
            let pending = pnc.get(&category).copied().unwrap_or(0);

            categories.insert(
                category,
                CategoryBreakdown {
                    published: counts.published,
                    reconciled: counts.reconciled,
                    pnc: pending,
                    pni: counts.unidentified,
                    avance: avance_ratio(counts.published, counts.reconciled),
                },
            );

            summary.add(&BucketTotals {
                published: counts.published,
                reconciled: counts.reconciled,
                pending_not_booked: pending,
                unidentified: counts.unidentified,
            });
        }

        consolidated.add(&summary);
        let indicators = compute_indicators(&summary);

        companies.push(CompanyReport {
            company_id,
            categories,
            summary,
            indicators,
        });
    }

    let indicators = compute_indicators(&consolidated);
    Ok(GlobalReport {
        period: period.to_string(),
        companies,
        totals: GlobalTotals {
            summary: consolidated,
            indicators,
        },
    })
}
