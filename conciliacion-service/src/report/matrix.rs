//! Reconciliation matrix: per-category PUB/CON/PNI tallies.

use crate::classify::classify;
use crate::models::{Category, Movement, Source, State};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Status counters for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    #[serde(rename = "PUB")]
    pub published: i64,
    #[serde(rename = "CON")]
    pub reconciled: i64,
    #[serde(rename = "PNI")]
    pub unidentified: i64,
}

impl StatusCounts {
    pub fn total(&self) -> i64 {
        self.published + self.reconciled + self.unidentified
    }

    fn bump(&mut self, state: State) {
        match state {
            State::Published => self.published += 1,
            State::Reconciled => self.reconciled += 1,
            State::Unidentified => self.unidentified += 1,
        }
    }
}

/// Aggregated matrix over the closed category set. Every category is always
/// present, zero-filled when a source contributed nothing to it.
#[derive(Debug, Clone, Serialize)]
pub struct Matrix {
    pub rows: BTreeMap<Category, StatusCounts>,
    /// Movements whose stored category no longer parses; dropped from the
    /// tally and surfaced as a consistency warning, never a failure.
    pub skipped: usize,
}

impl Matrix {
    pub fn counts(&self, category: Category) -> StatusCounts {
        self.rows.get(&category).copied().unwrap_or_default()
    }
}

/// Tally classified movements per category.
///
/// The slice must be in ingestion order: ledger movements are deduplicated
/// by `(voucher, sequence)` and only the first occurrence counts, so a
/// multi-line accounting voucher contributes one unit, not one per line.
pub fn build_matrix(movements: &[Movement]) -> Matrix {
    let mut rows: BTreeMap<Category, StatusCounts> = Category::ALL
        .iter()
        .map(|c| (*c, StatusCounts::default()))
        .collect();
    let mut skipped = 0usize;
    let mut seen_vouchers: HashSet<(String, String)> = HashSet::new();

    for movement in movements {
        let Some(category) = movement.parsed_category() else {
            skipped += 1;
            continue;
        };

        if movement.parsed_source() == Some(Source::Ledger)
            && !seen_vouchers.insert(movement.voucher_key())
        {
            continue;
        }

        let state = classify(movement);
        if let Some(counts) = rows.get_mut(&category) {
            counts.bump(state);
        }
    }

    if skipped > 0 {
        tracing::warn!(
            skipped = skipped,
            "movements with unrecognized category dropped from matrix"
        );
    }

    Matrix { rows, skipped }
}
