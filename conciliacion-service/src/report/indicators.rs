//! Progress, lag and quality indicators derived from matrix counts.

use serde::Serialize;

/// The four counters an indicator is computed from. `pending_not_booked`
/// (PNC) is supplied by an external precomputed view; the other three come
/// from the reconciliation matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketTotals {
    #[serde(rename = "pub_total")]
    pub published: i64,
    #[serde(rename = "con_total")]
    pub reconciled: i64,
    #[serde(rename = "pnc_total")]
    pub pending_not_booked: i64,
    #[serde(rename = "pni_total")]
    pub unidentified: i64,
}

impl BucketTotals {
    pub fn add(&mut self, other: &BucketTotals) {
        self.published += other.published;
        self.reconciled += other.reconciled;
        self.pending_not_booked += other.pending_not_booked;
        self.unidentified += other.unidentified;
    }
}

/// The three reconciliation ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Indicators {
    /// Progress: CON / PUB.
    pub avance: f64,
    /// Lag: PNC / PUB.
    pub rezago: f64,
    /// Quality: 1 − PNI / PUB.
    pub calidad: f64,
}

/// Compute the three ratios from one set of totals.
///
/// With no published movements the defaults are avance = 1, rezago = 0,
/// calidad = 1: nothing was expected, so nothing is behind.
pub fn compute_indicators(totals: &BucketTotals) -> Indicators {
    if totals.published <= 0 {
        return Indicators {
            avance: 1.0,
            rezago: 0.0,
            calidad: 1.0,
        };
    }

    let published = totals.published as f64;
    Indicators {
        avance: totals.reconciled as f64 / published,
        rezago: totals.pending_not_booked as f64 / published,
        calidad: 1.0 - totals.unidentified as f64 / published,
    }
}

/// Per-category progress ratio used in the detailed breakdown.
pub fn avance_ratio(published: i64, reconciled: i64) -> f64 {
    if published > 0 {
        reconciled as f64 / published as f64
    } else {
        1.0
    }
}
