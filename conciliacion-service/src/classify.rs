//! Classification state machine: movement → PUB / CON / PNI.

use crate::models::{Category, Movement, Source, State};
use rust_decimal::Decimal;

/// Derive the reconciliation state of one movement.
///
/// Pure function of `(source, category, signed value)`; it is recomputed on
/// every matrix build and never cached or written back. Unknown category
/// codes are not an error here: they classify as `PNI` (or `PUB` for the
/// fiscal feed, which is published by definition).
pub fn classify(movement: &Movement) -> State {
    match movement.parsed_source() {
        Some(Source::Fiscal) => State::Published,
        Some(Source::Bank) => classify_bank(movement.parsed_category()),
        Some(Source::Ledger) => {
            classify_ledger(movement.parsed_category(), movement.signed_value())
        }
        // Unknown source tag: nothing can vouch for it.
        None => State::Unidentified,
    }
}

fn classify_bank(category: Option<Category>) -> State {
    match category {
        Some(Category::BRcj) | Some(Category::BEgr) | Some(Category::BNbk) => State::Published,
        _ => State::Unidentified,
    }
}

fn classify_ledger(category: Option<Category>, value: Decimal) -> State {
    match category {
        // Receivables must carry a positive balance.
        Some(Category::ORcj) if value > Decimal::ZERO => State::Reconciled,
        Some(Category::ORcj) => State::Unidentified,
        // Expenses must carry a negative balance.
        Some(Category::OEgr) if value < Decimal::ZERO => State::Reconciled,
        Some(Category::OEgr) => State::Unidentified,
        // Non-bank-keyword entries are booked by definition.
        Some(Category::ONbk) => State::Reconciled,
        _ => State::Unidentified,
    }
}
