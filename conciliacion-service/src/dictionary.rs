//! Classification rule snapshot and resolution strategies.
//!
//! Rules are owned by the dictionary-administration surface; this module only
//! reads them. A [`RuleSnapshot`] is loaded once per ingestion run and passed
//! explicitly, so resolution has no hidden global state and a run sees a
//! consistent rule set from first row to last.

use crate::models::Category;
use crate::normalize::normalize;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// One resolved classification rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryRule {
    pub abbreviation: String,
    pub category: Category,
    pub report_type: String,
}

/// Immutable rule tables for one ingestion run.
///
/// Fiscal rules are global; ledger rules are scoped to the company the
/// snapshot was loaded for. Bank keywords are an ordered priority list:
/// the first containment match wins.
#[derive(Debug, Clone, Default)]
pub struct RuleSnapshot {
    fiscal: HashMap<String, DictionaryRule>,
    ledger: HashMap<String, DictionaryRule>,
    bank_keywords: Vec<String>,
}

impl RuleSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Composite key for the fiscal table: normalized group + document type.
    pub fn fiscal_key(group: &str, doc_type: &str) -> String {
        format!("{}_{}", normalize(group), normalize(doc_type))
    }

    pub fn insert_fiscal(&mut self, group: &str, doc_type: &str, rule: DictionaryRule) {
        self.fiscal.insert(Self::fiscal_key(group, doc_type), rule);
    }

    pub fn insert_ledger(&mut self, voucher: &str, rule: DictionaryRule) {
        self.ledger.insert(normalize(voucher), rule);
    }

    /// Append a bank concept keyword. Insertion order is the match priority.
    pub fn push_bank_keyword(&mut self, concept: &str) {
        let normalized = normalize(concept);
        if !normalized.is_empty() {
            self.bank_keywords.push(normalized);
        }
    }

    pub fn bank_keywords(&self) -> &[String] {
        &self.bank_keywords
    }

    /// Key-lookup strategy for the fiscal feed. Inputs must already be
    /// normalized; `None` is a dictionary miss.
    pub fn resolve_fiscal(&self, group: &str, doc_type: &str) -> Option<&DictionaryRule> {
        self.fiscal.get(&format!("{}_{}", group, doc_type))
    }

    /// Key-lookup strategy for the ledger feed, keyed by normalized voucher
    /// code within the snapshot's company.
    pub fn resolve_ledger(&self, voucher: &str) -> Option<&DictionaryRule> {
        self.ledger.get(voucher)
    }

    /// Keyword-containment strategy for the bank feed. Never fails: a
    /// keyword hit is `B-NBK`, otherwise the sign of the amount decides.
    pub fn classify_bank(&self, description: &str, amount: Decimal) -> Category {
        for concept in &self.bank_keywords {
            if description.contains(concept.as_str()) {
                return Category::BNbk;
            }
        }

        if amount > Decimal::ZERO {
            Category::BRcj
        } else {
            Category::BEgr
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(category: Category) -> DictionaryRule {
        DictionaryRule {
            abbreviation: "FV".to_string(),
            category,
            report_type: "INGRESOS".to_string(),
        }
    }

    #[test]
    fn fiscal_lookup_normalizes_the_stored_key() {
        let mut snapshot = RuleSnapshot::new();
        snapshot.insert_fiscal("Emitidos", "Factura electrónica", rule(Category::EDe));

        let hit = snapshot.resolve_fiscal("EMITIDOS", "FACTURA ELECTRONICA");
        assert_eq!(hit.map(|r| r.category), Some(Category::EDe));
    }

    #[test]
    fn fiscal_miss_yields_none() {
        let snapshot = RuleSnapshot::new();
        assert!(snapshot.resolve_fiscal("EMITIDOS", "DESCONOCIDO").is_none());
    }

    #[test]
    fn ledger_lookup_by_voucher_code() {
        let mut snapshot = RuleSnapshot::new();
        snapshot.insert_ledger("Fac-1", rule(Category::ORcj));
        assert!(snapshot.resolve_ledger("FAC1").is_some());
        assert!(snapshot.resolve_ledger("RC2").is_none());
    }

    #[test]
    fn bank_keyword_match_wins_over_sign() {
        let mut snapshot = RuleSnapshot::new();
        snapshot.push_bank_keyword("comisión nbk");

        let cat = snapshot.classify_bank("COMISION NBK SERVICIOS", Decimal::new(-15000, 0));
        assert_eq!(cat, Category::BNbk);
    }

    #[test]
    fn bank_keyword_priority_is_list_order() {
        let mut snapshot = RuleSnapshot::new();
        snapshot.push_bank_keyword("GMF");
        snapshot.push_bank_keyword("GMF 4X1000");

        // Both contained; the earlier entry decides (both map to B-NBK, but
        // the loop must stop at the first hit).
        assert_eq!(
            snapshot.classify_bank("COBRO GMF 4X1000", Decimal::ONE),
            Category::BNbk
        );
    }

    #[test]
    fn bank_without_match_falls_back_to_sign() {
        let snapshot = RuleSnapshot::new();
        assert_eq!(
            snapshot.classify_bank("PAGO PROVEEDOR", Decimal::new(-50000, 0)),
            Category::BEgr
        );
        assert_eq!(
            snapshot.classify_bank("CONSIGNACION CLIENTE", Decimal::new(80000, 0)),
            Category::BRcj
        );
        // Zero is not positive, so it lands on the expense side.
        assert_eq!(
            snapshot.classify_bank("AJUSTE", Decimal::ZERO),
            Category::BEgr
        );
    }
}
