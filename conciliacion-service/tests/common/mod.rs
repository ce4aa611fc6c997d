//! Common test utilities for conciliacion-service integration tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use conciliacion_service::dictionary::{DictionaryRule, RuleSnapshot};
use conciliacion_service::http::AppState;
use conciliacion_service::models::{Category, IngestionError, IngestionLog, Movement, Source};
use conciliacion_service::services::store::{DictionarySource, MovementStore, PncSource};
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
#[allow(dead_code)]
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,conciliacion_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[derive(Default)]
struct StoreInner {
    movements: Vec<Movement>,
    logs: Vec<IngestionLog>,
    errors: Vec<(Uuid, Source, String, IngestionError)>,
}

/// In-memory movement store. Insertion order is preserved, matching the
/// ingestion-order contract of the real store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
    fail_batch: AtomicBool,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `insert_movements` call fail, simulating a lost
    /// database connection mid-run.
    pub fn fail_next_batch(&self) {
        self.fail_batch.store(true, Ordering::SeqCst);
    }

    pub fn movements(&self) -> Vec<Movement> {
        self.inner.lock().unwrap().movements.clone()
    }

    pub fn logs(&self) -> Vec<IngestionLog> {
        self.inner.lock().unwrap().logs.clone()
    }

    pub fn errors(&self) -> Vec<IngestionError> {
        self.inner
            .lock()
            .unwrap()
            .errors
            .iter()
            .map(|(_, _, _, e)| e.clone())
            .collect()
    }

    pub fn seed(&self, movements: Vec<Movement>) {
        self.inner.lock().unwrap().movements.extend(movements);
    }
}

#[async_trait]
impl MovementStore for MemoryStore {
    async fn insert_movements(&self, movements: &[Movement]) -> Result<(), AppError> {
        if self.fail_batch.swap(false, Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "connection lost"
            )));
        }
        self.inner
            .lock()
            .unwrap()
            .movements
            .extend_from_slice(movements);
        Ok(())
    }

    async fn insert_log(&self, log: &IngestionLog) -> Result<(), AppError> {
        self.inner.lock().unwrap().logs.push(log.clone());
        Ok(())
    }

    async fn insert_errors(
        &self,
        company_id: Uuid,
        source: Source,
        file_name: &str,
        errors: &[IngestionError],
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        for error in errors {
            inner
                .errors
                .push((company_id, source, file_name.to_string(), error.clone()));
        }
        Ok(())
    }

    async fn movements_in_scope(
        &self,
        company_id: Option<Uuid>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Movement>, AppError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .movements
            .iter()
            .filter(|m| company_id.is_none_or(|id| m.company_id == id))
            .filter(|m| m.effective_date >= start && m.effective_date < end)
            .cloned()
            .collect())
    }

    async fn companies_in_scope(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Uuid>, AppError> {
        let mut companies: Vec<Uuid> = self
            .inner
            .lock()
            .unwrap()
            .movements
            .iter()
            .filter(|m| m.effective_date >= start && m.effective_date < end)
            .map(|m| m.company_id)
            .collect();
        companies.sort();
        companies.dedup();
        Ok(companies)
    }
}

/// Dictionary source returning a fixed snapshot for every company.
pub struct MemoryDictionary {
    pub snapshot: RuleSnapshot,
}

#[async_trait]
impl DictionarySource for MemoryDictionary {
    async fn load_snapshot(&self, _company_id: Uuid) -> Result<RuleSnapshot, AppError> {
        Ok(self.snapshot.clone())
    }
}

/// PNC source returning fixed per-category counts for every company.
#[derive(Default)]
pub struct MemoryPnc {
    pub counts: HashMap<Category, i64>,
}

#[async_trait]
impl PncSource for MemoryPnc {
    async fn pnc_counts(
        &self,
        _company_id: Uuid,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<HashMap<Category, i64>, AppError> {
        Ok(self.counts.clone())
    }
}

/// Rule snapshot used across the test files: one fiscal rule, one ledger
/// voucher, one bank concept keyword.
pub fn fixture_snapshot() -> RuleSnapshot {
    let mut snapshot = RuleSnapshot::new();
    snapshot.insert_fiscal(
        "Emitidos",
        "Factura electrónica",
        DictionaryRule {
            abbreviation: "FV".to_string(),
            category: Category::EDe,
            report_type: "INGRESOS".to_string(),
        },
    );
    snapshot.insert_fiscal(
        "Recibidos",
        "Factura electrónica",
        DictionaryRule {
            abbreviation: "FC".to_string(),
            category: Category::RDe,
            report_type: "EGRESOS".to_string(),
        },
    );
    snapshot.insert_ledger(
        "FAC",
        DictionaryRule {
            abbreviation: "FAC".to_string(),
            category: Category::ORcj,
            report_type: "INGRESOS".to_string(),
        },
    );
    snapshot.insert_ledger(
        "CE",
        DictionaryRule {
            abbreviation: "CE".to_string(),
            category: Category::OEgr,
            report_type: "EGRESOS".to_string(),
        },
    );
    snapshot.push_bank_keyword("comisión nbk");
    snapshot
}

/// Shared state wired to in-memory collaborators.
#[allow(dead_code)]
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub company_id: Uuid,
}

#[allow(dead_code)]
pub fn test_app() -> TestApp {
    test_app_with_pnc(HashMap::new())
}

#[allow(dead_code)]
pub fn test_app_with_pnc(counts: HashMap<Category, i64>) -> TestApp {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        dictionary: Arc::new(MemoryDictionary {
            snapshot: fixture_snapshot(),
        }),
        pnc: Arc::new(MemoryPnc { counts }),
    };
    TestApp {
        state,
        store,
        company_id: Uuid::new_v4(),
    }
}
