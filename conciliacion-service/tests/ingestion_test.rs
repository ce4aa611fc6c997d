//! Integration tests for the ingestion pipeline.

mod common;

use common::{test_app, MemoryDictionary, MemoryStore};
use conciliacion_service::dictionary::RuleSnapshot;
use conciliacion_service::ingest::{self, BankParser, FiscalParser, LedgerParser};
use conciliacion_service::models::RunStatus;
use rust_decimal::Decimal;
use std::sync::Arc;

const FISCAL_CSV: &str = "\
Grupo,Tipo de documento,Fecha Emisión,Total,IVA,Nombre Emisor
Emitidos,Factura electrónica,2024-03-05,119000,19000,ACME SAS
Recibidos,Factura Electrónica,2024-03-07,59500,9500,PROVEEDOR SA
Emitidos,Documento desconocido,2024-03-08,100,0,OTRO
";

const LEDGER_CSV: &str = "\
Comprobante,Fecha elaboración,Débito,Crédito,Secuencia,Descripción
FAC,2024-03-10,250000,0,1,Venta marzo
FAC,2024-03-10,0,250000,1,Contrapartida
CE,2024-03-12,0,80000,5,Pago proveedor
";

#[tokio::test]
async fn fiscal_run_records_unmapped_rows_without_aborting() {
    let app = test_app();

    let outcome = ingest::run(
        app.state.store.as_ref(),
        app.state.dictionary.as_ref(),
        &FiscalParser,
        app.company_id,
        "documentos.csv",
        FISCAL_CSV.as_bytes(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.errors.len(), 1);
    // Header is row 1, so the third data row is row 4.
    assert_eq!(outcome.errors[0].row, 4);
    assert!(outcome.errors[0].message.contains("EMITIDOS_DOCUMENTO DESCONOCIDO"));

    let movements = app.store.movements();
    assert_eq!(movements.len(), 2);
    assert_eq!(movements[0].amount, Decimal::new(100000, 0));
    assert_eq!(movements[0].category, "E-DE");
    assert_eq!(movements[1].category, "R-DE");

    let logs = app.store.logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, RunStatus::HasErrors);
    assert_eq!(logs[0].processed, 2);
    assert_eq!(logs[0].failed, 1);
    assert_eq!(logs[0].message, "2 processed, 1 errors");
    assert_eq!(app.store.errors().len(), 1);
}

#[tokio::test]
async fn clean_run_logs_processed_status() {
    let app = test_app();

    let outcome = ingest::run(
        app.state.store.as_ref(),
        app.state.dictionary.as_ref(),
        &LedgerParser,
        app.company_id,
        "auxiliar.csv",
        LEDGER_CSV.as_bytes(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.processed, 3);
    assert!(outcome.errors.is_empty());

    let logs = app.store.logs();
    assert_eq!(logs[0].status, RunStatus::Processed);
    assert_eq!(logs[0].message, "3 processed, 0 errors");

    // Both lines of voucher FAC are persisted; dedup happens at report time.
    let movements = app.store.movements();
    assert_eq!(movements.len(), 3);
    assert_eq!(movements[0].voucher.as_deref(), Some("FAC"));
    assert_eq!(movements[1].voucher.as_deref(), Some("FAC"));
}

#[tokio::test]
async fn bank_run_mixes_rows_and_errors_in_file_order() {
    let app = test_app();
    let body = serde_json::json!([
        {"descripcion": "CONSIGNACION CLIENTE", "fecha": "2024-03-01", "valor": 80000},
        {"descripcion": "COBRO COMISION NBK", "fecha": "2024-03-02", "valor": -15000},
        {"descripcion": "SIN FECHA", "valor": 10},
        {"descripcion": "PAGO PROVEEDOR", "fecha": "2024-03-03", "valor": -50000}
    ]);

    let outcome = ingest::run(
        app.state.store.as_ref(),
        app.state.dictionary.as_ref(),
        &BankParser,
        app.company_id,
        "extracto.json",
        serde_json::to_vec(&body).unwrap().as_slice(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.processed, 3);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].row, 3);

    let categories: Vec<String> = app
        .store
        .movements()
        .iter()
        .map(|m| m.category.clone())
        .collect();
    assert_eq!(categories, vec!["B-RCJ", "B-NBK", "B-EGR"]);
}

#[tokio::test]
async fn batch_persistence_failure_aborts_the_run() {
    let app = test_app();
    app.store.fail_next_batch();

    let result = ingest::run(
        app.state.store.as_ref(),
        app.state.dictionary.as_ref(),
        &FiscalParser,
        app.company_id,
        "documentos.csv",
        FISCAL_CSV.as_bytes(),
    )
    .await;

    assert!(result.is_err());
    // Nothing may be partially visible: no movements, no log, no errors.
    assert!(app.store.movements().is_empty());
    assert!(app.store.logs().is_empty());
    assert!(app.store.errors().is_empty());
}

#[tokio::test]
async fn empty_dictionary_rejects_every_accounting_row() {
    let store = Arc::new(MemoryStore::new());
    let dictionary = MemoryDictionary {
        snapshot: RuleSnapshot::new(),
    };

    let outcome = ingest::run(
        store.as_ref(),
        &dictionary,
        &LedgerParser,
        uuid::Uuid::new_v4(),
        "auxiliar.csv",
        LEDGER_CSV.as_bytes(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.processed, 0);
    assert_eq!(outcome.errors.len(), 3);
    assert_eq!(store.logs()[0].status, RunStatus::HasErrors);
}
