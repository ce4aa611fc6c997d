//! Conciliacion Service - multi-tenant financial reconciliation engine.

pub mod classify;
pub mod config;
pub mod dictionary;
pub mod http;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod periods;
pub mod report;
pub mod services;
pub mod startup;
