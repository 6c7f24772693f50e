//! DurabilityWorker and its persistence boundary, spec.md §4.6.

mod store;
mod worker;

pub use store::{PostgresStore, PurchaseStore, SaveOutcome, StoreError};
pub use worker::DurabilityWorker;
