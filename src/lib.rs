//! Virtual waiting room and atomic stock-and-membership gate for
//! high-contention ticket reservation, plus the asynchronous durability
//! pipeline that writes accepted purchases to a relational store.
//!
//! Module layout follows the teacher's `lib.rs`: one module per component,
//! re-exported flat from the crate root for downstream consumers.

pub mod admitter;
pub mod cache;
pub mod config;
pub mod core_types;
pub mod durability;
pub mod eventlog;
pub mod gateway;
pub mod logging;
pub mod promoter;
pub mod service;

pub use admitter::{Admission, Admitter};
pub use cache::{CacheError, CacheHandle};
pub use config::AppConfig;
pub use core_types::{TicketId, UserId};
pub use durability::{DurabilityWorker, PostgresStore, PurchaseStore};
pub use eventlog::{EventLogHandle, EventLogError, Topic};
pub use promoter::Promoter;
pub use service::{BuyOutcome, CancelOutcome, PurchaseService};
