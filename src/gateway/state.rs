//! `AppState`: the cloneable, `Arc`-wrapped bundle of handles every axum
//! handler needs. Follows the teacher's `gateway/state.rs` construction
//! style (`Arc`-wrapped shared fields, a plain `new` constructor).

use std::sync::Arc;
use std::time::Duration;

use crate::cache::CacheHandle;
use crate::durability::{DurabilityWorker, PurchaseStore};
use crate::service::PurchaseService;

#[derive(Clone)]
pub struct AppState {
    pub cache: CacheHandle,
    pub service: Arc<PurchaseService>,
    pub durability: Arc<DurabilityWorker>,
    pub store: Arc<dyn PurchaseStore>,
    pub dlq_idle_timeout: Duration,
}

impl AppState {
    pub fn new(
        cache: CacheHandle,
        service: Arc<PurchaseService>,
        durability: Arc<DurabilityWorker>,
        store: Arc<dyn PurchaseStore>,
        dlq_idle_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            service,
            durability,
            store,
            dlq_idle_timeout,
        }
    }
}
