//! PurchaseService: orchestrates the per-request pipeline described in
//! spec.md §4.4: admit, dedup, decrement, publish event, release seat.
//!
//! This is the component everything else in the crate exists to support; its
//! shape follows the teacher's `ubscore.rs` `process_order` method (validate
//! step by step, compensate on the one step that can roll back, return a
//! typed outcome) generalized from a single-threaded core to an
//! actor-backed one.

mod guard;

use thiserror::Error;

use crate::admitter::{Admission, Admitter};
use crate::cache::{CacheError, CacheHandle, SOLD_OUT};
use crate::core_types::{TicketId, UserId};
use crate::eventlog::{EventLogError, EventLogHandle};
use guard::ActiveSlotGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyOutcome {
    Success { remaining_stock: i64 },
    Waiting { rank: u64 },
    SoldOut,
    AlreadyPurchased,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Accepted,
    Rejected,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ServiceError {
    #[error("cache unavailable")]
    Cache(#[from] CacheError),
    #[error("event log unavailable")]
    EventLog(#[from] EventLogError),
}

pub struct PurchaseService {
    cache: CacheHandle,
    eventlog: EventLogHandle,
    admitter: Admitter,
    ticket: TicketId,
    max_active: usize,
}

impl PurchaseService {
    pub fn new(cache: CacheHandle, eventlog: EventLogHandle, ticket: TicketId, max_active: usize) -> Self {
        let admitter = Admitter::new(cache.clone());
        Self {
            cache,
            eventlog,
            admitter,
            ticket,
            max_active,
        }
    }

    pub fn ticket(&self) -> &TicketId {
        &self.ticket
    }

    /// Steps 1-8 of spec.md §4.4.
    pub async fn buy(&self, user: UserId) -> BuyOutcome {
        // 1. Early sold-out probe. Race-safe: step 5 is the authoritative
        // gate, this only saves admitting a doomed request.
        match self.cache.get_stock(&self.ticket).await {
            Ok(stock) if stock <= 0 => return BuyOutcome::SoldOut,
            Ok(_) => {}
            Err(_) => return BuyOutcome::Fail,
        }

        // 2. Admission.
        match self.admitter.try_enter_or_enqueue(&user, self.max_active).await {
            Admission::Waiting(rank) => return BuyOutcome::Waiting { rank },
            Admission::Error => return BuyOutcome::Fail,
            Admission::Active => {}
        }

        // 3. Scoped release: guaranteed on every exit path below, including
        // an early return or a panic unwind.
        let _guard = ActiveSlotGuard::new(self.cache.clone(), user.clone());

        // 4. Duplicate check, deliberately before the decrement to minimize
        // stock churn from duplicate submissions.
        match self.cache.is_purchaser(&self.ticket, &user).await {
            Ok(true) => return BuyOutcome::AlreadyPurchased,
            Ok(false) => {}
            Err(_) => return BuyOutcome::Fail,
        }

        // 5. Stock gate: the single authoritative decision.
        let remaining = match self.cache.decrement(&self.ticket).await {
            Ok(n) if n == SOLD_OUT => return BuyOutcome::SoldOut,
            Ok(n) => n,
            Err(_) => return BuyOutcome::Fail,
        };

        // 6. Event publish. On failure, compensate by restoring stock - the
        // purchaser set has not yet been mutated, so this rollback is clean.
        if self
            .eventlog
            .append_purchase(user.clone(), &self.ticket)
            .await
            .is_err()
        {
            let _ = self.cache.increment(&self.ticket).await;
            return BuyOutcome::Fail;
        }

        // 7. Purchaser mark, intentionally after publish: see §9's note on
        // the after-publish ordering and why swapping it defeats the
        // compensation.
        if self.cache.add_purchaser(&self.ticket, &user).await.is_err() {
            return BuyOutcome::Fail;
        }

        // 8.
        BuyOutcome::Success {
            remaining_stock: remaining,
        }
    }

    /// Steps 1-5 of spec.md §4.4's Cancel. Best-effort at this layer;
    /// durability is delegated to `DurabilityWorker`.
    pub async fn cancel(&self, user: UserId) -> CancelOutcome {
        match self.cache.is_purchaser(&self.ticket, &user).await {
            Ok(true) => {}
            Ok(false) | Err(_) => return CancelOutcome::Rejected,
        }

        let _ = self.cache.increment(&self.ticket).await;
        let _ = self.cache.remove_purchaser(&self.ticket, &user).await;
        let _ = self.eventlog.append_cancel(user, &self.ticket).await;

        CancelOutcome::Accepted
    }
}
