//! `ActiveSlotGuard`: the RAII release for a user's active-set slot.
//!
//! Grounded on the teacher's `impl Drop for LedgerWriter` (`ledger.rs`),
//! which flushes synchronously on every exit path including a panic
//! unwind. Releasing a cache slot is inherently async (it's a round-trip
//! through the actor's channel), so `Drop` cannot `.await` it; instead it
//! uses [`CacheHandle::remove_active_detached`], a `try_send` fire-and-forget
//! that mirrors the synchronous flush the teacher's guard performs. This is
//! the "scoped-acquisition-with-guaranteed-release facility" spec.md §9 asks
//! for: it fires on success, on any early `return`, and on an unwinding
//! panic alike.

use crate::cache::CacheHandle;
use crate::core_types::UserId;

pub struct ActiveSlotGuard {
    cache: CacheHandle,
    user: UserId,
}

impl ActiveSlotGuard {
    pub fn new(cache: CacheHandle, user: UserId) -> Self {
        Self { cache, user }
    }
}

impl Drop for ActiveSlotGuard {
    fn drop(&mut self) {
        self.cache.remove_active_detached(self.user.clone());
    }
}
