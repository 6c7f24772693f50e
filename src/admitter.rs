//! The Admitter: a stateless wrapper around `CacheHandle::try_enter_or_enqueue`.
//!
//! Holds no state of its own - `FastCache` is the only authority on
//! membership. Kept as its own type (rather than inlined into
//! `PurchaseService`) because it is a distinct component in the design and
//! gets its own focused unit tests.

use crate::cache::{CacheError, CacheHandle, EnterStatus};
use crate::core_types::UserId;

/// Outcome of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The user holds an active-set slot and may proceed down the hot path.
    Active,
    /// The user is queued; rank is 1-based and advisory only, it reflects
    /// queue position at the moment of the call and may be stale by the
    /// time the caller observes it.
    Waiting(u64),
    /// The cache was unreachable.
    Error,
}

pub struct Admitter {
    cache: CacheHandle,
}

impl Admitter {
    pub fn new(cache: CacheHandle) -> Self {
        Self { cache }
    }

    pub async fn try_enter_or_enqueue(&self, user: &UserId, max_active: usize) -> Admission {
        match self.cache.try_enter_or_enqueue(user, max_active).await {
            Ok(EnterStatus::Active) => Admission::Active,
            Ok(EnterStatus::Waiting(rank)) => Admission::Waiting(rank),
            Err(CacheError::Unavailable) => Admission::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_until_capacity_then_queues() {
        let cache = crate::cache::spawn();
        let admitter = Admitter::new(cache);

        let a = admitter.try_enter_or_enqueue(&UserId::from("u1"), 1).await;
        assert_eq!(a, Admission::Active);

        let b = admitter.try_enter_or_enqueue(&UserId::from("u2"), 1).await;
        assert_eq!(b, Admission::Waiting(1));
    }
}
