//! Promoter: a periodic background task that moves waiting users into the
//! active set as seats free up.
//!
//! Grounded on the teacher's `sentinel/worker.rs` `SentinelWorker::run` loop
//! (`loop { ...scan...; sleep(interval).await }`), adapted to
//! `tokio::time::interval` so ticks cannot overlap - the loop body, including
//! the `await` on the cache actor, always completes before the next tick
//! fires (a late tick is simply skipped, matching `MissedTickBehavior::Skip`
//! defaults for a `Burst`-free ticker).

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

use crate::cache::CacheHandle;

pub struct Promoter {
    cache: CacheHandle,
    max_active: usize,
    tick_interval: Duration,
}

impl Promoter {
    pub fn new(cache: CacheHandle, max_active: usize, tick_interval: Duration) -> Self {
        Self {
            cache,
            max_active,
            tick_interval,
        }
    }

    /// Runs until `shutdown` reports `true`, checked on each tick boundary.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if *shutdown.borrow() {
                tracing::info!("promoter received shutdown signal, exiting");
                return;
            }
            match self.cache.promote(self.max_active).await {
                Ok(promoted) if promoted > 0 => {
                    tracing::info!(promoted, "promoted waiting users into active set");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(%err, "promoter tick failed to reach cache actor");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn promotes_waiting_user_once_a_slot_frees_up() {
        let cache = crate::cache::spawn();
        let admitter = crate::admitter::Admitter::new(cache.clone());

        admitter
            .try_enter_or_enqueue(&crate::core_types::UserId::from("u1"), 1)
            .await;
        let waiting = admitter
            .try_enter_or_enqueue(&crate::core_types::UserId::from("u2"), 1)
            .await;
        assert_eq!(
            waiting,
            crate::admitter::Admission::Waiting(1)
        );

        cache
            .remove_active(&crate::core_types::UserId::from("u1"))
            .await
            .unwrap();

        let promoted = cache.promote(1).await.unwrap();
        assert_eq!(promoted, 1);
        assert!(
            cache
                .is_purchaser(&crate::core_types::TicketId::from("t"), &crate::core_types::UserId::from("u2"))
                .await
                .unwrap()
                == false
        );
        assert_eq!(cache.active_count().await.unwrap(), 1);
    }
}
