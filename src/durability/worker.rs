//! DurabilityWorker: consumes the primary event topic and writes accepted
//! purchases to the relational store, with bounded retry and a dead-letter
//! sideline.
//!
//! The consume loop follows the teacher's periodic-worker idiom
//! (`sentinel/worker.rs`), but polls an `EventLog` reader instead of a fixed
//! interval, backing off briefly when the topic is caught up.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::core_types::{TicketId, UserId};
use crate::eventlog::{EventLogHandle, EventRecord, Reader, Topic};

use super::store::{PurchaseStore, SaveOutcome};

const DURABILITY_GROUP: &str = "durability-worker";
const DLQ_REPLAY_GROUP: &str = "recovery-group-v1";
const CATCH_UP_POLL: Duration = Duration::from_millis(50);

pub struct DurabilityWorker {
    store: Arc<dyn PurchaseStore>,
    eventlog: EventLogHandle,
    save_pacing: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl DurabilityWorker {
    pub fn new(
        store: Arc<dyn PurchaseStore>,
        eventlog: EventLogHandle,
        save_pacing: Duration,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            store,
            eventlog,
            save_pacing,
            max_retries,
            retry_delay,
        }
    }

    /// Consumes the primary topic until `shutdown` reports `true`.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        let mut reader = Reader::new(Topic::Primary, DURABILITY_GROUP, 0);
        loop {
            if *shutdown.borrow() {
                tracing::info!("durability worker received shutdown signal, exiting");
                return;
            }
            match reader.read(&self.eventlog).await {
                Ok(Some(record)) => self.process(&record).await,
                Ok(None) => tokio::time::sleep(CATCH_UP_POLL).await,
                Err(err) => {
                    tracing::warn!(%err, "durability worker failed to reach event log");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// On-demand dead-letter replay (spec.md §4.6 `ProcessDLQ`). Reads from
    /// the earliest offset under a fresh group id and self-terminates after
    /// `idle_timeout` with no new records.
    pub async fn process_dlq(&self, idle_timeout: Duration) {
        let mut reader = Reader::new(Topic::DeadLetter, DLQ_REPLAY_GROUP, 0);
        let mut last_record_at = Instant::now();
        loop {
            match reader.read(&self.eventlog).await {
                Ok(Some(record)) => {
                    last_record_at = Instant::now();
                    self.process(&record).await;
                }
                Ok(None) => {
                    if last_record_at.elapsed() >= idle_timeout {
                        tracing::info!("dlq replay terminating after idle timeout");
                        return;
                    }
                    tokio::time::sleep(CATCH_UP_POLL).await;
                }
                Err(err) => {
                    tracing::warn!(%err, "dlq replay failed to reach event log");
                    return;
                }
            }
        }
    }

    async fn process(&self, record: &EventRecord) {
        tokio::time::sleep(self.save_pacing).await;

        let ticket = record.ticket();
        let user = record.key.clone();

        let outcome = if record.is_cancel() {
            self.handle_cancel(&user, &ticket).await
        } else {
            self.handle_save(&user, &ticket).await
        };

        if let Err(reason) = outcome {
            tracing::error!(%user, %ticket, %reason, "durability retries exhausted, routing to dead-letter");
            if let Err(err) = self.eventlog.append_dead_letter(record, reason).await {
                tracing::error!(%err, "failed to publish dead-letter record, acknowledging upstream anyway");
            }
        }
    }

    /// Sleeps, inserts with on-conflict absorbed as idempotent success, and
    /// retries transient failures up to `max_retries` times at a fixed
    /// `retry_delay`. Returns `Err(reason)` only once retries are exhausted.
    async fn handle_save(&self, user: &UserId, ticket: &TicketId) -> Result<(), String> {
        for attempt in 0..=self.max_retries {
            match self.store.save_purchase(user, ticket).await {
                Ok(SaveOutcome::Inserted) | Ok(SaveOutcome::Duplicate) => return Ok(()),
                Err(err) if attempt == self.max_retries => return Err(err.to_string()),
                Err(err) => {
                    tracing::warn!(attempt, %err, "transient save failure, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
        unreachable!("loop always returns on the final attempt")
    }

    async fn handle_cancel(&self, user: &UserId, ticket: &TicketId) -> Result<(), String> {
        for attempt in 0..=self.max_retries {
            match self.store.delete_purchase(user, ticket).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt == self.max_retries => return Err(err.to_string()),
                Err(err) => {
                    tracing::warn!(attempt, %err, "transient delete failure, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
        unreachable!("loop always returns on the final attempt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durability::store::StoreError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// In-memory double standing in for Postgres; counts attempts and can be
    /// configured to fail a fixed number of times before succeeding or
    /// giving up, mirroring scenario E/F from spec.md §8.
    struct FlakyStore {
        rows: Mutex<Vec<(UserId, TicketId)>>,
        fail_times: AtomicU32,
        attempts: AtomicU32,
    }

    impl FlakyStore {
        fn new(fail_times: u32) -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                fail_times: AtomicU32::new(fail_times),
                attempts: AtomicU32::new(0),
            }
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PurchaseStore for FlakyStore {
        async fn save_purchase(&self, user: &UserId, ticket: &TicketId) -> Result<SaveOutcome, StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let remaining = self.fail_times.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|(u, t)| u == user && t == ticket) {
                return Ok(SaveOutcome::Duplicate);
            }
            rows.push((user.clone(), ticket.clone()));
            Ok(SaveOutcome::Inserted)
        }

        async fn delete_purchase(&self, user: &UserId, ticket: &TicketId) -> Result<(), StoreError> {
            self.rows
                .lock()
                .unwrap()
                .retain(|(u, t)| !(u == user && t == ticket));
            Ok(())
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn worker(store: Arc<FlakyStore>, eventlog: EventLogHandle) -> DurabilityWorker {
        DurabilityWorker::new(
            store,
            eventlog,
            Duration::from_millis(1),
            3,
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn transient_failures_are_retried_then_succeed() {
        let eventlog = crate::eventlog::spawn();
        let store = Arc::new(FlakyStore::new(2));
        let worker = worker(store.clone(), eventlog.clone());

        eventlog
            .append_purchase(UserId::from("u1"), &TicketId::from("concert"))
            .await
            .unwrap();
        let mut reader = Reader::new(Topic::Primary, "test", 0);
        let record = reader.read(&eventlog).await.unwrap().unwrap();

        worker.process(&record).await;

        assert_eq!(store.attempts(), 3);
        assert_eq!(store.rows.lock().unwrap().len(), 1);

        let mut dlq_reader = Reader::new(Topic::DeadLetter, "test", 0);
        assert!(dlq_reader.read(&eventlog).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exhausted_retries_route_to_dead_letter() {
        let eventlog = crate::eventlog::spawn();
        let store = Arc::new(FlakyStore::new(10));
        let worker = worker(store.clone(), eventlog.clone());

        eventlog
            .append_purchase(UserId::from("u1"), &TicketId::from("concert"))
            .await
            .unwrap();
        let mut reader = Reader::new(Topic::Primary, "test", 0);
        let record = reader.read(&eventlog).await.unwrap().unwrap();

        worker.process(&record).await;

        assert_eq!(store.attempts(), 4); // 1 initial + 3 retries
        assert_eq!(store.rows.lock().unwrap().len(), 0);

        let mut dlq_reader = Reader::new(Topic::DeadLetter, "test", 0);
        let dead = dlq_reader.read(&eventlog).await.unwrap().unwrap();
        assert!(dead.headers.error_reason.is_some());
    }

    #[tokio::test]
    async fn dlq_replay_applies_and_terminates_after_idle_timeout() {
        let eventlog = crate::eventlog::spawn();
        let store = Arc::new(FlakyStore::new(0));
        let worker = worker(store.clone(), eventlog.clone());

        let record = EventRecord {
            offset: 0,
            partition: 0,
            key: UserId::from("u1"),
            value: "concert".to_string(),
            headers: crate::eventlog::Headers {
                error_reason: Some("previously exhausted".to_string()),
            },
        };
        eventlog
            .append_dead_letter(&record, "previously exhausted".to_string())
            .await
            .unwrap();

        worker.process_dlq(Duration::from_millis(100)).await;

        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }
}
