//! The FastCache: an atomic stock-and-membership gate, held entirely in
//! memory by a single owner task so every operation in spec.md §4.1 is
//! indivisible without taking a lock, the same trick the teacher's
//! `transfer/channel.rs` uses to make `UBSCore` safe to share across the
//! gateway's handler tasks.
//!
//! Callers never see the actor or its channel: they get a cheaply
//! `Clone`able [`CacheHandle`] whose methods round-trip a request through
//! `mpsc` and a matching `oneshot` reply, exactly like the teacher's
//! `TransferSender::send_request`.

mod actor;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::core_types::{TicketId, UserId};
use actor::Request;

pub use actor::{EnterStatus, SOLD_OUT};

/// Bounded channel depth for the actor's inbox. Mirrors the teacher's
/// `TransferSender` default; large enough to absorb a burst without
/// back-pressuring callers under normal load.
const CHANNEL_CAPACITY: usize = 4096;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// The actor task is gone (panicked or shut down) and the reply channel
    /// was dropped before answering, the in-process analogue of losing the
    /// connection to Redis mid-script.
    #[error("FastCache actor is unavailable")]
    Unavailable,
}

/// Cloneable handle to the FastCache actor task.
#[derive(Clone)]
pub struct CacheHandle {
    tx: mpsc::Sender<Request>,
}

/// Spawns the FastCache actor and returns a handle to it. The actor runs
/// until every `CacheHandle` clone (and the one returned here) is dropped.
pub fn spawn() -> CacheHandle {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    tokio::spawn(actor::run(rx));
    CacheHandle { tx }
}

impl CacheHandle {
    async fn call<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, CacheError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| CacheError::Unavailable)?;
        reply_rx.await.map_err(|_| CacheError::Unavailable)
    }

    /// Atomically decrements stock; returns the new stock level, or
    /// [`SOLD_OUT`] (-1) if it was already zero.
    pub async fn decrement(&self, ticket: &TicketId) -> Result<i64, CacheError> {
        let ticket = ticket.clone();
        self.call(|reply| Request::Decrement { ticket, reply }).await
    }

    /// Restores one unit of stock (used to roll back a failed purchase).
    pub async fn increment(&self, ticket: &TicketId) -> Result<i64, CacheError> {
        let ticket = ticket.clone();
        self.call(|reply| Request::Increment { ticket, reply }).await
    }

    /// Reads current stock without mutating it (the sold-out probe).
    pub async fn get_stock(&self, ticket: &TicketId) -> Result<i64, CacheError> {
        let ticket = ticket.clone();
        self.call(|reply| Request::Get { ticket, reply }).await
    }

    pub async fn is_purchaser(&self, ticket: &TicketId, user: &UserId) -> Result<bool, CacheError> {
        let ticket = ticket.clone();
        let user = user.clone();
        self.call(|reply| Request::IsPurchaser { ticket, user, reply })
            .await
    }

    pub async fn add_purchaser(&self, ticket: &TicketId, user: &UserId) -> Result<(), CacheError> {
        let ticket = ticket.clone();
        let user = user.clone();
        self.call(|reply| Request::AddPurchaser { ticket, user, reply })
            .await
    }

    pub async fn remove_purchaser(
        &self,
        ticket: &TicketId,
        user: &UserId,
    ) -> Result<(), CacheError> {
        let ticket = ticket.clone();
        let user = user.clone();
        self.call(|reply| Request::RemovePurchaser { ticket, user, reply })
            .await
    }

    /// Admits `user` into the active set if there's room, else enqueues them
    /// (idempotently) and returns their FIFO rank.
    pub async fn try_enter_or_enqueue(
        &self,
        user: &UserId,
        max_active: usize,
    ) -> Result<EnterStatus, CacheError> {
        let user = user.clone();
        self.call(|reply| Request::TryEnterOrEnqueue {
            user,
            max_active,
            reply,
        })
        .await
    }

    /// Releases `user`'s active-set slot and waits for confirmation.
    pub async fn remove_active(&self, user: &UserId) -> Result<(), CacheError> {
        let user = user.clone();
        self.call(|reply| Request::RemoveActive {
            user,
            reply: Some(reply),
        })
        .await
    }

    /// Fire-and-forget variant of [`Self::remove_active`] for use from
    /// `Drop` impls, which cannot `.await` a reply. Best-effort: if the
    /// actor's inbox is full or gone, the slot leaks until the promoter's
    /// next full reconciliation (see DESIGN.md Open Questions).
    pub fn remove_active_detached(&self, user: UserId) {
        let _ = self.tx.try_send(Request::RemoveActive { user, reply: None });
    }

    /// Promotes waiting users into freed active-set seats; returns how many
    /// were promoted this tick.
    pub async fn promote(&self, max_active: usize) -> Result<usize, CacheError> {
        self.call(|reply| Request::Promote { max_active, reply }).await
    }

    pub async fn active_count(&self) -> Result<usize, CacheError> {
        self.call(|reply| Request::ActiveCount { reply }).await
    }

    /// Seeds the stock counter for a ticket. Intended for startup only.
    pub async fn init_stock(&self, ticket: &TicketId, stock: i64) -> Result<(), CacheError> {
        let ticket = ticket.clone();
        self.call(|reply| Request::InitStock {
            ticket,
            stock,
            reply,
        })
        .await
    }
}
