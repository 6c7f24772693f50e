//! Internal state and command loop for the FastCache actor.
//!
//! `CacheState` owns the stock counter, purchaser set, active set and
//! waiting queue described in `spec.md` §3/§4.1. It is only ever touched
//! from inside [`run`], which processes one [`Request`] at a time off an
//! `mpsc` channel - the async equivalent of the teacher's single-threaded
//! `UBSCore`, so every multi-key script below is atomic by construction.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tokio::sync::{mpsc, oneshot};

use crate::core_types::{TicketId, UserId};

/// Sentinel returned by `Decrement` when stock is exhausted.
pub const SOLD_OUT: i64 = -1;

/// Outcome of `TryEnterOrEnqueue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterStatus {
    Active,
    Waiting(u64),
}

pub(super) enum Request {
    Decrement {
        ticket: TicketId,
        reply: oneshot::Sender<i64>,
    },
    Increment {
        ticket: TicketId,
        reply: oneshot::Sender<i64>,
    },
    Get {
        ticket: TicketId,
        reply: oneshot::Sender<i64>,
    },
    IsPurchaser {
        ticket: TicketId,
        user: UserId,
        reply: oneshot::Sender<bool>,
    },
    AddPurchaser {
        ticket: TicketId,
        user: UserId,
        reply: oneshot::Sender<()>,
    },
    RemovePurchaser {
        ticket: TicketId,
        user: UserId,
        reply: oneshot::Sender<()>,
    },
    TryEnterOrEnqueue {
        user: UserId,
        max_active: usize,
        reply: oneshot::Sender<EnterStatus>,
    },
    /// `reply` is `None` for the fire-and-forget release used by
    /// `ActiveSlotGuard::drop` (see `service::guard`), which cannot `.await`.
    RemoveActive {
        user: UserId,
        reply: Option<oneshot::Sender<()>>,
    },
    Promote {
        max_active: usize,
        reply: oneshot::Sender<usize>,
    },
    ActiveCount {
        reply: oneshot::Sender<usize>,
    },
    InitStock {
        ticket: TicketId,
        stock: i64,
        reply: oneshot::Sender<()>,
    },
}

struct CacheState {
    stock: FxHashMap<TicketId, i64>,
    purchasers: FxHashMap<TicketId, FxHashSet<UserId>>,
    active: FxHashSet<UserId>,
    waiting_order: VecDeque<UserId>,
    waiting_set: FxHashSet<UserId>,
}

impl CacheState {
    fn new() -> Self {
        Self {
            stock: FxHashMap::default(),
            purchasers: FxHashMap::default(),
            active: FxHashSet::default(),
            waiting_order: VecDeque::new(),
            waiting_set: FxHashSet::default(),
        }
    }

    fn decrement(&mut self, ticket: &TicketId) -> i64 {
        let stock = self.stock.entry(ticket.clone()).or_insert(0);
        if *stock > 0 {
            *stock -= 1;
            *stock
        } else {
            SOLD_OUT
        }
    }

    fn increment(&mut self, ticket: &TicketId) -> i64 {
        let stock = self.stock.entry(ticket.clone()).or_insert(0);
        *stock += 1;
        *stock
    }

    fn get(&self, ticket: &TicketId) -> i64 {
        self.stock.get(ticket).copied().unwrap_or(0)
    }

    fn is_purchaser(&self, ticket: &TicketId, user: &UserId) -> bool {
        self.purchasers
            .get(ticket)
            .map(|set| set.contains(user))
            .unwrap_or(false)
    }

    fn add_purchaser(&mut self, ticket: &TicketId, user: UserId) {
        self.purchasers.entry(ticket.clone()).or_default().insert(user);
    }

    fn remove_purchaser(&mut self, ticket: &TicketId, user: &UserId) {
        if let Some(set) = self.purchasers.get_mut(ticket) {
            set.remove(user);
        }
    }

    /// Single atomic script per `spec.md` §4.1: membership check, seat
    /// admission, or FIFO enqueue, all against the same in-process state.
    fn try_enter_or_enqueue(&mut self, user: UserId, max_active: usize) -> EnterStatus {
        if self.active.contains(&user) {
            return EnterStatus::Active;
        }
        if self.active.len() < max_active {
            self.active.insert(user);
            return EnterStatus::Active;
        }
        // Re-enqueue is idempotent: a user who calls again while already
        // waiting keeps their original position. The reference Redis script
        // this is generalized from re-runs `ZADD` unconditionally, which
        // would bump the member's score to "now" and move them to the back
        // of the queue, silently violating the rank-monotonicity property
        // in spec.md §8. Invariant (a) of the waiting queue ("no
        // duplicates") is read here as license to make re-entry a no-op
        // rather than a score update; see DESIGN.md.
        if !self.waiting_set.contains(&user) {
            self.waiting_set.insert(user.clone());
            self.waiting_order.push_back(user.clone());
        }
        let rank = self
            .waiting_order
            .iter()
            .position(|u| u == &user)
            .map(|idx| idx as u64 + 1)
            .unwrap_or(0);
        EnterStatus::Waiting(rank)
    }

    fn remove_active(&mut self, user: &UserId) {
        self.active.remove(user);
    }

    /// Promotes the oldest waiting users into the active set, up to however
    /// many seats freed up since the last tick.
    fn promote(&mut self, max_active: usize) -> usize {
        let seats = max_active.saturating_sub(self.active.len());
        let mut promoted = 0;
        for _ in 0..seats {
            match self.waiting_order.pop_front() {
                Some(user) => {
                    self.waiting_set.remove(&user);
                    self.active.insert(user);
                    promoted += 1;
                }
                None => break,
            }
        }
        promoted
    }
}

pub(super) async fn run(mut rx: mpsc::Receiver<Request>) {
    let mut state = CacheState::new();
    while let Some(req) = rx.recv().await {
        match req {
            Request::Decrement { ticket, reply } => {
                let _ = reply.send(state.decrement(&ticket));
            }
            Request::Increment { ticket, reply } => {
                let _ = reply.send(state.increment(&ticket));
            }
            Request::Get { ticket, reply } => {
                let _ = reply.send(state.get(&ticket));
            }
            Request::IsPurchaser { ticket, user, reply } => {
                let _ = reply.send(state.is_purchaser(&ticket, &user));
            }
            Request::AddPurchaser { ticket, user, reply } => {
                state.add_purchaser(&ticket, user);
                let _ = reply.send(());
            }
            Request::RemovePurchaser { ticket, user, reply } => {
                state.remove_purchaser(&ticket, &user);
                let _ = reply.send(());
            }
            Request::TryEnterOrEnqueue {
                user,
                max_active,
                reply,
            } => {
                let _ = reply.send(state.try_enter_or_enqueue(user, max_active));
            }
            Request::RemoveActive { user, reply } => {
                state.remove_active(&user);
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
            Request::Promote { max_active, reply } => {
                let _ = reply.send(state.promote(max_active));
            }
            Request::ActiveCount { reply } => {
                let _ = reply.send(state.active.len());
            }
            Request::InitStock {
                ticket,
                stock,
                reply,
            } => {
                state.stock.insert(ticket, stock);
                let _ = reply.send(());
            }
        }
    }
    tracing::warn!("FastCache actor shutting down: all handles dropped");
}
