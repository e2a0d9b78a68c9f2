//! At-most-one-in-flight list queries.
//!
//! Starting a query through [`LatestOnly::run`] aborts the query that is
//! still pending, so a slow response can never overwrite the result of a
//! more recent one. Ordering is by issuance, not by arrival.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use futures::future::{abortable, AbortHandle};
use tracing::debug;

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    pending: Option<AbortHandle>,
}

#[derive(Debug, Default)]
pub struct LatestOnly {
    slot: Mutex<Slot>,
}

impl LatestOnly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `query`, superseding any pending one.
    ///
    /// Returns `None` when this query was itself superseded before its result
    /// could be published.
    pub async fn run<F, T>(&self, query: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let (query, handle) = abortable(query);

        let ticket = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = slot.pending.replace(handle) {
                previous.abort();
                debug!(superseded = slot.generation, "Cancelled pending list query");
            }
            slot.generation += 1;
            slot.generation
        };

        let outcome = query.await;

        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.generation != ticket {
            return None;
        }
        slot.pending = None;
        outcome.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_sequential_queries_both_publish() {
        let gate = LatestOnly::new();
        assert_eq!(gate.run(async { "A" }).await, Some("A"));
        assert_eq!(gate.run(async { "B" }).await, Some("B"));
    }

    #[tokio::test]
    async fn test_newer_query_wins_when_older_resolves_last() {
        let gate = LatestOnly::new();
        let (tx_a, rx_a) = oneshot::channel::<&str>();
        let (tx_b, rx_b) = oneshot::channel::<&str>();

        let (a, b, ()) = tokio::join!(
            gate.run(async { rx_a.await.unwrap() }),
            gate.run(async { rx_b.await.unwrap() }),
            async {
                tx_b.send("B").unwrap();
                tokio::task::yield_now().await;
                let _ = tx_a.send("A");
            }
        );

        assert_eq!(a, None);
        assert_eq!(b, Some("B"));
    }

    #[tokio::test]
    async fn test_newer_query_wins_when_older_resolves_first() {
        let gate = LatestOnly::new();
        let (tx_a, rx_a) = oneshot::channel::<&str>();
        let (tx_b, rx_b) = oneshot::channel::<&str>();

        let (a, b, ()) = tokio::join!(
            gate.run(async { rx_a.await.unwrap() }),
            gate.run(async { rx_b.await.unwrap() }),
            async {
                let _ = tx_a.send("A");
                tokio::task::yield_now().await;
                tx_b.send("B").unwrap();
            }
        );

        assert_eq!(a, None);
        assert_eq!(b, Some("B"));
    }
}
