// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! In-Flight Request Registry
//!
//! De-duplicates concurrent fetches of the same key. The first requester
//! starts the work; later requesters attach to the same shared future and
//! receive a clone of its result.
//!
//! # Cancellation
//!
//! Every waiter races the shared future against its own token, so one caller
//! navigating away does not disturb the others. Each flight also owns a token
//! (a child of the registry root) that is handed to the work itself; it is
//! cancelled when the last waiter leaves before the work completes.

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::errors::ContentError;

type FlightFuture<T> = Shared<BoxFuture<'static, Result<T, ContentError>>>;

struct Flight<T: Clone> {
    id: u64,
    future: FlightFuture<T>,
    cancel: CancellationToken,
    waiters: usize,
}

type FlightMap<K, T> = Arc<Mutex<HashMap<K, Flight<T>>>>;

pub struct InFlightRegistry<K, T: Clone> {
    flights: FlightMap<K, T>,
    next_id: AtomicU64,
    root: CancellationToken,
}

impl<K, T> InFlightRegistry<K, T>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(root: CancellationToken) -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            root,
        }
    }

    /// Await the flight for `key`, starting it with `start` if none exists.
    ///
    /// `start` receives the flight's own token and is only called when this
    /// caller is the first requester.
    pub async fn run<F>(
        &self,
        key: K,
        cancel: &CancellationToken,
        start: F,
    ) -> Result<T, ContentError>
    where
        F: FnOnce(CancellationToken) -> BoxFuture<'static, Result<T, ContentError>>,
    {
        if cancel.is_cancelled() {
            return Err(ContentError::Cancelled);
        }

        let (id, future) = {
            let mut flights = self.flights.lock();
            match flights.get_mut(&key) {
                Some(flight) => {
                    flight.waiters += 1;
                    debug!(?key, waiters = flight.waiters, "Attached to in-flight request");
                    (flight.id, flight.future.clone())
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let flight_cancel = self.root.child_token();
                    let future = start(flight_cancel.clone()).shared();
                    flights.insert(
                        key.clone(),
                        Flight {
                            id,
                            future: future.clone(),
                            cancel: flight_cancel,
                            waiters: 1,
                        },
                    );
                    (id, future)
                }
            }
        };

        let mut waiter = Waiter {
            flights: Arc::clone(&self.flights),
            key,
            id,
            completed: false,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ContentError::Cancelled),
            result = future => {
                waiter.completed = true;
                result
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.flights.lock().len()
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.flights.lock().contains_key(key)
    }
}

/// Releases a waiter's claim on its flight when the waiting future ends,
/// including when it is dropped mid-poll.
struct Waiter<K: Eq + Hash, T: Clone> {
    flights: FlightMap<K, T>,
    key: K,
    id: u64,
    completed: bool,
}

impl<K: Eq + Hash, T: Clone> Drop for Waiter<K, T> {
    fn drop(&mut self) {
        let mut flights = self.flights.lock();
        let Some(flight) = flights.get_mut(&self.key) else {
            return;
        };
        // The key may already belong to a newer flight
        if flight.id != self.id {
            return;
        }

        flight.waiters = flight.waiters.saturating_sub(1);
        if self.completed {
            flights.remove(&self.key);
        } else if flight.waiters == 0 {
            flight.cancel.cancel();
            flights.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn registry() -> Arc<InFlightRegistry<String, u32>> {
        Arc::new(InFlightRegistry::new(CancellationToken::new()))
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_flight() {
        let registry = registry();
        let starts = Arc::new(AtomicUsize::new(0));

        let run = |registry: Arc<InFlightRegistry<String, u32>>, starts: Arc<AtomicUsize>| async move {
            let cancel = CancellationToken::new();
            registry
                .run("CaseStudy-0001".to_string(), &cancel, move |_| {
                    starts.fetch_add(1, Ordering::SeqCst);
                    async {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(7)
                    }
                    .boxed()
                })
                .await
        };

        let (a, b) = tokio::join!(
            run(Arc::clone(&registry), Arc::clone(&starts)),
            run(Arc::clone(&registry), Arc::clone(&starts))
        );

        assert_eq!(a, Ok(7));
        assert_eq!(b, Ok(7));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_last_waiter_leaving_cancels_flight() {
        let registry = registry();
        let observed = Arc::new(Mutex::new(None::<CancellationToken>));

        let cancel = CancellationToken::new();
        let slot = Arc::clone(&observed);
        let waiting = {
            let registry = Arc::clone(&registry);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                registry
                    .run("Pilot/Dreamers".to_string(), &cancel, move |flight_cancel| {
                        *slot.lock() = Some(flight_cancel.clone());
                        async move {
                            flight_cancel.cancelled().await;
                            Err(ContentError::Cancelled)
                        }
                        .boxed()
                    })
                    .await
            })
        };

        while !registry.is_in_flight(&"Pilot/Dreamers".to_string()) {
            tokio::task::yield_now().await;
        }
        cancel.cancel();

        assert_eq!(waiting.await.unwrap(), Err(ContentError::Cancelled));
        let flight_cancel = observed.lock().clone().unwrap();
        assert!(flight_cancel.is_cancelled());
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_one_waiter_cancelling_does_not_disturb_others() {
        let registry = registry();
        let leaving = CancellationToken::new();
        let staying = CancellationToken::new();

        let start = |_: CancellationToken| {
            async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(42)
            }
            .boxed()
        };

        let first = registry.run("key".to_string(), &staying, start);
        let second = async {
            leaving.cancel();
            registry.run("key".to_string(), &leaving, start).await
        };

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first, Ok(42));
        assert_eq!(second, Err(ContentError::Cancelled));
    }

    #[tokio::test]
    async fn test_failures_are_shared_and_not_retained() {
        let registry = registry();
        let cancel = CancellationToken::new();

        let result = registry
            .run("broken".to_string(), &cancel, |_| {
                async { Err(ContentError::Network("connection refused".into())) }.boxed()
            })
            .await;
        assert!(matches!(result, Err(ContentError::Network(_))));

        let retried = registry
            .run("broken".to_string(), &cancel, |_| async { Ok(1) }.boxed())
            .await;
        assert_eq!(retried, Ok(1));
    }
}
