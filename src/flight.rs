//! Per-key registry of in-flight producer calls.
//!
//! Concurrent misses for the same key await one shared future instead of
//! each running the producer.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, WeakShared};
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A producer call that any number of callers can await.
pub(crate) type Flight<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// Flights are keyed by cache key and output type, so callers asking for
/// different types under one key never share a result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FlightKey {
    key: String,
    output: TypeId,
}

impl FlightKey {
    fn of<T: 'static, E: 'static>(key: &str) -> Self {
        FlightKey {
            key: key.to_string(),
            output: TypeId::of::<Result<T, E>>(),
        }
    }
}

/// Registry slot. Only a weak handle is kept: once every caller awaiting the
/// flight is gone, the producer future is dropped.
struct Slot<T, E> {
    id: u64,
    flight: WeakShared<BoxFuture<'static, Result<T, E>>>,
}

/// Outcome of joining the registry.
pub(crate) enum Joined<T, E> {
    /// A new flight was registered; the caller's producer runs in it.
    Leader(Flight<T, E>),
    /// Another caller's flight was already running.
    Follower(Flight<T, E>),
}

#[derive(Default)]
pub(crate) struct InFlight {
    flights: Mutex<HashMap<FlightKey, Box<dyn Any + Send + Sync>>>,
    next_id: AtomicU64,
}

impl InFlight {
    /// Join the running flight for `key`, or register `start(guard)` as the
    /// new one.
    ///
    /// `start` is only called when no live flight exists. The flight must hold
    /// `guard` until it completes; dropping the guard releases the slot, so a
    /// flight abandoned by all of its callers is released too.
    pub(crate) fn join_or_start<T, E>(
        self: &Arc<Self>,
        key: &str,
        start: impl FnOnce(FlightGuard<T, E>) -> BoxFuture<'static, Result<T, E>>,
    ) -> Joined<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        let flight_key = FlightKey::of::<T, E>(key);
        let mut flights = self.flights.lock();

        if let Some(flight) = flights
            .get(&flight_key)
            .and_then(|slot| slot.downcast_ref::<Slot<T, E>>())
            .and_then(|slot| slot.flight.upgrade())
        {
            return Joined::Follower(flight);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = FlightGuard {
            registry: Arc::clone(self),
            key: key.to_string(),
            id,
            _output: PhantomData,
        };
        let flight = start(guard).shared();

        match flight.downgrade() {
            Some(weak) => {
                flights.insert(flight_key, Box::new(Slot { id, flight: weak }));
            }
            // Already complete, nothing to share
            None => {
                flights.remove(&flight_key);
            }
        }
        Joined::Leader(flight)
    }

    /// Release the slot for `key` if it still belongs to flight `id`.
    fn finish<T: Send + Sync + 'static, E: Send + Sync + 'static>(&self, key: &str, id: u64) {
        let flight_key = FlightKey::of::<T, E>(key);
        let mut flights = self.flights.lock();

        let owned = flights
            .get(&flight_key)
            .and_then(|slot| slot.downcast_ref::<Slot<T, E>>())
            .is_some_and(|slot| slot.id == id);
        if owned {
            flights.remove(&flight_key);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.flights.lock().len()
    }
}

/// Releases a flight's registry slot when the flight completes or is dropped.
pub(crate) struct FlightGuard<T: Send + Sync + 'static, E: Send + Sync + 'static> {
    registry: Arc<InFlight>,
    key: String,
    id: u64,
    _output: PhantomData<fn() -> (T, E)>,
}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Drop for FlightGuard<T, E> {
    fn drop(&mut self) {
        self.registry.finish::<T, E>(&self.key, self.id);
    }
}
