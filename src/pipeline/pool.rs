//! Bounded worker pool feeding an append-only result sink.

use std::future::Future;

use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;

/// Append-only collector shared by concurrent units. Each result carries the position of
/// the unit that produced it so the final order does not depend on completion order.
#[derive(Debug)]
pub struct ResultSink<T> {
    slots: Mutex<Vec<(usize, T)>>,
}

impl<T> ResultSink<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn push(&self, position: usize, value: T) {
        self.slots.lock().push((position, value));
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Results in unit order.
    pub fn into_ordered(self) -> Vec<T> {
        let mut slots = self.slots.into_inner();
        slots.sort_by_key(|(position, _)| *position);
        slots.into_iter().map(|(_, value)| value).collect()
    }
}

/// Runs `f` over `units` with at most `concurrency` in flight and returns the outputs in
/// unit order.
pub async fn run_bounded<T, U, F, Fut>(units: Vec<T>, concurrency: usize, f: F) -> Vec<U>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = U>,
{
    let sink = ResultSink::with_capacity(units.len());

    stream::iter(units.into_iter().enumerate())
        .for_each_concurrent(concurrency.max(1), |(position, unit)| {
            let sink = &sink;
            let work = f(unit);
            async move {
                sink.push(position, work.await);
            }
        })
        .await;

    sink.into_ordered()
}
