//! The single-writer/many-reader/latest-wins broadcast primitive that wires every
//! worker stage together.
//!
//! Grounded on `MemoryManager`'s `threading.Condition` fields in
//! `examples/original_source/.../camera.py`: each inter-stage value there is a plain
//! attribute guarded by one `Condition`, written by exactly one thread and
//! `notify_all`'d on every publish. [`Slot`] generalizes that pattern once instead of
//! hand-rolling the `Mutex`+`Condvar` pair at each of the pipeline's channels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// The process-wide cancellation flag, checked at the top of every worker loop and
/// broadcast through every [`Slot`] during shutdown (spec.md §5).
#[derive(Debug, Default)]
pub struct StopFlag(AtomicBool);

impl StopFlag {
    #[must_use]
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }
}

struct State<T> {
    value: Option<Arc<T>>,
    generation: u64,
}

/// A latest-wins broadcast slot: `publish` overwrites and wakes every waiter,
/// `wait_for_update` blocks a consumer until a value newer than the one it last saw
/// arrives. Values are held behind an `Arc` so publishing never copies a frame, mask
/// set, or other bulky payload.
pub struct Slot<T> {
    state: Mutex<State<T>>,
    condvar: Condvar,
}

impl<T> Slot<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Mutex::new(State { value: None, generation: 0 }), condvar: Condvar::new() }
    }

    /// Publishes a new value and wakes every consumer currently waiting on it. The
    /// value is fully assembled by the caller before this is called, so no waiter ever
    /// observes a partially-written publication.
    pub fn publish(&self, value: T) {
        let mut state = self.state.lock().expect("slot mutex poisoned");
        state.value = Some(Arc::new(value));
        state.generation += 1;
        self.condvar.notify_all();
    }

    /// Blocks until a publication newer than `last_seen` arrives, or `stop` is set.
    /// Returns `None` exactly when shutdown fired first, `Some` with the new value and
    /// its generation otherwise.
    pub fn wait_for_update(&self, last_seen: u64, stop: &StopFlag) -> Option<(Arc<T>, u64)> {
        let mut state = self.state.lock().expect("slot mutex poisoned");
        loop {
            if stop.is_set() {
                return None;
            }
            if state.generation != last_seen {
                if let Some(value) = state.value.clone() {
                    return Some((value, state.generation));
                }
            }
            state = self.condvar.wait(state).expect("slot mutex poisoned");
        }
    }

    /// The current value without waiting, for a reader (e.g. the Annotator) that only
    /// wants "whatever is there right now".
    #[must_use]
    pub fn current(&self) -> Option<Arc<T>> {
        self.state.lock().expect("slot mutex poisoned").value.clone()
    }

    /// Wakes every blocked waiter without publishing a new value — used during shutdown
    /// so a consumer parked in `wait_for_update` falls through and observes the stop
    /// flag.
    pub fn notify_all(&self) {
        self.condvar.notify_all();
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn a_waiter_sees_only_publications_newer_than_its_last_seen_generation() {
        let slot: Arc<Slot<i32>> = Arc::new(Slot::new());
        slot.publish(1);

        let stop = StopFlag::new();
        let (value, generation) = slot.wait_for_update(0, &stop).unwrap();
        assert_eq!(*value, 1);

        let slot2 = slot.clone();
        let handle = thread::spawn(move || {
            let stop = StopFlag::new();
            slot2.wait_for_update(generation, &stop)
        });

        thread::sleep(Duration::from_millis(20));
        slot.publish(2);
        let (value, _) = handle.join().unwrap().unwrap();
        assert_eq!(*value, 2);
    }

    #[test]
    fn stop_wakes_a_blocked_waiter_with_no_new_value() {
        let slot: Arc<Slot<i32>> = Arc::new(Slot::new());
        let stop = Arc::new(StopFlag::new());

        let slot2 = slot.clone();
        let stop2 = stop.clone();
        let handle = thread::spawn(move || slot2.wait_for_update(0, &stop2));

        thread::sleep(Duration::from_millis(20));
        stop.set();
        slot.notify_all();

        assert!(handle.join().unwrap().is_none());
    }
}
