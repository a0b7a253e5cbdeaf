//! A boolean gate the Annotator blocks on, mirroring `threading.Event`
//! (`should_annotate_event` in `examples/original_source/.../camera.py`): the Annotator
//! only runs while a debug client is attached, and the coordinator's shutdown sequence
//! sets it regardless of its last value purely to unblock a parked waiter.

use std::sync::{Condvar, Mutex};

pub struct Gate {
    state: Mutex<bool>,
    condvar: Condvar,
}

impl Gate {
    #[must_use]
    pub fn new(initial: bool) -> Self {
        Self { state: Mutex::new(initial), condvar: Condvar::new() }
    }

    pub fn set(&self, value: bool) {
        let mut state = self.state.lock().expect("gate mutex poisoned");
        *state = value;
        self.condvar.notify_all();
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.state.lock().expect("gate mutex poisoned")
    }

    /// Blocks until the gate is set to `true`.
    pub fn wait_until_set(&self) {
        let mut state = self.state.lock().expect("gate mutex poisoned");
        while !*state {
            state = self.condvar.wait(state).expect("gate mutex poisoned");
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new(false)
    }
}
