//! The shared detection block `BallDetector`/`GoalDetector` publish into and
//! `PacketSink`/`Annotator` read from.
//!
//! Unlike [`crate::slot::Slot`] this has three independent writers (ball, blue goal,
//! yellow goal) updating disjoint fields of the same block — mirroring
//! `MemoryManager.new_detections`, the single `Condition` the original's
//! `DetectBallThread` and `DetectGoalsThread` both notify after writing their own
//! `mem.ball`/`mem.blue_goal`/`mem.yellow_goal` attribute. "Ball and goal detections run
//! concurrently from the same mask tick and may update the downstream slot in either
//! order" (spec.md §5) is exactly this: each writer only ever touches its own field.

use std::sync::{Condvar, Mutex};

use vision::geometry::RotatedRect;

use crate::slot::StopFlag;

/// One tracked object's raw measurement, filtered estimate, and (for goals) the
/// rectangle the Annotator draws a box around.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionEntry {
    pub raw: Option<(f32, f32)>,
    pub filtered: Option<(f32, f32)>,
    pub rect: Option<RotatedRect>,
}

/// A consistent read of all three tracked objects at one point in time.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionSnapshot {
    pub ball: DetectionEntry,
    pub blue_goal: DetectionEntry,
    pub yellow_goal: DetectionEntry,
}

struct Inner {
    ball: DetectionEntry,
    blue_goal: DetectionEntry,
    yellow_goal: DetectionEntry,
    generation: u64,
}

/// The ball/blue-goal/yellow-goal triple, each written by its own detector thread.
pub struct DetectionBlock {
    inner: Mutex<Inner>,
    condvar: Condvar,
}

impl DetectionBlock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                ball: DetectionEntry::default(),
                blue_goal: DetectionEntry::default(),
                yellow_goal: DetectionEntry::default(),
                generation: 0,
            }),
            condvar: Condvar::new(),
        }
    }

    pub fn publish_ball(&self, entry: DetectionEntry) {
        let mut inner = self.inner.lock().expect("detection block mutex poisoned");
        inner.ball = entry;
        inner.generation += 1;
        self.condvar.notify_all();
    }

    pub fn publish_blue_goal(&self, entry: DetectionEntry) {
        let mut inner = self.inner.lock().expect("detection block mutex poisoned");
        inner.blue_goal = entry;
        inner.generation += 1;
        self.condvar.notify_all();
    }

    pub fn publish_yellow_goal(&self, entry: DetectionEntry) {
        let mut inner = self.inner.lock().expect("detection block mutex poisoned");
        inner.yellow_goal = entry;
        inner.generation += 1;
        self.condvar.notify_all();
    }

    /// Blocks until any writer publishes, or `stop` is set.
    pub fn wait_for_update(&self, last_seen: u64, stop: &StopFlag) -> Option<(DetectionSnapshot, u64)> {
        let mut inner = self.inner.lock().expect("detection block mutex poisoned");
        loop {
            if stop.is_set() {
                return None;
            }
            if inner.generation != last_seen {
                let snapshot = DetectionSnapshot { ball: inner.ball, blue_goal: inner.blue_goal, yellow_goal: inner.yellow_goal };
                return Some((snapshot, inner.generation));
            }
            inner = self.condvar.wait(inner).expect("detection block mutex poisoned");
        }
    }

    #[must_use]
    pub fn current(&self) -> DetectionSnapshot {
        let inner = self.inner.lock().expect("detection block mutex poisoned");
        DetectionSnapshot { ball: inner.ball, blue_goal: inner.blue_goal, yellow_goal: inner.yellow_goal }
    }

    pub fn notify_all(&self) {
        self.condvar.notify_all();
    }
}

impl Default for DetectionBlock {
    fn default() -> Self {
        Self::new()
    }
}
