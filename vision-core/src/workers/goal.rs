//! GoalDetector worker: ticks `vision::GoalDetector` against one color mask and
//! publishes into the shared detection block. Spawned twice (blue, yellow), each
//! instance owning its own detector state, its own mask accessor, and its own
//! publish closure.
//!
//! Grounded on `DetectGoalsThread.run` in `examples/original_source/.../camera.py`,
//! which runs the identical loop body for both colors off one thread per color.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use vision::{GoalDetector, Preprocessed};

use crate::detections::{DetectionBlock, DetectionEntry};
use crate::params::ParameterBlock;
use crate::slot::{Slot, StopFlag};
use crate::trackers::Trackers;
use crate::worker_id::WorkerId;

/// Which goal color this instance tracks, selecting the mask it reads and the
/// detection-block field it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalColor {
    Blue,
    Yellow,
}

impl GoalColor {
    fn thread_name(self) -> &'static str {
        match self {
            Self::Blue => "detect_goals_blue",
            Self::Yellow => "detect_goals_yellow",
        }
    }

    fn mask<'a>(self, masks: &'a Preprocessed) -> &'a vision::Mask {
        match self {
            Self::Blue => &masks.blue,
            Self::Yellow => &masks.yellow,
        }
    }

    fn publish(self, detections: &DetectionBlock, entry: DetectionEntry) {
        match self {
            Self::Blue => detections.publish_blue_goal(entry),
            Self::Yellow => detections.publish_yellow_goal(entry),
        }
    }
}

pub fn spawn(
    color: GoalColor,
    masks_slot: Arc<Slot<Preprocessed>>,
    detections: Arc<DetectionBlock>,
    params: Arc<ParameterBlock>,
    stop: Arc<StopFlag>,
    trackers: Arc<Trackers>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name(color.thread_name().to_string())
        .spawn(move || {
            let _span = tracing::info_span!("detect_goals", color = color.thread_name()).entered();
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let mut detector = GoalDetector::new();
                let mut last_seen = 0;
                loop {
                    let Some((masks, generation)) = masks_slot.wait_for_update(last_seen, &stop) else {
                        break;
                    };
                    last_seen = generation;

                    trackers.start_iteration(WorkerId::DetectGoals);
                    let detection = detector.tick(color.mask(&masks), &params.goal_params());
                    color.publish(
                        &detections,
                        DetectionEntry { raw: detection.raw, filtered: detection.filtered, rect: detection.rect },
                    );
                    trackers.stop_iteration(WorkerId::DetectGoals);
                }
            }));
            if outcome.is_err() {
                tracing::error!(color = color.thread_name(), "detect_goals worker panicked, triggering shutdown");
                stop.set();
                detections.notify_all();
            }
        })
        .expect("failed to spawn detect_goals thread")
}
