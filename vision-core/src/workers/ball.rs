//! BallDetector worker: ticks `vision::BallDetector` against the orange mask and
//! publishes into the shared detection block.
//!
//! Grounded on `DetectBallThread.run` in `examples/original_source/.../camera.py`.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use vision::{BallDetector, Preprocessed};

use crate::detections::{DetectionBlock, DetectionEntry};
use crate::params::ParameterBlock;
use crate::slot::{Slot, StopFlag};
use crate::trackers::Trackers;
use crate::worker_id::WorkerId;

pub fn spawn(
    masks_slot: Arc<Slot<Preprocessed>>,
    detections: Arc<DetectionBlock>,
    params: Arc<ParameterBlock>,
    stop: Arc<StopFlag>,
    trackers: Arc<Trackers>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("detect_ball".to_string())
        .spawn(move || {
            let _span = tracing::info_span!("detect_ball").entered();
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let mut detector = BallDetector::new();
                let mut last_seen = 0;
                loop {
                    let Some((masks, generation)) = masks_slot.wait_for_update(last_seen, &stop) else {
                        break;
                    };
                    last_seen = generation;

                    trackers.start_iteration(WorkerId::DetectBall);
                    let detection = detector.tick(&masks.orange, &params.ball_params());
                    detections.publish_ball(DetectionEntry { raw: detection.raw, filtered: detection.filtered, rect: None });
                    trackers.stop_iteration(WorkerId::DetectBall);
                }
            }));
            if outcome.is_err() {
                tracing::error!("detect_ball worker panicked, triggering shutdown");
                stop.set();
                detections.notify_all();
            }
        })
        .expect("failed to spawn detect_ball thread")
}
