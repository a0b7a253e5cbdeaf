//! Preprocessor: crops/orients the raw frame, derives the color masks and (optionally)
//! the field mask, and publishes the bundle atomically for `BallDetector`/
//! `GoalDetector`/`Annotator`.
//!
//! Grounded on `PreprocessFrameThread.run` in `examples/original_source/.../camera.py`.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use vision::{Frame, Preprocessed};

use crate::params::ParameterBlock;
use crate::slot::{Slot, StopFlag};
use crate::trackers::Trackers;
use crate::worker_id::WorkerId;

pub fn spawn(
    frame_slot: Arc<Slot<Frame>>,
    masks_slot: Arc<Slot<Preprocessed>>,
    params: Arc<ParameterBlock>,
    stop: Arc<StopFlag>,
    trackers: Arc<Trackers>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("preprocess_frame".to_string())
        .spawn(move || {
            let _span = tracing::info_span!("preprocess_frame").entered();
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let mut last_seen = 0;
                loop {
                    let Some((frame, generation)) = frame_slot.wait_for_update(last_seen, &stop) else {
                        break;
                    };
                    last_seen = generation;

                    trackers.start_iteration(WorkerId::PreprocessFrame);
                    let preprocessed = vision::preprocess(&frame, &params.preprocess_params());
                    masks_slot.publish(preprocessed);
                    trackers.stop_iteration(WorkerId::PreprocessFrame);
                }
            }));
            if outcome.is_err() {
                tracing::error!("preprocess_frame worker panicked, triggering shutdown");
                stop.set();
                masks_slot.notify_all();
            }
        })
        .expect("failed to spawn preprocess_frame thread")
}
