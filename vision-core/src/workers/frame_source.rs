//! FrameSource: reads BGR frames from the camera at the configured rate and publishes
//! them to every `Preprocessor` waiter.
//!
//! Grounded on `FetchFrameThread.run` in `examples/original_source/.../camera.py`: a
//! failed read is retried, never torn down; the device is released only when the loop
//! exits.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use vision::Frame;

use crate::slot::{Slot, StopFlag};
use crate::trackers::Trackers;
use crate::worker_id::WorkerId;

/// Spawns the FrameSource loop. `camera` must already be open — spec.md §4.1's
/// "fails with `DeviceError` if the device cannot be opened or the initial frame fails"
/// is satisfied by `capture::Camera::open` before this is ever called, so boot failures
/// surface synchronously rather than inside a detached thread.
pub fn spawn(mut camera: capture::Camera, frame_slot: Arc<Slot<Frame>>, stop: Arc<StopFlag>, trackers: Arc<Trackers>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("fetch_frame".to_string())
        .spawn(move || {
            let _span = tracing::info_span!("fetch_frame").entered();
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                while !stop.is_set() {
                    trackers.start_iteration(WorkerId::FetchFrame);

                    match camera.read_frame() {
                        Ok(frame) => frame_slot.publish(frame),
                        Err(error) => {
                            tracing::warn!(%error, "camera read failed, retrying");
                            continue;
                        }
                    }

                    trackers.stop_iteration(WorkerId::FetchFrame);
                }
            }));
            if outcome.is_err() {
                tracing::error!("fetch_frame worker panicked, triggering shutdown");
                stop.set();
                frame_slot.notify_all();
            }
            // `camera` drops here, releasing the device.
        })
        .expect("failed to spawn fetch_frame thread")
}
