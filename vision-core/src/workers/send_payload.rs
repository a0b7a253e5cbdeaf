//! PacketSink: waits for any detector to publish, builds the fixed 14-byte packet from
//! whichever values currently sit in the detection block, and writes it to the
//! microcontroller link.
//!
//! Grounded on `SendPayloadThread.run` in `examples/original_source/.../camera.py`: a
//! write failure is logged and the loop continues — the next tick's packet is the
//! recovery strategy, there is no retry at this layer (spec.md §7).

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use wire::{Packet, SerialLink};

use crate::detections::DetectionBlock;
use crate::slot::StopFlag;
use crate::trackers::Trackers;
use crate::worker_id::WorkerId;

/// Spawns the PacketSink loop. `link` must already be open — spec.md §4.5's
/// "fails with `DeviceError` if the serial device cannot be opened" is satisfied by
/// `wire::SerialLink::open_with` before this is ever called.
pub fn spawn(
    mut link: SerialLink,
    detections: Arc<DetectionBlock>,
    stop: Arc<StopFlag>,
    trackers: Arc<Trackers>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("send_payload".to_string())
        .spawn(move || {
            let _span = tracing::info_span!("send_payload").entered();
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let mut last_seen = 0;
                loop {
                    let Some((snapshot, generation)) = detections.wait_for_update(last_seen, &stop) else {
                        break;
                    };
                    last_seen = generation;

                    trackers.start_iteration(WorkerId::SendPayload);
                    let packet = Packet::new(snapshot.ball.filtered, snapshot.blue_goal.filtered, snapshot.yellow_goal.filtered);
                    if let Err(error) = link.send(&packet) {
                        tracing::warn!(%error, "failed to write packet, dropping this tick");
                    }
                    trackers.stop_iteration(WorkerId::SendPayload);
                }
            }));
            if outcome.is_err() {
                tracing::error!("send_payload worker panicked, triggering shutdown");
                stop.set();
            }
        })
        .expect("failed to spawn send_payload thread")
}
