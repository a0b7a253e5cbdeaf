//! Composition root: opens the two hardware devices, builds the shared primitives, and
//! spawns the six pipeline workers.
//!
//! Grounded on `Camera` in `examples/original_source/.../camera.py`: `start`/`stop`/
//! `start_annotating`/`stop_annotating`/`is_annotating` mirror it 1:1, including the
//! exact shutdown sequence (clear the annotate gate, sleep, set the stop flag, wake
//! every blocked waiter, join every thread).

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use vision::{Frame, Preprocessed};

use crate::debug::{DebugSink, NullDebugSink};
use crate::detections::DetectionBlock;
use crate::error::Result;
use crate::gate::Gate;
use crate::params::{ParameterBlock, ParameterBlockToml};
use crate::slot::{Slot, StopFlag};
use crate::trackers::Trackers;
use crate::workers::goal::GoalColor;
use crate::workers::{annotate, ball, frame_source, goal, preprocessor, send_payload};

/// The running pipeline: every shared primitive plus the six worker handles. Dropping
/// this without calling [`Coordinator::stop`] leaks the threads — `stop` is the only
/// sanctioned teardown path, mirroring the original's `Camera.stop`.
pub struct Coordinator {
    stop: Arc<StopFlag>,
    should_annotate: Arc<Gate>,
    params: Arc<ParameterBlock>,
    frame_slot: Arc<Slot<Frame>>,
    masks_slot: Arc<Slot<Preprocessed>>,
    detections: Arc<DetectionBlock>,
    debug_sink: Arc<dyn DebugSink>,
    handles: Vec<JoinHandle<()>>,
}

impl Coordinator {
    /// Opens the camera and serial link synchronously (so a bad device path fails boot
    /// rather than a detached thread), then spawns all six workers.
    pub fn spawn(toml: ParameterBlockToml) -> Result<Self> {
        Self::spawn_with_debug_sink(toml, Arc::new(NullDebugSink))
    }

    pub fn spawn_with_debug_sink(toml: ParameterBlockToml, debug_sink: Arc<dyn DebugSink>) -> Result<Self> {
        let camera_config = capture::CameraConfig {
            device_path: PathBuf::from(&toml.camera.device_path),
            width: toml.camera.width,
            height: toml.camera.height,
            fps: toml.camera.fps,
            buffer_count: toml.camera.buffer_count,
        };
        let camera = capture::Camera::open(&camera_config)?;
        let serial_link = wire::SerialLink::open_with(&toml.serial.device, toml.serial.baud_rate)?;

        let params = Arc::new(ParameterBlock::from_toml(toml));
        let stop = Arc::new(StopFlag::new());
        let should_annotate = Arc::new(Gate::new(false));
        let trackers = Arc::new(Trackers::default());

        let frame_slot: Arc<Slot<Frame>> = Arc::new(Slot::new());
        let masks_slot: Arc<Slot<Preprocessed>> = Arc::new(Slot::new());
        let detections = Arc::new(DetectionBlock::new());

        let mut handles = Vec::with_capacity(6);

        handles.push(frame_source::spawn(camera, frame_slot.clone(), stop.clone(), trackers.clone()));
        handles.push(preprocessor::spawn(frame_slot.clone(), masks_slot.clone(), params.clone(), stop.clone(), trackers.clone()));
        handles.push(ball::spawn(masks_slot.clone(), detections.clone(), params.clone(), stop.clone(), trackers.clone()));
        handles.push(goal::spawn(
            GoalColor::Blue,
            masks_slot.clone(),
            detections.clone(),
            params.clone(),
            stop.clone(),
            trackers.clone(),
        ));
        handles.push(goal::spawn(
            GoalColor::Yellow,
            masks_slot.clone(),
            detections.clone(),
            params.clone(),
            stop.clone(),
            trackers.clone(),
        ));
        handles.push(send_payload::spawn(serial_link, detections.clone(), stop.clone(), trackers.clone()));
        handles.push(annotate::spawn(
            masks_slot.clone(),
            detections.clone(),
            params.clone(),
            should_annotate.clone(),
            debug_sink.clone(),
            stop.clone(),
            trackers,
        ));

        Ok(Self { stop, should_annotate, params, frame_slot, masks_slot, detections, debug_sink, handles })
    }

    #[must_use]
    pub fn params(&self) -> &Arc<ParameterBlock> {
        &self.params
    }

    #[must_use]
    pub fn debug_sink(&self) -> &Arc<dyn DebugSink> {
        &self.debug_sink
    }

    pub fn start_annotating(&self) {
        self.should_annotate.set(true);
    }

    pub fn stop_annotating(&self) {
        self.should_annotate.set(false);
    }

    #[must_use]
    pub fn is_annotating(&self) -> bool {
        self.should_annotate.is_set()
    }

    /// Tears the pipeline down: stop annotating, give the Annotator a moment to finish
    /// its current tick, signal every worker to exit, wake every blocked waiter, then
    /// join every thread.
    pub fn stop(mut self) {
        self.should_annotate.set(false);
        std::thread::sleep(Duration::from_millis(500));

        self.stop.set();
        self.should_annotate.set(true);
        self.frame_slot.notify_all();
        self.masks_slot.notify_all();
        self.detections.notify_all();

        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
