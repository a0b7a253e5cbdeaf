//! The six workers' diagnostics, shared so the Annotator can read FPS/loop-time stats
//! written by every other thread.
//!
//! Spec.md §5: "`LoopTracker`s are written only by their owning worker and read by the
//! Annotator; reads may be racy and approximate" — a short-held `Mutex` per tracker
//! satisfies that without pretending the reads need to be lock-free.

use std::sync::Mutex;

use loop_tracker::LoopTracker;

use crate::worker_id::WorkerId;

/// One `LoopTracker` per worker, looked up by [`WorkerId`].
pub struct Trackers {
    fetch_frame: Mutex<LoopTracker>,
    preprocess_frame: Mutex<LoopTracker>,
    detect_ball: Mutex<LoopTracker>,
    detect_goals: Mutex<LoopTracker>,
    send_payload: Mutex<LoopTracker>,
    annotate_frame: Mutex<LoopTracker>,
}

impl Trackers {
    #[must_use]
    pub fn new(sample_size: usize) -> Self {
        Self {
            fetch_frame: Mutex::new(LoopTracker::new(sample_size)),
            preprocess_frame: Mutex::new(LoopTracker::new(sample_size)),
            detect_ball: Mutex::new(LoopTracker::new(sample_size)),
            detect_goals: Mutex::new(LoopTracker::new(sample_size)),
            send_payload: Mutex::new(LoopTracker::new(sample_size)),
            annotate_frame: Mutex::new(LoopTracker::new(sample_size)),
        }
    }

    fn tracker(&self, worker: WorkerId) -> &Mutex<LoopTracker> {
        match worker {
            WorkerId::FetchFrame => &self.fetch_frame,
            WorkerId::PreprocessFrame => &self.preprocess_frame,
            WorkerId::DetectBall => &self.detect_ball,
            WorkerId::DetectGoals => &self.detect_goals,
            WorkerId::SendPayload => &self.send_payload,
            WorkerId::AnnotateFrame => &self.annotate_frame,
        }
    }

    pub fn start_iteration(&self, worker: WorkerId) {
        self.tracker(worker).lock().expect("tracker mutex poisoned").start_iteration();
    }

    pub fn stop_iteration(&self, worker: WorkerId) {
        self.tracker(worker).lock().expect("tracker mutex poisoned").stop_iteration();
    }

    #[must_use]
    pub fn mean_fps(&self, worker: WorkerId) -> f64 {
        self.tracker(worker).lock().expect("tracker mutex poisoned").mean_fps()
    }

    #[must_use]
    pub fn last_fps(&self, worker: WorkerId) -> f64 {
        self.tracker(worker).lock().expect("tracker mutex poisoned").last_fps()
    }

    #[must_use]
    pub fn mean_loop_time(&self, worker: WorkerId) -> f64 {
        self.tracker(worker).lock().expect("tracker mutex poisoned").mean_loop_time()
    }
}

impl Default for Trackers {
    fn default() -> Self {
        Self::new(200)
    }
}
