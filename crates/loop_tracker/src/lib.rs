//! Per-worker loop time and FPS diagnostics, read by the Annotator and otherwise racy by
//! design (spec.md §5: "reads may be racy and approximate").
//!
//! A 1:1 port of the original `LoopTracker` class, including its "-1 when empty"
//! sentinel return values rather than `Option` — this is a diagnostics-only convention
//! worth preserving as-is.

use std::collections::VecDeque;
use std::time::Instant;

const DEFAULT_SAMPLE_SIZE: usize = 200;

/// Tracks a sliding window of loop times (ms) and inter-iteration frame rates for one
/// worker.
#[derive(Debug)]
pub struct LoopTracker {
    sample_size: usize,
    start_time: Option<Instant>,
    last_end_time: Option<Instant>,
    loop_time_history_ms: VecDeque<f64>,
    fps_history: VecDeque<f64>,
}

impl LoopTracker {
    #[must_use]
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size,
            start_time: None,
            last_end_time: None,
            loop_time_history_ms: VecDeque::new(),
            fps_history: VecDeque::new(),
        }
    }

    /// Marks the start of one loop iteration.
    pub fn start_iteration(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Marks the end of one loop iteration, recording its duration and, if a previous
    /// iteration was observed, the instantaneous FPS between the two.
    pub fn stop_iteration(&mut self) {
        let end_time = Instant::now();
        let loop_time_ms = match self.start_time {
            Some(start) => (end_time - start).as_secs_f64() * 1000.0,
            None => 0.0,
        };
        self.loop_time_history_ms.push_back(loop_time_ms);

        if let Some(last_end_time) = self.last_end_time {
            let elapsed = (end_time - last_end_time).as_secs_f64();
            if elapsed > 0.0 {
                self.fps_history.push_back(1.0 / elapsed);
            }
        }
        self.last_end_time = Some(end_time);

        while self.loop_time_history_ms.len() >= self.sample_size {
            self.loop_time_history_ms.pop_front();
        }
        while self.fps_history.len() >= self.sample_size {
            self.fps_history.pop_front();
        }
    }

    /// The most recent loop time in milliseconds, or `-1` if no iteration has completed.
    #[must_use]
    pub fn last_loop_time(&self) -> f64 {
        self.loop_time_history_ms.back().copied().unwrap_or(-1.0)
    }

    /// The most recent instantaneous FPS, or `-1` if fewer than two iterations have
    /// completed.
    #[must_use]
    pub fn last_fps(&self) -> f64 {
        self.fps_history.back().copied().unwrap_or(-1.0)
    }

    /// Mean loop time in milliseconds over the sliding window, or `-1` if empty.
    #[must_use]
    pub fn mean_loop_time(&self) -> f64 {
        mean_or_sentinel(&self.loop_time_history_ms)
    }

    /// Mean FPS over the sliding window, or `-1` if empty.
    #[must_use]
    pub fn mean_fps(&self) -> f64 {
        mean_or_sentinel(&self.fps_history)
    }
}

impl Default for LoopTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_SIZE)
    }
}

fn mean_or_sentinel(history: &VecDeque<f64>) -> f64 {
    if history.is_empty() {
        -1.0
    } else {
        history.iter().sum::<f64>() / history.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;
    use std::time::Duration;

    use super::*;

    #[test]
    fn sentinel_before_any_iteration() {
        let tracker = LoopTracker::new(200);
        assert_eq!(tracker.last_loop_time(), -1.0);
        assert_eq!(tracker.last_fps(), -1.0);
        assert_eq!(tracker.mean_loop_time(), -1.0);
        assert_eq!(tracker.mean_fps(), -1.0);
    }

    #[test]
    fn fps_requires_two_completed_iterations() {
        let mut tracker = LoopTracker::new(200);

        tracker.start_iteration();
        sleep(Duration::from_millis(2));
        tracker.stop_iteration();
        assert!(tracker.last_loop_time() >= 0.0);
        assert_eq!(tracker.last_fps(), -1.0, "only one iteration has completed so far");

        tracker.start_iteration();
        sleep(Duration::from_millis(2));
        tracker.stop_iteration();
        assert!(tracker.last_fps() > 0.0);
    }

    #[test]
    fn window_stays_bounded_at_sample_size_minus_one() {
        let mut tracker = LoopTracker::new(3);
        for _ in 0..10 {
            tracker.start_iteration();
            tracker.stop_iteration();
        }
        assert!(tracker.loop_time_history_ms.len() < 3);
    }
}
