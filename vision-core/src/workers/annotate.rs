//! Annotator: builds the human-readable status report and the annotated debug views,
//! gated so it only runs while a debug client is attached.
//!
//! Grounded on `AnnotateFrameThread.run`/`get_annotated_frame` in
//! `examples/original_source/.../camera.py` and its `util.draw_mask`/`draw_cross`.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use imageproc::drawing::{draw_cross_mut, draw_line_segment_mut};
use vision::geometry::{self, RotatedRect};
use vision::Preprocessed;

use crate::debug::{DebugFrame, DebugSink};
use crate::detections::{DetectionBlock, DetectionEntry, DetectionSnapshot};
use crate::gate::Gate;
use crate::params::{DebugView, ParameterBlock};
use crate::slot::{Slot, StopFlag};
use crate::trackers::Trackers;
use crate::worker_id::WorkerId;

const PURPLE: image::Rgb<u8> = image::Rgb([240, 32, 160]);
const WHITE: image::Rgb<u8> = image::Rgb([255, 255, 255]);
const GREEN: image::Rgb<u8> = image::Rgb([0, 255, 0]);
const CYAN: image::Rgb<u8> = image::Rgb([0, 255, 255]);
const BLUE: image::Rgb<u8> = image::Rgb([255, 0, 0]);

#[allow(clippy::too_many_arguments)]
pub fn spawn(
    masks_slot: Arc<Slot<Preprocessed>>,
    detections: Arc<DetectionBlock>,
    params: Arc<ParameterBlock>,
    should_annotate: Arc<Gate>,
    debug_sink: Arc<dyn DebugSink>,
    stop: Arc<StopFlag>,
    trackers: Arc<Trackers>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("annotate_frame".to_string())
        .spawn(move || {
            let _span = tracing::info_span!("annotate_frame").entered();
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let mut last_seen = 0;
                let mut ball_distance_history: VecDeque<f32> = VecDeque::new();

                while !stop.is_set() {
                    should_annotate.wait_until_set();
                    if stop.is_set() {
                        break;
                    }

                    let Some((snapshot, generation)) = detections.wait_for_update(last_seen, &stop) else {
                        break;
                    };
                    last_seen = generation;

                    trackers.start_iteration(WorkerId::AnnotateFrame);

                    let Some(masks) = masks_slot.current() else {
                        trackers.stop_iteration(WorkerId::AnnotateFrame);
                        continue;
                    };

                    if let Some((_, distance)) = snapshot.ball.filtered {
                        ball_distance_history.push_back(distance);
                        while ball_distance_history.len() > 100 {
                            ball_distance_history.pop_front();
                        }
                    }
                    let mean_ball_distance = if ball_distance_history.is_empty() {
                        None
                    } else {
                        #[allow(clippy::cast_precision_loss)]
                        let count = ball_distance_history.len() as f32;
                        Some(ball_distance_history.iter().sum::<f32>() / count)
                    };

                    let render = params.render.load(Ordering::Relaxed);
                    let debug_views = params.debug_views.lock().expect("debug views mutex poisoned").clone();

                    let (mainfeed, subfeeds) = if render {
                        let mainfeed = render_view(&masks, &snapshot, DebugView::Default);
                        let subfeeds = debug_views.iter().map(|&view| (view, render_view(&masks, &snapshot, view))).collect();
                        (mainfeed, subfeeds)
                    } else {
                        let mainfeed = masks.cropped_frame.to_rgb_image();
                        let blank = image::RgbImage::new(mainfeed.width(), mainfeed.height());
                        let subfeeds = debug_views.iter().map(|&view| (view, blank.clone())).collect();
                        (mainfeed, subfeeds)
                    };

                    let text = build_report(&trackers, &snapshot, mean_ball_distance);
                    debug_sink.publish(DebugFrame { text, mainfeed, subfeeds });

                    trackers.stop_iteration(WorkerId::AnnotateFrame);
                }
            }));
            if outcome.is_err() {
                tracing::error!("annotate_frame worker panicked, triggering shutdown");
                stop.set();
            }
        })
        .expect("failed to spawn annotate_frame thread")
}

/// Renders one debug view: a raw mask overlay, or the default annotated frame with
/// detection crosses and goal rectangles.
fn render_view(masks: &Preprocessed, snapshot: &DetectionSnapshot, view: DebugView) -> image::RgbImage {
    let mut frame = masks.cropped_frame.to_rgb_image();

    match view {
        DebugView::OrangeMask => {
            darken_outside_mask(&mut frame, &masks.orange);
            return frame;
        }
        DebugView::BlueMask => {
            darken_outside_mask(&mut frame, &masks.blue);
            return frame;
        }
        DebugView::YellowMask => {
            darken_outside_mask(&mut frame, &masks.yellow);
            return frame;
        }
        DebugView::GreenMask => {
            darken_outside_mask(&mut frame, &masks.green);
            return frame;
        }
        DebugView::RawFieldMask => {
            darken_outside_mask(&mut frame, &masks.raw_field_mask);
            return frame;
        }
        DebugView::FieldMask => {
            darken_outside_mask(&mut frame, &masks.field_mask);
            return frame;
        }
        DebugView::Default => {}
    }

    darken_outside_mask(&mut frame, &masks.field_mask);

    let (width, height) = frame.dimensions();
    draw_cross_mut(&mut frame, WHITE, width as i32 / 2, height as i32 / 2);
    let frame_shape = (width as f32, height as f32);

    draw_detection_cross(&mut frame, frame_shape, snapshot.ball.raw, GREEN);
    draw_detection_cross(&mut frame, frame_shape, snapshot.ball.filtered, PURPLE);

    draw_detection_cross(&mut frame, frame_shape, snapshot.blue_goal.raw, CYAN);
    draw_detection_cross(&mut frame, frame_shape, snapshot.blue_goal.filtered, PURPLE);
    if snapshot.blue_goal.filtered.is_some() {
        draw_rect_outline(&mut frame, snapshot.blue_goal.rect, CYAN);
    }

    draw_detection_cross(&mut frame, frame_shape, snapshot.yellow_goal.raw, BLUE);
    draw_detection_cross(&mut frame, frame_shape, snapshot.yellow_goal.filtered, PURPLE);
    if snapshot.yellow_goal.filtered.is_some() {
        draw_rect_outline(&mut frame, snapshot.yellow_goal.rect, BLUE);
    }

    frame
}

/// Darkens every pixel outside `mask` to a fifth of its brightness, the Rust analogue of
/// `util.draw_mask`'s `img[inv_mask] = img[inv_mask] * 0.2`.
fn darken_outside_mask(frame: &mut image::RgbImage, mask: &vision::Mask) {
    for (x, y, pixel) in frame.enumerate_pixels_mut() {
        if mask.get_pixel(x, y).0[0] == 0 {
            for channel in &mut pixel.0 {
                *channel = (f32::from(*channel) * 0.2) as u8;
            }
        }
    }
}

fn draw_detection_cross(frame: &mut image::RgbImage, frame_shape: (f32, f32), detection: Option<(f32, f32)>, color: image::Rgb<u8>) {
    let Some((bearing, distance)) = detection else { return };
    let (x, y) = coords::map_cm_to_pixels(frame_shape, bearing, distance);
    draw_cross_mut(frame, color, x.round() as i32, y.round() as i32);
}

fn draw_rect_outline(frame: &mut image::RgbImage, rect: Option<RotatedRect>, color: image::Rgb<u8>) {
    let Some(rect) = rect else { return };
    let corners = geometry::rotated_rect_points(&rect);
    for i in 0..corners.len() {
        let (x0, y0) = corners[i];
        let (x1, y1) = corners[(i + 1) % corners.len()];
        draw_line_segment_mut(frame, (x0 as f32, y0 as f32), (x1 as f32, y1 as f32), color);
    }
}

/// Builds the plain-text diagnostics report: per-worker FPS/loop-time table followed by
/// raw/filtered/mean-over-100 readings for the ball and both goals.
fn build_report(trackers: &Trackers, snapshot: &DetectionSnapshot, mean_ball_distance: Option<f32>) -> String {
    use std::fmt::Write as _;

    let mut text = String::from("PROFILING\n");
    let _ = writeln!(text, "FPS Ball  : {:5.1} FPS", trackers.last_fps(WorkerId::DetectBall));
    text.push_str("             Read  Mask  Ball  Goal  Send Render\n");
    let _ = writeln!(
        text,
        "FPS       : {:5.1} {:5.1} {:5.1} {:5.1} {:5.1} {:5.1} (FPS)",
        trackers.mean_fps(WorkerId::FetchFrame),
        trackers.mean_fps(WorkerId::PreprocessFrame),
        trackers.mean_fps(WorkerId::DetectBall),
        trackers.mean_fps(WorkerId::DetectGoals),
        trackers.mean_fps(WorkerId::SendPayload),
        trackers.mean_fps(WorkerId::AnnotateFrame),
    );
    let _ = writeln!(
        text,
        "Loop Time : {:5.1} {:5.1} {:5.1} {:5.1} {:5.1} {:5.1} (ms)\n",
        trackers.mean_loop_time(WorkerId::FetchFrame),
        trackers.mean_loop_time(WorkerId::PreprocessFrame),
        trackers.mean_loop_time(WorkerId::DetectBall),
        trackers.mean_loop_time(WorkerId::DetectGoals),
        trackers.mean_loop_time(WorkerId::SendPayload),
        trackers.mean_loop_time(WorkerId::AnnotateFrame),
    );

    text.push_str("BALL\n");
    write_entry(&mut text, &snapshot.ball);
    match mean_ball_distance {
        Some(distance) => {
            let _ = writeln!(text, "Mean     :          {distance:6.2} cm away\n");
        }
        None => text.push_str("Mean     :   None\n\n"),
    }

    text.push_str("BLUE GOAL\n");
    write_entry(&mut text, &snapshot.blue_goal);
    text.push_str("YELLOW GOAL\n");
    write_entry(&mut text, &snapshot.yellow_goal);

    text
}

fn write_entry(text: &mut String, entry: &DetectionEntry) {
    use std::fmt::Write as _;

    match entry.raw {
        Some((bearing, distance)) => {
            let _ = writeln!(text, "Raw      : {bearing:7.2}\u{00ba} {distance:6.2} cm away");
        }
        None => text.push_str("Raw      :   None\n"),
    }
    match entry.filtered {
        Some((bearing, distance)) => {
            let _ = writeln!(text, "Filtered : {bearing:7.2}\u{00ba} {distance:6.2} cm away");
        }
        None => text.push_str("Filtered :   None\n"),
    }
}
