//! The live-tunable configuration block: a `serde`-deserializable DTO loaded at boot
//! through `odal::Config`, converted into a lock-free runtime view whose HSV/contour/
//! radius fields the (out-of-scope) UI collaborator can mutate one field at a time
//! without taking a lock (SPEC_FULL.md §6).
//!
//! Grounded on `MemoryManager.params` in
//! `examples/original_source/.../camera.py` for the field set and defaults, and on
//! `odal::Config` (`IntelligentRoboticsLab-yggdrasil`) for the TOML-loading trait.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// An inclusive HSV bound, `(hue 0..=179, saturation 0..=255, value 0..=255)`.
pub type HsvBound = (u8, u8, u8);

/// Which overlay the Annotator renders into a debug subfeed slot (SPEC_FULL.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugView {
    Default,
    OrangeMask,
    BlueMask,
    YellowMask,
    GreenMask,
    RawFieldMask,
    FieldMask,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrameToml {
    pub center_offset: (i32, i32),
    pub crop_radius: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColorToml {
    pub lower: HsvBound,
    pub upper: HsvBound,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MaskToml {
    pub robot_radius: u32,
    pub mask_field: bool,
    pub orange: ColorToml,
    pub blue: ColorToml,
    pub yellow: ColorToml,
    pub green: ColorToml,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContourSizeToml {
    /// Upper bound of `contour_size.ball`; the lower bound is fixed at 0.
    pub ball_max: f64,
    /// Lower bound of `contour_size.goal`; the upper bound is fixed at infinity.
    pub goal_min: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterEnduranceToml {
    pub ball: u32,
    pub goal: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraToml {
    pub device_path: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub buffer_count: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialToml {
    pub device: String,
    pub baud_rate: u32,
}

/// The on-disk configuration, deserialized via `odal::Config::load_without_overlay`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParameterBlockToml {
    pub frame: FrameToml,
    pub mask: MaskToml,
    pub contour_size: ContourSizeToml,
    pub filter_endurance: FilterEnduranceToml,
    pub render: bool,
    pub debug_views: Vec<DebugView>,
    pub ball_filter_cm_sanity_box: bool,
    pub goal_polygon_epsilon: f64,
    pub camera: CameraToml,
    pub serial: SerialToml,
}

impl odal::Config for ParameterBlockToml {
    const PATH: &'static str = "vision.toml";
}

impl Default for ParameterBlockToml {
    /// The defaults recorded in `MemoryManager.params`, generalized from the NAO's
    /// hardcoded webcam index to a configurable `/dev/video*` path.
    fn default() -> Self {
        Self {
            frame: FrameToml { center_offset: (-2, 23), crop_radius: 194 },
            mask: MaskToml {
                robot_radius: 25,
                mask_field: false,
                orange: ColorToml { lower: (0, 170, 160), upper: (13, 255, 255) },
                blue: ColorToml { lower: (98, 160, 60), upper: (120, 255, 255) },
                yellow: ColorToml { lower: (15, 110, 110), upper: (40, 255, 255) },
                green: ColorToml { lower: (45, 60, 80), upper: (100, 255, 255) },
            },
            contour_size: ContourSizeToml { ball_max: 230.0, goal_min: 100.0 },
            filter_endurance: FilterEnduranceToml { ball: 50, goal: 200 },
            render: false,
            debug_views: vec![DebugView::OrangeMask, DebugView::BlueMask],
            ball_filter_cm_sanity_box: true,
            goal_polygon_epsilon: 0.03,
            camera: CameraToml {
                device_path: "/dev/video0".to_string(),
                width: 640,
                height: 480,
                fps: 30,
                buffer_count: 2,
            },
            serial: SerialToml { device: wire::DEFAULT_DEVICE.to_string(), baud_rate: wire::DEFAULT_BAUD_RATE },
        }
    }
}

/// A bit-cast atomic `f32`, for tunable floating-point fields that need lock-free
/// single-field mutation.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    #[must_use]
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[must_use]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Lock-free `(x, y)` pixel offset.
#[derive(Debug)]
pub struct AtomicOffset {
    pub x: AtomicI32,
    pub y: AtomicI32,
}

impl AtomicOffset {
    #[must_use]
    fn new((x, y): (i32, i32)) -> Self {
        Self { x: AtomicI32::new(x), y: AtomicI32::new(y) }
    }

    #[must_use]
    pub fn load(&self) -> (i32, i32) {
        (self.x.load(Ordering::Relaxed), self.y.load(Ordering::Relaxed))
    }
}

/// Lock-free HSV bound, one atomic per channel so the UI collaborator can overwrite a
/// single channel without a lock; a reader mid-update may observe a torn triple, which
/// spec.md §5 explicitly permits.
#[derive(Debug)]
pub struct AtomicHsvBound {
    pub lower: [AtomicU8; 3],
    pub upper: [AtomicU8; 3],
}

impl AtomicHsvBound {
    fn new(color: &ColorToml) -> Self {
        let (lh, ls, lv) = color.lower;
        let (uh, us, uv) = color.upper;
        Self { lower: [AtomicU8::new(lh), AtomicU8::new(ls), AtomicU8::new(lv)], upper: [AtomicU8::new(uh), AtomicU8::new(us), AtomicU8::new(uv)] }
    }

    #[must_use]
    pub fn load(&self) -> (HsvBound, HsvBound) {
        let load3 = |a: &[AtomicU8; 3]| (a[0].load(Ordering::Relaxed), a[1].load(Ordering::Relaxed), a[2].load(Ordering::Relaxed));
        (load3(&self.lower), load3(&self.upper))
    }
}

/// Lock-free runtime view of [`FrameToml`].
pub struct FrameParams {
    pub center_offset: AtomicOffset,
    pub crop_radius: AtomicU32,
}

/// Lock-free runtime view of [`MaskToml`].
pub struct MaskParams {
    pub robot_radius: AtomicU32,
    pub mask_field: AtomicBool,
    pub orange: AtomicHsvBound,
    pub blue: AtomicHsvBound,
    pub yellow: AtomicHsvBound,
    pub green: AtomicHsvBound,
}

/// Lock-free runtime view of [`ContourSizeToml`].
pub struct ContourSizeParams {
    pub ball_max: AtomicF32,
    pub goal_min: AtomicF32,
}

/// The live configuration read by every worker. HSV/contour/radius/render fields are
/// lock-free per SPEC_FULL.md §6; fields that spec.md §6 never lists as live-tunable
/// (endurance, the goal epsilon coefficient, the camera/serial device settings) are
/// fixed at boot and read without synchronization since nothing ever writes them again.
pub struct ParameterBlock {
    pub frame: FrameParams,
    pub mask: MaskParams,
    pub contour_size: ContourSizeParams,
    pub render: AtomicBool,
    pub debug_views: Mutex<Vec<DebugView>>,
    pub filter_endurance: FilterEnduranceToml,
    pub ball_filter_cm_sanity_box: bool,
    pub goal_polygon_epsilon: f64,
    pub camera: CameraToml,
    pub serial: SerialToml,
}

impl ParameterBlock {
    #[must_use]
    pub fn from_toml(toml: ParameterBlockToml) -> Self {
        Self {
            frame: FrameParams {
                center_offset: AtomicOffset::new(toml.frame.center_offset),
                crop_radius: AtomicU32::new(toml.frame.crop_radius),
            },
            mask: MaskParams {
                robot_radius: AtomicU32::new(toml.mask.robot_radius),
                mask_field: AtomicBool::new(toml.mask.mask_field),
                orange: AtomicHsvBound::new(&toml.mask.orange),
                blue: AtomicHsvBound::new(&toml.mask.blue),
                yellow: AtomicHsvBound::new(&toml.mask.yellow),
                green: AtomicHsvBound::new(&toml.mask.green),
            },
            contour_size: ContourSizeParams {
                ball_max: AtomicF32::new(toml.contour_size.ball_max as f32),
                goal_min: AtomicF32::new(toml.contour_size.goal_min as f32),
            },
            render: AtomicBool::new(toml.render),
            debug_views: Mutex::new(toml.debug_views),
            filter_endurance: toml.filter_endurance,
            ball_filter_cm_sanity_box: toml.ball_filter_cm_sanity_box,
            goal_polygon_epsilon: toml.goal_polygon_epsilon,
            camera: toml.camera,
            serial: toml.serial,
        }
    }

    /// Snapshots the current preprocessing parameters for one tick.
    #[must_use]
    pub fn preprocess_params(&self) -> vision::PreprocessParams {
        vision::PreprocessParams {
            center_offset: self.frame.center_offset.load(),
            crop_radius: self.frame.crop_radius.load(Ordering::Relaxed),
            robot_radius: self.mask.robot_radius.load(Ordering::Relaxed),
            mask_field: self.mask.mask_field.load(Ordering::Relaxed),
            orange: self.mask.orange.load(),
            blue: self.mask.blue.load(),
            yellow: self.mask.yellow.load(),
            green: self.mask.green.load(),
        }
    }

    #[must_use]
    pub fn ball_params(&self) -> vision::BallParams {
        vision::BallParams {
            min_area: 0.0,
            max_area: f64::from(self.contour_size.ball_max.load()),
            endurance: self.filter_endurance.ball,
            cm_valued_sanity_box: self.ball_filter_cm_sanity_box,
        }
    }

    #[must_use]
    pub fn goal_params(&self) -> vision::GoalParams {
        vision::GoalParams {
            min_area: f64::from(self.contour_size.goal_min.load()),
            endurance: self.filter_endurance.goal,
            polygon_epsilon_coefficient: self.goal_polygon_epsilon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toml_round_trips_through_serialization() {
        let toml = ParameterBlockToml::default();
        let text = toml::to_string_pretty(&toml).unwrap();
        let parsed: ParameterBlockToml = toml::from_str(&text).unwrap();
        assert_eq!(parsed.frame.crop_radius, toml.frame.crop_radius);
    }

    #[test]
    fn runtime_view_starts_from_the_toml_values() {
        let params = ParameterBlock::from_toml(ParameterBlockToml::default());
        assert_eq!(params.frame.center_offset.load(), (-2, 23));
        assert!((params.contour_size.ball_max.load() - 230.0).abs() < f32::EPSILON);
    }

    #[test]
    fn a_single_hsv_channel_can_be_mutated_without_touching_the_rest() {
        let params = ParameterBlock::from_toml(ParameterBlockToml::default());
        params.mask.orange.lower[0].store(5, Ordering::Relaxed);
        let (lower, upper) = params.mask.orange.load();
        assert_eq!(lower.0, 5);
        assert_eq!(upper, (13, 255, 255));
    }
}
