//! Naming for the six pipeline workers, used as `LoopTracker` keys and tracing span
//! names. Mirrors the original's `loop_trackers` dict keys 1:1.

/// Identifies one of the six long-lived workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerId {
    FetchFrame,
    PreprocessFrame,
    DetectBall,
    DetectGoals,
    SendPayload,
    AnnotateFrame,
}

impl WorkerId {
    #[must_use]
    pub const fn span_name(self) -> &'static str {
        match self {
            Self::FetchFrame => "fetch_frame",
            Self::PreprocessFrame => "preprocess_frame",
            Self::DetectBall => "detect_ball",
            Self::DetectGoals => "detect_goals",
            Self::SendPayload => "send_payload",
            Self::AnnotateFrame => "annotate_frame",
        }
    }
}
