//! The annotated-frame record and the trait boundary the out-of-scope debug UI attaches
//! to. This crate ships only trivial [`DebugSink`] implementations; a real HTTP/
//! websocket server is explicitly out of scope (spec.md §1).
//!
//! Grounded on `Camera.fetch_new_frame`/`AnnotateFrameThread.run` in
//! `examples/original_source/.../camera.py`, which hand the websocket server a
//! `(text, mainfeed, subfeeds)` triple through exactly this kind of single-slot
//! broadcast.

use crate::params::DebugView;
use crate::slot::Slot;

/// One annotated-frame publication: the status report, the main annotated view, and the
/// selected debug subfeeds.
#[derive(Clone)]
pub struct DebugFrame {
    pub text: String,
    pub mainfeed: image::RgbImage,
    pub subfeeds: Vec<(DebugView, image::RgbImage)>,
}

/// Where the Annotator publishes finished frames. The out-of-scope UI collaborator
/// implements this to serve them; this crate never does.
pub trait DebugSink: Send + Sync {
    fn publish(&self, frame: DebugFrame);
}

/// Drops every frame — the default when no debug client is attached.
#[derive(Debug, Default)]
pub struct NullDebugSink;

impl DebugSink for NullDebugSink {
    fn publish(&self, _frame: DebugFrame) {}
}

/// A latest-wins broadcast of annotated frames, for a debug client to subscribe to via
/// [`Slot::wait_for_update`]/[`Slot::current`].
#[derive(Default)]
pub struct ChannelDebugSink {
    slot: Slot<DebugFrame>,
}

impl ChannelDebugSink {
    #[must_use]
    pub fn new() -> Self {
        Self { slot: Slot::new() }
    }

    #[must_use]
    pub fn slot(&self) -> &Slot<DebugFrame> {
        &self.slot
    }
}

impl DebugSink for ChannelDebugSink {
    fn publish(&self, frame: DebugFrame) {
        self.slot.publish(frame);
    }
}
