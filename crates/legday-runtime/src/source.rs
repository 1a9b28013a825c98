//! Frame sources - where the pipeline gets its frames from

use std::sync::Arc;

use legday_core::Frame;
use parking_lot::Mutex;

/// Supplies the current camera frame, if one is ready
///
/// Called once per tick. Must not block for long; `None` just means "no
/// frame this tick" and is never treated as an error.
pub trait FrameSource: Send {
    fn try_get_current_frame(&mut self) -> Option<Frame>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn try_get_current_frame(&mut self) -> Option<Frame> {
        (**self).try_get_current_frame()
    }
}

/// Frame source backed by a closure
pub struct FnSource<F>(pub F);

impl<F> FrameSource for FnSource<F>
where
    F: FnMut() -> Option<Frame> + Send,
{
    fn try_get_current_frame(&mut self) -> Option<Frame> {
        (self.0)()
    }
}

/// Single-slot mailbox between a capture thread and the pipeline
///
/// The capture side publishes, overwriting any frame not yet consumed; the
/// pipeline takes the frame out, so it is released as soon as the tick ends.
#[derive(Clone, Default)]
pub struct LatestFrame {
    slot: Arc<Mutex<Option<Frame>>>,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending frame
    pub fn publish(&self, frame: Frame) {
        *self.slot.lock() = Some(frame);
    }

    /// Whether a frame is waiting
    pub fn is_ready(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Drop any pending frame
    pub fn clear(&self) {
        self.slot.lock().take();
    }
}

impl FrameSource for LatestFrame {
    fn try_get_current_frame(&mut self) -> Option<Frame> {
        self.slot.lock().take()
    }
}
