//! Video source capability and asynchronous acquisition.
//!
//! Acquisition (opening a camera, waiting on a permission prompt) is the one
//! asynchronous boundary of a session. [`AcquiringSource`] runs it on a
//! helper thread and exposes the outcome through [`SourceStatus`], polled
//! without blocking at the top of each tick.

use super::frame::VideoFrame;
use crate::error::FlowError;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

/// Availability of a video source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// Acquisition still in progress.
    Pending,
    /// Frames can be pulled.
    Ready,
    /// Permission denied, device missing, or released. Not retried.
    Unavailable(String),
}

/// A provider of successive RGB frames.
pub trait VideoSource: Send {
    /// Current availability. May advance internal state but never blocks.
    fn status(&mut self) -> SourceStatus;

    /// The next frame, or `None` when no frame is available this tick.
    fn frame(&mut self) -> Option<&VideoFrame>;

    /// Stops the stream and frees the device. Idempotent.
    fn release(&mut self);
}

enum Acquire<S> {
    Waiting(Receiver<Result<S, FlowError>>),
    Ready(S),
    Failed(String),
    Released,
}

/// Wraps a source whose construction happens on a background thread.
pub struct AcquiringSource<S: VideoSource + 'static> {
    state: Acquire<S>,
}

impl<S: VideoSource + 'static> AcquiringSource<S> {
    /// Starts acquisition. `open` runs once on a new thread.
    pub fn spawn<F>(open: F) -> Self
    where
        F: FnOnce() -> Result<S, FlowError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            if let Err(mpsc::SendError(Ok(mut orphan))) = tx.send(open()) {
                // Session ended while we were opening the device.
                orphan.release();
            }
        });
        Self {
            state: Acquire::Waiting(rx),
        }
    }

    fn poll(&mut self) {
        let Acquire::Waiting(rx) = &self.state else {
            return;
        };
        self.state = match rx.try_recv() {
            Ok(Ok(source)) => Acquire::Ready(source),
            Ok(Err(e)) => Acquire::Failed(e.to_string()),
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                Acquire::Failed("acquisition thread exited without a result".into())
            }
        };
    }
}

impl<S: VideoSource + 'static> VideoSource for AcquiringSource<S> {
    fn status(&mut self) -> SourceStatus {
        self.poll();
        match &mut self.state {
            Acquire::Waiting(_) => SourceStatus::Pending,
            Acquire::Ready(source) => source.status(),
            Acquire::Failed(reason) => SourceStatus::Unavailable(reason.clone()),
            Acquire::Released => SourceStatus::Unavailable("released".into()),
        }
    }

    fn frame(&mut self) -> Option<&VideoFrame> {
        match &mut self.state {
            Acquire::Ready(source) => source.frame(),
            _ => None,
        }
    }

    fn release(&mut self) {
        if let Acquire::Ready(source) = &mut self.state {
            source.release();
        }
        self.state = Acquire::Released;
    }
}
