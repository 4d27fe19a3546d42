//! Video-to-vector-field analysis.
//!
//! The [`VideoAnalyzer`] turns frames from a [`VideoSource`] into a
//! [`LowResField`] at a fixed analysis resolution:
//!
//! 1. downsample the frame into the write side of its frame pair,
//! 2. run the stage kernel against the read side (last tick's frame),
//! 3. read the result back only when a consumer needs it this tick,
//! 4. swap, so this frame becomes next tick's previous frame.
//!
//! The frame pair has its own [`PingPong`], independent of the trail
//! compositor's.
//!
//! - [`frame`] -- RGB8 frames and downsampling.
//! - [`source`] -- Source capability and background acquisition.
//! - [`kernel`] -- Motion and Sobel kernels, the stage seam, the CPU stage.

pub mod frame;
pub mod kernel;
pub mod source;

pub use frame::VideoFrame;
pub use kernel::{AnalysisMode, AnalysisStage, CpuStage, KernelParams};
pub use source::{AcquiringSource, SourceStatus, VideoSource};

use crate::error::FlowError;
use crate::ping_pong::PingPong;
use crate::raster::{LowResField, RgbRaster};

/// Converts successive frames into a low-resolution vector field.
pub struct VideoAnalyzer {
    frames: [RgbRaster; 2],
    roles: PingPong,
    primed: bool,
    field: LowResField,
    fresh: bool,
    stage: Box<dyn AnalysisStage>,
}

impl VideoAnalyzer {
    /// Creates an analyzer backed by the CPU reference stage.
    pub fn new(width: usize, height: usize) -> Result<Self, FlowError> {
        Self::with_stage(width, height, Box::new(CpuStage::new(width, height)?))
    }

    /// Creates an analyzer backed by `stage`, which must accept rasters of
    /// `width × height`.
    pub fn with_stage(
        width: usize,
        height: usize,
        stage: Box<dyn AnalysisStage>,
    ) -> Result<Self, FlowError> {
        log::info!("video analysis at {width}x{height}");
        Ok(Self {
            frames: [RgbRaster::new(width, height)?, RgbRaster::new(width, height)?],
            roles: PingPong::new(),
            primed: false,
            field: LowResField::new(width, height)?,
            fresh: false,
            stage,
        })
    }

    /// Analysis resolution as `(width, height)`.
    pub fn resolution(&self) -> (usize, usize) {
        (self.field.width(), self.field.height())
    }

    /// Analyzes one frame.
    ///
    /// With `read_back == false` the kernel still runs, keeping the previous
    /// frame chain intact, but no field is published this tick.
    pub fn analyze(
        &mut self,
        frame: &VideoFrame,
        params: &KernelParams,
        read_back: bool,
    ) -> Result<(), FlowError> {
        let (r, w) = (self.roles.read_index(), self.roles.write_index());
        frame.downsample_into(&mut self.frames[w]);
        if !self.primed {
            // No history yet: compare the first frame with itself.
            self.frames[r] = self.frames[w].clone();
            self.primed = true;
        }

        let (previous, current) = self.roles.split(&mut self.frames);
        self.stage.execute(current, previous, params)?;

        self.fresh = false;
        if read_back {
            self.stage.read_back(&mut self.field)?;
            self.fresh = true;
        }
        self.roles.swap();
        Ok(())
    }

    /// The field published by the last [`analyze`](Self::analyze), if it was
    /// read back.
    pub fn field(&self) -> Option<&LowResField> {
        self.fresh.then_some(&self.field)
    }

    /// Withdraws the published field, e.g. when the source stops delivering.
    pub fn clear(&mut self) {
        self.fresh = false;
    }

    /// The frame analyzed last, i.e. next tick's comparison frame.
    pub fn previous_frame(&self) -> &RgbRaster {
        &self.frames[self.roles.read_index()]
    }
}
