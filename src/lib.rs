//! Multicam-Align: multi-camera RealSense capture, alignment and depth filtering
//!
//! This library streams color and depth from every attached RealSense device,
//! aligns each frame set to the color viewpoint, runs every frame through a
//! fixed post-processing chain and keeps the latest result per stream for
//! display. The SDK sits behind traits so the pipeline can be tested with mock
//! devices; the librealsense2 backend is enabled by the `realsense` feature.

pub mod config;
pub mod display;
pub mod error;
pub mod pipeline;
pub mod traits;
pub mod validation;

#[cfg(test)]
pub mod mock;

#[cfg(feature = "realsense")]
pub mod realsense;

pub use config::{PipelineConfig, WindowConfig};
pub use display::TerminalWindow;
pub use error::{CameraError, Result};
pub use pipeline::{FramePipeline, RenderFrames};
pub use traits::{
    CameraSubsystem, DeviceInfo, DisplaySurface, FilterKind, FilterOption, Frame, FrameImage,
    FrameSet, PixelFormat, StreamId, StreamKind, StreamProfile, StreamRequest, StreamingSession,
};

#[cfg(feature = "realsense")]
pub use realsense::RealSense;
