//! librealsense2 backend on `realsense-rust`.
//!
//! Implements [`CameraSubsystem`] over the SDK crate's context, pipeline and
//! processing block types. Every handle is released by the SDK crate on drop.

pub mod frame;

use std::collections::HashSet;
use std::ffi::CString;
use std::fmt;
use std::task::Poll;
use std::time::Duration;

use realsense_rust::config::Config;
use realsense_rust::context::Context;
use realsense_rust::frame::DepthFrame;
use realsense_rust::kind::{Rs2CameraInfo, Rs2Format, Rs2StreamKind};
use realsense_rust::pipeline::{ActivePipeline, InactivePipeline};
use realsense_rust::processing_blocks::align::Align;
use realsense_rust::processing_blocks::colorizer::Colorizer;
use realsense_rust::processing_blocks::disparity_transform::DisparityTransform;
use realsense_rust::processing_blocks::errors::ProcessingBlockConstructionError;
use realsense_rust::processing_blocks::options::OptionsExt;
use realsense_rust::processing_blocks::spatial_filter::SpatialFilter;
use realsense_rust::processing_blocks::temporal_filter::TemporalFilter;
use realsense_rust::processing_blocks::threshold::ThresholdFilter;
use realsense_sys as sys;
use tracing::debug;

use crate::error::{CameraError, Result};
use crate::traits::{
    CameraSubsystem, DeviceInfo, FilterKind, FilterOption, FrameAligner, FrameFilter, Options,
    PixelFormat, StreamKind, StreamRequest, StreamingSession,
};

pub use frame::{RsFrame, RsFrameSet};

/// How long a processing block may take to deliver its output.
const PROCESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Output queue depth of every processing block.
const QUEUE_SIZE: i32 = 1;

/// Camera subsystem backed by the RealSense SDK.
pub struct RealSense {
    context: Context,
}

impl RealSense {
    /// Create the SDK context.
    ///
    /// # Errors
    ///
    /// Returns `Sdk` if the library refuses the API version or fails to
    /// initialize its backends.
    pub fn new() -> Result<Self> {
        let context = Context::new().map_err(|err| sdk_error("rs2_create_context", "", err))?;
        Ok(Self { context })
    }
}

impl CameraSubsystem for RealSense {
    type Frame = RsFrame;
    type FrameSet = RsFrameSet;
    type Session = Session;
    type Aligner = Aligner;
    type Filter = Filter;

    fn query_devices(&self) -> Result<Vec<DeviceInfo>> {
        let mut devices = Vec::new();

        // An empty product mask selects every product line.
        for (i, device) in self.context.query_devices(HashSet::new()).iter().enumerate() {
            let name = device
                .info(Rs2CameraInfo::Name)
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let serial = device
                .info(Rs2CameraInfo::SerialNumber)
                .map(|serial| serial.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    CameraError::DeviceInfoUnavailable(format!(
                        "device {i} ({name}) has no serial number"
                    ))
                })?;
            debug!(index = i, %name, %serial, "Found device");
            devices.push(DeviceInfo { name, serial });
        }

        Ok(devices)
    }

    fn start_session(&self, serial: &str, streams: &[StreamRequest]) -> Result<Session> {
        let args = format!("serial:{serial}");
        let c_serial = CString::new(serial)
            .map_err(|_| CameraError::DeviceInfoUnavailable(format!("bad serial {serial:?}")))?;

        let mut config = Config::new();
        config
            .enable_device_from_serial(&c_serial)
            .map_err(|err| sdk_error("rs2_config_enable_device", &args, err))?;
        for request in streams {
            config
                .enable_stream(
                    stream_to_rs2(request.stream)?,
                    request.index.map(|index| index as usize),
                    request.width as usize,
                    request.height as usize,
                    format_to_rs2(request.format)?,
                    request.framerate as usize,
                )
                .map_err(|err| {
                    sdk_error("rs2_config_enable_stream", &format!("{args}, {request:?}"), err)
                })?;
        }

        let pipeline = InactivePipeline::try_from(&self.context)
            .map_err(|err| sdk_error("rs2_create_pipeline", &args, err))?
            .start(Some(config))
            .map_err(|err| sdk_error("rs2_pipeline_start_with_config", &args, err))?;
        Ok(Session { pipeline })
    }

    fn create_aligner(&self, align_to: StreamKind) -> Result<Aligner> {
        let args = format!("align_to:{align_to}");
        let align = Align::new(stream_to_rs2(align_to)?, QUEUE_SIZE)
            .map_err(|err| sdk_error("rs2_create_align", &args, err))?;
        Ok(Aligner(align))
    }

    fn create_filter(&self, kind: FilterKind) -> Result<Filter> {
        let args = format!("block:{kind}");
        let fail = |err: ProcessingBlockConstructionError| {
            sdk_error("rs2_create_processing_block", &args, err)
        };
        let block = match kind {
            FilterKind::Threshold => {
                Block::Threshold(ThresholdFilter::new(QUEUE_SIZE).map_err(fail)?)
            }
            FilterKind::DisparityTransform { to_disparity } => Block::Disparity(
                DisparityTransform::new(to_disparity, QUEUE_SIZE).map_err(fail)?,
            ),
            FilterKind::Spatial => Block::Spatial(SpatialFilter::new(QUEUE_SIZE).map_err(fail)?),
            FilterKind::Temporal => {
                Block::Temporal(TemporalFilter::new(QUEUE_SIZE).map_err(fail)?)
            }
            FilterKind::Colorizer => Block::Colorizer(Colorizer::new(QUEUE_SIZE).map_err(fail)?),
        };
        Ok(Filter { kind, block })
    }
}

/// Started pipeline bound to one device.
pub struct Session {
    pipeline: ActivePipeline,
}

impl StreamingSession for Session {
    type FrameSet = RsFrameSet;

    fn poll_for_frames(&mut self) -> Result<Option<RsFrameSet>> {
        match self.pipeline.poll() {
            Ok(Poll::Ready(frames)) => Ok(Some(RsFrameSet(frames))),
            Ok(Poll::Pending) => Ok(None),
            Err(err) => Err(sdk_error("rs2_pipeline_poll_for_frames", "", err)),
        }
    }
}

/// Align processing block.
pub struct Aligner(Align);

impl FrameAligner<RsFrameSet> for Aligner {
    fn process(&mut self, frames: RsFrameSet) -> Result<RsFrameSet> {
        self.0
            .queue(frames.0)
            .map_err(|err| sdk_error("rs2_process_frame", "block:align", err))?;
        let aligned = self
            .0
            .wait(PROCESS_TIMEOUT)
            .map_err(|err| sdk_error("rs2_wait_for_frame", "block:align", err))?;
        Ok(RsFrameSet(aligned))
    }
}

enum Block {
    Threshold(ThresholdFilter),
    Disparity(DisparityTransform),
    Spatial(SpatialFilter),
    Temporal(TemporalFilter),
    Colorizer(Colorizer),
}

/// One filter stage.
pub struct Filter {
    kind: FilterKind,
    block: Block,
}

/// Queue a depth frame into a block and wait for its output.
macro_rules! run_block {
    ($block:expr, $frame:expr, $args:expr) => {{
        $block
            .queue($frame.into_typed::<DepthFrame>()?)
            .map_err(|err| sdk_error("rs2_process_frame", $args, err))?;
        let output = $block
            .wait(PROCESS_TIMEOUT)
            .map_err(|err| sdk_error("rs2_wait_for_frame", $args, err))?;
        RsFrame::from_typed(output)
    }};
}

impl Options for Filter {
    fn set_option(&mut self, option: FilterOption, value: f32) -> Result<()> {
        let args = format!("block:{}, option:{option:?}, value:{value}", self.kind);
        let raw = option_to_rs2(option);
        let result = match &mut self.block {
            Block::Threshold(block) => block.set_option(raw, value),
            Block::Spatial(block) => block.set_option(raw, value),
            Block::Temporal(block) => block.set_option(raw, value),
            Block::Colorizer(block) => block.set_option(raw, value),
            Block::Disparity(_) => {
                return Err(CameraError::sdk("rs2_set_option", args, "option not supported"))
            }
        };
        result.map_err(|err| sdk_error("rs2_set_option", &args, err))
    }
}

impl FrameFilter<RsFrame> for Filter {
    fn process(&mut self, frame: RsFrame) -> Result<RsFrame> {
        let args = format!("block:{}", self.kind);
        match &mut self.block {
            Block::Threshold(block) => run_block!(block, frame, &args),
            Block::Disparity(block) => run_block!(block, frame, &args),
            Block::Spatial(block) => run_block!(block, frame, &args),
            Block::Temporal(block) => run_block!(block, frame, &args),
            Block::Colorizer(block) => run_block!(block, frame, &args),
        }
    }
}

/// SDK error from a `realsense-rust` error, tagged with the C call it wraps.
fn sdk_error<E: fmt::Display>(function: &str, args: &str, err: E) -> CameraError {
    CameraError::sdk(function, args, err.to_string())
}

fn stream_to_rs2(stream: StreamKind) -> Result<Rs2StreamKind> {
    Ok(match stream {
        StreamKind::Any => Rs2StreamKind::Any,
        StreamKind::Depth => Rs2StreamKind::Depth,
        StreamKind::Color => Rs2StreamKind::Color,
        StreamKind::Infrared => Rs2StreamKind::Infrared,
        StreamKind::Other(raw) => {
            return Err(CameraError::Other(format!("cannot request raw stream {raw}")))
        }
    })
}

const fn stream_from_rs2(kind: Rs2StreamKind) -> StreamKind {
    match kind {
        Rs2StreamKind::Any => StreamKind::Any,
        Rs2StreamKind::Depth => StreamKind::Depth,
        Rs2StreamKind::Color => StreamKind::Color,
        Rs2StreamKind::Infrared => StreamKind::Infrared,
        other => StreamKind::Other(other as i32),
    }
}

fn format_to_rs2(format: PixelFormat) -> Result<Rs2Format> {
    Ok(match format {
        PixelFormat::Any => Rs2Format::Any,
        PixelFormat::Z16 => Rs2Format::Z16,
        PixelFormat::Disparity32 => Rs2Format::Disparity32,
        PixelFormat::Yuyv => Rs2Format::Yuyv,
        PixelFormat::Rgb8 => Rs2Format::Rgb8,
        PixelFormat::Bgr8 => Rs2Format::Bgr8,
        PixelFormat::Rgba8 => Rs2Format::Rgba8,
        PixelFormat::Bgra8 => Rs2Format::Bgra8,
        PixelFormat::Y8 => Rs2Format::Y8,
        PixelFormat::Other(raw) => {
            return Err(CameraError::UnsupportedFormat(format!(
                "cannot request raw format {raw}"
            )))
        }
    })
}

const fn format_from_rs2(format: Rs2Format) -> PixelFormat {
    match format {
        Rs2Format::Any => PixelFormat::Any,
        Rs2Format::Z16 => PixelFormat::Z16,
        Rs2Format::Disparity32 => PixelFormat::Disparity32,
        Rs2Format::Yuyv => PixelFormat::Yuyv,
        Rs2Format::Rgb8 => PixelFormat::Rgb8,
        Rs2Format::Bgr8 => PixelFormat::Bgr8,
        Rs2Format::Rgba8 => PixelFormat::Rgba8,
        Rs2Format::Bgra8 => PixelFormat::Bgra8,
        Rs2Format::Y8 => PixelFormat::Y8,
        other => PixelFormat::Other(other as i32),
    }
}

const fn option_to_rs2(option: FilterOption) -> sys::rs2_option {
    match option {
        FilterOption::MinDistance => sys::rs2_option_RS2_OPTION_MIN_DISTANCE,
        FilterOption::MaxDistance => sys::rs2_option_RS2_OPTION_MAX_DISTANCE,
        FilterOption::ColorScheme => sys::rs2_option_RS2_OPTION_COLOR_SCHEME,
        FilterOption::HistogramEqualization => {
            sys::rs2_option_RS2_OPTION_HISTOGRAM_EQUALIZATION_ENABLED
        }
        FilterOption::FilterMagnitude => sys::rs2_option_RS2_OPTION_FILTER_MAGNITUDE,
        FilterOption::FilterSmoothAlpha => sys::rs2_option_RS2_OPTION_FILTER_SMOOTH_ALPHA,
        FilterOption::FilterSmoothDelta => sys::rs2_option_RS2_OPTION_FILTER_SMOOTH_DELTA,
    }
}
