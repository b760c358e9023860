//! Core traits and types for the depth camera abstraction.

use std::fmt;

use crate::error::Result;
use crate::pipeline::RenderFrames;

/// Kind of data stream a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Any stream; used when a request does not care.
    Any,
    /// 16-bit depth stream.
    Depth,
    /// Color camera stream.
    Color,
    /// Infrared imager stream.
    Infrared,
    /// Any other stream kind, carrying the SDK's raw value.
    Other(i32),
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "Any"),
            Self::Depth => write!(f, "Depth"),
            Self::Color => write!(f, "Color"),
            Self::Infrared => write!(f, "Infrared"),
            Self::Other(raw) => write!(f, "Stream({raw})"),
        }
    }
}

/// Pixel layout of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Let the SDK pick.
    Any,
    /// 16-bit linear depth values.
    Z16,
    /// 32-bit float disparity values.
    Disparity32,
    /// YUYV 4:2:2 packed.
    Yuyv,
    /// 24-bit RGB.
    Rgb8,
    /// 24-bit BGR.
    Bgr8,
    /// 32-bit RGBA.
    Rgba8,
    /// 32-bit BGRA.
    Bgra8,
    /// 8-bit luminance.
    Y8,
    /// Any other layout, carrying the SDK's raw value.
    Other(i32),
}

impl PixelFormat {
    /// Bytes per pixel for layouts the display understands.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> Option<u32> {
        match self {
            Self::Y8 => Some(1),
            Self::Z16 | Self::Yuyv => Some(2),
            Self::Rgb8 | Self::Bgr8 => Some(3),
            Self::Rgba8 | Self::Bgra8 | Self::Disparity32 => Some(4),
            Self::Any | Self::Other(_) => None,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "ANY"),
            Self::Z16 => write!(f, "Z16"),
            Self::Disparity32 => write!(f, "DISPARITY32"),
            Self::Yuyv => write!(f, "YUYV"),
            Self::Rgb8 => write!(f, "RGB8"),
            Self::Bgr8 => write!(f, "BGR8"),
            Self::Rgba8 => write!(f, "RGBA8"),
            Self::Bgra8 => write!(f, "BGRA8"),
            Self::Y8 => write!(f, "Y8"),
            Self::Other(raw) => write!(f, "FORMAT({raw})"),
        }
    }
}

/// Stable identity of a data stream, unique across all devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId(pub i32);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Description of the stream a frame was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamProfile {
    /// Stream kind.
    pub stream: StreamKind,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Index among streams of the same kind.
    pub index: i32,
    /// Unique stream identity.
    pub unique_id: StreamId,
    /// Nominal frame rate.
    pub framerate: i32,
}

/// A request to enable one stream on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    /// Stream kind.
    pub stream: StreamKind,
    /// Stream index, `None` for any index of this kind.
    pub index: Option<u32>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Frames per second.
    pub framerate: u32,
}

/// Attached device as reported by enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Product name.
    pub name: String,
    /// Serial number; pins a session to exactly one physical unit.
    pub serial: String,
}

/// Processing blocks the camera subsystem can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// Discards depth outside a distance range.
    Threshold,
    /// Converts between depth and disparity.
    DisparityTransform {
        /// `true` for depth to disparity, `false` for the reverse.
        to_disparity: bool,
    },
    /// Edge-preserving spatial smoothing.
    Spatial,
    /// Frame-to-frame smoothing; keeps history between calls.
    Temporal,
    /// Maps depth to an RGB palette.
    Colorizer,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Threshold => write!(f, "threshold"),
            Self::DisparityTransform { to_disparity: true } => write!(f, "depth-to-disparity"),
            Self::DisparityTransform { to_disparity: false } => write!(f, "disparity-to-depth"),
            Self::Spatial => write!(f, "spatial"),
            Self::Temporal => write!(f, "temporal"),
            Self::Colorizer => write!(f, "colorizer"),
        }
    }
}

/// Named numeric options understood by processing blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOption {
    /// Near edge of a distance range, in meters.
    MinDistance,
    /// Far edge of a distance range, in meters.
    MaxDistance,
    /// Colorizer palette index.
    ColorScheme,
    /// Colorizer histogram equalization, 0 or 1.
    HistogramEqualization,
    /// Number of spatial filter iterations.
    FilterMagnitude,
    /// Smoothing weight.
    FilterSmoothAlpha,
    /// Step-size boundary that preserves edges.
    FilterSmoothDelta,
}

/// Borrowed view of a frame's pixel buffer.
#[derive(Debug, Clone, Copy)]
pub struct FrameImage<'a> {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Bytes per line.
    pub stride: u32,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Raw pixel bytes.
    pub data: &'a [u8],
}

impl FrameImage<'_> {
    /// Get RGB values for a pixel at the specified coordinates.
    ///
    /// Returns `None` if the coordinates are outside the buffer or the
    /// layout cannot be shown. Depth is shown as grayscale over the full
    /// 16-bit range; YUYV pairs share their U/V values.
    #[must_use]
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel()?;
        let row = (y as usize).checked_mul(self.stride as usize)?;

        match self.format {
            PixelFormat::Rgb8 | PixelFormat::Rgba8 => {
                let at = row + (x * bpp) as usize;
                let px = self.data.get(at..at + 3)?;
                Some((*px.first()?, *px.get(1)?, *px.get(2)?))
            }
            PixelFormat::Bgr8 | PixelFormat::Bgra8 => {
                let at = row + (x * bpp) as usize;
                let px = self.data.get(at..at + 3)?;
                Some((*px.get(2)?, *px.get(1)?, *px.first()?))
            }
            PixelFormat::Y8 => {
                let v = *self.data.get(row + x as usize)?;
                Some((v, v, v))
            }
            PixelFormat::Z16 => {
                // Little-endian; the high byte is enough for a preview.
                let hi = *self.data.get(row + (x * 2) as usize + 1)?;
                Some((hi, hi, hi))
            }
            PixelFormat::Yuyv => {
                // [Y0 U Y1 V] repeats; each pair of pixels shares U and V.
                let at = row + ((x & !1) * 2) as usize;
                let y_val = if x % 2 == 0 {
                    *self.data.get(at)?
                } else {
                    *self.data.get(at + 2)?
                };
                let u = *self.data.get(at + 1)?;
                let v = *self.data.get(at + 3)?;
                Some(yuv_to_rgb(y_val, u, v))
            }
            PixelFormat::Disparity32 | PixelFormat::Any | PixelFormat::Other(_) => None,
        }
    }
}

/// Convert YUV values to RGB.
///
/// Uses the ITU-R BT.601 conversion formula.
#[must_use]
#[allow(clippy::many_single_char_names)]
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y_f = f32::from(y);
    let u_f = f32::from(u) - 128.0;
    let v_f = f32::from(v) - 128.0;

    let r = 1.402f32.mul_add(v_f, y_f);
    let g = 0.714_14f32.mul_add(-v_f, 0.344_14f32.mul_add(-u_f, y_f));
    let b = 1.772f32.mul_add(u_f, y_f);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamp = |val: f32| -> u8 { val.clamp(0.0, 255.0) as u8 };

    (clamp(r), clamp(g), clamp(b))
}

/// A single image produced by one stream.
pub trait Frame {
    /// Profile of the stream that produced this frame.
    fn profile(&self) -> Result<StreamProfile>;

    /// Pixel buffer of this frame.
    fn image(&self) -> Result<FrameImage<'_>>;
}

/// A synchronized bundle of frames, one per enabled stream.
pub trait FrameSet {
    /// Frame type contained in the set.
    type Frame: Frame;

    /// Split the set into its individual frames.
    fn frames(&self) -> Result<Vec<Self::Frame>>;
}

/// One streaming session bound to a single device.
pub trait StreamingSession {
    /// Frame set type produced by this session.
    type FrameSet: FrameSet;

    /// Return the latest synchronized frame set, or `None` without waiting
    /// if nothing new has arrived since the last call.
    fn poll_for_frames(&mut self) -> Result<Option<Self::FrameSet>>;
}

/// Processing block settings.
pub trait Options {
    /// Set a named numeric option.
    fn set_option(&mut self, option: FilterOption, value: f32) -> Result<()>;
}

/// Reprojects a frame set into one stream's viewpoint.
pub trait FrameAligner<S: FrameSet> {
    /// Align a frame set; the input is consumed.
    fn process(&mut self, frames: S) -> Result<S>;
}

/// A single stage of the filter chain.
pub trait FrameFilter<F: Frame>: Options {
    /// Produce a new frame from `frame`; the input is consumed.
    fn process(&mut self, frame: F) -> Result<F>;
}

/// Abstraction over the camera SDK: enumeration, sessions and processing blocks.
pub trait CameraSubsystem {
    /// Individual frame type.
    type Frame: Frame;
    /// Frame set type.
    type FrameSet: FrameSet<Frame = Self::Frame>;
    /// Session type.
    type Session: StreamingSession<FrameSet = Self::FrameSet>;
    /// Aligner type.
    type Aligner: FrameAligner<Self::FrameSet>;
    /// Filter type.
    type Filter: FrameFilter<Self::Frame>;

    /// List currently attached devices.
    fn query_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Start streaming the requested streams from the device with `serial`.
    fn start_session(&self, serial: &str, streams: &[StreamRequest]) -> Result<Self::Session>;

    /// Build an aligner targeting `align_to`.
    fn create_aligner(&self, align_to: StreamKind) -> Result<Self::Aligner>;

    /// Build a processing block with default options.
    fn create_filter(&self, kind: FilterKind) -> Result<Self::Filter>;
}

/// Interactive surface that renders the latest frame of every stream.
pub trait DisplaySurface<F: Frame> {
    /// Whether the surface is still open; drives the main loop.
    fn is_open(&self) -> bool;

    /// Render all frames as a mosaic and process pending input.
    fn show(&mut self, frames: &RenderFrames<F>) -> Result<()>;
}
