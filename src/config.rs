//! Fixed stream, filter and window parameters.
//!
//! Nothing here is read from disk or the command line; every value is a
//! compile-time default that callers may override in code.

use crate::traits::{FilterKind, FilterOption, PixelFormat, StreamKind, StreamRequest};

/// Color stream: 848x480 RGB8 at 30 fps.
pub const COLOR_STREAM: StreamRequest = StreamRequest {
    stream: StreamKind::Color,
    index: None,
    width: 848,
    height: 480,
    format: PixelFormat::Rgb8,
    framerate: 30,
};

/// Depth stream: 848x480 Z16 at 30 fps.
pub const DEPTH_STREAM: StreamRequest = StreamRequest {
    stream: StreamKind::Depth,
    index: None,
    width: 848,
    height: 480,
    format: PixelFormat::Z16,
    framerate: 30,
};

/// Colorizer palettes, numbered as the SDK numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScheme {
    /// Jet.
    Jet = 0,
    /// Classic.
    Classic = 1,
    /// White near, black far.
    WhiteToBlack = 2,
    /// Black near, white far.
    BlackToWhite = 3,
    /// Bio.
    Bio = 4,
    /// Cold.
    Cold = 5,
    /// Warm.
    Warm = 6,
    /// Quantized.
    Quantized = 7,
    /// Pattern.
    Pattern = 8,
    /// Hue.
    Hue = 9,
}

impl ColorScheme {
    /// Palette index as an option value.
    #[must_use]
    pub fn as_option(self) -> f32 {
        f32::from(self as u8)
    }
}

/// Distance range in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceRange {
    /// Near edge.
    pub min: f32,
    /// Far edge.
    pub max: f32,
}

/// Threshold filter parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdOptions {
    /// Depth kept by the threshold.
    pub range: DistanceRange,
}

/// Spatial filter parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialOptions {
    /// Filter iterations.
    pub magnitude: f32,
    /// Smoothing weight.
    pub smooth_alpha: f32,
    /// Edge-preserving step threshold.
    pub smooth_delta: f32,
}

/// Temporal filter parameters. Hole filling and persistency keep SDK defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalOptions {
    /// Smoothing weight.
    pub smooth_alpha: f32,
}

/// Colorizer parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorizerOptions {
    /// Palette.
    pub scheme: ColorScheme,
    /// Histogram equalization on or off.
    pub histogram_equalization: bool,
    /// Distance range mapped onto the palette.
    pub range: DistanceRange,
}

/// One configured stage of the filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStage {
    /// Block to build.
    pub kind: FilterKind,
    /// Options to set on it, in order.
    pub options: Vec<(FilterOption, f32)>,
}

/// Parameters of the whole filter chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterChainConfig {
    /// Threshold stage.
    pub threshold: ThresholdOptions,
    /// Spatial stage.
    pub spatial: SpatialOptions,
    /// Temporal stage.
    pub temporal: TemporalOptions,
    /// Colorizer stage.
    pub colorizer: ColorizerOptions,
}

impl Default for FilterChainConfig {
    fn default() -> Self {
        let range = DistanceRange {
            min: 0.29,
            max: 10.0,
        };
        Self {
            threshold: ThresholdOptions { range },
            spatial: SpatialOptions {
                magnitude: 2.0,
                smooth_alpha: 0.5,
                smooth_delta: 20.0,
            },
            temporal: TemporalOptions { smooth_alpha: 0.4 },
            colorizer: ColorizerOptions {
                scheme: ColorScheme::Hue,
                histogram_equalization: false,
                range,
            },
        }
    }
}

impl FilterChainConfig {
    /// Stages in processing order: threshold, depth-to-disparity, spatial,
    /// temporal, colorizer.
    #[must_use]
    pub fn stages(&self) -> Vec<FilterStage> {
        vec![
            FilterStage {
                kind: FilterKind::Threshold,
                options: vec![
                    (FilterOption::MinDistance, self.threshold.range.min),
                    (FilterOption::MaxDistance, self.threshold.range.max),
                ],
            },
            FilterStage {
                kind: FilterKind::DisparityTransform { to_disparity: true },
                options: Vec::new(),
            },
            FilterStage {
                kind: FilterKind::Spatial,
                options: vec![
                    (FilterOption::FilterMagnitude, self.spatial.magnitude),
                    (FilterOption::FilterSmoothAlpha, self.spatial.smooth_alpha),
                    (FilterOption::FilterSmoothDelta, self.spatial.smooth_delta),
                ],
            },
            FilterStage {
                kind: FilterKind::Temporal,
                options: vec![(FilterOption::FilterSmoothAlpha, self.temporal.smooth_alpha)],
            },
            FilterStage {
                kind: FilterKind::Colorizer,
                options: vec![
                    (FilterOption::ColorScheme, self.colorizer.scheme.as_option()),
                    (
                        FilterOption::HistogramEqualization,
                        if self.colorizer.histogram_equalization {
                            1.0
                        } else {
                            0.0
                        },
                    ),
                    (FilterOption::MinDistance, self.colorizer.range.min),
                    (FilterOption::MaxDistance, self.colorizer.range.max),
                ],
            },
        ]
    }
}

/// Everything the pipeline driver needs at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Streams enabled on every session.
    pub streams: Vec<StreamRequest>,
    /// Stream every frame set is aligned to.
    pub align_to: StreamKind,
    /// Filter chain parameters.
    pub filters: FilterChainConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            streams: vec![COLOR_STREAM, DEPTH_STREAM],
            align_to: StreamKind::Color,
            filters: FilterChainConfig::default(),
        }
    }
}

/// Display window parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    /// Window title.
    pub title: String,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "RealSense Multi-Camera".to_owned(),
            width: 1280,
            height: 960,
        }
    }
}
