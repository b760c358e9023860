//! Runtime-typed frames over `realsense-rust`.
//!
//! The SDK crate types image frames by stream kind at compile time. Frames
//! split out of a composite here may come from any stream, so [`RsFrame`]
//! wraps an image frame of [`AnyStream`] and is re-typed on the way into and
//! out of a processing block.

#![allow(unsafe_code)]

use std::os::raw::c_void;
use std::ptr::NonNull;

use realsense_rust::frame::{CompositeFrame, FrameCategory, FrameEx, ImageFrame};
use realsense_rust::kind::{Rs2Extension, Rs2StreamKind};
use realsense_sys as sys;

use crate::error::{CameraError, Result};
use crate::traits::{Frame, FrameImage, FrameSet, StreamId, StreamProfile};

use super::{format_from_rs2, sdk_error, stream_from_rs2};

/// Stream marker for image frames whose kind is only known at runtime.
#[derive(Debug)]
pub struct AnyStream;

/// Video frame of any stream.
#[derive(Debug)]
pub struct RsFrame(ImageFrame<AnyStream>);

impl RsFrame {
    /// Hand the frame reference to a typed wrapper, e.g. a `DepthFrame` for a
    /// processing block queue.
    pub(super) fn into_typed<T>(self) -> Result<T>
    where
        T: TryFrom<NonNull<sys::rs2_frame>>,
        T::Error: std::fmt::Display,
    {
        // SAFETY: `self` is consumed, so the reference is owned exactly once.
        let raw = unsafe { self.0.get_owned_raw() };
        adopt(raw)
    }

    /// Take over the frame reference held by a typed wrapper.
    pub(super) fn from_typed<F: FrameEx>(frame: F) -> Result<Self> {
        // SAFETY: `frame` is consumed, so the reference is owned exactly once.
        let raw = unsafe { frame.get_owned_raw() };
        adopt(raw)
    }
}

/// Wrap an owned frame reference, releasing it if the wrapper cannot be built.
fn adopt<T>(raw: NonNull<sys::rs2_frame>) -> Result<T>
where
    T: TryFrom<NonNull<sys::rs2_frame>>,
    T::Error: std::fmt::Display,
{
    T::try_from(raw).map_err(|err| {
        // SAFETY: construction failed, so nothing else holds this reference.
        unsafe { sys::rs2_release_frame(raw.as_ptr()) };
        sdk_error("rs2_get_frame_stream_profile", "", err)
    })
}

impl TryFrom<NonNull<sys::rs2_frame>> for RsFrame {
    type Error = CameraError;

    fn try_from(raw: NonNull<sys::rs2_frame>) -> Result<Self> {
        ImageFrame::try_from(raw)
            .map(Self)
            .map_err(|err| sdk_error("rs2_get_frame_stream_profile", "", err))
    }
}

impl FrameCategory for RsFrame {
    fn extension() -> Rs2Extension {
        Rs2Extension::VideoFrame
    }

    fn kind() -> Rs2StreamKind {
        Rs2StreamKind::Any
    }

    fn has_correct_kind(&self) -> bool {
        true
    }
}

impl Frame for RsFrame {
    fn profile(&self) -> Result<StreamProfile> {
        let profile = self.0.stream_profile();
        let index = i32::try_from(profile.index()).map_err(|_| {
            CameraError::Other(format!("stream index out of range: {}", profile.index()))
        })?;
        Ok(StreamProfile {
            stream: stream_from_rs2(profile.kind()),
            format: format_from_rs2(profile.format()),
            index,
            unique_id: StreamId(profile.unique_id()),
            framerate: profile.framerate(),
        })
    }

    fn image(&self) -> Result<FrameImage<'_>> {
        let frame = &self.0;
        let size = frame.get_data_size();
        let (width, height, stride) = (
            to_u32(frame.width(), "width")?,
            to_u32(frame.height(), "height")?,
            to_u32(frame.stride(), "stride")?,
        );
        if size < frame.stride().saturating_mul(frame.height()) {
            return Err(CameraError::sdk(
                "rs2_get_frame_data_size",
                "",
                format!("{size} bytes for {height} rows of {stride}"),
            ));
        }

        // SAFETY: the buffer holds `size` bytes and lives as long as the frame.
        let data = unsafe {
            let ptr = std::ptr::from_ref::<c_void>(frame.get_data()).cast::<u8>();
            std::slice::from_raw_parts(ptr, size)
        };

        Ok(FrameImage {
            width,
            height,
            stride,
            format: format_from_rs2(frame.stream_profile().format()),
            data,
        })
    }
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| CameraError::Other(format!("frame {what} out of range: {value}")))
}

/// Composite frame holding one synchronized frame per stream.
pub struct RsFrameSet(pub(super) CompositeFrame);

impl FrameSet for RsFrameSet {
    type Frame = RsFrame;

    fn frames(&self) -> Result<Vec<RsFrame>> {
        Ok(self.0.frames_of_type::<RsFrame>())
    }
}
