//! Frame validation utilities.
//!
//! Checks that what comes out of the pipeline has the shape it was asked
//! for: aligned frame sets share one geometry, rendered frames are
//! colorized, and the render table holds one entry per stream. Used by
//! the hardware integration tests.

use crate::error::{CameraError, Result};
use crate::pipeline::RenderFrames;
use crate::traits::{Frame, FrameImage, PixelFormat, StreamRequest};

/// Validates that a frame has the resolution of `request`.
///
/// # Errors
///
/// Returns `Validation` if width or height differ.
pub fn validate_frame_geometry(image: &FrameImage<'_>, request: &StreamRequest) -> Result<()> {
    if (image.width, image.height) != (request.width, request.height) {
        return Err(CameraError::Validation(format!(
            "{} frame is {}x{}, expected {}x{}",
            request.stream, image.width, image.height, request.width, request.height
        )));
    }
    Ok(())
}

/// Validates that images share one resolution, as frames of an aligned set do.
///
/// # Errors
///
/// Returns `Validation` if the slice is empty or any resolution differs
/// from the first image's.
pub fn validate_same_geometry(images: &[FrameImage<'_>]) -> Result<()> {
    let Some(first) = images.first() else {
        return Err(CameraError::Validation(
            "Cannot validate empty frame set".to_owned(),
        ));
    };

    for (i, image) in images.iter().enumerate().skip(1) {
        if (image.width, image.height) != (first.width, first.height) {
            return Err(CameraError::Validation(format!(
                "Frame {i} is {}x{}, expected {}x{} like frame 0",
                image.width, image.height, first.width, first.height
            )));
        }
    }

    Ok(())
}

/// Validates that every frame of an aligned set has the same resolution.
pub fn validate_aligned_frames<F: Frame>(frames: &[F]) -> Result<()> {
    let images = frames
        .iter()
        .map(|frame| frame.image())
        .collect::<Result<Vec<_>>>()?;
    validate_same_geometry(&images)
}

/// Validates the render table after the filter chain.
///
/// # Errors
///
/// Returns `Validation` if the table does not hold exactly
/// `expected_streams` entries, an entry is stored under a key other than
/// its stream's identity, or a frame is not RGB8.
pub fn validate_render_frames<F: Frame>(
    frames: &RenderFrames<F>,
    expected_streams: usize,
) -> Result<()> {
    if frames.len() != expected_streams {
        return Err(CameraError::Validation(format!(
            "Render table holds {} streams, expected {expected_streams}",
            frames.len()
        )));
    }

    for (id, frame) in frames {
        let profile = frame.profile()?;
        if profile.unique_id != *id {
            return Err(CameraError::Validation(format!(
                "Frame of stream {} stored under {id}",
                profile.unique_id
            )));
        }
        let image = frame.image()?;
        if image.format != PixelFormat::Rgb8 {
            return Err(CameraError::Validation(format!(
                "Stream {id} rendered as {}, expected RGB8",
                image.format
            )));
        }
    }

    Ok(())
}
