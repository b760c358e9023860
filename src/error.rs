//! Error type shared by the pipeline, the display and the camera backends.

use thiserror::Error;

/// Error type for camera and display operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// A call into the camera SDK failed.
    #[error("RealSense error calling {function}({args}):\n    {message}")]
    Sdk {
        /// Name of the failing SDK function.
        function: String,
        /// Arguments the function was called with, as reported by the SDK.
        args: String,
        /// Human readable description.
        message: String,
    },

    /// A device did not report a required info field (e.g. serial number).
    #[error("device info unavailable: {0}")]
    DeviceInfoUnavailable(String),

    /// A frame carries a pixel layout the caller cannot handle.
    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(String),

    /// A frame or the render table does not look like what was requested.
    #[error("{0}")]
    Validation(String),

    /// Any other failure, reported with just its message.
    #[error("{0}")]
    Other(String),

    /// Terminal I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CameraError {
    /// Build an SDK error from its three reported parts.
    pub fn sdk<F, A, M>(function: F, args: A, message: M) -> Self
    where
        F: Into<String>,
        A: Into<String>,
        M: Into<String>,
    {
        Self::Sdk {
            function: function.into(),
            args: args.into(),
            message: message.into(),
        }
    }

    /// Name of the failing SDK function, when this error came from the SDK.
    pub fn failed_function(&self) -> Option<&str> {
        match self {
            Self::Sdk { function, .. } => Some(function),
            _ => None,
        }
    }
}

/// Result type for camera operations.
pub type Result<T> = std::result::Result<T, CameraError>;
