//! Error types for screen capture operations
//!
//! This module defines the error taxonomy for the capture pipeline with
//! user-facing messages and actionable remediation hints. Display
//! enumeration never produces errors of its own: any introspection or
//! parsing failure degrades to a synthetic fallback descriptor inside the
//! enumerator, so only capture-side failures and platform mismatches are
//! represented here.

use std::path::PathBuf;

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Error type for screen capture operations
///
/// Every failure is surfaced exactly once and never retried. Each variant
/// provides a remediation hint through [`CaptureError::remediation_hint`].
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The host OS is not among the supported platforms
    #[error("Unsupported platform '{os}': screen capture requires macOS, Windows, or Linux")]
    UnsupportedPlatform {
        /// Value of `std::env::consts::OS` (or the requested tag)
        os: String,
    },

    /// An external capture or introspection command exited unsuccessfully
    #[error("Command '{command}' failed: {reason}")]
    CommandFailed {
        /// The program that was invoked
        command: String,
        /// Exit status and/or captured stderr
        reason: String,
    },

    /// The capture command exceeded the caller-supplied timeout
    #[error("Capture operation timed out after {duration_ms}ms")]
    CaptureTimeout {
        /// Timeout duration in milliseconds
        duration_ms: u64,
    },

    /// The capture command reported success but produced no output file
    #[error("Capture produced no output file at {path:?}")]
    MissingArtifact {
        /// Path the capture command was asked to write
        path: PathBuf,
    },

    /// Image decode, resize, or encode failed during normalization
    #[error("Image processing error: {0}")]
    ImageError(String),

    /// I/O error while reading, writing, or removing a capture artifact
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CaptureError {
    /// Returns an actionable remediation hint for this error
    pub fn remediation_hint(&self) -> &str {
        match self {
            CaptureError::UnsupportedPlatform { .. } => {
                "Screen capture is only implemented for macOS, Windows, and Linux. Run the \
                 server on one of those platforms."
            }
            CaptureError::CommandFailed { command, .. } => match command.as_str() {
                "screencapture" => {
                    "Grant screen recording permission in System Settings > Privacy & Security \
                     > Screen Recording, then retry."
                }
                "import" => {
                    "Ensure ImageMagick is installed (the `import` utility) and that an X \
                     display is available via $DISPLAY."
                }
                "powershell" => {
                    "Ensure PowerShell is available on PATH and that the session has an \
                     interactive desktop (clipboard capture does not work in headless \
                     sessions)."
                }
                _ => "Check that the capture utility is installed and on PATH.",
            },
            CaptureError::CaptureTimeout { .. } => {
                "The capture command took too long. Increase the timeout parameter or omit it \
                 for an unbounded wait."
            }
            CaptureError::MissingArtifact { .. } => {
                "The capture command exited successfully but wrote no file. Check temp \
                 directory permissions and free disk space."
            }
            CaptureError::ImageError(_) => {
                "The captured file could not be processed as an image. Retry the capture; if \
                 it persists the capture utility may be producing a truncated file."
            }
            CaptureError::IoError(_) => {
                "An I/O error occurred. Check file permissions, disk space, and system \
                 resources."
            }
        }
    }
}
