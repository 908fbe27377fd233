//! Capture engine
//!
//! Consumes a screen identifier plus capture options, invokes the
//! OS-specific capture command, optionally normalizes the result onto a
//! fixed canvas, and returns base64-encoded PNG bytes. Each invocation is
//! independent: the only shared state between concurrent captures is the
//! temp directory, and artifact paths are globally unique.
//!
//! Per-invocation flow:
//! command build → execute (bounded by the caller's timeout) → optional
//! normalize → read + base64 encode → cleanup. Temp artifacts are held by
//! drop guards, so cleanup happens on every exit path.

use std::{path::Path, process::Stdio, sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use image::{Rgba, RgbaImage, imageops};
use tracing::{debug, info, warn};

use crate::{
    display::DisplayEnumerator,
    error::{CaptureError, CaptureResult},
    model::{CaptureOptions, DEFAULT_SCREEN_ID, normalization_canvas},
    platform::{CommandSpec, Platform},
    util::temp_files::{TempArtifact, TempFileManager},
};

/// Executes a prepared capture command
///
/// The seam between the engine and the operating system. Production code
/// spawns a real child process via [`SystemCommandRunner`]; tests inject
/// runners that succeed without producing output, fail outright, or write
/// a synthetic image to the requested path.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion, bounded by `timeout` when set
    async fn run(&self, spec: &CommandSpec, timeout: Option<Duration>) -> CaptureResult<()>;
}

/// Command runner backed by a real child process
#[derive(Debug, Default, Clone)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec, timeout: Option<Duration>) -> CaptureResult<()> {
        run_capture_command(spec, timeout).await
    }
}

/// Screen capture engine
///
/// Holds the display enumerator it consults for macOS target validation
/// and the temp file manager that owns artifact paths. Cheap to clone via
/// the shared manager; one engine serves all requests.
pub struct CaptureEngine {
    enumerator: DisplayEnumerator,
    temp_files: Arc<TempFileManager>,
    runner: Arc<dyn CommandRunner>,
}

impl CaptureEngine {
    /// Creates an engine wired to the given enumerator and temp manager
    pub fn new(enumerator: DisplayEnumerator, temp_files: Arc<TempFileManager>) -> Self {
        Self::with_runner(enumerator, temp_files, Arc::new(SystemCommandRunner))
    }

    /// Creates an engine with a custom command runner
    pub fn with_runner(
        enumerator: DisplayEnumerator,
        temp_files: Arc<TempFileManager>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            enumerator,
            temp_files,
            runner,
        }
    }

    /// Captures a screenshot and returns it as a base64 PNG string
    ///
    /// Fails with `UnsupportedPlatform` before any command executes when
    /// the host OS is unrecognized; every other failure (command error,
    /// timeout, missing output, image processing, I/O) surfaces exactly
    /// once as the corresponding [`CaptureError`]. No temp files created
    /// by the call remain on disk afterwards, success or failure.
    pub async fn capture(&self, opts: &CaptureOptions) -> CaptureResult<String> {
        let platform = Platform::detect()?;
        self.capture_on(platform, opts).await
    }

    /// Capture with an explicit platform tag (exposed for tests)
    pub async fn capture_on(
        &self,
        platform: Platform,
        opts: &CaptureOptions,
    ) -> CaptureResult<String> {
        let raw = self.temp_files.allocate("screenshot", "png")?;

        let display = self.resolve_target_display(platform, opts.screen_id).await;
        let spec = platform.capture_command(display, raw.path());
        debug!(command = %spec.program, screen_id = opts.screen_id, "executing capture command");

        self.runner.run(&spec, opts.timeout).await?;

        if !raw.path().exists() {
            return Err(CaptureError::MissingArtifact {
                path: raw.path().to_path_buf(),
            });
        }

        let encoded = self.finish_capture(raw, opts.screen_id).await?;
        info!(screen_id = opts.screen_id, bytes = encoded.len(), "capture complete");
        Ok(encoded)
    }

    /// Resolves which display the capture command should target
    ///
    /// On macOS the requested id is checked against the enumerated
    /// screens; id 1 is always assumed valid. An unknown id degrades to
    /// the primary display with a warning rather than failing; this is
    /// the single decision point should a strict mode ever be wanted.
    /// Platforms without multi-display targeting always capture their
    /// default surface.
    async fn resolve_target_display(&self, platform: Platform, screen_id: u32) -> Option<u32> {
        if !platform.supports_multi_display() {
            return None;
        }

        if screen_id == DEFAULT_SCREEN_ID {
            return Some(screen_id);
        }

        let screens = self.enumerator.screens_for(platform).await;
        if screens.iter().any(|s| s.id == screen_id) {
            Some(screen_id)
        } else {
            warn!(
                screen_id,
                available = screens.len(),
                "requested screen not found, capturing primary display instead"
            );
            None
        }
    }

    /// Post-processing tail of the pipeline: normalize when the policy
    /// demands it, then read, base64-encode, and clean up.
    ///
    /// Takes ownership of the raw artifact; its guard (and the normalized
    /// one, when created) deletes the file before this returns.
    pub async fn finish_capture(&self, raw: TempArtifact, screen_id: u32) -> CaptureResult<String> {
        let final_artifact = match normalization_canvas(screen_id) {
            Some(canvas) => {
                let normalized = self.temp_files.allocate("screenshot-normalized", "png")?;
                let src = raw.path().to_path_buf();
                let dst = normalized.path().to_path_buf();
                // Decode and resize are CPU-bound; keep them off the
                // async workers.
                tokio::task::spawn_blocking(move || normalize_to_canvas(&src, &dst, canvas))
                    .await
                    .map_err(|e| CaptureError::ImageError(e.to_string()))??;
                drop(raw); // the original capture is no longer needed
                normalized
            }
            None => raw,
        };

        let bytes = tokio::fs::read(final_artifact.path())
            .await
            .map_err(CaptureError::IoError)?;
        Ok(STANDARD.encode(bytes))
        // final_artifact guard drops here, removing the file
    }
}

/// Runs a capture command, bounding it by `timeout` when one is set
///
/// The child is spawned with `kill_on_drop`, so hitting the timeout
/// aborts the command rather than leaving it running. A non-zero exit
/// surfaces as `CommandFailed` carrying the captured stderr.
async fn run_capture_command(spec: &CommandSpec, timeout: Option<Duration>) -> CaptureResult<()> {
    let mut command = spec.to_command();
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match timeout {
        Some(duration) => tokio::time::timeout(duration, command.output())
            .await
            .map_err(|_| CaptureError::CaptureTimeout {
                duration_ms: duration.as_millis() as u64,
            })??,
        None => command.output().await?,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CaptureError::CommandFailed {
            command: spec.program.clone(),
            reason: format!("{}: {}", output.status, stderr.trim()),
        });
    }
    Ok(())
}

/// Normalizes a captured image onto a fixed canvas
///
/// Resizes preserving aspect ratio (Lanczos3), then letterboxes onto an
/// opaque white canvas of exactly `canvas` pixels and writes the result
/// as PNG to `dst`. The output dimensions always equal the canvas, never
/// the scaled image.
pub fn normalize_to_canvas(src: &Path, dst: &Path, canvas: (u32, u32)) -> CaptureResult<()> {
    let (canvas_w, canvas_h) = canvas;

    let img = image::open(src).map_err(|e| CaptureError::ImageError(e.to_string()))?;
    let resized = img.resize(canvas_w, canvas_h, imageops::FilterType::Lanczos3);

    let mut background = RgbaImage::from_pixel(canvas_w, canvas_h, Rgba([255, 255, 255, 255]));
    let x = i64::from((canvas_w - resized.width()) / 2);
    let y = i64::from((canvas_h - resized.height()) / 2);
    imageops::overlay(&mut background, &resized, x, y);

    background
        .save(dst)
        .map_err(|e| CaptureError::ImageError(e.to_string()))
}
