//! Platform dispatch for capture and introspection commands
//!
//! The original design scattered platform checks through the engine as an
//! if/else chain over an OS string. Here the supported platforms form a
//! closed variant set; each variant knows how to build its capture command
//! and whether it can target individual displays. Command construction is
//! pure so it can be unit-tested without spawning processes.

use std::path::Path;

use tokio::process::Command;

use crate::error::{CaptureError, CaptureResult};

/// Milliseconds the Windows capture script waits for the OS to populate
/// the clipboard image buffer after the PrintScreen key event.
const CLIPBOARD_SETTLE_MS: u32 = 500;

/// A fully-formed child process invocation: program plus argument vector
///
/// Arguments are passed verbatim (no shell), so paths never need quoting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name resolved via PATH
    pub program: String,
    /// Arguments in order
    pub args: Vec<String>,
}

impl CommandSpec {
    fn new(program: &str, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            program: program.to_string(),
            args: args.into_iter().collect(),
        }
    }

    /// Converts the spec into a runnable `tokio::process::Command`
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

/// The closed set of platforms this server supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// macOS: `screencapture` + `system_profiler` introspection
    MacOs,
    /// Windows: PowerShell PrintScreen/clipboard capture
    Windows,
    /// Linux: ImageMagick `import` root-window capture
    Linux,
}

impl Platform {
    /// Maps an OS tag (the `std::env::consts::OS` vocabulary) to a platform
    ///
    /// Anything outside the supported set fails with
    /// [`CaptureError::UnsupportedPlatform`] before any external command
    /// can be issued.
    pub fn from_os(os: &str) -> CaptureResult<Self> {
        match os {
            "macos" => Ok(Platform::MacOs),
            "windows" => Ok(Platform::Windows),
            "linux" => Ok(Platform::Linux),
            other => Err(CaptureError::UnsupportedPlatform {
                os: other.to_string(),
            }),
        }
    }

    /// Resolves the platform tag for the running process
    ///
    /// Resolved once per call rather than cached, matching the one-shot
    /// dispatch model of the rest of the pipeline.
    pub fn detect() -> CaptureResult<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Returns the platform tag as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
        }
    }

    /// Whether this platform can target individual displays by id
    pub fn supports_multi_display(&self) -> bool {
        matches!(self, Platform::MacOs)
    }

    /// The command that prints display configuration as text, if any
    pub fn introspection_command(&self) -> Option<CommandSpec> {
        match self {
            Platform::MacOs => Some(CommandSpec::new(
                "system_profiler",
                ["SPDisplaysDataType".to_string()],
            )),
            Platform::Windows | Platform::Linux => None,
        }
    }

    /// Builds the capture command writing a PNG to `output`
    ///
    /// `display` carries a validated display number on macOS; `None`
    /// captures the primary display. Windows and Linux ignore the display
    /// entirely: Windows simulates PrintScreen and saves the resulting
    /// clipboard image, Linux grabs the full root window.
    pub fn capture_command(&self, display: Option<u32>, output: &Path) -> CommandSpec {
        let path = output.to_string_lossy().to_string();
        match self {
            Platform::MacOs => {
                // -x suppresses the capture sound; no UI flash either way.
                let mut args = vec!["-x".to_string()];
                if let Some(id) = display {
                    args.push("-D".to_string());
                    args.push(id.to_string());
                }
                args.push(path);
                CommandSpec::new("screencapture", args)
            }
            Platform::Windows => {
                let script = format!(
                    "Add-Type -AssemblyName System.Windows.Forms; \
                     Add-Type -AssemblyName System.Drawing; \
                     [System.Windows.Forms.SendKeys]::SendWait('{{PRTSC}}'); \
                     Start-Sleep -Milliseconds {settle}; \
                     $img = [System.Windows.Forms.Clipboard]::GetImage(); \
                     if ($null -eq $img) {{ exit 1 }}; \
                     $img.Save('{path}', [System.Drawing.Imaging.ImageFormat]::Png)",
                    settle = CLIPBOARD_SETTLE_MS,
                    path = path.replace('\'', "''"),
                );
                CommandSpec::new(
                    "powershell",
                    [
                        "-NoProfile".to_string(),
                        "-STA".to_string(),
                        "-Command".to_string(),
                        script,
                    ],
                )
            }
            Platform::Linux => CommandSpec::new(
                "import",
                ["-window".to_string(), "root".to_string(), path],
            ),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_from_os_supported_platforms() {
        assert_eq!(Platform::from_os("macos").unwrap(), Platform::MacOs);
        assert_eq!(Platform::from_os("windows").unwrap(), Platform::Windows);
        assert_eq!(Platform::from_os("linux").unwrap(), Platform::Linux);
    }

    #[test]
    fn test_from_os_unrecognized_fails() {
        for os in ["freebsd", "android", "ios", "", "darwin"] {
            let result = Platform::from_os(os);
            assert!(
                matches!(result, Err(CaptureError::UnsupportedPlatform { .. })),
                "'{}' should be unsupported",
                os
            );
        }
    }

    #[test]
    fn test_detect_matches_current_os() {
        // On any platform the test suite actually runs on, detection works.
        let platform = Platform::detect().unwrap();
        assert_eq!(platform.as_str(), std::env::consts::OS);
    }

    #[test]
    fn test_multi_display_support() {
        assert!(Platform::MacOs.supports_multi_display());
        assert!(!Platform::Windows.supports_multi_display());
        assert!(!Platform::Linux.supports_multi_display());
    }

    #[test]
    fn test_introspection_command_macos_only() {
        let spec = Platform::MacOs.introspection_command().unwrap();
        assert_eq!(spec.program, "system_profiler");
        assert_eq!(spec.args, vec!["SPDisplaysDataType"]);

        assert!(Platform::Windows.introspection_command().is_none());
        assert!(Platform::Linux.introspection_command().is_none());
    }

    #[test]
    fn test_macos_capture_command_numbered_display() {
        let out = PathBuf::from("/tmp/shot.png");
        let spec = Platform::MacOs.capture_command(Some(2), &out);

        assert_eq!(spec.program, "screencapture");
        assert_eq!(spec.args, vec!["-x", "-D", "2", "/tmp/shot.png"]);
    }

    #[test]
    fn test_macos_capture_command_primary_display() {
        let out = PathBuf::from("/tmp/shot.png");
        let spec = Platform::MacOs.capture_command(None, &out);

        // No -D flag: screencapture falls back to the main display.
        assert_eq!(spec.args, vec!["-x", "/tmp/shot.png"]);
    }

    #[test]
    fn test_linux_capture_command_root_window() {
        let out = PathBuf::from("/tmp/shot.png");
        let spec = Platform::Linux.capture_command(Some(3), &out);

        assert_eq!(spec.program, "import");
        assert_eq!(spec.args, vec!["-window", "root", "/tmp/shot.png"]);
    }

    #[test]
    fn test_windows_capture_command_shape() {
        let out = PathBuf::from(r"C:\Temp\shot.png");
        let spec = Platform::Windows.capture_command(None, &out);

        assert_eq!(spec.program, "powershell");
        assert_eq!(spec.args[0], "-NoProfile");
        assert_eq!(spec.args[1], "-STA");
        assert_eq!(spec.args[2], "-Command");

        let script = &spec.args[3];
        assert!(script.contains("{PRTSC}"), "should send PrintScreen");
        assert!(script.contains("Start-Sleep"), "should wait for the clipboard");
        assert!(script.contains("GetImage"), "should read the clipboard image");
        assert!(script.contains("shot.png"), "should save to the output path");
    }

    #[test]
    fn test_windows_script_escapes_single_quotes() {
        let out = PathBuf::from("/tmp/o'brien.png");
        let spec = Platform::Windows.capture_command(None, &out);
        assert!(spec.args[3].contains("o''brien.png"));
    }

    #[test]
    fn test_command_spec_to_command() {
        let spec = CommandSpec::new("echo", ["hello".to_string()]);
        let command = spec.to_command();
        assert_eq!(command.as_std().get_program(), "echo");
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(Platform::MacOs.to_string(), "macos");
        assert_eq!(Platform::Windows.to_string(), "windows");
        assert_eq!(Platform::Linux.to_string(), "linux");
    }
}
