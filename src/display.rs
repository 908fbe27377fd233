//! Display enumeration
//!
//! Resolves identifiers and human-readable descriptions for capturable
//! screens. On macOS the enumerator shells out to `system_profiler` and
//! heuristically parses its unstructured text report; the parsing lives in
//! pure functions so the brittle parts are testable in isolation. The
//! label-prefix matching is inherent to the data source and may
//! misidentify displays on complex monitor arrangements; that is accepted
//! rather than guaranteed-correct.
//!
//! The enumerator never propagates introspection or parsing failures:
//! anything that goes wrong degrades to a single synthetic
//! `Main Display` descriptor. Only an unrecognized host platform surfaces
//! as an error, and it does so before any command is issued.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    error::{CaptureError, CaptureResult},
    model::ScreenDescriptor,
    platform::Platform,
};

/// Field label prefixes scanned for inside each display section
const LABEL_TYPE: &str = "Display Type:";
const LABEL_RESOLUTION: &str = "Resolution:";
const LABEL_NAME: &str = "Display Name:";

/// Marker line that opens the per-display portion of the macOS report
const DISPLAYS_MARKER: &str = "Displays:";

/// Partial display record scanned out of one report section
///
/// All fields are optional; the report frequently omits some of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplaySection {
    /// Panel type, e.g. "Built-in Liquid Retina XDR Display"
    pub kind: Option<String>,
    /// Resolution text, e.g. "3456 x 2234 Retina"
    pub resolution: Option<String>,
    /// Explicit display name, when the report carries one
    pub name: Option<String>,
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// A section header is a bare label line: ends with a colon, carries no
/// value, and sits deeper than the `Displays:` marker.
fn is_section_header(line: &str, marker_indent: usize) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.ends_with(':')
        && trimmed.matches(':').count() == 1
        && indent_of(line) > marker_indent
}

/// Splits a raw introspection report into per-display sections
///
/// Pass 1 of the heuristic parse: everything after the `Displays:` marker
/// is grouped into sections opened by bare header lines. Pass 2 scans each
/// section line-by-line for the three optional label-prefixed fields;
/// the first match per field wins and no field is required.
///
/// Returns an empty vector when the marker or any section is missing;
/// callers treat that as grounds for the synthetic fallback.
pub fn parse_display_sections(text: &str) -> Vec<DisplaySection> {
    let lines: Vec<&str> = text.lines().collect();

    let Some((marker_idx, marker_indent)) = lines
        .iter()
        .enumerate()
        .find(|(_, line)| line.trim() == DISPLAYS_MARKER)
        .map(|(i, line)| (i, indent_of(line)))
    else {
        return Vec::new();
    };

    let mut sections: Vec<Vec<&str>> = Vec::new();
    for line in &lines[marker_idx + 1..] {
        if is_section_header(line, marker_indent) {
            sections.push(Vec::new());
        } else if let Some(current) = sections.last_mut() {
            current.push(line);
        }
    }

    sections.iter().map(|body| scan_section(body)).collect()
}

fn scan_section(body: &[&str]) -> DisplaySection {
    let mut section = DisplaySection::default();
    for line in body {
        let trimmed = line.trim();
        if section.kind.is_none() {
            if let Some(value) = trimmed.strip_prefix(LABEL_TYPE) {
                section.kind = Some(value.trim().to_string());
                continue;
            }
        }
        if section.resolution.is_none() {
            if let Some(value) = trimmed.strip_prefix(LABEL_RESOLUTION) {
                section.resolution = Some(value.trim().to_string());
                continue;
            }
        }
        if section.name.is_none() {
            if let Some(value) = trimmed.strip_prefix(LABEL_NAME) {
                section.name = Some(value.trim().to_string());
            }
        }
    }
    section
}

/// Builds the human-readable description for one parsed section
///
/// Prefers the explicit name, falls back to the panel type, then to the
/// literal "Display"; the resolution is appended in parentheses when
/// present.
pub fn describe_section(section: &DisplaySection) -> String {
    let base = section
        .name
        .as_deref()
        .or(section.kind.as_deref())
        .unwrap_or("Display");
    match &section.resolution {
        Some(resolution) => format!("{} ({})", base, resolution),
        None => base.to_string(),
    }
}

/// Converts parsed sections into descriptors with 1-based sequential ids
///
/// Id 1 is the first section, conventionally the main display.
pub fn screens_from_sections(sections: &[DisplaySection]) -> Vec<ScreenDescriptor> {
    sections
        .iter()
        .enumerate()
        .map(|(i, section)| ScreenDescriptor::new(i as u32 + 1, describe_section(section)))
        .collect()
}

/// Extracts the value of every resolution line in a report
pub fn parse_resolution_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.trim().strip_prefix(LABEL_RESOLUTION))
        .map(|value| value.trim().to_string())
        .collect()
}

/// Rebuilds the descriptor list purely from resolution-line order
///
/// Used by the disambiguation fallback when the structured parse found at
/// most one display but the report carries several resolution lines. Index
/// 0 is labeled the main display; later indexes become numbered external
/// displays.
pub fn screens_from_resolutions(resolutions: &[String]) -> Vec<ScreenDescriptor> {
    resolutions
        .iter()
        .enumerate()
        .map(|(i, resolution)| {
            let description = if i == 0 {
                format!("Main Display ({})", resolution)
            } else {
                format!("External Display {} ({})", i, resolution)
            };
            ScreenDescriptor::new(i as u32 + 1, description)
        })
        .collect()
}

/// Source of raw display-introspection text
///
/// The seam between the enumerator and the OS. Production code shells out
/// via [`SystemIntrospection`]; tests inject canned reports and induced
/// failures.
#[async_trait]
pub trait IntrospectionSource: Send + Sync {
    /// Runs the platform's introspection command and returns its stdout
    async fn display_report(&self, platform: Platform) -> CaptureResult<String>;
}

/// Introspection source backed by the real OS utility
#[derive(Debug, Default, Clone)]
pub struct SystemIntrospection;

#[async_trait]
impl IntrospectionSource for SystemIntrospection {
    async fn display_report(&self, platform: Platform) -> CaptureResult<String> {
        let spec = platform
            .introspection_command()
            .ok_or_else(|| CaptureError::CommandFailed {
                command: "introspection".to_string(),
                reason: format!("no display introspection utility on {}", platform),
            })?;

        let output = spec.to_command().output().await?;
        if !output.status.success() {
            return Err(CaptureError::CommandFailed {
                command: spec.program,
                reason: format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Resolves capturable screens for the current platform
#[derive(Clone)]
pub struct DisplayEnumerator {
    source: Arc<dyn IntrospectionSource>,
}

impl DisplayEnumerator {
    /// Creates an enumerator backed by the real OS introspection utility
    pub fn new() -> Self {
        Self::with_source(Arc::new(SystemIntrospection))
    }

    /// Creates an enumerator with a custom introspection source
    pub fn with_source(source: Arc<dyn IntrospectionSource>) -> Self {
        Self { source }
    }

    /// Lists capturable screens for the detected platform
    ///
    /// The only error that can surface is `UnsupportedPlatform`; every
    /// introspection or parsing failure degrades to the synthetic
    /// `Main Display` descriptor.
    pub async fn list_screens(&self) -> CaptureResult<Vec<ScreenDescriptor>> {
        let platform = Platform::detect()?;
        Ok(self.screens_for(platform).await)
    }

    /// Lists capturable screens for an explicit platform tag
    pub async fn screens_for(&self, platform: Platform) -> Vec<ScreenDescriptor> {
        match platform {
            Platform::MacOs => self.enumerate_macos().await,
            Platform::Windows | Platform::Linux => {
                vec![ScreenDescriptor::new(
                    0,
                    format!(
                        "Default Display (multi-screen selection not supported on {})",
                        platform
                    ),
                )]
            }
        }
    }

    async fn enumerate_macos(&self) -> Vec<ScreenDescriptor> {
        let report = match self.source.display_report(Platform::MacOs).await {
            Ok(report) => report,
            Err(e) => {
                warn!("display introspection failed, degrading to Main Display: {}", e);
                return vec![ScreenDescriptor::main_fallback()];
            }
        };

        let sections = parse_display_sections(&report);
        let screens = if sections.is_empty() {
            vec![ScreenDescriptor::main_fallback()]
        } else {
            screens_from_sections(&sections)
        };

        // The structured parse misses displays on some monitor
        // arrangements. When it found at most one, re-run the command and
        // trust resolution-line order instead if that finds more.
        if screens.len() <= 1 {
            match self.source.display_report(Platform::MacOs).await {
                Ok(rescan) => {
                    let resolutions = parse_resolution_lines(&rescan);
                    if resolutions.len() > 1 {
                        debug!(
                            displays = resolutions.len(),
                            "resolution-line rescan found additional displays"
                        );
                        return screens_from_resolutions(&resolutions);
                    }
                }
                Err(e) => {
                    debug!("resolution rescan failed, keeping parsed result: {}", e);
                }
            }
        }

        screens
    }
}

impl Default for DisplayEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A realistic abbreviated `system_profiler SPDisplaysDataType` report
    const MACBOOK_REPORT: &str = "\
Graphics/Displays:

    Apple M2 Pro:

      Chipset Model: Apple M2 Pro
      Type: GPU
      Displays:
        Colour LCD:
          Display Type: Built-in Liquid Retina XDR Display
          Resolution: 3456 x 2234 Retina
          Main Display: Yes
          Mirror: Off
        DELL U2720Q:
          Display Type: LCD
          Resolution: 3840 x 2160 (2160p/4K UHD 1)
          Mirror: Off
        LG HDR 4K:
          Display Name: LG HDR 4K
          Resolution: 3840 x 2160
          Mirror: Off
";

    struct StubSource {
        reports: Vec<CaptureResult<String>>,
        calls: std::sync::Mutex<usize>,
    }

    impl StubSource {
        fn new(reports: Vec<CaptureResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                reports,
                calls: std::sync::Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl IntrospectionSource for StubSource {
        async fn display_report(&self, _platform: Platform) -> CaptureResult<String> {
            let mut calls = self.calls.lock().unwrap();
            let index = (*calls).min(self.reports.len() - 1);
            *calls += 1;
            match &self.reports[index] {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(CaptureError::CommandFailed {
                    command: "system_profiler".to_string(),
                    reason: "induced failure".to_string(),
                }),
            }
        }
    }

    fn induced_failure() -> CaptureResult<String> {
        Err(CaptureError::CommandFailed {
            command: "system_profiler".to_string(),
            reason: "induced failure".to_string(),
        })
    }

    // ========== Pure parser tests ==========

    #[test]
    fn test_parse_three_sections() {
        let sections = parse_display_sections(MACBOOK_REPORT);
        assert_eq!(sections.len(), 3);

        assert_eq!(
            sections[0].kind.as_deref(),
            Some("Built-in Liquid Retina XDR Display")
        );
        assert_eq!(sections[0].resolution.as_deref(), Some("3456 x 2234 Retina"));
        assert_eq!(sections[0].name, None);

        assert_eq!(sections[2].name.as_deref(), Some("LG HDR 4K"));
    }

    #[test]
    fn test_parse_no_marker_yields_no_sections() {
        let sections = parse_display_sections("Hardware:\n  Model Name: MacBook Pro\n");
        assert!(sections.is_empty());
    }

    #[test]
    fn test_parse_marker_without_sections() {
        let sections = parse_display_sections("      Displays:\n");
        assert!(sections.is_empty());
    }

    #[test]
    fn test_first_match_per_field_wins() {
        let report = "\
  Displays:
    Panel:
      Resolution: 1920 x 1080
      Resolution: 9999 x 9999
";
        let sections = parse_display_sections(report);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].resolution.as_deref(), Some("1920 x 1080"));
    }

    #[test]
    fn test_describe_prefers_name_over_type() {
        let section = DisplaySection {
            kind: Some("LCD".to_string()),
            resolution: Some("3840 x 2160".to_string()),
            name: Some("LG HDR 4K".to_string()),
        };
        assert_eq!(describe_section(&section), "LG HDR 4K (3840 x 2160)");
    }

    #[test]
    fn test_describe_falls_back_to_type_then_literal() {
        let typed = DisplaySection {
            kind: Some("LCD".to_string()),
            ..Default::default()
        };
        assert_eq!(describe_section(&typed), "LCD");

        let bare = DisplaySection::default();
        assert_eq!(describe_section(&bare), "Display");
    }

    #[test]
    fn test_screens_from_sections_ids_are_one_based() {
        let screens = screens_from_sections(&parse_display_sections(MACBOOK_REPORT));
        assert_eq!(screens.len(), 3);
        assert_eq!(screens[0].id, 1);
        assert_eq!(screens[1].id, 2);
        assert_eq!(screens[2].id, 3);

        // Descriptions embed each section's resolution in order.
        assert!(screens[0].description.contains("3456 x 2234"));
        assert!(screens[1].description.contains("3840 x 2160"));
        assert!(screens[2].description.contains("3840 x 2160"));
    }

    #[test]
    fn test_parse_resolution_lines() {
        let resolutions = parse_resolution_lines(MACBOOK_REPORT);
        assert_eq!(resolutions.len(), 3);
        assert_eq!(resolutions[0], "3456 x 2234 Retina");
    }

    #[test]
    fn test_screens_from_resolutions_labeling() {
        let resolutions = vec!["2560 x 1600".to_string(), "1920 x 1080".to_string()];
        let screens = screens_from_resolutions(&resolutions);

        assert_eq!(screens[0], ScreenDescriptor::new(1, "Main Display (2560 x 1600)"));
        assert_eq!(
            screens[1],
            ScreenDescriptor::new(2, "External Display 1 (1920 x 1080)")
        );
    }

    // ========== Enumerator behavior ==========

    #[tokio::test]
    async fn test_enumerate_three_displays() {
        let source = StubSource::new(vec![Ok(MACBOOK_REPORT.to_string())]);
        let enumerator = DisplayEnumerator::with_source(source);

        let screens = enumerator.screens_for(Platform::MacOs).await;
        assert_eq!(screens.len(), 3);
        assert_eq!(screens[0].id, 1);
        assert_eq!(screens[2].id, 3);
    }

    #[tokio::test]
    async fn test_introspection_failure_degrades_to_fallback() {
        let source = StubSource::new(vec![induced_failure()]);
        let enumerator = DisplayEnumerator::with_source(source);

        let screens = enumerator.screens_for(Platform::MacOs).await;
        assert_eq!(screens, vec![ScreenDescriptor::main_fallback()]);
    }

    #[tokio::test]
    async fn test_empty_report_degrades_to_fallback() {
        // No sections, and the rescan finds at most one resolution line.
        let source = StubSource::new(vec![Ok(String::new())]);
        let enumerator = DisplayEnumerator::with_source(source);

        let screens = enumerator.screens_for(Platform::MacOs).await;
        assert_eq!(screens, vec![ScreenDescriptor::main_fallback()]);
    }

    #[tokio::test]
    async fn test_rescan_discovers_extra_displays() {
        // Structured parse only sees one section, but the report carries
        // two resolution lines (a shape some external-monitor setups
        // produce); the rescan rebuilds from resolution order.
        let report = "\
  Displays:
    Colour LCD:
      Resolution: 2560 x 1600
  Resolution: 1920 x 1080
";
        let source = StubSource::new(vec![Ok(report.to_string())]);
        let enumerator = DisplayEnumerator::with_source(source);

        let screens = enumerator.screens_for(Platform::MacOs).await;
        assert_eq!(screens.len(), 2);
        assert_eq!(screens[0].description, "Main Display (2560 x 1600)");
        assert_eq!(screens[1].description, "External Display 1 (1920 x 1080)");
    }

    #[tokio::test]
    async fn test_rescan_failure_keeps_parsed_result() {
        let report = "\
  Displays:
    Colour LCD:
      Display Type: Built-in Retina Display
      Resolution: 2560 x 1600
";
        let source = StubSource::new(vec![Ok(report.to_string()), induced_failure()]);
        let enumerator = DisplayEnumerator::with_source(source);

        let screens = enumerator.screens_for(Platform::MacOs).await;
        assert_eq!(screens.len(), 1);
        assert_eq!(screens[0].description, "Built-in Retina Display (2560 x 1600)");
    }

    #[tokio::test]
    async fn test_multi_display_parse_skips_rescan() {
        // Two sections parsed: the rescan must not run, so a would-be
        // second report never gets requested.
        let report = "\
  Displays:
    A:
      Resolution: 1 x 1
    B:
      Resolution: 2 x 2
";
        let source = StubSource::new(vec![Ok(report.to_string()), induced_failure()]);
        let enumerator =
            DisplayEnumerator::with_source(Arc::clone(&source) as Arc<dyn IntrospectionSource>);

        let screens = enumerator.screens_for(Platform::MacOs).await;
        assert_eq!(screens.len(), 2);
        assert_eq!(*source.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_windows_single_unsupported_descriptor() {
        let source = StubSource::new(vec![induced_failure()]);
        let enumerator = DisplayEnumerator::with_source(source);

        let screens = enumerator.screens_for(Platform::Windows).await;
        assert_eq!(screens.len(), 1);
        assert_eq!(screens[0].id, 0);
        assert!(screens[0].description.contains("not supported"));
    }

    #[tokio::test]
    async fn test_linux_single_unsupported_descriptor() {
        let source = StubSource::new(vec![induced_failure()]);
        let enumerator = DisplayEnumerator::with_source(source);

        let screens = enumerator.screens_for(Platform::Linux).await;
        assert_eq!(screens.len(), 1);
        assert_eq!(screens[0].id, 0);
        assert!(screens[0].description.contains("linux"));
    }
}
