//! Data models for screen enumeration and capture
//!
//! This module defines the core types shared across the capture pipeline:
//! - [`ScreenDescriptor`]: one capturable display as presented to the agent
//! - [`CaptureOptions`]: resolved capture parameters with explicit defaults
//! - The normalization policy table mapping screen ids to fixed canvases

use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Screen id assumed valid even when enumeration cannot confirm it
pub const DEFAULT_SCREEN_ID: u32 = 1;

/// Fixed canvases for screens whose captures are normalized after capture.
///
/// Screen 2 conventionally represents a mobile-sized secondary display in
/// the deployments this tool targets; its captures are letterboxed onto a
/// portrait canvas. The rule is data, not control flow, so per-deployment
/// extensions only touch this table.
const NORMALIZED_SCREENS: &[(u32, (u32, u32))] = &[(2, (819, 1456))];

/// Returns the fixed canvas size a screen's captures are normalized to,
/// or `None` when captures of that screen are returned at raw dimensions.
pub fn normalization_canvas(screen_id: u32) -> Option<(u32, u32)> {
    NORMALIZED_SCREENS
        .iter()
        .find(|(id, _)| *id == screen_id)
        .map(|(_, canvas)| *canvas)
}

/// One capturable display
///
/// Created fresh on every enumeration call and never persisted; ids are
/// only meaningful within the current process invocation, and
/// re-enumeration may assign different descriptions to the same physical
/// display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScreenDescriptor {
    /// Identifier to pass back into capture requests
    pub id: u32,
    /// Free-form human-readable text (may embed resolution or panel type)
    pub description: String,
}

impl ScreenDescriptor {
    /// Creates a new descriptor
    pub fn new(id: u32, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
        }
    }

    /// The synthetic descriptor returned when enumeration degrades
    pub fn main_fallback() -> Self {
        Self::new(DEFAULT_SCREEN_ID, "Main Display")
    }
}

impl std::fmt::Display for ScreenDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Screen {}: {}", self.id, self.description)
    }
}

/// Resolved options for one capture invocation
///
/// Only `screen_id` and `timeout` are honored by the engine. The remaining
/// fields are accepted-but-unused placeholders reserved for a hypothetical
/// browser-capture mode; they stay in the input schema so existing callers
/// keep validating.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureOptions {
    /// Target screen id (defaults to [`DEFAULT_SCREEN_ID`])
    pub screen_id: u32,
    /// Bound on the capture command's execution; `None` waits forever
    pub timeout: Option<Duration>,
    /// Placeholder, unused
    pub width: Option<u32>,
    /// Placeholder, unused
    pub height: Option<u32>,
    /// Placeholder, unused
    pub full_page: Option<bool>,
    /// Placeholder, unused
    pub wait_for_selector: Option<String>,
}

impl CaptureOptions {
    /// Builds options from raw request values, applying the defaults the
    /// contract promises: a missing screen id means screen 1, and a missing
    /// or zero timeout means an unbounded wait.
    pub fn resolve(screen_id: Option<u32>, timeout_ms: Option<u64>) -> Self {
        Self {
            screen_id: screen_id.unwrap_or(DEFAULT_SCREEN_ID),
            timeout: timeout_ms.filter(|ms| *ms > 0).map(Duration::from_millis),
            ..Self::default()
        }
    }

    /// Convenience constructor for a specific screen with no timeout
    pub fn for_screen(screen_id: u32) -> Self {
        Self::resolve(Some(screen_id), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_descriptor_display_format() {
        let screen = ScreenDescriptor::new(3, "External Display 2 (1920 x 1080)");
        assert_eq!(screen.to_string(), "Screen 3: External Display 2 (1920 x 1080)");
    }

    #[test]
    fn test_main_fallback_descriptor() {
        let fallback = ScreenDescriptor::main_fallback();
        assert_eq!(fallback.id, 1);
        assert_eq!(fallback.description, "Main Display");
    }

    #[test]
    fn test_screen_descriptor_serialization() {
        let screen = ScreenDescriptor::new(1, "Main Display");
        let json = serde_json::to_value(&screen).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["description"], "Main Display");
    }

    #[test]
    fn test_resolve_defaults_screen_id_to_one() {
        let opts = CaptureOptions::resolve(None, None);
        assert_eq!(opts.screen_id, 1);
        assert_eq!(opts.timeout, None);
    }

    #[test]
    fn test_resolve_keeps_explicit_screen_id() {
        let opts = CaptureOptions::resolve(Some(2), None);
        assert_eq!(opts.screen_id, 2);
    }

    #[test]
    fn test_resolve_zero_timeout_means_unbounded() {
        let opts = CaptureOptions::resolve(None, Some(0));
        assert_eq!(opts.timeout, None);
    }

    #[test]
    fn test_resolve_nonzero_timeout() {
        let opts = CaptureOptions::resolve(None, Some(2500));
        assert_eq!(opts.timeout, Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_placeholders_default_to_none() {
        let opts = CaptureOptions::resolve(Some(1), Some(1000));
        assert_eq!(opts.width, None);
        assert_eq!(opts.height, None);
        assert_eq!(opts.full_page, None);
        assert_eq!(opts.wait_for_selector, None);
    }

    #[test]
    fn test_normalization_canvas_for_screen_two() {
        assert_eq!(normalization_canvas(2), Some((819, 1456)));
    }

    #[test]
    fn test_no_normalization_for_other_screens() {
        assert_eq!(normalization_canvas(1), None);
        assert_eq!(normalization_canvas(3), None);
        assert_eq!(normalization_canvas(99), None);
    }
}
