//! MCP service implementation with tool routing
//!
//! This module provides the screengrab-mcp MCP server implementation with
//! the `list_screens` and `take_screenshot` tools for screen enumeration
//! and capture across macOS, Windows, and Linux.

use std::sync::Arc;

use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ErrorData as McpError, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    capture::CaptureEngine,
    display::DisplayEnumerator,
    error::CaptureError,
    model::{CaptureOptions, ScreenDescriptor},
};

/// Parameters for the take_screenshot tool
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TakeScreenshotParams {
    /// Screen to capture, as reported by list_screens (default: 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_id: Option<u32>,

    /// Capture timeout in milliseconds; 0 or absent means no timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    // --- Accepted for agent compatibility; not applied to screen capture ---
    /// Viewport width hint (accepted, ignored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Viewport height hint (accepted, ignored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Full-page hint (accepted, ignored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_page: Option<bool>,

    /// CSS selector wait hint (accepted, ignored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<String>,
}

/// Formats a capture failure as the single text message returned to the
/// calling agent, appending the per-error remediation hint.
fn failure_message(context: &str, error: &CaptureError) -> String {
    format!("{context}: {error}. {}", error.remediation_hint())
}

/// Screengrab MCP server
///
/// Provides MCP tools for screen enumeration and screenshot capture.
///
/// # Tools
///
/// - `list_screens`: Enumerate all capturable screens
/// - `take_screenshot`: Capture a screen and return it as a base64 PNG
#[derive(Clone)]
pub struct ScreengrabServer {
    /// Tool router for dispatching tool calls
    tool_router: ToolRouter<Self>,
    /// Enumerator answering list_screens requests
    enumerator: DisplayEnumerator,
    /// Engine driving the capture pipeline
    engine: Arc<CaptureEngine>,
}

#[tool_router]
impl ScreengrabServer {
    /// Creates a new ScreengrabServer wired to the given enumerator and
    /// capture engine
    pub fn new(enumerator: DisplayEnumerator, engine: Arc<CaptureEngine>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            enumerator,
            engine,
        }
    }

    /// Lists all capturable screens on the system
    ///
    /// On macOS this enumerates physical displays via system introspection;
    /// on Windows and Linux a single default screen is reported because the
    /// capture utilities there do not support per-display selection.
    ///
    /// # Returns
    ///
    /// A `CallToolResult` with one text content block listing one screen per
    /// line as `Screen <id>: <description>`, for example:
    ///
    /// ```text
    /// Screen 1: Colour LCD (2560 x 1600)
    /// Screen 2: DELL U2720Q (3840 x 2160)
    /// ```
    ///
    /// Fails only when the host operating system is unrecognized; every
    /// introspection problem degrades to a single synthetic main display.
    #[tool(description = "List the available screens that can be captured")]
    pub async fn list_screens(&self) -> Result<CallToolResult, McpError> {
        match self.enumerator.list_screens().await {
            Ok(screens) => {
                let listing = screens
                    .iter()
                    .map(ScreenDescriptor::to_string)
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(CallToolResult::success(vec![Content::text(listing)]))
            }
            Err(e) => {
                error!(error = %e, "screen enumeration failed");
                Ok(CallToolResult::error(vec![Content::text(failure_message(
                    "Failed to list screens",
                    &e,
                ))]))
            }
        }
    }

    /// Captures a screenshot of the requested screen
    ///
    /// Invokes the platform's native capture utility, post-processes the
    /// result where the screen's policy demands it, and returns the image
    /// inline as base64-encoded PNG. Requesting a screen id that does not
    /// exist captures the primary display instead of failing.
    ///
    /// # Parameters
    ///
    /// - `screenId` (optional): Screen to capture per `list_screens`
    ///   (default: 1)
    /// - `timeout` (optional): Milliseconds before the capture command is
    ///   aborted; 0 or absent runs unbounded
    /// - `width`, `height`, `fullPage`, `waitForSelector` (optional):
    ///   accepted for agent compatibility, not applied to screen capture
    ///
    /// # Returns
    ///
    /// A `CallToolResult` with a short text confirmation block followed by
    /// an inline `image/png` content block. On failure a single text block
    /// describes what went wrong and how to remediate it.
    #[tool(description = "Capture a screenshot of a screen and return it as a base64 PNG image")]
    pub async fn take_screenshot(
        &self,
        Parameters(params): Parameters<TakeScreenshotParams>,
    ) -> Result<CallToolResult, McpError> {
        let opts = CaptureOptions::resolve(params.screen_id, params.timeout);

        match self.engine.capture(&opts).await {
            Ok(encoded) => Ok(CallToolResult::success(vec![
                Content::text(format!("Screenshot captured from screen {}", opts.screen_id)),
                Content::image(encoded, "image/png"),
            ])),
            Err(e) => {
                error!(screen_id = opts.screen_id, error = %e, "screenshot capture failed");
                Ok(CallToolResult::error(vec![Content::text(failure_message(
                    "Failed to take screenshot",
                    &e,
                ))]))
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for ScreengrabServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Screen capture server. Use list_screens to discover capturable \
                 screens, then take_screenshot with an optional screenId to capture \
                 one as a base64 PNG image."
                    .to_string(),
            ),
            ..ServerInfo::default()
        }
    }
}
