//! screengrab-mcp: screen capture MCP server for tool-calling agents
//!
//! This library exposes two operations over the Model Context Protocol:
//! enumerating capturable screens and capturing a screenshot of a chosen
//! screen. Capture shells out to the OS-native utility for the current
//! platform (macOS `screencapture`, Windows PowerShell clipboard capture,
//! Linux ImageMagick `import`) and returns base64-encoded PNG bytes.

pub mod capture;
pub mod display;
pub mod error;
pub mod mcp;
pub mod model;
pub mod platform;
pub mod util;
