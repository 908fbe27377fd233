//! screengrab-mcp: Cross-platform screen capture MCP server
//!
//! Exposes `list_screens` and `take_screenshot` tools over the MCP stdio
//! transport, shelling out to each platform's native capture utility.

use std::sync::Arc;

use anyhow::Result;
use rmcp::{ServiceExt, transport::stdio};
use screengrab_mcp::{
    capture::CaptureEngine, display::DisplayEnumerator, mcp::ScreengrabServer,
    util::temp_files::TempFileManager,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    // Respects RUST_LOG environment variable
    // Default level: info
    // Logs go to stderr; stdout carries the MCP stdio transport.
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("screengrab_mcp=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .init();

    info!("screengrab-mcp server starting...");
    info!("Protocol: Model Context Protocol (MCP)");
    info!("Transport: stdio");

    let temp_files = Arc::new(TempFileManager::new());
    info!("Temp file manager initialized");

    let engine = Arc::new(CaptureEngine::new(
        DisplayEnumerator::new(),
        Arc::clone(&temp_files),
    ));
    let server = ScreengrabServer::new(DisplayEnumerator::new(), engine);

    info!("Initializing stdio transport...");

    // This handles MCP protocol communication via stdin/stdout.
    let service = server.serve(stdio()).await?;

    info!("screengrab-mcp server initialized successfully");
    info!("Waiting for MCP requests...");

    // Blocks until the client disconnects or the transport shuts down.
    service.waiting().await?;

    // Sweep any artifacts that survived their request (should be none).
    temp_files.cleanup_all();
    info!("screengrab-mcp server shutting down");
    Ok(())
}
