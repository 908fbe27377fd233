//! Shared utilities
//!
//! - `temp_files`: temporary artifact lifecycle management

pub mod temp_files;
