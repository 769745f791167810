//! Server module for Careflow
//!
//! # Module Structure
//!
//! - `config`: Configuration structures
//! - `loader`: Configuration loading from files and environment
//! - `init`: Shared state construction and the run loop

pub mod config;
mod init;
mod loader;

// Re-export public API
pub use init::{build_directory, run};
pub use loader::load_config;
