//! # ctask-foundation
//!
//! Foundation layer for ctask:
//! - Error: the shared error type and `Result` alias
//! - Config: layered settings (global file, project file, environment)
//! - Storage: JSON file store backing the config layer
//! - Pid file: atomic pid reporting

pub mod config;
pub mod error;
pub mod pidfile;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{
    ContainerRuntime, CtaskConfig, CTASK_CONFIG_FILE, DEFAULT_FIFO_DIR, DEFAULT_TIMEOUT_SECS,
};

// ============================================================================
// Storage
// ============================================================================
pub use storage::JsonStore;

// ============================================================================
// Pid file
// ============================================================================
pub use pidfile::write_pid_file;
