//! Config - ctask settings
//!
//! - `ctask.rs` - CtaskConfig (file + environment layering)
//! - `runtime.rs` - runtime backend kind and its default socket

mod ctask;
mod runtime;

pub use ctask::{CtaskConfig, CTASK_CONFIG_FILE, DEFAULT_FIFO_DIR, DEFAULT_TIMEOUT_SECS};
pub use runtime::ContainerRuntime;
