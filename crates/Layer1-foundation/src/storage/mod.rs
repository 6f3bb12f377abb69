//! Storage module for ctask
//!
//! - `json`: JSON file store used by the config layer

mod json;

pub use json::JsonStore;
