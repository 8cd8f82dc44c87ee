//! Shared utilities for toolbridge.
//!
//! This crate provides common utilities used across the toolbridge workspace:
//! - Logging setup with tracing
//! - Lexical path normalization and project root discovery
//! - Case-insensitive wildcard matching for file names

pub mod log;
pub mod path;
pub mod wildcard;

pub use log::{LogConfig, LogLevel};
