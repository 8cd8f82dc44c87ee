//! Core for toolbridge.
//!
//! This crate provides:
//! - Configuration loading
//! - The event type streamed to clients
//! - The tool-calling orchestration loop

pub mod config;
pub mod error;
pub mod event;
pub mod orchestrator;
pub mod system_prompt;

pub use config::{Config, ConfigOverrides};
pub use error::{ConfigError, ConfigResult, CoreError};
pub use event::{EventSink, StreamEvent};
pub use orchestrator::{LoopConfig, LoopOutcome, LoopState, Orchestrator};
