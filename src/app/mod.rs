//! Application module
//!
//! This module contains the host-facing orchestrator and its configuration.

pub mod config;
mod state;

pub use config::{Action, CaptureConfig, Key, KeyChord, Modifiers, ShortcutConfig};
pub use state::{AllowAll, CaptureMode, CaptureOptions, PermissionGate, ScreenshotApp};
