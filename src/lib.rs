//! Gesture-driven 3D drawing core.
//!
//! Skeleton frames from a depth sensor are classified into hand gestures,
//! which drive a stroke process (draw, erase, undo, redo) on the dominant
//! hand and an actuator process (zoom) on the other.

pub mod app;
pub mod canvas;
pub mod config;
pub mod gesture;
pub mod ipc;

pub use app::AppContext;
pub use config::{AppConfig, ConfigError};
