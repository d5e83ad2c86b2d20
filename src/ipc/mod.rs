//! S-expression command protocol.
//!
//! - `dispatch`: message parsing, handlers and plist helpers
//! - `replay`: the per-stream session and line-oriented replay

pub mod dispatch;
pub mod replay;

pub use dispatch::{format_event, handle_message};
pub use replay::{replay, ReplayStats, Session};
