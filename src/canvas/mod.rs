//! Drawing side of the pipeline.
//!
//! - `ledger`: points, strokes and undo history
//! - `surface`: ledger plus host render handles and stroke colour
//! - `machine`: gesture-driven stroke and actuator processes
//! - `sinks`: collaborator traits and a recording host

pub mod ledger;
pub mod machine;
pub mod sinks;
pub mod surface;

pub use ledger::{PointState, Stroke, StrokeId, StrokeLedger};
pub use machine::{GestureStateMachine, MachineConfig, ProcessState, Smoothing, TickInput};
pub use sinks::{CanvasHost, Color, IndicatorFlags, PointHandle, RecordingSink, SinkEvent};
pub use surface::Canvas;
