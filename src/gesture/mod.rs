//! Skeleton-to-gesture pipeline.
//!
//! - `skeleton`: joint data model and the `JointSource` seam
//! - `geometry`: per-hand metrics and hand-length calibration
//! - `pattern`: hand shapes and rolling per-hand windows
//! - `matcher`: gesture templates and the standard catalog
//! - `recognizer`: per-frame scoring, selection and discrete hand-off

pub mod geometry;
pub mod matcher;
pub mod pattern;
pub mod recognizer;
pub mod skeleton;

pub use matcher::{ContinuousKind, DiscreteKind, GestureCatalog, HandRole, UnitGesture};
pub use pattern::{HandHistory, HandPatternBuffer, HandShape};
pub use recognizer::{PatternWindow, Recognizer, RecognizerConfig};
pub use skeleton::{BodyFrame, Hand, HandSkeleton, Joint, JointSource, LatestFrames, SensorHandState};
