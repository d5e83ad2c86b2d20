//! Body skeleton data as delivered by the depth sensor.
//!
//! Models the four hand joints per side that gesture classification uses,
//! plus the sensor's own coarse open/closed hand signal.  A `BodyFrame`
//! is owned transiently by the caller for one tick and never retained.

use std::collections::BTreeMap;

// ── Hand enum ──────────────────────────────────────────────

/// Which hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parse "left" / "right".
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// The other hand.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

// ── Joint definitions ──────────────────────────────────────

/// Per-hand joints tracked by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Wrist,
    Hand,
    HandTip,
    Thumb,
}

/// Number of joints per hand.
pub const JOINT_COUNT: usize = 4;

impl Joint {
    /// Convert joint enum to array index (0-3).
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// String representation for the command protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wrist => "wrist",
            Self::Hand => "hand",
            Self::HandTip => "hand-tip",
            Self::Thumb => "thumb",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wrist" => Some(Self::Wrist),
            "hand" => Some(Self::Hand),
            "hand-tip" => Some(Self::HandTip),
            "thumb" => Some(Self::Thumb),
            _ => None,
        }
    }

    pub fn all() -> [Joint; JOINT_COUNT] {
        [Self::Wrist, Self::Hand, Self::HandTip, Self::Thumb]
    }
}

/// Position of one named joint for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSample {
    pub joint: Joint,
    pub position: [f32; 3],
}

// ── Sensor hand state ──────────────────────────────────────

/// The sensor's native hand classification.
///
/// Only `Closed` matters to the core: it triggers the foreshortening
/// correction of the hand-length estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorHandState {
    #[default]
    Unknown,
    NotTracked,
    Open,
    Closed,
    Lasso,
}

impl SensorHandState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::NotTracked => "not-tracked",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Lasso => "lasso",
        }
    }

    /// Parse a state name; anything unrecognised is `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "not-tracked" => Self::NotTracked,
            "open" => Self::Open,
            "closed" => Self::Closed,
            "lasso" => Self::Lasso,
            _ => Self::Unknown,
        }
    }
}

// ── Hand skeleton ──────────────────────────────────────────

/// Joint positions of one hand for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandSkeleton {
    /// Which hand this skeleton represents.
    pub hand: Hand,
    /// Joint positions indexed by `Joint`.
    pub joints: [[f32; 3]; JOINT_COUNT],
    /// Sensor-native open/closed signal.
    pub state: SensorHandState,
}

impl HandSkeleton {
    /// Create a skeleton with every joint at the origin.
    pub fn new(hand: Hand) -> Self {
        Self {
            hand,
            joints: [[0.0; 3]; JOINT_COUNT],
            state: SensorHandState::Unknown,
        }
    }

    pub fn position(&self, joint: Joint) -> [f32; 3] {
        self.joints[joint.index()]
    }

    pub fn set_position(&mut self, joint: Joint, position: [f32; 3]) {
        self.joints[joint.index()] = position;
    }

    /// Apply a batch of samples.
    pub fn apply(&mut self, samples: &[JointSample]) {
        for sample in samples {
            self.set_position(sample.joint, sample.position);
        }
    }
}

// ── Body frame ─────────────────────────────────────────────

/// Both hands of one tracked body for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyFrame {
    pub body_id: u64,
    pub tracked: bool,
    pub left: HandSkeleton,
    pub right: HandSkeleton,
}

impl BodyFrame {
    pub fn new(body_id: u64) -> Self {
        Self {
            body_id,
            tracked: true,
            left: HandSkeleton::new(Hand::Left),
            right: HandSkeleton::new(Hand::Right),
        }
    }

    /// Get the skeleton for a given hand.
    pub fn hand(&self, hand: Hand) -> &HandSkeleton {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    pub fn hand_mut(&mut self, hand: Hand) -> &mut HandSkeleton {
        match hand {
            Hand::Left => &mut self.left,
            Hand::Right => &mut self.right,
        }
    }
}

// ── Joint source ───────────────────────────────────────────

/// Supplier of per-body skeleton frames for the current tick.
pub trait JointSource {
    /// Body ids known to the source this tick, in a stable order.
    fn bodies(&self) -> Vec<u64>;
    /// Whether the body is currently tracked.
    fn is_tracked(&self, body_id: u64) -> bool;
    /// Current frame for a body, if any.
    fn frame(&self, body_id: u64) -> Option<BodyFrame>;
}

/// A joint source holding the most recent frame per body.
#[derive(Debug, Default)]
pub struct LatestFrames {
    frames: BTreeMap<u64, BodyFrame>,
}

impl LatestFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored frame for `frame.body_id`.
    pub fn insert(&mut self, frame: BodyFrame) {
        self.frames.insert(frame.body_id, frame);
    }

    /// Forget a body (it left the sensor's view).
    pub fn remove(&mut self, body_id: u64) -> bool {
        self.frames.remove(&body_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl JointSource for LatestFrames {
    fn bodies(&self) -> Vec<u64> {
        self.frames.keys().copied().collect()
    }

    fn is_tracked(&self, body_id: u64) -> bool {
        self.frames.get(&body_id).map(|f| f.tracked).unwrap_or(false)
    }

    fn frame(&self, body_id: u64) -> Option<BodyFrame> {
        self.frames.get(&body_id).cloned()
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_indices() {
        assert_eq!(Joint::Wrist.index(), 0);
        assert_eq!(Joint::Thumb.index(), 3);
        assert_eq!(Joint::all().len(), JOINT_COUNT);
    }

    #[test]
    fn test_joint_names_roundtrip() {
        for joint in Joint::all() {
            assert_eq!(Joint::parse(joint.as_str()), Some(joint));
        }
        assert_eq!(Joint::parse("elbow"), None);
    }

    #[test]
    fn test_hand_parse_and_opposite() {
        assert_eq!(Hand::parse("left"), Some(Hand::Left));
        assert_eq!(Hand::parse("up"), None);
        assert_eq!(Hand::Left.opposite(), Hand::Right);
        assert_eq!(Hand::Right.as_str(), "right");
    }

    #[test]
    fn test_sensor_state_unknown_fallback() {
        assert_eq!(SensorHandState::parse("closed"), SensorHandState::Closed);
        assert_eq!(SensorHandState::parse("fist"), SensorHandState::Unknown);
    }

    #[test]
    fn test_apply_samples() {
        let mut skel = HandSkeleton::new(Hand::Right);
        skel.apply(&[
            JointSample { joint: Joint::Hand, position: [1.0, 2.0, 3.0] },
            JointSample { joint: Joint::Thumb, position: [0.5, 0.0, 0.0] },
        ]);
        assert_eq!(skel.position(Joint::Hand), [1.0, 2.0, 3.0]);
        assert_eq!(skel.position(Joint::Thumb), [0.5, 0.0, 0.0]);
        assert_eq!(skel.position(Joint::Wrist), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_latest_frames_source() {
        let mut source = LatestFrames::new();
        let mut lost = BodyFrame::new(7);
        lost.tracked = false;
        source.insert(BodyFrame::new(3));
        source.insert(lost);

        assert_eq!(source.bodies(), vec![3, 7]);
        assert!(source.is_tracked(3));
        assert!(!source.is_tracked(7));
        assert!(!source.is_tracked(99));
        assert!(source.frame(3).is_some());
        assert!(source.remove(7));
        assert_eq!(source.len(), 1);
    }
}
