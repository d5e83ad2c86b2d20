//! Joint-derived hand metrics and hand-length calibration.
//!
//! Everything here is a pure function of joint positions and the running
//! hand-length estimate.  Axis convention follows the sensor camera space
//! as seen by the renderer: +Y up, +X right, and the sensor looks along +Z,
//! so a palm facing the sensor has its normal along -Z ("backward").

use super::skeleton::{Hand, HandSkeleton, Joint, SensorHandState};

/// Threshold ratio (of hand length) for "thumb extended" and "tip open".
pub const OPENNESS_RATIO: f64 = 0.7304;

/// The thumb reference point sits `hand_length / 2.3` along hand -> tip.
pub const THUMB_REFERENCE_DIVISOR: f64 = 2.3;

/// Palm faces the sensor below this angle to the backward axis.
pub const PALM_TOWARDS_MAX_DEG: f32 = 60.0;

/// Palm faces away above this angle to the backward axis.
pub const PALM_AWAY_MIN_DEG: f32 = 120.0;

/// Thumb points along a cardinal axis below this angle.
pub const ELEVATION_MAX_DEG: f32 = 60.0;

/// Angles within this many degrees of a bound count as lying on it.
pub const ANGLE_TOLERANCE_DEG: f32 = 1e-3;

/// Hand-length estimate before any calibration sample.
pub const DEFAULT_HAND_LENGTH: f64 = 0.8215;

/// Measured hand->tip distance shrinks by this factor when the fist is closed.
pub const CLOSED_HAND_RATIO: f64 = 0.6814;

/// Upper bound on the running-average sample count.
pub const MAX_LENGTH_SAMPLES: u32 = 9999;

const UP: [f32; 3] = [0.0, 1.0, 0.0];
const DOWN: [f32; 3] = [0.0, -1.0, 0.0];
const LEFT: [f32; 3] = [-1.0, 0.0, 0.0];
const RIGHT: [f32; 3] = [1.0, 0.0, 0.0];
const BACK: [f32; 3] = [0.0, 0.0, -1.0];

// ── Classification outputs ─────────────────────────────────

/// Which way the palm faces relative to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PalmOrientation {
    Towards,
    Away,
    Neither,
}

impl PalmOrientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Towards => "towards",
            Self::Away => "away",
            Self::Neither => "neither",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "towards" => Some(Self::Towards),
            "away" => Some(Self::Away),
            "neither" => Some(Self::Neither),
            _ => None,
        }
    }
}

/// Direction of the extended thumb.
///
/// `Closed` is assigned when the thumb is not extended at all; `Other`
/// covers extended thumbs outside every cardinal cone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbElevation {
    Up,
    Down,
    Left,
    Right,
    Closed,
    Other,
}

impl ThumbElevation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Closed => "closed",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "closed" => Some(Self::Closed),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

// ── Vector helpers ─────────────────────────────────────────

pub fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn length(v: [f32; 3]) -> f32 {
    dot(v, v).sqrt()
}

/// Euclidean distance between two 3D points.
pub fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    length(sub(b, a))
}

/// Unsigned angle between two vectors in degrees.
///
/// Returns 0 when either vector is degenerate.
pub fn angle_deg(a: [f32; 3], b: [f32; 3]) -> f32 {
    let denom = (dot(a, a) as f64 * dot(b, b) as f64).sqrt();
    if denom < 1e-15 {
        return 0.0;
    }
    let cos = (dot(a, b) as f64 / denom).clamp(-1.0, 1.0);
    cos.acos().to_degrees() as f32
}

/// Step from `current` toward `target` by at most `max_delta`, never
/// overshooting the target.
pub fn move_towards(current: [f32; 3], target: [f32; 3], max_delta: f32) -> [f32; 3] {
    let delta = sub(target, current);
    let dist = length(delta);
    if dist <= max_delta || dist == 0.0 {
        return target;
    }
    let scale = max_delta / dist;
    [
        current[0] + delta[0] * scale,
        current[1] + delta[1] * scale,
        current[2] + delta[2] * scale,
    ]
}

// ── Hand metrics ───────────────────────────────────────────

/// Whether the thumb sticks out from the palm.
pub fn thumb_extended(skeleton: &HandSkeleton, hand_length: f64) -> bool {
    let hand = skeleton.position(Joint::Hand);
    let tip = skeleton.position(Joint::HandTip);
    let thumb = skeleton.position(Joint::Thumb);

    let reference = move_towards(hand, tip, (hand_length / THUMB_REFERENCE_DIVISOR) as f32);
    distance(reference, thumb) as f64 > OPENNESS_RATIO * hand_length
}

/// Whether the fingers are stretched out (hand tip far from the hand joint).
pub fn hand_tip_open(skeleton: &HandSkeleton, hand_length: f64) -> bool {
    let hand = skeleton.position(Joint::Hand);
    let tip = skeleton.position(Joint::HandTip);
    distance(hand, tip) as f64 > OPENNESS_RATIO * hand_length
}

/// Normal out of the palm.  Operand order flips for the left hand so both
/// hands' normals point out of the palm side.
pub fn palm_normal(skeleton: &HandSkeleton) -> [f32; 3] {
    let hand = skeleton.position(Joint::Hand);
    let to_thumb = sub(skeleton.position(Joint::Thumb), hand);
    let to_tip = sub(skeleton.position(Joint::HandTip), hand);
    match skeleton.hand {
        Hand::Right => cross(to_thumb, to_tip),
        Hand::Left => cross(to_tip, to_thumb),
    }
}

/// Classify a palm normal against the sensor's backward axis.
pub fn palm_orientation(normal: [f32; 3]) -> PalmOrientation {
    let angle = angle_deg(normal, BACK);
    if below(angle, PALM_TOWARDS_MAX_DEG) {
        PalmOrientation::Towards
    } else if above(angle, PALM_AWAY_MIN_DEG) {
        PalmOrientation::Away
    } else {
        PalmOrientation::Neither
    }
}

/// Classify the hand -> thumb direction.
///
/// Cones are tested up, down, left, right; a later match overrides an
/// earlier one, so horizontal wins where cones overlap.
pub fn thumb_elevation(hand: [f32; 3], thumb: [f32; 3]) -> ThumbElevation {
    let dir = sub(thumb, hand);
    let mut elevation = ThumbElevation::Other;
    for (axis, label) in [
        (UP, ThumbElevation::Up),
        (DOWN, ThumbElevation::Down),
        (LEFT, ThumbElevation::Left),
        (RIGHT, ThumbElevation::Right),
    ] {
        if below(angle_deg(dir, axis), ELEVATION_MAX_DEG) {
            elevation = label;
        }
    }
    elevation
}

/// Bounds are exclusive: an angle on the bound is outside.
fn below(angle: f32, bound: f32) -> bool {
    angle < bound - ANGLE_TOLERANCE_DEG
}

fn above(angle: f32, bound: f32) -> bool {
    angle > bound + ANGLE_TOLERANCE_DEG
}

// ── Hand length calibration ────────────────────────────────

/// Running average of the user's hand length, fed once per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLengthEstimator {
    length: f64,
    count: u32,
}

impl Default for HandLengthEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_HAND_LENGTH)
    }
}

impl HandLengthEstimator {
    /// Start from `initial` weighted as a single sample.
    pub fn new(initial: f64) -> Self {
        Self {
            length: initial,
            count: 1,
        }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Fold one raw sample into the average and return the new estimate.
    /// Non-finite samples are ignored.
    pub fn update(&mut self, sample: f64) -> f64 {
        if !sample.is_finite() {
            return self.length;
        }
        let n = self.count as f64;
        self.length = (self.length * n + sample) / (n + 1.0);
        if self.count < MAX_LENGTH_SAMPLES {
            self.count += 1;
        }
        self.length
    }

    /// Calibration sample from one hand: hand -> tip distance, corrected
    /// for foreshortening when the sensor reports a closed fist.
    pub fn sample_from(skeleton: &HandSkeleton) -> f64 {
        let raw = distance(
            skeleton.position(Joint::Hand),
            skeleton.position(Joint::HandTip),
        ) as f64;
        if skeleton.state == SensorHandState::Closed {
            raw / CLOSED_HAND_RATIO
        } else {
            raw
        }
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
fn make_hand(hand: Hand, tip: [f32; 3], thumb: [f32; 3]) -> HandSkeleton {
    let mut skel = HandSkeleton::new(hand);
    skel.set_position(Joint::Hand, [0.0, 0.0, 0.0]);
    skel.set_position(Joint::HandTip, tip);
    skel.set_position(Joint::Thumb, thumb);
    skel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_and_angle() {
        assert!((distance([0.0, 0.0, 0.0], [3.0, 4.0, 0.0]) - 5.0).abs() < 1e-6);
        assert!((angle_deg(UP, RIGHT) - 90.0).abs() < 1e-4);
        assert!((angle_deg(UP, DOWN) - 180.0).abs() < 1e-4);
        assert_eq!(angle_deg([0.0; 3], UP), 0.0);
    }

    #[test]
    fn test_move_towards_clamps_at_target() {
        let p = move_towards([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], 0.25);
        assert!((p[1] - 0.25).abs() < 1e-6);
        let q = move_towards([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], 5.0);
        assert_eq!(q, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_hand_tip_open_threshold() {
        // threshold = 0.7304 * 1.0
        let open = make_hand(Hand::Right, [0.0, 0.8, 0.0], [0.0, 0.1, 0.0]);
        let closed = make_hand(Hand::Right, [0.0, 0.7, 0.0], [0.0, 0.1, 0.0]);
        assert!(hand_tip_open(&open, 1.0));
        assert!(!hand_tip_open(&closed, 1.0));
    }

    #[test]
    fn test_thumb_extended_uses_reference_point() {
        // Reference point is 1/2.3 ≈ 0.4348 up the hand -> tip line.
        let tucked = make_hand(Hand::Right, [0.0, 1.0, 0.0], [0.3, 0.4, 0.0]);
        assert!(!thumb_extended(&tucked, 1.0));

        let out = make_hand(Hand::Right, [0.0, 1.0, 0.0], [0.8, 0.4, 0.0]);
        assert!(thumb_extended(&out, 1.0));
    }

    #[test]
    fn test_thumb_reference_clamped_for_short_hand() {
        // Tip closer than hand_length / 2.3: reference sits on the tip.
        let skel = make_hand(Hand::Right, [0.0, 0.1, 0.0], [0.0, 0.9, 0.0]);
        // distance(tip, thumb) = 0.8 > 0.7304
        assert!(thumb_extended(&skel, 1.0));
    }

    #[test]
    fn test_palm_normal_flips_for_left_hand() {
        let right = make_hand(Hand::Right, [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]);
        let left = make_hand(Hand::Left, [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]);
        let nr = palm_normal(&right);
        let nl = palm_normal(&left);
        assert_eq!(nr, [0.0, 0.0, 1.0]);
        assert_eq!(nl, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_palm_orientation_bands() {
        assert_eq!(palm_orientation([0.0, 0.0, -1.0]), PalmOrientation::Towards);
        assert_eq!(palm_orientation([0.0, 0.0, 1.0]), PalmOrientation::Away);
        assert_eq!(palm_orientation([1.0, 0.0, 0.0]), PalmOrientation::Neither);
    }

    #[test]
    fn test_palm_orientation_near_boundaries() {
        let at = |deg: f32| {
            let r = deg.to_radians();
            [r.sin(), 0.0, -r.cos()]
        };
        assert_eq!(palm_orientation(at(59.0)), PalmOrientation::Towards);
        assert_eq!(palm_orientation(at(61.0)), PalmOrientation::Neither);
        assert_eq!(palm_orientation(at(119.0)), PalmOrientation::Neither);
        assert_eq!(palm_orientation(at(121.0)), PalmOrientation::Away);
    }

    #[test]
    fn test_palm_orientation_on_boundaries_is_neither() {
        let at = |deg: f32| {
            let r = deg.to_radians();
            [r.sin(), 0.0, -r.cos()]
        };
        assert_eq!(palm_orientation(at(60.0)), PalmOrientation::Neither);
        assert_eq!(palm_orientation(at(120.0)), PalmOrientation::Neither);
    }

    #[test]
    fn test_thumb_elevation_on_boundary_is_other() {
        // Exactly 60° from up and 90° from every horizontal axis.
        let o = [0.0, 0.0, 0.0];
        assert_eq!(thumb_elevation(o, [0.0, 1.0, 3f32.sqrt()]), ThumbElevation::Other);
        assert_eq!(thumb_elevation(o, [0.0, -1.0, 3f32.sqrt()]), ThumbElevation::Other);
        // Just inside the cone.
        assert_eq!(thumb_elevation(o, [0.0, 1.0, 1.7]), ThumbElevation::Up);
    }

    #[test]
    fn test_thumb_elevation_cardinals() {
        let o = [0.0, 0.0, 0.0];
        assert_eq!(thumb_elevation(o, [0.0, 1.0, 0.0]), ThumbElevation::Up);
        assert_eq!(thumb_elevation(o, [0.0, -1.0, 0.0]), ThumbElevation::Down);
        assert_eq!(thumb_elevation(o, [-1.0, 0.0, 0.0]), ThumbElevation::Left);
        assert_eq!(thumb_elevation(o, [1.0, 0.0, 0.0]), ThumbElevation::Right);
        assert_eq!(thumb_elevation(o, [0.0, 0.0, 1.0]), ThumbElevation::Other);
    }

    #[test]
    fn test_thumb_elevation_overlap_prefers_horizontal() {
        // 45° between up and right lies in both cones.
        let e = thumb_elevation([0.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        assert_eq!(e, ThumbElevation::Right);
    }

    #[test]
    fn test_hand_length_running_average() {
        let mut est = HandLengthEstimator::default();
        assert_eq!(est.count(), 1);
        let len = est.update(1.0);
        assert!((len - 0.91075).abs() < 1e-9, "got {}", len);
        assert_eq!(est.count(), 2);
    }

    #[test]
    fn test_hand_length_count_is_capped() {
        let mut est = HandLengthEstimator::new(1.0);
        for _ in 0..(MAX_LENGTH_SAMPLES + 50) {
            est.update(1.0);
        }
        assert_eq!(est.count(), MAX_LENGTH_SAMPLES);
        // A new sample still moves the estimate by 1/10000 of the gap.
        let len = est.update(2.0);
        assert!((len - (1.0 + 1.0 / 10_000.0)).abs() < 1e-9);
    }

    #[test]
    fn test_hand_length_ignores_non_finite_samples() {
        let mut est = HandLengthEstimator::default();
        assert_eq!(est.update(f64::INFINITY), DEFAULT_HAND_LENGTH);
        assert_eq!(est.update(f64::NAN), DEFAULT_HAND_LENGTH);
        assert_eq!(est.count(), 1);
        assert!((est.update(1.0) - 0.91075).abs() < 1e-9);
    }

    #[test]
    fn test_closed_hand_sample_correction() {
        let mut skel = make_hand(Hand::Right, [0.0, 0.6814, 0.0], [0.0, 0.0, 0.0]);
        assert!((HandLengthEstimator::sample_from(&skel) - 0.6814).abs() < 1e-6);
        skel.state = SensorHandState::Closed;
        assert!((HandLengthEstimator::sample_from(&skel) - 1.0).abs() < 1e-6);
    }
}
