//! Gesture templates and the standard catalog.
//!
//! A `UnitGesture` is a predicate over a single `HandShape`; its score
//! against a pattern buffer is the number of buffered shapes it accepts.
//! Continuous gestures hold while their score stays high, discrete gestures
//! are chains of unit gestures that must be satisfied in order.

use super::geometry::{PalmOrientation, ThumbElevation};
use super::pattern::{HandPatternBuffer, HandShape};
use super::skeleton::Hand;

/// Template code meaning "don't care" for the thumb / hand-tip predicates.
pub const IRRELEVANT: i8 = -1;

// ── Unit gesture ───────────────────────────────────────────

/// Predicate template over a hand shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitGesture {
    /// 1 extended, 0 tucked, -1 irrelevant.
    pub thumb: i8,
    /// 1 open, 0 closed, -1 irrelevant.
    pub hand_tip: i8,
    pub palm: Option<PalmOrientation>,
    pub elevation: Option<ThumbElevation>,
}

impl UnitGesture {
    /// Accepts every shape.
    pub const ANY: UnitGesture = UnitGesture {
        thumb: IRRELEVANT,
        hand_tip: IRRELEVANT,
        palm: None,
        elevation: None,
    };

    /// Template on thumb and hand tip only.
    pub const fn new(thumb: i8, hand_tip: i8) -> Self {
        Self {
            thumb,
            hand_tip,
            palm: None,
            elevation: None,
        }
    }

    pub fn with_elevation(mut self, elevation: ThumbElevation) -> Self {
        self.elevation = Some(elevation);
        self
    }

    pub fn with_palm(mut self, palm: PalmOrientation) -> Self {
        self.palm = Some(palm);
        self
    }

    /// Whether one shape satisfies every relevant predicate.
    pub fn accepts(&self, shape: &HandShape) -> bool {
        (self.thumb == IRRELEVANT || self.thumb == shape.thumb_code())
            && (self.hand_tip == IRRELEVANT || self.hand_tip == shape.hand_tip_code())
            && self.palm.map_or(true, |p| p == shape.palm)
            && self.elevation.map_or(true, |e| e == shape.elevation)
    }

    /// Number of buffered shapes this template accepts.
    pub fn matches(&self, buffer: &HandPatternBuffer) -> usize {
        buffer.iter().filter(|s| self.accepts(s)).count()
    }

    pub fn sexp(&self) -> String {
        format!(
            "(:thumb {} :tip {} :palm {} :elevation {})",
            self.thumb,
            self.hand_tip,
            self.palm.map_or("nil".to_string(), |p| format!(":{}", p.as_str())),
            self.elevation
                .map_or("nil".to_string(), |e| format!(":{}", e.as_str())),
        )
    }
}

// ── Roles and kinds ────────────────────────────────────────

/// Which hand a gesture is read from, relative to handedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandRole {
    Dominant,
    NonDominant,
}

impl HandRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dominant => "dominant",
            Self::NonDominant => "non-dominant",
        }
    }

    /// Physical hand for this role given the user's dominant hand.
    pub fn hand(&self, dominant: Hand) -> Hand {
        match self {
            Self::Dominant => dominant,
            Self::NonDominant => dominant.opposite(),
        }
    }
}

/// Continuous gesture names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContinuousKind {
    #[default]
    Neutral,
    Draw,
    Erase,
    RotateClockwise,
    RotateCounterClockwise,
    ZoomIn,
    ZoomOut,
}

impl ContinuousKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Draw => "draw",
            Self::Erase => "erase",
            Self::RotateClockwise => "rotate-clockwise",
            Self::RotateCounterClockwise => "rotate-counter-clockwise",
            Self::ZoomIn => "zoom-in",
            Self::ZoomOut => "zoom-out",
        }
    }

    /// Parse a gesture name; unknown names (sensor "unknown",
    /// "not-tracked", typos) read as `Neutral`.
    pub fn parse(s: &str) -> Self {
        match s {
            "draw" => Self::Draw,
            "erase" => Self::Erase,
            "rotate-clockwise" => Self::RotateClockwise,
            "rotate-counter-clockwise" => Self::RotateCounterClockwise,
            "zoom-in" => Self::ZoomIn,
            "zoom-out" => Self::ZoomOut,
            _ => Self::Neutral,
        }
    }
}

/// Discrete gesture names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscreteKind {
    Undo,
    Redo,
}

impl DiscreteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "undo" => Some(Self::Undo),
            "redo" => Some(Self::Redo),
            _ => None,
        }
    }
}

// ── Gestures ───────────────────────────────────────────────

/// A held gesture scored every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousGesture {
    pub kind: ContinuousKind,
    pub role: HandRole,
    pub trigger: UnitGesture,
    /// Matches in the last scored window.
    pub score: usize,
}

impl ContinuousGesture {
    pub fn new(kind: ContinuousKind, role: HandRole, trigger: UnitGesture) -> Self {
        Self {
            kind,
            role,
            trigger,
            score: 0,
        }
    }
}

/// An ordered chain of unit gestures that fires once when completed.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteGesture {
    pub kind: DiscreteKind,
    pub role: HandRole,
    pub steps: Vec<UnitGesture>,
    pub met: Vec<bool>,
    /// Cooling down after a fire; a fire while set is swallowed.
    pub timed_out: bool,
    /// Recognizer cycle of the last published fire.
    pub triggered_at: Option<u32>,
    /// Fired since the cycle counter last wrapped.
    pub triggered_recently: bool,
}

impl DiscreteGesture {
    pub fn new(kind: DiscreteKind, role: HandRole, steps: Vec<UnitGesture>) -> Self {
        let met = vec![false; steps.len()];
        Self {
            kind,
            role,
            steps,
            met,
            timed_out: false,
            triggered_at: None,
            triggered_recently: false,
        }
    }

    /// Index of the first unmet step, or 0 when every step is met.
    pub fn current_step(&self) -> usize {
        self.met.iter().position(|m| !m).unwrap_or(0)
    }

    pub fn reset_steps(&mut self) {
        self.met.iter_mut().for_each(|m| *m = false);
    }

    /// Advance the chain against one buffer.  Returns true when the last
    /// step completes; the chain is reset in that case.
    pub fn advance(&mut self, buffer: &HandPatternBuffer, threshold: usize) -> bool {
        if self.steps.is_empty() {
            return false;
        }

        let index = self.current_step();
        if self.steps[index].matches(buffer) > threshold {
            self.met[index] = true;
        } else if index > 0 && self.steps[index - 1].matches(buffer) <= threshold {
            self.reset_steps();
        }

        if self.met.iter().all(|m| *m) {
            self.reset_steps();
            return true;
        }
        false
    }

    pub fn sexp(&self) -> String {
        let met: Vec<&str> = self
            .met
            .iter()
            .map(|m| if *m { "t" } else { "nil" })
            .collect();
        format!(
            "(:name :{} :role :{} :steps {} :met ({}) :timed-out {} :recent {})",
            self.kind.as_str(),
            self.role.as_str(),
            self.steps.len(),
            met.join(" "),
            if self.timed_out { "t" } else { "nil" },
            if self.triggered_recently { "t" } else { "nil" },
        )
    }
}

// ── Catalog ────────────────────────────────────────────────

/// Every gesture the recognizer scores, in evaluation order.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureCatalog {
    pub continuous: Vec<ContinuousGesture>,
    pub discrete: Vec<DiscreteGesture>,
}

impl GestureCatalog {
    /// The built-in drawing gesture set for a user with the given
    /// dominant hand.
    pub fn standard(dominant: Hand) -> Self {
        use ContinuousKind as C;
        use HandRole::{Dominant, NonDominant};
        use ThumbElevation as E;

        let continuous = vec![
            ContinuousGesture::new(C::Neutral, Dominant, UnitGesture::new(0, 0)),
            ContinuousGesture::new(C::Neutral, NonDominant, UnitGesture::new(0, 0)),
            ContinuousGesture::new(C::Draw, Dominant, UnitGesture::new(0, 1)),
            ContinuousGesture::new(C::Erase, Dominant, UnitGesture::new(1, 1)),
            ContinuousGesture::new(
                C::RotateClockwise,
                NonDominant,
                UnitGesture::new(1, 0).with_elevation(E::Left),
            ),
            ContinuousGesture::new(
                C::RotateCounterClockwise,
                NonDominant,
                UnitGesture::new(1, 0).with_elevation(E::Right),
            ),
            ContinuousGesture::new(
                C::ZoomIn,
                NonDominant,
                UnitGesture::new(1, 0).with_elevation(E::Up),
            ),
            ContinuousGesture::new(
                C::ZoomOut,
                NonDominant,
                UnitGesture::new(1, 0).with_elevation(E::Down),
            ),
        ];

        // Thumb pointing across the body.
        let inward = match dominant {
            Hand::Right => E::Left,
            Hand::Left => E::Right,
        };
        let discrete = vec![
            DiscreteGesture::new(
                DiscreteKind::Undo,
                Dominant,
                vec![
                    UnitGesture::new(1, 0).with_elevation(inward),
                    UnitGesture::new(1, 0).with_elevation(E::Down),
                ],
            ),
            DiscreteGesture::new(
                DiscreteKind::Redo,
                Dominant,
                vec![
                    UnitGesture::new(1, 0).with_elevation(inward),
                    UnitGesture::new(1, 0).with_elevation(E::Up),
                ],
            ),
        ];

        Self {
            continuous,
            discrete,
        }
    }

    pub fn discrete_gesture(&self, kind: DiscreteKind) -> Option<&DiscreteGesture> {
        self.discrete.iter().find(|g| g.kind == kind)
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
fn fill(buf: &mut HandPatternBuffer, n: usize, shape: HandShape) {
    for _ in 0..n {
        buf.push(shape);
    }
}
