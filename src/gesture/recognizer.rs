//! Per-frame gesture recognition.
//!
//! Each frame both hands are classified into `HandShape`s and pushed into
//! their rolling windows.  Continuous gestures are scored over the long
//! window and the best one above threshold wins per hand role.  Discrete
//! gestures advance their step chains and, once complete, are published
//! for a single reader via `take_discrete`.
//!
//! Discrete cooldown: a published gesture is timed out until the cycle
//! counter next wraps, and cannot fire again in that span.

use tracing::{debug, info};

use super::geometry::{HandLengthEstimator, DEFAULT_HAND_LENGTH};
use super::matcher::{ContinuousKind, DiscreteKind, GestureCatalog, HandRole};
use super::pattern::{HandHistory, HandPatternBuffer, HandShape, CONTINUOUS_CAPACITY, QUICK_CAPACITY};
use super::skeleton::{BodyFrame, Hand};

// ── Config ─────────────────────────────────────────────────

/// Which rolling window discrete gestures are matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternWindow {
    #[default]
    Continuous,
    Quick,
}

impl PatternWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continuous => "continuous",
            Self::Quick => "quick",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "continuous" => Some(Self::Continuous),
            "quick" => Some(Self::Quick),
            _ => None,
        }
    }
}

/// Tuned recognition constants.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizerConfig {
    /// User's dominant hand.
    pub dominant_hand: Hand,
    /// A discrete step is met above this many matches.
    pub discrete_threshold: usize,
    /// A continuous gesture must score above this to be selected.
    pub continuous_threshold: usize,
    /// Cycle counter wraps back to 0 at this value.
    pub cycle_wrap: u32,
    /// Long window length (frames).
    pub continuous_window: usize,
    /// Short window length (frames).
    pub quick_window: usize,
    /// Window discrete gestures read.
    pub discrete_window: PatternWindow,
    /// Hand length assumed before calibration.
    pub initial_hand_length: f64,
    /// Hand whose hand->tip distance calibrates the hand length.
    pub calibration_hand: Hand,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            dominant_hand: Hand::Right,
            discrete_threshold: 15,
            continuous_threshold: 40,
            cycle_wrap: 1000,
            continuous_window: CONTINUOUS_CAPACITY,
            quick_window: QUICK_CAPACITY,
            discrete_window: PatternWindow::Continuous,
            initial_hand_length: DEFAULT_HAND_LENGTH,
            calibration_hand: Hand::Right,
        }
    }
}

// ── Recognizer ─────────────────────────────────────────────

pub struct Recognizer {
    pub config: RecognizerConfig,
    catalog: GestureCatalog,
    left: HandHistory,
    right: HandHistory,
    hand_length: HandLengthEstimator,
    /// `None` until the first frame.
    cycle: Option<u32>,
    dominant: ContinuousKind,
    non_dominant: ContinuousKind,
    /// Fired discrete gesture not yet taken by the reader.
    ready: Option<DiscreteKind>,
    frames: u64,
}

impl Default for Recognizer {
    fn default() -> Self {
        Self::new(RecognizerConfig::default())
    }
}

impl Recognizer {
    pub fn new(config: RecognizerConfig) -> Self {
        Self {
            catalog: GestureCatalog::standard(config.dominant_hand),
            left: HandHistory::new(config.continuous_window, config.quick_window),
            right: HandHistory::new(config.continuous_window, config.quick_window),
            hand_length: HandLengthEstimator::new(config.initial_hand_length),
            cycle: None,
            dominant: ContinuousKind::Neutral,
            non_dominant: ContinuousKind::Neutral,
            ready: None,
            frames: 0,
            config,
        }
    }

    /// Run one frame of recognition.
    pub fn recognize(&mut self, frame: &BodyFrame) {
        self.frames += 1;

        // Shapes use the estimate from before this frame's calibration.
        let length = self.hand_length.length();
        self.left.push(HandShape::from_skeleton(&frame.left, length));
        self.right.push(HandShape::from_skeleton(&frame.right, length));

        let cycle = self.advance_cycle();

        for dg in &mut self.catalog.discrete {
            let expired = matches!(dg.triggered_at, Some(at) if at >= cycle);
            if !dg.triggered_recently && dg.timed_out && expired {
                dg.timed_out = false;
                dg.triggered_at = None;
                debug!(gesture = dg.kind.as_str(), "discrete cooldown cleared");
            }
        }

        self.hand_length
            .update(HandLengthEstimator::sample_from(frame.hand(self.config.calibration_hand)));

        let dominant = self.config.dominant_hand;
        let window = self.config.discrete_window;
        let threshold = self.config.discrete_threshold;
        let mut fired = None;
        for (index, dg) in self.catalog.discrete.iter_mut().enumerate() {
            let buffer = window_of(&self.left, &self.right, dg.role.hand(dominant), window);
            if dg.advance(buffer, threshold) {
                fired = Some(index);
            }
        }

        for cg in &mut self.catalog.continuous {
            let buffer = window_of(
                &self.left,
                &self.right,
                cg.role.hand(dominant),
                PatternWindow::Continuous,
            );
            cg.score = cg.trigger.matches(buffer);
        }

        self.dominant = self.select(HandRole::Dominant);
        self.non_dominant = self.select(HandRole::NonDominant);

        if let Some(index) = fired {
            let dg = &mut self.catalog.discrete[index];
            if dg.timed_out {
                debug!(gesture = dg.kind.as_str(), cycle, "discrete gesture suppressed by cooldown");
            } else {
                dg.timed_out = true;
                dg.triggered_at = Some(cycle);
                dg.triggered_recently = true;
                self.ready = Some(dg.kind);
                debug!(gesture = dg.kind.as_str(), cycle, "discrete gesture fired");
            }
        }
    }

    /// Step the cycle counter, clearing "recent" flags when it wraps.
    fn advance_cycle(&mut self) -> u32 {
        let mut next = self.cycle.map_or(0, |c| c + 1);
        if next >= self.config.cycle_wrap {
            next = 0;
            for dg in &mut self.catalog.discrete {
                dg.triggered_recently = false;
            }
        }
        self.cycle = Some(next);
        next
    }

    /// Best-scoring continuous gesture for a role; ties keep catalog order.
    fn select(&self, role: HandRole) -> ContinuousKind {
        let mut best: Option<(usize, ContinuousKind)> = None;
        for cg in self.catalog.continuous.iter().filter(|g| g.role == role) {
            if cg.score > self.config.continuous_threshold
                && best.map_or(true, |(score, _)| cg.score > score)
            {
                best = Some((cg.score, cg.kind));
            }
        }
        best.map(|(_, kind)| kind).unwrap_or(ContinuousKind::Neutral)
    }

    /// Hand off the most recent fired discrete gesture, once.
    pub fn take_discrete(&mut self) -> Option<DiscreteKind> {
        self.ready.take()
    }

    pub fn peek_discrete(&self) -> Option<DiscreteKind> {
        self.ready
    }

    // ── Accessors ─────────────────────────────────────────

    pub fn dominant_gesture(&self) -> ContinuousKind {
        self.dominant
    }

    pub fn non_dominant_gesture(&self) -> ContinuousKind {
        self.non_dominant
    }

    /// Continuous gesture of a physical hand.
    pub fn hand_gesture(&self, hand: Hand) -> ContinuousKind {
        if hand == self.config.dominant_hand {
            self.dominant
        } else {
            self.non_dominant
        }
    }

    pub fn left_hand_gesture(&self) -> ContinuousKind {
        self.hand_gesture(Hand::Left)
    }

    pub fn right_hand_gesture(&self) -> ContinuousKind {
        self.hand_gesture(Hand::Right)
    }

    pub fn hand_length(&self) -> f64 {
        self.hand_length.length()
    }

    /// Current cycle (0 before the first frame).
    pub fn cycle(&self) -> u32 {
        self.cycle.unwrap_or(0)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn history(&self, hand: Hand) -> &HandHistory {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    pub fn catalog(&self) -> &GestureCatalog {
        &self.catalog
    }

    pub fn dominant_hand(&self) -> Hand {
        self.config.dominant_hand
    }

    /// Whether a discrete gesture would currently be swallowed.
    pub fn is_cooling_down(&self, kind: DiscreteKind) -> bool {
        self.catalog
            .discrete_gesture(kind)
            .map(|g| g.timed_out)
            .unwrap_or(false)
    }

    /// Switch handedness.  The catalog is rebuilt, so chain progress and
    /// cooldowns are dropped; per-hand windows are kept.
    pub fn set_dominant_hand(&mut self, hand: Hand) {
        if hand == self.config.dominant_hand {
            return;
        }
        info!(hand = hand.as_str(), "dominant hand changed");
        self.config.dominant_hand = hand;
        self.catalog = GestureCatalog::standard(hand);
        std::mem::swap(&mut self.dominant, &mut self.non_dominant);
    }

    /// Forget all history and calibration.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    // ── IPC ───────────────────────────────────────────────

    pub fn status_sexp(&self) -> String {
        let cooling: Vec<&str> = self
            .catalog
            .discrete
            .iter()
            .filter(|g| g.timed_out)
            .map(|g| g.kind.as_str())
            .collect();
        format!(
            "(:dominant-hand :{} :dominant :{} :non-dominant :{} :cycle {} :frames {} :hand-length {:.4} :ready {} :cooling ({}))",
            self.config.dominant_hand.as_str(),
            self.dominant.as_str(),
            self.non_dominant.as_str(),
            self.cycle(),
            self.frames,
            self.hand_length(),
            self.ready.map_or("nil".to_string(), |k| format!(":{}", k.as_str())),
            cooling.join(" "),
        )
    }

    pub fn config_sexp(&self) -> String {
        format!(
            "(:dominant-hand :{} :discrete-threshold {} :continuous-threshold {} :cycle-wrap {} :continuous-window {} :quick-window {} :discrete-window :{} :initial-hand-length {:.4} :calibration-hand :{})",
            self.config.dominant_hand.as_str(),
            self.config.discrete_threshold,
            self.config.continuous_threshold,
            self.config.cycle_wrap,
            self.config.continuous_window,
            self.config.quick_window,
            self.config.discrete_window.as_str(),
            self.config.initial_hand_length,
            self.config.calibration_hand.as_str(),
        )
    }

    /// Per-gesture scores and chain state.
    pub fn scores_sexp(&self) -> String {
        let continuous: Vec<String> = self
            .catalog
            .continuous
            .iter()
            .map(|g| format!("(:name :{} :role :{} :score {})", g.kind.as_str(), g.role.as_str(), g.score))
            .collect();
        let discrete: Vec<String> = self.catalog.discrete.iter().map(|g| g.sexp()).collect();
        format!(
            "(:continuous ({}) :discrete ({}))",
            continuous.join(" "),
            discrete.join(" ")
        )
    }
}

fn window_of<'a>(
    left: &'a HandHistory,
    right: &'a HandHistory,
    hand: Hand,
    window: PatternWindow,
) -> &'a HandPatternBuffer {
    let history = match hand {
        Hand::Left => left,
        Hand::Right => right,
    };
    match window {
        PatternWindow::Continuous => &history.continuous,
        PatternWindow::Quick => &history.quick,
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
use super::skeleton::{HandSkeleton, Joint, SensorHandState};

/// Open fingers, thumb tucked.
#[cfg(test)]
pub(crate) fn draw_pose(hand: Hand) -> HandSkeleton {
    let mut skel = HandSkeleton::new(hand);
    skel.set_position(Joint::HandTip, [0.0, 1.0, 0.0]);
    skel.set_position(Joint::Thumb, [0.1, 0.4, 0.0]);
    skel.state = SensorHandState::Open;
    skel
}

/// Closed fist.
#[cfg(test)]
pub(crate) fn neutral_pose(hand: Hand) -> HandSkeleton {
    let mut skel = HandSkeleton::new(hand);
    skel.set_position(Joint::HandTip, [0.0, 0.3, 0.0]);
    skel.set_position(Joint::Thumb, [0.05, 0.25, 0.0]);
    skel.state = SensorHandState::Closed;
    skel
}

/// Fist with the thumb out along `dir`.
#[cfg(test)]
pub(crate) fn thumb_pose(hand: Hand, dir: [f32; 3]) -> HandSkeleton {
    let mut skel = neutral_pose(hand);
    skel.set_position(Joint::Thumb, dir);
    skel
}

#[cfg(test)]
pub(crate) fn frame_of(left: HandSkeleton, right: HandSkeleton) -> BodyFrame {
    let mut frame = BodyFrame::new(1);
    frame.left = left;
    frame.right = right;
    frame
}

#[cfg(test)]
pub(crate) const THUMB_UP: [f32; 3] = [0.0, 1.0, 0.0];
#[cfg(test)]
pub(crate) const THUMB_DOWN: [f32; 3] = [0.0, -1.0, 0.0];
#[cfg(test)]
pub(crate) const THUMB_LEFT: [f32; 3] = [-1.0, 0.0, 0.0];

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(rec: &mut Recognizer, frame: &BodyFrame, n: usize) {
        for _ in 0..n {
            rec.recognize(frame);
        }
    }

    fn undo_sequence(rec: &mut Recognizer) {
        let left = neutral_pose(Hand::Left);
        feed(rec, &frame_of(left.clone(), thumb_pose(Hand::Right, THUMB_LEFT)), 16);
        feed(rec, &frame_of(left, thumb_pose(Hand::Right, THUMB_DOWN)), 16);
    }

    #[test]
    fn test_first_frame_is_cycle_zero() {
        let mut rec = Recognizer::default();
        let frame = frame_of(neutral_pose(Hand::Left), neutral_pose(Hand::Right));
        rec.recognize(&frame);
        assert_eq!(rec.cycle(), 0);
        rec.recognize(&frame);
        assert_eq!(rec.cycle(), 1);
    }

    #[test]
    fn test_sustained_draw_selects_draw() {
        let mut rec = Recognizer::default();
        let frame = frame_of(neutral_pose(Hand::Left), draw_pose(Hand::Right));
        feed(&mut rec, &frame, 150);

        let draw = rec
            .catalog()
            .continuous
            .iter()
            .find(|g| g.kind == ContinuousKind::Draw)
            .map(|g| g.score);
        assert_eq!(draw, Some(100));
        assert_eq!(rec.dominant_gesture(), ContinuousKind::Draw);
        assert_eq!(rec.right_hand_gesture(), ContinuousKind::Draw);
        assert_eq!(rec.left_hand_gesture(), ContinuousKind::Neutral);
    }

    #[test]
    fn test_continuous_threshold_is_exclusive() {
        let mut rec = Recognizer::default();
        let frame = frame_of(neutral_pose(Hand::Left), draw_pose(Hand::Right));
        feed(&mut rec, &frame, 40);
        assert_eq!(rec.dominant_gesture(), ContinuousKind::Neutral);
        rec.recognize(&frame);
        assert_eq!(rec.dominant_gesture(), ContinuousKind::Draw);
    }

    #[test]
    fn test_non_dominant_zoom() {
        let mut rec = Recognizer::default();
        let frame = frame_of(thumb_pose(Hand::Left, THUMB_UP), neutral_pose(Hand::Right));
        feed(&mut rec, &frame, 60);
        assert_eq!(rec.non_dominant_gesture(), ContinuousKind::ZoomIn);
        assert_eq!(rec.dominant_gesture(), ContinuousKind::Neutral);
    }

    #[test]
    fn test_left_dominant_maps_hands() {
        let mut rec = Recognizer::new(RecognizerConfig {
            dominant_hand: Hand::Left,
            ..Default::default()
        });
        let frame = frame_of(draw_pose(Hand::Left), neutral_pose(Hand::Right));
        feed(&mut rec, &frame, 60);
        assert_eq!(rec.left_hand_gesture(), ContinuousKind::Draw);
        assert_eq!(rec.right_hand_gesture(), ContinuousKind::Neutral);
    }

    #[test]
    fn test_undo_fires_once_and_hands_off() {
        let mut rec = Recognizer::default();
        undo_sequence(&mut rec);
        assert_eq!(rec.peek_discrete(), Some(DiscreteKind::Undo));
        assert_eq!(rec.take_discrete(), Some(DiscreteKind::Undo));
        assert_eq!(rec.take_discrete(), None);
        assert!(rec.is_cooling_down(DiscreteKind::Undo));
        assert!(!rec.is_cooling_down(DiscreteKind::Redo));
    }

    #[test]
    fn test_cooldown_swallows_repeat_until_wrap() {
        let mut rec = Recognizer::default();
        undo_sequence(&mut rec);
        assert_eq!(rec.take_discrete(), Some(DiscreteKind::Undo));

        // Chain completes again while cooling down: nothing published.
        undo_sequence(&mut rec);
        assert_eq!(rec.take_discrete(), None);

        let idle = frame_of(neutral_pose(Hand::Left), neutral_pose(Hand::Right));
        let remaining = (rec.config.cycle_wrap - rec.cycle()) as usize;
        feed(&mut rec, &idle, remaining - 1);
        assert!(rec.is_cooling_down(DiscreteKind::Undo));
        rec.recognize(&idle);
        assert_eq!(rec.cycle(), 0);
        assert!(!rec.is_cooling_down(DiscreteKind::Undo));
    }

    #[test]
    fn test_hand_length_calibrates_from_right_hand() {
        let mut rec = Recognizer::default();
        let frame = frame_of(neutral_pose(Hand::Left), draw_pose(Hand::Right));
        rec.recognize(&frame);
        assert!((rec.hand_length() - 0.91075).abs() < 1e-6);
    }

    #[test]
    fn test_set_dominant_hand_rebuilds_catalog() {
        let mut rec = Recognizer::default();
        let frame = frame_of(neutral_pose(Hand::Left), draw_pose(Hand::Right));
        feed(&mut rec, &frame, 60);
        rec.set_dominant_hand(Hand::Left);
        assert_eq!(rec.dominant_hand(), Hand::Left);
        assert_eq!(rec.right_hand_gesture(), ContinuousKind::Draw);
        let inward = rec.catalog().discrete[0].steps[0].elevation;
        assert_eq!(inward, Some(crate::gesture::geometry::ThumbElevation::Right));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut rec = Recognizer::default();
        undo_sequence(&mut rec);
        rec.reset();
        assert_eq!(rec.take_discrete(), None);
        assert_eq!(rec.frames(), 0);
        assert!(rec.history(Hand::Right).continuous.is_empty());
        assert!(!rec.is_cooling_down(DiscreteKind::Undo));
    }

    #[test]
    fn test_status_sexp_parses() {
        let mut rec = Recognizer::default();
        undo_sequence(&mut rec);
        for s in [rec.status_sexp(), rec.config_sexp(), rec.scores_sexp()] {
            assert!(lexpr::from_str(&s).is_ok(), "bad sexp: {}", s);
        }
        assert!(rec.status_sexp().contains(":ready :undo"));
    }
}
