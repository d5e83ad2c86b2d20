//! Gesture state machine.
//!
//! Two independent processes run per tick.  The stroke process follows the
//! dominant hand and owns drawing, erasing and undo/redo; the actuator
//! process follows the other hand and drives zoom.  Each physical hand
//! holds its own `ProcessState`, starting at `None`.

use std::collections::VecDeque;

use tracing::debug;

use super::sinks::{CanvasHost, IndicatorFlags, IndicatorSink};
use super::surface::Canvas;
use crate::gesture::skeleton::{Hand, Joint};
use crate::gesture::{ContinuousKind, DiscreteKind};

// ── Process state ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProcessState {
    #[default]
    None,
    Neutral,
    Drawing,
    Erasing,
    ZoomIn,
    ZoomOut,
    RotateClockwise,
    RotateCounterClockwise,
    Select,
    Undo,
    Redo,
}

impl ProcessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Neutral => "neutral",
            Self::Drawing => "drawing",
            Self::Erasing => "erasing",
            Self::ZoomIn => "zoom-in",
            Self::ZoomOut => "zoom-out",
            Self::RotateClockwise => "rotate-clockwise",
            Self::RotateCounterClockwise => "rotate-counter-clockwise",
            Self::Select => "select",
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }
}

impl From<ContinuousKind> for ProcessState {
    fn from(kind: ContinuousKind) -> Self {
        match kind {
            ContinuousKind::Neutral => Self::Neutral,
            ContinuousKind::Draw => Self::Drawing,
            ContinuousKind::Erase => Self::Erasing,
            ContinuousKind::RotateClockwise => Self::RotateClockwise,
            ContinuousKind::RotateCounterClockwise => Self::RotateCounterClockwise,
            ContinuousKind::ZoomIn => Self::ZoomIn,
            ContinuousKind::ZoomOut => Self::ZoomOut,
        }
    }
}

impl From<DiscreteKind> for ProcessState {
    fn from(kind: DiscreteKind) -> Self {
        match kind {
            DiscreteKind::Undo => Self::Undo,
            DiscreteKind::Redo => Self::Redo,
        }
    }
}

// ── Smoothing ──────────────────────────────────────────────

/// How the stroke hand's gesture stream is filtered before transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Smoothing {
    /// Use the recognizer's selection as-is.
    #[default]
    Direct,
    /// Act only when one gesture holds `percent`% of the last `window` ticks.
    MajorityVote { window: usize, percent: u32 },
}

impl Smoothing {
    pub fn sexp(&self) -> String {
        match self {
            Self::Direct => ":direct".to_string(),
            Self::MajorityVote { window, percent } => {
                format!("(:majority :window {} :percent {})", window, percent)
            }
        }
    }
}

/// Sliding majority vote over recent gesture kinds.
#[derive(Debug, Clone)]
pub struct MajorityVote {
    window: usize,
    percent: u32,
    recent: VecDeque<ContinuousKind>,
}

impl MajorityVote {
    pub fn new(window: usize, percent: u32) -> Self {
        let window = window.max(1);
        Self {
            window,
            percent,
            recent: VecDeque::new(),
        }
    }

    /// Record a kind and return the winner, if one is strong enough.
    pub fn push(&mut self, kind: ContinuousKind) -> Option<ContinuousKind> {
        if self.recent.len() >= self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(kind);

        // Tally in order of first appearance so ties resolve to the oldest.
        let mut tally: Vec<(ContinuousKind, usize)> = Vec::new();
        for k in &self.recent {
            match tally.iter_mut().find(|(t, _)| t == k) {
                Some((_, n)) => *n += 1,
                None => tally.push((*k, 1)),
            }
        }
        let (winner, count) = tally
            .into_iter()
            .fold(None, |best: Option<(ContinuousKind, usize)>, (k, n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((k, n)),
            })?;

        let needed = self.percent as f64 / 100.0 * self.recent.len() as f64;
        if count as f64 >= needed {
            Some(winner)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}

// ── Config ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct MachineConfig {
    /// Ticks between drawn points while a stroke continues.
    pub frame_delay: u32,
    pub smoothing: Smoothing,
    /// Stroke-hand joint whose position is drawn.
    pub draw_joint: Joint,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            frame_delay: 3,
            smoothing: Smoothing::Direct,
            draw_joint: Joint::HandTip,
        }
    }
}

// ── Tick input ─────────────────────────────────────────────

/// Everything the machine reads for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput {
    /// Recognized gesture of the stroke (dominant) hand.
    pub stroke_gesture: ContinuousKind,
    /// Recognized gesture of the actuator hand.
    pub actuator_gesture: ContinuousKind,
    /// Discrete gesture handed off this tick.
    pub discrete: Option<DiscreteKind>,
    /// Where a drawn point would go.
    pub draw_position: [f32; 3],
    /// Point currently touched by the user, if any.
    pub collided: Option<usize>,
    pub flags: IndicatorFlags,
}

// ── Machine ────────────────────────────────────────────────

pub struct GestureStateMachine {
    pub config: MachineConfig,
    stroke_hand: Hand,
    stroke_state: ProcessState,
    actuator_state: ProcessState,
    vote: Option<MajorityVote>,
    frame_count: u32,
    stroke_start_index: usize,
}

impl Default for GestureStateMachine {
    fn default() -> Self {
        Self::new(MachineConfig::default(), Hand::Right)
    }
}

impl GestureStateMachine {
    pub fn new(config: MachineConfig, stroke_hand: Hand) -> Self {
        let vote = match config.smoothing {
            Smoothing::Direct => None,
            Smoothing::MajorityVote { window, percent } => Some(MajorityVote::new(window, percent)),
        };
        Self {
            config,
            stroke_hand,
            stroke_state: ProcessState::None,
            actuator_state: ProcessState::None,
            vote,
            frame_count: 0,
            stroke_start_index: 0,
        }
    }

    pub fn stroke_hand(&self) -> Hand {
        self.stroke_hand
    }

    pub fn actuator_hand(&self) -> Hand {
        self.stroke_hand.opposite()
    }

    /// Current state of a physical hand.
    pub fn state(&self, hand: Hand) -> ProcessState {
        if hand == self.stroke_hand {
            self.stroke_state
        } else {
            self.actuator_state
        }
    }

    pub fn stroke_state(&self) -> ProcessState {
        self.stroke_state
    }

    pub fn actuator_state(&self) -> ProcessState {
        self.actuator_state
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Whether a stroke is open and where it started.
    pub fn open_stroke(&self) -> Option<usize> {
        (self.stroke_state == ProcessState::Drawing).then_some(self.stroke_start_index)
    }

    /// Move the stroke process to another hand.  An open stroke is closed
    /// first and both hands return to `None`.
    pub fn set_stroke_hand(&mut self, hand: Hand, canvas: &mut Canvas) {
        if hand == self.stroke_hand {
            return;
        }
        if self.stroke_state == ProcessState::Drawing {
            self.close_stroke(canvas);
        }
        self.stroke_hand = hand;
        self.stroke_state = ProcessState::None;
        self.actuator_state = ProcessState::None;
        if let Some(vote) = &mut self.vote {
            *vote = MajorityVote::new(vote.window, vote.percent);
        }
    }

    /// Next stroke-hand state.  A discrete gesture this tick wins outright;
    /// otherwise the smoothed continuous gesture is used.  `None` means the
    /// vote was inconclusive and the tick is skipped.
    pub fn determine_stroke(
        &mut self,
        gesture: ContinuousKind,
        discrete: Option<DiscreteKind>,
    ) -> Option<ProcessState> {
        let smoothed = match &mut self.vote {
            Some(vote) => vote.push(gesture),
            None => Some(gesture),
        };
        match discrete {
            Some(kind) => Some(kind.into()),
            None => smoothed.map(ProcessState::from),
        }
    }

    /// Run both processes for one tick.
    pub fn step<H: CanvasHost>(&mut self, input: &TickInput, canvas: &mut Canvas, host: &mut H) {
        self.frame_count += 1;
        self.step_stroke(input, canvas, host);
        self.step_actuator(input, host);
    }

    fn step_stroke<H: CanvasHost>(&mut self, input: &TickInput, canvas: &mut Canvas, host: &mut H) {
        let Some(next) = self.determine_stroke(input.stroke_gesture, input.discrete) else {
            return;
        };
        let prev = self.stroke_state;

        let mut stroke_start = false;
        if prev != ProcessState::Drawing && next == ProcessState::Drawing {
            self.stroke_start_index = canvas.len();
            stroke_start = true;
        }
        if prev == ProcessState::Drawing && next != ProcessState::Drawing {
            self.close_stroke(canvas);
        }

        self.stroke_state = next;
        if next != prev {
            debug!(
                hand = self.stroke_hand.as_str(),
                from = prev.as_str(),
                to = next.as_str(),
                "stroke state"
            );
            indicate(host, self.stroke_hand, next, input.flags);
        }

        match next {
            ProcessState::Drawing => {
                if stroke_start || self.frame_count >= self.config.frame_delay {
                    canvas.draw(input.draw_position, !stroke_start, host);
                    self.frame_count = 0;
                }
            }
            ProcessState::Erasing => {
                if let Some(index) = input.collided {
                    canvas.erase_at(index, host);
                }
            }
            ProcessState::Undo if input.discrete.is_some() => {
                if canvas.undo(host).is_none() {
                    debug!("undo: nothing to undo");
                }
            }
            ProcessState::Redo if input.discrete.is_some() => {
                if canvas.redo(host).is_none() {
                    debug!("redo: nothing to redo");
                }
            }
            _ => {}
        }
    }

    fn step_actuator<H: CanvasHost>(&mut self, input: &TickInput, host: &mut H) {
        let next = ProcessState::from(input.actuator_gesture);
        if next != self.actuator_state {
            debug!(
                hand = self.actuator_hand().as_str(),
                from = self.actuator_state.as_str(),
                to = next.as_str(),
                "actuator state"
            );
            self.actuator_state = next;
            indicate(host, self.actuator_hand(), next, input.flags);
        }

        match next {
            ProcessState::ZoomIn => host.zoom_in(),
            ProcessState::ZoomOut => host.zoom_out(),
            // Rotation and selection have no actuator.
            _ => {}
        }
    }

    /// Commit the open stroke, discarding redo history first.  An interval
    /// that drew nothing commits nothing.
    fn close_stroke(&mut self, canvas: &mut Canvas) {
        self.frame_count = 0;
        let start = self.stroke_start_index;
        if canvas.len() <= start {
            debug!(start, "empty stroke dropped");
            return;
        }
        if canvas.can_redo() {
            canvas.discard_redo_history();
        }
        canvas.commit_stroke(start, canvas.len() - 1);
    }

    pub fn status_sexp(&self) -> String {
        format!(
            "(:stroke-hand :{} :stroke :{} :actuator :{} :frame-count {} :open-stroke {})",
            self.stroke_hand.as_str(),
            self.stroke_state.as_str(),
            self.actuator_state.as_str(),
            self.frame_count,
            self.open_stroke()
                .map_or("nil".to_string(), |i| i.to_string()),
        )
    }

    pub fn config_sexp(&self) -> String {
        format!(
            "(:frame-delay {} :smoothing {} :draw-joint :{})",
            self.config.frame_delay,
            self.config.smoothing.sexp(),
            self.config.draw_joint.as_str(),
        )
    }
}

/// Route a state to the indicator of the given physical hand.
fn indicate(sink: &mut impl IndicatorSink, hand: Hand, state: ProcessState, flags: IndicatorFlags) {
    match hand {
        Hand::Right => sink.set_right_indicator(state, flags),
        Hand::Left => sink.set_left_indicator(state),
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
fn input(stroke: ContinuousKind, x: f32) -> TickInput {
    TickInput {
        stroke_gesture: stroke,
        actuator_gesture: ContinuousKind::Neutral,
        discrete: None,
        draw_position: [x, 0.0, 0.0],
        collided: None,
        flags: IndicatorFlags::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::sinks::{RecordingSink, SinkEvent};

    struct Rig {
        machine: GestureStateMachine,
        canvas: Canvas,
        sink: RecordingSink,
    }

    impl Rig {
        fn new(config: MachineConfig) -> Self {
            Self {
                machine: GestureStateMachine::new(config, Hand::Right),
                canvas: Canvas::new(),
                sink: RecordingSink::new(),
            }
        }

        fn run(&mut self, input: &TickInput, n: usize) {
            for _ in 0..n {
                self.machine.step(input, &mut self.canvas, &mut self.sink);
            }
        }
    }

    fn undo_input() -> TickInput {
        TickInput {
            discrete: Some(DiscreteKind::Undo),
            ..input(ContinuousKind::Neutral, 0.0)
        }
    }

    fn redo_input() -> TickInput {
        TickInput {
            discrete: Some(DiscreteKind::Redo),
            ..input(ContinuousKind::Neutral, 0.0)
        }
    }

    #[test]
    fn test_state_mapping_is_exhaustive() {
        assert_eq!(ProcessState::from(ContinuousKind::Draw), ProcessState::Drawing);
        assert_eq!(ProcessState::from(ContinuousKind::parse("not-tracked")), ProcessState::Neutral);
        assert_eq!(ProcessState::from(DiscreteKind::Redo), ProcessState::Redo);
    }

    #[test]
    fn test_initial_state_is_none() {
        let machine = GestureStateMachine::default();
        assert_eq!(machine.state(Hand::Right), ProcessState::None);
        assert_eq!(machine.state(Hand::Left), ProcessState::None);
    }

    #[test]
    fn test_draw_throttle_and_commit() {
        let mut rig = Rig::new(MachineConfig {
            frame_delay: 3,
            ..Default::default()
        });
        // Stroke start draws immediately, then every third tick.
        rig.run(&input(ContinuousKind::Draw, 1.0), 7);
        assert_eq!(rig.canvas.len(), 3);
        assert_eq!(rig.machine.open_stroke(), Some(0));

        rig.run(&input(ContinuousKind::Neutral, 0.0), 1);
        let strokes = rig.canvas.ledger().strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!((strokes[0].start, strokes[0].end), (0, 2));
        assert_eq!(rig.machine.frame_count(), 0);
    }

    #[test]
    fn test_stroke_points_are_connected() {
        let mut rig = Rig::new(MachineConfig {
            frame_delay: 1,
            ..Default::default()
        });
        rig.run(&input(ContinuousKind::Draw, 1.0), 3);
        rig.run(&input(ContinuousKind::Neutral, 0.0), 1);
        rig.run(&input(ContinuousKind::Draw, 2.0), 2);
        // Two strokes of 3 and 2 points: 2 + 1 connections.
        assert_eq!(rig.sink.count(|e| matches!(e, SinkEvent::Connect { .. })), 3);
    }

    #[test]
    fn test_erasing_hits_collided_point() {
        let mut rig = Rig::new(MachineConfig::default());
        rig.run(&input(ContinuousKind::Draw, 1.0), 4);
        let erase = TickInput {
            collided: Some(0),
            ..input(ContinuousKind::Erase, 0.0)
        };
        rig.run(&erase, 1);
        assert!(!rig.canvas.ledger().is_active(0));
        assert_eq!(rig.machine.stroke_state(), ProcessState::Erasing);
    }

    #[test]
    fn test_undo_then_new_stroke_discards_history() {
        let mut rig = Rig::new(MachineConfig {
            frame_delay: 1,
            ..Default::default()
        });
        rig.run(&input(ContinuousKind::Draw, 1.0), 5);
        rig.run(&input(ContinuousKind::Neutral, 0.0), 1);
        rig.run(&undo_input(), 1);
        assert_eq!(rig.machine.stroke_state(), ProcessState::Undo);
        assert_eq!(rig.canvas.ledger().active_count(), 0);

        rig.run(&input(ContinuousKind::Draw, 2.0), 3);
        rig.run(&input(ContinuousKind::Neutral, 0.0), 1);
        rig.run(&redo_input(), 1);

        let ledger = rig.canvas.ledger();
        assert_eq!(ledger.strokes().len(), 1);
        assert_eq!(ledger.active_count(), 3);
        assert!((0..5).all(|i| ledger.point(i).state == crate::canvas::ledger::PointState::Deleted));
    }

    #[test]
    fn test_discrete_interrupts_drawing() {
        let mut rig = Rig::new(MachineConfig::default());
        rig.run(&input(ContinuousKind::Draw, 1.0), 2);
        rig.run(&undo_input(), 1);
        // The stroke was committed, then undone.
        assert_eq!(rig.canvas.ledger().strokes().len(), 1);
        assert_eq!(rig.canvas.ledger().undo_depth(), 1);
    }

    #[test]
    fn test_empty_drawing_interval_commits_nothing() {
        let mut rig = Rig::new(MachineConfig::default());
        let mut machine = GestureStateMachine::new(MachineConfig::default(), Hand::Right);
        machine.stroke_state = ProcessState::Drawing;
        machine.stroke_start_index = 0;
        machine.step(&input(ContinuousKind::Neutral, 0.0), &mut rig.canvas, &mut rig.sink);
        assert!(rig.canvas.ledger().strokes().is_empty());
    }

    #[test]
    fn test_indicators_fire_on_change_only() {
        let mut rig = Rig::new(MachineConfig::default());
        rig.run(&input(ContinuousKind::Neutral, 0.0), 5);
        assert_eq!(rig.sink.count(|e| matches!(e, SinkEvent::RightIndicator { .. })), 1);
        assert_eq!(rig.sink.count(|e| matches!(e, SinkEvent::LeftIndicator { .. })), 1);

        rig.run(&input(ContinuousKind::Draw, 0.0), 2);
        assert_eq!(rig.sink.count(|e| matches!(e, SinkEvent::RightIndicator { .. })), 2);
    }

    #[test]
    fn test_zoom_actuates_every_tick() {
        let mut rig = Rig::new(MachineConfig::default());
        let zoom = TickInput {
            actuator_gesture: ContinuousKind::ZoomOut,
            ..input(ContinuousKind::Neutral, 0.0)
        };
        rig.run(&zoom, 4);
        assert_eq!(rig.sink.count(|e| *e == SinkEvent::ZoomOut), 4);
        assert_eq!(rig.machine.state(Hand::Left), ProcessState::ZoomOut);

        let rotate = TickInput {
            actuator_gesture: ContinuousKind::RotateClockwise,
            ..zoom
        };
        rig.run(&rotate, 2);
        assert_eq!(rig.sink.count(|e| *e == SinkEvent::ZoomOut), 4);
        assert_eq!(rig.machine.actuator_state(), ProcessState::RotateClockwise);
    }

    #[test]
    fn test_majority_vote_smoothing() {
        let mut vote = MajorityVote::new(4, 75);
        assert_eq!(vote.push(ContinuousKind::Draw), Some(ContinuousKind::Draw));
        // 1 of 2 is below 75%.
        assert_eq!(vote.push(ContinuousKind::Neutral), None);
        assert_eq!(vote.push(ContinuousKind::Erase), None);
        vote.push(ContinuousKind::Erase);
        vote.push(ContinuousKind::Erase);
        assert_eq!(vote.push(ContinuousKind::Erase), Some(ContinuousKind::Erase));
        assert_eq!(vote.len(), 4);
    }

    #[test]
    fn test_majority_vote_skips_inconclusive_ticks() {
        let mut rig = Rig::new(MachineConfig {
            smoothing: Smoothing::MajorityVote {
                window: 4,
                percent: 75,
            },
            ..Default::default()
        });
        rig.run(&input(ContinuousKind::Neutral, 0.0), 4);
        rig.run(&input(ContinuousKind::Draw, 0.0), 1);
        // 3 of 4 neutral still wins.
        assert_eq!(rig.machine.stroke_state(), ProcessState::Neutral);
        rig.run(&input(ContinuousKind::Draw, 0.0), 1);
        // 2 of 4 each: inconclusive, state held.
        assert_eq!(rig.machine.stroke_state(), ProcessState::Neutral);
        rig.run(&input(ContinuousKind::Draw, 0.0), 1);
        assert_eq!(rig.machine.stroke_state(), ProcessState::Drawing);
    }

    #[test]
    fn test_set_stroke_hand_closes_open_stroke() {
        let mut rig = Rig::new(MachineConfig::default());
        rig.run(&input(ContinuousKind::Draw, 1.0), 2);
        rig.machine.set_stroke_hand(Hand::Left, &mut rig.canvas);
        assert_eq!(rig.canvas.ledger().strokes().len(), 1);
        assert_eq!(rig.machine.stroke_hand(), Hand::Left);
        assert_eq!(rig.machine.state(Hand::Left), ProcessState::None);
    }

    #[test]
    fn test_status_sexp_parses() {
        let machine = GestureStateMachine::default();
        assert!(lexpr::from_str(&machine.status_sexp()).is_ok());
        assert!(lexpr::from_str(&machine.config_sexp()).is_ok());
    }
}
