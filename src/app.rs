//! Application context: owns the whole pipeline and runs it one tick at a
//! time.
//!
//! frame -> recognizer -> host controls -> state machine -> canvas/host

use tracing::{debug, info, warn};

use crate::canvas::machine::{GestureStateMachine, TickInput};
use crate::canvas::sinks::{CanvasHost, Color, IndicatorFlags};
use crate::canvas::surface::Canvas;
use crate::config::AppConfig;
use crate::gesture::recognizer::Recognizer;
use crate::gesture::skeleton::{BodyFrame, Hand, JointSource};
use crate::gesture::DiscreteKind;

pub struct AppContext<S> {
    recognizer: Recognizer,
    machine: GestureStateMachine,
    canvas: Canvas,
    /// Point the user is currently touching.
    collided: Option<usize>,
    host: S,
    ticks: u64,
}

impl<S: CanvasHost> AppContext<S> {
    pub fn new(config: AppConfig, host: S) -> Self {
        let stroke_hand = config.recognizer.dominant_hand;
        Self {
            recognizer: Recognizer::new(config.recognizer),
            machine: GestureStateMachine::new(config.machine, stroke_hand),
            canvas: Canvas::new(),
            collided: None,
            host,
            ticks: 0,
        }
    }

    /// Run the full pipeline for one body frame.
    pub fn tick(&mut self, frame: &BodyFrame) {
        self.ticks += 1;
        self.recognizer.recognize(frame);

        if self.host.take_clear_request() {
            self.canvas.clear(&mut self.host);
        }
        if let Some(color) = self.host.selected_color() {
            self.canvas.set_color(color);
        }

        let stroke_hand = self.machine.stroke_hand();
        let input = TickInput {
            stroke_gesture: self.recognizer.hand_gesture(stroke_hand),
            actuator_gesture: self.recognizer.hand_gesture(stroke_hand.opposite()),
            discrete: self.recognizer.take_discrete(),
            draw_position: frame
                .hand(stroke_hand)
                .position(self.machine.config.draw_joint),
            collided: self.collided,
            flags: self.indicator_flags(),
        };
        self.machine.step(&input, &mut self.canvas, &mut self.host);
    }

    /// Tick every tracked body the source knows.  Returns how many ticked.
    pub fn poll(&mut self, source: &impl JointSource) -> usize {
        let mut ticked = 0;
        for body_id in source.bodies() {
            if !source.is_tracked(body_id) {
                debug!(body_id, "skipping untracked body");
                continue;
            }
            if let Some(frame) = source.frame(body_id) {
                self.tick(&frame);
                ticked += 1;
            }
        }
        ticked
    }

    /// Record which point the user touches (`None` when contact ends).
    /// Indices past the end are ignored.
    pub fn point_collided(&mut self, index: Option<usize>) {
        self.collided = match index {
            Some(i) if i >= self.canvas.len() => {
                warn!(index = i, len = self.canvas.len(), "collision with unknown point ignored");
                None
            }
            other => other,
        };
    }

    pub fn change_color(&mut self, color: Color) {
        self.canvas.set_color(color);
    }

    /// Hide every point now.  Returns how many were visible.
    pub fn request_clear(&mut self) -> usize {
        self.canvas.clear(&mut self.host)
    }

    pub fn set_dominant_hand(&mut self, hand: Hand) {
        if hand == self.recognizer.dominant_hand() {
            return;
        }
        info!(hand = hand.as_str(), "switching dominant hand");
        self.recognizer.set_dominant_hand(hand);
        self.machine.set_stroke_hand(hand, &mut self.canvas);
    }

    fn indicator_flags(&self) -> IndicatorFlags {
        IndicatorFlags {
            undo_cooling: self.recognizer.is_cooling_down(DiscreteKind::Undo),
            redo_cooling: self.recognizer.is_cooling_down(DiscreteKind::Redo),
        }
    }

    // ── Accessors ─────────────────────────────────────────

    pub fn recognizer(&self) -> &Recognizer {
        &self.recognizer
    }

    pub fn machine(&self) -> &GestureStateMachine {
        &self.machine
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn host(&self) -> &S {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut S {
        &mut self.host
    }

    pub fn collided(&self) -> Option<usize> {
        self.collided
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn status_sexp(&self) -> String {
        format!(
            "(:ticks {} :recognizer {} :machine {} :canvas {} :collided {})",
            self.ticks,
            self.recognizer.status_sexp(),
            self.machine.status_sexp(),
            self.canvas.status_sexp(),
            self.collided.map_or("nil".to_string(), |i| i.to_string()),
        )
    }

    pub fn config_sexp(&self) -> String {
        format!(
            "(:recognizer {} :machine {})",
            self.recognizer.config_sexp(),
            self.machine.config_sexp()
        )
    }
}
