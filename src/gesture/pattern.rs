//! Per-frame hand shapes and the bounded per-hand history they feed.

use std::collections::VecDeque;

use super::geometry::{self, PalmOrientation, ThumbElevation};
use super::skeleton::{Hand, HandSkeleton, Joint};

/// Frames kept for continuous gestures (and discrete ones by default).
pub const CONTINUOUS_CAPACITY: usize = 100;

/// Frames kept in the short "quick" window.
pub const QUICK_CAPACITY: usize = 20;

// ── Hand shape ─────────────────────────────────────────────

/// Derived snapshot of one hand for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandShape {
    pub hand: Hand,
    pub thumb_extended: bool,
    pub hand_tip_open: bool,
    pub palm: PalmOrientation,
    pub elevation: ThumbElevation,
}

impl HandShape {
    /// Classify a skeleton against the current hand-length estimate.
    pub fn from_skeleton(skeleton: &HandSkeleton, hand_length: f64) -> Self {
        let thumb_extended = geometry::thumb_extended(skeleton, hand_length);
        let elevation = if thumb_extended {
            geometry::thumb_elevation(
                skeleton.position(Joint::Hand),
                skeleton.position(Joint::Thumb),
            )
        } else {
            ThumbElevation::Closed
        };
        Self {
            hand: skeleton.hand,
            thumb_extended,
            hand_tip_open: geometry::hand_tip_open(skeleton, hand_length),
            palm: geometry::palm_orientation(geometry::palm_normal(skeleton)),
            elevation,
        }
    }

    /// Thumb as the 1/0 code used by gesture templates.
    pub fn thumb_code(&self) -> i8 {
        self.thumb_extended as i8
    }

    /// Hand tip as the 1/0 code used by gesture templates.
    pub fn hand_tip_code(&self) -> i8 {
        self.hand_tip_open as i8
    }

    pub fn sexp(&self) -> String {
        format!(
            "(:hand :{} :thumb {} :tip {} :palm :{} :elevation :{})",
            self.hand.as_str(),
            self.thumb_code(),
            self.hand_tip_code(),
            self.palm.as_str(),
            self.elevation.as_str(),
        )
    }
}

// ── Pattern buffer ─────────────────────────────────────────

/// Bounded FIFO of hand shapes, oldest first.
#[derive(Debug, Clone)]
pub struct HandPatternBuffer {
    shapes: VecDeque<HandShape>,
    capacity: usize,
}

impl HandPatternBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shapes: VecDeque::new(),
            capacity,
        }
    }

    /// Append a shape, evicting the oldest when full.
    pub fn push(&mut self, shape: HandShape) {
        if self.shapes.len() >= self.capacity {
            self.shapes.pop_front();
        }
        self.shapes.push_back(shape);
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandShape> {
        self.shapes.iter()
    }
}

/// The two rolling windows kept for each hand.
#[derive(Debug, Clone)]
pub struct HandHistory {
    pub continuous: HandPatternBuffer,
    pub quick: HandPatternBuffer,
}

impl Default for HandHistory {
    fn default() -> Self {
        Self::new(CONTINUOUS_CAPACITY, QUICK_CAPACITY)
    }
}

impl HandHistory {
    pub fn new(continuous: usize, quick: usize) -> Self {
        Self {
            continuous: HandPatternBuffer::new(continuous),
            quick: HandPatternBuffer::new(quick),
        }
    }

    pub fn push(&mut self, shape: HandShape) {
        self.continuous.push(shape);
        self.quick.push(shape);
    }

    pub fn clear(&mut self) {
        self.continuous.clear();
        self.quick.clear();
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
pub(crate) fn shape(hand: Hand, thumb: bool, tip: bool, elevation: ThumbElevation) -> HandShape {
    HandShape {
        hand,
        thumb_extended: thumb,
        hand_tip_open: tip,
        palm: PalmOrientation::Neither,
        elevation,
    }
}
