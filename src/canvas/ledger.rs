//! Stroke ledger: append-only points, committed strokes and undo history.
//!
//! Points are addressed by index and never move.  Each point is Active,
//! Inactive (erased or undone, may come back) or Deleted (discarded redo
//! history, terminal).  Strokes are inclusive index ranges into the point
//! list with an identity that outlives the removal of other strokes.
//!
//! Undo history is a LIFO stack that only ever holds strokes undone since
//! the last commit; committing over a non-empty stack is expected to be
//! preceded by `discard_redo_history`.

use std::ops::Range;

use tracing::debug;

/// Stable stroke identity.
pub type StrokeId = u64;

// ── Points ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointState {
    Active,
    Inactive,
    Deleted,
}

impl PointState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub position: [f32; 3],
    pub state: PointState,
    /// Owning stroke once committed.
    pub stroke: Option<StrokeId>,
}

/// One uninterrupted drawing interval, `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stroke {
    pub id: StrokeId,
    pub start: usize,
    pub end: usize,
}

impl Stroke {
    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }

    pub fn point_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn sexp(&self) -> String {
        format!(
            "(:id {} :start {} :end {} :points {})",
            self.id,
            self.start,
            self.end,
            self.point_count()
        )
    }
}

/// An undone stroke and exactly the points undo deactivated.
#[derive(Debug, Clone, PartialEq)]
struct UndoEntry {
    stroke: Stroke,
    hidden: Vec<usize>,
}

// ── Ledger ─────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct StrokeLedger {
    points: Vec<Point>,
    strokes: Vec<Stroke>,
    undo_stack: Vec<UndoEntry>,
    next_id: StrokeId,
}

impl StrokeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an Active point and return its index.
    pub fn append_point(&mut self, position: [f32; 3]) -> usize {
        self.points.push(Point {
            position,
            state: PointState::Active,
            stroke: None,
        });
        self.points.len() - 1
    }

    /// Record `start..=end` as a stroke.
    ///
    /// # Panics
    /// If the range is empty or reaches past the last point.
    pub fn commit_stroke(&mut self, start: usize, end: usize) -> StrokeId {
        assert!(
            start <= end && end < self.points.len(),
            "stroke {}..={} out of range (len {})",
            start,
            end,
            self.points.len()
        );
        let id = self.next_id;
        self.next_id += 1;
        for point in &mut self.points[start..=end] {
            point.stroke = Some(id);
        }
        self.strokes.push(Stroke { id, start, end });
        debug!(id, start, end, "stroke committed");
        id
    }

    /// Deactivate one point.  Returns whether it was Active.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn erase_at(&mut self, index: usize) -> bool {
        let point = &mut self.points[index];
        if point.state == PointState::Active {
            point.state = PointState::Inactive;
            true
        } else {
            false
        }
    }

    /// Deactivate every point in `range`.  Returns whether any changed.
    pub fn erase_range(&mut self, range: Range<usize>) -> bool {
        assert!(
            range.end <= self.points.len(),
            "erase range {:?} out of range (len {})",
            range,
            self.points.len()
        );
        let mut changed = false;
        for index in range {
            changed |= self.erase_at(index);
        }
        changed
    }

    /// Deactivate every point.
    pub fn erase_all(&mut self) -> bool {
        self.erase_range(0..self.points.len())
    }

    /// Hide the most recent stroke that still shows at least one point.
    pub fn undo(&mut self) -> Option<Stroke> {
        let points = &self.points;
        let stroke = *self.strokes.iter().rev().find(|s| {
            points[s.indices()]
                .iter()
                .any(|p| p.state == PointState::Active)
        })?;

        let mut hidden = Vec::new();
        for index in stroke.indices() {
            if self.points[index].state == PointState::Active {
                self.points[index].state = PointState::Inactive;
                hidden.push(index);
            }
        }
        debug!(id = stroke.id, hidden = hidden.len(), "stroke undone");
        self.undo_stack.push(UndoEntry { stroke, hidden });
        Some(stroke)
    }

    /// Restore the most recently undone stroke.
    pub fn redo(&mut self) -> Option<Stroke> {
        let entry = self.undo_stack.pop()?;
        for index in entry.hidden {
            let point = &mut self.points[index];
            if point.state == PointState::Inactive {
                point.state = PointState::Active;
            }
        }
        debug!(id = entry.stroke.id, "stroke redone");
        Some(entry.stroke)
    }

    /// Permanently delete every undone stroke.  Returns how many strokes
    /// were discarded.
    pub fn discard_redo_history(&mut self) -> usize {
        let discarded = self.undo_stack.len();
        for entry in self.undo_stack.drain(..) {
            for point in &mut self.points[entry.stroke.indices()] {
                point.state = PointState::Deleted;
            }
            self.strokes.retain(|s| s.id != entry.stroke.id);
        }
        if discarded > 0 {
            debug!(discarded, "redo history discarded");
        }
        discarded
    }

    // ── Accessors ─────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// # Panics
    /// If `index` is out of range.
    pub fn point(&self, index: usize) -> &Point {
        &self.points[index]
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.points[index].state == PointState::Active
    }

    pub fn active_count(&self) -> usize {
        self.points
            .iter()
            .filter(|p| p.state == PointState::Active)
            .count()
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn can_redo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Points hidden by the most recent undo still on the stack.
    pub fn top_hidden(&self) -> &[usize] {
        self.undo_stack
            .last()
            .map(|e| e.hidden.as_slice())
            .unwrap_or(&[])
    }

    /// Undone strokes, oldest first.
    pub fn undo_stack(&self) -> impl Iterator<Item = &Stroke> {
        self.undo_stack.iter().map(|e| &e.stroke)
    }

    pub fn status_sexp(&self) -> String {
        format!(
            "(:points {} :active {} :strokes {} :undo-depth {})",
            self.points.len(),
            self.active_count(),
            self.strokes.len(),
            self.undo_stack.len(),
        )
    }

    /// Full stroke listing for inspection, with the state of every point
    /// in index order.
    pub fn strokes_sexp(&self) -> String {
        let strokes: Vec<String> = self.strokes.iter().map(|s| s.sexp()).collect();
        let stack: Vec<String> = self.undo_stack().map(|s| s.id.to_string()).collect();
        let states: Vec<String> = self
            .points
            .iter()
            .map(|p| format!(":{}", p.state.as_str()))
            .collect();
        format!(
            "(:strokes ({}) :undo-stack ({}) :point-states ({}))",
            strokes.join(" "),
            stack.join(" "),
            states.join(" ")
        )
    }
}

// ── Tests ──────────────────────────────────────────────────

/// Ledger with `n` points at x = index.
#[cfg(test)]
pub(crate) fn ledger_with_points(n: usize) -> StrokeLedger {
    let mut ledger = StrokeLedger::new();
    for i in 0..n {
        ledger.append_point([i as f32, 0.0, 0.0]);
    }
    ledger
}
