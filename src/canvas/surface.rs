//! The drawing surface: stroke ledger plus the host handle of every point.
//!
//! Every ledger mutation is mirrored to the `PointSink` so rendered points
//! always show exactly the Active ones.

use tracing::info;

use super::ledger::{Stroke, StrokeId, StrokeLedger};
use super::sinks::{Color, PointHandle, PointSink};

#[derive(Debug, Default)]
pub struct Canvas {
    ledger: StrokeLedger,
    /// Host handle per ledger index.
    handles: Vec<PointHandle>,
    color: Color,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> &StrokeLedger {
        &self.ledger
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        if color != self.color {
            info!(color = color.as_str(), "stroke colour changed");
            self.color = color;
        }
    }

    /// Add a point, joining it to the previous point when
    /// `connect_to_previous` is set.  Returns the new index.
    pub fn draw(
        &mut self,
        position: [f32; 3],
        connect_to_previous: bool,
        sink: &mut impl PointSink,
    ) -> usize {
        let handle = sink.spawn_point(position);
        if connect_to_previous {
            if let Some(&prev) = self.handles.last() {
                sink.connect(prev, handle, self.color);
            }
        }
        self.handles.push(handle);
        self.ledger.append_point(position)
    }

    pub fn erase_at(&mut self, index: usize, sink: &mut impl PointSink) -> bool {
        let changed = self.ledger.erase_at(index);
        if changed {
            sink.set_active(self.handles[index], false);
        }
        changed
    }

    pub fn commit_stroke(&mut self, start: usize, end: usize) -> StrokeId {
        self.ledger.commit_stroke(start, end)
    }

    /// Points behind discarded history are already hidden, so no sink
    /// calls are needed.
    pub fn discard_redo_history(&mut self) -> usize {
        self.ledger.discard_redo_history()
    }

    pub fn can_redo(&self) -> bool {
        self.ledger.can_redo()
    }

    pub fn undo(&mut self, sink: &mut impl PointSink) -> Option<Stroke> {
        let stroke = self.ledger.undo()?;
        for &index in self.ledger.top_hidden() {
            sink.set_active(self.handles[index], false);
        }
        Some(stroke)
    }

    pub fn redo(&mut self, sink: &mut impl PointSink) -> Option<Stroke> {
        let restored = self.ledger.top_hidden().to_vec();
        let stroke = self.ledger.redo()?;
        for index in restored {
            if self.ledger.is_active(index) {
                sink.set_active(self.handles[index], true);
            }
        }
        Some(stroke)
    }

    /// Hide every point.  Returns how many were visible.
    pub fn clear(&mut self, sink: &mut impl PointSink) -> usize {
        let mut erased = 0;
        for index in 0..self.ledger.len() {
            if self.erase_at(index, sink) {
                erased += 1;
            }
        }
        info!(erased, "canvas cleared");
        erased
    }

    pub fn status_sexp(&self) -> String {
        format!(
            "(:color :{} :ledger {})",
            self.color.as_str(),
            self.ledger.status_sexp()
        )
    }
}
