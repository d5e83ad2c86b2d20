//! Line-oriented replay: one message per line in, responses and host events
//! out.

use std::io::{self, BufRead, Write};

use tracing::{debug, info};

use super::dispatch::{format_event, handle_message};
use crate::app::AppContext;
use crate::canvas::sinks::{RecordingSink, SinkEvent};
use crate::config::AppConfig;
use crate::gesture::skeleton::LatestFrames;

/// Everything one command stream drives: the application context and the
/// latest frame per body.
pub struct Session {
    pub ctx: AppContext<RecordingSink>,
    pub frames: LatestFrames,
}

/// Totals for one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub messages: usize,
    pub errors: usize,
    pub events: usize,
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        Self {
            ctx: AppContext::new(config, RecordingSink::new()),
            frames: LatestFrames::new(),
        }
    }

    /// Handle one line.  Returns the response followed by the host events it
    /// caused; blank lines and `;` comments return nothing.
    pub fn handle_line(&mut self, line: &str) -> Vec<String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            return Vec::new();
        }
        debug!(msg = line, "<-");
        let mut out = Vec::new();
        if let Some(response) = handle_message(self, line) {
            debug!(response = %response, "->");
            out.push(response);
        }
        out.extend(self.ctx.host_mut().drain().iter().map(event_line));
        out
    }
}

fn event_line(event: &SinkEvent) -> String {
    let fields = event.fields();
    let borrowed: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    format_event(event.name(), &borrowed)
}

fn is_error(response: &str) -> bool {
    response.starts_with("(:type :response") && response.contains(":status :error")
}

/// Feed every line of `input` through `session`, writing responses (and
/// host events when `with_events` is set) to `output`.
pub fn replay(
    session: &mut Session,
    input: impl BufRead,
    mut output: impl Write,
    with_events: bool,
) -> io::Result<ReplayStats> {
    let mut stats = ReplayStats::default();
    for (lineno, line) in input.lines().enumerate() {
        let line = line?;
        let lines = session.handle_line(&line);
        if lines.is_empty() {
            continue;
        }
        stats.messages += 1;
        for (i, text) in lines.iter().enumerate() {
            if i == 0 && is_error(text) {
                stats.errors += 1;
                debug!(line = lineno + 1, "message rejected");
            }
            if i > 0 {
                stats.events += 1;
                if !with_events {
                    continue;
                }
            }
            writeln!(output, "{}", text)?;
        }
    }
    output.flush()?;
    info!(
        messages = stats.messages,
        errors = stats.errors,
        events = stats.events,
        "replay finished"
    );
    Ok(stats)
}
