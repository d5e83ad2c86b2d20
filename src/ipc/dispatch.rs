//! Command dispatch: parse s-expressions and route them to handlers.

use lexpr::Value;
use tracing::{debug, warn};

use super::replay::Session;
use crate::canvas::sinks::Color;
use crate::gesture::skeleton::{BodyFrame, Hand, HandSkeleton, Joint, JointSample, SensorHandState};

/// Parse an s-expression message and dispatch to the appropriate handler.
/// Returns an optional response string (s-expression).
pub fn handle_message(session: &mut Session, raw: &str) -> Option<String> {
    let value = match lexpr::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("malformed s-expression: {}", e);
            return Some(error_response(0, &format!("malformed s-expression: {e}")));
        }
    };

    let msg_type = get_keyword(&value, "type");
    let msg_id = get_int(&value, "id").unwrap_or(0);

    match msg_type.as_deref() {
        Some("frame") => handle_frame(session, msg_id, &value),
        Some("poll") => handle_poll(session, msg_id),
        Some("body-lost") => handle_body_lost(session, msg_id, &value),
        Some("status") => handle_status(session, msg_id),
        Some("config") => handle_config(session, msg_id),
        Some("ledger") => handle_ledger(session, msg_id),
        Some("scores") => handle_scores(session, msg_id),
        Some("collide") => handle_collide(session, msg_id, &value),
        Some("change-color") => handle_change_color(session, msg_id, &value),
        Some("clear") => handle_clear(session, msg_id),
        Some("set-dominant-hand") => handle_set_dominant_hand(session, msg_id, &value),
        Some(other) => {
            warn!(msg_type = other, "unknown message type");
            Some(error_response(msg_id, &format!("unknown message type: {other}")))
        }
        None => {
            warn!("message without :type");
            Some(error_response(msg_id, "missing :type"))
        }
    }
}

// ── Frames ─────────────────────────────────────────────────

fn handle_frame(session: &mut Session, msg_id: i64, value: &Value) -> Option<String> {
    let frame = match parse_frame(value) {
        Ok(f) => f,
        Err(reason) => {
            warn!(msg_id, "rejected frame: {}", reason);
            return Some(error_response(msg_id, &reason));
        }
    };

    let tracked = frame.tracked;
    if tracked {
        session.ctx.tick(&frame);
    } else {
        debug!(body_id = frame.body_id, "frame for untracked body stored without tick");
    }
    session.frames.insert(frame);

    let ctx = &session.ctx;
    Some(format!(
        "(:type :response :id {} :status :ok :ticked {} :dominant :{} :non-dominant :{} :stroke :{} :actuator :{})",
        msg_id,
        if tracked { "t" } else { "nil" },
        ctx.recognizer().dominant_gesture().as_str(),
        ctx.recognizer().non_dominant_gesture().as_str(),
        ctx.machine().stroke_state().as_str(),
        ctx.machine().actuator_state().as_str(),
    ))
}

fn handle_poll(session: &mut Session, msg_id: i64) -> Option<String> {
    let ticked = session.ctx.poll(&session.frames);
    Some(format!(
        "(:type :response :id {} :status :ok :ticked {})",
        msg_id, ticked
    ))
}

fn handle_body_lost(session: &mut Session, msg_id: i64, value: &Value) -> Option<String> {
    let body_id = match get_int(value, "body") {
        Some(b) if b >= 0 => b as u64,
        _ => return Some(error_response(msg_id, "missing :body")),
    };
    if session.frames.remove(body_id) {
        debug!(body_id, "body removed");
        Some(ok_response(msg_id))
    } else {
        Some(error_response(msg_id, &format!("unknown body: {body_id}")))
    }
}

/// Build a `BodyFrame` from
/// `(:body N :tracked t :left (:state :open :thumb (x y z) ...) :right (...))`.
/// Joints a hand omits stay at the origin.
fn parse_frame(value: &Value) -> Result<BodyFrame, String> {
    let body_id = match get_int(value, "body") {
        Some(b) if b >= 0 => b as u64,
        Some(b) => return Err(format!("invalid :body {b}")),
        None => return Err("missing :body".to_string()),
    };
    let mut frame = BodyFrame::new(body_id);
    frame.tracked = get_bool(value, "tracked").unwrap_or(true);

    for hand in [Hand::Left, Hand::Right] {
        if let Some(plist) = get_value(value, hand.as_str()) {
            parse_hand(plist, frame.hand_mut(hand))?;
        }
    }
    Ok(frame)
}

fn parse_hand(plist: &Value, skeleton: &mut HandSkeleton) -> Result<(), String> {
    if let Some(state) = get_keyword(plist, "state") {
        skeleton.state = SensorHandState::parse(&state);
    }
    let mut samples = Vec::new();
    for joint in Joint::all() {
        if let Some(raw) = get_value(plist, joint.as_str()) {
            let position = parse_position(raw).ok_or_else(|| {
                format!(
                    "invalid :{} position for {} hand",
                    joint.as_str(),
                    skeleton.hand.as_str()
                )
            })?;
            samples.push(JointSample { joint, position });
        }
    }
    // All-or-nothing: a bad joint leaves the skeleton untouched.
    skeleton.apply(&samples);
    Ok(())
}

/// `(x y z)` as three finite numbers.
fn parse_position(value: &Value) -> Option<[f32; 3]> {
    let items = flatten_list(value);
    if items.len() != 3 {
        return None;
    }
    let mut position = [0.0f32; 3];
    for (slot, item) in position.iter_mut().zip(items) {
        let v = item.as_f64()? as f32;
        if !v.is_finite() {
            return None;
        }
        *slot = v;
    }
    Some(position)
}

// ── Inspection ─────────────────────────────────────────────

fn handle_status(session: &mut Session, msg_id: i64) -> Option<String> {
    Some(format!(
        "(:type :response :id {} :status :ok :app {})",
        msg_id,
        session.ctx.status_sexp()
    ))
}

fn handle_config(session: &mut Session, msg_id: i64) -> Option<String> {
    Some(format!(
        "(:type :response :id {} :status :ok :config {})",
        msg_id,
        session.ctx.config_sexp()
    ))
}

fn handle_ledger(session: &mut Session, msg_id: i64) -> Option<String> {
    Some(format!(
        "(:type :response :id {} :status :ok :ledger {})",
        msg_id,
        session.ctx.canvas().ledger().strokes_sexp()
    ))
}

fn handle_scores(session: &mut Session, msg_id: i64) -> Option<String> {
    Some(format!(
        "(:type :response :id {} :status :ok :scores {})",
        msg_id,
        session.ctx.recognizer().scores_sexp()
    ))
}

// ── Host controls ──────────────────────────────────────────

fn handle_collide(session: &mut Session, msg_id: i64, value: &Value) -> Option<String> {
    let index = match get_keyword(value, "index").as_deref() {
        None => return Some(error_response(msg_id, "missing :index (point index or nil)")),
        Some("nil") => None,
        Some(raw) => match raw.parse::<usize>() {
            Ok(i) => Some(i),
            Err(_) => return Some(error_response(msg_id, &format!("invalid :index {raw}"))),
        },
    };
    session.ctx.point_collided(index);
    Some(format!(
        "(:type :response :id {} :status :ok :collided {})",
        msg_id,
        session
            .ctx
            .collided()
            .map_or("nil".to_string(), |i| i.to_string())
    ))
}

fn handle_change_color(session: &mut Session, msg_id: i64, value: &Value) -> Option<String> {
    let name = match get_keyword(value, "color") {
        Some(c) => c,
        None => return Some(error_response(msg_id, "missing :color")),
    };
    match Color::parse(&name) {
        Some(color) => {
            session.ctx.change_color(color);
            Some(ok_response(msg_id))
        }
        None => Some(error_response(msg_id, &format!("unknown colour: {name}"))),
    }
}

fn handle_clear(session: &mut Session, msg_id: i64) -> Option<String> {
    let erased = session.ctx.request_clear();
    Some(format!(
        "(:type :response :id {} :status :ok :erased {})",
        msg_id, erased
    ))
}

fn handle_set_dominant_hand(session: &mut Session, msg_id: i64, value: &Value) -> Option<String> {
    match get_keyword(value, "hand").as_deref().and_then(Hand::parse) {
        Some(hand) => {
            session.ctx.set_dominant_hand(hand);
            Some(ok_response(msg_id))
        }
        None => Some(error_response(msg_id, "invalid :hand (left or right)")),
    }
}

// ── Helpers ────────────────────────────────────────────────

fn ok_response(id: i64) -> String {
    format!("(:type :response :id {} :status :ok)", id)
}

fn error_response(id: i64, reason: &str) -> String {
    format!(
        "(:type :response :id {} :status :error :reason \"{}\")",
        id,
        escape_string(reason)
    )
}

/// Escape a string for s-expression output.
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Raw value following `:key` in a plist.
/// Handles both `Value::Keyword("key")` (elisp parser) and
/// `Value::Symbol(":key")` (default parser) forms.
pub(crate) fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let is_key = match pair.car() {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        if is_key {
            return match pair.cdr() {
                Value::Cons(next) => Some(next.car()),
                _ => None,
            };
        }
        current = pair.cdr();
    }
    None
}

/// Scalar value following `:key` as text.  Keywords lose their colon,
/// booleans and `nil` become `"t"` / `"nil"`.
pub(crate) fn get_keyword(value: &Value, key: &str) -> Option<String> {
    let val = get_value(value, key)?;
    Some(match val {
        Value::Keyword(v) => v.to_string(),
        Value::Symbol(v) => {
            let s = v.to_string();
            s.strip_prefix(':').unwrap_or(&s).to_string()
        }
        Value::String(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => (if *b { "t" } else { "nil" }).to_string(),
        Value::Null | Value::Nil => "nil".to_string(),
        _ => val.to_string(),
    })
}

/// Extract an integer value from an s-expression plist.
pub(crate) fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Extract a boolean value from an s-expression plist.
/// Treats "nil" as false, anything else as true.
pub(crate) fn get_bool(value: &Value, key: &str) -> Option<bool> {
    get_keyword(value, key).map(|s| s != "nil")
}

/// Extract a floating-point value from an s-expression plist.
pub(crate) fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Flatten a possibly nested list/cons structure into a Vec of leaf values.
pub(crate) fn flatten_list(value: &Value) -> Vec<&Value> {
    let mut result = Vec::new();
    fn walk<'a>(v: &'a Value, out: &mut Vec<&'a Value>) {
        match v {
            Value::Cons(pair) => {
                walk(pair.car(), out);
                walk(pair.cdr(), out);
            }
            Value::Null => {}
            other => out.push(other),
        }
    }
    walk(value, &mut result);
    result
}

/// Format an event s-expression.
pub fn format_event(event_type: &str, fields: &[(&str, &str)]) -> String {
    let mut s = format!("(:type :event :event :{}", event_type);
    for (key, val) in fields {
        s.push_str(&format!(" :{} {}", key, val));
    }
    s.push(')');
    s
}
