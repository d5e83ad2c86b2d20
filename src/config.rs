//! Application configuration.
//!
//! Loaded from an s-expression plist, e.g.
//!
//! ```text
//! (:dominant-hand :left
//!  :frame-delay 4
//!  :smoothing :majority :vote-window 10 :vote-percent 60
//!  :discrete-window :quick)
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use std::path::Path;

use lexpr::Value;
use thiserror::Error;
use tracing::info;

use crate::canvas::machine::{MachineConfig, Smoothing};
use crate::gesture::recognizer::{PatternWindow, RecognizerConfig};
use crate::gesture::skeleton::{Hand, Joint};
use crate::ipc::dispatch::{get_float, get_int, get_keyword};

/// Majority-vote window when `:smoothing :majority` omits `:vote-window`.
const DEFAULT_VOTE_WINDOW: usize = 10;
/// Majority-vote share when `:smoothing :majority` omits `:vote-percent`.
const DEFAULT_VOTE_PERCENT: u32 = 60;
/// Largest accepted pattern or vote window (frames).
pub const MAX_WINDOW: usize = 10_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed s-expression: {0}")]
    Parse(#[from] lexpr::parse::Error),

    #[error("config must be a plist")]
    NotAPlist,

    #[error("invalid value for :{key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub recognizer: RecognizerConfig,
    pub machine: MachineConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_sexp(&text)?;
        info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_sexp(text: &str) -> Result<Self, ConfigError> {
        let value = lexpr::from_str(text)?;
        let mut config = Self::default();
        config.apply(&value)?;
        Ok(config)
    }

    /// Overlay every key present in `value` onto this config.
    pub fn apply(&mut self, value: &Value) -> Result<(), ConfigError> {
        if !matches!(value, Value::Cons(_) | Value::Null) {
            return Err(ConfigError::NotAPlist);
        }

        let r = &mut self.recognizer;
        if let Some(hand) = parse_key(value, "dominant-hand", Hand::parse)? {
            r.dominant_hand = hand;
        }
        if let Some(hand) = parse_key(value, "calibration-hand", Hand::parse)? {
            r.calibration_hand = hand;
        }
        if let Some(n) = count_key(value, "discrete-threshold")? {
            r.discrete_threshold = n;
        }
        if let Some(n) = count_key(value, "continuous-threshold")? {
            r.continuous_threshold = n;
        }
        if let Some(n) = count_key(value, "cycle-wrap")? {
            r.cycle_wrap = to_u32(positive(n, "cycle-wrap")?, "cycle-wrap")?;
        }
        if let Some(n) = count_key(value, "continuous-window")? {
            r.continuous_window = window_size(n, "continuous-window")?;
        }
        if let Some(n) = count_key(value, "quick-window")? {
            r.quick_window = window_size(n, "quick-window")?;
        }
        if let Some(w) = parse_key(value, "discrete-window", PatternWindow::parse)? {
            r.discrete_window = w;
        }
        if let Some(len) = get_float(value, "initial-hand-length") {
            if !(len > 0.0 && len.is_finite()) {
                return Err(ConfigError::Invalid {
                    key: "initial-hand-length",
                    value: len.to_string(),
                });
            }
            r.initial_hand_length = len;
        }

        let m = &mut self.machine;
        if let Some(n) = count_key(value, "frame-delay")? {
            m.frame_delay = to_u32(n, "frame-delay")?;
        }
        if let Some(joint) = parse_key(value, "draw-joint", Joint::parse)? {
            m.draw_joint = joint;
        }
        let window = count_key(value, "vote-window")?;
        let percent = count_key(value, "vote-percent")?;
        if let Some(p) = percent {
            if p > 100 {
                return Err(ConfigError::Invalid {
                    key: "vote-percent",
                    value: p.to_string(),
                });
            }
        }
        match get_keyword(value, "smoothing").as_deref() {
            None => {}
            Some("direct") => m.smoothing = Smoothing::Direct,
            Some("majority") => {
                m.smoothing = Smoothing::MajorityVote {
                    window: window_size(window.unwrap_or(DEFAULT_VOTE_WINDOW), "vote-window")?,
                    percent: percent.map_or(DEFAULT_VOTE_PERCENT, |p| p as u32),
                }
            }
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "smoothing",
                    value: other.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Serialise back to a plist `from_sexp` accepts.
    pub fn to_sexp(&self) -> String {
        let r = &self.recognizer;
        let m = &self.machine;
        let smoothing = match m.smoothing {
            Smoothing::Direct => ":smoothing :direct".to_string(),
            Smoothing::MajorityVote { window, percent } => format!(
                ":smoothing :majority :vote-window {} :vote-percent {}",
                window, percent
            ),
        };
        format!(
            "(:dominant-hand :{} :calibration-hand :{} :discrete-threshold {} :continuous-threshold {} :cycle-wrap {} :continuous-window {} :quick-window {} :discrete-window :{} :initial-hand-length {} :frame-delay {} :draw-joint :{} {})",
            r.dominant_hand.as_str(),
            r.calibration_hand.as_str(),
            r.discrete_threshold,
            r.continuous_threshold,
            r.cycle_wrap,
            r.continuous_window,
            r.quick_window,
            r.discrete_window.as_str(),
            r.initial_hand_length,
            m.frame_delay,
            m.draw_joint.as_str(),
            smoothing,
        )
    }
}

/// Look up `key` and run it through `parse`, rejecting unknown names.
fn parse_key<T>(
    value: &Value,
    key: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    match get_keyword(value, key) {
        None => Ok(None),
        Some(raw) => parse(&raw)
            .map(Some)
            .ok_or(ConfigError::Invalid { key, value: raw }),
    }
}

/// Look up a non-negative integer.
fn count_key(value: &Value, key: &'static str) -> Result<Option<usize>, ConfigError> {
    match get_keyword(value, key) {
        None => Ok(None),
        Some(raw) => match get_int(value, key) {
            Some(n) if n >= 0 => Ok(Some(n as usize)),
            _ => Err(ConfigError::Invalid { key, value: raw }),
        },
    }
}

fn positive(n: usize, key: &'static str) -> Result<usize, ConfigError> {
    if n == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: n.to_string(),
        });
    }
    Ok(n)
}

fn window_size(n: usize, key: &'static str) -> Result<usize, ConfigError> {
    let n = positive(n, key)?;
    if n > MAX_WINDOW {
        return Err(ConfigError::Invalid {
            key,
            value: n.to_string(),
        });
    }
    Ok(n)
}

fn to_u32(n: usize, key: &'static str) -> Result<u32, ConfigError> {
    u32::try_from(n).map_err(|_| ConfigError::Invalid {
        key,
        value: n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_plist_is_default() {
        let config = AppConfig::from_sexp("()").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.recognizer.continuous_threshold, 40);
        assert_eq!(config.recognizer.discrete_threshold, 15);
        assert_eq!(config.recognizer.cycle_wrap, 1000);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_sexp(
            "(:dominant-hand :left :frame-delay 5 :discrete-window :quick :draw-joint :hand)",
        )
        .unwrap();
        assert_eq!(config.recognizer.dominant_hand, Hand::Left);
        assert_eq!(config.recognizer.discrete_window, PatternWindow::Quick);
        assert_eq!(config.machine.frame_delay, 5);
        assert_eq!(config.machine.draw_joint, Joint::Hand);
    }

    #[test]
    fn test_majority_smoothing() {
        let config =
            AppConfig::from_sexp("(:smoothing :majority :vote-window 8 :vote-percent 70)").unwrap();
        assert_eq!(
            config.machine.smoothing,
            Smoothing::MajorityVote {
                window: 8,
                percent: 70
            }
        );

        let defaults = AppConfig::from_sexp("(:smoothing :majority)").unwrap();
        assert_eq!(
            defaults.machine.smoothing,
            Smoothing::MajorityVote {
                window: DEFAULT_VOTE_WINDOW,
                percent: DEFAULT_VOTE_PERCENT
            }
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        for bad in [
            "(:dominant-hand :middle)",
            "(:frame-delay -1)",
            "(:frame-delay :soon)",
            "(:smoothing :kalman)",
            "(:vote-percent 150)",
            "(:continuous-window 0)",
            "(:initial-hand-length -0.5)",
            "(:continuous-window 100000000000000)",
            "(:quick-window 10001)",
            "(:cycle-wrap 4294967296)",
            "(:cycle-wrap 0)",
            "(:frame-delay 4294967296)",
            "(:smoothing :majority :vote-window 10001)",
        ] {
            let err = AppConfig::from_sexp(bad).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{}: {}", bad, err);
        }
    }

    #[test]
    fn test_bounds_accepted_at_limit() {
        let config = AppConfig::from_sexp(
            "(:continuous-window 10000 :quick-window 1 :cycle-wrap 4294967295 :frame-delay 0)",
        )
        .unwrap();
        assert_eq!(config.recognizer.continuous_window, MAX_WINDOW);
        assert_eq!(config.recognizer.quick_window, 1);
        assert_eq!(config.recognizer.cycle_wrap, u32::MAX);
        assert_eq!(config.machine.frame_delay, 0);
    }

    #[test]
    fn test_malformed_and_non_plist() {
        assert!(matches!(
            AppConfig::from_sexp("(:frame-delay"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            AppConfig::from_sexp("42"),
            Err(ConfigError::NotAPlist)
        ));
    }

    #[test]
    fn test_to_sexp_reloads() {
        let mut config = AppConfig::default();
        config.recognizer.dominant_hand = Hand::Left;
        config.machine.smoothing = Smoothing::MajorityVote {
            window: 12,
            percent: 55,
        };
        let reloaded = AppConfig::from_sexp(&config.to_sexp()).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AppConfig::load(Path::new("/nonexistent/skeldraw.el")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
