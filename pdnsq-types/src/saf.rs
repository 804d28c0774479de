//! Streaming Autonomy Format (SAF) framer (§4.4): a per-fetch state machine
//! over the `{cond?, msg?, obj?}` JSON-lines envelope.

use serde_json::Value;

/// One decoded SAF envelope line.
#[derive(Debug, Clone, Default)]
pub struct SafEnvelope {
    pub cond: Option<String>,
    pub msg: Option<String>,
    pub obj: Option<Value>,
}

impl SafEnvelope {
    /// Parses a single JSON-lines payload as a SAF envelope. An object with
    /// neither `cond` nor `obj` is a valid keepalive.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(line)?;
        Ok(Self {
            cond: value
                .get("cond")
                .and_then(Value::as_str)
                .map(str::to_string),
            msg: value.get("msg").and_then(Value::as_str).map(str::to_string),
            obj: value.get("obj").cloned(),
        })
    }
}

/// The message surfaced on a SAF terminator synthesized after premature EOF.
pub const NO_TERMINATOR_MSG: &str = "Data transfer failed — No SAF terminator at end of stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafState {
    Init,
    Begin,
    Ongoing,
    Succeeded,
    Limited,
    Failed,
    Missing,
    /// Locally-originated terminal state set by the output-limit guard;
    /// distinct from a server-signaled `limited`.
    WeLimited,
}

impl SafState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Limited | Self::Failed | Self::Missing | Self::WeLimited
        )
    }
}

/// Per-fetch SAF state machine (§4.4).
#[derive(Debug, Clone)]
pub struct SafFramer {
    state: SafState,
    msg: Option<String>,
}

impl Default for SafFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl SafFramer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SafState::Init,
            msg: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SafState {
        self.state
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    /// Advances the state machine by one envelope. Returns `true` once the
    /// state has become terminal (the caller should stop processing).
    pub fn advance(&mut self, envelope: &SafEnvelope) -> bool {
        match envelope.cond.as_deref() {
            Some("begin") => {
                self.state = if self.state == SafState::Init {
                    SafState::Begin
                } else {
                    SafState::Missing
                };
            }
            Some("ongoing") => {
                self.state = if matches!(self.state, SafState::Begin | SafState::Ongoing) {
                    SafState::Ongoing
                } else {
                    SafState::Missing
                };
            }
            None if envelope.obj.is_some() => {
                self.state = if matches!(self.state, SafState::Begin | SafState::Ongoing) {
                    SafState::Ongoing
                } else {
                    SafState::Missing
                };
            }
            None => {
                // Keepalive: an envelope with neither cond nor obj. No transition.
            }
            Some("succeeded") => {
                self.state = SafState::Succeeded;
                self.msg = envelope.msg.clone();
            }
            Some("limited") => {
                self.state = SafState::Limited;
                self.msg = envelope.msg.clone();
            }
            Some("failed") => {
                self.state = SafState::Failed;
                self.msg = envelope.msg.clone();
            }
            Some(_unknown) => {
                self.state = SafState::Missing;
                self.msg = envelope.msg.clone();
            }
        }
        self.state.is_terminal()
    }

    /// Called when the underlying stream reaches EOF. If the machine never
    /// reached a terminal state, synthesizes `missing` (§4.4).
    pub fn on_eof(&mut self) {
        if matches!(self.state, SafState::Init | SafState::Begin | SafState::Ongoing) {
            self.state = SafState::Missing;
            self.msg = Some(NO_TERMINATOR_MSG.to_string());
        }
    }

    /// Forces the locally-originated `we_limited` terminal state (the
    /// output-limit guard, §4.8).
    pub fn force_we_limited(&mut self) {
        self.state = SafState::WeLimited;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(cond: Option<&str>, msg: Option<&str>, has_obj: bool) -> SafEnvelope {
        SafEnvelope {
            cond: cond.map(str::to_string),
            msg: msg.map(str::to_string),
            obj: has_obj.then(|| serde_json::json!({})),
        }
    }

    #[test]
    fn begin_then_ongoing_then_succeeded() {
        let mut framer = SafFramer::new();
        assert!(!framer.advance(&env(Some("begin"), None, false)));
        assert_eq!(framer.state(), SafState::Begin);
        assert!(!framer.advance(&env(None, None, true)));
        assert_eq!(framer.state(), SafState::Ongoing);
        assert!(framer.advance(&env(Some("succeeded"), Some("ok"), false)));
        assert_eq!(framer.state(), SafState::Succeeded);
        assert_eq!(framer.message(), Some("ok"));
    }

    #[test]
    fn unknown_cond_goes_to_missing() {
        let mut framer = SafFramer::new();
        framer.advance(&env(Some("begin"), None, false));
        assert!(framer.advance(&env(Some("something_new"), None, false)));
        assert_eq!(framer.state(), SafState::Missing);
    }

    /// Invariant 2 (spec.md §8): any prefix ending without a terminal cond
    /// results in `missing` after EOF.
    #[test]
    fn eof_without_terminator_is_missing() {
        let mut framer = SafFramer::new();
        framer.advance(&env(Some("begin"), None, false));
        framer.advance(&env(None, None, true));
        assert!(!framer.state().is_terminal());
        framer.on_eof();
        assert_eq!(framer.state(), SafState::Missing);
        assert_eq!(framer.message(), Some(NO_TERMINATOR_MSG));
    }

    #[test]
    fn eof_after_terminal_state_is_a_no_op() {
        let mut framer = SafFramer::new();
        framer.advance(&env(Some("succeeded"), Some("ok"), false));
        framer.on_eof();
        assert_eq!(framer.state(), SafState::Succeeded);
        assert_eq!(framer.message(), Some("ok"));
    }

    #[test]
    fn keepalive_causes_no_transition() {
        let mut framer = SafFramer::new();
        framer.advance(&env(Some("begin"), None, false));
        framer.advance(&env(None, None, false));
        assert_eq!(framer.state(), SafState::Begin);
    }

    #[test]
    fn we_limited_is_distinct_from_server_limited() {
        let mut framer = SafFramer::new();
        framer.advance(&env(Some("begin"), None, false));
        framer.force_we_limited();
        assert_eq!(framer.state(), SafState::WeLimited);
        assert!(framer.state().is_terminal());
    }
}
