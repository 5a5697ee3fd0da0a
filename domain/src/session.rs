//! Session lifecycle states.

use std::fmt;

/// State of the coordinator link as driven by the supervisor.
///
/// A healthy agent cycles `Idle → Dialing → Streaming → Closing → Idle`
/// until shutdown is requested, after which it moves to `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Dialing,
    Streaming,
    Closing,
    Terminated,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Dialing => "dialing",
            SessionState::Streaming => "streaming",
            SessionState::Closing => "closing",
            SessionState::Terminated => "terminated",
        };
        write!(f, "{name}")
    }
}
