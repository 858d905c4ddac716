//! Front-end abstraction shared by the HUD and the log view.
//!
//! A front-end is a synchronous state machine: it consumes typed lines and
//! server events, returns the outbound effects to perform, and exposes what
//! should be drawn. All I/O lives in [`crate::terminal`].

use std::time::Duration;

use stockmarket_core::{ClientEvent, ServerEvent};

/// Outbound work requested by a front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send immediately.
    Send(ClientEvent),
    /// Send once `delay` has elapsed.
    SendAfter { event: ClientEvent, delay: Duration },
}

impl Effect {
    pub fn event(&self) -> &ClientEvent {
        match self {
            Self::Send(event) | Self::SendAfter { event, .. } => event,
        }
    }
}

/// What the terminal should do with the screen after a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenUpdate {
    /// Clear and draw this content.
    Redraw(String),
    /// Print these lines below what is already shown.
    Append(Vec<String>),
    Unchanged,
}

/// Terminal front-end driven by input lines and server events.
pub trait FrontEnd: Send {
    /// Transport is up; nothing has been received yet.
    fn on_connected(&mut self) -> Vec<Effect> {
        Vec::new()
    }

    /// One line typed by the user.
    fn on_input(&mut self, line: &str) -> Vec<Effect>;

    /// One decoded event from the server.
    fn on_event(&mut self, event: ServerEvent) -> Vec<Effect>;

    /// Transport lost; no further events will arrive.
    fn on_disconnected(&mut self, reason: &str);

    /// Pending screen output since the last call.
    fn take_screen(&mut self) -> ScreenUpdate;
}

/// Parse a leading integer the way a forgiving prompt should: surrounding
/// whitespace is skipped, an optional sign is honoured, and trailing
/// non-digits are ignored. `None` when no digits lead the input.
pub fn parse_leading_int(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: &str = {
        let end = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return None;
    }
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Normalise a typed command: trimmed and uppercased.
pub fn normalise(line: &str) -> String {
    line.trim().to_uppercase()
}
