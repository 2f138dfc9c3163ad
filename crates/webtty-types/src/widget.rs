//! Collaborator traits: output pane and remote transport.
//!
//! The terminal core never touches the DOM or the network directly. The
//! host hands it an [`OutputSink`] (the rendered pane plus the editable
//! input line) and, optionally, a [`Transport`] (the HTTP-style mechanism
//! behind string-handler commands and arbitrary free-text execution).

use serde_json::Value;

use crate::error::Result;

// ---------------------------------------------------------------------------
// Output sink
// ---------------------------------------------------------------------------

/// Abstraction over the rendered output pane and the prompt line.
///
/// Markup passed to `append_output` is HTML; a non-browser host is free to
/// strip or reinterpret it.
pub trait OutputSink {
    /// Append a block of markup to the pane.
    fn append_output(&mut self, html: &str, no_scroll: bool);

    /// Empty the pane.
    fn clear_output(&mut self);

    /// Present the prompt symbol and pending input text.
    fn set_prompt(&mut self, ps: &str, input: &str);

    /// Give keyboard focus to the input line.
    fn focus(&mut self);
}

// ---------------------------------------------------------------------------
// Remote transport
// ---------------------------------------------------------------------------

/// Handle identifying one in-flight remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TicketId(pub u64);

/// Outcome of polling an in-flight remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportPoll {
    /// Not settled yet.
    Pending,
    /// Settled with a response object (or a bare string for free text).
    Ready(Value),
    /// Settled with a failure.
    Failed(String),
}

/// Abstraction over the request/response mechanism used by string-handler
/// commands and arbitrary free-text execution.
///
/// Calls are two-phase: `call`/`pass_command` submit and return a ticket,
/// and the host drives settlement by polling. A transport that completes
/// synchronously simply reports `Ready` on the first poll.
pub trait Transport {
    /// Submit a command request to `url`. The payload is the JSON object
    /// built by the dispatcher (`{<param>: .., <param>_data: ..}`).
    fn call(&mut self, url: &str, method: &str, payload: &Value) -> Result<TicketId>;

    /// Submit a free-text line for arbitrary execution.
    fn pass_command(&mut self, line: &str) -> Result<TicketId>;

    /// Poll a previously submitted call.
    fn poll(&mut self, ticket: TicketId) -> TransportPoll;
}
