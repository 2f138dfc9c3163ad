//! Terminal core for webtty.
//!
//! The terminal is a registry-based dispatch system. Commands are
//! registered by name with an option schema and a handler (a local
//! function, a remote endpoint, or a native builtin). `TerminalSession`
//! parses input lines, resolves the command, and drives the dispatch
//! pipeline: pre-hooks, execution, response normalization,
//! post-callbacks, rendering.

pub mod command;
pub mod history;
pub mod native;
pub mod registry;
pub mod session;
pub mod token;

/// Handler shapes and the per-cycle command data model.
pub use command::{
    Builtin, CommandObject, CommandSpec, CommandState, Environment, Handler, HookFn, LocalFn,
    ResponseFn, StatePatch,
};
/// Bounded command history with a navigation cursor.
pub use history::HistoryLog;
/// The four registration tables and their entry types.
pub use registry::{Registration, Registry, RegistryKind};
/// One terminal instance: registry, history, and the dispatch machine.
pub use session::TerminalSession;
/// Pure command-line tokenizer and option schema tokens.
pub use token::{OptionToken, tokenize};
