//! Command data model: parsed invocations, handler shapes, and the live
//! per-cycle state record.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use webtty_types::error::Result;
use webtty_types::widget::{OutputSink, Transport};

use crate::token::OptionToken;

/// Collaborators handed to every dispatching call, hook, and handler.
///
/// The output sink is mandatory; the transport is optional (a terminal
/// with only local commands needs none).
pub struct Environment<'a> {
    pub output: &'a mut dyn OutputSink,
    pub transport: Option<&'a mut dyn Transport>,
}

/// Updates a handler (or a remote response object) contributes to the
/// live [`CommandState`].
///
/// Field names follow the wire format of a remote response object, so a
/// JSON body like `{"out": "done", "next": "confirm %cmd%"}` deserializes
/// directly. Keys outside the six state fields land in `extra` and are
/// only acted on when a matching response normalizer is registered.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatePatch {
    /// Prompt symbol override for the next prompt.
    pub ps: Option<String>,
    /// Pending input text to pre-fill.
    #[serde(rename = "in")]
    pub input: Option<String>,
    /// Rendered output markup.
    pub out: Option<String>,
    /// Raw text of the last command.
    pub last: Option<String>,
    /// Follow-up command template containing a `%cmd%` placeholder.
    pub next: Option<String>,
    /// Opaque payload forwarded to remote calls.
    pub data: Option<Value>,
    /// Keys outside the state fields, for custom response normalizers.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl StatePatch {
    /// Overlay `other` onto this patch (later fields win).
    pub fn merge(&mut self, other: StatePatch) {
        if other.ps.is_some() {
            self.ps = other.ps;
        }
        if other.input.is_some() {
            self.input = other.input;
        }
        if other.out.is_some() {
            self.out = other.out;
        }
        if other.last.is_some() {
            self.last = other.last;
        }
        if other.next.is_some() {
            self.next = other.next;
        }
        if other.data.is_some() {
            self.data = other.data;
        }
        self.extra.extend(other.extra);
    }
}

/// The single live record governing how the prompt updates after a cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandState {
    pub ps: Option<String>,
    pub input: Option<String>,
    pub out: Option<String>,
    pub last: Option<String>,
    pub next: Option<String>,
    pub data: Option<Value>,
}

impl CommandState {
    /// Apply the named state fields of a patch. `extra` keys are routed
    /// through response normalizers, never applied directly.
    pub fn apply(&mut self, patch: &StatePatch) {
        if let Some(ps) = &patch.ps {
            self.ps = Some(ps.clone());
        }
        if let Some(input) = &patch.input {
            self.input = Some(input.clone());
        }
        if let Some(out) = &patch.out {
            self.out = Some(out.clone());
        }
        if let Some(last) = &patch.last {
            self.last = Some(last.clone());
        }
        if let Some(next) = &patch.next {
            self.next = Some(next.clone());
        }
        if let Some(data) = &patch.data {
            self.data = Some(data.clone());
        }
    }

    /// Look up one field by its wire name.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "ps" => self.ps.clone().map(Value::String),
            "in" => self.input.clone().map(Value::String),
            "out" => self.out.clone().map(Value::String),
            "last" => self.last.clone().map(Value::String),
            "next" => self.next.clone().map(Value::String),
            "data" => self.data.clone(),
            _ => None,
        }
    }
}

/// Parsed, transient representation of one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandObject {
    /// The whitespace-split tokens of the line.
    pub tokens: Vec<String>,
    /// Values bound by the option schema. A bare flag maps to `None`
    /// (present without a value); stringified positional indices map to
    /// their token.
    pub opts: BTreeMap<String, Option<String>>,
    /// State updates recorded by handlers and hooks during the cycle.
    pub patch: StatePatch,
}

impl CommandObject {
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens,
            opts: BTreeMap::new(),
            patch: StatePatch::default(),
        }
    }

    /// The command name (first token).
    pub fn name(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or("")
    }

    /// Whether an option key was seen at all (with or without a value).
    pub fn has(&self, key: &str) -> bool {
        self.opts.contains_key(key)
    }

    /// The value bound to an option key, if one was committed.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.opts.get(key).and_then(|v| v.as_deref())
    }

    /// The token bound to a positional wildcard.
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.arg(&index.to_string())
    }

    /// The bound options as a JSON object, for the remote payload. Bare
    /// flags serialize as `false`, mirroring presence-without-value.
    pub fn args_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (key, value) in &self.opts {
            let json = match value {
                Some(v) => Value::String(v.clone()),
                None => Value::Bool(false),
            };
            map.insert(key.clone(), json);
        }
        Value::Object(map)
    }
}

/// A local command handler. Mutates the command object (typically its
/// `patch`) in place; an `Err` renders as the cycle's output.
pub type LocalFn = Box<dyn FnMut(&mut CommandObject, &mut Environment<'_>) -> Result<()>>;

/// A pre-hook or post-callback. Returning `false` from a pre-hook vetoes
/// the cycle; post-callback returns are ignored.
pub type HookFn = Box<dyn FnMut(&mut CommandObject, &mut Environment<'_>) -> bool>;

/// A response normalizer: inspects the whole command object and returns
/// the state updates to fold into the live [`CommandState`].
pub type ResponseFn = Box<dyn FnMut(&CommandObject) -> StatePatch>;

/// Native commands that need session internals to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Clear,
    History,
    Help,
}

/// How a command executes.
pub enum Handler {
    /// A host-supplied function run synchronously.
    Local(LocalFn),
    /// A remote endpoint URL; empty means the configured default.
    Remote(String),
    /// A native command executed against session internals.
    Builtin(Builtin),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(_) => write!(f, "Local(..)"),
            Self::Remote(url) => write!(f, "Remote({url:?})"),
            Self::Builtin(b) => write!(f, "Builtin({b:?})"),
        }
    }
}

/// A registered command: name, help text, option schema, and handler.
#[derive(Debug)]
pub struct CommandSpec {
    pub name: String,
    pub help: String,
    pub options: Vec<OptionToken>,
    pub handler: Handler,
}

impl CommandSpec {
    /// A command backed by a local function, with no options or help.
    pub fn local(
        name: &str,
        handler: impl FnMut(&mut CommandObject, &mut Environment<'_>) -> Result<()> + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            help: String::new(),
            options: Vec::new(),
            handler: Handler::Local(Box::new(handler)),
        }
    }

    /// A command backed by a remote endpoint.
    pub fn remote(name: &str, endpoint: &str) -> Self {
        Self {
            name: name.to_string(),
            help: String::new(),
            options: Vec::new(),
            handler: Handler::Remote(endpoint.to_string()),
        }
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help = help.to_string();
        self
    }

    pub fn with_options(mut self, options: Vec<OptionToken>) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_deserializes_from_wire_names() {
        let patch: StatePatch =
            serde_json::from_value(json!({"out": "done", "in": "next text", "status": 7}))
                .unwrap();
        assert_eq!(patch.out.as_deref(), Some("done"));
        assert_eq!(patch.input.as_deref(), Some("next text"));
        assert_eq!(patch.extra.get("status"), Some(&json!(7)));
        assert!(patch.ps.is_none());
    }

    #[test]
    fn patch_merge_later_wins() {
        let mut a = StatePatch {
            out: Some("first".into()),
            ps: Some("$".into()),
            ..Default::default()
        };
        a.merge(StatePatch {
            out: Some("second".into()),
            ..Default::default()
        });
        assert_eq!(a.out.as_deref(), Some("second"));
        assert_eq!(a.ps.as_deref(), Some("$"));
    }

    #[test]
    fn state_apply_sets_only_present_fields() {
        let mut state = CommandState {
            last: Some("kept".into()),
            ..Default::default()
        };
        state.apply(&StatePatch {
            out: Some("hello".into()),
            ..Default::default()
        });
        assert_eq!(state.out.as_deref(), Some("hello"));
        assert_eq!(state.last.as_deref(), Some("kept"));
    }

    #[test]
    fn state_get_by_wire_name() {
        let state = CommandState {
            input: Some("typed".into()),
            data: Some(json!({"k": 1})),
            ..Default::default()
        };
        assert_eq!(state.get("in"), Some(json!("typed")));
        assert_eq!(state.get("data"), Some(json!({"k": 1})));
        assert_eq!(state.get("out"), None);
        assert_eq!(state.get("bogus"), None);
    }

    #[test]
    fn args_json_maps_bare_flags_to_false() {
        let mut obj = CommandObject::new(vec!["history".into(), "clear".into()]);
        obj.opts.insert("clear".into(), None);
        obj.opts.insert("1".into(), Some("clear".into()));
        assert_eq!(obj.args_json(), json!({"clear": false, "1": "clear"}));
    }

    #[test]
    fn handler_debug_names_variant() {
        let h = Handler::Remote("/api".into());
        assert_eq!(format!("{h:?}"), "Remote(\"/api\")");
    }
}
