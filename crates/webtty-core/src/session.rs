//! Terminal session: the command-dispatch state machine.
//!
//! `TerminalSession` owns the registry, the history log, and the single
//! live `CommandState` of the current cycle. One call to `run_command`
//! drives a full cycle — resolve, pre-hooks, execute, normalize,
//! post-callbacks, render — or suspends at the remote-call boundary,
//! where `pump` completes it once the transport settles. Commands issued
//! while a call is in flight are queued and replayed in order.

use std::collections::VecDeque;

use serde_json::Value;

use webtty_types::config::{Settings, SettingsPatch};
use webtty_types::widget::{TicketId, TransportPoll};

use crate::command::{
    Builtin, CommandObject, CommandState, Environment, Handler, HookFn, StatePatch,
};
use crate::history::HistoryLog;
use crate::native;
use crate::registry::{Registration, Registry, RegistryKind};
use crate::token::tokenize;

/// What kind of remote call a suspended cycle is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteKind {
    /// A registered command with a remote-endpoint handler.
    Endpoint,
    /// Free text forwarded for arbitrary execution.
    Arbitrary,
}

/// A cycle suspended at the transport boundary.
struct PendingRemote {
    ticket: TicketId,
    /// Generation stamped at submit; a mismatch at settlement means the
    /// cycle was cancelled and the result is discarded.
    token: u64,
    kind: RemoteKind,
    cmd_name: Option<String>,
    obj: Option<CommandObject>,
}

enum DispatchState {
    Idle,
    AwaitingRemote(PendingRemote),
}

/// How the executing stage should proceed for a resolved command.
enum Exec {
    Local,
    Builtin(Builtin),
    Remote(String),
}

/// One terminal instance: registry, history, live command state, and the
/// dispatch state machine. Multiple sessions coexist independently.
pub struct TerminalSession {
    settings: Settings,
    registry: Registry,
    state: CommandState,
    history: HistoryLog,
    before_cmd: Option<HookFn>,
    after_cmd: Option<HookFn>,
    /// Mute flag for the cycle in progress.
    quiet: bool,
    /// Prompt symbol currently displayed on the input line.
    current_ps: String,
    dispatch: DispatchState,
    /// Commands received while a remote call was in flight.
    queued: VecDeque<(String, bool)>,
    /// Cycle counter; stamps remote submissions as a staleness guard.
    generation: u64,
}

impl TerminalSession {
    pub fn new(settings: Settings) -> Self {
        let mut registry = Registry::new();
        native::register_native_responses(&mut registry);
        if settings.native_commands {
            native::register_native_commands(&mut registry);
        }
        let history = HistoryLog::new(settings.history_max);
        let current_ps = settings.ps.clone();
        Self {
            settings,
            registry,
            state: CommandState::default(),
            history,
            before_cmd: None,
            after_cmd: None,
            quiet: false,
            current_ps,
            dispatch: DispatchState::Idle,
            queued: VecDeque::new(),
            generation: 0,
        }
    }

    /// Render the welcome message and the initial prompt.
    pub fn init(&mut self, env: &mut Environment<'_>) {
        log::debug!("terminal session starting");
        env.output
            .append_output(&format!("<div>{}</div>", self.settings.i18n.welcome), false);
        self.current_ps = self.settings.ps.clone();
        env.output.set_prompt(&self.current_ps, "");
        env.output.focus();
    }

    // -- Registration and configuration surface --

    /// Add an entry to the registry. See [`Registry::register`].
    pub fn register(&mut self, entry: Registration) -> bool {
        self.registry.register(entry)
    }

    /// Remove an entry from the registry. See [`Registry::unregister`].
    pub fn unregister(&mut self, kind: RegistryKind, name: &str) -> bool {
        self.registry.unregister(kind, name)
    }

    /// Install or clear the global pre-hook run before every command.
    pub fn set_before_cmd(&mut self, hook: Option<HookFn>) {
        self.before_cmd = hook;
    }

    /// Install or clear the global post-callback run after every command.
    pub fn set_after_cmd(&mut self, hook: Option<HookFn>) {
        self.after_cmd = hook;
    }

    /// Merge a patch into the live command state.
    pub fn set_command_option(&mut self, patch: &StatePatch) {
        self.state.apply(patch);
    }

    /// Read one live command-state field by its wire name.
    pub fn get_command_option(&self, key: &str) -> Option<Value> {
        self.state.get(key)
    }

    /// Apply a partial settings update.
    pub fn change_settings(&mut self, patch: SettingsPatch) {
        let old_max = self.settings.history_max;
        patch.apply(&mut self.settings);
        if self.settings.history_max != old_max {
            self.history.set_max(self.settings.history_max);
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Whether a remote call is currently in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self.dispatch, DispatchState::AwaitingRemote(_))
    }

    // -- Dispatch --

    /// Run a raw input line as a command. When muted, the echo line is
    /// suppressed and the line is not recorded to history.
    ///
    /// While a remote call is in flight the line is queued and replayed
    /// after settlement; commands never race.
    pub fn run_command(&mut self, env: &mut Environment<'_>, raw: &str, mute: bool) {
        if self.is_pending() {
            log::debug!("remote call in flight; queueing {raw:?}");
            self.queued.push_back((raw.to_string(), mute));
            return;
        }
        self.quiet = mute;
        self.cycle(env, raw);
    }

    /// Poll the transport for the pending settlement and complete the
    /// suspended cycle. Returns `true` when a settlement (or a stale
    /// discard) occurred.
    pub fn pump(&mut self, env: &mut Environment<'_>) -> bool {
        let ticket = match &self.dispatch {
            DispatchState::AwaitingRemote(pending) => pending.ticket,
            DispatchState::Idle => return false,
        };
        let poll = match env.transport.as_deref_mut() {
            Some(transport) => transport.poll(ticket),
            None => TransportPoll::Failed("transport detached".to_string()),
        };
        let outcome = match poll {
            TransportPoll::Pending => return false,
            TransportPoll::Ready(value) => Ok(value),
            TransportPoll::Failed(msg) => Err(msg),
        };
        let pending = match std::mem::replace(&mut self.dispatch, DispatchState::Idle) {
            DispatchState::AwaitingRemote(pending) => pending,
            DispatchState::Idle => return false,
        };

        if pending.token != self.generation {
            log::debug!("discarding stale settlement (ticket {:?})", pending.ticket);
            if let Some((line, mute)) = self.queued.pop_front() {
                self.run_command(env, &line, mute);
            }
            return true;
        }

        let mut obj = pending.obj;
        match (pending.kind, outcome) {
            (RemoteKind::Endpoint, Ok(value)) => {
                if value.is_object() {
                    match serde_json::from_value::<StatePatch>(value) {
                        Ok(patch) => {
                            if let Some(o) = obj.as_mut() {
                                o.patch.merge(patch);
                            }
                            if let Some(o) = obj.as_ref() {
                                self.normalize(o);
                            }
                        }
                        Err(e) => log::warn!("unusable response object: {e}"),
                    }
                } else {
                    log::debug!("ignoring non-object response");
                }
            }
            (RemoteKind::Endpoint, Err(msg)) => {
                log::warn!("remote call failed: {msg}");
                self.state.out = Some(self.settings.i18n.error_ajax.clone());
            }
            (RemoteKind::Arbitrary, Ok(value)) => {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                self.state.out = Some(text);
            }
            (RemoteKind::Arbitrary, Err(msg)) => {
                self.state.out = Some(msg);
            }
        }
        self.render(env, pending.cmd_name, obj);
        true
    }

    /// Abandon the in-flight cycle: its settlement will be discarded when
    /// it arrives. The transport call itself is not aborted.
    pub fn cancel_pending(&mut self) -> bool {
        match &self.dispatch {
            DispatchState::AwaitingRemote(pending) => {
                log::debug!("cancelling pending cycle (ticket {:?})", pending.ticket);
                self.generation = self.generation.wrapping_add(1);
                true
            }
            DispatchState::Idle => false,
        }
    }

    /// Clear the live command state (including any pending `next`
    /// template) and re-present an empty prompt.
    pub fn reset(&mut self, env: &mut Environment<'_>) {
        self.state = CommandState::default();
        self.render(env, None, None);
    }

    /// Append a block of output outside any command cycle.
    pub fn echo(&self, env: &mut Environment<'_>, text: &str, no_scroll: bool) {
        if !text.is_empty() {
            env.output.append_output(
                &format!("<div><div class=\"cmd_out\">{text}</div></div>"),
                no_scroll,
            );
        }
    }

    /// Tab completion over registered command names.
    ///
    /// Exactly one match rewrites the input to `<name> `; several matches
    /// render the sorted candidate list and re-present the current input;
    /// none leaves everything unchanged. Inactive while autocomplete is
    /// off, a `next` template is pending, or a remote call is in flight.
    pub fn complete(&mut self, env: &mut Environment<'_>, current: &str) {
        if !self.settings.autocomplete || self.state.next.is_some() || self.is_pending() {
            return;
        }
        if current.contains(char::is_whitespace) {
            return;
        }
        let matches = self.registry.completions(current);
        match matches.as_slice() {
            [] => {}
            [only] => {
                let filled = format!("{only} ");
                env.output.set_prompt(&self.current_ps, &filled);
            }
            _ => {
                self.state.out = Some(format!("<ul><li>{}</li></ul>", matches.join("</li><li>")));
                self.state.input = Some(current.to_string());
                self.render(env, None, None);
            }
        }
    }

    // -- History navigation (up/down arrow wiring) --

    /// Previous history entry, wrapping from the oldest to the newest.
    pub fn history_prev(&mut self) -> Option<&str> {
        if self.settings.history_max == 0 {
            return None;
        }
        self.history.prev()
    }

    /// Next history entry; `None` past the newest (host clears the input).
    pub fn history_next(&mut self) -> Option<&str> {
        if self.settings.history_max == 0 {
            return None;
        }
        self.history.next_entry()
    }

    // -- Cycle internals --

    fn cycle(&mut self, env: &mut Environment<'_>, raw: &str) {
        // `last` records the typed text even when a chained template
        // rewrites the line actually executed.
        self.state.last = Some(raw.to_string());

        let mut history_eligible = true;
        let line = match self.state.next.take() {
            Some(template) => {
                history_eligible = false;
                substitute_next(&template, raw)
            }
            None => raw.to_string(),
        };

        if line.trim().is_empty() {
            return self.render(env, None, None);
        }
        let cmd_name = match line.split_whitespace().next() {
            Some(name) => name.to_string(),
            None => return self.render(env, None, None),
        };

        if !self.registry.has_command(&cmd_name) {
            if self.settings.allow_arbitrary {
                return self.start_arbitrary(env, &line);
            }
            if !self.quiet {
                self.state.out = Some(format!(
                    "{cmd_name} : {}",
                    self.settings.i18n.error_not_found,
                ));
            }
            return self.render(env, None, None);
        }

        let schema = match self.registry.command(&cmd_name) {
            Some(spec) => spec.options.clone(),
            None => Vec::new(),
        };
        let Some(mut obj) = tokenize(&line, Some(&schema)) else {
            return self.render(env, None, None);
        };

        // PreHook stage: global hook first, then the per-command hook.
        // A veto aborts straight to Rendering; the vetoed cycle runs no
        // handler and no post-callbacks, but updates the hook recorded
        // in the object's patch are still folded in, so a hook can leave
        // an explanation in `out`.
        if let Some(hook) = self.before_cmd.as_mut() {
            let ok = hook(&mut obj, env);
            self.normalize(&obj);
            if !ok {
                log::debug!("{cmd_name} vetoed by global pre-hook");
                return self.render(env, None, None);
            }
        }
        if let Some(ok) = self.registry.run_pre_hook(&cmd_name, &mut obj, env) {
            self.normalize(&obj);
            if !ok {
                log::debug!("{cmd_name} vetoed by pre-hook");
                return self.render(env, None, None);
            }
        }

        // History records only after pre-hooks pass, so a hook can veto
        // recording. Chained cycles are never recorded.
        if !self.quiet && history_eligible && self.settings.history_max > 0 {
            let entry = raw.trim();
            if !entry.is_empty() {
                self.history.push(entry);
            }
        }

        let exec = match self.registry.command(&cmd_name).map(|spec| &spec.handler) {
            Some(Handler::Local(_)) => Exec::Local,
            Some(Handler::Builtin(builtin)) => Exec::Builtin(*builtin),
            Some(Handler::Remote(endpoint)) => Exec::Remote(endpoint.clone()),
            // A pre-hook may have unregistered the command mid-cycle.
            None => {
                self.state.out = Some(self.settings.i18n.error_bad_method.clone());
                return self.render(env, Some(cmd_name), Some(obj));
            }
        };
        match exec {
            Exec::Local => {
                let mut failure = None;
                if let Some(spec) = self.registry.command_mut(&cmd_name)
                    && let Handler::Local(run) = &mut spec.handler
                    && let Err(e) = run(&mut obj, env)
                {
                    failure = Some(e.to_string());
                }
                if let Some(msg) = failure {
                    log::warn!("{cmd_name} failed: {msg}");
                    self.state.out = Some(msg);
                }
                self.normalize(&obj);
                self.render(env, Some(cmd_name), Some(obj));
            }
            Exec::Builtin(builtin) => {
                self.exec_builtin(builtin, &mut obj);
                self.normalize(&obj);
                self.render(env, Some(cmd_name), Some(obj));
            }
            Exec::Remote(endpoint) => self.start_remote(env, cmd_name, obj, endpoint),
        }
    }

    /// Submit a registered command to its remote endpoint and suspend.
    fn start_remote(
        &mut self,
        env: &mut Environment<'_>,
        cmd_name: String,
        obj: CommandObject,
        endpoint: String,
    ) {
        let url = if endpoint.is_empty() {
            self.settings.url.clone()
        } else {
            endpoint
        };
        if url.is_empty() {
            self.state.out = Some(self.settings.i18n.error_bad_method.clone());
            return self.render(env, Some(cmd_name), Some(obj));
        }
        let payload = self.remote_payload(&cmd_name, &obj);
        let Some(transport) = env.transport.as_deref_mut() else {
            self.state.out = Some(self.settings.i18n.error_bad_method.clone());
            return self.render(env, Some(cmd_name), Some(obj));
        };
        let submitted = transport.call(&url, &self.settings.method, &payload);
        match submitted {
            Ok(ticket) => {
                log::debug!("{cmd_name} submitted to {url} ({ticket:?})");
                self.dispatch = DispatchState::AwaitingRemote(PendingRemote {
                    ticket,
                    token: self.generation,
                    kind: RemoteKind::Endpoint,
                    cmd_name: Some(cmd_name),
                    obj: Some(obj),
                });
            }
            Err(e) => {
                log::warn!("transport submit failed: {e}");
                self.state.out = Some(self.settings.i18n.error_ajax.clone());
                self.render(env, Some(cmd_name), Some(obj));
            }
        }
    }

    /// Forward free text to the transport's arbitrary-command handler
    /// and suspend.
    fn start_arbitrary(&mut self, env: &mut Environment<'_>, line: &str) {
        self.history.push(line.trim());
        let Some(transport) = env.transport.as_deref_mut() else {
            self.state.out = Some(self.settings.i18n.error_bad_method.clone());
            return self.render(env, None, None);
        };
        let submitted = transport.pass_command(line);
        match submitted {
            Ok(ticket) => {
                log::debug!("free text submitted ({ticket:?})");
                self.dispatch = DispatchState::AwaitingRemote(PendingRemote {
                    ticket,
                    token: self.generation,
                    kind: RemoteKind::Arbitrary,
                    cmd_name: None,
                    obj: None,
                });
            }
            Err(e) => {
                self.state.out = Some(e.to_string());
                self.render(env, None, None);
            }
        }
    }

    /// The request body for a remote command: the command key (or the
    /// `in` override) under the configured parameter name, and the
    /// command object (or the `data` override) under `<param>_data`.
    fn remote_payload(&self, cmd_name: &str, obj: &CommandObject) -> Value {
        let key = self
            .state
            .input
            .clone()
            .unwrap_or_else(|| cmd_name.to_string());
        let data = self.state.data.clone().unwrap_or_else(|| obj.args_json());
        let mut map = serde_json::Map::new();
        map.insert(self.settings.param.clone(), Value::String(key));
        map.insert(format!("{}_data", self.settings.param), data);
        Value::Object(map)
    }

    /// Fold the object's patch into the live state through the response
    /// normalizer table. Keys without a registered normalizer are
    /// ignored.
    fn normalize(&mut self, obj: &CommandObject) {
        const FIELD_KEYS: [&str; 6] = ["ps", "in", "out", "last", "next", "data"];
        for key in FIELD_KEYS {
            let present = match key {
                "ps" => obj.patch.ps.is_some(),
                "in" => obj.patch.input.is_some(),
                "out" => obj.patch.out.is_some(),
                "last" => obj.patch.last.is_some(),
                "next" => obj.patch.next.is_some(),
                "data" => obj.patch.data.is_some(),
                _ => false,
            };
            if present && let Some(patch) = self.registry.run_response(key, obj) {
                self.state.apply(&patch);
            }
        }
        for key in obj.patch.extra.keys() {
            if let Some(patch) = self.registry.run_response(key, obj) {
                self.state.apply(&patch);
            }
        }
    }

    fn exec_builtin(&mut self, builtin: Builtin, obj: &mut CommandObject) {
        match builtin {
            Builtin::Clear => {
                obj.patch.last = Some(String::new());
                obj.patch.out = Some(String::new());
            }
            Builtin::History => {
                if obj.has("clear") {
                    self.history.clear();
                    obj.patch.out = Some("History cleared.".to_string());
                } else if !self.history.is_empty() {
                    let mut out = String::from("<ol>");
                    for entry in self.history.entries() {
                        out.push_str("<li>");
                        out.push_str(entry);
                        out.push_str("</li>");
                    }
                    out.push_str("</ol>");
                    obj.patch.out = Some(out);
                }
            }
            Builtin::Help => self.exec_help(obj),
        }
    }

    fn exec_help(&self, obj: &mut CommandObject) {
        let arg = obj.positional(1).map(str::to_string);
        match arg.as_deref().filter(|a| !a.is_empty()) {
            Some(arg) => {
                if obj.has("-a") || obj.has("--all") {
                    let mut out = String::from("<b>Available commands:</b></br></br><ul>");
                    for name in self.registry.command_names() {
                        let help = self
                            .registry
                            .command(&name)
                            .map(|spec| spec.help.as_str())
                            .unwrap_or("");
                        out.push_str(&format!("<li><p><b>{name}</b> - {help}</p></br></li>"));
                    }
                    out.push_str("</ul>\n");
                    obj.patch.out = Some(out);
                } else if let Some(spec) = self.registry.command(arg) {
                    let body = if spec.help.is_empty() {
                        "No help entry available."
                    } else {
                        &spec.help
                    };
                    obj.patch.out = Some(format!("<b>{arg}</b> - {body}\n"));
                } else {
                    obj.patch.out = Some(format!(
                        "help: The \"{arg}\" option does not exist.\n"
                    ));
                }
            }
            None => {
                let mut out = String::from(
                    "Use \"help [command name]\" to display specific info \
                     about a command.</br>\nAvailable commands are:</br><ul class=\"sq-li\">",
                );
                for name in self.registry.command_names() {
                    out.push_str(&format!("<li>{name}</li>"));
                }
                out.push_str("</ul>\n");
                obj.patch.out = Some(out);
            }
        }
    }

    /// Rendering stage: emit the cycle's output, run post-callbacks,
    /// present the next prompt, and reset the live state (carrying only
    /// the `next` template forward).
    fn render(
        &mut self,
        env: &mut Environment<'_>,
        cmd_name: Option<String>,
        obj: Option<CommandObject>,
    ) {
        let ps = self
            .state
            .ps
            .clone()
            .unwrap_or_else(|| self.settings.ps.clone());
        let out = self.state.out.clone().unwrap_or_default();
        let input = self.state.input.clone().unwrap_or_default();
        let last = self.state.last.clone().unwrap_or_default();
        let next = self.state.next.clone();

        if self.quiet {
            env.output
                .append_output(&format!("<div><div class=\"cmd_out\">{out}</div></div>"), false);
        } else {
            env.output.append_output(
                &format!(
                    "<div><div class=\"cmd_in\"><span class=\"cmd_ps\">{}</span>{last}</div>\
                     <div class=\"cmd_out\">{out}</div></div>",
                    self.current_ps,
                ),
                false,
            );
        }

        // PostCallback stage. Vetoed and commandless cycles carry no
        // object and skip it.
        if let (Some(name), Some(mut obj)) = (cmd_name, obj) {
            if self.registry.run_callback(&name, &mut obj, env).is_some() {
                self.normalize(&obj);
            }
            if let Some(hook) = self.after_cmd.as_mut() {
                let _ = hook(&mut obj, env);
                self.normalize(&obj);
            }
        }

        env.output.set_prompt(&ps, &input);
        env.output.focus();
        self.current_ps = ps;

        self.state = CommandState {
            next,
            ..Default::default()
        };
        self.quiet = false;
        self.generation = self.generation.wrapping_add(1);
        self.dispatch = DispatchState::Idle;

        if let Some((line, mute)) = self.queued.pop_front() {
            self.run_command(env, &line, mute);
        }
    }
}

impl Default for TerminalSession {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

/// Substitute the raw line into the first `%cmd%` placeholder
/// (case-insensitive) of a chained template.
fn substitute_next(template: &str, raw: &str) -> String {
    let bytes = template.as_bytes();
    let needle = b"%cmd%";
    if bytes.len() >= needle.len() {
        for i in 0..=bytes.len() - needle.len() {
            if bytes[i..i + needle.len()].eq_ignore_ascii_case(needle) {
                let mut out = String::with_capacity(template.len() + raw.len());
                out.push_str(&template[..i]);
                out.push_str(raw);
                out.push_str(&template[i + needle.len()..]);
                return out;
            }
        }
    }
    template.to_string()
}
