//! Registry of commands, pre-hooks, response normalizers, and
//! post-callbacks.
//!
//! Four independent tables keyed by name. Entries live until explicitly
//! unregistered; registering an existing name overwrites silently.

use std::collections::HashMap;

use crate::command::{CommandObject, CommandSpec, Environment, HookFn, ResponseFn, StatePatch};

/// Which of the four tables an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Command,
    PreHook,
    Response,
    Callback,
}

/// One entry to add to the registry.
pub enum Registration {
    /// A dispatchable command.
    Command(CommandSpec),
    /// Runs before a specific command executes; may veto the cycle.
    PreHook { name: String, hook: HookFn },
    /// Folds one response key into the live command state.
    Response { name: String, normalizer: ResponseFn },
    /// Runs after a specific command's cycle renders.
    Callback { name: String, callback: HookFn },
}

impl Registration {
    fn name(&self) -> &str {
        match self {
            Self::Command(spec) => &spec.name,
            Self::PreHook { name, .. }
            | Self::Response { name, .. }
            | Self::Callback { name, .. } => name,
        }
    }
}

/// The four mapping tables.
#[derive(Default)]
pub struct Registry {
    commands: HashMap<String, CommandSpec>,
    pre_hooks: HashMap<String, HookFn>,
    responses: HashMap<String, ResponseFn>,
    callbacks: HashMap<String, HookFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry to its table. Returns `false` (no mutation) when the
    /// name is empty; overwrites silently when the name already exists.
    pub fn register(&mut self, entry: Registration) -> bool {
        if entry.name().is_empty() {
            return false;
        }
        match entry {
            Registration::Command(spec) => {
                self.commands.insert(spec.name.clone(), spec);
            }
            Registration::PreHook { name, hook } => {
                self.pre_hooks.insert(name, hook);
            }
            Registration::Response { name, normalizer } => {
                self.responses.insert(name, normalizer);
            }
            Registration::Callback { name, callback } => {
                self.callbacks.insert(name, callback);
            }
        }
        true
    }

    /// Remove an entry by kind and name. Returns `false` when absent.
    pub fn unregister(&mut self, kind: RegistryKind, name: &str) -> bool {
        match kind {
            RegistryKind::Command => self.commands.remove(name).is_some(),
            RegistryKind::PreHook => self.pre_hooks.remove(name).is_some(),
            RegistryKind::Response => self.responses.remove(name).is_some(),
            RegistryKind::Callback => self.callbacks.remove(name).is_some(),
        }
    }

    // -- Command table access --

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn command(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn command_mut(&mut self, name: &str) -> Option<&mut CommandSpec> {
        self.commands.get_mut(name)
    }

    /// All registered command names, sorted.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Sorted command names starting with `prefix` (all names when the
    /// prefix is empty).
    pub fn completions(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .commands
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        names
    }

    // -- Hook invocation --

    /// Run the pre-hook registered for `name`, if any. `Some(false)`
    /// means the hook vetoed the cycle.
    pub fn run_pre_hook(
        &mut self,
        name: &str,
        obj: &mut CommandObject,
        env: &mut Environment<'_>,
    ) -> Option<bool> {
        self.pre_hooks.get_mut(name).map(|hook| hook(obj, env))
    }

    /// Run the post-callback registered for `name`, if any.
    pub fn run_callback(
        &mut self,
        name: &str,
        obj: &mut CommandObject,
        env: &mut Environment<'_>,
    ) -> Option<bool> {
        self.callbacks.get_mut(name).map(|cb| cb(obj, env))
    }

    pub fn has_response(&self, key: &str) -> bool {
        self.responses.contains_key(key)
    }

    /// Run the response normalizer registered for `key`, if any.
    pub fn run_response(&mut self, key: &str, obj: &CommandObject) -> Option<StatePatch> {
        self.responses.get_mut(key).map(|norm| norm(obj))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Handler;

    fn noop_command(name: &str) -> Registration {
        Registration::Command(CommandSpec::local(name, |_, _| Ok(())))
    }

    #[test]
    fn register_then_unregister_round_trip() {
        let mut reg = Registry::new();
        assert!(reg.register(noop_command("x")));
        assert!(reg.has_command("x"));
        assert!(reg.unregister(RegistryKind::Command, "x"));
        assert!(!reg.has_command("x"));
        // Second removal is a no-op.
        assert!(!reg.unregister(RegistryKind::Command, "x"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut reg = Registry::new();
        assert!(!reg.register(noop_command("")));
        assert!(!reg.register(Registration::PreHook {
            name: String::new(),
            hook: Box::new(|_, _| true),
        }));
        assert!(reg.command_names().is_empty());
    }

    #[test]
    fn register_overwrites_silently() {
        let mut reg = Registry::new();
        assert!(reg.register(Registration::Command(
            CommandSpec::remote("x", "/old").with_help("old"),
        )));
        assert!(reg.register(Registration::Command(
            CommandSpec::remote("x", "/new").with_help("new"),
        )));
        let spec = reg.command("x").unwrap();
        assert_eq!(spec.help, "new");
        match &spec.handler {
            Handler::Remote(url) => assert_eq!(url, "/new"),
            other => panic!("expected remote handler, got {other:?}"),
        }
    }

    #[test]
    fn tables_are_independent() {
        let mut reg = Registry::new();
        reg.register(noop_command("x"));
        reg.register(Registration::Callback {
            name: "x".to_string(),
            callback: Box::new(|_, _| true),
        });
        assert!(reg.unregister(RegistryKind::Command, "x"));
        // The callback table still holds its own "x".
        assert!(reg.unregister(RegistryKind::Callback, "x"));
        assert!(!reg.unregister(RegistryKind::Callback, "x"));
    }

    #[test]
    fn unregister_wrong_kind_is_noop() {
        let mut reg = Registry::new();
        reg.register(noop_command("x"));
        assert!(!reg.unregister(RegistryKind::Response, "x"));
        assert!(reg.has_command("x"));
    }

    #[test]
    fn command_names_sorted() {
        let mut reg = Registry::new();
        reg.register(noop_command("zebra"));
        reg.register(noop_command("alpha"));
        reg.register(noop_command("middle"));
        assert_eq!(reg.command_names(), vec!["alpha", "middle", "zebra"]);
    }

    #[test]
    fn completions_filter_by_prefix() {
        let mut reg = Registry::new();
        reg.register(noop_command("help"));
        reg.register(noop_command("history"));
        reg.register(noop_command("clear"));
        assert_eq!(reg.completions("h"), vec!["help", "history"]);
        assert_eq!(reg.completions("he"), vec!["help"]);
        assert_eq!(reg.completions(""), vec!["clear", "help", "history"]);
        assert!(reg.completions("zz").is_empty());
    }
}
