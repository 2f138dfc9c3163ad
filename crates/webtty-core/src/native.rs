//! Native command and response-normalizer registrations.
//!
//! The clear/history/help commands carry a [`Builtin`] handler tag: they
//! need session internals (the history log, the command table) and are
//! executed by the session itself. Registering them here keeps them
//! visible to `help`, tab completion, and `unregister` like any other
//! command.

use crate::command::{Builtin, CommandSpec, Handler, StatePatch};
use crate::registry::{Registration, Registry};
use crate::token::OptionToken;

/// Register the native clear/history/help commands and the pane-clearing
/// callback.
pub fn register_native_commands(reg: &mut Registry) {
    reg.register(Registration::Command(CommandSpec {
        name: "clear".to_string(),
        help: "Cleans the screen leaving a new command prompt ready.".to_string(),
        options: Vec::new(),
        handler: Handler::Builtin(Builtin::Clear),
    }));
    // The pane is emptied in the callback stage, after the cycle's own
    // echo line has been appended.
    reg.register(Registration::Callback {
        name: "clear".to_string(),
        callback: Box::new(|_obj, env| {
            env.output.clear_output();
            true
        }),
    });

    reg.register(Registration::Command(CommandSpec {
        name: "history".to_string(),
        help: "Shows list of typed in commands. \
               Type <i>history clear</i> to clear your history."
            .to_string(),
        options: vec![OptionToken::flag("clear")],
        handler: Handler::Builtin(Builtin::History),
    }));

    reg.register(Registration::Command(CommandSpec {
        name: "help".to_string(),
        help: "Displays a list of useful information. \
               Usage: <i>help command-name</i> to show <i>command-name</i>'s help. \
               <i>help -a</i> or <i>help --all</i> to display all help."
            .to_string(),
        options: vec![
            OptionToken::pos(1),
            OptionToken::flag("-a"),
            OptionToken::flag("--all"),
        ],
        handler: Handler::Builtin(Builtin::Help),
    }));
}

/// Register the built-in response normalizers, one per state field.
///
/// Each copies its field from a handler's patch into the live state, so
/// by default any handler-returned object updates those fields. Hosts
/// may override or unregister them individually.
pub fn register_native_responses(reg: &mut Registry) {
    reg.register(Registration::Response {
        name: "ps".to_string(),
        normalizer: Box::new(|obj| StatePatch {
            ps: obj.patch.ps.clone(),
            ..Default::default()
        }),
    });
    reg.register(Registration::Response {
        name: "in".to_string(),
        normalizer: Box::new(|obj| StatePatch {
            input: obj.patch.input.clone(),
            ..Default::default()
        }),
    });
    reg.register(Registration::Response {
        name: "out".to_string(),
        normalizer: Box::new(|obj| StatePatch {
            out: obj.patch.out.clone(),
            ..Default::default()
        }),
    });
    reg.register(Registration::Response {
        name: "last".to_string(),
        normalizer: Box::new(|obj| StatePatch {
            last: obj.patch.last.clone(),
            ..Default::default()
        }),
    });
    reg.register(Registration::Response {
        name: "next".to_string(),
        normalizer: Box::new(|obj| StatePatch {
            next: obj.patch.next.clone(),
            ..Default::default()
        }),
    });
    reg.register(Registration::Response {
        name: "data".to_string(),
        normalizer: Box::new(|obj| StatePatch {
            data: obj.patch.data.clone(),
            ..Default::default()
        }),
    });
}
