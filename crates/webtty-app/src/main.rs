//! Stdin-driven demo for the webtty terminal core.
//!
//! Renders the output pane as plain text (HTML tags stripped), wires a
//! loopback transport that answers remote calls locally, and registers a
//! couple of example commands. Reads commands from stdin until EOF or
//! `exit`. Pass a path to a TOML settings file as the first argument.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use serde_json::{Value, json};

use webtty_core::{CommandSpec, Environment, OptionToken, Registration, TerminalSession};
use webtty_types::config::Settings;
use webtty_types::widget::{OutputSink, TicketId, Transport, TransportPoll};

/// Output sink that prints stripped markup to stdout.
#[derive(Default)]
struct TextPane {
    prompt: String,
}

impl OutputSink for TextPane {
    fn append_output(&mut self, html: &str, _no_scroll: bool) {
        let text = strip_tags(html);
        if !text.trim().is_empty() {
            println!("{}", text.trim_end());
        }
    }
    fn clear_output(&mut self) {
        // ANSI clear screen + home.
        print!("\x1b[2J\x1b[H");
    }
    fn set_prompt(&mut self, ps: &str, input: &str) {
        self.prompt = format!("{ps} {input}");
    }
    fn focus(&mut self) {}
}

/// Transport that answers every call locally, settling on the first poll.
#[derive(Default)]
struct LoopbackTransport {
    settled: HashMap<u64, TransportPoll>,
    next_id: u64,
}

impl LoopbackTransport {
    fn submit(&mut self, outcome: TransportPoll) -> webtty_types::error::Result<TicketId> {
        let id = self.next_id;
        self.next_id += 1;
        self.settled.insert(id, outcome);
        Ok(TicketId(id))
    }
}

impl Transport for LoopbackTransport {
    fn call(&mut self, url: &str, method: &str, payload: &Value) -> webtty_types::error::Result<TicketId> {
        log::debug!("loopback {method} {url}: {payload}");
        self.submit(TransportPoll::Ready(json!({
            "out": format!("loopback answered {method} {url} with payload {payload}"),
        })))
    }
    fn pass_command(&mut self, line: &str) -> webtty_types::error::Result<TicketId> {
        self.submit(TransportPoll::Ready(Value::String(format!(
            "(free text) {line}",
        ))))
    }
    fn poll(&mut self, ticket: TicketId) -> TransportPoll {
        self.settled.remove(&ticket.0).unwrap_or(TransportPoll::Pending)
    }
}

/// Reduce the pane markup to printable text.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn load_settings() -> Result<Settings> {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading settings file {path}"))?;
            let settings = Settings::from_toml_str(&raw)
                .with_context(|| format!("parsing settings file {path}"))?;
            Ok(settings)
        }
        None => Ok(Settings {
            allow_arbitrary: true,
            ..Default::default()
        }),
    }
}

fn register_demo_commands(session: &mut TerminalSession) {
    session.register(Registration::Command(
        CommandSpec::local("echo", |obj, _env| {
            obj.patch.out = Some(obj.tokens[1..].join(" "));
            Ok(())
        })
        .with_help("Prints its arguments."),
    ));
    session.register(Registration::Command(
        CommandSpec::local("greet", |obj, _env| {
            let name = obj.arg("--name").unwrap_or("stranger");
            obj.patch.out = Some(format!("Hello, {name}!"));
            Ok(())
        })
        .with_options(vec![OptionToken::flag("--name")])
        .with_help("Greets someone. Usage: greet --name \"Ada Lovelace\""),
    ));
    session.register(Registration::Command(
        CommandSpec::remote("ping", "/api/ping").with_help("Round-trips through the transport."),
    ));
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = load_settings()?;
    let mut session = TerminalSession::new(settings);
    register_demo_commands(&mut session);

    let mut pane = TextPane::default();
    let mut transport = LoopbackTransport::default();

    {
        let mut env = Environment {
            output: &mut pane,
            transport: Some(&mut transport),
        };
        session.init(&mut env);
    }

    let stdin = std::io::stdin();
    loop {
        print!("{}", pane.prompt);
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line == "exit" {
            break;
        }

        let mut env = Environment {
            output: &mut pane,
            transport: Some(&mut transport),
        };
        session.run_command(&mut env, line, false);
        // The loopback settles immediately; a real host would pump from
        // its event loop.
        while session.is_pending() {
            if !session.pump(&mut env) {
                break;
            }
        }
    }

    Ok(())
}
