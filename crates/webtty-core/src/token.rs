//! Command-line tokenizer.
//!
//! Splits a raw input line into a [`CommandObject`] given a per-command
//! option schema. Handles flag options, positional wildcards, and quoted
//! values that may span several whitespace-separated tokens. Pure: no
//! session or rendering context is involved.

use crate::command::CommandObject;

/// One entry of a command's option schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionToken {
    /// Bind the token at this position (1-based after the command name is
    /// position 0) directly, independent of quoting.
    Positional(usize),
    /// A flag string such as `-a` or `--all`.
    Flag(String),
}

impl OptionToken {
    /// Shorthand for a positional wildcard.
    pub fn pos(index: usize) -> Self {
        Self::Positional(index)
    }

    /// Shorthand for a flag.
    pub fn flag(name: &str) -> Self {
        Self::Flag(name.to_string())
    }
}

/// Tokenize a raw line against an option schema.
///
/// Returns `None` when the trimmed line contains no tokens. Without a
/// schema only the whitespace-split tokens are produced (degenerate echo
/// mode). With a schema, positional wildcards bind their token directly
/// and the remaining tokens are scanned left to right for flags and
/// values:
///
/// - a token equal to a schema flag (or `flag=value`) starts a new
///   current option;
/// - a value opening with `"` or `'` stays open across tokens until one
///   ends with the same quote not preceded by a backslash, then has its
///   outer quotes stripped and backslash escapes resolved;
/// - a single token fully wrapped in matching quotes is stripped directly;
/// - a value is committed only while no quote is open, and a later
///   commit to the same option overwrites the earlier one.
pub fn tokenize(raw: &str, schema: Option<&[OptionToken]>) -> Option<CommandObject> {
    let tokens: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    if tokens.is_empty() {
        return None;
    }
    let mut obj = CommandObject::new(tokens);
    let Some(schema) = schema else {
        return Some(obj);
    };

    // Positional wildcards bind first and are excluded from the flag pass.
    let mut flags: Vec<&str> = Vec::new();
    for opt in schema {
        match opt {
            OptionToken::Positional(k) if *k > 0 => {
                if let Some(tok) = obj.tokens.get(*k) {
                    obj.opts.insert(k.to_string(), Some(tok.clone()));
                }
            }
            OptionToken::Positional(_) => {}
            OptionToken::Flag(f) => flags.push(f.as_str()),
        }
    }

    let mut current: Option<String> = None;
    let mut value = String::new();
    let mut quote: Option<char> = None;

    let scan: Vec<String> = obj.tokens.clone();
    for tok in &scan {
        if let Some(q) = quote {
            // Inside a multi-token quoted value: keep appending until a
            // token ends with the closing quote (not backslash-escaped).
            value.push(' ');
            value.push_str(tok);
            if closes_quote(tok, q) {
                quote = None;
                let stripped = strip_outer(&value);
                let resolved = unescape(&stripped);
                if let Some(opt) = &current {
                    obj.opts.insert(opt.clone(), Some(resolved.trim().to_string()));
                }
            }
            continue;
        }

        if flags.contains(&tok.as_str()) {
            current = Some(tok.clone());
            obj.opts.insert(tok.clone(), None);
            continue;
        }

        // `flag=value` attaches the value scanner to the remainder.
        let rest = flags.iter().find_map(|f| {
            tok.strip_prefix(f)
                .and_then(|r| r.strip_prefix('='))
                .map(|r| (f.to_string(), r))
        });
        let tok_val = match rest {
            Some((flag, r)) => {
                current = Some(flag.clone());
                obj.opts.insert(flag, None);
                if r.is_empty() {
                    continue;
                }
                r
            }
            None => tok.as_str(),
        };

        let first = tok_val.chars().next();
        let last = tok_val.chars().last();
        match first {
            Some(q @ ('"' | '\'')) if last != Some(q) || tok_val.chars().count() == 1 => {
                // Opens a quoted value spanning further tokens.
                quote = Some(q);
                value = tok_val.to_string();
            }
            Some(q @ ('"' | '\'')) if last == Some(q) => {
                // Single token fully wrapped in matching quotes.
                if let Some(opt) = &current {
                    obj.opts
                        .insert(opt.clone(), Some(strip_outer(tok_val).trim().to_string()));
                }
            }
            _ => {
                if let Some(opt) = &current {
                    obj.opts.insert(opt.clone(), Some(tok_val.to_string()));
                }
            }
        }
    }

    Some(obj)
}

/// Whether a token ends a quoted value opened with `quote`.
fn closes_quote(tok: &str, quote: char) -> bool {
    let chars: Vec<char> = tok.chars().collect();
    match chars.as_slice() {
        [] => false,
        [only] => *only == quote,
        [.., before, last] => *last == quote && *before != '\\',
    }
}

/// Drop the first and last character (the outer quotes).
fn strip_outer(s: &str) -> String {
    let mut chars: Vec<char> = s.chars().collect();
    if chars.len() <= 1 {
        return String::new();
    }
    chars.remove(0);
    chars.pop();
    chars.into_iter().collect()
}

/// Resolve backslash escapes: `\x` becomes `x`. A trailing lone backslash
/// is kept.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
