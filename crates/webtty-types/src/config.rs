//! Terminal configuration: settings and user-facing message catalog.
//!
//! `Settings` carries everything a host can tune about a terminal instance.
//! All fields have defaults, so a host can start from `Settings::default()`
//! and adjust, deserialize a full set from TOML, or apply a
//! [`SettingsPatch`] at runtime (the `change_settings` entry point).

use serde::Deserialize;

use crate::error::Result;

/// User-facing message catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// Shown once when the terminal is first presented.
    pub welcome: String,
    /// Shown when a typed name matches no registered command.
    pub error_not_found: String,
    /// Shown when a command cannot be executed with the configured method.
    pub error_bad_method: String,
    /// Shown when a remote call fails.
    pub error_ajax: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            welcome: format!(
                "webtty ({}).<br> Type <b>help</b> to list the available commands.",
                env!("CARGO_PKG_VERSION"),
            ),
            error_not_found: "Command not found.".to_string(),
            error_bad_method: "Invalid command method.".to_string(),
            error_ajax: "Server error.".to_string(),
        }
    }
}

/// Per-instance terminal settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default remote endpoint for string-handler commands. Empty means
    /// no default endpoint is configured.
    pub url: String,
    /// HTTP-style method passed to the transport.
    pub method: String,
    /// Forward free text that matches no command to the transport.
    pub allow_arbitrary: bool,
    /// Request field name carrying the command key.
    pub param: String,
    /// Primary prompt symbol.
    pub ps: String,
    /// Register the native help/clear/history commands.
    pub native_commands: bool,
    /// Enable tab completion.
    pub autocomplete: bool,
    /// Number of history entries to retain (0 = history off).
    pub history_max: usize,
    /// Message catalog.
    pub i18n: Messages,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: "POST".to_string(),
            allow_arbitrary: false,
            param: "cmd".to_string(),
            ps: "$".to_string(),
            native_commands: true,
            autocomplete: true,
            history_max: 800,
            i18n: Messages::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a TOML document. Missing keys fall back to
    /// defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }
}

/// Partial update to the message catalog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessagesPatch {
    pub welcome: Option<String>,
    pub error_not_found: Option<String>,
    pub error_bad_method: Option<String>,
    pub error_ajax: Option<String>,
}

/// Partial update to [`Settings`]. Fields left `None` keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub url: Option<String>,
    pub method: Option<String>,
    pub allow_arbitrary: Option<bool>,
    pub param: Option<String>,
    pub ps: Option<String>,
    pub native_commands: Option<bool>,
    pub autocomplete: Option<bool>,
    pub history_max: Option<usize>,
    pub i18n: Option<MessagesPatch>,
}

impl SettingsPatch {
    /// Apply this patch to a settings instance.
    pub fn apply(self, settings: &mut Settings) {
        if let Some(url) = self.url {
            settings.url = url;
        }
        if let Some(method) = self.method {
            settings.method = method;
        }
        if let Some(allow) = self.allow_arbitrary {
            settings.allow_arbitrary = allow;
        }
        if let Some(param) = self.param {
            settings.param = param;
        }
        if let Some(ps) = self.ps {
            settings.ps = ps;
        }
        if let Some(native) = self.native_commands {
            settings.native_commands = native;
        }
        if let Some(auto) = self.autocomplete {
            settings.autocomplete = auto;
        }
        if let Some(max) = self.history_max {
            settings.history_max = max;
        }
        if let Some(i18n) = self.i18n {
            if let Some(welcome) = i18n.welcome {
                settings.i18n.welcome = welcome;
            }
            if let Some(msg) = i18n.error_not_found {
                settings.i18n.error_not_found = msg;
            }
            if let Some(msg) = i18n.error_bad_method {
                settings.i18n.error_bad_method = msg;
            }
            if let Some(msg) = i18n.error_ajax {
                settings.i18n.error_ajax = msg;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.method, "POST");
        assert_eq!(s.param, "cmd");
        assert_eq!(s.ps, "$");
        assert_eq!(s.history_max, 800);
        assert!(s.native_commands);
        assert!(s.autocomplete);
        assert!(!s.allow_arbitrary);
        assert!(s.url.is_empty());
    }

    #[test]
    fn from_toml_overrides_and_defaults() {
        let s = Settings::from_toml_str(
            r#"
            ps = ">"
            history_max = 10

            [i18n]
            error_not_found = "no such command"
            "#,
        )
        .unwrap();
        assert_eq!(s.ps, ">");
        assert_eq!(s.history_max, 10);
        assert_eq!(s.i18n.error_not_found, "no such command");
        // Untouched keys keep their defaults.
        assert_eq!(s.method, "POST");
        assert_eq!(s.i18n.error_ajax, "Server error.");
    }

    #[test]
    fn from_toml_rejects_garbage() {
        assert!(Settings::from_toml_str("ps = [[[").is_err());
    }

    #[test]
    fn patch_applies_only_set_fields() {
        let mut s = Settings::default();
        let patch = SettingsPatch {
            ps: Some("#".to_string()),
            allow_arbitrary: Some(true),
            i18n: Some(MessagesPatch {
                error_ajax: Some("backend down".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        patch.apply(&mut s);
        assert_eq!(s.ps, "#");
        assert!(s.allow_arbitrary);
        assert_eq!(s.i18n.error_ajax, "backend down");
        // Untouched fields survive.
        assert_eq!(s.param, "cmd");
        assert_eq!(s.i18n.error_not_found, "Command not found.");
    }

    #[test]
    fn empty_patch_is_identity() {
        let mut s = Settings::default();
        let before = s.clone();
        SettingsPatch::default().apply(&mut s);
        assert_eq!(s, before);
    }
}
