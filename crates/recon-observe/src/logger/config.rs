use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use super::{LoggerFormat, LoggerLevel};

/// Logger settings, usually the `logger` section of the process config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` expression, e.g. `"info"` or `"recon_core=debug,info"`.
    pub level: LoggerLevel,
    /// Print the event target (module path).
    pub with_targets: bool,
    /// Colorize text output when stdout is a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::Text,
            level: LoggerLevel::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Color is used only when enabled and stdout is an interactive terminal.
    pub fn ansi(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}
