/*
 * config.rs
 *
 * Only one knob: whether wrappers emit trace messages. Defaults off,
 * PORTSHIM_DEBUG turns it on without recompiling.
 */

/// Environment variable that enables tracing in `Config::from_env`.
pub const DEBUG_ENV: &str = "PORTSHIM_DEBUG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Emit a trace message for every wrapped call.
    pub trace: bool,
}

impl Config {
    /// Read settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let trace = std::env::var(DEBUG_ENV)
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        Self { trace }
    }

    #[must_use]
    pub const fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

/* 1/true/yes/on, any case. everything else is off. */
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    let v = value.trim();
    ["1", "true", "yes", "on"]
        .iter()
        .any(|accepted| v.eq_ignore_ascii_case(accepted))
}
