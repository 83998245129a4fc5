use core::time::Duration;

/// Default wait after the mode probe before checking for a text echo
pub const PROBE_SETTLE: Duration = Duration::from_millis(100);
/// Default wait after `binmode` before draining its echo
pub const MODE_SWITCH_SETTLE: Duration = Duration::from_secs(1);
/// Substring every genuine firmware version string carries
pub const IDENTIFIER: &str = "Octowire";

/// Engine timing and identity settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub probe_settle: Duration,
    pub mode_switch_settle: Duration,
    pub identifier: &'static str,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            probe_settle: PROBE_SETTLE,
            mode_switch_settle: MODE_SWITCH_SETTLE,
            identifier: IDENTIFIER,
        }
    }
}

impl Config {
    pub fn with_probe_settle(mut self, settle: Duration) -> Self {
        self.probe_settle = settle;
        self
    }

    pub fn with_mode_switch_settle(mut self, settle: Duration) -> Self {
        self.mode_switch_settle = settle;
        self
    }

    pub fn with_identifier(mut self, identifier: &'static str) -> Self {
        self.identifier = identifier;
        self
    }
}
