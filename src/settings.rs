use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// When enabled the application initialises the logger at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
    /// Captcha types whose answers are checked with the captcha service in a
    /// second UI round before being handed to the worker.
    #[serde(default = "default_verified_captcha_types")]
    pub verified_captcha_types: Vec<String>,
    /// Log a warning once more than this many present messages are waiting
    /// for the host to become available.
    #[serde(default = "default_delayed_warn_threshold")]
    pub delayed_warn_threshold: usize,
    /// How long a UI loop blocks on the message queue per iteration.
    #[serde(default = "default_pump_interval_ms")]
    pub pump_interval_ms: u64,
}

fn default_verified_captcha_types() -> Vec<String> {
    vec!["recaptcha_2".into()]
}

fn default_delayed_warn_threshold() -> usize {
    32
}

fn default_pump_interval_ms() -> u64 {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug_logging: false,
            verified_captcha_types: default_verified_captcha_types(),
            delayed_warn_threshold: default_delayed_warn_threshold(),
            pump_interval_ms: default_pump_interval_ms(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn pump_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.pump_interval_ms.max(1))
    }
}
