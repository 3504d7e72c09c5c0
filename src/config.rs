use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::error::AppError;
use crate::keypad::ButtonAction;
use crate::monitor::InputCodes;

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "PADSWITCH_CONFIG";

/// System-wide config location, tried before the per-user one
pub const SYSTEM_CONFIG_PATH: &str = "/etc/padswitch/config.toml";

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub keypad: KeypadConfig,
    pub behavior: BehaviorConfig,
    pub log: LogConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// I2C bus number the monitor answers DDC/CI on (/dev/i2c-N)
    pub bus: u8,
    pub set_timeout_secs: u64,
    pub query_timeout_secs: u64,
    /// Issue an informational follow-up query after each switch
    pub verify_after_switch: bool,
    /// How long the monitor gets to settle before that query
    pub verify_settle_ms: u64,
    pub inputs: InputCodes,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bus: 2,
            set_timeout_secs: 10,
            query_timeout_secs: 5,
            verify_after_switch: true,
            verify_settle_ms: 1000,
            inputs: InputCodes::default(),
        }
    }
}

impl MonitorConfig {
    pub fn set_timeout(&self) -> Duration {
        Duration::from_secs(self.set_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn verify_settle(&self) -> Duration {
        Duration::from_millis(self.verify_settle_ms)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeypadConfig {
    /// Exact device name to bind, as reported by the kernel
    pub device_name: String,
    /// Bind the first key-capable device when the named one is absent.
    /// Enumeration order is not stable; off by default.
    pub fallback_to_any_keyboard: bool,
    /// evdev key name -> action
    pub bindings: BTreeMap<String, ButtonAction>,
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            device_name: "binepad BNK8".to_string(),
            fallback_to_any_keyboard: false,
            bindings: default_bindings(),
        }
    }
}

fn default_bindings() -> BTreeMap<String, ButtonAction> {
    use crate::monitor::InputSource;

    BTreeMap::from([
        (
            "KEY_F23".to_string(),
            ButtonAction::Switch(InputSource::DisplayPort),
        ),
        (
            "KEY_F24".to_string(),
            ButtonAction::Switch(InputSource::UsbC),
        ),
        ("KEY_F22".to_string(), ButtonAction::Standby),
    ])
}

/// How a simple switch binding behaves on press
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PressBehavior {
    /// Skip the command when the target is already the commanded input
    SkipIfCurrent,
    /// Always wake the monitor first, then switch unconditionally
    WakeThenSwitch,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehaviorConfig {
    pub on_press: PressBehavior,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            on_press: PressBehavior::SkipIfCurrent,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Append-mode log file; rotation is left to the system (logrotate)
    pub file: Option<PathBuf>,
    /// Default tracing filter, overridden by RUST_LOG
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("/var/log/padswitch.log")),
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from the first existing location, or fall back to defaults when
    /// no file exists at all. Returns the path actually used.
    pub fn load() -> Result<(Self, Option<PathBuf>), AppError> {
        let Some(path) = locate_file() else {
            return Ok((Self::default(), None));
        };
        match read_file(&path) {
            Ok(config) => Ok((config, Some(path))),
            Err(err) => Err(AppError::Config(format!("{err:#}"))),
        }
    }
}

fn read_file(path: &Path) -> anyhow::Result<Config> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

fn locate_file() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    let system = PathBuf::from(SYSTEM_CONFIG_PATH);
    if system.exists() {
        return Some(system);
    }
    let user = dirs::config_dir()?.join("padswitch/config.toml");
    user.exists().then_some(user)
}
