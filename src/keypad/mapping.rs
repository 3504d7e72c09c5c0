// SPDX-License-Identifier: GPL-3.0-only
//! Button to action mapping
//!
//! Bindings come from the config file keyed by evdev key names and are
//! resolved to scancodes once at startup; dispatch itself only ever sees the
//! closed `ButtonAction` type.

use std::collections::BTreeMap;
use std::str::FromStr;

use evdev::Key;
use serde::de::{self, Deserialize, Deserializer};

use crate::error::AppError;
use crate::monitor::InputSource;

/// What a mapped button does when pressed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    /// Select the given video input
    Switch(InputSource),
    /// Switch to HDMI, then put the monitor into standby
    Standby,
}

impl<'de> Deserialize<'de> for ButtonAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        match name.as_str() {
            "displayport" => Ok(Self::Switch(InputSource::DisplayPort)),
            "usbc" => Ok(Self::Switch(InputSource::UsbC)),
            "hdmi" => Ok(Self::Switch(InputSource::Hdmi)),
            "standby" => Ok(Self::Standby),
            other => Err(de::Error::unknown_variant(
                other,
                &["displayport", "usbc", "hdmi", "standby"],
            )),
        }
    }
}

/// Resolve config key names (`KEY_F23`) to evdev scancodes
pub fn resolve_bindings(
    raw: &BTreeMap<String, ButtonAction>,
) -> Result<BTreeMap<u16, ButtonAction>, AppError> {
    let mut bindings = BTreeMap::new();
    for (name, action) in raw {
        let key = Key::from_str(name).map_err(|_| {
            AppError::Config(format!("unknown key name `{name}` in keypad bindings"))
        })?;
        if bindings.insert(key.code(), *action).is_some() {
            return Err(AppError::Config(format!(
                "key `{name}` is bound more than once"
            )));
        }
    }
    Ok(bindings)
}
