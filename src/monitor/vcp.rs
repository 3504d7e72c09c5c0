// SPDX-License-Identifier: GPL-3.0-only
//! VCP feature codes and query-output parsing
//!
//! The monitor is driven through two VCP features: 0x60 (input source
//! select) and 0xD6 (power mode). Feature codes are kept as the hex strings
//! ddcutil expects on its command line; input values travel as decimal.

use std::fmt;

use serde::Deserialize;

/// VCP feature code for input source selection
pub const INPUT_SELECT_FEATURE: &str = "60";
/// VCP feature code for power mode
pub const POWER_MODE_FEATURE: &str = "D6";
/// Power mode value for "on"
pub const POWER_ON: u8 = 1;
/// Power mode value for DPM standby (low power, not fully off)
pub const POWER_STANDBY: u8 = 2;

/// A selectable video input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputSource {
    DisplayPort,
    UsbC,
    Hdmi,
}

impl InputSource {
    pub const ALL: [InputSource; 3] = [Self::DisplayPort, Self::UsbC, Self::Hdmi];

    /// Feature-60 value for this input under the given code table
    pub fn value(self, codes: &InputCodes) -> u8 {
        match self {
            Self::DisplayPort => codes.displayport,
            Self::UsbC => codes.usbc,
            Self::Hdmi => codes.hdmi,
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisplayPort => write!(f, "DisplayPort"),
            Self::UsbC => write!(f, "USB-C"),
            Self::Hdmi => write!(f, "HDMI"),
        }
    }
}

/// Feature-60 values per input; the observed defaults, overridable in the
/// config file since the encoding varies between monitor models
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputCodes {
    pub displayport: u8,
    pub usbc: u8,
    pub hdmi: u8,
}

impl Default for InputCodes {
    fn default() -> Self {
        Self {
            displayport: 15,
            usbc: 27,
            hdmi: 17,
        }
    }
}

/// Find which input a getvcp response encodes.
///
/// Matches the lowercase hex marker (`x0f`) or the decimal value anywhere in
/// the output; anything else is an unknown state for the caller to absorb.
pub fn parse_input(output: &str, codes: &InputCodes) -> Option<InputSource> {
    let haystack = output.to_lowercase();
    InputSource::ALL.into_iter().find(|source| {
        let value = source.value(codes);
        haystack.contains(&format!("x{value:02x}")) || haystack.contains(&value.to_string())
    })
}
