// SPDX-License-Identifier: GPL-3.0-only
//! Input device discovery
//!
//! Finds the macro pad among the key-capable devices under /dev/input. An
//! exact name match on the configured device always wins; falling back to an
//! arbitrary keyboard-like device is opt-in because enumeration order is not
//! stable across runs.

use std::path::PathBuf;

use evdev::Device;

use crate::config::KeypadConfig;
use crate::error::{AppError, Result};

/// Metadata of one key-capable device, kept apart from the live handle so
/// selection stays a pure function
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub name: String,
}

/// Outcome of candidate selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Index of the candidate matching the configured name exactly
    Exact(usize),
    /// Index of the first enumerated candidate; order-dependent
    Fallback(usize),
    NoCandidates,
}

/// Pick the candidate to bind
pub fn select_candidate(target_name: &str, candidates: &[Candidate]) -> Selection {
    if let Some(index) = candidates.iter().position(|c| c.name == target_name) {
        return Selection::Exact(index);
    }
    if candidates.is_empty() {
        Selection::NoCandidates
    } else {
        Selection::Fallback(0)
    }
}

/// Enumerate input devices and open the configured keypad
pub fn locate(config: &KeypadConfig) -> Result<(Device, PathBuf)> {
    let mut devices = Vec::new();
    for (path, device) in evdev::enumerate() {
        let key_capable = device
            .supported_keys()
            .is_some_and(|keys| keys.iter().next().is_some());
        if !key_capable {
            continue;
        }
        let name = device.name().unwrap_or("unknown").to_string();
        info!("found key input device: {name} at {}", path.display());
        devices.push((path, name, device));
    }

    let candidates: Vec<Candidate> = devices
        .iter()
        .map(|(path, name, _)| Candidate {
            path: path.clone(),
            name: name.clone(),
        })
        .collect();

    let index = match select_candidate(&config.device_name, &candidates) {
        Selection::Exact(index) => index,
        Selection::Fallback(index) => {
            if !config.fallback_to_any_keyboard {
                error!(
                    "device `{}` not found and fallback_to_any_keyboard is disabled",
                    config.device_name
                );
                return Err(AppError::DeviceNotFound);
            }
            // The pick below is whatever the kernel enumerated first; list
            // every candidate so a wrong binding can be diagnosed.
            warn!(
                "device `{}` not found, falling back to first key-capable device",
                config.device_name
            );
            for (i, candidate) in candidates.iter().enumerate() {
                info!("  {i}: {} at {}", candidate.name, candidate.path.display());
            }
            index
        }
        Selection::NoCandidates => return Err(AppError::DeviceNotFound),
    };

    let (path, name, device) = devices.swap_remove(index);
    info!("using device: {name} at {}", path.display());
    Ok((device, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, path: &str) -> Candidate {
        Candidate {
            path: PathBuf::from(path),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_exact_name_wins_regardless_of_order() {
        let candidates = vec![
            candidate("AT Translated Set 2 keyboard", "/dev/input/event0"),
            candidate("Logitech USB Receiver", "/dev/input/event5"),
            candidate("binepad BNK8", "/dev/input/event7"),
        ];
        assert_eq!(
            select_candidate("binepad BNK8", &candidates),
            Selection::Exact(2)
        );

        let mut reversed = candidates;
        reversed.reverse();
        assert_eq!(
            select_candidate("binepad BNK8", &reversed),
            Selection::Exact(0)
        );
    }

    #[test]
    fn test_near_miss_is_not_exact() {
        // The "Keyboard" variant the pad also exposes must not match.
        let candidates = vec![candidate("binepad BNK8 Keyboard", "/dev/input/event3")];
        assert_eq!(
            select_candidate("binepad BNK8", &candidates),
            Selection::Fallback(0)
        );
    }

    #[test]
    fn test_fallback_is_first_candidate() {
        let candidates = vec![
            candidate("Some keyboard", "/dev/input/event1"),
            candidate("Another keyboard", "/dev/input/event2"),
        ];
        assert_eq!(
            select_candidate("binepad BNK8", &candidates),
            Selection::Fallback(0)
        );
    }

    #[test]
    fn test_no_candidates() {
        assert_eq!(
            select_candidate("binepad BNK8", &[]),
            Selection::NoCandidates
        );
    }
}
