//! Main event loop
//!
//! Reads key events from the located keypad and drives the monitor
//! controller. Each press is dispatched to completion, subprocess calls
//! included, before the next event is read; the device fd is polled with a
//! short timeout so the shutdown flag raised by SIGINT/SIGTERM is observed
//! between reads.

use std::collections::BTreeMap;
use std::io;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use evdev::{Device, InputEventKind};

use crate::config::PressBehavior;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::keypad::ButtonAction;
use crate::monitor::MonitorController;

/// evdev key event values: 0 release, 1 press, 2 autorepeat
const KEY_DOWN: i32 = 1;

/// Poll timeout between shutdown-flag checks
const POLL_TIMEOUT_MS: i32 = 500;

pub struct Dispatcher<R> {
    controller: MonitorController<R>,
    bindings: BTreeMap<u16, ButtonAction>,
    behavior: PressBehavior,
    shutdown: Arc<AtomicBool>,
}

impl<R: CommandRunner> Dispatcher<R> {
    pub fn new(
        controller: MonitorController<R>,
        bindings: BTreeMap<u16, ButtonAction>,
        behavior: PressBehavior,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            controller,
            bindings,
            behavior,
            shutdown,
        }
    }

    /// Blocking loop; returns `Ok` when the shutdown flag is raised and `Err`
    /// only on an unrecoverable device read failure
    pub fn run(&mut self, device: &mut Device) -> Result<()> {
        let fd = device.as_raw_fd();

        while !self.shutdown.load(Ordering::Relaxed) {
            let mut poll_fd = libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            };
            let ready = unsafe { libc::poll(&mut poll_fd, 1, POLL_TIMEOUT_MS) };
            if ready < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                error!("device poll failed: {err}");
                return Err(err.into());
            }
            if ready == 0 {
                continue;
            }

            let events = match device.fetch_events() {
                Ok(events) => events,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    error!("device read failed: {err}");
                    return Err(err.into());
                }
            };
            for event in events {
                if let InputEventKind::Key(key) = event.kind() {
                    debug!("key event: {key:?} (value {})", event.value());
                    self.handle_event(key.code(), event.value());
                }
            }
        }

        info!("shutdown requested, leaving event loop");
        Ok(())
    }

    /// Releases and autorepeats fall through here untouched
    fn handle_event(&mut self, scancode: u16, value: i32) {
        if value == KEY_DOWN {
            self.handle_press(scancode);
        }
    }

    fn handle_press(&mut self, scancode: u16) {
        let Some(action) = self.bindings.get(&scancode).copied() else {
            info!("scancode {scancode} has no binding, ignoring");
            return;
        };
        match action {
            ButtonAction::Switch(target) => match self.behavior {
                PressBehavior::SkipIfCurrent => {
                    if self.controller.current_input() == Some(target) {
                        info!("already on {target}, skipping switch");
                    } else {
                        self.controller.switch_input(target);
                    }
                }
                PressBehavior::WakeThenSwitch => {
                    self.controller.wake_and_switch(target);
                }
            },
            ButtonAction::Standby => {
                self.controller.standby_via_hdmi();
            }
        }
    }
}
