//! Monitor input control over DDC/CI
//!
//! The controller owns the believed current input and the bus number; every
//! operation is one or two ddcutil invocations through the `CommandRunner`
//! seam. Executor failures are absorbed here into boolean results plus log
//! entries and never reach the dispatcher.

use std::thread;
use std::time::Duration;

use crate::config::MonitorConfig;
use crate::exec::CommandRunner;

use super::vcp::{self, InputCodes, InputSource};

pub struct MonitorController<R> {
    runner: R,
    bus: u8,
    codes: InputCodes,
    set_timeout: Duration,
    query_timeout: Duration,
    verify_after_switch: bool,
    verify_settle: Duration,
    current_input: Option<InputSource>,
}

impl<R: CommandRunner> MonitorController<R> {
    pub fn new(runner: R, config: &MonitorConfig) -> Self {
        Self {
            runner,
            bus: config.bus,
            codes: config.inputs.clone(),
            set_timeout: config.set_timeout(),
            query_timeout: config.query_timeout(),
            verify_after_switch: config.verify_after_switch,
            verify_settle: config.verify_settle(),
            current_input: None,
        }
    }

    /// Last successfully commanded input.
    ///
    /// This is what the controller told the monitor to do, not a verified
    /// hardware state; the two can drift if the monitor ignores a command
    /// or its input is changed out of band.
    pub fn current_input(&self) -> Option<InputSource> {
        self.current_input
    }

    /// Ask the monitor for its active input.
    ///
    /// Any executor failure, non-zero exit or unrecognized response collapses
    /// to `None`; the underlying error never reaches the caller.
    pub fn query_input(&self) -> Option<InputSource> {
        let args = vec![
            "getvcp".to_string(),
            vcp::INPUT_SELECT_FEATURE.to_string(),
            self.bus_arg(),
        ];
        match self.runner.run(&args, self.query_timeout) {
            Ok(output) if output.success() => vcp::parse_input(&output.stdout, &self.codes),
            Ok(output) => {
                debug!(
                    "input query exited with {:?}: {}",
                    output.code,
                    output.stderr.trim()
                );
                None
            }
            Err(err) => {
                debug!("input query failed: {err}");
                None
            }
        }
    }

    /// Query the monitor and adopt the answer as the current input (startup)
    pub fn refresh_current_input(&mut self) -> Option<InputSource> {
        self.current_input = self.query_input();
        self.current_input
    }

    /// Switch the active input.
    ///
    /// Returns true on a zero exit from ddcutil, after which `current_input`
    /// is updated. The optional post-switch query is informational only: its
    /// outcome is logged and does not change the return value.
    pub fn switch_input(&mut self, target: InputSource) -> bool {
        info!(
            "switching to {target} (value {})",
            target.value(&self.codes)
        );
        if !self.set_input(target) {
            return false;
        }
        if self.verify_after_switch {
            // Give the monitor time to settle before asking it.
            thread::sleep(self.verify_settle);
            match self.query_input() {
                Some(observed) => info!("post-switch query reports {observed}"),
                None => info!("post-switch query could not identify the input"),
            }
        }
        true
    }

    /// Power the monitor back on.
    ///
    /// Verification is disabled at the tool level; a failure here is logged
    /// and does not block a following switch attempt.
    pub fn wake(&self) -> bool {
        self.set_power(vcp::POWER_ON)
    }

    /// Wake first (outcome ignored), then switch; returns the switch result
    pub fn wake_and_switch(&mut self, target: InputSource) -> bool {
        if !self.wake() {
            warn!("wake command failed, attempting switch anyway");
        }
        self.switch_input(target)
    }

    /// Switch to HDMI, then put the monitor into standby.
    ///
    /// The standby command is only honored reliably while the monitor sits
    /// on the HDMI input, so the order of the two steps must not change. A
    /// failed HDMI switch aborts the sequence before the standby command is
    /// issued; a failed standby leaves `current_input` at HDMI.
    pub fn standby_via_hdmi(&mut self) -> bool {
        info!("starting HDMI + standby sequence");
        if !self.set_input(InputSource::Hdmi) {
            error!("HDMI switch failed, aborting standby");
            return false;
        }
        if !self.set_power(vcp::POWER_STANDBY) {
            error!("standby command failed");
            return false;
        }
        info!("HDMI + standby sequence completed");
        true
    }

    fn set_input(&mut self, target: InputSource) -> bool {
        let args = vec![
            "setvcp".to_string(),
            vcp::INPUT_SELECT_FEATURE.to_string(),
            target.value(&self.codes).to_string(),
            self.bus_arg(),
        ];
        match self.runner.run(&args, self.set_timeout) {
            Ok(output) if output.success() => {
                self.current_input = Some(target);
                true
            }
            Ok(output) => {
                error!(
                    "input switch failed with exit code {:?}: {}",
                    output.code,
                    output.stderr.trim()
                );
                false
            }
            Err(err) => {
                error!("input switch failed: {err}");
                false
            }
        }
    }

    fn set_power(&self, value: u8) -> bool {
        let args = vec![
            "setvcp".to_string(),
            vcp::POWER_MODE_FEATURE.to_string(),
            value.to_string(),
            self.bus_arg(),
            "--noverify".to_string(),
        ];
        match self.runner.run(&args, self.set_timeout) {
            Ok(output) if output.success() => true,
            Ok(output) => {
                error!(
                    "power command failed with exit code {:?}: {}",
                    output.code,
                    output.stderr.trim()
                );
                false
            }
            Err(err) => {
                error!("power command failed: {err}");
                false
            }
        }
    }

    fn bus_arg(&self) -> String {
        format!("--bus={}", self.bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::{Scripted, ScriptedRunner};

    fn test_config() -> MonitorConfig {
        MonitorConfig {
            verify_after_switch: false,
            ..MonitorConfig::default()
        }
    }

    fn controller(responses: Vec<Scripted>) -> (MonitorController<ScriptedRunner>, CallLog) {
        let runner = ScriptedRunner::new(responses);
        let calls = runner.calls();
        (MonitorController::new(runner, &test_config()), calls)
    }

    type CallLog = std::rc::Rc<std::cell::RefCell<Vec<Vec<String>>>>;

    #[test]
    fn test_switch_updates_current_input() {
        let (mut controller, calls) = controller(Vec::new());

        assert!(controller.switch_input(InputSource::DisplayPort));
        assert_eq!(
            controller.current_input(),
            Some(InputSource::DisplayPort)
        );
        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ["setvcp", "60", "15", "--bus=2"]);
    }

    #[test]
    fn test_failed_switch_leaves_state_unchanged() {
        let (mut controller, _calls) = controller(vec![Scripted::Exit(1, "")]);

        assert!(!controller.switch_input(InputSource::UsbC));
        assert_eq!(controller.current_input(), None);
    }

    #[test]
    fn test_timed_out_switch_is_a_failure() {
        let (mut controller, calls) = controller(vec![Scripted::Timeout]);

        assert!(!controller.switch_input(InputSource::Hdmi));
        assert_eq!(controller.current_input(), None);
        // The timeout ended the operation; nothing else was issued.
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_query_round_trips_after_switch() {
        let (mut controller, _calls) = controller(vec![
            Scripted::Exit(0, ""),
            Scripted::Exit(0, "VCP code 0x60 (Input Source): sl=0x0f"),
        ]);

        assert!(controller.switch_input(InputSource::DisplayPort));
        assert_eq!(
            controller.query_input(),
            Some(InputSource::DisplayPort)
        );
    }

    #[test]
    fn test_query_failure_collapses_to_unknown() {
        let (controller, _calls) = controller(vec![Scripted::SpawnFail]);
        assert_eq!(controller.query_input(), None);
    }

    #[test]
    fn test_query_garbage_collapses_to_unknown() {
        let (controller, _calls) = controller(vec![Scripted::Exit(0, "no such feature")]);
        assert_eq!(controller.query_input(), None);
    }

    #[test]
    fn test_standby_issues_exactly_two_commands_in_order() {
        let (mut controller, calls) = controller(Vec::new());

        assert!(controller.standby_via_hdmi());
        let calls = calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ["setvcp", "60", "17", "--bus=2"]);
        assert_eq!(calls[1], ["setvcp", "D6", "2", "--bus=2", "--noverify"]);
        assert_eq!(controller.current_input(), Some(InputSource::Hdmi));
    }

    #[test]
    fn test_standby_aborts_when_hdmi_switch_fails() {
        let (mut controller, calls) = controller(vec![Scripted::Exit(1, "")]);

        assert!(!controller.standby_via_hdmi());
        // The standby command must never have been issued.
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(controller.current_input(), None);
    }

    #[test]
    fn test_standby_failure_still_records_hdmi() {
        let (mut controller, calls) =
            controller(vec![Scripted::Exit(0, ""), Scripted::Exit(1, "")]);

        assert!(!controller.standby_via_hdmi());
        assert_eq!(calls.borrow().len(), 2);
        assert_eq!(controller.current_input(), Some(InputSource::Hdmi));
    }

    #[test]
    fn test_wake_and_switch_wakes_exactly_once_first() {
        let (mut controller, calls) = controller(Vec::new());

        assert!(controller.wake_and_switch(InputSource::UsbC));
        let calls = calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ["setvcp", "D6", "1", "--bus=2", "--noverify"]);
        assert_eq!(calls[1], ["setvcp", "60", "27", "--bus=2"]);
    }

    #[test]
    fn test_wake_failure_does_not_block_switch() {
        let (mut controller, calls) = controller(vec![Scripted::Exit(1, "")]);

        assert!(controller.wake_and_switch(InputSource::DisplayPort));
        assert_eq!(calls.borrow().len(), 2);
        assert_eq!(
            controller.current_input(),
            Some(InputSource::DisplayPort)
        );
    }

    #[test]
    fn test_verification_is_informational_only() {
        let config = MonitorConfig {
            verify_after_switch: true,
            verify_settle_ms: 0,
            ..MonitorConfig::default()
        };
        // The follow-up query reports a different input; the switch result
        // and the recorded state must not care.
        let runner = ScriptedRunner::new(vec![
            Scripted::Exit(0, ""),
            Scripted::Exit(0, "sl=0x1b"),
        ]);
        let calls = runner.calls();
        let mut controller = MonitorController::new(runner, &config);

        assert!(controller.switch_input(InputSource::DisplayPort));
        assert_eq!(calls.borrow().len(), 2);
        assert_eq!(
            controller.current_input(),
            Some(InputSource::DisplayPort)
        );
    }

    #[test]
    fn test_refresh_adopts_query_answer() {
        let (mut controller, _calls) =
            controller(vec![Scripted::Exit(0, "current value = 17")]);

        assert_eq!(
            controller.refresh_current_input(),
            Some(InputSource::Hdmi)
        );
        assert_eq!(controller.current_input(), Some(InputSource::Hdmi));
    }
}
