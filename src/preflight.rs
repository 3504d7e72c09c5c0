//! Startup environment checks
//!
//! The daemon needs write access to the monitor's I2C device node (for
//! ddcutil) and read access to the input device nodes. Surface what is
//! missing once at startup instead of failing on the first button press;
//! none of these checks is fatal since ddcutil may still gain access by
//! other means (setuid wrappers, udev rules applied later).

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum RequirementStatus {
    Met,
    NotMet,
    NotApplicable,
}

#[derive(Debug, Clone)]
pub struct Requirement {
    pub name: &'static str,
    pub description: String,
    pub status: RequirementStatus,
}

/// Check access to the bus and input device nodes
pub fn check_environment(bus: u8) -> Vec<Requirement> {
    let mut requirements = Vec::new();

    let i2c_path = PathBuf::from(format!("/dev/i2c-{bus}"));
    let i2c_present = i2c_path.exists();
    requirements.push(Requirement {
        name: "I2C device",
        description: if i2c_present {
            format!("{} present", i2c_path.display())
        } else {
            format!("{} not found (is i2c-dev loaded?)", i2c_path.display())
        },
        status: if i2c_present {
            RequirementStatus::Met
        } else {
            RequirementStatus::NotMet
        },
    });

    requirements.push(Requirement {
        name: "I2C write access",
        description: if !i2c_present {
            "N/A".to_string()
        } else if can_write(&i2c_path) {
            format!("can write to {}", i2c_path.display())
        } else {
            format!("cannot write to {}", i2c_path.display())
        },
        status: if !i2c_present {
            RequirementStatus::NotApplicable
        } else if can_write(&i2c_path) {
            RequirementStatus::Met
        } else {
            RequirementStatus::NotMet
        },
    });

    let input_readable = fs::read_dir("/dev/input").is_ok();
    requirements.push(Requirement {
        name: "input devices",
        description: if input_readable {
            "/dev/input readable".to_string()
        } else {
            "cannot read /dev/input".to_string()
        },
        status: if input_readable {
            RequirementStatus::Met
        } else {
            RequirementStatus::NotMet
        },
    });

    requirements
}

/// Log the outcome of the checks
pub fn report(requirements: &[Requirement]) {
    for requirement in requirements {
        match requirement.status {
            RequirementStatus::NotMet => {
                warn!("{}: {}", requirement.name, requirement.description);
            }
            RequirementStatus::Met | RequirementStatus::NotApplicable => {
                debug!("{}: {}", requirement.name, requirement.description);
            }
        }
    }
}

fn can_write(path: &Path) -> bool {
    fs::OpenOptions::new().write(true).open(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_checks_are_reported() {
        let requirements = check_environment(200);
        let names: Vec<_> = requirements.iter().map(|r| r.name).collect();
        assert_eq!(names, ["I2C device", "I2C write access", "input devices"]);
    }

    #[test]
    fn test_absent_bus_is_flagged() {
        // Bus 200 is well past anything a real machine populates.
        let requirements = check_environment(200);
        assert_eq!(requirements[0].status, RequirementStatus::NotMet);
        assert_eq!(requirements[1].status, RequirementStatus::NotApplicable);
    }
}
