mod controller;
mod vcp;

pub use controller::MonitorController;
pub use vcp::{InputCodes, InputSource};
