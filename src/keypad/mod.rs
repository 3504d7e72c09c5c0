mod locator;
mod mapping;

pub use locator::locate;
pub use mapping::{ButtonAction, resolve_bindings};
