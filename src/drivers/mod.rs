pub mod flash;
pub mod status_led;

pub use flash::{InterruptsMasked, PageProgrammer, SelfProgram};
pub use status_led::{LedMode, StatusLed};
