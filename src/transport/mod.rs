pub mod reset;
pub mod serial;
pub mod traits;

#[cfg(test)]
pub mod scripted;

pub use reset::{NoResetLine, SysfsResetLine};
pub use serial::SerialTransport;
pub use traits::{Level, ModemTransport, ResetLine};
