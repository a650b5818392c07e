//! Reset line implementations

use crate::transport::traits::{Level, ResetLine};
use std::io;
use std::path::PathBuf;
use tracing::debug;

/// GPIO exported through sysfs (`/sys/class/gpio/gpioN/value`)
pub struct SysfsResetLine {
    value_path: PathBuf,
}

impl SysfsResetLine {
    pub fn new(value_path: impl Into<PathBuf>) -> Self {
        Self {
            value_path: value_path.into(),
        }
    }
}

impl ResetLine for SysfsResetLine {
    fn set_level(&mut self, level: Level) -> io::Result<()> {
        let value = match level {
            Level::Low => "0",
            Level::High => "1",
        };
        std::fs::write(&self.value_path, value)
    }
}

/// Used when the reset pin is not wired up
#[derive(Debug, Default)]
pub struct NoResetLine;

impl ResetLine for NoResetLine {
    fn set_level(&mut self, level: Level) -> io::Result<()> {
        debug!("[Reset] No reset line configured, ignoring {:?}", level);
        Ok(())
    }
}
