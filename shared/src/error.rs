//! Error taxonomy for modem operations

use thiserror::Error;

/// Errors that can occur while driving the modem
#[derive(Error, Debug)]
pub enum AtError {
    #[error("Timeout waiting for {command} response ({idle_reads} idle reads)")]
    Timeout {
        command: &'static str,
        idle_reads: u32,
    },

    #[error("Modem returned ERROR for {command}")]
    Modem { command: &'static str },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid argument for {command}: {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },

    #[error("Cannot parse {what} from {raw:?}")]
    Parse { what: &'static str, raw: String },

    #[error("Inconsistent modem state: {0}")]
    InconsistentState(String),

    #[error("Modem is not initialized")]
    NotInitialized,

    #[error("Modem is not connected")]
    NotConnected,

    #[error("No IP address assigned after {attempts} polls")]
    NoIpAddress { attempts: u32 },

    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Modem driver task is gone")]
    DriverClosed,
}

impl AtError {
    pub(crate) fn parse(what: &'static str, raw: impl Into<String>) -> Self {
        AtError::Parse {
            what,
            raw: raw.into(),
        }
    }

    /// True for an explicit ERROR line from the device
    pub fn is_modem_error(&self) -> bool {
        matches!(self, AtError::Modem { .. })
    }
}

pub type AtResult<T> = Result<T, AtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AtError::Timeout {
            command: "signal",
            idle_reads: 3,
        };
        assert_eq!(
            err.to_string(),
            "Timeout waiting for signal response (3 idle reads)"
        );

        let err = AtError::parse("IP address", "+SAPBR: 1,1");
        assert!(err.to_string().contains("IP address"));
    }

    #[test]
    fn test_modem_error_kind() {
        assert!(AtError::Modem { command: "closebear" }.is_modem_error());
        assert!(!AtError::NotConnected.is_modem_error());
        assert!(!AtError::Timeout {
            command: "closebear",
            idle_reads: 3
        }
        .is_modem_error());
    }
}
