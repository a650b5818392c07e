//! simlink Shared Protocol Types
//!
//! This crate provides the transport-independent half of the SIM800 driver:
//! the AT command table, the line framer that turns modem output into command
//! outcomes, response parsers and the modem state model.

pub mod codec;
pub mod commands;
pub mod error;
pub mod parse;
pub mod state_machine;

use std::fmt;
use std::str::FromStr;

// Re-export commonly used types at crate root
pub use codec::{FramedLine, LineFramer};
pub use commands::{Arg, Command, CommandSpec, CommandTable, SlotKind, Template};
pub use error::{AtError, AtResult};
pub use state_machine::{LinkState, ModemState};

/// Line terminator appended to every request and expected on every response line
pub const LINE_END: &str = "\r\n";

/// Control byte (Ctrl-Z) that submits an SMS body
pub const SMS_SUBMIT: u8 = 0x1a;

/// Timing parameters for the modem protocol
pub mod timing {
    /// Bounded wait for a single line read, one idle-read unit
    pub const IDLE_READ_MS: u64 = 1000;

    /// Reset line held low for at least this long
    pub const RESET_PULSE_MS: u64 = 100;

    /// Settle time after a manual reset
    pub const RESET_SETTLE_MS: u64 = 700;

    /// Attempts at the identity query during initialization
    pub const IDENTITY_ATTEMPTS: u32 = 3;

    /// Delay between identity query attempts
    pub const IDENTITY_RETRY_DELAY_MS: u64 = 3000;

    /// Polls for an assigned IP address after opening the bearer
    pub const IP_POLL_ATTEMPTS: u32 = 5;

    /// Spacing between IP address polls
    pub const IP_POLL_INTERVAL_MS: u64 = 1000;

    /// Settle delay between the writes of an SMS submission
    pub const SMS_SETTLE_MS: u64 = 50;

    /// Maximum signal quality value reported by AT+CSQ
    pub const SIGNAL_MAX: u8 = 30;
}

/// Result of an HTTP request performed by the modem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status_code: u16,
    pub content: String,
}

/// A network operator reported by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEntry {
    pub name: String,
    pub short_name: String,
    pub id: String,
}

/// HTTP methods reachable through the modem's HTTP action command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl FromStr for HttpMethod {
    type Err = AtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(AtError::Unsupported(format!("HTTP method {:?}", other))),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// Battery reading from AT+CBC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    pub charging: bool,
    pub percent: u8,
    pub millivolts: u16,
}

/// Network registration status from AT+CREG?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    NotRegistered,
    Home,
    Searching,
    Denied,
    Unknown,
    Roaming,
}

impl Registration {
    /// Whether the modem is attached to a network (home or roaming)
    pub fn is_registered(self) -> bool {
        matches!(self, Registration::Home | Registration::Roaming)
    }
}
