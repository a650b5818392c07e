//! SIM800 modem driver
//!
//! This module handles:
//! - Command execution and response framing over the serial transport
//! - Modem lifecycle, queries and GPRS bearer management
//! - HTTP requests and SMS
//! - Serialized access through a driver task

mod connect;
mod controller;
mod driver;
mod executor;
mod http;
mod sms;

pub use controller::{ConnectivityController, ModemSettings, Timings};
pub use driver::ModemHandle;
