//! Modem State Machine
//!
//! The driver stores only what it cannot observe: whether initialization
//! completed and whether SSL is usable. Connectivity is derived from the IP
//! address the modem reports, so it can never disagree with the device.

use std::net::Ipv4Addr;

use crate::error::{AtError, AtResult};

/// State owned by the connectivity controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModemState {
    initialized: bool,
    ssl_available: bool,
}

impl ModemState {
    /// Create a new, uninitialized state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn ssl_available(&self) -> bool {
        self.ssl_available
    }

    /// Record a completed initialization
    pub fn mark_initialized(&mut self, ssl_available: bool) {
        self.initialized = true;
        self.ssl_available = ssl_available;
    }

    /// Fail unless initialization completed
    pub fn require_initialized(&self) -> AtResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(AtError::NotInitialized)
        }
    }

    /// Derive the link state from the current IP address
    pub fn link_state(&self, ip: Option<Ipv4Addr>) -> LinkState {
        match (self.initialized, ip) {
            (false, _) => LinkState::Uninitialized,
            (true, None) => LinkState::Initialized,
            (true, Some(_)) => LinkState::Connected,
        }
    }
}

/// Observable connectivity of the modem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Uninitialized,
    Initialized,
    Connected,
}
