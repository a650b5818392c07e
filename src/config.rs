//! Device configuration loaded from TOML

use crate::modem::{ModemSettings, Timings};
use anyhow::{Context, Result};
use serde::Deserialize;
use simlink_shared::timing;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Serial port the modem is attached to
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyS1".into(),
            baud: 38400,
        }
    }
}

/// GPRS access point credentials
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApnConfig {
    pub name: String,
    pub user: String,
    pub password: String,
}

/// Driver delays, in milliseconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub idle_read_ms: u64,
    pub reset_pulse_ms: u64,
    pub reset_settle_ms: u64,
    pub identity_retry_delay_ms: u64,
    pub ip_poll_interval_ms: u64,
    pub sms_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            idle_read_ms: timing::IDLE_READ_MS,
            reset_pulse_ms: timing::RESET_PULSE_MS,
            reset_settle_ms: timing::RESET_SETTLE_MS,
            identity_retry_delay_ms: timing::IDENTITY_RETRY_DELAY_MS,
            ip_poll_interval_ms: timing::IP_POLL_INTERVAL_MS,
            sms_settle_ms: timing::SMS_SETTLE_MS,
        }
    }
}

impl From<&TimingConfig> for Timings {
    fn from(config: &TimingConfig) -> Self {
        Self {
            idle_read: Duration::from_millis(config.idle_read_ms),
            reset_pulse: Duration::from_millis(config.reset_pulse_ms),
            reset_settle: Duration::from_millis(config.reset_settle_ms),
            identity_retry_delay: Duration::from_millis(config.identity_retry_delay_ms),
            ip_poll_interval: Duration::from_millis(config.ip_poll_interval_ms),
            sms_settle: Duration::from_millis(config.sms_settle_ms),
        }
    }
}

/// Configuration for the edge device
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub serial: SerialConfig,
    /// GPIO value file wired to the modem's reset pin
    pub reset_gpio: Option<PathBuf>,
    pub sim_pin: Option<String>,
    pub probe_ssl: bool,
    pub apn: ApnConfig,
    /// Period of the status report
    pub status_interval_secs: u64,
    /// URL fetched once after connecting
    pub http_probe_url: Option<String>,
    /// Phone number notified by SMS once the device is online
    pub notify_number: Option<String>,
    pub timings: TimingConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            reset_gpio: None,
            sim_pin: None,
            probe_ssl: false,
            apn: ApnConfig::default(),
            status_interval_secs: 60,
            http_probe_url: None,
            notify_number: None,
            timings: TimingConfig::default(),
        }
    }
}

impl DeviceConfig {
    /// Load the configuration, falling back to defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn modem_settings(&self) -> ModemSettings {
        ModemSettings {
            sim_pin: self.sim_pin.clone(),
            probe_ssl: self.probe_ssl,
            timings: Timings::from(&self.timings),
        }
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs.max(1))
    }
}
