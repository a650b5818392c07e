//! Connectivity controller - modem lifecycle and queries
//!
//! Composes the command executor into the modem's higher level operations.
//! Connect/disconnect, HTTP and SMS live in sibling modules as further
//! `impl` blocks on [`ConnectivityController`].

use super::executor::CommandExecutor;
use crate::transport::{Level, ModemTransport, ResetLine};
use simlink_shared::{
    parse, timing, Arg, AtResult, BatteryStatus, Command, LinkState, ModemState, NetworkEntry,
    Registration,
};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Delays used by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Bounded wait of a single line read
    pub idle_read: Duration,
    pub reset_pulse: Duration,
    pub reset_settle: Duration,
    pub identity_retry_delay: Duration,
    pub ip_poll_interval: Duration,
    pub sms_settle: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            idle_read: Duration::from_millis(timing::IDLE_READ_MS),
            reset_pulse: Duration::from_millis(timing::RESET_PULSE_MS),
            reset_settle: Duration::from_millis(timing::RESET_SETTLE_MS),
            identity_retry_delay: Duration::from_millis(timing::IDENTITY_RETRY_DELAY_MS),
            ip_poll_interval: Duration::from_millis(timing::IP_POLL_INTERVAL_MS),
            sms_settle: Duration::from_millis(timing::SMS_SETTLE_MS),
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, Default)]
pub struct ModemSettings {
    /// PIN submitted during initialization
    pub sim_pin: Option<String>,
    /// Ask the firmware for SSL support instead of assuming none
    pub probe_ssl: bool,
    pub timings: Timings,
}

/// Drives one modem: lifecycle, connectivity, HTTP and SMS
pub struct ConnectivityController<T, R> {
    pub(super) executor: CommandExecutor<T>,
    reset_line: R,
    pub(super) state: ModemState,
    pub(super) settings: ModemSettings,
    modem_info: Option<String>,
}

impl<T: ModemTransport, R: ResetLine> ConnectivityController<T, R> {
    /// Create a controller for an uninitialized modem
    pub fn new(transport: T, reset_line: R, settings: ModemSettings) -> Self {
        Self {
            executor: CommandExecutor::new(transport, settings.timings.idle_read),
            reset_line,
            state: ModemState::new(),
            settings,
            modem_info: None,
        }
    }

    /// Get the current modem state
    pub fn state(&self) -> ModemState {
        self.state
    }

    /// Identity reported during initialization
    pub fn modem_info(&self) -> Option<&str> {
        self.modem_info.as_deref()
    }

    async fn pulse_reset(&mut self) -> AtResult<()> {
        self.reset_line.set_level(Level::Low)?;
        sleep(self.settings.timings.reset_pulse).await;
        self.reset_line.set_level(Level::High)?;
        Ok(())
    }

    /// Reset the modem and bring it to a state that accepts commands
    pub async fn initialize(&mut self) -> AtResult<()> {
        info!("[Modem] Resetting modem...");
        self.pulse_reset().await?;

        info!("[Modem] Initializing modem...");
        let mut attempt = 0;
        let modem_info = loop {
            attempt += 1;
            match self.executor.execute(Command::ModemInfo, None).await {
                Ok(modem_info) => break modem_info,
                Err(e) if attempt < timing::IDENTITY_ATTEMPTS => {
                    warn!(
                        "[Modem] Identity query failed ({}), retrying ({}/{})",
                        e,
                        attempt,
                        timing::IDENTITY_ATTEMPTS
                    );
                    sleep(self.settings.timings.identity_retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        };
        info!("[Modem] Modem {:?} is ready and accepting commands", modem_info);
        self.modem_info = Some(modem_info);

        self.executor.execute(Command::SetErrorLog, None).await?;

        if let Some(pin) = self.settings.sim_pin.clone() {
            debug!("[Modem] Unlocking SIM");
            self.unlock_sim(&pin).await?;
        }

        // Firmware before R14.00 cannot do HTTPS, so assume it is missing
        let ssl_available = if self.settings.probe_ssl {
            match self.executor.execute(Command::CheckSsl, None).await {
                Ok(output) => parse::ssl_supported(&output),
                // Old firmware does not know AT+CIPSSL at all
                Err(e) if e.is_modem_error() => {
                    debug!("[Modem] SSL probe rejected, assuming no SSL");
                    false
                }
                Err(e) => return Err(e),
            }
        } else {
            false
        };

        self.state.mark_initialized(ssl_available);
        info!("[Modem] Initialized (ssl={})", ssl_available);
        Ok(())
    }

    /// Hardware reset, then wait for the modem to settle
    pub async fn reset(&mut self) -> AtResult<()> {
        self.pulse_reset().await?;
        sleep(self.settings.timings.reset_settle).await;
        Ok(())
    }

    pub async fn get_info(&mut self) -> AtResult<String> {
        self.executor.execute(Command::ModemInfo, None).await
    }

    pub async fn firmware_revision(&mut self) -> AtResult<String> {
        self.executor.execute(Command::FirmwareRevision, None).await
    }

    /// True when the SIM needs no PIN
    pub async fn check_sim_state(&mut self) -> AtResult<bool> {
        let output = self.executor.execute(Command::CheckSim, None).await?;
        Ok(parse::sim_ready(&output))
    }

    pub async fn unlock_sim(&mut self, pin: &str) -> AtResult<String> {
        self.executor.execute(Command::SetPin, Some(Arg::text(pin))).await
    }

    /// Raw `+CBC` response
    pub async fn battery_status(&mut self) -> AtResult<String> {
        self.executor.execute(Command::Battery, None).await
    }

    pub async fn battery_level(&mut self) -> AtResult<BatteryStatus> {
        let output = self.battery_status().await?;
        parse::battery(&output)
    }

    pub async fn scan_networks(&mut self) -> AtResult<Vec<NetworkEntry>> {
        let output = self.executor.execute(Command::Scan, None).await?;
        parse::networks(&output)
    }

    pub async fn get_current_network(&mut self) -> AtResult<Option<String>> {
        let output = self.executor.execute(Command::Network, None).await?;
        Ok(parse::current_network(&output))
    }

    /// Signal quality as a ratio in [0, 1]
    pub async fn get_signal_strength(&mut self) -> AtResult<f64> {
        let output = self.executor.execute(Command::Signal, None).await?;
        parse::signal_strength(&output)
    }

    pub async fn registration_status(&mut self) -> AtResult<Registration> {
        let output = self.executor.execute(Command::CheckRegistration, None).await?;
        parse::registration(&output)
    }

    /// Bearer IP address, `None` when no address is assigned
    pub async fn get_ip_address(&mut self) -> AtResult<Option<Ipv4Addr>> {
        let output = self.executor.execute(Command::GetBearer, None).await?;
        parse::ip_address(&output)
    }

    pub async fn link_state(&mut self) -> AtResult<LinkState> {
        if !self.state.is_initialized() {
            return Ok(LinkState::Uninitialized);
        }
        let ip = self.get_ip_address().await?;
        Ok(self.state.link_state(ip))
    }
}
