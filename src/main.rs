mod config;
mod modem;
mod transport;

use anyhow::{Context, Result};
use config::DeviceConfig;
use modem::{ConnectivityController, ModemHandle};
use std::path::PathBuf;
use transport::{NoResetLine, ResetLine, SerialTransport, SysfsResetLine};

use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config_path = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("SIMLINK_CONFIG"))
        .map(PathBuf::from);
    let config = DeviceConfig::load(config_path.as_deref())?;

    info!("Edge device starting");
    info!("  Modem: {} @ {} baud", config.serial.port, config.serial.baud);

    let transport = SerialTransport::open(&config.serial.port, config.serial.baud)
        .with_context(|| format!("Failed to open serial port {}", config.serial.port))?;

    let reset_line: Box<dyn ResetLine> = match &config.reset_gpio {
        Some(path) => {
            info!("  Reset line: {}", path.display());
            Box::new(SysfsResetLine::new(path))
        }
        None => {
            warn!("No reset GPIO configured, modem will not be hardware reset");
            Box::new(NoResetLine)
        }
    };

    let modem = ModemHandle::spawn(ConnectivityController::new(
        transport,
        reset_line,
        config.modem_settings(),
    ));

    modem.initialize().await.context("Modem initialization failed")?;
    info!("Modem: {}", modem.get_info().await?);
    info!("Firmware: {}", modem.firmware_revision().await?);

    if !modem.check_sim_state().await? {
        match &config.sim_pin {
            Some(pin) => {
                warn!("SIM still locked after initialization, submitting PIN again");
                modem.unlock_sim(pin).await.context("SIM PIN rejected")?;
            }
            None => warn!("SIM is locked and no PIN is configured"),
        }
    }

    match modem.battery_status().await {
        Ok(battery) => info!("Battery: {}", battery),
        Err(e) => warn!("Battery query failed: {}", e),
    }

    match modem.registration_status().await {
        Ok(registration) if registration.is_registered() => {
            info!("Registered on network ({:?})", registration)
        }
        Ok(registration) => {
            warn!("Not registered on network ({:?})", registration);
            match modem.scan_networks().await {
                Ok(networks) => {
                    for network in networks {
                        info!("  Visible network: {} ({})", network.name, network.id);
                    }
                }
                Err(e) => warn!("Network scan failed: {}", e),
            }
        }
        Err(e) => warn!("Registration query failed: {}", e),
    }

    let apn = &config.apn;
    if let Err(e) = modem.connect(&apn.name, &apn.user, &apn.password).await {
        warn!("Connect failed ({}), resetting modem and retrying once", e);
        modem.reset().await?;
        modem.initialize().await.context("Modem re-initialization failed")?;
        modem
            .connect(&apn.name, &apn.user, &apn.password)
            .await
            .with_context(|| format!("Failed to connect to APN {:?}", apn.name))?;
    }
    if let Some(ip) = modem.get_ip_address().await? {
        info!("Bearer up with IP {}", ip);
    }

    if let Some(number) = &config.notify_number {
        if let Err(e) = modem.send_sms(number, "simlink-edge online").await {
            error!("Failed to send startup SMS to {}: {}", number, e);
        }
    }

    if let Some(url) = &config.http_probe_url {
        match modem.http_request(url, "GET", None, "text/plain").await {
            Ok(response) => info!(
                "HTTP probe {} -> {} ({} bytes)",
                url,
                response.status_code,
                response.content.len()
            ),
            Err(e) => error!("HTTP probe {} failed: {}", url, e),
        }
    }

    // Spawn status reporting task
    let status_modem = modem.clone();
    let status_interval = config.status_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(status_interval);
        loop {
            ticker.tick().await;
            report_status(&status_modem).await;
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");

    if let Err(e) = modem.disconnect().await {
        error!("Failed to disconnect: {}", e);
    }
    Ok(())
}

/// Log link, signal and battery status
async fn report_status(modem: &ModemHandle) {
    match modem.link_state().await {
        Ok(state) => info!("[Status] Link: {:?}", state),
        Err(e) => {
            error!("[Status] Link state query failed: {}", e);
            return;
        }
    }

    match modem.get_signal_strength().await {
        Ok(signal) => info!("[Status] Signal: {:.0}%", signal * 100.0),
        Err(e) => warn!("[Status] Signal query failed: {}", e),
    }

    match modem.battery_level().await {
        Ok(battery) => info!(
            "[Status] Battery: {}% ({} mV, charging={})",
            battery.percent, battery.millivolts, battery.charging
        ),
        Err(e) => warn!("[Status] Battery query failed: {}", e),
    }

    match modem.get_current_network().await {
        Ok(Some(network)) => debug!("[Status] Network: {}", network),
        Ok(None) => debug!("[Status] No network selected"),
        Err(e) => warn!("[Status] Network query failed: {}", e),
    }
}
