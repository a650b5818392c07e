//! GPRS bearer management

use super::controller::ConnectivityController;
use super::executor::ignore_modem_error;
use crate::transport::{ModemTransport, ResetLine};
use simlink_shared::{timing, Arg, AtError, AtResult, Command};
use tokio::time::sleep;
use tracing::{debug, info};

impl<T: ModemTransport, R: ResetLine> ConnectivityController<T, R> {
    /// Open the GPRS bearer and wait for an IP address
    ///
    /// Does nothing when an address is already assigned.
    pub async fn connect(&mut self, apn: &str, user: &str, password: &str) -> AtResult<()> {
        self.state.require_initialized()?;

        if let Some(ip) = self.get_ip_address().await? {
            debug!("[Modem] Already connected ({}), not reconnecting", ip);
            return Ok(());
        }

        debug!("[Modem] Closing bearer in case it was left open");
        self.close_bearer().await?;

        debug!("[Modem] Connect step #1 (initgprs)");
        self.executor.execute(Command::InitGprs, None).await?;

        debug!("[Modem] Connect step #2 (apn/user/password)");
        self.executor.execute(Command::SetApn, Some(Arg::text(apn))).await?;
        self.executor.execute(Command::SetUser, Some(Arg::text(user))).await?;
        self.executor
            .execute(Command::SetPassword, Some(Arg::text(password)))
            .await?;

        debug!("[Modem] Connect step #3 (opengprs)");
        self.executor.execute(Command::OpenBearer, None).await?;

        for attempt in 1..=timing::IP_POLL_ATTEMPTS {
            if let Some(ip) = self.get_ip_address().await? {
                info!("[Modem] Connected with IP {}", ip);
                return Ok(());
            }
            debug!(
                "[Modem] No IP address yet ({}/{})",
                attempt,
                timing::IP_POLL_ATTEMPTS
            );
            if attempt < timing::IP_POLL_ATTEMPTS {
                sleep(self.settings.timings.ip_poll_interval).await;
            }
        }

        Err(AtError::NoIpAddress {
            attempts: timing::IP_POLL_ATTEMPTS,
        })
    }

    /// Close the bearer and verify that the address is gone
    pub async fn disconnect(&mut self) -> AtResult<()> {
        self.close_bearer().await?;

        if let Some(ip) = self.get_ip_address().await? {
            return Err(AtError::InconsistentState(format!(
                "bearer closed but IP address {} is still assigned",
                ip
            )));
        }

        info!("[Modem] Disconnected");
        Ok(())
    }

    /// Close the bearer; an already closed bearer is not an error
    async fn close_bearer(&mut self) -> AtResult<()> {
        ignore_modem_error(self.executor.execute(Command::CloseBearer, None).await)
    }
}
