//! SMS in text mode

use super::controller::ConnectivityController;
use crate::transport::{ModemTransport, ResetLine};
use simlink_shared::{Arg, AtError, AtResult, Command, LINE_END, SMS_SUBMIT};
use tokio::time::sleep;
use tracing::{debug, info};

impl<T: ModemTransport, R: ResetLine> ConnectivityController<T, R> {
    /// Send a text message to `number`
    ///
    /// The modem's reply to the submission is logged, not checked.
    pub async fn send_sms(&mut self, number: &str, text: &str) -> AtResult<()> {
        self.state.require_initialized()?;

        if text.as_bytes().contains(&SMS_SUBMIT) {
            return Err(AtError::InvalidArgument {
                command: Command::SmsTarget.name(),
                reason: "message text may not contain Ctrl-Z".into(),
            });
        }

        let target = self
            .executor
            .table()
            .spec(Command::SmsTarget)?
            .render(Some(&Arg::text(number)))?;

        self.executor.execute(Command::SetSmsTextMode, None).await?;
        let settle = self.settings.timings.sms_settle;
        sleep(settle).await;

        self.executor
            .write_raw(format!("{}{}", target, LINE_END).as_bytes())
            .await?;
        sleep(settle).await;
        self.executor.write_raw(text.as_bytes()).await?;
        sleep(settle).await;
        self.executor.write_raw(&[SMS_SUBMIT]).await?;
        sleep(settle).await;
        self.executor.write_raw(LINE_END.as_bytes()).await?;
        sleep(settle).await;

        let reply = self.executor.read_pending().await?;
        debug!("[SMS] Modem replied {:?}", reply);
        info!("[SMS] Message submitted to {}", number);
        Ok(())
    }
}
