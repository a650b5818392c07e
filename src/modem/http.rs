//! HTTP requests through the modem's built-in HTTP client

use super::controller::ConnectivityController;
use super::executor::ignore_modem_error;
use crate::transport::{ModemTransport, ResetLine};
use simlink_shared::{parse, Arg, AtError, AtResult, Command, HttpMethod, Response};
use tracing::{debug, warn};

impl<T: ModemTransport, R: ResetLine> ConnectivityController<T, R> {
    /// Perform a GET or POST request over the open bearer
    ///
    /// Once the HTTP context has been initialized it is always terminated
    /// again, whether or not the request succeeded.
    pub async fn http_request(
        &mut self,
        url: &str,
        method: &str,
        data: Option<&str>,
        content_type: &str,
    ) -> AtResult<Response> {
        self.state.require_initialized()?;

        let secure = if url.starts_with("https://") {
            true
        } else if url.starts_with("http://") {
            false
        } else {
            return Err(AtError::Unsupported(format!("URL scheme of {:?}", url)));
        };

        if self.get_ip_address().await?.is_none() {
            return Err(AtError::NotConnected);
        }

        debug!("[HTTP] Closing HTTP context in case it was left open");
        ignore_modem_error(self.executor.execute(Command::CloseHttp, None).await)?;

        let result = self
            .http_exchange(url, secure, method, data, content_type)
            .await;

        debug!("[HTTP] Closing HTTP context");
        let closed = self.executor.execute(Command::CloseHttp, None).await;

        match (result, closed) {
            (Ok(response), Ok(_)) => Ok(response),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!("[HTTP] Closing context after failed request: {}", close_err);
                Err(e)
            }
        }
    }

    async fn http_exchange(
        &mut self,
        url: &str,
        secure: bool,
        method: &str,
        data: Option<&str>,
        content_type: &str,
    ) -> AtResult<Response> {
        debug!("[HTTP] Step #1.1 (inithttp)");
        self.executor.execute(Command::InitHttp, None).await?;
        debug!("[HTTP] Step #1.2 (sethttp)");
        self.executor.execute(Command::SetHttpCid, None).await?;

        if self.state.ssl_available() {
            let ssl = if secure {
                Command::EnableSsl
            } else {
                Command::DisableSsl
            };
            debug!("[HTTP] Step #1.3 ({})", ssl.name());
            self.executor.execute(ssl, None).await?;
        } else if secure {
            return Err(AtError::Unsupported(
                "HTTPS requires firmware revision R14.00 or newer".into(),
            ));
        }

        debug!("[HTTP] Step #2.1 (initurl)");
        self.executor.execute(Command::SetUrl, Some(Arg::text(url))).await?;

        let action = match method.parse::<HttpMethod>()? {
            HttpMethod::Get => {
                debug!("[HTTP] Step #2.2 (doget)");
                self.executor.execute(Command::DoGet, None).await?
            }
            HttpMethod::Post => {
                let payload = data.ok_or_else(|| AtError::InvalidArgument {
                    command: Command::WritePayload.name(),
                    reason: "POST requires a payload".into(),
                })?;

                debug!("[HTTP] Step #2.2 (setcontent)");
                self.executor
                    .execute(Command::SetContent, Some(Arg::text(content_type)))
                    .await?;
                debug!("[HTTP] Step #2.3 (postlen)");
                self.executor
                    .execute(Command::PostLength, Some(Arg::Number(payload.len())))
                    .await?;
                debug!("[HTTP] Step #2.4 (dumpdata)");
                self.executor.send_payload(payload).await?;
                debug!("[HTTP] Step #2.5 (dopost)");
                self.executor.execute(Command::DoPost, None).await?
            }
        };

        let status_code = parse::http_status(&action)?;
        debug!("[HTTP] Response status code: {}", status_code);

        debug!("[HTTP] Step #3 (getdata)");
        let content = self
            .executor
            .execute_with(Command::ReadData, None, false)
            .await?;

        Ok(Response {
            status_code,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::modem::controller::tests::{initialized, script_init, TestController};
    use crate::modem::{ConnectivityController, ModemSettings};
    use crate::transport::scripted::{RecordingResetLine, ScriptedTransport};
    use simlink_shared::{AtError, Response};

    const HTTPTERM: &str = "AT+HTTPTERM";

    /// Initialized controller with an open bearer and an HTTP context that
    /// accepts configuration
    async fn connected(modem: &ScriptedTransport) -> TestController {
        let controller = initialized(modem).await;
        script_context(modem);
        controller
    }

    fn script_context(modem: &ScriptedTransport) {
        modem.reply("AT+SAPBR=2,1", &["+SAPBR: 1,1,\"10.64.3.7\"", "", "OK"]);
        modem.reply(HTTPTERM, &["ERROR"]);
        modem.reply(HTTPTERM, &["OK"]);
        modem.reply("AT+HTTPINIT", &["OK"]);
        modem.reply("AT+HTTPPARA=\"CID\",1", &["OK"]);
    }

    fn script_url(modem: &ScriptedTransport, url: &str) {
        let request = format!("AT+HTTPPARA=\"URL\",\"{}\"", url);
        modem.reply(&request, &["OK"]);
    }

    /// Requests written after the first HTTPACTION
    fn after_action(modem: &ScriptedTransport) -> Vec<String> {
        let requests = modem.requests();
        let start = requests
            .iter()
            .position(|r| r.starts_with("AT+HTTPACTION"))
            .expect("action issued");
        requests[start + 1..].to_vec()
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_request() {
        let modem = ScriptedTransport::new();
        let mut controller = connected(&modem).await;
        script_url(&modem, "http://example.com/api");
        modem.reply("AT+HTTPACTION=0", &["OK", "", "+HTTPACTION: 0,200,17"]);
        modem.reply(
            "AT+HTTPREAD",
            &["+HTTPREAD: 17", "{\"ok\":true}", "", "done", "OK"],
        );

        let response = controller
            .http_request("http://example.com/api", "GET", None, "application/json")
            .await
            .unwrap();

        assert_eq!(
            response,
            Response {
                status_code: 200,
                content: "{\"ok\":true}\r\n\r\ndone".into(),
            }
        );
        assert_eq!(modem.count(HTTPTERM), 2);
        assert_eq!(modem.requests().last().unwrap(), HTTPTERM);
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_request() {
        let modem = ScriptedTransport::new();
        let mut controller = connected(&modem).await;
        let payload = "{\"lat\":48.85,\"lon\":2.35}";
        script_url(&modem, "http://example.com/track");
        modem.reply("AT+HTTPPARA=\"CONTENT\",\"application/json\"", &["OK"]);
        modem.reply(&format!("AT+HTTPDATA={},5000", payload.len()), &["DOWNLOAD"]);
        modem.reply(payload, &["OK"]);
        modem.reply("AT+HTTPACTION=1", &["OK", "", "+HTTPACTION: 1,201,0"]);
        modem.reply("AT+HTTPREAD", &["OK"]);

        let response = controller
            .http_request("http://example.com/track", "POST", Some(payload), "application/json")
            .await
            .unwrap();

        assert_eq!(response.status_code, 201);
        assert_eq!(response.content, "");

        // The payload goes out verbatim, without a line terminator
        assert!(modem.writes().iter().any(|w| w == payload));

        let requests = modem.requests();
        let data = requests.iter().position(|r| r.starts_with("AT+HTTPDATA")).unwrap();
        assert_eq!(requests[data + 1], payload);
        assert_eq!(requests[data + 2], "AT+HTTPACTION=1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_without_payload() {
        let modem = ScriptedTransport::new();
        let mut controller = connected(&modem).await;
        script_url(&modem, "http://example.com/track");

        let err = controller
            .http_request("http://example.com/track", "POST", None, "application/json")
            .await
            .unwrap_err();

        assert!(matches!(err, AtError::InvalidArgument { command: "dumpdata", .. }));
        assert_eq!(modem.count("AT+HTTPPARA=\"CONTENT\",\"application/json\""), 0);
        assert_eq!(modem.requests().last().unwrap(), HTTPTERM);
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_closed_once_when_status_unparseable() {
        let modem = ScriptedTransport::new();
        let mut controller = connected(&modem).await;
        script_url(&modem, "http://example.com/");
        modem.reply("AT+HTTPACTION=0", &["OK", "", "+HTTPACTION: 0"]);

        let err = controller
            .http_request("http://example.com/", "GET", None, "application/json")
            .await
            .unwrap_err();

        assert!(matches!(err, AtError::Parse { .. }));
        assert_eq!(after_action(&modem), vec![HTTPTERM]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_closed_once_when_body_read_fails() {
        let modem = ScriptedTransport::new();
        let mut controller = connected(&modem).await;
        script_url(&modem, "http://example.com/");
        modem.reply("AT+HTTPACTION=0", &["OK", "", "+HTTPACTION: 0,200,4"]);
        modem.reply("AT+HTTPREAD", &["ERROR"]);

        let err = controller
            .http_request("http://example.com/", "GET", None, "application/json")
            .await
            .unwrap_err();

        assert!(matches!(err, AtError::Modem { command: "getdata" }));
        assert_eq!(after_action(&modem), vec!["AT+HTTPREAD", HTTPTERM]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_method_still_closes_context() {
        let modem = ScriptedTransport::new();
        let mut controller = connected(&modem).await;
        script_url(&modem, "http://example.com/");

        let err = controller
            .http_request("http://example.com/", "DELETE", None, "application/json")
            .await
            .unwrap_err();

        assert!(matches!(err, AtError::Unsupported(_)));
        assert_eq!(modem.count(HTTPTERM), 2);
        assert_eq!(modem.requests().last().unwrap(), HTTPTERM);
    }

    #[tokio::test(start_paused = true)]
    async fn test_https_without_ssl_is_unsupported() {
        let modem = ScriptedTransport::new();
        let mut controller = connected(&modem).await;

        let err = controller
            .http_request("https://example.com/", "GET", None, "application/json")
            .await
            .unwrap_err();

        assert!(matches!(err, AtError::Unsupported(_)));
        assert_eq!(modem.count("AT+HTTPSSL=1"), 0);
        assert_eq!(modem.requests().last().unwrap(), HTTPTERM);
    }

    #[tokio::test(start_paused = true)]
    async fn test_https_enables_ssl_when_available() {
        let modem = ScriptedTransport::new();
        script_init(&modem);
        modem.reply("AT+CIPSSL=?", &["+CIPSSL: (0-1)", "", "OK"]);
        let settings = ModemSettings {
            probe_ssl: true,
            ..Default::default()
        };
        let mut controller =
            ConnectivityController::new(modem.clone(), RecordingResetLine::default(), settings);
        controller.initialize().await.unwrap();

        script_context(&modem);
        modem.reply("AT+HTTPSSL=1", &["OK"]);
        script_url(&modem, "https://example.com/");
        modem.reply("AT+HTTPACTION=0", &["OK", "", "+HTTPACTION: 0,204,0"]);
        modem.reply("AT+HTTPREAD", &["OK"]);

        let response = controller
            .http_request("https://example.com/", "GET", None, "application/json")
            .await
            .unwrap();

        assert_eq!(response.status_code, 204);
        assert_eq!(modem.count("AT+HTTPSSL=1"), 1);
        assert_eq!(modem.count("AT+HTTPSSL=0"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_http_scheme_rejected_before_any_command() {
        let modem = ScriptedTransport::new();
        let mut controller = connected(&modem).await;
        let before = modem.writes().len();

        let err = controller
            .http_request("ftp://example.com/", "GET", None, "application/json")
            .await
            .unwrap_err();

        assert!(matches!(err, AtError::Unsupported(_)));
        assert_eq!(modem.writes().len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requires_connection() {
        let modem = ScriptedTransport::new();
        let mut controller = initialized(&modem).await;
        modem.reply("AT+SAPBR=2,1", &["+SAPBR: 1,3,\"0.0.0.0\"", "", "OK"]);

        let err = controller
            .http_request("http://example.com/", "GET", None, "application/json")
            .await
            .unwrap_err();

        assert!(matches!(err, AtError::NotConnected));
        assert_eq!(modem.count(HTTPTERM), 0);
    }
}
