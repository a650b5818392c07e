//! Modem driver task
//!
//! The controller is owned by a single spawned task. Callers talk to it through
//! a cloneable [`ModemHandle`]; requests are queued on a channel and executed
//! one at a time, so commands from different callers never interleave on the
//! serial line.

use super::controller::ConnectivityController;
use crate::transport::{ModemTransport, ResetLine};
use simlink_shared::{
    AtError, AtResult, BatteryStatus, LinkState, NetworkEntry, Registration, Response,
};
use std::net::Ipv4Addr;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

type Reply<T> = oneshot::Sender<AtResult<T>>;

/// Requests accepted by the driver task
#[derive(Debug)]
pub enum ModemRequest {
    Initialize(Reply<()>),
    Reset(Reply<()>),
    Info(Reply<String>),
    FirmwareRevision(Reply<String>),
    SimReady(Reply<bool>),
    UnlockSim(String, Reply<String>),
    Battery(Reply<String>),
    BatteryLevel(Reply<BatteryStatus>),
    Scan(Reply<Vec<NetworkEntry>>),
    CurrentNetwork(Reply<Option<String>>),
    Signal(Reply<f64>),
    Registration(Reply<Registration>),
    IpAddress(Reply<Option<Ipv4Addr>>),
    LinkState(Reply<LinkState>),
    Connect {
        apn: String,
        user: String,
        password: String,
        reply: Reply<()>,
    },
    Disconnect(Reply<()>),
    Http {
        url: String,
        method: String,
        data: Option<String>,
        content_type: String,
        reply: Reply<Response>,
    },
    Sms {
        number: String,
        text: String,
        reply: Reply<()>,
    },
}

/// Cloneable handle to a running modem driver
#[derive(Debug, Clone)]
pub struct ModemHandle {
    tx: mpsc::Sender<ModemRequest>,
}

impl ModemHandle {
    /// Move the controller into a new driver task
    pub fn spawn<T, R>(controller: ConnectivityController<T, R>) -> Self
    where
        T: ModemTransport + 'static,
        R: ResetLine + 'static,
    {
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(driver_loop(controller, rx));
        Self { tx }
    }

    async fn call<V>(&self, build: impl FnOnce(Reply<V>) -> ModemRequest) -> AtResult<V> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| AtError::DriverClosed)?;
        response.await.map_err(|_| AtError::DriverClosed)?
    }

    pub async fn initialize(&self) -> AtResult<()> {
        self.call(ModemRequest::Initialize).await
    }

    pub async fn reset(&self) -> AtResult<()> {
        self.call(ModemRequest::Reset).await
    }

    pub async fn get_info(&self) -> AtResult<String> {
        self.call(ModemRequest::Info).await
    }

    pub async fn firmware_revision(&self) -> AtResult<String> {
        self.call(ModemRequest::FirmwareRevision).await
    }

    pub async fn check_sim_state(&self) -> AtResult<bool> {
        self.call(ModemRequest::SimReady).await
    }

    pub async fn unlock_sim(&self, pin: &str) -> AtResult<String> {
        let pin = pin.to_string();
        self.call(|reply| ModemRequest::UnlockSim(pin, reply)).await
    }

    pub async fn battery_status(&self) -> AtResult<String> {
        self.call(ModemRequest::Battery).await
    }

    pub async fn battery_level(&self) -> AtResult<BatteryStatus> {
        self.call(ModemRequest::BatteryLevel).await
    }

    pub async fn scan_networks(&self) -> AtResult<Vec<NetworkEntry>> {
        self.call(ModemRequest::Scan).await
    }

    pub async fn get_current_network(&self) -> AtResult<Option<String>> {
        self.call(ModemRequest::CurrentNetwork).await
    }

    pub async fn get_signal_strength(&self) -> AtResult<f64> {
        self.call(ModemRequest::Signal).await
    }

    pub async fn registration_status(&self) -> AtResult<Registration> {
        self.call(ModemRequest::Registration).await
    }

    pub async fn get_ip_address(&self) -> AtResult<Option<Ipv4Addr>> {
        self.call(ModemRequest::IpAddress).await
    }

    pub async fn link_state(&self) -> AtResult<LinkState> {
        self.call(ModemRequest::LinkState).await
    }

    pub async fn connect(&self, apn: &str, user: &str, password: &str) -> AtResult<()> {
        self.call(|reply| ModemRequest::Connect {
            apn: apn.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            reply,
        })
        .await
    }

    pub async fn disconnect(&self) -> AtResult<()> {
        self.call(ModemRequest::Disconnect).await
    }

    pub async fn http_request(
        &self,
        url: &str,
        method: &str,
        data: Option<&str>,
        content_type: &str,
    ) -> AtResult<Response> {
        self.call(|reply| ModemRequest::Http {
            url: url.to_string(),
            method: method.to_string(),
            data: data.map(str::to_string),
            content_type: content_type.to_string(),
            reply,
        })
        .await
    }

    pub async fn send_sms(&self, number: &str, text: &str) -> AtResult<()> {
        self.call(|reply| ModemRequest::Sms {
            number: number.to_string(),
            text: text.to_string(),
            reply,
        })
        .await
    }
}

async fn driver_loop<T, R>(
    mut controller: ConnectivityController<T, R>,
    mut rx: mpsc::Receiver<ModemRequest>,
) where
    T: ModemTransport,
    R: ResetLine,
{
    info!("[Driver] Modem driver started");

    while let Some(request) = rx.recv().await {
        // A caller that gave up on its reply is not an error for the driver
        match request {
            ModemRequest::Initialize(reply) => {
                let _ = reply.send(controller.initialize().await);
            }
            ModemRequest::Reset(reply) => {
                let _ = reply.send(controller.reset().await);
            }
            ModemRequest::Info(reply) => {
                let _ = reply.send(controller.get_info().await);
            }
            ModemRequest::FirmwareRevision(reply) => {
                let _ = reply.send(controller.firmware_revision().await);
            }
            ModemRequest::SimReady(reply) => {
                let _ = reply.send(controller.check_sim_state().await);
            }
            ModemRequest::UnlockSim(pin, reply) => {
                let _ = reply.send(controller.unlock_sim(&pin).await);
            }
            ModemRequest::Battery(reply) => {
                let _ = reply.send(controller.battery_status().await);
            }
            ModemRequest::BatteryLevel(reply) => {
                let _ = reply.send(controller.battery_level().await);
            }
            ModemRequest::Scan(reply) => {
                let _ = reply.send(controller.scan_networks().await);
            }
            ModemRequest::CurrentNetwork(reply) => {
                let _ = reply.send(controller.get_current_network().await);
            }
            ModemRequest::Signal(reply) => {
                let _ = reply.send(controller.get_signal_strength().await);
            }
            ModemRequest::Registration(reply) => {
                let _ = reply.send(controller.registration_status().await);
            }
            ModemRequest::IpAddress(reply) => {
                let _ = reply.send(controller.get_ip_address().await);
            }
            ModemRequest::LinkState(reply) => {
                let _ = reply.send(controller.link_state().await);
            }
            ModemRequest::Connect {
                apn,
                user,
                password,
                reply,
            } => {
                let _ = reply.send(controller.connect(&apn, &user, &password).await);
            }
            ModemRequest::Disconnect(reply) => {
                let _ = reply.send(controller.disconnect().await);
            }
            ModemRequest::Http {
                url,
                method,
                data,
                content_type,
                reply,
            } => {
                let result = controller
                    .http_request(&url, &method, data.as_deref(), &content_type)
                    .await;
                let _ = reply.send(result);
            }
            ModemRequest::Sms {
                number,
                text,
                reply,
            } => {
                let _ = reply.send(controller.send_sms(&number, &text).await);
            }
        }
    }

    info!("[Driver] All handles dropped, modem driver stopped");
}
