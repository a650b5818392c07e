//! AT command table
//!
//! Every command the driver may send is registered here once, with its request
//! template, the line that ends its response and an idle-read budget.
//! Templates carry at most one substitution slot, checked for arity and type
//! at render time.

use std::collections::HashMap;

use crate::error::{AtError, AtResult};

/// Commands understood by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    ModemInfo,
    FirmwareRevision,
    Battery,
    Scan,
    Network,
    Signal,
    CheckRegistration,
    SetApn,
    SetUser,
    SetPassword,
    InitGprs,
    SetPin,
    CheckSim,
    SetErrorLog,
    SetSmsTextMode,
    OpenBearer,
    GetBearer,
    InitHttp,
    SetHttpCid,
    CheckSsl,
    EnableSsl,
    DisableSsl,
    SetUrl,
    DoGet,
    SetContent,
    PostLength,
    WritePayload,
    DoPost,
    ReadData,
    CloseHttp,
    CloseBearer,
    SmsTarget,
}

impl Command {
    pub const ALL: [Command; 32] = [
        Command::ModemInfo,
        Command::FirmwareRevision,
        Command::Battery,
        Command::Scan,
        Command::Network,
        Command::Signal,
        Command::CheckRegistration,
        Command::SetApn,
        Command::SetUser,
        Command::SetPassword,
        Command::InitGprs,
        Command::SetPin,
        Command::CheckSim,
        Command::SetErrorLog,
        Command::SetSmsTextMode,
        Command::OpenBearer,
        Command::GetBearer,
        Command::InitHttp,
        Command::SetHttpCid,
        Command::CheckSsl,
        Command::EnableSsl,
        Command::DisableSsl,
        Command::SetUrl,
        Command::DoGet,
        Command::SetContent,
        Command::PostLength,
        Command::WritePayload,
        Command::DoPost,
        Command::ReadData,
        Command::CloseHttp,
        Command::CloseBearer,
        Command::SmsTarget,
    ];

    /// Stable name used for table lookup and in errors
    pub fn name(self) -> &'static str {
        match self {
            Command::ModemInfo => "modeminfo",
            Command::FirmwareRevision => "fwrevision",
            Command::Battery => "battery",
            Command::Scan => "scan",
            Command::Network => "network",
            Command::Signal => "signal",
            Command::CheckRegistration => "checkreg",
            Command::SetApn => "setapn",
            Command::SetUser => "setuser",
            Command::SetPassword => "setpwd",
            Command::InitGprs => "initgprs",
            Command::SetPin => "setpin",
            Command::CheckSim => "checksim",
            Command::SetErrorLog => "seterrorlog",
            Command::SetSmsTextMode => "setsmstextmode",
            Command::OpenBearer => "opengprs",
            Command::GetBearer => "getbear",
            Command::InitHttp => "inithttp",
            Command::SetHttpCid => "sethttp",
            Command::CheckSsl => "checkssl",
            Command::EnableSsl => "enablessl",
            Command::DisableSsl => "disablessl",
            Command::SetUrl => "initurl",
            Command::DoGet => "doget",
            Command::SetContent => "setcontent",
            Command::PostLength => "postlen",
            Command::WritePayload => "dumpdata",
            Command::DoPost => "dopost",
            Command::ReadData => "getdata",
            Command::CloseHttp => "closehttp",
            Command::CloseBearer => "closebear",
            Command::SmsTarget => "smstarget",
        }
    }

    fn spec(self) -> CommandSpec {
        use Template::{Fixed, Slot};

        const OK: Option<&str> = Some("OK");
        const HTTP_ACTION: Option<&str> = Some("+HTTPACTION");

        let text = |prefix, suffix| Slot {
            prefix,
            suffix,
            kind: SlotKind::Text,
        };

        let (template, terminator, timeout) = match self {
            Command::ModemInfo => (Fixed("ATI"), OK, 3),
            Command::FirmwareRevision => (Fixed("AT+CGMR"), OK, 3),
            Command::Battery => (Fixed("AT+CBC"), OK, 3),
            Command::Scan => (Fixed("AT+COPS=?"), OK, 60),
            Command::Network => (Fixed("AT+COPS?"), OK, 3),
            Command::Signal => (Fixed("AT+CSQ"), OK, 3),
            Command::CheckRegistration => (Fixed("AT+CREG?"), None, 3),
            Command::SetApn => (text("AT+SAPBR=3,1,\"APN\",\"", "\""), OK, 3),
            Command::SetUser => (text("AT+SAPBR=3,1,\"USER\",\"", "\""), OK, 3),
            Command::SetPassword => (text("AT+SAPBR=3,1,\"PWD\",\"", "\""), OK, 3),
            Command::InitGprs => (Fixed("AT+SAPBR=3,1,\"Contype\",\"GPRS\""), OK, 3),
            Command::SetPin => (text("AT+CPIN=\"", "\""), OK, 3),
            Command::CheckSim => (Fixed("AT+CPIN?"), OK, 3),
            Command::SetErrorLog => (Fixed("AT+CMEE=1"), OK, 3),
            Command::SetSmsTextMode => (Fixed("AT+CMGF=1"), OK, 3),
            Command::OpenBearer => (Fixed("AT+SAPBR=1,1"), OK, 3),
            Command::GetBearer => (Fixed("AT+SAPBR=2,1"), OK, 3),
            Command::InitHttp => (Fixed("AT+HTTPINIT"), OK, 3),
            Command::SetHttpCid => (Fixed("AT+HTTPPARA=\"CID\",1"), OK, 3),
            Command::CheckSsl => (Fixed("AT+CIPSSL=?"), OK, 3),
            Command::EnableSsl => (Fixed("AT+HTTPSSL=1"), OK, 3),
            Command::DisableSsl => (Fixed("AT+HTTPSSL=0"), OK, 3),
            Command::SetUrl => (text("AT+HTTPPARA=\"URL\",\"", "\""), OK, 3),
            Command::DoGet => (Fixed("AT+HTTPACTION=0"), HTTP_ACTION, 20),
            Command::SetContent => (text("AT+HTTPPARA=\"CONTENT\",\"", "\""), OK, 3),
            // 5000 is the modem-side upload window in milliseconds
            Command::PostLength => (
                Slot {
                    prefix: "AT+HTTPDATA=",
                    suffix: ",5000",
                    kind: SlotKind::Number,
                },
                Some("DOWNLOAD"),
                3,
            ),
            Command::WritePayload => (
                Slot {
                    prefix: "",
                    suffix: "",
                    kind: SlotKind::Raw,
                },
                OK,
                5,
            ),
            Command::DoPost => (Fixed("AT+HTTPACTION=1"), HTTP_ACTION, 20),
            Command::ReadData => (Fixed("AT+HTTPREAD"), OK, 3),
            Command::CloseHttp => (Fixed("AT+HTTPTERM"), OK, 3),
            Command::CloseBearer => (Fixed("AT+SAPBR=0,1"), OK, 3),
            Command::SmsTarget => (text("AT+CMGS=\"", "\""), None, 3),
        };

        let discard_prefix = match self {
            Command::ReadData => Some("+HTTPREAD:"),
            _ => None,
        };

        CommandSpec {
            command: self,
            template,
            terminator,
            timeout,
            discard_prefix,
        }
    }
}

/// Type of value a template slot accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Text placed inside a quoted AT parameter
    Text,
    /// Unsigned integer
    Number,
    /// Arbitrary text sent verbatim
    Raw,
}

/// Request template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Fixed(&'static str),
    Slot {
        prefix: &'static str,
        suffix: &'static str,
        kind: SlotKind,
    },
}

/// Value substituted into a template slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Text(String),
    Number(usize),
}

impl Arg {
    pub fn text(value: impl Into<String>) -> Self {
        Arg::Text(value.into())
    }
}

/// Static description of one AT command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: Command,
    pub template: Template,
    /// Line that ends the response, if the command has one
    pub terminator: Option<&'static str>,
    /// Idle reads tolerated before giving up
    pub timeout: u32,
    /// Response lines starting with this prefix are dropped from the output
    pub discard_prefix: Option<&'static str>,
}

impl CommandSpec {
    pub fn name(&self) -> &'static str {
        self.command.name()
    }

    /// Render the request line (without line terminator)
    pub fn render(&self, arg: Option<&Arg>) -> AtResult<String> {
        let invalid = |reason: &str| AtError::InvalidArgument {
            command: self.name(),
            reason: reason.to_string(),
        };

        match (self.template, arg) {
            (Template::Fixed(request), None) => Ok(request.to_string()),
            (Template::Fixed(_), Some(_)) => Err(invalid("command takes no argument")),
            (Template::Slot { .. }, None) => Err(invalid("missing argument")),
            (
                Template::Slot {
                    prefix,
                    suffix,
                    kind,
                },
                Some(arg),
            ) => {
                let value = match (kind, arg) {
                    (SlotKind::Text, Arg::Text(text)) => {
                        if text.contains(['"', '\r', '\n']) {
                            return Err(invalid("text may not contain quotes or line breaks"));
                        }
                        text.clone()
                    }
                    (SlotKind::Raw, Arg::Text(text)) => text.clone(),
                    (SlotKind::Number, Arg::Number(n)) => n.to_string(),
                    (SlotKind::Number, Arg::Text(_)) => return Err(invalid("expected a number")),
                    (_, Arg::Number(_)) => return Err(invalid("expected text")),
                };
                Ok(format!("{}{}{}", prefix, value, suffix))
            }
        }
    }
}

/// Registry of command specifications, built once at startup
#[derive(Debug, Clone)]
pub struct CommandTable {
    specs: HashMap<&'static str, CommandSpec>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTable {
    /// Create the table holding the full command vocabulary
    pub fn new() -> Self {
        let specs = Command::ALL
            .iter()
            .map(|command| (command.name(), command.spec()))
            .collect();
        Self { specs }
    }

    /// Look up a command by name
    pub fn lookup(&self, name: &str) -> AtResult<&CommandSpec> {
        self.specs
            .get(name)
            .ok_or_else(|| AtError::Unsupported(format!("unknown command {:?}", name)))
    }

    /// Look up a typed command
    pub fn spec(&self, command: Command) -> AtResult<&CommandSpec> {
        self.lookup(command.name())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
