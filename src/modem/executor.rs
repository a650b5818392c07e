//! Command executor - runs one AT command end-to-end over the transport

use crate::transport::ModemTransport;
use simlink_shared::codec::{finish_output, FramedLine, LineFramer};
use simlink_shared::{Arg, AtError, AtResult, Command, CommandSpec, CommandTable, LINE_END};
use std::time::Duration;
use tracing::debug;

/// Executes commands from the command table against an owned transport
///
/// Every operation takes `&mut self`, so at most one command is ever in
/// flight on the transport.
pub struct CommandExecutor<T> {
    transport: T,
    table: CommandTable,
    /// Bounded wait of a single line read (one idle-read unit)
    idle_wait: Duration,
}

impl<T: ModemTransport> CommandExecutor<T> {
    /// Create a new command executor
    pub fn new(transport: T, idle_wait: Duration) -> Self {
        Self {
            transport,
            table: CommandTable::new(),
            idle_wait,
        }
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Execute a command and return its cleaned output
    pub async fn execute(&mut self, command: Command, arg: Option<Arg>) -> AtResult<String> {
        self.execute_with(command, arg, true).await
    }

    /// Execute a command, optionally keeping the raw output layout
    pub async fn execute_with(
        &mut self,
        command: Command,
        arg: Option<Arg>,
        clean: bool,
    ) -> AtResult<String> {
        self.execute_named(command.name(), arg.as_ref(), clean).await
    }

    /// Execute a command looked up by name
    pub async fn execute_named(
        &mut self,
        name: &str,
        arg: Option<&Arg>,
        clean: bool,
    ) -> AtResult<String> {
        let dropped = self.transport.drain().await?;
        if dropped > 0 {
            debug!("Dropped {} stale bytes before {}", dropped, name);
        }

        let spec = *self.table.lookup(name)?;
        let request = spec.render(arg)?;

        debug!("Writing AT command {:?}", request);
        self.transport
            .write(format!("{}{}", request, LINE_END).as_bytes())
            .await?;

        self.collect_response(&spec, &request, clean).await
    }

    /// Upload a raw payload after the modem prompted for it
    ///
    /// The payload bypasses the request path: it is written verbatim, without
    /// a line terminator, and only the modem's acknowledgement is framed.
    pub async fn send_payload(&mut self, payload: &str) -> AtResult<String> {
        let spec = *self.table.spec(Command::WritePayload)?;
        let request = spec.render(Some(&Arg::text(payload)))?;

        debug!("Writing {} byte payload", payload.len());
        self.transport.write(request.as_bytes()).await?;

        self.collect_response(&spec, &request, true).await
    }

    /// Write bytes outside of any command exchange
    pub async fn write_raw(&mut self, bytes: &[u8]) -> AtResult<()> {
        debug!("Writing raw {:?}", String::from_utf8_lossy(bytes));
        self.transport.write(bytes).await?;
        Ok(())
    }

    /// Collect whatever lines are available right now, stopping at the first idle read
    pub async fn read_pending(&mut self) -> AtResult<String> {
        let mut collected = String::new();
        while let Some(line) = self.transport.read_line(self.idle_wait).await? {
            collected.push_str(&String::from_utf8_lossy(&line));
        }
        Ok(collected)
    }

    async fn collect_response(
        &mut self,
        spec: &CommandSpec,
        request: &str,
        clean: bool,
    ) -> AtResult<String> {
        let mut framer = LineFramer::for_spec(spec);
        let mut idle_reads = 0;

        loop {
            let Some(line) = self.transport.read_line(self.idle_wait).await? else {
                idle_reads += 1;
                if idle_reads >= spec.timeout {
                    // Without a terminator the idle budget marks the end of the response
                    if spec.terminator.is_none() {
                        break;
                    }
                    return Err(AtError::Timeout {
                        command: spec.name(),
                        idle_reads,
                    });
                }
                continue;
            };

            let line = String::from_utf8_lossy(&line);
            debug!("Read {:?}", line);

            match framer.feed(&line) {
                FramedLine::ModemError => {
                    return Err(AtError::Modem {
                        command: spec.name(),
                    })
                }
                FramedLine::Terminator => break,
                FramedLine::Body => {}
            }
        }

        let output = finish_output(framer.body(), request, clean);
        debug!("Returning {:?}", output);
        Ok(output)
    }
}

/// Treat an ERROR reply as "already in the desired state"
///
/// Used by cleanup steps only; every other failure still propagates.
pub fn ignore_modem_error(result: AtResult<String>) -> AtResult<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.is_modem_error() => {
            debug!("{}, nothing to clean up", e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
