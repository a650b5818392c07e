//! Scripted modem used by the driver tests
//!
//! Each written request is echoed back like a real SIM800 does, followed by
//! the reply lines registered for it. Requests without a reply produce only
//! idle reads.

use crate::transport::traits::{Level, ModemTransport, ResetLine};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Default)]
struct Script {
    echo: bool,
    replies: HashMap<String, VecDeque<Vec<String>>>,
    inbox: VecDeque<Bytes>,
    writes: Vec<String>,
    idle_reads: u32,
}

/// Cloneable handle; clones share the same script and recordings
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Modem that echoes requests
    pub fn new() -> Self {
        let transport = Self::default();
        transport.lock().echo = true;
        transport
    }

    /// Modem with echo turned off (ATE0)
    pub fn without_echo() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    /// Queue a reply for `request`; the last queued reply repeats
    pub fn reply(&self, request: &str, lines: &[&str]) -> &Self {
        self.lock()
            .replies
            .entry(request.to_string())
            .or_default()
            .push_back(lines.iter().map(|line| line.to_string()).collect());
        self
    }

    /// Lines the modem sends without being asked
    pub fn unsolicited(&self, lines: &[&str]) {
        let mut script = self.lock();
        for line in lines {
            script.inbox.push_back(Bytes::from(format!("{}\r\n", line)));
        }
    }

    /// Everything written, verbatim
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    /// Written requests with their line terminator removed
    pub fn requests(&self) -> Vec<String> {
        self.writes()
            .iter()
            .map(|w| w.strip_suffix("\r\n").unwrap_or(w).to_string())
            .collect()
    }

    /// How many times `request` was written
    pub fn count(&self, request: &str) -> usize {
        self.requests().iter().filter(|r| *r == request).count()
    }

    /// Reads that returned no line
    pub fn idle_reads(&self) -> u32 {
        self.lock().idle_reads
    }
}

#[async_trait]
impl ModemTransport for ScriptedTransport {
    async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let written = String::from_utf8_lossy(bytes).into_owned();
        let mut script = self.lock();
        script.writes.push(written.clone());

        let request = match written.strip_suffix("\r\n") {
            Some(request) => {
                if script.echo && !request.is_empty() {
                    script.inbox.push_back(Bytes::from(format!("{}\r\r\n", request)));
                }
                request
            }
            None => written.as_str(),
        };

        let reply = match script.replies.get_mut(request) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        for line in reply.unwrap_or_default() {
            script.inbox.push_back(Bytes::from(format!("{}\r\n", line)));
        }

        Ok(())
    }

    async fn read_line(&mut self, _wait: Duration) -> io::Result<Option<Bytes>> {
        let mut script = self.lock();
        match script.inbox.pop_front() {
            Some(line) => Ok(Some(line)),
            None => {
                script.idle_reads += 1;
                Ok(None)
            }
        }
    }

    async fn drain(&mut self) -> io::Result<usize> {
        let mut script = self.lock();
        let dropped = script.inbox.iter().map(|line| line.len()).sum();
        script.inbox.clear();
        Ok(dropped)
    }
}

/// Reset line that records every level change
#[derive(Clone, Default)]
pub struct RecordingResetLine {
    levels: Arc<Mutex<Vec<Level>>>,
}

impl RecordingResetLine {
    pub fn levels(&self) -> Vec<Level> {
        self.levels.lock().unwrap().clone()
    }
}

impl ResetLine for RecordingResetLine {
    fn set_level(&mut self, level: Level) -> io::Result<()> {
        self.levels.lock().unwrap().push(level);
        Ok(())
    }
}
