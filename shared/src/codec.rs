//! Line framing for AT command responses
//!
//! The modem answers a request with a stream of lines:
//! ```text
//! AT+CSQ\r\r\n        <- echo of the request
//! +CSQ: 15,99\r\n     <- body
//! \r\n                <- blank line, arms the pre-end flag
//! OK\r\n              <- terminator
//! ```
//!
//! [`LineFramer`] classifies one line at a time and accumulates the body.
//! [`finish_output`] then removes the echo and protocol noise.

use crate::commands::CommandSpec;

const ERROR_LINE: &str = "ERROR";

/// Classification of a single response line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramedLine {
    /// Part of the response body
    Body,
    /// End of the response
    Terminator,
    /// The modem reported an error
    ModemError,
}

/// Incremental classifier for the lines of one command response
#[derive(Debug)]
pub struct LineFramer {
    terminator: Option<&'static str>,
    discard_prefix: Option<&'static str>,
    pre_end: bool,
    body: String,
}

impl LineFramer {
    /// Create a framer for a response ending with `terminator`
    pub fn new(terminator: Option<&'static str>) -> Self {
        Self {
            terminator,
            discard_prefix: None,
            pre_end: true,
            body: String::new(),
        }
    }

    /// Create a framer configured from a command spec
    pub fn for_spec(spec: &CommandSpec) -> Self {
        Self::new(spec.terminator).discarding(spec.discard_prefix)
    }

    /// Drop body lines starting with `prefix` instead of accumulating them
    pub fn discarding(mut self, prefix: Option<&'static str>) -> Self {
        self.discard_prefix = prefix;
        self
    }

    /// Classify one raw line (including its line terminator)
    pub fn feed(&mut self, raw: &str) -> FramedLine {
        let line = strip_line_end(raw);

        if let Some(terminator) = self.terminator {
            if line == terminator {
                return FramedLine::Terminator;
            }
            // Status glued to the terminator, e.g. "+HTTPACTION: 0,200,5"
            if self.pre_end && line.starts_with(terminator) {
                self.body.push_str(raw);
                return FramedLine::Terminator;
            }
        }

        if line == ERROR_LINE {
            return FramedLine::ModemError;
        }

        self.pre_end = line.is_empty();

        let discard = self
            .discard_prefix
            .is_some_and(|prefix| line.starts_with(prefix));
        if !discard {
            self.body.push_str(raw);
        }

        FramedLine::Body
    }

    /// Whether the last classified line was blank
    pub fn pre_end(&self) -> bool {
        self.pre_end
    }

    /// Raw body accumulated so far
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Consume the framer, returning the raw body
    pub fn into_body(self) -> String {
        self.body
    }
}

/// Strip one trailing LF and one CR before it
fn strip_line_end(raw: &str) -> &str {
    let line = raw.strip_suffix('\n').unwrap_or(raw);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Turn a raw response body into the command output
///
/// Removes the echoed request, the trailing line terminator and, when
/// `clean` is set, carriage returns and blank lines.
pub fn finish_output(raw: &str, request: &str, clean: bool) -> String {
    let mut output = strip_echo(raw, request);

    if output.ends_with("\r\n") {
        output.truncate(output.len() - 2);
    }

    if clean {
        output = clean_output(&output);
    }

    output
}

/// Remove the modem's echo of `request` from the output
pub fn strip_echo(raw: &str, request: &str) -> String {
    if request.is_empty() {
        return raw.to_string();
    }

    for echo in [format!("{}\r\r\n", request), format!("{}\r\n", request)] {
        if raw.contains(&echo) {
            return raw.replacen(&echo, "", 1);
        }
    }

    raw.to_string()
}

/// Compact output for simple parsing
pub fn clean_output(output: &str) -> String {
    let mut cleaned = output.replace('\r', "");

    while cleaned.contains("\n\n") {
        cleaned = cleaned.replace("\n\n", "\n");
    }

    if let Some(rest) = cleaned.strip_prefix('\n') {
        cleaned = rest.to_string();
    }
    if cleaned.ends_with('\n') {
        cleaned.pop();
    }

    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Command, CommandTable};

    fn frame(framer: &mut LineFramer, lines: &[&str]) -> Vec<FramedLine> {
        lines.iter().map(|line| framer.feed(line)).collect()
    }

    #[test]
    fn test_exact_terminator_excluded() {
        let mut framer = LineFramer::new(Some("OK"));
        let classes = frame(&mut framer, &["AT+CSQ\r\r\n", "+CSQ: 15,99\r\n", "\r\n", "OK\r\n"]);

        assert_eq!(
            classes,
            vec![
                FramedLine::Body,
                FramedLine::Body,
                FramedLine::Body,
                FramedLine::Terminator
            ]
        );
        assert_eq!(framer.body(), "AT+CSQ\r\r\n+CSQ: 15,99\r\n\r\n");
    }

    #[test]
    fn test_prefix_terminator_after_blank_line_is_kept() {
        let mut framer = LineFramer::new(Some("+HTTPACTION"));
        let classes = frame(
            &mut framer,
            &["AT+HTTPACTION=0\r\r\n", "OK\r\n", "\r\n", "+HTTPACTION: 0,200,12\r\n"],
        );

        assert_eq!(classes.last(), Some(&FramedLine::Terminator));
        assert!(framer.body().ends_with("+HTTPACTION: 0,200,12\r\n"));
    }

    #[test]
    fn test_prefix_match_without_pre_end_is_body() {
        let mut framer = LineFramer::new(Some("OK"));
        assert_eq!(framer.feed("first\r\n"), FramedLine::Body);
        assert!(!framer.pre_end());
        assert_eq!(framer.feed("OKAY then\r\n"), FramedLine::Body);
        assert_eq!(framer.feed("OK\r\n"), FramedLine::Terminator);
    }

    #[test]
    fn test_pre_end_tracks_blank_lines() {
        let mut framer = LineFramer::new(Some("OK"));
        assert!(framer.pre_end());
        framer.feed("data\r\n");
        assert!(!framer.pre_end());
        framer.feed("\r\n");
        assert!(framer.pre_end());
    }

    #[test]
    fn test_error_line() {
        let mut framer = LineFramer::new(Some("OK"));
        assert_eq!(framer.feed("AT+SAPBR=0,1\r\r\n"), FramedLine::Body);
        assert_eq!(framer.feed("ERROR\r\n"), FramedLine::ModemError);
    }

    #[test]
    fn test_no_terminator_never_ends() {
        let mut framer = LineFramer::new(None);
        assert_eq!(framer.feed("+CREG: 0,1\r\n"), FramedLine::Body);
        assert_eq!(framer.feed("OK\r\n"), FramedLine::Body);
        assert_eq!(framer.feed("ERROR\r\n"), FramedLine::ModemError);
    }

    #[test]
    fn test_http_read_length_line_discarded() {
        let table = CommandTable::new();
        let mut framer = LineFramer::for_spec(table.spec(Command::ReadData).unwrap());

        frame(
            &mut framer,
            &["AT+HTTPREAD\r\r\n", "+HTTPREAD: 11\r\n", "hello\r\n", "\r\n", "world\r\n", "OK\r\n"],
        );
        assert_eq!(framer.into_body(), "AT+HTTPREAD\r\r\nhello\r\n\r\nworld\r\n");
    }

    #[test]
    fn test_finish_output_removes_echo_and_noise() {
        let raw = "AT+CSQ\r\r\n+CSQ: 15,99\r\n\r\n";
        assert_eq!(finish_output(raw, "AT+CSQ", true), "+CSQ: 15,99");
    }

    #[test]
    fn test_finish_output_without_echo() {
        assert_eq!(finish_output("+CSQ: 15,99\r\n\r\n", "AT+CSQ", true), "+CSQ: 15,99");
    }

    #[test]
    fn test_finish_output_raw_keeps_blank_lines() {
        let raw = "AT+HTTPREAD\r\r\nhello\r\n\r\nworld\r\n";
        assert_eq!(finish_output(raw, "AT+HTTPREAD", false), "hello\r\n\r\nworld");
    }

    #[test]
    fn test_clean_output_collapses_blank_lines() {
        assert_eq!(clean_output("\nOK\n\n\n+HTTPACTION: 0,200,5\n"), "OK\n+HTTPACTION: 0,200,5");
    }
}
