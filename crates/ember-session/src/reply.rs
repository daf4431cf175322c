//! Reply assembly for the line protocol
//!
//! Every command produces exactly one terminal `<OK` or `<ERROR`, possibly
//! preceded by `<field=value` data lines, `! message` diagnostics, and
//! `? message` progress notices.

use std::fmt::Display;

/// Terminal status of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command succeeded
    Ok,
    /// Command rejected; session state unchanged
    Error,
}

/// What the transport must do after delivering the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    /// Keep servicing commands
    None,
    /// Restart the process (`RESET` acknowledged)
    Restart,
    /// Re-arm idle readiness announcements (`PING`)
    RearmReady,
}

/// The full response to one command.
#[derive(Debug)]
pub struct Reply {
    lines: Vec<String>,
    status: Status,
    action: PostAction,
}

impl Reply {
    /// A bare successful reply
    pub fn ok() -> Self {
        Self {
            lines: Vec::new(),
            status: Status::Ok,
            action: PostAction::None,
        }
    }

    /// A bare rejection
    pub fn error() -> Self {
        Self {
            lines: Vec::new(),
            status: Status::Error,
            action: PostAction::None,
        }
    }

    /// Attach a post-delivery action
    pub fn with_action(mut self, action: PostAction) -> Self {
        self.action = action;
        self
    }

    /// Append a `<key=value` data line
    pub fn kv(&mut self, key: &str, value: impl Display) {
        self.lines.push(format!("<{}={}", key, value));
    }

    /// Append a byte buffer as `<key=hex  (N bytes)`
    pub fn buffer(&mut self, key: &str, data: &[u8]) {
        self.lines
            .push(format!("<{}={}  ({} bytes)", key, hex::encode(data), data.len()));
    }

    /// Append a `! message` diagnostic line
    pub fn info(&mut self, msg: impl Display) {
        self.lines.push(format!("! {}", msg));
    }

    /// Append a `? message` progress notice
    pub fn progress(&mut self, msg: impl Display) {
        self.lines.push(format!("? {}", msg));
    }

    /// Append a preformatted line
    pub fn raw(&mut self, line: String) {
        self.lines.push(line);
    }

    /// Lines preceding the terminal status
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Terminal status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Post-delivery action for the transport
    pub fn action(&self) -> PostAction {
        self.action
    }

    /// All output lines including the terminal status line.
    pub fn render(&self) -> Vec<String> {
        let mut out = self.lines.clone();
        out.push(
            match self.status {
                Status::Ok => "<OK",
                Status::Error => "<ERROR",
            }
            .to_string(),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_terminates_with_status() {
        let mut reply = Reply::ok();
        reply.kv("version", 1);
        assert_eq!(reply.render(), vec!["<version=1", "<OK"]);

        let mut reply = Reply::error();
        reply.info("unknown command");
        assert_eq!(reply.render(), vec!["! unknown command", "<ERROR"]);
    }

    #[test]
    fn test_buffer_line_format() {
        let mut reply = Reply::ok();
        reply.buffer("attest", &[0xab, 0xcd]);
        assert_eq!(reply.lines()[0], "<attest=abcd  (2 bytes)");
    }
}
