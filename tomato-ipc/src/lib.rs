//! Inter-process communication between tomato and tomatoctl
//!
//! We use Unix domain sockets for local IPC. Each connection carries one
//! JSON-encoded [`Command`] line and gets back one JSON-encoded
//! [`Response`] line.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Which interval the timer is counting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Work,
    ShortBreak,
    LongBreak,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Work => "Work",
            Mode::ShortBreak => "Short Break",
            Mode::LongBreak => "Long Break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, Mode::Work)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Commands that tomatoctl can send to tomato
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Start,
    Pause,
    Toggle,
    Reset,
    ResetCount,
    Status,
    Shutdown,
}

/// Responses from tomato back to tomatoctl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Ok,
    Status(TimerStatus),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerStatus {
    pub mode: Mode,
    pub running: bool,
    pub remaining_ms: u64,
    pub duration_ms: u64,
    pub completed_work_count: u32,
}

impl TimerStatus {
    pub fn clock(&self) -> String {
        format_clock(self.remaining_ms)
    }
}

/// `MM:SS` for a remaining time. Minutes are not wrapped at the hour.
pub fn format_clock(remaining_ms: u64) -> String {
    let secs = remaining_ms / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[derive(Error, Debug)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection refused - is tomato running?")]
    ConnectionRefused,

    #[error("Connection closed before a response arrived")]
    NoResponse,
}

pub const SOCKET_PATH: &str = "/tmp/tomato.sock";

/// Encode a message as a single newline-terminated JSON line.
pub fn encode_line<T: Serialize>(msg: &T) -> Result<Vec<u8>, IpcError> {
    let mut buf = serde_json::to_vec(msg)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Send one command to a running instance and wait for its response.
pub async fn request(path: &str, command: &Command) -> Result<Response, IpcError> {
    let stream = UnixStream::connect(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound => {
            IpcError::ConnectionRefused
        }
        _ => IpcError::Io(e),
    })?;
    let (reader, mut writer) = stream.into_split();

    writer.write_all(&encode_line(command)?).await?;

    let mut line = String::new();
    let n = BufReader::new(reader).read_line(&mut line).await?;
    if n == 0 {
        return Err(IpcError::NoResponse);
    }
    Ok(serde_json::from_str(line.trim_end())?)
}
