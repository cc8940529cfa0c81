//! sway IPC client for `RUN_COMMAND` requests.
//!
//! Frames are `"i3-ipc"`, a native-endian `u32` payload length, a
//! native-endian `u32` message type, then the payload.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
};

use super::{Actuator, transform_command};
use crate::{config::OutputTarget, orientation::Transform};

const MAGIC: &[u8; 6] = b"i3-ipc";
const HEADER_LEN: usize = MAGIC.len() + 8;
/// Upper bound on a reply payload; command replies are a few bytes.
const MAX_PAYLOAD: usize = 1 << 20;

pub const RUN_COMMAND: u32 = 0;

/// Outcome of one command in a `RUN_COMMAND` reply.
#[derive(Debug, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Rotates outputs by talking to sway's IPC socket.
#[derive(Debug, Clone)]
pub struct SwayIpc {
    socket: PathBuf,
}

impl SwayIpc {
    pub fn new(socket: PathBuf) -> Self {
        Self { socket }
    }

    /// Sends `command` and returns the per-command outcomes.
    pub async fn run_command(&self, command: &str) -> Result<Vec<CommandOutcome>> {
        let mut stream = UnixStream::connect(&self.socket)
            .await
            .with_context(|| format!("Failed to connect to {}", self.socket.display()))?;

        stream
            .write_all(&encode_frame(RUN_COMMAND, command.as_bytes())?)
            .await
            .context("Failed to send IPC request")?;

        let (kind, payload) = read_frame(&mut stream).await?;
        if kind != RUN_COMMAND {
            bail!("Unexpected IPC reply type {kind}");
        }

        serde_json::from_slice(&payload).context("Failed to parse IPC reply")
    }
}

#[async_trait]
impl Actuator for SwayIpc {
    async fn set_transform(&self, output: &OutputTarget, transform: Transform) -> Result<()> {
        let command = transform_command(output, transform);
        debug!("IPC: {command}");

        let outcomes = self.run_command(&command).await?;
        match outcomes.into_iter().find(|outcome| !outcome.success) {
            Some(failed) => Err(anyhow!(
                "sway rejected '{command}': {}",
                failed.error.as_deref().unwrap_or("unknown error")
            )),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "sway-ipc"
    }
}

/// Builds one request frame.
pub fn encode_frame(kind: u32, payload: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(payload.len()).context("IPC payload too large")?;
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(MAGIC);
    frame.extend_from_slice(&len.to_ne_bytes());
    frame.extend_from_slice(&kind.to_ne_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Splits a frame header into `(payload length, message type)`.
pub fn decode_header(header: &[u8; HEADER_LEN]) -> Result<(usize, u32)> {
    let (magic, rest) = header.split_at(MAGIC.len());
    if magic != MAGIC {
        bail!("Bad IPC magic");
    }
    let (len, kind) = rest.split_at(4);
    let len = u32::from_ne_bytes(len.try_into()?);
    let kind = u32::from_ne_bytes(kind.try_into()?);
    Ok((usize::try_from(len)?, kind))
}

async fn read_frame(stream: &mut UnixStream) -> Result<(u32, Vec<u8>)> {
    let mut header = [0u8; HEADER_LEN];
    stream
        .read_exact(&mut header)
        .await
        .context("Failed to read IPC reply header")?;

    let (len, kind) = decode_header(&header)?;
    if len > MAX_PAYLOAD {
        bail!("IPC reply of {len} bytes exceeds limit");
    }

    let mut payload = vec![0u8; len];
    stream
        .read_exact(&mut payload)
        .await
        .context("Failed to read IPC reply payload")?;
    Ok((kind, payload))
}
