use std::{process::Stdio, time::Duration};

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use tokio::{process::Command, time::timeout};

use super::Actuator;
use crate::{config::OutputTarget, orientation::Transform};

/// How long a single `swaymsg` run may take before it is killed.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs `swaymsg` directly, one argument per word, without a shell.
#[derive(Debug, Clone)]
pub struct Swaymsg {
    program: String,
    timeout: Duration,
}

impl Swaymsg {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, output: &OutputTarget, transform: Transform) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("output")
            .arg(output.quoted())
            .arg("transform")
            .arg(transform.degrees().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Actuator for Swaymsg {
    async fn set_transform(&self, output: &OutputTarget, transform: Transform) -> Result<()> {
        // Dropping the child on timeout kills it.
        let status = timeout(self.timeout, self.command(output, transform).status())
            .await
            .map_err(|_| anyhow!("{} timed out after {:?}", self.program, self.timeout))?
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !status.success() {
            bail!("{} exited with {status}", self.program);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "swaymsg"
    }
}
