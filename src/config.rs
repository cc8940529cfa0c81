//! Runtime configuration for the orientd daemon.
//!
//! There is no configuration file: everything comes from the command line,
//! with environment fallbacks handled by clap. [`Config::from_cli`] turns the
//! parsed arguments into validated settings.

use std::{fmt, path::PathBuf, time::Duration};

use anyhow::{Result, bail};
use clap::ValueEnum;

use crate::cli::Cli;

/// Reaction to the sensor service changing owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RestartPolicy {
    /// Leave the loop and let a supervisor restart the daemon.
    #[default]
    Exit,
    /// Claim the accelerometer again from the new owner and keep going.
    Reclaim,
}

/// Control surface used to rotate the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ActuatorKind {
    /// IPC socket when one is known, `swaymsg` otherwise.
    #[default]
    Auto,
    /// sway IPC socket only.
    Ipc,
    /// `swaymsg` executable only.
    Command,
}

/// Compositor output the daemon rotates.
///
/// Names are restricted so that the quoted form in a sway command can neither
/// terminate the quote nor start a second command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget(String);

impl OutputTarget {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            bail!("Output name cannot be empty");
        }
        if name.starts_with('-') {
            bail!("Output name '{name}' cannot start with '-'");
        }
        if let Some(c) = name
            .chars()
            .find(|c| c.is_control() || matches!(c, '"' | '\\' | ';' | ','))
        {
            bail!("Output name {name:?} contains forbidden character {c:?}");
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for embedding in a sway command.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated daemon settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub output: OutputTarget,
    pub restart_policy: RestartPolicy,
    pub actuator: ActuatorKind,
    pub sway_socket: Option<PathBuf>,
    pub swaymsg: String,
    /// Upper bound on one wait for bus input; also bounds stop latency.
    pub poll_interval: Duration,
    /// Bound on each call to the sensor service.
    pub claim_timeout: Duration,
    /// D-Bus address to use instead of the system bus.
    pub bus_address: Option<String>,
}

pub mod defaults {
    pub const OUTPUT: &str = "eDP-1";
    pub const SWAYMSG: &str = "swaymsg";
    pub const POLL_INTERVAL_MS: u64 = 100;
    pub const CLAIM_TIMEOUT_MS: u64 = 200;
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputTarget(defaults::OUTPUT.to_string()),
            restart_policy: RestartPolicy::default(),
            actuator: ActuatorKind::default(),
            sway_socket: None,
            swaymsg: defaults::SWAYMSG.to_string(),
            poll_interval: Duration::from_millis(defaults::POLL_INTERVAL_MS),
            claim_timeout: Duration::from_millis(defaults::CLAIM_TIMEOUT_MS),
            bus_address: None,
        }
    }
}

impl Config {
    /// Builds and validates the configuration from parsed arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Self {
            output: OutputTarget::new(cli.output.clone())?,
            restart_policy: cli.on_sensor_restart,
            actuator: cli.actuator,
            sway_socket: cli.sway_socket.clone().filter(|p| !p.as_os_str().is_empty()),
            swaymsg: cli.swaymsg.clone(),
            poll_interval: Duration::from_millis(cli.poll_interval_ms),
            claim_timeout: Duration::from_millis(cli.claim_timeout_ms),
            bus_address: cli.bus_address.clone().filter(|a| !a.is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            bail!("Poll interval must be greater than zero");
        }
        if self.claim_timeout.is_zero() {
            bail!("Claim timeout must be greater than zero");
        }
        if self.actuator == ActuatorKind::Ipc && self.sway_socket.is_none() {
            bail!("IPC actuator selected but no sway socket is known (set SWAYSOCK or --sway-socket)");
        }
        if self.swaymsg.is_empty() {
            bail!("swaymsg program cannot be empty");
        }
        Ok(())
    }
}
