use std::path::PathBuf;

use clap::Parser;

use crate::config::{ActuatorKind, RestartPolicy, defaults};

/// orientd: rotate a sway output to follow the accelerometer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output to rotate (for example eDP-1)
    #[arg(env = "ORIENTD_OUTPUT", default_value = defaults::OUTPUT)]
    pub output: String,

    /// What to do when the sensor service restarts or disappears
    #[arg(long, value_enum, default_value_t = RestartPolicy::Exit)]
    pub on_sensor_restart: RestartPolicy,

    /// How transform commands reach the compositor
    #[arg(long, value_enum, default_value_t = ActuatorKind::Auto)]
    pub actuator: ActuatorKind,

    /// sway IPC socket
    #[arg(long, env = "SWAYSOCK")]
    pub sway_socket: Option<PathBuf>,

    /// swaymsg executable used by the command actuator
    #[arg(long, default_value = defaults::SWAYMSG)]
    pub swaymsg: String,

    /// Upper bound on a single wait for bus input, in milliseconds
    #[arg(long, default_value_t = defaults::POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Timeout for each sensor service call, in milliseconds
    #[arg(long, default_value_t = defaults::CLAIM_TIMEOUT_MS)]
    pub claim_timeout_ms: u64,

    /// D-Bus address to connect to instead of the system bus
    #[arg(long)]
    pub bus_address: Option<String>,

    /// Detach from the terminal
    #[arg(short = 'd', long = "daemonize")]
    pub daemonize: bool,

    /// Log to syslog instead of stderr
    #[arg(long)]
    pub syslog: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
