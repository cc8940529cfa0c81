//! Output rotation through the compositor.

pub mod command;
pub mod ipc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use log::info;

use crate::{
    config::{ActuatorKind, Config, OutputTarget},
    orientation::Transform,
};

pub use command::Swaymsg;
pub use ipc::SwayIpc;

/// Compositor control surface able to rotate an output.
///
/// Implementations report failures to the caller; the dispatch loop logs
/// them and carries on.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Sets `output`'s transform.
    async fn set_transform(&self, output: &OutputTarget, transform: Transform) -> Result<()>;

    /// Short name for logging.
    fn name(&self) -> &'static str;
}

/// sway command that applies `transform` to `output`.
pub fn transform_command(output: &OutputTarget, transform: Transform) -> String {
    format!("output {} transform {}", output.quoted(), transform.degrees())
}

/// Picks the actuator the configuration asks for.
pub fn from_config(config: &Config) -> Result<Box<dyn Actuator>> {
    let actuator: Box<dyn Actuator> = match (config.actuator, &config.sway_socket) {
        (ActuatorKind::Auto | ActuatorKind::Ipc, Some(socket)) => {
            Box::new(SwayIpc::new(socket.clone()))
        }
        (ActuatorKind::Ipc, None) => bail!("IPC actuator requires a sway socket path"),
        (ActuatorKind::Auto | ActuatorKind::Command, _) => {
            Box::new(Swaymsg::new(config.swaymsg.clone()))
        }
    };
    info!("Using {} actuator", actuator.name());
    Ok(actuator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn command_quotes_output_name() {
        let output = OutputTarget::new("eDP-1").unwrap();
        assert_eq!(
            transform_command(&output, Transform::Rotate90),
            "output \"eDP-1\" transform 90"
        );
    }

    #[test]
    fn auto_prefers_ipc_when_socket_known() {
        let config = Config {
            sway_socket: Some(PathBuf::from("/run/user/1000/sway-ipc.sock")),
            ..Config::default()
        };
        assert_eq!(from_config(&config).unwrap().name(), "sway-ipc");
    }

    #[test]
    fn auto_falls_back_to_swaymsg() {
        let config = Config::default();
        assert_eq!(from_config(&config).unwrap().name(), "swaymsg");
    }

    #[test]
    fn command_kind_ignores_socket() {
        let config = Config {
            actuator: ActuatorKind::Command,
            sway_socket: Some(PathBuf::from("/tmp/sway.sock")),
            ..Config::default()
        };
        assert_eq!(from_config(&config).unwrap().name(), "swaymsg");
    }

    #[test]
    fn ipc_kind_without_socket_fails() {
        let config = Config {
            actuator: ActuatorKind::Ipc,
            ..Config::default()
        };
        assert!(from_config(&config).is_err());
    }
}
