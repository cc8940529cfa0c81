//! Application entry point and builder pattern implementation.

use anyhow::{Context, Result};
use log::info;

use crate::{
    actuator,
    config::Config,
    dispatch::{Dispatcher, Exit},
    session::BusSession,
    shutdown::StopFlag,
};

/// Main application structure that wires the bus session, the actuator and
/// the dispatch loop together.
///
/// # Example
///
/// ```no_run
/// use orientd::{application::Application, config::Config, shutdown::StopFlag};
///
/// # async fn example() -> anyhow::Result<()> {
/// let exit = Application::builder()
///     .with_config(Config::default())
///     .with_stop_flag(StopFlag::install()?)
///     .build()?
///     .run()
///     .await?;
/// println!("{exit:?}");
/// # Ok(())
/// # }
/// ```
pub struct Application {
    config: Config,
    stop: StopFlag,
}

impl Application {
    /// Creates a new ApplicationBuilder for constructing Application instances.
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Connects, claims the sensor and runs the dispatch loop to completion.
    ///
    /// An `Err` means a startup failure: no bus, no claim, or no
    /// subscription.
    pub async fn run(self) -> Result<Exit> {
        let actuator = actuator::from_config(&self.config)?;

        let session = BusSession::connect(
            self.config.bus_address.as_deref(),
            self.config.claim_timeout,
        )
        .await
        .context("Cannot open dbus connection")?;

        info!("Rotating output {}", self.config.output);
        Dispatcher::new(session, actuator, &self.config, self.stop)
            .run()
            .await
    }
}

/// Builder pattern for creating Application instances.
pub struct ApplicationBuilder {
    config: Option<Config>,
    stop: Option<StopFlag>,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self {
            config: None,
            stop: None,
        }
    }

    /// Sets the configuration for the application.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the flag the dispatch loop polls for shutdown.
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Builds the Application instance.
    ///
    /// Without an explicit stop flag the application only ends on sensor
    /// loss or bus closure.
    pub fn build(self) -> Result<Application> {
        let config = self
            .config
            .ok_or_else(|| anyhow::anyhow!("Configuration is required"))?;
        config.validate()?;

        Ok(Application {
            config,
            stop: self.stop.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActuatorKind;

    #[test]
    fn build_requires_config() {
        let err = Application::builder().build().err().unwrap();
        assert!(err.to_string().contains("Configuration is required"));
    }

    #[test]
    fn build_rejects_invalid_config() {
        let config = Config {
            actuator: ActuatorKind::Ipc,
            sway_socket: None,
            ..Config::default()
        };
        assert!(Application::builder().with_config(config).build().is_err());
    }

    #[tokio::test]
    async fn unreachable_bus_is_a_startup_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            bus_address: Some(format!(
                "unix:path={}",
                dir.path().join("absent.sock").display()
            )),
            ..Config::default()
        };

        let err = Application::builder()
            .with_config(config)
            .with_stop_flag(StopFlag::new())
            .build()
            .unwrap()
            .run()
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Cannot open dbus connection"), "{err:#}");
        assert!(format!("{err:#}").contains("Cannot open system bus connection"));
    }

    #[test]
    fn build_accepts_default_config() {
        let app = Application::builder()
            .with_config(Config::default())
            .with_stop_flag(StopFlag::new())
            .build()
            .unwrap();
        assert_eq!(app.config.output.as_str(), "eDP-1");
        assert!(!app.stop.is_raised());
    }
}
