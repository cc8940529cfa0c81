//! Dispatch loop driving the actuator from sensor notifications.
//!
//! The loop owns the bus session for its whole life and disconnects it
//! exactly once, whichever way the loop ends. Every wait for bus input is
//! bounded by the poll interval so a raised [`StopFlag`] is observed within
//! one interval.

use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::time::timeout;

use crate::{
    actuator::Actuator,
    config::{Config, OutputTarget, RestartPolicy},
    decoder::decode_signal,
    notification::{Notification, OwnerChange},
    orientation::Orientation,
    session::SensorBus,
    shutdown::StopFlag,
};

/// Why the dispatch loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// A stop signal was received.
    Stopped,
    /// The sensor service changed owner and the policy is to exit.
    SensorLost,
    /// The sensor service came back but claiming it again failed.
    ReclaimFailed,
    /// The bus connection stopped delivering messages.
    BusClosed,
}

impl Exit {
    /// Whether the process should report success.
    ///
    /// A sensor service restart is an expected event, so leaving on it is a
    /// normal shutdown.
    pub const fn is_graceful(self) -> bool {
        matches!(self, Self::Stopped | Self::SensorLost)
    }
}

/// Routes orientation notifications from a [`SensorBus`] to an [`Actuator`].
pub struct Dispatcher<B: SensorBus> {
    bus: B,
    actuator: Box<dyn Actuator>,
    output: OutputTarget,
    stop: StopFlag,
    poll_interval: Duration,
    restart_policy: RestartPolicy,
    current: Orientation,
}

impl<B: SensorBus> Dispatcher<B> {
    pub fn new(bus: B, actuator: Box<dyn Actuator>, config: &Config, stop: StopFlag) -> Self {
        Self {
            bus,
            actuator,
            output: config.output.clone(),
            stop,
            poll_interval: config.poll_interval,
            restart_policy: config.restart_policy,
            current: Orientation::Undefined,
        }
    }

    /// Subscribes, applies the current orientation, then dispatches until
    /// stopped. The session is disconnected before returning, including when
    /// the subscription fails.
    pub async fn run(mut self) -> Result<Exit> {
        let result = self.subscribe_and_dispatch().await;

        if let Err(e) = self.bus.disconnect().await {
            warn!("Bus disconnect failed: {e:#}");
        }

        match &result {
            Ok(exit) => info!("Dispatch loop finished: {exit:?}"),
            Err(e) => error!("Dispatch loop failed: {e:#}"),
        }
        result
    }

    async fn subscribe_and_dispatch(&mut self) -> Result<Exit> {
        self.bus
            .subscribe()
            .await
            .context("Failed to subscribe to sensor notifications")?;

        self.sync_now().await;
        info!("Listening for orientation changes on {}", self.output);

        loop {
            if self.stop.is_raised() {
                info!("Stop requested, leaving dispatch loop");
                return Ok(Exit::Stopped);
            }

            let notification = match timeout(self.poll_interval, self.bus.next_notification()).await
            {
                Ok(Some(notification)) => notification,
                Ok(None) => {
                    warn!("Bus message stream ended");
                    return Ok(Exit::BusClosed);
                }
                Err(_elapsed) => continue,
            };

            if let Some(exit) = self.handle_notification(notification).await {
                return Ok(exit);
            }
        }
    }

    /// Handles one message. Returns the exit reason if the loop must end.
    async fn handle_notification(&mut self, notification: Notification) -> Option<Exit> {
        match notification {
            Notification::PropertiesChanged(signal) => {
                let orientation = decode_signal(&signal);
                if orientation == Orientation::Undefined {
                    debug!("Ignoring PropertiesChanged from {}", signal.interface);
                } else {
                    self.actuate(orientation).await;
                }
                None
            }
            Notification::OwnerChanged(change) => self.handle_owner_change(&change).await,
            Notification::Other => None,
        }
    }

    async fn handle_owner_change(&mut self, change: &OwnerChange) -> Option<Exit> {
        match self.restart_policy {
            RestartPolicy::Exit => {
                warn!(
                    "Sensor service owner changed ('{}' -> '{}'), exiting",
                    change.old_owner, change.new_owner
                );
                Some(Exit::SensorLost)
            }
            RestartPolicy::Reclaim if change.is_vanished() => {
                warn!("Sensor service vanished, waiting for it to come back");
                self.current = Orientation::Undefined;
                None
            }
            RestartPolicy::Reclaim => {
                info!("Sensor service now owned by {}, claiming again", change.new_owner);
                match self.bus.claim().await {
                    Ok(()) => {
                        self.sync_now().await;
                        None
                    }
                    Err(e) => {
                        error!("Failed to claim accelerometer again: {e:#}");
                        Some(Exit::ReclaimFailed)
                    }
                }
            }
        }
    }

    /// Reads the orientation directly and applies it.
    async fn sync_now(&mut self) {
        let orientation = self.bus.read_orientation_now().await;
        info!("Current orientation: {orientation}");
        self.actuate(orientation).await;
    }

    async fn actuate(&mut self, orientation: Orientation) {
        let Some(transform) = orientation.transform() else {
            return;
        };

        info!(
            "Orientation changed {} -> {orientation}, rotating {} to {transform}",
            self.current, self.output
        );
        self.current = orientation;

        if let Err(e) = self.actuator.set_transform(&self.output, transform).await {
            warn!("{} actuator failed: {e:#}", self.actuator.name());
        }
    }
}
