//! System bus session holding the accelerometer claim.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, error, info, warn};
use zbus::{
    Connection, MatchRule, MessageStream, connection,
    fdo::{self, DBusProxy, PropertiesProxy},
    message::Type as MessageType,
    names::InterfaceName,
    proxy::CacheProperties,
};
use zvariant::OwnedValue;

use crate::{
    decoder::decode_property_reply,
    notification::{
        BUS_DAEMON_INTERFACE, NAME_OWNER_CHANGED, Notification, PROPERTIES_CHANGED,
        PROPERTIES_INTERFACE,
    },
    orientation::Orientation,
    sensor_proxy::{
        ORIENTATION_PROPERTY, SENSOR_INTERFACE, SENSOR_PATH, SENSOR_SERVICE, SensorServiceProxy,
    },
};

const BUS_DAEMON_SERVICE: &str = "org.freedesktop.DBus";
const BUS_DAEMON_PATH: &str = "/org/freedesktop/DBus";

/// Bus operations the dispatch loop relies on.
///
/// [`BusSession`] is the real implementation; tests drive the loop with
/// scripted doubles.
#[async_trait]
pub trait SensorBus: Send + Sync {
    /// Claims the accelerometer from the sensor service.
    async fn claim(&self) -> Result<()>;

    /// Registers the match rules and starts queueing matching messages.
    async fn subscribe(&mut self) -> Result<()>;

    /// Reads the current orientation with a `Properties.Get` call.
    ///
    /// Failures are logged and reported as [`Orientation::Undefined`].
    async fn read_orientation_now(&self) -> Orientation;

    /// Waits for the next inbound message.
    ///
    /// Returns `None` once the connection can deliver nothing more. Must be
    /// cancel-safe: the loop drops this future when its wait bound expires.
    async fn next_notification(&mut self) -> Option<Notification>;

    /// Releases the claim and closes the connection.
    async fn disconnect(self) -> Result<()>
    where
        Self: Sized;
}

/// Live connection to the system bus with an accelerometer claim.
pub struct BusSession {
    connection: Connection,
    sensor: SensorServiceProxy<'static>,
    properties: PropertiesProxy<'static>,
    claim_timeout: Duration,
    messages: Option<MessageStream>,
}

impl BusSession {
    /// Opens the system bus (or the bus at `address`) and claims the
    /// accelerometer.
    ///
    /// Either step failing is fatal; the connection is closed before the
    /// error is returned.
    pub async fn connect(address: Option<&str>, claim_timeout: Duration) -> Result<Self> {
        let connection = open_bus(address)
            .await
            .context("Cannot open system bus connection")?;

        let session = match Self::with_connection(connection.clone(), claim_timeout).await {
            Ok(session) => session,
            Err(e) => {
                close_quietly(connection).await;
                return Err(e);
            }
        };

        if let Err(e) = session.claim().await {
            close_quietly(connection).await;
            return Err(e);
        }

        match tokio::time::timeout(claim_timeout, session.sensor.has_accelerometer()).await {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => warn!("Sensor service reports no accelerometer"),
            Ok(Err(e)) => debug!("HasAccelerometer unavailable: {e}"),
            Err(_) => debug!("HasAccelerometer unanswered after {claim_timeout:?}"),
        }

        info!("Accelerometer claimed");
        Ok(session)
    }

    async fn with_connection(connection: Connection, claim_timeout: Duration) -> Result<Self> {
        let sensor = SensorServiceProxy::builder(&connection)
            .cache_properties(CacheProperties::No)
            .build()
            .await
            .context("Failed to create sensor proxy")?;

        let properties = PropertiesProxy::builder(&connection)
            .destination(SENSOR_SERVICE)?
            .path(SENSOR_PATH)?
            .cache_properties(CacheProperties::No)
            .build()
            .await
            .context("Failed to create properties proxy")?;

        Ok(Self {
            connection,
            sensor,
            properties,
            claim_timeout,
            messages: None,
        })
    }
}

#[async_trait]
impl SensorBus for BusSession {
    async fn claim(&self) -> Result<()> {
        tokio::time::timeout(self.claim_timeout, self.sensor.claim_accelerometer())
            .await
            .map_err(|_| anyhow!("ClaimAccelerometer timed out after {:?}", self.claim_timeout))?
            .context("ClaimAccelerometer failed")
    }

    async fn subscribe(&mut self) -> Result<()> {
        // Stream first so nothing matched between the two calls is lost.
        let messages = MessageStream::from(&self.connection);

        let daemon = DBusProxy::new(&self.connection)
            .await
            .context("Failed to create bus daemon proxy")?;
        daemon
            .add_match_rule(properties_changed_rule()?)
            .await
            .context("Failed to subscribe to PropertiesChanged")?;
        daemon
            .add_match_rule(owner_changed_rule()?)
            .await
            .context("Failed to subscribe to NameOwnerChanged")?;

        self.messages = Some(messages);
        info!("Subscribed to sensor notifications");
        Ok(())
    }

    async fn read_orientation_now(&self) -> Orientation {
        let interface = InterfaceName::from_static_str_unchecked(SENSOR_INTERFACE);
        let reply = self.properties.get(interface, ORIENTATION_PROPERTY);
        read_bounded(self.claim_timeout, reply).await
    }

    async fn next_notification(&mut self) -> Option<Notification> {
        let messages = self.messages.as_mut()?;
        match messages.next().await? {
            Ok(message) => Some(Notification::classify(&message)),
            Err(e) => {
                warn!("Dropping unreadable bus message: {e}");
                Some(Notification::Other)
            }
        }
    }

    async fn disconnect(self) -> Result<()> {
        drop(self.messages);
        if let Err(e) = self.sensor.release_accelerometer().await {
            debug!("ReleaseAccelerometer failed: {e}");
        }
        self.connection
            .close()
            .await
            .context("Failed to close system bus connection")?;
        info!("Bus session closed");
        Ok(())
    }
}

/// Sensor property changes.
pub fn properties_changed_rule() -> Result<MatchRule<'static>> {
    Ok(MatchRule::builder()
        .msg_type(MessageType::Signal)
        .sender(SENSOR_SERVICE)?
        .path(SENSOR_PATH)?
        .interface(PROPERTIES_INTERFACE)?
        .member(PROPERTIES_CHANGED)?
        .arg(0, SENSOR_INTERFACE)?
        .build())
}

/// Ownership changes of the sensor service's well-known name.
pub fn owner_changed_rule() -> Result<MatchRule<'static>> {
    Ok(MatchRule::builder()
        .msg_type(MessageType::Signal)
        .sender(BUS_DAEMON_SERVICE)?
        .path(BUS_DAEMON_PATH)?
        .interface(BUS_DAEMON_INTERFACE)?
        .member(NAME_OWNER_CHANGED)?
        .arg(0, SENSOR_SERVICE)?
        .build())
}

/// Waits at most `limit` for an orientation property reply.
async fn read_bounded<F>(limit: Duration, reply: F) -> Orientation
where
    F: Future<Output = fdo::Result<OwnedValue>>,
{
    match tokio::time::timeout(limit, reply).await {
        Ok(Ok(value)) => decode_property_reply(&value),
        Ok(Err(e)) => {
            error!("Cannot read {ORIENTATION_PROPERTY}: {e}");
            Orientation::Undefined
        }
        Err(_) => {
            error!("Reading {ORIENTATION_PROPERTY} timed out after {limit:?}");
            Orientation::Undefined
        }
    }
}

async fn open_bus(address: Option<&str>) -> zbus::Result<Connection> {
    match address {
        Some(address) => connection::Builder::address(address)?.build().await,
        None => Connection::system().await,
    }
}

async fn close_quietly(connection: Connection) {
    if let Err(e) = connection.close().await {
        debug!("Closing system bus connection failed: {e}");
    }
}
