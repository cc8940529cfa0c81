//! Classification of inbound bus messages.

use log::debug;
use zbus::message::{Message, Type as MessageType};

use crate::{decoder::PropertiesChanged, sensor_proxy::SENSOR_SERVICE};

pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";
pub const PROPERTIES_CHANGED: &str = "PropertiesChanged";
pub const BUS_DAEMON_INTERFACE: &str = "org.freedesktop.DBus";
pub const NAME_OWNER_CHANGED: &str = "NameOwnerChanged";

/// A message the dispatch loop knows how to react to.
#[derive(Debug)]
pub enum Notification {
    /// Property change; carries orientation data if it came from the sensor.
    PropertiesChanged(PropertiesChanged),
    /// The sensor service's well-known name moved to a new owner or vanished.
    OwnerChanged(OwnerChange),
    /// Anything else delivered to the connection.
    Other,
}

/// Body of a `NameOwnerChanged` signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerChange {
    pub name: String,
    pub old_owner: String,
    pub new_owner: String,
}

impl OwnerChange {
    /// The name has no owner anymore.
    pub fn is_vanished(&self) -> bool {
        self.new_owner.is_empty()
    }
}

impl Notification {
    /// Sorts a message into one of the three shapes using its header, then
    /// decodes the body of the two shapes that matter.
    pub fn classify(message: &Message) -> Self {
        let header = message.header();
        if header.message_type() != MessageType::Signal {
            return Self::Other;
        }

        let interface = header.interface().map(|name| name.as_str());
        let member = header.member().map(|name| name.as_str());

        match (interface, member) {
            (Some(PROPERTIES_INTERFACE), Some(PROPERTIES_CHANGED)) => {
                match PropertiesChanged::from_message(message) {
                    Some(changed) => Self::PropertiesChanged(changed),
                    None => {
                        debug!("Ignoring PropertiesChanged with unexpected body signature");
                        Self::Other
                    }
                }
            }
            (Some(BUS_DAEMON_INTERFACE), Some(NAME_OWNER_CHANGED)) => {
                match message.body().deserialize::<(String, String, String)>() {
                    Ok((name, old_owner, new_owner)) if name == SENSOR_SERVICE => {
                        Self::OwnerChanged(OwnerChange {
                            name,
                            old_owner,
                            new_owner,
                        })
                    }
                    Ok(_) => Self::Other,
                    Err(e) => {
                        debug!("Ignoring malformed NameOwnerChanged: {e}");
                        Self::Other
                    }
                }
            }
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decoder::decode_signal,
        orientation::Orientation,
        sensor_proxy::{ORIENTATION_PROPERTY, SENSOR_INTERFACE, SENSOR_PATH},
    };
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use zvariant::Value;

    fn owner_changed(name: &str, old: &str, new: &str) -> Message {
        Message::signal("/org/freedesktop/DBus", BUS_DAEMON_INTERFACE, NAME_OWNER_CHANGED)
            .unwrap()
            .build(&(name, old, new))
            .unwrap()
    }

    #[test]
    fn properties_changed_is_recognised() {
        let changed: HashMap<&str, Value<'_>> =
            HashMap::from([(ORIENTATION_PROPERTY, Value::from("normal"))]);
        let message = Message::signal(SENSOR_PATH, PROPERTIES_INTERFACE, PROPERTIES_CHANGED)
            .unwrap()
            .build(&(SENSOR_INTERFACE, changed, Vec::<&str>::new()))
            .unwrap();

        match Notification::classify(&message) {
            Notification::PropertiesChanged(signal) => {
                assert_eq!(signal.interface, SENSOR_INTERFACE);
                assert!(signal.invalidated.is_empty());
                assert_eq!(decode_signal(&signal), Orientation::Normal);
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn properties_changed_with_bad_body_is_other() {
        let message = Message::signal(SENSOR_PATH, PROPERTIES_INTERFACE, PROPERTIES_CHANGED)
            .unwrap()
            .build(&(1_u32, 2_u32))
            .unwrap();

        assert!(matches!(Notification::classify(&message), Notification::Other));
    }

    #[test]
    fn sensor_owner_change_is_recognised() {
        let message = owner_changed(SENSOR_SERVICE, ":1.10", ":1.42");

        match Notification::classify(&message) {
            Notification::OwnerChanged(change) => {
                assert_eq!(change.old_owner, ":1.10");
                assert_eq!(change.new_owner, ":1.42");
                assert!(!change.is_vanished());
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn vanished_owner_is_flagged() {
        let message = owner_changed(SENSOR_SERVICE, ":1.10", "");

        match Notification::classify(&message) {
            Notification::OwnerChanged(change) => assert!(change.is_vanished()),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn unrelated_owner_change_is_other() {
        let message = owner_changed("org.freedesktop.UPower", ":1.3", ":1.4");
        assert!(matches!(Notification::classify(&message), Notification::Other));
    }

    #[test]
    fn method_calls_are_other() {
        let message = Message::method_call(SENSOR_PATH, "ClaimAccelerometer")
            .unwrap()
            .build(&())
            .unwrap();
        assert!(matches!(Notification::classify(&message), Notification::Other));
    }
}
