//! Total decoding of sensor payloads into [`Orientation`] values.
//!
//! Every function here returns an orientation for every input. Payloads of
//! the wrong shape, from the wrong interface or carrying an unknown label all
//! decode to [`Orientation::Undefined`], which the dispatch loop ignores.

use std::{collections::HashMap, fmt};

use serde::{
    Deserialize, Deserializer,
    de::{MapAccess, Visitor},
};
use zbus::message::Message;
use zvariant::{OwnedValue, Signature, Type, Value};

use crate::{
    orientation::{Orientation, decode_label},
    sensor_proxy::{ORIENTATION_PROPERTY, SENSOR_INTERFACE},
};

/// The first entry of an `a{sv}` dictionary, in wire order.
///
/// Later entries are read and discarded.
#[derive(Debug, Default)]
pub struct FirstChanged(pub Option<(String, OwnedValue)>);

impl Type for FirstChanged {
    const SIGNATURE: &'static Signature = <HashMap<String, OwnedValue> as Type>::SIGNATURE;
}

impl<'de> Deserialize<'de> for FirstChanged {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FirstEntry;

        impl<'de> Visitor<'de> for FirstEntry {
            type Value = FirstChanged;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a dictionary of property names to variants")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let first = map.next_entry::<String, OwnedValue>()?;
                while map.next_entry::<String, OwnedValue>()?.is_some() {}
                Ok(FirstChanged(first))
            }
        }

        deserializer.deserialize_map(FirstEntry)
    }
}

/// Body of an `org.freedesktop.DBus.Properties.PropertiesChanged` signal.
#[derive(Debug)]
pub struct PropertiesChanged {
    pub interface: String,
    /// First changed property as sent; only this entry is ever decoded.
    pub changed: FirstChanged,
    pub invalidated: Vec<String>,
}

impl PropertiesChanged {
    /// Reads the `(sa{sv}as)` body, or `None` when the signature differs.
    pub fn from_message(message: &Message) -> Option<Self> {
        let (interface, changed, invalidated): (String, FirstChanged, Vec<String>) =
            message.body().deserialize().ok()?;

        Some(Self {
            interface,
            changed,
            invalidated,
        })
    }
}

/// Decodes a properties-changed signal.
///
/// Signals for any interface other than the sensor's are rejected before the
/// changed entries are looked at. Only the first changed entry counts; it
/// must be the orientation property.
pub fn decode_signal(signal: &PropertiesChanged) -> Orientation {
    if signal.interface != SENSOR_INTERFACE {
        return Orientation::Undefined;
    }

    match &signal.changed.0 {
        Some((name, value)) if name == ORIENTATION_PROPERTY => decode_value(value),
        _ => Orientation::Undefined,
    }
}

/// Decodes a raw bus message that is expected to be a properties-changed
/// signal.
pub fn decode_message(message: &Message) -> Orientation {
    PropertiesChanged::from_message(message)
        .as_ref()
        .map_or(Orientation::Undefined, decode_signal)
}

/// Decodes the value returned by a `Properties.Get` call.
pub fn decode_property_reply(reply: &Value<'_>) -> Orientation {
    decode_value(reply)
}

fn decode_value(value: &Value<'_>) -> Orientation {
    match value {
        Value::Str(label) => decode_label(label.as_str()),
        Value::Value(inner) => decode_value(inner),
        _ => Orientation::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn owned(value: Value<'_>) -> OwnedValue {
        OwnedValue::try_from(value).unwrap()
    }

    fn signal(interface: &str, entries: Vec<(&str, Value<'_>)>) -> PropertiesChanged {
        PropertiesChanged {
            interface: interface.to_string(),
            changed: FirstChanged(
                entries
                    .into_iter()
                    .next()
                    .map(|(name, value)| (name.to_string(), owned(value))),
            ),
            invalidated: Vec::new(),
        }
    }

    fn wire_signal(changed: BTreeMap<&str, Value<'_>>) -> Message {
        Message::signal(
            "/net/hadess/SensorProxy",
            "org.freedesktop.DBus.Properties",
            "PropertiesChanged",
        )
        .unwrap()
        .build(&(SENSOR_INTERFACE, changed, Vec::<&str>::new()))
        .unwrap()
    }

    #[test]
    fn sensor_orientation_signal_decodes() {
        let changed = signal(
            SENSOR_INTERFACE,
            vec![(ORIENTATION_PROPERTY, Value::from("bottom-up"))],
        );
        assert_eq!(decode_signal(&changed), Orientation::BottomUp);
    }

    #[test]
    fn foreign_interface_is_undefined_whatever_the_payload() {
        let changed = signal(
            "org.other.Service",
            vec![(ORIENTATION_PROPERTY, Value::from("normal"))],
        );
        assert_eq!(decode_signal(&changed), Orientation::Undefined);
    }

    #[test]
    fn empty_changed_map_is_undefined() {
        let changed = signal(SENSOR_INTERFACE, Vec::new());
        assert_eq!(decode_signal(&changed), Orientation::Undefined);
    }

    #[test]
    fn other_property_is_undefined() {
        let changed = signal(SENSOR_INTERFACE, vec![("LightLevel", Value::from(42.0_f64))]);
        assert_eq!(decode_signal(&changed), Orientation::Undefined);
    }

    #[test]
    fn orientation_with_wrong_basic_type_is_undefined() {
        let changed = signal(SENSOR_INTERFACE, vec![(ORIENTATION_PROPERTY, Value::from(3_u32))]);
        assert_eq!(decode_signal(&changed), Orientation::Undefined);
    }

    #[test]
    fn unknown_label_is_undefined() {
        let changed = signal(
            SENSOR_INTERFACE,
            vec![(ORIENTATION_PROPERTY, Value::from("face-up"))],
        );
        assert_eq!(decode_signal(&changed), Orientation::Undefined);
    }

    #[test]
    fn decoding_twice_gives_the_same_answer() {
        let changed = signal(
            SENSOR_INTERFACE,
            vec![(ORIENTATION_PROPERTY, Value::from("normal"))],
        );
        assert_eq!(decode_signal(&changed), Orientation::Normal);
        assert_eq!(decode_signal(&changed), Orientation::Normal);
    }

    #[test]
    fn property_reply_decodes_plain_and_nested_variants() {
        assert_eq!(
            decode_property_reply(&Value::from("right-up")),
            Orientation::RightUp
        );
        assert_eq!(
            decode_property_reply(&Value::Value(Box::new(Value::from("left-up")))),
            Orientation::LeftUp
        );
    }

    #[test]
    fn property_reply_of_wrong_shape_is_undefined() {
        assert_eq!(decode_property_reply(&Value::from(true)), Orientation::Undefined);
        assert_eq!(decode_property_reply(&Value::from("")), Orientation::Undefined);
    }

    #[test]
    fn wire_message_decodes() {
        let message = wire_signal(BTreeMap::from([(
            ORIENTATION_PROPERTY,
            Value::from("left-up"),
        )]));
        assert_eq!(decode_message(&message), Orientation::LeftUp);
    }

    #[test]
    fn orientation_behind_another_entry_is_undefined() {
        // BTreeMap serializes in key order, so "AAA" goes on the wire first.
        let message = wire_signal(BTreeMap::from([
            ("AAA", Value::from(1_u32)),
            (ORIENTATION_PROPERTY, Value::from("normal")),
        ]));

        let changed = PropertiesChanged::from_message(&message).unwrap();
        let (first, _) = changed.changed.0.as_ref().unwrap();
        assert_eq!(first, "AAA");
        assert_eq!(decode_message(&message), Orientation::Undefined);
    }

    #[test]
    fn entries_after_the_orientation_are_skipped() {
        let message = wire_signal(BTreeMap::from([
            (ORIENTATION_PROPERTY, Value::from("bottom-up")),
            ("HasAccelerometer", Value::from(true)),
            ("LightLevel", Value::from(12.5_f64)),
        ]));
        assert_eq!(decode_message(&message), Orientation::BottomUp);
    }

    #[test]
    fn empty_wire_dictionary_is_undefined() {
        let message = wire_signal(BTreeMap::new());
        let changed = PropertiesChanged::from_message(&message).unwrap();
        assert!(changed.changed.0.is_none());
        assert_eq!(decode_message(&message), Orientation::Undefined);
    }

    #[test]
    fn wire_message_with_wrong_arity_is_undefined() {
        let message = Message::signal(
            "/net/hadess/SensorProxy",
            "org.freedesktop.DBus.Properties",
            "PropertiesChanged",
        )
        .unwrap()
        .build(&(SENSOR_INTERFACE,))
        .unwrap();

        assert_eq!(decode_message(&message), Orientation::Undefined);
    }
}
