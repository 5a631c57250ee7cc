//! The value serializer.
//!
//! Walks [`Reflection`] shapes and produces `serde_json::Value` trees. The
//! crate is built with `preserve_order`, so every emitted object keeps its
//! insertion order — field order and component order are observable parts
//! of the wire contract.

use chrono::{SecondsFormat, TimeZone, Utc};
use serde_json::{json, Map, Value};

use inspector_host::introspect::{Introspect, ReflectedValue, Reflection, Scalar};

use crate::redact::{is_redacted, REDACTED};

/// Hard recursion limit. No emitted branch is deeper than this.
pub const MAX_DEPTH: usize = 5;

/// Depth at which default-mode serialization stops recursing complex
/// objects and emits an expansion placeholder instead.
pub const PLACEHOLDER_DEPTH: usize = 2;

/// Collections larger than this are summarized with a count sentinel.
pub const MAX_COLLECTION: usize = 50;

/// Byte arrays larger than this are summarized with a count sentinel.
pub const MAX_BYTES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Default,
    Deep,
}

/// Build an expansion placeholder for a complex object.
#[must_use]
pub fn expansion_placeholder(type_name: &str) -> Value {
    json!({ "_expandable": true, "_type": type_name })
}

/// Whether a value is an expansion placeholder.
#[must_use]
pub fn is_expansion_placeholder(value: &Value) -> bool {
    value
        .get("_expandable")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Serializes live host objects into JSON-safe value trees.
///
/// A serializer is cheap to construct; the packet constructor attaches a
/// redaction context that applies to every map and field walk.
#[derive(Debug, Default, Clone)]
pub struct ValueSerializer {
    packet_name: Option<String>,
}

impl ValueSerializer {
    #[must_use]
    pub fn new() -> Self {
        Self { packet_name: None }
    }

    /// A serializer for a packet's contents. Fields on the redaction list
    /// for `packet_name` are replaced with [`REDACTED`] at any depth.
    #[must_use]
    pub fn for_packet(packet_name: impl Into<String>) -> Self {
        Self {
            packet_name: Some(packet_name.into()),
        }
    }

    // -- Public entry points --

    /// Default-mode serialization of a live object.
    #[must_use]
    pub fn serialize(&self, object: &dyn Introspect) -> Value {
        self.object_value(object, 0, Mode::Default)
    }

    /// Deep-mode serialization: no placeholders, complex objects recursed
    /// to [`MAX_DEPTH`]. Used by path expansion.
    #[must_use]
    pub fn serialize_deep(&self, object: &dyn Introspect) -> Value {
        self.object_value(object, 0, Mode::Deep)
    }

    /// Default-mode serialization of a reflected field value.
    #[must_use]
    pub fn serialize_value(&self, value: &ReflectedValue) -> Value {
        self.reflected_value(value, 0, Mode::Default)
    }

    /// Deep-mode serialization of a reflected field value.
    #[must_use]
    pub fn serialize_value_deep(&self, value: &ReflectedValue) -> Value {
        self.reflected_value(value, 0, Mode::Deep)
    }

    /// Serialize a component's fields, each field value a fresh depth-0
    /// root. Returns `None` when the component has no serializable fields
    /// (empty components appear as `null`, not `{}`).
    #[must_use]
    pub fn serialize_component_fields(
        &self,
        component: &dyn Introspect,
    ) -> Option<Map<String, Value>> {
        let fields = match component.reflect() {
            Reflection::Fields(fields) | Reflection::Mapping(fields) => fields,
            _ => return None,
        };
        if fields.is_empty() {
            return None;
        }

        let mut map = Map::new();
        for (name, value) in fields {
            let serialized = if self.field_is_redacted(&name) {
                Value::String(REDACTED.to_string())
            } else {
                self.reflected_value(&value, 0, Mode::Default)
            };
            map.insert(name, serialized);
        }
        Some(map)
    }

    // -- Internal walk --

    fn field_is_redacted(&self, field: &str) -> bool {
        self.packet_name
            .as_deref()
            .is_some_and(|packet| is_redacted(packet, field))
    }

    fn reflected_value(&self, value: &ReflectedValue, depth: usize, mode: Mode) -> Value {
        match value {
            ReflectedValue::Scalar(scalar) => scalar_value(scalar),
            ReflectedValue::Sequence(items) => self.sequence_value(items, depth, mode),
            ReflectedValue::Mapping(entries) => self.mapping_value(entries, depth, mode),
            ReflectedValue::Object(object) => self.object_value(object.as_ref(), depth, mode),
        }
    }

    fn sequence_value(&self, items: &[ReflectedValue], depth: usize, mode: Mode) -> Value {
        if items.len() > MAX_COLLECTION || depth >= MAX_DEPTH {
            return Value::String(format!("[{} items]", items.len()));
        }
        Value::Array(
            items
                .iter()
                .map(|item| self.reflected_value(item, depth + 1, mode))
                .collect(),
        )
    }

    fn mapping_value(
        &self,
        entries: &[(String, ReflectedValue)],
        depth: usize,
        mode: Mode,
    ) -> Value {
        if entries.len() > MAX_COLLECTION || depth >= MAX_DEPTH {
            return Value::String(format!("{{{} entries}}", entries.len()));
        }
        let mut map = Map::new();
        for (key, value) in entries {
            let serialized = if self.field_is_redacted(key) {
                Value::String(REDACTED.to_string())
            } else {
                self.reflected_value(value, depth + 1, mode)
            };
            map.insert(key.clone(), serialized);
        }
        Value::Object(map)
    }

    fn object_value(&self, object: &dyn Introspect, depth: usize, mode: Mode) -> Value {
        match object.reflect() {
            Reflection::Scalar(scalar) => scalar_value(&scalar),
            // Sequence- and mapping-shaped objects are plain data: recursed
            // freely, never placeholdered.
            Reflection::Sequence(items) => self.sequence_value(&items, depth, mode),
            Reflection::Mapping(entries) => self.mapping_value(&entries, depth, mode),
            Reflection::Fields(fields) => {
                // Complex object. The placeholder threshold applies before
                // any special-shape extraction.
                if mode == Mode::Default && depth >= PLACEHOLDER_DEPTH {
                    return expansion_placeholder(object.type_name());
                }
                if depth >= MAX_DEPTH {
                    return Value::String(format!("[{}]", object.type_name()));
                }
                if object.type_name() == "Alarm" {
                    return self.alarm_value(&fields);
                }
                self.fields_value(object.type_name(), &fields, depth, mode)
            }
        }
    }

    fn fields_value(
        &self,
        type_name: &str,
        fields: &[(String, ReflectedValue)],
        depth: usize,
        mode: Mode,
    ) -> Value {
        if fields.is_empty() {
            return Value::Null;
        }
        let mut map = Map::new();
        map.insert("_type".to_string(), Value::String(type_name.to_string()));
        for (name, value) in fields {
            let serialized = if self.field_is_redacted(name) {
                Value::String(REDACTED.to_string())
            } else {
                self.reflected_value(value, depth + 1, mode)
            };
            map.insert(name.clone(), serialized);
        }
        Value::Object(map)
    }

    /// Normalize an alarm into `{isSet, hasPassed, alarmInstant, _type}`.
    ///
    /// Probes the shapes the host is known to use (`isSet`/`set`,
    /// `hasPassed`/`passed`, `alarmInstant`/`instant`); if nothing usable
    /// is found the whole object degrades to `"[Alarm]"`.
    fn alarm_value(&self, fields: &[(String, ReflectedValue)]) -> Value {
        let probe = |names: &[&str]| -> Option<&ReflectedValue> {
            names
                .iter()
                .find_map(|name| fields.iter().find(|(f, _)| f == name).map(|(_, v)| v))
        };

        let set = probe(&["isSet", "set"]);
        let passed = probe(&["hasPassed", "passed"]);
        let instant = probe(&["alarmInstant", "instant"]);

        if set.is_none() && passed.is_none() && instant.is_none() {
            return Value::String("[Alarm]".to_string());
        }

        let as_bool = |value: Option<&ReflectedValue>| match value {
            Some(ReflectedValue::Scalar(Scalar::Bool(b))) => *b,
            _ => false,
        };

        let mut map = Map::new();
        map.insert("isSet".to_string(), Value::Bool(as_bool(set)));
        map.insert("hasPassed".to_string(), Value::Bool(as_bool(passed)));
        let instant_value = match instant {
            Some(ReflectedValue::Scalar(Scalar::Instant(ms))) => instant_map(*ms),
            _ => Value::Null,
        };
        map.insert("alarmInstant".to_string(), instant_value);
        map.insert("_type".to_string(), Value::String("Alarm".to_string()));
        Value::Object(map)
    }
}

fn scalar_value(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Null => Value::Null,
        Scalar::Bool(b) => Value::Bool(*b),
        Scalar::Int(i) => json!(i),
        Scalar::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Scalar::Str(s) => Value::String(s.clone()),
        Scalar::Vec3([x, y, z]) => json!([x, y, z]),
        Scalar::Instant(ms) => instant_map(*ms),
        Scalar::Uuid(s) => Value::String(s.clone()),
        Scalar::Bytes(bytes) => bytes_value(bytes),
        Scalar::Enum(name) => Value::String(name.clone()),
    }
}

fn instant_map(epoch_millis: i64) -> Value {
    let iso = Utc
        .timestamp_millis_opt(epoch_millis)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default();
    json!({ "epochMilli": epoch_millis, "iso": iso, "_type": "Instant" })
}

fn bytes_value(bytes: &[u8]) -> Value {
    if bytes.len() > MAX_BYTES {
        return Value::String(format!("[{} bytes]", bytes.len()));
    }
    let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02X}")).collect();
    Value::String(hex.join(" "))
}
