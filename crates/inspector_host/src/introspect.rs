//! Runtime shape discovery for opaque host objects.
//!
//! Host components and domain objects are handed to the inspector as
//! `Arc<dyn Introspect>`. The inspector never knows their Rust types; it
//! walks the [`Reflection`] returned by [`Introspect::reflect`] instead.
//! Special shapes (vectors, instants, UUIDs, byte arrays, enumerations) are
//! surfaced as [`Scalar`]s so the serializer can recognise them before any
//! generic field walking.
//!
//! Field names surfaced here are the host's wire names (camelCase) — they
//! appear verbatim in client expansion paths such as
//! `InteractionManager.entity.alarmStore.parameters.MyAlarm`.

use std::any::Any;
use std::sync::{Arc, Weak};

/// A shared reference to a live host object.
pub type ObjectRef = Arc<dyn Introspect>;

/// A weak reference to a live host object.
///
/// The inspector caches these alongside serialized snapshots. The host may
/// drop or relocate components at any time, so every upgrade is best-effort
/// and failure is swallowed.
pub type WeakObjectRef = Weak<dyn Introspect>;

/// A terminal value surfaced by reflection.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A three-component double vector (positions, directions).
    Vec3([f64; 3]),
    /// A point in time as epoch milliseconds.
    Instant(i64),
    /// A UUID in canonical string form.
    Uuid(String),
    /// A raw byte array.
    Bytes(Vec<u8>),
    /// An enumeration constant, by name.
    Enum(String),
}

/// A single reflected value: either a terminal scalar, an inline
/// collection, or a reference to a nested live object.
#[derive(Clone)]
pub enum ReflectedValue {
    Scalar(Scalar),
    /// An ordered sequence (arrays, lists).
    Sequence(Vec<ReflectedValue>),
    /// An ordered string-keyed map.
    Mapping(Vec<(String, ReflectedValue)>),
    /// A nested live object; its own shape is discovered lazily.
    Object(ObjectRef),
}

impl ReflectedValue {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Str(value.into()))
    }

    pub fn int(value: i64) -> Self {
        Self::Scalar(Scalar::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::Scalar(Scalar::Float(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::Scalar(Scalar::Bool(value))
    }

    pub fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    pub fn object(obj: ObjectRef) -> Self {
        Self::Object(obj)
    }
}

impl std::fmt::Debug for ReflectedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "Scalar({s:?})"),
            Self::Sequence(items) => write!(f, "Sequence(len={})", items.len()),
            Self::Mapping(entries) => write!(f, "Mapping(len={})", entries.len()),
            Self::Object(obj) => write!(f, "Object({})", obj.type_name()),
        }
    }
}

/// The discovered shape of a live object.
#[derive(Debug, Clone)]
pub enum Reflection {
    /// The object *is* a terminal value (e.g. a boxed instant).
    Scalar(Scalar),
    /// The object is an ordered sequence.
    Sequence(Vec<ReflectedValue>),
    /// The object is an ordered string-keyed map.
    Mapping(Vec<(String, ReflectedValue)>),
    /// The object is a complex type with named fields, in declaration order.
    Fields(Vec<(String, ReflectedValue)>),
}

impl Reflection {
    /// Look up a named field (for [`Reflection::Fields`]) or map entry
    /// (for [`Reflection::Mapping`]).
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ReflectedValue> {
        match self {
            Self::Fields(fields) | Self::Mapping(fields) => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Index into a sequence shape.
    #[must_use]
    pub fn index(&self, idx: usize) -> Option<&ReflectedValue> {
        match self {
            Self::Sequence(items) => items.get(idx),
            _ => None,
        }
    }
}

/// Runtime introspection over a live host object.
///
/// `type_name` returns the *simple* type name (no module path) — it is the
/// key under which components appear in snapshots and the `_type` sentinel
/// in serialized values. `as_any` enables interface-probing by downcast,
/// the same pattern the host uses for its own heterogeneous stores.
pub trait Introspect: Send + Sync + 'static {
    /// The simple type name of this object (e.g. `"Alarm"`).
    fn type_name(&self) -> &str;

    /// Discover the object's current shape.
    fn reflect(&self) -> Reflection;

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
}

// ---------------------------------------------------------------------------
// Dynamic objects
// ---------------------------------------------------------------------------

/// A dynamically-assembled object with a type name and ordered named fields.
///
/// Used by hosts that build component state at runtime rather than from
/// fixed Rust types, and heavily by tests.
pub struct DynObject {
    type_name: String,
    fields: Vec<(String, ReflectedValue)>,
}

impl DynObject {
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field. Declaration order is preserved and observable.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: ReflectedValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    #[must_use]
    pub fn into_ref(self) -> ObjectRef {
        Arc::new(self)
    }
}

impl Introspect for DynObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn reflect(&self) -> Reflection {
        Reflection::Fields(self.fields.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A dynamically-assembled string-keyed map object.
///
/// Unlike [`DynObject`], its reflection is [`Reflection::Mapping`] — the
/// serializer treats it as plain data and recurses it freely.
pub struct DynMap {
    type_name: String,
    entries: Vec<(String, ReflectedValue)>,
}

impl DynMap {
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn entry(mut self, key: impl Into<String>, value: ReflectedValue) -> Self {
        self.entries.push((key.into(), value));
        self
    }

    #[must_use]
    pub fn from_entries(
        type_name: impl Into<String>,
        entries: Vec<(String, ReflectedValue)>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            entries,
        }
    }

    #[must_use]
    pub fn into_ref(self) -> ObjectRef {
        Arc::new(self)
    }
}

impl Introspect for DynMap {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn reflect(&self) -> Reflection {
        Reflection::Mapping(self.entries.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
