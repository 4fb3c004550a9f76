#![forbid(unsafe_code)]

//! Typed property values and the factories that create, compare and measure them.
//!
//! Every value stored in an index or supplied as a query literal is a [`Value`]
//! tagged with one of the [`PropertyType`]s. Conversions between types, the
//! total order used by comparison operators, and the string/length forms used
//! by `LIKE` and `LENGTH(...)` all live in the per-type [`TypeFactory`]
//! implementations, reachable through a [`TypeSystem`].

mod factory;
mod like;
mod name;
mod path;
mod system;

use std::fmt;
use std::hash::{Hash, Hasher};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use url::Url;

pub use factory::{
    BinaryFactory, BooleanFactory, DateFactory, DecimalFactory, DoubleFactory, LongFactory,
    NameFactory, PathFactory, ReferenceFactory, StringFactory, TypeFactory, UriFactory,
    ValueFactory,
};
pub use like::LikePattern;
pub use name::Name;
pub use path::{Path, PathSegment};
pub use system::TypeSystem;

/// Logical type of a property value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PropertyType {
    /// UTF-8 text.
    String,
    /// Opaque byte payload.
    Binary,
    /// Signed 64-bit integer.
    Long,
    /// 64-bit floating point number.
    Double,
    /// Arbitrary precision decimal.
    Decimal,
    /// Instant in time, normalized to UTC.
    Date,
    /// `true` or `false`.
    Boolean,
    /// Namespace-prefixed name such as `jcr:title`.
    Name,
    /// Absolute or relative repository path.
    Path,
    /// Hard reference to another node key.
    Reference,
    /// Weak reference to another node key.
    WeakReference,
    /// Absolute URI.
    Uri,
}

impl PropertyType {
    /// Every supported type, in declaration order.
    pub const ALL: [PropertyType; 12] = [
        PropertyType::String,
        PropertyType::Binary,
        PropertyType::Long,
        PropertyType::Double,
        PropertyType::Decimal,
        PropertyType::Date,
        PropertyType::Boolean,
        PropertyType::Name,
        PropertyType::Path,
        PropertyType::Reference,
        PropertyType::WeakReference,
        PropertyType::Uri,
    ];

    /// Human readable type name, as used in node type definitions.
    pub const fn name(self) -> &'static str {
        match self {
            PropertyType::String => "String",
            PropertyType::Binary => "Binary",
            PropertyType::Long => "Long",
            PropertyType::Double => "Double",
            PropertyType::Decimal => "Decimal",
            PropertyType::Date => "Date",
            PropertyType::Boolean => "Boolean",
            PropertyType::Name => "Name",
            PropertyType::Path => "Path",
            PropertyType::Reference => "Reference",
            PropertyType::WeakReference => "WeakReference",
            PropertyType::Uri => "URI",
        }
    }

    /// Looks up a type by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Returns true for hard and weak references.
    pub const fn is_reference(self) -> bool {
        matches!(self, PropertyType::Reference | PropertyType::WeakReference)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_ascii_uppercase())
    }
}

/// Errors raised when a value cannot be created or an operator cannot be applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueFormatError {
    /// A value of one type has no representation in the target type.
    #[error("cannot convert {from} value '{value}' to {target}")]
    Conversion {
        /// String form of the rejected value.
        value: String,
        /// Type of the rejected value.
        from: PropertyType,
        /// Requested type.
        target: PropertyType,
    },
    /// A string could not be parsed as the target type.
    #[error("cannot parse '{value}' as {target}")]
    Parse {
        /// Rejected input.
        value: String,
        /// Requested type.
        target: PropertyType,
    },
    /// The operator is not meaningful for values of this type.
    #[error("operator {operator} is not supported for {property_type} values")]
    OperatorNotSupported {
        /// Operator symbol, e.g. `LIKE`.
        operator: &'static str,
        /// Declared type of the operand.
        property_type: PropertyType,
    },
}

/// UTC timestamp with an explicit year sign, e.g. `-0248-01-01T00:00:00.5Z`.
const SIGNED_YEAR: &[BorrowedFormatItem<'static>] = format_description!(
    "[year sign:mandatory]-[month]-[day]T[hour]:[minute]:[second].[subsecond]Z"
);

/// Instant in time, always stored in UTC.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DateTime(OffsetDateTime);

impl DateTime {
    /// Wraps an [`OffsetDateTime`], normalizing it to UTC.
    pub fn new(value: OffsetDateTime) -> Self {
        Self(value.to_offset(UtcOffset::UTC))
    }

    /// Parses RFC 3339 timestamps, `YYYY-MM-DD` dates (midnight UTC),
    /// `YYYY-MM-DDTHH:MM:SS[.fff]` local timestamps (assumed UTC), and the
    /// signed-year form [`Display`](fmt::Display) writes for years RFC 3339
    /// cannot express.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Ok(value) = OffsetDateTime::parse(input, &Rfc3339) {
            return Some(Self::new(value));
        }
        if let Ok(signed) = PrimitiveDateTime::parse(input, SIGNED_YEAR) {
            return Some(Self::new(signed.assume_utc()));
        }
        if let Ok(date) = Date::parse(input, format_description!("[year]-[month]-[day]")) {
            return Some(Self::new(date.midnight().assume_utc()));
        }
        if let Ok(local) = PrimitiveDateTime::parse(
            input,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        ) {
            return Some(Self::new(local.assume_utc()));
        }
        PrimitiveDateTime::parse(
            input,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
        .ok()
        .map(|local| Self::new(local.assume_utc()))
    }

    /// Builds a timestamp from milliseconds since the Unix epoch.
    pub fn from_millis(millis: i64) -> Option<Self> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
            .ok()
            .map(Self)
    }

    /// Milliseconds since the Unix epoch.
    pub fn millis(&self) -> i64 {
        (self.0.unix_timestamp_nanos() / 1_000_000) as i64
    }

    /// Underlying UTC timestamp.
    pub fn as_offset(&self) -> OffsetDateTime {
        self.0
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // RFC 3339 cannot express years outside 0..=9999.
        let text = match self.0.format(&Rfc3339) {
            Ok(text) => text,
            Err(_) => self.0.format(SIGNED_YEAR).map_err(|_| fmt::Error)?,
        };
        f.write_str(&text)
    }
}

/// Reference to another node by key.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Reference {
    key: String,
    weak: bool,
}

impl Reference {
    /// Creates a hard reference.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            weak: false,
        }
    }

    /// Creates a weak reference.
    pub fn weak(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            weak: true,
        }
    }

    /// Key of the referenced node.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns true for weak references.
    pub fn is_weak(&self) -> bool {
        self.weak
    }

    pub(crate) fn with_weak(mut self, weak: bool) -> Self {
        self.weak = weak;
        self
    }
}

/// A single typed property value.
#[derive(Clone, Debug)]
pub enum Value {
    /// UTF-8 text.
    String(String),
    /// Opaque bytes.
    Binary(Vec<u8>),
    /// Signed 64-bit integer.
    Long(i64),
    /// 64-bit float.
    Double(f64),
    /// Arbitrary precision decimal.
    Decimal(Decimal),
    /// UTC timestamp.
    Date(DateTime),
    /// Boolean.
    Boolean(bool),
    /// Prefixed name.
    Name(Name),
    /// Repository path.
    Path(Path),
    /// Hard or weak node reference.
    Reference(Reference),
    /// Absolute URI.
    Uri(Url),
}

impl Value {
    /// Type tag of this value.
    pub fn property_type(&self) -> PropertyType {
        match self {
            Value::String(_) => PropertyType::String,
            Value::Binary(_) => PropertyType::Binary,
            Value::Long(_) => PropertyType::Long,
            Value::Double(_) => PropertyType::Double,
            Value::Decimal(_) => PropertyType::Decimal,
            Value::Date(_) => PropertyType::Date,
            Value::Boolean(_) => PropertyType::Boolean,
            Value::Name(_) => PropertyType::Name,
            Value::Path(_) => PropertyType::Path,
            Value::Reference(r) if r.is_weak() => PropertyType::WeakReference,
            Value::Reference(_) => PropertyType::Reference,
            Value::Uri(_) => PropertyType::Uri,
        }
    }

    /// Returns the text of a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical string form, identical to the owning factory's `as_string`.
    pub fn to_canonical_string(&self) -> String {
        factory::canonical_string(self)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Name(a), Value::Name(b)) => a == b,
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::Reference(a), Value::Reference(b)) => a == b,
            (Value::Uri(a), Value::Uri(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(v) => v.hash(state),
            Value::Binary(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Decimal(v) => v.normalize().hash(state),
            Value::Date(v) => v.hash(state),
            Value::Boolean(v) => v.hash(state),
            Value::Name(v) => v.hash(state),
            Value::Path(v) => v.hash(state),
            Value::Reference(v) => v.hash(state),
            Value::Uri(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Long(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<DateTime> for Value {
    fn from(value: DateTime) -> Self {
        Value::Date(value)
    }
}

impl From<Name> for Value {
    fn from(value: Name) -> Self {
        Value::Name(value)
    }
}

impl From<Path> for Value {
    fn from(value: Path) -> Self {
        Value::Path(value)
    }
}

impl From<Reference> for Value {
    fn from(value: Reference) -> Self {
        Value::Reference(value)
    }
}

impl From<Url> for Value {
    fn from(value: Url) -> Self {
        Value::Uri(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Binary(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Binary(value.to_vec())
    }
}
