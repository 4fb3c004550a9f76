use std::borrow::Cow;
use std::cmp::Ordering;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use url::Url;

use super::{DateTime, Name, Path, PathSegment, PropertyType, Reference, Value, ValueFormatError};

/// Typed factory for one [`PropertyType`].
///
/// `Host` is the native Rust representation of the type. The factory owns the
/// conversion rules into that type, its total order, and its string and length
/// forms. Use [`ValueFactory`] when the type is only known at runtime.
pub trait TypeFactory: Send + Sync {
    /// Native representation.
    type Host: Clone + Send + Sync;

    /// Type produced by this factory.
    fn property_type(&self) -> PropertyType;

    /// Parses user supplied text.
    fn create_from_str(&self, text: &str) -> Result<Self::Host, ValueFormatError>;

    /// Converts any value into this type.
    fn create(&self, value: &Value) -> Result<Self::Host, ValueFormatError>;

    /// Total order over hosts.
    fn compare(&self, a: &Self::Host, b: &Self::Host) -> Ordering;

    /// Canonical string form.
    fn as_string(&self, host: &Self::Host) -> String;

    /// Inverse of [`TypeFactory::as_string`].
    fn from_canonical(&self, text: &str) -> Result<Self::Host, ValueFormatError> {
        TypeFactory::create_from_str(self, text)
    }

    /// Form suitable for display to a person.
    fn as_readable_string(&self, host: &Self::Host) -> String {
        TypeFactory::as_string(self, host)
    }

    /// Length as reported by `LENGTH(...)`: characters of the string form.
    fn length(&self, host: &Self::Host) -> u64 {
        TypeFactory::as_string(self, host).chars().count() as u64
    }

    /// Whether `LIKE` may be applied to values of this type.
    fn supports_like(&self) -> bool;

    /// Whether `<`, `<=`, `>` and `>=` may be applied to values of this type.
    fn supports_ordering(&self) -> bool {
        true
    }

    /// Wraps a host into a [`Value`].
    fn to_value(&self, host: Self::Host) -> Value;

    /// Borrows the host out of a value of exactly this type.
    fn downcast<'v>(&self, value: &'v Value) -> Option<&'v Self::Host>;
}

/// Object safe view of a [`TypeFactory`] working on [`Value`]s.
pub trait ValueFactory: Send + Sync {
    /// Type produced by this factory.
    fn property_type(&self) -> PropertyType;
    /// Name of the produced type.
    fn type_name(&self) -> &'static str {
        self.property_type().name()
    }
    /// Parses user supplied text.
    fn create_from_str(&self, text: &str) -> Result<Value, ValueFormatError>;
    /// Parses the canonical string form.
    fn from_canonical(&self, text: &str) -> Result<Value, ValueFormatError>;
    /// Converts any value into this type.
    fn create(&self, value: &Value) -> Result<Value, ValueFormatError>;
    /// Total order; values that cannot be converted sort after those that can.
    fn compare(&self, a: &Value, b: &Value) -> Ordering;
    /// Canonical string form.
    fn as_string(&self, value: &Value) -> String;
    /// Form suitable for display to a person.
    fn as_readable_string(&self, value: &Value) -> String;
    /// Length as reported by `LENGTH(...)`.
    fn length(&self, value: &Value) -> u64;
    /// Whether `LIKE` may be applied.
    fn supports_like(&self) -> bool;
    /// Whether range operators may be applied.
    fn supports_ordering(&self) -> bool;
}

fn host_of<'v, F: TypeFactory>(factory: &F, value: &'v Value) -> Option<Cow<'v, F::Host>> {
    match factory.downcast(value) {
        Some(host) => Some(Cow::Borrowed(host)),
        None => TypeFactory::create(factory, value).ok().map(Cow::Owned),
    }
}

impl<F: TypeFactory> ValueFactory for F {
    fn property_type(&self) -> PropertyType {
        TypeFactory::property_type(self)
    }

    fn create_from_str(&self, text: &str) -> Result<Value, ValueFormatError> {
        TypeFactory::create_from_str(self, text).map(|host| self.to_value(host))
    }

    fn from_canonical(&self, text: &str) -> Result<Value, ValueFormatError> {
        TypeFactory::from_canonical(self, text).map(|host| self.to_value(host))
    }

    fn create(&self, value: &Value) -> Result<Value, ValueFormatError> {
        TypeFactory::create(self, value).map(|host| self.to_value(host))
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (host_of(self, a), host_of(self, b)) {
            (Some(a), Some(b)) => TypeFactory::compare(self, &a, &b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a
                .property_type()
                .cmp(&b.property_type())
                .then_with(|| canonical_string(a).cmp(&canonical_string(b))),
        }
    }

    fn as_string(&self, value: &Value) -> String {
        match host_of(self, value) {
            Some(host) => TypeFactory::as_string(self, &host),
            None => canonical_string(value),
        }
    }

    fn as_readable_string(&self, value: &Value) -> String {
        match host_of(self, value) {
            Some(host) => TypeFactory::as_readable_string(self, &host),
            None => canonical_string(value),
        }
    }

    fn length(&self, value: &Value) -> u64 {
        match host_of(self, value) {
            Some(host) => TypeFactory::length(self, &host),
            None => canonical_string(value).chars().count() as u64,
        }
    }

    fn supports_like(&self) -> bool {
        TypeFactory::supports_like(self)
    }

    fn supports_ordering(&self) -> bool {
        TypeFactory::supports_ordering(self)
    }
}

pub(super) fn canonical_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Binary(bytes) => BASE64.encode(bytes),
        Value::Long(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Decimal(v) => v.to_string(),
        Value::Date(v) => v.to_string(),
        Value::Boolean(v) => v.to_string(),
        Value::Name(v) => v.to_string(),
        Value::Path(v) => v.to_string(),
        Value::Reference(r) => r.key().to_owned(),
        Value::Uri(u) => u.as_str().to_owned(),
    }
}

fn conversion(value: &Value, target: PropertyType) -> ValueFormatError {
    ValueFormatError::Conversion {
        value: canonical_string(value),
        from: value.property_type(),
        target,
    }
}

fn unparsable(text: &str, target: PropertyType) -> ValueFormatError {
    ValueFormatError::Parse {
        value: text.to_owned(),
        target,
    }
}

/// Factory for `STRING` values. Every value converts to its canonical string.
#[derive(Clone, Copy, Debug, Default)]
pub struct StringFactory;

impl TypeFactory for StringFactory {
    type Host = String;

    fn property_type(&self) -> PropertyType {
        PropertyType::String
    }

    fn create_from_str(&self, text: &str) -> Result<String, ValueFormatError> {
        Ok(text.to_owned())
    }

    fn create(&self, value: &Value) -> Result<String, ValueFormatError> {
        Ok(canonical_string(value))
    }

    fn compare(&self, a: &String, b: &String) -> Ordering {
        a.cmp(b)
    }

    fn as_string(&self, host: &String) -> String {
        host.clone()
    }

    fn supports_like(&self) -> bool {
        true
    }

    fn to_value(&self, host: String) -> Value {
        Value::String(host)
    }

    fn downcast<'v>(&self, value: &'v Value) -> Option<&'v String> {
        match value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Factory for `BINARY` values. The string form is base64; length is the byte count.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryFactory;

impl TypeFactory for BinaryFactory {
    type Host = Vec<u8>;

    fn property_type(&self) -> PropertyType {
        PropertyType::Binary
    }

    fn create_from_str(&self, text: &str) -> Result<Vec<u8>, ValueFormatError> {
        Ok(text.as_bytes().to_vec())
    }

    fn from_canonical(&self, text: &str) -> Result<Vec<u8>, ValueFormatError> {
        BASE64
            .decode(text)
            .map_err(|_| unparsable(text, PropertyType::Binary))
    }

    fn create(&self, value: &Value) -> Result<Vec<u8>, ValueFormatError> {
        match value {
            Value::Binary(bytes) => Ok(bytes.clone()),
            other => Ok(canonical_string(other).into_bytes()),
        }
    }

    fn compare(&self, a: &Vec<u8>, b: &Vec<u8>) -> Ordering {
        a.cmp(b)
    }

    fn as_string(&self, host: &Vec<u8>) -> String {
        BASE64.encode(host)
    }

    fn as_readable_string(&self, host: &Vec<u8>) -> String {
        format!("<binary {} bytes>", host.len())
    }

    fn length(&self, host: &Vec<u8>) -> u64 {
        host.len() as u64
    }

    fn supports_like(&self) -> bool {
        false
    }

    fn supports_ordering(&self) -> bool {
        false
    }

    fn to_value(&self, host: Vec<u8>) -> Value {
        Value::Binary(host)
    }

    fn downcast<'v>(&self, value: &'v Value) -> Option<&'v Vec<u8>> {
        match value {
            Value::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Factory for `LONG` values. Dates convert to epoch milliseconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct LongFactory;

impl TypeFactory for LongFactory {
    type Host = i64;

    fn property_type(&self) -> PropertyType {
        PropertyType::Long
    }

    fn create_from_str(&self, text: &str) -> Result<i64, ValueFormatError> {
        let trimmed = text.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            return Ok(v);
        }
        Decimal::from_str(trimmed)
            .ok()
            .filter(|d| d.fract().is_zero())
            .and_then(|d| d.to_i64())
            .ok_or_else(|| unparsable(text, PropertyType::Long))
    }

    fn create(&self, value: &Value) -> Result<i64, ValueFormatError> {
        match value {
            Value::Long(v) => Ok(*v),
            Value::Double(d) if d.is_finite() && d.fract() == 0.0 => {
                Decimal::from_f64(*d)
                    .and_then(|d| d.to_i64())
                    .ok_or_else(|| conversion(value, PropertyType::Long))
            }
            Value::Decimal(d) if d.fract().is_zero() => {
                d.to_i64().ok_or_else(|| conversion(value, PropertyType::Long))
            }
            Value::Date(date) => Ok(date.millis()),
            Value::String(s) => TypeFactory::create_from_str(self, s),
            other => Err(conversion(other, PropertyType::Long)),
        }
    }

    fn compare(&self, a: &i64, b: &i64) -> Ordering {
        a.cmp(b)
    }

    fn as_string(&self, host: &i64) -> String {
        host.to_string()
    }

    fn supports_like(&self) -> bool {
        false
    }

    fn to_value(&self, host: i64) -> Value {
        Value::Long(host)
    }

    fn downcast<'v>(&self, value: &'v Value) -> Option<&'v i64> {
        match value {
            Value::Long(v) => Some(v),
            _ => None,
        }
    }
}

/// Factory for `DOUBLE` values, ordered with [`f64::total_cmp`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DoubleFactory;

impl TypeFactory for DoubleFactory {
    type Host = f64;

    fn property_type(&self) -> PropertyType {
        PropertyType::Double
    }

    fn create_from_str(&self, text: &str) -> Result<f64, ValueFormatError> {
        text.trim()
            .parse::<f64>()
            .map_err(|_| unparsable(text, PropertyType::Double))
    }

    fn create(&self, value: &Value) -> Result<f64, ValueFormatError> {
        match value {
            Value::Double(v) => Ok(*v),
            Value::Long(v) => Ok(*v as f64),
            Value::Decimal(d) => d.to_f64().ok_or_else(|| conversion(value, PropertyType::Double)),
            Value::Date(date) => Ok(date.millis() as f64),
            Value::String(s) => TypeFactory::create_from_str(self, s),
            other => Err(conversion(other, PropertyType::Double)),
        }
    }

    fn compare(&self, a: &f64, b: &f64) -> Ordering {
        a.total_cmp(b)
    }

    fn as_string(&self, host: &f64) -> String {
        host.to_string()
    }

    fn supports_like(&self) -> bool {
        false
    }

    fn to_value(&self, host: f64) -> Value {
        Value::Double(host)
    }

    fn downcast<'v>(&self, value: &'v Value) -> Option<&'v f64> {
        match value {
            Value::Double(v) => Some(v),
            _ => None,
        }
    }
}

/// Factory for `DECIMAL` values.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecimalFactory;

impl TypeFactory for DecimalFactory {
    type Host = Decimal;

    fn property_type(&self) -> PropertyType {
        PropertyType::Decimal
    }

    fn create_from_str(&self, text: &str) -> Result<Decimal, ValueFormatError> {
        let trimmed = text.trim();
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| unparsable(text, PropertyType::Decimal))
    }

    fn create(&self, value: &Value) -> Result<Decimal, ValueFormatError> {
        match value {
            Value::Decimal(d) => Ok(*d),
            Value::Long(v) => Ok(Decimal::from(*v)),
            Value::Double(v) => {
                Decimal::from_f64(*v).ok_or_else(|| conversion(value, PropertyType::Decimal))
            }
            Value::Date(date) => Ok(Decimal::from(date.millis())),
            Value::String(s) => TypeFactory::create_from_str(self, s),
            other => Err(conversion(other, PropertyType::Decimal)),
        }
    }

    fn compare(&self, a: &Decimal, b: &Decimal) -> Ordering {
        a.cmp(b)
    }

    fn as_string(&self, host: &Decimal) -> String {
        host.to_string()
    }

    fn supports_like(&self) -> bool {
        true
    }

    fn to_value(&self, host: Decimal) -> Value {
        Value::Decimal(host)
    }

    fn downcast<'v>(&self, value: &'v Value) -> Option<&'v Decimal> {
        match value {
            Value::Decimal(d) => Some(d),
            _ => None,
        }
    }
}

/// Factory for `DATE` values. Numbers are read as epoch milliseconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct DateFactory;

impl TypeFactory for DateFactory {
    type Host = DateTime;

    fn property_type(&self) -> PropertyType {
        PropertyType::Date
    }

    fn create_from_str(&self, text: &str) -> Result<DateTime, ValueFormatError> {
        DateTime::parse(text).ok_or_else(|| unparsable(text, PropertyType::Date))
    }

    fn create(&self, value: &Value) -> Result<DateTime, ValueFormatError> {
        let millis = match value {
            Value::Date(date) => return Ok(*date),
            Value::String(s) => return TypeFactory::create_from_str(self, s),
            Value::Long(v) => Some(*v),
            Value::Double(v) if v.is_finite() => Decimal::from_f64(v.trunc()).and_then(|d| d.to_i64()),
            Value::Decimal(d) => d.trunc().to_i64(),
            _ => None,
        };
        millis
            .and_then(DateTime::from_millis)
            .ok_or_else(|| conversion(value, PropertyType::Date))
    }

    fn compare(&self, a: &DateTime, b: &DateTime) -> Ordering {
        a.cmp(b)
    }

    fn as_string(&self, host: &DateTime) -> String {
        host.to_string()
    }

    fn supports_like(&self) -> bool {
        false
    }

    fn to_value(&self, host: DateTime) -> Value {
        Value::Date(host)
    }

    fn downcast<'v>(&self, value: &'v Value) -> Option<&'v DateTime> {
        match value {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }
}

/// Factory for `BOOLEAN` values; only `true` and `false` parse.
#[derive(Clone, Copy, Debug, Default)]
pub struct BooleanFactory;

impl TypeFactory for BooleanFactory {
    type Host = bool;

    fn property_type(&self) -> PropertyType {
        PropertyType::Boolean
    }

    fn create_from_str(&self, text: &str) -> Result<bool, ValueFormatError> {
        match text.trim() {
            t if t.eq_ignore_ascii_case("true") => Ok(true),
            t if t.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(unparsable(text, PropertyType::Boolean)),
        }
    }

    fn create(&self, value: &Value) -> Result<bool, ValueFormatError> {
        match value {
            Value::Boolean(v) => Ok(*v),
            Value::String(s) => TypeFactory::create_from_str(self, s),
            other => Err(conversion(other, PropertyType::Boolean)),
        }
    }

    fn compare(&self, a: &bool, b: &bool) -> Ordering {
        a.cmp(b)
    }

    fn as_string(&self, host: &bool) -> String {
        host.to_string()
    }

    fn supports_like(&self) -> bool {
        false
    }

    fn to_value(&self, host: bool) -> Value {
        Value::Boolean(host)
    }

    fn downcast<'v>(&self, value: &'v Value) -> Option<&'v bool> {
        match value {
            Value::Boolean(v) => Some(v),
            _ => None,
        }
    }
}

/// Factory for `NAME` values.
#[derive(Clone, Copy, Debug, Default)]
pub struct NameFactory;

impl TypeFactory for NameFactory {
    type Host = Name;

    fn property_type(&self) -> PropertyType {
        PropertyType::Name
    }

    fn create_from_str(&self, text: &str) -> Result<Name, ValueFormatError> {
        Name::parse(text).ok_or_else(|| unparsable(text, PropertyType::Name))
    }

    fn create(&self, value: &Value) -> Result<Name, ValueFormatError> {
        match value {
            Value::Name(name) => Ok(name.clone()),
            Value::String(s) => TypeFactory::create_from_str(self, s),
            Value::Path(path) if !path.is_absolute() && path.depth() == 1 => path
                .last_segment()
                .and_then(|segment| Name::parse(segment.name()))
                .ok_or_else(|| conversion(value, PropertyType::Name)),
            other => Err(conversion(other, PropertyType::Name)),
        }
    }

    fn compare(&self, a: &Name, b: &Name) -> Ordering {
        a.cmp(b)
    }

    fn as_string(&self, host: &Name) -> String {
        host.to_string()
    }

    fn supports_like(&self) -> bool {
        true
    }

    fn to_value(&self, host: Name) -> Value {
        Value::Name(host)
    }

    fn downcast<'v>(&self, value: &'v Value) -> Option<&'v Name> {
        match value {
            Value::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// Factory for `PATH` values.
#[derive(Clone, Copy, Debug, Default)]
pub struct PathFactory;

impl TypeFactory for PathFactory {
    type Host = Path;

    fn property_type(&self) -> PropertyType {
        PropertyType::Path
    }

    fn create_from_str(&self, text: &str) -> Result<Path, ValueFormatError> {
        Path::parse(text).ok_or_else(|| unparsable(text, PropertyType::Path))
    }

    fn create(&self, value: &Value) -> Result<Path, ValueFormatError> {
        match value {
            Value::Path(path) => Ok(path.clone()),
            Value::Name(name) => Ok(Path::new(false, vec![PathSegment::new(name.to_string())])),
            Value::String(s) => TypeFactory::create_from_str(self, s),
            other => Err(conversion(other, PropertyType::Path)),
        }
    }

    fn compare(&self, a: &Path, b: &Path) -> Ordering {
        a.cmp(b)
    }

    fn as_string(&self, host: &Path) -> String {
        host.to_string()
    }

    fn supports_like(&self) -> bool {
        true
    }

    fn to_value(&self, host: Path) -> Value {
        Value::Path(host)
    }

    fn downcast<'v>(&self, value: &'v Value) -> Option<&'v Path> {
        match value {
            Value::Path(path) => Some(path),
            _ => None,
        }
    }
}

/// Factory for `REFERENCE` and `WEAKREFERENCE` values; ordered by key.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceFactory {
    weak: bool,
}

impl ReferenceFactory {
    /// Factory for hard references.
    pub const HARD: ReferenceFactory = ReferenceFactory { weak: false };
    /// Factory for weak references.
    pub const WEAK: ReferenceFactory = ReferenceFactory { weak: true };
}

impl TypeFactory for ReferenceFactory {
    type Host = Reference;

    fn property_type(&self) -> PropertyType {
        if self.weak {
            PropertyType::WeakReference
        } else {
            PropertyType::Reference
        }
    }

    fn create_from_str(&self, text: &str) -> Result<Reference, ValueFormatError> {
        let key = text.trim();
        if key.is_empty() {
            return Err(unparsable(text, TypeFactory::property_type(self)));
        }
        Ok(Reference::new(key).with_weak(self.weak))
    }

    fn create(&self, value: &Value) -> Result<Reference, ValueFormatError> {
        match value {
            Value::Reference(r) => Ok(r.clone().with_weak(self.weak)),
            Value::String(s) => TypeFactory::create_from_str(self, s),
            other => Err(conversion(other, TypeFactory::property_type(self))),
        }
    }

    fn compare(&self, a: &Reference, b: &Reference) -> Ordering {
        a.key().cmp(b.key())
    }

    fn as_string(&self, host: &Reference) -> String {
        host.key().to_owned()
    }

    fn supports_like(&self) -> bool {
        true
    }

    fn to_value(&self, host: Reference) -> Value {
        Value::Reference(host)
    }

    fn downcast<'v>(&self, value: &'v Value) -> Option<&'v Reference> {
        match value {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }
}

/// Factory for `URI` values.
#[derive(Clone, Copy, Debug, Default)]
pub struct UriFactory;

impl TypeFactory for UriFactory {
    type Host = Url;

    fn property_type(&self) -> PropertyType {
        PropertyType::Uri
    }

    fn create_from_str(&self, text: &str) -> Result<Url, ValueFormatError> {
        Url::parse(text.trim()).map_err(|_| unparsable(text, PropertyType::Uri))
    }

    fn create(&self, value: &Value) -> Result<Url, ValueFormatError> {
        match value {
            Value::Uri(url) => Ok(url.clone()),
            Value::String(s) => TypeFactory::create_from_str(self, s),
            other => Err(conversion(other, PropertyType::Uri)),
        }
    }

    fn compare(&self, a: &Url, b: &Url) -> Ordering {
        a.as_str().cmp(b.as_str())
    }

    fn as_string(&self, host: &Url) -> String {
        host.as_str().to_owned()
    }

    fn supports_like(&self) -> bool {
        true
    }

    fn to_value(&self, host: Url) -> Value {
        Value::Uri(host)
    }

    fn downcast<'v>(&self, value: &'v Value) -> Option<&'v Url> {
        match value {
            Value::Uri(url) => Some(url),
            _ => None,
        }
    }
}
