use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::{
    BinaryFactory, BooleanFactory, DateFactory, DecimalFactory, DoubleFactory, LongFactory,
    NameFactory, PathFactory, PropertyType, ReferenceFactory, StringFactory, UriFactory, Value,
    ValueFactory, ValueFormatError,
};

/// Registry of value factories keyed by [`PropertyType`].
///
/// [`TypeSystem::new`] registers the standard factory for every type;
/// [`TypeSystem::register`] replaces one.
#[derive(Clone)]
pub struct TypeSystem {
    factories: BTreeMap<PropertyType, Arc<dyn ValueFactory>>,
}

impl TypeSystem {
    /// Creates a type system with the standard factories.
    pub fn new() -> Self {
        let mut factories: BTreeMap<PropertyType, Arc<dyn ValueFactory>> = BTreeMap::new();
        factories.insert(PropertyType::String, Arc::new(StringFactory));
        factories.insert(PropertyType::Binary, Arc::new(BinaryFactory));
        factories.insert(PropertyType::Long, Arc::new(LongFactory));
        factories.insert(PropertyType::Double, Arc::new(DoubleFactory));
        factories.insert(PropertyType::Decimal, Arc::new(DecimalFactory));
        factories.insert(PropertyType::Date, Arc::new(DateFactory));
        factories.insert(PropertyType::Boolean, Arc::new(BooleanFactory));
        factories.insert(PropertyType::Name, Arc::new(NameFactory));
        factories.insert(PropertyType::Path, Arc::new(PathFactory));
        factories.insert(PropertyType::Reference, Arc::new(ReferenceFactory::HARD));
        factories.insert(PropertyType::WeakReference, Arc::new(ReferenceFactory::WEAK));
        factories.insert(PropertyType::Uri, Arc::new(UriFactory));
        Self { factories }
    }

    /// Shared instance holding the standard factories.
    pub fn standard() -> &'static TypeSystem {
        static STANDARD: OnceLock<TypeSystem> = OnceLock::new();
        STANDARD.get_or_init(TypeSystem::new)
    }

    /// Replaces the factory for the type it produces, returning the previous one.
    pub fn register(&mut self, factory: Arc<dyn ValueFactory>) -> Option<Arc<dyn ValueFactory>> {
        self.factories.insert(factory.property_type(), factory)
    }

    /// Factory for `ty`.
    pub fn factory(&self, ty: PropertyType) -> Arc<dyn ValueFactory> {
        match self.factories.get(&ty) {
            Some(factory) => Arc::clone(factory),
            None => standard_factory(ty),
        }
    }

    /// Factory registered under a type name such as `"Long"` (case insensitive).
    pub fn factory_by_name(&self, name: &str) -> Option<Arc<dyn ValueFactory>> {
        PropertyType::from_name(name).map(|ty| self.factory(ty))
    }

    /// Factory for the type of `prototype`.
    pub fn type_factory_for(&self, prototype: &Value) -> Arc<dyn ValueFactory> {
        self.factory(prototype.property_type())
    }

    /// Names of every registered type.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().map(|ty| ty.name())
    }

    /// Converts `value` into `target`.
    pub fn coerce(&self, value: &Value, target: PropertyType) -> Result<Value, ValueFormatError> {
        if value.property_type() == target {
            return Ok(value.clone());
        }
        self.factory(target).create(value)
    }

    /// Type both operands can be compared as: the shared type when equal, the
    /// numeric type that holds both for mixed numbers, and `STRING` otherwise.
    pub fn compatible_type(a: PropertyType, b: PropertyType) -> PropertyType {
        use PropertyType::*;
        match (a, b) {
            _ if a == b => a,
            (Long, Double) | (Double, Long) => Double,
            (Decimal, Long | Double) | (Long | Double, Decimal) => Decimal,
            (Date, Long) | (Long, Date) => Date,
            (Reference, WeakReference) | (WeakReference, Reference) => Reference,
            _ => String,
        }
    }
}

fn standard_factory(ty: PropertyType) -> Arc<dyn ValueFactory> {
    match ty {
        PropertyType::String => Arc::new(StringFactory),
        PropertyType::Binary => Arc::new(BinaryFactory),
        PropertyType::Long => Arc::new(LongFactory),
        PropertyType::Double => Arc::new(DoubleFactory),
        PropertyType::Decimal => Arc::new(DecimalFactory),
        PropertyType::Date => Arc::new(DateFactory),
        PropertyType::Boolean => Arc::new(BooleanFactory),
        PropertyType::Name => Arc::new(NameFactory),
        PropertyType::Path => Arc::new(PathFactory),
        PropertyType::Reference => Arc::new(ReferenceFactory::HARD),
        PropertyType::WeakReference => Arc::new(ReferenceFactory::WEAK),
        PropertyType::Uri => Arc::new(UriFactory),
    }
}

impl Default for TypeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSystem")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
