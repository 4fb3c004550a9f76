use crate::value::Value;

use super::command::Subquery;
use super::{non_blank, ModelError, SelectorName};

/// Literal value operand.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Literal {
    value: Value,
}

impl Literal {
    /// Wraps a value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// The wrapped value.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Reference to a value bound at execution time, rendered as `$name`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct BindVariableName {
    name: String,
}

impl BindVariableName {
    /// Creates a bind variable reference; the name must be non-blank.
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        Ok(Self {
            name: non_blank(name.into(), "variable name")?,
        })
    }

    /// Variable name without the `$`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Operand whose value does not depend on the row being evaluated.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum StaticOperand {
    /// Literal value.
    Literal(Literal),
    /// Bind variable.
    BindVariable(BindVariableName),
    /// Nested query producing values.
    Subquery(Subquery),
}

impl StaticOperand {
    /// Literal operand.
    pub fn literal(value: impl Into<Value>) -> Self {
        StaticOperand::Literal(Literal::new(value))
    }

    /// Bind variable operand.
    pub fn variable(name: impl Into<String>) -> Result<Self, ModelError> {
        BindVariableName::new(name).map(StaticOperand::BindVariable)
    }
}

impl From<Literal> for StaticOperand {
    fn from(value: Literal) -> Self {
        StaticOperand::Literal(value)
    }
}

impl From<BindVariableName> for StaticOperand {
    fn from(value: BindVariableName) -> Self {
        StaticOperand::BindVariable(value)
    }
}

impl From<Subquery> for StaticOperand {
    fn from(value: Subquery) -> Self {
        StaticOperand::Subquery(value)
    }
}

/// Value of a named property on the selected node.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PropertyValue {
    selector: SelectorName,
    property: String,
}

impl PropertyValue {
    /// Creates the operand; the property name must be non-blank.
    pub fn new(selector: SelectorName, property: impl Into<String>) -> Result<Self, ModelError> {
        Ok(Self {
            selector,
            property: non_blank(property.into(), "property name")?,
        })
    }

    /// Selector.
    pub fn selector(&self) -> &SelectorName {
        &self.selector
    }

    /// Property name.
    pub fn property(&self) -> &str {
        &self.property
    }
}

/// Reference values of one property, or of every reference property when unnamed.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ReferenceValue {
    selector: SelectorName,
    property: Option<String>,
}

impl ReferenceValue {
    /// Any reference property of the selected node.
    pub fn any(selector: SelectorName) -> Self {
        Self {
            selector,
            property: None,
        }
    }

    /// A specific reference property.
    pub fn property_of(
        selector: SelectorName,
        property: impl Into<String>,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            selector,
            property: Some(non_blank(property.into(), "property name")?),
        })
    }

    /// Selector.
    pub fn selector(&self) -> &SelectorName {
        &self.selector
    }

    /// Property name, absent for any reference property.
    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }
}

/// `LENGTH(selector.property)`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Length {
    property_value: PropertyValue,
}

impl Length {
    /// Length of a property value.
    pub fn new(property_value: PropertyValue) -> Self {
        Self { property_value }
    }

    /// Measured property.
    pub fn property_value(&self) -> &PropertyValue {
        &self.property_value
    }

    /// Selector of the measured property.
    pub fn selector(&self) -> &SelectorName {
        self.property_value.selector()
    }
}

/// `LOWER(operand)`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct LowerCase {
    operand: Box<DynamicOperand>,
}

impl LowerCase {
    /// Lower-cases the string form of `operand`.
    pub fn new(operand: DynamicOperand) -> Self {
        Self {
            operand: Box::new(operand),
        }
    }

    /// Wrapped operand.
    pub fn operand(&self) -> &DynamicOperand {
        &self.operand
    }
}

/// `UPPER(operand)`
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct UpperCase {
    operand: Box<DynamicOperand>,
}

impl UpperCase {
    /// Upper-cases the string form of `operand`.
    pub fn new(operand: DynamicOperand) -> Self {
        Self {
            operand: Box::new(operand),
        }
    }

    /// Wrapped operand.
    pub fn operand(&self) -> &DynamicOperand {
        &self.operand
    }
}

macro_rules! selector_operand {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, Eq, PartialEq, Hash)]
        pub struct $name {
            selector: SelectorName,
        }

        impl $name {
            /// Creates the operand for `selector`.
            pub fn new(selector: SelectorName) -> Self {
                Self { selector }
            }

            /// Selector.
            pub fn selector(&self) -> &SelectorName {
                &self.selector
            }
        }
    };
}

selector_operand!(
    /// `DEPTH(selector)`: number of path segments of the node.
    NodeDepth
);
selector_operand!(
    /// `PATH(selector)`
    NodePath
);
selector_operand!(
    /// `NAME(selector)`
    NodeName
);
selector_operand!(
    /// `LOCALNAME(selector)`
    NodeLocalName
);
selector_operand!(
    /// `SCORE(selector)`: full-text relevance of the row.
    FullTextSearchScore
);

/// Operand evaluated against each row.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum DynamicOperand {
    /// Property value.
    PropertyValue(PropertyValue),
    /// Reference property value.
    ReferenceValue(ReferenceValue),
    /// Length of a property value.
    Length(Length),
    /// Lower-cased operand.
    LowerCase(LowerCase),
    /// Upper-cased operand.
    UpperCase(UpperCase),
    /// Node depth.
    NodeDepth(NodeDepth),
    /// Node path.
    NodePath(NodePath),
    /// Node name.
    NodeName(NodeName),
    /// Node local name.
    NodeLocalName(NodeLocalName),
    /// Full-text score.
    FullTextSearchScore(FullTextSearchScore),
}

impl DynamicOperand {
    /// The one selector this operand reads from.
    pub fn selector_name(&self) -> &SelectorName {
        let mut operand = self;
        loop {
            match operand {
                DynamicOperand::PropertyValue(v) => return v.selector(),
                DynamicOperand::ReferenceValue(v) => return v.selector(),
                DynamicOperand::Length(v) => return v.selector(),
                DynamicOperand::LowerCase(v) => operand = v.operand(),
                DynamicOperand::UpperCase(v) => operand = v.operand(),
                DynamicOperand::NodeDepth(v) => return v.selector(),
                DynamicOperand::NodePath(v) => return v.selector(),
                DynamicOperand::NodeName(v) => return v.selector(),
                DynamicOperand::NodeLocalName(v) => return v.selector(),
                DynamicOperand::FullTextSearchScore(v) => return v.selector(),
            }
        }
    }
}

impl DynamicOperand {
    fn vacant() -> Self {
        DynamicOperand::NodeDepth(NodeDepth::new(SelectorName::vacant()))
    }
}

impl Drop for DynamicOperand {
    fn drop(&mut self) {
        super::drop_tree(self, |operand, pending| {
            let inner = match operand {
                DynamicOperand::LowerCase(LowerCase { operand })
                | DynamicOperand::UpperCase(UpperCase { operand }) => operand,
                _ => return,
            };
            if matches!(
                **inner,
                DynamicOperand::LowerCase(_) | DynamicOperand::UpperCase(_)
            ) {
                pending.push(std::mem::replace(&mut **inner, DynamicOperand::vacant()));
            }
        });
    }
}

macro_rules! dynamic_from {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for DynamicOperand {
                fn from(value: $variant) -> Self {
                    DynamicOperand::$variant(value)
                }
            }
        )*
    };
}

dynamic_from!(
    PropertyValue,
    ReferenceValue,
    Length,
    LowerCase,
    UpperCase,
    NodeDepth,
    NodePath,
    NodeName,
    NodeLocalName,
    FullTextSearchScore,
);
