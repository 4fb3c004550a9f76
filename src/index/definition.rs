use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::value::PropertyType;

/// Pseudo-column holding each node's path, used by `PATH(...)` and the
/// same/child/descendant node constraints.
pub const PATH_COLUMN: &str = "jcr:path";
/// Pseudo-column holding each node's name, used by `NAME(...)`.
pub const NAME_COLUMN: &str = "jcr:name";
/// Pseudo-column holding each node's local name, used by `LOCALNAME(...)`.
pub const LOCAL_NAME_COLUMN: &str = "mode:localName";
/// Pseudo-column holding each node's depth, used by `DEPTH(...)`.
pub const DEPTH_COLUMN: &str = "mode:depth";

/// Layout and capabilities of an index.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// One property, values kept inline per node.
    SingleColumn,
    /// Several properties, one record per node.
    MultiColumn,
    /// String properties searched with full-text constraints only.
    Text,
}

/// Indexed property and its declared type.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ColumnDefinition {
    property: String,
    property_type: PropertyType,
}

impl ColumnDefinition {
    /// Declares `property` with `property_type`.
    pub fn new(property: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            property: property.into(),
            property_type,
        }
    }

    /// Property name.
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Declared type.
    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }
}

/// Name, kind and columns of an index. Fixed once the index exists.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    name: String,
    kind: IndexKind,
    columns: Vec<ColumnDefinition>,
}

impl IndexDefinition {
    /// Validates and builds a definition.
    pub fn new(
        name: impl Into<String>,
        kind: IndexKind,
        columns: Vec<ColumnDefinition>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(IndexError::InvalidDefinition("index name is blank".into()));
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(IndexError::InvalidDefinition(format!(
                "index name '{name}' is not a valid file name"
            )));
        }
        if columns.is_empty() {
            return Err(IndexError::InvalidDefinition(format!(
                "index '{name}' declares no columns"
            )));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if column.property.trim().is_empty() {
                return Err(IndexError::InvalidDefinition(format!(
                    "index '{name}' has a blank property name"
                )));
            }
            if !seen.insert(column.property.as_str()) {
                return Err(IndexError::InvalidDefinition(format!(
                    "index '{name}' declares '{}' twice",
                    column.property
                )));
            }
        }
        match kind {
            IndexKind::SingleColumn if columns.len() != 1 => {
                return Err(IndexError::InvalidDefinition(format!(
                    "single-column index '{name}' declares {} columns",
                    columns.len()
                )));
            }
            IndexKind::Text => {
                if let Some(column) = columns
                    .iter()
                    .find(|c| c.property_type != PropertyType::String)
                {
                    return Err(IndexError::InvalidDefinition(format!(
                        "text index '{name}' column '{}' is {}, not STRING",
                        column.property, column.property_type
                    )));
                }
            }
            _ => {}
        }
        Ok(Self {
            name,
            kind,
            columns,
        })
    }

    /// Index over one property.
    pub fn single_column(
        name: impl Into<String>,
        property: impl Into<String>,
        property_type: PropertyType,
    ) -> Result<Self> {
        Self::new(
            name,
            IndexKind::SingleColumn,
            vec![ColumnDefinition::new(property, property_type)],
        )
    }

    /// Index over several properties.
    pub fn multi_column<P: Into<String>>(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (P, PropertyType)>,
    ) -> Result<Self> {
        let columns = columns
            .into_iter()
            .map(|(property, ty)| ColumnDefinition::new(property, ty))
            .collect();
        Self::new(name, IndexKind::MultiColumn, columns)
    }

    /// Full-text index over string properties.
    pub fn text<P: Into<String>>(
        name: impl Into<String>,
        properties: impl IntoIterator<Item = P>,
    ) -> Result<Self> {
        let columns = properties
            .into_iter()
            .map(|property| ColumnDefinition::new(property, PropertyType::String))
            .collect();
        Self::new(name, IndexKind::Text, columns)
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index kind.
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Declared columns.
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Column declared for `property`.
    pub fn column(&self, property: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.property == property)
    }

    /// Column declared for `property`, or [`IndexError::UnknownProperty`].
    pub fn require_column(&self, property: &str) -> Result<&ColumnDefinition> {
        self.column(property)
            .ok_or_else(|| IndexError::UnknownProperty {
                index: self.name.clone(),
                property: property.to_owned(),
            })
    }
}
