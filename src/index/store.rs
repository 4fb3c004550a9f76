use std::collections::BTreeMap;
use std::ops::Bound;

use smallvec::SmallVec;

use crate::value::Value;

use super::definition::{IndexDefinition, IndexKind};
use super::staging::Change;
use super::text::TextStats;
use super::NodeKey;

/// Values of one property on one node; most properties hold a single value.
pub(crate) type Values = SmallVec<[Value; 1]>;

type Record = BTreeMap<String, Values>;

#[derive(Clone, Debug)]
enum Layout {
    /// Values of the only column, keyed by node.
    Single {
        property: String,
        rows: BTreeMap<NodeKey, Values>,
    },
    /// One property map per node.
    Multi { rows: BTreeMap<NodeKey, Record> },
}

/// Read view of one node's indexed properties.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Row<'a> {
    Single { property: &'a str, values: &'a Values },
    Multi(&'a Record),
}

impl<'a> Row<'a> {
    /// Values of `property`, empty when the node lacks it.
    pub(crate) fn values(&self, property: &str) -> &'a [Value] {
        match *self {
            Row::Single {
                property: column,
                values,
            } if column == property => values.as_slice(),
            Row::Single { .. } => &[],
            Row::Multi(record) => record.get(property).map(|v| v.as_slice()).unwrap_or(&[]),
        }
    }

    /// Every `(property, values)` pair of the node.
    pub(crate) fn properties(&self) -> Vec<(&'a str, &'a [Value])> {
        match *self {
            Row::Single { property, values } => vec![(property, values.as_slice())],
            Row::Multi(record) => record
                .iter()
                .map(|(property, values)| (property.as_str(), values.as_slice()))
                .collect(),
        }
    }
}

/// Committed contents of an index. Cloned on write only while a cursor still
/// holds the previous version.
#[derive(Clone, Debug)]
pub(crate) struct Snapshot {
    layout: Layout,
    text: Option<TextStats>,
}

impl Snapshot {
    pub(crate) fn empty(definition: &IndexDefinition) -> Self {
        let layout = match (definition.kind(), definition.columns()) {
            (IndexKind::SingleColumn, [column]) => Layout::Single {
                property: column.property().to_owned(),
                rows: BTreeMap::new(),
            },
            _ => Layout::Multi {
                rows: BTreeMap::new(),
            },
        };
        let text = (definition.kind() == IndexKind::Text).then(TextStats::default);
        Self { layout, text }
    }

    /// Number of nodes with at least one value.
    pub(crate) fn len(&self) -> usize {
        match &self.layout {
            Layout::Single { rows, .. } => rows.len(),
            Layout::Multi { rows } => rows.len(),
        }
    }

    pub(crate) fn text_stats(&self) -> Option<&TextStats> {
        self.text.as_ref()
    }

    /// Rows in key order, starting strictly after `after` when given.
    pub(crate) fn rows_after<'a>(
        &'a self,
        after: Option<&NodeKey>,
    ) -> Box<dyn Iterator<Item = (&'a NodeKey, Row<'a>)> + 'a> {
        let lower = after.map_or(Bound::Unbounded, |key| Bound::Excluded(key.clone()));
        match &self.layout {
            Layout::Single { property, rows } => Box::new(
                rows.range((lower, Bound::Unbounded))
                    .map(move |(key, values)| {
                        (
                            key,
                            Row::Single {
                                property: property.as_str(),
                                values,
                            },
                        )
                    }),
            ),
            Layout::Multi { rows } => Box::new(
                rows.range((lower, Bound::Unbounded))
                    .map(|(key, record)| (key, Row::Multi(record))),
            ),
        }
    }

    pub(crate) fn apply(&mut self, change: Change) {
        match change {
            Change::Set {
                key,
                property,
                values,
            } => {
                if values.is_empty() {
                    self.remove_property(&key, &property);
                } else {
                    self.set(key, property, values);
                }
            }
            Change::RemoveProperty { key, property } => self.remove_property(&key, &property),
            Change::RemoveNode { key } => self.remove_node(&key),
        }
    }

    fn set(&mut self, key: NodeKey, property: String, values: Values) {
        if let Some(text) = &mut self.text {
            text.admit(&property, &values);
        }
        let previous = match &mut self.layout {
            Layout::Single { rows, .. } => rows.insert(key, values),
            Layout::Multi { rows } => rows.entry(key).or_default().insert(property.clone(), values),
        };
        if let (Some(text), Some(previous)) = (&mut self.text, previous) {
            text.retract(&property, &previous);
        }
    }

    fn remove_property(&mut self, key: &NodeKey, property: &str) {
        let removed = match &mut self.layout {
            Layout::Single {
                property: column,
                rows,
            } => {
                if column == property {
                    rows.remove(key)
                } else {
                    None
                }
            }
            Layout::Multi { rows } => {
                let Some(record) = rows.get_mut(key) else {
                    return;
                };
                let removed = record.remove(property);
                if record.is_empty() {
                    rows.remove(key);
                }
                removed
            }
        };
        if let (Some(text), Some(removed)) = (&mut self.text, removed) {
            text.retract(property, &removed);
        }
    }

    fn remove_node(&mut self, key: &NodeKey) {
        match &mut self.layout {
            Layout::Single { property, rows } => {
                if let (Some(values), Some(text)) = (rows.remove(key), &mut self.text) {
                    text.retract(property, &values);
                }
            }
            Layout::Multi { rows } => {
                if let Some(record) = rows.remove(key) {
                    if let Some(text) = &mut self.text {
                        for (property, values) in &record {
                            text.retract(property, values);
                        }
                    }
                }
            }
        }
    }
}
