use parking_lot::Mutex;

use crate::value::Value;

use super::store::Values;
use super::NodeKey;

/// A single uncommitted mutation.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Change {
    /// Replace every value of `property` on `key`.
    Set {
        key: NodeKey,
        property: String,
        values: Values,
    },
    /// Drop `property` from `key`.
    RemoveProperty { key: NodeKey, property: String },
    /// Drop every property of `key`.
    RemoveNode { key: NodeKey },
}

impl Change {
    /// Replacement of `property`, or its removal when `values` is empty.
    pub(crate) fn set(key: NodeKey, property: String, values: Vec<Value>) -> Self {
        if values.is_empty() {
            Change::RemoveProperty { key, property }
        } else {
            Change::Set {
                key,
                property,
                values: Values::from_vec(values),
            }
        }
    }
}

/// Ordered log of changes waiting for the next commit.
#[derive(Debug, Default)]
pub(crate) struct Staging {
    changes: Mutex<Vec<Change>>,
}

impl Staging {
    pub(crate) fn push(&self, change: Change) {
        self.changes.lock().push(change);
    }

    /// Takes every staged change, leaving the log empty.
    pub(crate) fn drain(&self) -> Vec<Change> {
        std::mem::take(&mut *self.changes.lock())
    }

    /// Puts drained `changes` back ahead of anything staged since.
    pub(crate) fn restore(&self, mut changes: Vec<Change>) {
        let mut staged = self.changes.lock();
        changes.append(&mut staged);
        *staged = changes;
    }

    pub(crate) fn discard(&self) -> usize {
        self.drain().len()
    }

    pub(crate) fn len(&self) -> usize {
        self.changes.lock().len()
    }
}
