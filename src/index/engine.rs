use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::IndexOptions;
use crate::error::{IndexError, Result};
use crate::query::model::Constraint;
use crate::value::{TypeSystem, Value};

use super::compile::Compiler;
use super::cursor::{count_matches, drain, Results, SnapshotCursor};
use super::definition::{IndexDefinition, IndexKind};
use super::matcher::Matcher;
use super::persist::SnapshotFile;
use super::staging::{Change, Staging};
use super::store::Snapshot;
use super::text::Bm25;
use super::{Index, IndexConstraints, NodeKey, Parameters};

/// In-memory index over the properties named by its [`IndexDefinition`],
/// optionally persisted as a snapshot file.
///
/// Mutations are staged and become visible atomically on [`Index::commit`].
/// Readers work on the snapshot that was committed when they started and
/// never wait for staged writes.
pub struct PropertyIndex {
    definition: IndexDefinition,
    types: Arc<TypeSystem>,
    options: IndexOptions,
    file: Option<SnapshotFile>,
    staging: Staging,
    committed: RwLock<Arc<Snapshot>>,
    /// Serializes commit, clear and shutdown so snapshots reach disk in
    /// commit order.
    commit_lock: Mutex<()>,
    closed: AtomicBool,
    ever_committed: AtomicBool,
}

impl PropertyIndex {
    /// Opens the index, restoring its snapshot from
    /// `options.storage_directory` when one exists.
    pub fn open(definition: IndexDefinition, options: IndexOptions) -> Result<Self> {
        Self::open_with(definition, options, Arc::new(TypeSystem::new()))
    }

    /// Index without storage, using the standard types.
    pub fn in_memory(definition: IndexDefinition) -> Self {
        Self::build(
            definition,
            IndexOptions::default(),
            Arc::new(TypeSystem::new()),
            None,
            None,
        )
    }

    /// Like [`PropertyIndex::open`] with a caller-supplied type system.
    pub fn open_with(
        definition: IndexDefinition,
        options: IndexOptions,
        types: Arc<TypeSystem>,
    ) -> Result<Self> {
        options.validate()?;
        let file = options
            .storage_directory
            .as_deref()
            .map(|dir| SnapshotFile::new(dir, definition.name()));
        let mut restored = None;
        if let Some(file) = &file {
            if let Some((stored, snapshot)) = file.read(&types)? {
                if stored != definition {
                    return Err(IndexError::DefinitionMismatch(definition.name().to_owned()));
                }
                info!(
                    index = definition.name(),
                    path = %file.path().display(),
                    nodes = snapshot.len(),
                    "index.open.restored"
                );
                restored = Some(snapshot);
            }
        }
        Ok(Self::build(definition, options, types, file, restored))
    }

    fn build(
        definition: IndexDefinition,
        options: IndexOptions,
        types: Arc<TypeSystem>,
        file: Option<SnapshotFile>,
        restored: Option<Snapshot>,
    ) -> Self {
        let ever_committed = restored.is_some();
        let snapshot = restored.unwrap_or_else(|| Snapshot::empty(&definition));
        Self {
            definition,
            types,
            options,
            file,
            staging: Staging::default(),
            committed: RwLock::new(Arc::new(snapshot)),
            commit_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            ever_committed: AtomicBool::new(ever_committed),
        }
    }

    /// Options the index was opened with.
    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Number of staged, uncommitted changes.
    pub fn pending_changes(&self) -> usize {
        self.staging.len()
    }

    /// Every match of `constraints`, drained in batches of
    /// `options().default_batch_size`.
    pub fn filter_all(&self, constraints: &IndexConstraints) -> Result<Vec<(NodeKey, f32)>> {
        let mut results = self.filter(constraints, 0)?;
        Ok(drain(results.as_mut(), self.options.default_batch_size))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(IndexError::Closed(self.definition.name().to_owned()))
        } else {
            Ok(())
        }
    }

    fn compile(&self, constraints: &[Constraint], parameters: &Parameters) -> Result<Matcher> {
        Compiler::new(&self.definition, &self.types, parameters).compile_all(constraints)
    }

    fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.committed.read())
    }

    fn persist(&self, snapshot: &Snapshot, sync: bool) -> Result<()> {
        if let Some(file) = &self.file {
            let bytes = file.write(&self.definition, snapshot, sync)?;
            debug!(
                index = self.definition.name(),
                path = %file.path().display(),
                bytes,
                sync,
                "index.persist"
            );
        }
        Ok(())
    }
}

impl Index for PropertyIndex {
    fn name(&self) -> &str {
        self.definition.name()
    }

    fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    fn kind(&self) -> IndexKind {
        self.definition.kind()
    }

    fn add(&self, key: &NodeKey, property: &str, value: Value) -> Result<()> {
        self.add_values(key, property, vec![value])
    }

    fn add_values(&self, key: &NodeKey, property: &str, values: Vec<Value>) -> Result<()> {
        self.ensure_open()?;
        let column = self.definition.require_column(property)?;
        let values = values
            .iter()
            .map(|value| self.types.coerce(value, column.property_type()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.staging
            .push(Change::set(key.clone(), property.to_owned(), values));
        Ok(())
    }

    fn remove(&self, key: &NodeKey) -> Result<()> {
        self.ensure_open()?;
        self.staging.push(Change::RemoveNode { key: key.clone() });
        Ok(())
    }

    fn remove_property(&self, key: &NodeKey, property: &str) -> Result<()> {
        self.ensure_open()?;
        self.definition.require_column(property)?;
        self.staging.push(Change::RemoveProperty {
            key: key.clone(),
            property: property.to_owned(),
        });
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.ensure_open()?;
        let _guard = self.commit_lock.lock();
        let changes = self.staging.drain();
        let applied = changes.len();
        let mut next = Snapshot::clone(&self.current());
        for change in changes.iter().cloned() {
            next.apply(change);
        }
        // Readers only see the snapshot once it is stored.
        if let Err(err) = self.persist(&next, self.options.sync_on_commit) {
            self.staging.restore(changes);
            warn!(
                index = self.definition.name(),
                changes = applied,
                error = %err,
                "index.commit.failed"
            );
            return Err(err);
        }
        let snapshot = Arc::new(next);
        *self.committed.write() = Arc::clone(&snapshot);
        self.ever_committed.store(true, Ordering::Release);
        debug!(
            index = self.definition.name(),
            changes = applied,
            nodes = snapshot.len(),
            "index.commit"
        );
        Ok(())
    }

    fn clear_all_data(&self) -> Result<()> {
        self.ensure_open()?;
        let _guard = self.commit_lock.lock();
        let discarded = self.staging.discard();
        let empty = Arc::new(Snapshot::empty(&self.definition));
        let stored = self.file.as_ref().is_some_and(SnapshotFile::exists);
        if stored || self.ever_committed.load(Ordering::Acquire) {
            self.persist(&empty, self.options.sync_on_commit)?;
        }
        *self.committed.write() = empty;
        info!(
            index = self.definition.name(),
            discarded,
            "index.clear"
        );
        Ok(())
    }

    fn shutdown(&self, persist: bool) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(IndexError::Closed(self.definition.name().to_owned()));
        }
        let _guard = self.commit_lock.lock();
        let discarded = self.staging.discard();
        if persist && self.ever_committed.load(Ordering::Acquire) {
            self.persist(&self.current(), true)?;
        }
        info!(
            index = self.definition.name(),
            persist,
            discarded,
            "index.shutdown"
        );
        Ok(())
    }

    fn estimate_total_count(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.current().len())
    }

    fn requires_reindexing(&self) -> bool {
        !self.ever_committed.load(Ordering::Acquire)
    }

    fn estimate_cardinality(
        &self,
        constraints: &[Constraint],
        parameters: &Parameters,
    ) -> Result<usize> {
        self.ensure_open()?;
        let matcher = self.compile(constraints, parameters)?;
        Ok(count_matches(
            &self.current(),
            &matcher,
            Bm25::new(self.options.text),
        ))
    }

    fn filter(
        &self,
        constraints: &IndexConstraints,
        cardinality_hint: usize,
    ) -> Result<Box<dyn Results>> {
        self.ensure_open()?;
        let matcher = self.compile(&constraints.constraints, &constraints.parameters)?;
        let snapshot = self.current();
        debug!(
            index = self.definition.name(),
            constraints = constraints.constraints.len(),
            cardinality_hint,
            nodes = snapshot.len(),
            "index.filter"
        );
        Ok(Box::new(SnapshotCursor::new(
            snapshot,
            matcher,
            Bm25::new(self.options.text),
        )))
    }
}

impl std::fmt::Debug for PropertyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyIndex")
            .field("definition", &self.definition)
            .field("storage", &self.file.as_ref().map(SnapshotFile::path))
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
