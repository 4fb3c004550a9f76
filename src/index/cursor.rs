use std::sync::Arc;

use super::matcher::{Matcher, Scorer};
use super::store::Snapshot;
use super::text::Bm25;
use super::NodeKey;

/// A batch of matching nodes in key order with their scores.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultBatch {
    keys: Vec<NodeKey>,
    scores: Vec<f32>,
}

impl ResultBatch {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            scores: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, key: NodeKey, score: f32) {
        self.keys.push(key);
        self.scores.push(score);
    }

    /// Matching node keys.
    pub fn keys(&self) -> &[NodeKey] {
        &self.keys
    }

    /// Score of each key, in `(0, 1]`.
    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    /// Number of rows in the batch.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// An empty batch signals the end of the results.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `(key, score)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeKey, f32)> + '_ {
        self.keys.iter().zip(self.scores.iter().copied())
    }
}

/// Lazy, single-pass stream of filter results.
pub trait Results: Send {
    /// Returns up to `max` further results; an empty batch means the
    /// results are exhausted. A `max` of zero is treated as one.
    fn next_batch(&mut self, max: usize) -> ResultBatch;
}

/// Cursor over the snapshot that was committed when `filter` was called.
pub(crate) struct SnapshotCursor {
    snapshot: Arc<Snapshot>,
    matcher: Matcher,
    bm25: Bm25,
    last: Option<NodeKey>,
    exhausted: bool,
}

impl SnapshotCursor {
    pub(crate) fn new(snapshot: Arc<Snapshot>, matcher: Matcher, bm25: Bm25) -> Self {
        Self {
            snapshot,
            matcher,
            bm25,
            last: None,
            exhausted: false,
        }
    }
}

impl Results for SnapshotCursor {
    fn next_batch(&mut self, max: usize) -> ResultBatch {
        let max = max.max(1);
        let mut batch = ResultBatch::with_capacity(max.min(1024));
        if self.exhausted {
            return batch;
        }
        let scorer = Scorer {
            text: self.snapshot.text_stats(),
            bm25: self.bm25,
        };
        let mut scanned_last = None;
        let mut rows = self.snapshot.rows_after(self.last.as_ref());
        loop {
            let Some((key, row)) = rows.next() else {
                self.exhausted = true;
                break;
            };
            scanned_last = Some(key);
            if let Some(score) = self.matcher.eval(row, &scorer) {
                batch.push(key.clone(), score);
                if batch.len() == max {
                    break;
                }
            }
        }
        if let Some(key) = scanned_last {
            self.last = Some(key.clone());
        }
        batch
    }
}

/// Counts every row of `snapshot` accepted by `matcher`.
pub(crate) fn count_matches(snapshot: &Snapshot, matcher: &Matcher, bm25: Bm25) -> usize {
    let scorer = Scorer {
        text: snapshot.text_stats(),
        bm25,
    };
    snapshot
        .rows_after(None)
        .filter(|(_, row)| matcher.eval(*row, &scorer).is_some())
        .count()
}

/// Pulls every remaining result from `results`, `batch_size` at a time.
pub fn drain(results: &mut dyn Results, batch_size: usize) -> Vec<(NodeKey, f32)> {
    let mut all = Vec::new();
    loop {
        let batch = results.next_batch(batch_size);
        if batch.is_empty() {
            return all;
        }
        all.extend(batch.iter().map(|(key, score)| (key.clone(), score)));
    }
}
