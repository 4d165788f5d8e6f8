//! Scoped graph edits.
//!
//! A [`GraphEdit`] snapshots the graph when it is acquired. Mutations made
//! through it are kept by [`GraphEdit::commit`]; dropping the guard without
//! committing restores the snapshot. Observer notifications raised inside an
//! edit are delivered when the outermost edit commits and discarded on
//! rollback.

use std::ops::{Deref, DerefMut};

use log::debug;

use crate::error::GraphError;
use crate::graph::{Graph, GraphSnapshot};

pub struct GraphEdit<'g> {
    graph: &'g mut Graph,
    snapshot: Option<GraphSnapshot>,
    deferred_mark: usize,
}

impl GraphEdit<'_> {
    pub fn commit(mut self) {
        self.snapshot = None;
    }

    /// Same as dropping the guard.
    pub fn rollback(self) {}
}

impl Deref for GraphEdit<'_> {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        &*self.graph
    }
}

impl DerefMut for GraphEdit<'_> {
    fn deref_mut(&mut self) -> &mut Graph {
        &mut *self.graph
    }
}

impl Drop for GraphEdit<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.graph.restore(snapshot);
            self.graph.deferred.truncate(self.deferred_mark);
            debug!("graph edit rolled back");
        }
        self.graph.edit_depth -= 1;
        if self.graph.edit_depth == 0 {
            self.graph.flush_notifications();
        }
    }
}

impl Graph {
    pub fn begin_edit(&mut self) -> GraphEdit<'_> {
        let snapshot = self.snapshot();
        self.edit_depth += 1;
        let deferred_mark = self.deferred.len();
        GraphEdit {
            graph: self,
            snapshot: Some(snapshot),
            deferred_mark,
        }
    }

    /// Run `f` as one edit: committed on `Ok`, rolled back on `Err`.
    pub fn edit<T>(
        &mut self,
        f: impl FnOnce(&mut Graph) -> Result<T, GraphError>,
    ) -> Result<T, GraphError> {
        let mut edit = self.begin_edit();
        let out = f(&mut *edit)?;
        edit.commit();
        Ok(out)
    }

    pub fn in_edit(&self) -> bool {
        self.edit_depth > 0
    }
}
