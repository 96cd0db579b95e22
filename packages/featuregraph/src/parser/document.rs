//! Parse result and the reference resolution pass.

use std::collections::HashMap;

use super::context::{PendingMember, UnresolvedRef};
use crate::error::{FeatureError, Result};
use crate::model::{FeatureGraph, FeatureHandle, PropertyValue};

/// Graph built from one document, plus what is needed to resolve it.
#[derive(Debug)]
pub struct ParsedDocument {
    /// All features of the document.
    pub graph: FeatureGraph,
    /// The document element's feature.
    pub root: FeatureHandle,
    index: HashMap<String, FeatureHandle>,
    unresolved: Vec<UnresolvedRef>,
    pending_members: Vec<PendingMember>,
}

impl ParsedDocument {
    pub(crate) fn new(
        graph: FeatureGraph,
        root: FeatureHandle,
        index: HashMap<String, FeatureHandle>,
        unresolved: Vec<UnresolvedRef>,
        pending_members: Vec<PendingMember>,
    ) -> Self {
        Self {
            graph,
            root,
            index,
            unresolved,
            pending_members,
        }
    }

    /// Feature with the given id in this document.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<FeatureHandle> {
        self.index.get(id).copied()
    }

    /// Number of features carrying an id.
    #[must_use]
    pub fn id_count(&self) -> usize {
        self.index.len()
    }

    /// References and collection members still waiting for [`Self::resolve`].
    #[must_use]
    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len() + self.pending_members.len()
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.unresolved_count() == 0
    }

    /// Replace every same-document reference with its target feature.
    ///
    /// All targets are checked before anything is changed: a dangling
    /// reference leaves the document untouched. Calling this again after
    /// success is a no-op.
    pub fn resolve(&mut self) -> Result<()> {
        for reference in &self.unresolved {
            if !self.index.contains_key(&reference.target) {
                let property = self
                    .graph
                    .property(reference.property)
                    .map(|p| p.name.to_string())
                    .unwrap_or_default();
                return Err(FeatureError::DanglingReference {
                    id: reference.target.clone(),
                    property,
                });
            }
        }
        for member in &self.pending_members {
            if !self.index.contains_key(&member.target) {
                return Err(FeatureError::DanglingReference {
                    id: member.target.clone(),
                    property: format!("member of '{}'", self.graph.feature_id(member.collection)),
                });
            }
        }

        let resolved = self.unresolved.len();
        for reference in std::mem::take(&mut self.unresolved) {
            if let Some(target) = self.index.get(&reference.target) {
                self.graph
                    .set_property_value(reference.property, PropertyValue::Feature(*target));
            }
        }
        for member in std::mem::take(&mut self.pending_members) {
            if let Some(target) = self.index.get(&member.target).copied() {
                if !self.graph.members(member.collection).contains(&target) {
                    self.graph.add_member(member.collection, target)?;
                }
            }
        }

        tracing::debug!(references = resolved, "resolved same-document references");
        Ok(())
    }

    /// Take the graph and root out of a resolved document.
    #[must_use]
    pub fn into_parts(self) -> (FeatureGraph, FeatureHandle) {
        (self.graph, self.root)
    }
}
