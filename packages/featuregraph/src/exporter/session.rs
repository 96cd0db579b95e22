//! State of one export call.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::FeatureError;
use crate::model::{FeatureGraph, FeatureHandle};
use crate::parser::ParsedDocument;

/// A feature of the exported graph (`document: None`) or of a fetched
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct FeatureKey {
    pub(crate) document: Option<String>,
    pub(crate) handle: FeatureHandle,
}

impl FeatureKey {
    pub(crate) fn local(handle: FeatureHandle) -> Self {
        Self {
            document: None,
            handle,
        }
    }
}

/// Emitted features, local references and fetched documents of one pass.
///
/// Created fresh for every pass so repeated exports of one graph do not
/// influence each other.
#[derive(Debug)]
pub(crate) struct ExportSession {
    /// Whether external references within the depth budget are fetched.
    pub(crate) dereference: bool,
    emitted: HashSet<FeatureKey>,
    /// Feature each `gml:id` of the output belongs to. Ids of the exported
    /// graph are reserved up front, whether or not they get written.
    id_owners: HashMap<String, FeatureKey>,
    local_refs: Vec<FeatureHandle>,
    referenced: HashSet<FeatureHandle>,
    /// Out-of-band features written with content at the root.
    pub(crate) root_out_of_band: Vec<FeatureHandle>,
    pub(crate) reference_errors: Vec<FeatureError>,
    documents: HashMap<String, Rc<ParsedDocument>>,
}

impl ExportSession {
    pub(crate) fn new(dereference: bool, graph: &FeatureGraph) -> Self {
        let id_owners = graph
            .handles()
            .map(|h| (graph.feature_id(h), FeatureKey::local(h)))
            .collect();
        Self {
            dereference,
            emitted: HashSet::new(),
            id_owners,
            local_refs: Vec::new(),
            referenced: HashSet::new(),
            root_out_of_band: Vec::new(),
            reference_errors: Vec::new(),
            documents: HashMap::new(),
        }
    }

    pub(crate) fn is_emitted(&self, key: &FeatureKey) -> bool {
        self.emitted.contains(key)
    }

    /// Whether `key` may be written with `gml:id="{id}"`.
    pub(crate) fn may_use_id(&self, id: &str, key: &FeatureKey) -> bool {
        self.id_owners.get(id).is_none_or(|owner| owner == key)
    }

    /// Mark a feature as written with content under `id`.
    pub(crate) fn mark_emitted(&mut self, key: FeatureKey, id: &str) {
        self.id_owners
            .entry(id.to_string())
            .or_insert_with(|| key.clone());
        self.emitted.insert(key);
    }

    /// Record a `#id` reference to a feature of the exported graph.
    pub(crate) fn record_local(&mut self, handle: FeatureHandle) {
        if self.referenced.insert(handle) {
            self.local_refs.push(handle);
        }
    }

    /// Locally referenced features that were never written with content,
    /// in order of first reference.
    pub(crate) fn missing(&self) -> Vec<FeatureHandle> {
        self.local_refs
            .iter()
            .copied()
            .filter(|h| !self.emitted.contains(&FeatureKey::local(*h)))
            .collect()
    }

    pub(crate) fn document(&self, url: &str) -> Option<Rc<ParsedDocument>> {
        self.documents.get(url).cloned()
    }

    pub(crate) fn store_document(&mut self, url: String, document: Rc<ParsedDocument>) {
        self.documents.insert(url, document);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schema::{FeatureType, QName};

    fn graph_with(ids: &[&str]) -> FeatureGraph {
        let mut graph = FeatureGraph::new();
        let ft = Arc::new(FeatureType::synthesized(
            QName::new("http://example.com/app", "Owner"),
            Vec::new(),
        ));
        for id in ids {
            graph.add_feature(Arc::clone(&ft), Some((*id).to_string()));
        }
        graph
    }

    #[test]
    fn test_missing_keeps_reference_order() {
        let graph = graph_with(&["f0", "f1", "f2"]);
        let mut session = ExportSession::new(false, &graph);
        session.record_local(FeatureHandle(2));
        session.record_local(FeatureHandle(0));
        session.record_local(FeatureHandle(2));
        session.record_local(FeatureHandle(1));
        session.mark_emitted(FeatureKey::local(FeatureHandle(0)), "f0");

        assert_eq!(session.missing(), vec![FeatureHandle(2), FeatureHandle(1)]);
    }

    #[test]
    fn test_local_ids_are_reserved() {
        let graph = graph_with(&["o1"]);
        let mut session = ExportSession::new(false, &graph);
        let remote = FeatureKey {
            document: Some("https://other.example/owners.xml".to_string()),
            handle: FeatureHandle(0),
        };

        assert!(!session.may_use_id("o1", &remote));
        assert!(session.may_use_id("o1", &FeatureKey::local(FeatureHandle(0))));

        // Same handle in a fetched document is a different feature
        session.mark_emitted(remote.clone(), "o2");
        assert!(session.is_emitted(&remote));
        assert!(!session.is_emitted(&FeatureKey::local(FeatureHandle(0))));
        assert!(session.may_use_id("o2", &remote));
    }
}
