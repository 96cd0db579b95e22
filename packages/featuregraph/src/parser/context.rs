//! Parse options and the mutable state threaded through a parse.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use roxmltree::Node;
use url::Url;

use super::document::ParsedDocument;
use crate::error::{FeatureError, Result};
use crate::geometry::GeometryAdapter;
use crate::model::{FeatureGraph, FeatureHandle, PropertyRef};
use crate::schema::{synthesize_feature_type, widen_feature_type, FeatureType, QName};
use crate::xml::{find_gml_child, qualified_name};

/// Options controlling a parse.
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    /// Guess integer and float kinds for primitive properties of
    /// synthesized types; otherwise they are strings.
    pub guess_simple_types: bool,
    /// Document URL, used to absolutize relative references.
    pub base_url: Option<Url>,
    /// CRS for geometries without an `srsName` and no `boundedBy` above them.
    pub default_srs: Option<String>,
}

impl ParserOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_guess_simple_types(mut self, guess: bool) -> Self {
        self.guess_simple_types = guess;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    #[must_use]
    pub fn with_default_srs(mut self, srs_name: impl Into<String>) -> Self {
        self.default_srs = Some(srs_name.into());
        self
    }
}

/// Same-document reference recorded during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRef {
    pub property: PropertyRef,
    pub target: String,
}

/// Collection member given by `xlink:href` instead of inline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMember {
    pub collection: FeatureHandle,
    pub target: String,
}

/// State of one parse session.
pub struct ParseContext<'a> {
    pub(crate) adapter: &'a dyn GeometryAdapter,
    pub(crate) options: &'a ParserOptions,

    /// Features parsed so far.
    pub graph: FeatureGraph,

    index: HashMap<String, FeatureHandle>,
    pub(crate) unresolved: Vec<UnresolvedRef>,
    pub(crate) pending_members: Vec<PendingMember>,
    counter: usize,
    srs_stack: Vec<String>,
    synthesized: HashMap<QName, Arc<FeatureType>>,
    collection_types: HashMap<QName, Arc<FeatureType>>,
}

impl<'a> ParseContext<'a> {
    #[must_use]
    pub fn new(adapter: &'a dyn GeometryAdapter, options: &'a ParserOptions) -> Self {
        Self {
            adapter,
            options,
            graph: FeatureGraph::new(),
            index: HashMap::new(),
            unresolved: Vec::new(),
            pending_members: Vec::new(),
            counter: 0,
            srs_stack: Vec::new(),
            synthesized: HashMap::new(),
            collection_types: HashMap::new(),
        }
    }

    /// CRS applying to geometries without their own `srsName`.
    #[must_use]
    pub fn default_srs(&self) -> Option<&str> {
        self.srs_stack
            .last()
            .map(String::as_str)
            .or(self.options.default_srs.as_deref())
    }

    /// Generate an id for an element that carries none.
    pub fn next_id(&mut self, local_name: &str) -> String {
        self.counter += 1;
        format!("{local_name}{}", self.counter)
    }

    /// Record a feature id. Ids are unique per document.
    pub fn register_id(&mut self, id: String, handle: FeatureHandle) -> Result<()> {
        if self.index.contains_key(&id) {
            return Err(FeatureError::DuplicateId(id));
        }
        self.index.insert(id, handle);
        Ok(())
    }

    /// Push the CRS of a `gml:boundedBy/gml:Envelope` child, if any.
    ///
    /// Returns whether something was pushed; pair with [`Self::pop_srs`].
    pub fn push_bounded_by(&mut self, node: Node<'_, '_>) -> bool {
        let srs_name = find_gml_child(node, "boundedBy")
            .and_then(|b| find_gml_child(b, "Envelope"))
            .and_then(|e| e.attribute("srsName"));
        match srs_name {
            Some(srs_name) => {
                self.srs_stack.push(srs_name.to_string());
                true
            }
            None => false,
        }
    }

    pub fn pop_srs(&mut self) {
        self.srs_stack.pop();
    }

    /// Synthesized type for an element, widened by this instance if needed.
    pub fn synthesized_type(&mut self, node: Node<'_, '_>) -> Arc<FeatureType> {
        let guess = self.options.guess_simple_types;
        let name = qualified_name(node);
        match self.synthesized.get(&name) {
            Some(existing) => match widen_feature_type(existing, node, guess) {
                Some(widened) => {
                    tracing::debug!(feature_type = %name, "widened synthesized feature type");
                    let widened = Arc::new(widened);
                    self.synthesized.insert(name, Arc::clone(&widened));
                    widened
                }
                None => Arc::clone(existing),
            },
            None => {
                tracing::debug!(feature_type = %name, "synthesized feature type");
                let synthesized = Arc::new(synthesize_feature_type(node, guess));
                self.synthesized.insert(name, Arc::clone(&synthesized));
                synthesized
            }
        }
    }

    /// Shared implicit type for a collection element name.
    pub fn collection_type(&mut self, name: &QName) -> Arc<FeatureType> {
        Arc::clone(
            self.collection_types
                .entry(name.clone())
                .or_insert_with(|| FeatureType::collection(name.clone())),
        )
    }

    pub(crate) fn into_document(self, root: FeatureHandle) -> ParsedDocument {
        ParsedDocument::new(
            self.graph,
            root,
            self.index,
            self.unresolved,
            self.pending_members,
        )
    }
}

impl fmt::Debug for ParseContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseContext")
            .field("options", &self.options)
            .field("features", &self.graph.len())
            .field("ids", &self.index.len())
            .field("unresolved", &self.unresolved.len())
            .field("srs_stack", &self.srs_stack)
            .finish()
    }
}
