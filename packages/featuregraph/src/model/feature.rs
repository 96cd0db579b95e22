//! Features and their properties.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::PropertyValue;
use crate::geometry::Envelope;
use crate::schema::{FeatureType, QName};

/// Index of a feature in its [`FeatureGraph`](super::FeatureGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureHandle(pub(crate) usize);

impl FeatureHandle {
    #[must_use]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of a property within its feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyRef {
    pub feature: FeatureHandle,
    pub index: usize,
}

/// What holds a feature inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Property(PropertyRef),
    Collection(FeatureHandle),
}

/// Named value of a feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureProperty {
    pub name: QName,
    pub value: PropertyValue,
}

impl FeatureProperty {
    #[must_use]
    pub fn new(name: QName, value: PropertyValue) -> Self {
        Self { name, value }
    }
}

/// Memoized bounding box.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnvelopeCache {
    #[default]
    Dirty,
    Computed(Option<Envelope>),
}

/// Plain feature, collection of members, or collection of fixed-length tuples.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureBody {
    Plain,
    Collection {
        members: Vec<FeatureHandle>,
    },
    TupleCollection {
        tuple_length: usize,
        tuples: Vec<Vec<FeatureHandle>>,
    },
}

/// A typed entity in a [`FeatureGraph`](super::FeatureGraph).
#[derive(Debug)]
pub struct Feature {
    pub(crate) id: Option<String>,
    pub(crate) feature_type: Arc<FeatureType>,
    pub(crate) properties: Vec<FeatureProperty>,
    pub(crate) attributes: BTreeMap<String, String>,
    pub(crate) body: FeatureBody,
    pub(crate) envelope: RefCell<EnvelopeCache>,
    pub(crate) owner: Option<Owner>,
}

impl Feature {
    pub(crate) fn new(feature_type: Arc<FeatureType>, id: Option<String>, body: FeatureBody) -> Self {
        Self {
            id,
            feature_type,
            properties: Vec::new(),
            attributes: BTreeMap::new(),
            body,
            envelope: RefCell::new(EnvelopeCache::Dirty),
            owner: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn feature_type(&self) -> &Arc<FeatureType> {
        &self.feature_type
    }

    #[must_use]
    pub fn name(&self) -> &QName {
        self.feature_type.name()
    }

    #[must_use]
    pub fn properties(&self) -> &[FeatureProperty] {
        &self.properties
    }

    /// Properties with the given name, in document order.
    pub fn properties_named<'a>(
        &'a self,
        name: &'a QName,
    ) -> impl Iterator<Item = &'a FeatureProperty> {
        self.properties.iter().filter(move |p| &p.name == name)
    }

    /// Unqualified XML attributes carried alongside the properties.
    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    #[must_use]
    pub fn body(&self) -> &FeatureBody {
        &self.body
    }

    #[must_use]
    pub fn is_collection(&self) -> bool {
        !matches!(self.body, FeatureBody::Plain)
    }

    #[must_use]
    pub fn owner(&self) -> Option<Owner> {
        self.owner
    }

    /// Current memoized envelope state.
    #[must_use]
    pub fn cached_envelope(&self) -> EnvelopeCache {
        self.envelope.borrow().clone()
    }

    pub(crate) fn store_envelope(&self, envelope: Option<Envelope>) {
        *self.envelope.borrow_mut() = EnvelopeCache::Computed(envelope);
    }

    pub(crate) fn invalidate_envelope(&self) {
        *self.envelope.borrow_mut() = EnvelopeCache::Dirty;
    }
}
