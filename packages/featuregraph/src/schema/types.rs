//! Feature type descriptions.

use std::fmt;
use std::sync::Arc;

/// Namespace-qualified element name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    namespace: String,
    local: String,
}

impl QName {
    /// Create a qualified name. Use an empty namespace for unqualified names.
    #[must_use]
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    /// Namespace URI, empty when unqualified.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Local part of the name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Check namespace and local name at once.
    #[must_use]
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace == namespace && self.local == local
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

/// Concrete kind of a primitive property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    /// Opaque content, kept verbatim.
    Any,
}

impl ScalarKind {
    /// Name used in schema files and error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a nested feature property is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Representation {
    /// Inline content. Past the depth budget this still becomes a link.
    Inline,
    /// By-reference relationship: the target is never inlined.
    Reference,
    /// Inline or by reference; inlined while the depth budget allows.
    #[default]
    Either,
}

/// Value kind of a property slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Primitive(ScalarKind),
    Geometry,
    MultiGeometry,
    Feature(Representation),
}

impl PropertyKind {
    /// Short description for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Primitive(kind) => kind.to_string(),
            Self::Geometry => "geometry".to_string(),
            Self::MultiGeometry => "multi geometry".to_string(),
            Self::Feature(_) => "feature".to_string(),
        }
    }
}

/// Upper cardinality bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl MaxOccurs {
    /// Check whether `count` does not exceed this bound.
    #[must_use]
    pub fn admits(&self, count: usize) -> bool {
        match self {
            Self::Bounded(max) => count <= *max as usize,
            Self::Unbounded => true,
        }
    }
}

impl fmt::Display for MaxOccurs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(max) => write!(f, "{max}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// A named, typed, cardinality-constrained property slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyType {
    pub name: QName,
    pub kind: PropertyKind,
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
}

impl PropertyType {
    /// Create a property slot with cardinality `(1, 1)`.
    #[must_use]
    pub fn new(name: QName, kind: PropertyKind) -> Self {
        Self {
            name,
            kind,
            min_occurs: 1,
            max_occurs: MaxOccurs::Bounded(1),
        }
    }

    /// Set the cardinality.
    #[must_use]
    pub fn with_occurs(mut self, min_occurs: u32, max_occurs: MaxOccurs) -> Self {
        self.min_occurs = min_occurs;
        self.max_occurs = max_occurs;
        self
    }

    /// Check whether `count` occurrences satisfy this slot.
    #[must_use]
    pub fn admits(&self, count: usize) -> bool {
        count >= self.min_occurs as usize && self.max_occurs.admits(count)
    }

    /// Representation for nested features, `None` for other kinds.
    #[must_use]
    pub fn representation(&self) -> Option<Representation> {
        match self.kind {
            PropertyKind::Feature(representation) => Some(representation),
            _ => None,
        }
    }
}

/// Where a feature type came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOrigin {
    /// Declared in a schema registry.
    Declared,
    /// Synthesized from a sample element.
    Synthesized,
    /// Implicit feature collection type.
    Collection,
}

/// Shape of a feature: ordered property slots under a qualified name.
///
/// Immutable once constructed and shared as `Arc<FeatureType>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureType {
    name: QName,
    properties: Vec<PropertyType>,
    origin: TypeOrigin,
}

impl FeatureType {
    /// Create a declared feature type.
    #[must_use]
    pub fn new(name: QName, properties: Vec<PropertyType>) -> Self {
        Self {
            name,
            properties,
            origin: TypeOrigin::Declared,
        }
    }

    /// Create a synthesized feature type.
    #[must_use]
    pub fn synthesized(name: QName, properties: Vec<PropertyType>) -> Self {
        Self {
            name,
            properties,
            origin: TypeOrigin::Synthesized,
        }
    }

    /// Create the implicit type of a feature collection element.
    #[must_use]
    pub fn collection(name: QName) -> Arc<Self> {
        Arc::new(Self {
            name,
            properties: Vec::new(),
            origin: TypeOrigin::Collection,
        })
    }

    #[must_use]
    pub fn name(&self) -> &QName {
        &self.name
    }

    #[must_use]
    pub fn properties(&self) -> &[PropertyType] {
        &self.properties
    }

    #[must_use]
    pub fn origin(&self) -> TypeOrigin {
        self.origin
    }

    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.origin == TypeOrigin::Collection
    }

    /// Look up a property slot by name.
    #[must_use]
    pub fn property(&self, name: &QName) -> Option<&PropertyType> {
        self.properties.iter().find(|p| &p.name == name)
    }
}
