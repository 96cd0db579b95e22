//! Error types for featuregraph.
//!
//! A single `FeatureError` enum serves library consumers. Every variant
//! carries the feature id, property name and/or offending raw value needed
//! to act on it without re-walking the graph. [`FeatureError::category`]
//! maps variants onto the parse / conversion / validation / reference
//! taxonomy. Geometry defects are not errors: see
//! [`crate::validator::GeometryDefect`].

use thiserror::Error;

/// Coarse classification of a [`FeatureError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed document structure. Always aborts the current parse.
    Parse,
    /// A textual value could not be coerced into its declared scalar kind.
    Conversion,
    /// The feature under validation (or export) violates its feature type.
    Validation,
    /// An external reference could not be dereferenced during export.
    Reference,
    /// Invalid schema or runtime configuration.
    Config,
    /// Underlying I/O failure.
    Io,
}

/// Main error type for the featuregraph library.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// Id or reference token violates the identifier grammar.
    #[error("Invalid identifier '{id}' on <{element}>: must not start with a digit or contain ':'")]
    InvalidIdentifier { id: String, element: String },

    /// Two features in one document share an id.
    #[error("Duplicate feature id '{0}'")]
    DuplicateId(String),

    /// A child element is not declared by the feature's type.
    #[error("Unknown property {property} in feature '{feature}'")]
    UnknownProperty { feature: String, property: String },

    /// A property element has the wrong number of child elements.
    #[error("Property {property} in feature '{feature}' has {count} child elements, expected {expected}")]
    ChildCount {
        feature: String,
        property: String,
        count: usize,
        expected: &'static str,
    },

    /// Same-document reference to an id that is never defined.
    #[error("Dangling reference to '{id}' from property {property}")]
    DanglingReference { id: String, property: String },

    /// Relative reference that cannot be made absolute.
    #[error("Cannot resolve reference '{href}' in property {property}: no base URL")]
    UnresolvableReference { href: String, property: String },

    /// A tuple whose length differs from the collection's tuple length.
    #[error("Tuple in collection '{collection}' has {actual} features, expected {expected}")]
    TupleLength {
        collection: String,
        expected: usize,
        actual: usize,
    },

    /// Geometry markup the geometry adapter cannot read.
    #[error("Invalid geometry <{element}>: {message}")]
    InvalidGeometry { element: String, message: String },

    /// An unresolved reference was accessed before the resolution pass ran.
    #[error("Property {property} of feature '{feature}' still references '{target}': resolve() has not run")]
    UnresolvedAccess {
        feature: String,
        property: String,
        target: String,
    },

    /// Text value cannot be converted into the declared scalar kind.
    #[error("Cannot convert '{value}' of property {property} to {kind}")]
    Conversion {
        value: String,
        property: String,
        kind: String,
    },

    /// Occurrence count outside `[min_occurs, max_occurs]`.
    #[error("Property {property} of feature '{feature}' occurs {count} times, allowed {min}..{max}")]
    Cardinality {
        feature: String,
        property: String,
        count: usize,
        min: u32,
        max: String,
    },

    /// Properties out of declared order, or of unknown name.
    #[error("Feature '{feature}' has {actual} properties but only {matched} match the declared order of {feature_type}")]
    PropertyOrder {
        feature: String,
        feature_type: String,
        matched: usize,
        actual: usize,
    },

    /// Property present in the feature but not declared by its type.
    #[error("Property {property} of feature '{feature}' is not declared by {feature_type}")]
    UndeclaredProperty {
        feature: String,
        feature_type: String,
        property: String,
    },

    /// Feature type not present in the registry.
    #[error("No feature type registered for {0}")]
    UnknownFeatureType(String),

    /// Value kind differs from the declared property kind.
    #[error("Property {property} of feature '{feature}': expected {expected}, got {actual}")]
    TypeMismatch {
        feature: String,
        property: String,
        expected: String,
        actual: String,
    },

    /// Two envelopes with different coordinate reference systems were merged.
    #[error("Cannot merge envelopes in {left} and {right}")]
    CrsMismatch { left: String, right: String },

    /// Dereferencing an external reference failed.
    #[error("Failed to dereference {url}: {message}")]
    Reference { url: String, message: String },

    /// HTTP request for an external reference failed.
    #[error("HTTP request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Schema file content is invalid.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Invalid runtime configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error.
    #[error("YAML parsing failed: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl FeatureError {
    /// Classify this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidIdentifier { .. }
            | Self::DuplicateId(_)
            | Self::UnknownProperty { .. }
            | Self::ChildCount { .. }
            | Self::DanglingReference { .. }
            | Self::UnresolvableReference { .. }
            | Self::TupleLength { .. }
            | Self::InvalidGeometry { .. }
            | Self::UnresolvedAccess { .. }
            | Self::XmlParse(_) => ErrorCategory::Parse,
            Self::Conversion { .. } => ErrorCategory::Conversion,
            Self::Cardinality { .. }
            | Self::PropertyOrder { .. }
            | Self::UndeclaredProperty { .. }
            | Self::UnknownFeatureType(_)
            | Self::TypeMismatch { .. }
            | Self::CrsMismatch { .. } => ErrorCategory::Validation,
            Self::Reference { .. } | Self::Http { .. } => ErrorCategory::Reference,
            Self::InvalidSchema(_) | Self::Config(_) | Self::InvalidUrl(_) | Self::Yaml(_) => {
                ErrorCategory::Config
            }
            Self::Io(_) => ErrorCategory::Io,
        }
    }
}

/// Result type alias for featuregraph operations.
pub type Result<T> = std::result::Result<T, FeatureError>;
