//! featuregraph - Geospatial feature graphs with GML/WFS parsing, export and validation.
//!
//! This crate reads GML 3.1/3.2 and WFS 2.0 documents into an in-memory
//! graph of typed features, validates features against declared feature
//! types and writes graphs back as WFS 2.0 / GML 3.2 with `xlink:href`
//! references for shared and cyclic structure.
//!
//! # Example
//!
//! ```
//! use featuregraph::exporter::Exporter;
//! use featuregraph::geometry::GmlGeometryAdapter;
//! use featuregraph::parser::{parse_document, ParserOptions};
//! use featuregraph::schema::FeatureTypeRegistry;
//!
//! let xml = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0"
//!         xmlns:gml="http://www.opengis.net/gml/3.2" xmlns:app="http://example.com/app">
//!     <wfs:member><app:Road gml:id="r1"><app:name>A1</app:name></app:Road></wfs:member>
//! </wfs:FeatureCollection>"#;
//!
//! let registry = FeatureTypeRegistry::new();
//! let doc = parse_document(xml, &registry, &GmlGeometryAdapter, ParserOptions::new()).unwrap();
//! let (out, report) = Exporter::new(&registry, &GmlGeometryAdapter)
//!     .export_to_string(&doc.graph, doc.root)
//!     .unwrap();
//! assert_eq!(report.number_of_features, 1);
//! assert!(out.contains("gml:id=\"r1\""));
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Namespace constants, identifier rules and export settings
//! - [`error`]: Error types and Result alias
//! - [`schema`]: Feature types, the YAML type registry and type synthesis
//! - [`model`]: The feature graph arena, features and property values
//! - [`geometry`]: Geometry values, envelopes and the GML geometry adapter
//! - [`envelope`]: Derived, memoized feature envelopes
//! - [`xml`]: XML navigation helpers and the streaming writer
//! - [`parser`]: Document parser with pluggable property handlers
//! - [`validator`]: Type validation and geometry checks
//! - [`exporter`]: WFS/GML serialization and external dereferencing
//! - [`http`]: HTTP client for external references
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod envelope;
pub mod error;
pub mod exporter;
pub mod geometry;
pub mod http;
pub mod model;
pub mod parser;
pub mod schema;
pub mod validator;
pub mod xml;

// Re-export main entry points
pub use exporter::{ExportReport, Exporter};
pub use parser::{parse_document, ParsedDocument, ParserOptions};
pub use validator::{ValidationReport, Validator};

// Re-export commonly used items
pub use config::ExportConfig;
pub use error::{ErrorCategory, FeatureError, Result};
pub use model::{Feature, FeatureGraph, FeatureHandle, PropertyValue, ScalarValue};
pub use schema::{FeatureType, FeatureTypeLookup, FeatureTypeRegistry, QName};
