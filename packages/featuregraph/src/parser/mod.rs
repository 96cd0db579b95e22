//! GML/WFS parsing into a feature graph.
//!
//! Property elements are dispatched to registered handlers by the kind of
//! their declared (or synthesized) slot. Parsing builds the graph with
//! same-document references left unresolved; [`ParsedDocument::resolve`]
//! links them in a second pass.

mod context;
mod document;
mod engine;
mod handler;
pub mod handlers;
mod registry;

pub use context::{ParseContext, ParserOptions, PendingMember, UnresolvedRef};
pub use document::ParsedDocument;
pub use engine::{is_feature_collection, parse_document, DocumentParser};
pub use handler::{HandlerKind, PropertyHandler, RecurseFn};
pub use handlers::classify_href;
pub use registry::{create_default_registry, PropertyHandlerRegistry};
