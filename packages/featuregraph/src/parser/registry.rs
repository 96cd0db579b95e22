//! Handler registry mapping property kinds to handlers.

use std::collections::{HashMap, HashSet};

use super::handler::{HandlerKind, PropertyHandler};
use super::handlers::{FeatureHandler, GeometryHandler, PrimitiveHandler};
use crate::config::{GML31_NS, GML_NS, STRUCTURAL_PROPERTIES};
use crate::schema::{PropertyType, QName};

/// Registry mapping property kinds to handlers.
///
/// Property elements whose name is marked as skip are ignored entirely.
pub struct PropertyHandlerRegistry {
    handlers: HashMap<HandlerKind, Box<dyn PropertyHandler>>,
    skip_names: HashSet<QName>,
}

impl PropertyHandlerRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            skip_names: HashSet::new(),
        }
    }

    /// Register a handler for the kind it reports.
    pub fn register(&mut self, handler: impl PropertyHandler + 'static) {
        self.handlers.insert(handler.kind(), Box::new(handler));
    }

    /// Mark property names to be skipped.
    pub fn skip(&mut self, names: impl IntoIterator<Item = QName>) {
        self.skip_names.extend(names);
    }

    /// Get the handler for a property slot.
    #[must_use]
    pub fn get_handler(&self, property: &PropertyType) -> Option<&dyn PropertyHandler> {
        self.handlers
            .get(&HandlerKind::from(property.kind))
            .map(|h| h.as_ref())
    }

    #[must_use]
    pub fn should_skip(&self, name: &QName) -> bool {
        self.skip_names.contains(name)
    }

    #[must_use]
    pub fn has_handler(&self, kind: HandlerKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

impl Default for PropertyHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with the built-in handlers.
///
/// Structural GML properties (`boundedBy`, `name`, `description`,
/// `identifier`, ...) in either GML namespace are skipped.
#[must_use]
pub fn create_default_registry() -> PropertyHandlerRegistry {
    let mut registry = PropertyHandlerRegistry::new();

    registry.register(PrimitiveHandler);
    registry.register(GeometryHandler);
    registry.register(FeatureHandler);

    registry.skip(
        STRUCTURAL_PROPERTIES
            .iter()
            .flat_map(|local| [QName::new(GML_NS, *local), QName::new(GML31_NS, *local)]),
    );

    registry
}
