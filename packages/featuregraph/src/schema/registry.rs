//! Feature type registry backed by a YAML schema file.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::types::{
    FeatureType, MaxOccurs, PropertyKind, PropertyType, QName, Representation, ScalarKind,
};
use crate::error::{FeatureError, Result};

/// Source of declared feature types.
pub trait FeatureTypeLookup {
    /// Return the declared type for an element name, if any.
    fn feature_type_for(&self, name: &QName) -> Option<Arc<FeatureType>>;

    /// Preferred `(prefix, namespace)` pairs for output documents.
    fn namespace_prefixes(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Feature types keyed by qualified name.
#[derive(Debug, Clone, Default)]
pub struct FeatureTypeRegistry {
    types: HashMap<QName, Arc<FeatureType>>,
    namespaces: BTreeMap<String, String>,
}

/// Schema file layout.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlSchema {
    #[serde(default)]
    namespaces: BTreeMap<String, String>,
    feature_types: Vec<YamlFeatureType>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlFeatureType {
    name: String,
    #[serde(default)]
    properties: Vec<YamlProperty>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct YamlProperty {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default = "default_min_occurs")]
    min_occurs: u32,
    #[serde(default)]
    max_occurs: Option<YamlMaxOccurs>,
    #[serde(default)]
    representation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YamlMaxOccurs {
    Count(u32),
    Word(String),
}

fn default_min_occurs() -> u32 {
    1
}

impl FeatureTypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a feature type.
    pub fn register(&mut self, feature_type: FeatureType) {
        self.types
            .insert(feature_type.name().clone(), Arc::new(feature_type));
    }

    /// Declare a namespace prefix used in schema names and output documents.
    pub fn add_namespace(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.namespaces.insert(prefix.into(), namespace.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over registered types in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FeatureType>> {
        let mut types: Vec<_> = self.types.values().collect();
        types.sort_by(|a, b| a.name().cmp(b.name()));
        types.into_iter()
    }

    /// Parse a registry from a YAML schema document.
    ///
    /// # Examples
    /// ```
    /// use featuregraph::schema::{FeatureTypeLookup, FeatureTypeRegistry, QName};
    ///
    /// let yaml = r#"
    /// namespaces:
    ///   app: http://example.com/app
    /// feature_types:
    ///   - name: app:Road
    ///     properties:
    ///       - { name: app:name, type: string }
    /// "#;
    /// let registry = FeatureTypeRegistry::from_yaml_str(yaml).unwrap();
    /// let road = QName::new("http://example.com/app", "Road");
    /// assert!(registry.feature_type_for(&road).is_some());
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let schema: YamlSchema = serde_yaml_ng::from_str(yaml)?;
        let mut registry = Self::new();
        for (prefix, namespace) in &schema.namespaces {
            registry.add_namespace(prefix.clone(), namespace.clone());
        }

        for declared in schema.feature_types {
            let name = registry.resolve_name(&declared.name)?;
            let mut properties: Vec<PropertyType> = Vec::with_capacity(declared.properties.len());
            for property in declared.properties {
                let property = registry.convert_property(property)?;
                if properties.iter().any(|p| p.name == property.name) {
                    return Err(FeatureError::InvalidSchema(format!(
                        "property {} declared twice in {}",
                        property.name, name
                    )));
                }
                properties.push(property);
            }
            if registry.types.contains_key(&name) {
                return Err(FeatureError::InvalidSchema(format!(
                    "feature type {name} declared twice"
                )));
            }
            registry.register(FeatureType::new(name, properties));
        }

        tracing::debug!(types = registry.len(), "loaded feature type registry");
        Ok(registry)
    }

    /// Load a registry from a YAML schema file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Resolve `prefix:local` against the declared namespaces.
    fn resolve_name(&self, name: &str) -> Result<QName> {
        match name.split_once(':') {
            Some((prefix, local)) => {
                let namespace = self.namespaces.get(prefix).ok_or_else(|| {
                    FeatureError::InvalidSchema(format!("undeclared namespace prefix in '{name}'"))
                })?;
                Ok(QName::new(namespace.clone(), local))
            }
            None => Ok(QName::new("", name)),
        }
    }

    fn convert_property(&self, property: YamlProperty) -> Result<PropertyType> {
        let name = self.resolve_name(&property.name)?;
        let representation = match property.representation.as_deref() {
            None | Some("either") => Representation::Either,
            Some("inline") => Representation::Inline,
            Some("reference") => Representation::Reference,
            Some(other) => {
                return Err(FeatureError::InvalidSchema(format!(
                    "unknown representation '{other}' for {name}"
                )))
            }
        };
        let kind = match property.kind.as_str() {
            "string" => PropertyKind::Primitive(ScalarKind::String),
            "integer" | "int" | "long" => PropertyKind::Primitive(ScalarKind::Integer),
            "float" | "double" | "decimal" => PropertyKind::Primitive(ScalarKind::Float),
            "boolean" => PropertyKind::Primitive(ScalarKind::Boolean),
            "date" => PropertyKind::Primitive(ScalarKind::Date),
            "dateTime" | "datetime" => PropertyKind::Primitive(ScalarKind::DateTime),
            "any" => PropertyKind::Primitive(ScalarKind::Any),
            "geometry" => PropertyKind::Geometry,
            "multi_geometry" | "multiGeometry" => PropertyKind::MultiGeometry,
            "feature" => PropertyKind::Feature(representation),
            other => {
                return Err(FeatureError::InvalidSchema(format!(
                    "unknown property type '{other}' for {name}"
                )))
            }
        };
        let max_occurs = match property.max_occurs {
            None => MaxOccurs::Bounded(1),
            Some(YamlMaxOccurs::Count(count)) => MaxOccurs::Bounded(count),
            Some(YamlMaxOccurs::Word(word)) if word == "unbounded" => MaxOccurs::Unbounded,
            Some(YamlMaxOccurs::Word(word)) => {
                return Err(FeatureError::InvalidSchema(format!(
                    "invalid max_occurs '{word}' for {name}"
                )))
            }
        };
        if let MaxOccurs::Bounded(max) = max_occurs {
            if max < property.min_occurs {
                return Err(FeatureError::InvalidSchema(format!(
                    "max_occurs {max} is below min_occurs {} for {name}",
                    property.min_occurs
                )));
            }
        }
        Ok(PropertyType::new(name, kind).with_occurs(property.min_occurs, max_occurs))
    }
}

impl FeatureTypeLookup for FeatureTypeRegistry {
    fn feature_type_for(&self, name: &QName) -> Option<Arc<FeatureType>> {
        self.types.get(name).cloned()
    }

    fn namespace_prefixes(&self) -> Vec<(String, String)> {
        self.namespaces
            .iter()
            .map(|(prefix, namespace)| (prefix.clone(), namespace.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"
namespaces:
  app: http://example.com/app
feature_types:
  - name: app:Road
    properties:
      - name: app:name
        type: string
      - name: app:lanes
        type: integer
        min_occurs: 0
      - name: app:geometry
        type: geometry
      - name: app:crossing
        type: feature
        min_occurs: 0
        max_occurs: unbounded
        representation: reference
  - name: app:Crossing
"#;

    fn app(local: &str) -> QName {
        QName::new("http://example.com/app", local)
    }

    #[test]
    fn test_load_schema() {
        let registry = FeatureTypeRegistry::from_yaml_str(SCHEMA).unwrap();
        assert_eq!(registry.len(), 2);

        let road = registry.feature_type_for(&app("Road")).unwrap();
        assert_eq!(road.properties().len(), 4);

        let lanes = road.property(&app("lanes")).unwrap();
        assert_eq!(lanes.kind, PropertyKind::Primitive(ScalarKind::Integer));
        assert_eq!(lanes.min_occurs, 0);
        assert_eq!(lanes.max_occurs, MaxOccurs::Bounded(1));

        let crossing = road.property(&app("crossing")).unwrap();
        assert_eq!(crossing.max_occurs, MaxOccurs::Unbounded);
        assert_eq!(crossing.representation(), Some(Representation::Reference));
    }

    #[test]
    fn test_namespace_prefixes() {
        let registry = FeatureTypeRegistry::from_yaml_str(SCHEMA).unwrap();
        assert_eq!(
            registry.namespace_prefixes(),
            vec![("app".to_string(), "http://example.com/app".to_string())]
        );
    }

    #[test]
    fn test_undeclared_prefix_rejected() {
        let yaml = "feature_types:\n  - name: x:Road\n";
        let err = FeatureTypeRegistry::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, FeatureError::InvalidSchema(_)));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let yaml = "feature_types:\n  - name: Road\n    properties:\n      - { name: a, type: blob }\n";
        assert!(FeatureTypeRegistry::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_inverted_cardinality_rejected() {
        let yaml = "feature_types:\n  - name: Road\n    properties:\n      - { name: a, type: string, min_occurs: 3, max_occurs: 2 }\n";
        assert!(FeatureTypeRegistry::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(&path, SCHEMA).unwrap();
        let registry = FeatureTypeRegistry::from_yaml_file(&path).unwrap();
        assert!(!registry.is_empty());
    }
}
