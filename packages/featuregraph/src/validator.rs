//! Structural validation of features against declared feature types.
//!
//! Validation walks a feature and everything nested in it, checks each
//! feature against the type registered for its element name and, on
//! success, re-types it to the declared [`FeatureType`]. A violation fails
//! the feature being checked; features validated before it keep their new
//! type. Geometry defects are not violations: they are logged, corrected
//! where a winding rule applies and returned in the [`ValidationReport`].

use std::collections::HashSet;
use std::fmt;

use crate::config::is_gml_namespace;
use crate::error::{FeatureError, Result};
use crate::geometry::{Geometry, GeometryAdapter};
use crate::model::{FeatureGraph, FeatureHandle, PropertyRef, PropertyValue, ScalarValue};
use crate::schema::{FeatureType, FeatureTypeLookup, PropertyKind, QName};

/// What was wrong with a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefectKind {
    /// Unclosed or self-intersecting ring, too few points, non-finite coordinates.
    Invalid,
    /// Clockwise exterior ring.
    ExteriorWinding,
    /// Counter-clockwise interior ring.
    InteriorWinding,
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => f.write_str("invalid geometry"),
            Self::ExteriorWinding => f.write_str("clockwise exterior ring"),
            Self::InteriorWinding => f.write_str("counter-clockwise interior ring"),
        }
    }
}

/// Non-fatal geometry problem found during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryDefect {
    pub feature: String,
    pub property: QName,
    pub kind: DefectKind,
    /// Number of rings affected.
    pub rings: usize,
    /// Whether the stored geometry was corrected.
    pub corrected: bool,
}

impl fmt::Display for GeometryDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {} of '{}'", self.kind, self.property, self.feature)?;
        if self.corrected {
            write!(f, " (corrected {} ring(s))", self.rings)?;
        }
        Ok(())
    }
}

/// Summary of one validation call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationReport {
    /// Features checked and re-typed, collections included.
    pub validated: usize,
    pub defects: Vec<GeometryDefect>,
    /// GML metadata properties removed because the type does not declare them.
    pub dropped: Vec<(String, QName)>,
}

/// Validation result of one collection member.
#[derive(Debug)]
pub struct MemberOutcome {
    pub member: FeatureHandle,
    pub id: String,
    pub result: Result<ValidationReport>,
}

impl MemberOutcome {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.result.is_ok()
    }
}

/// Check the order and cardinality of a feature's properties.
///
/// Walks the declared slots in order and counts the run of consecutive
/// properties carrying each slot's name. A run outside the slot's
/// `[min_occurs, max_occurs]` is a `Cardinality` error; properties left
/// over after the last slot are out of order or undeclared.
pub fn check_structure<'a>(
    feature_id: &str,
    names: impl IntoIterator<Item = &'a QName>,
    feature_type: &FeatureType,
) -> Result<()> {
    let names: Vec<&QName> = names.into_iter().collect();
    let mut position = 0;

    for slot in feature_type.properties() {
        let count = names[position..]
            .iter()
            .take_while(|name| **name == &slot.name)
            .count();
        if !slot.admits(count) {
            return Err(FeatureError::Cardinality {
                feature: feature_id.to_string(),
                property: slot.name.to_string(),
                count,
                min: slot.min_occurs,
                max: slot.max_occurs.to_string(),
            });
        }
        position += count;
    }

    if position < names.len() {
        return Err(FeatureError::PropertyOrder {
            feature: feature_id.to_string(),
            feature_type: feature_type.name().to_string(),
            matched: position,
            actual: names.len(),
        });
    }
    Ok(())
}

/// Validator bound to a type registry and a geometry adapter.
pub struct Validator<'a> {
    lookup: &'a dyn FeatureTypeLookup,
    adapter: &'a dyn GeometryAdapter,
}

#[derive(Default)]
struct Session {
    validating: HashSet<FeatureHandle>,
    validated: HashSet<FeatureHandle>,
    report: ValidationReport,
}

impl<'a> Validator<'a> {
    #[must_use]
    pub fn new(lookup: &'a dyn FeatureTypeLookup, adapter: &'a dyn GeometryAdapter) -> Self {
        Self { lookup, adapter }
    }

    /// Validate a feature and everything nested in it.
    ///
    /// Collections validate each member and tuple element. Nested features
    /// already being validated higher up are not revisited, so reference
    /// cycles terminate.
    pub fn validate(&self, graph: &mut FeatureGraph, handle: FeatureHandle) -> Result<ValidationReport> {
        let mut session = Session::default();
        self.visit(graph, handle, &mut session)?;
        Ok(session.report)
    }

    /// Validate each member of a collection in its own session.
    ///
    /// One failing member does not stop the others, so callers can drop
    /// invalid features instead of rejecting the whole document.
    pub fn validate_members(
        &self,
        graph: &mut FeatureGraph,
        collection: FeatureHandle,
    ) -> Vec<MemberOutcome> {
        graph
            .contents(collection)
            .into_iter()
            .map(|member| {
                let result = self.validate(graph, member);
                if let Err(e) = &result {
                    tracing::debug!(id = %graph.feature_id(member), error = %e, "member failed validation");
                }
                MemberOutcome {
                    member,
                    id: graph.feature_id(member),
                    result,
                }
            })
            .collect()
    }

    fn visit(&self, graph: &mut FeatureGraph, handle: FeatureHandle, session: &mut Session) -> Result<()> {
        if session.validated.contains(&handle) || session.validating.contains(&handle) {
            return Ok(());
        }
        session.validating.insert(handle);
        let result = self.check(graph, handle, session);
        session.validating.remove(&handle);
        result?;

        session.validated.insert(handle);
        session.report.validated += 1;
        Ok(())
    }

    fn check(&self, graph: &mut FeatureGraph, handle: FeatureHandle, session: &mut Session) -> Result<()> {
        if graph.feature(handle).is_collection() {
            for member in graph.contents(handle) {
                self.visit(graph, member, session)?;
            }
            return Ok(());
        }

        let name = graph.feature(handle).name().clone();
        let declared = self
            .lookup
            .feature_type_for(&name)
            .ok_or_else(|| FeatureError::UnknownFeatureType(name.to_string()))?;
        let id = graph.feature_id(handle);

        if let Some(undeclared) = graph.feature(handle).properties().iter().find(|p| {
            declared.property(&p.name).is_none() && !is_gml_namespace(p.name.namespace())
        }) {
            return Err(FeatureError::UndeclaredProperty {
                feature: id,
                feature_type: declared.name().to_string(),
                property: undeclared.name.to_string(),
            });
        }

        let dropped = graph.remove_properties(handle, |p| declared.property(&p.name).is_none());
        for property in dropped {
            tracing::debug!(id = %id, property = %property.name, "dropped undeclared GML property");
            session.report.dropped.push((id.clone(), property.name));
        }

        check_structure(
            &id,
            graph.feature(handle).properties().iter().map(|p| &p.name),
            &declared,
        )?;

        for index in 0..graph.feature(handle).properties().len() {
            let pref = PropertyRef {
                feature: handle,
                index,
            };
            let property = &graph.feature(handle).properties()[index];
            let name = property.name.clone();
            let Some(slot) = declared.property(&name) else {
                continue;
            };
            let type_mismatch = |actual: &PropertyValue| FeatureError::TypeMismatch {
                feature: id.clone(),
                property: name.to_string(),
                expected: slot.kind.describe(),
                actual: actual.describe(),
            };

            match (slot.kind, &property.value) {
                (_, PropertyValue::Unresolved(target)) => {
                    return Err(FeatureError::UnresolvedAccess {
                        feature: id.clone(),
                        property: name.to_string(),
                        target: target.clone(),
                    })
                }
                (PropertyKind::Primitive(kind), PropertyValue::Primitive(value)) => {
                    let coerced = ScalarValue::parse(&value.to_string(), kind, &name)?;
                    if &coerced != value {
                        graph.set_property_value(pref, PropertyValue::Primitive(coerced));
                    }
                }
                (PropertyKind::Geometry | PropertyKind::MultiGeometry, PropertyValue::Geometry(geometry)) => {
                    if slot.kind == PropertyKind::MultiGeometry && !geometry.is_multi() {
                        return Err(type_mismatch(&property.value));
                    }
                    let geometry = geometry.clone();
                    self.check_geometry(graph, pref, &id, &name, geometry, session);
                }
                (PropertyKind::Feature(_), PropertyValue::Feature(child)) => {
                    let child = *child;
                    self.visit(graph, child, session)?;
                }
                (PropertyKind::Feature(_), PropertyValue::External(url)) => {
                    tracing::debug!(id = %id, url = %url, "skipping external reference");
                }
                (_, value) => return Err(type_mismatch(value)),
            }
        }

        graph.set_feature_type(handle, declared);
        Ok(())
    }

    fn check_geometry(
        &self,
        graph: &mut FeatureGraph,
        pref: PropertyRef,
        id: &str,
        name: &QName,
        mut geometry: Geometry,
        session: &mut Session,
    ) {
        let mut record = |kind: DefectKind, rings: usize, corrected: bool| {
            let defect = GeometryDefect {
                feature: id.to_string(),
                property: name.clone(),
                kind,
                rings,
                corrected,
            };
            tracing::warn!(defect = %defect, "geometry defect");
            session.report.defects.push(defect);
        };

        if !self.adapter.is_valid(&geometry) {
            record(DefectKind::Invalid, 0, false);
        }

        let fix = self.adapter.fix_orientation(&mut geometry);
        if fix.exteriors > 0 {
            record(DefectKind::ExteriorWinding, fix.exteriors, true);
        }
        if fix.interiors > 0 {
            record(DefectKind::InteriorWinding, fix.interiors, true);
        }
        if !fix.is_empty() {
            graph.set_property_value(pref, PropertyValue::Geometry(geometry));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Coord, GmlGeometryAdapter, Polygon, Shape};
    use crate::schema::{FeatureTypeRegistry, MaxOccurs, PropertyType, Representation, ScalarKind, TypeOrigin};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const APP: &str = "http://example.com/app";

    fn app(local: &str) -> QName {
        QName::new(APP, local)
    }

    fn registry() -> FeatureTypeRegistry {
        let mut registry = FeatureTypeRegistry::new();
        registry.register(FeatureType::new(
            app("Road"),
            vec![
                PropertyType::new(app("name"), PropertyKind::Primitive(ScalarKind::String)),
                PropertyType::new(app("lanes"), PropertyKind::Primitive(ScalarKind::Float))
                    .with_occurs(0, MaxOccurs::Bounded(1)),
                PropertyType::new(app("area"), PropertyKind::Geometry)
                    .with_occurs(0, MaxOccurs::Bounded(1)),
                PropertyType::new(app("next"), PropertyKind::Feature(Representation::Reference))
                    .with_occurs(0, MaxOccurs::Unbounded),
            ],
        ));
        registry
    }

    fn synthesized(local: &str) -> Arc<FeatureType> {
        Arc::new(FeatureType::synthesized(app(local), Vec::new()))
    }

    fn string(value: &str) -> PropertyValue {
        PropertyValue::Primitive(ScalarValue::String(value.to_string()))
    }

    fn clockwise_square() -> Geometry {
        let exterior = [(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)]
            .iter()
            .map(|&(x, y)| Coord::new(x, y))
            .collect();
        Geometry::new(
            Shape::Surface(vec![Polygon {
                exterior,
                interiors: Vec::new(),
            }]),
            Some("EPSG:28992".to_string()),
        )
    }

    #[test]
    fn test_check_structure() {
        let registry = registry();
        let road = registry.feature_type_for(&app("Road")).unwrap();
        let (name, lanes, next) = (app("name"), app("lanes"), app("next"));

        assert!(check_structure("r1", [&name, &lanes, &next, &next], &road).is_ok());

        let err = check_structure("r1", [&lanes], &road).unwrap_err();
        assert!(matches!(err, FeatureError::Cardinality { ref property, count: 0, min: 1, .. }
            if property == "{http://example.com/app}name"));

        let err = check_structure("r1", [&name, &next, &lanes], &road).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::PropertyOrder {
                matched: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_retypes_and_coerces() {
        let registry = registry();
        let mut graph = FeatureGraph::new();
        let road = graph.add_feature(synthesized("Road"), Some("r1".to_string()));
        graph.push_property(road, app("name"), string("A1"));
        graph.push_property(road, app("lanes"), PropertyValue::Primitive(ScalarValue::Integer(2)));

        let validator = Validator::new(&registry, &GmlGeometryAdapter);
        let report = validator.validate(&mut graph, road).unwrap();

        assert_eq!(report.validated, 1);
        assert_eq!(graph.feature(road).feature_type().origin(), TypeOrigin::Declared);
        assert_eq!(
            graph.feature(road).properties()[1].value,
            PropertyValue::Primitive(ScalarValue::Float(2.0))
        );
    }

    #[test]
    fn test_conversion_failure() {
        let mut registry = FeatureTypeRegistry::new();
        registry.register(FeatureType::new(
            app("Road"),
            vec![PropertyType::new(app("lanes"), PropertyKind::Primitive(ScalarKind::Integer))],
        ));
        let mut graph = FeatureGraph::new();
        let road = graph.add_feature(synthesized("Road"), Some("r1".to_string()));
        graph.push_property(road, app("lanes"), string("two"));

        let err = Validator::new(&registry, &GmlGeometryAdapter)
            .validate(&mut graph, road)
            .unwrap_err();
        assert!(matches!(err, FeatureError::Conversion { ref value, .. } if value == "two"));
        assert_eq!(graph.feature(road).feature_type().origin(), TypeOrigin::Synthesized);
    }

    #[test]
    fn test_undeclared_properties() {
        let registry = registry();
        let mut graph = FeatureGraph::new();
        let road = graph.add_feature(synthesized("Road"), Some("r1".to_string()));
        graph.push_property(road, QName::new(crate::config::GML_NS, "description"), string("x"));
        graph.push_property(road, app("name"), string("A1"));

        let validator = Validator::new(&registry, &GmlGeometryAdapter);
        let report = validator.validate(&mut graph, road).unwrap();
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(graph.feature(road).properties().len(), 1);

        let other = graph.add_feature(synthesized("Road"), Some("r2".to_string()));
        graph.push_property(other, app("name"), string("A2"));
        graph.push_property(other, app("width"), string("7"));
        assert!(matches!(
            validator.validate(&mut graph, other),
            Err(FeatureError::UndeclaredProperty { .. })
        ));
    }

    #[test]
    fn test_unknown_feature_type() {
        let registry = registry();
        let mut graph = FeatureGraph::new();
        let bridge = graph.add_feature(synthesized("Bridge"), None);
        let err = Validator::new(&registry, &GmlGeometryAdapter)
            .validate(&mut graph, bridge)
            .unwrap_err();
        assert!(matches!(err, FeatureError::UnknownFeatureType(_)));
    }

    #[test]
    fn test_winding_corrected() {
        let registry = registry();
        let mut graph = FeatureGraph::new();
        let road = graph.add_feature(synthesized("Road"), Some("r1".to_string()));
        graph.push_property(road, app("name"), string("A1"));
        graph.push_property(road, app("area"), PropertyValue::Geometry(clockwise_square()));

        let report = Validator::new(&registry, &GmlGeometryAdapter)
            .validate(&mut graph, road)
            .unwrap();

        assert_eq!(report.defects.len(), 1);
        assert_eq!(report.defects[0].kind, DefectKind::ExteriorWinding);
        assert!(report.defects[0].corrected);

        let PropertyValue::Geometry(fixed) = &graph.feature(road).properties()[1].value else {
            panic!("expected geometry");
        };
        let polygon = fixed.polygons().next().unwrap();
        assert_eq!(polygon.exterior.len(), 5);
        assert!(crate::geometry::is_counter_clockwise(&polygon.exterior));
    }

    #[test]
    fn test_reference_cycle_terminates() {
        let registry = registry();
        let mut graph = FeatureGraph::new();
        let a = graph.add_feature(synthesized("Road"), Some("a".to_string()));
        let b = graph.add_feature(synthesized("Road"), Some("b".to_string()));
        graph.push_property(a, app("name"), string("A"));
        graph.push_property(a, app("next"), PropertyValue::Feature(b));
        graph.push_property(b, app("name"), string("B"));
        graph.push_property(b, app("next"), PropertyValue::Feature(a));

        let report = Validator::new(&registry, &GmlGeometryAdapter)
            .validate(&mut graph, a)
            .unwrap();
        assert_eq!(report.validated, 2);
        assert_eq!(graph.feature(b).feature_type().origin(), TypeOrigin::Declared);
    }

    #[test]
    fn test_validate_members_reports_each() {
        let registry = registry();
        let mut graph = FeatureGraph::new();
        let collection = graph.add_collection(
            FeatureType::collection(QName::new(crate::config::WFS_NS, "FeatureCollection")),
            None,
        );
        let good = graph.add_feature(synthesized("Road"), Some("good".to_string()));
        graph.push_property(good, app("name"), string("ok"));
        let bad = graph.add_feature(synthesized("Road"), Some("bad".to_string()));
        graph.add_member(collection, bad).unwrap();
        graph.add_member(collection, good).unwrap();

        let outcomes = Validator::new(&registry, &GmlGeometryAdapter).validate_members(&mut graph, collection);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].id, "bad");
        assert!(matches!(
            outcomes[0].result,
            Err(FeatureError::Cardinality { .. })
        ));
        assert!(outcomes[1].is_valid());
    }

    #[test]
    fn test_multi_geometry_slot_rejects_single() {
        let mut registry = FeatureTypeRegistry::new();
        registry.register(FeatureType::new(
            app("Parcel"),
            vec![PropertyType::new(app("area"), PropertyKind::MultiGeometry)],
        ));
        let mut graph = FeatureGraph::new();
        let parcel = graph.add_feature(synthesized("Parcel"), Some("p1".to_string()));
        graph.push_property(
            parcel,
            app("area"),
            PropertyValue::Geometry(Geometry::new(Shape::Point(Coord::new(1.0, 2.0)), None)),
        );
        assert!(matches!(
            Validator::new(&registry, &GmlGeometryAdapter).validate(&mut graph, parcel),
            Err(FeatureError::TypeMismatch { .. })
        ));
    }
}
