//! Arena holding every feature of one document.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use super::{Feature, FeatureBody, FeatureHandle, FeatureProperty, Owner, PropertyRef, PropertyValue};
use crate::error::{FeatureError, Result};
use crate::schema::{FeatureType, QName};

/// Features of one document, addressed by [`FeatureHandle`].
///
/// Nested features and references are handles into the same arena, so
/// reference cycles are plain data. Handles from another graph must not be
/// passed in: lookups index the arena directly.
#[derive(Debug, Default)]
pub struct FeatureGraph {
    features: Vec<Feature>,
    /// Features holding each feature as property value, member or tuple
    /// element. Links are never removed, so entries may be stale; that
    /// only widens envelope invalidation.
    parents: Vec<Vec<FeatureHandle>>,
}

impl FeatureGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Add a plain feature without properties.
    pub fn add_feature(&mut self, feature_type: Arc<FeatureType>, id: Option<String>) -> FeatureHandle {
        self.push(Feature::new(feature_type, id, FeatureBody::Plain))
    }

    /// Add an empty feature collection.
    pub fn add_collection(
        &mut self,
        feature_type: Arc<FeatureType>,
        id: Option<String>,
    ) -> FeatureHandle {
        self.push(Feature::new(
            feature_type,
            id,
            FeatureBody::Collection {
                members: Vec::new(),
            },
        ))
    }

    /// Add an empty collection whose members are tuples of `tuple_length`.
    pub fn add_tuple_collection(
        &mut self,
        feature_type: Arc<FeatureType>,
        id: Option<String>,
        tuple_length: usize,
    ) -> FeatureHandle {
        self.push(Feature::new(
            feature_type,
            id,
            FeatureBody::TupleCollection {
                tuple_length,
                tuples: Vec::new(),
            },
        ))
    }

    fn push(&mut self, feature: Feature) -> FeatureHandle {
        self.features.push(feature);
        self.parents.push(Vec::new());
        FeatureHandle(self.features.len() - 1)
    }

    fn link(&mut self, parent: FeatureHandle, child: FeatureHandle) {
        let parents = &mut self.parents[child.0];
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    #[must_use]
    pub fn feature(&self, handle: FeatureHandle) -> &Feature {
        &self.features[handle.0]
    }

    #[must_use]
    pub fn get(&self, handle: FeatureHandle) -> Option<&Feature> {
        self.features.get(handle.0)
    }

    fn feature_mut(&mut self, handle: FeatureHandle) -> &mut Feature {
        &mut self.features[handle.0]
    }

    /// All handles in insertion order.
    pub fn handles(&self) -> impl Iterator<Item = FeatureHandle> {
        (0..self.features.len()).map(FeatureHandle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureHandle, &Feature)> {
        self.features
            .iter()
            .enumerate()
            .map(|(i, f)| (FeatureHandle(i), f))
    }

    /// Id of a feature, or `localName.index` for features created without one.
    #[must_use]
    pub fn feature_id(&self, handle: FeatureHandle) -> String {
        let feature = self.feature(handle);
        match feature.id() {
            Some(id) => id.to_string(),
            None => format!("{}.{}", feature.name().local_name(), handle.0),
        }
    }

    /// Linear search by id.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<FeatureHandle> {
        self.iter()
            .find(|(_, f)| f.id() == Some(id))
            .map(|(h, _)| h)
    }

    pub fn set_attribute(&mut self, handle: FeatureHandle, name: impl Into<String>, value: impl Into<String>) {
        self.feature_mut(handle)
            .attributes
            .insert(name.into(), value.into());
    }

    /// Replace the type of a feature, e.g. after validation.
    pub fn set_feature_type(&mut self, handle: FeatureHandle, feature_type: Arc<FeatureType>) {
        self.feature_mut(handle).feature_type = feature_type;
    }

    /// Append a property.
    ///
    /// A nested feature without an owner becomes owned by this property.
    pub fn push_property(&mut self, handle: FeatureHandle, name: QName, value: PropertyValue) -> PropertyRef {
        let affects_bounds = value.affects_bounds();
        let nested = value.as_feature();
        let feature = self.feature_mut(handle);
        feature.properties.push(FeatureProperty::new(name, value));
        let pref = PropertyRef {
            feature: handle,
            index: feature.properties.len() - 1,
        };

        if let Some(child) = nested {
            self.link(handle, child);
            let child = self.feature_mut(child);
            if child.owner.is_none() {
                child.owner = Some(Owner::Property(pref));
            }
        }
        if affects_bounds {
            self.mark_bounds_dirty(handle);
        }
        pref
    }

    #[must_use]
    pub fn property(&self, pref: PropertyRef) -> Option<&FeatureProperty> {
        self.get(pref.feature)?.properties.get(pref.index)
    }

    /// Replace a property value and invalidate the affected envelopes.
    ///
    /// Returns the previous value, or `None` when `pref` does not exist.
    /// Ownership is not changed.
    pub fn set_property_value(&mut self, pref: PropertyRef, value: PropertyValue) -> Option<PropertyValue> {
        let slot = self
            .features
            .get_mut(pref.feature.0)?
            .properties
            .get_mut(pref.index)?;
        let nested = value.as_feature();
        let previous = std::mem::replace(&mut slot.value, value);
        if let Some(child) = nested {
            self.link(pref.feature, child);
        }
        self.mark_bounds_dirty(pref.feature);
        Some(previous)
    }

    /// Remove the properties matching `predicate`, keeping owner
    /// back-references of the remaining nested features in step.
    pub fn remove_properties(
        &mut self,
        handle: FeatureHandle,
        mut predicate: impl FnMut(&FeatureProperty) -> bool,
    ) -> Vec<FeatureProperty> {
        let old = std::mem::take(&mut self.feature_mut(handle).properties);
        let mut kept = Vec::with_capacity(old.len());
        let mut removed = Vec::new();
        let mut moves: Vec<(FeatureHandle, Option<Owner>)> = Vec::new();

        for (old_index, property) in old.into_iter().enumerate() {
            let was_owner = PropertyRef {
                feature: handle,
                index: old_index,
            };
            let remove = predicate(&property);
            if let Some(child) = property.value.as_feature() {
                if self.feature(child).owner == Some(Owner::Property(was_owner)) {
                    let new_owner = (!remove).then(|| {
                        Owner::Property(PropertyRef {
                            feature: handle,
                            index: kept.len(),
                        })
                    });
                    moves.push((child, new_owner));
                }
            }
            if remove {
                removed.push(property);
            } else {
                kept.push(property);
            }
        }

        self.feature_mut(handle).properties = kept;
        for (child, owner) in moves {
            self.feature_mut(child).owner = owner;
        }
        if !removed.is_empty() {
            self.mark_bounds_dirty(handle);
        }
        removed
    }

    /// Add a member to a plain collection. The member becomes owned by the
    /// collection unless something else already owns it.
    pub fn add_member(&mut self, collection: FeatureHandle, member: FeatureHandle) -> Result<()> {
        let id = self.feature_id(collection);
        match &mut self.feature_mut(collection).body {
            FeatureBody::Collection { members } => members.push(member),
            FeatureBody::TupleCollection { tuple_length, .. } => {
                return Err(FeatureError::TupleLength {
                    collection: id,
                    expected: *tuple_length,
                    actual: 1,
                })
            }
            FeatureBody::Plain => {
                return Err(FeatureError::TypeMismatch {
                    feature: id,
                    property: "member".to_string(),
                    expected: "feature collection".to_string(),
                    actual: "feature".to_string(),
                })
            }
        }
        self.link(collection, member);
        let member = self.feature_mut(member);
        if member.owner.is_none() {
            member.owner = Some(Owner::Collection(collection));
        }
        self.mark_bounds_dirty(collection);
        Ok(())
    }

    /// Add a tuple to a tuple collection. The length must match.
    pub fn add_tuple(&mut self, collection: FeatureHandle, tuple: Vec<FeatureHandle>) -> Result<()> {
        let id = self.feature_id(collection);
        match &mut self.feature_mut(collection).body {
            FeatureBody::TupleCollection {
                tuple_length,
                tuples,
            } => {
                if tuple.len() != *tuple_length {
                    return Err(FeatureError::TupleLength {
                        collection: id,
                        expected: *tuple_length,
                        actual: tuple.len(),
                    });
                }
                tuples.push(tuple.clone());
            }
            FeatureBody::Collection { .. } | FeatureBody::Plain => {
                return Err(FeatureError::TypeMismatch {
                    feature: id,
                    property: "tuple".to_string(),
                    expected: "tuple collection".to_string(),
                    actual: "feature".to_string(),
                })
            }
        }
        for member in tuple {
            self.link(collection, member);
            let member = self.feature_mut(member);
            if member.owner.is_none() {
                member.owner = Some(Owner::Collection(collection));
            }
        }
        self.mark_bounds_dirty(collection);
        Ok(())
    }

    /// Members of a plain collection; empty for anything else.
    #[must_use]
    pub fn members(&self, collection: FeatureHandle) -> &[FeatureHandle] {
        match &self.feature(collection).body {
            FeatureBody::Collection { members } => members,
            _ => &[],
        }
    }

    /// Tuples of a tuple collection; empty for anything else.
    #[must_use]
    pub fn tuples(&self, collection: FeatureHandle) -> &[Vec<FeatureHandle>] {
        match &self.feature(collection).body {
            FeatureBody::TupleCollection { tuples, .. } => tuples,
            _ => &[],
        }
    }

    /// Members of a collection, or the elements of every tuple in order.
    #[must_use]
    pub fn contents(&self, collection: FeatureHandle) -> Vec<FeatureHandle> {
        match &self.feature(collection).body {
            FeatureBody::Plain => Vec::new(),
            FeatureBody::Collection { members } => members.clone(),
            FeatureBody::TupleCollection { tuples, .. } => tuples.iter().flatten().copied().collect(),
        }
    }

    #[must_use]
    pub fn owner(&self, handle: FeatureHandle) -> Option<Owner> {
        self.feature(handle).owner
    }

    /// Invalidate the envelope of `handle` and of every feature that
    /// reaches it through properties, members or tuples.
    ///
    /// Only ancestors are visited, so the cost does not grow with the size
    /// of the arena.
    pub fn mark_bounds_dirty(&self, handle: FeatureHandle) {
        let mut seen: HashSet<FeatureHandle> = HashSet::from([handle]);
        let mut queue = VecDeque::from([handle]);
        while let Some(current) = queue.pop_front() {
            self.feature(current).invalidate_envelope();
            for parent in &self.parents[current.0] {
                if seen.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EnvelopeCache, ScalarValue};
    use crate::schema::FeatureType;

    fn ft(local: &str) -> Arc<FeatureType> {
        Arc::new(FeatureType::synthesized(
            QName::new("http://example.com/app", local),
            Vec::new(),
        ))
    }

    fn name(local: &str) -> QName {
        QName::new("http://example.com/app", local)
    }

    #[test]
    fn test_push_property_sets_owner() {
        let mut graph = FeatureGraph::new();
        let road = graph.add_feature(ft("Road"), Some("r1".to_string()));
        let segment = graph.add_feature(ft("Segment"), Some("s1".to_string()));

        let pref = graph.push_property(road, name("segment"), PropertyValue::Feature(segment));
        assert_eq!(graph.owner(segment), Some(Owner::Property(pref)));
        assert_eq!(graph.owner(road), None);

        // A second holder does not steal ownership
        let other = graph.add_feature(ft("Road"), Some("r2".to_string()));
        graph.push_property(other, name("segment"), PropertyValue::Feature(segment));
        assert_eq!(graph.owner(segment), Some(Owner::Property(pref)));
    }

    #[test]
    fn test_remove_properties_updates_owner_indices() {
        let mut graph = FeatureGraph::new();
        let road = graph.add_feature(ft("Road"), None);
        let a = graph.add_feature(ft("Segment"), None);
        let b = graph.add_feature(ft("Segment"), None);
        graph.push_property(road, name("segment"), PropertyValue::Feature(a));
        graph.push_property(
            road,
            name("name"),
            PropertyValue::Primitive(ScalarValue::String("x".to_string())),
        );
        graph.push_property(road, name("segment"), PropertyValue::Feature(b));

        let removed = graph.remove_properties(road, |p| p.value.as_feature() == Some(a));
        assert_eq!(removed.len(), 1);
        assert_eq!(graph.owner(a), None);
        assert_eq!(
            graph.owner(b),
            Some(Owner::Property(PropertyRef {
                feature: road,
                index: 1
            }))
        );
    }

    #[test]
    fn test_feature_id_fallback() {
        let mut graph = FeatureGraph::new();
        let h = graph.add_feature(ft("Road"), None);
        assert_eq!(graph.feature_id(h), "Road.0");
        let named = graph.add_feature(ft("Road"), Some("r9".to_string()));
        assert_eq!(graph.find_by_id("r9"), Some(named));
        assert_eq!(graph.find_by_id("nope"), None);
    }

    #[test]
    fn test_tuple_length_enforced() {
        let mut graph = FeatureGraph::new();
        let coll = graph.add_tuple_collection(ft("FeatureCollection"), Some("c".to_string()), 2);
        let a = graph.add_feature(ft("A"), None);
        let b = graph.add_feature(ft("B"), None);

        graph.add_tuple(coll, vec![a, b]).unwrap();
        let err = graph.add_tuple(coll, vec![a]).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::TupleLength {
                expected: 2,
                actual: 1,
                ..
            }
        ));
        assert!(graph.add_member(coll, a).is_err());
        assert_eq!(graph.tuples(coll).len(), 1);
        assert_eq!(graph.owner(a), Some(Owner::Collection(coll)));
    }

    #[test]
    fn test_members_of_plain_feature_rejected() {
        let mut graph = FeatureGraph::new();
        let road = graph.add_feature(ft("Road"), None);
        let other = graph.add_feature(ft("Road"), None);
        assert!(graph.add_member(road, other).is_err());
        assert!(graph.members(road).is_empty());
    }

    #[test]
    fn test_mark_bounds_dirty_reaches_ancestors_through_cycles() {
        let mut graph = FeatureGraph::new();
        let a = graph.add_feature(ft("A"), None);
        let b = graph.add_feature(ft("B"), None);
        let c = graph.add_feature(ft("C"), None);
        graph.push_property(a, name("next"), PropertyValue::Feature(b));
        graph.push_property(b, name("next"), PropertyValue::Feature(a));
        graph.push_property(b, name("leaf"), PropertyValue::Feature(c));

        for h in [a, b, c] {
            graph.feature(h).store_envelope(None);
        }
        graph.mark_bounds_dirty(c);
        for h in [a, b, c] {
            assert_eq!(graph.feature(h).cached_envelope(), EnvelopeCache::Dirty);
        }
    }

    #[test]
    fn test_mark_bounds_dirty_leaves_siblings_alone() {
        let mut graph = FeatureGraph::new();
        let coll = graph.add_collection(ft("FeatureCollection"), None);
        let members: Vec<_> = (0..1000)
            .map(|i| {
                let h = graph.add_feature(ft("Point"), Some(format!("p{i}")));
                graph.add_member(coll, h).unwrap();
                h
            })
            .collect();

        for h in graph.handles() {
            graph.feature(h).store_envelope(None);
        }
        graph.mark_bounds_dirty(members[10]);

        assert_eq!(graph.feature(members[10]).cached_envelope(), EnvelopeCache::Dirty);
        assert_eq!(graph.feature(coll).cached_envelope(), EnvelopeCache::Dirty);
        assert_eq!(
            graph.feature(members[11]).cached_envelope(),
            EnvelopeCache::Computed(None)
        );
    }

    #[test]
    fn test_set_property_value_links_new_target() {
        let mut graph = FeatureGraph::new();
        let road = graph.add_feature(ft("Road"), Some("r1".to_string()));
        let segment = graph.add_feature(ft("Segment"), Some("s1".to_string()));
        let pref = graph.push_property(
            road,
            name("segment"),
            PropertyValue::Primitive(ScalarValue::String("pending".to_string())),
        );
        graph.set_property_value(pref, PropertyValue::Feature(segment));

        graph.feature(road).store_envelope(None);
        graph.mark_bounds_dirty(segment);
        assert_eq!(graph.feature(road).cached_envelope(), EnvelopeCache::Dirty);
    }
}
