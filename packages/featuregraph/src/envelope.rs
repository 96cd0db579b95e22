//! Derived feature envelopes.
//!
//! The envelope of a feature covers its geometry properties and the
//! envelopes of its nested features, members and tuples. Reference cycles
//! are cut at the first revisit. A result is memoized only when no cut was
//! made at a feature that is still being visited above it, since such a
//! result misses part of the cycle.

use std::collections::HashMap;

use crate::error::{FeatureError, Result};
use crate::geometry::{merge_optional, Envelope, GeometryAdapter, GmlGeometryAdapter};
use crate::model::{EnvelopeCache, FeatureBody, FeatureGraph, FeatureHandle, PropertyValue};

/// Computes and memoizes envelopes using a geometry adapter.
pub struct EnvelopeCalculator<'a> {
    adapter: &'a dyn GeometryAdapter,
}

struct Visit {
    envelope: Option<Envelope>,
    /// Shallowest depth of the visiting path at which a cycle was cut.
    cut: Option<usize>,
}

impl<'a> EnvelopeCalculator<'a> {
    #[must_use]
    pub fn new(adapter: &'a dyn GeometryAdapter) -> Self {
        Self { adapter }
    }

    /// Envelope of a feature, or `None` when it has no geometry anywhere.
    ///
    /// Fails with `CrsMismatch` when contributing geometries use different
    /// coordinate reference systems, and with `UnresolvedAccess` when a
    /// reference has not been resolved yet.
    pub fn bounds(&self, graph: &FeatureGraph, handle: FeatureHandle) -> Result<Option<Envelope>> {
        let mut visiting: HashMap<FeatureHandle, usize> = HashMap::new();
        Ok(self.visit(graph, handle, &mut visiting)?.envelope)
    }

    fn visit(
        &self,
        graph: &FeatureGraph,
        handle: FeatureHandle,
        visiting: &mut HashMap<FeatureHandle, usize>,
    ) -> Result<Visit> {
        let feature = graph.feature(handle);
        if let EnvelopeCache::Computed(envelope) = feature.cached_envelope() {
            return Ok(Visit {
                envelope,
                cut: None,
            });
        }
        if let Some(depth) = visiting.get(&handle) {
            return Ok(Visit {
                envelope: None,
                cut: Some(*depth),
            });
        }

        let depth = visiting.len();
        visiting.insert(handle, depth);

        let mut envelope: Option<Envelope> = None;
        let mut cut: Option<usize> = None;
        let mut children: Vec<FeatureHandle> = Vec::new();

        for property in feature.properties() {
            match &property.value {
                PropertyValue::Geometry(geometry) => {
                    envelope = merge_optional(envelope, self.adapter.envelope_of(geometry).as_ref())?;
                }
                PropertyValue::Feature(child) => children.push(*child),
                PropertyValue::Unresolved(target) => {
                    return Err(FeatureError::UnresolvedAccess {
                        feature: graph.feature_id(handle),
                        property: property.name.to_string(),
                        target: target.clone(),
                    })
                }
                PropertyValue::Primitive(_) | PropertyValue::External(_) => {}
            }
        }
        match feature.body() {
            FeatureBody::Plain => {}
            FeatureBody::Collection { members } => children.extend(members.iter().copied()),
            FeatureBody::TupleCollection { tuples, .. } => {
                children.extend(tuples.iter().flatten().copied());
            }
        }

        for child in children {
            let visit = self.visit(graph, child, visiting)?;
            envelope = merge_optional(envelope, visit.envelope.as_ref())?;
            cut = match (cut, visit.cut) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }

        visiting.remove(&handle);

        // A cut at this feature's own depth only trims this feature's cycle.
        let cut = cut.filter(|c| *c < depth);
        if cut.is_none() {
            feature.store_envelope(envelope.clone());
        }
        Ok(Visit { envelope, cut })
    }
}

/// Envelope of a feature using the GML geometry adapter.
pub fn bounds(graph: &FeatureGraph, handle: FeatureHandle) -> Result<Option<Envelope>> {
    EnvelopeCalculator::new(&GmlGeometryAdapter).bounds(graph, handle)
}
