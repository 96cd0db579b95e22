//! Axis-aligned bounding boxes.

use super::Coord;
use crate::error::{FeatureError, Result};

/// Bounding box with an optional coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub min: Coord,
    pub max: Coord,
    pub srs_name: Option<String>,
}

impl Envelope {
    /// Bounding box of a set of coordinates, `None` when empty.
    #[must_use]
    pub fn from_coords<'a>(
        coords: impl IntoIterator<Item = &'a Coord>,
        srs_name: Option<&str>,
    ) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = *iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), c| {
            (
                Coord::new(min.x.min(c.x), min.y.min(c.y)),
                Coord::new(max.x.max(c.x), max.y.max(c.y)),
            )
        });
        Some(Self {
            min,
            max,
            srs_name: srs_name.map(str::to_string),
        })
    }

    /// Smallest envelope covering both.
    ///
    /// Envelopes without a CRS adopt the other side's CRS. Two different
    /// CRS names cannot be merged.
    pub fn merge(&self, other: &Envelope) -> Result<Envelope> {
        let srs_name = match (&self.srs_name, &other.srs_name) {
            (Some(left), Some(right)) if left != right => {
                return Err(FeatureError::CrsMismatch {
                    left: left.clone(),
                    right: right.clone(),
                })
            }
            (Some(srs), _) | (None, Some(srs)) => Some(srs.clone()),
            (None, None) => None,
        };
        Ok(Envelope {
            min: Coord::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Coord::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
            srs_name,
        })
    }
}

/// Merge an optional envelope into an optional accumulator.
pub fn merge_optional(acc: Option<Envelope>, next: Option<&Envelope>) -> Result<Option<Envelope>> {
    match (acc, next) {
        (Some(acc), Some(next)) => acc.merge(next).map(Some),
        (None, Some(next)) => Ok(Some(next.clone())),
        (acc, None) => Ok(acc),
    }
}
