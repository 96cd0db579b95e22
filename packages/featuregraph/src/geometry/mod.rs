//! Geometry values and the adapter interface between features and GML.
//!
//! Coordinates are stored east/north (x/y) regardless of the axis order
//! the source document used; [`AxisOrder`] tells the codec when to swap.

mod envelope;
mod gml;
mod ring;

use roxmltree::Node;

use crate::error::Result;
use crate::xml::XmlWriter;

pub use envelope::{merge_optional, Envelope};
pub use gml::GmlGeometryAdapter;
pub use ring::{is_counter_clockwise, is_valid_ring, orient_polygon, signed_area, WindingFix};

/// Two-dimensional position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Polygon with one exterior ring and any number of holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<Coord>,
    pub interiors: Vec<Vec<Coord>>,
}

/// Geometry shapes supported by the GML codec.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Polygon),
    /// A surface made of polygon patches.
    Surface(Vec<Polygon>),
    MultiPoint(Vec<Coord>),
    MultiCurve(Vec<Vec<Coord>>),
    MultiSurface(Vec<Polygon>),
}

/// A shape with its coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub srs_name: Option<String>,
    pub shape: Shape,
}

impl Geometry {
    #[must_use]
    pub fn new(shape: Shape, srs_name: Option<String>) -> Self {
        Self { srs_name, shape }
    }

    /// GML element name for this shape.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self.shape {
            Shape::Point(_) => "Point",
            Shape::LineString(_) => "LineString",
            Shape::Polygon(_) => "Polygon",
            Shape::Surface(_) => "Surface",
            Shape::MultiPoint(_) => "MultiPoint",
            Shape::MultiCurve(_) => "MultiCurve",
            Shape::MultiSurface(_) => "MultiSurface",
        }
    }

    #[must_use]
    pub fn is_multi(&self) -> bool {
        matches!(
            self.shape,
            Shape::MultiPoint(_) | Shape::MultiCurve(_) | Shape::MultiSurface(_)
        )
    }

    /// All positions of the geometry, exterior rings first.
    pub fn coords(&self) -> Box<dyn Iterator<Item = &Coord> + '_> {
        match &self.shape {
            Shape::Point(c) => Box::new(std::iter::once(c)),
            Shape::LineString(cs) | Shape::MultiPoint(cs) => Box::new(cs.iter()),
            Shape::MultiCurve(lines) => Box::new(lines.iter().flatten()),
            Shape::Polygon(_) | Shape::Surface(_) | Shape::MultiSurface(_) => Box::new(
                self.polygons()
                    .flat_map(|p| p.exterior.iter().chain(p.interiors.iter().flatten())),
            ),
        }
    }

    /// Polygons of areal shapes, empty for points and curves.
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> {
        let slice: &[Polygon] = match &self.shape {
            Shape::Polygon(p) => std::slice::from_ref(p),
            Shape::Surface(ps) | Shape::MultiSurface(ps) => ps,
            _ => &[],
        };
        slice.iter()
    }

    pub fn polygons_mut(&mut self) -> impl Iterator<Item = &mut Polygon> {
        let slice: &mut [Polygon] = match &mut self.shape {
            Shape::Polygon(p) => std::slice::from_mut(p),
            Shape::Surface(ps) | Shape::MultiSurface(ps) => ps,
            _ => &mut [],
        };
        slice.iter_mut()
    }

    /// Bounding box in the geometry's CRS.
    #[must_use]
    pub fn envelope(&self) -> Option<Envelope> {
        Envelope::from_coords(self.coords(), self.srs_name.as_deref())
    }
}

/// Axis order of a coordinate reference system as written in documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    EastNorth,
    NorthEast,
}

/// EPSG codes of geographic CRSs with latitude first.
const NORTH_EAST_CODES: &[&str] = &[
    "4326", "4258", "4269", "4267", "4230", "4289", "4283", "4171", "4612", "4937", "4979",
];

impl AxisOrder {
    /// Axis order implied by an `srsName`.
    ///
    /// URN and `http://www.opengis.net/def/crs/` names follow the EPSG axis
    /// order; legacy `EPSG:nnnn` names are always east/north.
    ///
    /// # Examples
    /// ```
    /// use featuregraph::geometry::AxisOrder;
    ///
    /// assert_eq!(AxisOrder::for_srs_name(Some("urn:ogc:def:crs:EPSG::4326")), AxisOrder::NorthEast);
    /// assert_eq!(AxisOrder::for_srs_name(Some("EPSG:4326")), AxisOrder::EastNorth);
    /// assert_eq!(AxisOrder::for_srs_name(Some("urn:ogc:def:crs:EPSG::28992")), AxisOrder::EastNorth);
    /// ```
    #[must_use]
    pub fn for_srs_name(srs_name: Option<&str>) -> Self {
        let Some(name) = srs_name else {
            return Self::EastNorth;
        };
        let authoritative =
            name.starts_with("urn:") || name.starts_with("http://www.opengis.net/def/crs/");
        if !authoritative {
            return Self::EastNorth;
        }
        let code = name.rsplit([':', '/']).next().unwrap_or_default();
        if NORTH_EAST_CODES.contains(&code) {
            Self::NorthEast
        } else {
            Self::EastNorth
        }
    }

    /// Convert between document order and east/north.
    #[must_use]
    pub fn apply(&self, coord: Coord) -> Coord {
        match self {
            Self::EastNorth => coord,
            Self::NorthEast => Coord::new(coord.y, coord.x),
        }
    }
}

/// Bridge between feature properties and a concrete geometry encoding.
pub trait GeometryAdapter: Send + Sync {
    /// Read a geometry element. `default_srs` applies when the element and
    /// its ancestors carry no `srsName`.
    fn parse_geometry(&self, node: Node<'_, '_>, default_srs: Option<&str>) -> Result<Geometry>;

    /// Write a geometry element. `id_hint` seeds the generated `gml:id`s.
    fn serialize_geometry(
        &self,
        geometry: &Geometry,
        id_hint: &str,
        writer: &mut XmlWriter<'_>,
    ) -> Result<()>;

    fn envelope_of(&self, geometry: &Geometry) -> Option<Envelope> {
        geometry.envelope()
    }

    /// Check ring closure, ring size and self-intersection.
    fn is_valid(&self, geometry: &Geometry) -> bool;

    /// `true` unless some polygon has a clockwise exterior ring.
    fn exterior_is_ccw(&self, geometry: &Geometry) -> bool {
        geometry
            .polygons()
            .all(|p| is_counter_clockwise(&p.exterior))
    }

    /// `true` unless some polygon has a counter-clockwise interior ring.
    fn interiors_are_cw(&self, geometry: &Geometry) -> bool {
        geometry
            .polygons()
            .all(|p| p.interiors.iter().all(|r| !is_counter_clockwise(r)))
    }

    /// Orient every polygon of the geometry in place.
    fn fix_orientation(&self, geometry: &mut Geometry) -> WindingFix {
        geometry
            .polygons_mut()
            .map(orient_polygon)
            .fold(WindingFix::default(), |acc, fix| WindingFix {
                exteriors: acc.exteriors + fix.exteriors,
                interiors: acc.interiors + fix.interiors,
            })
    }
}
