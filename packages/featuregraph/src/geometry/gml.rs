//! GML 3.2 geometry codec.
//!
//! Reads GML 3.1 and 3.2 markup (plus the GML 2 `coordinates` and
//! boundary elements still found in older services) and writes GML 3.2.

use roxmltree::Node;

use super::ring::is_valid_ring;
use super::{AxisOrder, Coord, Geometry, GeometryAdapter, Polygon, Shape};
use crate::config::GML_NS;
use crate::error::{FeatureError, Result};
use crate::xml::{element_children, find_gml_child, find_gml_children, get_tag_name, get_text, XmlWriter};

/// Geometry adapter for GML markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct GmlGeometryAdapter;

impl GeometryAdapter for GmlGeometryAdapter {
    fn parse_geometry(&self, node: Node<'_, '_>, default_srs: Option<&str>) -> Result<Geometry> {
        let srs_name = node.attribute("srsName").or(default_srs);
        let reader = Reader {
            axis: AxisOrder::for_srs_name(srs_name),
        };

        let shape = match get_tag_name(node) {
            "Point" => Shape::Point(reader.point(node)?),
            "LineString" => Shape::LineString(reader.line(node)?),
            "Curve" => Shape::LineString(reader.curve(node)?),
            "Polygon" => Shape::Polygon(reader.polygon(node)?),
            "Surface" => Shape::Surface(reader.surface(node)?),
            "MultiPoint" => Shape::MultiPoint(reader.multi_point(node)?),
            "MultiCurve" | "MultiLineString" => Shape::MultiCurve(reader.multi_curve(node)?),
            "MultiSurface" | "MultiPolygon" => Shape::MultiSurface(reader.multi_surface(node)?),
            other => return Err(invalid(other, "unsupported geometry type")),
        };

        Ok(Geometry::new(shape, srs_name.map(str::to_string)))
    }

    fn serialize_geometry(
        &self,
        geometry: &Geometry,
        id_hint: &str,
        writer: &mut XmlWriter<'_>,
    ) -> Result<()> {
        let out = Emitter {
            axis: AxisOrder::for_srs_name(geometry.srs_name.as_deref()),
        };

        writer.open_tag(GML_NS, geometry.type_name())?;
        writer.attribute(GML_NS, "id", id_hint)?;
        if let Some(srs_name) = &geometry.srs_name {
            writer.attribute("", "srsName", srs_name)?;
            writer.attribute("", "srsDimension", "2")?;
        }

        match &geometry.shape {
            Shape::Point(c) => out.pos(writer, c)?,
            Shape::LineString(cs) => out.pos_list(writer, cs)?,
            Shape::Polygon(p) => out.rings(writer, p)?,
            Shape::Surface(patches) => {
                writer.open_tag(GML_NS, "patches")?;
                for patch in patches {
                    writer.open_tag(GML_NS, "PolygonPatch")?;
                    out.rings(writer, patch)?;
                    writer.close_tag()?;
                }
                writer.close_tag()?;
            }
            Shape::MultiPoint(points) => {
                for (i, c) in points.iter().enumerate() {
                    out.member(writer, "pointMember", "Point", id_hint, i)?;
                    out.pos(writer, c)?;
                    writer.close_tag()?;
                    writer.close_tag()?;
                }
            }
            Shape::MultiCurve(lines) => {
                for (i, line) in lines.iter().enumerate() {
                    out.member(writer, "curveMember", "LineString", id_hint, i)?;
                    out.pos_list(writer, line)?;
                    writer.close_tag()?;
                    writer.close_tag()?;
                }
            }
            Shape::MultiSurface(polygons) => {
                for (i, polygon) in polygons.iter().enumerate() {
                    out.member(writer, "surfaceMember", "Polygon", id_hint, i)?;
                    out.rings(writer, polygon)?;
                    writer.close_tag()?;
                    writer.close_tag()?;
                }
            }
        }

        writer.close_tag()
    }

    fn is_valid(&self, geometry: &Geometry) -> bool {
        let finite = geometry.coords().all(|c| c.x.is_finite() && c.y.is_finite());
        finite
            && match &geometry.shape {
                Shape::Point(_) | Shape::MultiPoint(_) => true,
                Shape::LineString(cs) => cs.len() >= 2,
                Shape::MultiCurve(lines) => lines.iter().all(|l| l.len() >= 2),
                Shape::Surface(patches) if patches.is_empty() => false,
                Shape::Polygon(_) | Shape::Surface(_) | Shape::MultiSurface(_) => {
                    geometry.polygons().all(|p| {
                        is_valid_ring(&p.exterior) && p.interiors.iter().all(|r| is_valid_ring(r))
                    })
                }
            }
    }
}

fn invalid(element: &str, message: impl Into<String>) -> FeatureError {
    FeatureError::InvalidGeometry {
        element: element.to_string(),
        message: message.into(),
    }
}

struct Reader {
    axis: AxisOrder,
}

impl Reader {
    fn point(&self, node: Node<'_, '_>) -> Result<Coord> {
        let coords = self.positions(node)?;
        match coords.as_slice() {
            [c] => Ok(*c),
            _ => Err(invalid(
                "Point",
                format!("expected 1 position, found {}", coords.len()),
            )),
        }
    }

    fn line(&self, node: Node<'_, '_>) -> Result<Vec<Coord>> {
        let coords = self.positions(node)?;
        if coords.is_empty() {
            return Err(invalid(get_tag_name(node), "no positions"));
        }
        Ok(coords)
    }

    fn curve(&self, node: Node<'_, '_>) -> Result<Vec<Coord>> {
        let segments = find_gml_child(node, "segments")
            .ok_or_else(|| invalid("Curve", "missing gml:segments"))?;
        let mut coords: Vec<Coord> = Vec::new();
        for segment in element_children(segments) {
            let part = self.line(segment)?;
            let skip_joint = coords.last().is_some() && coords.last() == part.first();
            coords.extend(part.into_iter().skip(usize::from(skip_joint)));
        }
        if coords.is_empty() {
            return Err(invalid("Curve", "no segments"));
        }
        Ok(coords)
    }

    fn ring(&self, boundary: Node<'_, '_>) -> Result<Vec<Coord>> {
        let ring = find_gml_child(boundary, "LinearRing").ok_or_else(|| {
            invalid(get_tag_name(boundary), "only gml:LinearRing boundaries are supported")
        })?;
        self.positions(ring)
    }

    fn polygon(&self, node: Node<'_, '_>) -> Result<Polygon> {
        let exterior = find_gml_child(node, "exterior")
            .or_else(|| find_gml_child(node, "outerBoundaryIs"))
            .ok_or_else(|| invalid(get_tag_name(node), "missing exterior ring"))?;
        let exterior = self.ring(exterior)?;
        let interiors = find_gml_children(node, "interior")
            .chain(find_gml_children(node, "innerBoundaryIs"))
            .map(|boundary| self.ring(boundary))
            .collect::<Result<Vec<_>>>()?;
        Ok(Polygon {
            exterior,
            interiors,
        })
    }

    fn surface(&self, node: Node<'_, '_>) -> Result<Vec<Polygon>> {
        let patches = find_gml_child(node, "patches")
            .ok_or_else(|| invalid("Surface", "missing gml:patches"))?;
        element_children(patches)
            .map(|patch| self.polygon(patch))
            .collect()
    }

    fn multi_point(&self, node: Node<'_, '_>) -> Result<Vec<Coord>> {
        members(node, "pointMember", "pointMembers")
            .into_iter()
            .map(|point| self.point(point))
            .collect()
    }

    fn multi_curve(&self, node: Node<'_, '_>) -> Result<Vec<Vec<Coord>>> {
        let mut curves = members(node, "curveMember", "curveMembers");
        curves.extend(members(node, "lineStringMember", "lineStringMembers"));
        curves
            .into_iter()
            .map(|curve| match get_tag_name(curve) {
                "Curve" => self.curve(curve),
                _ => self.line(curve),
            })
            .collect()
    }

    fn multi_surface(&self, node: Node<'_, '_>) -> Result<Vec<Polygon>> {
        let mut surfaces = members(node, "surfaceMember", "surfaceMembers");
        surfaces.extend(members(node, "polygonMember", "polygonMembers"));
        let mut polygons = Vec::new();
        for surface in surfaces {
            match get_tag_name(surface) {
                "Surface" => polygons.extend(self.surface(surface)?),
                _ => polygons.push(self.polygon(surface)?),
            }
        }
        Ok(polygons)
    }

    /// Positions from `posList`, a run of `pos`, or GML 2 `coordinates`.
    fn positions(&self, node: Node<'_, '_>) -> Result<Vec<Coord>> {
        if let Some(pos_list) = find_gml_child(node, "posList") {
            let dim = dimension(pos_list)?;
            return self.parse_numbers(&get_text(pos_list), dim, "posList");
        }

        let mut coords = Vec::new();
        for pos in find_gml_children(node, "pos") {
            let dim = dimension(pos)?;
            let parsed = self.parse_numbers(&get_text(pos), dim, "pos")?;
            if parsed.len() != 1 {
                return Err(invalid("pos", "expected exactly one position"));
            }
            coords.extend(parsed);
        }
        if !coords.is_empty() {
            return Ok(coords);
        }

        if let Some(coordinates) = find_gml_child(node, "coordinates") {
            return self.parse_coordinates(coordinates);
        }

        Err(invalid(get_tag_name(node), "no coordinates"))
    }

    fn parse_numbers(&self, text: &str, dim: usize, element: &str) -> Result<Vec<Coord>> {
        let values = text
            .split_whitespace()
            .map(|token| parse_number(token, element))
            .collect::<Result<Vec<f64>>>()?;
        if values.len() % dim != 0 {
            return Err(invalid(
                element,
                format!("{} values do not divide into {dim}D positions", values.len()),
            ));
        }
        Ok(values
            .chunks(dim)
            .map(|c| self.axis.apply(Coord::new(c[0], c[1])))
            .collect())
    }

    fn parse_coordinates(&self, node: Node<'_, '_>) -> Result<Vec<Coord>> {
        let cs = node.attribute("cs").unwrap_or(",");
        let decimal = node.attribute("decimal").unwrap_or(".");
        let text = get_text(node);
        let tuples: Vec<&str> = match node.attribute("ts") {
            Some(ts) if !ts.trim().is_empty() => text.split(ts).collect(),
            _ => text.split_whitespace().collect(),
        };

        tuples
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .map(|tuple| {
                let parts: Vec<String> = tuple
                    .split(cs)
                    .map(|p| p.trim().replace(decimal, "."))
                    .collect();
                if parts.len() < 2 {
                    return Err(invalid("coordinates", format!("incomplete tuple '{tuple}'")));
                }
                let x = parse_number(&parts[0], "coordinates")?;
                let y = parse_number(&parts[1], "coordinates")?;
                Ok(self.axis.apply(Coord::new(x, y)))
            })
            .collect()
    }
}

fn parse_number(token: &str, element: &str) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| invalid(element, format!("invalid number '{token}'")))
}

/// Coordinate dimension from the nearest `srsDimension`, defaulting to 2.
fn dimension(node: Node<'_, '_>) -> Result<usize> {
    let declared = node
        .ancestors()
        .filter(|n| n.is_element())
        .find_map(|n| n.attribute("srsDimension"));
    match declared {
        None => Ok(2),
        Some(value) => match value.trim().parse::<usize>() {
            Ok(dim) if dim >= 2 => Ok(dim),
            _ => Err(invalid(
                get_tag_name(node),
                format!("unsupported srsDimension '{value}'"),
            )),
        },
    }
}

/// Geometry children of `<member>` elements and of a `<members>` wrapper.
fn members<'a, 'input>(
    node: Node<'a, 'input>,
    member: &'a str,
    wrapper: &str,
) -> Vec<Node<'a, 'input>> {
    let mut found: Vec<Node<'a, 'input>> = find_gml_children(node, member)
        .filter_map(|m| element_children(m).next())
        .collect();
    if let Some(list) = find_gml_child(node, wrapper) {
        found.extend(element_children(list));
    }
    found
}

struct Emitter {
    axis: AxisOrder,
}

impl Emitter {
    fn format(&self, coords: &[Coord]) -> String {
        coords
            .iter()
            .map(|c| {
                let c = self.axis.apply(*c);
                format!("{} {}", c.x, c.y)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn pos(&self, writer: &mut XmlWriter<'_>, c: &Coord) -> Result<()> {
        writer.text_element(GML_NS, "pos", &self.format(std::slice::from_ref(c)))
    }

    fn pos_list(&self, writer: &mut XmlWriter<'_>, coords: &[Coord]) -> Result<()> {
        writer.text_element(GML_NS, "posList", &self.format(coords))
    }

    fn rings(&self, writer: &mut XmlWriter<'_>, polygon: &Polygon) -> Result<()> {
        self.ring(writer, "exterior", &polygon.exterior)?;
        for interior in &polygon.interiors {
            self.ring(writer, "interior", interior)?;
        }
        Ok(())
    }

    fn ring(&self, writer: &mut XmlWriter<'_>, boundary: &str, coords: &[Coord]) -> Result<()> {
        writer.open_tag(GML_NS, boundary)?;
        writer.open_tag(GML_NS, "LinearRing")?;
        self.pos_list(writer, coords)?;
        writer.close_tag()?;
        writer.close_tag()
    }

    /// Open `<member><Child gml:id="hint.n">`; the caller closes both.
    fn member(
        &self,
        writer: &mut XmlWriter<'_>,
        member: &str,
        child: &str,
        id_hint: &str,
        index: usize,
    ) -> Result<()> {
        writer.open_tag(GML_NS, member)?;
        writer.open_tag(GML_NS, child)?;
        writer.attribute(GML_NS, "id", &format!("{id_hint}.{}", index + 1))
    }
}
