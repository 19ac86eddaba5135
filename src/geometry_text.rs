//! Geometry handling for the `the_geom` attribute: shapefile shapes become
//! `geo` geometries, geometries become WKT text, and WKT text yields the
//! first polygon ring.

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use shapefile::{PolygonRing, Shape};

const RING_START: &str = "(((";
const RING_END: &str = ")))";

/// Converts a shapefile shape into the geometry a feature exposes as
/// `the_geom`. Areal shapes always come out as multipolygons, lines as
/// multilinestrings, so the WKT text has the `(((` nesting for every
/// polygon layer. Null and multipatch shapes have no geometry.
pub fn shape_to_geometry(shape: Shape) -> Option<Geometry<f64>> {
    match shape {
        Shape::NullShape | Shape::Multipatch(_) => None,
        Shape::Point(p) => Some(Point::new(p.x, p.y).into()),
        Shape::PointM(p) => Some(Point::new(p.x, p.y).into()),
        Shape::PointZ(p) => Some(Point::new(p.x, p.y).into()),
        Shape::Multipoint(mp) => Some(multipoint(mp.points(), |p| Coord { x: p.x, y: p.y })),
        Shape::MultipointM(mp) => Some(multipoint(mp.points(), |p| Coord { x: p.x, y: p.y })),
        Shape::MultipointZ(mp) => Some(multipoint(mp.points(), |p| Coord { x: p.x, y: p.y })),
        Shape::Polyline(line) => Some(multilinestring(line.parts(), |p| Coord { x: p.x, y: p.y })),
        Shape::PolylineM(line) => Some(multilinestring(line.parts(), |p| Coord { x: p.x, y: p.y })),
        Shape::PolylineZ(line) => Some(multilinestring(line.parts(), |p| Coord { x: p.x, y: p.y })),
        Shape::Polygon(polygon) => Some(multipolygon(polygon.rings(), |p| Coord { x: p.x, y: p.y })),
        Shape::PolygonM(polygon) => Some(multipolygon(polygon.rings(), |p| Coord { x: p.x, y: p.y })),
        Shape::PolygonZ(polygon) => Some(multipolygon(polygon.rings(), |p| Coord { x: p.x, y: p.y })),
    }
}

// The point types of the M and Z variants only differ in extra ordinates,
// so each conversion takes the xy accessor as a closure.
fn ring<P>(points: &[P], xy: &impl Fn(&P) -> Coord<f64>) -> LineString<f64> {
    LineString::new(points.iter().map(xy).collect())
}

fn multipoint<P>(points: &[P], xy: impl Fn(&P) -> Coord<f64>) -> Geometry<f64> {
    MultiPoint::new(points.iter().map(|p| Point::from(xy(p))).collect()).into()
}

fn multilinestring<P>(parts: &[Vec<P>], xy: impl Fn(&P) -> Coord<f64>) -> Geometry<f64> {
    MultiLineString::new(parts.iter().map(|part| ring(part, &xy)).collect()).into()
}

// A shapefile polygon is a flat list of rings: each outer ring opens a new
// polygon and the inner rings that follow it are its holes.
fn multipolygon<P>(rings: &[PolygonRing<P>], xy: impl Fn(&P) -> Coord<f64>) -> Geometry<f64> {
    let mut polygons = Vec::new();
    let mut current: Option<(LineString<f64>, Vec<LineString<f64>>)> = None;

    for shp_ring in rings {
        match shp_ring {
            PolygonRing::Outer(points) => {
                if let Some((exterior, interiors)) = current.take() {
                    polygons.push(Polygon::new(exterior, interiors));
                }
                current = Some((ring(points, &xy), Vec::new()));
            }
            PolygonRing::Inner(points) => match current.as_mut() {
                Some((_, interiors)) => interiors.push(ring(points, &xy)),
                None => log::warn!("inner ring without a preceding outer ring, dropping it"),
            },
        }
    }
    if let Some((exterior, interiors)) = current.take() {
        polygons.push(Polygon::new(exterior, interiors));
    }
    MultiPolygon::new(polygons).into()
}

/// Renders a geometry as WKT text: `TYPE (...)` with a space after the
/// keyword and `", "` between coordinates and between parts.
pub fn to_wkt(geometry: &Geometry<f64>) -> String {
    let mut out = String::new();
    write_geometry(&mut out, geometry);
    out
}

fn write_geometry(out: &mut String, geometry: &Geometry<f64>) {
    match geometry {
        Geometry::Point(p) => {
            out.push_str("POINT (");
            write_coord(out, &p.0);
            out.push(')');
        }
        Geometry::Line(line) => {
            out.push_str("LINESTRING ");
            write_coords(out, &[line.start, line.end]);
        }
        Geometry::LineString(ls) => {
            out.push_str("LINESTRING");
            write_or_empty(out, ls.0.is_empty(), |out| write_coords(out, &ls.0));
        }
        Geometry::Polygon(polygon) => {
            out.push_str("POLYGON");
            write_or_empty(out, polygon.exterior().0.is_empty(), |out| {
                write_polygon(out, polygon)
            });
        }
        Geometry::MultiPoint(mp) => {
            out.push_str("MULTIPOINT");
            write_or_empty(out, mp.0.is_empty(), |out| {
                write_list(out, &mp.0, |out, p| {
                    out.push('(');
                    write_coord(out, &p.0);
                    out.push(')');
                })
            });
        }
        Geometry::MultiLineString(mls) => {
            out.push_str("MULTILINESTRING");
            write_or_empty(out, mls.0.is_empty(), |out| {
                write_list(out, &mls.0, |out, ls| write_coords(out, &ls.0))
            });
        }
        Geometry::MultiPolygon(mp) => {
            out.push_str("MULTIPOLYGON");
            write_or_empty(out, mp.0.is_empty(), |out| {
                write_list(out, &mp.0, write_polygon)
            });
        }
        Geometry::GeometryCollection(gc) => {
            out.push_str("GEOMETRYCOLLECTION");
            write_or_empty(out, gc.0.is_empty(), |out| {
                write_list(out, &gc.0, write_geometry)
            });
        }
        Geometry::Rect(rect) => write_geometry(out, &Geometry::Polygon(rect.to_polygon())),
        Geometry::Triangle(triangle) => {
            write_geometry(out, &Geometry::Polygon(triangle.to_polygon()))
        }
    }
}

fn write_or_empty(out: &mut String, empty: bool, body: impl FnOnce(&mut String)) {
    if empty {
        out.push_str(" EMPTY");
    } else {
        out.push(' ');
        body(out);
    }
}

fn write_list<T>(out: &mut String, items: &[T], mut item: impl FnMut(&mut String, &T)) {
    out.push('(');
    for (i, value) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item(out, value);
    }
    out.push(')');
}

fn write_polygon(out: &mut String, polygon: &Polygon<f64>) {
    out.push('(');
    write_coords(out, &polygon.exterior().0);
    for interior in polygon.interiors() {
        out.push_str(", ");
        write_coords(out, &interior.0);
    }
    out.push(')');
}

fn write_coords(out: &mut String, coords: &[Coord<f64>]) {
    write_list(out, coords, write_coord);
}

fn write_coord(out: &mut String, coord: &Coord<f64>) {
    out.push_str(&format!("{} {}", coord.x, coord.y));
}

/// Returns the text strictly between the first `(((` and the first `)))`
/// that follows it, or `None` when either marker is missing.
pub fn extract_ring(text: &str) -> Option<&str> {
    let start = text.find(RING_START)? + RING_START.len();
    let end = text[start..].find(RING_END)?;
    Some(&text[start..start + end])
}

#[cfg(test)]
mod tests {
    use geo::{coord, line_string, polygon};
    use rstest::rstest;
    use shapefile::Point as ShpPoint;

    use super::*;

    #[rstest]
    #[case("MULTIPOLYGON (((1 2, 3 4, 1 2)))", Some("1 2, 3 4, 1 2"))]
    #[case("MULTIPOLYGON (((0 0, 1 0, 0 0)), ((5 5, 6 5, 5 5)))", Some("0 0, 1 0, 0 0)), ((5 5, 6 5, 5 5"))]
    #[case("MULTIPOLYGON ((()))", Some(""))]
    #[case("POINT (1 2)", None)]
    #[case("MULTILINESTRING ((1 2, 3 4))", None)]
    #[case(")))(((1 2", None)]
    #[case("", None)]
    fn test_extract_ring(#[case] text: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_ring(text), expected);
    }

    #[test]
    fn test_wkt_of_multipolygon_with_hole() {
        let outer = polygon!(
            exterior: [(x: 0., y: 0.), (x: 0., y: 10.), (x: 10., y: 10.), (x: 0., y: 0.)],
            interiors: [[(x: 1., y: 2.), (x: 2., y: 2.), (x: 1., y: 2.)]]
        );
        let geometry: Geometry<f64> = MultiPolygon::new(vec![outer]).into();
        assert_eq!(
            to_wkt(&geometry),
            "MULTIPOLYGON (((0 0, 0 10, 10 10, 0 0), (1 2, 2 2, 1 2)))"
        );
    }

    #[test]
    fn test_wkt_of_other_geometries() {
        assert_eq!(
            to_wkt(&Geometry::Point(Point::new(7.5, -1.25))),
            "POINT (7.5 -1.25)"
        );
        let lines: Geometry<f64> = MultiLineString::new(vec![
            line_string![(x: 1., y: 2.), (x: 3., y: 4.)],
            line_string![(x: 5., y: 6.), (x: 7., y: 8.)],
        ])
        .into();
        assert_eq!(to_wkt(&lines), "MULTILINESTRING ((1 2, 3 4), (5 6, 7 8))");
        let points: Geometry<f64> =
            MultiPoint::new(vec![Point::new(1., 2.), Point::new(3., 4.)]).into();
        assert_eq!(to_wkt(&points), "MULTIPOINT ((1 2), (3 4))");
        assert_eq!(
            to_wkt(&Geometry::MultiPolygon(MultiPolygon::new(vec![]))),
            "MULTIPOLYGON EMPTY"
        );
    }

    #[test]
    fn test_polygon_shape_becomes_multipolygon() {
        let shape = Shape::Polygon(shapefile::Polygon::with_rings(vec![
            PolygonRing::Outer(vec![
                ShpPoint::new(0., 0.),
                ShpPoint::new(0., 4.),
                ShpPoint::new(4., 4.),
                ShpPoint::new(4., 0.),
                ShpPoint::new(0., 0.),
            ]),
            PolygonRing::Inner(vec![
                ShpPoint::new(1., 1.),
                ShpPoint::new(2., 1.),
                ShpPoint::new(2., 2.),
                ShpPoint::new(1., 2.),
                ShpPoint::new(1., 1.),
            ]),
            PolygonRing::Outer(vec![
                ShpPoint::new(10., 10.),
                ShpPoint::new(10., 11.),
                ShpPoint::new(11., 11.),
                ShpPoint::new(11., 10.),
                ShpPoint::new(10., 10.),
            ]),
        ]));

        let geometry = shape_to_geometry(shape).unwrap();
        let Geometry::MultiPolygon(mp) = &geometry else {
            panic!("expected a multipolygon, got {geometry:?}");
        };
        assert_eq!(mp.0.len(), 2);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert_eq!(mp.0[1].interiors().len(), 0);
        assert_eq!(mp.0[1].exterior().0[0], coord! { x: 10., y: 10. });
        assert_eq!(
            extract_ring(&to_wkt(&geometry)),
            Some("0 0, 0 4, 4 4, 4 0, 0 0), (1 1, 2 1, 2 2, 1 2, 1 1)), ((10 10, 10 11, 11 11, 11 10, 10 10")
        );
    }

    #[test]
    fn test_null_shape_has_no_geometry() {
        assert!(shape_to_geometry(Shape::NullShape).is_none());
    }
}
