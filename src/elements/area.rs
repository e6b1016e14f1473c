use crate::core::{bounds::Bounds, geo::Point};
use crate::engine::{MapEngine, ShapeGeometry, ShapeHandle};

/// The static image a map was authored against before it went live. Area
/// coordinates are given in the image's natural pixels and must be scaled
/// to the size the image is actually displayed at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Poster {
    pub natural: Point,
    pub displayed: Point,
}

impl Poster {
    pub fn new(natural: Point, displayed: Point) -> Self {
        Self { natural, displayed }
    }

    fn scale(&self) -> Point {
        Point::new(
            self.displayed.x / self.natural.x,
            self.displayed.y / self.natural.y,
        )
    }
}

/// Shape grammar of the `shape` attribute. Anything unrecognized (or
/// absent) means the whole poster, as HTML image maps do it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaShape {
    #[default]
    Default,
    Circle,
    Rect,
    Poly,
}

impl AreaShape {
    pub fn from_attr(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "circle" => AreaShape::Circle,
            "rect" => AreaShape::Rect,
            "poly" => AreaShape::Poly,
            _ => AreaShape::Default,
        }
    }

    pub fn as_attr(&self) -> &'static str {
        match self {
            AreaShape::Default => "default",
            AreaShape::Circle => "circle",
            AreaShape::Rect => "rect",
            AreaShape::Poly => "poly",
        }
    }
}

/// A map area element: an interactive hotspot layered over the map.
///
/// Geometry is parsed and scaled lazily at attach time and cached so a
/// detach/re-attach cycle (projection change, reconnect) does not reparse.
pub struct MapArea {
    shape: AreaShape,
    coords: String,
    href: Option<String>,
    alt: Option<String>,
    geometry: Option<ShapeGeometry>,
    handle: Option<ShapeHandle>,
}

impl MapArea {
    pub fn new(shape: AreaShape, coords: impl Into<String>) -> Self {
        Self {
            shape,
            coords: coords.into(),
            href: None,
            alt: None,
            geometry: None,
            handle: None,
        }
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    pub fn shape(&self) -> AreaShape {
        self.shape
    }

    pub fn coords(&self) -> &str {
        &self.coords
    }

    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    pub fn alt(&self) -> Option<&str> {
        self.alt.as_deref()
    }

    pub fn handle(&self) -> Option<ShapeHandle> {
        self.handle
    }

    pub fn geometry(&self) -> Option<&ShapeGeometry> {
        self.geometry.as_ref()
    }

    /// Numbers from the `coords` attribute, comma or whitespace separated.
    /// `None` if any token fails to parse.
    fn parse_coords(&self) -> Option<Vec<f64>> {
        let mut values = Vec::new();
        for token in self
            .coords
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
        {
            match token.parse::<f64>() {
                Ok(value) => values.push(value),
                Err(_) => {
                    log::warn!("unparseable area coordinate {:?}", token);
                    return None;
                }
            }
        }
        Some(values)
    }

    fn build_geometry(&self, poster: Option<&Poster>) -> Option<ShapeGeometry> {
        let scale = poster.map(Poster::scale).unwrap_or(Point::new(1.0, 1.0));
        match self.shape {
            AreaShape::Default => {
                // The whole poster; without one there is nothing to cover.
                let poster = match poster {
                    Some(poster) => poster,
                    None => {
                        log::warn!("default-shaped area with no poster, skipping");
                        return None;
                    }
                };
                Some(ShapeGeometry::Rect(Bounds::from_coords(
                    0.0,
                    0.0,
                    poster.displayed.x,
                    poster.displayed.y,
                )))
            }
            AreaShape::Circle => {
                let values = self.parse_coords()?;
                if values.len() < 3 {
                    log::warn!("circle area needs x,y,r, got {} values", values.len());
                    return None;
                }
                Some(ShapeGeometry::Circle {
                    center: Point::new(values[0] * scale.x, values[1] * scale.y),
                    radius: values[2] * scale.x,
                })
            }
            AreaShape::Rect => {
                let values = self.parse_coords()?;
                if values.len() < 4 {
                    log::warn!("rect area needs two corners, got {} values", values.len());
                    return None;
                }
                Some(ShapeGeometry::Rect(Bounds::from_corners(
                    [values[0] * scale.x, values[1] * scale.y],
                    [values[2] * scale.x, values[3] * scale.y],
                )))
            }
            AreaShape::Poly => {
                let mut values = self.parse_coords()?;
                if values.len() % 2 != 0 {
                    log::warn!("polygon area has an odd coordinate, dropping it");
                    values.pop();
                }
                if values.len() < 6 {
                    log::warn!("polygon area needs at least three vertices, skipping");
                    return None;
                }
                let points = values
                    .chunks_exact(2)
                    .map(|pair| Point::new(pair[0] * scale.x, pair[1] * scale.y))
                    .collect();
                Some(ShapeGeometry::Polygon { points })
            }
        }
    }

    /// Mounts the area's shape on the engine. Already-attached areas are
    /// left alone; areas whose coordinates never produced a geometry stay
    /// unmounted.
    pub(crate) fn attach(&mut self, engine: &mut dyn MapEngine, poster: Option<&Poster>) {
        if self.handle.is_some() {
            return;
        }
        if self.geometry.is_none() {
            self.geometry = self.build_geometry(poster);
        }
        if let Some(geometry) = &self.geometry {
            self.handle = Some(engine.add_shape(geometry.clone(), self.alt.clone()));
        }
    }

    pub(crate) fn detach(&mut self, engine: &mut dyn MapEngine) {
        if let Some(handle) = self.handle.take() {
            engine.remove_shape(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_attr_parsing() {
        assert_eq!(AreaShape::from_attr("circle"), AreaShape::Circle);
        assert_eq!(AreaShape::from_attr("RECT"), AreaShape::Rect);
        assert_eq!(AreaShape::from_attr("poly"), AreaShape::Poly);
        assert_eq!(AreaShape::from_attr("triangle"), AreaShape::Default);
        assert_eq!(AreaShape::from_attr(""), AreaShape::Default);
    }

    #[test]
    fn test_circle_geometry() {
        let area = MapArea::new(AreaShape::Circle, "100, 50, 25");
        match area.build_geometry(None) {
            Some(ShapeGeometry::Circle { center, radius }) => {
                assert_eq!(center, Point::new(100.0, 50.0));
                assert_eq!(radius, 25.0);
            }
            other => panic!("expected circle, got {:?}", other),
        }
    }

    #[test]
    fn test_poster_scaling() {
        let poster = Poster::new(Point::new(1000.0, 500.0), Point::new(500.0, 500.0));
        let area = MapArea::new(AreaShape::Circle, "100 50 25");
        match area.build_geometry(Some(&poster)) {
            Some(ShapeGeometry::Circle { center, radius }) => {
                assert_eq!(center, Point::new(50.0, 50.0));
                // Radius follows the horizontal scale.
                assert_eq!(radius, 12.5);
            }
            other => panic!("expected circle, got {:?}", other),
        }
    }

    #[test]
    fn test_rect_corners_normalized() {
        let area = MapArea::new(AreaShape::Rect, "30,40,10,20");
        match area.build_geometry(None) {
            Some(ShapeGeometry::Rect(bounds)) => {
                assert_eq!(bounds.min, Point::new(10.0, 20.0));
                assert_eq!(bounds.max, Point::new(30.0, 40.0));
            }
            other => panic!("expected rect, got {:?}", other),
        }
    }

    #[test]
    fn test_poly_drops_odd_trailing_coordinate() {
        let area = MapArea::new(AreaShape::Poly, "0,0 10,0 10,10 99");
        match area.build_geometry(None) {
            Some(ShapeGeometry::Polygon { points }) => {
                assert_eq!(points.len(), 3);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_areas_build_nothing() {
        assert!(MapArea::new(AreaShape::Poly, "0,0 10,0")
            .build_geometry(None)
            .is_none());
        assert!(MapArea::new(AreaShape::Circle, "1,2")
            .build_geometry(None)
            .is_none());
        assert!(MapArea::new(AreaShape::Rect, "1,2,garbage,4")
            .build_geometry(None)
            .is_none());
        // Default shape covers the poster; no poster, no geometry.
        assert!(MapArea::new(AreaShape::Default, "")
            .build_geometry(None)
            .is_none());
    }

    #[test]
    fn test_default_shape_covers_poster() {
        let poster = Poster::new(Point::new(800.0, 400.0), Point::new(400.0, 200.0));
        let area = MapArea::new(AreaShape::Default, "");
        match area.build_geometry(Some(&poster)) {
            Some(ShapeGeometry::Rect(bounds)) => {
                assert_eq!(bounds.max, Point::new(400.0, 200.0));
            }
            other => panic!("expected rect, got {:?}", other),
        }
    }
}
