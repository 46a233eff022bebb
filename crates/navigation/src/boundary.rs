use model::geo::Coordinate;
use serde::{Deserialize, Serialize};
use utility::geo::{enclosing_box, point_in_polygon};

/// The touring area. Provider routes leaving it are not trusted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct BoundingPolygon {
    vertices: Vec<(f64, f64)>,
    envelope: Option<((f64, f64), (f64, f64))>,
}

impl BoundingPolygon {
    pub fn new(vertices: Vec<Coordinate>) -> Self {
        vertices
            .into_iter()
            .map(|vertex| vertex.as_tuple())
            .collect::<Vec<_>>()
            .into()
    }

    /// A polygon that accepts every coordinate.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.vertices.len() < 3
    }

    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        let (lat, lon) = coordinate.as_tuple();
        // cheap rejection before the ray cast
        if let Some(((min_lat, min_lon), (max_lat, max_lon))) = self.envelope {
            if lat < min_lat || lat > max_lat || lon < min_lon || lon > max_lon {
                return false;
            }
        }
        point_in_polygon(lat, lon, &self.vertices)
    }

    pub fn contains_all<'a, I>(&self, coordinates: I) -> bool
    where
        I: IntoIterator<Item = &'a Coordinate>,
    {
        coordinates
            .into_iter()
            .all(|coordinate| self.contains(coordinate))
    }
}

impl From<Vec<(f64, f64)>> for BoundingPolygon {
    fn from(vertices: Vec<(f64, f64)>) -> Self {
        let envelope = enclosing_box(&vertices);
        Self { vertices, envelope }
    }
}

impl From<BoundingPolygon> for Vec<(f64, f64)> {
    fn from(polygon: BoundingPolygon) -> Self {
        polygon.vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intramuros() -> BoundingPolygon {
        serde_json::from_str("[[14.580, 120.965], [14.580, 120.985], [14.600, 120.985], [14.600, 120.965]]")
            .unwrap()
    }

    #[test]
    fn parses_lat_lon_pairs() {
        let polygon = intramuros();
        assert!(!polygon.is_unrestricted());
        assert!(polygon.contains(&Coordinate::new(14.59, 120.975)));
    }

    #[test]
    fn rejects_outside_points() {
        let polygon = intramuros();
        assert!(!polygon.contains(&Coordinate::new(14.61, 120.975)));
        assert!(!polygon.contains_all(&[
            Coordinate::new(14.59, 120.975),
            Coordinate::new(14.59, 121.0),
        ]));
    }

    #[test]
    fn unrestricted_accepts_everything() {
        let polygon = BoundingPolygon::unrestricted();
        assert!(polygon.contains(&Coordinate::new(-33.9, 151.2)));
        assert!(polygon.contains_all(std::iter::empty()));
    }
}
