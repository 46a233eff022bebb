pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

/// Great-circle distance in meters.
pub fn haversine_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = to_radians(latitude_1);
    let lon1_rad = to_radians(longitude_1);
    let lat2_rad = to_radians(latitude_2);
    let lon2_rad = to_radians(longitude_2);

    let dlat = lat2_rad - lat1_rad;
    let dlon = lon2_rad - lon1_rad;

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Squared euclidean distance in degree space. Only meaningful for ranking
/// points that lie close to each other.
pub fn squared_planar_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let dlat = latitude_2 - latitude_1;
    let dlon = longitude_2 - longitude_1;
    dlat * dlat + dlon * dlon
}

/// Smallest box containing all `(lat, lon)` points. `None` for no points.
pub fn enclosing_box(points: &[(f64, f64)]) -> Option<((f64, f64), (f64, f64))> {
    let (first, rest) = points.split_first()?;
    let mut min = *first;
    let mut max = *first;
    for &(lat, lon) in rest {
        min = (min.0.min(lat), min.1.min(lon));
        max = (max.0.max(lat), max.1.max(lon));
    }
    Some((min, max))
}

/// Even-odd ray casting test. Points exactly on an edge may land on either
/// side; polygons are expected to have at least three vertices.
pub fn point_in_polygon(lat: f64, lon: f64, polygon: &[(f64, f64)]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (lat_i, lon_i) = polygon[i];
        let (lat_j, lon_j) = polygon[j];
        // edge crosses the horizontal ray through the point?
        if (lat_i > lat) != (lat_j > lat) {
            let crossing_lon = lon_i + (lat - lat_i) / (lat_j - lat_i) * (lon_j - lon_i);
            if lon < crossing_lon {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
