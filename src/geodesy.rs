//! Great-circle helpers on a spherical Earth.

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in metres between two lat/lon points given in degrees
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_M * c
}

/// Shift a point by local north/east offsets in metres (equirectangular approximation)
pub fn offset_by_meters(lat: f64, lon: f64, north_m: f64, east_m: f64) -> (f64, f64) {
    let d_lat = north_m / EARTH_RADIUS_M;
    let d_lon = east_m / (EARTH_RADIUS_M * lat.to_radians().cos());
    (lat + d_lat.to_degrees(), lon + d_lon.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let d = haversine_distance(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(d, 111_195.0, max_relative = 0.01);
    }

    #[test]
    fn test_identical_points() {
        assert_eq!(haversine_distance(48.8566, 2.3522, 48.8566, 2.3522), 0.0);
    }

    #[test]
    fn test_symmetric() {
        let ab = haversine_distance(51.5074, -0.1278, 48.8566, 2.3522);
        let ba = haversine_distance(48.8566, 2.3522, 51.5074, -0.1278);
        assert_relative_eq!(ab, ba, epsilon = 1e-6);
        // London to Paris is roughly 344 km
        assert_relative_eq!(ab, 343_500.0, max_relative = 0.01);
    }

    #[test]
    fn test_monotonic_in_separation() {
        let mut last = 0.0;
        for step in 1..=50 {
            let d = haversine_distance(10.0, 20.0, 10.0 + step as f64 * 0.01, 20.0);
            assert!(d > last);
            last = d;
        }
    }

    #[test]
    fn test_offset_round_trips_through_haversine() {
        let (lat, lon) = offset_by_meters(45.0, 7.0, 100.0, 0.0);
        assert_relative_eq!(haversine_distance(45.0, 7.0, lat, lon), 100.0, epsilon = 1e-6);

        let (lat, lon) = offset_by_meters(45.0, 7.0, 0.0, 30.0);
        assert_relative_eq!(haversine_distance(45.0, 7.0, lat, lon), 30.0, max_relative = 1e-4);
    }
}
