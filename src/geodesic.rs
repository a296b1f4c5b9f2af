/// Mean Earth radius used for trail distances, in miles.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Meters per statute mile.
pub const METERS_PER_MILE: f64 = 1609.34;

/// Great-circle distance between two lat/lng pairs (degrees), in miles.
///
/// Haversine on a sphere. The intermediate term is clamped to [0, 1] so
/// antipodal and near-pole inputs stay finite.
pub fn distance_miles(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_MILES * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::{point, HaversineDistance};

    #[test]
    fn test_identical_points_are_zero() {
        for (lat, lng) in [(0.0, 0.0), (40.0, -105.0), (89.9999, 179.0), (-90.0, 0.0)] {
            assert_eq!(distance_miles(lat, lng, lat, lng), 0.0);
        }
    }

    #[test]
    fn test_symmetric() {
        let pairs = [
            ((40.0, -105.0), (40.0001, -105.0)),
            ((51.5, -0.12), (48.85, 2.35)),
            ((-33.9, 151.2), (35.7, 139.7)),
        ];
        for ((a_lat, a_lng), (b_lat, b_lng)) in pairs {
            assert_eq!(
                distance_miles(a_lat, a_lng, b_lat, b_lng),
                distance_miles(b_lat, b_lng, a_lat, a_lng)
            );
        }
    }

    #[test]
    fn test_small_north_step() {
        // 0.0001° of latitude is about 11.1 m
        let d = distance_miles(40.0, -105.0, 40.0001, -105.0);
        assert_relative_eq!(d * METERS_PER_MILE, 11.119, epsilon = 0.01);
    }

    #[test]
    fn test_antipodal_and_polar_are_finite() {
        let antipodal = distance_miles(0.0, 0.0, 0.0, 180.0);
        assert!(antipodal.is_finite());
        assert_relative_eq!(antipodal, std::f64::consts::PI * EARTH_RADIUS_MILES, epsilon = 1e-6);

        let polar = distance_miles(90.0, 0.0, -90.0, 0.0);
        assert!(polar.is_finite());

        let near_pole = distance_miles(89.99999, 10.0, 89.99999, -170.0);
        assert!(near_pole.is_finite() && near_pole >= 0.0);
    }

    #[test]
    fn test_agrees_with_geo_haversine() {
        let a = point!(x: -105.0, y: 40.0);
        let b = point!(x: -104.9, y: 40.05);
        let reference_miles = a.haversine_distance(&b) / 1609.344;
        let ours = distance_miles(40.0, -105.0, 40.05, -104.9);
        assert_relative_eq!(ours, reference_miles, max_relative = 1e-5);
    }
}
