// src/gps/geo.rs
//! Great-circle helpers over signed decimal-degree coordinates

/// Mean Earth radius in meters
pub const EARTH_MEAN_RADIUS: f64 = 6_371_009.0;

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Distance in meters between two positions on a sphere of radius
/// [`EARTH_MEAN_RADIUS`]. Earth is not a sphere, so expect errors of up to
/// about 0.5%.
pub fn distance_between(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    // Evaluate with the points in a fixed order so swapping them gives the
    // bit-identical result
    if (lat2, lon2) < (lat1, lon1) {
        return distance_between(lat2, lon2, lat1, lon1);
    }
    let delta = (lon1 - lon2).to_radians();
    let (sdlong, cdlong) = delta.sin_cos();
    let (slat1, clat1) = lat1.to_radians().sin_cos();
    let (slat2, clat2) = lat2.to_radians().sin_cos();

    let a = clat1 * slat2 - slat1 * clat2 * cdlong;
    let b = clat2 * sdlong;
    let numer = (a * a + b * b).sqrt();
    let denom = slat1 * slat2 + clat1 * clat2 * cdlong;
    numer.atan2(denom) * EARTH_MEAN_RADIUS
}

/// Initial bearing in degrees, `[0, 360)`, from position 1 to position 2.
/// North is 0, east 90.
pub fn course_to(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a1 = dlon.sin() * lat2.cos();
    let a2 = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let bearing = a1.atan2(a2).to_degrees();
    if bearing < 0.0 {
        // Can round up to exactly 360.0 for tiny negative angles
        (bearing + 360.0) % 360.0
    } else {
        bearing
    }
}

/// Name of the nearest of the 16 compass points for a bearing in degrees
pub fn cardinal(bearing: f64) -> &'static str {
    let index = ((bearing + 11.25) / 22.5).floor() as i64;
    COMPASS_POINTS[index.rem_euclid(16) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    const MUNICH: (f64, f64) = (48.1173, 11.516666);
    const LONDON: (f64, f64) = (51.5074, -0.1278);
    const SYDNEY: (f64, f64) = (-33.8688, 151.2093);

    #[test]
    fn test_distance_symmetric_and_zero() {
        for &(a, b) in &[(MUNICH, LONDON), (LONDON, SYDNEY), (SYDNEY, MUNICH)] {
            let ab = distance_between(a.0, a.1, b.0, b.1);
            let ba = distance_between(b.0, b.1, a.0, a.1);
            assert_eq!(ab, ba);
            assert_eq!(distance_between(a.0, a.1, a.0, a.1), 0.0);
        }
    }

    #[test]
    fn test_distance_exactly_symmetric() {
        let points = [
            MUNICH,
            LONDON,
            SYDNEY,
            (0.0, 0.0),
            (-12.5, -77.03),
            (48.1173, -11.516666),
            (89.9, 179.9),
        ];
        for a in &points {
            for b in &points {
                assert_eq!(
                    distance_between(a.0, a.1, b.0, b.1),
                    distance_between(b.0, b.1, a.0, a.1),
                    "{:?} {:?}",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn test_distance_known_values() {
        // One degree of latitude along a meridian
        let one_degree = distance_between(0.0, 0.0, 1.0, 0.0);
        assert!((one_degree - EARTH_MEAN_RADIUS.to_radians()).abs() < 1e-6);

        // Munich to London is roughly 915 km
        let d = distance_between(MUNICH.0, MUNICH.1, LONDON.0, LONDON.1);
        assert!((d - 915_000.0).abs() < 5_000.0, "{}", d);

        // Antipodes are half a circumference apart
        let half = distance_between(0.0, 0.0, 0.0, 180.0);
        assert!((half - std::f64::consts::PI * EARTH_MEAN_RADIUS).abs() < 1e-3);
    }

    #[test]
    fn test_course_cardinal_directions() {
        assert!((course_to(0.0, 0.0, 1.0, 0.0) - 0.0).abs() < 1e-9);
        assert!((course_to(0.0, 0.0, 0.0, 1.0) - 90.0).abs() < 1e-9);
        assert!((course_to(1.0, 0.0, 0.0, 0.0) - 180.0).abs() < 1e-9);
        assert!((course_to(0.0, 1.0, 0.0, 0.0) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_course_range() {
        for &(a, b) in &[(MUNICH, LONDON), (LONDON, SYDNEY), (SYDNEY, MUNICH), (LONDON, MUNICH)] {
            let c = course_to(a.0, a.1, b.0, b.1);
            assert!((0.0..360.0).contains(&c), "{}", c);
        }
        // Munich to London heads west-northwest
        let c = course_to(MUNICH.0, MUNICH.1, LONDON.0, LONDON.1);
        assert_eq!(cardinal(c), "WNW");
    }

    #[test]
    fn test_cardinal() {
        assert_eq!(cardinal(0.0), "N");
        assert_eq!(cardinal(11.24), "N");
        assert_eq!(cardinal(11.25), "NNE");
        assert_eq!(cardinal(45.0), "NE");
        assert_eq!(cardinal(90.0), "E");
        assert_eq!(cardinal(180.0), "S");
        assert_eq!(cardinal(270.0), "W");
        assert_eq!(cardinal(348.75), "N");
        assert_eq!(cardinal(359.9), "N");
        assert_eq!(cardinal(-90.0), "W");
    }
}
