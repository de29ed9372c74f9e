//! Great-circle distance and the attendance radius check.

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Default maximum distance between student and teacher, in meters.
pub const DEFAULT_MAX_DISTANCE_METERS: f64 = 20.0;

/// Haversine distance in meters between two coordinates given in degrees.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Result of a proximity check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Proximity {
    Within { distance_meters: f64 },
    TooFar { distance_meters: f64, max_meters: f64 },
}

/// Applies the attendance radius. The boundary is inclusive.
#[derive(Debug, Clone, Copy)]
pub struct ProximityValidator {
    max_distance_meters: f64,
}

impl Default for ProximityValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DISTANCE_METERS)
    }
}

impl ProximityValidator {
    pub fn new(max_distance_meters: f64) -> Self {
        Self {
            max_distance_meters,
        }
    }

    pub fn max_distance_meters(&self) -> f64 {
        self.max_distance_meters
    }

    /// Checks `point` against `anchor`, both as (latitude, longitude).
    pub fn check(&self, anchor: (f64, f64), point: (f64, f64)) -> Proximity {
        let distance = distance_meters(anchor.0, anchor.1, point.0, point.1);
        if distance <= self.max_distance_meters {
            Proximity::Within {
                distance_meters: distance,
            }
        } else {
            Proximity::TooFar {
                distance_meters: distance,
                max_meters: self.max_distance_meters,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 0.05;

    #[test]
    fn test_zero_distance_for_same_point() {
        for (lat, lon) in [(0.0, 0.0), (12.9716, 77.5946), (-33.8688, 151.2093), (89.9, -179.9)] {
            assert_eq!(distance_meters(lat, lon, lat, lon), 0.0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            ((12.9716, 77.5946), (12.980, 77.600)),
            ((51.5074, -0.1278), (48.8566, 2.3522)),
            ((-1.0, -1.0), (1.0, 1.0)),
        ];
        for ((a_lat, a_lon), (b_lat, b_lon)) in pairs {
            let ab = distance_meters(a_lat, a_lon, b_lat, b_lon);
            let ba = distance_meters(b_lat, b_lon, a_lat, a_lon);
            assert!((ab - ba).abs() < 1e-9, "{} != {}", ab, ba);
        }
    }

    #[test]
    fn test_latitude_offset_of_0_00018_degrees_is_about_20m() {
        let d = distance_meters(12.9716, 77.5946, 12.97178, 77.5946);
        // R * 0.00018 * pi / 180
        let expected = EARTH_RADIUS_METERS * 0.00018_f64.to_radians();
        assert!((d - expected).abs() < TOLERANCE, "got {}", d);
        assert!((d - 20.0).abs() < 0.1, "got {}", d);
    }

    #[test]
    fn test_nearby_student_is_about_7m() {
        let d = distance_meters(12.9716, 77.5946, 12.97165, 77.59465);
        assert!((d - 7.0).abs() < 1.0, "got {}", d);
        assert!(d < DEFAULT_MAX_DISTANCE_METERS);
    }

    #[test]
    fn test_far_student_is_about_1_1km() {
        let d = distance_meters(12.9716, 77.5946, 12.980, 77.600);
        assert!((d - 1100.0).abs() < 50.0, "got {}", d);
    }

    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let d = distance_meters(0.0, 0.0, 0.0, 1.0);
        let expected = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn test_antipodal_points() {
        let d = distance_meters(0.0, 0.0, 0.0, 180.0);
        assert!((d - EARTH_RADIUS_METERS * std::f64::consts::PI).abs() < 1e-3);
    }

    #[test]
    fn test_validator_within_radius() {
        let validator = ProximityValidator::default();
        let result = validator.check((12.9716, 77.5946), (12.97165, 77.59465));
        assert!(matches!(result, Proximity::Within { .. }));
    }

    #[test]
    fn test_validator_boundary_is_inclusive() {
        let anchor = (0.0, 0.0);
        let point = (0.0, 0.0001);
        let exact = distance_meters(anchor.0, anchor.1, point.0, point.1);

        assert!(matches!(
            ProximityValidator::new(exact).check(anchor, point),
            Proximity::Within { .. }
        ));
        assert!(matches!(
            ProximityValidator::new(exact - 0.001).check(anchor, point),
            Proximity::TooFar { .. }
        ));
    }

    #[test]
    fn test_validator_reports_distance_when_too_far() {
        let validator = ProximityValidator::default();
        match validator.check((12.9716, 77.5946), (12.980, 77.600)) {
            Proximity::TooFar {
                distance_meters,
                max_meters,
            } => {
                assert!(distance_meters > 1000.0);
                assert_eq!(max_meters, 20.0);
            }
            other => panic!("expected TooFar, got {:?}", other),
        }
    }
}
