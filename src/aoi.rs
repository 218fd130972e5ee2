//! Builds the spatial search filter from a single point.
//!
//! The catalog API only supports polygon intersection, not point lookups, so
//! a small closed ring is buffered around the requested point and serialized
//! as WKT for the `intersectsWith` parameter.

use crate::error::FetchError;

/// Buffer applied around the center point, in degrees.
pub const DEFAULT_BUFFER_DEG: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct AreaOfInterest {
    /// Closed ring of (lon, lat) pairs; first and last vertex are equal.
    vertices: Vec<(f64, f64)>,
}

impl AreaOfInterest {
    /// Build an axis-aligned ring of `buffer` degrees half-width centered on
    /// the point. Vertices are clamped to valid coordinate ranges near the
    /// poles and the antimeridian, so the ring may be narrower there but
    /// always still encloses the point.
    pub fn from_point(lat: f64, lon: f64, buffer: f64) -> Result<Self, FetchError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(FetchError::InvalidCoordinate(format!(
                "latitude {} outside [-90, 90]",
                lat
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(FetchError::InvalidCoordinate(format!(
                "longitude {} outside [-180, 180]",
                lon
            )));
        }
        if !buffer.is_finite() || buffer <= 0.0 {
            return Err(FetchError::InvalidCoordinate(format!(
                "buffer {} must be a positive number of degrees",
                buffer
            )));
        }

        let lat_min = (lat - buffer).max(-90.0);
        let lat_max = (lat + buffer).min(90.0);
        let lon_min = (lon - buffer).max(-180.0);
        let lon_max = (lon + buffer).min(180.0);

        let vertices = vec![
            (lon_min, lat_min),
            (lon_max, lat_min),
            (lon_max, lat_max),
            (lon_min, lat_max),
            (lon_min, lat_min),
        ];
        Ok(Self { vertices })
    }

    /// WKT rendering in the `lon lat` order the search API expects.
    pub fn to_wkt(self: &Self) -> String {
        let pairs = self
            .vertices
            .iter()
            .map(|(lon, lat)| format!("{} {}", lon, lat))
            .collect::<Vec<_>>()
            .join(",");
        format!("POLYGON(({}))", pairs)
    }

    pub fn contains(self: &Self, lat: f64, lon: f64) -> bool {
        let lons = self.vertices.iter().map(|(lon, _)| *lon);
        let lats = self.vertices.iter().map(|(_, lat)| *lat);
        let lon_min = lons.clone().fold(f64::INFINITY, f64::min);
        let lon_max = lons.fold(f64::NEG_INFINITY, f64::max);
        let lat_min = lats.clone().fold(f64::INFINITY, f64::min);
        let lat_max = lats.fold(f64::NEG_INFINITY, f64::max);
        (lon_min..=lon_max).contains(&lon) && (lat_min..=lat_max).contains(&lat)
    }

    pub fn vertices(self: &Self) -> &[(f64, f64)] {
        &self.vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_is_closed_and_contains_center() {
        let aoi = AreaOfInterest::from_point(36.1, -115.2, DEFAULT_BUFFER_DEG).unwrap();
        let vertices = aoi.vertices();
        assert_eq!(vertices.len(), 5);
        assert_eq!(vertices.first(), vertices.last());
        assert!(aoi.contains(36.1, -115.2));
    }

    #[test]
    fn test_wkt_format() {
        let aoi = AreaOfInterest::from_point(10.0, 20.0, 0.5).unwrap();
        let wkt = aoi.to_wkt();
        assert!(wkt.starts_with("POLYGON(("));
        assert!(wkt.ends_with("))"));
        assert!(wkt.contains("19.5 9.5"));
        assert!(wkt.contains("20.5 10.5"));
    }

    #[test]
    fn test_rejects_out_of_range_latitude() {
        let result = AreaOfInterest::from_point(90.5, 0.0, DEFAULT_BUFFER_DEG);
        assert!(matches!(result, Err(FetchError::InvalidCoordinate(_))));
    }

    #[test]
    fn test_rejects_out_of_range_longitude() {
        let result = AreaOfInterest::from_point(0.0, -180.01, DEFAULT_BUFFER_DEG);
        assert!(matches!(result, Err(FetchError::InvalidCoordinate(_))));
    }

    #[test]
    fn test_rejects_non_finite_input() {
        assert!(AreaOfInterest::from_point(f64::NAN, 0.0, DEFAULT_BUFFER_DEG).is_err());
        assert!(AreaOfInterest::from_point(0.0, f64::INFINITY, DEFAULT_BUFFER_DEG).is_err());
    }

    #[test]
    fn test_clamped_near_pole_still_contains_point() {
        let aoi = AreaOfInterest::from_point(89.995, 0.0, DEFAULT_BUFFER_DEG).unwrap();
        assert!(aoi.contains(89.995, 0.0));
        for (_, lat) in aoi.vertices() {
            assert!(*lat <= 90.0);
        }
    }
}
