//! Continental-US coordinate bounds, shared by the reconciler (which must
//! clamp on ingress) and the HSDS validator (which enforces the raw
//! `[-90,90]`/`[-180,180]` schema bounds before the tighter US box ever
//! applies).

pub const MIN_LAT: f64 = 25.0;
pub const MAX_LAT: f64 = 49.0;
pub const MIN_LNG: f64 = -125.0;
pub const MAX_LNG: f64 = -67.0;

/// A coordinate pair after the ingress bounds check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coordinate {
    /// Within (after clamping) the continental-US box.
    Valid { lat: f64, lng: f64 },
    /// `(0,0)` or otherwise absent: treated as missing, never matched by
    /// coordinate key.
    Missing,
}

/// Clamp `(lat, lng)` into the continental-US box, or report it as missing
/// if it is exactly `(0, 0)` (the sentinel scrapers use for "no address").
pub fn clamp(lat: f64, lng: f64) -> Coordinate {
    if lat == 0.0 && lng == 0.0 {
        return Coordinate::Missing;
    }

    Coordinate::Valid {
        lat: lat.clamp(MIN_LAT, MAX_LAT),
        lng: lng.clamp(MIN_LNG, MAX_LNG),
    }
}

/// Round to 4 decimal places (~11m), the reconciler's location-match key.
pub fn round_match_key(value: f64) -> i64 {
    (value * 10_000.0).round() as i64
}

/// Great-circle distance in miles between two points (haversine), used to
/// decide whether a bounding-box search must be partitioned into sub-boxes
/// each with a diagonal of at most 80 miles.
pub fn haversine_miles(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_MILES: f64 = 3958.8;

    let (lat1_r, lat2_r) = (lat1.to_radians(), lat2.to_radians());
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_MILES * c
}

/// Split a bounding box into a grid of sub-boxes whose diagonals are each
/// at most `max_diagonal_miles`, for geocoder or catalogue searches that
/// would otherwise span too much ground in one request.
pub fn partition_bbox(
    min_lat: f64,
    min_lng: f64,
    max_lat: f64,
    max_lng: f64,
    max_diagonal_miles: f64,
) -> Vec<(f64, f64, f64, f64)> {
    let diagonal = haversine_miles(min_lat, min_lng, max_lat, max_lng);
    if diagonal <= max_diagonal_miles {
        return vec![(min_lat, min_lng, max_lat, max_lng)];
    }

    let splits = (diagonal / max_diagonal_miles).ceil().max(2.0) as usize;
    let lat_step = (max_lat - min_lat) / splits as f64;
    let lng_step = (max_lng - min_lng) / splits as f64;

    let mut boxes = Vec::with_capacity(splits * splits);
    for i in 0..splits {
        for j in 0..splits {
            let box_min_lat = min_lat + lat_step * i as f64;
            let box_min_lng = min_lng + lng_step * j as f64;
            let box_max_lat = box_min_lat + lat_step;
            let box_max_lng = box_min_lng + lng_step;
            boxes.push((box_min_lat, box_min_lng, box_max_lat, box_max_lng));
        }
    }
    boxes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_box_coordinates() {
        match clamp(50.0, -130.0) {
            Coordinate::Valid { lat, lng } => {
                assert_eq!(lat, 49.0);
                assert_eq!(lng, -125.0);
            }
            Coordinate::Missing => panic!("expected a valid clamped coordinate"),
        }
    }

    #[test]
    fn zero_zero_is_missing() {
        assert_eq!(clamp(0.0, 0.0), Coordinate::Missing);
    }

    #[test]
    fn round_match_key_is_stable_at_four_decimals() {
        assert_eq!(round_match_key(40.712_81), round_match_key(40.712_79));
    }

    #[test]
    fn partition_bbox_keeps_each_cell_under_the_diagonal_cap() {
        let boxes = partition_bbox(25.0, -125.0, 49.0, -67.0, 80.0);
        assert!(boxes.len() > 1);
        for (min_lat, min_lng, max_lat, max_lng) in boxes {
            assert!(haversine_miles(min_lat, min_lng, max_lat, max_lng) <= 80.0 + 1e-6);
        }
    }

    #[test]
    fn small_box_is_not_partitioned() {
        let boxes = partition_bbox(40.70, -74.01, 40.72, -73.99, 80.0);
        assert_eq!(boxes.len(), 1);
    }
}
