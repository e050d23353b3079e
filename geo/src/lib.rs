//! Geofence validation.
//!
//! Pure computation: great-circle distance between the session anchor and the
//! reported point, checked against an inclusive tolerance. Missing
//! coordinates on either side are a hard reject, never a pass.

use rollcall_types::{GeoPoint, RejectReason};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle (haversine) distance between two points, in meters.
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Inclusive boundary: a point exactly at the tolerance passes.
pub fn within_tolerance(distance_m: f64, tolerance_m: f64) -> bool {
    distance_m <= tolerance_m
}

/// Successful geofence check, carrying the distance for the audit trail.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeofencePass {
    pub distance_m: f64,
}

/// Validate a reported point against a session anchor.
///
/// Returns the rejection reason on failure; `OutOfRange` still carries the
/// computed distance so rejections are auditable.
pub fn check(
    anchor: Option<GeoPoint>,
    point: Option<GeoPoint>,
    tolerance_m: f64,
) -> Result<GeofencePass, RejectReason> {
    let (anchor, point) = match (anchor, point) {
        (Some(a), Some(p)) if a.is_valid() && p.is_valid() => (a, p),
        _ => return Err(RejectReason::MissingLocation),
    };

    let distance = distance_m(anchor, point);
    if within_tolerance(distance, tolerance_m) {
        Ok(GeofencePass {
            distance_m: distance,
        })
    } else {
        Err(RejectReason::OutOfRange {
            distance_m: distance,
            tolerance_m,
        })
    }
}
