//! Geographic calculations
//!
//! Spherical-earth helpers used for arrival checks and for projecting the
//! mission destination. All angles are in degrees, distances in meters.

use libm::{asin, atan2, cos, sin, sqrt};

/// Mean earth radius used by the projection and distance helpers (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_007.2;

const DEG_TO_RAD: f64 = core::f64::consts::PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / core::f64::consts::PI;

/// Geographic coordinate (WGS84 latitude/longitude in degrees)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GeoCoordinate {
    /// Latitude in degrees (-90 to +90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to +180)
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Create a new coordinate
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` using the Haversine formula
    pub fn distance_to(&self, other: &GeoCoordinate) -> f64 {
        let lat1 = self.latitude * DEG_TO_RAD;
        let lat2 = other.latitude * DEG_TO_RAD;
        let delta_lat = (other.latitude - self.latitude) * DEG_TO_RAD;
        let delta_lon = (other.longitude - self.longitude) * DEG_TO_RAD;

        let sin_dlat = sin(delta_lat / 2.0);
        let sin_dlon = sin(delta_lon / 2.0);
        let a = sin_dlat * sin_dlat + cos(lat1) * cos(lat2) * sin_dlon * sin_dlon;
        let c = 2.0 * atan2(sqrt(a), sqrt(1.0 - a));
        EARTH_RADIUS_M * c
    }

    /// Initial bearing (forward azimuth) to `other`, in degrees 0-360
    pub fn bearing_to(&self, other: &GeoCoordinate) -> f64 {
        let lat1 = self.latitude * DEG_TO_RAD;
        let lat2 = other.latitude * DEG_TO_RAD;
        let delta_lon = (other.longitude - self.longitude) * DEG_TO_RAD;

        let y = sin(delta_lon) * cos(lat2);
        let x = cos(lat1) * sin(lat2) - sin(lat1) * cos(lat2) * cos(delta_lon);
        wrap_360(atan2(y, x) * RAD_TO_DEG)
    }

    /// Coordinate reached by travelling `distance_m` along `azimuth_deg`
    pub fn at_distance_and_azimuth(&self, distance_m: f64, azimuth_deg: f64) -> GeoCoordinate {
        let lat1 = self.latitude * DEG_TO_RAD;
        let lon1 = self.longitude * DEG_TO_RAD;
        let bearing = azimuth_deg * DEG_TO_RAD;
        let ratio = distance_m / EARTH_RADIUS_M;

        let lat2 = asin(sin(lat1) * cos(ratio) + cos(lat1) * sin(ratio) * cos(bearing));
        let lon2 = lon1
            + atan2(
                sin(bearing) * sin(ratio) * cos(lat1),
                cos(ratio) - sin(lat1) * sin(lat2),
            );

        GeoCoordinate {
            latitude: lat2 * RAD_TO_DEG,
            longitude: wrap_180(lon2 * RAD_TO_DEG),
        }
    }
}

/// Normalize angle to the 0 to 360 range
pub fn wrap_360(angle: f64) -> f64 {
    let a = angle % 360.0;
    if a < 0.0 {
        a + 360.0
    } else {
        a
    }
}

/// Normalize angle to the -180 to +180 range
pub fn wrap_180(angle: f64) -> f64 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a < -180.0 {
        a += 360.0;
    }
    a
}
