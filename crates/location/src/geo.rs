//! Geographic value types.

use serde::{Deserialize, Serialize};

use geoplaces_core::{DomainError, DomainResult, ValueObject};

/// Mean earth radius used for great-circle distances.
const EARTH_RADIUS_M: f64 = 6_371_007.2;

/// A WGS84 position. Latitude/longitude in degrees, altitude in meters.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CoordinateRepr")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    altitude: Option<f64>,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> DomainResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(DomainError::out_of_range("latitude", latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(DomainError::out_of_range("longitude", longitude));
        }
        Ok(Self {
            latitude,
            longitude,
            altitude: None,
        })
    }

    pub fn with_altitude(mut self, altitude: f64) -> DomainResult<Self> {
        if !altitude.is_finite() {
            return Err(DomainError::out_of_range("altitude", altitude));
        }
        self.altitude = Some(altitude);
        Ok(self)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    /// Great-circle distance in meters (haversine), ignoring altitude.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * h.sqrt().asin()
    }
}

impl ValueObject for Coordinate {}

/// Wire form of [`Coordinate`]; deserialization goes through the range checks.
#[derive(Deserialize)]
struct CoordinateRepr {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    altitude: Option<f64>,
}

impl TryFrom<CoordinateRepr> for Coordinate {
    type Error = DomainError;

    fn try_from(repr: CoordinateRepr) -> Result<Self, Self::Error> {
        let coordinate = Coordinate::new(repr.latitude, repr.longitude)?;
        match repr.altitude {
            Some(altitude) => coordinate.with_altitude(altitude),
            None => Ok(coordinate),
        }
    }
}

/// A postal address. Every field is optional text; empty means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    /// Preformatted address text, if the provider supplies one.
    pub text: String,
    pub street: String,
    pub district: String,
    pub city: String,
    pub county: String,
    pub state: String,
    pub country: String,
    pub country_code: String,
    pub postal_code: String,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        *self == Address::default()
    }

    /// Single-line rendering: `text` when set, otherwise the non-empty parts.
    pub fn formatted(&self) -> String {
        if !self.text.is_empty() {
            return self.text.clone();
        }
        let locality = [self.postal_code.as_str(), self.city.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        [
            self.street.as_str(),
            self.district.as_str(),
            locality.as_str(),
            self.state.as_str(),
            self.country.as_str(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

impl ValueObject for Address {}

/// An axis-aligned lat/lon rectangle. May cross the antimeridian, in which
/// case the top-left longitude is greater than the bottom-right one.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RectangleRepr")]
pub struct GeoRectangle {
    top_left: Coordinate,
    bottom_right: Coordinate,
}

impl GeoRectangle {
    pub fn new(top_left: Coordinate, bottom_right: Coordinate) -> DomainResult<Self> {
        if top_left.latitude < bottom_right.latitude {
            return Err(DomainError::validation(
                "rectangle top edge must not be south of its bottom edge",
            ));
        }
        Ok(Self {
            top_left,
            bottom_right,
        })
    }

    /// A rectangle of `width_deg` x `height_deg` centered on `center`,
    /// clamped at the poles and wrapped at the antimeridian. A width of 360
    /// degrees or more spans every longitude.
    pub fn around(center: Coordinate, width_deg: f64, height_deg: f64) -> DomainResult<Self> {
        let half_w = (width_deg / 2.0).max(0.0);
        let half_h = (height_deg / 2.0).max(0.0);
        let top = (center.latitude + half_h).min(90.0);
        let bottom = (center.latitude - half_h).max(-90.0);
        let (left, right) = if half_w >= 180.0 {
            (-180.0, 180.0)
        } else {
            (
                wrap_longitude(center.longitude - half_w),
                wrap_longitude(center.longitude + half_w),
            )
        };
        Self::new(Coordinate::new(top, left)?, Coordinate::new(bottom, right)?)
    }

    pub fn top_left(&self) -> Coordinate {
        self.top_left
    }

    pub fn bottom_right(&self) -> Coordinate {
        self.bottom_right
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.top_left.longitude > self.bottom_right.longitude
    }

    pub fn width_degrees(&self) -> f64 {
        let w = self.bottom_right.longitude - self.top_left.longitude;
        if self.crosses_antimeridian() { w + 360.0 } else { w }
    }

    pub fn height_degrees(&self) -> f64 {
        self.top_left.latitude - self.bottom_right.latitude
    }

    pub fn center(&self) -> Coordinate {
        let lat = (self.top_left.latitude + self.bottom_right.latitude) / 2.0;
        let lon = wrap_longitude(self.top_left.longitude + self.width_degrees() / 2.0);
        Coordinate {
            latitude: lat,
            longitude: lon,
            altitude: None,
        }
    }

    pub fn contains(&self, c: &Coordinate) -> bool {
        if c.latitude > self.top_left.latitude || c.latitude < self.bottom_right.latitude {
            return false;
        }
        if self.crosses_antimeridian() {
            c.longitude >= self.top_left.longitude || c.longitude <= self.bottom_right.longitude
        } else {
            (self.top_left.longitude..=self.bottom_right.longitude).contains(&c.longitude)
        }
    }
}

impl ValueObject for GeoRectangle {}

#[derive(Deserialize)]
struct RectangleRepr {
    top_left: Coordinate,
    bottom_right: Coordinate,
}

impl TryFrom<RectangleRepr> for GeoRectangle {
    type Error = DomainError;

    fn try_from(repr: RectangleRepr) -> Result<Self, Self::Error> {
        GeoRectangle::new(repr.top_left, repr.bottom_right)
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

/// A location in the human sense: an address, a coordinate, and the region
/// recommended for displaying it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoLocation {
    pub address: Address,
    pub coordinate: Option<Coordinate>,
    pub bounding_box: Option<GeoRectangle>,
}

impl GeoLocation {
    pub fn is_empty(&self) -> bool {
        self.address.is_empty() && self.coordinate.is_none() && self.bounding_box.is_none()
    }
}

impl ValueObject for GeoLocation {}
