use crate::core::geo::LatLng;
use serde::{
    de::{IgnoredAny, SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};
use std::fmt;

/// A latitude/longitude pair as the tracking endpoints exchange it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(deserialize_with = "lenient_f64")]
    pub latitude: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.to_lat_lng().is_valid()
    }

    pub fn to_lat_lng(self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

impl From<LatLng> for Coordinate {
    fn from(lat_lng: LatLng) -> Self {
        Self::new(lat_lng.lat, lat_lng.lng)
    }
}

impl From<Coordinate> for LatLng {
    fn from(coordinate: Coordinate) -> Self {
        coordinate.to_lat_lng()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Body of the subject-location endpoint.
///
/// Only the first `data` entry is parsed; the rest are skipped unread, so a
/// malformed trailing row cannot fail the poll.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct LocationResponse {
    #[serde(rename = "data", default, deserialize_with = "first_entry")]
    first: Option<Coordinate>,
}

impl LocationResponse {
    /// The subject's last known coordinate, if the endpoint reported one
    pub fn latest(&self) -> Option<Coordinate> {
        self.first
    }
}

/// Accepts a JSON number or a numeric string
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("'{}' is not a coordinate", text))),
    }
}

/// `null`, `[]` and `[null, ..]` all mean no data
fn first_entry<'de, D>(deserializer: D) -> Result<Option<Coordinate>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FirstEntry;

    impl<'de> Visitor<'de> for FirstEntry {
        type Value = Option<Coordinate>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of coordinates or null")
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<S>(self, deserializer: S) -> Result<Self::Value, S::Error>
        where
            S: Deserializer<'de>,
        {
            deserializer.deserialize_seq(self)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let first = seq.next_element::<Option<Coordinate>>()?.flatten();
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(first)
        }
    }

    deserializer.deserialize_option(FirstEntry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_entry_is_latest() {
        let response: LocationResponse = serde_json::from_str(
            r#"{"data":[{"latitude":-6.2,"longitude":106.8},{"latitude":1.0,"longitude":2.0}]}"#,
        )
        .unwrap();
        assert_eq!(response.latest(), Some(Coordinate::new(-6.2, 106.8)));
    }

    #[test]
    fn test_empty_missing_and_null_data() {
        for body in [r#"{"data":[]}"#, r#"{}"#, r#"{"data":null}"#] {
            let response: LocationResponse = serde_json::from_str(body).unwrap();
            assert_eq!(response.latest(), None, "body {}", body);
        }
    }

    #[test]
    fn test_extra_fields_and_string_numbers() {
        let response: LocationResponse = serde_json::from_str(
            r#"{"status":"ok","data":[{"id":7,"latitude":"-6.9","longitude":" 107.6 ","created_at":"2024-05-01"}]}"#,
        )
        .unwrap();
        assert_eq!(response.latest(), Some(Coordinate::new(-6.9, 107.6)));
    }

    #[test]
    fn test_malformed_trailing_rows_are_skipped() {
        for body in [
            r#"{"data":[{"latitude":-6.2,"longitude":106.8},{"id":3}]}"#,
            r#"{"data":[{"latitude":-6.2,"longitude":106.8},{"latitude":null,"longitude":null}]}"#,
            r#"{"data":[{"latitude":-6.2,"longitude":106.8},null,"junk",[1,2]]}"#,
        ] {
            let response: LocationResponse = serde_json::from_str(body).unwrap();
            assert_eq!(response.latest(), Some(Coordinate::new(-6.2, 106.8)), "body {}", body);
        }
    }

    #[test]
    fn test_null_first_entry_is_no_data() {
        for body in [r#"{"data":[null]}"#, r#"{"data":[null,{"latitude":1.0,"longitude":2.0}]}"#] {
            let response: LocationResponse = serde_json::from_str(body).unwrap();
            assert_eq!(response.latest(), None, "body {}", body);
        }
    }

    #[test]
    fn test_non_list_data_rejected() {
        let result: Result<LocationResponse, _> =
            serde_json::from_str(r#"{"data":{"latitude":1.0,"longitude":2.0}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_numeric_coordinate_rejected() {
        let result: Result<LocationResponse, _> =
            serde_json::from_str(r#"{"data":[{"latitude":"north","longitude":1.0}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_report_body_shape() {
        let body = serde_json::to_value(Coordinate::new(-6.9, 107.6)).unwrap();
        assert_eq!(body, serde_json::json!({ "latitude": -6.9, "longitude": 107.6 }));
    }

    #[test]
    fn test_validity_follows_lat_lng() {
        assert!(Coordinate::new(-6.2, 106.8).is_valid());
        assert!(!Coordinate::new(95.0, 106.8).is_valid());
        assert_eq!(LatLng::from(Coordinate::new(1.0, 2.0)), LatLng::new(1.0, 2.0));
    }
}
