//! Sample weather reading for smoke-testing a deployment.
//!
//! The relay never parses message bodies; this type only exists so the
//! publisher binary can emit a message shaped like the collector's.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// A weather reading with the collector's field names. Serialize only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub city: String,
    pub temperature: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub condition: String,
    #[serde(with = "rfc3339")]
    pub timestamp: DateTime<Utc>,
}

impl WeatherReading {
    /// A fixed reading for `city`, stamped with `timestamp`.
    pub fn sample(city: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            city: city.to_string(),
            temperature: 25.5,
            humidity: 65,
            wind_speed: 12.3,
            condition: "Clear sky".to_string(),
            timestamp,
        }
    }
}

mod rfc3339 {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_sample_uses_collector_field_names() {
        let at = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let json =
            serde_json::to_value(WeatherReading::sample("Integration Test City", at)).unwrap();

        assert_eq!(json["city"], "Integration Test City");
        assert_eq!(json["windSpeed"], 12.3);
        assert_eq!(json["humidity"], 65);
        assert_eq!(json["timestamp"], "2023-01-01T00:00:00Z");
        assert!(json.get("wind_speed").is_none());
    }

    #[test]
    fn test_timestamp_serialized_as_utc_whole_seconds() {
        let at = Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .unwrap()
            .with_nanosecond(123_456_000)
            .unwrap();
        let json = serde_json::to_value(WeatherReading::sample("Sao Paulo", at)).unwrap();

        assert_eq!(json["timestamp"], "2024-03-01T12:00:00Z");
    }
}
