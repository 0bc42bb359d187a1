// ABOUTME: Serde helpers for durations expressed in milliseconds
// ABOUTME: Accepts integer milliseconds or humantime strings such as "30s" on input

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

#[derive(Deserialize)]
struct HumanDuration(#[serde(with = "humantime_serde")] Duration);

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Millis(u64),
    Fractional(f64),
    Human(HumanDuration),
}

impl DurationValue {
    fn into_duration(self) -> std::result::Result<Duration, String> {
        match self {
            DurationValue::Millis(ms) => Ok(Duration::from_millis(ms)),
            DurationValue::Fractional(ms) if ms.is_finite() && ms >= 0.0 => {
                Ok(Duration::from_secs_f64(ms / 1000.0))
            }
            DurationValue::Fractional(ms) => Err(format!("invalid duration: {}", ms)),
            DurationValue::Human(HumanDuration(duration)) => Ok(duration),
        }
    }
}

pub mod millis {
    use super::*;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        DurationValue::deserialize(deserializer)?
            .into_duration()
            .map_err(D::Error::custom)
    }
}

pub mod option_millis {
    use super::*;

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match duration {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        match Option::<DurationValue>::deserialize(deserializer)? {
            Some(value) => value.into_duration().map(Some).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize)]
    struct Holder {
        #[serde(default, with = "super::option_millis")]
        timeout: Option<Duration>,
    }

    #[test]
    fn test_accepts_milliseconds_and_humantime() {
        let ms: Holder = serde_json::from_str(r#"{"timeout": 1500}"#).unwrap();
        assert_eq!(ms.timeout, Some(Duration::from_millis(1500)));

        let human: Holder = serde_json::from_str(r#"{"timeout": "2m"}"#).unwrap();
        assert_eq!(human.timeout, Some(Duration::from_secs(120)));

        let missing: Holder = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.timeout, None);
    }

    #[test]
    fn test_rejects_negative_values() {
        let result: Result<Holder, _> = serde_json::from_str(r#"{"timeout": -5.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serializes_as_milliseconds() {
        let holder = Holder {
            timeout: Some(Duration::from_secs(3)),
        };
        assert_eq!(serde_json::to_string(&holder).unwrap(), r#"{"timeout":3000}"#);
    }
}
