use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fixed airport the relay reports on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Station {
    /// ICAO code, e.g. "EGKK".
    pub code: String,
    /// Display name used in the report header, e.g. "GATWICK AIRPORT".
    pub name: String,
}

impl Default for Station {
    fn default() -> Self {
        Self {
            code: "EGKK".to_string(),
            name: "GATWICK AIRPORT".to_string(),
        }
    }
}

/// An observation exactly as a provider returned it.
///
/// The shape depends on the provider, so it stays untyped until the
/// normalizer narrows it into a [`CanonicalReport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation(Value);

impl RawObservation {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Top-level field lookup; `None` if absent or if this is not an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.as_object().and_then(|map| map.get(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.as_object().is_some_and(|map| map.contains_key(key))
    }
}

impl From<Value> for RawObservation {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Which provider schema an observation follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    PrimaryFormat,
    FallbackFormat,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindDirection {
    Degrees(f64),
    Variable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Visibility {
    Kilometers(f64),
    /// The provider value could not be converted; shown as-is with its unit.
    Unconverted { value: String, unit: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudLayer {
    pub cover: String,
    pub altitude_feet: String,
}

/// Normalized observation, independent of the provider it came from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalReport {
    pub observed_at: Option<String>,
    pub temperature_celsius: Option<f64>,
    pub wind_direction: Option<WindDirection>,
    pub wind_speed_knots: Option<f64>,
    pub wind_gust_knots: Option<f64>,
    pub visibility: Option<Visibility>,
    pub cloud_layers: Vec<CloudLayer>,
    pub raw_text: Option<String>,
}

impl CanonicalReport {
    /// Degraded report carrying only the raw METAR text.
    ///
    /// Looks at `raw_text` first, then `raw`, so it works for either schema.
    pub fn raw_only(observation: &RawObservation) -> Self {
        let raw_text = ["raw_text", "raw"]
            .iter()
            .filter_map(|key| observation.get(key))
            .find_map(|value| value.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            raw_text,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_only_prefers_raw_text() {
        let obs = RawObservation::new(json!({"raw_text": "EGKK A", "raw": "EGKK B"}));
        let report = CanonicalReport::raw_only(&obs);

        assert_eq!(report.raw_text.as_deref(), Some("EGKK A"));
        assert!(report.temperature_celsius.is_none());
        assert!(report.cloud_layers.is_empty());
    }

    #[test]
    fn raw_only_uses_raw_when_raw_text_missing() {
        let obs = RawObservation::new(json!({"raw": "EGKK B", "wind": 3}));
        assert_eq!(CanonicalReport::raw_only(&obs).raw_text.as_deref(), Some("EGKK B"));
    }

    #[test]
    fn raw_only_on_non_object_is_empty() {
        let obs = RawObservation::new(json!(["EGKK"]));
        assert_eq!(CanonicalReport::raw_only(&obs), CanonicalReport::default());
    }
}
