//! Narrowing of provider observations into a [`CanonicalReport`].
//!
//! Each schema has its own extraction routine. Missing or empty fields become
//! `None`. A field with the wrong structure (e.g. `wind` being a string) is a
//! [`ParseFailure`], which [`normalize`] absorbs by falling back to
//! [`CanonicalReport::raw_only`].

use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::detect::detect_schema;
use crate::model::{
    CanonicalReport, CloudLayer, RawObservation, SchemaKind, Visibility, WindDirection,
};

const KM_PER_STATUTE_MILE: f64 = 1.60934;
const FALLBACK_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const DISPLAY_TIME_FORMAT: &str = "%d-%b-%Y %H:%M UTC";

/// Structural mismatch found while extracting fields. Never leaves this module.
#[derive(Debug, Error, PartialEq)]
pub enum ParseFailure {
    #[error("observation schema could not be recognised")]
    UnknownSchema,

    #[error("field '{field}' has unexpected shape: expected {expected}")]
    UnexpectedShape {
        field: &'static str,
        expected: &'static str,
    },
}

/// Detect the schema and extract a report. Never fails.
pub fn normalize(observation: &RawObservation) -> CanonicalReport {
    let schema = detect_schema(observation);
    normalize_as(observation, schema)
}

/// Extract a report using an already detected schema. Never fails.
pub fn normalize_as(observation: &RawObservation, schema: SchemaKind) -> CanonicalReport {
    match extract(observation, schema) {
        Ok(report) => report,
        Err(err) => {
            warn!(?schema, error = %err, "failed to parse METAR fields; using raw text only");
            CanonicalReport::raw_only(observation)
        }
    }
}

fn extract(
    observation: &RawObservation,
    schema: SchemaKind,
) -> Result<CanonicalReport, ParseFailure> {
    let fields = observation
        .as_value()
        .as_object()
        .ok_or(ParseFailure::UnknownSchema)?;

    match schema {
        SchemaKind::PrimaryFormat => extract_primary(fields),
        SchemaKind::FallbackFormat => extract_fallback(fields),
        SchemaKind::Unknown => Err(ParseFailure::UnknownSchema),
    }
}

/// CheckWX decoded schema.
fn extract_primary(fields: &Map<String, Value>) -> Result<CanonicalReport, ParseFailure> {
    let temperature = section(fields, "temperature")?;
    let wind = section(fields, "wind")?;
    let visibility = section(fields, "visibility")?;

    let visibility = visibility
        .and_then(|v| text(v.get("meters")))
        .map(|meters| match meters.parse::<f64>() {
            Ok(m) => Visibility::Kilometers(round_tenth(m / 1000.0)),
            Err(_) => Visibility::Unconverted {
                value: meters,
                unit: "m",
            },
        });

    Ok(CanonicalReport {
        observed_at: text(fields.get("observed")),
        temperature_celsius: temperature.and_then(|t| number(t.get("celsius"))),
        wind_direction: wind.and_then(|w| wind_direction(w.get("degrees"))),
        wind_speed_knots: wind.and_then(|w| number(w.get("speed_kts"))),
        wind_gust_knots: wind.and_then(|w| number(w.get("gust_kts"))),
        visibility,
        cloud_layers: cloud_layers(fields.get("clouds"), "clouds", "code", "base_feet_agl")?,
        raw_text: text(fields.get("raw")),
    })
}

/// aviationweather.gov schema.
fn extract_fallback(fields: &Map<String, Value>) -> Result<CanonicalReport, ParseFailure> {
    let observed_at = text(fields.get("observation_time")).map(|t| reformat_time(&t));

    let visibility = text(fields.get("visibility_statute_mi")).map(|miles| {
        match miles.parse::<f64>() {
            Ok(mi) => Visibility::Kilometers(round_tenth(mi * KM_PER_STATUTE_MILE)),
            Err(_) => Visibility::Unconverted {
                value: miles,
                unit: "miles",
            },
        }
    });

    Ok(CanonicalReport {
        observed_at,
        temperature_celsius: number(fields.get("temp_c")),
        wind_direction: wind_direction(fields.get("wind_dir_degrees")),
        wind_speed_knots: number(fields.get("wind_speed_kt")),
        wind_gust_knots: number(fields.get("wind_gust_kt")),
        visibility,
        cloud_layers: cloud_layers(
            fields.get("sky_condition"),
            "sky_condition",
            "sky_cover",
            "cloud_base_ft_agl",
        )?,
        raw_text: text(fields.get("raw_text")),
    })
}

/// A nested object; absent or null is fine, anything else is a mismatch.
fn section<'a>(
    fields: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a Map<String, Value>>, ParseFailure> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(ParseFailure::UnexpectedShape {
            field,
            expected: "object",
        }),
    }
}

/// Non-empty textual form of a scalar.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn wind_direction(value: Option<&Value>) -> Option<WindDirection> {
    if let Some(Value::String(s)) = value {
        if s.trim().eq_ignore_ascii_case("VRB") {
            return Some(WindDirection::Variable);
        }
    }
    number(value).map(WindDirection::Degrees)
}

fn cloud_layers(
    value: Option<&Value>,
    field: &'static str,
    cover_key: &str,
    altitude_key: &str,
) -> Result<Vec<CloudLayer>, ParseFailure> {
    let layers: Vec<&Map<String, Value>> = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(layer)) => vec![layer],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        Some(_) => {
            return Err(ParseFailure::UnexpectedShape {
                field,
                expected: "object or list of objects",
            });
        }
    };

    Ok(layers
        .into_iter()
        .filter_map(|layer| {
            Some(CloudLayer {
                cover: text(layer.get(cover_key))?,
                altitude_feet: text(layer.get(altitude_key))?,
            })
        })
        .collect())
}

fn reformat_time(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, FALLBACK_TIME_FORMAT)
        .map(|t| t.format(DISPLAY_TIME_FORMAT).to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
