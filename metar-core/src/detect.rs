use crate::model::{RawObservation, SchemaKind};

/// Field only the aviationweather.gov schema carries.
pub const FALLBACK_MARKER: &str = "raw_text";

/// Classify an observation by shape.
///
/// The primary schema has no marker of its own, so any object without
/// [`FALLBACK_MARKER`] is taken to be primary. Non-objects are `Unknown`.
pub fn detect_schema(observation: &RawObservation) -> SchemaKind {
    if !observation.as_value().is_object() {
        return SchemaKind::Unknown;
    }

    if observation.contains_key(FALLBACK_MARKER) {
        SchemaKind::FallbackFormat
    } else {
        SchemaKind::PrimaryFormat
    }
}
