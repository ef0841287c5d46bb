use crate::model::{CanonicalReport, Station, Visibility, WindDirection};

const UNAVAILABLE: &str = "N/A";
const NO_CLOUDS: &str = "No cloud data";
const LINE_SEPARATOR: &str = "\n\n";

/// Renders canonical reports into the chat text block.
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    station: Station,
}

impl ReportFormatter {
    pub fn new(station: Station) -> Self {
        Self { station }
    }

    pub fn header(&self) -> String {
        format!(
            "🛫 *{} ({}) METAR* 🛬",
            self.station.name.to_uppercase(),
            self.station.code.to_uppercase()
        )
    }

    /// Seven lines, always in the same order, none ever omitted.
    pub fn render(&self, report: &CanonicalReport) -> String {
        let lines = [
            self.header(),
            format!("⏰ Observed: {}", report.observed_at.as_deref().unwrap_or(UNAVAILABLE)),
            format!("🌡️ Temperature: {}", temperature_text(report)),
            format!("💨 Wind: {}", wind_text(report)),
            format!("👁️ Visibility: {}", visibility_text(report)),
            format!("☁️ Clouds: {}", clouds_text(report)),
            format!("📊 Raw METAR: {}", report.raw_text.as_deref().unwrap_or(UNAVAILABLE)),
        ];

        lines.join(LINE_SEPARATOR)
    }
}

fn temperature_text(report: &CanonicalReport) -> String {
    report
        .temperature_celsius
        .map(|t| format!("{}°C", display_number(t)))
        .unwrap_or_else(|| UNAVAILABLE.to_string())
}

pub fn wind_text(report: &CanonicalReport) -> String {
    let direction = report.wind_direction.map(|d| match d {
        WindDirection::Degrees(deg) => format!("{}°", display_number(deg)),
        WindDirection::Variable => "Variable".to_string(),
    });
    let speed = report.wind_speed_knots.map(display_number);

    if direction.is_none() && speed.is_none() {
        return UNAVAILABLE.to_string();
    }

    let mut wind = format!(
        "{} at {} knots",
        direction.as_deref().unwrap_or(UNAVAILABLE),
        speed.as_deref().unwrap_or(UNAVAILABLE)
    );
    if let Some(gust) = report.wind_gust_knots {
        wind.push_str(&format!(", gusting to {} knots", display_number(gust)));
    }
    wind
}

pub fn visibility_text(report: &CanonicalReport) -> String {
    match &report.visibility {
        Some(Visibility::Kilometers(km)) => format!("{km:.1} km"),
        Some(Visibility::Unconverted { value, unit }) => format!("{value} {unit}"),
        None => UNAVAILABLE.to_string(),
    }
}

pub fn clouds_text(report: &CanonicalReport) -> String {
    if report.cloud_layers.is_empty() {
        return NO_CLOUDS.to_string();
    }

    report
        .cloud_layers
        .iter()
        .map(|layer| format!("{} at {} ft", layer.cover, layer.altitude_feet))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whole numbers without a trailing ".0".
fn display_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
