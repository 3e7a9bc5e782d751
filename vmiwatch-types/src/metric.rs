//! Metric readings and the unit class implied by metric keys.

/// A single metric value reported by a device.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricReading {
    /// Metric key as reported by the backend (e.g. "indoor_temperature").
    pub key: String,
    /// Current value.
    pub value: f64,
}

impl MetricReading {
    /// Create a new reading.
    pub fn new(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Unit class implied by the key.
    pub fn kind(&self) -> MetricKind {
        MetricKind::from_key(&self.key)
    }

    /// Value formatted with its unit.
    pub fn formatted(&self) -> String {
        self.kind().format(self.value)
    }

    /// Human readable label for the key.
    pub fn label(&self) -> String {
        display_label(&self.key)
    }
}

/// Unit class of a metric.
///
/// The backend does not send units with current values; they are implied by
/// the metric key naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Degrees Celsius, one decimal.
    Temperature,
    /// Relative humidity in percent, one decimal.
    Humidity,
    /// CO2 concentration in ppm, rounded.
    Co2,
    /// Power or any other percentage, rounded.
    Percent,
    /// Air flow in cubic metres per hour, rounded.
    Flow,
    /// Unknown unit, displayed as-is.
    Other,
}

impl MetricKind {
    /// Infer the unit class from a metric key.
    ///
    /// Matching is case-insensitive and checked in a fixed order, so a key
    /// like "temperature_flow" is a temperature.
    pub fn from_key(key: &str) -> Self {
        let key = key.to_ascii_lowercase();
        if key.contains("temperature") {
            MetricKind::Temperature
        } else if key.contains("humidity") {
            MetricKind::Humidity
        } else if key.contains("co2") {
            MetricKind::Co2
        } else if key.contains("power") || key.contains("percent") {
            MetricKind::Percent
        } else if key.contains("flow") {
            MetricKind::Flow
        } else {
            MetricKind::Other
        }
    }

    /// Unit suffix for display.
    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "°C",
            MetricKind::Humidity | MetricKind::Percent => "%",
            MetricKind::Co2 => " ppm",
            MetricKind::Flow => " m³/h",
            MetricKind::Other => "",
        }
    }

    /// Format a value with the precision and unit of this class.
    pub fn format(&self, value: f64) -> String {
        match self {
            MetricKind::Temperature | MetricKind::Humidity => {
                format!("{:.1}{}", value, self.unit())
            }
            MetricKind::Co2 | MetricKind::Percent | MetricKind::Flow => {
                format!("{}{}", value.round(), self.unit())
            }
            MetricKind::Other => value.to_string(),
        }
    }
}

/// Turn a metric key into a display label ("supply_air_flow" -> "supply air flow").
pub fn display_label(key: &str) -> String {
    key.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_key() {
        assert_eq!(MetricKind::from_key("indoor_temperature"), MetricKind::Temperature);
        assert_eq!(MetricKind::from_key("humidity"), MetricKind::Humidity);
        assert_eq!(MetricKind::from_key("CO2_level"), MetricKind::Co2);
        assert_eq!(MetricKind::from_key("fan_power"), MetricKind::Percent);
        assert_eq!(MetricKind::from_key("bypass_percent"), MetricKind::Percent);
        assert_eq!(MetricKind::from_key("air_flow"), MetricKind::Flow);
        assert_eq!(MetricKind::from_key("mode"), MetricKind::Other);
    }

    #[test]
    fn test_temperature_wins_over_flow() {
        assert_eq!(MetricKind::from_key("flow_temperature"), MetricKind::Temperature);
    }

    #[test]
    fn test_format() {
        assert_eq!(MetricKind::Temperature.format(21.04), "21.0°C");
        assert_eq!(MetricKind::Humidity.format(55.54), "55.5%");
        assert_eq!(MetricKind::Co2.format(812.6), "813 ppm");
        assert_eq!(MetricKind::Percent.format(39.4), "39%");
        assert_eq!(MetricKind::Flow.format(120.0), "120 m³/h");
        assert_eq!(MetricKind::Other.format(3.0), "3");
    }

    #[test]
    fn test_reading_helpers() {
        let reading = MetricReading::new("supply_air_flow", 95.2);
        assert_eq!(reading.label(), "supply air flow");
        assert_eq!(reading.formatted(), "95 m³/h");
    }
}
