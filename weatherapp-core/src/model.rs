use serde::Serialize;
use std::fmt;
use url::Url;

use crate::error::PipelineError;

/// A city name as entered by the user, trimmed and known to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityQuery(String);

impl CityQuery {
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::EmptyCity);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Provider icon token such as `01d`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IconCode(String);

impl IconCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{base}/{code}@2x.png`
    pub fn url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&format!("{}@2x.png", self.0));
        }
        url
    }
}

/// Display record for the current conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentWeather {
    pub temperature: String,
    pub humidity: String,
    pub wind_speed: String,
    pub condition: String,
    pub icon: IconCode,
}

/// Display record for one forecast tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastDay {
    /// Day-of-week abbreviation, e.g. `Mon`.
    pub day: String,
    pub temp_min: String,
    pub temp_max: String,
    pub condition: String,
    pub icon: IconCode,
}

impl ForecastDay {
    /// Tile label, e.g. `10.0°C / 15.0°C`.
    pub fn temperature_range(&self) -> String {
        format!("{} / {}", self.temp_min, self.temp_max)
    }
}

/// Sampled forecast days in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ForecastSeries(Vec<ForecastDay>);

impl ForecastSeries {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ForecastDay> {
        self.0.iter()
    }

    pub fn days(&self) -> &[ForecastDay] {
        &self.0
    }
}

impl FromIterator<ForecastDay> for ForecastSeries {
    fn from_iter<I: IntoIterator<Item = ForecastDay>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ForecastSeries {
    type Item = &'a ForecastDay;
    type IntoIter = std::slice::Iter<'a, ForecastDay>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One decimal, ties rounded away from zero (`21.25` shows as `21.3`).
fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0 + 0.0
}

pub(crate) fn celsius(value: f64) -> String {
    format!("{:.1}°C", one_decimal(value))
}

pub(crate) fn percent(value: u64) -> String {
    format!("{value}%")
}

pub(crate) fn metres_per_second(value: f64) -> String {
    format!("{:.1} m/s", one_decimal(value))
}
