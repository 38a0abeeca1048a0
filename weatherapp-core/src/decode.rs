//! Projection of provider JSON onto the display records.
//!
//! Bodies are walked as `serde_json::Value` along fixed field paths so a
//! failure can name exactly which field was missing or had the wrong type.

use chrono::NaiveDate;
use serde_json::Value;

use crate::{
    error::DecodeError,
    model::{
        Coordinates, CurrentWeather, ForecastDay, ForecastSeries, IconCode, celsius,
        metres_per_second, percent,
    },
};

/// The forecast feed has 3-hour slots, so every 8th slot is kept: one per day.
pub const FORECAST_STRIDE: usize = 8;

/// A JSON value together with the path it was reached by.
struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    fn root(value: &'a Value) -> Self {
        Self { value, path: String::new() }
    }

    fn at(value: &'a Value, path: String) -> Self {
        Self { value, path }
    }

    fn display_path(&self) -> String {
        if self.path.is_empty() { "$".to_string() } else { self.path.clone() }
    }

    fn wrong_type(&self, expected: &'static str) -> DecodeError {
        DecodeError::WrongType { path: self.display_path(), expected }
    }

    fn field(&self, name: &str) -> Result<Node<'a>, DecodeError> {
        let object = self.value.as_object().ok_or_else(|| self.wrong_type("object"))?;
        let path =
            if self.path.is_empty() { name.to_string() } else { format!("{}.{name}", self.path) };

        match object.get(name) {
            Some(value) => Ok(Node::at(value, path)),
            None => Err(DecodeError::Missing { path }),
        }
    }

    fn items(&self) -> Result<&'a [Value], DecodeError> {
        self.value.as_array().map(Vec::as_slice).ok_or_else(|| self.wrong_type("array"))
    }

    fn index(&self, i: usize) -> Result<Node<'a>, DecodeError> {
        let items = self.items()?;
        let path = format!("{}[{i}]", self.path);

        match items.get(i) {
            Some(value) => Ok(Node::at(value, path)),
            None => Err(DecodeError::Missing { path }),
        }
    }

    fn f64(&self) -> Result<f64, DecodeError> {
        self.value.as_f64().ok_or_else(|| self.wrong_type("number"))
    }

    /// Also accepts whole floats such as `60.0`.
    fn u64(&self) -> Result<u64, DecodeError> {
        if let Some(n) = self.value.as_u64() {
            return Ok(n);
        }
        match self.value.as_f64() {
            Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64 => Ok(n as u64),
            _ => Err(self.wrong_type("non-negative integer")),
        }
    }

    fn str(&self) -> Result<&'a str, DecodeError> {
        self.value.as_str().ok_or_else(|| self.wrong_type("string"))
    }
}

fn parse(body: &str) -> Result<Value, DecodeError> {
    serde_json::from_str(body).map_err(|e| DecodeError::Syntax(e.to_string()))
}

/// `weather[0].description` and `weather[0].icon` of an object.
fn first_condition(node: &Node<'_>) -> Result<(String, IconCode), DecodeError> {
    let weather = node.field("weather")?.index(0)?;
    let description = weather.field("description")?.str()?.to_string();
    let icon = IconCode::new(weather.field("icon")?.str()?);
    Ok((description, icon))
}

/// Decode a current-weather response.
pub fn current_weather(body: &str) -> Result<CurrentWeather, DecodeError> {
    let value = parse(body)?;
    let root = Node::root(&value);

    let main = root.field("main")?;
    let temperature = main.field("temp")?.f64()?;
    let humidity = main.field("humidity")?.u64()?;
    let wind_speed = root.field("wind")?.field("speed")?.f64()?;
    let (condition, icon) = first_condition(&root)?;

    Ok(CurrentWeather {
        temperature: celsius(temperature),
        humidity: percent(humidity),
        wind_speed: metres_per_second(wind_speed),
        condition,
        icon,
    })
}

/// Decode a geocoding response. An empty array means the city is unknown.
pub fn coordinates(body: &str) -> Result<Option<Coordinates>, DecodeError> {
    let value = parse(body)?;
    let root = Node::root(&value);

    if root.items()?.is_empty() {
        return Ok(None);
    }

    let first = root.index(0)?;
    Ok(Some(Coordinates { lat: first.field("lat")?.f64()?, lon: first.field("lon")?.f64()? }))
}

/// Decode a 5-day/3-hour forecast response, keeping slots 0, 8, 16, ...
pub fn forecast_series(body: &str) -> Result<ForecastSeries, DecodeError> {
    let value = parse(body)?;
    let list = Node::root(&value).field("list")?;

    list.items()?
        .iter()
        .enumerate()
        .step_by(FORECAST_STRIDE)
        .map(|(i, slot)| forecast_day(&Node::at(slot, format!("list[{i}]"))))
        .collect()
}

fn forecast_day(slot: &Node<'_>) -> Result<ForecastDay, DecodeError> {
    let dt_txt = slot.field("dt_txt")?;
    let day = day_of_week(&dt_txt)?;

    let main = slot.field("main")?;
    let temp_min = main.field("temp_min")?.f64()?;
    let temp_max = main.field("temp_max")?.f64()?;
    let (condition, icon) = first_condition(slot)?;

    Ok(ForecastDay {
        day,
        temp_min: celsius(temp_min),
        temp_max: celsius(temp_max),
        condition,
        icon,
    })
}

/// `"2024-03-04 12:00:00"` -> `"Mon"`
fn day_of_week(dt_txt: &Node<'_>) -> Result<String, DecodeError> {
    let text = dt_txt.str()?;
    let invalid = |reason: String| DecodeError::Invalid { path: dt_txt.display_path(), reason };

    let date = text
        .get(..10)
        .ok_or_else(|| invalid(format!("`{text}` is shorter than YYYY-MM-DD")))?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| invalid(format!("`{date}` is not a date: {e}")))?;

    Ok(date.format("%a").to_string())
}
