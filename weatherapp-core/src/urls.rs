//! Request URLs for the three OpenWeather endpoints.
//!
//! All builders are pure: the city is form-encoded by `url`, the key and
//! `units=metric` are appended to whatever base the configuration holds.

use serde::Serialize;
use std::fmt;
use url::Url;

use crate::{
    config::{ApiKey, Endpoints},
    model::{CityQuery, Coordinates},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    CurrentWeather,
    Geocoding,
    Forecast,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::CurrentWeather => "current weather",
            Endpoint::Geocoding => "geocoding",
            Endpoint::Forecast => "forecast",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn current_weather_url(endpoints: &Endpoints, key: &ApiKey, city: &CityQuery) -> Url {
    let mut url = endpoints.current.clone();
    url.query_pairs_mut()
        .append_pair("q", city.as_str())
        .append_pair("appid", key.as_str())
        .append_pair("units", "metric");
    url
}

pub fn geocoding_url(endpoints: &Endpoints, key: &ApiKey, city: &CityQuery) -> Url {
    let mut url = endpoints.geocode.clone();
    url.query_pairs_mut()
        .append_pair("q", city.as_str())
        .append_pair("limit", "1")
        .append_pair("appid", key.as_str());
    url
}

pub fn forecast_url(endpoints: &Endpoints, key: &ApiKey, at: Coordinates) -> Url {
    let mut url = endpoints.forecast.clone();
    url.query_pairs_mut()
        .append_pair("lat", &at.lat.to_string())
        .append_pair("lon", &at.lon.to_string())
        .append_pair("appid", key.as_str())
        .append_pair("units", "metric");
    url
}

/// The URL as text with the `appid` value masked, for logs and error messages.
pub fn redact(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == "appid") {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "appid" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();

    let mut masked = url.clone();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
