use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::{config::API_KEY_ENV, urls::Endpoint};

/// Transport-level failure of a single GET.
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, connect, timeout, or reading the body failed.
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx status, or a 2xx with an empty body.
    #[error("{url} answered with HTTP {status}")]
    Http { url: String, status: u16 },
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            FetchError::Network { .. } => None,
        }
    }
}

/// A response body that does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("response is not valid JSON: {0}")]
    Syntax(String),

    #[error("missing field `{path}`")]
    Missing { path: String },

    #[error("field `{path}` has the wrong type, expected {expected}")]
    WrongType { path: String, expected: &'static str },

    #[error("field `{path}` is invalid: {reason}")]
    Invalid { path: String, reason: String },
}

impl DecodeError {
    /// Field path of the offending value, `None` when the body is not JSON at all.
    pub fn path(&self) -> Option<&str> {
        match self {
            DecodeError::Syntax(_) => None,
            DecodeError::Missing { path }
            | DecodeError::WrongType { path, .. }
            | DecodeError::Invalid { path, .. } => Some(path),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("API key is not configured (set {})", API_KEY_ENV)]
    MissingApiKey,

    #[error("city name must not be empty")]
    EmptyCity,

    #[error("{endpoint} request failed: {source}")]
    Fetch {
        endpoint: Endpoint,
        #[source]
        source: FetchError,
    },

    #[error("{endpoint} response could not be decoded: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: DecodeError,
    },

    #[error("no location found for `{city}`")]
    NotFound { city: String },
}

/// The two independent halves of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Current,
    Forecast,
}

/// The fixed set of texts shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserMessage {
    ApiKeyMissing,
    CityRequired,
    WeatherUnavailable,
    WeatherFetchFailed,
    LocationUnavailable,
    ForecastFetchFailed,
}

impl UserMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserMessage::ApiKeyMissing => "API key is missing. Please set the API key.",
            UserMessage::CityRequired => "Please enter a city name.",
            UserMessage::WeatherUnavailable => "Error fetching weather data.",
            UserMessage::WeatherFetchFailed => "Failed to fetch weather data.",
            UserMessage::LocationUnavailable => "Error fetching location data.",
            UserMessage::ForecastFetchFailed => "Failed to fetch forecast data.",
        }
    }
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PipelineError {
    /// Collapse an error into the message for the branch it happened on.
    pub fn user_message(&self, branch: Branch) -> UserMessage {
        match (self, branch) {
            (PipelineError::MissingApiKey, _) => UserMessage::ApiKeyMissing,
            (PipelineError::EmptyCity, _) => UserMessage::CityRequired,
            (
                PipelineError::Fetch { source: FetchError::Network { .. }, .. },
                Branch::Current,
            ) => UserMessage::WeatherFetchFailed,
            (_, Branch::Current) => UserMessage::WeatherUnavailable,
            (PipelineError::NotFound { .. }, Branch::Forecast)
            | (
                PipelineError::Fetch {
                    endpoint: Endpoint::Geocoding,
                    source: FetchError::Http { .. },
                },
                Branch::Forecast,
            ) => UserMessage::LocationUnavailable,
            (_, Branch::Forecast) => UserMessage::ForecastFetchFailed,
        }
    }

    /// Precondition failures are the caller's input, not a provider problem.
    pub fn is_precondition(&self) -> bool {
        matches!(self, PipelineError::MissingApiKey | PipelineError::EmptyCity)
    }
}
