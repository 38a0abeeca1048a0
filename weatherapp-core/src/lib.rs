//! Core library for the `weatherapp` CLI.
//!
//! This crate defines:
//! - Configuration (endpoint URLs on disk, API key from the environment)
//! - URL building, fetching and decoding for OpenWeather current weather,
//!   geocoding and 5-day forecasts
//! - The request pipeline and the render-sink contract a UI implements
//!
//! It is used by `weatherapp-cli`, but a GUI front-end only needs a
//! [`RenderSink`] or a [`Dispatcher`] receiver to reuse it.

pub mod config;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod model;
pub mod pipeline;
pub mod urls;

pub use config::{ApiKey, Config, Endpoints};
pub use dispatch::{ChannelSink, Dispatcher, RenderEvent, RenderUpdate, RequestId};
pub use error::{Branch, DecodeError, FetchError, PipelineError, UserMessage};
pub use fetch::{Fetch, HttpFetcher};
pub use model::{CityQuery, Coordinates, CurrentWeather, ForecastDay, ForecastSeries, IconCode};
pub use pipeline::{RenderSink, WeatherPipeline};
pub use urls::Endpoint;
