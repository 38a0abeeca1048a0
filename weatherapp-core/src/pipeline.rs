use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::{
    config::{ApiKey, Config},
    decode,
    error::{Branch, PipelineError, UserMessage},
    fetch::Fetch,
    model::{CityQuery, Coordinates, CurrentWeather, ForecastSeries},
    urls::{self, Endpoint},
};

/// Consumer of a request's results, typically a UI layer.
///
/// Implementations decide how updates reach the render thread; the pipeline
/// only promises to call `finished` last.
pub trait RenderSink: Send + Sync {
    fn current(&self, weather: CurrentWeather);
    fn forecast(&self, series: ForecastSeries);
    fn message(&self, message: UserMessage);
    fn finished(&self) {}
}

/// Current weather and geocode-then-forecast over an injected fetcher.
#[derive(Debug)]
pub struct WeatherPipeline<F> {
    config: Config,
    fetcher: F,
}

impl<F: Fetch> WeatherPipeline<F> {
    pub fn new(config: Config, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn api_key(&self) -> Result<&ApiKey, PipelineError> {
        self.config.api_key().ok_or(PipelineError::MissingApiKey)
    }

    async fn fetch(&self, endpoint: Endpoint, url: &Url) -> Result<String, PipelineError> {
        debug!(%endpoint, url = %urls::redact(url), "fetching");
        self.fetcher.get_text(url).await.map_err(|source| PipelineError::Fetch { endpoint, source })
    }

    #[instrument(skip_all, fields(city = %city))]
    pub async fn current_weather(&self, city: &CityQuery) -> Result<CurrentWeather, PipelineError> {
        let key = self.api_key()?;
        let url = urls::current_weather_url(&self.config.endpoints, key, city);
        let body = self.fetch(Endpoint::CurrentWeather, &url).await?;

        decode::current_weather(&body)
            .map_err(|source| PipelineError::Decode { endpoint: Endpoint::CurrentWeather, source })
    }

    #[instrument(skip_all, fields(city = %city))]
    pub async fn coordinates(&self, city: &CityQuery) -> Result<Coordinates, PipelineError> {
        let key = self.api_key()?;
        let url = urls::geocoding_url(&self.config.endpoints, key, city);
        let body = self.fetch(Endpoint::Geocoding, &url).await?;

        decode::coordinates(&body)
            .map_err(|source| PipelineError::Decode { endpoint: Endpoint::Geocoding, source })?
            .ok_or_else(|| PipelineError::NotFound { city: city.to_string() })
    }

    #[instrument(skip(self))]
    pub async fn forecast_at(&self, at: Coordinates) -> Result<ForecastSeries, PipelineError> {
        let key = self.api_key()?;
        let url = urls::forecast_url(&self.config.endpoints, key, at);
        let body = self.fetch(Endpoint::Forecast, &url).await?;

        decode::forecast_series(&body)
            .map_err(|source| PipelineError::Decode { endpoint: Endpoint::Forecast, source })
    }

    pub async fn forecast(&self, city: &CityQuery) -> Result<ForecastSeries, PipelineError> {
        self.api_key()?;
        let at = self.coordinates(city).await?;
        self.forecast_at(at).await
    }

    /// Handle one user trigger end to end.
    ///
    /// The key and the city are checked first; after that the current-weather
    /// and forecast branches run one after the other and fail independently.
    #[instrument(skip(self, sink))]
    pub async fn run(&self, input: &str, sink: &dyn RenderSink) {
        match self.admit(input) {
            Ok(city) => {
                match self.current_weather(&city).await {
                    Ok(weather) => sink.current(weather),
                    Err(err) => report(&err, Branch::Current, sink),
                }

                match self.forecast(&city).await {
                    Ok(series) => {
                        info!(days = series.len(), "forecast ready");
                        sink.forecast(series)
                    }
                    Err(err) => report(&err, Branch::Forecast, sink),
                }
            }
            Err(err) => report(&err, Branch::Current, sink),
        }

        sink.finished();
    }

    fn admit(&self, input: &str) -> Result<CityQuery, PipelineError> {
        self.api_key()?;
        CityQuery::parse(input)
    }
}

fn report(err: &PipelineError, branch: Branch, sink: &dyn RenderSink) {
    let message = err.user_message(branch);
    if err.is_precondition() {
        warn!(?branch, error = %err, "request rejected");
    } else {
        error!(?branch, error = %err, detail = ?err, "request failed");
    }
    sink.message(message);
}
