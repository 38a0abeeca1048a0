//! Integration tests for the fetch pipeline using wiremock
//!
//! These drive `HttpFetcher` against a mock HTTP server, covering the three
//! endpoints, non-2xx statuses, empty bodies and refused connections.

use std::{
    io::{Read, Write},
    net::TcpListener,
    thread,
    time::Duration,
};
use url::Url;
use weatherapp_core::{
    ApiKey, CityQuery, Config, Dispatcher, Endpoint, Endpoints, FetchError, HttpFetcher,
    PipelineError, RenderUpdate, UserMessage, WeatherPipeline,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

const KEY: &str = "test-key";

fn current_response() -> serde_json::Value {
    serde_json::json!({
        "coord": { "lon": -0.1257, "lat": 51.5085 },
        "weather": [{ "id": 800, "main": "Clear", "description": "clear sky", "icon": "01d" }],
        "main": { "temp": 21.3, "feels_like": 20.9, "humidity": 60, "pressure": 1016 },
        "wind": { "speed": 4.2, "deg": 240 },
        "name": "London",
        "cod": 200
    })
}

fn geocode_response() -> serde_json::Value {
    serde_json::json!([
        { "name": "London", "lat": 51.5073219, "lon": -0.1276474, "country": "GB" }
    ])
}

fn forecast_response() -> serde_json::Value {
    let list: Vec<serde_json::Value> = (0..40_i32)
        .map(|i| {
            serde_json::json!({
                "dt": 1_709_510_400 + i * 10_800,
                "main": { "temp": 12.0, "temp_min": 9.5 + f64::from(i), "temp_max": 14.0 },
                "weather": [{ "description": "overcast clouds", "icon": "04d" }],
                "dt_txt": format!("2024-03-{:02} {:02}:00:00", 4 + i / 8, (i % 8) * 3),
            })
        })
        .collect();

    serde_json::json!({ "cod": "200", "cnt": 40, "list": list, "city": { "name": "London" } })
}

fn endpoints_for(server: &MockServer) -> Endpoints {
    let at = |p: &str| Url::parse(&format!("{}{p}", server.uri())).unwrap();
    Endpoints {
        current: at("/data/2.5/weather"),
        geocode: at("/geo/1.0/direct"),
        forecast: at("/data/2.5/forecast"),
        icon: at("/img/wn"),
    }
}

fn create_fetcher() -> HttpFetcher {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("client builds");
    HttpFetcher::with_client(client)
}

fn create_pipeline(server: &MockServer) -> WeatherPipeline<HttpFetcher> {
    let config = Config::default()
        .with_endpoints(endpoints_for(server))
        .with_api_key(ApiKey::new(KEY));
    WeatherPipeline::new(config, create_fetcher())
}

async fn mount_happy_path(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("appid", KEY))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_response()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("limit", "1"))
        .and(query_param("appid", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(geocode_response()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("lat", "51.5073219"))
        .and(query_param("lon", "-0.1276474"))
        .and(query_param("appid", KEY))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_response()))
        .mount(server)
        .await;
}

// ============================================================================
// Success scenarios
// ============================================================================

#[tokio::test]
async fn test_current_weather_success() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let pipeline = create_pipeline(&server);
    let city = CityQuery::parse("London").unwrap();
    let weather = pipeline.current_weather(&city).await;

    assert!(weather.is_ok(), "Expected success, got: {weather:?}");
    let weather = weather.unwrap();
    assert_eq!(weather.temperature, "21.3°C");
    assert_eq!(weather.humidity, "60%");
    assert_eq!(weather.wind_speed, "4.2 m/s");
    assert_eq!(weather.condition, "clear sky");
    assert_eq!(
        weather.icon.url(&pipeline.config().endpoints.icon).as_str(),
        format!("{}/img/wn/01d@2x.png", server.uri())
    );
}

#[tokio::test]
async fn test_city_with_spaces_is_sent_encoded() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "New York"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_response()))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = create_pipeline(&server);
    let city = CityQuery::parse("  New York  ").unwrap();

    assert!(pipeline.current_weather(&city).await.is_ok());
}

#[tokio::test]
async fn test_forecast_geocodes_then_samples_daily() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let pipeline = create_pipeline(&server);
    let city = CityQuery::parse("London").unwrap();
    let series = pipeline.forecast(&city).await.expect("forecast");

    assert_eq!(series.len(), 5);
    let mins: Vec<&str> = series.iter().map(|d| d.temp_min.as_str()).collect();
    assert_eq!(mins, ["9.5°C", "17.5°C", "25.5°C", "33.5°C", "41.5°C"]);
    assert_eq!(series.days()[0].day, "Mon");
    assert_eq!(series.days()[0].temperature_range(), "9.5°C / 14.0°C");
}

#[tokio::test]
async fn test_dispatcher_end_to_end() {
    let server = MockServer::start().await;
    mount_happy_path(&server).await;

    let (dispatcher, mut rx) = Dispatcher::new(create_pipeline(&server));
    let id = dispatcher.submit("London");

    let mut updates = Vec::new();
    while let Some(event) = rx.recv().await {
        assert_eq!(event.request, id);
        if event.update == RenderUpdate::Finished {
            break;
        }
        updates.push(event.update);
    }

    assert_eq!(updates.len(), 2);
    assert!(matches!(&updates[0], RenderUpdate::Current(w) if w.condition == "clear sky"));
    assert!(matches!(&updates[1], RenderUpdate::Forecast(s) if s.len() == 5));
}

// ============================================================================
// Error scenarios
// ============================================================================

#[tokio::test]
async fn test_unauthorized_is_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key."
        })))
        .mount(&server)
        .await;

    let pipeline = create_pipeline(&server);
    let city = CityQuery::parse("London").unwrap();
    let err = pipeline.current_weather(&city).await.unwrap_err();

    match &err {
        PipelineError::Fetch { endpoint, source } => {
            assert_eq!(*endpoint, Endpoint::CurrentWeather);
            assert_eq!(source.status(), Some(401));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
    assert!(!err.to_string().contains(KEY), "key leaked: {err}");
}

#[tokio::test]
async fn test_empty_body_is_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let pipeline = create_pipeline(&server);
    let city = CityQuery::parse("London").unwrap();
    let err = pipeline.current_weather(&city).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Fetch { source: FetchError::Http { status: 200, .. }, .. }
    ));
}

#[tokio::test]
async fn test_rejected_status_wins_over_unreadable_body() {
    // promises 100 body bytes, sends 5, then hangs up
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream
            .write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 100\r\n\r\nshort")
            .unwrap();
    });

    let at = |p: &str| Url::parse(&format!("{base}{p}")).unwrap();
    let endpoints = Endpoints {
        current: at("/data/2.5/weather"),
        geocode: at("/geo/1.0/direct"),
        forecast: at("/data/2.5/forecast"),
        icon: at("/img/wn"),
    };
    let config = Config::default().with_endpoints(endpoints).with_api_key(ApiKey::new(KEY));
    let pipeline = WeatherPipeline::new(config, create_fetcher());
    let city = CityQuery::parse("London").unwrap();

    let err = pipeline.current_weather(&city).await.unwrap_err();
    server.join().unwrap();

    assert!(
        matches!(err, PipelineError::Fetch { source: FetchError::Http { status: 503, .. }, .. }),
        "expected http error, got {err:?}"
    );
    assert_eq!(err.user_message(weatherapp_core::Branch::Current), UserMessage::WeatherUnavailable);
}

#[tokio::test]
async fn test_unknown_city_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_response()))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = create_pipeline(&server);
    let city = CityQuery::parse("Atlantis").unwrap();
    let err = pipeline.forecast(&city).await.unwrap_err();

    assert!(matches!(err, PipelineError::NotFound { .. }));
}

#[tokio::test]
async fn test_refused_connection_is_network_error() {
    // nothing listens on a port we bound and released
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let base = format!("http://127.0.0.1:{port}");
    let at = |p: &str| Url::parse(&format!("{base}{p}")).unwrap();
    let endpoints = Endpoints {
        current: at("/data/2.5/weather"),
        geocode: at("/geo/1.0/direct"),
        forecast: at("/data/2.5/forecast"),
        icon: at("/img/wn"),
    };

    let config = Config::default().with_endpoints(endpoints).with_api_key(ApiKey::new(KEY));
    let pipeline = WeatherPipeline::new(config, create_fetcher());
    let city = CityQuery::parse("London").unwrap();

    let err = pipeline.current_weather(&city).await.unwrap_err();
    assert!(
        matches!(err, PipelineError::Fetch { source: FetchError::Network { .. }, .. }),
        "expected network error, got {err:?}"
    );
    assert_eq!(err.user_message(weatherapp_core::Branch::Current), UserMessage::WeatherFetchFailed);
    assert!(!err.to_string().contains(KEY), "key leaked: {err}");
}

#[tokio::test]
async fn test_missing_key_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_response()))
        .expect(0)
        .mount(&server)
        .await;

    let config = Config::default().with_endpoints(endpoints_for(&server));
    let pipeline = WeatherPipeline::new(config, HttpFetcher::new());
    let city = CityQuery::parse("London").unwrap();

    assert!(matches!(pipeline.current_weather(&city).await, Err(PipelineError::MissingApiKey)));
    assert!(matches!(pipeline.forecast(&city).await, Err(PipelineError::MissingApiKey)));
}
