//! Integration tests for OpenWeatherClient using wiremock.

use std::time::Duration;

use skycast_weather::{GeoSearchClient, OpenWeatherClient, WeatherClient, WeatherError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> OpenWeatherClient {
    OpenWeatherClient::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap()
}

fn weather_json(name: &str, country: &str, temp: f64) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "main": {
            "temp": temp,
            "feels_like": 295.15,
            "temp_min": 291.15,
            "temp_max": 295.15,
            "humidity": 64
        },
        "weather": [
            { "id": 800, "main": "Clear", "description": "clear sky", "icon": "01d" }
        ],
        "sys": { "country": country }
    })
}

#[tokio::test]
async fn test_search_cities_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Lo"))
        .and(query_param("limit", "5"))
        .and(query_param("appid", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "name": "London", "lat": 51.5073, "lon": -0.1276, "country": "GB", "state": "England" },
            { "name": "Los Angeles", "lat": 34.0522, "lon": -118.2437, "country": "US", "state": "California" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let cities = client(&server).search("Lo", 5).await.unwrap();

    assert_eq!(cities.len(), 2);
    assert_eq!(cities[0].name, "London");
    assert_eq!(cities[0].search_key(), "london, gb");
    assert_eq!(cities[1].state.as_deref(), Some("California"));
    assert!((cities[1].latitude - 34.0522).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_search_unauthorized_maps_to_invalid_api_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client(&server).search("London", 5).await;
    assert!(matches!(result, Err(WeatherError::InvalidApiKey)));
}

#[tokio::test]
async fn test_search_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let result = client(&server).search("London", 5).await;
    assert!(matches!(result, Err(WeatherError::RateLimited)));
}

#[tokio::test]
async fn test_weather_by_coordinates_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "51.5"))
        .and(query_param("lon", "-0.12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_json("London", "GB", 293.15)))
        .mount(&server)
        .await;

    let report = client(&server).by_coordinates(51.5, -0.12).await.unwrap();

    assert_eq!(report.formatted_location(), "London, GB");
    assert_eq!(report.weather.temperature_c(), 20);
    assert_eq!(report.weather.feels_like_c(), 22);
    assert_eq!(report.weather.humidity_pct, 64);
    assert_eq!(report.weather.condition_description, "clear sky");
}

#[tokio::test]
async fn test_weather_by_name_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Atlantis"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "cod": "404",
            "message": "city not found"
        })))
        .mount(&server)
        .await;

    let result = client(&server).by_name("Atlantis").await;
    let err = result.unwrap_err();
    assert!(matches!(err, WeatherError::NotFound));
    assert_eq!(err.to_string(), "City not found");
}

#[tokio::test]
async fn test_weather_null_body_is_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let result = client(&server).by_name("London").await;
    assert!(matches!(result, Err(WeatherError::EmptyResponse)));
}

#[tokio::test]
async fn test_weather_server_error_is_network_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).by_name("London").await.unwrap_err();
    assert!(matches!(err, WeatherError::Network(_)));
    assert!(err.to_string().starts_with("Network error"));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Port 9 (discard) is not listening on loopback in test environments.
    let client =
        OpenWeatherClient::new("http://127.0.0.1:9", "test-key", Duration::from_secs(2)).unwrap();

    let result = client.search("London", 5).await;
    assert!(matches!(result, Err(WeatherError::Network(_))));
}

#[tokio::test]
async fn test_network_error_text_omits_api_key() {
    let client =
        OpenWeatherClient::new("http://127.0.0.1:9", "SECRETKEY123", Duration::from_secs(2))
            .unwrap();

    let err = client.by_coordinates(1.0, 2.0).await.unwrap_err();
    assert!(matches!(err, WeatherError::Network(_)));
    assert!(!err.to_string().contains("SECRETKEY123"));
    assert!(!format!("{:?}", err).contains("SECRETKEY123"));
}

#[tokio::test]
async fn test_timeout_error_text_omits_api_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let client =
        OpenWeatherClient::new(&server.uri(), "SECRETKEY123", Duration::from_millis(200)).unwrap();
    let err = client.by_name("London").await.unwrap_err();

    assert_eq!(err.to_string(), "Network error: Request timed out");
}

#[tokio::test]
async fn test_base_url_path_prefix_is_kept() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/owm/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_json("Paris", "FR", 290.0)))
        .expect(1)
        .mount(&server)
        .await;

    let base = format!("{}/owm", server.uri());
    let client = OpenWeatherClient::new(&base, "test-key", Duration::from_secs(5)).unwrap();

    let report = client.by_name("Paris").await.unwrap();
    assert_eq!(report.formatted_location(), "Paris, FR");
}
