//! Integration tests for OpenWeatherClient using wiremock.
//!
//! These tests verify caching, error mapping and request shapes against a
//! mock provider.

use std::{sync::Arc, time::Duration};

use skyboard_core::{FetchError, OpenWeatherClient, OpenWeatherConfig, Units};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "TEST_KEY";

fn london() -> serde_json::Value {
    serde_json::json!({
        "main": { "temp": 15.6, "feels_like": 14.2, "humidity": 80, "pressure": 1012 },
        "wind": { "speed": 3.1, "deg": 200 },
        "weather": [{ "description": "light rain", "icon": "10d" }],
        "visibility": 9000,
        "sys": { "sunrise": 1_700_000_000, "sunset": 1_700_030_000, "country": "GB" },
        "name": "London"
    })
}

/// 40 entries, 3 hours apart, starting at midnight UTC.
fn five_day_forecast() -> serde_json::Value {
    let start = 1_700_006_400_i64;
    let list: Vec<serde_json::Value> = (0..40)
        .map(|i: i64| {
            serde_json::json!({
                "dt": start + i * 3 * 3600,
                "main": {
                    "temp": 8.0,
                    "feels_like": 6.0,
                    "temp_min": 4.0,
                    "temp_max": 11.0,
                    "humidity": 75,
                    "pressure": 1008
                },
                "weather": [{ "description": "overcast clouds", "icon": "04d" }],
                "wind": { "speed": 4.2, "deg": 250 },
                "pop": 0.5
            })
        })
        .collect();
    serde_json::json!({ "cod": "200", "cnt": 40, "list": list })
}

fn client(server: &MockServer) -> OpenWeatherClient {
    client_with(OpenWeatherConfig::new(KEY).with_base_url(server.uri()))
}

fn client_with(config: OpenWeatherConfig) -> OpenWeatherClient {
    OpenWeatherClient::new(config).expect("client builds")
}

async fn mount_current(server: &MockServer, city: &str, units: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", city))
        .and(query_param("units", units))
        .and(query_param("appid", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(london()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn current_weather_maps_provider_payload() {
    let server = MockServer::start().await;
    mount_current(&server, "London", "metric", 1).await;

    let snapshot = client(&server)
        .fetch_current("London", Units::Metric)
        .await
        .unwrap();

    assert_eq!(snapshot.temp, 16);
    assert_eq!(snapshot.feels_like, 14);
    assert_eq!(snapshot.humidity, 80);
    assert_eq!(snapshot.pressure, 1012);
    assert_eq!(snapshot.wind_deg, 200);
    assert_eq!(snapshot.description, "light rain");
    assert_eq!(snapshot.icon, "10d");
    assert_eq!(snapshot.visibility, 9000);
    assert_eq!(snapshot.city, "London");
    assert_eq!(snapshot.country, "GB");
    assert_eq!(snapshot.sunrise.timestamp(), 1_700_000_000);
}

#[tokio::test]
async fn repeated_fetch_within_ttl_hits_provider_once() {
    let server = MockServer::start().await;
    mount_current(&server, "London", "metric", 1).await;
    let client = client(&server);

    let first = client.fetch_current("London", Units::Metric).await.unwrap();
    let second = client.fetch_current("London", Units::Metric).await.unwrap();

    assert_eq!(*first, *second);
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn clearing_the_cache_forces_a_new_call() {
    let server = MockServer::start().await;
    mount_current(&server, "London", "metric", 2).await;
    let client = client(&server);

    client.fetch_current("London", Units::Metric).await.unwrap();
    client.clear_cache();
    assert!(client.cached_current("London", Units::Metric).await.is_none());
    client.fetch_current("London", Units::Metric).await.unwrap();
}

#[tokio::test]
async fn switching_units_bypasses_cache() {
    let server = MockServer::start().await;
    mount_current(&server, "London", "metric", 1).await;
    mount_current(&server, "London", "imperial", 1).await;
    let client = client(&server);

    client.fetch_current("London", Units::Metric).await.unwrap();
    client.fetch_current("London", Units::Imperial).await.unwrap();
    client.fetch_current("London", Units::Metric).await.unwrap();
}

#[tokio::test]
async fn expired_entry_triggers_exactly_one_new_call() {
    let server = MockServer::start().await;
    mount_current(&server, "London", "metric", 2).await;
    let client = client_with(
        OpenWeatherConfig::new(KEY)
            .with_base_url(server.uri())
            .with_cache_ttl(Duration::from_millis(100)),
    );

    client.fetch_current("London", Units::Metric).await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;
    client.fetch_current("London", Units::Metric).await.unwrap();
    client.fetch_current("London", Units::Metric).await.unwrap();
}

#[tokio::test]
async fn concurrent_fetches_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(london())
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let client = client(&server);

    let (a, b) = tokio::join!(
        client.fetch_current("London", Units::Metric),
        client.fetch_current("London", Units::Metric),
    );

    assert_eq!(a.unwrap().temp, 16);
    assert_eq!(b.unwrap().temp, 16);
}

#[tokio::test]
async fn unknown_city_is_a_provider_error_and_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Atlantis"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "cod": "404",
            "message": "city not found"
        })))
        .expect(2)
        .mount(&server)
        .await;
    let client = client(&server);

    for _ in 0..2 {
        let err = client
            .fetch_current("Atlantis", Units::Metric)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::Provider {
                status: 404,
                message: "city not found".to_string(),
            }
        );
    }
    assert!(client.cached_current("Atlantis", Units::Metric).await.is_none());
}

#[tokio::test]
async fn slow_provider_is_a_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(london())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let client = client_with(
        OpenWeatherConfig::new(KEY)
            .with_base_url(server.uri())
            .with_timeout(Duration::from_millis(200)),
    );

    let err = client
        .fetch_current("London", Units::Metric)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_provider_is_a_network_error() {
    let client = client_with(OpenWeatherConfig::new(KEY).with_base_url("http://127.0.0.1:9"));

    let err = client
        .fetch_current("London", Units::Metric)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn missing_conditions_are_malformed() {
    let server = MockServer::start().await;
    let mut payload = london();
    payload["weather"] = serde_json::json!([]);
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .mount(&server)
        .await;
    let client = client(&server);

    let err = client
        .fetch_current("London", Units::Metric)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::MalformedResponse(_)));
    assert!(client.cached_current("London", Units::Metric).await.is_none());
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .fetch_forecast("London", Units::Metric)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::MalformedResponse(_)));
}

#[tokio::test]
async fn forecast_is_shaped_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("q", "Paris"))
        .and(query_param("units", "imperial"))
        .and(query_param("appid", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(five_day_forecast()))
        .expect(1)
        .mount(&server)
        .await;
    let client = client(&server);

    let bundle = client.fetch_forecast("Paris", Units::Imperial).await.unwrap();
    assert_eq!(bundle.hourly.len(), 8);
    assert_eq!(bundle.daily.len(), 5);
    assert!(bundle.daily.windows(2).all(|w| w[0].date < w[1].date));
    assert!(bundle.daily.iter().all(|d| d.temp_min == 4 && d.temp_max == 11));
    assert_eq!(bundle.hourly[0].precipitation_probability, 50);

    let again = client.fetch_forecast("Paris", Units::Imperial).await.unwrap();
    assert!(Arc::ptr_eq(&bundle, &again));
    assert!(client.cached_forecast("Paris", Units::Imperial).await.is_some());
    assert!(client.cached_current("Paris", Units::Imperial).await.is_none());
}

#[tokio::test]
async fn blank_search_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/find"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let client = client(&server);

    assert!(client.search_cities("").await.unwrap().is_empty());
    assert!(client.search_cities("   ").await.unwrap().is_empty());
}

#[tokio::test]
async fn search_returns_upstream_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/find"))
        .and(query_param("q", "Lon"))
        .and(query_param("type", "like"))
        .and(query_param("sort", "population"))
        .and(query_param("cnt", "5"))
        .and(query_param("appid", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "like",
            "cod": "200",
            "count": 3,
            "list": [
                { "name": "London", "coord": { "lat": 51.5085, "lon": -0.1257 }, "sys": { "country": "GB" } },
                { "name": "Long Beach", "coord": { "lat": 33.767, "lon": -118.1892 }, "sys": { "country": "US" } },
                { "name": "Londrina", "coord": { "lat": -23.3103, "lon": -51.1628 }, "sys": { "country": "BR" } }
            ]
        })))
        .expect(2)
        .mount(&server)
        .await;
    let client = client(&server);

    let suggestions = client.search_cities("Lon").await.unwrap();
    let names: Vec<&str> = suggestions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["London", "Long Beach", "Londrina"]);
    assert_eq!(suggestions[1].country, "US");
    assert_eq!(suggestions[0].lat, 51.5085);

    // Search results are never cached.
    client.search_cities("Lon").await.unwrap();
}
