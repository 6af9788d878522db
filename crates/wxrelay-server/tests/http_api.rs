//! HTTP round trips against a live server on a random local port, with the
//! weather provider mocked by wiremock.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wxrelay_core::ProviderConfig;
use wxrelay_server::AppState;
use wxrelay_store::WeatherStore;
use wxrelay_weather::OpenWeatherClient;

struct TestServer {
    base: String,
    http: reqwest::Client,
    provider: MockServer,
}

impl TestServer {
    async fn start() -> Self {
        let provider = MockServer::start().await;
        let config = ProviderConfig {
            api_endpoint: provider.uri(),
            api_key: "test_key".into(),
            timeout_secs: 5,
        };

        let store = Arc::new(Mutex::new(WeatherStore::open_in_memory().unwrap()));
        let gateway = Arc::new(OpenWeatherClient::new(&config).unwrap());
        let state = AppState::new(store, gateway);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            wxrelay_server::serve(listener, state, std::future::pending())
                .await
                .unwrap();
        });

        Self {
            base: format!("http://{}/api/v1", addr),
            http: reqwest::Client::new(),
            provider,
        }
    }

    async fn mock_city(&self, city: &str, low: f64, high: f64, label: &str) {
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", city))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cod": 200,
                "name": city,
                "main": {"temp_min": low, "temp_max": high},
                "weather": [{"main": label}]
            })))
            .mount(&self.provider)
            .await;
    }

    async fn get(&self, route: &str) -> (u16, Value) {
        let response = self
            .http
            .get(format!("{}{}", self.base, route))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn post(&self, route: &str, body: Value) -> (u16, Value) {
        let response = self
            .http
            .post(format!("{}{}", self.base, route))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_status() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/status").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"message": "ok"}));
}

#[tokio::test]
async fn test_weather_for_new_city() {
    let server = TestServer::start().await;
    server.mock_city("Reno", 274.0, 278.0, "Clear").await;

    let (status, body) = server.get("/location/weather?city=reno").await;

    assert_eq!(status, 200);
    assert_eq!(body["city_name"], "Reno");
    assert_eq!(body["conditions"], json!(["Clear"]));
    assert_eq!(body["median_temp"], 276.0);
    assert_eq!(body["low_temp"], 274.0);
    assert_eq!(body["high_temp"], 278.0);
    assert!(body["at_time"].is_string());

    let (_, stats) = server.get("/location/weather/stats?count=query").await;
    assert_eq!(stats, json!({"count": {"location_queries": 1}}));
}

#[tokio::test]
async fn test_weather_requires_city() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/location/weather").await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("city"));
}

#[tokio::test]
async fn test_weather_provider_failure() {
    let server = TestServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "cod": "404",
            "message": "city not found"
        })))
        .mount(&server.provider)
        .await;

    let (status, body) = server.get("/location/weather?city=Atlantis").await;
    assert_eq!(status, 502);
    assert_eq!(body, json!({"error": "city not found"}));
}

#[tokio::test]
async fn test_stats_without_parameters_lists_them() {
    let server = TestServer::start().await;
    let (status, body) = server.get("/location/weather/stats").await;

    assert_eq!(status, 202);
    let params = body["valid_query_parameters"].as_array().unwrap();
    assert_eq!(params.len(), 3);
    assert!(params.iter().any(|p| *p == "temp=lows|highs|avgs"));
}

#[tokio::test]
async fn test_stats_rejects_unknown_filter() {
    let server = TestServer::start().await;
    let (status, body) = server
        .get("/location/weather/stats?count=query&temp=bogus")
        .await;

    assert_eq!(status, 400);
    assert_eq!(body, json!({"error": "invalid reporting filter: bogus"}));
}

#[tokio::test]
async fn test_stats_full_report() {
    let server = TestServer::start().await;
    server.mock_city("Reno", 270.0, 280.0, "Clear").await;
    server.mock_city("Boise", 260.0, 262.0, "Snow").await;

    server.get("/location/weather?city=Reno").await;
    server.get("/location/weather?city=Boise").await;
    server.get("/location/weather?city=Reno").await;

    let (status, body) = server
        .get("/location/weather/stats?count=query&count=labels&summary=day&temp=avgs&temp=LOWS")
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["count"]["location_queries"], 3);
    assert_eq!(body["count"]["labels"], json!(["Clear", "Snow"]));
    assert_eq!(body["summary"]["daily"]["Snow"][0]["city_name"], "Boise");

    let avgs = body["temperatures"]["avgs"]["Reno"].as_object().unwrap();
    let year = avgs.values().next().unwrap().as_object().unwrap();
    let month = year.values().next().unwrap();
    assert_eq!(month["0"], json!([275.0]));
    assert!(body["temperatures"]["lows"]["Boise"].is_object());
}

#[tokio::test]
async fn test_account_and_bookmarks() {
    let server = TestServer::start().await;
    server.mock_city("Reno", 274.0, 278.0, "Clear").await;
    server.mock_city("Boise", 260.0, 262.0, "Snow").await;
    server.get("/location/weather?city=Reno").await;
    server.get("/location/weather?city=Boise").await;

    let (status, body) = server.get("/account/user?username=ada").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"message": "no account found with that username: ada"}));

    let (status, registered) = server
        .post("/account/user/register", json!({"username": "ada"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(registered["name"], "ada");
    assert_eq!(registered["bookmark_collection_id"], registered["id"]);
    assert_eq!(registered["bookmarked_location_ids"], json!([]));

    let (_, account) = server.get("/account/user?username=ada").await;
    assert_eq!(account, json!({"name": "ada", "id": registered["id"]}));

    let (status, added) = server
        .post(
            "/account/user/bookmark",
            json!({"username": "ada", "locations": ["boise", "Atlantis", "Reno"]}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(added, json!({"bookmarks": ["Boise", "Reno"]}));

    let (_, listed) = server.get("/account/user/bookmark?username=ada").await;
    assert_eq!(listed, json!({"bookmarks": ["Boise", "Reno"]}));
}

#[tokio::test]
async fn test_register_requires_username() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post("/account/user/register", json!({"username": "  "}))
        .await;
    assert_eq!(status, 400);
    assert!(body["error"].is_string());
}
