use serde_json::json;
use ultron_agents::ToolRegistry;
use ultron_common::ToolError;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn price_server() -> MockServer {
    MockServer::start().await
}

#[tokio::test]
async fn unrecognised_symbols_are_omitted() {
    let server = price_server().await;

    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "bitcoin,fake123"))
        .and(query_param("vs_currencies", "usd"))
        .and(query_param("include_24hr_change", "true"))
        .and(query_param("include_market_cap", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitcoin": {
                "usd": 67000.5,
                "usd_24h_change": -1.25,
                "usd_market_cap": 1320000000000.0
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = ToolRegistry::with_defaults(server.uri());
    let result = registry
        .dispatch("get_crypto_price", &json!({"symbols": ["BTC", "FAKE123"]}))
        .await
        .expect("lookup should succeed");

    let object = result.as_object().expect("result is an object");
    assert_eq!(object.len(), 1);
    assert_eq!(result["BTC"]["price"], 67000.5);
    assert_eq!(result["BTC"]["change_24h"], -1.25);
    assert_eq!(result["BTC"]["market_cap"], 1320000000000.0);
}

#[tokio::test]
async fn results_are_keyed_by_uppercased_symbol() {
    let server = price_server().await;

    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "ethereum,solana"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ethereum": {"usd": 3100.0, "usd_24h_change": 2.0, "usd_market_cap": 370000000000.0},
            "solana": {"usd": 150.0, "usd_24h_change": 0.5, "usd_market_cap": 70000000000.0}
        })))
        .mount(&server)
        .await;

    let registry = ToolRegistry::with_defaults(server.uri());
    let result = registry
        .dispatch("get_crypto_price", &json!({"symbols": ["eth", "Sol"]}))
        .await
        .expect("lookup should succeed");

    assert_eq!(result["ETH"]["price"], 3100.0);
    assert_eq!(result["SOL"]["price"], 150.0);
}

#[tokio::test]
async fn error_status_is_an_external_lookup_failure() {
    let server = price_server().await;

    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let registry = ToolRegistry::with_defaults(server.uri());
    let err = registry
        .dispatch("get_crypto_price", &json!({"symbols": ["BTC"]}))
        .await
        .expect_err("should propagate the failure");

    match err {
        ToolError::ExternalLookup(detail) => assert!(detail.contains("429")),
        other => panic!("expected ExternalLookup, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_source_is_an_external_lookup_failure() {
    let registry = ToolRegistry::with_defaults("http://127.0.0.1:9");
    let err = registry
        .dispatch("get_crypto_price", &json!({"symbols": ["BTC"]}))
        .await
        .expect_err("should fail");
    assert!(matches!(err, ToolError::ExternalLookup(_)));
}
