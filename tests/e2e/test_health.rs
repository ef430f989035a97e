use crate::e2e::helpers;

use helpers::TestContext;
use hyper::StatusCode;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_healthy(ctx: &TestContext) {
    let response = ctx.client.get("/health").await.unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.str_field("status"), "healthy");
    assert!(chrono::DateTime::parse_from_rfc3339(response.str_field("timestamp")).is_ok());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_engine_readiness(ctx: &TestContext) {
    let response = ctx.client.get("/health/ready").await.unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.str_field("status"), "ready");

    let engines = response.field("engines").as_array().unwrap();
    assert_eq!(engines.len(), 3);

    let openvoice = engines
        .iter()
        .find(|e| e["engine"] == "openvoice")
        .expect("openvoice entry missing");
    assert_eq!(openvoice["configured"], false);

    let bark = engines.iter().find(|e| e["engine"] == "bark").unwrap();
    assert_eq!(bark["healthy"], true);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_include_request_id_in_responses(ctx: &TestContext) {
    let response = ctx.client.get("/health").await.unwrap();
    response.assert_header_exists("x-request-id");

    let response = ctx.client.get("/models").await.unwrap();
    response.assert_header_exists("x-request-id");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_echo_incoming_request_id(ctx: &TestContext) {
    let response = ctx
        .client
        .get_with_header("/health", "x-request-id", "trace-abc-123")
        .await
        .unwrap();

    assert_eq!(response.header("x-request-id").map(String::as_str), Some("trace-abc-123"));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_allow_cross_origin_requests(ctx: &TestContext) {
    let response = ctx
        .client
        .get_with_header("/health", "origin", "http://example.com")
        .await
        .unwrap();

    response.assert_header_exists("access-control-allow-origin");
}
