use crate::e2e::helpers;

use helpers::{TestContext, DEFAULT_MODEL, XTTS_MODEL};
use hyper::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_list_models_of_configured_engines(ctx: &TestContext) {
    let response = ctx.client.get("/models").await.unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(
        response.field("models"),
        &json!(["tts_models/multilingual/bark", DEFAULT_MODEL, XTTS_MODEL])
    );
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_list_speakers_for_nested_model_name(ctx: &TestContext) {
    let response = ctx
        .client
        .get(&format!("/speakers/{}", XTTS_MODEL))
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("speakers"), &json!(["p225", "p226"]));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_list_bark_speakers_by_alias(ctx: &TestContext) {
    let response = ctx.client.get("/speakers/bark").await.unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(
        response.field("speakers"),
        &json!(["Speaker 0", "Speaker 1", "Speaker 2", "Speaker 3"])
    );
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_no_speakers_for_unconfigured_engine(ctx: &TestContext) {
    let response = ctx.client.get("/speakers/openvoice").await.unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("speakers"), &json!([]));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_list_languages(ctx: &TestContext) {
    let response = ctx.client.get("/languages/bark").await.unwrap();
    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("languages"), &json!(["en", "de", "es"]));

    let response = ctx.client.get("/languages/openvoice").await.unwrap();
    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("languages"), &json!(["en"]));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_describe_model(ctx: &TestContext) {
    let response = ctx
        .client
        .get(&format!("/model-info/{}", DEFAULT_MODEL))
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.str_field("name"), DEFAULT_MODEL);
    assert_eq!(response.field("speakers"), &json!(["p225", "p226"]));
    assert_eq!(response.field("languages"), &json!(["en", "es"]));
    assert_eq!(response.field("loaded"), &json!(false));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_model_loaded_after_generation(ctx: &TestContext) {
    ctx.client
        .post("/generate", &json!({ "text": "Warm up", "model": "bark" }))
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let response = ctx.client.get("/model-info/bark").await.unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.str_field("name"), "tts_models/multilingual/bark");
    assert_eq!(response.field("loaded"), &json!(true));
}
