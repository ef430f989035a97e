use crate::e2e::helpers;

use helpers::api_client::FilePart;
use helpers::fake_engines::{write_tone, FAIL_MARKER};
use helpers::{TestContext, DEFAULT_MODEL, MAX_TEXT_CHARS, XTTS_MODEL};
use hyper::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_context::test_context;

fn tone_bytes(frames: usize) -> Vec<u8> {
    let file = tempfile::NamedTempFile::new().unwrap();
    write_tone(file.path(), frames).unwrap();
    std::fs::read(file.path()).unwrap()
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_generate_audio_with_default_model(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/generate", &json!({ "text": "  Hello there \n" }))
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.field("success"), &json!(true));
    assert_eq!(response.str_field("text"), "Hello there");
    assert_eq!(response.str_field("model"), DEFAULT_MODEL);

    let filename = response.str_field("filename");
    assert!(filename.starts_with("audio_") && filename.ends_with(".wav"));
    assert_eq!(response.str_field("audio_url"), format!("/download/{}", filename));
    assert_eq!(ctx.output_files(), vec![filename.to_string()]);

    let call = ctx.coqui.last_call();
    assert_eq!(call.text, "Hello there");
    assert_eq!(call.options.model.as_deref(), Some(DEFAULT_MODEL));
    assert_eq!(call.options.language, "en");
    assert!(!call.long_form);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_pass_speaker_and_language_to_generic_engine(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/generate",
            &json!({
                "text": "Hola a todos",
                "model": XTTS_MODEL,
                "speaker": "p226",
                "language": "ES"
            }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.str_field("model"), XTTS_MODEL);

    let call = ctx.coqui.last_call();
    assert_eq!(call.options.model.as_deref(), Some(XTTS_MODEL));
    assert_eq!(call.options.speaker.as_deref(), Some("p226"));
    assert_eq!(call.options.language, "es");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fall_back_to_default_model_for_unknown_identifier(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/generate", &json!({ "text": "Hello", "model": "made/up/model" }))
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.str_field("model"), DEFAULT_MODEL);
    assert_eq!(ctx.coqui.last_call().options.model.as_deref(), Some(DEFAULT_MODEL));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_map_speaker_label_to_bark_preset(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/generate",
            &json!({ "text": "Guten Tag", "model": "bark", "speaker": "Speaker 3", "language": "de" }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.str_field("model"), "tts_models/multilingual/bark");
    assert!(ctx.coqui.calls().is_empty());

    let call = ctx.bark.last_call();
    assert_eq!(call.options.preset, Some(3));
    assert_eq!(call.options.language, "de");
    assert_eq!(call.options.model, None);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_accept_numeric_bark_speaker(ctx: &TestContext) {
    ctx.client
        .post("/generate", &json!({ "text": "Hi", "model": "bark", "speaker": 7 }))
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    assert_eq!(ctx.bark.last_call().options.preset, Some(7));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_use_default_bark_voice_for_unusable_speaker(ctx: &TestContext) {
    for speaker in [json!(-1), json!(2.5), json!(true)] {
        ctx.client
            .post("/generate", &json!({ "text": "Hi", "model": "bark", "speaker": speaker }))
            .await
            .unwrap()
            .assert_status(StatusCode::OK);

        assert_eq!(ctx.bark.last_call().options.preset, None);
    }
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_use_long_form_for_long_bark_text(ctx: &TestContext) {
    let text = "This sentence is repeated to build a long passage. ".repeat(8);

    ctx.client
        .post("/generate", &json!({ "text": text, "model": "bark" }))
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let call = ctx.bark.last_call();
    assert!(call.long_form);
    assert_eq!(call.text, text.trim());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_empty_text(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/generate", &json!({ "text": "   " }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error("Text cannot be empty");
    assert!(ctx.coqui.calls().is_empty());
    assert!(ctx.output_files().is_empty());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_missing_text(ctx: &TestContext) {
    ctx.client
        .post("/generate", &json!({ "model": "bark" }))
        .await
        .unwrap()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error("Text cannot be empty");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_text_over_the_limit(ctx: &TestContext) {
    let text = "a".repeat(MAX_TEXT_CHARS + 1);

    ctx.client
        .post("/generate", &json!({ "text": text }))
        .await
        .unwrap()
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE)
        .assert_error(&format!("Text must be {} characters or less", MAX_TEXT_CHARS));
    assert!(ctx.coqui.calls().is_empty());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_non_positive_speed(ctx: &TestContext) {
    ctx.client
        .post("/generate", &json!({ "text": "Hello", "speed": 0.0 }))
        .await
        .unwrap()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error("Speed must be a positive number");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_unconfigured_engine(ctx: &TestContext) {
    ctx.client
        .post("/generate", &json!({ "text": "Hello", "model": "openvoice" }))
        .await
        .unwrap()
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_error("OpenVoice is not available");
    assert!(ctx.output_files().is_empty());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_not_leave_output_when_engine_fails(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/generate", &json!({ "text": format!("Broken {}", FAIL_MARKER) }))
        .await
        .unwrap();

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.str_field("error"),
        "Coqui TTS generation error: engine returned 500: synthetic failure"
    );
    assert!(ctx.output_files().is_empty());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_adjust_speed_after_synthesis(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/generate", &json!({ "text": "Quickly now", "speed": 2.0 }))
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(ctx.coqui.last_call().options.speed, 2.0);

    let path = ctx.output_dir.join(response.str_field("filename"));
    let reader = hound::WavReader::open(path).unwrap();
    assert_eq!(reader.spec().sample_rate, helpers::fake_engines::FAKE_SAMPLE_RATE);
    assert_eq!(reader.duration(), 4_000);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_accept_multipart_with_reference_audio(ctx: &TestContext) {
    let response = ctx
        .client
        .post_multipart(
            "/generate",
            &[("text", "Clone this voice"), ("model", XTTS_MODEL), ("language", "en")],
            vec![FilePart {
                field: "speaker_audio",
                filename: "me.wav",
                bytes: tone_bytes(1_600),
            }],
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.str_field("text"), "Clone this voice");

    let call = ctx.coqui.last_call();
    assert!(call.reference_present, "reference audio must exist during synthesis");
    let reference = call.options.reference_audio.expect("reference path forwarded");
    assert!(reference.starts_with(&ctx.upload_dir));

    assert!(ctx.upload_files().is_empty(), "upload must be removed after the request");
    assert_eq!(ctx.output_files().len(), 1);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_accept_multipart_without_file(ctx: &TestContext) {
    let response = ctx
        .client
        .post_multipart(
            "/generate",
            &[("text", "Form only"), ("model", "bark"), ("speaker", "Speaker 2"), ("speed", "1.0")],
            vec![],
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    let call = ctx.bark.last_call();
    assert_eq!(call.options.preset, Some(2));
    assert_eq!(call.options.reference_audio, None);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_unparseable_multipart_speed(ctx: &TestContext) {
    ctx.client
        .post_multipart("/generate", &[("text", "Hello"), ("speed", "fast")], vec![])
        .await
        .unwrap()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error("Invalid speed value: fast");
    assert!(ctx.coqui.calls().is_empty());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_ignore_empty_upload(ctx: &TestContext) {
    let response = ctx
        .client
        .post_multipart(
            "/generate",
            &[("text", "Hello")],
            vec![FilePart {
                field: "speaker_audio",
                filename: "",
                bytes: Vec::new(),
            }],
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(ctx.coqui.last_call().options.reference_audio, None);
    assert!(ctx.upload_files().is_empty());
}
