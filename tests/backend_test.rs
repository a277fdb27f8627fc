//! HTTP generation backends against a mock server.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use klang_rs::engine::GenerationBackend;
use klang_rs::llm::{NarakeetSpeechBackend, OpenAiImageBackend};
use klang_rs::model::media::IllustrationPrompt;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn prompt() -> IllustrationPrompt {
    IllustrationPrompt {
        word: "house".to_string(),
        description: "a building for people to live in".to_string(),
    }
}

fn image_backend(server: &MockServer) -> OpenAiImageBackend {
    OpenAiImageBackend::new(
        reqwest::Client::new(),
        SecretString::from("sk-test"),
        "dall-e-3",
    )
    .with_base_url(server.uri())
}

fn speech_backend(server: &MockServer) -> NarakeetSpeechBackend {
    NarakeetSpeechBackend::new(reqwest::Client::new(), SecretString::from("nk-test"))
        .with_base_url(server.uri())
        .with_voices(vec!["Klara".to_string()])
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[tokio::test]
async fn image_backend_requests_one_base64_png() {
    let server = MockServer::start().await;
    let payload = STANDARD.encode(b"\x89PNG\r\n\x1a\nfake");

    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "dall-e-3",
            "size": "1024x1024",
            "quality": "standard",
            "response_format": "b64_json",
            "n": 1,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "created": 1,
            "data": [{"b64_json": payload}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let image = image_backend(&server).generate(&prompt()).await.unwrap();
    assert_eq!(image.b64_png, payload);
    assert_eq!(image.prompt, prompt());
    assert_eq!(image.usage.amount_out, 1024);
}

#[tokio::test]
async fn image_backend_reports_provider_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(400).set_body_string("content policy violation"))
        .mount(&server)
        .await;

    let err = image_backend(&server).generate(&prompt()).await.unwrap_err();
    assert!(err.is_backend_failure());
    assert!(err.to_string().contains("content policy violation"));
}

#[tokio::test]
async fn image_backend_rejects_an_empty_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let err = image_backend(&server).generate(&prompt()).await.unwrap_err();
    assert!(err.is_backend_failure());
}

// ---------------------------------------------------------------------------
// Speech
// ---------------------------------------------------------------------------

#[tokio::test]
async fn speech_backend_posts_text_and_reads_duration() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/text-to-speech/mp3"))
        .and(query_param("voice", "Klara"))
        .and(query_param("voice-speed", "0.9"))
        .and(header("x-api-key", "nk-test"))
        .and(header("content-type", "text/plain"))
        .and(body_string("das Haus"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-duration-seconds", "2")
                .set_body_bytes(b"ID3audio".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sound = speech_backend(&server)
        .generate(&"das Haus".to_string())
        .await
        .unwrap();
    assert_eq!(sound.audio, b"ID3audio");
    assert_eq!(sound.duration_secs, 2);
    assert_eq!(sound.voice, "Klara");
}

#[tokio::test]
async fn speech_backend_tolerates_a_missing_duration() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/text-to-speech/mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3audio".to_vec()))
        .mount(&server)
        .await;

    let sound = speech_backend(&server)
        .generate(&"laufen".to_string())
        .await
        .unwrap();
    assert_eq!(sound.duration_secs, 0);
}

#[tokio::test]
async fn speech_backend_fails_on_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/text-to-speech/mp3"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad api key"))
        .mount(&server)
        .await;

    let err = speech_backend(&server)
        .generate(&"laufen".to_string())
        .await
        .unwrap_err();
    assert!(err.is_backend_failure());
}
