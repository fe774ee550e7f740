//! Gateway HTTP client tests
//!
//! Exercises `GatewayClient` against a mock HTTP server: base64 decoding
//! of synthesis responses, verbatim error surfacing, and voice catalog
//! parsing.

use base64::Engine as _;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voxread::client::{GatewayClient, SpeakRequest, SpeechApi};

fn speak_request() -> SpeakRequest {
    SpeakRequest {
        text: "hello world".to_string(),
        voice_id: "Ruth".to_string(),
        engine: "neural".to_string(),
        output_format: "mp3".to_string(),
        speed: 1.2,
    }
}

#[tokio::test]
async fn synthesize_decodes_the_returned_audio() {
    let server = MockServer::start().await;
    let audio = b"mock-audio-bytes";
    let encoded = base64::engine::general_purpose::STANDARD.encode(audio);

    Mock::given(method("POST"))
        .and(path("/tts/synthesize"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({ "voiceId": "Ruth", "engine": "neural" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "audioContent": encoded,
            "contentType": "audio/mpeg",
            "characterCount": 11,
            "voiceId": "Ruth",
            "engine": "neural",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GatewayClient::new(server.uri());
    let clip = client
        .synthesize(&speak_request(), "test-token")
        .await
        .unwrap();

    assert_eq!(clip.bytes.as_ref(), audio);
    assert_eq!(clip.content_type, "audio/mpeg");
}

#[tokio::test]
async fn error_bodies_are_surfaced_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tts/synthesize"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"error":"Text is too long. Maximum 100,000 characters allowed."}"#),
        )
        .mount(&server)
        .await;

    let client = GatewayClient::new(server.uri());
    let error = client
        .synthesize(&speak_request(), "test-token")
        .await
        .unwrap_err();

    assert!(error.to_string().contains("Text is too long"));
}

#[tokio::test]
async fn voices_parses_the_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tts/voices"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "voices": [{
                "id": "Ruth",
                "name": "Ruth",
                "gender": "Female",
                "engine": ["neural", "generative"],
                "languageCode": "en-US",
                "languageName": "US English",
            }]
        })))
        .mount(&server)
        .await;

    let client = GatewayClient::new(server.uri());
    let voices = client.voices("test-token").await.unwrap();

    assert_eq!(voices.len(), 1);
    assert_eq!(voices[0].id, "Ruth");
    assert_eq!(voices[0].engine, vec!["neural", "generative"]);
}

#[tokio::test]
async fn invalid_base64_audio_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tts/synthesize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "audioContent": "!!! not base64 !!!",
            "contentType": "audio/mpeg",
        })))
        .mount(&server)
        .await;

    let client = GatewayClient::new(server.uri());
    let error = client
        .synthesize(&speak_request(), "test-token")
        .await
        .unwrap_err();

    assert!(error.to_string().contains("Invalid"));
}
