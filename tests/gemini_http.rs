//! Generative language client tests against a mock HTTP server

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use daycast::gemini::GeminiClient;
use daycast::{Error, SpeechGenerator, TextGenerator};

const TEXT_PATH: &str = "/v1beta/models/text-model:generateContent";
const VOICE_PATH: &str = "/v1beta/models/voice-model:generateContent";

fn client(server: &MockServer) -> GeminiClient {
    GeminiClient::new(server.uri(), SecretString::from("gemini-key"))
}

#[tokio::test]
async fn text_request_carries_system_instruction_and_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .and(header("x-goog-api-key", "gemini-key"))
        .and(body_partial_json(json!({
            "systemInstruction": { "role": "user", "parts": [{ "text": "Be brief." }] },
            "contents": [{ "role": "user", "parts": [{ "text": "{\"user\":{}}" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "thinking", "thought": true },
                        { "text": "Good morning. " },
                        { "text": "Rain later." }
                    ]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server)
        .generate_text("text-model", "Be brief.", "{\"user\":{}}")
        .await
        .unwrap();
    assert_eq!(text, "Good morning. Rain later.");
}

#[tokio::test]
async fn speech_request_asks_for_audio_in_a_prebuilt_voice() {
    let server = MockServer::start().await;
    let pcm = vec![1u8, 0, 255, 127];

    Mock::given(method("POST"))
        .and(path(VOICE_PATH))
        .and(body_partial_json(json!({
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": { "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": "Kore" } } }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "inlineData": {
                            "mimeType": "audio/L16;codec=pcm;rate=24000",
                            "data": STANDARD.encode(&pcm)
                        }
                    }]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let audio = client(&server)
        .generate_speech("voice-model", "Kore", "Hello")
        .await
        .unwrap();
    assert_eq!(audio.data, pcm);
    assert_eq!(audio.mime_type, "audio/L16;codec=pcm;rate=24000");
}

#[tokio::test]
async fn zero_candidates_is_empty_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(VOICE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate_speech("voice-model", "Kore", "Hello")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptyAudio(_)));
}

#[tokio::test]
async fn text_only_answer_is_empty_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(VOICE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "I cannot speak" }] } }]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate_speech("voice-model", "Kore", "Hello")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptyAudio(_)));
}

#[tokio::test]
async fn blocked_prompt_is_a_generation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate_text("text-model", "Be brief.", "{}")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Generation(ref msg) if msg.contains("SAFETY")));
}

#[tokio::test]
async fn error_status_is_a_generation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate_text("text-model", "Be brief.", "{}")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Generation(ref msg) if msg.contains("429")));
}
