//! Wire-level tests for the Gemini backend against a local mock server.
//!
//! These verify the request shape (auth header, path, schema, inline media)
//! and how replies and error bodies map onto LUNai results.

use base64::Engine;
use futures::StreamExt;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lunai_core::{
    ContentPart, Error, GenerationBackend, OracleRequest, SpeechBackend, StreamingGeneration,
};
use lunai_inference::intents::{EvidenceCategory, ExpenseCategory};
use lunai_inference::{ExtractionClient, GeminiBackend, GeminiConfig};

fn config_for(server: &MockServer) -> GeminiConfig {
    let mut config = GeminiConfig::with_api_key("test-key");
    config.base_url = server.uri();
    config.timeout_seconds = 10;
    config
}

fn text_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

async fn last_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.expect("recording enabled");
    let last = requests.last().expect("at least one request");
    serde_json::from_slice(&last.body).expect("JSON body")
}

#[tokio::test]
async fn test_generate_sends_key_and_returns_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("Hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(config_for(&server)).expect("backend");
    let request = OracleRequest::single(
        "gemini-2.5-flash",
        "Answer briefly.",
        vec![ContentPart::text("Hello")],
    );
    let reply = backend.generate(request).await.unwrap();
    assert_eq!(reply, "Hi there");

    let body = last_body(&server).await;
    assert_eq!(
        body["systemInstruction"]["parts"][0]["text"],
        "Answer briefly."
    );
    assert_eq!(body["contents"][0]["role"], "user");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "Hello");
    assert!(body.get("generationConfig").is_none());
}

#[tokio::test]
async fn test_expense_extraction_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(
            r#"{"category":"Extracurricular","amount":129.99,"currency":"CAD"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = ExtractionClient::from_config(config_for(&server)).expect("client");
    let expense = client
        .categorize_expense("Hockey skates for Timmy $129.99 CAD")
        .await
        .unwrap();

    assert_eq!(expense.category, ExpenseCategory::Extracurricular);
    assert_eq!(expense.amount, Some(129.99));
    assert_eq!(expense.currency.as_deref(), Some("CAD"));

    let body = last_body(&server).await;
    let config = &body["generationConfig"];
    assert_eq!(config["responseMimeType"], "application/json");
    assert_eq!(config["responseSchema"]["type"], "OBJECT");
    assert_eq!(config["responseSchema"]["required"], json!(["category"]));
    assert!(config["responseSchema"]["properties"]["category"]["enum"]
        .as_array()
        .unwrap()
        .contains(&json!("Extracurricular")));
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("Hockey skates for Timmy $129.99 CAD"));
}

#[tokio::test]
async fn test_expense_without_amount_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_reply("```json\n{\"category\":\"Extracurricular\"}\n```")),
        )
        .mount(&server)
        .await;

    let client = ExtractionClient::from_config(config_for(&server)).expect("client");
    let expense = client.categorize_expense("Hockey skates").await.unwrap();
    assert_eq!(expense.category, ExpenseCategory::Extracurricular);
    assert_eq!(expense.amount, None);
    assert_eq!(expense.currency, None);
}

#[tokio::test]
async fn test_evidence_image_sent_inline_base64() {
    let server = MockServer::start().await;
    let image = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x01, 0x02];

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(
            &json!({
                "extractedText": "Pickup moved to 5pm",
                "summary": "Screenshot of a schedule change.",
                "suggestedTitle": "Pickup time change",
                "suggestedCategory": "Communication"
            })
            .to_string(),
        )))
        .mount(&server)
        .await;

    let client = ExtractionClient::from_config(config_for(&server)).expect("client");
    let analysis = client
        .process_evidence_image(image.clone(), "image/jpeg")
        .await
        .unwrap();
    assert_eq!(analysis.suggested_category, EvidenceCategory::Communication);
    assert_eq!(analysis.ocr_confidence, None);

    let body = last_body(&server).await;
    let parts = &body["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(
        parts[0]["inlineData"]["data"],
        base64::engine::general_purpose::STANDARD.encode(&image)
    );
    assert!(parts[1]["text"].is_string());
}

#[tokio::test]
async fn test_pro_tier_intent_uses_pro_model() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(
            r#"{"optimizedSchedule":"2-2-3 rotation","reasoning":"Keeps both homes close."}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = ExtractionClient::from_config(config_for(&server)).expect("client");
    let proposal = client
        .optimize_schedule("Weekends with dad", "Stable school nights", "")
        .await
        .unwrap();
    assert_eq!(proposal.optimized_schedule, "2-2-3 rotation");
}

#[tokio::test]
async fn test_unauthorized_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "code": 401,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "UNAUTHENTICATED"
            }
        })))
        .mount(&server)
        .await;

    let client = ExtractionClient::from_config(config_for(&server)).expect("client");
    let err = client.categorize_expense("Groceries").await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)), "got {:?}", err);
    assert!(err.to_string().contains("API key not valid"));
    assert!(err.raw_response().is_none());
}

#[tokio::test]
async fn test_rate_limit_plain_body_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too many requests"))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(config_for(&server)).expect("backend");
    let err = backend
        .generate(OracleRequest::single("gemini-2.5-flash", "", vec![ContentPart::text("x")]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(ref m) if m.contains("Too many requests")));
}

#[tokio::test]
async fn test_non_json_reply_is_schema_violation_with_raw() {
    let server = MockServer::start().await;
    let raw = "Sorry, I can only help with parenting questions.";

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply(raw)))
        .mount(&server)
        .await;

    let client = ExtractionClient::from_config(config_for(&server)).expect("client");
    let err = client.improve_communication("You're late again.").await.unwrap_err();
    assert!(matches!(err, Error::SchemaViolation { .. }));
    assert_eq!(err.raw_response(), Some(raw));
}

#[tokio::test]
async fn test_validation_error_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("{}")))
        .expect(0)
        .mount(&server)
        .await;

    let client = ExtractionClient::from_config(config_for(&server)).expect("client");
    let err = client.categorize_expense("   ").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = client
        .process_evidence_image(vec![0, 0, 0, 0x18], "video/mp4")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_stream_reassembles_sse_fragments() {
    let server = MockServer::start().await;

    let sse = [
        format!("data: {}\n\n", text_reply("Hello")),
        format!("data: {}\n\n", text_reply(" there")),
        format!("data: {}\n\n", text_reply("!")),
    ]
    .concat();

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-lite:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/event-stream")
                .set_body_string(sse),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(config_for(&server)).expect("backend");
    let request = OracleRequest::single(
        "gemini-2.5-flash-lite",
        "Be kind.",
        vec![ContentPart::text("Hi")],
    )
    .with_thinking_budget(Some(1024));

    let stream = backend.generate_stream(request).await.unwrap();
    let fragments: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
    assert_eq!(fragments, vec!["Hello", " there", "!"]);

    let body = last_body(&server).await;
    assert_eq!(
        body["generationConfig"]["thinkingConfig"]["thinkingBudget"],
        1024
    );
    assert!(body["generationConfig"].get("responseSchema").is_none());
}

#[tokio::test]
async fn test_stream_http_error_fails_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": 404, "message": "models/nope is not found", "status": "NOT_FOUND" }
        })))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(config_for(&server)).expect("backend");
    let result = backend
        .generate_stream(OracleRequest::single("nope", "", vec![ContentPart::text("Hi")]))
        .await;
    match result {
        Err(Error::Transport(message)) => assert!(message.contains("Model not found")),
        Err(other) => panic!("Expected transport error, got {:?}", other),
        Ok(_) => panic!("Expected transport error"),
    }
}

#[tokio::test]
async fn test_synthesize_decodes_audio() {
    let server = MockServer::start().await;
    let pcm = vec![0x00, 0x80, 0x00, 0x40];

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-preview-tts:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "inlineData": {
                            "mimeType": "audio/L16;codec=pcm;rate=24000",
                            "data": base64::engine::general_purpose::STANDARD.encode(&pcm)
                        }
                    }]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(config_for(&server)).expect("backend");
    let audio = backend.synthesize("Good night, sweetheart.").await.unwrap();
    assert_eq!(audio, pcm);

    let body = last_body(&server).await;
    assert_eq!(body["generationConfig"]["responseModalities"], json!(["AUDIO"]));
    assert_eq!(
        body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
        "Kore"
    );
}

#[tokio::test]
async fn test_synthesize_without_audio_is_audio_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("no audio")))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(config_for(&server)).expect("backend");
    let err = backend.synthesize("hello").await.unwrap_err();
    assert!(matches!(err, Error::Audio(_)));
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(config_for(&server)).expect("backend");
    assert!(backend.health_check().await.unwrap());
}

#[tokio::test]
async fn test_health_check_unauthorized_is_false() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new(config_for(&server)).expect("backend");
    assert!(!backend.health_check().await.unwrap());
}

#[tokio::test]
async fn test_generate_past_deadline_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_reply("too late"))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.timeout_seconds = 1;
    let backend = GeminiBackend::new(config).expect("backend");
    let request = OracleRequest::single(
        "gemini-2.5-flash",
        "Answer briefly.",
        vec![ContentPart::text("Hello")],
    );

    let err = backend.generate(request).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}
