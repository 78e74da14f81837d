use super::*;
use crate::factory::{create_backend, BackendConfig, BackendProtocol};
use anyhow::Result;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{response::IntoResponse, Json, Router};
use bytes::Bytes;
use futures::stream;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

// What the mock server saw
#[derive(Clone, Default)]
struct Captured {
    body: Arc<Mutex<Option<serde_json::Value>>>,
    authorization: Arc<Mutex<Option<String>>>,
}

impl Captured {
    fn record(&self, headers: &HeaderMap, body: serde_json::Value) {
        *self.body.lock().unwrap() = Some(body);
        *self.authorization.lock().unwrap() = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
    }

    fn body(&self) -> serde_json::Value {
        self.body.lock().unwrap().clone().expect("no request captured")
    }

    fn authorization(&self) -> Option<String> {
        self.authorization.lock().unwrap().clone()
    }
}

fn chunked_body(chunks: Vec<Vec<u8>>, content_type: &'static str) -> axum::response::Response {
    let stream = stream::iter(
        chunks
            .into_iter()
            .map(|chunk| Ok::<_, std::io::Error>(Bytes::from(chunk))),
    );
    axum::response::Response::builder()
        .status(axum::http::StatusCode::OK)
        .header("content-type", content_type)
        .body(axum::body::Body::from_stream(stream))
        .unwrap()
}

async fn serve(app: Router) -> String {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = TcpListener::bind(addr).await.unwrap();
    let server_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", server_addr)
}

// Helper to create an Ollama-style mock server streaming `chunks` from /api/chat
async fn create_ndjson_server(chunks: Vec<Vec<u8>>, captured: Captured) -> String {
    let app = Router::new()
        .route(
            "/api/chat",
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let chunks = chunks.clone();
                let captured = captured.clone();
                async move {
                    captured.record(&headers, body);
                    chunked_body(chunks, "application/x-ndjson")
                }
            }),
        )
        .route(
            "/api/tags",
            get(|| async {
                Json(json!({
                    "models": [
                        {"name": "llama3:8b", "size": 4661224676u64},
                        {"name": "qwen2.5-coder:7b"}
                    ]
                }))
            }),
        );
    serve(app).await
}

// Helper to create an OpenAI-style mock server streaming `chunks` from /v1/chat/completions
async fn create_sse_server(chunks: Vec<Vec<u8>>, captured: Captured) -> String {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
            let chunks = chunks.clone();
            let captured = captured.clone();
            async move {
                captured.record(&headers, body);
                chunked_body(chunks, "text/event-stream")
            }
        }),
    );
    serve(app).await
}

async fn create_failing_server(status: axum::http::StatusCode, message: &'static str) -> String {
    let app = Router::new().route(
        "/*path",
        post(move || async move { (status, message).into_response() }),
    );
    serve(app).await
}

fn ndjson_line(content: &str, done: bool) -> String {
    format!(
        "{}\n",
        json!({
            "model": "llama3:8b",
            "message": {"role": "assistant", "content": content},
            "done": done
        })
    )
}

fn request(text: &str) -> ChatRequest {
    ChatRequest {
        model: "llama3:8b".to_string(),
        system_prompt: Some("You are a helpful assistant.".to_string()),
        messages: vec![Message::user(text, None)],
    }
}

async fn collect_updates(
    backend: &dyn ChatBackend,
    request: ChatRequest,
) -> Result<(String, Vec<String>)> {
    let mut updates = Vec::new();
    let text = backend
        .stream_chat(request, &mut |text: &str| {
            updates.push(text.to_string());
            Ok(())
        })
        .await?;
    Ok((text, updates))
}

#[tokio::test]
async fn test_ollama_streaming_across_split_reads() -> Result<()> {
    // One object split across reads, then two objects bundled in one read
    let body = [
        ndjson_line("Hi!", false),
        ndjson_line(" How can", false),
        ndjson_line(" I help?", false),
        ndjson_line("", true),
    ]
    .concat();
    let bytes = body.as_bytes();
    let first_break = 20;
    let second_break = bytes.len() - 30;
    let chunks = vec![
        bytes[..first_break].to_vec(),
        bytes[first_break..second_break].to_vec(),
        bytes[second_break..].to_vec(),
    ];

    let captured = Captured::default();
    let base_url = create_ndjson_server(chunks, captured.clone()).await;
    let client = OllamaClient::new(base_url);

    let (text, updates) = collect_updates(&client, request("Hello")).await?;

    assert_eq!(text, "Hi! How can I help?");
    assert_eq!(updates, vec!["Hi!", "Hi! How can", "Hi! How can I help?"]);

    let body = captured.body();
    assert_eq!(body["model"], "llama3:8b");
    assert_eq!(body["stream"], true);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Hello");
    assert_eq!(captured.authorization(), None);
    Ok(())
}

#[tokio::test]
async fn test_ollama_cloud_sends_bearer_key() -> Result<()> {
    let captured = Captured::default();
    let chunks = vec![ndjson_line("ok", true).into_bytes()];
    let base_url = create_ndjson_server(chunks, captured.clone()).await;
    let client = OllamaClient::new(base_url).with_api_key("secret-key".to_string());

    let (text, _) = collect_updates(&client, request("ping")).await?;

    assert_eq!(text, "ok");
    assert_eq!(captured.authorization().as_deref(), Some("Bearer secret-key"));
    Ok(())
}

#[tokio::test]
async fn test_ollama_skips_garbled_lines() -> Result<()> {
    let chunks = vec![
        ndjson_line("A", false).into_bytes(),
        b"{\"message\":{\"content\":\n".to_vec(),
        ndjson_line("B", true).into_bytes(),
    ];
    let base_url = create_ndjson_server(chunks, Captured::default()).await;
    let client = OllamaClient::new(base_url);

    let (text, updates) = collect_updates(&client, request("x")).await?;
    assert_eq!(text, "AB");
    assert_eq!(updates, vec!["A", "AB"]);
    Ok(())
}

#[tokio::test]
async fn test_ollama_list_models() -> Result<()> {
    let base_url = create_ndjson_server(Vec::new(), Captured::default()).await;
    let client = OllamaClient::new(base_url);

    let models = client.list_models().await?;
    assert_eq!(models, vec!["llama3:8b", "qwen2.5-coder:7b"]);
    Ok(())
}

#[tokio::test]
async fn test_list_models_connection_refused() {
    // Bind then drop a listener so the port is closed
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = OllamaClient::new(format!("http://{}", addr));
    let error = client.list_models().await.unwrap_err();
    assert!(matches!(
        error.downcast_ref::<ApiError>(),
        Some(ApiError::NetworkError(_))
    ));
}

#[tokio::test]
async fn test_openai_sse_streaming() -> Result<()> {
    let chunks = vec![
        b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"},\"finish_reason\":null}]}\n\n".to_vec(),
        b"data: {\"choices\":[{\"delta\":{\"content\":\"<html>\"},\"finish_reason\":null}]}\n\ndata: {\"choices\":[{\"del".to_vec(),
        b"ta\":{\"content\":\"</html>\"},\"finish_reason\":null}]}\n\n".to_vec(),
        b"data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n".to_vec(),
        b"data: [DONE]\n\n".to_vec(),
    ];
    let captured = Captured::default();
    let base_url = create_sse_server(chunks, captured.clone()).await;
    let client = OpenAIClient::new("test-key".to_string(), format!("{base_url}/v1"));

    let (text, updates) = collect_updates(&client, request("page")).await?;

    assert_eq!(text, "<html></html>");
    assert_eq!(updates, vec!["<html>", "<html></html>"]);
    assert_eq!(captured.authorization().as_deref(), Some("Bearer test-key"));
    assert_eq!(captured.body()["messages"][1]["role"], "user");
    Ok(())
}

#[tokio::test]
async fn test_factory_routes_to_protocol() -> Result<()> {
    let captured = Captured::default();
    let chunks = vec![b"data: {\"choices\":[{\"delta\":{\"content\":\"sse\"}}]}\n\ndata: [DONE]\n\n".to_vec()];
    let base_url = create_sse_server(chunks, captured).await;

    let backend = create_backend(BackendConfig {
        protocol: BackendProtocol::Sse,
        base_url,
        api_key: Some("k".to_string()),
        accumulation: AccumulationMode::Append,
    })?;
    let (text, _) = collect_updates(backend.as_ref(), request("x")).await?;
    assert_eq!(text, "sse");
    Ok(())
}

#[tokio::test]
async fn test_non_success_status_is_classified() {
    let base_url =
        create_failing_server(axum::http::StatusCode::UNAUTHORIZED, "invalid api key").await;
    let client = OllamaClient::new(base_url);

    let error = client
        .stream_chat(request("x"), &mut |_: &str| Ok(()))
        .await
        .unwrap_err();
    match error.downcast_ref::<ApiError>() {
        Some(ApiError::Authentication(text)) => assert_eq!(text, "invalid api key"),
        other => panic!("Expected authentication error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_callback_error_stops_stream() {
    let chunks = vec![
        ndjson_line("A", false).into_bytes(),
        ndjson_line("B", true).into_bytes(),
    ];
    let base_url = create_ndjson_server(chunks, Captured::default()).await;
    let client = OllamaClient::new(base_url);

    let mut seen = 0;
    let result = client
        .stream_chat(request("x"), &mut |_: &str| {
            seen += 1;
            Err(StreamError::Callback("viewer closed".to_string()).into())
        })
        .await;
    assert!(result.is_err());
    assert_eq!(seen, 1);
}

#[test]
fn test_openai_message_conversion() {
    let text_message = Message::user("Hello world", None);
    let converted = OpenAIClient::convert_message(&text_message);
    assert_eq!(converted.role, "user");
    assert_eq!(converted.content, json!("Hello world"));

    let image_message = Message::user(
        "What is in this image?",
        Some(InlineData {
            data: "aGVsbG8=".to_string(),
            mime_type: "image/png".to_string(),
        }),
    );
    let converted = OpenAIClient::convert_message(&image_message);
    let parts = converted.content.as_array().expect("structured content");
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["type"], "text");
    assert_eq!(parts[1]["type"], "image_url");
    assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,aGVsbG8=");

    let model_message = Message::model("<html></html>", Some("gpt-oss:120b-cloud".to_string()));
    assert_eq!(OpenAIClient::convert_message(&model_message).role, "assistant");
}
