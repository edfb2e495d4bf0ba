//! HTTP providers against a one-shot local responder.

use std::sync::Arc;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use simulacrum::brain::ActionDecider;
use simulacrum::providers::{
    ChatOptions, GeminiConfig, GeminiProvider, Message, OllamaConfig, OllamaProvider,
    OpenAIConfig, OpenAIProvider, Provider, ProviderError, ResponseFormat,
};
use simulacrum::world::{Agent, LogKind, World, WorldLimits};
use simulacrum::Simulation;

/// Answers one request with `status` and `body`; yields the raw request.
async fn serve_once(status: u16, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buf = [0_u8; 4096];

        loop {
            let n = socket.read(&mut buf).await.expect("read");
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.expect("write");
        socket.shutdown().await.ok();

        String::from_utf8_lossy(&request).into_owned()
    });

    (format!("http://{addr}"), handle)
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let length = text[..header_end]
        .lines()
        .find_map(|l| {
            let (name, value) = l.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    request.len() >= header_end + 4 + length
}

fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
    })
    .to_string()
}

fn json_options() -> ChatOptions {
    ChatOptions {
        response_format: ResponseFormat::Json { schema: None },
        ..Default::default()
    }
}

// ==================== Ollama Tests ====================

#[tokio::test]
async fn test_ollama_chat_roundtrip() {
    let (url, server) = serve_once(200, completion(r#"{"actionType":"REST"}"#)).await;
    let provider = OllamaProvider::new(
        &OllamaConfig {
            base_url: Some(url),
            default_model: Some("qwen2.5:3b".to_string()),
        },
        5,
    );

    let response = provider
        .chat(&[Message::system("Ты агент."), Message::user("Что делать?")], &json_options())
        .await
        .expect("chat");

    assert_eq!(response.content, r#"{"actionType":"REST"}"#);
    assert_eq!(response.usage.map(|u| u.total_tokens), Some(150));

    let request = server.await.expect("server");
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.contains(r#""model":"qwen2.5:3b""#));
    assert!(request.contains(r#""response_format":{"type":"json_object"}"#));
    assert!(!request.to_lowercase().contains("authorization"));
}

#[tokio::test]
async fn test_ollama_connection_refused_is_config_error() {
    // Bind then drop to get a closed port
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let provider = OllamaProvider::new(
        &OllamaConfig {
            base_url: Some(format!("http://{addr}")),
            default_model: None,
        },
        5,
    );

    let err = provider
        .chat(&[Message::user("hi")], &ChatOptions::default())
        .await
        .expect_err("nobody listening");
    assert!(matches!(err, ProviderError::ConfigError(_)));
}

#[tokio::test]
async fn test_ollama_lists_installed_models() {
    let body = json!({
        "models": [
            {"name": "llama3.2:latest", "size": 2_019_393_189_u64},
            {"name": "qwen2.5:3b", "size": 1_929_912_432_u64}
        ]
    })
    .to_string();
    let (url, server) = serve_once(200, body).await;
    let provider = OllamaProvider::new(
        &OllamaConfig {
            base_url: Some(url),
            default_model: None,
        },
        5,
    );

    let models = provider.installed_models().await.expect("tags");
    assert_eq!(models, vec!["llama3.2:latest", "qwen2.5:3b"]);

    let request = server.await.expect("server");
    assert!(request.starts_with("GET /api/tags"));
}

#[tokio::test]
async fn test_hosted_providers_list_nothing_installed() {
    let provider = OpenAIProvider::new("sk-unused", 5);
    assert!(provider.installed_models().await.expect("default").is_empty());
}

// ==================== OpenAI Tests ====================

#[tokio::test]
async fn test_openai_sends_bearer_key() {
    let (url, server) = serve_once(200, completion("ok")).await;
    let provider = OpenAIProvider::from_config(
        &OpenAIConfig {
            api_key: Some("sk-local".to_string()),
            base_url: Some(format!("{url}/v1")),
            default_model: None,
        },
        5,
    )
    .expect("key configured");

    let response = provider
        .chat(&[Message::user("hi")], &ChatOptions::default())
        .await
        .expect("chat");
    assert_eq!(response.content, "ok");

    let request = server.await.expect("server");
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.to_lowercase().contains("authorization: bearer sk-local"));
    assert!(request.contains(r#""model":"gpt-4o-mini""#));
}

#[tokio::test]
async fn test_openai_unauthorized_maps_to_invalid_key() {
    let (url, server) = serve_once(401, json!({"error": {"message": "bad key"}}).to_string()).await;
    let provider = OpenAIProvider::new("sk-wrong", 5).with_base_url(&url);

    let err = provider
        .chat(&[Message::user("hi")], &ChatOptions::default())
        .await
        .expect_err("401");
    assert!(matches!(err, ProviderError::InvalidApiKey));
    server.await.expect("server");
}

// ==================== Gemini Tests ====================

#[tokio::test]
async fn test_gemini_generate_content() {
    let body = json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": "{\"actionType\":\"THINK\"}"}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
    })
    .to_string();
    let (url, server) = serve_once(200, body).await;

    let provider = GeminiProvider::from_config(
        &GeminiConfig {
            api_key: Some("g-key".to_string()),
            base_url: Some(url),
            default_model: None,
        },
        5,
    )
    .expect("key configured");

    let response = provider
        .chat(&[Message::system("Ты агент."), Message::user("Что делать?")], &json_options())
        .await
        .expect("chat");
    assert_eq!(response.content, r#"{"actionType":"THINK"}"#);

    let request = server.await.expect("server");
    assert!(request.starts_with("POST /models/gemini-2.5-flash:generateContent HTTP/1.1"));
    assert!(request.to_lowercase().contains("x-goog-api-key: g-key"));
    assert!(request.contains("systemInstruction"));
    assert!(request.contains(r#""responseMimeType":"application/json""#));
}

#[tokio::test]
async fn test_gemini_network_error_hides_api_key() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let key = "SECRET-KEY-123";
    let provider = GeminiProvider::from_config(
        &GeminiConfig {
            api_key: Some(key.to_string()),
            base_url: Some(format!("http://{addr}")),
            default_model: None,
        },
        5,
    )
    .expect("key configured");

    let err = provider
        .chat(&[Message::user("hi")], &ChatOptions::default())
        .await
        .expect_err("nobody listening");

    assert!(matches!(err, ProviderError::NetworkError(_)));
    assert!(!err.to_string().contains(key));
    assert!(!format!("{err:?}").contains(key));
}

// ==================== End to End ====================

#[tokio::test]
async fn test_turn_through_ollama() {
    let reply = r#"{"actionType":"TALK","targetAgentId":"b","content":"Как дела?","newMood":"Волнение","affinityChange":4}"#;
    let (url, server) = serve_once(200, completion(reply)).await;

    let provider = OllamaProvider::new(
        &OllamaConfig {
            base_url: Some(url),
            default_model: None,
        },
        5,
    );
    // Only Алиса is idle, so she acts
    let mut busy = Agent::new("b", "Борис", "Повар");
    busy.is_thinking = true;
    let world = World::new(vec![Agent::new("a", "Алиса", "Инженер"), busy], WorldLimits::default());
    let sim = Simulation::new(world, ActionDecider::new(Arc::new(provider)));

    let outcome = sim.step().await.expect("turn").expect("Алиса acts");

    assert_eq!(outcome.agent_id, "a");
    assert_eq!(outcome.entry.kind, LogKind::Interaction);
    assert_eq!(outcome.entry.content, "Алиса говорит Борис: \"Как дела?\"");
    assert_eq!(outcome.affinity.map(|s| (s.speaker_affinity, s.listener_affinity)), Some((4, 2)));

    let request = server.await.expect("server");
    assert!(request.contains("Твое имя: Алиса."));
    assert!(request.contains("llama3.2"));
}
