//! End-to-end tests for the vLLM provider against a mocked backend

use serde_json::json;
use vllm_core::client::{ClientError, RequestOptions, VllmClient};
use vllm_core::protocol::{GenerateOptions, Message, MessageRole, Model, Tool};
use vllm_core::providers::models::QWEN2_5_LATEST;
use vllm_core::providers::{LlmProvider, ProviderError, VllmProvider};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn provider_for(server: &MockServer) -> VllmProvider {
    let provider = VllmProvider::new(VllmClient::new().with_base_url(server.uri()));
    provider.use_model(Model::new(QWEN2_5_LATEST)).unwrap();
    provider
}

fn weather_tool() -> Tool {
    Tool::new(
        "get_weather",
        "Get the current weather for a city",
        json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        }),
    )
}

fn completion(message: serde_json::Value) -> serde_json::Value {
    json!({
        "id": "chatcmpl-42",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": QWEN2_5_LATEST,
        "choices": [{"index": 0, "message": message, "finish_reason": "stop"}]
    })
}

#[tokio::test]
async fn test_generate_requires_model() {
    let server = MockServer::start().await;
    let provider = VllmProvider::new(VllmClient::new().with_base_url(server.uri()));

    let err = provider
        .generate(
            GenerateOptions::new(vec![Message::user("hi")]),
            &RequestOptions::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::NoModelSelected));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_generate_returns_assistant_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": QWEN2_5_LATEST,
            "stream": false,
            "messages": [
                {"role": "system", "content": "You are terse."},
                {"role": "user", "content": "Say hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
            "role": "assistant",
            "content": "Hi."
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let options = GenerateOptions::new(vec![
        Message::system("You are terse."),
        Message::user("Say hi"),
    ]);
    let message = provider
        .generate(options, &RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(message, Message::assistant("Hi."));
}

#[tokio::test]
async fn test_generate_with_tools_returns_tool_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "tools": [{"type": "function", "function": {"name": "get_weather"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [
                {
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "get_weather", "arguments": "{\"city\": \"Lisbon\"}"}
                },
                {
                    "id": "call_2",
                    "type": "function",
                    "function": {"name": "get_weather", "arguments": "{\"city\": "}
                }
            ]
        }))))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let options =
        GenerateOptions::new(vec![Message::user("Weather?")]).with_tools(vec![weather_tool()]);
    let message = provider
        .generate(options, &RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(message.role, MessageRole::Assistant);
    assert_eq!(message.content, "");
    assert_eq!(message.tool_calls.len(), 2);

    let args: serde_json::Value = message.tool_calls[0].parse_arguments().unwrap();
    assert_eq!(args["city"], "Lisbon");

    // malformed arguments are handed over verbatim
    assert_eq!(message.tool_calls[1].id, "call_2");
    assert_eq!(message.tool_calls[1].arguments, "{\"city\": ");
}

#[tokio::test]
async fn test_generate_accepts_ollama_object_arguments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
            "role": "assistant",
            "content": "",
            "tool_calls": [{"function": {"name": "get_weather", "arguments": {"city": "Porto"}}}]
        }))))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let message = provider
        .generate(
            GenerateOptions::new(vec![Message::user("Weather?")]),
            &RequestOptions::new(),
        )
        .await
        .unwrap();

    let args: serde_json::Value = message.tool_calls[0].parse_arguments().unwrap();
    assert_eq!(args, json!({"city": "Porto"}));
}

#[tokio::test]
async fn test_explicit_model_overrides_selection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "gemma3:latest"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
            "role": "assistant",
            "content": "from gemma"
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let options = GenerateOptions::new(vec![Message::user("hi")]).with_model("gemma3:latest");
    let message = provider
        .generate(options, &RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(message.content, "from gemma");
    assert_eq!(provider.current_model(), Some(Model::new(QWEN2_5_LATEST)));
}

#[tokio::test]
async fn test_generate_no_choices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-0",
            "model": QWEN2_5_LATEST,
            "choices": []
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let err = provider
        .generate(
            GenerateOptions::new(vec![Message::user("hi")]),
            &RequestOptions::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::NoChoices));
    assert!(err.is_semantic());
    assert_eq!(err.to_string(), "no choices returned from model");
}

#[tokio::test]
async fn test_generate_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let err = provider
        .generate(
            GenerateOptions::new(vec![Message::user("hi")]),
            &RequestOptions::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::EmptyResponse));
}

#[tokio::test]
async fn test_generate_wraps_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let err = provider
        .generate(
            GenerateOptions::new(vec![Message::user("hi")]),
            &RequestOptions::new(),
        )
        .await
        .unwrap_err();

    assert!(!err.is_semantic());
    assert!(matches!(
        err.client_error(),
        Some(ClientError::Status { status: 500, .. })
    ));
    let text = err.to_string();
    assert!(text.starts_with("error calling client chat method"), "{}", text);
    assert!(text.contains("internal error"), "{}", text);
}

#[tokio::test]
async fn test_generate_stream_delivers_deltas() {
    let server = MockServer::start().await;
    let chunk = |delta: serde_json::Value| {
        json!({
            "id": "chatcmpl-7",
            "object": "chat.completion.chunk",
            "created": 1,
            "model": QWEN2_5_LATEST,
            "choices": [{"index": 0, "delta": delta, "finish_reason": null}]
        })
    };
    let body = format!(
        "data: {}\n\ndata: {}\n\ndata: {}\n\ndata: [DONE]\n\n",
        chunk(json!({"role": "assistant", "content": ""})),
        chunk(json!({"content": "Hello"})),
        chunk(json!({"content": ", world"})),
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let mut stream = provider.generate_stream(
        GenerateOptions::new(vec![Message::user("Greet the world")]),
        &RequestOptions::new(),
    );

    let mut deltas = Vec::new();
    while let Some(delta) = stream.messages.recv().await {
        deltas.push(delta);
    }
    assert_eq!(deltas.len(), 3);
    assert!(deltas.iter().all(|d| d.role == MessageRole::Assistant));
    assert_eq!(deltas[1].content, "Hello");

    let text = stream.collect_text().await.unwrap();
    assert_eq!(text, "Hello, world");
}

#[tokio::test]
async fn test_generate_stream_ndjson_with_done() {
    let server = MockServer::start().await;
    let body = [
        json!({"model": QWEN2_5_LATEST, "choices": [{"index": 0, "message": {"role": "assistant", "content": "one "}}], "done": false}),
        json!({"model": QWEN2_5_LATEST, "choices": [{"index": 0, "message": {"role": "assistant", "content": "two"}}], "done": true}),
        json!({"model": QWEN2_5_LATEST, "choices": [{"index": 0, "message": {"role": "assistant", "content": "ignored"}}]}),
    ]
    .iter()
    .map(|frame| format!("{}\n", frame))
    .collect::<String>();
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let stream = provider.generate_stream(
        GenerateOptions::new(vec![Message::user("count")]),
        &RequestOptions::new(),
    );

    assert_eq!(stream.collect_text().await.unwrap(), "one two");
}

#[tokio::test]
async fn test_generate_stream_reports_error_then_closes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let mut stream = provider.generate_stream(
        GenerateOptions::new(vec![Message::user("hi")]),
        &RequestOptions::new(),
    );

    let err = stream.errors.recv().await.expect("terminal error");
    assert!(matches!(
        err.client_error(),
        Some(ClientError::Status { status: 500, .. })
    ));
    assert!(stream.errors.recv().await.is_none());
    assert!(stream.messages.recv().await.is_none());
    assert!(stream.tokens.recv().await.is_none());
}

#[tokio::test]
async fn test_generate_stream_surfaces_backend_error_event() {
    let server = MockServer::start().await;
    let chunk = json!({
        "id": "chatcmpl-8",
        "object": "chat.completion.chunk",
        "model": QWEN2_5_LATEST,
        "choices": [{"index": 0, "delta": {"role": "assistant", "content": "Hi"}}]
    });
    let error = json!({
        "object": "error",
        "message": "context length exceeded",
        "type": "BadRequestError",
        "param": null,
        "code": 400
    });
    let body = format!("data: {}\n\ndata: {}\n\ndata: [DONE]\n\n", chunk, error);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let mut stream = provider.generate_stream(
        GenerateOptions::new(vec![Message::user("a very long prompt")]),
        &RequestOptions::new(),
    );

    let err = stream.errors.recv().await.expect("terminal error");
    match err.client_error() {
        Some(ClientError::Backend { message }) => assert_eq!(message, "context length exceeded"),
        other => panic!("Expected backend error, got {:?}", other),
    }
    assert!(!err.is_semantic());

    // the delta before the error was still delivered
    assert_eq!(stream.tokens.recv().await.as_deref(), Some("Hi"));
    assert!(stream.tokens.recv().await.is_none());
}

#[tokio::test]
async fn test_generate_reports_backend_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"message": "model not loaded", "type": "NotFoundError"}
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let err = provider
        .generate(
            GenerateOptions::new(vec![Message::user("hi")]),
            &RequestOptions::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err.client_error(),
        Some(ClientError::Backend { message }) if message == "model not loaded"
    ));
}

#[tokio::test]
async fn test_generate_stream_without_model() {
    let provider = VllmProvider::new(VllmClient::new());
    let stream = provider.generate_stream(
        GenerateOptions::new(vec![Message::user("hi")]),
        &RequestOptions::new(),
    );

    assert!(matches!(
        stream.collect_text().await,
        Err(ProviderError::NoModelSelected)
    ));
}

#[tokio::test]
async fn test_capabilities_are_unknown() {
    let provider = VllmProvider::new(VllmClient::new());
    let caps = provider
        .get_capabilities(&RequestOptions::new())
        .await
        .unwrap();

    assert!(caps.is_unknown());
    assert_eq!(caps.supports_tools, None);
    assert_eq!(provider.name(), "vllm");
}

#[tokio::test]
async fn test_provider_usable_as_trait_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
            "role": "assistant",
            "content": "ok"
        }))))
        .mount(&server)
        .await;

    let provider: Box<dyn LlmProvider> = Box::new(provider_for(&server).await);
    let message = provider
        .generate(
            GenerateOptions::new(vec![Message::user("ping")]),
            &RequestOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(message.content, "ok");
}
