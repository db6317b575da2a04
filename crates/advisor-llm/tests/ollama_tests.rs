use advisor_core::config::GenerationSettings;
use advisor_core::traits::{Generator, Prompt};
use advisor_llm::ollama::parse_response;
use advisor_llm::{LlmError, OllamaGenerator};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn prompt() -> Prompt {
    Prompt { system: "Answer from context only.".to_string(), user: "Context:\nZED\n\nQuestion: What is ZED?".to_string() }
}

#[test]
fn request_carries_messages_and_sampling_options() {
    let settings = GenerationSettings { model: "granite4:tiny-h".to_string(), ..GenerationSettings::default() };
    let gen = OllamaGenerator::new(&settings).expect("client");
    let req = gen.build_request(&prompt());
    let json = serde_json::to_value(&req).expect("json");
    assert_eq!(json["model"], "granite4:tiny-h");
    assert_eq!(json["stream"], false);
    assert_eq!(json["messages"][0]["role"], "system");
    assert_eq!(json["messages"][1]["content"], "Context:\nZED\n\nQuestion: What is ZED?");
    assert_eq!(json["options"]["num_predict"], 500);
    assert_eq!(json["options"]["top_k"], 10);
}

#[test]
fn parse_response_keeps_text_and_rejects_blank() {
    let body = r#"{"model":"m","message":{"role":"assistant","content":"  ZED certifies MSMEs.\n"},"done":true}"#;
    assert_eq!(parse_response(body).expect("ok"), "  ZED certifies MSMEs.\n");
    let empty = r#"{"message":{"role":"assistant","content":"   "}}"#;
    assert!(matches!(parse_response(empty), Err(LlmError::EmptyResponse)));
    assert!(matches!(parse_response("not json"), Err(LlmError::Parse(_))));
}

/// Reads headers and the full body so the client never sees a reset.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.expect("read");
        if n == 0 { return; }
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap_or(0)))
                .unwrap_or(0);
            if data.len() >= end + 4 + content_length { return; }
        }
    }
}

async fn serve_once(status_line: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        read_request(&mut socket).await;
        let response = format!(
            "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.expect("write");
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn generate_against_local_server() {
    let base_url = serve_once("HTTP/1.1 200 OK", r#"{"message":{"role":"assistant","content":"CGTMSE offers guarantees."}}"#).await;
    let gen = OllamaGenerator::new(&GenerationSettings { base_url, ..GenerationSettings::default() }).expect("client");
    assert_eq!(gen.generate(&prompt()).await.expect("generate"), "CGTMSE offers guarantees.");
}

#[tokio::test]
async fn server_errors_surface_status() {
    let base_url = serve_once("HTTP/1.1 404 Not Found", r#"{"error":"model not found"}"#).await;
    let gen = OllamaGenerator::new(&GenerationSettings { base_url, ..GenerationSettings::default() }).expect("client");
    match gen.chat(&prompt()).await {
        Err(LlmError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert!(message.contains("model not found"));
        }
        other => panic!("expected api error, got {:?}", other),
    }
}
