use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

use super::{Embedder, Embedding, ModelConfig};
use crate::error::{EvalError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for any service speaking the OpenAI `/embeddings` protocol.
pub struct OpenAiEmbedder {
    agent: Agent,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(base_url: &str, api_key: Option<String>, timeout_secs: u64) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs)))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout_secs,
        }
    }

    fn request_body(text: &str, model: &ModelConfig) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": model.model,
            "input": text,
        });
        if let Some(dims) = model.dimensions {
            body["dimensions"] = serde_json::json!(dims);
        }
        body
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, text: &str, model: &ModelConfig) -> Result<Embedding> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| EvalError::Provider("no API key configured".into()))?;

        let url = format!("{}/embeddings", self.base_url);
        debug!(%model, chars = text.len(), "requesting embedding");

        let result = self
            .agent
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .send_json(Self::request_body(text, model));

        let mut response = match result {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(EvalError::Provider(format!("{url} returned HTTP {code}")));
            }
            Err(ureq::Error::Timeout(_)) => {
                return Err(EvalError::ProviderTimeout {
                    secs: self.timeout_secs,
                });
            }
            Err(e) => {
                return Err(EvalError::Provider(format!("request to {url} failed: {e}")));
            }
        };

        let resp: EmbeddingResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| EvalError::Provider(format!("parsing embedding response: {e}")))?;

        resp.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EvalError::Provider("response contained no embeddings".into()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    /// Consume one HTTP request (headers plus `Content-Length` body).
    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve a single connection with `respond`, returning the server's base URL.
    fn serve_once<F>(respond: F) -> String
    where
        F: FnOnce(TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                respond(stream);
            }
        });
        format!("http://{addr}")
    }

    fn reply(mut stream: TcpStream, status: &str, body: &str) {
        read_request(&mut stream);
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
    }

    #[test]
    fn silent_server_times_out() {
        let url = serve_once(|mut stream| {
            read_request(&mut stream);
            // Hold the connection open past the client's deadline.
            thread::sleep(Duration::from_secs(3));
        });
        let embedder = OpenAiEmbedder::new(&url, Some("key".into()), 1);

        let started = std::time::Instant::now();
        let err = embedder
            .embed("hello", &ModelConfig::new("m", None))
            .unwrap_err();

        assert!(matches!(err, EvalError::ProviderTimeout { secs: 1 }), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn http_error_status_is_provider_error() {
        let url = serve_once(|stream| {
            reply(stream, "500 Internal Server Error", r#"{"error":"boom"}"#);
        });
        let embedder = OpenAiEmbedder::new(&url, Some("key".into()), 5);
        let err = embedder
            .embed("hello", &ModelConfig::new("m", None))
            .unwrap_err();
        assert!(matches!(err, EvalError::Provider(ref msg) if msg.contains("500")), "{err:?}");
    }

    #[test]
    fn successful_response_returns_first_embedding() {
        let url = serve_once(|stream| {
            reply(
                stream,
                "200 OK",
                r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.25,-1.5]}]}"#,
            );
        });
        let embedder = OpenAiEmbedder::new(&url, Some("key".into()), 5);
        let embedding = embedder
            .embed("hello", &ModelConfig::new("m", Some(2)))
            .unwrap();
        assert_eq!(embedding, vec![0.25, -1.5]);
    }

    #[test]
    fn empty_data_is_provider_error() {
        let url = serve_once(|stream| reply(stream, "200 OK", r#"{"data":[]}"#));
        let embedder = OpenAiEmbedder::new(&url, Some("key".into()), 5);
        let err = embedder
            .embed("hello", &ModelConfig::new("m", None))
            .unwrap_err();
        assert!(matches!(err, EvalError::Provider(ref msg) if msg.contains("no embeddings")));
    }

    #[test]
    fn body_omits_dimensions_when_unset() {
        let body = OpenAiEmbedder::request_body("hi", &ModelConfig::new("m", None));
        assert_eq!(body["model"], "m");
        assert_eq!(body["input"], "hi");
        assert!(body.get("dimensions").is_none());
    }

    #[test]
    fn body_carries_dimensions() {
        let body = OpenAiEmbedder::request_body("hi", &ModelConfig::new("m", Some(1536)));
        assert_eq!(body["dimensions"], 1536);
    }

    #[test]
    fn missing_key_fails_before_network() {
        let embedder = OpenAiEmbedder::new("http://127.0.0.1:9", Some("  ".into()), 5);
        let err = embedder
            .embed("hello", &ModelConfig::new("m", None))
            .unwrap_err();
        assert!(matches!(err, EvalError::Provider(msg) if msg.contains("API key")));
    }

    #[test]
    fn parses_openai_response_shape() {
        let json = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,-0.25]}],"model":"m"}"#;
        let resp: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data[0].embedding, vec![0.5, -0.25]);
    }
}
