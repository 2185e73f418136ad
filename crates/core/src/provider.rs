//! Remote summarization service: the trait the pipeline talks to and the
//! Gemini REST implementation.

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::fs;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::debug;

use crate::{
    error::{Result, VidsumError},
    types::RemoteFile,
};

#[async_trait]
pub trait SummaryService: Send + Sync {
    /// Upload a local chunk; the returned file may not be usable yet.
    async fn upload(&self, path: &Path) -> Result<RemoteFile>;

    /// Wait until an uploaded file can be referenced in prompts.
    async fn await_ready(&self, file: RemoteFile) -> Result<RemoteFile>;

    /// Ask for a summary of an active remote file.
    async fn summarize(&self, file: &RemoteFile, prompt: &str, timeout: Duration)
    -> Result<String>;

    /// Text-only generation, used for refinement.
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String>;

    async fn delete(&self, file: &RemoteFile) -> Result<()>;
}

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Bound on small control calls: upload session start, status checks, deletes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Bound on sending one chunk's bytes.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    activation_timeout: Duration,
    poll_interval: Duration,
    request_timeout: Duration,
    upload_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

impl From<FileResource> for RemoteFile {
    fn from(resource: FileResource) -> Self {
        RemoteFile {
            name: resource.name,
            uri: resource.uri,
            mime_type: resource.mime_type,
        }
    }
}

pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        _ => "video/mp4",
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: &Value) -> std::result::Result<String, String> {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| match response.get("promptFeedback") {
            Some(feedback) => format!("no candidates returned: {}", feedback),
            None => format!("invalid API response structure: {}", response),
        })?;

    let text = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(format!(
            "empty response (finish reason: {})",
            response["candidates"][0]["finishReason"]
                .as_str()
                .unwrap_or("unknown")
        ));
    }

    Ok(text)
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.trim_start_matches("models/").to_string(),
            base_url: GEMINI_API_URL.to_string(),
            activation_timeout: Duration::from_secs(600),
            poll_interval: POLL_INTERVAL,
            request_timeout: REQUEST_TIMEOUT,
            upload_timeout: UPLOAD_TIMEOUT,
        })
    }

    pub fn with_activation_timeout(mut self, timeout: Duration) -> Self {
        self.activation_timeout = timeout;
        self
    }

    async fn get_file(&self, name: &str) -> Result<FileResource> {
        let response = self
            .http
            .get(format!("{}/v1beta/{}", self.base_url, name))
            .query(&[("key", &self.api_key)])
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VidsumError::Upload {
                path: PathBuf::from(name),
                reason: format!(
                    "status check returned {}: {}",
                    status,
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        Ok(serde_json::from_str(&response.text().await?)?)
    }

    async fn generate(&self, body: Value, timeout: Duration, label: &str) -> Result<String> {
        let request = self
            .http
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send();

        let call = async {
            let response = request.await.map_err(|e| VidsumError::SummaryService {
                reason: e.to_string(),
            })?;
            let status = response.status();
            if !status.is_success() {
                return Err(VidsumError::SummaryService {
                    reason: format!(
                        "{} returned {}: {}",
                        label,
                        status,
                        response.text().await.unwrap_or_default()
                    ),
                });
            }
            response
                .json::<Value>()
                .await
                .map_err(|e| VidsumError::SummaryService {
                    reason: e.to_string(),
                })
        };

        let response = tokio::time::timeout(timeout, call).await.map_err(|_| {
            VidsumError::SummaryTimeout {
                remote: label.to_string(),
                timeout,
            }
        })??;

        extract_text(&response).map_err(|reason| VidsumError::SummaryService { reason })
    }
}

#[async_trait]
impl SummaryService for GeminiClient {
    async fn upload(&self, path: &Path) -> Result<RemoteFile> {
        let upload_error = |reason: String| VidsumError::Upload {
            path: path.to_path_buf(),
            reason,
        };

        let file = fs::File::open(path)
            .await
            .map_err(|e| upload_error(e.to_string()))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| upload_error(e.to_string()))?
            .len();
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let start = self
            .http
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .query(&[("key", &self.api_key)])
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type_for(path))
            .json(&json!({ "file": { "display_name": display_name } }))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| upload_error(e.to_string()))?;

        if !start.status().is_success() {
            return Err(upload_error(format!(
                "upload session rejected with {}",
                start.status()
            )));
        }

        let session_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| upload_error("missing upload session URL".to_string()))?;

        let response = self
            .http
            .post(session_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(FramedRead::new(
                file,
                BytesCodec::new(),
            )))
            .timeout(self.upload_timeout)
            .send()
            .await
            .map_err(|e| upload_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(upload_error(format!(
                "upload finalize returned {}",
                response.status()
            )));
        }

        let envelope = response
            .json::<FileEnvelope>()
            .await
            .map_err(|e| upload_error(e.to_string()))?;
        debug!(remote = %envelope.file.name, "uploaded chunk");

        Ok(envelope.file.into())
    }

    async fn await_ready(&self, file: RemoteFile) -> Result<RemoteFile> {
        let started = Instant::now();
        let poll = async {
            loop {
                let resource = self.get_file(&file.name).await?;
                match resource.state.as_deref() {
                    Some("ACTIVE") => return Ok(resource.into()),
                    Some("FAILED") => {
                        return Err(VidsumError::Upload {
                            path: PathBuf::from(&file.name),
                            reason: format!(
                                "remote processing failed: {}",
                                resource.error.unwrap_or(Value::Null)
                            ),
                        });
                    }
                    state => debug!(remote = %file.name, ?state, "waiting for remote file"),
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        // The deadline covers a stalled status request too, not just slow processing.
        tokio::time::timeout(self.activation_timeout, poll)
            .await
            .map_err(|_| VidsumError::ActivationTimeout {
                remote: file.name.clone(),
                waited: started.elapsed(),
            })?
    }

    async fn summarize(
        &self,
        file: &RemoteFile,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "file_data": { "mime_type": file.mime_type, "file_uri": file.uri } },
                    { "text": prompt },
                ]
            }]
        });
        self.generate(body, timeout, &file.name).await
    }

    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });
        self.generate(body, timeout, "refinement").await
    }

    async fn delete(&self, file: &RemoteFile) -> Result<()> {
        let response = self
            .http
            .delete(format!("{}/v1beta/{}", self.base_url, file.name))
            .query(&[("key", &self.api_key)])
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VidsumError::SummaryService {
                reason: format!("delete of {} returned {}", file.name, response.status()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
    };

    #[test]
    fn mime_types_follow_extension() {
        assert_eq!(mime_type_for(Path::new("a/chunk_1.MOV")), "video/quicktime");
        assert_eq!(mime_type_for(Path::new("chunk_1.mkv")), "video/x-matroska");
        assert_eq!(mime_type_for(Path::new("chunk_1.webm")), "video/webm");
        assert_eq!(mime_type_for(Path::new("chunk_1")), "video/mp4");
    }

    #[test]
    fn text_parts_are_concatenated() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Part one. " }, { "text": "Part two." }] },
                "finishReason": "STOP"
            }]
        });
        assert_eq!(extract_text(&response).unwrap(), "Part one. Part two.");
    }

    #[test]
    fn blocked_prompt_reports_feedback() {
        let response = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = extract_text(&response).unwrap_err();
        assert!(err.contains("SAFETY"));
    }

    #[test]
    fn empty_candidate_is_an_error() {
        let response = json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "MAX_TOKENS" }]
        });
        assert!(extract_text(&response).unwrap_err().contains("MAX_TOKENS"));
    }

    #[test]
    fn file_resource_parses_camel_case() {
        let resource: FileResource = serde_json::from_value(json!({
            "name": "files/abc123",
            "uri": "https://example.invalid/files/abc123",
            "mimeType": "video/mp4",
            "state": "PROCESSING"
        }))
        .unwrap();
        assert_eq!(resource.state.as_deref(), Some("PROCESSING"));

        let remote: RemoteFile = resource.into();
        assert_eq!(remote.key(), "abc123");
        assert_eq!(remote.mime_type, "video/mp4");
    }

    #[test]
    fn model_prefix_is_stripped() {
        let client = GeminiClient::new("key", "models/gemini-2.0-flash").unwrap();
        assert_eq!(client.model, "gemini-2.0-flash");
    }

    /// Accepts connections and never writes a byte back.
    async fn silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    fn stalled_file() -> RemoteFile {
        RemoteFile {
            name: "files/stalled".into(),
            uri: String::new(),
            mime_type: "video/mp4".into(),
        }
    }

    #[tokio::test]
    async fn stalled_status_check_hits_activation_timeout() {
        let client = GeminiClient {
            base_url: silent_server().await,
            poll_interval: Duration::from_millis(100),
            ..GeminiClient::new("key", "gemini-2.0-flash").unwrap()
        }
        .with_activation_timeout(Duration::from_secs(1));

        let result = tokio::time::timeout(Duration::from_secs(8), client.await_ready(stalled_file()))
            .await
            .expect("await_ready must give up on its own");

        assert!(matches!(result, Err(VidsumError::ActivationTimeout { .. })));
    }

    #[tokio::test]
    async fn stalled_delete_returns_an_error() {
        let client = GeminiClient {
            base_url: silent_server().await,
            request_timeout: Duration::from_secs(1),
            ..GeminiClient::new("key", "gemini-2.0-flash").unwrap()
        };

        let result = tokio::time::timeout(Duration::from_secs(8), client.delete(&stalled_file()))
            .await
            .expect("delete must give up on its own");

        assert!(matches!(result, Err(VidsumError::Http(e)) if e.is_timeout()));
    }

    type Seen = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

    async fn read_head(socket: &mut TcpStream, buf: &mut Vec<u8>) -> Option<usize> {
        loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                return Some(pos);
            }
            let mut chunk = [0u8; 8192];
            let n = socket.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Minimal resumable-upload endpoint recording every request line and body.
    async fn upload_server() -> (String, Seen) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let seen: Seen = Default::default();
        let (session_url, recorded) = (format!("{}/session", base), seen.clone());

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let (session_url, recorded) = (session_url.clone(), recorded.clone());
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    while let Some(head_end) = read_head(&mut socket, &mut buf).await {
                        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
                        let length = head
                            .lines()
                            .filter_map(|line| line.split_once(':'))
                            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                            .unwrap_or(0);

                        let body_start = head_end + 4;
                        while buf.len() < body_start + length {
                            let mut chunk = [0u8; 8192];
                            let n = socket.read(&mut chunk).await.unwrap();
                            if n == 0 {
                                return;
                            }
                            buf.extend_from_slice(&chunk[..n]);
                        }
                        let body = buf[body_start..body_start + length].to_vec();
                        buf.drain(..body_start + length);

                        let request_line = head.lines().next().unwrap_or_default().to_string();
                        let response = if request_line.starts_with("POST /session") {
                            let json = r#"{"file":{"name":"files/abc","uri":"https://example.invalid/files/abc","mimeType":"video/mp4"}}"#;
                            format!(
                                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                                json.len(),
                                json
                            )
                        } else {
                            format!(
                                "HTTP/1.1 200 OK\r\nx-goog-upload-url: {}\r\ncontent-length: 0\r\n\r\n",
                                session_url
                            )
                        };
                        recorded.lock().unwrap().push((request_line, body));
                        socket.write_all(response.as_bytes()).await.unwrap();
                    }
                });
            }
        });

        (base, seen)
    }

    #[tokio::test]
    async fn upload_sends_chunk_bytes_to_the_session_url() {
        let dir = tempfile::tempdir().unwrap();
        let chunk = dir.path().join("chunk_1.mp4");
        let bytes: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&chunk, &bytes).unwrap();

        let (base_url, seen) = upload_server().await;
        let client = GeminiClient {
            base_url,
            ..GeminiClient::new("key", "gemini-2.0-flash").unwrap()
        };

        let remote = client.upload(&chunk).await.unwrap();

        assert_eq!(remote.key(), "abc");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].0.starts_with("POST /upload/v1beta/files"));
        assert!(seen[1].0.starts_with("POST /session"));
        assert!(seen[1].1 == bytes, "uploaded body differs from the chunk file");
    }

    #[tokio::test]
    async fn missing_chunk_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let client = GeminiClient::new("key", "gemini-2.0-flash").unwrap();

        let err = client
            .upload(&dir.path().join("chunk_1.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, VidsumError::Upload { .. }));
    }
}
