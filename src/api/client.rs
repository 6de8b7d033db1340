use crate::api::ApiError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Typed client for the analysis backend. One instance owns one ureq agent,
/// so the session cookie issued by `/auth/login` rides along on every later
/// request made through the same client.
#[derive(Clone)]
pub struct BackendClient {
    agent: ureq::Agent,
    base_url: String,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            agent: ureq::AgentBuilder::new().build(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let mut url = self.endpoint(path);
        if !query.is_empty() {
            let encoded = query
                .iter()
                .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url = format!("{url}?{encoded}");
        }
        let response = self.agent.get(&url).call().map_err(map_request_error)?;
        decode_json(response)
    }

    pub(crate) fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let payload =
            serde_json::to_value(body).map_err(|err| ApiError::Transport(err.to_string()))?;
        let response = self
            .agent
            .post(&self.endpoint(path))
            .send_json(payload)
            .map_err(map_request_error)?;
        decode_json(response)
    }

    pub(crate) fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        self.agent
            .post(&self.endpoint(path))
            .call()
            .map_err(map_request_error)?;
        Ok(())
    }

    /// POSTs a multipart/form-data body. ureq has no multipart support, so
    /// the body is assembled here; parts are `(name, filename, bytes)` with
    /// `filename = None` for plain fields.
    pub(crate) fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        parts: &[(&str, Option<&str>, &[u8])],
    ) -> Result<T, ApiError> {
        let boundary = multipart_boundary();
        let body = encode_multipart(&boundary, parts);
        let response = self
            .agent
            .post(&self.endpoint(path))
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .send_bytes(&body)
            .map_err(map_request_error)?;
        decode_json(response)
    }
}

fn decode_json<T: DeserializeOwned>(response: ureq::Response) -> Result<T, ApiError> {
    response
        .into_json::<T>()
        .map_err(|err| ApiError::Decode(err.to_string()))
}

fn map_request_error(err: ureq::Error) -> ApiError {
    match err {
        ureq::Error::Status(401, _) => ApiError::Unauthorized,
        ureq::Error::Status(status, response) => {
            let message = response
                .into_json::<ErrorBody>()
                .ok()
                .and_then(|body| body.error.or(body.detail))
                .unwrap_or_else(|| format!("http status {status}"));
            ApiError::Status { status, message }
        }
        ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
    }
}

fn multipart_boundary() -> String {
    let mut bytes = [0u8; 16];
    if getrandom::getrandom(&mut bytes).is_err() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        return format!("opsdeck-{nanos:032x}");
    }
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("opsdeck-{hex}")
}

fn encode_multipart(boundary: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, bytes) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_body_carries_every_part_and_the_closing_boundary() {
        let body = encode_multipart(
            "b123",
            &[
                ("file", Some("app.py"), b"print('hi')".as_slice()),
                ("analysisType", None, b"security".as_slice()),
            ],
        );
        let text = String::from_utf8(body).expect("multipart body is utf-8 here");
        assert!(text.contains("Content-Disposition: form-data; name=\"file\"; filename=\"app.py\""));
        assert!(text.contains("print('hi')"));
        assert!(text.contains("Content-Disposition: form-data; name=\"analysisType\""));
        assert!(text.contains("\r\nsecurity\r\n"));
        assert!(text.ends_with("--b123--\r\n"));
    }

    #[test]
    fn endpoint_joins_base_and_path_without_duplicate_slashes() {
        let client = BackendClient::new("http://localhost:8000/");
        assert_eq!(
            client.endpoint("/api/status"),
            "http://localhost:8000/api/status"
        );
        assert_eq!(
            client.endpoint("auth/login"),
            "http://localhost:8000/auth/login"
        );
    }
}
