use opsdeck::api::{AnalysisType, ApiError, BackendClient, JobStatus, ResumeDecision};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone, Default)]
struct RecordedRequest {
    method: String,
    path: String,
    content_type: String,
    body: Vec<u8>,
}

struct MockBackend {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockBackend {
    fn start<F>(expected_requests: usize, responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handle = {
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                for _ in 0..expected_requests {
                    let (mut stream, _) = listener.accept().expect("accept");
                    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

                    let mut request_line = String::new();
                    reader
                        .read_line(&mut request_line)
                        .expect("read request line");
                    let mut parts = request_line.split_whitespace();
                    let mut recorded = RecordedRequest {
                        method: parts.next().unwrap_or("").to_string(),
                        path: parts.next().unwrap_or("/").to_string(),
                        ..RecordedRequest::default()
                    };

                    let mut content_length = 0usize;
                    loop {
                        let mut line = String::new();
                        reader.read_line(&mut line).expect("read header");
                        if line == "\r\n" || line.is_empty() {
                            break;
                        }
                        let lower = line.to_ascii_lowercase();
                        if let Some(value) = lower.strip_prefix("content-length:") {
                            content_length = value.trim().parse().unwrap_or(0);
                        }
                        if lower.starts_with("content-type:") {
                            recorded.content_type = line
                                .split_once(':')
                                .map(|(_, v)| v.trim().to_string())
                                .unwrap_or_default();
                        }
                    }
                    if content_length > 0 {
                        let mut body = vec![0_u8; content_length];
                        reader.read_exact(&mut body).expect("read body");
                        recorded.body = body;
                    }

                    let (status, body) = responder(&recorded);
                    requests.lock().expect("lock requests").push(recorded);

                    let reason = match status {
                        200 => "OK",
                        401 => "Unauthorized",
                        404 => "Not Found",
                        _ => "Error",
                    };
                    let response = format!(
                        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    stream
                        .write_all(response.as_bytes())
                        .expect("write response");
                }
            })
        };

        Self {
            base_url: format!("http://{addr}"),
            requests,
            handle: Some(handle),
        }
    }

    fn finish(mut self) -> Vec<RecordedRequest> {
        if let Some(handle) = self.handle.take() {
            handle.join().expect("join mock server");
        }
        let requests = self.requests.lock().expect("lock requests").clone();
        requests
    }
}

#[test]
fn fetch_status_issues_a_get_with_the_encoded_thread_id() {
    let server = MockBackend::start(1, |_| (200, r#"{"status": "running"}"#.to_string()));
    let client = BackendClient::new(&server.base_url);

    let response = client.fetch_status("thread/1").expect("fetch status");
    assert_eq!(response.status, JobStatus::Running);

    let requests = server.finish();
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].path, "/api/status?threadId=thread%2F1");
}

#[test]
fn resume_posts_the_thread_id_and_decision_as_json() {
    let server = MockBackend::start(1, |_| (200, r#"{"status": "running"}"#.to_string()));
    let client = BackendClient::new(&server.base_url);

    client.resume("t1", ResumeDecision::Reject).expect("resume");

    let requests = server.finish();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/api/resume");
    assert!(requests[0].content_type.starts_with("application/json"));
    let body: serde_json::Value =
        serde_json::from_slice(&requests[0].body).expect("body is json");
    assert_eq!(body["threadId"], "t1");
    assert_eq!(body["decision"], "reject");
}

#[test]
fn start_analysis_uploads_a_multipart_body_with_both_parts() {
    let server = MockBackend::start(1, |_| {
        (200, r#"{"threadId": "t9", "status": "running"}"#.to_string())
    });
    let client = BackendClient::new(&server.base_url);

    let response = client
        .start_analysis("app.py", b"print('hi')", AnalysisType::Quality)
        .expect("start analysis");
    assert_eq!(response.thread_id, "t9");

    let requests = server.finish();
    assert_eq!(requests[0].path, "/api/start-analysis");
    assert!(requests[0]
        .content_type
        .starts_with("multipart/form-data; boundary="));
    let boundary = requests[0]
        .content_type
        .split("boundary=")
        .nth(1)
        .expect("boundary present")
        .to_string();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains(&format!("--{boundary}\r\n")));
    assert!(body.contains("name=\"file\"; filename=\"app.py\""));
    assert!(body.contains("print('hi')"));
    assert!(body.contains("name=\"analysisType\""));
    assert!(body.contains("quality"));
    assert!(body.ends_with(&format!("--{boundary}--\r\n")));
}

#[test]
fn server_error_bodies_surface_their_error_message() {
    let server = MockBackend::start(1, |_| (500, r#"{"error": "boom"}"#.to_string()));
    let client = BackendClient::new(&server.base_url);

    let err = client.fetch_status("t1").expect_err("should fail");
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn detail_field_is_used_when_error_is_absent() {
    let server = MockBackend::start(1, |_| (422, r#"{"detail": "bad input"}"#.to_string()));
    let client = BackendClient::new(&server.base_url);

    let err = client.fetch_status("t1").expect_err("should fail");
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "bad input");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn bodyless_failures_fall_back_to_the_status_code() {
    let server = MockBackend::start(1, |_| (404, String::new()));
    let client = BackendClient::new(&server.base_url);

    let err = client.fetch_status("t1").expect_err("should fail");
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "http status 404");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
