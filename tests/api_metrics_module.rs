use opsdeck::api::BackendClient;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;

/// Serves one canned body per request path and records the paths seen.
struct MockBackend {
    base_url: String,
    handle: Option<thread::JoinHandle<Vec<String>>>,
}

impl MockBackend {
    fn start<F>(expected_requests: usize, responder: F) -> Self
    where
        F: Fn(&str) -> String + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");

        let handle = thread::spawn(move || {
            let mut paths = Vec::new();
            for _ in 0..expected_requests {
                let (mut stream, _) = listener.accept().expect("accept");
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

                let mut request_line = String::new();
                reader
                    .read_line(&mut request_line)
                    .expect("read request line");
                let path = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).expect("read header");
                    if line == "\r\n" || line.is_empty() {
                        break;
                    }
                }
                paths.push(path.clone());

                let body = responder(&path);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                stream
                    .write_all(response.as_bytes())
                    .expect("write response");
            }
            paths
        });

        Self {
            base_url: format!("http://{addr}"),
            handle: Some(handle),
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.handle
            .take()
            .expect("server still running")
            .join()
            .expect("join mock server")
    }
}

#[test]
fn summary_endpoint_decodes_the_dashboard_counters() {
    let server = MockBackend::start(1, |_| {
        r#"{"totalRequests": 4821, "errorRate": 0.013, "avgResponseTime": 87.4, "activeUsers": 19}"#
            .to_string()
    });
    let client = BackendClient::new(&server.base_url);

    let summary = client.metrics_summary().expect("summary");
    assert_eq!(summary.total_requests, 4821);
    assert_eq!(summary.active_users, 19);
    assert!((summary.error_rate - 0.013).abs() < 1e-9);

    let paths = server.finish();
    assert_eq!(paths, vec!["/metrics/summary".to_string()]);
}

#[test]
fn timeseries_endpoint_decodes_a_point_list() {
    let server = MockBackend::start(1, |_| {
        r#"[
            {"time": "10:00", "requests": 120, "errors": 3},
            {"time": "10:05", "requests": 134, "errors": 0}
        ]"#
        .to_string()
    });
    let client = BackendClient::new(&server.base_url);

    let points = client.metrics_timeseries().expect("timeseries");
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].time, "10:00");
    assert_eq!(points[1].errors, 0);

    let paths = server.finish();
    assert_eq!(paths, vec!["/metrics/timeseries".to_string()]);
}

#[test]
fn breakdown_endpoint_decodes_per_service_rows() {
    let server = MockBackend::start(1, |_| {
        r#"[
            {"service": "auth", "errors": 2, "warnings": 11},
            {"service": "billing", "errors": 0, "warnings": 4}
        ]"#
        .to_string()
    });
    let client = BackendClient::new(&server.base_url);

    let rows = client.metrics_breakdown().expect("breakdown");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].service, "auth");
    assert_eq!(rows[1].warnings, 4);

    let paths = server.finish();
    assert_eq!(paths, vec!["/metrics/breakdown".to_string()]);
}
